//! Reference-counted handle to a decoded kdb+ object
//!
//! [`Value`] is the root decoding surface. It either holds one counted
//! reference to a [`Block`] or is empty. Ownership follows Rust's rules:
//!
//! - `clone()` takes a new reference (count + 1)
//! - moving transfers the reference without touching the count
//! - dropping releases it exactly once
//! - assignment drops the old reference, then adopts the new one
//!
//! An empty value stands for a failed request or decode. It reports
//! [`Type::Error`] and [`StructType::Error`].

use std::fmt;
use std::sync::Arc;

use crate::block::{Block, BlockRef, Storage};
use crate::dict::Dictionary;
use crate::error::{AccessError, Result};
use crate::list::List;
use crate::native::{KdbType, Native};
use crate::table::{KeyedTable, Table};
use crate::temporal;
use crate::types::{Attribute, StructType, Type};
use crate::vector::Vector;

/// Handle to a kdb+ object, or empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Value {
    block: Option<BlockRef>,
}

impl Value {
    /// Empty value.
    pub fn null() -> Self {
        Value { block: None }
    }

    /// Wrap a reference the caller already owns; the count is unchanged.
    pub fn adopt(block: BlockRef) -> Self {
        Value { block: Some(block) }
    }

    /// Wrap a reference borrowed from elsewhere, taking a new count.
    pub fn retain(block: &BlockRef) -> Self {
        Value {
            block: Some(Arc::clone(block)),
        }
    }

    /// True for an empty value.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.block.is_none()
    }

    /// Underlying block.
    #[inline]
    pub fn block(&self) -> Option<&BlockRef> {
        self.block.as_ref()
    }

    /// Give up the handle, keeping the reference.
    pub fn into_block(self) -> Option<BlockRef> {
        self.block
    }

    /// Raw signed tag.
    pub fn tag(&self) -> Option<i8> {
        self.block.as_ref().map(|b| b.tag())
    }

    /// Data type with the atom sign removed; [`Type::Error`] when empty.
    pub fn data_type(&self) -> Type {
        self.block.as_ref().map_or(Type::Error, |b| b.data_type())
    }

    /// Structural category; [`StructType::Error`] when empty.
    pub fn struct_type(&self) -> StructType {
        self.block
            .as_ref()
            .map_or(StructType::Error, |b| b.struct_type())
    }

    /// Element count for lists and vectors, 1 for any other object, 0 when
    /// empty.
    pub fn size(&self) -> usize {
        match &self.block {
            None => 0,
            Some(b) => match b.struct_type() {
                StructType::List | StructType::Vector => b.storage().len(),
                _ => 1,
            },
        }
    }

    /// Attribute of the underlying object.
    pub fn attribute(&self) -> Attribute {
        self.block
            .as_ref()
            .map_or(Attribute::None, |b| b.attribute())
    }

    /// Current reference count of the underlying block (0 when empty).
    pub fn ref_count(&self) -> usize {
        self.block.as_ref().map_or(0, Arc::strong_count)
    }

    /// Message carried by an error block.
    pub fn error_message(&self) -> Option<&str> {
        self.block.as_ref().and_then(|b| b.message())
    }

    fn require(&self, expected: StructType) -> Result<&BlockRef> {
        let block = self.block.as_ref().ok_or(AccessError::Null)?;
        let actual = block.struct_type();
        if actual != expected {
            return Err(AccessError::WrongStructure { expected, actual });
        }
        Ok(block)
    }

    /// Read an atom of type `K`.
    ///
    /// Fails unless the value is an atom whose type is exactly `K::TYPE`.
    pub fn get<K: KdbType>(&self) -> Result<K::Native> {
        let block = self.require(StructType::Atom)?;
        let actual = block.data_type();
        if actual != K::TYPE {
            return Err(AccessError::TypeMismatch {
                expected: K::TYPE,
                actual,
            });
        }
        K::Native::slice(block.storage())
            .and_then(|s| s.first())
            .cloned()
            .ok_or(AccessError::StorageMismatch { tag: block.tag() })
    }

    /// Read an atom payload as native type `N`, ignoring the tag.
    ///
    /// Any atom stored with `N`'s width is accepted, so
    /// `get_as::<i64>()` reads longs, timestamps and timespans alike.
    /// Returns `None` for non-atoms or a storage width other than `N`'s.
    pub fn get_as<N: Native>(&self) -> Option<N> {
        let block = self.block.as_ref()?;
        if block.struct_type() != StructType::Atom {
            return None;
        }
        N::slice(block.storage())?.first().cloned()
    }

    /// Item `i` of a list or vector.
    ///
    /// List items share the child block; vector items are copied into a
    /// new atom.
    pub fn item(&self, i: usize) -> Result<Value> {
        let block = self.block.as_ref().ok_or(AccessError::Null)?;
        let len = block.storage().len();
        let out_of_bounds = AccessError::IndexOutOfBounds { index: i, len };
        match block.struct_type() {
            StructType::List => block
                .children()
                .get(i)
                .map(Value::retain)
                .ok_or(out_of_bounds),
            StructType::Vector => {
                let one = block.storage().element(i).ok_or(out_of_bounds)?;
                let atom = Block::new(-block.tag(), Attribute::None, one)?;
                Ok(Value::from(atom))
            }
            actual => Err(AccessError::WrongStructure {
                expected: StructType::List,
                actual,
            }),
        }
    }

    /// Typed view of a vector.
    pub fn as_vector<K: KdbType>(&self) -> Result<Vector<K>> {
        let block = self.block.as_ref().ok_or(AccessError::Null)?;
        Vector::from_block(block)
    }

    /// Table view.
    ///
    /// Accepts a table, or a keyed table (a dictionary of two tables), in
    /// which case the key columns come first.
    pub fn as_table(&self) -> Result<Table> {
        let block = self.block.as_ref().ok_or(AccessError::Null)?;
        Table::from_block(block)
    }

    /// Keyed table view of a dictionary whose key and value are tables.
    pub fn as_keyed_table(&self) -> Result<KeyedTable> {
        let block = self.require(StructType::Dictionary)?;
        KeyedTable::from_block(block)
    }

    /// True for a dictionary whose key and value are both tables.
    ///
    /// The tag alone (99) does not distinguish the two.
    pub fn is_keyed_table(&self) -> bool {
        self.block.as_ref().is_some_and(|b| {
            b.struct_type() == StructType::Dictionary
                && b.children().len() == 2
                && b.children()
                    .iter()
                    .all(|c| c.struct_type() == StructType::Table)
        })
    }

    /// Dictionary view.
    pub fn as_dictionary(&self) -> Result<Dictionary> {
        let block = self.require(StructType::Dictionary)?;
        Dictionary::from_block(block)
    }

    /// General list view.
    pub fn as_list(&self) -> Result<List> {
        let block = self.require(StructType::List)?;
        Ok(List::from_block(block))
    }
}

impl From<Block> for Value {
    fn from(block: Block) -> Self {
        Value::adopt(Arc::new(block))
    }
}

impl From<BlockRef> for Value {
    fn from(block: BlockRef) -> Self {
        Value::adopt(block)
    }
}

impl From<Option<BlockRef>> for Value {
    fn from(block: Option<BlockRef>) -> Self {
        Value { block }
    }
}

/// Console-style rendering.
///
/// Vector elements are space separated, lists are parenthesised, dates
/// print as `yyyymmdd` and errors print with a leading quote.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.block {
            None => Ok(()),
            Some(b) => write_block(f, b),
        }
    }
}

fn write_elements<T>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    mut one: impl FnMut(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        one(f, item)?;
    }
    Ok(())
}

fn write_block(f: &mut fmt::Formatter<'_>, block: &Block) -> fmt::Result {
    let date = block.data_type() == Type::Date;
    match block.storage() {
        Storage::Boolean(v) => write_elements(f, v, |f, b| f.write_str(if *b { "true" } else { "false" })),
        Storage::Guid(v) => write_elements(f, v, |f, g| {
            g.iter().try_for_each(|b| write!(f, "{b:02x}"))
        }),
        Storage::Byte(v) => write_elements(f, v, |f, b| write!(f, "0x{b:02x}")),
        Storage::Short(v) => write_elements(f, v, |f, x| write!(f, "{x}")),
        Storage::Int(v) if date => write_elements(f, v, |f, d| match temporal::date_to_yyyymmdd(*d) {
            Some(ymd) => write!(f, "{ymd}"),
            None => f.write_str("0N"),
        }),
        Storage::Int(v) => write_elements(f, v, |f, x| write!(f, "{x}")),
        Storage::Long(v) => write_elements(f, v, |f, x| write!(f, "{x}")),
        Storage::Real(v) => write_elements(f, v, |f, x| write!(f, "{x}")),
        Storage::Float(v) => write_elements(f, v, |f, x| write!(f, "{x}")),
        Storage::Char(v) => f.write_str(&String::from_utf8_lossy(v)),
        Storage::Symbol(v) => write_elements(f, v, |f, s| f.write_str(s)),
        Storage::Message(m) => write!(f, "'{m}"),
        Storage::Children(children) => match block.struct_type() {
            StructType::List => {
                f.write_str("(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        f.write_str(";")?;
                    }
                    write_block(f, child)?;
                }
                f.write_str(")")
            }
            StructType::Dictionary | StructType::Table => {
                if block.struct_type() == StructType::Table {
                    f.write_str("+")?;
                }
                let [keys, values] = children.as_slice() else {
                    return Ok(());
                };
                write_block(f, keys)?;
                f.write_str("!")?;
                write_block(f, values)
            }
            _ => f.write_str("<function>"),
        },
    }
}
