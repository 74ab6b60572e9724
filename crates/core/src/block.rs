//! Reference-counted kdb+ object blocks
//!
//! A [`Block`] is one node of the kdb+ object graph: a signed tag, an
//! attribute and its payload. Blocks are immutable once built and are
//! shared as [`BlockRef`] (`Arc<Block>`):
//!
//! - retain = `Arc::clone`
//! - release = drop
//! - the strong count is the block's reference count
//!
//! Compound blocks (lists, dictionaries, tables, functions) hold their
//! children as `BlockRef`s, so a view over a child keeps the child alive
//! independently of the parent.

use std::sync::Arc;

use crate::error::{AccessError, Result};
use crate::native::{KdbType, Symbol};
use crate::types::{Attribute, StructType, Type, ERROR_TAG, SORTED_DICT_TAG};

/// Shared handle to a block.
pub type BlockRef = Arc<Block>;

/// Generic null `::`.
pub const GENERIC_NULL_TAG: i8 = 101;

/// Payload of a block, one variant per native storage width.
#[derive(Debug, Clone, PartialEq)]
pub enum Storage {
    /// `bool` elements
    Boolean(Vec<bool>),
    /// 16-byte GUIDs
    Guid(Vec<[u8; 16]>),
    /// Bytes
    Byte(Vec<u8>),
    /// `i16` elements
    Short(Vec<i16>),
    /// `i32` elements (int, month, date, minute, second, time)
    Int(Vec<i32>),
    /// `i64` elements (long, timestamp, timespan)
    Long(Vec<i64>),
    /// `f32` elements
    Real(Vec<f32>),
    /// `f64` elements (float, datetime)
    Float(Vec<f64>),
    /// Characters
    Char(Vec<u8>),
    /// Symbols
    Symbol(Vec<String>),
    /// Child blocks of lists, dictionaries, tables and functions
    Children(Vec<BlockRef>),
    /// Error text
    Message(String),
}

impl Storage {
    /// Number of elements (children for compound storage, 1 for a message).
    pub fn len(&self) -> usize {
        match self {
            Storage::Boolean(v) => v.len(),
            Storage::Guid(v) => v.len(),
            Storage::Byte(v) | Storage::Char(v) => v.len(),
            Storage::Short(v) => v.len(),
            Storage::Int(v) => v.len(),
            Storage::Long(v) => v.len(),
            Storage::Real(v) => v.len(),
            Storage::Float(v) => v.len(),
            Storage::Symbol(v) => v.len(),
            Storage::Children(v) => v.len(),
            Storage::Message(_) => 1,
        }
    }

    /// True when there are no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy element `i` into a one-element storage of the same variant.
    pub(crate) fn element(&self, i: usize) -> Option<Storage> {
        let one = match self {
            Storage::Boolean(v) => Storage::Boolean(vec![*v.get(i)?]),
            Storage::Guid(v) => Storage::Guid(vec![*v.get(i)?]),
            Storage::Byte(v) => Storage::Byte(vec![*v.get(i)?]),
            Storage::Short(v) => Storage::Short(vec![*v.get(i)?]),
            Storage::Int(v) => Storage::Int(vec![*v.get(i)?]),
            Storage::Long(v) => Storage::Long(vec![*v.get(i)?]),
            Storage::Real(v) => Storage::Real(vec![*v.get(i)?]),
            Storage::Float(v) => Storage::Float(vec![*v.get(i)?]),
            Storage::Char(v) => Storage::Char(vec![*v.get(i)?]),
            Storage::Symbol(v) => Storage::Symbol(vec![v.get(i)?.clone()]),
            Storage::Children(_) | Storage::Message(_) => return None,
        };
        Some(one)
    }

    /// Whether this storage variant is the one used by `ty`.
    fn holds(&self, ty: Type) -> bool {
        matches!(
            (ty, self),
            (Type::Boolean, Storage::Boolean(_))
                | (Type::Guid, Storage::Guid(_))
                | (Type::Byte, Storage::Byte(_))
                | (Type::Short, Storage::Short(_))
                | (
                    Type::Int | Type::Month | Type::Date | Type::Minute | Type::Second | Type::Time,
                    Storage::Int(_)
                )
                | (Type::Long | Type::Timestamp | Type::Timespan, Storage::Long(_))
                | (Type::Real, Storage::Real(_))
                | (Type::Float | Type::Datetime, Storage::Float(_))
                | (Type::Char, Storage::Char(_))
                | (Type::Symbol, Storage::Symbol(_))
                | (Type::List, Storage::Children(_))
                | (Type::Error, Storage::Message(_))
        )
    }

    /// Check that this storage can back a block with `tag`.
    fn fits(&self, tag: i8) -> bool {
        // Sorted dictionaries live as tag 99 with `Attribute::Sorted`.
        if tag == SORTED_DICT_TAG {
            return false;
        }
        let Some(ty) = Type::from_tag(tag) else {
            return false;
        };
        match ty {
            Type::Table | Type::Dict => matches!(self, Storage::Children(c) if c.len() == 2),
            // Primitive references (101..=103) carry one byte, the rest children.
            Type::Function => match (tag, self) {
                (101..=103, Storage::Byte(b)) => b.len() == 1,
                (101..=103, _) => false,
                (_, storage) => matches!(storage, Storage::Children(_)),
            },
            _ if tag < 0 && tag != ERROR_TAG => self.holds(ty) && self.len() == 1,
            _ => self.holds(ty),
        }
    }
}

/// One tagged kdb+ object.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    tag: i8,
    attr: Attribute,
    storage: Storage,
}

impl Block {
    /// Build a block from its raw parts.
    ///
    /// Fails with [`AccessError::StorageMismatch`] when the storage variant
    /// cannot back `tag` (wrong width, atom with more than one element,
    /// dictionary or table without exactly two children). Tag 127 is never
    /// stored; build a dictionary with [`Attribute::Sorted`] instead.
    pub fn new(tag: i8, attr: Attribute, storage: Storage) -> Result<Block> {
        if !storage.fits(tag) {
            return Err(AccessError::StorageMismatch { tag });
        }
        Ok(Block { tag, attr, storage })
    }

    /// Atom of a primitive type.
    pub fn atom<K: KdbType>(value: K::Native) -> Block {
        Block {
            tag: -K::TYPE.code(),
            attr: Attribute::None,
            storage: K::into_storage(vec![value]),
        }
    }

    /// Vector of a primitive type.
    pub fn vector<K: KdbType>(values: Vec<K::Native>) -> Block {
        Block {
            tag: K::TYPE.code(),
            attr: Attribute::None,
            storage: K::into_storage(values),
        }
    }

    /// GUID vector.
    pub fn guids(values: Vec<[u8; 16]>) -> Block {
        Block {
            tag: Type::Guid.code(),
            attr: Attribute::None,
            storage: Storage::Guid(values),
        }
    }

    /// General list.
    pub fn list(children: Vec<BlockRef>) -> Block {
        Block {
            tag: Type::List.code(),
            attr: Attribute::None,
            storage: Storage::Children(children),
        }
    }

    /// Dictionary mapping `keys` to `values`.
    pub fn dict(keys: BlockRef, values: BlockRef) -> Block {
        Block {
            tag: Type::Dict.code(),
            attr: Attribute::None,
            storage: Storage::Children(vec![keys, values]),
        }
    }

    /// Table with the given column names and column blocks.
    pub fn table(header: Vec<String>, columns: Vec<BlockRef>) -> Result<Block> {
        if header.len() != columns.len() {
            return Err(AccessError::Malformed("table: header and column counts differ"));
        }
        let header = Arc::new(Block::vector::<Symbol>(header));
        let columns = Arc::new(Block::list(columns));
        Ok(Block {
            tag: Type::Table.code(),
            attr: Attribute::None,
            storage: Storage::Children(vec![header, columns]),
        })
    }

    /// Error block carrying a server message.
    pub fn error(message: impl Into<String>) -> Block {
        Block {
            tag: ERROR_TAG,
            attr: Attribute::None,
            storage: Storage::Message(message.into()),
        }
    }

    /// Generic null `::`.
    pub fn generic_null() -> Block {
        Block {
            tag: GENERIC_NULL_TAG,
            attr: Attribute::None,
            storage: Storage::Byte(vec![0]),
        }
    }

    /// Replace the attribute.
    pub fn with_attribute(mut self, attr: Attribute) -> Block {
        self.attr = attr;
        self
    }

    /// Move the block into a shared handle.
    pub fn into_ref(self) -> BlockRef {
        Arc::new(self)
    }

    /// Raw signed tag.
    #[inline]
    pub fn tag(&self) -> i8 {
        self.tag
    }

    /// Attribute byte, decoded.
    #[inline]
    pub fn attribute(&self) -> Attribute {
        self.attr
    }

    /// Payload.
    #[inline]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[inline]
    pub(crate) fn storage_mut(&mut self) -> &mut Storage {
        &mut self.storage
    }

    /// Structural category of the tag.
    #[inline]
    pub fn struct_type(&self) -> StructType {
        StructType::from_tag(self.tag)
    }

    /// Data type with the atom sign removed.
    #[inline]
    pub fn data_type(&self) -> Type {
        // Constructors only accept tags that map to a type.
        Type::from_tag(self.tag).unwrap_or(Type::Error)
    }

    /// Child blocks; empty for non-compound storage.
    pub fn children(&self) -> &[BlockRef] {
        match &self.storage {
            Storage::Children(c) => c,
            _ => &[],
        }
    }

    /// Message of an error block.
    pub fn message(&self) -> Option<&str> {
        match &self.storage {
            Storage::Message(m) => Some(m),
            _ => None,
        }
    }

    /// True for a generic null `::`.
    pub fn is_generic_null(&self) -> bool {
        self.tag == GENERIC_NULL_TAG && matches!(&self.storage, Storage::Byte(b) if b[..] == [0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::{Float, Long, Timestamp};

    #[test]
    fn test_atom_tag_is_negative() {
        let b = Block::atom::<Long>(42);
        assert_eq!(b.tag(), -7);
        assert_eq!(b.struct_type(), StructType::Atom);
        assert_eq!(b.data_type(), Type::Long);
        assert_eq!(b.storage(), &Storage::Long(vec![42]));
    }

    #[test]
    fn test_new_rejects_mismatched_storage() {
        assert!(Block::new(7, Attribute::None, Storage::Long(vec![1, 2])).is_ok());
        assert!(Block::new(12, Attribute::None, Storage::Long(vec![1])).is_ok());
        assert_eq!(
            Block::new(7, Attribute::None, Storage::Int(vec![1])),
            Err(AccessError::StorageMismatch { tag: 7 })
        );
        // Atoms carry exactly one element.
        assert!(Block::new(-7, Attribute::None, Storage::Long(vec![1, 2])).is_err());
        assert!(Block::new(98, Attribute::None, Storage::Children(vec![])).is_err());
        assert!(Block::new(3, Attribute::None, Storage::Byte(vec![])).is_err());
        assert!(Block::new(101, Attribute::None, Storage::Byte(vec![0])).is_ok());
        assert!(Block::new(ERROR_TAG, Attribute::None, Storage::Message("x".into())).is_ok());

        let keys = Block::vector::<Symbol>(vec!["a".into()]).into_ref();
        let values = Block::vector::<Long>(vec![1]).into_ref();
        let parts = Storage::Children(vec![keys, values]);
        assert_eq!(
            Block::new(SORTED_DICT_TAG, Attribute::None, parts.clone()),
            Err(AccessError::StorageMismatch { tag: SORTED_DICT_TAG })
        );
        let sorted = Block::new(99, Attribute::Sorted, parts).unwrap();
        assert_eq!(sorted.struct_type(), StructType::Dictionary);
        assert_eq!(sorted.data_type(), Type::Dict);
    }

    #[test]
    fn test_table_requires_matching_header() {
        let col = Block::vector::<Long>(vec![1, 2]).into_ref();
        assert!(Block::table(vec!["a".into(), "b".into()], vec![col.clone()]).is_err());

        let table = Block::table(vec!["a".into()], vec![col]).unwrap();
        assert_eq!(table.struct_type(), StructType::Table);
        assert_eq!(table.children().len(), 2);
        assert_eq!(table.children()[0].data_type(), Type::Symbol);
        assert_eq!(table.children()[1].struct_type(), StructType::List);
    }

    #[test]
    fn test_children_shared_not_copied() {
        let col = Block::vector::<Float>(vec![1.5]).into_ref();
        let list = Block::list(vec![col.clone(), col.clone()]).into_ref();
        assert_eq!(Arc::strong_count(&col), 3);
        drop(list);
        assert_eq!(Arc::strong_count(&col), 1);
    }

    #[test]
    fn test_generic_null_and_error() {
        assert!(Block::generic_null().is_generic_null());
        assert_eq!(Block::generic_null().struct_type(), StructType::Unknown);

        let err = Block::error("type");
        assert_eq!(err.message(), Some("type"));
        assert_eq!(err.struct_type(), StructType::Error);
        assert_eq!(err.data_type(), Type::Error);
    }

    #[test]
    fn test_with_attribute() {
        let b = Block::vector::<Timestamp>(vec![1, 2]).with_attribute(Attribute::Sorted);
        assert_eq!(b.attribute(), Attribute::Sorted);
    }
}
