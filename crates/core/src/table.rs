//! Table and keyed table views
//!
//! A kdb+ table (tag 98) is a flipped dictionary: a symbol vector of
//! column names and a general list of equal-length columns. A keyed table
//! is a dictionary (tag 99) whose key and value are both tables.
//!
//! [`Table`] gives column-oriented access to either. For a keyed table the
//! key columns come first, followed by the value columns, and
//! [`Table::key_count`] tells how many leading columns are keys.

use std::sync::Arc;

use crate::block::{Block, BlockRef};
use crate::error::{AccessError, Result};
use crate::native::{KdbType, Native, Symbol};
use crate::types::StructType;
use crate::value::Value;
use crate::vector::{typed_slice, Vector};

/// Column-oriented view of a table.
///
/// # Example
///
/// ```
/// use qlink_core::{Block, Long, Value};
///
/// let table = Block::table(
///     vec!["a".into()],
///     vec![Block::vector::<Long>(vec![1, 2, 3]).into_ref()],
/// )
/// .unwrap();
/// let t = Value::from(table).as_table().unwrap();
/// assert_eq!(t.row_count(), 3);
/// assert_eq!(t.column::<Long>(0).unwrap(), vec![1, 2, 3]);
/// ```
#[derive(Debug, Clone)]
pub struct Table {
    source: Value,
    header: Vector<Symbol>,
    columns: Vec<Value>,
    rows: usize,
    keys: usize,
}

impl Table {
    pub(crate) fn from_block(block: &BlockRef) -> Result<Table> {
        match block.struct_type() {
            StructType::Table => Table::flip(block),
            StructType::Dictionary => KeyedTable::from_block(block)?.to_table(),
            actual => Err(AccessError::WrongStructure {
                expected: StructType::Table,
                actual,
            }),
        }
    }

    fn flip(block: &BlockRef) -> Result<Table> {
        let [header, list] = block.children() else {
            return Err(AccessError::Malformed("table: expected header and columns"));
        };
        let header = Vector::<Symbol>::from_block(header)?;
        if list.struct_type() != StructType::List {
            return Err(AccessError::Malformed("table: columns are not a general list"));
        }
        let columns: Vec<Value> = list.children().iter().map(Value::retain).collect();
        if header.len() != columns.len() {
            return Err(AccessError::Malformed("table: header and column counts differ"));
        }
        let rows = columns.first().map_or(0, Value::size);
        Ok(Table {
            source: Value::retain(block),
            header,
            columns,
            rows,
            keys: 0,
        })
    }

    /// Number of columns.
    #[inline]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Number of rows, taken from the first column.
    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows
    }

    /// Number of leading key columns; 0 for an unkeyed table.
    #[inline]
    pub fn key_count(&self) -> usize {
        self.keys
    }

    /// Column names.
    pub fn header(&self) -> Vector<Symbol> {
        self.header.clone()
    }

    /// Column names as string slices.
    pub fn column_names(&self) -> Vec<&str> {
        self.header.iter_str().collect()
    }

    /// Position of the column called `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter_str().position(|c| c == name)
    }

    /// Column `i` as an untyped value.
    pub fn column_value(&self, i: usize) -> Option<Value> {
        self.columns.get(i).cloned()
    }

    fn column_at(&self, i: usize) -> Result<&Value> {
        self.columns.get(i).ok_or(AccessError::IndexOutOfBounds {
            index: i,
            len: self.columns.len(),
        })
    }

    /// Column `i` as a vector of `K`.
    pub fn column<K: KdbType>(&self, i: usize) -> Result<Vector<K>> {
        self.column_at(i)?.as_vector::<K>()
    }

    /// Column called `name` as a vector of `K`.
    pub fn column_by_name<K: KdbType>(&self, name: &str) -> Result<Vector<K>> {
        let i = self
            .column_index(name)
            .ok_or_else(|| AccessError::ColumnNotFound(name.to_string()))?;
        self.column::<K>(i)
    }

    /// Cell at `row` of column `col`, checked for bounds and type.
    pub fn cell<K: KdbType>(&self, row: usize, col: usize) -> Result<K::Native> {
        let block = self.column_at(col)?.block().ok_or(AccessError::Null)?;
        let values = typed_slice::<K>(block)?;
        values
            .get(row)
            .cloned()
            .ok_or(AccessError::IndexOutOfBounds {
                index: row,
                len: values.len(),
            })
    }

    /// Cell at `row` of column `col` read by storage width only.
    ///
    /// Returns `None` out of range, for non-vector columns, or when the
    /// column is not stored as `N`.
    pub fn cell_as<N: Native>(&self, row: usize, col: usize) -> Option<N> {
        let block = self.columns.get(col)?.block()?;
        if block.struct_type() != StructType::Vector {
            return None;
        }
        N::slice(block.storage())?.get(row).cloned()
    }

    /// The value this view was built from.
    pub fn to_value(&self) -> Value {
        self.source.clone()
    }
}

/// Keyed table: a dictionary from a key table to a value table.
#[derive(Debug, Clone)]
pub struct KeyedTable {
    source: BlockRef,
    keys: Table,
    values: Table,
}

impl KeyedTable {
    pub(crate) fn from_block(block: &BlockRef) -> Result<KeyedTable> {
        let actual = block.struct_type();
        if actual != StructType::Dictionary {
            return Err(AccessError::WrongStructure {
                expected: StructType::Dictionary,
                actual,
            });
        }
        let [keys, values] = block.children() else {
            return Err(AccessError::Malformed("dictionary: expected keys and values"));
        };
        for side in [keys, values] {
            let actual = side.struct_type();
            if actual != StructType::Table {
                return Err(AccessError::WrongStructure {
                    expected: StructType::Table,
                    actual,
                });
            }
        }
        Ok(KeyedTable {
            source: Arc::clone(block),
            keys: Table::flip(keys)?,
            values: Table::flip(values)?,
        })
    }

    /// Key columns.
    pub fn keys(&self) -> &Table {
        &self.keys
    }

    /// Value columns.
    pub fn values(&self) -> &Table {
        &self.values
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.keys.row_count()
    }

    /// Single view with key columns followed by value columns.
    pub fn to_table(&self) -> Result<Table> {
        let names: Vec<String> = self
            .keys
            .header
            .iter()
            .chain(self.values.header.iter())
            .cloned()
            .collect();
        let header = Block::vector::<Symbol>(names).into_ref();
        let columns: Vec<Value> = self
            .keys
            .columns
            .iter()
            .chain(self.values.columns.iter())
            .cloned()
            .collect();
        Ok(Table {
            source: Value::retain(&self.source),
            header: Vector::from_block(&header)?,
            columns,
            rows: self.keys.rows,
            keys: self.keys.column_count(),
        })
    }

    /// The dictionary this view was built from.
    pub fn to_value(&self) -> Value {
        Value::retain(&self.source)
    }
}
