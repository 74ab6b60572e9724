//! Dictionary view

use std::sync::Arc;

use crate::block::BlockRef;
use crate::error::{AccessError, Result};
use crate::native::Symbol;
use crate::types::{Attribute, StructType};
use crate::value::Value;

/// Keys and values of a kdb+ dictionary.
#[derive(Debug, Clone)]
pub struct Dictionary {
    source: BlockRef,
    keys: Value,
    values: Value,
}

impl Dictionary {
    pub(crate) fn from_block(block: &BlockRef) -> Result<Dictionary> {
        let [keys, values] = block.children() else {
            return Err(AccessError::Malformed("dictionary: expected keys and values"));
        };
        Ok(Dictionary {
            source: Arc::clone(block),
            keys: Value::retain(keys),
            values: Value::retain(values),
        })
    }

    /// Key side.
    pub fn keys(&self) -> &Value {
        &self.keys
    }

    /// Value side.
    pub fn values(&self) -> &Value {
        &self.values
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        match self.keys.struct_type() {
            StructType::Table => self.keys.as_table().map_or(0, |t| t.row_count()),
            _ => self.keys.size(),
        }
    }

    /// True when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Attribute of the dictionary (`Sorted` for `s#` dictionaries).
    pub fn attribute(&self) -> Attribute {
        self.source.attribute()
    }

    /// True when both sides are tables.
    pub fn is_keyed_table(&self) -> bool {
        self.keys.struct_type() == StructType::Table
            && self.values.struct_type() == StructType::Table
    }

    /// Value stored under symbol key `name`.
    ///
    /// Returns `None` when the keys are not symbols or `name` is absent.
    pub fn lookup_symbol(&self, name: &str) -> Option<Value> {
        let keys = self.keys.as_vector::<Symbol>().ok()?;
        let i = keys.iter_str().position(|k| k == name)?;
        self.values.item(i).ok()
    }

    /// The value this view was built from.
    pub fn to_value(&self) -> Value {
        Value::retain(&self.source)
    }
}
