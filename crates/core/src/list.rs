//! General list view

use std::sync::Arc;

use crate::block::BlockRef;
use crate::value::Value;

/// Items of a general (mixed) list.
#[derive(Debug, Clone)]
pub struct List {
    block: BlockRef,
}

impl List {
    pub(crate) fn from_block(block: &BlockRef) -> List {
        List {
            block: Arc::clone(block),
        }
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.block.children().len()
    }

    /// True when the list has no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Item `i`, sharing its block.
    pub fn get(&self, i: usize) -> Option<Value> {
        self.block.children().get(i).map(Value::retain)
    }

    /// Items front to back.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Value> + ExactSizeIterator + '_ {
        self.block.children().iter().map(Value::retain)
    }

    /// The value this view was built from.
    pub fn to_value(&self) -> Value {
        Value::retain(&self.block)
    }
}
