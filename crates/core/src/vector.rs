//! Typed vector views
//!
//! A [`Vector<K>`] borrows the elements of a vector block without copying
//! them. It holds its own counted reference to the block, so it stays
//! valid after the `Value` it came from is dropped.

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

use crate::block::BlockRef;
use crate::error::{AccessError, Result};
use crate::native::{Char, KdbType, Native, Symbol};
use crate::types::{Attribute, StructType};
use crate::value::Value;

/// Elements of `block` as `K`'s native type, after checking category and tag.
pub(crate) fn typed_slice<K: KdbType>(block: &BlockRef) -> Result<&[K::Native]> {
    let actual = block.struct_type();
    if actual != StructType::Vector {
        return Err(AccessError::WrongStructure {
            expected: StructType::Vector,
            actual,
        });
    }
    let ty = block.data_type();
    if ty != K::TYPE {
        return Err(AccessError::TypeMismatch {
            expected: K::TYPE,
            actual: ty,
        });
    }
    K::Native::slice(block.storage()).ok_or(AccessError::StorageMismatch { tag: block.tag() })
}

/// Bounds-checked, iterable view of a kdb+ vector of type `K`.
///
/// # Example
///
/// ```
/// use qlink_core::{Block, Long, Value};
///
/// let value = Value::from(Block::vector::<Long>(vec![1, 2, 3]));
/// let v = value.as_vector::<Long>().unwrap();
/// assert_eq!(v.len(), 3);
/// assert_eq!(v[1], 2);
/// assert_eq!(v.iter().rev().copied().collect::<Vec<_>>(), vec![3, 2, 1]);
/// ```
pub struct Vector<K: KdbType> {
    block: BlockRef,
    len: usize,
    _kind: PhantomData<K>,
}

impl<K: KdbType> Vector<K> {
    pub(crate) fn from_block(block: &BlockRef) -> Result<Self> {
        let len = typed_slice::<K>(block)?.len();
        Ok(Vector {
            block: Arc::clone(block),
            len,
            _kind: PhantomData,
        })
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the vector has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All elements.
    pub fn as_slice(&self) -> &[K::Native] {
        // The storage variant was checked when the view was built.
        K::Native::slice(self.block.storage()).unwrap_or_default()
    }

    /// Element `i`, or `None` past the end.
    #[inline]
    pub fn get(&self, i: usize) -> Option<&K::Native> {
        self.as_slice().get(i)
    }

    /// Element `i` without a bounds check.
    ///
    /// # Safety
    ///
    /// `i` must be less than `self.len()`.
    #[inline]
    pub unsafe fn get_unchecked(&self, i: usize) -> &K::Native {
        self.as_slice().get_unchecked(i)
    }

    /// Front-to-back iterator; use `.rev()` for back-to-front.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, K::Native> {
        self.as_slice().iter()
    }

    /// Mutable elements.
    ///
    /// The block is copied first if anything else holds a reference to it,
    /// so writes never show through other values or views.
    pub fn as_mut_slice(&mut self) -> &mut [K::Native] {
        let block = Arc::make_mut(&mut self.block);
        K::Native::slice_mut(block.storage_mut()).unwrap_or_default()
    }

    /// Copy the elements out.
    pub fn to_vec(&self) -> Vec<K::Native> {
        self.as_slice().to_vec()
    }

    /// Attribute of the underlying vector.
    pub fn attribute(&self) -> Attribute {
        self.block.attribute()
    }

    /// Current reference count of the underlying block.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.block)
    }

    /// A `Value` sharing the underlying block.
    pub fn to_value(&self) -> Value {
        Value::retain(&self.block)
    }
}

impl Vector<Symbol> {
    /// Symbols as string slices.
    pub fn iter_str(&self) -> impl DoubleEndedIterator<Item = &str> + '_ {
        self.iter().map(String::as_str)
    }
}

impl Vector<Char> {
    /// Raw characters.
    pub fn as_bytes(&self) -> &[u8] {
        self.as_slice()
    }

    /// Characters as a string, replacing invalid UTF-8.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_slice()).into_owned()
    }
}

impl<K: KdbType> Clone for Vector<K> {
    fn clone(&self) -> Self {
        Vector {
            block: Arc::clone(&self.block),
            len: self.len,
            _kind: PhantomData,
        }
    }
}

impl<K: KdbType> fmt::Debug for Vector<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector<{}>", K::TYPE)?;
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<K: KdbType> Index<usize> for Vector<K> {
    type Output = K::Native;

    fn index(&self, i: usize) -> &K::Native {
        &self.as_slice()[i]
    }
}

impl<K: KdbType> IndexMut<usize> for Vector<K> {
    fn index_mut(&mut self, i: usize) -> &mut K::Native {
        &mut self.as_mut_slice()[i]
    }
}

impl<K: KdbType> AsRef<[K::Native]> for Vector<K> {
    fn as_ref(&self) -> &[K::Native] {
        self.as_slice()
    }
}

impl<'a, K: KdbType> IntoIterator for &'a Vector<K> {
    type Item = &'a K::Native;
    type IntoIter = std::slice::Iter<'a, K::Native>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: KdbType> PartialEq<[K::Native]> for Vector<K> {
    fn eq(&self, other: &[K::Native]) -> bool {
        self.as_slice() == other
    }
}

impl<K: KdbType> PartialEq<Vec<K::Native>> for Vector<K> {
    fn eq(&self, other: &Vec<K::Native>) -> bool {
        self.as_slice() == other.as_slice()
    }
}
