//! Compile-time mapping from kdb+ types to native Rust types
//!
//! Each primitive element type gets a zero-sized marker implementing
//! [`KdbType`]. The marker selects the accessor's return type and the
//! [`Storage`] variant holding its elements. Temporal types share storage
//! with the integer or float type of the same width:
//!
//! | Marker | Native |
//! |--------|--------|
//! | `Boolean` | `bool` |
//! | `Byte`, `Char` | `u8` |
//! | `Short` | `i16` |
//! | `Int`, `Month`, `Date`, `Minute`, `Second`, `Time` | `i32` |
//! | `Long`, `Timestamp`, `Timespan` | `i64` |
//! | `Real` | `f32` |
//! | `Float`, `Datetime` | `f64` |
//! | `Symbol` | `String` |
//!
//! GUID has no marker: its payload is decoded but not exposed.

use std::fmt;

use crate::block::Storage;
use crate::types::Type;

mod sealed {
    pub trait Sealed {}
}

/// Native element type stored in a [`Storage`] variant.
///
/// This is the width-based view used by the trusted accessors
/// (`Value::get_as`, `Table::cell_as`): it ignores the tag and only asks
/// whether the storage holds elements of this native type.
pub trait Native: Clone + PartialEq + fmt::Debug + Send + Sync + 'static + sealed::Sealed {
    /// Elements of `storage` when it holds this native type.
    fn slice(storage: &Storage) -> Option<&[Self]>;

    /// Mutable elements of `storage` when it holds this native type.
    fn slice_mut(storage: &mut Storage) -> Option<&mut [Self]>;
}

macro_rules! impl_native {
    ($($native:ty => $($variant:ident)|+;)*) => {
        $(
            impl sealed::Sealed for $native {}

            impl Native for $native {
                #[inline]
                fn slice(storage: &Storage) -> Option<&[Self]> {
                    match storage {
                        $(Storage::$variant(v) => Some(v.as_slice()),)+
                        _ => None,
                    }
                }

                #[inline]
                fn slice_mut(storage: &mut Storage) -> Option<&mut [Self]> {
                    match storage {
                        $(Storage::$variant(v) => Some(v.as_mut_slice()),)+
                        _ => None,
                    }
                }
            }
        )*
    };
}

impl_native! {
    bool => Boolean;
    u8 => Byte | Char;
    i16 => Short;
    i32 => Int;
    i64 => Long;
    f32 => Real;
    f64 => Float;
    String => Symbol;
}

/// A kdb+ primitive element type known at compile time.
pub trait KdbType: Send + Sync + 'static + sealed::Sealed {
    /// Runtime type this marker stands for.
    const TYPE: Type;

    /// Native element type.
    type Native: Native;

    /// Wrap native elements into the storage variant of this type.
    fn into_storage(values: Vec<Self::Native>) -> Storage;
}

macro_rules! kdb_types {
    ($($(#[$doc:meta])* $name:ident => $native:ty, $variant:ident;)*) => {
        $(
            $(#[$doc])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name;

            impl sealed::Sealed for $name {}

            impl KdbType for $name {
                const TYPE: Type = Type::$name;
                type Native = $native;

                #[inline]
                fn into_storage(values: Vec<$native>) -> Storage {
                    Storage::$variant(values)
                }
            }
        )*
    };
}

kdb_types! {
    /// Boolean, stored as `bool`.
    Boolean => bool, Boolean;
    /// Byte, stored as `u8`.
    Byte => u8, Byte;
    /// 16-bit integer.
    Short => i16, Short;
    /// 32-bit integer.
    Int => i32, Int;
    /// 64-bit integer.
    Long => i64, Long;
    /// 32-bit float.
    Real => f32, Real;
    /// 64-bit float.
    Float => f64, Float;
    /// Character, stored as a raw `u8`.
    Char => u8, Char;
    /// Symbol, stored as an owned string.
    Symbol => String, Symbol;
    /// Nanoseconds since 2000.01.01.
    Timestamp => i64, Long;
    /// Months since 2000.01.
    Month => i32, Int;
    /// Days since 2000.01.01.
    Date => i32, Int;
    /// Fractional days since 2000.01.01.
    Datetime => f64, Float;
    /// Nanosecond duration.
    Timespan => i64, Long;
    /// Minutes.
    Minute => i32, Int;
    /// Seconds.
    Second => i32, Int;
    /// Milliseconds since midnight.
    Time => i32, Int;
}
