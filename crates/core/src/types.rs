//! kdb+ type tags
//!
//! Every object on the wire starts with one signed tag byte:
//!
//! | Tag | Category |
//! |-----|----------|
//! | `< 0` | Atom of the element type `-tag` |
//! | `0` | General (heterogeneous) list |
//! | `1..=19` | Vector of one primitive element type |
//! | `98` | Table |
//! | `99` | Dictionary (or keyed table) |
//! | `100..=111` | Functions, including generic null `::` |
//! | `-128` | Error |
//!
//! See <https://code.kx.com/q/ref/card/#datatypes>.

use std::fmt;

/// Tag of an error block.
pub const ERROR_TAG: i8 = -128;

/// Tag of a sorted dictionary on the wire (`s#` applied to a dictionary).
pub const SORTED_DICT_TAG: i8 = 127;

/// Data type of a kdb+ object, with the sign of the tag removed.
///
/// Atoms and vectors of the same element type report the same `Type`;
/// use [`StructType`] to tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum Type {
    /// General list (tag 0).
    List = 0,
    /// Boolean (`b`).
    Boolean = 1,
    /// GUID (`g`). Decoded but not exposed through typed accessors.
    Guid = 2,
    /// Byte (`x`).
    Byte = 4,
    /// 16-bit integer (`h`).
    Short = 5,
    /// 32-bit integer (`i`).
    Int = 6,
    /// 64-bit integer (`j`).
    Long = 7,
    /// 32-bit float (`e`).
    Real = 8,
    /// 64-bit float (`f`).
    Float = 9,
    /// Character (`c`).
    Char = 10,
    /// Interned symbol (`s`).
    Symbol = 11,
    /// Nanoseconds since 2000.01.01 (`p`).
    Timestamp = 12,
    /// Months since 2000.01 (`m`).
    Month = 13,
    /// Days since 2000.01.01 (`d`).
    Date = 14,
    /// Fractional days since 2000.01.01 (`z`).
    Datetime = 15,
    /// Nanosecond duration (`n`).
    Timespan = 16,
    /// Minutes (`u`).
    Minute = 17,
    /// Seconds (`v`).
    Second = 18,
    /// Milliseconds (`t`).
    Time = 19,
    /// Table (flip of a column dictionary).
    Table = 98,
    /// Dictionary, possibly a keyed table.
    Dict = 99,
    /// Lambdas, primitives, projections and generic null (tags 100..=111).
    Function = 100,
    /// Error. Also reported by empty values.
    Error = -128,
}

impl Type {
    /// Map a non-negative type code to its `Type`.
    pub fn from_code(code: i8) -> Option<Type> {
        let ty = match code {
            0 => Type::List,
            1 => Type::Boolean,
            2 => Type::Guid,
            4 => Type::Byte,
            5 => Type::Short,
            6 => Type::Int,
            7 => Type::Long,
            8 => Type::Real,
            9 => Type::Float,
            10 => Type::Char,
            11 => Type::Symbol,
            12 => Type::Timestamp,
            13 => Type::Month,
            14 => Type::Date,
            15 => Type::Datetime,
            16 => Type::Timespan,
            17 => Type::Minute,
            18 => Type::Second,
            19 => Type::Time,
            98 => Type::Table,
            99 | SORTED_DICT_TAG => Type::Dict,
            100..=111 => Type::Function,
            _ => return None,
        };
        Some(ty)
    }

    /// Map a raw signed tag to its `Type`, removing the atom sign.
    pub fn from_tag(tag: i8) -> Option<Type> {
        if tag == ERROR_TAG {
            Some(Type::Error)
        } else if tag < 0 {
            // Only primitive element types have atom forms.
            Type::from_code(-tag).filter(|ty| ty.is_primitive())
        } else {
            Type::from_code(tag)
        }
    }

    /// The non-negative wire code (−128 for [`Type::Error`]).
    #[inline]
    pub fn code(self) -> i8 {
        self as i8
    }

    /// Tag of an atom of this type, for primitive element types.
    pub fn atom_tag(self) -> Option<i8> {
        self.is_primitive().then(|| -self.code())
    }

    /// Tag of a vector of this type, for primitive element types.
    pub fn vector_tag(self) -> Option<i8> {
        self.is_primitive().then(|| self.code())
    }

    /// True for the element types that have atom and vector forms (1..=19).
    #[inline]
    pub fn is_primitive(self) -> bool {
        (1..20).contains(&self.code())
    }

    /// True for the six temporal types sharing int/long/double storage,
    /// plus the 32-bit time-of-day types.
    pub fn is_temporal(self) -> bool {
        matches!(
            self,
            Type::Timestamp
                | Type::Month
                | Type::Date
                | Type::Datetime
                | Type::Timespan
                | Type::Minute
                | Type::Second
                | Type::Time
        )
    }

    /// Width in bytes of one element in native storage.
    ///
    /// `None` for variable-width or compound types (symbol, list, table,
    /// dictionary, function, error).
    pub fn element_width(self) -> Option<usize> {
        let width = match self {
            Type::Boolean | Type::Byte | Type::Char => 1,
            Type::Guid => 16,
            Type::Short => 2,
            Type::Int
            | Type::Real
            | Type::Month
            | Type::Date
            | Type::Minute
            | Type::Second
            | Type::Time => 4,
            Type::Long | Type::Float | Type::Timestamp | Type::Datetime | Type::Timespan => 8,
            Type::Symbol
            | Type::List
            | Type::Table
            | Type::Dict
            | Type::Function
            | Type::Error => return None,
        };
        Some(width)
    }

    /// Lower-case type name as printed by q's `.Q.ty`-style tools.
    pub fn name(self) -> &'static str {
        match self {
            Type::List => "list",
            Type::Boolean => "boolean",
            Type::Guid => "guid",
            Type::Byte => "byte",
            Type::Short => "short",
            Type::Int => "int",
            Type::Long => "long",
            Type::Real => "real",
            Type::Float => "float",
            Type::Char => "char",
            Type::Symbol => "symbol",
            Type::Timestamp => "timestamp",
            Type::Month => "month",
            Type::Date => "date",
            Type::Datetime => "datetime",
            Type::Timespan => "timespan",
            Type::Minute => "minute",
            Type::Second => "second",
            Type::Time => "time",
            Type::Table => "table",
            Type::Dict => "dictionary",
            Type::Function => "function",
            Type::Error => "error",
        }
    }

    /// q's one-letter type char (`j` for long, `s` for symbol, ...).
    pub fn type_char(self) -> Option<char> {
        let c = match self {
            Type::Boolean => 'b',
            Type::Guid => 'g',
            Type::Byte => 'x',
            Type::Short => 'h',
            Type::Int => 'i',
            Type::Long => 'j',
            Type::Real => 'e',
            Type::Float => 'f',
            Type::Char => 'c',
            Type::Symbol => 's',
            Type::Timestamp => 'p',
            Type::Month => 'm',
            Type::Date => 'd',
            Type::Datetime => 'z',
            Type::Timespan => 'n',
            Type::Minute => 'u',
            Type::Second => 'v',
            Type::Time => 't',
            _ => return None,
        };
        Some(c)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Structural category of a kdb+ object.
///
/// See <https://code.kx.com/q/ref/elements/#nouns>.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructType {
    /// Single scalar (negative tag).
    Atom,
    /// Homogeneous vector (tag 1..=19).
    Vector,
    /// General list (tag 0).
    List,
    /// Dictionary (tag 99). Keyed tables also land here; see
    /// `Value::is_keyed_table`.
    Dictionary,
    /// Table (tag 98).
    Table,
    /// A valid object outside the categories above (functions, `::`).
    Unknown,
    /// Empty value or error block.
    Error,
}

impl StructType {
    /// Classify a raw tag byte.
    pub fn from_tag(tag: i8) -> StructType {
        match tag {
            ERROR_TAG => StructType::Error,
            t if t < 0 => StructType::Atom,
            0 => StructType::List,
            1..=19 => StructType::Vector,
            98 => StructType::Table,
            99 => StructType::Dictionary,
            _ => StructType::Unknown,
        }
    }
}

impl fmt::Display for StructType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StructType::Atom => "atom",
            StructType::Vector => "vector",
            StructType::List => "list",
            StructType::Dictionary => "dictionary",
            StructType::Table => "table",
            StructType::Unknown => "unknown",
            StructType::Error => "error",
        };
        f.write_str(s)
    }
}

/// Attribute carried by vectors, dictionaries and tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Attribute {
    /// No attribute.
    #[default]
    None,
    /// `s#`
    Sorted,
    /// `u#`
    Unique,
    /// `p#`
    Parted,
    /// `g#`
    Grouped,
}

impl Attribute {
    /// Decode the attribute byte. Unknown values map to `None`.
    pub fn from_byte(b: u8) -> Attribute {
        match b {
            1 => Attribute::Sorted,
            2 => Attribute::Unique,
            3 => Attribute::Parted,
            5 => Attribute::Grouped,
            _ => Attribute::None,
        }
    }

    /// Wire byte for this attribute.
    pub fn to_byte(self) -> u8 {
        match self {
            Attribute::None => 0,
            Attribute::Sorted => 1,
            Attribute::Unique => 2,
            Attribute::Parted => 3,
            Attribute::Grouped => 5,
        }
    }
}
