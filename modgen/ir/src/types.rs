//! Hardware types and the constants that can inhabit them.
use itertools::Itertools;
use modgen_utils::{math, Error, ModgenResult};

/// A hardware type. Equality is structural and exact: `Bits(8)` and
/// `UInt(8)` are different types.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum Type {
    /// Signless integer of the given width.
    Bits(u64),
    /// Unsigned integer of the given width.
    UInt(u64),
    /// Signed integer of the given width.
    SInt(u64),
    /// A clock.
    Clock,
    /// Fixed-length array.
    Array { elem: Box<Type>, len: u64 },
}

impl Type {
    pub fn bits(width: u64) -> Self {
        Type::Bits(width)
    }

    pub fn uint(width: u64) -> Self {
        Type::UInt(width)
    }

    pub fn sint(width: u64) -> Self {
        Type::SInt(width)
    }

    pub fn clock() -> Self {
        Type::Clock
    }

    pub fn array(elem: Type, len: u64) -> Self {
        Type::Array {
            elem: Box::new(elem),
            len,
        }
    }

    pub fn is_clock(&self) -> bool {
        matches!(self, Type::Clock)
    }

    /// Total number of bits occupied by a value of this type.
    pub fn width(&self) -> u64 {
        match self {
            Type::Bits(w) | Type::UInt(w) | Type::SInt(w) => *w,
            Type::Clock => 1,
            Type::Array { elem, len } => elem.width() * len,
        }
    }

    /// The all-zero constant of this type. Used to tie off disconnected
    /// inputs of external modules.
    pub fn zero(&self) -> ConstValue {
        match self {
            Type::Array { elem, len } => {
                ConstValue::Array((0..*len).map(|_| elem.zero()).collect())
            }
            _ => ConstValue::Int(0),
        }
    }

    /// Check that `val` can be represented as a constant of this type.
    pub fn check_const(&self, val: &ConstValue) -> ModgenResult<()> {
        let out_of_range = || {
            Error::ir(format!("Constant {val} does not fit in type {self}"))
        };
        match (self, val) {
            (Type::Bits(w), ConstValue::Int(v)) => {
                let needed = if *v >= 0 {
                    math::unsigned_bits(*v as u128)
                } else {
                    math::signed_bits(*v)
                };
                if needed > *w {
                    return Err(out_of_range());
                }
            }
            (Type::UInt(w), ConstValue::Int(v)) => {
                if *v < 0 || math::unsigned_bits(*v as u128) > *w {
                    return Err(out_of_range());
                }
            }
            (Type::SInt(w), ConstValue::Int(v)) => {
                if math::signed_bits(*v) > *w {
                    return Err(out_of_range());
                }
            }
            (Type::Clock, ConstValue::Int(v)) => {
                if *v != 0 && *v != 1 {
                    return Err(out_of_range());
                }
            }
            (Type::Array { elem, len }, ConstValue::Array(vals)) => {
                if vals.len() as u64 != *len {
                    return Err(Error::ir(format!(
                        "Array constant has {} elements, type {self} expects {len}",
                        vals.len()
                    )));
                }
                for v in vals {
                    elem.check_const(v)?;
                }
            }
            _ => {
                return Err(Error::ir(format!(
                    "Cannot convert constant {val} to type {self}"
                )));
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Bits(w) => write!(f, "i{w}"),
            Type::UInt(w) => write!(f, "ui{w}"),
            Type::SInt(w) => write!(f, "si{w}"),
            Type::Clock => write!(f, "!seq.clock"),
            Type::Array { elem, len } => write!(f, "!hw.array<{len}x{elem}>"),
        }
    }
}

/// A raw constant supplied by the user in place of a signal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum ConstValue {
    Int(i128),
    Array(Vec<ConstValue>),
}

impl std::fmt::Display for ConstValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Array(vs) => write!(f, "[{}]", vs.iter().join(", ")),
        }
    }
}

impl From<bool> for ConstValue {
    fn from(b: bool) -> Self {
        ConstValue::Int(b as i128)
    }
}

macro_rules! const_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for ConstValue {
                fn from(v: $t) -> Self {
                    ConstValue::Int(v as i128)
                }
            }
        )*
    };
}

const_from_int!(u8, u16, u32, u64, i8, i16, i32, i64, usize);

impl<T: Into<ConstValue>> From<Vec<T>> for ConstValue {
    fn from(vs: Vec<T>) -> Self {
        ConstValue::Array(vs.into_iter().map(Into::into).collect())
    }
}
