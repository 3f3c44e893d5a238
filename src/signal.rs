//! Values handed to and produced by generators.
use modgen_ir::{Attr, ConstValue, Type, Value};
use modgen_utils::Id;

/// Flavor of a wrapped value. Clock ports are read as clock signals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Generic,
    Clock,
}

/// An IR value wrapped for use in generators.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signal {
    value: Value,
    kind: SignalKind,
}

impl Signal {
    /// Wrap `value`, choosing the flavor from its type.
    pub fn new(value: Value) -> Self {
        let kind = if value.ty().is_clock() {
            SignalKind::Clock
        } else {
            SignalKind::Generic
        };
        Self { value, kind }
    }

    pub(crate) fn clock(value: Value) -> Self {
        Self {
            value,
            kind: SignalKind::Clock,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn ty(&self) -> &Type {
        self.value.ty()
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn is_clock(&self) -> bool {
        self.kind == SignalKind::Clock
    }
}

impl From<Signal> for Value {
    fn from(s: Signal) -> Self {
        s.value
    }
}

/// Anything that can be bound to a port: a wrapped signal, a raw constant
/// that is converted to the port type, or an explicit disconnect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PortValue {
    Signal(Signal),
    Const(ConstValue),
    Disconnected,
}

impl PortValue {
    /// A short description used in error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            PortValue::Signal(s) => s.ty().to_string(),
            PortValue::Const(c) => format!("constant {c}"),
            PortValue::Disconnected => "disconnected".to_string(),
        }
    }
}

impl From<Signal> for PortValue {
    fn from(s: Signal) -> Self {
        PortValue::Signal(s)
    }
}

impl From<&Signal> for PortValue {
    fn from(s: &Signal) -> Self {
        PortValue::Signal(s.clone())
    }
}

/// `None` disconnects the port.
impl From<Option<Signal>> for PortValue {
    fn from(s: Option<Signal>) -> Self {
        match s {
            Some(s) => PortValue::Signal(s),
            None => PortValue::Disconnected,
        }
    }
}

impl From<ConstValue> for PortValue {
    fn from(c: ConstValue) -> Self {
        PortValue::Const(c)
    }
}

macro_rules! port_value_from_const {
    ($($t:ty),*) => {
        $(
            impl From<$t> for PortValue {
                fn from(v: $t) -> Self {
                    PortValue::Const(v.into())
                }
            }
        )*
    };
}

port_value_from_const!(bool, u8, u16, u32, u64, i8, i16, i32, i64, usize);

impl<T: Into<ConstValue>> From<Vec<T>> for PortValue {
    fn from(vs: Vec<T>) -> Self {
        PortValue::Const(vs.into())
    }
}

/// Application-level identifier attached to an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AppId {
    name: Id,
    index: Option<u64>,
}

impl AppId {
    pub fn new<S: Into<Id>>(name: S) -> Self {
        Self {
            name: name.into(),
            index: None,
        }
    }

    pub fn with_index<S: Into<Id>>(name: S, index: u64) -> Self {
        Self {
            name: name.into(),
            index: Some(index),
        }
    }

    pub fn name(&self) -> Id {
        self.name
    }

    pub fn index(&self) -> Option<u64> {
        self.index
    }
}

impl From<AppId> for Attr {
    fn from(id: AppId) -> Self {
        Attr::AppId {
            name: id.name,
            index: id.index,
        }
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.index {
            Some(idx) => write!(f, "{}[{idx}]", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}
