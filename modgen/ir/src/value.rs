use crate::Type;
use modgen_utils::Id;

/// Identifier of an operation, unique within the [`Design`](crate::Design)
/// that built it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpId(pub(crate) u32);

impl std::fmt::Display for OpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "op{}", self.0)
    }
}

/// Where a [`Value`] is defined.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ValueDef {
    /// Positional argument of a module's body block.
    Arg { module: Id, idx: usize },
    /// Positional result of an operation.
    Result { op: OpId, idx: usize },
}

/// An SSA value together with its type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Value {
    def: ValueDef,
    ty: Type,
}

impl Value {
    pub(crate) fn arg(module: Id, idx: usize, ty: Type) -> Self {
        Self {
            def: ValueDef::Arg { module, idx },
            ty,
        }
    }

    pub(crate) fn result(op: OpId, idx: usize, ty: Type) -> Self {
        Self {
            def: ValueDef::Result { op, idx },
            ty,
        }
    }

    pub fn def(&self) -> &ValueDef {
        &self.def
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }
}
