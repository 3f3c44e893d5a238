use crate::{Attr, Attributes, ConstValue, OpId, Value};
use modgen_utils::{Id, SourceLoc, WithPos};
use smallvec::SmallVec;

/// The kind of an operation, with the data specific to it.
#[derive(Clone, Debug, PartialEq)]
pub enum OpKind {
    /// A constant of the result type.
    Constant(ConstValue),
    /// Instantiation of the module named `module`.
    Instance {
        inst_name: Id,
        module: Id,
        /// Parameter bindings, only for parameterized external modules.
        params: Option<Attr>,
    },
    /// Body terminator carrying the module outputs in port order.
    Output,
    /// Metadata record for a module symbol. Lives at the top level.
    SymbolMetadata { symbol: Id },
    /// Any other operation, identified by its name (e.g. `comb.add`).
    Custom(Id),
}

/// An operation in a module body.
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub id: OpId,
    pub kind: OpKind,
    pub operands: Vec<Value>,
    pub results: SmallVec<[Value; 2]>,
    pub attributes: Attributes,
    pub loc: SourceLoc,
}

impl Operation {
    /// Name of this operation as it appears in the printed IR.
    pub fn name(&self) -> &str {
        match &self.kind {
            OpKind::Constant(_) => "hw.constant",
            OpKind::Instance { .. } => "hw.instance",
            OpKind::Output => "hw.output",
            OpKind::SymbolMetadata { .. } => "esi.metadata.symbol",
            OpKind::Custom(name) => name.as_str(),
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(self.kind, OpKind::Output)
    }

    pub fn result(&self, idx: usize) -> Option<&Value> {
        self.results.get(idx)
    }
}

impl WithPos for Operation {
    fn copy_span(&self) -> SourceLoc {
        self.loc
    }
}

/// A basic block: typed arguments and a list of operations.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
    pub args: Vec<Value>,
    pub ops: Vec<Operation>,
}

impl Block {
    /// True if the block ends in a terminator.
    pub fn is_terminated(&self) -> bool {
        self.ops.last().is_some_and(Operation::is_terminator)
    }

    pub fn find_op(&self, id: OpId) -> Option<&Operation> {
        self.ops.iter().find(|op| op.id == id)
    }

    pub fn find_op_mut(&mut self, id: OpId) -> Option<&mut Operation> {
        self.ops.iter_mut().find(|op| op.id == id)
    }
}
