//! Hardware IR targeted by the modgen framework.
//!
//! The IR is a flat collection of module operations. A real module owns a
//! single body block whose arguments are the module inputs and whose
//! terminator carries the module outputs; an external module only carries a
//! port signature and formal parameters. The framework builds the IR through
//! the [`Design`] builder methods and never mutates operations afterwards.

mod attribute;
mod design;
mod module;
mod operation;
mod printer;
mod types;
mod value;

pub use attribute::{Attr, Attributes, ParamDecl, ParamTy};
pub use design::{Design, InsertionPoint};
pub use module::{HwModule, HwModuleExtern, ModuleOp, PortInfo};
pub use operation::{Block, OpKind, Operation};
pub use printer::Printer;
pub use types::{ConstValue, Type};
pub use value::{OpId, Value, ValueDef};

pub use modgen_utils::{GetName, Id};
