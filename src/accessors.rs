//! Accessors for the ports of instantiated modules.
use crate::{AppId, Module, ModuleSchema, Signal};
use linked_hash_map::LinkedHashMap;
use modgen_ir::{OpId, Value};
use modgen_utils::{Error, Id, ModgenResult};
use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// Per-declaration accessor table for instances: outputs are read from the
/// positional results of the instance op, inputs are blocked.
#[derive(Debug)]
pub(crate) struct AccessorLayout {
    inputs: HashSet<Id>,
    outputs: LinkedHashMap<Id, usize>,
}

impl AccessorLayout {
    pub(crate) fn new(schema: &ModuleSchema) -> Self {
        Self {
            inputs: schema.inputs.iter().map(|p| p.name).collect(),
            outputs: schema
                .outputs
                .iter()
                .enumerate()
                .map(|(idx, p)| (p.name, idx))
                .collect(),
        }
    }
}

/// Reference to the instance op in the design.
#[derive(Debug)]
struct InstOpRef {
    parent: Id,
    op: OpId,
    results: Vec<Value>,
}

#[derive(Debug)]
struct InstanceInner {
    name: Id,
    module: Module,
    appid: Option<AppId>,
    op: RefCell<Option<InstOpRef>>,
}

/// An instance of a module inside the body of another module. Clones share
/// the same op reference.
#[derive(Clone, Debug)]
pub struct Instance(Rc<InstanceInner>);

impl Instance {
    pub(crate) fn new(
        name: Id,
        module: Module,
        appid: Option<AppId>,
        parent: Id,
        op: OpId,
        results: Vec<Value>,
    ) -> Self {
        Self(Rc::new(InstanceInner {
            name,
            module,
            appid,
            op: RefCell::new(Some(InstOpRef {
                parent,
                op,
                results,
            })),
        }))
    }

    /// Instance symbol.
    pub fn name(&self) -> Id {
        self.0.name
    }

    /// The instantiated module.
    pub fn module(&self) -> &Module {
        &self.0.module
    }

    pub fn appid(&self) -> Option<AppId> {
        self.0.appid
    }

    /// Symbol of the module containing the instance op.
    pub fn parent(&self) -> Option<Id> {
        self.0.op.borrow().as_ref().map(|r| r.parent)
    }

    pub fn op_id(&self) -> Option<OpId> {
        self.0.op.borrow().as_ref().map(|r| r.op)
    }

    fn released(&self) -> Error {
        Error::released(format!(
            "Instance `{}' of {} was cleared and can no longer be used",
            self.0.name,
            self.0.module.name()
        ))
    }

    /// Read an output port of the instance.
    pub fn output<S: Into<Id>>(&self, name: S) -> ModgenResult<Signal> {
        let name = name.into();
        let layout = self.0.module.accessors();
        let Some(idx) = layout.outputs.get(&name).copied() else {
            return Err(if layout.inputs.contains(&name) {
                Error::instance_input(name)
            } else {
                Error::unknown_ports(self.0.module.name(), vec![name])
            });
        };
        let op = self.0.op.borrow();
        let op = op.as_ref().ok_or_else(|| self.released())?;
        Ok(Signal::new(op.results[idx].clone()))
    }

    /// Every output, by name, in port order.
    pub fn outputs(&self) -> ModgenResult<LinkedHashMap<Id, Signal>> {
        let op = self.0.op.borrow();
        let op = op.as_ref().ok_or_else(|| self.released())?;
        Ok(self
            .0
            .module
            .accessors()
            .outputs
            .iter()
            .map(|(name, idx)| (*name, Signal::new(op.results[*idx].clone())))
            .collect())
    }

    /// Drop the reference to the instance op. Reading outputs afterwards
    /// fails.
    pub fn clear_op_refs(&self) {
        self.0.op.borrow_mut().take();
    }

    pub fn is_cleared(&self) -> bool {
        self.0.op.borrow().is_none()
    }

    /// True if both handles refer to the same instance.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
