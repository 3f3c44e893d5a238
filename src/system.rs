//! The system: owner of one design and of the state needed to build it.
use crate::{ContextStack, Instance, Module, ModuleId, Signal, SystemConf};
use modgen_ir::{
    Attr, ConstValue, Design, InsertionPoint, ModuleOp, OpId, OpKind, Printer,
    Type, Value,
};
use modgen_utils::{Error, Id, ModgenResult, SourceLoc};
use std::cell::{Ref, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::io;

/// Builds one design from module declarations.
///
/// Module ops are created lazily, the first time a module is added as a top
/// module or instantiated, and are cached per declaration. Generation is
/// driven by a FIFO worklist of modules that were instantiated but not yet
/// generated.
pub struct System {
    conf: SystemConf,
    design: RefCell<Design>,
    /// Symbol of the op created for each declaration.
    op_cache: RefCell<HashMap<ModuleId, Id>>,
    generated: RefCell<HashSet<ModuleId>>,
    worklist: RefCell<VecDeque<Module>>,
    contexts: RefCell<ContextStack>,
    ips: RefCell<Vec<InsertionPoint>>,
    locs: RefCell<Vec<SourceLoc>>,
    clocks: RefCell<Vec<Signal>>,
    instances: RefCell<Vec<Instance>>,
}

/// Scope of one generator invocation. Dropping it unwinds the clock,
/// location, insertion point and block context in reverse order.
pub(crate) struct GenScope<'s> {
    sys: &'s System,
    clock: bool,
}

impl Drop for GenScope<'_> {
    fn drop(&mut self) {
        if self.clock {
            self.sys.clocks.borrow_mut().pop();
        }
        self.sys.locs.borrow_mut().pop();
        self.sys.ips.borrow_mut().pop();
        if let Err(e) = self.sys.contexts.borrow_mut().exit() {
            log::error!("{e}");
        }
    }
}

impl System {
    pub fn new<S: Into<Id>>(name: S) -> Self {
        Self::with_conf(name, SystemConf::default())
    }

    pub fn with_conf<S: Into<Id>>(name: S, conf: SystemConf) -> Self {
        Self {
            conf,
            design: RefCell::new(Design::new(name)),
            op_cache: RefCell::default(),
            generated: RefCell::default(),
            worklist: RefCell::default(),
            contexts: RefCell::default(),
            ips: RefCell::default(),
            locs: RefCell::default(),
            clocks: RefCell::default(),
            instances: RefCell::default(),
        }
    }

    pub fn conf(&self) -> &SystemConf {
        &self.conf
    }

    /// Read access to the design. Must not be held across calls that build
    /// IR.
    pub fn design(&self) -> Ref<'_, Design> {
        self.design.borrow()
    }

    /// Print the design.
    pub fn print<F: io::Write>(&self, out: &mut F) -> io::Result<()> {
        Printer::write_design(&self.design.borrow(), out)
    }

    /// Create the op of a top-level module and queue it for generation.
    pub fn add_top(&self, module: &Module) -> ModgenResult<Id> {
        let sym = self.create_op(module)?;
        if module.has_generator() {
            self.enqueue(module);
        }
        Ok(sym)
    }

    /// Generate every queued module, including modules that are instantiated
    /// while generating.
    pub fn generate(&self) -> ModgenResult<()> {
        loop {
            let next = self.worklist.borrow_mut().pop_front();
            let Some(module) = next else {
                return Ok(());
            };
            if !self.is_generated(&module) {
                module.generate(self)?;
            }
        }
    }

    /// Generate `module` now. Can be called from inside a generator.
    pub fn generate_module(&self, module: &Module) -> ModgenResult<()> {
        module.generate(self)
    }

    /// Wrap an already-built module op so that it can be instantiated like an
    /// external module. The op keeps its symbol.
    #[track_caller]
    pub fn import_module(&self, op: ModuleOp) -> ModgenResult<Module> {
        let sym = op.sym();
        if self.design.borrow().find_module(sym).is_some() {
            return Err(Error::ir(format!(
                "Cannot import module `{sym}': symbol already defined"
            )));
        }
        Ok(Module::import(op, SourceLoc::caller()))
    }

    /// Instances built so far and not yet cleared.
    pub fn instances(&self) -> Vec<Instance> {
        self.instances.borrow().clone()
    }

    /// Clear the op references of every tracked instance and stop tracking
    /// them.
    pub fn clear_instances(&self) {
        for inst in self.instances.borrow_mut().drain(..) {
            inst.clear_op_refs();
        }
    }

    /// Symbol of the op created for `module` in this system, if any.
    pub fn symbol_of(&self, module: &Module) -> Option<Id> {
        self.op_cache.borrow().get(&module.id()).copied()
    }

    pub fn is_generated(&self, module: &Module) -> bool {
        self.generated.borrow().contains(&module.id())
    }

    /// The implicit clock of the innermost generator, if its module has
    /// exactly one clock port.
    pub fn clock(&self) -> Option<Signal> {
        self.clocks.borrow().last().cloned()
    }

    /// A local symbol unique within the innermost generator.
    pub fn uniquify_symbol<S: Into<Id>>(&self, base: S) -> ModgenResult<Id> {
        self.contexts.borrow_mut().uniquify(base)
    }

    /// Build a custom operation at the current insertion point.
    #[track_caller]
    pub fn build_op<S: Into<Id>>(
        &self,
        name: S,
        operands: &[Signal],
        result_types: Vec<Type>,
    ) -> ModgenResult<Vec<Signal>> {
        let ip = self.current_ip()?;
        let loc = SourceLoc::caller();
        let operands = operands.iter().map(|s| s.value().clone()).collect();
        let mut design = self.design.borrow_mut();
        let op = design.build_op(
            &ip,
            OpKind::Custom(name.into()),
            operands,
            result_types,
            Default::default(),
            loc,
        )?;
        Ok(op.results.iter().cloned().map(Signal::new).collect())
    }

    /// Create the op for `module` if this system has not done so yet.
    pub(crate) fn create_op(&self, module: &Module) -> ModgenResult<Id> {
        if let Some(sym) = self.symbol_of(module) {
            return Ok(sym);
        }
        // An imported op stays with its handle until it can be added.
        if module.is_imported()
            && self.design.borrow().find_module(module.name()).is_some()
        {
            return Err(Error::ir(format!(
                "Cannot add imported module `{}': symbol already defined",
                module.name()
            )));
        }
        let sym = if let Some(op) = module.take_prebuilt()? {
            self.design.borrow_mut().add_module(op)?
        } else {
            let sym = self.design.borrow_mut().unique_symbol(module.name());
            let op = module.build_op(self, sym)?;
            self.design.borrow_mut().add_module(op)?;
            if self.conf.emit_metadata {
                self.add_metadata(module, sym);
            }
            sym
        };
        log::debug!("Created op `{sym}' for {module:?}");
        self.op_cache.borrow_mut().insert(module.id(), sym);
        Ok(sym)
    }

    fn add_metadata(&self, module: &Module, sym: Id) {
        let schema = module.schema();
        let mut meta = schema.metadata().cloned().unwrap_or_default();
        if meta.name.is_none() {
            meta.name = Some(module.name().to_string());
        }
        if meta.summary.is_none() {
            meta.summary = schema.doc().map(str::to_string);
        }
        if self.conf.auto_provenance {
            meta.fill_provenance(schema.loc());
        }
        self.design.borrow_mut().add_symbol_metadata(
            sym,
            meta.to_attributes(),
            schema.loc(),
        );
    }

    pub(crate) fn enqueue(&self, module: &Module) {
        if !self.is_generated(module) {
            self.worklist.borrow_mut().push_back(module.clone());
        }
    }

    pub(crate) fn mark_generated(&self, module: &Module) {
        self.generated.borrow_mut().insert(module.id());
    }

    /// Return `module` to its state before a failed generation: not
    /// generated, without a body, and with the instances built in that body
    /// released.
    pub(crate) fn unwind_generation(&self, module: &Module, sym: Id) {
        self.generated.borrow_mut().remove(&module.id());
        if let Err(e) = self.design.borrow_mut().clear_body(sym) {
            log::error!("{e}");
        }
        self.instances.borrow_mut().retain(|inst| {
            let inside = inst.parent() == Some(sym);
            if inside {
                inst.clear_op_refs();
            }
            !inside
        });
    }

    pub(crate) fn add_entry_block(&self, sym: Id) -> ModgenResult<Vec<Value>> {
        self.design.borrow_mut().add_entry_block(sym)
    }

    /// Enter the scope of a generator for module `sym`.
    pub(crate) fn enter_scope(
        &self,
        sym: Id,
        loc: SourceLoc,
        clock: Option<Signal>,
    ) -> GenScope<'_> {
        self.contexts.borrow_mut().enter();
        self.ips.borrow_mut().push(InsertionPoint::at_end_of(sym));
        self.locs.borrow_mut().push(loc);
        let has_clock = clock.is_some();
        if let Some(clock) = clock {
            self.clocks.borrow_mut().push(clock);
        }
        GenScope {
            sys: self,
            clock: has_clock,
        }
    }

    pub(crate) fn current_ip(&self) -> ModgenResult<InsertionPoint> {
        self.ips.borrow().last().copied().ok_or_else(|| {
            Error::internal("No insertion point: not inside a generator")
        })
    }

    fn current_loc(&self) -> SourceLoc {
        self.locs.borrow().last().copied().unwrap_or_default()
    }

    pub(crate) fn build_constant(
        &self,
        ty: &Type,
        val: ConstValue,
    ) -> ModgenResult<Value> {
        let ip = self.current_ip()?;
        let loc = self.current_loc();
        self.design.borrow_mut().build_constant(&ip, ty, val, loc)
    }

    pub(crate) fn build_output(&self, values: Vec<Value>) -> ModgenResult<()> {
        let ip = self.current_ip()?;
        let loc = self.current_loc();
        self.design.borrow_mut().build_output(&ip, values, loc)?;
        Ok(())
    }

    /// Build and verify an instance op. Returns the op and its results.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn build_instance(
        &self,
        ip: &InsertionPoint,
        module: Id,
        inst_name: Id,
        inputs: Vec<Value>,
        params: Option<Attr>,
        appid: Option<crate::AppId>,
        loc: SourceLoc,
    ) -> ModgenResult<(OpId, Vec<Value>)> {
        let mut design = self.design.borrow_mut();
        let op = design.build_instance(ip, module, inst_name, inputs, params, loc)?;
        let (id, results) = (op.id, op.results.to_vec());
        if let Some(appid) = appid {
            if let Some(op) = design.find_op_mut(ip.module(), id) {
                op.attributes.insert("appid", appid.into());
            }
        }
        if self.conf.verify_instances {
            design.verify_op(ip.module(), id)?;
        }
        Ok((id, results))
    }

    pub(crate) fn register_instance(&self, inst: &Instance) {
        self.instances.borrow_mut().push(inst.clone());
    }
}
