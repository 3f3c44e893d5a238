//! Module handles and their lifecycle: op creation, instantiation and
//! generation.
use crate::{
    AccessorLayout, AppId, Instance, ModuleSchema, PortDesc, PortRole,
    PortValue, Ports, ProxyLayout, System,
};
use itertools::Itertools;
use modgen_ir::{
    Attr, Attributes, HwModule, HwModuleExtern, ModuleOp, ParamDecl, Value,
};
use modgen_utils::{Error, GetName, Id, ModgenResult, SourceLoc};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::collections::HashSet;
use std::io;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Identity of a declaration. Never reused within a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(u32);

impl ModuleId {
    fn fresh() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(0);
        ModuleId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Derive a readable module name from a base name and its parameters, e.g.
/// `Adder_width8`. Parameter strings are sorted and the result is reduced to
/// alphanumerics separated by single underscores.
pub(crate) fn derived_name(base: Id, params: &Attr) -> String {
    let param_strings = params
        .as_dict()
        .unwrap_or_default()
        .iter()
        .map(|(name, val)| format!("{name}{}", val.to_var_string()))
        .sorted()
        .collect_vec();
    let mut name = base.to_string();
    for ps in param_strings {
        name.push('_');
        name.push_str(&ps);
    }
    let name = name.replace("!hw.", "");
    let mut ret = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_alphanumeric() {
            ret.push(c);
        } else if !"!>[],\"".contains(c)
            && !ret.is_empty()
            && !ret.ends_with('_')
        {
            ret.push('_');
        }
    }
    ret.trim_matches('_').to_string()
}

pub(crate) struct ModuleInner {
    id: ModuleId,
    schema: ModuleSchema,
    proxy: ProxyLayout,
    accessors: AccessorLayout,
    /// Canonical parameters, set by the parameterization cache.
    parameters: RefCell<Option<Attr>>,
    /// Prebuilt op of an imported module until it is moved into a design.
    prebuilt: Option<RefCell<Option<ModuleOp>>>,
}

/// Handle to a declared module. Clones share the declaration; two
/// declarations are never the same module even if they look alike.
#[derive(Clone)]
pub struct Module(Rc<ModuleInner>);

impl Module {
    /// Register a checked schema: build the proxy and instance accessor
    /// layouts once.
    pub(crate) fn declare(schema: ModuleSchema) -> Self {
        let id = ModuleId::fresh();
        log::debug!("Declared module {} as {id:?}", schema.name);
        let proxy = ProxyLayout::new(&schema);
        let accessors = AccessorLayout::new(&schema);
        Module(Rc::new(ModuleInner {
            id,
            schema,
            proxy,
            accessors,
            parameters: RefCell::new(None),
            prebuilt: None,
        }))
    }

    /// Wrap an already-built module op. Its ports are read from the op and it
    /// keeps its symbol.
    pub(crate) fn import(op: ModuleOp, loc: SourceLoc) -> Self {
        let mut schema = ModuleSchema::new(op.sym(), loc);
        for port in op.inputs() {
            let role = if port.ty.is_clock() {
                schema.clocks.push(schema.inputs.len());
                PortRole::Clock
            } else {
                PortRole::Input
            };
            schema.inputs.push(PortDesc {
                name: port.name,
                ty: port.ty.clone(),
                role,
            });
        }
        schema.outputs = op
            .outputs()
            .iter()
            .map(|p| PortDesc {
                name: p.name,
                ty: p.ty.clone(),
                role: PortRole::Output,
            })
            .collect();
        schema.module_name = Some(op.sym());
        if !op.params().is_empty() {
            log::warn!(
                "Imported module {} declares parameters; bind them with a factory",
                op.sym()
            );
        }
        let id = ModuleId::fresh();
        log::debug!("Imported module {} as {id:?}", op.sym());
        let proxy = ProxyLayout::new(&schema);
        let accessors = AccessorLayout::new(&schema);
        Module(Rc::new(ModuleInner {
            id,
            schema,
            proxy,
            accessors,
            parameters: RefCell::new(None),
            prebuilt: Some(RefCell::new(Some(op))),
        }))
    }

    pub fn id(&self) -> ModuleId {
        self.0.id
    }

    pub fn schema(&self) -> &ModuleSchema {
        &self.0.schema
    }

    pub(crate) fn proxy(&self) -> &ProxyLayout {
        &self.0.proxy
    }

    pub(crate) fn accessors(&self) -> &AccessorLayout {
        &self.0.accessors
    }

    pub fn inputs(&self) -> &[PortDesc] {
        &self.0.schema.inputs
    }

    pub fn outputs(&self) -> &[PortDesc] {
        &self.0.schema.outputs
    }

    /// A module with a generator is a real module; one without is external.
    pub fn has_generator(&self) -> bool {
        !self.0.schema.generators.is_empty()
    }

    pub fn is_imported(&self) -> bool {
        self.0.prebuilt.is_some()
    }

    /// Canonical parameters, if this module came out of a factory.
    pub fn parameters(&self) -> Option<Attr> {
        self.0.parameters.borrow().clone()
    }

    pub(crate) fn set_parameters(&self, params: Attr) {
        let prev = self.0.parameters.borrow_mut().replace(params);
        if prev.is_some() {
            log::warn!(
                "Parameters of module {} were overwritten by another factory call",
                self.0.schema.name
            );
        }
    }

    /// True if both handles refer to the same declaration.
    pub fn ptr_eq(&self, other: &Module) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Name of the module op: the explicit module name if given, else a name
    /// derived from the parameters for parameterized real modules, else the
    /// declared name.
    pub fn name(&self) -> Id {
        let schema = &self.0.schema;
        if let Some(name) = schema.module_name {
            return name;
        }
        match &*self.0.parameters.borrow() {
            Some(params) if self.has_generator() => {
                Id::new(derived_name(schema.name, params))
            }
            _ => schema.name,
        }
    }

    /// Writes `<modgen.Module: NAME inputs: [...] outputs: [...]>`.
    pub fn print<F: io::Write>(&self, out: &mut F) -> io::Result<()> {
        writeln!(
            out,
            "<modgen.Module: {} inputs: [{}] outputs: [{}]>",
            self.name(),
            self.inputs().iter().join(", "),
            self.outputs().iter().join(", ")
        )
    }

    /// Build the op for this module under `symbol`. Real modules get their
    /// ports, attributes and parameters; external modules get formal
    /// parameter declarations and their Verilog name.
    pub(crate) fn build_op(
        &self,
        sys: &System,
        symbol: Id,
    ) -> ModgenResult<ModuleOp> {
        let schema = &self.0.schema;
        let inputs = schema.inputs.iter().map(PortDesc::info).collect();
        let outputs = schema.outputs.iter().map(PortDesc::info).collect();
        let mut attributes: Attributes = schema
            .attributes
            .iter()
            .map(|(k, v)| (*k, v.clone()))
            .collect();
        let params = self.parameters();
        if self.has_generator() {
            if let Some(params) = params {
                attributes.insert("modgen.parameters", params);
            }
            attributes.insert(
                "output_file",
                Attr::OutputFile(format!("{symbol}.sv")),
            );
            return Ok(ModuleOp::Hw(HwModule::new(
                symbol, inputs, outputs, attributes, schema.loc,
            )));
        }

        let param_decls = params
            .as_ref()
            .and_then(Attr::as_dict)
            .unwrap_or_default()
            .iter()
            .map(|(name, val)| ParamDecl::no_default(*name, val.param_ty()))
            .collect();
        attributes.insert("verilogName", Attr::Str(self.name().to_string()));
        attributes.insert(
            "output_file",
            Attr::OutputFile(sys.conf().external_output_file.clone()),
        );
        Ok(ModuleOp::Extern(HwModuleExtern::new(
            symbol,
            inputs,
            outputs,
            param_decls,
            attributes,
            schema.loc,
        )))
    }

    /// Move the prebuilt op of an imported module out of the handle.
    pub(crate) fn take_prebuilt(&self) -> ModgenResult<Option<ModuleOp>> {
        let Some(cell) = &self.0.prebuilt else {
            return Ok(None);
        };
        cell.borrow_mut().take().map(Some).ok_or_else(|| {
            Error::ir(format!(
                "Imported module {} was already moved into another design",
                self.0.schema.name
            ))
        })
    }

    /// Check every supplied input against the declared ports without touching
    /// the IR. Returns the bindings in port order.
    fn bind_inputs(
        &self,
        inputs: Vec<(Id, PortValue)>,
    ) -> ModgenResult<Vec<PortValue>> {
        let schema = &self.0.schema;
        let mut slots: Vec<Option<PortValue>> = vec![None; schema.inputs.len()];
        let mut unknown = vec![];
        let mut duplicates = vec![];
        let mut seen = HashSet::new();
        for (name, value) in inputs {
            if !seen.insert(name) {
                if !duplicates.contains(&name) {
                    duplicates.push(name);
                }
                continue;
            }
            match schema.inputs.iter().position(|p| p.name == name) {
                Some(idx) => slots[idx] = Some(value),
                None => unknown.push(name),
            }
        }
        if !duplicates.is_empty() {
            return Err(Error::duplicate_inputs(self.name(), duplicates));
        }
        if !unknown.is_empty() {
            return Err(Error::unknown_ports(self.name(), unknown));
        }
        let missing = schema
            .inputs
            .iter()
            .zip(&slots)
            .filter(|(_, v)| v.is_none())
            .map(|(p, _)| p.name)
            .collect_vec();
        if !missing.is_empty() {
            return Err(Error::missing_inputs(self.name(), missing));
        }

        let bound = schema.inputs.iter().zip(slots).map(|(port, value)| {
            let value = value.unwrap_or(PortValue::Disconnected);
            let check = match &value {
                PortValue::Signal(sig) if sig.ty() != &port.ty => {
                    Err(Error::type_mismatch(port.name, &port.ty, sig.ty()))
                }
                PortValue::Const(c) => port.ty.check_const(c).map_err(|_| {
                    Error::type_mismatch(port.name, &port.ty, value.describe())
                }),
                PortValue::Disconnected if self.has_generator() => {
                    Err(Error::disconnected(port.name))
                }
                _ => Ok(()),
            };
            check.map(|()| value)
        });
        bound.collect()
    }

    /// Instantiate this module at the current insertion point.
    ///
    /// Every input must be supplied. Signals must match the port type
    /// exactly, raw values are converted to constants of the port type, and
    /// [`PortValue::Disconnected`] ties the input to zero on external modules.
    /// The instance symbol is `instance_name` (the module name by default),
    /// uniquified within the enclosing generator.
    #[track_caller]
    pub fn instantiate<I, K, V>(
        &self,
        sys: &System,
        inputs: I,
        instance_name: Option<&str>,
        appid: Option<AppId>,
    ) -> ModgenResult<Instance>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Id>,
        V: Into<PortValue>,
    {
        let loc = SourceLoc::caller();
        let inputs = inputs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect_vec();
        let ip = sys.current_ip()?;
        let bound = self.bind_inputs(inputs).map_err(|e| e.with_pos(&loc))?;

        let symbol = sys.create_op(self)?;
        let mut values: SmallVec<[Value; 4]> = SmallVec::new();
        for (port, value) in self.inputs().iter().zip(bound) {
            let value = match value {
                PortValue::Signal(sig) => sig.into(),
                PortValue::Const(c) => sys.build_constant(&port.ty, c)?,
                PortValue::Disconnected => {
                    sys.build_constant(&port.ty, port.ty.zero())?
                }
            };
            values.push(value);
        }

        let base = instance_name
            .map(Id::new)
            .unwrap_or_else(|| self.0.schema.name);
        let inst_name = sys.uniquify_symbol(base)?;
        // Only parameterized external modules take parameters.
        let params = if self.has_generator() {
            None
        } else {
            self.parameters()
        };
        let (op, results) = sys.build_instance(
            &ip,
            symbol,
            inst_name,
            values.into_vec(),
            params,
            appid,
            loc,
        )?;
        let inst = Instance::new(
            inst_name,
            self.clone(),
            appid,
            ip.module(),
            op,
            results,
        );
        log::debug!("Instantiated {symbol} as `{inst_name}' in {}", ip.module());
        sys.register_instance(&inst);
        if self.has_generator() {
            sys.enqueue(self);
        }
        Ok(inst)
    }

    /// Fill in the body of this module by running its generator.
    pub(crate) fn generate(&self, sys: &System) -> ModgenResult<()> {
        let schema = &self.0.schema;
        let generators = schema.generators.values().collect_vec();
        let [generator] = generators.as_slice() else {
            return Err(Error::generator(format!(
                "Module {} must have exactly one generator to be generated, found {}",
                schema.name,
                generators.len()
            ))
            .with_pos(&schema.loc));
        };
        if sys.is_generated(self) {
            return Err(Error::generator(format!(
                "Module {} has already been generated",
                self.name()
            )));
        }
        let symbol = sys.create_op(self)?;
        let args = sys.add_entry_block(symbol)?;
        sys.mark_generated(self);
        log::info!("Generating {symbol}");

        let clock = match schema.clocks.as_slice() {
            [idx] => Some(crate::Signal::clock(args[*idx].clone())),
            _ => None,
        };
        let mut ports = Ports::new(sys, self.clone(), args);
        let res = {
            let _scope = sys.enter_scope(symbol, generator.loc, clock);
            generator
                .func
                .call(&mut ports)
                .and_then(|returned| match returned {
                    None => Ok(()),
                    Some(what) => Err(Error::generator(format!(
                        "Generators must not return a value (got {what})"
                    ))
                    .with_pos(&generator.loc)),
                })
                .and_then(|()| ports.output_values())
                .and_then(|outs| sys.build_output(outs))
        };
        ports.clear();
        match &res {
            Ok(()) => log::debug!("Finished generating {symbol}"),
            Err(e) => {
                log::debug!("Generating {symbol} failed: {e}");
                sys.unwind_generation(self, symbol);
            }
        }
        res
    }
}

impl GetName for Module {
    fn name(&self) -> Id {
        Module::name(self)
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Module({}, {:?})", self.name(), self.0.id)
    }
}
