//! Module declarations: ports, generators and module-level attributes.
use crate::{Instance, Metadata, Module, Ports, Signal};
use linked_hash_map::LinkedHashMap;
use modgen_ir::{Attr, Attributes, ConstValue, PortInfo, Type};
use modgen_utils::{Error, Id, ModgenResult, SourceLoc};
use smallvec::SmallVec;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::rc::Rc;

/// Attributes that the framework sets on module ops itself.
const MANAGED_ATTRIBUTES: [&str; 3] =
    ["output_file", "verilogName", "modgen.parameters"];

/// Role of a port. Clock and reset ports are inputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PortRole {
    Input,
    Output,
    Clock,
    Reset,
}

impl PortRole {
    pub fn is_input(&self) -> bool {
        !matches!(self, PortRole::Output)
    }
}

/// A declared port.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PortDesc {
    pub name: Id,
    pub ty: Type,
    pub role: PortRole,
}

impl PortDesc {
    pub(crate) fn info(&self) -> PortInfo {
        PortInfo::new(self.name, self.ty.clone())
    }
}

impl std::fmt::Display for PortDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "('{}', {})", self.name, self.ty)
    }
}

/// Values a generator may produce. Generators must not return a value, so
/// everything other than `()` is rejected when the generator finishes.
pub trait GeneratorOutput {
    /// Description of the returned value, `None` if nothing was returned.
    fn returned(self) -> Option<String>;
}

impl GeneratorOutput for () {
    fn returned(self) -> Option<String> {
        None
    }
}

impl GeneratorOutput for Signal {
    fn returned(self) -> Option<String> {
        Some(format!("signal of type {}", self.ty()))
    }
}

impl GeneratorOutput for Instance {
    fn returned(self) -> Option<String> {
        Some(format!("instance `{}'", self.name()))
    }
}

impl GeneratorOutput for ConstValue {
    fn returned(self) -> Option<String> {
        Some(format!("constant {self}"))
    }
}

impl<T: GeneratorOutput> GeneratorOutput for Vec<T> {
    fn returned(self) -> Option<String> {
        Some(format!("list of {} values", self.len()))
    }
}

/// Type-erased generator function.
pub(crate) trait GenerateFn {
    fn call(&self, ports: &mut Ports<'_>) -> ModgenResult<Option<String>>;
}

struct ErasedGenerator<F, R> {
    func: F,
    _ret: PhantomData<fn() -> R>,
}

impl<F, R> GenerateFn for ErasedGenerator<F, R>
where
    F: Fn(&mut Ports<'_>) -> ModgenResult<R>,
    R: GeneratorOutput,
{
    fn call(&self, ports: &mut Ports<'_>) -> ModgenResult<Option<String>> {
        (self.func)(ports).map(GeneratorOutput::returned)
    }
}

/// A registered generator and where it was declared.
#[derive(Clone)]
pub struct Generator {
    pub(crate) func: Rc<dyn GenerateFn>,
    pub(crate) loc: SourceLoc,
}

impl Generator {
    pub fn loc(&self) -> SourceLoc {
        self.loc
    }
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Generator({:?})", self.loc)
    }
}

/// Everything known about a module at declaration time.
#[derive(Debug)]
pub struct ModuleSchema {
    pub(crate) name: Id,
    pub(crate) inputs: Vec<PortDesc>,
    pub(crate) outputs: Vec<PortDesc>,
    /// Indices into `inputs`.
    pub(crate) clocks: SmallVec<[usize; 2]>,
    pub(crate) resets: SmallVec<[usize; 2]>,
    pub(crate) generators: LinkedHashMap<Id, Generator>,
    pub(crate) attributes: Attributes,
    pub(crate) metadata: Option<Metadata>,
    pub(crate) module_name: Option<Id>,
    pub(crate) doc: Option<String>,
    pub(crate) loc: SourceLoc,
}

impl ModuleSchema {
    pub(crate) fn new(name: Id, loc: SourceLoc) -> Self {
        Self {
            name,
            inputs: vec![],
            outputs: vec![],
            clocks: SmallVec::new(),
            resets: SmallVec::new(),
            generators: LinkedHashMap::new(),
            attributes: Attributes::default(),
            metadata: None,
            module_name: None,
            doc: None,
            loc,
        }
    }

    /// Declared name of the module.
    pub fn name(&self) -> Id {
        self.name
    }

    pub fn inputs(&self) -> &[PortDesc] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[PortDesc] {
        &self.outputs
    }

    pub fn clock_indices(&self) -> &[usize] {
        &self.clocks
    }

    pub fn reset_indices(&self) -> &[usize] {
        &self.resets
    }

    pub fn generators(&self) -> &LinkedHashMap<Id, Generator> {
        &self.generators
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    pub fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    pub fn loc(&self) -> SourceLoc {
        self.loc
    }

    fn input(&mut self, name: Id, ty: Type, role: PortRole) -> usize {
        self.inputs.push(PortDesc { name, ty, role });
        self.inputs.len() - 1
    }

    /// Check the declaration contract.
    fn validate(&self, extra: &[Error]) -> ModgenResult<()> {
        if let Some(err) = extra.first() {
            return Err(err.clone());
        }
        if self.name.as_str().is_empty() || self.name.is_reserved() {
            return Err(Error::declaration(format!(
                "Invalid module name `{}'",
                self.name
            ))
            .with_pos(&self.loc));
        }
        for (dir, ports) in [("input", &self.inputs), ("output", &self.outputs)]
        {
            let mut seen = HashSet::new();
            for port in ports {
                if port.name.as_str().is_empty() || port.name.is_reserved() {
                    return Err(Error::declaration(format!(
                        "Module {}: invalid {dir} port name `{}'",
                        self.name, port.name
                    ))
                    .with_pos(&self.loc));
                }
                if !seen.insert(port.name) {
                    return Err(Error::declaration(format!(
                        "Module {}: duplicate {dir} port `{}'",
                        self.name, port.name
                    ))
                    .with_pos(&self.loc));
                }
            }
        }
        for (key, _) in &self.attributes {
            if key.as_str().is_empty()
                || MANAGED_ATTRIBUTES.contains(&key.as_str())
            {
                return Err(Error::declaration(format!(
                    "Module {}: attribute `{key}' cannot be set by a declaration",
                    self.name
                ))
                .with_pos(&self.loc));
            }
        }
        if let Some(meta) = &self.metadata {
            meta.validate().map_err(|e| e.with_pos(&self.loc))?;
        }
        Ok(())
    }
}

/// Declarative builder for a module. Items are recorded in call order;
/// [`ModuleDecl::build`] checks the declaration and registers the module.
///
/// ```
/// # use modgen::{ModuleDecl, ir::Type};
/// let passthrough = ModuleDecl::new("Passthrough")
///     .input("a", Type::bits(8))
///     .output("b", Type::bits(8))
///     .generator("build", |ports| {
///         let a = ports.input("a")?;
///         ports.set("b", a)
///     })
///     .build()
///     .unwrap();
/// assert_eq!(passthrough.name(), "Passthrough");
/// ```
pub struct ModuleDecl {
    schema: ModuleSchema,
    errors: Vec<Error>,
}

impl ModuleDecl {
    #[track_caller]
    pub fn new<S: Into<Id>>(name: S) -> Self {
        Self {
            schema: ModuleSchema::new(name.into(), SourceLoc::caller()),
            errors: vec![],
        }
    }

    pub fn input<S: Into<Id>>(mut self, name: S, ty: Type) -> Self {
        self.schema.input(name.into(), ty, PortRole::Input);
        self
    }

    pub fn output<S: Into<Id>>(mut self, name: S, ty: Type) -> Self {
        self.schema.outputs.push(PortDesc {
            name: name.into(),
            ty,
            role: PortRole::Output,
        });
        self
    }

    /// A clock input.
    pub fn clock<S: Into<Id>>(mut self, name: S) -> Self {
        let idx = self.schema.input(name.into(), Type::clock(), PortRole::Clock);
        self.schema.clocks.push(idx);
        self
    }

    /// A one-bit reset input.
    pub fn reset<S: Into<Id>>(mut self, name: S) -> Self {
        let idx = self.schema.input(name.into(), Type::bits(1), PortRole::Reset);
        self.schema.resets.push(idx);
        self
    }

    /// Register a generator. A module with a generator is a real module;
    /// one without is an external module.
    #[track_caller]
    pub fn generator<S, F, R>(mut self, name: S, func: F) -> Self
    where
        S: Into<Id>,
        F: Fn(&mut Ports<'_>) -> ModgenResult<R> + 'static,
        R: GeneratorOutput + 'static,
    {
        let name = name.into();
        let loc = SourceLoc::caller();
        let generator = Generator {
            func: Rc::new(ErasedGenerator {
                func,
                _ret: PhantomData,
            }),
            loc,
        };
        if name.is_reserved()
            || self.schema.generators.insert(name, generator).is_some()
        {
            self.errors.push(
                Error::declaration(format!(
                    "Module {}: invalid or duplicate generator `{name}'",
                    self.schema.name
                ))
                .with_pos(&loc),
            );
        }
        self
    }

    pub fn attribute<K: Into<Id>, V: Into<Attr>>(
        mut self,
        key: K,
        val: V,
    ) -> Self {
        self.schema.attributes.insert(key, val.into());
        self
    }

    /// Several attributes at once. `None` values become presence-only flags.
    pub fn attributes<I, K>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Option<Attr>)>,
        K: Into<Id>,
    {
        for (key, val) in entries {
            self.schema.attributes.insert(key, val.unwrap_or(Attr::Unit));
        }
        self
    }

    /// A presence-only attribute.
    pub fn flag<K: Into<Id>>(mut self, key: K) -> Self {
        self.schema.attributes.insert(key, Attr::Unit);
        self
    }

    pub fn metadata(mut self, meta: Metadata) -> Self {
        self.schema.metadata = Some(meta);
        self
    }

    /// Name the module op explicitly instead of deriving it.
    pub fn module_name<S: Into<Id>>(mut self, name: S) -> Self {
        self.schema.module_name = Some(name.into());
        self
    }

    /// Doc text, used as the default metadata summary.
    pub fn doc<S: ToString>(mut self, doc: S) -> Self {
        self.schema.doc = Some(doc.to_string());
        self
    }

    pub fn schema(&self) -> &ModuleSchema {
        &self.schema
    }

    /// Check the declaration and register it as a new module.
    pub fn build(self) -> ModgenResult<Module> {
        self.schema.validate(&self.errors)?;
        Ok(Module::declare(self.schema))
    }
}

/// Register `decl` with `func` as its generator.
#[track_caller]
pub fn declare<F, R>(decl: ModuleDecl, func: F) -> ModgenResult<Module>
where
    F: Fn(&mut Ports<'_>) -> ModgenResult<R> + 'static,
    R: GeneratorOutput + 'static,
{
    decl.generator("generate", func).build()
}
