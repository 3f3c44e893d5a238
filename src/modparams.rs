//! Parameterized module factories and the cache that makes them return the
//! same module for the same parameters.
use crate::Module;
use linked_hash_map::LinkedHashMap;
use modgen_ir::Attr;
use modgen_utils::{Error, Id, ModgenResult, SourceLoc};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

/// How a factory parameter accepts arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamKind {
    /// Bound by position or by name, optionally with a default.
    Named { default: Option<Attr> },
    /// Collects extra positional arguments. Not allowed on factories.
    VarPositional,
    /// Collects extra keyword arguments. Not allowed on factories.
    VarKeyword,
}

/// A formal parameter of a factory.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: Id,
    pub kind: ParamKind,
}

impl Param {
    pub fn required<S: Into<Id>>(name: S) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Named { default: None },
        }
    }

    pub fn optional<S: Into<Id>, V: Into<Attr>>(name: S, default: V) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Named {
                default: Some(default.into()),
            },
        }
    }

    pub fn var_positional<S: Into<Id>>(name: S) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::VarPositional,
        }
    }

    pub fn var_keyword<S: Into<Id>>(name: S) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::VarKeyword,
        }
    }
}

/// Ordered formal parameters of a factory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParamSignature {
    params: Vec<Param>,
}

impl ParamSignature {
    pub fn new<I: IntoIterator<Item = Param>>(params: I) -> Self {
        Self {
            params: params.into_iter().collect(),
        }
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Bind call arguments to the parameters and apply defaults.
    pub fn bind(&self, args: Args) -> ModgenResult<BoundArgs> {
        if args.positional.len() > self.params.len() {
            return Err(Error::declaration(format!(
                "Too many positional arguments: expected at most {}, got {}",
                self.params.len(),
                args.positional.len()
            )));
        }
        let mut slots: Vec<Option<Attr>> = vec![None; self.params.len()];
        for (slot, val) in slots.iter_mut().zip(args.positional) {
            *slot = Some(val);
        }
        for (name, val) in args.keyword {
            let Some(idx) = self.params.iter().position(|p| p.name == name)
            else {
                return Err(Error::declaration(format!(
                    "Unexpected keyword argument `{name}'"
                )));
            };
            if slots[idx].is_some() {
                return Err(Error::declaration(format!(
                    "Multiple values for argument `{name}'"
                )));
            }
            slots[idx] = Some(val);
        }
        let mut values = LinkedHashMap::new();
        let mut missing = vec![];
        for (param, slot) in self.params.iter().zip(slots) {
            let default = match &param.kind {
                ParamKind::Named { default } => default.clone(),
                _ => None,
            };
            match slot.or(default) {
                Some(val) => {
                    values.insert(param.name, val);
                }
                None => missing.push(param.name.as_str()),
            }
        }
        if !missing.is_empty() {
            return Err(Error::declaration(format!(
                "Missing required argument(s): {}",
                missing.join(", ")
            )));
        }
        Ok(BoundArgs { values })
    }
}

/// Arguments of a factory call.
#[derive(Clone, Debug, Default)]
pub struct Args {
    positional: Vec<Attr>,
    keyword: Vec<(Id, Attr)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument.
    pub fn arg<V: Into<Attr>>(mut self, val: V) -> Self {
        self.positional.push(val.into());
        self
    }

    /// Append a keyword argument.
    pub fn kwarg<K: Into<Id>, V: Into<Attr>>(mut self, key: K, val: V) -> Self {
        self.keyword.push((key.into(), val.into()));
        self
    }
}

/// Arguments bound to parameter names, in parameter order.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundArgs {
    values: LinkedHashMap<Id, Attr>,
}

impl BoundArgs {
    pub fn get<S: Into<Id>>(&self, name: S) -> Option<&Attr> {
        self.values.get(&name.into())
    }

    /// The integer bound to `name`.
    pub fn int<S: Into<Id>>(&self, name: S) -> ModgenResult<i64> {
        let name = name.into();
        match self.get(name) {
            Some(Attr::Int(i)) => Ok(*i),
            Some(other) => Err(Error::declaration(format!(
                "Argument `{name}' must be an integer, got {other}"
            ))),
            None => Err(Error::declaration(format!("No argument `{name}'"))),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Id, &Attr)> {
        self.values.iter()
    }

    /// The canonical parameter set: every argument not starting with `_`, as
    /// a dictionary sorted by name. Nested dictionaries are sorted too.
    pub fn canonical(&self) -> ModgenResult<Attr> {
        Attr::dict(
            self.values
                .iter()
                .filter(|(k, _)| !k.is_reserved())
                .map(|(k, v)| (*k, v.canonical())),
        )
    }
}

/// Identity of a factory. Never reused within a process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FactoryId(u32);

impl FactoryId {
    fn fresh() -> Self {
        static NEXT: AtomicU32 = AtomicU32::new(0);
        FactoryId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Memoized modules, keyed by factory and canonical parameters. Entries are
/// never evicted. Not thread-safe; wrap in a mutex to share across threads.
#[derive(Debug, Default)]
pub struct ModuleCache {
    entries: RefCell<HashMap<(FactoryId, Attr), Module>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn get(&self, key: &(FactoryId, Attr)) -> Option<Module> {
        self.entries.borrow().get(key).cloned()
    }

    fn insert(&self, key: (FactoryId, Attr), module: Module) {
        self.entries.borrow_mut().insert(key, module);
    }
}

type Producer = Rc<dyn Fn(&BoundArgs) -> ModgenResult<Module>>;

/// A function producing a module from parameters. Calling it twice with
/// equal parameters through the same cache returns the same module.
///
/// ```
/// # use modgen::{Args, ModParams, ModuleCache, ModuleDecl, Param, ParamSignature};
/// # use modgen::ir::Type;
/// let make = ModParams::new(
///     "make",
///     ParamSignature::new([Param::required("width")]),
///     |args| {
///         let width = args.int("width")? as u64;
///         ModuleDecl::new("Make")
///             .input("a", Type::bits(width))
///             .generator("build", |_| Ok(()))
///             .build()
///     },
/// )
/// .unwrap();
/// let cache = ModuleCache::new();
/// let a = make.call(&cache, Args::new().arg(8)).unwrap();
/// let b = make.call(&cache, Args::new().kwarg("width", 8)).unwrap();
/// assert!(a.ptr_eq(&b));
/// assert_eq!(a.name(), "Make_width8");
/// ```
#[derive(Clone)]
pub struct ModParams {
    id: FactoryId,
    name: Id,
    sig: ParamSignature,
    producer: Producer,
    loc: SourceLoc,
}

impl ModParams {
    /// Wrap `producer`. Fails if the signature has variable-length
    /// parameters.
    #[track_caller]
    pub fn new<S, F>(name: S, sig: ParamSignature, producer: F) -> ModgenResult<Self>
    where
        S: Into<Id>,
        F: Fn(&BoundArgs) -> ModgenResult<Module> + 'static,
    {
        let name = name.into();
        let loc = SourceLoc::caller();
        for param in sig.params() {
            let what = match param.kind {
                ParamKind::VarPositional => "variable positional",
                ParamKind::VarKeyword => "variable keyword",
                ParamKind::Named { .. } => continue,
            };
            return Err(Error::declaration(format!(
                "Module parameter definitions cannot have {what} parameters (`{}' in {name})",
                param.name
            ))
            .with_pos(&loc));
        }
        Ok(Self {
            id: FactoryId::fresh(),
            name,
            sig,
            producer: Rc::new(producer),
            loc,
        })
    }

    pub fn name(&self) -> Id {
        self.name
    }

    pub fn id(&self) -> FactoryId {
        self.id
    }

    pub fn signature(&self) -> &ParamSignature {
        &self.sig
    }

    /// Produce the module for `args`, reusing the cached one if this factory
    /// was already called with equal parameters.
    pub fn call(&self, cache: &ModuleCache, args: Args) -> ModgenResult<Module> {
        let bound = self.sig.bind(args).map_err(|e| {
            e.with_pos(&self.loc)
                .with_post_msg(Some(format!("while calling {}", self.name)))
        })?;
        let key = (self.id, bound.canonical()?);
        if let Some(module) = cache.get(&key) {
            log::debug!("{}: cache hit for {}", self.name, key.1);
            return Ok(module);
        }
        log::debug!("{}: cache miss for {}", self.name, key.1);
        let module = (self.producer)(&bound)?;
        module.set_parameters(key.1.clone());
        cache.insert(key, module.clone());
        Ok(module)
    }
}

impl std::fmt::Debug for ModParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ModParams({}, {:?})", self.name, self.id)
    }
}
