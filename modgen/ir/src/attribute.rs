use crate::Type;
use itertools::Itertools;
use linked_hash_map::LinkedHashMap;
use modgen_utils::{Error, Id, ModgenResult};

/// An attribute value attached to an operation or used as a module
/// parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum Attr {
    /// Presence-only flag.
    Unit,
    Bool(bool),
    Int(i64),
    Str(String),
    Type(Type),
    Array(Vec<Attr>),
    /// Dictionary whose entries are sorted by key. Construct with
    /// [`Attr::dict`] to keep that invariant.
    Dict(Vec<(Id, Attr)>),
    /// Name of the file a module is emitted into.
    OutputFile(String),
    /// Application-level identifier of an instance.
    AppId { name: Id, index: Option<u64> },
    /// Reference to a symbol in the design.
    SymbolRef(Id),
}

impl Attr {
    /// Build a canonical dictionary attribute. Entries are sorted by key so
    /// that two dictionaries with equal contents compare and hash equal.
    pub fn dict<I>(entries: I) -> ModgenResult<Self>
    where
        I: IntoIterator<Item = (Id, Attr)>,
    {
        let mut entries = entries.into_iter().collect_vec();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        if let Some(((dup, _), _)) =
            entries.iter().tuple_windows().find(|((a, _), (b, _))| a == b)
        {
            return Err(Error::ir(format!(
                "Multiple entries for dictionary key: {dup}"
            )));
        }
        Ok(Attr::Dict(entries))
    }

    /// The same value with every dictionary, at any depth, sorted by key.
    pub fn canonical(&self) -> Attr {
        match self {
            Attr::Dict(entries) => {
                let mut entries = entries
                    .iter()
                    .map(|(k, v)| (*k, v.canonical()))
                    .collect_vec();
                entries.sort_by(|(a, _), (b, _)| a.cmp(b));
                Attr::Dict(entries)
            }
            Attr::Array(vs) => {
                Attr::Array(vs.iter().map(Attr::canonical).collect())
            }
            other => other.clone(),
        }
    }

    pub fn as_dict(&self) -> Option<&[(Id, Attr)]> {
        match self {
            Attr::Dict(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attr::Str(s) | Attr::OutputFile(s) => Some(s),
            _ => None,
        }
    }

    /// Type of a formal parameter declared with this attribute as its value.
    pub fn param_ty(&self) -> ParamTy {
        match self {
            Attr::Unit => ParamTy::Unit,
            Attr::Bool(_) => ParamTy::Bool,
            Attr::Int(_) => ParamTy::Integer,
            Attr::Str(_) | Attr::OutputFile(_) => ParamTy::String,
            Attr::Type(_) => ParamTy::Type,
            Attr::Array(_) => ParamTy::Array,
            Attr::Dict(_) => ParamTy::Dict,
            Attr::AppId { .. } | Attr::SymbolRef(_) => ParamTy::Symbol,
        }
    }

    /// Plain rendering of the value, without the IR syntax. Used to derive
    /// names from parameter values.
    pub fn to_var_string(&self) -> String {
        match self {
            Attr::Unit => String::new(),
            Attr::Bool(b) => b.to_string(),
            Attr::Int(i) => i.to_string(),
            Attr::Str(s) | Attr::OutputFile(s) => s.clone(),
            Attr::Type(ty) => ty.to_string(),
            Attr::Array(vs) => {
                format!("[{}]", vs.iter().map(Attr::to_var_string).join(", "))
            }
            Attr::Dict(entries) => format!(
                "{{{}}}",
                entries
                    .iter()
                    .map(|(k, v)| format!("{k}: {}", v.to_var_string()))
                    .join(", ")
            ),
            Attr::AppId { name, index } => match index {
                Some(idx) => format!("{name}[{idx}]"),
                None => name.to_string(),
            },
            Attr::SymbolRef(sym) => sym.to_string(),
        }
    }
}

impl std::fmt::Display for Attr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Attr::Unit => write!(f, "unit"),
            Attr::Bool(b) => write!(f, "{b}"),
            Attr::Int(i) => write!(f, "{i} : i64"),
            Attr::Str(s) => write!(f, "{s:?}"),
            Attr::Type(ty) => write!(f, "{ty}"),
            Attr::Array(vs) => write!(f, "[{}]", vs.iter().join(", ")),
            Attr::Dict(entries) => write!(
                f,
                "{{{}}}",
                entries.iter().map(|(k, v)| format!("{k} = {v}")).join(", ")
            ),
            Attr::OutputFile(name) => write!(f, "#hw.output_file<{name:?}>"),
            Attr::AppId { name, index } => match index {
                Some(idx) => write!(f, "#esi.appid<{:?}[{idx}]>", name.as_str()),
                None => write!(f, "#esi.appid<{:?}>", name.as_str()),
            },
            Attr::SymbolRef(sym) => write!(f, "@{sym}"),
        }
    }
}

impl From<bool> for Attr {
    fn from(b: bool) -> Self {
        Attr::Bool(b)
    }
}

impl From<i64> for Attr {
    fn from(i: i64) -> Self {
        Attr::Int(i)
    }
}

impl From<i32> for Attr {
    fn from(i: i32) -> Self {
        Attr::Int(i as i64)
    }
}

impl From<u32> for Attr {
    fn from(i: u32) -> Self {
        Attr::Int(i as i64)
    }
}

impl From<&str> for Attr {
    fn from(s: &str) -> Self {
        Attr::Str(s.to_string())
    }
}

impl From<String> for Attr {
    fn from(s: String) -> Self {
        Attr::Str(s)
    }
}

impl From<Type> for Attr {
    fn from(ty: Type) -> Self {
        Attr::Type(ty)
    }
}

impl<T: Into<Attr>> From<Vec<T>> for Attr {
    fn from(vs: Vec<T>) -> Self {
        Attr::Array(vs.into_iter().map(Into::into).collect())
    }
}

/// Kind of value a formal parameter of an external module accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub enum ParamTy {
    Unit,
    Bool,
    Integer,
    String,
    Type,
    Array,
    Dict,
    Symbol,
}

impl std::fmt::Display for ParamTy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ParamTy::Unit => "none",
            ParamTy::Bool => "i1",
            ParamTy::Integer => "i64",
            ParamTy::String => "none",
            ParamTy::Type => "!hw.type",
            ParamTy::Array => "!hw.array",
            ParamTy::Dict => "!hw.dict",
            ParamTy::Symbol => "!hw.symbol",
        };
        write!(f, "{s}")
    }
}

/// Formal parameter declaration on an external module. Parameters have no
/// default: every instance must bind them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct ParamDecl {
    pub name: Id,
    pub ty: ParamTy,
}

impl ParamDecl {
    pub fn no_default(name: Id, ty: ParamTy) -> Self {
        Self { name, ty }
    }
}

/// Attributes associated with a specific IR structure. Iteration follows
/// insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    /// Mapping from the name of the attribute to its value.
    attrs: LinkedHashMap<Id, Attr>,
}

impl IntoIterator for Attributes {
    type Item = (Id, Attr);
    type IntoIter = linked_hash_map::IntoIter<Id, Attr>;

    fn into_iter(self) -> Self::IntoIter {
        self.attrs.into_iter()
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = (&'a Id, &'a Attr);
    type IntoIter = linked_hash_map::Iter<'a, Id, Attr>;

    fn into_iter(self) -> Self::IntoIter {
        self.attrs.iter()
    }
}

impl FromIterator<(Id, Attr)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (Id, Attr)>>(iter: T) -> Self {
        Attributes {
            attrs: iter.into_iter().collect(),
        }
    }
}

impl Attributes {
    /// Add a new attribute, replacing any previous value for `key`.
    pub fn insert<K: Into<Id>>(&mut self, key: K, val: Attr) {
        self.attrs.insert(key.into(), val);
    }

    /// Get the value associated with an attribute key
    pub fn get<K: Into<Id>>(&self, key: K) -> Option<&Attr> {
        self.attrs.get(&key.into())
    }

    /// Check if an attribute key has been set
    pub fn has<K: Into<Id>>(&self, key: K) -> bool {
        self.attrs.contains_key(&key.into())
    }

    /// Returns true if there are no attributes
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// Remove attribute with the name `key`
    pub fn remove<K: Into<Id>>(&mut self, key: K) -> Option<Attr> {
        self.attrs.remove(&key.into())
    }

    pub fn iter(&self) -> linked_hash_map::Iter<'_, Id, Attr> {
        self.attrs.iter()
    }
}
