//! Declarative hardware module definition and generation.
//!
//! A module is declared with [`ModuleDecl`]: its ports, at most one
//! generator and module-level attributes. A module with a generator is a
//! real module whose body is emitted by running the generator; a module
//! without one is an external module. Declared modules are turned into IR by
//! a [`System`], which creates module ops on first use, builds instances
//! inside generators and drives generation. Parameterized modules are
//! produced by [`ModParams`] factories, memoized in a [`ModuleCache`].
//!
//! ```
//! use modgen::{ModuleDecl, System, ir::Type};
//!
//! let inner = ModuleDecl::new("Passthrough")
//!     .input("a", Type::bits(8))
//!     .output("b", Type::bits(8))
//!     .generator("build", |ports| {
//!         let a = ports.input("a")?;
//!         ports.set("b", a)
//!     })
//!     .build()?;
//! let top = ModuleDecl::new("Top")
//!     .input("x", Type::bits(8))
//!     .output("y", Type::bits(8))
//!     .generator("build", move |ports| {
//!         let x = ports.input("x")?;
//!         let inst = inner.instantiate(ports.sys()?, [("a", x)], Some("p"), None)?;
//!         ports.set("y", inst.output("b")?)
//!     })
//!     .build()?;
//!
//! let sys = System::new("design");
//! sys.add_top(&top)?;
//! sys.generate()?;
//! sys.design().verify()?;
//! # Ok::<(), modgen::Error>(())
//! ```
mod accessors;
mod conf;
mod context;
mod metadata;
mod modparams;
mod module;
mod proxy;
mod schema;
mod signal;
mod system;

pub use accessors::Instance;
pub use conf::SystemConf;
pub use context::{BlockContext, ContextStack};
pub use metadata::Metadata;
pub use modparams::{
    Args, BoundArgs, FactoryId, ModParams, ModuleCache, Param, ParamKind,
    ParamSignature,
};
pub use module::{Module, ModuleId};
pub use proxy::Ports;
pub use schema::{
    declare, Generator, GeneratorOutput, ModuleDecl, ModuleSchema, PortDesc,
    PortRole,
};
pub use signal::{AppId, PortValue, Signal, SignalKind};
pub use system::System;

pub(crate) use accessors::AccessorLayout;
pub(crate) use proxy::ProxyLayout;

pub use modgen_ir as ir;
pub use modgen_utils::{Error, ErrorKind, Id, ModgenResult, SourceLoc};
