//! Errors generated by the framework.
use crate::{Id, SourceLoc, WithPos};
use itertools::Itertools;
use thiserror::Error;

/// Convinience wrapper to represent success or meaningful error.
pub type ModgenResult<T> = std::result::Result<T, Error>;

/// Errors generated while declaring, instantiating or generating modules.
#[derive(Clone, PartialEq, Eq)]
pub struct Error {
    kind: Box<ErrorKind>,
    /// Location of the construct that triggered the error
    loc: SourceLoc,
    /// Extra message appended to the error
    post_msg: Option<String>,
}

fn join_ids(ids: &[Id]) -> String {
    ids.iter().join(", ")
}

/// Standard error type for the framework.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Ports referenced by name that the module does not define.
    #[error("Port(s) {} not found in module {module}", join_ids(.ports))]
    UnknownPorts { module: Id, ports: Vec<Id> },

    /// Inputs supplied more than once at instantiation.
    #[error(
        "Port(s) {} supplied more than once to module {module}",
        join_ids(.ports)
    )]
    DuplicateInputs { module: Id, ports: Vec<Id> },

    /// Required inputs that were not supplied at instantiation.
    #[error("Missing input signals for ports: {}", join_ids(.ports))]
    MissingInputs { module: Id, ports: Vec<Id> },

    /// An input left disconnected on a module that has a generator.
    #[error(
        "Port {port} cannot be None (disconnected ports only allowed on extern mods)"
    )]
    Disconnected { port: Id },

    /// A signal bound to a port has the wrong type.
    #[error("Wrong type on port '{port}'. Got '{found}', expected '{expected}'")]
    TypeMismatch {
        port: Id,
        expected: String,
        found: String,
    },

    /// Outputs left unassigned at the end of generation.
    #[error("Module {module} has unconnected output ports: {}", join_ids(.ports))]
    UnconnectedOutputs { module: Id, ports: Vec<Id> },

    /// An instance input was read from outside of a generator.
    #[error("Cannot access signal via instance input `{port}'")]
    InstanceInput { port: Id },

    /// A port was used against its direction through an accessor.
    #[error("Port `{port}' {msg}")]
    PortDirection { port: Id, msg: String },

    /// A proxy or instance was used after its references were released.
    #[error("{0}")]
    Released(String),

    /// A module or factory declaration violates its contract.
    #[error("{0}")]
    Declaration(String),

    /// Generator execution violates its contract.
    #[error("{0}")]
    Generator(String),

    /// Structural error reported by the IR.
    #[error("{0}")]
    Ir(String),

    /// Violation of an internal invariant.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    fn new(kind: ErrorKind) -> Self {
        Self {
            kind: Box::new(kind),
            loc: SourceLoc::UNKNOWN,
            post_msg: None,
        }
    }

    pub fn with_pos<T: WithPos>(mut self, pos: &T) -> Self {
        self.loc = pos.copy_span();
        self
    }

    pub fn with_post_msg(mut self, msg: Option<String>) -> Self {
        self.post_msg = msg;
        self
    }

    pub fn unknown_ports(module: Id, ports: Vec<Id>) -> Self {
        Self::new(ErrorKind::UnknownPorts { module, ports })
    }

    pub fn duplicate_inputs(module: Id, ports: Vec<Id>) -> Self {
        Self::new(ErrorKind::DuplicateInputs { module, ports })
    }

    pub fn missing_inputs(module: Id, ports: Vec<Id>) -> Self {
        Self::new(ErrorKind::MissingInputs { module, ports })
    }

    pub fn disconnected(port: Id) -> Self {
        Self::new(ErrorKind::Disconnected { port })
    }

    pub fn type_mismatch<E: ToString, F: ToString>(
        port: Id,
        expected: E,
        found: F,
    ) -> Self {
        Self::new(ErrorKind::TypeMismatch {
            port,
            expected: expected.to_string(),
            found: found.to_string(),
        })
    }

    pub fn unconnected_outputs(module: Id, ports: Vec<Id>) -> Self {
        Self::new(ErrorKind::UnconnectedOutputs { module, ports })
    }

    pub fn instance_input(port: Id) -> Self {
        Self::new(ErrorKind::InstanceInput { port })
    }

    pub fn port_direction<S: ToString>(port: Id, msg: S) -> Self {
        Self::new(ErrorKind::PortDirection {
            port,
            msg: msg.to_string(),
        })
    }

    pub fn released<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Released(msg.to_string()))
    }

    pub fn declaration<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Declaration(msg.to_string()))
    }

    pub fn generator<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Generator(msg.to_string()))
    }

    pub fn ir<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Ir(msg.to_string()))
    }

    pub fn internal<S: ToString>(msg: S) -> Self {
        Self::new(ErrorKind::Internal(msg.to_string()))
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn location(&self) -> SourceLoc {
        self.loc
    }

    /// Ports named by a port-contract violation, in report order.
    pub fn ports(&self) -> Vec<Id> {
        match &*self.kind {
            ErrorKind::UnknownPorts { ports, .. }
            | ErrorKind::DuplicateInputs { ports, .. }
            | ErrorKind::MissingInputs { ports, .. }
            | ErrorKind::UnconnectedOutputs { ports, .. } => ports.clone(),
            ErrorKind::Disconnected { port }
            | ErrorKind::TypeMismatch { port, .. }
            | ErrorKind::InstanceInput { port }
            | ErrorKind::PortDirection { port, .. } => vec![*port],
            _ => vec![],
        }
    }

    /// True for every port-contract violation.
    pub fn is_port_error(&self) -> bool {
        matches!(
            &*self.kind,
            ErrorKind::UnknownPorts { .. }
                | ErrorKind::DuplicateInputs { .. }
                | ErrorKind::MissingInputs { .. }
                | ErrorKind::Disconnected { .. }
                | ErrorKind::TypeMismatch { .. }
                | ErrorKind::UnconnectedOutputs { .. }
                | ErrorKind::InstanceInput { .. }
                | ErrorKind::PortDirection { .. }
                | ErrorKind::Released(_)
        )
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.loc.is_unknown() {
            write!(f, "{}: ", self.loc)?;
        }
        write!(f, "{}", self.kind)?;
        if let Some(post) = &self.post_msg {
            write!(f, "\n{post}")?;
        }
        Ok(())
    }
}

// Print the same thing as Display so that `main` and test failures are
// readable.
impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::ir(format!("IO error: {err}"))
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Error::internal(err.to_string())
    }
}
