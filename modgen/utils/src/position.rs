//! Source location information for declarations and emitted operations.
//!
//! Locations are captured from the Rust call site of the user-facing API
//! with `#[track_caller]`, so a generator or an instance points back at the
//! line of user code that declared it.

use std::panic::Location;

/// A position in the user's source code.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLoc {
    file: &'static str,
    line: u32,
    col: u32,
}

impl SourceLoc {
    /// The unknown location.
    pub const UNKNOWN: SourceLoc = SourceLoc {
        file: "",
        line: 0,
        col: 0,
    };

    /// Location of the caller of the function this is invoked from.
    /// Propagates through every enclosing `#[track_caller]` function.
    #[track_caller]
    pub fn caller() -> Self {
        Location::caller().into()
    }

    pub fn new(file: &'static str, line: u32, col: u32) -> Self {
        Self { file, line, col }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::UNKNOWN
    }

    pub fn file(&self) -> &'static str {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn col(&self) -> u32 {
        self.col
    }
}

impl Default for SourceLoc {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

impl From<&'static Location<'static>> for SourceLoc {
    fn from(loc: &'static Location<'static>) -> Self {
        Self {
            file: loc.file(),
            line: loc.line(),
            col: loc.column(),
        }
    }
}

impl std::fmt::Debug for SourceLoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl std::fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_unknown() {
            write!(f, "loc(unknown)")
        } else {
            write!(f, "loc(\"{}\":{}:{})", self.file, self.line, self.col)
        }
    }
}

/// An IR node that may contain position information.
pub trait WithPos {
    /// Copy the span associated with this node.
    fn copy_span(&self) -> SourceLoc;
}

impl WithPos for SourceLoc {
    fn copy_span(&self) -> SourceLoc {
        *self
    }
}
