//! Bookkeeping for generator scopes.
use modgen_utils::{Error, Id, ModgenResult, NameGenerator};

/// Local symbols issued within one generator invocation.
#[derive(Debug, Default)]
pub struct BlockContext {
    symbols: NameGenerator,
}

impl BlockContext {
    /// Returns `base` if it has not been issued in this scope, otherwise the
    /// first of `base_1`, `base_2`, ... that has not. The returned symbol is
    /// recorded.
    pub fn uniquify<S: Into<Id>>(&mut self, base: S) -> Id {
        self.symbols.uniquify(base)
    }

    /// True if `sym` was already issued in this scope.
    pub fn contains<S: Into<Id>>(&self, sym: S) -> bool {
        self.symbols.contains(sym)
    }
}

/// LIFO stack of [`BlockContext`]s. The top frame belongs to the innermost
/// generator being run.
#[derive(Debug, Default)]
pub struct ContextStack {
    frames: Vec<BlockContext>,
}

impl ContextStack {
    /// Push a new, empty frame.
    pub fn enter(&mut self) {
        self.frames.push(BlockContext::default());
        log::trace!("Entered block context (depth {})", self.frames.len());
    }

    /// Pop the top frame.
    pub fn exit(&mut self) -> ModgenResult<BlockContext> {
        let frame = self.frames.pop().ok_or_else(|| {
            Error::internal("Exiting a block context that was never entered")
        })?;
        log::trace!("Exited block context (depth {})", self.frames.len());
        Ok(frame)
    }

    /// The innermost frame.
    pub fn current(&mut self) -> ModgenResult<&mut BlockContext> {
        self.frames
            .last_mut()
            .ok_or_else(|| Error::internal("No active block context"))
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Uniquify `base` within the innermost frame.
    pub fn uniquify<S: Into<Id>>(&mut self, base: S) -> ModgenResult<Id> {
        Ok(self.current()?.uniquify(base))
    }
}

#[cfg(test)]
mod tests {
    use super::ContextStack;
    use modgen_utils::ErrorKind;

    #[test]
    fn no_frame_is_an_invariant_violation() {
        let mut stack = ContextStack::default();
        let err = stack.uniquify("x").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Internal(_)));
        assert!(stack.exit().is_err());
    }

    #[test]
    fn frames_are_independent() {
        let mut stack = ContextStack::default();
        stack.enter();
        assert_eq!(stack.uniquify("inst").unwrap(), "inst");
        assert_eq!(stack.uniquify("inst").unwrap(), "inst_1");

        stack.enter();
        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.uniquify("inst").unwrap(), "inst");
        let inner = stack.exit().unwrap();
        assert!(inner.contains("inst"));

        assert_eq!(stack.uniquify("inst").unwrap(), "inst_2");
        stack.exit().unwrap();
        assert_eq!(stack.depth(), 0);
    }
}
