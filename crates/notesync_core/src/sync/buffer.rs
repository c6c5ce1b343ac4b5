use crate::delta::Delta;

/// Local operations captured since the last flush, folded into one delta.
#[derive(Debug, Default)]
pub struct OperationBuffer {
    pending: Delta,
    folded: usize,
}

impl OperationBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold `change` in after everything already buffered.
    pub fn compose(&mut self, change: &Delta) {
        self.pending = self.pending.compose(change);
        self.folded += 1;
    }

    /// Take the composed operation and reset, or `None` if nothing is buffered.
    pub fn take(&mut self) -> Option<Delta> {
        self.folded = 0;
        let pending = std::mem::take(&mut self.pending);
        (!pending.is_empty()).then_some(pending)
    }

    /// Whether nothing has been captured since the last take.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of operations folded in since the last take.
    pub fn folded(&self) -> usize {
        self.folded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_and_take() {
        let mut buffer = OperationBuffer::new();
        assert!(buffer.take().is_none());

        buffer.compose(&Delta::new().insert("a", None));
        buffer.compose(&Delta::new().retain(1, None).insert("b", None));
        assert_eq!(buffer.folded(), 2);

        assert_eq!(buffer.take(), Some(Delta::new().insert("ab", None)));
        assert!(buffer.is_empty());
        assert_eq!(buffer.folded(), 0);
    }

    #[test]
    fn test_cancelling_edits_leave_nothing_to_send() {
        let mut buffer = OperationBuffer::new();
        buffer.compose(&Delta::new().insert("x", None));
        buffer.compose(&Delta::new().delete(1));
        assert!(buffer.take().is_none());
    }
}
