//! Cursor over a delta's ops that can split ops at arbitrary lengths.

use super::{Insertion, Op, OpKind};

/// Length reported for an exhausted iterator. Composition treats the end of
/// a delta as an unbounded retain.
pub(crate) const UNBOUNDED: usize = usize::MAX;

pub(crate) struct OpIter<'a> {
    ops: &'a [Op],
    index: usize,
    offset: usize,
}

impl<'a> OpIter<'a> {
    pub(crate) fn new(ops: &'a [Op]) -> Self {
        Self {
            ops,
            index: 0,
            offset: 0,
        }
    }

    pub(crate) fn has_next(&self) -> bool {
        self.peek_length() < UNBOUNDED
    }

    pub(crate) fn peek(&self) -> Option<&'a Op> {
        self.ops.get(self.index)
    }

    pub(crate) fn peek_length(&self) -> usize {
        match self.ops.get(self.index) {
            Some(op) => op.len() - self.offset,
            None => UNBOUNDED,
        }
    }

    pub(crate) fn peek_kind(&self) -> OpKind {
        self.ops
            .get(self.index)
            .map(Op::kind)
            .unwrap_or(OpKind::Retain)
    }

    /// Take up to `length` from the current op, splitting it if needed.
    pub(crate) fn next(&mut self, length: usize) -> Op {
        let Some(op) = self.ops.get(self.index) else {
            return Op::Retain {
                retain: UNBOUNDED,
                attributes: None,
            };
        };

        let offset = self.offset;
        let remaining = op.len() - offset;
        let length = if length >= remaining {
            self.index += 1;
            self.offset = 0;
            remaining
        } else {
            self.offset += length;
            length
        };

        match op {
            Op::Delete { .. } => Op::Delete { delete: length },
            Op::Retain { attributes, .. } => Op::Retain {
                retain: length,
                attributes: attributes.clone(),
            },
            Op::Insert {
                insert: Insertion::Text(text),
                attributes,
            } => Op::Insert {
                insert: Insertion::Text(text.chars().skip(offset).take(length).collect()),
                attributes: attributes.clone(),
            },
            Op::Insert { .. } => op.clone(),
        }
    }

    pub(crate) fn next_all(&mut self) -> Op {
        self.next(UNBOUNDED)
    }

    /// Everything not yet consumed, with the current op trimmed to its remainder.
    pub(crate) fn rest(&mut self) -> Vec<Op> {
        if !self.has_next() {
            return Vec::new();
        }
        if self.offset == 0 {
            return self.ops[self.index..].to_vec();
        }
        let mut rest = vec![self.next_all()];
        rest.extend_from_slice(&self.ops[self.index..]);
        rest
    }
}
