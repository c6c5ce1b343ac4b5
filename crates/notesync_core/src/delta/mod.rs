//! Rich-text operations.
//!
//! A [`Delta`] is an ordered list of [`Op`]s describing either a whole
//! document (inserts only) or a change to one (inserts, retains and deletes).
//! The JSON shape is the one rich-text editors exchange on the wire:
//!
//! ```json
//! {"ops": [{"retain": 5}, {"insert": "!", "attributes": {"bold": true}}]}
//! ```
//!
//! # Algebra
//!
//! - [`Delta::compose`] is "apply `other` after `self`" and is associative, so
//!   a burst of edits can be folded into one delta without changing its effect.
//! - [`Delta::apply`] composes a change onto a document and rejects changes that
//!   reach past the end of it.
//! - [`Delta::validate`] is the structural check run on untrusted input before
//!   it is applied.

mod attributes;
mod iter;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use attributes::AttributeMap;
use iter::{OpIter, UNBOUNDED};

/// Character used to render an embed in plain text.
pub const EMBED_PLACEHOLDER: char = '\u{FFFC}';

/// Structural problems found in a delta.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeltaError {
    /// The delta has no ops.
    #[error("operation list is empty")]
    EmptyOps,

    /// A retain or delete of length zero.
    #[error("op {index} has zero length")]
    ZeroLength {
        /// Position of the op.
        index: usize,
    },

    /// An insert of the empty string.
    #[error("op {index} inserts an empty string")]
    EmptyInsert {
        /// Position of the op.
        index: usize,
    },

    /// The change does not fit the document it is applied to.
    #[error("operation reaches past the end of a document of length {length}")]
    OutOfBounds {
        /// Length of the document.
        length: usize,
    },

    /// Op lengths add up past the addressable range.
    #[error("op {index} pushes the total length past the addressable range")]
    TooLong {
        /// Position of the first op past the range.
        index: usize,
    },
}

/// Content inserted by an insert op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Insertion {
    /// Plain text.
    Text(String),
    /// A single embedded object (image, formula, ...). Always length 1.
    Embed(serde_json::Map<String, serde_json::Value>),
}

impl Insertion {
    /// Length in document positions (Unicode scalar values for text).
    pub fn len(&self) -> usize {
        match self {
            Insertion::Text(text) => text.chars().count(),
            Insertion::Embed(_) => 1,
        }
    }

    /// Whether nothing is inserted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single delta operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Op {
    /// Insert text or an embed.
    Insert {
        /// What is inserted.
        insert: Insertion,
        /// Formatting of the inserted content.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attributes: Option<AttributeMap>,
    },
    /// Keep positions, optionally reformatting them.
    Retain {
        /// Number of positions kept.
        retain: usize,
        /// Formatting changes; `null` values remove a key.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        attributes: Option<AttributeMap>,
    },
    /// Remove positions.
    Delete {
        /// Number of positions removed.
        delete: usize,
    },
}

/// Discriminant of an [`Op`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    /// An insert op.
    Insert,
    /// A retain op.
    Retain,
    /// A delete op.
    Delete,
}

impl Op {
    /// Unformatted text insert.
    pub fn text(text: impl Into<String>) -> Self {
        Op::Insert {
            insert: Insertion::Text(text.into()),
            attributes: None,
        }
    }

    /// Which kind of op this is.
    pub fn kind(&self) -> OpKind {
        match self {
            Op::Insert { .. } => OpKind::Insert,
            Op::Retain { .. } => OpKind::Retain,
            Op::Delete { .. } => OpKind::Delete,
        }
    }

    /// Length in document positions.
    pub fn len(&self) -> usize {
        match self {
            Op::Insert { insert, .. } => insert.len(),
            Op::Retain { retain, .. } => *retain,
            Op::Delete { delete } => *delete,
        }
    }

    /// Whether the op covers no positions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Formatting carried by the op. Deletes have none.
    pub fn attributes(&self) -> Option<&AttributeMap> {
        match self {
            Op::Insert { attributes, .. } | Op::Retain { attributes, .. } => attributes.as_ref(),
            Op::Delete { .. } => None,
        }
    }
}

/// An ordered list of operations, kept in canonical form by [`Delta::push`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    #[serde(default)]
    ops: Vec<Op>,
}

impl Delta {
    /// The empty (identity) delta.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a delta from ops, merging and reordering them into canonical form.
    pub fn from_ops(ops: impl IntoIterator<Item = Op>) -> Self {
        let mut delta = Self::new();
        for op in ops {
            delta.push(op);
        }
        delta
    }

    /// The ops in order.
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Whether this is the identity delta.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Append a text insert.
    pub fn insert(mut self, text: impl Into<String>, attributes: Option<AttributeMap>) -> Self {
        self.push(Op::Insert {
            insert: Insertion::Text(text.into()),
            attributes: attributes::normalize(attributes),
        });
        self
    }

    /// Append an embed insert.
    pub fn insert_embed(
        mut self,
        embed: serde_json::Map<String, serde_json::Value>,
        attributes: Option<AttributeMap>,
    ) -> Self {
        self.push(Op::Insert {
            insert: Insertion::Embed(embed),
            attributes: attributes::normalize(attributes),
        });
        self
    }

    /// Append a retain, optionally applying formatting.
    pub fn retain(mut self, length: usize, attributes: Option<AttributeMap>) -> Self {
        self.push(Op::Retain {
            retain: length,
            attributes: attributes::normalize(attributes),
        });
        self
    }

    /// Append a delete.
    pub fn delete(mut self, length: usize) -> Self {
        self.push(Op::Delete { delete: length });
        self
    }

    /// Append an op, keeping the delta canonical.
    ///
    /// Zero-length ops are dropped, adjacent deletes merge, an insert after a
    /// delete is moved in front of it, and neighbouring text inserts or retains
    /// with equal attributes merge.
    pub fn push(&mut self, op: Op) -> &mut Self {
        if op.is_empty() {
            return self;
        }

        let mut index = self.ops.len();
        if index > 0 {
            if let (Op::Delete { delete: last }, Op::Delete { delete }) =
                (&mut self.ops[index - 1], &op)
            {
                *last = last.saturating_add(*delete);
                return self;
            }

            if matches!(self.ops[index - 1], Op::Delete { .. }) && op.kind() == OpKind::Insert {
                index -= 1;
                if index == 0 {
                    self.ops.insert(0, op);
                    return self;
                }
            }

            match (&mut self.ops[index - 1], &op) {
                (
                    Op::Insert {
                        insert: Insertion::Text(last),
                        attributes: last_attributes,
                    },
                    Op::Insert {
                        insert: Insertion::Text(text),
                        attributes,
                    },
                ) if *last_attributes == *attributes => {
                    last.push_str(text);
                    return self;
                }
                (
                    Op::Retain {
                        retain: last,
                        attributes: last_attributes,
                    },
                    Op::Retain { retain, attributes },
                ) if *last_attributes == *attributes => {
                    *last = last.saturating_add(*retain);
                    return self;
                }
                _ => {}
            }
        }

        self.ops.insert(index, op);
        self
    }

    /// Drop a trailing retain that carries no attributes.
    pub fn chop(mut self) -> Self {
        if let Some(Op::Retain {
            attributes: None, ..
        }) = self.ops.last()
        {
            self.ops.pop();
        }
        self
    }

    /// Append `other`, merging at the seam.
    pub fn concat(mut self, other: Delta) -> Self {
        let mut rest = other.ops.into_iter();
        if let Some(first) = rest.next() {
            self.push(first);
            self.ops.extend(rest);
        }
        self
    }

    /// Total length of all ops.
    pub fn length(&self) -> usize {
        self.ops
            .iter()
            .fold(0usize, |total, op| total.saturating_add(op.len()))
    }

    /// Total length, or the index of the first op that overflows it.
    ///
    /// Lengths must stay below [`UNBOUNDED`], which the op iterator reserves
    /// for "past the end".
    fn checked_length(&self) -> Result<usize, DeltaError> {
        let mut total = 0usize;
        for (index, op) in self.ops.iter().enumerate() {
            total = total
                .checked_add(op.len())
                .filter(|total| *total < UNBOUNDED)
                .ok_or(DeltaError::TooLong { index })?;
        }
        Ok(total)
    }

    /// Whether this delta describes a document (inserts only).
    pub fn is_document(&self) -> bool {
        self.ops.iter().all(|op| op.kind() == OpKind::Insert)
    }

    /// Compose `other` after `self`.
    ///
    /// `a.compose(&b)` has the same effect as applying `a` then `b`, and
    /// `a.compose(&b).compose(&c) == a.compose(&b.compose(&c))`.
    pub fn compose(&self, other: &Delta) -> Delta {
        let mut this_iter = OpIter::new(&self.ops);
        let mut other_iter = OpIter::new(&other.ops);
        let mut ops = Vec::new();

        // Fast path: a leading plain retain in `other` passes whole inserts through.
        if let Some(Op::Retain {
            retain,
            attributes: None,
        }) = other_iter.peek()
        {
            let mut first_left = *retain;
            while this_iter.peek_kind() == OpKind::Insert && this_iter.peek_length() <= first_left
            {
                first_left -= this_iter.peek_length();
                ops.push(this_iter.next_all());
            }
            if *retain - first_left > 0 {
                other_iter.next(*retain - first_left);
            }
        }

        let mut delta = Delta { ops };
        while this_iter.has_next() || other_iter.has_next() {
            if other_iter.peek_kind() == OpKind::Insert {
                delta.push(other_iter.next_all());
                continue;
            }
            if this_iter.peek_kind() == OpKind::Delete {
                delta.push(this_iter.next_all());
                continue;
            }

            let length = this_iter.peek_length().min(other_iter.peek_length());
            let this_op = this_iter.next(length);
            let other_op = other_iter.next(length);

            let composed = match (this_op, other_op) {
                (
                    Op::Retain { attributes: a, .. },
                    Op::Retain { attributes: b, .. },
                ) => Op::Retain {
                    retain: length,
                    attributes: attributes::compose(a.as_ref(), b.as_ref(), true),
                },
                (
                    Op::Insert {
                        insert,
                        attributes: a,
                    },
                    Op::Retain { attributes: b, .. },
                ) => Op::Insert {
                    insert,
                    attributes: attributes::compose(a.as_ref(), b.as_ref(), false),
                },
                (Op::Retain { .. }, Op::Delete { delete }) => {
                    delta.push(Op::Delete { delete });
                    continue;
                }
                // An insert followed by a delete of the same range cancels out.
                _ => continue,
            };

            delta.push(composed.clone());
            // Nothing left in `other`: the remainder of `self` passes through untouched.
            if !other_iter.has_next() && delta.ops.last() == Some(&composed) {
                let rest = Delta {
                    ops: this_iter.rest(),
                };
                return delta.concat(rest).chop();
            }
        }

        delta.chop()
    }

    /// Apply a change to a document delta.
    ///
    /// Fails without touching `self` if the change retains formatting, deletes,
    /// or inserts past the end of the document.
    pub fn apply(&self, change: &Delta) -> Result<Delta, DeltaError> {
        change.checked_length()?;
        let result = self.compose(change);
        if !result.is_document() {
            return Err(DeltaError::OutOfBounds {
                length: self.length(),
            });
        }
        Ok(result)
    }

    /// Structural validity check for untrusted input.
    pub fn validate(&self) -> Result<(), DeltaError> {
        if self.ops.is_empty() {
            return Err(DeltaError::EmptyOps);
        }
        for (index, op) in self.ops.iter().enumerate() {
            match op {
                Op::Insert {
                    insert: Insertion::Text(text),
                    ..
                } if text.is_empty() => return Err(DeltaError::EmptyInsert { index }),
                Op::Retain { retain: 0, .. } | Op::Delete { delete: 0 } => {
                    return Err(DeltaError::ZeroLength { index });
                }
                _ => {}
            }
        }
        self.checked_length().map(|_| ())
    }

    /// Render the document's text, with embeds as [`EMBED_PLACEHOLDER`].
    pub fn to_plain_text(&self) -> String {
        let mut text = String::new();
        for op in &self.ops {
            if let Op::Insert { insert, .. } = op {
                match insert {
                    Insertion::Text(s) => text.push_str(s),
                    Insertion::Embed(_) => text.push(EMBED_PLACEHOLDER),
                }
            }
        }
        text
    }
}
