//! Error taxonomy and per-node diagnostics for the field evaluators.
//!
//! Structural input problems ([`FieldError`]) abort a call before any output
//! mutation. Geometry and numeric edge cases are local to a node/source pair
//! and never abort the batch: the affected output values are ordinary
//! floating-point specials (`Inf`/`NaN`), and the node indices are reported
//! through [`Diagnostics`] so downstream consumers do not trust them.

use thiserror::Error;

/// Structural input errors, reported before any output mutation.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    /// A node or source batch was empty where a non-empty computation was
    /// requested.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// Parallel input/output slices disagree on length.
    #[error("input length mismatch: {0}")]
    LengthMismatch(&'static str),

    /// A geometric parameter failed validation.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(&'static str),
}

/// Per-node evaluation diagnostics returned by a successful evaluator call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    degenerate_nodes: Vec<usize>,
}

impl Diagnostics {
    pub(crate) fn from_flags(flags: &[bool]) -> Self {
        let degenerate_nodes = flags
            .iter()
            .enumerate()
            .filter_map(|(i, &flagged)| flagged.then_some(i))
            .collect();

        Self { degenerate_nodes }
    }

    /// Indices of nodes whose contribution from at least one source was
    /// singular (node coincident with a wire endpoint, node on a wire's
    /// infinite axis, `x = 0` in the ring formulation, or an elliptic
    /// parameter at its sentinel). Ascending, deduplicated.
    pub fn degenerate_nodes(&self) -> &[usize] {
        &self.degenerate_nodes
    }

    /// True when every node's accumulated field value can be trusted.
    pub fn is_clean(&self) -> bool {
        self.degenerate_nodes.is_empty()
    }

    /// Shift node indices by a chunk offset. Used to map chunk-local indices
    /// back to the full batch in the parallel evaluator variants.
    pub(crate) fn offset(mut self, by: usize) -> Self {
        for i in self.degenerate_nodes.iter_mut() {
            *i += by;
        }
        self
    }

    /// Merge diagnostics from two chunks, keeping indices sorted and unique.
    pub(crate) fn merge(mut self, other: Self) -> Self {
        self.degenerate_nodes.extend(other.degenerate_nodes);
        self.degenerate_nodes.sort_unstable();
        self.degenerate_nodes.dedup();
        self
    }
}
