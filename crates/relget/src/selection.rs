//! The shared "one or many" result shape used by detectors and extractors.

use crate::error::Error;
use serde::Serialize;
use std::fmt;

/// Outcome of narrowing a set of candidates.
///
/// A selection that found nothing is reported as [`Error::NotFound`] instead,
/// so an `Ambiguous` value always carries something for the caller to pick from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum Selection<T> {
    /// A single confident result.
    Resolved(T),

    /// Several results remain; the caller decides.
    Ambiguous {
        /// Every remaining candidate, in input order
        candidates: Vec<T>,
        /// Human-readable explanation (e.g. "3 matches found")
        reason: String,
    },
}

impl<T> Selection<T> {
    /// Returns the resolved item, if any.
    pub fn resolved(self) -> Option<T> {
        match self {
            Selection::Resolved(item) => Some(item),
            Selection::Ambiguous { .. } => None,
        }
    }

    /// Returns the candidate list; empty for a resolved selection.
    pub fn candidates(&self) -> &[T] {
        match self {
            Selection::Resolved(_) => &[],
            Selection::Ambiguous { candidates, .. } => candidates,
        }
    }

    /// Whether the selection was narrowed to a single item.
    pub fn is_resolved(&self) -> bool {
        matches!(self, Selection::Resolved(_))
    }

    /// Collapse into every selected item, resolved or not.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Selection::Resolved(item) => vec![item],
            Selection::Ambiguous { candidates, .. } => candidates,
        }
    }

    /// Transform every item, keeping the shape.
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Selection<U> {
        match self {
            Selection::Resolved(item) => Selection::Resolved(f(item)),
            Selection::Ambiguous { candidates, reason } => Selection::Ambiguous {
                candidates: candidates.into_iter().map(f).collect(),
                reason,
            },
        }
    }
}

impl<T: fmt::Display> Selection<T> {
    /// Treat ambiguity as a hard failure.
    pub fn into_resolved(self) -> Result<T, Error> {
        match self {
            Selection::Resolved(item) => Ok(item),
            Selection::Ambiguous { candidates, reason } => Err(Error::Ambiguous {
                reason,
                candidates: candidates.iter().map(ToString::to_string).collect(),
            }),
        }
    }
}

/// Bucket a candidate list into a selection.
///
/// One candidate resolves, several are ambiguous (with the message built by
/// `ambiguous`), none is a `NotFound` error built by `missing`.
pub(crate) fn resolve<T>(
    mut candidates: Vec<T>,
    ambiguous: impl FnOnce(usize) -> String,
    missing: impl FnOnce() -> String,
) -> Result<Selection<T>, Error> {
    match candidates.len() {
        0 => Err(Error::NotFound(missing())),
        1 => Ok(Selection::Resolved(candidates.remove(0))),
        n => Ok(Selection::Ambiguous {
            candidates,
            reason: ambiguous(n),
        }),
    }
}
