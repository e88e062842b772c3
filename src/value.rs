//! Dimension value resolver.
//!
//! Template layout specs describe positions and extents in several shorthand
//! forms; [`resolve`] turns one of them into an absolute length against a
//! parent size. The precedence order matters and is fixed:
//!
//! 1. percentage string (`"64%"`) → fraction of the parent;
//! 2. `"auto"` → [`Resolved::Defer`] — the caller must special-case it
//!    (only zone heights may be auto);
//! 3. negative number → `parent + value`, anchoring to the far edge
//!    (`-10.0` means "10 mm from the right/bottom");
//! 4. fraction in the open interval (0, 1) → `value * parent`;
//! 5. anything else → the literal value in millimetres.
//!
//! No rule raises an error: a malformed string falls through to float
//! parsing and the resulting NaN propagates, so bounds-checking before
//! rendering stays the caller's job.

use serde::{Deserialize, Serialize};

/// One dimension in a template spec: a number or a keyword string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dim {
    Length(f64),
    Keyword(String),
}

impl Dim {
    pub fn auto() -> Self {
        Dim::Keyword("auto".to_string())
    }

    pub fn percent(text: &str) -> Self {
        Dim::Keyword(text.to_string())
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Dim::Keyword(s) if s == "auto")
    }
}

impl From<f64> for Dim {
    fn from(v: f64) -> Self {
        Dim::Length(v)
    }
}

/// Result of resolving a [`Dim`]: an absolute length, or a deferred value
/// the caller must derive itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolved {
    Length(f64),
    Defer,
}

impl Resolved {
    /// The resolved length, substituting `fallback` for a deferred value.
    pub fn length_or(self, fallback: f64) -> f64 {
        match self {
            Resolved::Length(v) => v,
            Resolved::Defer => fallback,
        }
    }
}

/// Resolve a dimension against a parent size. See the module docs for the
/// precedence rules.
pub fn resolve(dim: &Dim, parent: f64) -> Resolved {
    match dim {
        Dim::Keyword(s) => {
            if let Some(prefix) = s.strip_suffix('%') {
                let pct = prefix.trim().parse::<f64>().unwrap_or(f64::NAN);
                return Resolved::Length(pct / 100.0 * parent);
            }
            if s == "auto" {
                return Resolved::Defer;
            }
            // Non-numeric input parses to NaN and propagates.
            Resolved::Length(resolve_number(
                s.trim().parse::<f64>().unwrap_or(f64::NAN),
                parent,
            ))
        }
        Dim::Length(v) => Resolved::Length(resolve_number(*v, parent)),
    }
}

fn resolve_number(v: f64, parent: f64) -> f64 {
    if v < 0.0 {
        // Anchored to the far edge.
        parent + v
    } else if v > 0.0 && v < 1.0 {
        // Fraction shorthand.
        v * parent
    } else {
        // Literal millimetres. NaN lands here and propagates.
        v
    }
}
