//! Depth-bounded macro pre-expansion.
//!
//! A macro is a `pattern → expansion` pair keyed by the head symbol of the
//! terms it rewrites. Expansion runs before reduction and soft-stops at the
//! depth bound: it returns the partially expanded term plus a diagnostic rather
//! than failing.
//!
//! Depth counts vertical re-expansion of one node only. Recursing into
//! components keeps the current depth, so sibling subtrees never share a
//! counter.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::term::Term;
use crate::unify::{substitute, unify};

/// Default bound on nested re-expansion.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// A registered macro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macro {
    /// Matched against the whole candidate term, head included.
    pub pattern: Term,
    pub expansion: Term,
}

/// Why expansion stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroDiagnostic {
    /// The depth bound was reached at `term`, which was left unexpanded.
    DepthLimit { depth: usize, term: Term },
}

/// Result of expanding one term.
#[derive(Debug, Clone, PartialEq)]
pub struct Expansion {
    pub term: Term,
    /// Number of macro rewrites that fired.
    pub rewrites: usize,
    pub diagnostics: Vec<MacroDiagnostic>,
}

impl Expansion {
    /// Whether expansion ran to completion.
    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Head-symbol → macro table.
#[derive(Debug, Clone)]
pub struct MacroTable {
    macros: HashMap<String, Macro>,
    max_depth: usize,
}

impl Default for MacroTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MacroTable {
    pub fn new() -> Self {
        Self {
            macros: HashMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Register (or replace) the macro for head symbol `name`.
    pub fn define_macro(&mut self, name: impl Into<String>, pattern: Term, expansion: Term) {
        let name = name.into();
        tracing::debug!(%name, %pattern, "defining macro");
        self.macros.insert(name, Macro { pattern, expansion });
    }

    pub fn get(&self, name: &str) -> Option<&Macro> {
        self.macros.get(name)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Expand `term` with the table's depth bound.
    pub fn expand(&self, term: &Term) -> Expansion {
        let mut state = ExpandState::default();
        let out = self.expand_at(term, 0, &mut state);
        Expansion {
            term: out.unwrap_or_else(|| term.clone()),
            rewrites: state.rewrites,
            diagnostics: state.diagnostics,
        }
    }

    /// Returns `None` when nothing changed, so untouched subtrees are reused.
    fn expand_at(&self, term: &Term, depth: usize, state: &mut ExpandState) -> Option<Term> {
        if depth >= self.max_depth {
            tracing::warn!(depth, %term, "macro expansion depth limit reached");
            state.diagnostics.push(MacroDiagnostic::DepthLimit {
                depth,
                term: term.clone(),
            });
            return None;
        }

        if let Some(expanded) = self.try_expand_here(term) {
            state.rewrites += 1;
            let deeper = self.expand_at(&expanded, depth + 1, state);
            return Some(deeper.unwrap_or(expanded));
        }

        let Term::Compound {
            operator,
            components,
        } = term
        else {
            return None;
        };
        let mut rebuilt: Option<Vec<Term>> = None;
        for (i, component) in components.iter().enumerate() {
            if let Some(changed) = self.expand_at(component, depth, state) {
                rebuilt.get_or_insert_with(|| components.clone())[i] = changed;
            }
        }
        rebuilt.map(|components| Term::Compound {
            operator: operator.clone(),
            components,
        })
    }

    fn try_expand_here(&self, term: &Term) -> Option<Term> {
        let name = term.head_name()?;
        let m = self.macros.get(name)?;
        let bindings = unify(&m.pattern, term)?;
        tracing::debug!(macro_name = name, %term, "macro fired");
        Some(substitute(&m.expansion, &bindings))
    }
}

#[derive(Default)]
struct ExpandState {
    rewrites: usize,
    diagnostics: Vec<MacroDiagnostic>,
}
