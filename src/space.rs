//! Knowledge space: a duplicate-collapsing atom store plus an ordered rule list.
//!
//! Rules are tried in insertion order by the [`Reducer`](crate::reduce::Reducer);
//! they are never reordered by specificity. Every added atom is also forwarded
//! to an optional [`AtomSink`], the queue an external memory drains.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::sync::mpsc::Sender;

use crate::term::{Bindings, Term};
use crate::unify::{substitute, unify};

/// Receiver for atoms added to a [`Space`].
pub trait AtomSink {
    fn enqueue(&self, atom: &Term);
}

impl AtomSink for Sender<Term> {
    fn enqueue(&self, atom: &Term) {
        // A dropped receiver just means nobody is listening any more.
        if self.send(atom.clone()).is_err() {
            tracing::trace!(%atom, "atom sink disconnected");
        }
    }
}

/// Native rule body: computes the rewrite from the match bindings.
pub type RuleFn = Arc<dyn Fn(&Bindings) -> Term + Send + Sync>;

/// Right-hand side of a rewrite rule.
#[derive(Clone)]
pub enum RuleResult {
    /// Instantiated by substituting the match bindings.
    Template(Term),
    /// Computed natively from the match bindings.
    Native(RuleFn),
}

impl RuleResult {
    /// Produce the rewritten term for a successful match.
    pub fn instantiate(&self, bindings: &Bindings) -> Term {
        match self {
            RuleResult::Template(template) => substitute(template, bindings),
            RuleResult::Native(f) => f(bindings),
        }
    }
}

impl fmt::Debug for RuleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleResult::Template(t) => f.debug_tuple("Template").field(t).finish(),
            RuleResult::Native(_) => f.write_str("Native(<fn>)"),
        }
    }
}

/// A rewrite rule `pattern → result`.
#[derive(Debug, Clone)]
pub struct Rule {
    pub pattern: Term,
    pub result: RuleResult,
}

impl Rule {
    pub fn new(pattern: Term, result: Term) -> Self {
        Self {
            pattern,
            result: RuleResult::Template(result),
        }
    }

    pub fn native(pattern: Term, f: impl Fn(&Bindings) -> Term + Send + Sync + 'static) -> Self {
        Self {
            pattern,
            result: RuleResult::Native(Arc::new(f)),
        }
    }
}

/// The mutable atom/rule store of one session.
#[derive(Default)]
pub struct Space {
    /// Insertion-ordered atoms; `index` keeps them unique.
    atoms: Vec<Term>,
    index: HashSet<Term>,
    rules: Vec<Rule>,
    sink: Option<Box<dyn AtomSink>>,
}

impl Space {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the external memory queue that receives every added atom.
    pub fn with_sink(mut self, sink: impl AtomSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Add an atom. Returns `false` if a structurally equal atom was already
    /// present. The atom is forwarded to the sink either way.
    pub fn add_atom(&mut self, atom: Term) -> bool {
        if let Some(sink) = &self.sink {
            sink.enqueue(&atom);
        }
        if self.index.contains(&atom) {
            return false;
        }
        self.index.insert(atom.clone());
        self.atoms.push(atom);
        true
    }

    /// Remove an atom. Returns whether it was present.
    pub fn remove_atom(&mut self, atom: &Term) -> bool {
        if !self.index.remove(atom) {
            return false;
        }
        self.atoms.retain(|a| a != atom);
        true
    }

    pub fn has_atom(&self, atom: &Term) -> bool {
        self.index.contains(atom)
    }

    /// Atoms in insertion order.
    pub fn atoms(&self) -> &[Term] {
        &self.atoms
    }

    pub fn add_rule(&mut self, pattern: Term, result: Term) {
        self.rules.push(Rule::new(pattern, result));
    }

    pub fn add_native_rule(
        &mut self,
        pattern: Term,
        f: impl Fn(&Bindings) -> Term + Send + Sync + 'static,
    ) {
        self.rules.push(Rule::native(pattern, f));
    }

    /// Rules in insertion order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Bindings for every stored atom `pattern` matches, in insertion order.
    pub fn query(&self, pattern: &Term) -> Vec<Bindings> {
        self.atoms.iter().filter_map(|a| unify(pattern, a)).collect()
    }

    /// Empty both the atom set and the rule list.
    pub fn clear(&mut self) {
        self.atoms.clear();
        self.index.clear();
        self.rules.clear();
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }
}

impl fmt::Debug for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Space")
            .field("atoms", &self.atoms.len())
            .field("rules", &self.rules.len())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
