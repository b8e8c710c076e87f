//! The evaluator session: single owner of one space, one macro table, one
//! grounded registry and both type layers.
//!
//! Every public operation runs through [`instrument`], which opens a
//! `debug` span and reports the operation's elapsed time.

use std::time::Instant;

use crate::config::SessionConfig;
use crate::error::{GroundedResult, MettaResult, ReduceResult, TypeResult};
use crate::grounded::GroundedRegistry;
use crate::macros::{Expansion, MacroTable};
use crate::nondet::Branch;
use crate::parser::parse_program;
use crate::reduce::{Reducer, Step};
use crate::space::{AtomSink, Rule, Space};
use crate::term::{Bindings, Term};
use crate::types::Type;
use crate::types::checker::{Inference, TypeChecker};
use crate::types::gradual::{GradualClassifier, GradualType};

fn instrument<T>(op: &'static str, f: impl FnOnce() -> T) -> T {
    let span = tracing::debug_span!("session", op);
    let _enter = span.enter();
    let start = Instant::now();
    let out = f();
    tracing::debug!(
        op,
        elapsed_us = start.elapsed().as_micros() as u64,
        "session operation finished"
    );
    out
}

/// A MeTTa evaluation session.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    space: Space,
    macros: MacroTable,
    grounded: GroundedRegistry,
    checker: TypeChecker,
    classifier: GradualClassifier,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    /// Create a session with the built-in grounded atoms registered.
    ///
    /// The configuration is trusted as given; use [`SessionConfig::validate`]
    /// or [`SessionConfig::from_toml_str`] to check it first.
    pub fn new(config: SessionConfig) -> Self {
        tracing::info!(
            max_steps = config.max_steps,
            max_macro_depth = config.max_macro_depth,
            strategy = %config.strategy,
            "initializing metta session"
        );
        Self {
            space: Space::new(),
            macros: MacroTable::new().with_max_depth(config.max_macro_depth),
            grounded: GroundedRegistry::with_builtins(),
            checker: config.strategy.checker(),
            classifier: GradualClassifier::new(),
            config,
        }
    }

    /// Forward every atom added from now on to `sink`.
    pub fn with_sink(mut self, sink: impl AtomSink + 'static) -> Self {
        self.space = std::mem::take(&mut self.space).with_sink(sink);
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn space(&self) -> &Space {
        &self.space
    }

    pub fn grounded(&self) -> &GroundedRegistry {
        &self.grounded
    }

    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    pub fn checker(&self) -> &TypeChecker {
        &self.checker
    }

    fn reducer(&self) -> Reducer<'_> {
        Reducer::new(&self.space, &self.grounded).with_max_steps(self.config.max_steps)
    }

    // -----------------------------------------------------------------------
    // Space
    // -----------------------------------------------------------------------

    pub fn add_atom(&mut self, atom: Term) -> bool {
        instrument("add_atom", || self.space.add_atom(atom))
    }

    pub fn remove_atom(&mut self, atom: &Term) -> bool {
        instrument("remove_atom", || self.space.remove_atom(atom))
    }

    pub fn has_atom(&self, atom: &Term) -> bool {
        instrument("has_atom", || self.space.has_atom(atom))
    }

    pub fn atoms(&self) -> &[Term] {
        self.space.atoms()
    }

    pub fn add_rule(&mut self, pattern: Term, result: Term) {
        instrument("add_rule", || self.space.add_rule(pattern, result))
    }

    pub fn rules(&self) -> &[Rule] {
        self.space.rules()
    }

    pub fn query(&self, pattern: &Term) -> Vec<Bindings> {
        instrument("query", || self.space.query(pattern))
    }

    /// Drop all atoms and rules. Macros, grounded atoms and type declarations
    /// are kept.
    pub fn clear(&mut self) {
        instrument("clear", || self.space.clear())
    }

    // -----------------------------------------------------------------------
    // Macros
    // -----------------------------------------------------------------------

    pub fn define_macro(&mut self, name: &str, pattern: Term, expansion: Term) {
        instrument("define_macro", || {
            self.macros.define_macro(name, pattern, expansion)
        })
    }

    pub fn expand(&self, term: &Term) -> Expansion {
        instrument("expand", || self.macros.expand(term))
    }

    // -----------------------------------------------------------------------
    // Reduction
    // -----------------------------------------------------------------------

    pub fn reduce_step(&self, term: &Term) -> ReduceResult<Step> {
        instrument("reduce_step", || self.reducer().reduce_step(term))
    }

    pub fn reduce(&self, term: &Term) -> ReduceResult<Term> {
        instrument("reduce", || self.reducer().reduce(term))
    }

    pub fn normalize(&self, term: &Term) -> ReduceResult<Term> {
        instrument("normalize", || self.reducer().normalize(term))
    }

    pub fn alternatives(&self, term: &Term) -> ReduceResult<Option<Branch<Term>>> {
        instrument("alternatives", || self.reducer().alternatives(term))
    }

    /// Macro-expand, then normalize.
    pub fn evaluate(&self, term: &Term) -> ReduceResult<Term> {
        instrument("evaluate", || {
            let expansion = self.macros.expand(term);
            self.reducer().normalize(&expansion.term)
        })
    }

    // -----------------------------------------------------------------------
    // Types
    // -----------------------------------------------------------------------

    /// Declare `name : ty` for the checker, and for the classifier when `ty`
    /// names a classifier type.
    pub fn declare(&mut self, name: &str, ty: Type) {
        instrument("declare", || {
            if let Type::Base(base) = &ty {
                if let Ok(gradual) = base.parse::<GradualType>() {
                    self.classifier.declare(name, gradual);
                }
            }
            self.checker.declare(name, ty);
        })
    }

    pub fn infer(&self, term: &Term) -> TypeResult<Type> {
        instrument("infer", || self.checker.infer(term))
    }

    pub fn infer_detailed(&self, term: &Term) -> TypeResult<Inference> {
        instrument("infer_detailed", || self.checker.infer_detailed(term))
    }

    pub fn check(&self, term: &Term, expected: &Type) -> TypeResult<Type> {
        instrument("check", || self.checker.check(term, expected))
    }

    /// Structural annotation check through the gradual classifier.
    pub fn check_annotation(&mut self, term: &Term, expected: &str) -> TypeResult<GradualType> {
        instrument("check_annotation", || {
            self.classifier.check_type_annotation(term, expected)
        })
    }

    // -----------------------------------------------------------------------
    // Grounded atoms
    // -----------------------------------------------------------------------

    pub fn register(
        &mut self,
        name: &str,
        f: impl Fn(&[Term]) -> GroundedResult<Term> + Send + Sync + 'static,
    ) {
        instrument("register", || self.grounded.register(name, f))
    }

    /// Run a grounded atom against this session's space.
    pub fn execute(&self, name: &str, args: &[Term]) -> GroundedResult<Term> {
        instrument("execute", || self.grounded.execute_in(&self.space, name, args))
    }

    pub fn has(&self, name: &str) -> bool {
        self.grounded.has(name)
    }

    // -----------------------------------------------------------------------
    // Programs
    // -----------------------------------------------------------------------

    /// Load program text.
    ///
    /// `(= pattern result)` adds a rule, `(: name type)` declares a type and is
    /// stored, anything else is stored as an atom, and each `!term` is
    /// evaluated. Returns the evaluation results in order.
    pub fn load(&mut self, text: &str) -> MettaResult<Vec<Term>> {
        let statements = instrument("parse", || parse_program(text))?;
        let mut results = Vec::new();
        for stmt in statements {
            if stmt.evaluate {
                results.push(self.evaluate(&stmt.term)?);
                continue;
            }
            match (stmt.term.operator(), stmt.term.components()) {
                (Some("="), [pattern, result]) => {
                    self.add_rule(pattern.clone(), result.clone());
                }
                (Some(":"), [name, ty]) if name.is_atomic() => {
                    let ty = Type::from_term(ty)?;
                    self.declare(name.name(), ty);
                    self.add_atom(stmt.term.clone());
                }
                _ => {
                    self.add_atom(stmt.term.clone());
                }
            }
        }
        tracing::debug!(
            atoms = self.space.len(),
            rules = self.space.rules().len(),
            results = results.len(),
            "program loaded"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyKind;
    use crate::error::{MettaError, ReduceError};
    use crate::parser::parse_term;

    fn t(src: &str) -> Term {
        parse_term(src).unwrap()
    }

    #[test]
    fn load_splits_rules_atoms_and_queries() {
        let mut session = Session::default();
        let out = session
            .load(
                "(= (double $x) (&* $x 2))\n\
                 (parent tom bob)\n\
                 !(double 21)",
            )
            .unwrap();
        assert_eq!(out, vec![Term::number(42.0)]);
        assert_eq!(session.rules().len(), 1);
        assert!(session.has_atom(&t("(parent tom bob)")));
    }

    #[test]
    fn declarations_reach_both_type_layers() {
        let mut session = Session::default();
        session.load("(: pi Number)").unwrap();
        assert!(session.has_atom(&t("(: pi Number)")));
        assert_eq!(session.infer(&t("pi")).unwrap(), Type::number());
        assert!(session.check_annotation(&t("pi"), "Number").is_ok());
    }

    #[test]
    fn evaluate_expands_macros_before_reducing() {
        let mut session = Session::default();
        session.define_macro("twice", t("(twice $x)"), t("(&+ $x $x)"));
        assert_eq!(session.evaluate(&t("(twice 4)")).unwrap(), Term::number(8.0));
    }

    #[test]
    fn step_limit_surfaces_from_load() {
        let config = SessionConfig {
            max_steps: 3,
            ..SessionConfig::default()
        };
        let mut session = Session::new(config);
        let err = session.load("(= (spin) (spin))\n!(spin)").unwrap_err();
        assert!(matches!(
            err,
            MettaError::Reduce(ReduceError::StepLimitExceeded { steps: 3, .. })
        ));
    }

    #[test]
    fn parse_errors_surface_from_load() {
        let mut session = Session::default();
        assert!(matches!(
            session.load("(unclosed").unwrap_err(),
            MettaError::Parse(_)
        ));
    }

    #[test]
    fn simple_strategy_is_selected_from_config() {
        let config = SessionConfig {
            strategy: StrategyKind::Simple,
            ..SessionConfig::default()
        };
        let session = Session::new(config);
        assert_eq!(session.checker().strategy().name(), "simple");
        assert!(session.infer(&t("(&+ 1 2)")).is_err());
    }

    #[test]
    fn execute_sees_the_session_space() {
        let mut session = Session::default();
        session.add_atom(t("(color sky blue)"));
        session.add_atom(t("(color grass green)"));
        let found = session
            .execute("match", &[t("&self"), t("(color $x $c)"), t("$c")])
            .unwrap();
        assert_eq!(found, Term::product(vec![t("blue"), t("green")]));
    }

    #[test]
    fn custom_grounded_atoms_are_callable() {
        let mut session = Session::default();
        session.register("shout", |args| {
            Ok(Term::atom(args[0].name().to_uppercase()))
        });
        assert!(session.has("&shout"));
        assert_eq!(session.evaluate(&t("(&shout hey)")).unwrap(), t("HEY"));
    }

    #[test]
    fn sink_receives_added_atoms() {
        let (tx, rx) = std::sync::mpsc::channel();
        let mut session = Session::default().with_sink(tx);
        session.add_atom(t("(likes ann tea)"));
        assert_eq!(rx.try_recv().unwrap(), t("(likes ann tea)"));
    }
}
