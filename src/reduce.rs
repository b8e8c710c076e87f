//! Priority-ordered rewriting to normal form.
//!
//! A single step tries, in order:
//!
//! 1. the space's rules in insertion order; the first pattern that matches wins
//!    and no later rule is ever revisited;
//! 2. a grounded call `(^, &name, args)`, dispatched to the grounded registry.
//!
//! [`Reducer::reduce`] loops steps at the top node only and hard-stops with
//! [`ReduceError::StepLimitExceeded`] once the bound is spent. Grounded failures
//! are not caught: they abort the whole reduction.
//!
//! Once the bound is spent, applicability is decided by matching alone; a
//! grounded call past the bound is never executed.

use crate::error::{ReduceError, ReduceResult};
use crate::grounded::GroundedRegistry;
use crate::nondet::{Branch, settle};
use crate::space::{RuleResult, Space};
use crate::term::{Bindings, Term, is_variable_name};
use crate::unify::{substitute, unify};

/// Default bound on rewrite steps.
pub const DEFAULT_MAX_STEPS: usize = 1000;

/// Outcome of one rewrite attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub reduced: Term,
    /// Whether a rule or grounded call fired.
    pub applied: bool,
}

/// A rewrite that fired, before its result is built.
enum Rewrite<'a> {
    /// Template rule matched by a compound pattern. Every binding is a subterm
    /// of the matched node's components.
    Template(&'a Term, Bindings),
    Computed(Term),
}

impl Rewrite<'_> {
    fn into_term(self) -> Term {
        match self {
            Rewrite::Template(template, bindings) => substitute(template, &bindings),
            Rewrite::Computed(term) => term,
        }
    }
}

/// Rewrites terms against one space and one grounded registry.
#[derive(Debug, Clone, Copy)]
pub struct Reducer<'a> {
    space: &'a Space,
    grounded: &'a GroundedRegistry,
    max_steps: usize,
}

impl<'a> Reducer<'a> {
    pub fn new(space: &'a Space, grounded: &'a GroundedRegistry) -> Self {
        Self {
            space,
            grounded,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Attempt a single rewrite of `expr` at its top node.
    pub fn reduce_step(&self, expr: &Term) -> ReduceResult<Step> {
        Ok(match self.fire(expr)? {
            Some(rewrite) => Step {
                reduced: rewrite.into_term(),
                applied: true,
            },
            None => Step {
                reduced: expr.clone(),
                applied: false,
            },
        })
    }

    /// Run the first applicable rewrite at the top node, if any.
    fn fire(&self, expr: &Term) -> ReduceResult<Option<Rewrite<'a>>> {
        let rules = self.space.rules();
        for (i, rule) in rules.iter().enumerate() {
            if let Some(bindings) = unify(&rule.pattern, expr) {
                tracing::debug!(rule = i, %expr, "rule matched");
                let rewrite = match &rule.result {
                    RuleResult::Template(template) if !rule.pattern.is_atomic() => {
                        Rewrite::Template(template, bindings)
                    }
                    result => Rewrite::Computed(result.instantiate(&bindings)),
                };
                return Ok(Some(rewrite));
            }
        }

        if let Some((head, args)) = expr.as_application() {
            if head.is_grounded_ref() {
                let reduced = self.grounded.execute_in(self.space, head.name(), args)?;
                return Ok(Some(Rewrite::Computed(reduced)));
            }
        }
        Ok(None)
    }

    /// Whether a rewrite would fire at the top node. Executes nothing.
    fn applies(&self, expr: &Term) -> bool {
        self.space
            .rules()
            .iter()
            .any(|rule| unify(&rule.pattern, expr).is_some())
            || expr
                .as_application()
                .is_some_and(|(head, _)| head.is_grounded_ref())
    }

    /// Rewrite `expr` at its top node until no rule or grounded call applies.
    ///
    /// Fails with `StepLimitExceeded` when a rewrite still applies after
    /// exactly `max_steps` applied steps; `last` is the term at that point.
    pub fn reduce(&self, expr: &Term) -> ReduceResult<Term> {
        let mut current = expr.clone();
        let mut steps = 0;
        loop {
            if steps == self.max_steps {
                return self.at_bound(current, steps);
            }
            match self.fire(&current)? {
                Some(rewrite) => {
                    steps += 1;
                    current = rewrite.into_term();
                }
                None => {
                    tracing::trace!(steps, result = %current, "normal form reached");
                    return Ok(current);
                }
            }
        }
    }

    fn at_bound(&self, last: Term, steps: usize) -> ReduceResult<Term> {
        if self.applies(&last) {
            return Err(ReduceError::StepLimitExceeded { last, steps });
        }
        Ok(last)
    }

    /// Reduce every subterm innermost-first, then the node itself, so that
    /// arguments are evaluated before the expression that uses them.
    ///
    /// All rewrites share one `max_steps` budget. Recursion follows the
    /// term's depth; successive rewrites of one node run in a loop.
    pub fn normalize(&self, expr: &Term) -> ReduceResult<Term> {
        let mut spent = 0;
        let inner = self.normalize_below(expr.clone(), &mut spent)?;
        self.settle_node(inner, &mut spent)
    }

    /// Rewrite a node whose components are already normal until nothing
    /// applies, normalizing the components of each result.
    fn settle_node(&self, mut node: Term, spent: &mut usize) -> ReduceResult<Term> {
        loop {
            if *spent == self.max_steps {
                return self.at_bound(node, *spent);
            }
            node = match self.fire(&node)? {
                None => return Ok(node),
                Some(Rewrite::Template(template, bindings)) => {
                    *spent += 1;
                    self.instantiate_below(template, &bindings, spent)?
                }
                Some(Rewrite::Computed(term)) => {
                    *spent += 1;
                    self.normalize_below(term, spent)?
                }
            };
        }
    }

    /// Normalize every component of `expr`, leaving its top node alone.
    fn normalize_below(&self, expr: Term, spent: &mut usize) -> ReduceResult<Term> {
        match expr {
            Term::Atomic(_) => Ok(expr),
            Term::Compound {
                operator,
                components,
            } => {
                let components = components
                    .into_iter()
                    .map(|c| {
                        let c = self.normalize_below(c, spent)?;
                        self.settle_node(c, spent)
                    })
                    .collect::<ReduceResult<Vec<_>>>()?;
                Ok(Term::Compound {
                    operator,
                    components,
                })
            }
        }
    }

    /// Substitute `bindings` into `template` and normalize the components of
    /// the result. Bound values are already normal and are not revisited.
    fn instantiate_below(
        &self,
        template: &Term,
        bindings: &Bindings,
        spent: &mut usize,
    ) -> ReduceResult<Term> {
        match template {
            Term::Atomic(name) => Ok(match bindings.get(name) {
                Some(value) if is_variable_name(name) => value.clone(),
                _ => template.clone(),
            }),
            Term::Compound {
                operator,
                components,
            } => {
                let components = components
                    .iter()
                    .map(|c| match c {
                        Term::Atomic(name) if is_variable_name(name) && bindings.contains(name) => {
                            self.instantiate_below(c, bindings, spent)
                        }
                        _ => {
                            let c = self.instantiate_below(c, bindings, spent)?;
                            self.settle_node(c, spent)
                        }
                    })
                    .collect::<ReduceResult<Vec<_>>>()?;
                Ok(Term::Compound {
                    operator: operator.clone(),
                    components,
                })
            }
        }
    }

    /// Every result a single step could produce: one branch per matching rule,
    /// in rule order, or the grounded call's result when no rule matches.
    ///
    /// `None` when nothing applies.
    pub fn alternatives(&self, expr: &Term) -> ReduceResult<Option<Branch<Term>>> {
        let results: Vec<Term> = self
            .space
            .rules()
            .iter()
            .filter_map(|rule| unify(&rule.pattern, expr).map(|b| rule.result.instantiate(&b)))
            .collect();
        if !results.is_empty() {
            return Ok(settle(results));
        }
        let step = self.reduce_step(expr)?;
        Ok(step.applied.then_some(Branch::Value(step.reduced)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GroundedError;
    use crate::parser::parse_term;

    fn t(src: &str) -> Term {
        parse_term(src).unwrap()
    }

    #[test]
    fn first_matching_rule_wins() {
        let mut space = Space::new();
        space.add_rule(t("(color $x)"), t("first"));
        space.add_rule(t("(color sky)"), t("blue"));
        let grounded = GroundedRegistry::with_builtins();
        let reducer = Reducer::new(&space, &grounded);
        assert_eq!(reducer.reduce(&t("(color sky)")).unwrap(), t("first"));
    }

    #[test]
    fn step_reports_whether_anything_fired() {
        let space = Space::new();
        let grounded = GroundedRegistry::with_builtins();
        let reducer = Reducer::new(&space, &grounded);
        let step = reducer.reduce_step(&t("(plain a)")).unwrap();
        assert!(!step.applied);
        assert_eq!(step.reduced, t("(plain a)"));
    }

    #[test]
    fn rules_take_priority_over_grounded_calls() {
        let mut space = Space::new();
        space.add_rule(t("(&+ 1 1)"), t("two"));
        let grounded = GroundedRegistry::with_builtins();
        let reducer = Reducer::new(&space, &grounded);
        assert_eq!(reducer.reduce(&t("(&+ 1 1)")).unwrap(), t("two"));
        assert_eq!(reducer.reduce(&t("(&+ 1 2)")).unwrap(), t("3"));
    }

    #[test]
    fn rule_chain_reaches_normal_form() {
        let mut space = Space::new();
        space.add_rule(t("(double $x)"), t("(&* $x 2)"));
        let grounded = GroundedRegistry::with_builtins();
        let reducer = Reducer::new(&space, &grounded);
        assert_eq!(reducer.reduce(&t("(double 21)")).unwrap(), t("42"));
    }

    #[test]
    fn non_terminating_rules_hit_the_step_limit() {
        let mut space = Space::new();
        space.add_rule(t("(spin $x)"), t("(spin (s $x))"));
        let grounded = GroundedRegistry::with_builtins();
        let reducer = Reducer::new(&space, &grounded).with_max_steps(3);
        let err = reducer.reduce(&t("(spin z)")).unwrap_err();
        match err {
            ReduceError::StepLimitExceeded { last, steps } => {
                assert_eq!(steps, 3);
                assert_eq!(last, t("(spin (s (s (s z))))"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn grounded_failures_abort_reduction() {
        let mut space = Space::new();
        space.add_rule(t("(go)"), t("(&nope 1)"));
        let grounded = GroundedRegistry::with_builtins();
        let reducer = Reducer::new(&space, &grounded);
        let err = reducer.reduce(&t("(go)")).unwrap_err();
        assert!(matches!(
            err,
            ReduceError::Grounded(GroundedError::NotFound { .. })
        ));
    }

    #[test]
    fn reduce_only_rewrites_the_top_node_but_normalize_goes_inside() {
        let space = Space::new();
        let grounded = GroundedRegistry::with_builtins();
        let reducer = Reducer::new(&space, &grounded);
        let expr = t("(pair (&+ 1 2) (&* 2 3))");
        assert_eq!(reducer.reduce(&expr).unwrap(), expr);
        assert_eq!(reducer.normalize(&expr).unwrap(), t("(pair 3 6)"));
        assert_eq!(
            reducer.normalize(&t("(&+ (&+ 1 2) (&- 10 4))")).unwrap(),
            t("9")
        );
    }

    #[test]
    fn alternatives_collect_every_matching_rule() {
        let mut space = Space::new();
        space.add_rule(t("(coin)"), t("heads"));
        space.add_rule(t("(coin)"), t("tails"));
        space.add_rule(t("(die)"), t("six"));
        let grounded = GroundedRegistry::with_builtins();
        let reducer = Reducer::new(&space, &grounded);

        let coin = reducer.alternatives(&t("(coin)")).unwrap().unwrap();
        assert_eq!(coin.into_values(), vec![t("heads"), t("tails")]);
        assert_eq!(
            reducer.alternatives(&t("(die)")).unwrap(),
            Some(Branch::Value(t("six")))
        );
        assert_eq!(reducer.alternatives(&t("(&+ 1 1)")).unwrap(), Some(Branch::Value(t("2"))));
        assert!(reducer.alternatives(&t("(nothing)")).unwrap().is_none());
    }

    #[test]
    fn nothing_runs_once_the_bound_is_spent() {
        let mut space = Space::new();
        space.add_rule(t("(a)"), t("(&/ 1 0)"));
        let grounded = GroundedRegistry::with_builtins();
        let reducer = Reducer::new(&space, &grounded).with_max_steps(1);
        for result in [reducer.reduce(&t("(a)")), reducer.normalize(&t("(a)"))] {
            match result.unwrap_err() {
                ReduceError::StepLimitExceeded { last, steps } => {
                    assert_eq!(steps, 1);
                    assert_eq!(last, t("(&/ 1 0)"));
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn normal_form_reached_exactly_at_the_bound_is_returned() {
        let mut space = Space::new();
        space.add_rule(t("(a)"), t("(b)"));
        let grounded = GroundedRegistry::with_builtins();
        let reducer = Reducer::new(&space, &grounded).with_max_steps(1);
        assert_eq!(reducer.reduce(&t("(a)")).unwrap(), t("(b)"));
        assert_eq!(reducer.normalize(&t("(a)")).unwrap(), t("(b)"));
    }

    #[test]
    fn normalize_spends_the_whole_budget_on_a_growing_rule() {
        let mut space = Space::new();
        space.add_rule(t("(spin $x)"), t("(spin (s $x))"));
        let grounded = GroundedRegistry::with_builtins();
        let reducer = Reducer::new(&space, &grounded);
        match reducer.normalize(&t("(spin z)")).unwrap_err() {
            ReduceError::StepLimitExceeded { last, steps } => {
                assert_eq!(steps, DEFAULT_MAX_STEPS);
                assert_eq!(last.operator(), Some("^"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rule_results_are_normalized_inside() {
        let mut space = Space::new();
        space.add_rule(t("(twice $x)"), t("(pair (&+ $x $x) (wrap $x))"));
        space.add_rule(t("(wrap $y)"), t("(box $y)"));
        let grounded = GroundedRegistry::with_builtins();
        let reducer = Reducer::new(&space, &grounded);
        assert_eq!(
            reducer.normalize(&t("(twice (&+ 1 1))")).unwrap(),
            t("(pair 4 (box 2))")
        );
    }
}
