//! One-directional structural matching and substitution over [`Term`]s.
//!
//! Only variables on the pattern side are ever bound; a variable appearing on
//! the term side is matched as a literal atom. There is no occurs-check at this
//! level, unlike the type-level unifier in [`crate::types::strategy`].

use crate::term::{Bindings, Term, is_variable_name};

/// Whether a term is a `$`/`?` variable.
pub fn is_variable(term: &Term) -> bool {
    term.is_variable()
}

/// Match `pattern` against `term`, starting from empty bindings.
pub fn unify(pattern: &Term, term: &Term) -> Option<Bindings> {
    unify_with(pattern, term, Some(Bindings::new()))
}

/// Match `pattern` against `term`, threading existing bindings.
///
/// `None` in is `None` out: a failed match propagates unchanged.
pub fn unify_with(pattern: &Term, term: &Term, bindings: Option<Bindings>) -> Option<Bindings> {
    let bindings = bindings?;
    match (pattern, term) {
        (Term::Atomic(var), _) if is_variable_name(var) => match bindings.get(var) {
            Some(bound) => {
                let bound = bound.clone();
                unify_with(&bound, term, Some(bindings))
            }
            None => Some(bindings.with(var.clone(), term.clone())),
        },
        (Term::Atomic(a), Term::Atomic(b)) => (a == b).then_some(bindings),
        (
            Term::Compound {
                operator: op_a,
                components: comps_a,
            },
            Term::Compound {
                operator: op_b,
                components: comps_b,
            },
        ) => {
            if op_a != op_b || comps_a.len() != comps_b.len() {
                return None;
            }
            comps_a
                .iter()
                .zip(comps_b)
                .try_fold(bindings, |acc, (p, t)| unify_with(p, t, Some(acc)))
        }
        _ => None,
    }
}

/// Replace bound variables in `template`; unbound variables stay as they are.
pub fn substitute(template: &Term, bindings: &Bindings) -> Term {
    match template {
        Term::Atomic(name) if is_variable_name(name) => bindings
            .get(name)
            .cloned()
            .unwrap_or_else(|| template.clone()),
        Term::Atomic(_) => template.clone(),
        Term::Compound {
            operator,
            components,
        } => Term::Compound {
            operator: operator.clone(),
            components: components.iter().map(|c| substitute(c, bindings)).collect(),
        },
    }
}

/// Collect the distinct variable names in a term, in first-occurrence order.
pub fn variables(term: &Term) -> Vec<String> {
    fn walk(term: &Term, out: &mut Vec<String>) {
        match term {
            Term::Atomic(name) if is_variable_name(name) => {
                if !out.iter().any(|v| v == name) {
                    out.push(name.clone());
                }
            }
            Term::Atomic(_) => {}
            Term::Compound { components, .. } => {
                for c in components {
                    walk(c, out);
                }
            }
        }
    }
    let mut out = Vec::new();
    walk(term, &mut out);
    out
}
