//! Pluggable type unification.
//!
//! [`HindleyMilner`] is standard structural unification with an occurs-check.
//! [`SimpleUnification`] skips the algebra entirely: two types unify only when
//! they are already equal or one side is a variable, which suits closed systems
//! where every type is spelled out.

use crate::error::{TypeError, TypeResult};
use crate::types::{Constraint, Type, TypeSubst};

/// The interface the checker solves constraints through.
pub trait UnificationStrategy: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Extend `subst` so that `a` and `b` become equal, or `None`.
    fn unify(&self, a: &Type, b: &Type, subst: TypeSubst) -> Option<TypeSubst>;

    /// Resolve the variables of `ty` through `subst`.
    fn apply(&self, subst: &TypeSubst, ty: &Type) -> Type {
        apply_subst(subst, ty)
    }

    /// Fold `unify` over every constraint, failing on the first that cannot hold.
    fn solve(&self, constraints: &[Constraint]) -> TypeResult<TypeSubst> {
        let mut subst = TypeSubst::new();
        for c in constraints {
            subst = match self.unify(&c.left, &c.right, subst.clone()) {
                Some(next) => next,
                None => return Err(self.explain(&subst, c)),
            };
        }
        Ok(subst)
    }

    /// Build the error for a failed constraint.
    fn explain(&self, subst: &TypeSubst, c: &Constraint) -> TypeError {
        let left = self.apply(subst, &c.left);
        let right = self.apply(subst, &c.right);
        if let Some((var, other)) = var_side(&left, &right) {
            if other.occurs(var) {
                return TypeError::OccursCheck {
                    var: Type::Var(var).to_string(),
                    ty: other.to_string(),
                };
            }
        }
        TypeError::Mismatch {
            expected: left.to_string(),
            actual: right.to_string(),
            term: c.origin.clone(),
        }
    }
}

fn var_side<'a>(a: &'a Type, b: &'a Type) -> Option<(u64, &'a Type)> {
    match (a, b) {
        (Type::Var(v), other) | (other, Type::Var(v)) if a != b => Some((*v, other)),
        _ => None,
    }
}

/// Resolve variables transitively. Terminates because every binding was
/// admitted only after an occurs-check.
pub fn apply_subst(subst: &TypeSubst, ty: &Type) -> Type {
    match ty {
        Type::Var(v) => match subst.get(*v) {
            Some(bound) => apply_subst(subst, bound),
            None => ty.clone(),
        },
        Type::Base(_) | Type::Vector(_) => ty.clone(),
        Type::Arrow(a, b) => Type::arrow(apply_subst(subst, a), apply_subst(subst, b)),
        Type::Either(a, b) => Type::either(apply_subst(subst, a), apply_subst(subst, b)),
        Type::List(t) => Type::list(apply_subst(subst, t)),
        Type::Maybe(t) => Type::maybe(apply_subst(subst, t)),
        Type::Forall(bound, body) => Type::Forall(*bound, Box::new(apply_subst(subst, body))),
    }
}

/// Bind `var := ty` unless `ty` mentions `var`.
fn bind_var(var: u64, ty: Type, mut subst: TypeSubst) -> Option<TypeSubst> {
    if ty == Type::Var(var) {
        return Some(subst);
    }
    if ty.occurs(var) {
        return None;
    }
    subst.insert(var, ty);
    Some(subst)
}

// ---------------------------------------------------------------------------
// Hindley-Milner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct HindleyMilner;

impl UnificationStrategy for HindleyMilner {
    fn name(&self) -> &'static str {
        "hindley-milner"
    }

    fn unify(&self, a: &Type, b: &Type, subst: TypeSubst) -> Option<TypeSubst> {
        let a = apply_subst(&subst, a);
        let b = apply_subst(&subst, b);
        if a == b {
            return Some(subst);
        }
        match (a, b) {
            (Type::Var(v), other) | (other, Type::Var(v)) => bind_var(v, other, subst),
            (Type::Arrow(a1, r1), Type::Arrow(a2, r2))
            | (Type::Either(a1, r1), Type::Either(a2, r2)) => {
                let subst = self.unify(&a1, &a2, subst)?;
                self.unify(&r1, &r2, subst)
            }
            (Type::List(x), Type::List(y)) | (Type::Maybe(x), Type::Maybe(y)) => {
                self.unify(&x, &y, subst)
            }
            (f @ Type::Forall(..), other) | (other, f @ Type::Forall(..)) => {
                self.unify(&f.instantiate(), &other, subst)
            }
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Simple
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleUnification;

impl UnificationStrategy for SimpleUnification {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn unify(&self, a: &Type, b: &Type, subst: TypeSubst) -> Option<TypeSubst> {
        let a = apply_subst(&subst, a);
        let b = apply_subst(&subst, b);
        if a == b {
            return Some(subst);
        }
        match (a, b) {
            (Type::Var(v), other) | (other, Type::Var(v)) => bind_var(v, other, subst),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::Term;

    fn origin() -> Term {
        Term::atom("test")
    }

    #[test]
    fn hm_decomposes_arrows() {
        let hm = HindleyMilner;
        let t0 = Type::fresh();
        let t1 = Type::fresh();
        let subst = hm
            .unify(
                &Type::arrow(t0.clone(), t0.clone()),
                &Type::arrow(Type::number(), t1.clone()),
                TypeSubst::new(),
            )
            .unwrap();
        assert_eq!(hm.apply(&subst, &t0), Type::number());
        assert_eq!(hm.apply(&subst, &t1), Type::number());
    }

    #[test]
    fn hm_occurs_check_rejects_infinite_types() {
        let hm = HindleyMilner;
        let t = Type::fresh();
        assert!(hm.unify(&t, &Type::list(t.clone()), TypeSubst::new()).is_none());
        let err = hm
            .solve(&[Constraint::new(t.clone(), Type::list(t.clone()), origin())])
            .unwrap_err();
        assert!(matches!(err, TypeError::OccursCheck { .. }));
    }

    #[test]
    fn hm_constructor_mismatch_fails() {
        let hm = HindleyMilner;
        assert!(
            hm.unify(&Type::list(Type::number()), &Type::maybe(Type::number()), TypeSubst::new())
                .is_none()
        );
        assert!(hm.unify(&Type::Vector(2), &Type::Vector(3), TypeSubst::new()).is_none());
        assert!(hm.unify(&Type::Vector(2), &Type::Vector(2), TypeSubst::new()).is_some());
    }

    #[test]
    fn solve_reports_printable_types() {
        let hm = HindleyMilner;
        let err = hm
            .solve(&[Constraint::new(Type::number(), Type::string(), origin())])
            .unwrap_err();
        match err {
            TypeError::Mismatch {
                expected, actual, ..
            } => {
                assert_eq!(expected, "Number");
                assert_eq!(actual, "String");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn solve_threads_bindings_across_constraints() {
        let hm = HindleyMilner;
        let a = Type::fresh();
        let b = Type::fresh();
        let subst = hm
            .solve(&[
                Constraint::new(a.clone(), b.clone(), origin()),
                Constraint::new(b.clone(), Type::bool(), origin()),
            ])
            .unwrap();
        assert_eq!(hm.apply(&subst, &a), Type::bool());
    }

    #[test]
    fn simple_binds_variables_but_never_decomposes() {
        let simple = SimpleUnification;
        let t = Type::fresh();
        let subst = simple
            .unify(&t, &Type::arrow(Type::number(), Type::number()), TypeSubst::new())
            .unwrap();
        assert_eq!(
            simple.apply(&subst, &t),
            Type::arrow(Type::number(), Type::number())
        );
        let r = Type::fresh();
        assert!(
            simple
                .unify(
                    &Type::arrow(Type::number(), Type::number()),
                    &Type::arrow(Type::number(), r),
                    TypeSubst::new(),
                )
                .is_none()
        );
    }
}
