//! Constraint-based type inference over terms.
//!
//! Constraint generation is structural:
//!
//! | term                         | type                                         |
//! |------------------------------|----------------------------------------------|
//! | `$x`                         | context entry, else a fresh variable         |
//! | numeric / string / bool atom | `Number` / `String` / `Bool`                 |
//! | other atom                   | declaration, else `Atom`                     |
//! | `(^, f, args)`               | fresh `r` with `type(f) ≡ type(args) -> r`   |
//! | `(*, a, ..)`                 | `type(a)` (first component only)             |
//! | `(=, a, b)`                  | `Bool` with `type(a) ≡ type(b)`              |
//! | `(λ, $p, body)`              | `type($p) -> type(body)`                     |
//! | `(:, t, T)`                  | `T` with `type(t) ≡ T`                       |
//! | anything else                | `Atom`                                       |
//!
//! Products are deliberately under-typed: only the first component determines
//! the product's type, although every component still contributes constraints.

use std::collections::{BTreeMap, HashMap};

use crate::error::TypeResult;
use crate::term::{APPLY, PRODUCT, Term};
use crate::types::strategy::{HindleyMilner, SimpleUnification, UnificationStrategy};
use crate::types::{Constraint, Type, TypeSubst};

/// Outcome of a successful inference.
#[derive(Debug, Clone)]
pub struct Inference {
    /// The term's type with the solution applied.
    pub ty: Type,
    pub substitution: TypeSubst,
    /// Resolved type of each `$` variable, keyed by name. Lambda parameters
    /// report the type of their first binding.
    pub variables: BTreeMap<String, Type>,
}

/// The full inference engine.
#[derive(Debug)]
pub struct TypeChecker {
    strategy: Box<dyn UnificationStrategy>,
    declarations: HashMap<String, Type>,
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::hindley_milner()
    }
}

impl TypeChecker {
    /// A checker over `strategy`, with the grounded built-ins declared.
    pub fn new(strategy: Box<dyn UnificationStrategy>) -> Self {
        let mut checker = Self {
            strategy,
            declarations: HashMap::new(),
        };
        checker.declare_builtins();
        checker
    }

    pub fn hindley_milner() -> Self {
        Self::new(Box::new(HindleyMilner))
    }

    pub fn simple() -> Self {
        Self::new(Box::new(SimpleUnification))
    }

    pub fn strategy(&self) -> &dyn UnificationStrategy {
        self.strategy.as_ref()
    }

    fn declare_builtins(&mut self) {
        let num_fn = Type::arrow(Type::number(), Type::number());
        for name in ["&+", "&-", "&*", "&/"] {
            self.declare(name, num_fn.clone());
        }
        for name in ["&<", "&>"] {
            self.declare(name, Type::arrow(Type::number(), Type::bool()));
        }
        for name in ["&and", "&or", "&not"] {
            self.declare(name, Type::arrow(Type::bool(), Type::bool()));
        }
        let a = super::fresh_var_id();
        self.declare(
            "&==",
            Type::Forall(a, Box::new(Type::arrow(Type::Var(a), Type::bool()))),
        );
    }

    /// Declare the type of a symbol. Quantified types are instantiated afresh
    /// at every use.
    /// Record `name : ty`. Free variables of `ty` are quantified, so each use
    /// of `name` gets its own instance.
    pub fn declare(&mut self, name: impl Into<String>, ty: Type) {
        self.declarations.insert(name.into(), ty.generalize());
    }

    pub fn declared(&self, name: &str) -> Option<&Type> {
        self.declarations.get(name)
    }

    /// Infer the type of `term`.
    pub fn infer(&self, term: &Term) -> TypeResult<Type> {
        self.infer_detailed(term).map(|inf| inf.ty)
    }

    /// Infer, keeping the substitution and the variable assignments.
    pub fn infer_detailed(&self, term: &Term) -> TypeResult<Inference> {
        self.run(term, None)
    }

    /// Infer `term` under the extra constraint that it has type `expected`.
    pub fn check(&self, term: &Term, expected: &Type) -> TypeResult<Type> {
        self.run(term, Some(expected)).map(|inf| inf.ty)
    }

    fn run(&self, term: &Term, expected: Option<&Type>) -> TypeResult<Inference> {
        let mut generator = Generator::new(&self.declarations);
        let ty = generator.generate(term)?;
        if let Some(expected) = expected {
            generator.constrain(expected.clone(), ty.clone(), term);
        }
        tracing::trace!(
            %term,
            constraints = generator.constraints.len(),
            strategy = self.strategy.name(),
            "solving type constraints"
        );
        let substitution = self.strategy.solve(&generator.constraints)?;
        let variables = generator
            .seen
            .iter()
            .map(|(name, ty)| (name.clone(), self.strategy.apply(&substitution, ty)))
            .collect();
        Ok(Inference {
            ty: self.strategy.apply(&substitution, &ty),
            substitution,
            variables,
        })
    }
}

/// Walks one term, collecting constraints.
struct Generator<'a> {
    declarations: &'a HashMap<String, Type>,
    /// Current type of each `$` variable in scope.
    context: HashMap<String, Type>,
    /// First type assigned to each `$` variable.
    seen: BTreeMap<String, Type>,
    constraints: Vec<Constraint>,
}

impl<'a> Generator<'a> {
    fn new(declarations: &'a HashMap<String, Type>) -> Self {
        Self {
            declarations,
            context: HashMap::new(),
            seen: BTreeMap::new(),
            constraints: Vec::new(),
        }
    }

    fn constrain(&mut self, left: Type, right: Type, origin: &Term) {
        self.constraints
            .push(Constraint::new(left, right, origin.clone()));
    }

    fn variable(&mut self, name: &str) -> Type {
        if let Some(ty) = self.context.get(name) {
            return ty.clone();
        }
        let ty = Type::fresh();
        self.context.insert(name.to_string(), ty.clone());
        self.seen.entry(name.to_string()).or_insert_with(|| ty.clone());
        ty
    }

    fn generate(&mut self, term: &Term) -> TypeResult<Type> {
        match term {
            Term::Atomic(name) if term.is_variable() => Ok(self.variable(name)),
            Term::Atomic(name) => Ok(self.literal(term, name)),
            Term::Compound {
                operator,
                components,
            } => match (operator.as_str(), components.as_slice()) {
                (APPLY, [f, args]) => {
                    let tf = self.generate(f)?;
                    let ta = self.generate(args)?;
                    let result = Type::fresh();
                    self.constrain(tf, Type::arrow(ta, result.clone()), term);
                    Ok(result)
                }
                (PRODUCT, [first, rest @ ..]) => {
                    let ty = self.generate(first)?;
                    for c in rest {
                        self.generate(c)?;
                    }
                    Ok(ty)
                }
                ("=" | "==", [a, b]) => {
                    let ta = self.generate(a)?;
                    let tb = self.generate(b)?;
                    self.constrain(ta, tb, term);
                    Ok(Type::bool())
                }
                ("λ" | "lambda", [param, body]) if param.is_variable() => {
                    let tp = Type::fresh();
                    let name = param.name().to_string();
                    let outer = self.context.insert(name.clone(), tp.clone());
                    self.seen.entry(name.clone()).or_insert_with(|| tp.clone());
                    let tb = self.generate(body);
                    match outer {
                        Some(old) => self.context.insert(name, old),
                        None => self.context.remove(&name),
                    };
                    Ok(Type::arrow(tp, tb?))
                }
                (":", [inner, annotation]) => {
                    let declared = Type::from_term(annotation)?;
                    let actual = self.generate(inner)?;
                    self.constrain(declared.clone(), actual, term);
                    Ok(declared)
                }
                _ => Ok(Type::atom()),
            },
        }
    }

    fn literal(&self, term: &Term, name: &str) -> Type {
        if term.as_number().is_some() {
            Type::number()
        } else if term.is_string_literal() {
            Type::string()
        } else if term.is_bool_literal() {
            Type::bool()
        } else if let Some(declared) = self.declarations.get(name) {
            declared.instantiate()
        } else {
            Type::atom()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TypeError;
    use crate::parser::parse_term;

    fn t(src: &str) -> Term {
        parse_term(src).unwrap()
    }

    #[test]
    fn literals_have_fixed_types() {
        let checker = TypeChecker::hindley_milner();
        assert_eq!(checker.infer(&t("42")).unwrap(), Type::number());
        assert_eq!(checker.infer(&t("\"hi\"")).unwrap(), Type::string());
        assert_eq!(checker.infer(&t("True")).unwrap(), Type::bool());
        assert_eq!(checker.infer(&t("sky")).unwrap(), Type::atom());
    }

    #[test]
    fn identity_lambda_applied_to_number() {
        let checker = TypeChecker::hindley_milner();
        let inf = checker.infer_detailed(&t("((λ $x $x) 3)")).unwrap();
        assert_eq!(inf.ty, Type::number());
        assert_eq!(inf.variables.get("$x"), Some(&Type::number()));
    }

    #[test]
    fn equality_of_number_and_string_mismatches() {
        let checker = TypeChecker::hindley_milner();
        let err = checker.infer(&t("(== 1 \"a\")")).unwrap_err();
        match err {
            TypeError::Mismatch {
                expected,
                actual,
                term,
            } => {
                assert_eq!(expected, "Number");
                assert_eq!(actual, "String");
                assert_eq!(term, t("(== 1 \"a\")"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn equality_has_bool_type() {
        let checker = TypeChecker::hindley_milner();
        assert_eq!(checker.infer(&t("(= $a 1)")).unwrap(), Type::bool());
    }

    #[test]
    fn grounded_builtins_are_declared() {
        let checker = TypeChecker::hindley_milner();
        assert_eq!(checker.infer(&t("(&+ 1 2)")).unwrap(), Type::number());
        assert_eq!(checker.infer(&t("(&< 1 2)")).unwrap(), Type::bool());
        assert_eq!(checker.infer(&t("(&== sky sea)")).unwrap(), Type::bool());
        assert!(checker.infer(&t("(&+ \"x\" 2)")).is_err());
    }

    #[test]
    fn declared_function_constrains_its_argument() {
        let mut checker = TypeChecker::hindley_milner();
        checker.declare("len", Type::arrow(Type::string(), Type::number()));
        assert_eq!(checker.infer(&t("(len \"abc\")")).unwrap(), Type::number());
        assert!(checker.infer(&t("(len 5)")).is_err());
    }

    #[test]
    fn products_take_the_first_component_type() {
        let checker = TypeChecker::hindley_milner();
        assert_eq!(checker.infer(&t("(* 1 \"two\" True)")).unwrap(), Type::number());
    }

    #[test]
    fn check_against_expected_type() {
        let checker = TypeChecker::hindley_milner();
        assert_eq!(
            checker.check(&t("(&* 2 3)"), &Type::number()).unwrap(),
            Type::number()
        );
        assert!(checker.check(&t("(&* 2 3)"), &Type::bool()).is_err());
    }

    #[test]
    fn annotation_compound_is_checked() {
        let checker = TypeChecker::hindley_milner();
        assert_eq!(checker.infer(&t("(: 3 Number)")).unwrap(), Type::number());
        assert!(checker.infer(&t("(: 3 String)")).is_err());
    }

    #[test]
    fn self_application_fails_occurs_check() {
        let checker = TypeChecker::hindley_milner();
        let err = checker.infer(&t("(λ $f ($f $f))")).unwrap_err();
        assert!(matches!(err, TypeError::OccursCheck { .. }));
    }

    #[test]
    fn simple_strategy_refuses_structural_solutions() {
        let mut checker = TypeChecker::simple();
        checker.declare("inc", Type::arrow(Type::number(), Type::number()));
        assert_eq!(checker.infer(&t("(== 1 2)")).unwrap(), Type::bool());
        assert!(checker.infer(&t("(inc 3)")).is_err());
        assert!(TypeChecker::hindley_milner().infer(&t("(== 1 2)")).is_ok());
    }

    #[test]
    fn polymorphic_declarations_instantiate_per_use() {
        let mut checker = TypeChecker::hindley_milner();
        let a = crate::types::fresh_var_id();
        checker.declare(
            "id",
            Type::Forall(a, Box::new(Type::arrow(Type::Var(a), Type::Var(a)))),
        );
        assert_eq!(checker.infer(&t("(id 1)")).unwrap(), Type::number());
        assert_eq!(
            checker.infer(&t("(* (id 1) (id \"s\"))")).unwrap(),
            Type::number()
        );
    }
}
