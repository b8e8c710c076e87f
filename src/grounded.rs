//! Grounded atoms: native functions exposed under `&`-prefixed names.
//!
//! Names are normalized to the `&` form on both registration and lookup, so
//! `"+"` and `"&+"` address the same entry. A grounded call's native result
//! becomes the reduced form of the calling expression.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{GroundedError, GroundedResult};
use crate::space::Space;
use crate::term::{TRUE, Term};
use crate::unify::substitute;

/// Reference atom naming the session's own space.
pub const SELF_SPACE: &str = "&self";

/// A native grounded function. It sees the calling session's space read-only.
pub type GroundedFn = Arc<dyn Fn(&Space, &[Term]) -> GroundedResult<Term> + Send + Sync>;

/// Normalize a grounded name to its `&`-prefixed form.
pub fn normalize(name: &str) -> String {
    if name.starts_with('&') {
        name.to_string()
    } else {
        format!("&{name}")
    }
}

/// Name → native function table.
#[derive(Clone, Default)]
pub struct GroundedRegistry {
    entries: HashMap<String, GroundedFn>,
}

impl GroundedRegistry {
    /// An empty registry with no built-ins.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry preloaded with the arithmetic, comparison, boolean and
    /// space built-ins.
    pub fn with_builtins() -> Self {
        let mut reg = Self::empty();
        reg.register_with_space("self", |_, _| Ok(Term::atom(SELF_SPACE)));
        reg.register_with_space("match", builtin_match);

        reg.register("+", |args| fold_seeded("&+", args, 0.0, |a, b| Ok(a + b)));
        reg.register("*", |args| fold_seeded("&*", args, 1.0, |a, b| Ok(a * b)));
        reg.register("-", |args| fold_unseeded("&-", args, |a, b| Ok(a - b)));
        reg.register("/", |args| {
            fold_unseeded("&/", args, |a, b| {
                if b == 0.0 {
                    Err("division by zero".to_string())
                } else {
                    Ok(a / b)
                }
            })
        });

        reg.register("<", |args| compare("&<", args, |a, b| a < b));
        reg.register(">", |args| compare("&>", args, |a, b| a > b));
        reg.register("==", |args| {
            let [a, b] = expect_two("&==", args)?;
            let equal = match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => x == y,
                _ => a == b,
            };
            Ok(Term::boolean(equal))
        });

        reg.register("and", |args| Ok(Term::boolean(args.iter().all(is_true))));
        reg.register("or", |args| Ok(Term::boolean(args.iter().any(is_true))));
        reg.register("not", |args| match args {
            [a] => Ok(Term::boolean(!is_true(a))),
            _ => Err(GroundedError::Arity {
                name: "&not".into(),
                expected: "1".into(),
                actual: args.len(),
            }),
        });
        reg
    }

    /// Register a function that only looks at its arguments.
    pub fn register(
        &mut self,
        name: &str,
        f: impl Fn(&[Term]) -> GroundedResult<Term> + Send + Sync + 'static,
    ) {
        self.entries
            .insert(normalize(name), Arc::new(move |_: &Space, args: &[Term]| f(args)));
    }

    /// Register a function that also reads the calling space.
    pub fn register_with_space(
        &mut self,
        name: &str,
        f: impl Fn(&Space, &[Term]) -> GroundedResult<Term> + Send + Sync + 'static,
    ) {
        self.entries.insert(normalize(name), Arc::new(f));
    }

    pub fn has(&self, name: &str) -> bool {
        self.entries.contains_key(&normalize(name))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// Execute against an empty space.
    pub fn execute(&self, name: &str, args: &[Term]) -> GroundedResult<Term> {
        self.execute_in(&Space::new(), name, args)
    }

    /// Execute with `space` as the caller's space. The native result, or its
    /// error, is returned unchanged.
    pub fn execute_in(&self, space: &Space, name: &str, args: &[Term]) -> GroundedResult<Term> {
        let name = normalize(name);
        let f = self
            .entries
            .get(&name)
            .ok_or_else(|| GroundedError::NotFound { name: name.clone() })?;
        tracing::debug!(%name, argc = args.len(), "executing grounded atom");
        f(space, args)
    }
}

impl fmt::Debug for GroundedRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroundedRegistry")
            .field("names", &self.names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Built-in helpers
// ---------------------------------------------------------------------------

fn is_true(term: &Term) -> bool {
    matches!(term, Term::Atomic(name) if name == TRUE)
}

fn number(name: &str, term: &Term) -> GroundedResult<f64> {
    term.as_number().ok_or_else(|| GroundedError::NotANumber {
        name: name.to_string(),
        value: term.to_string(),
    })
}

fn fold_seeded(
    name: &str,
    args: &[Term],
    seed: f64,
    op: impl Fn(f64, f64) -> Result<f64, String>,
) -> GroundedResult<Term> {
    let mut acc = seed;
    for arg in args {
        acc = apply_op(name, &op, acc, number(name, arg)?)?;
    }
    Ok(Term::number(acc))
}

fn fold_unseeded(
    name: &str,
    args: &[Term],
    op: impl Fn(f64, f64) -> Result<f64, String>,
) -> GroundedResult<Term> {
    let (first, rest) = args.split_first().ok_or_else(|| GroundedError::Arity {
        name: name.to_string(),
        expected: "at least 1".into(),
        actual: 0,
    })?;
    let mut acc = number(name, first)?;
    for arg in rest {
        acc = apply_op(name, &op, acc, number(name, arg)?)?;
    }
    Ok(Term::number(acc))
}

fn apply_op(
    name: &str,
    op: &impl Fn(f64, f64) -> Result<f64, String>,
    a: f64,
    b: f64,
) -> GroundedResult<f64> {
    op(a, b).map_err(|message| GroundedError::Execution {
        name: name.to_string(),
        message,
    })
}

fn expect_two<'a>(name: &str, args: &'a [Term]) -> GroundedResult<[&'a Term; 2]> {
    match args {
        [a, b] => Ok([a, b]),
        _ => Err(GroundedError::Arity {
            name: name.to_string(),
            expected: "2".into(),
            actual: args.len(),
        }),
    }
}

fn compare(name: &str, args: &[Term], cmp: impl Fn(f64, f64) -> bool) -> GroundedResult<Term> {
    let [a, b] = expect_two(name, args)?;
    Ok(Term::boolean(cmp(number(name, a)?, number(name, b)?)))
}

/// `(&match &self pattern template)`: instantiate `template` for every atom in
/// the space that `pattern` matches, collected into a product.
fn builtin_match(space: &Space, args: &[Term]) -> GroundedResult<Term> {
    let [target, pattern, template] = args else {
        return Err(GroundedError::Arity {
            name: "&match".into(),
            expected: "3".into(),
            actual: args.len(),
        });
    };
    if target.name() != SELF_SPACE {
        return Err(GroundedError::Execution {
            name: "&match".into(),
            message: format!("{target} is not a space reference"),
        });
    }
    let results = space
        .query(pattern)
        .iter()
        .map(|b| substitute(template, b))
        .collect();
    Ok(Term::product(results))
}
