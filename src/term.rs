//! The term model: an immutable expression tree shared by every subsystem.
//!
//! A [`Term`] is either an atom carrying a name, or a compound carrying an
//! operator and ordered components. Name prefixes are load-bearing: `$` and `?`
//! mark variables, `&` marks a grounded-atom reference. Rewriting never mutates
//! a term in place; it always builds a new one.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Operator of an application node `(^, head, (*, args..))`.
pub const APPLY: &str = "^";
/// Operator of a product (argument list) node.
pub const PRODUCT: &str = "*";

/// Canonical truth atoms produced by comparisons and connectives.
pub const TRUE: &str = "True";
pub const FALSE: &str = "False";

/// An immutable expression tree.
///
/// Equality, ordering and hashing are structural, which is what lets a
/// [`Space`](crate::space::Space) collapse duplicate atoms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Term {
    /// A leaf: symbol, literal, variable or grounded reference.
    Atomic(String),
    /// An operator applied to ordered components.
    Compound {
        operator: String,
        components: Vec<Term>,
    },
}

impl Term {
    /// Create an atom.
    pub fn atom(name: impl Into<String>) -> Self {
        Term::Atomic(name.into())
    }

    /// Create a variable atom, adding the `$` prefix when missing.
    pub fn var(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.starts_with('$') || name.starts_with('?') {
            Term::Atomic(name)
        } else {
            Term::Atomic(format!("${name}"))
        }
    }

    /// Create a compound term.
    pub fn compound(operator: impl Into<String>, components: Vec<Term>) -> Self {
        Term::Compound {
            operator: operator.into(),
            components,
        }
    }

    /// Create an argument product `(*, args..)`.
    pub fn product(args: Vec<Term>) -> Self {
        Term::compound(PRODUCT, args)
    }

    /// Create an application `(^, head, (*, args..))`, the shape a surface
    /// expression `(head args..)` reads as.
    pub fn apply(head: Term, args: Vec<Term>) -> Self {
        Term::compound(APPLY, vec![head, Term::product(args)])
    }

    /// Create a numeric atom. Integral values print without a fractional part.
    pub fn number(value: f64) -> Self {
        Term::Atomic(format_number(value))
    }

    /// Create one of the canonical truth atoms.
    pub fn boolean(value: bool) -> Self {
        Term::Atomic(if value { TRUE } else { FALSE }.to_string())
    }

    /// The literal name key of this term: the atom name, or the operator of a
    /// compound.
    pub fn name(&self) -> &str {
        match self {
            Term::Atomic(name) => name,
            Term::Compound { operator, .. } => operator,
        }
    }

    /// The operator, for compounds only.
    pub fn operator(&self) -> Option<&str> {
        match self {
            Term::Atomic(_) => None,
            Term::Compound { operator, .. } => Some(operator),
        }
    }

    /// Ordered components; empty for atoms.
    pub fn components(&self) -> &[Term] {
        match self {
            Term::Atomic(_) => &[],
            Term::Compound { components, .. } => components,
        }
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self, Term::Atomic(_))
    }

    /// Whether this is a `$`- or `?`-prefixed variable atom.
    pub fn is_variable(&self) -> bool {
        matches!(self, Term::Atomic(name) if is_variable_name(name))
    }

    /// Whether this is an `&`-prefixed grounded-atom reference.
    pub fn is_grounded_ref(&self) -> bool {
        matches!(self, Term::Atomic(name) if name.starts_with('&'))
    }

    /// The literal name of the first component, when that component is an atom.
    pub fn head_name(&self) -> Option<&str> {
        match self.components().first() {
            Some(Term::Atomic(name)) => Some(name),
            _ => None,
        }
    }

    /// Numeric reading of an atom name.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Term::Atomic(name) => parse_number(name),
            Term::Compound { .. } => None,
        }
    }

    /// Whether this atom is a quoted string literal.
    pub fn is_string_literal(&self) -> bool {
        matches!(self, Term::Atomic(name) if name.len() >= 2 && name.starts_with('"') && name.ends_with('"'))
    }

    /// Whether this atom is one of the truth literals.
    pub fn is_bool_literal(&self) -> bool {
        matches!(self, Term::Atomic(name) if matches!(name.as_str(), "True" | "False" | "true" | "false"))
    }

    /// Split an application into its head and argument list.
    ///
    /// Arguments are the product's components when the second component is a
    /// compound, otherwise empty.
    pub fn as_application(&self) -> Option<(&Term, &[Term])> {
        match self {
            Term::Compound {
                operator,
                components,
            } if operator == APPLY && components.len() == 2 => {
                Some((&components[0], components[1].components()))
            }
            _ => None,
        }
    }

    /// Render in the surface syntax: applications print as `(head args..)`.
    pub fn to_metta(&self) -> String {
        match self {
            Term::Atomic(name) => name.clone(),
            Term::Compound { .. } => {
                if let Some((head, args)) = self.as_application() {
                    if self.components()[1].operator() == Some(PRODUCT) {
                        let mut out = format!("({}", head.to_metta());
                        for arg in args {
                            out.push(' ');
                            out.push_str(&arg.to_metta());
                        }
                        out.push(')');
                        return out;
                    }
                }
                let mut out = format!("({}", self.name());
                for c in self.components() {
                    out.push_str(", ");
                    out.push_str(&c.to_metta());
                }
                out.push(')');
                out
            }
        }
    }

    /// Count nodes in the tree.
    pub fn size(&self) -> usize {
        1 + self.components().iter().map(Term::size).sum::<usize>()
    }
}

impl fmt::Display for Term {
    /// Canonical form: `(op, c1, c2)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Atomic(name) => write!(f, "{name}"),
            Term::Compound {
                operator,
                components,
            } => {
                write!(f, "({operator}")?;
                for c in components {
                    write!(f, ", {c}")?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<&str> for Term {
    fn from(name: &str) -> Self {
        Term::atom(name)
    }
}

/// `$` or `?` prefix.
pub fn is_variable_name(name: &str) -> bool {
    name.starts_with('$') || name.starts_with('?')
}

/// Parse an atom name as a number.
///
/// Only plain decimal literals count; `inf`/`NaN` spellings are symbols.
pub fn parse_number(name: &str) -> Option<f64> {
    let first = name.chars().next()?;
    if !(first.is_ascii_digit() || first == '-' || first == '+' || first == '.') {
        return None;
    }
    name.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Format a number the way numeric atoms spell it.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

// ---------------------------------------------------------------------------
// Bindings
// ---------------------------------------------------------------------------

/// Variable name → bound term, built up during unification.
///
/// Extension consumes the map and returns the extended one, so a caller that
/// kept a clone still sees the earlier state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bindings {
    map: BTreeMap<String, Term>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return these bindings extended with `var := value`.
    pub fn with(mut self, var: impl Into<String>, value: Term) -> Self {
        self.map.insert(var.into(), value);
        self
    }

    pub fn get(&self, var: &str) -> Option<&Term> {
        self.map.get(var)
    }

    pub fn contains(&self, var: &str) -> bool {
        self.map.contains_key(var)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl fmt::Display for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.map.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{k} := {v}")?;
        }
        write!(f, "}}")
    }
}
