//! Closed-world structural classifier for lightweight `:` annotation checks.
//!
//! Each type name is a predicate over term shape, arranged in a fixed subtype
//! DAG:
//!
//! ```text
//!             Atom
//!     /        |        \         \
//! Symbol   Expression  Variable  Grounded
//!   |   \      |
//! Number |    List
//!   String  Bool
//! ```
//!
//! The classifier is independent of [`super::checker`]. It caches by the
//! term's name alone (the operator, for compounds), so structurally different
//! terms with the same name share one classification.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::term::{PRODUCT, Term};

/// The closed set of classifier types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradualType {
    Atom,
    Symbol,
    Number,
    String,
    Bool,
    Variable,
    Grounded,
    Expression,
    List,
}

impl GradualType {
    /// Classification order: the first matching predicate wins.
    pub const PRECEDENCE: [GradualType; 8] = [
        GradualType::Variable,
        GradualType::Grounded,
        GradualType::Number,
        GradualType::String,
        GradualType::Bool,
        GradualType::List,
        GradualType::Expression,
        GradualType::Symbol,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GradualType::Atom => "Atom",
            GradualType::Symbol => "Symbol",
            GradualType::Number => "Number",
            GradualType::String => "String",
            GradualType::Bool => "Bool",
            GradualType::Variable => "Variable",
            GradualType::Grounded => "Grounded",
            GradualType::Expression => "Expression",
            GradualType::List => "List",
        }
    }

    /// Direct supertypes.
    pub fn parents(self) -> &'static [GradualType] {
        match self {
            GradualType::Atom => &[],
            GradualType::Symbol
            | GradualType::Expression
            | GradualType::Variable
            | GradualType::Grounded => &[GradualType::Atom],
            GradualType::Number | GradualType::String | GradualType::Bool => {
                &[GradualType::Symbol]
            }
            GradualType::List => &[GradualType::Expression],
        }
    }

    /// Reflexive-transitive subtype test over the DAG.
    pub fn is_subtype_of(self, other: GradualType) -> bool {
        self == other || self.parents().iter().any(|p| p.is_subtype_of(other))
    }

    /// Whether `term` has the shape this type names.
    pub fn matches(self, term: &Term) -> bool {
        match self {
            GradualType::Atom => true,
            GradualType::Variable => term.is_variable(),
            GradualType::Grounded => term.is_grounded_ref(),
            GradualType::Number => term.as_number().is_some(),
            GradualType::String => term.is_string_literal(),
            GradualType::Bool => term.is_bool_literal(),
            GradualType::List => term.operator() == Some(PRODUCT),
            GradualType::Expression => !term.is_atomic(),
            GradualType::Symbol => term.is_atomic(),
        }
    }
}

impl fmt::Display for GradualType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GradualType {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ty = match s {
            "Atom" => GradualType::Atom,
            "Symbol" => GradualType::Symbol,
            "Number" => GradualType::Number,
            "String" => GradualType::String,
            "Bool" => GradualType::Bool,
            "Variable" => GradualType::Variable,
            "Grounded" => GradualType::Grounded,
            "Expression" => GradualType::Expression,
            "List" => GradualType::List,
            _ => {
                return Err(TypeError::UnknownTypeName {
                    name: s.to_string(),
                });
            }
        };
        Ok(ty)
    }
}

/// Structural classifier with a name-keyed cache.
#[derive(Debug, Clone, Default)]
pub struct GradualClassifier {
    cache: HashMap<String, GradualType>,
}

impl GradualClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the classification of every term named `name`.
    pub fn declare(&mut self, name: impl Into<String>, ty: GradualType) {
        self.cache.insert(name.into(), ty);
    }

    /// Classify `term`. Atom when nothing more specific matches.
    pub fn infer_type(&mut self, term: &Term) -> GradualType {
        if let Some(ty) = self.cache.get(term.name()) {
            return *ty;
        }
        let ty = GradualType::PRECEDENCE
            .into_iter()
            .find(|ty| ty.matches(term))
            .unwrap_or(GradualType::Atom);
        self.cache.insert(term.name().to_string(), ty);
        ty
    }

    /// Succeed when `term` classifies as `expected` or one of its subtypes.
    pub fn check_type_annotation(&mut self, term: &Term, expected: &str) -> TypeResult<GradualType> {
        let expected: GradualType = expected.parse()?;
        let actual = self.infer_type(term);
        if actual.is_subtype_of(expected) {
            Ok(actual)
        } else {
            Err(TypeError::AnnotationMismatch {
                expected: expected.to_string(),
                actual: actual.to_string(),
                term: term.clone(),
            })
        }
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
