//! Type algebra shared by the Hindley-Milner checker and its strategies.
//!
//! - [`strategy`]: pluggable unification (`HindleyMilner`, `SimpleUnification`)
//! - [`checker`]: constraint generation and solving over terms
//! - [`gradual`]: the cheap structural classifier used for `:` annotations
//!
//! Type variable ids come from one process-wide monotonic counter, so ids are
//! never reused across inference calls.

pub mod checker;
pub mod gradual;
pub mod strategy;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::term::{Term, is_variable_name};

pub const NUMBER: &str = "Number";
pub const STRING: &str = "String";
pub const BOOL: &str = "Bool";
pub const ATOM: &str = "Atom";

/// Identifier of a type variable.
pub type TypeVarId = u64;

static NEXT_TYPE_VAR: AtomicU64 = AtomicU64::new(0);

/// Allocate a fresh type variable id.
pub fn fresh_var_id() -> TypeVarId {
    NEXT_TYPE_VAR.fetch_add(1, Ordering::Relaxed)
}

/// A type expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Base(String),
    Arrow(Box<Type>, Box<Type>),
    List(Box<Type>),
    Maybe(Box<Type>),
    Either(Box<Type>, Box<Type>),
    Vector(usize),
    Var(TypeVarId),
    Forall(TypeVarId, Box<Type>),
}

impl Type {
    pub fn base(name: impl Into<String>) -> Self {
        Type::Base(name.into())
    }

    pub fn number() -> Self {
        Type::base(NUMBER)
    }

    pub fn string() -> Self {
        Type::base(STRING)
    }

    pub fn bool() -> Self {
        Type::base(BOOL)
    }

    pub fn atom() -> Self {
        Type::base(ATOM)
    }

    pub fn arrow(from: Type, to: Type) -> Self {
        Type::Arrow(Box::new(from), Box::new(to))
    }

    pub fn list(elem: Type) -> Self {
        Type::List(Box::new(elem))
    }

    pub fn maybe(elem: Type) -> Self {
        Type::Maybe(Box::new(elem))
    }

    pub fn either(left: Type, right: Type) -> Self {
        Type::Either(Box::new(left), Box::new(right))
    }

    /// A fresh, never-before-seen type variable.
    pub fn fresh() -> Self {
        Type::Var(fresh_var_id())
    }

    /// Whether type variable `var` occurs free in this type.
    pub fn occurs(&self, var: TypeVarId) -> bool {
        match self {
            Type::Var(v) => *v == var,
            Type::Base(_) | Type::Vector(_) => false,
            Type::Arrow(a, b) | Type::Either(a, b) => a.occurs(var) || b.occurs(var),
            Type::List(t) | Type::Maybe(t) => t.occurs(var),
            Type::Forall(bound, body) => *bound != var && body.occurs(var),
        }
    }

    /// Strip leading quantifiers, replacing each bound variable with a fresh one.
    pub fn instantiate(&self) -> Type {
        match self {
            Type::Forall(bound, body) => {
                let mut renaming = TypeSubst::new();
                renaming.insert(*bound, Type::fresh());
                rename(body, &renaming).instantiate()
            }
            other => other.clone(),
        }
    }

    /// Free type variables, in first-occurrence order.
    pub fn free_vars(&self) -> Vec<TypeVarId> {
        fn walk(ty: &Type, bound: &mut Vec<TypeVarId>, out: &mut Vec<TypeVarId>) {
            match ty {
                Type::Var(v) => {
                    if !bound.contains(v) && !out.contains(v) {
                        out.push(*v);
                    }
                }
                Type::Base(_) | Type::Vector(_) => {}
                Type::Arrow(a, b) | Type::Either(a, b) => {
                    walk(a, bound, out);
                    walk(b, bound, out);
                }
                Type::List(t) | Type::Maybe(t) => walk(t, bound, out),
                Type::Forall(v, body) => {
                    bound.push(*v);
                    walk(body, bound, out);
                    bound.pop();
                }
            }
        }
        let mut out = Vec::new();
        walk(self, &mut Vec::new(), &mut out);
        out
    }

    /// Quantify over every free variable, outermost first.
    pub fn generalize(self) -> Type {
        self.free_vars()
            .into_iter()
            .rev()
            .fold(self, |body, v| Type::Forall(v, Box::new(body)))
    }

    /// Read a type expression from a term.
    ///
    /// Accepts base names, `$a` variables, `(-> A B ..)` (right-associated),
    /// `(List A)`, `(Maybe A)`, `(Either A B)`, `(Vector n)` and
    /// `(forall $a T)`. Variables with the same name share one id.
    pub fn from_term(term: &Term) -> TypeResult<Type> {
        let mut names = HashMap::new();
        read_type(term, &mut names)
    }
}

/// Replace variables without following chains; used for quantifier renaming.
fn rename(ty: &Type, renaming: &TypeSubst) -> Type {
    match ty {
        Type::Var(v) => renaming.get(*v).cloned().unwrap_or_else(|| ty.clone()),
        Type::Base(_) | Type::Vector(_) => ty.clone(),
        Type::Arrow(a, b) => Type::arrow(rename(a, renaming), rename(b, renaming)),
        Type::Either(a, b) => Type::either(rename(a, renaming), rename(b, renaming)),
        Type::List(t) => Type::list(rename(t, renaming)),
        Type::Maybe(t) => Type::maybe(rename(t, renaming)),
        Type::Forall(bound, body) => {
            if renaming.get(*bound).is_some() {
                ty.clone()
            } else {
                Type::Forall(*bound, Box::new(rename(body, renaming)))
            }
        }
    }
}

fn read_type(term: &Term, names: &mut HashMap<String, TypeVarId>) -> TypeResult<Type> {
    let malformed = || TypeError::Malformed { term: term.clone() };
    match term {
        Term::Atomic(name) if is_variable_name(name) => Ok(Type::Var(
            *names.entry(name.clone()).or_insert_with(fresh_var_id),
        )),
        Term::Atomic(name) => Ok(Type::base(name.clone())),
        Term::Compound {
            operator,
            components,
        } if operator == "->" => {
            let (last, init) = components.split_last().ok_or_else(malformed)?;
            if init.is_empty() {
                return Err(malformed());
            }
            let mut ty = read_type(last, names)?;
            for arg in init.iter().rev() {
                ty = Type::arrow(read_type(arg, names)?, ty);
            }
            Ok(ty)
        }
        Term::Compound { .. } => {
            let (head, args) = term.as_application().ok_or_else(malformed)?;
            match (head.name(), args) {
                ("List", [elem]) => Ok(Type::list(read_type(elem, names)?)),
                ("Maybe", [elem]) => Ok(Type::maybe(read_type(elem, names)?)),
                ("Either", [l, r]) => Ok(Type::either(read_type(l, names)?, read_type(r, names)?)),
                ("Vector", [n]) => n
                    .as_number()
                    .filter(|v| *v >= 0.0 && v.fract() == 0.0)
                    .map(|v| Type::Vector(v as usize))
                    .ok_or_else(malformed),
                ("forall", [var, body]) if var.is_variable() => {
                    let id = fresh_var_id();
                    let shadowed = names.insert(var.name().to_string(), id);
                    let body = read_type(body, names);
                    match shadowed {
                        Some(old) => names.insert(var.name().to_string(), old),
                        None => names.remove(var.name()),
                    };
                    Ok(Type::Forall(id, Box::new(body?)))
                }
                _ => Err(malformed()),
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Base(name) => write!(f, "{name}"),
            Type::Arrow(a, b) => write!(f, "(-> {a} {b})"),
            Type::List(t) => write!(f, "(List {t})"),
            Type::Maybe(t) => write!(f, "(Maybe {t})"),
            Type::Either(a, b) => write!(f, "(Either {a} {b})"),
            Type::Vector(n) => write!(f, "(Vector {n})"),
            Type::Var(id) => write!(f, "'t{id}"),
            Type::Forall(id, body) => write!(f, "(forall 't{id} {body})"),
        }
    }
}

// ---------------------------------------------------------------------------
// Substitution
// ---------------------------------------------------------------------------

/// Type variable → type, built by a strategy's `solve`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeSubst {
    map: HashMap<TypeVarId, Type>,
}

impl TypeSubst {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, var: TypeVarId) -> Option<&Type> {
        self.map.get(&var)
    }

    pub fn insert(&mut self, var: TypeVarId, ty: Type) {
        self.map.insert(var, ty);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeVarId, &Type)> {
        self.map.iter().map(|(k, v)| (*k, v))
    }
}

/// An equality the solver must satisfy; `origin` is the term that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub left: Type,
    pub right: Type,
    pub origin: Term,
}

impl Constraint {
    pub fn new(left: Type, right: Type, origin: Term) -> Self {
        Self {
            left,
            right,
            origin,
        }
    }
}
