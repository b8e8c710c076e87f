//! Explicit non-determinism: superpositions of values and their collapse.
//!
//! "All possible values" is an ordinary container, not control-flow
//! backtracking. The combinators share one size rule for their results:
//!
//! - no surviving value → `None`
//! - exactly one → a bare [`Branch::Value`]
//! - two or more → a wrapped [`Branch::Super`]
//!
//! Random collapse goes through a [`RandomSource`] so tests can pin the choice.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// An ordered multi-value container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Superposition<T> {
    values: Vec<T>,
}

impl<T> Superposition<T> {
    pub fn new(values: Vec<T>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<T> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.values.iter()
    }
}

impl<T> IntoIterator for Superposition<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<T> FromIterator<T> for Superposition<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Either a plain value or a superposition of values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Branch<T> {
    Value(T),
    Super(Superposition<T>),
}

impl<T> Branch<T> {
    pub fn is_superposition(&self) -> bool {
        matches!(self, Branch::Super(_))
    }

    /// All values, a plain value counting as a one-element sequence.
    pub fn into_values(self) -> Vec<T> {
        match self {
            Branch::Value(v) => vec![v],
            Branch::Super(s) => s.into_vec(),
        }
    }
}

impl<T> From<Superposition<T>> for Branch<T> {
    fn from(s: Superposition<T>) -> Self {
        Branch::Super(s)
    }
}

/// Build a superposition, splicing in the members of nested superpositions.
///
/// Exactly one level is flattened; the result is always wrapped, whatever its
/// size.
pub fn superpose<T>(items: impl IntoIterator<Item = Branch<T>>) -> Superposition<T> {
    items.into_iter().flat_map(Branch::into_values).collect()
}

/// Apply the size rule to a finished sequence of results.
pub fn settle<T>(mut values: Vec<T>) -> Option<Branch<T>> {
    match values.len() {
        0 => None,
        1 => values.pop().map(Branch::Value),
        _ => Some(Branch::Super(Superposition::new(values))),
    }
}

// ---------------------------------------------------------------------------
// Randomness
// ---------------------------------------------------------------------------

/// Source of the index chosen by [`collapse`].
pub trait RandomSource {
    /// Pick an index in `0..len`. `len` is never zero.
    fn pick(&mut self, len: usize) -> usize;
}

/// Adapter turning any [`rand::Rng`] into a [`RandomSource`].
#[derive(Debug, Clone)]
pub struct RngSource<R>(pub R);

impl<R: Rng> RandomSource for RngSource<R> {
    fn pick(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len)
    }
}

/// Thread-local entropy; the default for interactive use.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn pick(&mut self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Replays a fixed list of indices, cycling when exhausted.
#[derive(Debug, Clone)]
pub struct Scripted {
    picks: Vec<usize>,
    next: usize,
}

impl Scripted {
    pub fn new(picks: Vec<usize>) -> Self {
        Self { picks, next: 0 }
    }
}

impl RandomSource for Scripted {
    fn pick(&mut self, len: usize) -> usize {
        if self.picks.is_empty() {
            return 0;
        }
        let i = self.picks[self.next % self.picks.len()];
        self.next += 1;
        i % len
    }
}

// ---------------------------------------------------------------------------
// Collapse
// ---------------------------------------------------------------------------

/// Resolve to one value, chosen uniformly through `rng`.
///
/// A plain value passes through; an empty superposition yields `None`.
pub fn collapse<T>(x: Branch<T>, rng: &mut dyn RandomSource) -> Option<T> {
    match x {
        Branch::Value(v) => Some(v),
        Branch::Super(s) => {
            if s.is_empty() {
                return None;
            }
            let i = rng.pick(s.len());
            s.into_vec().into_iter().nth(i)
        }
    }
}

pub fn collapse_first<T>(x: Branch<T>) -> Option<T> {
    x.into_values().into_iter().next()
}

pub fn collapse_all<T>(x: Branch<T>) -> Vec<T> {
    x.into_values()
}

// ---------------------------------------------------------------------------
// Combinators
// ---------------------------------------------------------------------------

/// Apply `f` to every value; superpositions returned by `f` are spliced in.
pub fn map_superpose<T, U>(x: Branch<T>, mut f: impl FnMut(T) -> Branch<U>) -> Option<Branch<U>> {
    let out = x.into_values().into_iter().flat_map(|v| f(v).into_values()).collect();
    settle(out)
}

/// Keep the values satisfying `keep`.
pub fn filter_superpose<T>(x: Branch<T>, mut keep: impl FnMut(&T) -> bool) -> Option<Branch<T>> {
    settle(x.into_values().into_iter().filter(|v| keep(v)).collect())
}

/// Monadic bind: `f` may kill a branch (`None`), keep it, or fork it.
pub fn bind<T, U>(x: Branch<T>, mut f: impl FnMut(T) -> Option<Branch<U>>) -> Option<Branch<U>> {
    let out = x
        .into_values()
        .into_iter()
        .filter_map(|v| f(v))
        .flat_map(Branch::into_values)
        .collect();
    settle(out)
}

/// Cartesian product of two operands through `f`, first operand major.
///
/// A plain operand is treated as a one-element sequence.
pub fn combine<A, B, C>(
    a: Branch<A>,
    b: Branch<B>,
    mut f: impl FnMut(&A, &B) -> C,
) -> Option<Branch<C>> {
    let left = a.into_values();
    let right = b.into_values();
    let mut out = Vec::with_capacity(left.len() * right.len());
    for x in &left {
        for y in &right {
            out.push(f(x, y));
        }
    }
    settle(out)
}
