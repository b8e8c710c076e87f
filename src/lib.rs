// Error variants in `error` read their fields only through #[error]/help
// format strings, which unused_assignments does not see.
#![allow(unused_assignments)]

//! # metta-kernel
//!
//! A small term-rewriting evaluator for a MeTTa-like language: structural
//! unification, priority-ordered rewriting to normal form, macro
//! pre-expansion, explicit non-determinism, native grounded atoms and a
//! two-layer type system.
//!
//! ## Architecture
//!
//! - **Terms** (`term`, `parser`): immutable expression trees and their text surface
//! - **Matching** (`unify`): one-directional pattern matching and substitution
//! - **Knowledge** (`space`): atoms and rewrite rules, in insertion order
//! - **Evaluation** (`reduce`, `grounded`, `macros`): rule/native rewriting, bounded
//! - **Types** (`types`): structural classifier plus Hindley-Milner inference
//! - **Non-determinism** (`nondet`): superposition, collapse and combinators
//! - **Session** (`session`, `config`): single owner of all of the above
//!
//! ## Library usage
//!
//! ```
//! use metta_kernel::session::Session;
//!
//! let mut session = Session::default();
//! let results = session
//!     .load("(= (square $x) (&* $x $x))\n!(square 7)")
//!     .unwrap();
//! assert_eq!(results[0].to_string(), "49");
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod grounded;
pub mod macros;
pub mod nondet;
pub mod parser;
pub mod reduce;
pub mod session;
pub mod space;
pub mod term;
pub mod types;
pub mod unify;
