//! Rich diagnostic error types for the metta-kernel evaluator.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes and help text. Unification failure is deliberately absent:
//! it is a local `None`, never an error value.

use miette::Diagnostic;
use thiserror::Error;

use crate::term::Term;

/// Top-level error type for the evaluator.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum MettaError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Reduce(#[from] ReduceError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Grounded(#[from] GroundedError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Type errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum TypeError {
    #[error("type mismatch: expected {expected}, got {actual} in {term}")]
    #[diagnostic(
        code(metta::types::mismatch),
        help(
            "The two sides of a constraint could not be unified. \
             Check the declared types of the symbols involved, \
             or remove the annotation that forces the expected type."
        )
    )]
    Mismatch {
        expected: String,
        actual: String,
        term: Term,
    },

    #[error("occurs check failed: {var} occurs in {ty}")]
    #[diagnostic(
        code(metta::types::occurs_check),
        help("Binding the variable would build an infinite type. Self-application is not typeable.")
    )]
    OccursCheck { var: String, ty: String },

    #[error("annotation mismatch: {term} is {actual}, not {expected}")]
    #[diagnostic(
        code(metta::types::annotation),
        help(
            "The structural classifier inferred a type that is neither the annotated type \
             nor one of its subtypes."
        )
    )]
    AnnotationMismatch {
        expected: String,
        actual: String,
        term: Term,
    },

    #[error("unknown type name: {name}")]
    #[diagnostic(
        code(metta::types::unknown_name),
        help(
            "Annotations must use one of the built-in type names: \
             Atom, Symbol, Number, String, Bool, Variable, Grounded, Expression, List."
        )
    )]
    UnknownTypeName { name: String },

    #[error("malformed type expression: {term}")]
    #[diagnostic(
        code(metta::types::malformed),
        help("Type expressions look like Number, $a, (-> A B), (List A), (Maybe A), (Either A B) or (Vector 3).")
    )]
    Malformed { term: Term },
}

// ---------------------------------------------------------------------------
// Reduction errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ReduceError {
    #[error("reduction exceeded {steps} steps; last expression: {last}")]
    #[diagnostic(
        code(metta::reduce::step_limit),
        help(
            "The rewrite system did not reach a normal form within the step bound. \
             Review your rules for non-terminating patterns, or raise `max_steps`."
        )
    )]
    StepLimitExceeded { last: Term, steps: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Grounded(#[from] GroundedError),
}

// ---------------------------------------------------------------------------
// Grounded-atom errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GroundedError {
    #[error("grounded atom not found: {name}")]
    #[diagnostic(
        code(metta::grounded::not_found),
        help("No native function is registered under this name. Register it with `GroundedRegistry::register`.")
    )]
    NotFound { name: String },

    #[error("grounded atom {name} failed: {message}")]
    #[diagnostic(code(metta::grounded::execution))]
    Execution { name: String, message: String },

    #[error("grounded atom {name} expects {expected} argument(s), got {actual}")]
    #[diagnostic(
        code(metta::grounded::arity),
        help("Check the number of components in the argument product.")
    )]
    Arity {
        name: String,
        expected: String,
        actual: usize,
    },

    #[error("grounded atom {name}: {value} is not a number")]
    #[diagnostic(
        code(metta::grounded::not_a_number),
        help("Arithmetic builtins coerce atom names to numbers; compound or symbolic arguments are rejected.")
    )]
    NotANumber { name: String, value: String },
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("unexpected {found} at byte {position}")]
    #[diagnostic(
        code(metta::parse::unexpected),
        help("Check for stray parentheses, commas or unterminated string literals.")
    )]
    Unexpected { position: usize, found: String },

    #[error("unbalanced parentheses: expression opened at byte {position} is never closed")]
    #[diagnostic(code(metta::parse::unbalanced), help("Add the missing `)`."))]
    UnbalancedParens { position: usize },

    #[error("empty input: expected a term")]
    #[diagnostic(code(metta::parse::empty))]
    Empty,
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("I/O error reading configuration: {source}")]
    #[diagnostic(
        code(metta::config::io),
        help("Check that the configuration file exists and is readable.")
    )]
    Io {
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML configuration: {message}")]
    #[diagnostic(code(metta::config::toml))]
    Toml { message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(metta::config::invalid), help("Check the SessionConfig fields. {message}"))]
    Invalid { message: String },
}

/// Convenience alias for functions returning evaluator results.
pub type MettaResult<T> = std::result::Result<T, MettaError>;

pub type TypeResult<T> = std::result::Result<T, TypeError>;

pub type ReduceResult<T> = std::result::Result<T, ReduceError>;

pub type GroundedResult<T> = std::result::Result<T, GroundedError>;

pub type ParseResult<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grounded_error_converts_to_metta_error() {
        let err = GroundedError::NotFound {
            name: "&nope".into(),
        };
        let metta: MettaError = err.into();
        assert!(matches!(
            metta,
            MettaError::Grounded(GroundedError::NotFound { .. })
        ));
    }

    #[test]
    fn reduce_error_wraps_grounded_error() {
        let err = GroundedError::Execution {
            name: "&boom".into(),
            message: "exploded".into(),
        };
        let reduce: ReduceError = err.into();
        assert!(matches!(
            reduce,
            ReduceError::Grounded(GroundedError::Execution { .. })
        ));
    }

    #[test]
    fn mismatch_message_names_both_types() {
        let err = TypeError::Mismatch {
            expected: "Number".into(),
            actual: "String".into(),
            term: Term::atom("x"),
        };
        let msg = format!("{err}");
        assert!(msg.contains("Number"));
        assert!(msg.contains("String"));
    }

    #[test]
    fn step_limit_message_carries_count() {
        let err = ReduceError::StepLimitExceeded {
            last: Term::atom("loop"),
            steps: 1000,
        };
        assert!(format!("{err}").contains("1000"));
    }
}
