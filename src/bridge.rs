//! Boundary types for exchanging terms with an external belief-revision
//! reasoner.
//!
//! The reasoner itself lives outside this crate; it is consumed through the
//! [`Reasoner`] trait. Tasks carry terms as canonical text so either side can
//! re-read them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};
use crate::parser::parse_term;
use crate::space::Space;
use crate::term::Term;

/// Sentence kind of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Punctuation {
    /// `.`
    Judgment,
    /// `!`
    Goal,
    /// `?`
    Question,
}

impl Punctuation {
    pub fn as_char(self) -> char {
        match self {
            Punctuation::Judgment => '.',
            Punctuation::Goal => '!',
            Punctuation::Question => '?',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '.' => Some(Punctuation::Judgment),
            '!' => Some(Punctuation::Goal),
            '?' => Some(Punctuation::Question),
            _ => None,
        }
    }
}

impl fmt::Display for Punctuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Frequency/confidence pair, both in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Truth {
    pub frequency: f64,
    pub confidence: f64,
}

impl Truth {
    /// Attached to judgments and goals that arrive without a truth value.
    pub const DEFAULT: Truth = Truth {
        frequency: 1.0,
        confidence: 0.9,
    };

    /// Clamps both components into `[0, 1]`.
    pub fn new(frequency: f64, confidence: f64) -> Self {
        Self {
            frequency: frequency.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

impl Default for Truth {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A task as the reasoner sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarsTask {
    /// Canonical term text.
    pub term: String,
    pub punctuation: Punctuation,
    /// Absent for questions.
    pub truth: Option<Truth>,
}

impl NarsTask {
    /// JSON form exchanged with the reasoner process.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

impl fmt::Display for NarsTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.term, self.punctuation)?;
        if let Some(t) = self.truth {
            write!(f, " %{};{}%", t.frequency, t.confidence)?;
        }
        Ok(())
    }
}

/// Wrap a term as a task. Judgments and goals get [`Truth::DEFAULT`].
pub fn metta_to_nars(term: &Term, punctuation: Punctuation) -> NarsTask {
    let truth = match punctuation {
        Punctuation::Judgment | Punctuation::Goal => Some(Truth::DEFAULT),
        Punctuation::Question => None,
    };
    NarsTask {
        term: term.to_string(),
        punctuation,
        truth,
    }
}

/// Read a task's term back.
pub fn nars_to_metta(task: &NarsTask) -> ParseResult<Term> {
    parse_term(&task.term)
}

/// The external reasoner.
pub trait Reasoner {
    /// Feed one task in.
    fn process(&mut self, task: &NarsTask);

    /// Tasks derivable from `task` against current memory.
    fn derive(&mut self, task: &NarsTask) -> Vec<NarsTask>;

    /// Every belief currently held.
    fn beliefs(&self) -> Vec<NarsTask>;
}

/// Copy the reasoner's judgments into `space`. Returns how many were new.
///
/// Stops at the first belief whose term cannot be read.
pub fn import_beliefs(reasoner: &dyn Reasoner, space: &mut Space) -> ParseResult<usize> {
    let mut added = 0;
    for task in reasoner.beliefs() {
        if task.punctuation != Punctuation::Judgment {
            continue;
        }
        let term = nars_to_metta(&task).map_err(|e| {
            tracing::warn!(task = %task, error = %e, "unreadable belief");
            e
        })?;
        if space.add_atom(term) {
            added += 1;
        }
    }
    tracing::debug!(added, "imported reasoner beliefs");
    Ok(added)
}

/// Send every atom of `space` to the reasoner as a judgment.
pub fn export_atoms(space: &Space, reasoner: &mut dyn Reasoner) -> usize {
    for atom in space.atoms() {
        reasoner.process(&metta_to_nars(atom, Punctuation::Judgment));
    }
    space.len()
}

/// Ask the reasoner what follows from `term`, reading back every derived term.
pub fn derive_terms(reasoner: &mut dyn Reasoner, term: &Term) -> ParseResult<Vec<Term>> {
    reasoner
        .derive(&metta_to_nars(term, Punctuation::Question))
        .iter()
        .map(nars_to_metta)
        .collect::<Result<Vec<_>, ParseError>>()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Remembers judgments and answers questions with matching beliefs.
    #[derive(Default)]
    struct EchoReasoner {
        memory: Vec<NarsTask>,
    }

    impl Reasoner for EchoReasoner {
        fn process(&mut self, task: &NarsTask) {
            self.memory.push(task.clone());
        }

        fn derive(&mut self, task: &NarsTask) -> Vec<NarsTask> {
            self.memory
                .iter()
                .filter(|b| b.term == task.term)
                .cloned()
                .collect()
        }

        fn beliefs(&self) -> Vec<NarsTask> {
            self.memory.clone()
        }
    }

    fn t(src: &str) -> Term {
        parse_term(src).unwrap()
    }

    #[test]
    fn judgments_and_goals_get_default_truth() {
        let task = metta_to_nars(&t("(bird tweety)"), Punctuation::Judgment);
        assert_eq!(task.truth, Some(Truth::DEFAULT));
        let goal = metta_to_nars(&t("(fly tweety)"), Punctuation::Goal);
        assert_eq!(goal.truth, Some(Truth::new(1.0, 0.9)));
        let question = metta_to_nars(&t("(fly tweety)"), Punctuation::Question);
        assert_eq!(question.truth, None);
    }

    #[test]
    fn task_terms_read_back() {
        let term = t("(isa (cat tom) animal)");
        let task = metta_to_nars(&term, Punctuation::Judgment);
        assert_eq!(nars_to_metta(&task).unwrap(), term);
    }

    #[test]
    fn punctuation_chars_round_trip() {
        for p in [Punctuation::Judgment, Punctuation::Goal, Punctuation::Question] {
            assert_eq!(Punctuation::from_char(p.as_char()), Some(p));
        }
        assert_eq!(Punctuation::from_char(','), None);
    }

    #[test]
    fn import_skips_non_judgments_and_duplicates() {
        let mut reasoner = EchoReasoner::default();
        reasoner.process(&metta_to_nars(&t("(bird tweety)"), Punctuation::Judgment));
        reasoner.process(&metta_to_nars(&t("(bird tweety)"), Punctuation::Judgment));
        reasoner.process(&metta_to_nars(&t("(fly tweety)"), Punctuation::Goal));

        let mut space = Space::new();
        assert_eq!(import_beliefs(&reasoner, &mut space).unwrap(), 1);
        assert!(space.has_atom(&t("(bird tweety)")));
        assert!(!space.has_atom(&t("(fly tweety)")));
    }

    #[test]
    fn unreadable_beliefs_fail_the_import() {
        let mut reasoner = EchoReasoner::default();
        reasoner.process(&NarsTask {
            term: "(broken".into(),
            punctuation: Punctuation::Judgment,
            truth: Some(Truth::DEFAULT),
        });
        assert!(import_beliefs(&reasoner, &mut Space::new()).is_err());
    }

    #[test]
    fn export_then_derive() {
        let mut space = Space::new();
        space.add_atom(t("(bird tweety)"));
        let mut reasoner = EchoReasoner::default();
        assert_eq!(export_atoms(&space, &mut reasoner), 1);
        let derived = derive_terms(&mut reasoner, &t("(bird tweety)")).unwrap();
        assert_eq!(derived, vec![t("(bird tweety)")]);
    }

    #[test]
    fn tasks_travel_as_json() {
        let task = metta_to_nars(&t("(bird tweety)"), Punctuation::Question);
        let json = task.to_json().unwrap();
        assert!(json.contains("\"truth\":null"));
        assert_eq!(NarsTask::from_json(&json).unwrap(), task);
        assert!(NarsTask::from_json("{\"term\": 3}").is_err());
    }

    #[test]
    fn truth_is_clamped() {
        let truth = Truth::new(1.5, -0.2);
        assert_eq!(truth, Truth::new(1.0, 0.0));
    }
}
