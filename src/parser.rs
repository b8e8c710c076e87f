//! S-expression reader for the term model.
//!
//! Two spellings are accepted:
//!
//! - **Surface**: `(f a b)` reads as the application `(^, f, (*, a, b))`.
//!   Heads listed in [`SPECIAL_FORMS`] read as plain compounds instead, so
//!   `(= lhs rhs)` is the compound `(=, lhs, rhs)`.
//! - **Canonical**: `(op, a, b)` (a comma after the first token) reads as the
//!   compound `(op, a, b)`. This is the form [`Term`]'s `Display` produces.
//!
//! `;` starts a comment running to end of line. A program may prefix a term
//! with `!` to request evaluation.

use crate::error::{ParseError, ParseResult};
use crate::term::{PRODUCT, Term};

/// Heads that read as compounds carrying the head as operator.
pub const SPECIAL_FORMS: &[&str] = &["=", "==", ":", "->", "λ", "lambda"];

/// A top-level program entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub term: Term,
    /// `true` when the term was prefixed with `!`.
    pub evaluate: bool,
}

/// Parse exactly one term.
pub fn parse_term(input: &str) -> ParseResult<Term> {
    let mut reader = Reader::new(input);
    reader.skip_trivia();
    if reader.at_end() {
        return Err(ParseError::Empty);
    }
    let term = reader.term()?;
    reader.skip_trivia();
    if !reader.at_end() {
        return Err(reader.unexpected());
    }
    Ok(term)
}

/// Parse a sequence of statements.
pub fn parse_program(input: &str) -> ParseResult<Vec<Statement>> {
    let mut reader = Reader::new(input);
    let mut out = Vec::new();
    loop {
        reader.skip_trivia();
        if reader.at_end() {
            return Ok(out);
        }
        let evaluate = reader.eat('!');
        if evaluate {
            reader.skip_trivia();
        }
        let term = reader.term()?;
        out.push(Statement { term, evaluate });
    }
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == ';' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn unexpected(&self) -> ParseError {
        ParseError::Unexpected {
            position: self.pos,
            found: match self.peek() {
                Some(c) => format!("`{c}`"),
                None => "end of input".to_string(),
            },
        }
    }

    fn term(&mut self) -> ParseResult<Term> {
        match self.peek() {
            Some('(') => self.list(),
            Some('"') => self.string(),
            Some(')') | Some(',') | None => Err(self.unexpected()),
            Some(_) => self.symbol().map(Term::Atomic),
        }
    }

    fn symbol(&mut self) -> ParseResult<String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() || matches!(c, '(' | ')' | ',' | ';' | '"') {
                break;
            }
            self.bump();
        }
        if self.pos == start {
            return Err(self.unexpected());
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn string(&mut self) -> ParseResult<Term> {
        let start = self.pos;
        self.bump();
        loop {
            match self.bump() {
                Some('\\') => {
                    self.bump();
                }
                Some('"') => return Ok(Term::atom(&self.src[start..self.pos])),
                Some(_) => {}
                None => {
                    return Err(ParseError::Unexpected {
                        position: start,
                        found: "unterminated string literal".to_string(),
                    });
                }
            }
        }
    }

    fn list(&mut self) -> ParseResult<Term> {
        let open = self.pos;
        self.bump();
        self.skip_trivia();
        if self.eat(')') {
            return Ok(Term::product(Vec::new()));
        }
        if self.at_end() {
            return Err(ParseError::UnbalancedParens { position: open });
        }

        let first = self.term()?;
        self.skip_trivia();
        if self.peek() == Some(',') {
            let Term::Atomic(operator) = first else {
                return Err(self.unexpected());
            };
            let mut components = Vec::new();
            while self.eat(',') {
                self.skip_trivia();
                components.push(self.term()?);
                self.skip_trivia();
            }
            return self.close(open).map(|()| Term::compound(operator, components));
        }

        let mut rest = Vec::new();
        loop {
            self.skip_trivia();
            match self.peek() {
                Some(')') => break,
                None => return Err(ParseError::UnbalancedParens { position: open }),
                Some(_) => rest.push(self.term()?),
            }
        }
        self.close(open)?;

        match &first {
            Term::Atomic(head) if SPECIAL_FORMS.contains(&head.as_str()) => {
                Ok(Term::compound(head.clone(), rest))
            }
            Term::Atomic(head) if head == PRODUCT => Ok(Term::product(rest)),
            _ => Ok(Term::apply(first, rest)),
        }
    }

    fn close(&mut self, open: usize) -> ParseResult<()> {
        self.skip_trivia();
        if self.eat(')') {
            Ok(())
        } else if self.at_end() {
            Err(ParseError::UnbalancedParens { position: open })
        } else {
            Err(self.unexpected())
        }
    }
}
