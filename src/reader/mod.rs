//! Support for reading micro-lang programs from source text.
//!
//! Reading happens in two passes, both of which stop at the first error:
//! the tokenizer turns text into tokens, and the parser turns tokens into a `ProgramTable`.

use std::fmt::{Display, Formatter};
use std::io::ErrorKind;

use crate::data::{Comparator, ProgramTable};

pub use parse::parse;
pub use token::{tokenize, Keyword, Token, TokenOffset};

mod parse;
mod token;

/// Tokenize and parse the source text into its programs.
pub fn read(input: &str) -> ReadResult<ProgramTable> {
    let tokens = tokenize(input)?;
    tracing::debug!("read {} tokens", tokens.len());
    let programs = parse(tokens)?;
    tracing::debug!("read {} programs", programs.len());
    Ok(programs)
}

/// What went wrong while reading.
///
/// Variants holding a `String` carry the offending lexeme, as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    UnrecognizedInput(String),
    UnterminatedString,
    NumberOutOfRange(String),
    ExpectedProgram(String),
    MissingProgramName,
    InvalidProgramName(String),
    DuplicateProgram(String),
    UnknownInstruction(String),
    MissingAddress,
    InvalidAddress(String),
    MissingAssign,
    ExpectedAssign(String),
    MissingValue,
    InvalidValue(String),
    MissingLeftOperand,
    MissingRightOperand(Comparator),
    InvalidOperand(String),
    MissingComparator,
    InvalidComparator(String),
    MissingComma,
    ExpectedComma(String),
    MissingTarget(Keyword),
    InvalidTarget(String),
    Unterminated,
}

impl Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        use SyntaxErrorKind::*;
        match self {
            UnrecognizedInput(s) => write!(f, "unrecognized input '{s}'"),
            UnterminatedString => write!(f, "string literal is missing its closing '\"'"),
            NumberOutOfRange(s) => write!(f, "number '{s}' is out of range"),
            ExpectedProgram(s) => write!(
                f,
                "expected 'program' at the start of a program definition, found '{s}'"
            ),
            MissingProgramName => write!(f, "program name is missing after 'program'"),
            InvalidProgramName(s) => write!(f, "'{s}' is not a valid program name"),
            DuplicateProgram(s) => write!(f, "program '{s}' is already defined"),
            UnknownInstruction(s) => write!(f, "unknown instruction '{s}'"),
            MissingAddress => write!(f, "address is missing after 'write'"),
            InvalidAddress(s) => write!(
                f,
                "invalid address '{s}'; expected the form [row,column]"
            ),
            MissingAssign => write!(f, "expected ':=' after the address, found end of input"),
            ExpectedAssign(s) => write!(f, "expected ':=' after the address, found '{s}'"),
            MissingValue => write!(f, "value is missing after ':='"),
            InvalidValue(s) => write!(f, "'{s}' is not a value"),
            MissingLeftOperand => write!(f, "left operand is missing after 'call-if'"),
            MissingRightOperand(c) => write!(f, "right operand is missing after '{c}'"),
            InvalidOperand(s) => write!(f, "'{s}' is not a valid operand"),
            MissingComparator => write!(
                f,
                "comparison operator is missing; allowed: =, <, <=, >, >="
            ),
            InvalidComparator(s) => write!(
                f,
                "invalid comparison operator '{s}'; allowed: =, <, <=, >, >="
            ),
            MissingComma => write!(f, "comma is missing after the condition"),
            ExpectedComma(s) => write!(f, "comma is missing after the condition, found '{s}'"),
            MissingTarget(Keyword::CallIf) => write!(f, "target program is missing after ','"),
            MissingTarget(k) => write!(f, "target program is missing after '{k}'"),
            InvalidTarget(s) => write!(f, "'{s}' is not a valid target program"),
            Unterminated => write!(f, "'program-end' is missing at the end of the definition"),
        }
    }
}

/// Error type for a read that does not produce a program table.
///
/// Like any reader, this one distinguishes input that is wrong ("program program")
/// from input that stopped too early ("program P write"). The latter is `is_incomplete`;
/// an editor may wish to treat it as "keep typing" rather than as a mistake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    /// The program being defined, if the error is inside a definition.
    pub program: Option<String>,
    /// Line and column (1-indexed) of the offending token.
    /// None if the input ended early.
    pub location: Option<(usize, usize)>,
}

impl SyntaxError {
    pub fn new(kind: SyntaxErrorKind) -> Self {
        SyntaxError {
            kind,
            program: None,
            location: None,
        }
    }

    /// Attach the name of the program being read.
    pub fn in_program(mut self, program: impl Into<String>) -> Self {
        self.program = Some(program.into());
        self
    }

    /// Attach the position of the offending token.
    pub fn at(self, token: &TokenOffset) -> Self {
        self.at_position(token.line, token.column)
    }

    pub fn at_position(mut self, line: usize, column: usize) -> Self {
        self.location = Some((line, column));
        self
    }

    pub fn is_incomplete(&self) -> bool {
        self.location.is_none() || self.kind == SyntaxErrorKind::UnterminatedString
    }
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.location {
            Some((line, column)) => write!(f, "syntax error at line {line} column {column}")?,
            None => write!(f, "syntax error at end of input")?,
        }
        if let Some(program) = &self.program {
            write!(f, " in '{program}'")?;
        }
        write!(f, ": {}", self.kind)
    }
}

impl std::error::Error for SyntaxError {}

/// The main result type for this module:
/// a T (tokens, program table), or a syntax error.
pub type ReadResult<T> = Result<T, SyntaxError>;

impl From<SyntaxError> for std::io::Error {
    fn from(value: SyntaxError) -> Self {
        let kind = if value.is_incomplete() {
            ErrorKind::UnexpectedEof
        } else {
            ErrorKind::InvalidInput
        };
        std::io::Error::new(kind, value.to_string())
    }
}
