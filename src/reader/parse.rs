//! Module for building programs out of tokens.
//!
//! The grammar is:
//!
//! ```text
//! file        := programDef*
//! programDef  := 'program' IDENT instruction* 'program-end'
//! instruction := writeInstr | callInstr | callIfInstr
//! writeInstr  := 'write' CELLREF ':=' expr
//! callInstr   := 'call' IDENT
//! callIfInstr := 'call-if' expr COMPAROP expr ',' IDENT
//! expr        := CELLREF | NUMBER | STRING | IDENT
//! ```
//!
//! Parsing is a single pass, one token at a time, without backtracking.

use crate::data::{Instruction, Program, ProgramTable, Value};
use crate::reader::token::{Keyword, Token, TokenOffset};
use crate::reader::{ReadResult, SyntaxError, SyntaxErrorKind};

/// Parse a token stream into the programs it defines.
///
/// Call targets are not checked here; a program may call one defined later, or never.
pub fn parse(tokens: impl IntoIterator<Item = TokenOffset>) -> ReadResult<ProgramTable> {
    let mut tokens = tokens.into_iter();
    let mut programs = ProgramTable::default();

    while let Some(start) = tokens.next() {
        if start.token != Token::Keyword(Keyword::Program) {
            return Err(
                SyntaxError::new(SyntaxErrorKind::ExpectedProgram(start.token.to_string()))
                    .at(&start),
            );
        }

        let name_tok = tokens
            .next()
            .ok_or_else(|| SyntaxError::new(SyntaxErrorKind::MissingProgramName))?;
        let name = match &name_tok.token {
            Token::Identifier(name) => name.clone(),
            Token::Keyword(Keyword::ProgramEnd) => {
                return Err(SyntaxError::new(SyntaxErrorKind::MissingProgramName).at(&name_tok))
            }
            other => {
                return Err(
                    SyntaxError::new(SyntaxErrorKind::InvalidProgramName(other.to_string()))
                        .at(&name_tok),
                )
            }
        };
        let program = ProgramParser {
            tokens: &mut tokens,
            program: Program::new(name),
        }
        .parse_body()?;
        programs.insert(program).map_err(|program| {
            SyntaxError::new(SyntaxErrorKind::DuplicateProgram(program.name.clone()))
                .in_program(program.name)
                .at(&name_tok)
        })?;
    }

    Ok(programs)
}

/// Parser state within one program definition.
struct ProgramParser<'a, I> {
    tokens: &'a mut I,
    program: Program,
}

impl<I> ProgramParser<'_, I>
where
    I: Iterator<Item = TokenOffset>,
{
    fn error(&self, kind: SyntaxErrorKind) -> SyntaxError {
        SyntaxError::new(kind).in_program(self.program.name.as_str())
    }

    /// Take the next token, or fail with `missing` if the input has ended.
    fn expect(&mut self, missing: SyntaxErrorKind) -> ReadResult<TokenOffset> {
        self.tokens.next().ok_or_else(|| self.error(missing))
    }

    /// Read instructions up to and including `program-end`.
    fn parse_body(mut self) -> ReadResult<Program> {
        loop {
            let tok = self.expect(SyntaxErrorKind::Unterminated)?;
            let instruction = match tok.token {
                Token::Keyword(Keyword::ProgramEnd) => return Ok(self.program),
                Token::Keyword(Keyword::Write) => self.parse_write()?,
                Token::Keyword(Keyword::Call) => Instruction::Call {
                    target: self.parse_target(Keyword::Call)?,
                },
                Token::Keyword(Keyword::CallIf) => self.parse_call_if()?,
                ref other => {
                    return Err(self
                        .error(SyntaxErrorKind::UnknownInstruction(other.to_string()))
                        .at(&tok))
                }
            };
            self.program.instructions.push(instruction);
        }
    }

    fn parse_write(&mut self) -> ReadResult<Instruction> {
        let addr = self.expect(SyntaxErrorKind::MissingAddress)?;
        let Token::CellRef(cell) = addr.token else {
            return Err(self
                .error(SyntaxErrorKind::InvalidAddress(addr.token.to_string()))
                .at(&addr));
        };

        let assign = self.expect(SyntaxErrorKind::MissingAssign)?;
        if assign.token != Token::Assign {
            return Err(self
                .error(SyntaxErrorKind::ExpectedAssign(assign.token.to_string()))
                .at(&assign));
        }

        let tok = self.expect(SyntaxErrorKind::MissingValue)?;
        let value = expression(tok).map_err(|tok| {
            self.error(SyntaxErrorKind::InvalidValue(tok.token.to_string()))
                .at(&tok)
        })?;

        Ok(Instruction::Write {
            row: cell.row,
            col: cell.col,
            value,
        })
    }

    fn parse_call_if(&mut self) -> ReadResult<Instruction> {
        let left = self.parse_operand(SyntaxErrorKind::MissingLeftOperand)?;

        let tok = self.expect(SyntaxErrorKind::MissingComparator)?;
        let Token::Comparator(opr) = tok.token else {
            return Err(self
                .error(SyntaxErrorKind::InvalidComparator(tok.token.to_string()))
                .at(&tok));
        };

        let right = self.parse_operand(SyntaxErrorKind::MissingRightOperand(opr))?;

        let comma = self.expect(SyntaxErrorKind::MissingComma)?;
        if comma.token != Token::Comma {
            return Err(self
                .error(SyntaxErrorKind::ExpectedComma(comma.token.to_string()))
                .at(&comma));
        }

        let target = self.parse_target(Keyword::CallIf)?;
        Ok(Instruction::CallIf {
            left,
            opr,
            right,
            target,
        })
    }

    fn parse_operand(&mut self, missing: SyntaxErrorKind) -> ReadResult<Value> {
        let tok = self.expect(missing)?;
        expression(tok).map_err(|tok| {
            self.error(SyntaxErrorKind::InvalidOperand(tok.token.to_string()))
                .at(&tok)
        })
    }

    fn parse_target(&mut self, after: Keyword) -> ReadResult<String> {
        let tok = self.expect(SyntaxErrorKind::MissingTarget(after))?;
        match tok.token {
            Token::Identifier(target) => Ok(target),
            ref other => Err(self
                .error(SyntaxErrorKind::InvalidTarget(other.to_string()))
                .at(&tok)),
        }
    }
}

/// Convert a token to a value, or hand it back if it isn't one.
///
/// A bare identifier is an opaque string; nothing looks it up.
fn expression(tok: TokenOffset) -> Result<Value, TokenOffset> {
    match tok.token {
        Token::CellRef(cell) => Ok(Value::CellRef(cell)),
        Token::Integer(n) => Ok(Value::Number(n)),
        Token::String(s) | Token::Identifier(s) => Ok(Value::String(s)),
        _ => Err(tok),
    }
}
