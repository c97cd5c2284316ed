use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use super::Integer;

/// An address into the memory grid.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(row: usize, col: usize) -> Self {
        CellRef { row, col }
    }
}

impl Display for CellRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{}]", self.row, self.col)
    }
}

/// An operand, as written in the source.
///
/// Literals are fixed when the program is read;
/// cell references are resolved against memory when the instruction runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Number(Integer),
    String(String),
    CellRef(CellRef),
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "\"{s}\""),
            Value::CellRef(c) => c.fmt(f),
        }
    }
}

impl From<Integer> for Value {
    fn from(value: Integer) -> Self {
        Value::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<CellRef> for Value {
    fn from(value: CellRef) -> Self {
        Value::CellRef(value)
    }
}

/// Comparison operator of a `call-if`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparator {
    pub fn apply(self, left: Integer, right: Integer) -> bool {
        match self {
            Comparator::Eq => left == right,
            Comparator::Lt => left < right,
            Comparator::Le => left <= right,
            Comparator::Gt => left > right,
            Comparator::Ge => left >= right,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Comparator::Eq => "=",
            Comparator::Lt => "<",
            Comparator::Le => "<=",
            Comparator::Gt => ">",
            Comparator::Ge => ">=",
        }
    }
}

impl Display for Comparator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Comparator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "=" => Comparator::Eq,
            "<" => Comparator::Lt,
            "<=" => Comparator::Le,
            ">" => Comparator::Gt,
            ">=" => Comparator::Ge,
            _ => return Err(format!("invalid comparator {s:?}")),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Store a value at a fixed cell.
    Write { row: usize, col: usize, value: Value },
    /// Run another program, then continue with the next instruction.
    Call { target: String },
    /// Like `Call`, but only if the numeric comparison holds.
    CallIf {
        left: Value,
        opr: Comparator,
        right: Value,
        target: String,
    },
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Instruction::Write { row, col, value } => write!(f, "write [{row},{col}] := {value}"),
            Instruction::Call { target } => write!(f, "call {target}"),
            Instruction::CallIf {
                left,
                opr,
                right,
                target,
            } => write!(f, "call-if {left} {opr} {right}, {target}"),
        }
    }
}

/// A named list of instructions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub name: String,
    pub instructions: Vec<Instruction>,
}

impl Program {
    pub fn new(name: impl Into<String>) -> Self {
        Program {
            name: name.into(),
            instructions: Vec::new(),
        }
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "program {}", self.name)?;
        for instruction in self.instructions.iter() {
            writeln!(f, "    {instruction}")?;
        }
        write!(f, "program-end")
    }
}

/// All programs from one source text, by name.
///
/// Programs keep the order in which they were defined.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramTable {
    programs: Vec<Program>,
    by_name: HashMap<String, usize>,
}

impl ProgramTable {
    /// Add a program to the table.
    /// If the name is already taken, the table is unchanged and the program is handed back.
    pub fn insert(&mut self, program: Program) -> Result<(), Program> {
        if self.by_name.contains_key(&program.name) {
            return Err(program);
        }
        self.by_name.insert(program.name.clone(), self.programs.len());
        self.programs.push(program);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Program> {
        self.by_name.get(name).map(|&idx| &self.programs[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    /// Programs in definition order.
    pub fn iter(&self) -> impl Iterator<Item = &Program> {
        self.programs.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.programs.iter().map(|p| p.name.as_str())
    }
}

impl Display for ProgramTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (i, program) in self.programs.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{program}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comparators() {
        assert!(Comparator::Eq.apply(3, 3));
        assert!(!Comparator::Eq.apply(3, 4));
        assert!(Comparator::Lt.apply(-1, 0));
        assert!(Comparator::Le.apply(0, 0));
        assert!(!Comparator::Gt.apply(0, 0));
        assert!(Comparator::Ge.apply(5, 0));
    }

    #[test]
    fn comparator_strings() {
        for s in ["=", "<", "<=", ">", ">="] {
            let c: Comparator = s.parse().unwrap();
            assert_eq!(c.as_str(), s);
        }
        "=>".parse::<Comparator>().expect_err("=> is not a comparator");
    }

    #[test]
    fn table_rejects_duplicates() {
        let mut table = ProgramTable::default();
        table.insert(Program::new("a")).unwrap();
        table.insert(Program::new("b")).unwrap();
        let mut again = Program::new("a");
        again.instructions.push(Instruction::Call {
            target: "b".to_owned(),
        });
        let rejected = table.insert(again).expect_err("duplicate accepted");
        assert_eq!(rejected.name, "a");
        assert_eq!(table.len(), 2);
        assert!(table.get("a").unwrap().instructions.is_empty());
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn display_program() {
        let program = Program {
            name: "P".to_owned(),
            instructions: vec![
                Instruction::Write {
                    row: 1,
                    col: 2,
                    value: Value::String("hi".to_owned()),
                },
                Instruction::CallIf {
                    left: CellRef::new(1, 1).into(),
                    opr: Comparator::Ge,
                    right: 3.into(),
                    target: "Q".to_owned(),
                },
            ],
        };
        assert_eq!(
            program.to_string(),
            "program P\n    write [1,2] := \"hi\"\n    call-if [1,1] >= 3, Q\nprogram-end"
        );
    }

    #[test]
    fn string_values_print_as_source() {
        let value = Value::from("two\nlines \\ back");
        assert_eq!(value.to_string(), "\"two\nlines \\ back\"");

        let source = format!("program P write [1,1] := {value} program-end");
        let programs = crate::reader::read(&source).unwrap();
        assert_eq!(
            programs.get("P").unwrap().instructions,
            vec![Instruction::Write {
                row: 1,
                col: 1,
                value,
            }]
        );
    }
}
