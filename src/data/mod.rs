//! micro-lang data types.
//!
//! There are two families here:
//! - What a program is made of: `Value`, `Instruction`, `Program`, and the `ProgramTable`
//!   produced by the reader. These are immutable once read.
//! - What a program acts on: the `Memory` grid and the `Cell`s in it.
//!   Memory belongs to the caller and persists across runs.
//!
//! Memory is sparse: a row exists only once something has been written to it,
//! and a missing cell reads as the number 0.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

mod objects;
pub use objects::*;

pub type Integer = i64;

/// The contents of a memory cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Number(Integer),
    String(String),
}

impl Default for Cell {
    fn default() -> Self {
        Cell::Number(0)
    }
}

impl Cell {
    /// Interpret text typed into a cell by a user.
    ///
    /// Blank is 0, an integer is a number, anything else is kept as a string.
    pub fn from_input(text: &str) -> Cell {
        let text = text.trim();
        if text.is_empty() {
            return Cell::Number(0);
        }
        match text.parse::<Integer>() {
            Ok(n) => Cell::Number(n),
            Err(_) => Cell::String(text.to_owned()),
        }
    }

    pub fn as_number(&self) -> Option<Integer> {
        match self {
            Cell::Number(n) => Some(*n),
            Cell::String(_) => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Cell::Number(_) => "number",
            Cell::String(_) => "string",
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Number(n) => write!(f, "{n}"),
            Cell::String(s) => f.write_str(s),
        }
    }
}

impl From<Integer> for Cell {
    fn from(value: Integer) -> Self {
        Cell::Number(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::String(value.to_owned())
    }
}

/// The memory grid: row -> column -> cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Memory {
    rows: BTreeMap<usize, BTreeMap<usize, Cell>>,
}

impl Memory {
    pub fn new() -> Self {
        Default::default()
    }

    /// Read a cell. Absent cells are 0; reading never allocates.
    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.cell(row, col).cloned().unwrap_or_default()
    }

    /// Read a cell only if it has been set.
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(&row)?.get(&col)
    }

    /// Write a cell, creating its row if needed.
    pub fn set(&mut self, row: usize, col: usize, value: impl Into<Cell>) {
        self.rows.entry(row).or_default().insert(col, value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.rows.values().all(|row| row.is_empty())
    }

    /// Row indices that exist, ascending.
    pub fn rows(&self) -> impl Iterator<Item = usize> + '_ {
        self.rows.keys().copied()
    }

    /// Every column index used by any row, ascending and deduplicated.
    pub fn columns(&self) -> Vec<usize> {
        let mut cols: Vec<usize> = self
            .rows
            .values()
            .flat_map(|row| row.keys().copied())
            .collect();
        cols.sort_unstable();
        cols.dedup();
        cols
    }

    /// All set cells, in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (CellRef, &Cell)> {
        self.rows.iter().flat_map(|(&row, cols)| {
            cols.iter()
                .map(move |(&col, cell)| (CellRef { row, col }, cell))
        })
    }
}

impl<C: Into<Cell>> FromIterator<((usize, usize), C)> for Memory {
    fn from_iter<T: IntoIterator<Item = ((usize, usize), C)>>(iter: T) -> Self {
        let mut memory = Memory::new();
        for ((row, col), cell) in iter {
            memory.set(row, col, cell);
        }
        memory
    }
}

/// Renders the grid as text: a header row of column indices,
/// then one line per row. Unset cells are blank.
impl Display for Memory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let cols = self.columns();
        if cols.is_empty() {
            return writeln!(f, "(memory is empty)");
        }
        let label = |row: usize| format!("[{row}]");
        let mut widths: Vec<usize> = cols.iter().map(|c| c.to_string().len()).collect();
        let mut label_width = 0;
        for row in self.rows() {
            label_width = label_width.max(label(row).len());
            for (i, &col) in cols.iter().enumerate() {
                if let Some(cell) = self.cell(row, col) {
                    widths[i] = widths[i].max(cell.to_string().len());
                }
            }
        }

        write!(f, "{:label_width$}", "")?;
        for (col, width) in cols.iter().zip(widths.iter()) {
            write!(f, " | {col:>width$}")?;
        }
        writeln!(f)?;
        for row in self.rows() {
            write!(f, "{:label_width$}", label(row))?;
            for (&col, width) in cols.iter().zip(widths.iter()) {
                let text = self.cell(row, col).map(|c| c.to_string()).unwrap_or_default();
                write!(f, " | {text:>width$}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_cells_read_zero() {
        let memory = Memory::new();
        assert_eq!(memory.get(9, 9), Cell::Number(0));
        assert!(memory.cell(9, 9).is_none());
        assert!(memory.is_empty());
        assert_eq!(memory.rows().count(), 0);
    }

    #[test]
    fn set_creates_row() {
        let mut memory = Memory::new();
        memory.set(2, 3, 7i64);
        memory.set(2, 1, "x");
        assert_eq!(memory.get(2, 3), Cell::Number(7));
        assert_eq!(memory.get(2, 1), Cell::String("x".to_owned()));
        assert_eq!(memory.get(2, 2), Cell::Number(0));
        assert_eq!(memory.rows().collect::<Vec<_>>(), vec![2]);
        assert_eq!(memory.columns(), vec![1, 3]);
    }

    #[test]
    fn input_conversion() {
        assert_eq!(Cell::from_input(""), Cell::Number(0));
        assert_eq!(Cell::from_input("   "), Cell::Number(0));
        assert_eq!(Cell::from_input(" 42 "), Cell::Number(42));
        assert_eq!(Cell::from_input("-3"), Cell::Number(-3));
        assert_eq!(Cell::from_input("1.5"), Cell::String("1.5".to_owned()));
        assert_eq!(Cell::from_input(" flour "), Cell::String("flour".to_owned()));
    }

    #[test]
    fn iterate_row_major() {
        let memory: Memory = [((3, 1), 1i64), ((1, 2), 2), ((1, 1), 3)]
            .into_iter()
            .collect();
        let cells: Vec<(CellRef, Integer)> = memory
            .iter()
            .map(|(at, cell)| (at, cell.as_number().unwrap()))
            .collect();
        assert_eq!(
            cells,
            vec![
                (CellRef::new(1, 1), 3),
                (CellRef::new(1, 2), 2),
                (CellRef::new(3, 1), 1),
            ]
        );
    }

    #[test]
    fn display_grid() {
        let memory: Memory = [((1, 1), Cell::Number(1)), ((2, 10), Cell::from("egg"))]
            .into_iter()
            .collect();
        let want = "    | 1 |  10\n[1] | 1 |    \n[2] |   | egg\n";
        assert_eq!(memory.to_string(), want);
        assert_eq!(Memory::new().to_string(), "(memory is empty)\n");
    }
}
