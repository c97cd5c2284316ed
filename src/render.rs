//! Render memory as an editable HTML grid.

use maud::PreEscaped;

use crate::data::Memory;

const CELL_PREFIX: &str = "cell-";

/// The form field name of the input for a cell.
pub fn cell_field_name(row: usize, col: usize) -> String {
    format!("{CELL_PREFIX}{row}-{col}")
}

/// The cell a form field refers to, if it refers to one.
#[cfg(feature = "web")]
pub fn parse_cell_field(name: &str) -> Option<(usize, usize)> {
    let (row, col) = name.strip_prefix(CELL_PREFIX)?.split_once('-')?;
    Some((row.parse().ok()?, col.parse().ok()?))
}

/// Render the memory grid as a table of text inputs.
///
/// Rows and columns are those present in memory; a cell that is
/// unset in its row renders as a blank input.
pub fn render_memory(memory: &Memory) -> PreEscaped<String> {
    let cols = memory.columns();
    if cols.is_empty() {
        return maud::html!(div class="memory-empty" { "memory is empty" });
    }

    maud::html!(
        table class="memory-table" {
            thead {
                tr {
                    th {}
                    @for col in cols.iter() {
                        th { "column " (col) }
                    }
                }
            }
            tbody {
                @for row in memory.rows() {
                    tr {
                        th { "row " (row) }
                        @for &col in cols.iter() {
                            td {
                                input type="text" class="memory-cell"
                                    name=(cell_field_name(row, col))
                                    value=(memory.cell(row, col).map(|c| c.to_string()).unwrap_or_default());
                            }
                        }
                    }
                }
            }
        }
    )
}
