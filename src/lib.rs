//! micro-lang: a tiny imperative language for teaching control flow and memory.
//!
//! Source text is read into a table of named programs
//! (see [`reader::tokenize`] and [`reader::parse`]), and one of those programs
//! is run over a memory grid that belongs to the caller ([`eval::run`]).
//!
//! ```
//! let programs = micro_lang::read("program P write [1,1] := 5 program-end").unwrap();
//! let mut memory = micro_lang::data::Memory::new();
//! micro_lang::run(&programs, "P", &mut memory).unwrap();
//! assert_eq!(memory.get(1, 1), micro_lang::data::Cell::Number(5));
//! ```

pub mod reader;

pub mod data;

pub mod eval;

pub use eval::{run, RuntimeError};
pub use reader::{parse, read, tokenize, SyntaxError};

#[cfg(feature = "render")]
mod render;
#[cfg(feature = "render")]
pub use render::render_memory;

#[cfg(feature = "web")]
pub mod web;
