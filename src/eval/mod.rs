//! micro-lang interpreter.
//!
//! The interpreter is a small stack machine. Its state is:
//!
//! -   The _current program_ and a _program counter_ into its instructions.
//! -   The _call stack_: a stack of frames, each of which records where to resume
//!     (program and counter) when the current program runs off its end.
//!     There is no return instruction; reaching the end of a body is the return.
//! -   The _memory_, which belongs to the caller and is only borrowed for the run.
//!
//! The call stack is an ordinary `Vec` with a fixed ceiling, so unbounded recursion
//! in a micro-lang program is a reported error rather than a crash of the host.

use std::fmt::{Display, Formatter};

use crate::data::{Cell, Comparator, Instruction, Memory, Program, ProgramTable, Value};

/// The deepest the call stack may grow.
pub const MAX_CALL_DEPTH: usize = 1000;

/// Limits applied to a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// Maximum number of frames on the call stack.
    pub max_depth: usize,
    /// Maximum number of instructions to execute; None for no limit.
    pub max_steps: Option<u64>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            max_depth: MAX_CALL_DEPTH,
            max_steps: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The requested start program is not defined.
    UndefinedStart(String),
    /// A `call` or `call-if` named a program that is not defined.
    UndefinedTarget { caller: String, target: String },
    /// A call would push the call stack past its limit.
    DepthExceeded { caller: String, limit: usize },
    /// A `call-if` compared something that isn't a number.
    NotANumber {
        program: String,
        left: Cell,
        opr: Comparator,
        right: Cell,
    },
    /// The run used up its instruction budget.
    StepLimitExceeded { program: String, limit: u64 },
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::UndefinedStart(name) => {
                write!(f, "start program '{name}' does not exist")
            }
            RuntimeError::UndefinedTarget { caller, target } => {
                write!(f, "error in '{caller}': program '{target}' does not exist")
            }
            RuntimeError::DepthExceeded { caller, limit } => write!(
                f,
                "error in '{caller}': maximum call depth ({limit}) exceeded; endless recursion?"
            ),
            RuntimeError::NotANumber {
                program,
                left,
                opr,
                right,
            } => write!(
                f,
                "error in '{program}': comparisons need numbers; found {} ({}) {opr} {} ({})",
                describe(left),
                left.type_name(),
                describe(right),
                right.type_name()
            ),
            RuntimeError::StepLimitExceeded { program, limit } => write!(
                f,
                "error in '{program}': stopped after {limit} instructions"
            ),
        }
    }
}

fn describe(cell: &Cell) -> String {
    match cell {
        Cell::Number(n) => n.to_string(),
        Cell::String(s) => format!("{s:?}"),
    }
}

impl std::error::Error for RuntimeError {}

/// Where to resume when the called program finishes.
#[derive(Debug, Clone, Copy)]
struct CallFrame<'p> {
    program: &'p Program,
    pc: usize,
}

/// Outcome of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// There is more to do.
    Running,
    /// The start program ran off its end; the run is complete.
    Done,
}

/// An in-progress run of a program over some memory.
pub struct Machine<'p, 'm> {
    programs: &'p ProgramTable,
    memory: &'m mut Memory,
    config: EvalConfig,

    current: &'p Program,
    pc: usize,
    call_stack: Vec<CallFrame<'p>>,
    steps: u64,
}

impl<'p, 'm> Machine<'p, 'm> {
    /// Prepare to run `start` with the default limits.
    pub fn new(
        programs: &'p ProgramTable,
        start: &str,
        memory: &'m mut Memory,
    ) -> Result<Self, RuntimeError> {
        Self::with_config(programs, start, memory, EvalConfig::default())
    }

    pub fn with_config(
        programs: &'p ProgramTable,
        start: &str,
        memory: &'m mut Memory,
        config: EvalConfig,
    ) -> Result<Self, RuntimeError> {
        let current = programs
            .get(start)
            .ok_or_else(|| RuntimeError::UndefinedStart(start.to_owned()))?;
        Ok(Machine {
            programs,
            memory,
            config,
            current,
            pc: 0,
            call_stack: Vec::new(),
            steps: 0,
        })
    }

    /// Name of the program being executed.
    pub fn current_program(&self) -> &str {
        &self.current.name
    }

    /// Index of the next instruction in the current program.
    pub fn program_counter(&self) -> usize {
        self.pc
    }

    /// Number of frames on the call stack.
    pub fn depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Instructions executed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn memory(&self) -> &Memory {
        &*self.memory
    }

    /// Execute one instruction, or return from a finished program.
    pub fn step(&mut self) -> Result<Step, RuntimeError> {
        let current = self.current;
        let Some(instruction) = current.instructions.get(self.pc) else {
            let Some(frame) = self.call_stack.pop() else {
                return Ok(Step::Done);
            };
            tracing::debug!(
                from = %self.current.name,
                to = %frame.program.name,
                depth = self.call_stack.len(),
                "return"
            );
            self.current = frame.program;
            self.pc = frame.pc;
            return Ok(Step::Running);
        };

        if let Some(limit) = self.config.max_steps {
            if self.steps >= limit {
                return Err(RuntimeError::StepLimitExceeded {
                    program: self.current.name.clone(),
                    limit,
                });
            }
        }
        self.steps += 1;
        tracing::trace!(program = %self.current.name, pc = self.pc, %instruction, "step");

        match instruction {
            Instruction::Write { row, col, value } => {
                let cell = self.eval_value(value);
                self.memory.set(*row, *col, cell);
                self.pc += 1;
            }
            Instruction::Call { target } => self.call(target)?,
            Instruction::CallIf {
                left,
                opr,
                right,
                target,
            } => {
                let l = self.eval_value(left);
                let r = self.eval_value(right);
                let (Some(ln), Some(rn)) = (l.as_number(), r.as_number()) else {
                    return Err(RuntimeError::NotANumber {
                        program: self.current.name.clone(),
                        left: l,
                        opr: *opr,
                        right: r,
                    });
                };
                if opr.apply(ln, rn) {
                    self.call(target)?;
                } else {
                    self.pc += 1;
                }
            }
        }
        Ok(Step::Running)
    }

    /// Step until the start program finishes or an error occurs.
    ///
    /// Writes made before an error stay in memory.
    pub fn run(mut self) -> Result<&'m mut Memory, RuntimeError> {
        loop {
            match self.step() {
                Ok(Step::Running) => (),
                Ok(Step::Done) => {
                    tracing::debug!(steps = self.steps, "run complete");
                    return Ok(self.memory);
                }
                Err(e) => {
                    tracing::debug!(steps = self.steps, error = %e, "run failed");
                    return Err(e);
                }
            }
        }
    }

    /// Push a frame for the next instruction and jump to the start of `target`.
    fn call(&mut self, target: &str) -> Result<(), RuntimeError> {
        let Some(callee) = self.programs.get(target) else {
            return Err(RuntimeError::UndefinedTarget {
                caller: self.current.name.clone(),
                target: target.to_owned(),
            });
        };
        if self.call_stack.len() >= self.config.max_depth {
            return Err(RuntimeError::DepthExceeded {
                caller: self.current.name.clone(),
                limit: self.config.max_depth,
            });
        }
        self.call_stack.push(CallFrame {
            program: self.current,
            pc: self.pc + 1,
        });
        tracing::debug!(
            from = %self.current.name,
            to = %callee.name,
            depth = self.call_stack.len(),
            "call"
        );
        self.current = callee;
        self.pc = 0;
        Ok(())
    }

    /// Resolve an operand to a cell value. Reading memory never fails.
    fn eval_value(&self, value: &Value) -> Cell {
        match value {
            Value::Number(n) => Cell::Number(*n),
            Value::String(s) => Cell::String(s.clone()),
            Value::CellRef(c) => self.memory.get(c.row, c.col),
        }
    }
}

/// Run the `start` program over `memory`.
///
/// Memory is modified in place; on error, writes made before the error remain.
pub fn run<'m>(
    programs: &ProgramTable,
    start: &str,
    memory: &'m mut Memory,
) -> Result<&'m mut Memory, RuntimeError> {
    run_with_config(programs, start, memory, EvalConfig::default())
}

pub fn run_with_config<'m>(
    programs: &ProgramTable,
    start: &str,
    memory: &'m mut Memory,
    config: EvalConfig,
) -> Result<&'m mut Memory, RuntimeError> {
    Machine::with_config(programs, start, memory, config)?.run()
}
