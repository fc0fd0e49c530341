use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use log::{debug, trace, warn};
use crate::builtins::{self, Registry};
use crate::lexer::Position;
use crate::machine::{Io, Machine};
use crate::parser::{ArithmeticOp, Operand, Program, Statement, Target};

#[derive(Debug)]
pub enum RuntimeError {
    UndefinedVariable {
        name: String,
        position: Position
    },
    UndefinedLabel {
        label: String,
        position: Position
    },
    UndefinedFunction {
        name: String,
        position: Position
    },
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
        position: Position
    },
    UnexpectedString {
        position: Position
    },
    ExpectedVariable {
        position: Position
    },
    ExpectedString {
        position: Position
    },
    AddressOutOfBounds {
        address: i64,
        size: usize,
        position: Position
    },
    RangeOutOfBounds {
        start: usize,
        length: i64,
        size: usize,
        position: Position
    },
    DivisionByZero {
        position: Position
    },
    InvalidExponent {
        exponent: i64,
        position: Position
    },
    EndOfInput {
        position: Position
    },
    Input {
        source: io::Error,
        position: Position
    },
    Output {
        source: io::Error,
        position: Position
    },
    FileSystem {
        path: String,
        source: io::Error,
        position: Position
    },
}

impl RuntimeError {
    pub fn position(&self) -> &Position {
        match self {
            RuntimeError::UndefinedVariable { position, .. }
            | RuntimeError::UndefinedLabel { position, .. }
            | RuntimeError::UndefinedFunction { position, .. }
            | RuntimeError::ArgumentCount { position, .. }
            | RuntimeError::UnexpectedString { position }
            | RuntimeError::ExpectedVariable { position }
            | RuntimeError::ExpectedString { position }
            | RuntimeError::AddressOutOfBounds { position, .. }
            | RuntimeError::RangeOutOfBounds { position, .. }
            | RuntimeError::DivisionByZero { position }
            | RuntimeError::InvalidExponent { position, .. }
            | RuntimeError::EndOfInput { position }
            | RuntimeError::Input { position, .. }
            | RuntimeError::Output { position, .. }
            | RuntimeError::FileSystem { position, .. } => position,
        }
    }

    pub fn hint(&self) -> Option<String> {
        match self {
            RuntimeError::UndefinedVariable { name, .. } => Some(format!("assign '{name}' before reading it")),
            RuntimeError::AddressOutOfBounds { size, .. } | RuntimeError::RangeOutOfBounds { size, .. } => {
                Some(format!("valid addresses are 0 to {}; use memory=<cells> to resize", size.saturating_sub(1)))
            }
            _ => None,
        }
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeError::UndefinedVariable { name, .. } => write!(f, "variable '{name}' does not exist"),
            RuntimeError::UndefinedLabel { label, .. } => write!(f, "label '{label}' does not exist"),
            RuntimeError::UndefinedFunction { name, .. } => write!(f, "function '{name}' does not exist"),
            RuntimeError::ArgumentCount { name, expected, found, .. } => {
                write!(f, "incorrect number of arguments to '{name}': expected {expected}, found {found}")
            }
            RuntimeError::UnexpectedString { .. } => write!(f, "expected identifier or literal int not literal str"),
            RuntimeError::ExpectedVariable { .. } => write!(f, "expected identifier not literal"),
            RuntimeError::ExpectedString { .. } => write!(f, "expected string literal"),
            RuntimeError::AddressOutOfBounds { address, .. } => write!(f, "invalid memory address ({address})"),
            RuntimeError::RangeOutOfBounds { start, length, .. } => write!(f, "memory out of bounds ({length} cells from {start})"),
            RuntimeError::DivisionByZero { .. } => write!(f, "division by zero"),
            RuntimeError::InvalidExponent { exponent, .. } => write!(f, "invalid exponent ({exponent})"),
            RuntimeError::EndOfInput { .. } => write!(f, "end of input"),
            RuntimeError::Input { source, .. } => write!(f, "failed to read input: {source}"),
            RuntimeError::Output { source, .. } => write!(f, "failed to write output: {source}"),
            RuntimeError::FileSystem { path, source, .. } => write!(f, "{path}: {source}"),
        }
    }
}

impl Error for RuntimeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RuntimeError::Input { source, .. } | RuntimeError::Output { source, .. } | RuntimeError::FileSystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Label name to statement index, fixed before the first statement runs.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct JumpTable(HashMap<String, usize>);

impl JumpTable {
    pub fn build(program: &Program) -> JumpTable {
        let mut jumps = HashMap::new();
        for (index, statement) in program.statements.iter().enumerate() {
            if let Statement::Label { name } = statement {
                if let Some(previous) = jumps.insert(name.clone(), index) {
                    warn!("label '{name}' at statement {index} shadows the one at statement {previous}");
                }
            }
        }
        debug!("jump table: {jumps:?}");
        JumpTable(jumps)
    }

    pub fn resolve(&self, target: &Target) -> Result<usize, RuntimeError> {
        self.0.get(&target.label).copied().ok_or_else(|| RuntimeError::UndefinedLabel {
            label: target.label.clone(),
            position: target.position.clone(),
        })
    }
}

enum Flow {
    Next,
    Jump(usize),
    Halt,
}

pub struct Executor {
    machine: Machine,
    registry: Registry,
}

impl Executor {
    /// Creates an executor with `memory_size` cells and the standard builtins registered.
    pub fn new(memory_size: usize, io: Io) -> Executor {
        let mut registry = Registry::default();
        builtins::register_standard(&mut registry);
        Executor {
            machine: Machine::new(memory_size, io),
            registry,
        }
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn run(&mut self, program: &Program) -> Result<(), RuntimeError> {
        let result = self.execute(program);
        let flushed = self.machine.flush(&end_of(program));
        result.and(flushed)
    }

    fn execute(&mut self, program: &Program) -> Result<(), RuntimeError> {
        let jumps = JumpTable::build(program);
        let mut instruction_pointer = 0usize;

        while let Some(statement) = program.statements.get(instruction_pointer) {
            trace!("[{instruction_pointer}] {statement:?}");
            match self.step(statement, &jumps)? {
                Flow::Next => instruction_pointer += 1,
                Flow::Jump(index) => instruction_pointer = index,
                Flow::Halt => break,
            }
        }
        Ok(())
    }

    fn step(&mut self, statement: &Statement, jumps: &JumpTable) -> Result<Flow, RuntimeError> {
        match statement {
            Statement::VarDeclValue { target, value } => {
                let value = self.machine.resolve(value)?;
                self.machine.store(target, value);
            }
            Statement::VarDeclExpr { target, op, lhs, rhs } => {
                let value = arithmetic(*op, self.machine.resolve(lhs)?, self.machine.resolve(rhs)?, rhs)?;
                self.machine.store(target, value);
            }
            Statement::If { op, lhs, rhs, target } => {
                if op.holds(self.machine.resolve(lhs)?, self.machine.resolve(rhs)?) {
                    return Ok(Flow::Jump(jumps.resolve(target)?));
                }
            }
            Statement::Label { .. } => {}
            Statement::Goto(target) => return Ok(Flow::Jump(jumps.resolve(target)?)),
            Statement::End => return Ok(Flow::Halt),
            Statement::Call { name, args, position } => {
                debug!("call {name} with {} argument(s)", args.len());
                self.registry.invoke(&mut self.machine, name, args, position)?;
            }
        }
        Ok(Flow::Next)
    }
}

fn arithmetic(op: ArithmeticOp, lhs: i64, rhs: i64, rhs_operand: &Operand) -> Result<i64, RuntimeError> {
    let position = || rhs_operand.position().clone();
    match op {
        ArithmeticOp::Add => Ok(lhs.wrapping_add(rhs)),
        ArithmeticOp::Sub => Ok(lhs.wrapping_sub(rhs)),
        ArithmeticOp::Mul => Ok(lhs.wrapping_mul(rhs)),
        ArithmeticOp::Div | ArithmeticOp::Mod if rhs == 0 => Err(RuntimeError::DivisionByZero { position: position() }),
        ArithmeticOp::Div => Ok(lhs.wrapping_div(rhs)),
        ArithmeticOp::Mod => Ok(lhs.wrapping_rem(rhs)),
        ArithmeticOp::Pow => u32::try_from(rhs)
            .map(|exponent| lhs.wrapping_pow(exponent))
            .map_err(|_| RuntimeError::InvalidExponent { exponent: rhs, position: position() }),
    }
}

/// Position used for failures that happen after the last statement, such as the final flush.
fn end_of(program: &Program) -> Position {
    program.statements.iter().rev().find_map(|statement| match statement {
        Statement::Call { position, .. } => Some(position.clone()),
        Statement::Goto(target) | Statement::If { target, .. } => Some(target.position.clone()),
        Statement::VarDeclValue { value, .. } => Some(value.position().clone()),
        Statement::VarDeclExpr { lhs, .. } => Some(lhs.position().clone()),
        Statement::Label { .. } | Statement::End => None,
    }).unwrap_or_else(|| Position { file: "<program>".into(), line: 1, column: 1, offset: 0 })
}
