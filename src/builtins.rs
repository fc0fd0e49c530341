use std::collections::HashMap;
use log::{debug, trace};
use crate::exec::RuntimeError;
use crate::lexer::Position;
use crate::machine::Machine;
use crate::parser::Operand;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    Variadic,
}

/// A host operation callable by name from a program.
///
/// Handlers receive the operands unresolved and resolve variables themselves through the [`Machine`].
pub trait Builtin {
    fn call(&self, machine: &mut Machine, call: &Position, args: &[Operand]) -> Result<(), RuntimeError>;
}

impl<F> Builtin for F
where
    F: Fn(&mut Machine, &Position, &[Operand]) -> Result<(), RuntimeError>,
{
    fn call(&self, machine: &mut Machine, call: &Position, args: &[Operand]) -> Result<(), RuntimeError> {
        self(machine, call, args)
    }
}

pub struct Entry {
    pub arity: Arity,
    /// Whether every variable operand must exist before the handler runs.
    pub validate: bool,
    handler: Box<dyn Builtin>,
}

#[derive(Default)]
pub struct Registry {
    entries: HashMap<String, Entry>,
}

impl Registry {
    pub fn register(&mut self, name: &str, arity: Arity, validate: bool, handler: impl Builtin + 'static) {
        trace!("registering builtin {name} ({arity:?})");
        self.entries.insert(name.to_string(), Entry { arity, validate, handler: Box::new(handler) });
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    /// Checks arity and, when requested, variable existence, then runs the handler.
    pub fn invoke(&self, machine: &mut Machine, name: &str, args: &[Operand], call: &Position) -> Result<(), RuntimeError> {
        let entry = self.get(name).ok_or_else(|| RuntimeError::UndefinedFunction { name: name.to_string(), position: call.clone() })?;
        if let Arity::Exact(expected) = entry.arity {
            if args.len() != expected {
                return Err(RuntimeError::ArgumentCount { name: name.to_string(), expected, found: args.len(), position: call.clone() });
            }
        }
        if entry.validate {
            for arg in args {
                if let Operand::Variable { name, token } = arg {
                    if !machine.variables.contains_key(name) {
                        return Err(RuntimeError::UndefinedVariable { name: name.clone(), position: token.position.clone() });
                    }
                }
            }
        }
        entry.handler.call(machine, call, args)
    }
}

pub fn register_standard(registry: &mut Registry) {
    registry.register("showc", Arity::Exact(1), true, showc);
    registry.register("shown", Arity::Exact(1), true, shown);
    registry.register("input", Arity::Exact(1), false, input);
    registry.register("memset", Arity::Exact(2), true, memset);
    registry.register("memget", Arity::Exact(2), false, memget);
    registry.register("debug", Arity::Variadic, true, debug_values);
    registry.register("read_file", Arity::Exact(3), false, read_file);
    registry.register("write_file", Arity::Exact(3), false, write_file);
}

fn deny_strings(args: &[Operand]) -> Result<(), RuntimeError> {
    match args.iter().find(|arg| matches!(arg, Operand::Str { .. })) {
        Some(arg) => Err(RuntimeError::UnexpectedString { position: arg.position().clone() }),
        None => Ok(()),
    }
}

fn variable(arg: &Operand) -> Result<&str, RuntimeError> {
    match arg {
        Operand::Variable { name, .. } => Ok(name),
        _ => Err(RuntimeError::ExpectedVariable { position: arg.position().clone() }),
    }
}

fn path(arg: &Operand) -> Result<&str, RuntimeError> {
    match arg {
        Operand::Str { text, .. } => Ok(text),
        _ => Err(RuntimeError::ExpectedString { position: arg.position().clone() }),
    }
}

// showc <value>
fn showc(machine: &mut Machine, call: &Position, args: &[Operand]) -> Result<(), RuntimeError> {
    deny_strings(args)?;
    let value = machine.resolve(&args[0])?;
    machine.write_output(&[value as u8], call)
}

// shown <value>
fn shown(machine: &mut Machine, call: &Position, args: &[Operand]) -> Result<(), RuntimeError> {
    deny_strings(args)?;
    let value = machine.resolve(&args[0])?;
    machine.write_output(value.to_string().as_bytes(), call)
}

// input <var>
fn input(machine: &mut Machine, call: &Position, args: &[Operand]) -> Result<(), RuntimeError> {
    deny_strings(args)?;
    let target = variable(&args[0])?;
    let byte = machine.read_byte(call)?;
    machine.store(target, i64::from(byte));
    Ok(())
}

// memset <addr> <value>
fn memset(machine: &mut Machine, call: &Position, args: &[Operand]) -> Result<(), RuntimeError> {
    deny_strings(args)?;
    let address = machine.address(&args[0], call)?;
    let value = machine.resolve(&args[1])?;
    machine.memory[address] = value;
    Ok(())
}

// memget <addr> <var>
fn memget(machine: &mut Machine, call: &Position, args: &[Operand]) -> Result<(), RuntimeError> {
    deny_strings(args)?;
    let address = machine.address(&args[0], call)?;
    let target = variable(&args[1])?;
    let value = machine.memory[address];
    machine.store(target, value);
    Ok(())
}

// debug <value>...
fn debug_values(machine: &mut Machine, call: &Position, args: &[Operand]) -> Result<(), RuntimeError> {
    let mut report = String::new();
    for arg in args {
        let value = match arg {
            Operand::Str { text, .. } => text.clone(),
            _ => machine.resolve(arg)?.to_string(),
        };
        report.push_str(&format!("Debug: {} ({}): {value}\n", arg.token().text, arg.kind_name()));
    }
    machine.write_output(report.as_bytes(), call)
}

// read_file <path> <addr> <length var>
fn read_file(machine: &mut Machine, call: &Position, args: &[Operand]) -> Result<(), RuntimeError> {
    deny_strings(&args[1..])?;
    let file = path(&args[0])?;
    let length = variable(&args[2])?;
    let address = machine.address(&args[1], call)?;

    let data = machine.read_file(file, call)?;
    let range = machine.range(address, data.len() as i64, call)?;
    debug!("read {} bytes from {file} into {range:?}", data.len());
    for (cell, byte) in machine.memory[range].iter_mut().zip(&data) {
        *cell = i64::from(*byte);
    }
    machine.store(length, data.len() as i64);
    Ok(())
}

// write_file <path> <addr> <length>
fn write_file(machine: &mut Machine, call: &Position, args: &[Operand]) -> Result<(), RuntimeError> {
    deny_strings(&args[1..])?;
    let file = path(&args[0])?;
    let address = machine.address(&args[1], call)?;
    let length = machine.resolve(&args[2])?;

    let range = machine.range(address, length, call)?;
    let data = machine.memory[range].iter().map(|cell| *cell as u8).collect::<Vec<u8>>();
    debug!("writing {} bytes to {file}", data.len());
    machine.write_file(file, &data, call)
}
