use std::collections::HashMap;
use std::io::{self, BufWriter, ErrorKind, Read, stdin, stdout, Write};
use log::trace;
use crate::exec::RuntimeError;
use crate::lexer::Position;
use crate::parser::Operand;

/// Filesystem access handed to `read_file` and `write_file`.
pub trait FileSystem {
    fn read(&mut self, path: &str) -> io::Result<Vec<u8>>;
    fn write(&mut self, path: &str, data: &[u8]) -> io::Result<()>;
}

/// The real filesystem of the host process.
#[derive(Debug, Default, Copy, Clone)]
pub struct HostFs;

impl FileSystem for HostFs {
    fn read(&mut self, path: &str) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&mut self, path: &str, data: &[u8]) -> io::Result<()> {
        std::fs::write(path, data)
    }
}

/// The byte source, byte sink and filesystem a run talks to.
pub struct Io {
    pub input: Box<dyn Read>,
    pub output: Box<dyn Write>,
    pub fs: Box<dyn FileSystem>,
}

impl Io {
    pub fn host() -> Io {
        Io {
            input: Box::new(stdin()),
            output: Box::new(BufWriter::new(stdout())),
            fs: Box::new(HostFs),
        }
    }
}

/// Mutable state of one run: variables, memory and the I/O capabilities.
pub struct Machine {
    pub variables: HashMap<String, i64>,
    pub memory: Vec<i64>,
    io: Io,
}

impl Machine {
    pub fn new(memory_size: usize, io: Io) -> Machine {
        let mut variables = HashMap::new();
        variables.insert("__memsize".to_string(), i64::try_from(memory_size).unwrap_or(i64::MAX));
        Machine {
            variables,
            memory: vec![0i64; memory_size],
            io,
        }
    }

    /// Numeric value of an operand. Strings are never numeric.
    pub fn resolve(&self, operand: &Operand) -> Result<i64, RuntimeError> {
        match operand {
            Operand::Integer { value, .. } => Ok(*value),
            Operand::Variable { name, token } => self.variables.get(name).copied().ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.clone(),
                position: token.position.clone(),
            }),
            Operand::Str { token, .. } => Err(RuntimeError::UnexpectedString { position: token.position.clone() }),
        }
    }

    /// Resolves an operand and checks that it names a memory cell.
    pub fn address(&self, operand: &Operand, call: &Position) -> Result<usize, RuntimeError> {
        let address = self.resolve(operand)?;
        usize::try_from(address)
            .ok()
            .filter(|address| *address < self.memory.len())
            .ok_or_else(|| RuntimeError::AddressOutOfBounds { address, size: self.memory.len(), position: call.clone() })
    }

    /// Checks that `length` cells starting at `start` fit in memory.
    pub fn range(&self, start: usize, length: i64, call: &Position) -> Result<std::ops::Range<usize>, RuntimeError> {
        let end = usize::try_from(length).ok().and_then(|length| start.checked_add(length));
        match end {
            Some(end) if end <= self.memory.len() => Ok(start..end),
            _ => Err(RuntimeError::RangeOutOfBounds { start, length, size: self.memory.len(), position: call.clone() }),
        }
    }

    pub fn store(&mut self, name: &str, value: i64) {
        trace!("{name} = {value}");
        self.variables.insert(name.to_string(), value);
    }

    pub fn write_output(&mut self, bytes: &[u8], call: &Position) -> Result<(), RuntimeError> {
        self.io.output.write_all(bytes).map_err(|source| RuntimeError::Output { source, position: call.clone() })
    }

    pub fn flush(&mut self, call: &Position) -> Result<(), RuntimeError> {
        self.io.output.flush().map_err(|source| RuntimeError::Output { source, position: call.clone() })
    }

    /// Blocks for exactly one byte of input. Pending output is flushed first so prompts are visible.
    pub fn read_byte(&mut self, call: &Position) -> Result<u8, RuntimeError> {
        self.flush(call)?;
        let mut byte = [0u8; 1];
        loop {
            match self.io.input.read(&mut byte) {
                Ok(0) => return Err(RuntimeError::EndOfInput { position: call.clone() }),
                Ok(_) => return Ok(byte[0]),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(source) => return Err(RuntimeError::Input { source, position: call.clone() }),
            }
        }
    }

    pub fn read_file(&mut self, path: &str, call: &Position) -> Result<Vec<u8>, RuntimeError> {
        self.io.fs.read(path).map_err(|source| RuntimeError::FileSystem { path: path.to_string(), source, position: call.clone() })
    }

    pub fn write_file(&mut self, path: &str, data: &[u8], call: &Position) -> Result<(), RuntimeError> {
        self.io.fs.write(path, data).map_err(|source| RuntimeError::FileSystem { path: path.to_string(), source, position: call.clone() })
    }
}

#[cfg(test)]
mod tests {
    use crate::exec::RuntimeError;
    use crate::lexer::tokenize;
    use crate::machine::Machine;
    use crate::parser::{parse, Operand, Statement};
    use crate::testing::{test_io, position};

    fn operands(source: &str) -> Vec<Operand> {
        match parse(&tokenize(source, "test.ez").unwrap()).unwrap().statements.remove(0) {
            Statement::Call { args, .. } => args,
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn resolve_operands() {
        let (io, _) = test_io(b"");
        let mut machine = Machine::new(16, io);
        machine.store("a", -7);
        let args = operands("f 12 a b \"s\"\n");
        assert_eq!(machine.resolve(&args[0]).unwrap(), 12);
        assert_eq!(machine.resolve(&args[1]).unwrap(), -7);
        assert!(matches!(machine.resolve(&args[2]), Err(RuntimeError::UndefinedVariable { ref name, .. }) if name == "b"));
        assert!(matches!(machine.resolve(&args[3]), Err(RuntimeError::UnexpectedString { .. })));
    }

    #[test]
    fn memsize_is_preset() {
        let (io, _) = test_io(b"");
        let machine = Machine::new(128, io);
        assert_eq!(machine.variables.get("__memsize"), Some(&128));
        assert_eq!(machine.memory.len(), 128);
    }

    #[test]
    fn address_and_range_bounds() {
        let (io, _) = test_io(b"");
        let mut machine = Machine::new(8, io);
        machine.store("neg", -1);
        let args = operands("f 7 8 neg\n");
        let at = position();
        assert_eq!(machine.address(&args[0], &at).unwrap(), 7);
        assert!(matches!(machine.address(&args[1], &at), Err(RuntimeError::AddressOutOfBounds { address: 8, size: 8, .. })));
        assert!(matches!(machine.address(&args[2], &at), Err(RuntimeError::AddressOutOfBounds { address: -1, .. })));
        assert_eq!(machine.range(3, 5, &at).unwrap(), 3..8);
        assert!(machine.range(3, 6, &at).is_err());
        assert!(machine.range(0, -1, &at).is_err());
    }

    #[test]
    fn read_byte_until_end_of_input() {
        let (io, _) = test_io(b"A");
        let mut machine = Machine::new(1, io);
        assert_eq!(machine.read_byte(&position()).unwrap(), b'A');
        assert!(matches!(machine.read_byte(&position()), Err(RuntimeError::EndOfInput { .. })));
    }
}
