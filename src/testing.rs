//! Shared fixtures for unit tests: in-memory I/O and a one-call runner.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Cursor, ErrorKind, Write};
use std::rc::Rc;
use crate::exec::{Executor, RuntimeError};
use crate::lexer::{Position, tokenize};
use crate::machine::{FileSystem, Io};
use crate::parser::parse;

#[derive(Debug, Default, Clone)]
pub struct SharedOutput(Rc<RefCell<Vec<u8>>>);

impl SharedOutput {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryFs(pub Rc<RefCell<HashMap<String, Vec<u8>>>>);

impl FileSystem for MemoryFs {
    fn read(&mut self, path: &str) -> io::Result<Vec<u8>> {
        self.0.borrow().get(path).cloned().ok_or_else(|| io::Error::new(ErrorKind::NotFound, format!("{path} not found")))
    }

    fn write(&mut self, path: &str, data: &[u8]) -> io::Result<()> {
        self.0.borrow_mut().insert(path.to_string(), data.to_vec());
        Ok(())
    }
}

pub fn test_io(input: &[u8]) -> (Io, SharedOutput) {
    let (io, output, _) = test_io_with_fs(input, MemoryFs::default());
    (io, output)
}

pub fn test_io_with_fs(input: &[u8], fs: MemoryFs) -> (Io, SharedOutput, MemoryFs) {
    let output = SharedOutput::default();
    let io = Io {
        input: Box::new(Cursor::new(input.to_vec())),
        output: Box::new(output.clone()),
        fs: Box::new(fs.clone()),
    };
    (io, output, fs)
}

pub fn position() -> Position {
    Position { file: Rc::from("test.ez"), line: 1, column: 1, offset: 0 }
}

pub fn executor(memory: usize, input: &[u8]) -> (Executor, SharedOutput) {
    let (io, output) = test_io(input);
    (Executor::new(memory, io), output)
}

/// Lexes, parses and runs `source` with the default memory size.
pub fn run(source: &str) -> (Result<(), RuntimeError>, String) {
    run_with_input(source, b"")
}

pub fn run_with_input(source: &str, input: &[u8]) -> (Result<(), RuntimeError>, String) {
    let program = parse(&tokenize(source, "test.ez").unwrap()).unwrap();
    let (mut executor, output) = executor(65536, input);
    let result = executor.run(&program);
    (result, output.contents())
}
