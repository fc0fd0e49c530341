//! # ez
//!
//! Interpreter for ez, a line-oriented scripting language with integer
//! variables, a fixed-size memory array, label/goto control flow and
//! host-provided builtins.
//!
//! Source goes through [`lexer::tokenize`], then [`parser::parse`], and the
//! resulting [`parser::Program`] runs on an [`exec::Executor`].

use log::info;
use crate::config::Config;
use crate::diagnostic::Diagnostic;
use crate::exec::Executor;
use crate::lexer::tokenize;
use crate::machine::Io;
use crate::parser::parse;

pub mod builtins;
pub mod config;
pub mod diagnostic;
pub mod exec;
pub mod lexer;
pub mod machine;
pub mod parser;
#[cfg(test)]
mod testing;

/// Lexes, parses and runs `source`, stopping at the first error of any phase.
pub fn interpret(source: &str, file: &str, config: &Config, io: Io) -> Result<(), Diagnostic> {
    let tokens = tokenize(source, file)?;
    let program = parse(&tokens)?;
    info!("{file}: {} statements", program.statements.len());
    let mut executor = Executor::new(config.memory, io);
    executor.run(&program)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::diagnostic::Phase;
    use crate::interpret;
    use crate::testing::test_io;

    fn interpret_source(source: &str, config: &Config) -> (Result<(), Phase>, String) {
        let (io, output) = test_io(b"");
        let result = interpret(source, "main.ez", config, io).map_err(|diagnostic| diagnostic.phase);
        (result, output.contents())
    }

    #[test]
    fn hello() {
        let source = "showc 72\nshowc 105\nshowc 10\n";
        assert_eq!(interpret_source(source, &Config::default()), (Ok(()), "Hi\n".to_string()));
    }

    #[test]
    fn phases() {
        assert_eq!(interpret_source("x = #\n", &Config::default()).0, Err(Phase::Lexing));
        assert_eq!(interpret_source("x = = 1\n", &Config::default()).0, Err(Phase::Parsing));
        assert_eq!(interpret_source("shown x\n", &Config::default()).0, Err(Phase::Runtime));
    }

    #[test]
    fn memory_size_from_config() {
        let config = Config::from_options(&["memory=4"]).unwrap();
        let (result, output) = interpret_source("shown __memsize\nmemset 3 1\n", &config);
        assert_eq!((result, output.as_str()), (Ok(()), "4"));
        assert_eq!(interpret_source("memset 4 1\n", &config).0, Err(Phase::Runtime));
    }

    #[test]
    fn fibonacci() {
        let source = concat!(
            "a = 0\n",
            "b = 1\n",
            "i = 0\n",
            ":next\n",
            "shown a\n",
            "showc 32\n",
            "t = a + b\n",
            "a = b\n",
            "b = t\n",
            "i = i + 1\n",
            "if i < 10 goto next\n",
        );
        let (result, output) = interpret_source(source, &Config::default());
        assert_eq!(result, Ok(()));
        assert_eq!(output, "0 1 1 2 3 5 8 13 21 34 ");
    }
}
