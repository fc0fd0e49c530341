use std::error::Error;
use std::path::PathBuf;
use clap::{ArgAction, Parser};
use ez::config::Config;
use ez::interpret;
use ez::machine::Io;
use log::{error, LevelFilter};
use simple_logger::SimpleLogger;

/// Runs programs written in the ez line-oriented scripting language.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Source file to run.
    file: PathBuf,

    /// Run options as key=value pairs. Recognized: memory=<cells>.
    options: Vec<String>,

    /// Log more (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    SimpleLogger::new().with_level(level(args.verbose)).init()?;

    let config = Config::from_options(&args.options)?;
    let file = args.file.display().to_string();
    let source = std::fs::read_to_string(&args.file).map_err(|e| format!("failed to read {file}: {e}"))?;

    if let Err(diagnostic) = interpret(&source, &file, &config, Io::host()) {
        error!("{file} failed during {}", diagnostic.phase);
        eprintln!("{}", diagnostic.render(&source));
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use log::LevelFilter;
    use crate::{Args, level};

    #[test]
    fn command_line() {
        let args = Args::try_parse_from(["ez", "prog.ez", "memory=128", "-vv"]).unwrap();
        assert_eq!(args.file.to_str(), Some("prog.ez"));
        assert_eq!(args.options, vec!["memory=128".to_string()]);
        assert_eq!(level(args.verbose), LevelFilter::Debug);
        assert!(Args::try_parse_from(["ez"]).is_err());
    }
}
