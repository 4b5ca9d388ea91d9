use crate::environment::Prelude;
use crate::{evaluator, interpreter, reader};
use ansi_term::Colour;
use linefeed::{DefaultTerminal, Interface, ReadResult, Terminal};
use std::fmt;
use std::path::PathBuf;
use std::rc::Rc;

const PROMPT: &str = "lispy> ";
const CONTINUATION_PROMPT: &str = "  ...> ";

pub enum Error {
    IOError(std::io::Error),
    FormsFailed(usize),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IOError(e) => write!(f, "io error: {}", e),
            Error::FormsFailed(1) => write!(f, "1 form failed"),
            Error::FormsFailed(n) => write!(f, "{} forms failed", n),
        }
    }
}

// main prints this with {:?}, so make that readable too.
impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::IOError(e)
    }
}

pub fn setup() -> std::io::Result<Interface<DefaultTerminal>> {
    let interface = linefeed::Interface::new("lispy")?;
    interface.set_prompt(PROMPT)?;
    if let Some(path) = history_path() {
        interface.load_history(path).ok();
    };
    Ok(interface)
}

fn history_path() -> Option<PathBuf> {
    match dirs::data_dir() {
        Some(mut path) => {
            path.push(".lispy_history");
            Some(path)
        }
        None => None,
    }
}

pub fn save_history<T: Terminal>(interface: &Interface<T>) -> std::io::Result<()> {
    match history_path() {
        Some(path) => interface.save_history(path),
        None => Ok(()),
    }
}

fn paint_error(message: &dyn fmt::Display, stream: atty::Stream) -> String {
    let text = format!("error: {}", message);
    match atty::is(stream) {
        true => Colour::Red.paint(text).to_string(),
        false => text,
    }
}

/// Read lines until they make up complete forms, then evaluate them all in the prelude.
pub fn repl<T: Terminal>(interface: &Interface<T>, prelude: &Rc<Prelude>) -> std::io::Result<()> {
    let env = prelude.as_env();
    let mut pending = String::new();
    loop {
        interface.set_prompt(match pending.is_empty() {
            true => PROMPT,
            false => CONTINUATION_PROMPT,
        })?;
        match interface.read_line()? {
            ReadResult::Eof => break,
            ReadResult::Signal(sig) => {
                writeln!(interface, "Received signal {:?}", sig)?;
                pending.clear();
            }
            ReadResult::Input(line) => {
                pending.push_str(&line);
                pending.push('\n');
                match interpreter::rep(&pending, &env) {
                    Err(e) if e.is_incomplete_input() => continue,
                    Ok(output) if output.is_empty() => (),
                    Ok(output) => writeln!(interface, "{}", output)?,
                    Err(e) => writeln!(interface, "{}", paint_error(&e, atty::Stream::Stdout))?,
                }
                interface.add_history_unique(pending.trim_end().to_string());
                pending.clear();
            }
        }
    }
    Ok(())
}

/// Evaluate each top-level form of the file in turn. A form that fails to evaluate is reported
/// and skipped; a syntax error ends the file, since nothing after it can be trusted.
/// Returns how many forms failed.
pub fn run_file(path: &str, prelude: &Rc<Prelude>) -> std::io::Result<usize> {
    log::info!("loading {}", path);
    let source = std::fs::read_to_string(path)?;
    let env = prelude.as_env();
    let mut offset = 0;
    let mut failures = 0;
    loop {
        match reader::read(&source, offset) {
            Ok((Some(expr), consumed)) => {
                offset += consumed;
                if let Err(e) = evaluator::evaluate(&expr, &env) {
                    eprintln!("{}: {}", path, paint_error(&e, atty::Stream::Stderr));
                    failures += 1;
                }
            }
            Ok((None, _)) => break,
            Err(e) => {
                let e = interpreter::Error::Read(e);
                eprintln!("{}: {}", path, paint_error(&e, atty::Stream::Stderr));
                failures += 1;
                break;
            }
        }
    }
    Ok(failures)
}

/// With no arguments, start a REPL. Otherwise load every file named on the command line, in
/// order, into the same prelude.
pub fn launch(args: Vec<String>, prelude: &Rc<Prelude>) -> Result<(), Error> {
    let files = args.get(1..).unwrap_or(&[]);
    if files.is_empty() {
        let interface = setup()?;
        repl(&interface, prelude)?;
        save_history(&interface)?;
        return Ok(());
    }
    let mut failures = 0;
    for path in files {
        failures += run_file(path, prelude)?;
    }
    match failures {
        0 => Ok(()),
        n => Err(Error::FormsFailed(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbol;
    use crate::environment::Environment;
    use crate::types::Value;
    use std::io::Write;

    fn write_source(name: &str, source: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("lispy-{}-{}.lisp", name, std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(source.as_bytes()).unwrap();
        path
    }

    #[test]
    fn run_file_continues_after_evaluation_errors() {
        let path = write_source(
            "continue",
            "(define 'a 1)\n(undefined-thing)\n(define 'b (+ a 1))\n",
        );
        let prelude = Prelude::new();
        let failures = run_file(path.to_str().unwrap(), &prelude).unwrap();
        assert_eq!(failures, 1);
        assert_eq!(prelude.lookup(&Symbol::new("b")).unwrap(), Value::Number(2.0));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn run_file_stops_at_syntax_errors() {
        let path = write_source("syntax", "(define 'a 1)\n(oops}\n(define 'b 2)\n");
        let prelude = Prelude::new();
        let failures = run_file(path.to_str().unwrap(), &prelude).unwrap();
        assert_eq!(failures, 1);
        assert!(prelude.lookup(&Symbol::new("a")).is_ok());
        assert!(prelude.lookup(&Symbol::new("b")).is_err());
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn launch_reports_failed_forms() {
        let path = write_source("launch", "(car '())\n");
        let prelude = Prelude::new();
        let args = vec!["lispy".to_string(), path.to_str().unwrap().to_string()];
        assert!(matches!(
            launch(args, &prelude),
            Err(Error::FormsFailed(1))
        ));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let prelude = Prelude::new();
        let args = vec!["lispy".to_string(), "/no/such/file.lisp".to_string()];
        assert!(matches!(launch(args, &prelude), Err(Error::IOError(_))));
    }
}
