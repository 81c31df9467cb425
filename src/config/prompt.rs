use std::io::{self, BufRead, Write};

/// Where the detector reports problems and asks for replacements.
pub trait Prompt {
    fn notify(&mut self, message: &str);

    /// Ask a question; an empty answer means "abort".
    fn ask(&mut self, question: &str) -> io::Result<String>;
}

/// Talks to the user on stderr/stdin.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn notify(&mut self, message: &str) {
        eprintln!("{}", message);
    }

    fn ask(&mut self, question: &str) -> io::Result<String> {
        eprint!("{}", question);
        io::stderr().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer.trim().to_string())
    }
}
