/// One parsed debugger command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Up(usize),
    Down(usize),
    Where,
    Args,
    Break(String),
    Clear(String),
    Next,
    Step,
    Return,
    Continue,
    Quit,
    /// Hand the session to the editor.
    Vim,
    /// Hand the session back to the terminal.
    Pdb,
    /// Anything else: evaluated against the current frame.
    Eval(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let count = || rest.parse::<usize>().unwrap_or(1).max(1);
        match word {
            "u" | "up" => Self::Up(count()),
            "d" | "down" => Self::Down(count()),
            "w" | "where" | "bt" => Self::Where,
            "a" | "args" => Self::Args,
            "b" | "break" => Self::Break(rest.to_string()),
            "cl" | "clear" => Self::Clear(rest.to_string()),
            "n" | "next" => Self::Next,
            "s" | "step" => Self::Step,
            "r" | "return" => Self::Return,
            "c" | "cont" | "continue" => Self::Continue,
            "q" | "quit" | "exit" => Self::Quit,
            "v" | "vim" if rest.is_empty() => Self::Vim,
            "pdb" if rest.is_empty() => Self::Pdb,
            _ => Self::Eval(line.to_string()),
        }
    }

    /// Commands that change the displayed frame.
    pub fn is_moved(&self) -> bool {
        matches!(self, Self::Up(_) | Self::Down(_))
    }

    /// Commands whose printed output is forwarded to the editor.
    pub fn is_captured(&self) -> bool {
        matches!(self, Self::Args | Self::Break(_) | Self::Eval(_))
    }
}

/// Split `first;;rest` into the command to run now and the queued remainder.
pub fn split_queued(line: &str) -> (&str, Option<&str>) {
    match line.split_once(";;") {
        Some((first, rest)) => (first.trim_end(), Some(rest.trim_start())),
        None => (line, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases() {
        assert_eq!(Command::parse("u"), Command::Up(1));
        assert_eq!(Command::parse("down 2"), Command::Down(2));
        assert_eq!(Command::parse("b 12"), Command::Break("12".into()));
        assert_eq!(Command::parse("cont"), Command::Continue);
        assert_eq!(Command::parse("v"), Command::Vim);
        assert_eq!(Command::parse("pdb"), Command::Pdb);
    }

    #[test]
    fn unknown_words_are_expressions() {
        assert_eq!(Command::parse("x + 1"), Command::Eval("x + 1".into()));
        assert_eq!(Command::parse("vim = 3"), Command::Eval("vim = 3".into()));
    }

    #[test]
    fn classification() {
        assert!(Command::parse("up").is_moved());
        assert!(!Command::parse("next").is_moved());
        assert!(Command::parse("args").is_captured());
        assert!(Command::parse("break").is_captured());
        assert!(Command::parse("foo").is_captured());
        assert!(!Command::parse("where").is_captured());
    }

    #[test]
    fn queued_commands() {
        assert_eq!(split_queued("up;; args"), ("up", Some("args")));
        assert_eq!(split_queued("next"), ("next", None));
    }
}
