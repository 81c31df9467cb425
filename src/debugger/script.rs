use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{Disposition, Frame, Session, TraceEvent};
use crate::error::Result;

/// Walks a source file line by line, reporting each non-blank line to the
/// session as if a program were executing it inside one `<module>` frame.
pub struct ScriptTrace {
    path: PathBuf,
    lines: Vec<String>,
}

impl ScriptTrace {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let contents = fs::read_to_string(&path)?;
        Ok(Self {
            lines: contents.lines().map(str::to_string).collect(),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Run from 1-based `start` to the end of the file or until the
    /// debugger quits.
    pub fn run(&self, session: &mut Session, start: usize) -> Result<Disposition> {
        let start = start.max(1);
        let frame = Frame::new(&self.path, start, "<module>");
        if session.trace_dispatch(TraceEvent::Call(frame))? == Disposition::Quit {
            return Ok(Disposition::Quit);
        }
        for (index, text) in self.lines.iter().enumerate().skip(start - 1) {
            if text.trim().is_empty() {
                continue;
            }
            if session.trace_dispatch(TraceEvent::Line(index + 1))? == Disposition::Quit {
                return Ok(Disposition::Quit);
            }
            if let Some((name, value)) = assignment(text) {
                session.trace_dispatch(TraceEvent::Local { name, value })?;
            }
        }
        session.trace_dispatch(TraceEvent::Return)
    }
}

/// `name = value` or `set NAME=value`, the forms tracked as locals.
fn assignment(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    let body = match line.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("set ") => line[4..].trim(),
        _ => line,
    };
    let (name, value) = body.split_once('=')?;
    let name = name.trim();
    let value = value.trim();
    if value.starts_with('=')
        || name.is_empty()
        || !name.chars().all(|c| c.is_alphanumeric() || c == '_')
    {
        return None;
    }
    Some((name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignments() {
        assert_eq!(
            assignment("total = 40 + 2"),
            Some(("total".into(), "40 + 2".into()))
        );
        assert_eq!(
            assignment("SET NAME=Alice"),
            Some(("NAME".into(), "Alice".into()))
        );
        assert_eq!(assignment("if a == b:"), None);
        assert_eq!(assignment("print(x)"), None);
        assert_eq!(assignment("x.y = 3"), None);
    }
}
