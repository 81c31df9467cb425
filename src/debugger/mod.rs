mod breakpoints;
mod commands;
mod context;
mod local;
mod output;
mod remote;
mod script;
mod session;
mod stepping;

use std::path::PathBuf;

pub use breakpoints::{Breakpoint, Breakpoints};
pub use commands::{split_queued, Command};
pub use context::{Control, DebugContext};
pub use local::LocalDebugger;
pub use output::{CaptureGuard, Output};
pub use remote::RemoteDebugger;
pub use script::ScriptTrace;
pub use session::{Debugger, DebuggerFactory, Disposition, EditorFactory, Personality, Session};
pub use stepping::RunMode;

/// One call-stack frame under inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub filename: PathBuf,
    pub lineno: usize,
    pub function: String,
    pub args: Vec<(String, String)>,
    pub locals: Vec<(String, String)>,
}

impl Frame {
    pub fn new(filename: impl Into<PathBuf>, lineno: usize, function: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            lineno,
            function: function.into(),
            args: Vec::new(),
            locals: Vec::new(),
        }
    }

    pub fn with_args<I, K, V>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.args = args.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    pub fn set_local(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.locals.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.locals.push((name, value)),
        }
    }

    /// Locals shadow arguments.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.locals
            .iter()
            .chain(self.args.iter())
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// The frame chain plus the index of the frame being looked at.
/// Index 0 is the outermost frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStack {
    frames: Vec<Frame>,
    current: usize,
}

impl FrameStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
        self.current = self.frames.len() - 1;
    }

    /// Leave the innermost frame.
    pub fn pop(&mut self) -> Option<Frame> {
        let frame = self.frames.pop();
        self.current = self.frames.len().saturating_sub(1);
        frame
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current(&self) -> Option<&Frame> {
        self.frames.get(self.current)
    }

    pub fn top_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub fn reset_to_top(&mut self) {
        self.current = self.frames.len().saturating_sub(1);
    }

    /// Move toward the outermost frame. Returns false if already there.
    pub fn up(&mut self, count: usize) -> bool {
        if self.current == 0 {
            return false;
        }
        self.current = self.current.saturating_sub(count);
        true
    }

    /// Move toward the innermost frame. Returns false if already there.
    pub fn down(&mut self, count: usize) -> bool {
        let newest = self.frames.len().saturating_sub(1);
        if self.current >= newest {
            return false;
        }
        self.current = (self.current + count).min(newest);
        true
    }
}

/// What the traced program reports to the debugger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    Call(Frame),
    Line(usize),
    Return,
    Local { name: String, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack() -> FrameStack {
        let mut stack = FrameStack::new();
        stack.push(Frame::new("/src/main.py", 10, "<module>"));
        stack.push(Frame::new("/src/lib.py", 4, "helper").with_args([("n", "3")]));
        stack
    }

    #[test]
    fn navigation_stops_at_the_ends() {
        let mut stack = stack();
        assert_eq!(stack.current_index(), 1);
        assert!(!stack.down(1));
        assert!(stack.up(5));
        assert_eq!(stack.current_index(), 0);
        assert!(!stack.up(1));
        assert!(stack.down(1));
        assert_eq!(stack.current().unwrap().function, "helper");
    }

    #[test]
    fn pop_returns_to_caller() {
        let mut stack = stack();
        stack.up(1);
        let left = stack.pop().unwrap();
        assert_eq!(left.function, "helper");
        assert_eq!(stack.current_index(), 0);
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn locals_shadow_args() {
        let mut frame = Frame::new("/src/lib.py", 1, "f").with_args([("x", "1")]);
        assert_eq!(frame.lookup("x"), Some("1"));
        frame.set_local("x", "2");
        frame.set_local("x", "5");
        assert_eq!(frame.lookup("x"), Some("5"));
        assert_eq!(frame.locals.len(), 1);
        assert_eq!(frame.lookup("y"), None);
    }
}
