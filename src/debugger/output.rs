use std::cell::RefCell;
use std::fmt::Display;
use std::io::{self, Write};
use std::rc::Rc;

struct State {
    sink: Box<dyn Write>,
    capture: Option<String>,
}

/// Where the debugger prints. While a capture is active, text goes to an
/// in-memory buffer instead of the sink.
#[derive(Clone)]
pub struct Output {
    state: Rc<RefCell<State>>,
}

impl Output {
    pub fn new(sink: impl Write + 'static) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                sink: Box::new(sink),
                capture: None,
            })),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    pub fn write_str(&self, text: &str) -> io::Result<()> {
        let state = &mut *self.state.borrow_mut();
        match &mut state.capture {
            Some(buffer) => {
                buffer.push_str(text);
                Ok(())
            }
            None => {
                state.sink.write_all(text.as_bytes())?;
                state.sink.flush()
            }
        }
    }

    pub fn line(&self, text: impl Display) -> io::Result<()> {
        self.write_str(&format!("{text}\n"))
    }

    pub fn is_capturing(&self) -> bool {
        self.state.borrow().capture.is_some()
    }

    /// Redirect into a fresh buffer until the guard is finished or dropped.
    pub fn capture(&self) -> CaptureGuard {
        let previous = self.state.borrow_mut().capture.replace(String::new());
        CaptureGuard {
            output: self.clone(),
            previous: Some(previous),
        }
    }
}

/// Restores the previous destination on every exit path.
pub struct CaptureGuard {
    output: Output,
    previous: Option<Option<String>>,
}

impl CaptureGuard {
    /// Stop capturing and return what was captured.
    pub fn finish(mut self) -> String {
        self.restore()
    }

    fn restore(&mut self) -> String {
        match self.previous.take() {
            Some(previous) => {
                let mut state = self.output.state.borrow_mut();
                std::mem::replace(&mut state.capture, previous).unwrap_or_default()
            }
            None => String::new(),
        }
    }
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.restore();
    }
}
