//! Scripted stand-ins for the editor, the user and external processes.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

use crate::config::Prompt;
use crate::error::TransportError;
use crate::process::CommandRunner;
use crate::proxy::{CommandSource, RemoteChannel};

pub type Log = Rc<RefCell<Vec<String>>>;

/// Logs every remote call as `expr: ...`, `return: '...'` or `send: ...`.
pub struct RecordingChannel {
    log: Log,
    setup_answer: String,
    fail_sends: bool,
}

impl RecordingChannel {
    /// `setup_answer` is what the marker probe returns.
    pub fn new(setup_answer: &str) -> Self {
        Self {
            log: Log::default(),
            setup_answer: setup_answer.to_string(),
            fail_sends: false,
        }
    }

    /// Every `remote_send` fails with a non-zero exit.
    pub fn failing_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }

    pub fn log(&self) -> Log {
        Rc::clone(&self.log)
    }
}

impl RemoteChannel for RecordingChannel {
    fn remote_expr(&mut self, expr: &str) -> Result<String, TransportError> {
        let mut log = self.log.borrow_mut();
        log.push(format!("expr: {expr}"));
        log.push(format!("return: '{}'", self.setup_answer));
        Ok(self.setup_answer.clone())
    }

    fn remote_send(&mut self, keys: &str) -> Result<(), TransportError> {
        if self.fail_sends {
            return Err(TransportError::ExitCode {
                command: format!("vim --remote-send {keys}"),
                code: 1,
            });
        }
        self.log.borrow_mut().push(format!("send: {keys}"));
        Ok(())
    }
}

/// Replays queued command lines, then reports the channel as gone.
#[derive(Default)]
pub struct ScriptedSource {
    lines: VecDeque<String>,
    closed: Rc<RefCell<bool>>,
}

impl ScriptedSource {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            closed: Rc::default(),
        }
    }

    /// Becomes `true` once `close` has been called.
    pub fn closed_flag(&self) -> Rc<RefCell<bool>> {
        Rc::clone(&self.closed)
    }
}

impl CommandSource for ScriptedSource {
    fn wait_for(&mut self) -> Result<String, TransportError> {
        self.lines.pop_front().ok_or_else(|| {
            TransportError::Channel(io::Error::new(
                io::ErrorKind::ConnectionAborted,
                "no more scripted commands",
            ))
        })
    }

    fn close(&mut self) {
        *self.closed.borrow_mut() = true;
    }
}

type Handler = Box<dyn FnMut(&[String]) -> Result<String, TransportError>>;

/// Answers every command through a closure and records the command lines.
pub struct ScriptedRunner {
    handler: Handler,
    calls: Rc<RefCell<Vec<Vec<String>>>>,
}

impl ScriptedRunner {
    pub fn new(handler: impl FnMut(&[String]) -> Result<String, TransportError> + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Rc::default(),
        }
    }

    pub fn calls(&self) -> Rc<RefCell<Vec<Vec<String>>>> {
        Rc::clone(&self.calls)
    }
}

impl CommandRunner for ScriptedRunner {
    fn output(&mut self, parts: &[String]) -> Result<String, TransportError> {
        self.calls.borrow_mut().push(parts.to_vec());
        (self.handler)(parts)
    }

    fn status(&mut self, parts: &[String]) -> Result<(), TransportError> {
        self.output(parts).map(|_| ())
    }
}

/// Collects messages and answers questions from a queue; an exhausted queue
/// answers with an empty line.
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    pub messages: Vec<String>,
    pub questions: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

impl Prompt for ScriptedPrompt {
    fn notify(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    fn ask(&mut self, question: &str) -> io::Result<String> {
        self.questions.push(question.to_string());
        Ok(self.answers.pop_front().unwrap_or_default())
    }
}

/// In-memory sink whose contents stay readable after being boxed away.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
