use super::session::{Debugger, Disposition, Personality};
use super::{Command, Control, DebugContext};
use crate::error::Result;
use crate::proxy::RemoteProxy;

/// Takes its commands from the editor and shows its output there.
pub struct RemoteDebugger {
    ctx: DebugContext,
    vim: RemoteProxy,
    pending: String,
}

impl RemoteDebugger {
    pub fn new(ctx: DebugContext, vim: RemoteProxy) -> Self {
        Self {
            ctx,
            vim,
            pending: String::new(),
        }
    }

    pub fn proxy(&self) -> &RemoteProxy {
        &self.vim
    }

    /// Captured text not yet sent to the editor.
    pub fn pending_output(&self) -> &str {
        &self.pending
    }

    fn show_file_at_line(&mut self) -> Result<()> {
        if let Some((filename, lineno)) = self.ctx.file_and_line() {
            self.vim.show_file_at_line(&filename, lineno)?;
        }
        Ok(())
    }

    /// Run `command` with output captured, then send the capture as feedback.
    fn captured(&mut self, command: &Command, line: &str) -> Result<bool> {
        let guard = self.ctx.output().capture();
        let result = self.dispatch_captured(command, line);
        self.pending.push_str(&guard.finish());
        let stop = result?;
        let text = std::mem::take(&mut self.pending);
        self.vim.show_feedback(&text)?;
        Ok(stop)
    }

    fn dispatch_captured(&mut self, command: &Command, line: &str) -> Result<bool> {
        if let Command::Eval(expr) = command {
            self.ctx.output().write_str(&format!("{line} = "))?;
            self.ctx.default(expr)?;
            return Ok(false);
        }
        Ok(self.ctx.execute(command)?)
    }

    /// Leave the editor: flush what is pending locally and release the
    /// command channel.
    fn switch_to_local(&mut self) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        if !pending.is_empty() {
            self.ctx.output().line(pending.trim_end())?;
        }
        self.vim.close_socket();
        Ok(())
    }

    fn onecmd(&mut self, line: &str) -> Result<Control> {
        let command = match Command::parse(line) {
            Command::Pdb => {
                self.switch_to_local()?;
                return Ok(Control::Switch(Personality::Local));
            }
            Command::Vim => Command::Eval(line.to_string()),
            command => command,
        };
        if command.is_captured() {
            return self.captured(&command, line).map(Control::from_stop);
        }
        let stop = self.ctx.execute(&command)?;
        if command.is_moved() {
            self.show_file_at_line()?;
        }
        Ok(Control::from_stop(stop))
    }
}

impl Debugger for RemoteDebugger {
    fn personality(&self) -> Personality {
        Personality::Remote
    }

    fn context(&self) -> &DebugContext {
        &self.ctx
    }

    fn context_mut(&mut self) -> &mut DebugContext {
        &mut self.ctx
    }

    fn into_context(self: Box<Self>) -> DebugContext {
        self.ctx
    }

    fn interaction(&mut self) -> Result<Disposition> {
        self.show_file_at_line()?;
        loop {
            let line = match self.ctx.next_queued() {
                Some(line) => line,
                None => self.vim.wait_for()?,
            };
            let Some(line) = self.ctx.precmd(&line) else {
                continue;
            };
            let control = self.onecmd(&line)?;
            match self.ctx.postcmd(control, &line) {
                Control::Stay => {}
                Control::Resume => return Ok(self.ctx.disposition()),
                Control::Switch(target) => return Ok(Disposition::Switch(target)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::debugger::{Frame, Output, RunMode, TraceEvent};
    use crate::testing::{Log, RecordingChannel, ScriptedSource, SharedBuffer};

    struct Fixture {
        debugger: RemoteDebugger,
        log: Log,
        local: SharedBuffer,
        closed: Rc<RefCell<bool>>,
        _file: tempfile::NamedTempFile,
    }

    fn fixture(commands: &[&str]) -> Fixture {
        fixture_with(RecordingChannel::new("1"), commands)
    }

    fn fixture_with(channel: RecordingChannel, commands: &[&str]) -> Fixture {
        let file = tempfile::NamedTempFile::new().unwrap();
        let local = SharedBuffer::default();
        let mut ctx = DebugContext::new(Output::new(local.clone()));
        ctx.apply(TraceEvent::Call(Frame::new(file.path(), 1, "<module>")));
        ctx.apply(TraceEvent::Call(
            Frame::new(file.path(), 5, "work").with_args([("count", "2")]),
        ));
        let log = channel.log();
        let source = ScriptedSource::new(commands.iter().copied());
        let closed = source.closed_flag();
        let vim = RemoteProxy::new(Box::new(channel), Box::new(source), 6666);
        Fixture {
            debugger: RemoteDebugger::new(ctx, vim),
            log,
            local,
            closed,
            _file: file,
        }
    }

    fn sends(log: &Log) -> Vec<String> {
        log.borrow()
            .iter()
            .filter(|l| l.starts_with("send: "))
            .cloned()
            .collect()
    }

    #[test]
    fn first_stop_shows_file_then_resumes() {
        let mut f = fixture(&["next"]);
        assert_eq!(f.debugger.interaction().unwrap(), Disposition::Continue);
        let sends = sends(&f.log);
        assert_eq!(sends.len(), 1);
        assert!(sends[0].starts_with("send: :call PDB_show_file_at_line(\""));
        assert!(sends[0].ends_with(", \"5\")<CR>"));
        assert_eq!(f.debugger.context().mode(), RunMode::StepOver);
    }

    #[test]
    fn args_output_goes_to_the_editor() {
        let mut f = fixture(&["args", "c"]);
        f.debugger.interaction().unwrap();
        let sends = sends(&f.log);
        assert_eq!(sends[1], "send: :call PDB_show_feedback(['count = 2'])<CR>");
        assert_eq!(f.local.contents(), "");
        assert_eq!(f.debugger.pending_output(), "");
    }

    #[test]
    fn expressions_are_echoed() {
        let mut f = fixture(&["count", "c"]);
        f.debugger.interaction().unwrap();
        assert_eq!(
            sends(&f.log)[1],
            "send: :call PDB_show_feedback(['count = 2'])<CR>"
        );
    }

    #[test]
    fn moving_updates_the_editor_position() {
        let mut f = fixture(&["up", "c"]);
        f.debugger.interaction().unwrap();
        let sends = sends(&f.log);
        assert_eq!(sends.len(), 2);
        assert!(sends[1].ends_with(", \"1\")<CR>"));
    }

    #[test]
    fn uncaptured_commands_send_nothing() {
        let mut f = fixture(&["where", "c"]);
        f.debugger.interaction().unwrap();
        assert_eq!(sends(&f.log).len(), 1);
        assert!(f.local.contents().contains("work()"));
    }

    #[test]
    fn pdb_hands_control_back() {
        let mut f = fixture(&["pdb"]);
        assert!(!*f.closed.borrow());
        assert_eq!(
            f.debugger.interaction().unwrap(),
            Disposition::Switch(Personality::Local)
        );
        assert!(*f.closed.borrow());
    }

    #[test]
    fn empty_first_line_sends_no_feedback() {
        let mut f = fixture(&["", "c"]);
        assert_eq!(f.debugger.interaction().unwrap(), Disposition::Continue);
        assert_eq!(sends(&f.log).len(), 1);
        assert_eq!(f.local.contents(), "");
    }

    #[test]
    fn lost_channel_ends_the_session() {
        let mut f = fixture(&[]);
        assert!(matches!(
            f.debugger.interaction(),
            Err(crate::Error::Transport(_))
        ));
    }

    #[test]
    fn editor_send_failure_is_fatal() {
        let mut f = fixture_with(RecordingChannel::new("1").failing_sends(), &["args"]);
        assert!(matches!(
            f.debugger.interaction(),
            Err(crate::Error::Transport(_))
        ));
        assert!(!f.debugger.context().output().is_capturing());
    }
}
