use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};

use super::breakpoints::Breakpoints;
use super::commands::{split_queued, Command};
use super::session::{Disposition, Personality};
use super::{Frame, FrameStack, Output, RunMode, TraceEvent};

/// What the command loop does after one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Keep reading commands.
    Stay,
    /// Let the program run; the loop ends.
    Resume,
    /// Control moves to another personality; the loop ends.
    Switch(Personality),
}

impl Control {
    pub fn from_stop(stop: bool) -> Self {
        if stop {
            Self::Resume
        } else {
            Self::Stay
        }
    }
}

/// The debugger state both personalities drive: the frame chain,
/// breakpoints, run mode and the output stream.
pub struct DebugContext {
    pub stack: FrameStack,
    breakpoints: Breakpoints,
    mode: RunMode,
    step_target_depth: usize,
    output: Output,
    cmdqueue: VecDeque<String>,
    lastcmd: String,
}

impl DebugContext {
    pub fn new(output: Output) -> Self {
        Self {
            stack: FrameStack::new(),
            breakpoints: Breakpoints::new(),
            mode: RunMode::StepInto,
            step_target_depth: 0,
            output,
            cmdqueue: VecDeque::new(),
            lastcmd: String::new(),
        }
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: RunMode) {
        self.mode = mode;
    }

    pub fn breakpoints(&self) -> &Breakpoints {
        &self.breakpoints
    }

    pub fn add_breakpoint(&mut self, file: impl Into<PathBuf>, line: usize) {
        self.breakpoints.add(file, line);
    }

    pub fn disposition(&self) -> Disposition {
        if self.mode == RunMode::Quit {
            Disposition::Quit
        } else {
            Disposition::Continue
        }
    }

    /// Update the frame chain for `event`; true if execution should stop here.
    pub fn apply(&mut self, event: TraceEvent) -> bool {
        match event {
            TraceEvent::Call(frame) => {
                self.stack.push(frame);
                false
            }
            TraceEvent::Line(lineno) => {
                self.stack.reset_to_top();
                match self.stack.top_mut() {
                    Some(frame) => frame.lineno = lineno,
                    None => return false,
                }
                self.should_stop()
            }
            TraceEvent::Return => {
                self.stack.pop();
                false
            }
            TraceEvent::Local { name, value } => {
                if let Some(frame) = self.stack.top_mut() {
                    frame.set_local(name, value);
                }
                false
            }
        }
    }

    pub fn should_stop(&self) -> bool {
        let depth = self.stack.depth();
        match self.mode {
            RunMode::Quit => false,
            RunMode::StepInto => true,
            RunMode::StepOver | RunMode::StepOut => depth <= self.step_target_depth,
            RunMode::Continue => self
                .stack
                .frames()
                .last()
                .is_some_and(|f| self.breakpoints.contains(&canonic(&f.filename), f.lineno)),
        }
    }

    pub fn handle_step_command(&mut self, command: &Command) {
        let depth = self.stack.depth();
        match command {
            Command::Continue => self.mode = RunMode::Continue,
            Command::Next => {
                self.mode = RunMode::StepOver;
                self.step_target_depth = depth;
            }
            Command::Step => self.mode = RunMode::StepInto,
            Command::Return => {
                self.mode = RunMode::StepOut;
                self.step_target_depth = depth.saturating_sub(1);
            }
            Command::Quit => self.mode = RunMode::Quit,
            _ => return,
        }
        tracing::debug!(mode = ?self.mode, target = self.step_target_depth, "run mode");
    }

    /// Canonical file name and line of the frame being looked at.
    pub fn file_and_line(&self) -> Option<(String, usize)> {
        let frame = self.stack.current()?;
        Some((
            canonic(&frame.filename).to_string_lossy().into_owned(),
            frame.lineno,
        ))
    }

    /// Next command left over from a `;;` line.
    pub fn next_queued(&mut self) -> Option<String> {
        self.cmdqueue.pop_front()
    }

    /// Normalize a raw line: queue anything after `;;`, repeat the last
    /// command on an empty line. `None` when there is nothing to run.
    pub fn precmd(&mut self, line: &str) -> Option<String> {
        let (first, rest) = split_queued(line.trim());
        if let Some(rest) = rest {
            self.cmdqueue.push_front(rest.to_string());
        }
        if first.is_empty() {
            return (!self.lastcmd.is_empty()).then(|| self.lastcmd.clone());
        }
        self.lastcmd = first.to_string();
        Some(first.to_string())
    }

    pub fn postcmd(&mut self, control: Control, line: &str) -> Control {
        tracing::trace!(line, ?control, "command done");
        if control != Control::Stay {
            self.cmdqueue.clear();
        }
        control
    }

    /// Run one of the standard commands. Returns true when the program
    /// should resume.
    pub fn execute(&mut self, command: &Command) -> io::Result<bool> {
        match command {
            Command::Up(count) => self.do_up(*count).map(|_| false),
            Command::Down(count) => self.do_down(*count).map(|_| false),
            Command::Where => self.do_where().map(|_| false),
            Command::Args => self.do_args().map(|_| false),
            Command::Break(arg) => self.do_break(arg).map(|_| false),
            Command::Clear(arg) => self.do_clear(arg).map(|_| false),
            Command::Eval(expr) => self.default(expr).map(|_| false),
            Command::Next | Command::Step | Command::Return | Command::Continue | Command::Quit => {
                self.handle_step_command(command);
                Ok(true)
            }
            Command::Vim | Command::Pdb => self.default(command_word(command)).map(|_| false),
        }
    }

    pub fn print_stack_entry(&self, frame: &Frame, current: bool) -> io::Result<()> {
        let marker = if current { ">" } else { " " };
        self.output.line(format_args!(
            "{} {}({}){}()",
            marker,
            frame.filename.display(),
            frame.lineno,
            frame.function
        ))
    }

    pub fn print_current(&self) -> io::Result<()> {
        match self.stack.current() {
            Some(frame) => self.print_stack_entry(frame, true),
            None => Ok(()),
        }
    }

    pub fn do_up(&mut self, count: usize) -> io::Result<()> {
        if !self.stack.up(count) {
            return self.output.line("*** Oldest frame");
        }
        self.print_current()
    }

    pub fn do_down(&mut self, count: usize) -> io::Result<()> {
        if !self.stack.down(count) {
            return self.output.line("*** Newest frame");
        }
        self.print_current()
    }

    pub fn do_where(&self) -> io::Result<()> {
        let current = self.stack.current_index();
        for (i, frame) in self.stack.frames().iter().enumerate() {
            self.print_stack_entry(frame, i == current)?;
        }
        Ok(())
    }

    pub fn do_args(&self) -> io::Result<()> {
        let Some(frame) = self.stack.current() else {
            return Ok(());
        };
        for (name, value) in &frame.args {
            self.output.line(format_args!("{name} = {value}"))?;
        }
        Ok(())
    }

    /// `break` lists, `break LINE` or `break FILE:LINE` sets.
    pub fn do_break(&mut self, arg: &str) -> io::Result<()> {
        if arg.is_empty() {
            return self.list_breakpoints();
        }
        let (file, line) = match arg.rsplit_once(':') {
            Some((file, line)) => (Some(PathBuf::from(file.trim())), line.trim()),
            None => (None, arg),
        };
        let Ok(line) = line.parse::<usize>() else {
            return self
                .output
                .line(format_args!("*** Invalid line number: {line}"));
        };
        let file = match file.or_else(|| self.stack.current().map(|f| f.filename.clone())) {
            Some(file) if file.is_file() => canonic(&file),
            Some(file) => {
                return self
                    .output
                    .line(format_args!("*** Bad file: {}", file.display()))
            }
            None => return self.output.line("*** No file to break in"),
        };
        let point = self.breakpoints.add(file, line);
        let message = format!("Breakpoint {} at {}:{}", point.number, point.file.display(), point.line);
        self.output.line(message)
    }

    fn list_breakpoints(&self) -> io::Result<()> {
        if self.breakpoints.is_empty() {
            return Ok(());
        }
        self.output.line("Num Type         Disp Enb   Where")?;
        for point in self.breakpoints.iter() {
            self.output.line(format_args!(
                "{:<3} breakpoint   keep yes   at {}:{}",
                point.number,
                point.file.display(),
                point.line
            ))?;
        }
        Ok(())
    }

    /// `clear` drops all breakpoints, `clear N...` drops the numbered ones.
    pub fn do_clear(&mut self, arg: &str) -> io::Result<()> {
        if arg.is_empty() {
            self.breakpoints.clear();
            return self.output.line("Deleted all breakpoints");
        }
        for word in arg.split_whitespace() {
            let Ok(number) = word.parse::<usize>() else {
                self.output
                    .line(format_args!("*** Non-numeric breakpoint number {word}"))?;
                continue;
            };
            match self.breakpoints.remove(number) {
                Some(point) => self.output.line(format_args!(
                    "Deleted breakpoint {} at {}:{}",
                    point.number,
                    point.file.display(),
                    point.line
                ))?,
                None => self
                    .output
                    .line(format_args!("*** Breakpoint {number} does not exist"))?,
            }
        }
        Ok(())
    }

    /// Evaluate a name against the current frame.
    pub fn default(&self, expr: &str) -> io::Result<()> {
        let name = expr.trim().trim_start_matches('!').trim();
        match self.stack.current().and_then(|f| f.lookup(name)) {
            Some(value) => self.output.line(value),
            None => self
                .output
                .line(format_args!("*** NameError: name '{name}' is not defined")),
        }
    }
}

fn command_word(command: &Command) -> &'static str {
    match command {
        Command::Vim => "vim",
        _ => "pdb",
    }
}

/// Absolute, symlink-resolved form of `path` when it exists.
pub fn canonic(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
