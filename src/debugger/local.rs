use std::io::{self, BufRead, BufReader};

use super::session::{Debugger, Disposition, Personality};
use super::{Command, Control, DebugContext, RunMode};
use crate::error::Result;

const PROMPT: &str = "(vdb) ";

/// Reads commands from the terminal.
pub struct LocalDebugger {
    ctx: DebugContext,
    input: Box<dyn BufRead>,
    switch_enabled: bool,
}

impl LocalDebugger {
    pub fn new(ctx: DebugContext, input: Box<dyn BufRead>) -> Self {
        Self {
            ctx,
            input,
            switch_enabled: false,
        }
    }

    pub fn stdin(ctx: DebugContext) -> Self {
        Self::new(ctx, Box::new(BufReader::new(io::stdin())))
    }

    /// `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>> {
        self.ctx.output().write_str(PROMPT)?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            self.ctx.output().line("")?;
            return Ok(None);
        }
        Ok(Some(line))
    }

    fn onecmd(&mut self, line: &str) -> Result<Control> {
        let command = match Command::parse(line) {
            Command::Vim if self.switch_enabled => {
                return Ok(Control::Switch(Personality::Remote));
            }
            Command::Vim | Command::Pdb => Command::Eval(line.to_string()),
            command => command,
        };
        Ok(Control::from_stop(self.ctx.execute(&command)?))
    }
}

impl Debugger for LocalDebugger {
    fn personality(&self) -> Personality {
        Personality::Local
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
        self.ctx.print_current()?;
        loop {
            let line = match self.ctx.next_queued() {
                Some(line) => line,
                None => match self.read_line()? {
                    Some(line) => line,
                    None => {
                        self.ctx.set_mode(RunMode::Quit);
                        return Ok(Disposition::Quit);
                    }
                },
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

    fn enable_switch(&mut self) -> bool {
        !std::mem::replace(&mut self.switch_enabled, true)
    }
}
