//! One debug session that can change hands between the terminal and the
//! editor without losing the frame chain.
//!
//! Trace events go to the attached delegate when there is one, otherwise to
//! the original debugger. A switch moves the `DebugContext` out of whichever
//! debugger is active into a freshly built one, which becomes the delegate.

use std::cell::Cell;
use std::rc::Rc;

use crate::config::Configuration;
use crate::error::{Result, SessionStateError};
use crate::proxy::RemoteProxy;

use super::{DebugContext, LocalDebugger, RemoteDebugger, TraceEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Personality {
    /// Commands from the terminal.
    Local,
    /// Commands relayed by the editor.
    Remote,
}

/// What a debugger hands back to the traced program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Continue,
    Quit,
    Switch(Personality),
}

pub trait Debugger {
    fn personality(&self) -> Personality;

    fn context(&self) -> &DebugContext;

    fn context_mut(&mut self) -> &mut DebugContext;

    /// Give up the session state, frame chain included.
    fn into_context(self: Box<Self>) -> DebugContext;

    /// Run the command loop at the current stop.
    fn interaction(&mut self) -> Result<Disposition>;

    /// Accept the command that hands control to the other personality.
    /// Returns false if it was already accepted.
    fn enable_switch(&mut self) -> bool {
        false
    }

    fn trace_dispatch(&mut self, event: TraceEvent) -> Result<Disposition> {
        if self.context_mut().apply(event) {
            self.interaction()
        } else {
            Ok(self.context().disposition())
        }
    }
}

/// Builds the debugger that takes over a session.
pub trait DebuggerFactory {
    fn build(&mut self, personality: Personality, ctx: DebugContext) -> Result<Box<dyn Debugger>>;
}

/// Terminal on stdin/stdout, editor through the negotiated configuration.
pub struct EditorFactory {
    config: Configuration,
    remote_initialized: Rc<Cell<bool>>,
}

impl EditorFactory {
    pub fn new(config: Configuration) -> Self {
        Self {
            config,
            remote_initialized: Rc::default(),
        }
    }

    /// Whether any proxy built here has set up the editor side.
    pub fn is_remote_initialized(&self) -> bool {
        self.remote_initialized.get()
    }
}

impl DebuggerFactory for EditorFactory {
    fn build(&mut self, personality: Personality, ctx: DebugContext) -> Result<Box<dyn Debugger>> {
        Ok(match personality {
            Personality::Local => {
                let mut local = LocalDebugger::stdin(ctx);
                local.enable_switch();
                Box::new(local)
            }
            Personality::Remote => {
                let vim = RemoteProxy::from_config(&self.config)
                    .with_initialized_flag(Rc::clone(&self.remote_initialized));
                Box::new(RemoteDebugger::new(ctx, vim))
            }
        })
    }
}

pub struct Session {
    original: Option<Box<dyn Debugger>>,
    delegate: Option<Box<dyn Debugger>>,
    factory: Box<dyn DebuggerFactory>,
    switch_installed: bool,
}

impl Session {
    pub fn new(debugger: Box<dyn Debugger>, factory: Box<dyn DebuggerFactory>) -> Self {
        Self {
            original: Some(debugger),
            delegate: None,
            factory,
            switch_installed: false,
        }
    }

    /// Allow mode switches. Installing twice is a no-op; returns whether
    /// this call did the installation.
    pub fn install_switch(&mut self) -> bool {
        if self.switch_installed {
            return false;
        }
        self.switch_installed = true;
        if let Some(original) = self.original.as_mut() {
            original.enable_switch();
        }
        tracing::debug!("mode switch installed");
        true
    }

    pub fn is_switch_installed(&self) -> bool {
        self.switch_installed
    }

    pub fn has_delegate(&self) -> bool {
        self.delegate.is_some()
    }

    /// The debugger events currently go to.
    pub fn active(&self) -> Option<&dyn Debugger> {
        self.delegate.as_deref().or(self.original.as_deref())
    }

    pub fn trace_dispatch(&mut self, event: TraceEvent) -> Result<Disposition> {
        let active = match self.delegate.as_mut() {
            Some(delegate) => delegate,
            None => self
                .original
                .as_mut()
                .ok_or(SessionStateError::NoActiveDebugger)?,
        };
        let mut disposition = active.trace_dispatch(event)?;
        while let Disposition::Switch(target) = disposition {
            disposition = self.transfer(target)?;
        }
        Ok(disposition)
    }

    /// Move the live session into a new `target` debugger, attach it as the
    /// delegate and let it take the current stop. Handing over to the editor
    /// needs the installed switch; handing back to the terminal does not,
    /// since `pdb` belongs to the remote-driven debugger itself.
    pub fn transfer(&mut self, target: Personality) -> Result<Disposition> {
        if target == Personality::Remote && !self.switch_installed {
            return Err(SessionStateError::SwitchNotInstalled.into());
        }
        let current = self
            .delegate
            .take()
            .or_else(|| self.original.take())
            .ok_or(SessionStateError::NoActiveDebugger)?;
        tracing::info!(from = ?current.personality(), to = ?target, "handing over session");
        let ctx = current.into_context();
        let mut next = self.factory.build(target, ctx)?;
        next.enable_switch();
        self.delegate.insert(next).interaction()
    }
}
