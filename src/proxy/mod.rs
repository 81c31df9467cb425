//! Everything that crosses the wire to the editor.
//!
//! `RemoteProxy` hides the remote-control transport behind four operations:
//! making sure the bridge script is loaded, showing command feedback,
//! showing a file at a line, and waiting for the next command line.

mod channel;

use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::config::Configuration;
use crate::error::{ProtocolError, Result, TransportError};
use crate::process::SystemRunner;

pub use channel::{CommandSource, RemoteChannel, UdpCommandSource, VimRemote};

const SETUP_PROBE: &str = "exists('*PDB_setup_egg')";
const BRIDGE_SCRIPT: &str = "vimpdb.vim";

/// Quote `text` as an element of a single-quoted list literal.
pub fn quote_single(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Absolute path with forward slashes, whatever the host separator.
pub fn editor_path(filename: &str) -> PathBuf {
    let slashed = filename.replace('\\', "/");
    let path = Path::new(&slashed);
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    PathBuf::from(absolute.to_string_lossy().replace('\\', "/"))
}

/// `$VIMDEBUG_BRIDGE`, else the bridge script beside the running executable.
pub fn default_bridge_script() -> PathBuf {
    if let Some(path) = std::env::var_os("VIMDEBUG_BRIDGE") {
        return PathBuf::from(path);
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(BRIDGE_SCRIPT)))
        .unwrap_or_else(|| PathBuf::from(BRIDGE_SCRIPT))
}

pub struct RemoteProxy {
    channel: Box<dyn RemoteChannel>,
    source: Box<dyn CommandSource>,
    bridge_script: PathBuf,
    own_path: PathBuf,
    port: u16,
    remote_initialized: Rc<Cell<bool>>,
}

impl RemoteProxy {
    pub fn new(
        channel: Box<dyn RemoteChannel>,
        source: Box<dyn CommandSource>,
        port: u16,
    ) -> Self {
        Self {
            channel,
            source,
            bridge_script: default_bridge_script(),
            own_path: std::env::current_exe().unwrap_or_default(),
            port,
            remote_initialized: Rc::default(),
        }
    }

    /// Proxy wired to the real editor client and a UDP command socket.
    pub fn from_config(config: &Configuration) -> Self {
        let channel = VimRemote::new(
            SystemRunner,
            config.client_script.clone(),
            config.server_name.clone(),
        );
        Self::new(
            Box::new(channel),
            Box::new(UdpCommandSource::new(config.port)),
            config.port,
        )
    }

    pub fn with_bridge_script(mut self, path: impl Into<PathBuf>) -> Self {
        self.bridge_script = path.into();
        self
    }

    pub fn with_own_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.own_path = path.into();
        self
    }

    /// Share the setup flag with other proxies talking to the same editor,
    /// so it outlives any single proxy.
    pub fn with_initialized_flag(mut self, flag: Rc<Cell<bool>>) -> Self {
        self.remote_initialized = flag;
        self
    }

    pub fn is_remote_initialized(&self) -> bool {
        self.remote_initialized.get()
    }

    /// Ask the editor whether the marker function is already defined.
    pub fn is_remote_setup(&mut self) -> Result<bool> {
        let response = self.channel.remote_expr(SETUP_PROBE)?;
        match response.trim() {
            "1" => Ok(true),
            "0" | "" => Ok(false),
            other => Err(ProtocolError::UnexpectedResponse {
                expr: SETUP_PROBE.to_string(),
                response: other.to_string(),
            }
            .into()),
        }
    }

    /// Load the bridge script into the editor unless it is already there.
    pub fn ensure_remote_setup(&mut self) -> Result<()> {
        if self.is_remote_setup()? {
            self.remote_initialized.set(true);
            return Ok(());
        }
        tracing::info!(bridge = %self.bridge_script.display(), "setting up editor side");
        let source = format!(
            "<C-\\><C-N>:source {}<CR>",
            self.bridge_script.to_string_lossy().replace('\\', "/")
        );
        let egg = format!(
            ":call PDB_setup_egg(\"{}\")<CR>",
            self.own_path.to_string_lossy().replace('\\', "/")
        );
        self.send(&source)?;
        self.send(&egg)?;
        self.send(&egg)?;
        self.send(&format!(":call PDB_init_controller({})<CR>", self.port))?;
        self.remote_initialized.set(true);
        Ok(())
    }

    fn send(&mut self, keys: &str) -> Result<(), TransportError> {
        tracing::debug!(keys, "remote send");
        self.channel.remote_send(keys)
    }

    /// Display command output in the editor's feedback area.
    pub fn show_feedback(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.ensure_remote_setup()?;
        let lines: Vec<String> = text.lines().map(quote_single).collect();
        self.send(&format!(
            ":call PDB_show_feedback([{}])<CR>",
            lines.join(", ")
        ))?;
        Ok(())
    }

    /// Open `filename` at `lineno` in the editor. Files that do not exist
    /// locally (synthetic frames) are skipped.
    pub fn show_file_at_line(&mut self, filename: &str, lineno: usize) -> Result<()> {
        if !Path::new(filename).is_file() {
            tracing::debug!(filename, "not a local file; not shown");
            return Ok(());
        }
        self.send_file_at_line(filename, lineno)
    }

    pub(crate) fn send_file_at_line(&mut self, filename: &str, lineno: usize) -> Result<()> {
        self.ensure_remote_setup()?;
        let path = editor_path(filename);
        self.send(&format!(
            ":call PDB_show_file_at_line(\"{}\", \"{}\")<CR>",
            path.display(),
            lineno
        ))?;
        Ok(())
    }

    /// Block until the editor relays the next debugger command.
    pub fn wait_for(&mut self) -> Result<String> {
        Ok(self.source.wait_for()?)
    }

    pub fn close_socket(&mut self) {
        self.source.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingChannel, ScriptedSource};

    fn proxy(channel: RecordingChannel) -> RemoteProxy {
        RemoteProxy::new(Box::new(channel), Box::new(ScriptedSource::default()), 6666)
            .with_bridge_script("/opt/vimdebug/vimpdb.vim")
            .with_own_path("/usr/bin/vim-debugger")
    }

    #[test]
    fn setup_skipped_when_marker_exists() {
        let channel = RecordingChannel::new("1");
        let log = channel.log();
        let mut to_vim = proxy(channel);
        to_vim.ensure_remote_setup().unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["expr: exists('*PDB_setup_egg')", "return: '1'"]
        );
        assert!(to_vim.is_remote_initialized());
    }

    #[test]
    fn setup_sends_bridge_sequence() {
        let channel = RecordingChannel::new("0");
        let log = channel.log();
        let mut to_vim = proxy(channel);
        to_vim.ensure_remote_setup().unwrap();
        let lines = log.borrow();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "expr: exists('*PDB_setup_egg')");
        assert_eq!(lines[1], "return: '0'");
        assert_eq!(
            lines[2],
            "send: <C-\\><C-N>:source /opt/vimdebug/vimpdb.vim<CR>"
        );
        assert_eq!(lines[3], "send: :call PDB_setup_egg(\"/usr/bin/vim-debugger\")<CR>");
        assert_eq!(lines[4], lines[3]);
        assert_eq!(lines[5], "send: :call PDB_init_controller(6666)<CR>");
        assert!(to_vim.is_remote_initialized());
    }

    #[test]
    fn setup_flag_is_shared_between_proxies() {
        let flag = Rc::new(Cell::new(false));
        let mut first = proxy(RecordingChannel::new("0")).with_initialized_flag(Rc::clone(&flag));
        first.ensure_remote_setup().unwrap();
        drop(first);

        let second = proxy(RecordingChannel::new("1")).with_initialized_flag(flag);
        assert!(second.is_remote_initialized());
        assert!(!proxy(RecordingChannel::new("1")).is_remote_initialized());
    }

    #[test]
    fn empty_probe_answer_means_not_set_up() {
        let channel = RecordingChannel::new("");
        let log = channel.log();
        let mut to_vim = proxy(channel);
        to_vim.ensure_remote_setup().unwrap();
        assert_eq!(log.borrow().len(), 6);
    }

    #[test]
    fn garbage_probe_answer_is_a_protocol_error() {
        let mut to_vim = proxy(RecordingChannel::new("E449: Invalid expression"));
        assert!(matches!(
            to_vim.ensure_remote_setup(),
            Err(crate::Error::Protocol(ProtocolError::UnexpectedResponse { .. }))
        ));
        assert!(!to_vim.is_remote_initialized());
    }

    #[test]
    fn empty_feedback_is_silent() {
        let channel = RecordingChannel::new("1");
        let log = channel.log();
        proxy(channel).show_feedback("").unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn feedback_lines_become_one_list() {
        let channel = RecordingChannel::new("1");
        let log = channel.log();
        proxy(channel).show_feedback("first\nsecond").unwrap();
        assert_eq!(
            *log.borrow(),
            vec![
                "expr: exists('*PDB_setup_egg')",
                "return: '1'",
                "send: :call PDB_show_feedback(['first', 'second'])<CR>",
            ]
        );
    }

    #[test]
    fn feedback_quotes_are_doubled() {
        let channel = RecordingChannel::new("1");
        let log = channel.log();
        proxy(channel).show_feedback("it's").unwrap();
        assert_eq!(
            log.borrow()[2],
            "send: :call PDB_show_feedback(['it''s'])<CR>"
        );
    }

    #[test]
    fn missing_file_is_not_shown() {
        let channel = RecordingChannel::new("1");
        let log = channel.log();
        proxy(channel).show_file_at_line("bla.vim", 1).unwrap();
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn existing_file_is_shown_with_forward_slashes() {
        let channel = RecordingChannel::new("1");
        let log = channel.log();
        let file = tempfile::NamedTempFile::new().unwrap();
        let name = file.path().to_string_lossy().into_owned();
        proxy(channel).show_file_at_line(&name, 1).unwrap();
        let lines = log.borrow();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("send: :call PDB_show_file_at_line(\""));
        assert!(lines[2].ends_with(" \"1\")<CR>"));
        assert!(!lines[2].contains('\\'));
    }

    #[test]
    fn backslash_paths_are_normalized() {
        let channel = RecordingChannel::new("1");
        let log = channel.log();
        let file = tempfile::NamedTempFile::new().unwrap();
        let name = file
            .path()
            .to_string_lossy()
            .replace(std::path::MAIN_SEPARATOR, "\\");
        proxy(channel).send_file_at_line(&name, 1).unwrap();
        let lines = log.borrow();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].ends_with(" \"1\")<CR>"));
        assert!(!lines[2].contains('\\'));
    }

    #[test]
    fn quoting() {
        assert_eq!(quote_single("a"), "'a'");
        assert_eq!(quote_single("'x'"), "'''x'''");
    }
}
