use std::net::UdpSocket;

use crate::error::TransportError;
use crate::process::{build_command, CommandRunner};

/// Evaluate expressions in, and send keystrokes to, the remote editor.
pub trait RemoteChannel {
    fn remote_expr(&mut self, expr: &str) -> Result<String, TransportError>;
    fn remote_send(&mut self, keys: &str) -> Result<(), TransportError>;
}

/// Source of debugger command lines relayed back from the editor.
pub trait CommandSource {
    /// Block until the next command line arrives.
    fn wait_for(&mut self) -> Result<String, TransportError>;

    /// Release the channel. A later `wait_for` may reopen it.
    fn close(&mut self);
}

/// Talks to a running editor through its client binary.
pub struct VimRemote<R> {
    runner: R,
    client_script: String,
    server_name: String,
}

impl<R: CommandRunner> VimRemote<R> {
    pub fn new(runner: R, client_script: impl Into<String>, server_name: impl Into<String>) -> Self {
        Self {
            runner,
            client_script: client_script.into(),
            server_name: server_name.into(),
        }
    }

    fn command(&self, flag: &str, payload: &str) -> Result<Vec<String>, TransportError> {
        build_command(
            &self.client_script,
            &["--servername", &self.server_name, flag, payload],
        )
    }
}

impl<R: CommandRunner> RemoteChannel for VimRemote<R> {
    fn remote_expr(&mut self, expr: &str) -> Result<String, TransportError> {
        let command = self.command("--remote-expr", expr)?;
        self.runner.output(&command)
    }

    fn remote_send(&mut self, keys: &str) -> Result<(), TransportError> {
        let command = self.command("--remote-send", keys)?;
        self.runner.output(&command).map(|_| ())
    }
}

const DATAGRAM_SIZE: usize = 1024;

/// Receives one command per datagram on a local UDP port.
pub struct UdpCommandSource {
    port: u16,
    socket: Option<UdpSocket>,
}

impl UdpCommandSource {
    pub fn new(port: u16) -> Self {
        Self { port, socket: None }
    }

    /// Bind now instead of on the first wait.
    pub fn bind(&mut self) -> Result<&UdpSocket, TransportError> {
        let socket = match self.socket.take() {
            Some(socket) => socket,
            None => {
                let socket = UdpSocket::bind(("127.0.0.1", self.port))?;
                tracing::debug!(port = self.port, "command socket bound");
                socket
            }
        };
        Ok(self.socket.insert(socket))
    }

    pub fn local_port(&self) -> Option<u16> {
        self.socket
            .as_ref()
            .and_then(|s| s.local_addr().ok())
            .map(|addr| addr.port())
    }
}

impl CommandSource for UdpCommandSource {
    fn wait_for(&mut self) -> Result<String, TransportError> {
        let socket = self.bind()?;
        let mut buf = [0u8; DATAGRAM_SIZE];
        let (len, peer) = socket.recv_from(&mut buf)?;
        let line = String::from_utf8_lossy(&buf[..len]).into_owned();
        tracing::debug!(%peer, line = %line, "command received");
        Ok(line)
    }

    fn close(&mut self) {
        if self.socket.take().is_some() {
            tracing::debug!(port = self.port, "command socket closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    #[test]
    fn remote_expr_targets_configured_server() {
        let runner = ScriptedRunner::new(|_| Ok("1".to_string()));
        let calls = runner.calls();
        let mut remote = VimRemote::new(runner, "gvim", "DEBUG");
        assert_eq!(remote.remote_expr("exists('*PDB_setup_egg')").unwrap(), "1");
        assert_eq!(
            calls.borrow()[0],
            vec!["gvim", "--servername", "DEBUG", "--remote-expr", "exists('*PDB_setup_egg')"]
        );
    }

    #[test]
    fn remote_send_failure_propagates() {
        let runner = ScriptedRunner::new(|parts| {
            Err(TransportError::ExitCode {
                command: parts.join(" "),
                code: 1,
            })
        });
        let mut remote = VimRemote::new(runner, "gvim", "VIM");
        assert!(matches!(
            remote.remote_send(":echo 1<CR>"),
            Err(TransportError::ExitCode { code: 1, .. })
        ));
    }

    #[test]
    fn udp_source_returns_datagram_verbatim() {
        let mut source = UdpCommandSource::new(0);
        let port = {
            source.bind().unwrap();
            source.local_port().unwrap()
        };
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.send_to(b"break 12", ("127.0.0.1", port)).unwrap();
        assert_eq!(source.wait_for().unwrap(), "break 12");
        source.close();
        assert!(source.local_port().is_none());
    }
}
