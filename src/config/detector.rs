//! Capability negotiation with the editor binaries.
//!
//! Each pass runs four checks in order; the first failure reports a message,
//! asks the user for a replacement and restarts from the top. Only a pass
//! where every check succeeds ends the negotiation.

use std::fmt;

use super::{default_server_script, ConfigStore, Configuration, Prompt};
use crate::error::{ConfigurationError, Error, ProtocolError, Result, TransportError};
use crate::process::{build_command, CommandRunner};

const CLIENTSERVER_FEATURE: &str = "clientserver";
const SCRIPTING_FEATURE: &str = "python";

/// Which configured script a probe runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Client => write!(f, "client"),
            Role::Server => write!(f, "server"),
        }
    }
}

/// Outcome of looking for one feature in `--version` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    Supported,
    Unsupported,
    Indeterminate,
}

/// Classify `--version` text for `+feature` / `-feature`.
pub fn classify(version: &str, feature: &str) -> Support {
    if version.contains(&format!("+{feature}")) {
        Support::Supported
    } else if version.contains(&format!("-{feature}")) {
        Support::Unsupported
    } else {
        Support::Indeterminate
    }
}

pub struct Detector<R, P> {
    client_script: String,
    server_script: String,
    server_name: String,
    port: u16,
    runner: R,
    prompt: P,
    poll_limit: Option<usize>,
}

impl<R: CommandRunner, P: Prompt> Detector<R, P> {
    pub fn new(config: &Configuration, runner: R, prompt: P) -> Self {
        Self {
            client_script: config.client_script.clone(),
            server_script: config.server_script.clone(),
            server_name: config.server_name.clone(),
            port: config.port,
            runner,
            prompt,
            poll_limit: None,
        }
    }

    /// Cap the number of server-list polls after launching a server.
    /// Without a cap the wait only ends when a server shows up.
    pub fn with_poll_limit(mut self, polls: usize) -> Self {
        self.poll_limit = Some(polls);
        self
    }

    pub fn prompt(&self) -> &P {
        &self.prompt
    }

    pub fn configuration(&self) -> Configuration {
        Configuration::new(
            self.client_script.clone(),
            self.server_script.clone(),
            self.server_name.clone(),
            self.port,
        )
    }

    /// Negotiate until every check passes, then persist the result.
    pub fn check_configuration(&mut self, store: &ConfigStore) -> Result<Configuration> {
        while !self.check_once()? {}
        let config = self.configuration();
        store.save(&config)?;
        tracing::info!(%config, "configuration negotiated");
        Ok(config)
    }

    /// One pass over the four checks. `Ok(false)` means a repair was
    /// collected and the caller should try again.
    pub fn check_once(&mut self) -> Result<bool> {
        if let Err(err) = self.check_clientserver_support(Role::Client) {
            self.report(&err);
            self.query_script(Role::Client)?;
            return Ok(false);
        }

        match self.check_scripting_support() {
            Ok(()) => {}
            Err(err @ Error::Transport(TransportError::Launch { .. })) => {
                self.report(&err);
                let origin = if self.server_script == default_server_script() {
                    "with the default VIM server script"
                } else {
                    "with the VIM server script from the configuration"
                };
                self.prompt
                    .notify(&format!("{} ({}).", origin, self.server_script));
                self.query_script(Role::Server)?;
                return Ok(false);
            }
            Err(err) => {
                self.report(&err);
                self.query_script(Role::Server)?;
                return Ok(false);
            }
        }

        if let Err(err) = self.check_clientserver_support(Role::Server) {
            self.report(&err);
            self.query_script(Role::Server)?;
            return Ok(false);
        }

        if let Err(err) = self.check_serverlist() {
            self.report(&err);
            self.query_server_name()?;
            return Ok(false);
        }

        Ok(true)
    }

    fn report(&mut self, err: &Error) {
        tracing::warn!(error = %err, "configuration check failed");
        self.prompt.notify(&err.to_string());
    }

    fn script(&self, role: Role) -> &str {
        match role {
            Role::Client => &self.client_script,
            Role::Server => &self.server_script,
        }
    }

    fn run(&mut self, role: Role, args: &[&str]) -> Result<String> {
        let command = build_command(self.script(role), args)?;
        Ok(self.runner.output(&command)?)
    }

    pub fn version(&mut self, role: Role) -> Result<String> {
        self.run(role, &["--version"])
    }

    pub fn check_clientserver_support(&mut self, role: Role) -> Result<()> {
        let version = self.version(role)?;
        match classify(&version, CLIENTSERVER_FEATURE) {
            Support::Supported => Ok(()),
            Support::Unsupported => Err(ProtocolError::NoClientServer {
                script: self.script(role).to_string(),
            }
            .into()),
            Support::Indeterminate => {
                Err(ProtocolError::IndeterminateClientServer { output: version }.into())
            }
        }
    }

    pub fn check_scripting_support(&mut self) -> Result<()> {
        let version = self.version(Role::Server)?;
        match classify(&version, SCRIPTING_FEATURE) {
            Support::Supported => Ok(()),
            Support::Unsupported => Err(ProtocolError::NoScripting {
                script: self.server_script.clone(),
            }
            .into()),
            Support::Indeterminate => {
                Err(ProtocolError::IndeterminateScripting { output: version }.into())
            }
        }
    }

    pub fn serverlist(&mut self) -> Result<String> {
        self.run(Role::Client, &["--serverlist"])
    }

    pub fn launch_server(&mut self) -> Result<()> {
        let name = self.server_name.clone();
        let command = build_command(&self.server_script, &["--servername", &name])?;
        tracing::info!(server = %name, "launching editor server");
        Ok(self.runner.status(&command)?)
    }

    pub fn check_serverlist(&mut self) -> Result<()> {
        let mut serverlist = self.serverlist()?;
        if serverlist.is_empty() {
            self.launch_server()?;
            let mut attempts = 0;
            while serverlist.is_empty() {
                if self.poll_limit.is_some_and(|limit| attempts >= limit) {
                    return Err(ProtocolError::ServerListEmpty { attempts }.into());
                }
                attempts += 1;
                serverlist = self.serverlist()?;
            }
        }
        let listed = serverlist
            .lines()
            .any(|name| name.trim().eq_ignore_ascii_case(&self.server_name));
        if !listed {
            return Err(ProtocolError::ServerNotListed {
                server_name: self.server_name.clone(),
                serverlist,
            }
            .into());
        }
        Ok(())
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        let answer = self.prompt.ask(question)?;
        if answer.is_empty() {
            return Err(ConfigurationError::NoWorkingConfiguration.into());
        }
        Ok(answer)
    }

    fn query_script(&mut self, role: Role) -> Result<()> {
        let answer = self.ask(&format!(
            "Input another VIM {role} script (leave empty to abort): "
        ))?;
        match role {
            Role::Client => self.client_script = answer,
            Role::Server => self.server_script = answer,
        }
        Ok(())
    }

    fn query_server_name(&mut self) -> Result<()> {
        self.server_name = self.ask("Input another server name (leave empty to abort): ")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positive_marker_wins() {
        assert_eq!(
            classify("+clientserver -python", "clientserver"),
            Support::Supported
        );
    }

    #[test]
    fn negative_marker_is_unsupported() {
        assert_eq!(classify("-clientserver +python", "clientserver"), Support::Unsupported);
        assert_eq!(classify("-python3 -python", "python"), Support::Unsupported);
    }

    #[test]
    fn missing_marker_is_indeterminate() {
        assert_eq!(classify("VIM - Vi IMproved 9.0", "clientserver"), Support::Indeterminate);
    }

    #[test]
    fn python3_counts_as_scripting() {
        assert_eq!(classify("+python3", "python"), Support::Supported);
    }

    #[test]
    fn role_names() {
        assert_eq!(Role::Client.to_string(), "client");
        assert_eq!(Role::Server.to_string(), "server");
    }
}
