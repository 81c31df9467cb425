use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure of an external invocation or of the command channel.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("'{command}' returned exit code '{code}'.")]
    ExitCode { command: String, code: i32 },

    #[error("could not launch '{command}': {reason}")]
    Launch { command: String, reason: String },

    #[error("cannot split command line '{0}'")]
    Unparsable(String),

    #[error("command channel failure: {0}")]
    Channel(#[from] io::Error),
}

/// Remote side answered, but not with what we needed.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("'{script}' launches a VIM instance without clientserver support.")]
    NoClientServer { script: String },

    #[error("'{script}' launches a VIM instance without python support.")]
    NoScripting { script: String },

    #[error("Calling --version returned no information about clientserver support:\n {output}")]
    IndeterminateClientServer { output: String },

    #[error("Calling --version returned no information about python support:\n {output}")]
    IndeterminateScripting { output: String },

    #[error("'{server_name}' server name not available in server list:\n{serverlist}")]
    ServerNotListed {
        server_name: String,
        serverlist: String,
    },

    #[error("server list still empty after {attempts} polls")]
    ServerListEmpty { attempts: usize },

    #[error("unexpected answer {response:?} to remote expression {expr}")]
    UnexpectedResponse { expr: String, response: String },
}

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("[{section}] section is missing in '{}'", file.display())]
    MissingSection { section: String, file: PathBuf },

    #[error("'{key}' option is missing from section [{section}] in '{}'.", file.display())]
    MissingKey {
        key: String,
        section: String,
        file: PathBuf,
    },

    #[error("'{key}' option is empty in '{}'.", file.display())]
    EmptyValue { key: String, file: PathBuf },

    #[error("'port' option in '{}' is not a valid port: {value}", file.display())]
    InvalidPort { value: String, file: PathBuf },

    #[error("cannot parse '{}': {source}", file.display())]
    Parse {
        file: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot access '{}': {source}", file.display())]
    Io {
        file: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot locate the home directory for the configuration file")]
    NoHomeDirectory,

    #[error("no working configuration: negotiation aborted")]
    NoWorkingConfiguration,
}

#[derive(Debug, Error)]
pub enum SessionStateError {
    #[error("no debugger is attached to the session")]
    NoActiveDebugger,

    #[error("mode switch requested but the switch is not installed")]
    SwitchNotInstalled,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    SessionState(#[from] SessionStateError),

    #[error("output stream failure: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
