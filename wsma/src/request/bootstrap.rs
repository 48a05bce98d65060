//! Device-side configuration that enables the WSMA agents.
//!
//! A device only answers WSMA requests once the exec and config agents are
//! bound to a listener profile. The snippet rendered here is meant to be
//! pasted or sent over an ordinary CLI session before the first connect.

use std::fmt;
use std::str::FromStr;

/// Listener transport of the agent profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListenerTransport {
    #[default]
    Https,
    Http,
    Ssh,
    Tls,
}

impl fmt::Display for ListenerTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Https => "https",
            Self::Http => "http",
            Self::Ssh => "ssh",
            Self::Tls => "tls",
        })
    }
}

impl FromStr for ListenerTransport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "https" => Ok(Self::Https),
            "http" => Ok(Self::Http),
            "ssh" => Ok(Self::Ssh),
            "tls" => Ok(Self::Tls),
            other => Err(format!("unknown listener transport '{other}'")),
        }
    }
}

/// Name of the listener profile created by [`agent_config`].
pub const PROFILE_NAME: &str = "WSMA";

/// Render the configuration lines that enable both agents on `transport`.
pub fn agent_config(transport: ListenerTransport) -> String {
    let mut lines = Vec::new();
    match transport {
        ListenerTransport::Https => {
            lines.push("ip http secure-server".to_string());
            lines.push("ip http authentication local".to_string());
        }
        ListenerTransport::Http => {
            lines.push("ip http server".to_string());
            lines.push("ip http authentication local".to_string());
        }
        ListenerTransport::Ssh | ListenerTransport::Tls => {}
    }
    lines.push("wsma agent exec".to_string());
    lines.push(format!(" profile {PROFILE_NAME}"));
    lines.push("wsma agent config".to_string());
    lines.push(format!(" profile {PROFILE_NAME}"));
    lines.push(format!("wsma profile listener {PROFILE_NAME}"));
    lines.push(format!(" transport {transport}"));
    lines.push("end".to_string());
    lines.join("\n")
}
