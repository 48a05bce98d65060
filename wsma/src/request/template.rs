//! SOAP request templates for the exec and config agents.
//!
//! All three request kinds share one envelope: a WS-Security header carrying
//! the plaintext username and password, wrapped around a `request` element in
//! either the exec or the config namespace. Every substituted value is
//! XML-escaped, so any command text yields a well-formed document.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use quick_xml::escape::escape;

/// Namespace of exec requests and responses.
pub const EXEC_NAMESPACE: &str = "urn:cisco:wsma-exec";

/// Namespace of config requests and responses.
pub const CONFIG_NAMESPACE: &str = "urn:cisco:wsma-config";

const ENVELOPE_BEGIN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP:Envelope xmlns:SOAP="http://schemas.xmlsoap.org/soap/envelope/"
  xmlns:SOAP-ENC="http://schemas.xmlsoap.org/soap/encoding/"
  xmlns:xsd="http://www.w3.org/2001/XMLSchema"
  xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <SOAP:Header>
    <wsse:Security xmlns:wsse="http://schemas.xmlsoap.org/ws/2002/04/secext" SOAP:mustUnderstand="false">
      <wsse:UsernameToken>
"#;

const ENVELOPE_END: &str = r#"    </request>
  </SOAP:Body>
</SOAP:Envelope>"#;

/// What the config agent does when a line of a config block fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ActionOnFail {
    /// Stop applying at the failing line.
    #[default]
    Stop,
    /// Skip the failing line and keep going.
    Continue,
    /// Undo everything applied by this request.
    Rollback,
}

impl ActionOnFail {
    /// Attribute value used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Continue => "continue",
            Self::Rollback => "rollback",
        }
    }
}

impl fmt::Display for ActionOnFail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionOnFail {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stop" => Ok(Self::Stop),
            "continue" => Ok(Self::Continue),
            "rollback" => Ok(Self::Rollback),
            other => Err(format!("unknown action-on-fail '{other}'")),
        }
    }
}

/// A request body, ready to be rendered into an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestTemplate<'a> {
    /// Run a command in exec mode.
    Exec {
        command: &'a str,
        format: Option<&'a str>,
        timeout: Duration,
    },
    /// Apply a block of configuration lines.
    Config {
        text: &'a str,
        action_on_fail: ActionOnFail,
    },
    /// Persist the running configuration.
    ConfigPersist,
}

impl RequestTemplate<'_> {
    /// Namespace of the `request` element.
    pub fn namespace(&self) -> &'static str {
        match self {
            Self::Exec { .. } => EXEC_NAMESPACE,
            Self::Config { .. } | Self::ConfigPersist => CONFIG_NAMESPACE,
        }
    }

    /// Text fed to the correlator for this request.
    pub fn correlator_seed(&self) -> String {
        match self {
            Self::Exec { command, .. } => format!("exec{command}"),
            Self::Config { .. } => "config".to_string(),
            Self::ConfigPersist => "config-persist".to_string(),
        }
    }

    /// Render the full SOAP document.
    pub fn render(&self, correlator: &str, username: &str, password: &str) -> String {
        let mut xml = String::with_capacity(1024);
        xml.push_str(ENVELOPE_BEGIN);
        xml.push_str(&format!(
            "        <wsse:Username>{}</wsse:Username>\n        <wsse:Password>{}</wsse:Password>\n",
            escape(username),
            escape(password)
        ));
        xml.push_str("      </wsse:UsernameToken>\n    </wsse:Security>\n  </SOAP:Header>\n  <SOAP:Body>\n");
        xml.push_str(&format!(
            "    <request xmlns=\"{}\" correlator=\"{}\">\n",
            self.namespace(),
            escape(correlator)
        ));

        match self {
            Self::Exec {
                command,
                format,
                timeout,
            } => {
                let format_attr = format
                    .map(|spec| format!(" format=\"{}\"", escape(spec)))
                    .unwrap_or_default();
                xml.push_str(&format!(
                    "      <execCLI maxWait=\"PT{}S\" xsd=\"false\"{}>\n        <cmd>{}</cmd>\n      </execCLI>\n",
                    timeout.as_secs(),
                    format_attr,
                    escape(*command)
                ));
            }
            Self::Config {
                text,
                action_on_fail,
            } => {
                xml.push_str(&format!(
                    "      <configApply details=\"all\" action-on-fail=\"{action_on_fail}\">\n        <config-data>\n          <cli-config-data-block>{}</cli-config-data-block>\n        </config-data>\n      </configApply>\n",
                    escape(*text)
                ));
            }
            Self::ConfigPersist => {
                xml.push_str("      <configPersist>\n      </configPersist>\n");
            }
        }

        xml.push_str(ENVELOPE_END);
        xml
    }
}

/// Render an exec request.
pub fn build_exec(
    command: &str,
    correlator: &str,
    format: Option<&str>,
    timeout: Duration,
    username: &str,
    password: &str,
) -> String {
    RequestTemplate::Exec {
        command,
        format,
        timeout,
    }
    .render(correlator, username, password)
}

/// Render a config-apply request.
pub fn build_config(
    text: &str,
    correlator: &str,
    action_on_fail: ActionOnFail,
    username: &str,
    password: &str,
) -> String {
    RequestTemplate::Config {
        text,
        action_on_fail,
    }
    .render(correlator, username, password)
}

/// Render a config-persist request.
pub fn build_config_persist(correlator: &str, username: &str, password: &str) -> String {
    RequestTemplate::ConfigPersist.render(correlator, username, password)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_secs(60);

    #[test]
    fn test_exec_without_format() {
        let xml = build_exec("show clock", "c-1", None, WAIT, "admin", "secret");
        assert!(xml.contains("<cmd>show clock</cmd>"));
        assert!(!xml.contains("format="));
        assert!(xml.contains(r#"<request xmlns="urn:cisco:wsma-exec" correlator="c-1">"#));
        assert!(xml.contains(r#"maxWait="PT60S""#));
    }

    #[test]
    fn test_exec_with_format() {
        let xml = build_exec(
            "show ip interface brief",
            "c-2",
            Some("built-in"),
            WAIT,
            "admin",
            "secret",
        );
        assert!(xml.contains(r#"<execCLI maxWait="PT60S" xsd="false" format="built-in">"#));
    }

    #[test]
    fn test_config_rollback_keeps_newlines() {
        let text = "ip access-list extended 101\n permit ip any any\nend";
        let xml = build_config(text, "c-3", ActionOnFail::Rollback, "admin", "secret");
        assert!(xml.contains(r#"action-on-fail="rollback""#));
        assert!(xml.contains(
            "<cli-config-data-block>ip access-list extended 101\n permit ip any any\nend</cli-config-data-block>"
        ));
        assert!(xml.contains(CONFIG_NAMESPACE));
    }

    #[test]
    fn test_config_default_action_is_stop() {
        let xml = build_config("hostname r1", "c", ActionOnFail::default(), "u", "p");
        assert!(xml.contains(r#"action-on-fail="stop""#));
    }

    #[test]
    fn test_persist_has_marker_only() {
        let xml = build_config_persist("c-4", "admin", "secret");
        assert!(xml.contains("<configPersist>"));
        assert!(!xml.contains("configApply"));
        assert!(!xml.contains("execCLI"));
    }

    #[test]
    fn test_escapes_metacharacters_everywhere() {
        let xml = build_exec(
            "show run | inc a<b & \"c\"",
            "0-1<&\"",
            Some("x\"y"),
            WAIT,
            "ad<min",
            "p&ss\"",
        );
        assert!(xml.contains("<wsse:Username>ad&lt;min</wsse:Username>"));
        assert!(xml.contains("<wsse:Password>p&amp;ss&quot;</wsse:Password>"));
        assert!(xml.contains(r#"correlator="0-1&lt;&amp;&quot;""#));
        assert!(xml.contains(r#"format="x&quot;y""#));
        assert!(xml.contains("<cmd>show run | inc a&lt;b &amp; &quot;c&quot;</cmd>"));

        let xml = build_config("a<b", "0-1<", ActionOnFail::Stop, "u&", "p<");
        assert!(xml.contains("<cli-config-data-block>a&lt;b</cli-config-data-block>"));
        assert!(xml.contains(r#"correlator="0-1&lt;""#));

        let xml = build_config_persist("\"", "u&", "p<");
        assert!(xml.contains(r#"correlator="&quot;""#));
        assert!(xml.contains("<wsse:Username>u&amp;</wsse:Username>"));
    }

    #[test]
    fn test_action_on_fail_from_str() {
        assert_eq!("Rollback".parse::<ActionOnFail>(), Ok(ActionOnFail::Rollback));
        assert_eq!("continue".parse::<ActionOnFail>(), Ok(ActionOnFail::Continue));
        assert!("abort".parse::<ActionOnFail>().is_err());
    }
}
