//! Outcome of one request: success flag, user-facing text and raw data.

use serde::Serialize;
use serde_json::Value;

use super::parser::{ParsedResponse, text_of};
use crate::error::{DeviceFailure, Error, ParseError, Result, SessionError};
use crate::request::{CONFIG_NAMESPACE, EXEC_NAMESPACE};

/// Output when the response carries no readable `success` attribute.
pub const UNKNOWN_ERROR: &str = "unknown error / key error";

/// Output of a successful config request; the agent echoes no text.
pub const CONFIG_APPLIED: &str = "config mode / not applicable";

/// Why an outcome is unsuccessful.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The request never got a response (socket, TLS, HTTP status, SSH).
    Transport,
    /// The response was empty, malformed or of an unknown shape.
    Parse(ParseError),
    /// The device rejected the command.
    Device,
}

/// Result of the latest exchange on a session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Outcome {
    /// Whether the device reported success.
    pub success: bool,

    /// Command output on success, error text on failure.
    pub output: String,

    /// The parsed response, when one was received.
    pub data: Option<ParsedResponse>,

    /// Failure classification; `None` on success.
    #[serde(skip)]
    pub failure: Option<FailureKind>,
}

impl Outcome {
    /// Create a successful outcome.
    pub fn succeeded(output: impl Into<String>, data: ParsedResponse) -> Self {
        Self {
            success: true,
            output: output.into(),
            data: Some(data),
            failure: None,
        }
    }

    /// Create a failed outcome.
    pub fn failed(
        kind: FailureKind,
        output: impl Into<String>,
        data: Option<ParsedResponse>,
    ) -> Self {
        Self {
            success: false,
            output: output.into(),
            data,
            failure: Some(kind),
        }
    }

    /// Outcome of an exchange that raised a transport-level error.
    pub fn from_error(err: &Error) -> Self {
        let kind = match err {
            Error::Parse(e) => FailureKind::Parse(e.clone()),
            Error::Device(_) => FailureKind::Device,
            _ => FailureKind::Transport,
        };
        Self::failed(kind, err.to_string(), None)
    }

    /// Check if the outcome indicates success.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Structured result of an exec issued with a format spec.
    pub fn format_result(&self) -> Option<&Value> {
        self.data
            .as_ref()?
            .pointer(&["execLog", "dialogueLog", "received", "tree"])
    }

    /// Get the output lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.output.lines()
    }

    /// Turn an unsuccessful outcome into the matching error.
    pub fn into_result(self) -> Result<Self> {
        match self.failure.clone() {
            None if self.success => Ok(self),
            Some(FailureKind::Parse(e)) => Err(e.into()),
            Some(FailureKind::Transport) => Err(SessionError::ExchangeFailed {
                message: self.output,
            }
            .into()),
            Some(FailureKind::Device) | None => Err(DeviceFailure {
                message: self.output,
            }
            .into()),
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.output)
    }
}

/// Decide success and extract the user-facing text of a parsed response.
pub fn classify(parsed: std::result::Result<ParsedResponse, ParseError>) -> Outcome {
    let parsed = match parsed {
        Ok(parsed) => parsed,
        Err(e) => {
            let output = e.to_string();
            return Outcome::failed(FailureKind::Parse(e), output, None);
        }
    };

    let Some(response) = parsed.response() else {
        return schema_failure(parsed, UNKNOWN_ERROR, "no response element");
    };

    let success = match response
        .get("@success")
        .and_then(Value::as_str)
        .and_then(|s| s.trim().parse::<i64>().ok())
    {
        Some(flag) => flag != 0,
        None => return schema_failure(parsed, UNKNOWN_ERROR, "missing success attribute"),
    };

    let namespace = response
        .get("@xmlns")
        .and_then(Value::as_str)
        .unwrap_or_default();

    match namespace {
        EXEC_NAMESPACE if success => {
            let text = lookup(response, &["execLog", "dialogueLog", "received", "text"])
                .map(text_of)
                .unwrap_or_default();
            Outcome::succeeded(text, parsed)
        }
        EXEC_NAMESPACE => {
            let message = lookup(response, &["execLog", "errorInfo", "errorMessage"])
                .map(text_of)
                .unwrap_or_else(|| UNKNOWN_ERROR.to_string());
            Outcome::failed(FailureKind::Device, message, Some(parsed))
        }
        CONFIG_NAMESPACE if success => Outcome::succeeded(CONFIG_APPLIED, parsed),
        CONFIG_NAMESPACE => {
            let message = first_failed_entry(response).unwrap_or_default();
            Outcome::failed(FailureKind::Device, message, Some(parsed))
        }
        other => {
            let detail = format!("unexpected response namespace '{other}'");
            schema_failure(parsed, detail.clone(), &detail)
        }
    }
}

fn schema_failure(parsed: ParsedResponse, output: impl Into<String>, detail: &str) -> Outcome {
    Outcome::failed(
        FailureKind::Parse(ParseError::Schema(detail.to_string())),
        output,
        Some(parsed),
    )
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |value, key| value.get(key))
}

/// Text of the first result entry flagged as a failure, in document order.
fn first_failed_entry(response: &Value) -> Option<String> {
    let entries = match response.get("resultEntry")? {
        Value::Array(entries) => entries.iter().collect::<Vec<_>>(),
        single => vec![single],
    };

    entries
        .into_iter()
        .find(|entry| entry.get("failure").is_some())
        .map(entry_text)
}

fn entry_text(entry: &Value) -> String {
    if let Some(text) = entry.get("text") {
        return text_of(text);
    }
    match entry.get("failure") {
        Some(failure @ Value::String(_)) => text_of(failure),
        Some(failure) => failure.get("text").map(text_of).unwrap_or_default(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::parse;

    fn exec_response(success: &str, body: &str) -> String {
        format!(
            r#"<SOAP:Envelope xmlns:SOAP="http://schemas.xmlsoap.org/soap/envelope/"><SOAP:Body>
<response xmlns="urn:cisco:wsma-exec" correlator="1-0" success="{success}">{body}</response>
</SOAP:Body></SOAP:Envelope>"#
        )
    }

    fn config_response(success: &str, body: &str) -> String {
        format!(
            r#"<SOAP:Envelope xmlns:SOAP="http://schemas.xmlsoap.org/soap/envelope/"><SOAP:Body>
<response xmlns="urn:cisco:wsma-config" correlator="1-0" success="{success}">{body}</response>
</SOAP:Body></SOAP:Envelope>"#
        )
    }

    #[test]
    fn test_exec_success() {
        let xml = exec_response(
            "1",
            "<execLog><dialogueLog><received><text>Router uptime is 3 days</text></received></dialogueLog></execLog>",
        );
        let outcome = classify(parse(&xml));
        assert!(outcome.success);
        assert_eq!(outcome.output, "Router uptime is 3 days");
        assert!(outcome.failure.is_none());
        assert!(outcome.into_result().is_ok());
    }

    #[test]
    fn test_exec_success_with_empty_text() {
        let xml = exec_response(
            "1",
            "<execLog><dialogueLog><received><text/></received></dialogueLog></execLog>",
        );
        let outcome = classify(parse(&xml));
        assert!(outcome.success);
        assert_eq!(outcome.output, "");

        let outcome = classify(parse(&exec_response("1", "<execLog/>")));
        assert!(outcome.success);
        assert_eq!(outcome.output, "");
    }

    #[test]
    fn test_exec_failure() {
        let xml = exec_response(
            "0",
            "<execLog><errorInfo><errorMessage>% Invalid input</errorMessage></errorInfo></execLog>",
        );
        let outcome = classify(parse(&xml));
        assert!(!outcome.success);
        assert_eq!(outcome.output, "% Invalid input");
        assert_eq!(outcome.failure, Some(FailureKind::Device));
        assert!(matches!(outcome.into_result(), Err(Error::Device(_))));
    }

    #[test]
    fn test_config_success() {
        let outcome = classify(parse(&config_response("1", "<resultEntry><success/></resultEntry>")));
        assert!(outcome.success);
        assert_eq!(outcome.output, CONFIG_APPLIED);
    }

    #[test]
    fn test_config_reports_first_flagged_entry() {
        let xml = config_response(
            "0",
            r#"<resultEntry lineNumber="1"><success/><text>interface Loopback99</text></resultEntry>
<resultEntry lineNumber="2"><failure>1</failure><text>% Invalid input detected</text></resultEntry>
<resultEntry lineNumber="3"><success/><text>end</text></resultEntry>"#,
        );
        let outcome = classify(parse(&xml));
        assert!(!outcome.success);
        assert_eq!(outcome.output, "% Invalid input detected");
    }

    #[test]
    fn test_config_single_entry_and_nested_failure_text() {
        let xml = config_response(
            "0",
            r#"<resultEntry lineNumber="1" cliString="ebd"><failure><errorType>SYNTAX</errorType><text>% ebd</text></failure></resultEntry>"#,
        );
        let outcome = classify(parse(&xml));
        assert!(!outcome.success);
        assert_eq!(outcome.output, "% ebd");
    }

    #[test]
    fn test_config_failure_without_flagged_entry() {
        let xml = config_response("0", "<resultEntry><success/><text>end</text></resultEntry>");
        let outcome = classify(parse(&xml));
        assert!(!outcome.success);
        assert_eq!(outcome.output, "");
    }

    #[test]
    fn test_missing_success_attribute() {
        let xml = r#"<response xmlns="urn:cisco:wsma-exec"><execLog/></response>"#;
        let outcome = classify(parse(xml));
        assert!(!outcome.success);
        assert_eq!(outcome.output, UNKNOWN_ERROR);
        assert!(matches!(
            outcome.failure,
            Some(FailureKind::Parse(ParseError::Schema(_)))
        ));
    }

    #[test]
    fn test_unknown_namespace() {
        let xml = r#"<response xmlns="urn:example:other" success="1"/>"#;
        let outcome = classify(parse(xml));
        assert!(!outcome.success);
        assert!(outcome.output.contains("urn:example:other"));
    }

    #[test]
    fn test_parse_errors_become_failed_outcomes() {
        let outcome = classify(parse(""));
        assert!(!outcome.success);
        assert_eq!(outcome.output, "XML body is empty");
        assert!(outcome.data.is_none());

        let outcome = classify(parse("<html><body>oops"));
        assert!(!outcome.success);
        assert!(matches!(outcome.into_result(), Err(Error::Parse(_))));
    }

    #[test]
    fn test_format_result() {
        let xml = exec_response(
            "1",
            r#"<execLog><dialogueLog><received><text/><tree><ShowIpInterfaceBrief><IPInterfaces>
<entry><Interface>GigabitEthernet1</Interface><IP-Address>10.0.0.1</IP-Address></entry>
</IPInterfaces></ShowIpInterfaceBrief></tree></received></dialogueLog></execLog>"#,
        );
        let outcome = classify(parse(&xml));
        assert!(outcome.success);
        let tree = outcome.format_result().unwrap();
        assert_eq!(
            tree["ShowIpInterfaceBrief"]["IPInterfaces"]["entry"]["IP-Address"],
            "10.0.0.1"
        );
    }
}
