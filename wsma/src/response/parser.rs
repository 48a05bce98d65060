//! XML response parsing.
//!
//! The agent's answer is a SOAP document with a `response` element somewhere
//! inside the body. That element is converted into a nested JSON value:
//!
//! - attributes become keys prefixed with `@` (`@success`, `@xmlns`)
//! - child elements become keys by tag name; repeated children become arrays
//!   in document order
//! - text-only elements become strings, empty elements become `null`
//! - text next to attributes or children is kept under `#text`
//!
//! Surrounding whitespace of text is trimmed.

use indexmap::IndexMap;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::ParseError;

/// What to return when the document has no `response` element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParsePolicy {
    /// Fall back to the document element (the SOAP envelope).
    #[default]
    Lenient,
    /// Treat a missing `response` element as a parse error.
    Strict,
}

/// The `response` element (or fallback) as a nested JSON value.
///
/// The value is an object with a single key, the element's tag name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParsedResponse {
    root: Value,
}

impl ParsedResponse {
    /// Tag name of the converted element.
    pub fn root_name(&self) -> Option<&str> {
        self.root
            .as_object()
            .and_then(|map| map.keys().next())
            .map(String::as_str)
    }

    /// The converted element's content.
    pub fn body(&self) -> &Value {
        self.root
            .as_object()
            .and_then(|map| map.values().next())
            .unwrap_or(&Value::Null)
    }

    /// The `response` content, if this is a response and not a fallback.
    pub fn response(&self) -> Option<&Value> {
        self.root.get("response")
    }

    /// Attribute of the converted element.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.body().get(format!("@{name}")).and_then(Value::as_str)
    }

    /// Walk child keys from the converted element.
    pub fn pointer(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(self.body(), |value, key| value.get(key))
    }

    /// The whole mapping, including the root key.
    pub fn as_value(&self) -> &Value {
        &self.root
    }

    /// Consume into the whole mapping.
    pub fn into_value(self) -> Value {
        self.root
    }
}

/// Text content of a converted element: strings as-is, `null` as empty,
/// `#text` for elements that also carry attributes.
pub fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("#text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

/// Parse with the lenient policy.
pub fn parse(raw: &str) -> Result<ParsedResponse, ParseError> {
    parse_with(raw, ParsePolicy::Lenient)
}

/// Parse `raw` and convert its `response` element.
pub fn parse_with(raw: &str, policy: ParsePolicy) -> Result<ParsedResponse, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let document = build_tree(raw)?;
    let element = match document.find("response") {
        Some(response) => response,
        None if policy == ParsePolicy::Strict => return Err(ParseError::NoResponse),
        None => &document,
    };

    let mut root = Map::new();
    root.insert(element.name.clone(), element.to_value());
    Ok(ParsedResponse {
        root: Value::Object(root),
    })
}

#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, ParseError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ParseError::Malformed(e.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| ParseError::Malformed(e.to_string()))?
                .into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            ..Default::default()
        })
    }

    fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    /// Depth-first search by local tag name, self included.
    fn find(&self, local_name: &str) -> Option<&Element> {
        if self.local_name() == local_name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(local_name))
    }

    fn to_value(&self) -> Value {
        let text = self.text.trim();
        if self.attributes.is_empty() && self.children.is_empty() {
            return if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            };
        }

        let mut map = Map::new();
        for (key, value) in &self.attributes {
            map.insert(format!("@{key}"), Value::String(value.clone()));
        }

        let mut grouped: IndexMap<&str, Vec<Value>> = IndexMap::new();
        for child in &self.children {
            grouped
                .entry(child.name.as_str())
                .or_default()
                .push(child.to_value());
        }
        for (name, mut values) in grouped {
            let value = if values.len() == 1 {
                values.remove(0)
            } else {
                Value::Array(values)
            };
            map.insert(name.to_string(), value);
        }

        if !text.is_empty() {
            map.insert("#text".to_string(), Value::String(text.to_string()));
        }
        Value::Object(map)
    }
}

fn build_tree(raw: &str) -> Result<Element, ParseError> {
    let mut reader = Reader::from_str(raw);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            ParseError::Malformed(format!("{} at position {}", e, reader.error_position()))
        })?;

        match event {
            Event::Start(start) => {
                if root.is_some() {
                    return Err(junk_after_root());
                }
                stack.push(Element::from_start(&start)?);
            }
            Event::Empty(start) => {
                let element = Element::from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ParseError::Malformed("unmatched closing tag".to_string()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| ParseError::Malformed(e.to_string()))?;
                push_text(&mut stack, &text)?;
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data).into_owned();
                push_text(&mut stack, &text)?;
            }
            Event::Eof => break,
            // declaration, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ParseError::Malformed(format!(
            "unexpected end of document inside <{}>",
            open.name
        )));
    }
    root.ok_or_else(|| ParseError::Malformed("no element found".to_string()))
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_some() => return Err(junk_after_root()),
        None => *root = Some(element),
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => parent.text.push_str(text),
        None if text.trim().is_empty() => {}
        None => {
            return Err(ParseError::Malformed(
                "text outside the document element".to_string(),
            ));
        }
    }
    Ok(())
}

fn junk_after_root() -> ParseError {
    ParseError::Malformed("junk after document element".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ENVELOPE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<SOAP:Envelope xmlns:SOAP="http://schemas.xmlsoap.org/soap/envelope/">
  <SOAP:Body>
    <response xmlns="urn:cisco:wsma-exec" correlator="1-0" success="1">
      <execLog>
        <dialogueLog>
          <sent><cmd>show clock</cmd></sent>
          <received><text>*10:00:00 UTC Mon</text></received>
        </dialogueLog>
      </execLog>
    </response>
  </SOAP:Body>
</SOAP:Envelope>"#;

    #[test]
    fn test_finds_nested_response() {
        let parsed = parse(ENVELOPE).unwrap();
        assert_eq!(parsed.root_name(), Some("response"));
        assert_eq!(parsed.attribute("success"), Some("1"));
        assert_eq!(parsed.attribute("xmlns"), Some("urn:cisco:wsma-exec"));
        assert_eq!(
            parsed.pointer(&["execLog", "dialogueLog", "received", "text"]),
            Some(&json!("*10:00:00 UTC Mon"))
        );
    }

    #[test]
    fn test_attribute_and_child_do_not_collide() {
        let parsed = parse(r#"<response success="0"><success>yes</success></response>"#).unwrap();
        assert_eq!(
            parsed.response(),
            Some(&json!({"@success": "0", "success": "yes"}))
        );
    }

    #[test]
    fn test_repeated_children_become_array() {
        let parsed = parse(
            "<response><resultEntry>a</resultEntry><resultEntry>b</resultEntry></response>",
        )
        .unwrap();
        assert_eq!(parsed.pointer(&["resultEntry"]), Some(&json!(["a", "b"])));
    }

    #[test]
    fn test_empty_element_is_null_and_text_with_attributes() {
        let parsed = parse(r#"<response><text/><cmd line="1"> show </cmd></response>"#).unwrap();
        assert_eq!(parsed.pointer(&["text"]), Some(&Value::Null));
        assert_eq!(
            parsed.pointer(&["cmd"]),
            Some(&json!({"@line": "1", "#text": "show"}))
        );
        assert_eq!(text_of(parsed.pointer(&["cmd"]).unwrap()), "show");
        assert_eq!(text_of(&Value::Null), "");
    }

    #[test]
    fn test_entities_and_cdata_are_decoded() {
        let parsed =
            parse("<response><text>a &lt; b<![CDATA[ & <c>]]></text></response>").unwrap();
        assert_eq!(parsed.pointer(&["text"]), Some(&json!("a < b & <c>")));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(parse(""), Err(ParseError::Empty));
        assert_eq!(parse("  \n"), Err(ParseError::Empty));
    }

    #[test]
    fn test_not_xml() {
        assert!(matches!(parse("Bad Request"), Err(ParseError::Malformed(_))));
    }

    #[test]
    fn test_truncated_document() {
        let truncated = &ENVELOPE[..ENVELOPE.len() / 2];
        assert!(matches!(parse(truncated), Err(ParseError::Malformed(_))));
    }

    #[test]
    fn test_mismatched_tags() {
        assert!(matches!(
            parse("<response><a></b></response>"),
            Err(ParseError::Malformed(_))
        ));
    }

    #[test]
    fn test_missing_response_policies() {
        let doc = r#"<SOAP:Envelope xmlns:SOAP="x"><SOAP:Body><fault/></SOAP:Body></SOAP:Envelope>"#;

        let lenient = parse(doc).unwrap();
        assert_eq!(lenient.root_name(), Some("SOAP:Envelope"));
        assert!(lenient.response().is_none());

        assert_eq!(
            parse_with(doc, ParsePolicy::Strict),
            Err(ParseError::NoResponse)
        );
    }
}
