use crate::prelude::*;
use crate::mpp::response::FieldDefinition;

use regex::Regex;
use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommandKind {
    Query,
    Setter,
}

/// One command the inverter understands, as described by a catalog file.
///
/// Descriptors are immutable once loaded. Anything that varies per call (the bound
/// parameter, the bytes the device sent back) lives in
/// [`ResolvedCommand`](crate::mpp::resolver::ResolvedCommand) and
/// [`Execution`](crate::transport::Execution).
#[derive(Clone, Debug, Deserialize)]
pub struct CommandDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: CommandKind,
    #[serde(default)]
    pub help: String,
    #[serde(rename = "response")]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    test_responses: Vec<String>,
    #[serde(rename = "regex", default, deserialize_with = "de_pattern")]
    pattern: Option<Regex>,
}

impl CommandDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    pub fn is_parameterized(&self) -> bool {
        self.pattern.is_some()
    }

    /// Canned reply used by the TEST transport. Always the first entry, so repeated test
    /// executions agree.
    pub fn test_response(&self) -> Option<Vec<u8>> {
        self.test_responses.first().map(|r| latin1_bytes(r))
    }

    pub fn test_responses(&self) -> &[String] {
        &self.test_responses
    }
}

impl std::fmt::Display for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.name, self.description)?;
        if !self.help.is_empty() {
            write!(f, "\n{}", self.help)?;
        }
        Ok(())
    }
}

// catalog strings hold raw bytes as U+0000..U+00FF; anything wider is kept as utf-8
fn latin1_bytes(s: &str) -> Vec<u8> {
    if s.chars().all(|c| (c as u32) <= 0xff) {
        s.chars().map(|c| c as u32 as u8).collect()
    } else {
        s.as_bytes().to_vec()
    }
}

fn de_pattern<'de, D>(deserializer: D) -> Result<Option<Regex>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
    if s.is_empty() {
        return Ok(None);
    }

    let regex = Regex::new(&s).map_err(serde::de::Error::custom)?;
    // group 0 is the whole match, so one capture group means two slots
    if regex.captures_len() != 2 {
        return Err(serde::de::Error::custom(format!(
            "pattern {} must have exactly one capture group",
            s
        )));
    }

    Ok(Some(regex))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> serde_json::Result<CommandDescriptor> {
        serde_json::from_str(json)
    }

    #[test]
    fn exact_command_has_no_pattern() {
        let cmd = parse(
            r#"{"name": "QPI", "description": "Protocol", "type": "QUERY",
                "response": [["string", "Protocol Id", ""]],
                "test_responses": ["(PI30\u009a\u000b\r"], "regex": ""}"#,
        )
        .unwrap();

        assert_eq!(cmd.kind, CommandKind::Query);
        assert!(!cmd.is_parameterized());
        assert_eq!(cmd.test_response().unwrap(), b"(PI30\x9a\x0b\r".to_vec());
    }

    #[test]
    fn missing_regex_and_help_default() {
        let cmd = parse(
            r#"{"name": "QMOD", "description": "Mode", "type": "QUERY", "response": []}"#,
        )
        .unwrap();

        assert!(cmd.pattern().is_none());
        assert_eq!(cmd.help, "");
        assert_eq!(cmd.test_response(), None);
    }

    #[test]
    fn pattern_needs_one_group() {
        let err = parse(
            r#"{"name": "POP", "description": "x", "type": "SETTER", "response": [],
                "regex": "POP0[012]$"}"#,
        );
        assert!(err.is_err());

        let cmd = parse(
            r#"{"name": "POP", "description": "x", "type": "SETTER", "response": [],
                "regex": "POP(0[012])$"}"#,
        )
        .unwrap();
        assert!(cmd.is_parameterized());
    }
}
