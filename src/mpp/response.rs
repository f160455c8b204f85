use crate::prelude::*;
use crate::mpp::crc;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Int,
    Float,
    String,
    Flags,
    Option,
    Ack,
}

/// `[type, name, extra]` where extra is a unit string, a list of flag/option names, or an
/// ack lookup table depending on the type.
#[derive(Clone, Debug, Deserialize)]
pub struct FieldDefinition(pub FieldType, pub String, pub serde_json::Value);

impl FieldDefinition {
    fn unit(&self) -> String {
        self.2.as_str().unwrap_or_default().to_string()
    }

    fn names(&self) -> Vec<&str> {
        self.2
            .as_array()
            .map(|a| a.iter().map(|v| v.as_str().unwrap_or_default()).collect())
            .unwrap_or_default()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Flag(bool),
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "{}", v),
            Value::Flag(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    pub key: String,
    pub value: Value,
    pub unit: String,
}

/// "AC Input Voltage" -> "ac_input_voltage"
pub fn field_key(name: &str) -> String {
    name.to_lowercase().replace(' ', "_")
}

/// Splits a checked `(<data><crc><cr>` reply into fields according to `definitions`.
pub fn parse(definitions: &[FieldDefinition], response: &[u8]) -> Result<Vec<Field>> {
    if response.first() != Some(&b'(') || !response.ends_with(b"\r") {
        bail!("response is not framed: {:?}", String::from_utf8_lossy(response));
    }
    if !crc::verify(response) {
        bail!("response checksum mismatch: {:?}", String::from_utf8_lossy(response));
    }

    let data: String = response[1..response.len() - 3]
        .iter()
        .map(|&b| b as char)
        .collect();

    let mut fields = Vec::new();
    for (definition, token) in definitions.iter().zip(data.split_whitespace()) {
        parse_token(definition, token, &mut fields);
    }

    Ok(fields)
}

fn parse_token(definition: &FieldDefinition, token: &str, fields: &mut Vec<Field>) {
    let FieldDefinition(kind, name, extra) = definition;
    let text = || Value::Text(token.to_string());

    let value = match kind {
        FieldType::Int => token.parse().map(Value::Int).unwrap_or_else(|_| text()),
        FieldType::Float => token.parse().map(Value::Float).unwrap_or_else(|_| text()),
        FieldType::String => text(),
        FieldType::Option => token
            .parse::<usize>()
            .ok()
            .and_then(|i| definition.names().get(i).map(|s| Value::Text(s.to_string())))
            .unwrap_or_else(text),
        FieldType::Ack => extra
            .get(token)
            .and_then(|v| v.as_str())
            .map(|s| Value::Text(s.to_string()))
            .unwrap_or_else(text),
        FieldType::Flags => {
            for (name, bit) in definition.names().into_iter().zip(token.chars()) {
                if name.is_empty() {
                    continue;
                }
                fields.push(Field {
                    key: field_key(name),
                    value: Value::Flag(bit == '1'),
                    unit: String::new(),
                });
            }
            return;
        }
    };

    let unit = match kind {
        FieldType::Int | FieldType::Float | FieldType::String => definition.unit(),
        _ => String::new(),
    };

    fields.push(Field {
        key: field_key(name),
        value,
        unit,
    });
}
