use crate::prelude::*;
use crate::mpp::{crc, response};

/// A catalog entry matched against requested text, with its parameter bound.
#[derive(Clone, Debug)]
pub struct ResolvedCommand {
    descriptor: Arc<CommandDescriptor>,
    value: Option<String>,
}

impl ResolvedCommand {
    pub fn new(descriptor: Arc<CommandDescriptor>, value: Option<String>) -> Self {
        Self { descriptor, value }
    }

    pub fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Command as the device expects it, without checksum: `QPIGS`, `PBCV52.0`.
    pub fn command_text(&self) -> String {
        match &self.value {
            Some(value) => format!("{}{}", self.descriptor.name, value),
            None => self.descriptor.name.clone(),
        }
    }

    /// Text + checksum + CR, ready for the serial and hidraw transports.
    pub fn full_command(&self) -> Vec<u8> {
        let mut bytes = self.command_text().into_bytes();
        let sum = crc::checksum(&bytes);
        bytes.extend_from_slice(&sum);
        bytes.push(b'\r');
        bytes
    }

    pub fn parse(&self, response: &[u8]) -> Result<Vec<response::Field>> {
        response::parse(&self.descriptor.fields, response)
    }
}

impl std::fmt::Display for ResolvedCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command_text())
    }
}

/// Finds the descriptor for `text`.
///
/// Plain commands are compared exactly first; only then are patterns tried, each anchored
/// at the start of `text`. Within a pass the first catalog entry wins.
pub fn resolve(catalog: &Catalog, text: &str) -> Option<ResolvedCommand> {
    debug!("Searching for cmd '{}'", text);

    if let Some(command) = catalog
        .commands()
        .iter()
        .find(|c| !c.is_parameterized() && c.name == text)
    {
        return Some(ResolvedCommand::new(command.clone(), None));
    }

    for command in catalog.commands() {
        let Some(pattern) = command.pattern() else {
            continue;
        };
        let Some(captures) = pattern.captures(text) else {
            continue;
        };
        // leftmost search: if any match starts at 0, this one does
        if captures.get(0).map_or(true, |m| m.start() != 0) {
            continue;
        }

        let value = captures.get(1).map(|m| m.as_str().to_string());
        debug!("Matched: {} Value: {:?}", command.name, value);
        return Some(ResolvedCommand::new(command.clone(), value));
    }

    None
}

impl Catalog {
    pub fn resolve(&self, text: &str) -> Option<ResolvedCommand> {
        resolve(self, text)
    }
}
