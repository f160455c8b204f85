use crate::prelude::*;

use std::path::Path;

// Compiled-in command set, one entry per file under commands/.
const BUNDLED: &[(&str, &str)] = &[
    ("PBCV.json", include_str!("../../commands/PBCV.json")),
    ("POP.json", include_str!("../../commands/POP.json")),
    ("Q1.json", include_str!("../../commands/Q1.json")),
    ("QID.json", include_str!("../../commands/QID.json")),
    ("QMOD.json", include_str!("../../commands/QMOD.json")),
    ("QPI.json", include_str!("../../commands/QPI.json")),
    ("QPIGS.json", include_str!("../../commands/QPIGS.json")),
    ("QVFW.json", include_str!("../../commands/QVFW.json")),
];

/// Ordered list of known commands.
///
/// Order matters: resolution takes the first match, so sources are always sorted by file
/// name before parsing.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    commands: Vec<Arc<CommandDescriptor>>,
}

impl Catalog {
    pub fn new(commands: Vec<CommandDescriptor>) -> Self {
        Self {
            commands: commands.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn bundled() -> Self {
        Self::from_sources(BUNDLED.iter().copied())
    }

    /// Reads every `*.json` file in `dir`.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("error reading command directory {}", dir.display()))?
        {
            let path = entry?.path();
            if path.extension().map_or(false, |e| e == "json") {
                files.push(path);
            }
        }
        files.sort();

        let mut sources = Vec::with_capacity(files.len());
        for file in files {
            debug!("Loading command information from {}", file.display());
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("error reading {}", file.display()))?;
            sources.push((file.display().to_string(), content));
        }

        let catalog = Self::from_sources(sources.iter().map(|(n, c)| (n.as_str(), c.as_str())));
        info!("Loaded {} commands from {}", catalog.len(), dir.display());
        Ok(catalog)
    }

    /// Builds a catalog from `(file name, json)` pairs. Entries that fail to parse are
    /// logged and skipped.
    pub fn from_sources<'a, I>(sources: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut sources: Vec<_> = sources.into_iter().collect();
        sources.sort_by(|a, b| a.0.cmp(b.0));

        let mut commands = Vec::new();
        for (name, json) in sources {
            match serde_json::from_str::<CommandDescriptor>(json) {
                Ok(command) => commands.push(command),
                Err(e) => warn!("Error processing JSON in {}: {}", name, e),
            }
        }

        Self::new(commands)
    }

    pub fn commands(&self) -> &[Arc<CommandDescriptor>] {
        &self.commands
    }

    pub fn get(&self, name: &str) -> Option<&Arc<CommandDescriptor>> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
