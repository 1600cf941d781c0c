//! Dataset label loading.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

pub const LANGUAGES_FILE: &str = "languages.txt";

/// Language labels keyed by row ID: line `i` names language `i`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageNames {
    names: Vec<String>,
}

impl LanguageNames {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn get(&self, id: u64) -> Option<&str> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.names.get(i))
            .map(String::as_str)
    }

    /// The label for `id`, or `#<id>` when the dataset has none.
    pub fn label(&self, id: u64) -> String {
        match self.get(id) {
            Some(name) => name.to_string(),
            None => format!("#{id}"),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

pub fn load_language_names(dataset: &Path) -> Result<LanguageNames> {
    let path = dataset.join(LANGUAGES_FILE);
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read language names from {}", path.display()))?;
    let names: Vec<String> = text
        .lines()
        .map(|line| line.trim_end_matches('\r').to_string())
        .collect();
    tracing::debug!(path = %path.display(), count = names.len(), "loaded language names");
    Ok(LanguageNames::new(names))
}
