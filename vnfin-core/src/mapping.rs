//! Account-name mapping — raw (as-reported) labels to canonical labels.
//!
//! The mapping lives in an external JSON file maintained by hand:
//! a flat object from raw label to canonical label. It is loaded once at
//! startup into an immutable table; lookups are a pure function with an
//! explicit unmapped result, so gaps in the mapping stay visible instead of
//! silently dropping data.

use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("failed to read mapping file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse mapping file '{path}': {message}")]
    Parse { path: String, message: String },
}

/// Result of looking up a raw account label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelLookup<'a> {
    /// The raw label has a canonical form.
    Canonical(&'a str),
    /// The raw label is not in the mapping; callers pass it through flagged.
    Unmapped,
}

/// Immutable raw-label → canonical-label table.
#[derive(Debug, Clone, Default)]
pub struct AccountMap {
    entries: HashMap<String, String>,
}

impl AccountMap {
    /// Load the mapping from a JSON file: `{ "<raw label>": "<canonical>" }`.
    pub fn from_file(path: &Path) -> Result<Self, MappingError> {
        let content = std::fs::read_to_string(path).map_err(|source| MappingError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content).map_err(|message| MappingError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    /// Parse a mapping from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, String> {
        let value: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
        let object = value
            .as_object()
            .ok_or_else(|| "mapping root must be a JSON object".to_string())?;

        let mut entries = HashMap::with_capacity(object.len());
        for (raw, canonical) in object {
            let canonical = canonical
                .as_str()
                .ok_or_else(|| format!("mapping value for '{raw}' must be a string"))?;
            entries.insert(raw.clone(), canonical.to_string());
        }
        Ok(Self { entries })
    }

    /// Build a mapping directly (tests, embedding).
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a raw label.
    pub fn resolve(&self, raw: &str) -> LabelLookup<'_> {
        match self.entries.get(raw) {
            Some(canonical) => LabelLookup::Canonical(canonical),
            None => LabelLookup::Unmapped,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
