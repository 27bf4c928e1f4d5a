// Copyright The Observix Authors
// SPDX-License-Identifier: Apache-2.0

//! Normalization profiles.
//!
//! A profile turns one raw line into one structured document. `json_auto`
//! is built in; additional profiles are file-defined under `profiles_dir`,
//! one YAML file per profile, registered under the file stem.

use crate::error::Error;
use observix_model::api::Doc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// The behavior a profile applies per line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    /// Parse the line as a JSON object; on success merge its fields next to
    /// `raw`, on failure pass the line through unchanged.
    JsonAuto,
    /// Pass every line through unchanged.
    Passthrough,
}

impl ProfileKind {
    /// Normalizes a single line into a document. The original line is
    /// always preserved under `raw`.
    #[must_use]
    pub fn normalize_line(self, line: &str) -> Doc {
        match self {
            ProfileKind::JsonAuto => json_auto(line),
            ProfileKind::Passthrough => Doc::passthrough(line),
        }
    }
}

fn json_auto(line: &str) -> Doc {
    let mut doc = Doc::passthrough(line);
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(line) {
        doc.fields = map.into_iter().collect();
        // `raw` is reserved for the original line.
        let _ = doc.fields.remove("raw");
    }
    doc
}

/// A file-defined profile: `profiles_dir/<name>.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileFile {
    /// The built-in behavior this profile maps to.
    kind: ProfileKind,
}

/// Registry of named profiles.
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: HashMap<String, ProfileKind>,
}

impl ProfileRegistry {
    /// Creates a registry holding the built-in profiles.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut profiles = HashMap::new();
        let _ = profiles.insert("json_auto".to_owned(), ProfileKind::JsonAuto);
        Self { profiles }
    }

    /// Registers every `*.yaml`/`*.yml` profile definition under `dir`.
    pub fn load_dir(&mut self, dir: &Path) -> Result<(), Error> {
        let entries = std::fs::read_dir(dir).map_err(|e| Error::ProfileLoad {
            path: dir.to_path_buf(),
            details: e.to_string(),
        })?;
        for entry in entries {
            let path = entry
                .map_err(|e| Error::ProfileLoad {
                    path: dir.to_path_buf(),
                    details: e.to_string(),
                })?
                .path();
            let is_yaml = path
                .extension()
                .is_some_and(|ext| ext == "yaml" || ext == "yml");
            if !is_yaml {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let contents = std::fs::read_to_string(&path).map_err(|e| Error::ProfileLoad {
                path: path.clone(),
                details: e.to_string(),
            })?;
            let def: ProfileFile =
                serde_yaml::from_str(&contents).map_err(|e| Error::ProfileLoad {
                    path: path.clone(),
                    details: e.to_string(),
                })?;
            let _ = self.profiles.insert(name.to_owned(), def.kind);
        }
        Ok(())
    }

    /// Looks up a profile by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<ProfileKind> {
        self.profiles.get(name).copied()
    }

    /// The registered profile names, for startup logging.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }
}
