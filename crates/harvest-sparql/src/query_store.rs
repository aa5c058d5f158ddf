//! Named query templates
//!
//! The table is built once at startup and shared by reference. Templates use
//! `{{name}}` placeholders; values are substituted verbatim, so callers
//! escape them with the helpers in [`crate::escape`] first.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::StoreError;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern")
});

/// Immutable name → template table
#[derive(Debug, Clone, Default)]
pub struct QueryStore {
    templates: Arc<HashMap<String, String>>,
}

impl QueryStore {
    /// Build from `(name, template)` pairs
    pub fn from_templates<'a>(templates: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self {
            templates: Arc::new(
                templates
                    .into_iter()
                    .map(|(name, body)| (name.to_string(), body.to_string()))
                    .collect(),
            ),
        }
    }

    /// Copy of this table where every `*.sparql` file in `dir` replaces the
    /// template named after the file stem.
    pub fn with_overrides(&self, dir: &Path) -> Result<Self, StoreError> {
        let mut templates = (*self.templates).clone();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("sparql") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            tracing::info!(template = name, path = %path.display(), "overriding query template");
            templates.insert(name.to_string(), std::fs::read_to_string(&path)?);
        }
        Ok(Self {
            templates: Arc::new(templates),
        })
    }

    /// Raw template text
    pub fn template(&self, name: &str) -> Result<&str, StoreError> {
        self.templates
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| StoreError::UnknownTemplate(name.to_string()))
    }

    /// True when a template with that name exists
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    /// Render a template, failing on any unbound placeholder
    pub fn render(&self, name: &str, params: &[(&str, &str)]) -> Result<String, StoreError> {
        let template = self.template(name)?;
        let mut missing = None;
        let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
            let key = &caps[1];
            match params.iter().find(|(k, _)| *k == key) {
                Some((_, value)) => (*value).to_string(),
                None => {
                    missing.get_or_insert_with(|| key.to_string());
                    String::new()
                }
            }
        });
        match missing {
            Some(parameter) => Err(StoreError::MissingParameter {
                template: name.to_string(),
                parameter,
            }),
            None => Ok(rendered.into_owned()),
        }
    }
}
