//! Section definitions and the on-disk catalog
//!
//! A section is one named, self-contained unit of configuration output
//! (NTP, syslog, ...) defined by a TOML file: declared required/optional
//! variables, typed defaults, and a template body. Bodies are parsed into
//! the template AST once at load time and shared read-only afterwards.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::inventory::Value;
use crate::template::{parse, TemplateBody};

/// Documented default ordering. Order matters: configs are assembled in
/// this sequence, and operators rely on it (e.g. VLANs before interfaces
/// that reference them). Sections not listed here sort after, by name.
pub const DEFAULT_SECTION_ORDER: &[&str] =
    &["system", "interfaces", "ntp", "syslog", "tacacs", "snmpv3"];

/// One named configuration section, immutable once loaded
#[derive(Debug, Clone)]
pub struct SectionDefinition {
    pub name: String,
    pub description: Option<String>,
    /// Variables that must be supplied by the device record or overrides
    pub requires: Vec<String>,
    /// Declared variables with no default; absent unless supplied
    pub optional: Vec<String>,
    /// Declared variables with a default value
    pub defaults: BTreeMap<String, Value>,
    pub body: TemplateBody,
}

/// TOML structure for deserializing section files
#[derive(Deserialize)]
struct TomlSection {
    description: Option<String>,
    #[serde(default)]
    requires: Vec<String>,
    #[serde(default)]
    optional: Vec<String>,
    body: String,
    #[serde(default)]
    defaults: toml::Table,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read section directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read section file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse section '{section}': {source}")]
    Toml {
        section: String,
        source: toml::de::Error,
    },

    #[error("template errors in section '{section}':\n{report}")]
    Template { section: String, report: String },

    #[error("no section definitions (*.toml) found in {path}")]
    Empty { path: PathBuf },

    #[error("unknown section '{requested}' (available: {available})")]
    UnknownSection {
        requested: String,
        available: String,
    },
}

impl SectionDefinition {
    /// Parse one section definition from TOML content
    pub fn from_toml_str(name: &str, content: &str) -> Result<Self, CatalogError> {
        let parsed: TomlSection = toml::from_str(content).map_err(|source| CatalogError::Toml {
            section: name.to_string(),
            source,
        })?;

        let body = parse(&parsed.body).map_err(|errs| CatalogError::Template {
            section: name.to_string(),
            report: errs
                .iter()
                .map(|e| e.format(&parsed.body, &format!("{name}.toml")))
                .collect::<Vec<_>>()
                .join("\n"),
        })?;

        Ok(SectionDefinition {
            name: name.to_string(),
            description: parsed.description,
            requires: parsed.requires,
            optional: parsed.optional,
            defaults: parsed
                .defaults
                .into_iter()
                .map(|(k, v)| (k, Value::from_toml(v)))
                .collect(),
            body,
        })
    }

    /// Whether a variable name is declared by this section
    pub fn declares(&self, name: &str) -> bool {
        self.requires.iter().any(|r| r == name)
            || self.optional.iter().any(|o| o == name)
            || self.defaults.contains_key(name)
    }
}

/// The fixed set of named sections available to a run
#[derive(Debug, Clone, Default)]
pub struct SectionCatalog {
    sections: BTreeMap<String, SectionDefinition>,
}

impl SectionCatalog {
    /// Load every `*.toml` file in a directory; the file stem is the
    /// section name.
    pub fn load_dir(path: &Path) -> Result<Self, CatalogError> {
        let entries = std::fs::read_dir(path).map_err(|source| CatalogError::ReadDir {
            path: path.to_path_buf(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        files.sort();

        let mut sections = BTreeMap::new();
        for file in files {
            let name = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let content =
                std::fs::read_to_string(&file).map_err(|source| CatalogError::ReadFile {
                    path: file.clone(),
                    source,
                })?;
            let definition = SectionDefinition::from_toml_str(&name, &content)?;
            debug!("loaded section '{name}' from {}", file.display());
            sections.insert(name, definition);
        }

        if sections.is_empty() {
            return Err(CatalogError::Empty {
                path: path.to_path_buf(),
            });
        }

        Ok(Self { sections })
    }

    /// Build a catalog from already-parsed definitions
    pub fn from_sections(definitions: Vec<SectionDefinition>) -> Self {
        Self {
            sections: definitions
                .into_iter()
                .map(|d| (d.name.clone(), d))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SectionDefinition> {
        self.sections.get(name)
    }

    /// Section names, sorted
    pub fn names(&self) -> Vec<&str> {
        self.sections.keys().map(|k| k.as_str()).collect()
    }

    /// All sections in the documented default order; sections not in
    /// `DEFAULT_SECTION_ORDER` follow alphabetically.
    pub fn default_order(&self) -> Vec<&SectionDefinition> {
        let mut ordered: Vec<&SectionDefinition> = DEFAULT_SECTION_ORDER
            .iter()
            .filter_map(|name| self.sections.get(*name))
            .collect();
        ordered.extend(
            self.sections
                .values()
                .filter(|s| !DEFAULT_SECTION_ORDER.contains(&s.name.as_str())),
        );
        ordered
    }

    /// Resolve a requested subset/ordering, or the default order. The
    /// requested order is honored verbatim.
    pub fn select(
        &self,
        requested: Option<&[String]>,
    ) -> Result<Vec<&SectionDefinition>, CatalogError> {
        match requested {
            None => Ok(self.default_order()),
            Some(names) => names
                .iter()
                .map(|name| {
                    self.get(name).ok_or_else(|| CatalogError::UnknownSection {
                        requested: name.clone(),
                        available: self.names().join(", "),
                    })
                })
                .collect(),
        }
    }
}
