//! Composition Engine: per-device document assembly
//!
//! Runs resolve + render for each selected section in order and
//! concatenates the results under a generated document header. A failure
//! in any section aborts the whole device's composition: a partial switch
//! configuration is worse than none.

use std::collections::BTreeMap;

use chrono::Local;
use thiserror::Error;

use crate::inventory::{DeviceRecord, Value};
use crate::render::{render, RenderError};
use crate::resolve::{resolve, ResolveError};
use crate::section::SectionDefinition;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const HEADER_RULE: &str = "# ============================================================";

/// Options shared by every composition in one run
#[derive(Debug, Clone)]
pub struct ComposeOptions {
    /// Timestamp written into the document header. Supplied explicitly so
    /// identical inputs produce byte-identical output.
    pub generated_at: String,
}

impl ComposeOptions {
    /// Stamp documents with the current local time
    pub fn now() -> Self {
        Self {
            generated_at: Local::now().format(TIMESTAMP_FORMAT).to_string(),
        }
    }

    /// Stamp documents with a fixed timestamp (reproducible output)
    pub fn at(generated_at: impl Into<String>) -> Self {
        Self {
            generated_at: generated_at.into(),
        }
    }
}

/// The full configuration text for one device
#[derive(Debug, Clone)]
pub struct ComposedDocument {
    pub serial: String,
    pub text: String,
}

#[derive(Debug, Error)]
#[error("section '{section}': {source}")]
pub struct ComposeError {
    pub section: String,
    #[source]
    pub source: SectionError,
}

#[derive(Debug, Error)]
pub enum SectionError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Compose one device's document from the given sections, in the given
/// order (honored verbatim).
pub fn compose(
    device: &DeviceRecord,
    sections: &[&SectionDefinition],
    overrides: &BTreeMap<String, Value>,
    options: &ComposeOptions,
) -> Result<ComposedDocument, ComposeError> {
    let serial = device.serial().unwrap_or_default().to_string();

    let mut lines: Vec<String> = vec![
        HEADER_RULE.to_string(),
        format!("# Device   : {serial}"),
        format!("# Host     : {}", device.hostname().unwrap_or("N/A")),
        format!("# Generated: {}", options.generated_at),
        HEADER_RULE.to_string(),
    ];

    for section in sections {
        let wrap = |source: SectionError| ComposeError {
            section: section.name.clone(),
            source,
        };
        let ctx = resolve(device, section, overrides).map_err(|e| wrap(e.into()))?;
        let rendered = render(section, &ctx).map_err(|e| wrap(e.into()))?;

        lines.push(String::new());
        lines.push(format!("# --- {} ---", section.name));
        lines.extend(rendered);
    }

    let mut text = lines.join("\n");
    text.push('\n');

    Ok(ComposedDocument { serial, text })
}
