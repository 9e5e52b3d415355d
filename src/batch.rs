//! Batch Driver & Output Writer
//!
//! Iterates devices in input order, composes each one, and writes (or
//! previews) the result. A failure for one device is recorded and the
//! batch continues: a single bad inventory row must never abort
//! generation for the rest of the fleet.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{error, info};

use crate::compose::{compose, ComposeError, ComposeOptions};
use crate::inventory::{DeviceRecord, Value};
use crate::section::SectionDefinition;

pub const DEFAULT_EXTENSION: &str = "cfg";

/// How output filenames are derived. Both conventions are in operational
/// use, so the choice is explicit configuration.
#[derive(Debug, Clone)]
pub enum NamingPolicy {
    /// `<sanitized-serial>.<extension>`
    Serial { extension: String },
    /// `<sanitized-hostname>_<sanitized-serial>_config.txt`
    HostnameSerial,
}

impl Default for NamingPolicy {
    fn default() -> Self {
        NamingPolicy::Serial {
            extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl NamingPolicy {
    pub fn filename(&self, device: &DeviceRecord) -> Result<String, DeviceError> {
        let serial = sanitize_identifier(device.serial().unwrap_or_default());
        match self {
            NamingPolicy::Serial { extension } => Ok(format!("{serial}.{extension}")),
            NamingPolicy::HostnameSerial => {
                let hostname = device.hostname().ok_or_else(|| {
                    DeviceError::Naming(
                        "hostname-serial naming requires a 'hostname' field".to_string(),
                    )
                })?;
                Ok(format!("{}_{serial}_config.txt", sanitize_identifier(hostname)))
            }
        }
    }
}

/// Replace anything outside the allow-list (ASCII alphanumerics, hyphen,
/// underscore) with an underscore so identifiers are filesystem-safe.
pub fn sanitize_identifier(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug, Error)]
#[error("failed to write {path}: {source}")]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Why one device produced no output
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error("{0}")]
    Naming(String),

    #[error(transparent)]
    Write(#[from] WriteError),
}

#[derive(Debug)]
pub enum Outcome {
    Written(PathBuf),
    Previewed,
}

#[derive(Debug)]
pub struct DeviceReport {
    pub serial: String,
    pub outcome: Result<Outcome, DeviceError>,
}

/// Per-device outcomes for the whole run, in input order
#[derive(Debug, Default)]
pub struct BatchResult {
    pub reports: Vec<DeviceReport>,
}

impl BatchResult {
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.outcome.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.len() - self.succeeded()
    }

    /// True only if every device succeeded
    pub fn is_clean(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &DeviceError)> {
        self.reports
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|e| (r.serial.as_str(), e)))
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub output_dir: PathBuf,
    /// Stream composed documents to the preview sink instead of writing
    pub dry_run: bool,
    pub naming: NamingPolicy,
    /// Highest-priority variable layer, applied to every device
    pub overrides: BTreeMap<String, Value>,
    pub compose: ComposeOptions,
}

/// Run the full batch. Only the output directory being unusable is fatal;
/// everything else is recorded per device.
pub fn run_batch(
    devices: &[DeviceRecord],
    sections: &[&SectionDefinition],
    options: &BatchOptions,
    preview: &mut dyn Write,
) -> Result<BatchResult, WriteError> {
    if !options.dry_run {
        std::fs::create_dir_all(&options.output_dir).map_err(|source| WriteError {
            path: options.output_dir.clone(),
            source,
        })?;
    }

    let mut result = BatchResult::default();
    for device in devices {
        let serial = device.serial().unwrap_or_default().to_string();
        info!("generating config for {serial}");

        let outcome = generate_one(device, sections, options, preview);
        if let Err(err) = &outcome {
            error!("{serial}: {err}");
        }
        result.reports.push(DeviceReport { serial, outcome });
    }

    info!(
        "done: {} succeeded, {} failed",
        result.succeeded(),
        result.failed()
    );
    Ok(result)
}

fn generate_one(
    device: &DeviceRecord,
    sections: &[&SectionDefinition],
    options: &BatchOptions,
    preview: &mut dyn Write,
) -> Result<Outcome, DeviceError> {
    let doc = compose(device, sections, &options.overrides, &options.compose)?;

    if options.dry_run {
        let sink_err = |source: io::Error| {
            DeviceError::Write(WriteError {
                path: PathBuf::from("<preview>"),
                source,
            })
        };
        writeln!(preview, "{}", "=".repeat(60)).map_err(sink_err)?;
        preview.write_all(doc.text.as_bytes()).map_err(sink_err)?;
        return Ok(Outcome::Previewed);
    }

    let path = options.output_dir.join(options.naming.filename(device)?);
    write_atomic(&path, &options.output_dir, &doc.text)?;
    info!("wrote {}", path.display());
    Ok(Outcome::Written(path))
}

/// Write via a temporary file in the target directory plus rename, so a
/// crash mid-write never leaves a truncated config behind.
fn write_atomic(path: &Path, dir: &Path, text: &str) -> Result<(), WriteError> {
    let wrap = |source: io::Error| WriteError {
        path: path.to_path_buf(),
        source,
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(wrap)?;
    tmp.write_all(text.as_bytes()).map_err(wrap)?;
    tmp.persist(path).map_err(|e| wrap(e.error))?;
    Ok(())
}
