//! confgen CLI
//!
//! Usage:
//!   confgen [OPTIONS]
//!
//! Options:
//!   --devices <FILE>        Device inventory (YAML, default devices.yaml)
//!   -t, --sections-dir <DIR>  Section definitions (default sections)
//!   -o, --output <DIR>      Output directory (default output)
//!   --serial <SERIAL>       Only generate for the given serial(s)
//!   -s, --section <NAME>    Section subset, in the order given
//!   --set <KEY=VALUE>       Override a variable for every device
//!   -n, --dry-run           Print configs to stdout instead of writing
//!   --naming <POLICY>       Output filename policy (serial, hostname-serial)
//!   --list-sections         List available sections and exit

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use confgen::batch::{run_batch, BatchOptions, NamingPolicy, DEFAULT_EXTENSION};
use confgen::compose::ComposeOptions;
use confgen::inventory::{load_inventory, Value};
use confgen::section::SectionCatalog;

#[derive(Parser)]
#[command(name = "confgen")]
#[command(about = "Batch switch configuration generator")]
struct Cli {
    /// Device inventory file (YAML)
    #[arg(long, default_value = "devices.yaml")]
    devices: PathBuf,

    /// Directory of section definitions (TOML)
    #[arg(short = 't', long, default_value = "sections")]
    sections_dir: PathBuf,

    /// Output directory for generated configs
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// Only generate for the given serial number(s)
    #[arg(long)]
    serial: Vec<String>,

    /// Generate only these sections, in the order given
    #[arg(short, long)]
    section: Vec<String>,

    /// Override a variable for every device (KEY=VALUE, repeatable)
    #[arg(long, value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Print composed configs to stdout instead of writing files
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Output filename policy
    #[arg(long, value_enum, default_value = "serial")]
    naming: NamingArg,

    /// File extension for serial-based naming
    #[arg(long, default_value = DEFAULT_EXTENSION)]
    extension: String,

    /// List available sections and exit
    #[arg(long)]
    list_sections: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum NamingArg {
    /// <serial>.<extension>
    Serial,
    /// <hostname>_<serial>_config.txt
    HostnameSerial,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let catalog = match SectionCatalog::load_dir(&cli.sections_dir) {
        Ok(catalog) => catalog,
        Err(e) => {
            eprintln!("Error loading sections: {e}");
            std::process::exit(1);
        }
    };

    if cli.list_sections {
        for name in catalog.names() {
            match catalog.get(name).and_then(|s| s.description.as_deref()) {
                Some(description) => println!("{name}  {description}"),
                None => println!("{name}"),
            }
        }
        return;
    }

    let requested = (!cli.section.is_empty()).then_some(cli.section.as_slice());
    let sections = match catalog.select(requested) {
        Ok(sections) => sections,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let mut devices = match load_inventory(&cli.devices) {
        Ok(devices) => devices,
        Err(e) => {
            eprintln!("Error loading inventory '{}': {e}", cli.devices.display());
            std::process::exit(1);
        }
    };

    if !cli.serial.is_empty() {
        devices.retain(|d| {
            d.serial()
                .is_some_and(|s| cli.serial.iter().any(|wanted| wanted == s))
        });
        if devices.is_empty() {
            eprintln!("Error: no inventory device matches {:?}", cli.serial);
            std::process::exit(1);
        }
    }

    let mut overrides = BTreeMap::new();
    for entry in &cli.set {
        match parse_override(entry) {
            Some((key, value)) => {
                overrides.insert(key, value);
            }
            None => {
                eprintln!("Error: --set expects KEY=VALUE, got '{entry}'");
                std::process::exit(1);
            }
        }
    }

    let options = BatchOptions {
        output_dir: cli.output,
        dry_run: cli.dry_run,
        naming: match cli.naming {
            NamingArg::Serial => NamingPolicy::Serial {
                extension: cli.extension,
            },
            NamingArg::HostnameSerial => NamingPolicy::HostnameSerial,
        },
        overrides,
        compose: ComposeOptions::now(),
    };

    let mut stdout = io::stdout().lock();
    let result = match run_batch(&devices, &sections, &options, &mut stdout) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    let _ = stdout.flush();

    if !result.is_clean() {
        eprintln!(
            "{} of {} devices failed:",
            result.failed(),
            result.reports.len()
        );
        for (serial, error) in result.failures() {
            eprintln!("  {serial}: {error}");
        }
        std::process::exit(2);
    }
}

/// Parse a KEY=VALUE override. Values parse as bool or integer where they
/// look like one, otherwise as a string.
fn parse_override(entry: &str) -> Option<(String, Value)> {
    let (key, raw) = entry.split_once('=')?;
    if key.is_empty() {
        return None;
    }
    let value = match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => match raw.parse::<i64>() {
            Ok(n) => Value::Int(n),
            Err(_) => Value::String(raw.to_string()),
        },
    };
    Some((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_override_types() {
        assert_eq!(
            parse_override("domain=corp.example.net"),
            Some((
                "domain".to_string(),
                Value::String("corp.example.net".to_string())
            ))
        );
        assert_eq!(
            parse_override("legacy=false"),
            Some(("legacy".to_string(), Value::Bool(false)))
        );
        assert_eq!(
            parse_override("vlan=120"),
            Some(("vlan".to_string(), Value::Int(120)))
        );
        assert_eq!(parse_override("novalue"), None);
        assert_eq!(parse_override("=x"), None);
    }

    #[test]
    fn test_parse_override_keeps_value_equals() {
        assert_eq!(
            parse_override("motd=a=b"),
            Some(("motd".to_string(), Value::String("a=b".to_string())))
        );
    }
}
