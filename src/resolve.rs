//! Variable Resolver: layered context construction
//!
//! A variable context is built fresh for each (device, section) rendering
//! by layering section defaults, then device record fields, then explicit
//! overrides. It is never mutated after construction. Lookup is
//! three-state: a declared name can be present with a value, declared but
//! absent, or undeclared entirely; the renderer treats those differently.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::inventory::{DeviceRecord, Value};
use crate::section::SectionDefinition;

/// Immutable variable context for one (device, section) rendering
#[derive(Debug, Clone)]
pub struct VariableContext {
    values: BTreeMap<String, Value>,
    declared: BTreeSet<String>,
}

/// Result of a context lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Binding<'a> {
    /// Declared and carrying a value
    Value(&'a Value),
    /// Declared (optional, no default) but not supplied anywhere
    Absent,
    /// Not declared by the section at all
    Undeclared,
}

#[derive(Debug, Error, PartialEq)]
pub enum ResolveError {
    #[error("section '{section}' requires field '{field}', which is missing from the device record")]
    MissingRequired { section: String, field: String },
}

/// Build the variable context for one (device, section) pair.
///
/// Layering, lowest priority first: section defaults, device record
/// fields, explicit overrides. Only declared names are admitted; overrides
/// naming variables a section does not declare are ignored for that
/// section (they may apply to others in the same run). Pure function of
/// its inputs.
pub fn resolve(
    device: &DeviceRecord,
    section: &SectionDefinition,
    overrides: &BTreeMap<String, Value>,
) -> Result<VariableContext, ResolveError> {
    let mut declared: BTreeSet<String> = section.requires.iter().cloned().collect();
    declared.extend(section.optional.iter().cloned());
    declared.extend(section.defaults.keys().cloned());

    let mut values = section.defaults.clone();
    for name in &declared {
        if let Some(value) = device.get(name) {
            values.insert(name.clone(), value.clone());
        }
    }
    for (name, value) in overrides {
        if declared.contains(name) {
            values.insert(name.clone(), value.clone());
        }
    }

    for field in &section.requires {
        if !values.contains_key(field) {
            return Err(ResolveError::MissingRequired {
                section: section.name.clone(),
                field: field.clone(),
            });
        }
    }

    Ok(VariableContext { values, declared })
}

impl VariableContext {
    pub fn lookup(&self, name: &str) -> Binding<'_> {
        if let Some(value) = self.values.get(name) {
            Binding::Value(value)
        } else if self.declared.contains(name) {
            Binding::Absent
        } else {
            Binding::Undeclared
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::parse_inventory;
    use crate::section::SectionDefinition;

    fn section() -> SectionDefinition {
        SectionDefinition::from_toml_str(
            "ntp",
            r#"
requires = ["ntp_servers"]
optional = ["ntp_source"]
body = '''
line
'''

[defaults]
boot_server = "none"
"#,
        )
        .unwrap()
    }

    fn device(extra: &str) -> DeviceRecord {
        let yaml = format!("devices:\n  - serial: FW1\n    model: EX4100\n{extra}");
        parse_inventory(&yaml).unwrap().remove(0)
    }

    #[test]
    fn test_device_field_overlays_default() {
        let device = device("    ntp_servers: [a]\n    boot_server: 10.0.0.9\n");
        let ctx = resolve(&device, &section(), &BTreeMap::new()).unwrap();
        assert_eq!(
            ctx.lookup("boot_server"),
            Binding::Value(&Value::String("10.0.0.9".to_string()))
        );
    }

    #[test]
    fn test_override_wins_over_device_field() {
        let device = device("    ntp_servers: [a]\n    boot_server: 10.0.0.9\n");
        let overrides =
            BTreeMap::from([("boot_server".to_string(), Value::String("cli".to_string()))]);
        let ctx = resolve(&device, &section(), &overrides).unwrap();
        assert_eq!(
            ctx.lookup("boot_server"),
            Binding::Value(&Value::String("cli".to_string()))
        );
    }

    #[test]
    fn test_missing_required_names_field_and_section() {
        let device = device("");
        let err = resolve(&device, &section(), &BTreeMap::new()).unwrap_err();
        assert_eq!(
            err,
            ResolveError::MissingRequired {
                section: "ntp".to_string(),
                field: "ntp_servers".to_string(),
            }
        );
    }

    #[test]
    fn test_override_satisfies_required() {
        let device = device("");
        let overrides = BTreeMap::from([(
            "ntp_servers".to_string(),
            Value::List(vec![Value::String("10.0.0.1".to_string())]),
        )]);
        assert!(resolve(&device, &section(), &overrides).is_ok());
    }

    #[test]
    fn test_optional_without_default_is_absent() {
        let device = device("    ntp_servers: [a]\n");
        let ctx = resolve(&device, &section(), &BTreeMap::new()).unwrap();
        assert_eq!(ctx.lookup("ntp_source"), Binding::Absent);
    }

    #[test]
    fn test_undeclared_name_is_not_admitted() {
        // 'hostname' is in the device record but not declared by the section
        let device = device("    ntp_servers: [a]\n    hostname: sw1\n");
        let ctx = resolve(&device, &section(), &BTreeMap::new()).unwrap();
        assert_eq!(ctx.lookup("hostname"), Binding::Undeclared);
    }

    #[test]
    fn test_undeclared_override_is_ignored() {
        let device = device("    ntp_servers: [a]\n");
        let overrides = BTreeMap::from([("other".to_string(), Value::Bool(true))]);
        let ctx = resolve(&device, &section(), &overrides).unwrap();
        assert_eq!(ctx.lookup("other"), Binding::Undeclared);
    }
}
