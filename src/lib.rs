//! confgen - Batch switch configuration generator
//!
//! Generates one plain-text configuration file per network device from a
//! device inventory (YAML) and a catalog of section definitions (TOML).
//! Section bodies are written in a small line-oriented template language
//! with `{variable}` substitution, `@for` loops, and `@if` conditionals.
//!
//! # Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//!
//! use confgen::compose::{compose, ComposeOptions};
//! use confgen::inventory::parse_inventory;
//! use confgen::section::SectionDefinition;
//!
//! let section = SectionDefinition::from_toml_str(
//!     "system",
//!     "requires = [\"hostname\"]\nbody = '''\nset system host-name {hostname}\n'''\n",
//! )
//! .unwrap();
//!
//! let devices = parse_inventory(
//!     "devices:\n  - serial: FW123\n    hostname: sw-core-1\n    model: EX4100\n",
//! )
//! .unwrap();
//!
//! let doc = compose(
//!     &devices[0],
//!     &[&section],
//!     &BTreeMap::new(),
//!     &ComposeOptions::at("2024-06-01 08:00:00"),
//! )
//! .unwrap();
//!
//! assert!(doc.text.contains("set system host-name sw-core-1"));
//! ```

pub mod batch;
pub mod compose;
pub mod error;
pub mod inventory;
pub mod render;
pub mod resolve;
pub mod section;
pub mod template;

pub use batch::{run_batch, BatchOptions, BatchResult, NamingPolicy};
pub use compose::{compose, ComposeOptions, ComposedDocument};
pub use error::ParseError;
pub use inventory::{load_inventory, parse_inventory, DeviceRecord, Value};
pub use render::render;
pub use resolve::{resolve, VariableContext};
pub use section::{SectionCatalog, SectionDefinition};
