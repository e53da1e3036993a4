//! Concurrent capability registry.
//!
//! Maps command identities to their capability descriptors. Entries are indexed by
//! the 32-bit identity hash, but the full identity string is kept beside every entry
//! and compared on lookup, so a hash collision is reported rather than answered
//! with another tool's permissions.
//!
//! # Layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | TOML-backed [`RegistryConfig`] |
//! | [`runtime`] | [`Registry`] container and its CAS write loop |
//! | [`snapshot`] | Immutable [`Snapshot`] state and read queries |
//! | `policy` | Standalone vs family-member placement |
//!
//! # Family storage
//!
//! After [`Registry::register_family`] installs a parent for, say, `git`, identities
//! such as `git commit` that stay close to the parent are stored as deltas. Lookups
//! rematerialise the full descriptor, so callers never observe the difference
//! except through [`Snapshot::storage`] and [`Registry::stats`].

pub mod config;
mod entry;
mod error;
mod policy;
pub mod runtime;
pub mod snapshot;


pub use config::{ConfigError, FamilyConfig, RegistryConfig};
pub use entry::{RegistryHandle, Storage};
pub use error::{Corruption, LookupError, RegisterError};
pub use runtime::Registry;
pub use snapshot::{RegistryStats, Snapshot};
