//! Tool Capability Protocol wire format.
//!
//! A tool's risk, behavioral capabilities, and performance classes are packed into a
//! fixed 24-byte [`BinaryDescriptor`] so that a policy engine can permit or deny an
//! action without parsing documentation. Families of related commands (subcommands of
//! one tool) are stored as one parent descriptor plus small [`DeltaRecord`]s.
//!
//! # Layers
//!
//! | Module | Role |
//! |--------|------|
//! | [`checksum`] | CRC-16 integrity codec over descriptor bytes |
//! | [`record`] | Logical [`CapabilityRecord`], [`RiskLevel`], [`CapabilityFlags`] |
//! | [`descriptor`] | 24-byte encoder and fail-fast decoder |
//! | [`delta`] | Parent + delta compression and family tooling |
//!
//! # Round trips
//!
//! Every stage is lossless:
//!
//! ```text
//! CapabilityRecord --encode--> BinaryDescriptor --compress_family--> DeltaRecord
//! DeltaRecord --decompress--> BinaryDescriptor --decode_record--> CapabilityRecord
//! ```
//!
//! The descriptor stores only a 32-bit hash of the command identity. Callers retain
//! the identity string and pass it to [`decode_record`], which verifies it against the
//! stored hash and length.

pub mod checksum;
pub mod delta;
pub mod descriptor;
pub mod identity;
pub mod record;

#[cfg(test)]
pub(crate) mod test_support;

pub use delta::{
	CompressionError, CompressionStats, DeltaRecord, FamilyDescriptor, compress_family,
	decompress, derive_parent, family_key, group_by_family,
};
pub use descriptor::{
	BinaryDescriptor, DESCRIPTOR_LEN, DecodeError, DecodedDescriptor, EncodingError, MAGIC,
	PROTOCOL_VERSION, SUPPORTED_VERSIONS, decode, decode_record, encode,
};
pub use identity::identity_hash;
pub use record::{
	Capability, CapabilityFlags, CapabilityRecord, Field, PerformanceProfile, RiskLevel,
};
