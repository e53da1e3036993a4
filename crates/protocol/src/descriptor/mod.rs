//! Fixed 24-byte binary descriptor.
//!
//! # Layout
//!
//! All multi-byte integers are big-endian.
//!
//! | Offset | Width | Field |
//! |--------|-------|-------|
//! | 0..3 | 3 | Magic `TCP` |
//! | 3 | 1 | Header: low nibble protocol version, high nibble header flags (reserved) |
//! | 4..8 | 4 | Identity hash ([`crate::identity_hash`]) |
//! | 8..10 | 2 | Capability flags |
//! | 10..12 | 2 | Risk word: bits 0..3 risk code, remaining bits reserved |
//! | 12..14 | 2 | Execution-time class |
//! | 14..16 | 2 | Memory class |
//! | 16..18 | 2 | Output-size class |
//! | 18 | 1 | Identity length |
//! | 19 | 1 | Reserved |
//! | 20..22 | 2 | Reserved |
//! | 22..24 | 2 | CRC-16 over bytes 0..22 ([`crate::checksum`]) |
//!
//! Any change to a width or offset is a protocol version bump.
//!
//! # Invariants
//!
//! - A [`BinaryDescriptor`] always holds bytes that pass [`decode`].
//! - Decoding then re-encoding reproduces the identical bytes. Reserved bits are
//!   rejected on decode rather than carried, so there is exactly one encoding per record.

mod decode;
mod encode;
mod error;

#[cfg(test)]
mod tests;

pub use decode::{decode, decode_record};
pub use encode::encode;
pub use error::{DecodeError, EncodingError};

use crate::checksum;
use crate::record::{CapabilityFlags, PerformanceProfile, RiskLevel};

/// Total descriptor size in bytes.
pub const DESCRIPTOR_LEN: usize = 24;

/// Format identifier.
pub const MAGIC: [u8; 3] = *b"TCP";

/// Version written by [`encode`].
pub const PROTOCOL_VERSION: u8 = 2;

/// Versions accepted by [`decode`].
pub const SUPPORTED_VERSIONS: &[u8] = &[PROTOCOL_VERSION];

pub(crate) mod offset {
	pub const MAGIC: usize = 0;
	pub const HEADER: usize = 3;
	pub const IDENTITY_HASH: usize = 4;
	pub const FLAGS: usize = 8;
	pub const RISK: usize = 10;
	pub const EXEC_TIME: usize = 12;
	pub const MEMORY: usize = 14;
	pub const OUTPUT_SIZE: usize = 16;
	pub const IDENTITY_LEN: usize = 18;
	pub const RESERVED_BYTE: usize = 19;
	pub const RESERVED_WORD: usize = 20;
	pub const CHECKSUM: usize = 22;
}

const VERSION_MASK: u8 = 0x0F;
pub(crate) const RISK_MASK: u16 = 0x0007;

/// Wire-width view of every field except magic and checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct DescriptorFields {
	pub version: u8,
	pub header_flags: u8,
	pub identity_hash: u32,
	pub flags: u16,
	pub risk_word: u16,
	pub exec_time: u16,
	pub memory: u16,
	pub output_size: u16,
	pub identity_len: u8,
	pub reserved_byte: u8,
	pub reserved_word: u16,
}

impl DescriptorFields {
	pub(crate) fn read(bytes: &[u8; DESCRIPTOR_LEN]) -> Self {
		let be16 = |at: usize| u16::from_be_bytes([bytes[at], bytes[at + 1]]);
		let header = bytes[offset::HEADER];
		Self {
			version: header & VERSION_MASK,
			header_flags: header >> 4,
			identity_hash: u32::from_be_bytes([
				bytes[offset::IDENTITY_HASH],
				bytes[offset::IDENTITY_HASH + 1],
				bytes[offset::IDENTITY_HASH + 2],
				bytes[offset::IDENTITY_HASH + 3],
			]),
			flags: be16(offset::FLAGS),
			risk_word: be16(offset::RISK),
			exec_time: be16(offset::EXEC_TIME),
			memory: be16(offset::MEMORY),
			output_size: be16(offset::OUTPUT_SIZE),
			identity_len: bytes[offset::IDENTITY_LEN],
			reserved_byte: bytes[offset::RESERVED_BYTE],
			reserved_word: be16(offset::RESERVED_WORD),
		}
	}

	/// Writes the fields and seals the buffer with its checksum.
	pub(crate) fn write(&self) -> [u8; DESCRIPTOR_LEN] {
		let mut buf = [0u8; DESCRIPTOR_LEN];
		buf[offset::MAGIC..offset::HEADER].copy_from_slice(&MAGIC);
		buf[offset::HEADER] = (self.header_flags << 4) | (self.version & VERSION_MASK);
		buf[offset::IDENTITY_HASH..offset::FLAGS].copy_from_slice(&self.identity_hash.to_be_bytes());
		buf[offset::FLAGS..offset::RISK].copy_from_slice(&self.flags.to_be_bytes());
		buf[offset::RISK..offset::EXEC_TIME].copy_from_slice(&self.risk_word.to_be_bytes());
		buf[offset::EXEC_TIME..offset::MEMORY].copy_from_slice(&self.exec_time.to_be_bytes());
		buf[offset::MEMORY..offset::OUTPUT_SIZE].copy_from_slice(&self.memory.to_be_bytes());
		buf[offset::OUTPUT_SIZE..offset::IDENTITY_LEN]
			.copy_from_slice(&self.output_size.to_be_bytes());
		buf[offset::IDENTITY_LEN] = self.identity_len;
		buf[offset::RESERVED_BYTE] = self.reserved_byte;
		buf[offset::RESERVED_WORD..offset::CHECKSUM]
			.copy_from_slice(&self.reserved_word.to_be_bytes());
		let crc = checksum::checksum(&buf[..offset::CHECKSUM]);
		buf[offset::CHECKSUM..].copy_from_slice(&crc.to_be_bytes());
		buf
	}
}

/// A validated 24-byte descriptor.
///
/// Only constructible through [`encode`], [`TryFrom`] (which runs [`decode`]), or
/// delta decompression, so the bytes always validate. Never mutated in place.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BinaryDescriptor([u8; DESCRIPTOR_LEN]);

impl BinaryDescriptor {
	/// Wraps bytes that are already known to validate.
	pub(crate) const fn from_validated(bytes: [u8; DESCRIPTOR_LEN]) -> Self {
		Self(bytes)
	}

	/// Returns the raw bytes.
	pub const fn as_bytes(&self) -> &[u8; DESCRIPTOR_LEN] {
		&self.0
	}

	/// Consumes the descriptor, returning the raw bytes.
	pub const fn into_bytes(self) -> [u8; DESCRIPTOR_LEN] {
		self.0
	}

	/// Protocol version from the header byte.
	pub const fn version(&self) -> u8 {
		self.0[offset::HEADER] & VERSION_MASK
	}

	/// Stored identity hash.
	pub const fn identity_hash(&self) -> u32 {
		u32::from_be_bytes([
			self.0[offset::IDENTITY_HASH],
			self.0[offset::IDENTITY_HASH + 1],
			self.0[offset::IDENTITY_HASH + 2],
			self.0[offset::IDENTITY_HASH + 3],
		])
	}

	/// Stored checksum.
	pub const fn checksum(&self) -> u16 {
		u16::from_be_bytes([self.0[offset::CHECKSUM], self.0[offset::CHECKSUM + 1]])
	}

	/// Decodes the structured view. Cannot fail for a constructed descriptor.
	pub fn view(&self) -> DecodedDescriptor {
		DecodedDescriptor::from_fields(&DescriptorFields::read(&self.0))
	}

	pub(crate) fn fields(&self) -> DescriptorFields {
		DescriptorFields::read(&self.0)
	}
}

impl std::fmt::Debug for BinaryDescriptor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "BinaryDescriptor(")?;
		for b in &self.0 {
			write!(f, "{b:02x}")?;
		}
		write!(f, ")")
	}
}

impl AsRef<[u8]> for BinaryDescriptor {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

impl TryFrom<&[u8]> for BinaryDescriptor {
	type Error = DecodeError;

	fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
		decode(bytes)?;
		let mut buf = [0u8; DESCRIPTOR_LEN];
		buf.copy_from_slice(bytes);
		Ok(Self(buf))
	}
}

impl TryFrom<[u8; DESCRIPTOR_LEN]> for BinaryDescriptor {
	type Error = DecodeError;

	fn try_from(bytes: [u8; DESCRIPTOR_LEN]) -> Result<Self, Self::Error> {
		decode(&bytes)?;
		Ok(Self(bytes))
	}
}

/// Structured contents of a validated descriptor.
///
/// Carries the identity hash rather than the identity; use
/// [`DecodedDescriptor::into_record`] to recover a full record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodedDescriptor {
	pub version: u8,
	pub identity_hash: u32,
	pub identity_len: u8,
	pub risk: RiskLevel,
	pub flags: CapabilityFlags,
	pub performance: PerformanceProfile,
}

impl DecodedDescriptor {
	/// Builds the view from fields that have passed validation.
	fn from_fields(fields: &DescriptorFields) -> Self {
		Self {
			version: fields.version,
			identity_hash: fields.identity_hash,
			identity_len: fields.identity_len,
			risk: RiskLevel::from_code((fields.risk_word & RISK_MASK) as u8)
				.unwrap_or(RiskLevel::Critical),
			flags: CapabilityFlags::from_bits_retain(fields.flags),
			performance: PerformanceProfile::new(
				fields.exec_time.into(),
				fields.memory.into(),
				fields.output_size.into(),
			),
		}
	}

	/// Returns true if `identity` matches the stored hash and length.
	pub fn matches_identity(&self, identity: &str) -> bool {
		identity.len() == usize::from(self.identity_len)
			&& crate::identity::identity_hash(identity) == self.identity_hash
	}

	/// Attaches the out-of-band identity, verifying it against the stored hash.
	pub fn into_record(
		self,
		identity: impl Into<String>,
	) -> Result<crate::record::CapabilityRecord, DecodeError> {
		let identity = identity.into();
		if !self.matches_identity(&identity) {
			return Err(DecodeError::IdentityMismatch);
		}
		Ok(crate::record::CapabilityRecord {
			identity,
			risk: self.risk,
			flags: self.flags,
			performance: self.performance,
		})
	}
}
