//! Hierarchical (parent + delta) compression for command families.
//!
//! # Mental model
//!
//! Subcommands of one tool share most of their metadata. A family stores one full
//! parent [`BinaryDescriptor`] and, per member, a [`DeltaRecord`] listing only the
//! fields in which the member differs from the parent. Merging the delta onto the
//! parent reconstructs the member's exact 24 bytes.
//!
//! # Delta format
//!
//! A sequence of entries in ascending field-id order. Each entry is one tag byte
//! (high nibble = field id, low nibble = value width) followed by the value,
//! big-endian, in the minimal width. A zero value has width 0.
//!
//! | Id | Field | Max width |
//! |----|-------|-----------|
//! | 1 | Identity hash | 4 |
//! | 2 | Capability flags | 2 |
//! | 3 | Risk word | 2 |
//! | 4 | Execution-time class | 2 |
//! | 5 | Memory class | 2 |
//! | 6 | Output-size class | 2 |
//! | 7 | Identity length | 1 |
//!
//! The worst case is [`MAX_DELTA_LEN`] bytes, below a full descriptor. Whether that
//! saving is worth a family indirection is the caller's policy, not the compressor's.
//!
//! # Invariants
//!
//! - `decompress(p, compress_family(p, m)?) == m` for every same-version pair.
//! - Each delta has exactly one byte encoding: entries are ordered, unique, and
//!   minimally wide.
//! - Parent and member versions must match; there is no cross-version merging.

mod error;
mod family;


use smallvec::SmallVec;

pub use error::{CompressionError, MalformedDelta};
pub use family::{CompressionStats, FamilyDescriptor, derive_parent, family_key, group_by_family};

use crate::descriptor::{self, BinaryDescriptor, DescriptorFields};
use crate::record::Field;

/// Upper bound on an encoded delta: every field present at full width.
pub const MAX_DELTA_LEN: usize = 22;

/// Field identifiers used in delta tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
enum DeltaField {
	IdentityHash = 1,
	Flags = 2,
	Risk = 3,
	ExecTime = 4,
	Memory = 5,
	OutputSize = 6,
	IdentityLen = 7,
}

impl DeltaField {
	const ALL: [DeltaField; 7] = [
		DeltaField::IdentityHash,
		DeltaField::Flags,
		DeltaField::Risk,
		DeltaField::ExecTime,
		DeltaField::Memory,
		DeltaField::OutputSize,
		DeltaField::IdentityLen,
	];

	fn from_id(id: u8) -> Option<Self> {
		Self::ALL.into_iter().find(|f| *f as u8 == id)
	}

	const fn max_width(self) -> u8 {
		match self {
			Self::IdentityHash => 4,
			Self::IdentityLen => 1,
			_ => 2,
		}
	}

	const fn field(self) -> Field {
		match self {
			Self::IdentityHash => Field::IdentityHash,
			Self::Flags => Field::Flags,
			Self::Risk => Field::Risk,
			Self::ExecTime => Field::ExecTime,
			Self::Memory => Field::Memory,
			Self::OutputSize => Field::OutputSize,
			Self::IdentityLen => Field::IdentityLen,
		}
	}

	fn get(self, f: &DescriptorFields) -> u32 {
		match self {
			Self::IdentityHash => f.identity_hash,
			Self::Flags => f.flags.into(),
			Self::Risk => f.risk_word.into(),
			Self::ExecTime => f.exec_time.into(),
			Self::Memory => f.memory.into(),
			Self::OutputSize => f.output_size.into(),
			Self::IdentityLen => f.identity_len.into(),
		}
	}

	/// Stores `value`, which the parser has already bounded by `max_width`.
	fn set(self, f: &mut DescriptorFields, value: u32) {
		match self {
			Self::IdentityHash => f.identity_hash = value,
			Self::Flags => f.flags = value as u16,
			Self::Risk => f.risk_word = value as u16,
			Self::ExecTime => f.exec_time = value as u16,
			Self::Memory => f.memory = value as u16,
			Self::OutputSize => f.output_size = value as u16,
			Self::IdentityLen => f.identity_len = value as u8,
		}
	}
}

const fn min_width(value: u32) -> u8 {
	((u32::BITS - value.leading_zeros()).div_ceil(8)) as u8
}

/// The fields of one family member that differ from its parent.
///
/// Always well-formed: built by [`compress_family`] or validated by
/// [`DeltaRecord::from_bytes`].
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct DeltaRecord(SmallVec<[u8; MAX_DELTA_LEN]>);

impl DeltaRecord {
	/// Validates and wraps raw delta bytes.
	pub fn from_bytes(bytes: &[u8]) -> Result<Self, CompressionError> {
		for_each_entry(bytes, |_, _| {})?;
		Ok(Self(SmallVec::from_slice(bytes)))
	}

	/// Returns the encoded bytes.
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	/// Encoded length in bytes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// True when the member is identical to the parent.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Fields carried by this delta, in ascending order.
	pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
		let mut at = 0;
		std::iter::from_fn(move || {
			let tag = *self.0.get(at)?;
			at += 1 + usize::from(tag & 0x0F);
			DeltaField::from_id(tag >> 4).map(DeltaField::field)
		})
	}

	/// Number of carried fields that describe behavior rather than identity.
	///
	/// Family members always differ from the parent in identity hash and usually in
	/// identity length; those entries are excluded.
	pub fn behavioral_changes(&self) -> usize {
		self.fields()
			.filter(|f| !matches!(f, Field::IdentityHash | Field::IdentityLen))
			.count()
	}
}

impl std::fmt::Debug for DeltaRecord {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "DeltaRecord(")?;
		for b in &self.0 {
			write!(f, "{b:02x}")?;
		}
		write!(f, ")")
	}
}

impl AsRef<[u8]> for DeltaRecord {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

/// Walks delta entries, enforcing order, width bounds, and minimal encoding.
fn for_each_entry(
	bytes: &[u8],
	mut visit: impl FnMut(DeltaField, u32),
) -> Result<(), MalformedDelta> {
	if bytes.len() > MAX_DELTA_LEN {
		return Err(MalformedDelta::TooLong { len: bytes.len() });
	}

	let mut at = 0;
	let mut last: Option<DeltaField> = None;
	while at < bytes.len() {
		let tag = bytes[at];
		let field = DeltaField::from_id(tag >> 4).ok_or(MalformedDelta::UnknownField(tag >> 4))?;
		let width = tag & 0x0F;
		if width > field.max_width() {
			return Err(MalformedDelta::WidthTooLarge {
				field: field.field(),
				width,
			});
		}
		if last.is_some_and(|prev| prev >= field) {
			return Err(MalformedDelta::OutOfOrder {
				field: field.field(),
			});
		}

		let start = at + 1;
		let end = start + usize::from(width);
		let raw = bytes
			.get(start..end)
			.ok_or(MalformedDelta::Truncated { at })?;
		let value = raw.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
		if min_width(value) != width {
			return Err(MalformedDelta::NonMinimal {
				field: field.field(),
			});
		}

		visit(field, value);
		last = Some(field);
		at = end;
	}
	Ok(())
}

/// Encodes `member` as the fields in which it differs from `parent`.
pub fn compress_family(
	parent: &BinaryDescriptor,
	member: &BinaryDescriptor,
) -> Result<DeltaRecord, CompressionError> {
	if parent.version() != member.version() {
		return Err(CompressionError::VersionMismatch {
			parent: parent.version(),
			member: member.version(),
		});
	}

	let base = parent.fields();
	let target = member.fields();
	let mut out = SmallVec::new();
	for field in DeltaField::ALL {
		let value = field.get(&target);
		if value == field.get(&base) {
			continue;
		}
		let width = min_width(value);
		out.push(((field as u8) << 4) | width);
		out.extend_from_slice(&value.to_be_bytes()[4 - usize::from(width)..]);
	}
	Ok(DeltaRecord(out))
}

/// Reconstructs a member descriptor by applying `delta` to `parent`.
///
/// The merged bytes are resealed and fully validated before being returned.
pub fn decompress(
	parent: &BinaryDescriptor,
	delta: &DeltaRecord,
) -> Result<BinaryDescriptor, CompressionError> {
	let mut fields = parent.fields();
	for_each_entry(delta.as_bytes(), |field, value| field.set(&mut fields, value))?;
	let bytes = fields.write();
	descriptor::decode(&bytes).map_err(CompressionError::InvalidMerge)?;
	Ok(BinaryDescriptor::from_validated(bytes))
}
