//! Whole-family encoding, statistics, and grouping helpers.

use std::collections::BTreeMap;

use super::{CompressionError, DeltaRecord, compress_family, decompress};
use crate::descriptor::{BinaryDescriptor, DESCRIPTOR_LEN};
use crate::record::{CapabilityFlags, CapabilityRecord, PerformanceProfile, RiskLevel};

/// A parent descriptor and the deltas of every member of one command family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyDescriptor {
	name: String,
	parent: BinaryDescriptor,
	members: BTreeMap<String, DeltaRecord>,
}

impl FamilyDescriptor {
	/// Creates an empty family around `parent`.
	pub fn new(name: impl Into<String>, parent: BinaryDescriptor) -> Self {
		Self {
			name: name.into(),
			parent,
			members: BTreeMap::new(),
		}
	}

	/// Compresses every member against `parent`.
	pub fn build(
		name: impl Into<String>,
		parent: BinaryDescriptor,
		members: impl IntoIterator<Item = (String, BinaryDescriptor)>,
	) -> Result<Self, CompressionError> {
		let mut family = Self::new(name, parent);
		for (identity, member) in members {
			family.insert(identity, &member)?;
		}
		Ok(family)
	}

	/// Adds or replaces a member, returning the delta it is stored as.
	pub fn insert(
		&mut self,
		identity: impl Into<String>,
		member: &BinaryDescriptor,
	) -> Result<&DeltaRecord, CompressionError> {
		let delta = compress_family(&self.parent, member)?;
		let slot = self.members.entry(identity.into()).or_default();
		*slot = delta;
		Ok(slot)
	}

	/// Removes a member.
	pub fn remove(&mut self, identity: &str) -> Option<DeltaRecord> {
		self.members.remove(identity)
	}

	/// Reconstructs one member's descriptor.
	pub fn member(&self, identity: &str) -> Option<Result<BinaryDescriptor, CompressionError>> {
		self.members
			.get(identity)
			.map(|delta| decompress(&self.parent, delta))
	}

	/// Returns a member's stored delta.
	pub fn delta(&self, identity: &str) -> Option<&DeltaRecord> {
		self.members.get(identity)
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn parent(&self) -> &BinaryDescriptor {
		&self.parent
	}

	pub fn len(&self) -> usize {
		self.members.len()
	}

	pub fn is_empty(&self) -> bool {
		self.members.is_empty()
	}

	/// Members in identity order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &DeltaRecord)> {
		self.members.iter().map(|(k, v)| (k.as_str(), v))
	}

	/// Measured sizes of this encoding against standalone storage.
	pub fn stats(&self) -> CompressionStats {
		CompressionStats {
			members: self.members.len(),
			original_bytes: self.members.len() * DESCRIPTOR_LEN,
			compressed_bytes: DESCRIPTOR_LEN + self.members.values().map(DeltaRecord::len).sum::<usize>(),
		}
	}
}

/// Size accounting for a family encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompressionStats {
	/// Number of encoded members.
	pub members: usize,
	/// Bytes needed to store every member standalone.
	pub original_bytes: usize,
	/// Parent plus all deltas.
	pub compressed_bytes: usize,
}

impl CompressionStats {
	/// `original / compressed`; below 1.0 means the family costs more than it saves.
	pub fn ratio(&self) -> f64 {
		if self.compressed_bytes == 0 {
			return 1.0;
		}
		self.original_bytes as f64 / self.compressed_bytes as f64
	}

	/// Bytes saved; negative when hierarchical storage is larger.
	pub fn saved(&self) -> i64 {
		self.original_bytes as i64 - self.compressed_bytes as i64
	}
}

/// Builds a parent record that minimizes member deltas.
///
/// Each field takes its most frequent value among `members`; ties go to the smallest
/// value. With no members the parent is a safe record with zeroed classes.
pub fn derive_parent(name: impl Into<String>, members: &[CapabilityRecord]) -> CapabilityRecord {
	CapabilityRecord {
		identity: name.into(),
		risk: mode(members.iter().map(|m| m.risk)).unwrap_or(RiskLevel::Safe),
		flags: mode(members.iter().map(|m| m.flags.bits()))
			.map(CapabilityFlags::from_bits_retain)
			.unwrap_or_default(),
		performance: PerformanceProfile {
			exec_time: mode(members.iter().map(|m| m.performance.exec_time)).unwrap_or(0),
			memory: mode(members.iter().map(|m| m.performance.memory)).unwrap_or(0),
			output_size: mode(members.iter().map(|m| m.performance.output_size)).unwrap_or(0),
		},
	}
}

fn mode<T: Ord + Copy>(values: impl Iterator<Item = T>) -> Option<T> {
	let mut counts = BTreeMap::new();
	for v in values {
		*counts.entry(v).or_insert(0usize) += 1;
	}
	let mut best: Option<(T, usize)> = None;
	for (v, n) in counts {
		if best.is_none_or(|(_, top)| n > top) {
			best = Some((v, n));
		}
	}
	best.map(|(v, _)| v)
}

/// Returns the family an identity belongs to: the prefix before the first separator.
///
/// `"git commit"` belongs to `"git"`, `"tool.delete"` to `"tool"`. Identities without a
/// separator, or with an empty prefix or suffix, belong to no family.
pub fn family_key<'a>(identity: &'a str, separators: &[char]) -> Option<&'a str> {
	let (idx, sep) = identity.char_indices().find(|(_, c)| separators.contains(c))?;
	let (prefix, rest) = (&identity[..idx], &identity[idx + sep.len_utf8()..]);
	(!prefix.is_empty() && !rest.is_empty()).then_some(prefix)
}

/// Groups identities by [`family_key`].
///
/// Members are listed under their family; an identity with no family gets its own
/// (possibly empty) group so that standalone tools remain visible.
pub fn group_by_family<'a>(
	identities: impl IntoIterator<Item = &'a str>,
	separators: &[char],
) -> BTreeMap<String, Vec<String>> {
	let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
	for identity in identities {
		match family_key(identity, separators) {
			Some(family) => groups
				.entry(family.to_owned())
				.or_default()
				.push(identity.to_owned()),
			None => {
				groups.entry(identity.to_owned()).or_default();
			}
		}
	}
	groups
}
