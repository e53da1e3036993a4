//! Immutable registry state and its read-only queries.
//!
//! # Role
//!
//! A [`Snapshot`] is never mutated once published. Writers clone the current
//! snapshot, edit the clone, and publish it (see [`crate::Registry`]). Readers
//! holding an `Arc<Snapshot>` keep seeing exactly the state they loaded.
//!
//! # Invariants
//!
//! - Every bucket is non-empty and holds distinct identities whose hash is the key.
//! - Every `Member` entry names a family present in `families`.
//! - `len` equals the total number of slots across buckets.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use toolcap_protocol::{
	BinaryDescriptor, CapabilityFlags, CapabilityRecord, DESCRIPTOR_LEN, RiskLevel, decompress,
	family_key, identity_hash,
};

use crate::config::FamilyConfig;
use crate::entry::{Slot, Storage, StoredEntry};
use crate::error::{Corruption, LookupError, RegisterError};
use crate::policy;

pub(crate) type Bucket = SmallVec<[Slot; 1]>;

/// One consistent state of a registry.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
	pub(crate) buckets: FxHashMap<u32, Bucket>,
	/// Family name to parent descriptor.
	pub(crate) families: FxHashMap<Arc<str>, BinaryDescriptor>,
	pub(crate) len: usize,
	pub(crate) generation: u64,
}

/// Storage accounting for one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
	/// Identities stored as full descriptors.
	pub standalone: usize,
	/// Identities stored as deltas.
	pub members: usize,
	/// Registered family parents.
	pub families: usize,
	/// Bytes held: standalone descriptors, parents, and deltas.
	pub stored_bytes: usize,
	/// Bytes the same identities would need stored standalone.
	pub uncompressed_bytes: usize,
	/// Hash buckets holding more than one identity.
	pub collided_buckets: usize,
}

impl RegistryStats {
	pub fn entries(&self) -> usize {
		self.standalone + self.members
	}

	/// `uncompressed / stored`; 1.0 for an empty registry.
	pub fn ratio(&self) -> f64 {
		if self.stored_bytes == 0 {
			return 1.0;
		}
		self.uncompressed_bytes as f64 / self.stored_bytes as f64
	}
}

impl Snapshot {
	/// Monotonic counter bumped by every published mutation.
	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	/// Returns the record registered under `identity`.
	///
	/// Never returns another identity's record: a hash match with a different
	/// stored identity is reported as [`LookupError::Collision`].
	pub fn lookup(&self, identity: &str) -> Result<CapabilityRecord, LookupError> {
		let desc = self.lookup_descriptor(identity)?;
		desc.view()
			.into_record(identity)
			.map_err(|e| corrupted(identity, e.into()))
	}

	/// Returns the materialised 24-byte descriptor for `identity`.
	pub fn lookup_descriptor(&self, identity: &str) -> Result<BinaryDescriptor, LookupError> {
		let slot = self.find(identity)?;
		self.materialize(&slot.entry)
			.map_err(|reason| corrupted(identity, reason))
	}

	pub fn contains(&self, identity: &str) -> bool {
		self.find(identity).is_ok()
	}

	/// How `identity` is currently stored.
	pub fn storage(&self, identity: &str) -> Option<Storage> {
		self.find(identity).ok().map(|slot| slot.entry.storage())
	}

	/// Registered identities in sorted order.
	pub fn identities(&self) -> Vec<&str> {
		let mut ids: Vec<&str> = self.slots().map(|s| &*s.identity).collect();
		ids.sort_unstable();
		ids
	}

	/// Registered family names in sorted order.
	pub fn families(&self) -> Vec<&str> {
		let mut names: Vec<&str> = self.families.keys().map(|k| &**k).collect();
		names.sort_unstable();
		names
	}

	/// Parent descriptor of a family.
	pub fn family_parent(&self, family: &str) -> Option<&BinaryDescriptor> {
		self.families.get(family)
	}

	/// Records whose risk does not exceed `max`, sorted by identity.
	pub fn find_at_most(&self, max: RiskLevel) -> Vec<CapabilityRecord> {
		self.records_where(|r| r.risk.permits(max))
	}

	/// Records that declare every flag in `required`, sorted by identity.
	pub fn find_with(&self, required: CapabilityFlags) -> Vec<CapabilityRecord> {
		self.records_where(|r| r.flags.contains(required))
	}

	pub fn stats(&self) -> RegistryStats {
		let mut stats = RegistryStats {
			families: self.families.len(),
			stored_bytes: self.families.len() * DESCRIPTOR_LEN,
			uncompressed_bytes: self.len * DESCRIPTOR_LEN,
			collided_buckets: self.buckets.values().filter(|b| b.len() > 1).count(),
			..RegistryStats::default()
		};
		for slot in self.slots() {
			match slot.entry {
				StoredEntry::Standalone(_) => stats.standalone += 1,
				StoredEntry::Member { .. } => stats.members += 1,
			}
			stats.stored_bytes += slot.entry.stored_len();
		}
		stats
	}

	fn slots(&self) -> impl Iterator<Item = &Slot> {
		self.buckets.values().flatten()
	}

	fn find(&self, identity: &str) -> Result<&Slot, LookupError> {
		let hash = identity_hash(identity);
		let bucket = self.buckets.get(&hash).ok_or(LookupError::NotFound)?;
		match bucket.iter().find(|s| &*s.identity == identity) {
			Some(slot) => Ok(slot),
			None => Err(LookupError::Collision {
				requested: identity.to_owned(),
				stored: bucket.first().map(|s| s.identity.to_string()).unwrap_or_default(),
				hash,
			}),
		}
	}

	pub(crate) fn materialize(&self, entry: &StoredEntry) -> Result<BinaryDescriptor, Corruption> {
		match entry {
			StoredEntry::Standalone(desc) => Ok(*desc),
			StoredEntry::Member { family, delta } => {
				let parent = self
					.families
					.get(family)
					.ok_or_else(|| Corruption::MissingParent(family.to_string()))?;
				Ok(decompress(parent, delta)?)
			}
		}
	}

	fn records_where(&self, mut keep: impl FnMut(&CapabilityRecord) -> bool) -> Vec<CapabilityRecord> {
		let mut out: Vec<CapabilityRecord> = self
			.slots()
			.filter_map(|slot| match self.lookup(&slot.identity) {
				Ok(record) => Some(record),
				Err(error) => {
					tracing::error!(identity = &*slot.identity, %error, "skipping unreadable entry");
					None
				}
			})
			.filter(|r| keep(r))
			.collect();
		out.sort_unstable_by(|a, b| a.identity.cmp(&b.identity));
		out
	}

	/// Inserts or replaces `identity`, choosing its storage. Returns the chosen storage
	/// and the identity of any other entry sharing the hash.
	pub(crate) fn insert(
		&mut self,
		config: &FamilyConfig,
		identity: &str,
		desc: BinaryDescriptor,
	) -> Result<(Storage, Option<Arc<str>>), RegisterError> {
		let entry = policy::place(&self.families, config, identity, desc)?;
		let storage = entry.storage();
		let bucket = self.buckets.entry(desc.identity_hash()).or_default();

		let neighbour = bucket
			.iter()
			.find(|s| &*s.identity != identity)
			.map(|s| Arc::clone(&s.identity));
		match bucket.iter_mut().find(|s| &*s.identity == identity) {
			Some(slot) => slot.entry = entry,
			None => {
				bucket.push(Slot {
					identity: Arc::from(identity),
					entry,
				});
				self.len += 1;
			}
		}
		Ok((storage, neighbour))
	}

	/// Removes `identity`. Returns false if it was not registered.
	pub(crate) fn remove(&mut self, identity: &str) -> bool {
		let hash = identity_hash(identity);
		let Some(bucket) = self.buckets.get_mut(&hash) else {
			return false;
		};
		let Some(pos) = bucket.iter().position(|s| &*s.identity == identity) else {
			return false;
		};
		bucket.remove(pos);
		if bucket.is_empty() {
			self.buckets.remove(&hash);
		}
		self.len -= 1;
		true
	}

	/// Re-places every identity keyed to `family` after its parent changed.
	///
	/// `previous` is the snapshot the members were stored against. Returns how many
	/// identities ended up stored as members.
	pub(crate) fn rebase_family(
		&mut self,
		previous: &Snapshot,
		config: &FamilyConfig,
		family: &str,
	) -> Result<usize, RegisterError> {
		let mut members = 0;
		for (hash, bucket) in &previous.buckets {
			for (i, slot) in bucket.iter().enumerate() {
				if family_key(&slot.identity, &config.separators) != Some(family) {
					continue;
				}
				let desc = previous.materialize(&slot.entry).map_err(|reason| {
					RegisterError::Corrupted {
						identity: slot.identity.to_string(),
						reason,
					}
				})?;
				let entry = policy::place(&self.families, config, &slot.identity, desc)?;
				if matches!(entry, StoredEntry::Member { .. }) {
					members += 1;
				}
				if let Some(target) = self.buckets.get_mut(hash).and_then(|b| b.get_mut(i)) {
					target.entry = entry;
				}
			}
		}
		Ok(members)
	}
}

fn corrupted(identity: &str, reason: Corruption) -> LookupError {
	LookupError::Corrupted {
		identity: identity.to_owned(),
		reason,
	}
}
