//! Stored entry representation and the handle returned by registration.

use std::sync::Arc;

use toolcap_protocol::{BinaryDescriptor, DESCRIPTOR_LEN, DeltaRecord};

/// How one identity's descriptor is held in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StoredEntry {
	Standalone(BinaryDescriptor),
	/// Delta against the parent registered for `family`.
	Member {
		family: Arc<str>,
		delta: DeltaRecord,
	},
}

impl StoredEntry {
	/// Bytes this entry occupies, not counting a shared parent.
	pub(crate) fn stored_len(&self) -> usize {
		match self {
			Self::Standalone(_) => DESCRIPTOR_LEN,
			Self::Member { delta, .. } => delta.len(),
		}
	}

	pub(crate) fn storage(&self) -> Storage {
		match self {
			Self::Standalone(_) => Storage::Standalone,
			Self::Member { family, delta } => Storage::FamilyMember {
				family: family.to_string(),
				delta_len: delta.len(),
			},
		}
	}
}

/// One identity inside a hash bucket.
#[derive(Debug, Clone)]
pub(crate) struct Slot {
	pub identity: Arc<str>,
	pub entry: StoredEntry,
}

/// Storage strategy the registry chose for an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
	Standalone,
	FamilyMember {
		family: String,
		/// Encoded delta size in bytes.
		delta_len: usize,
	},
}

impl Storage {
	pub fn is_family_member(&self) -> bool {
		matches!(self, Self::FamilyMember { .. })
	}
}

/// Receipt for a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryHandle {
	pub identity: String,
	/// 32-bit identity hash the entry is indexed by.
	pub hash: u32,
	pub storage: Storage,
	/// Generation of the snapshot that first contained this registration.
	pub generation: u64,
}
