//! Registry container with atomic snapshot publication.
//!
//! # Role
//!
//! Thread-safe entrypoint for registering, looking up, and removing capabilities.
//! Reads load the current [`Snapshot`] without locking. Writes run a
//! compare-and-swap loop: clone the loaded snapshot, apply the change, and publish
//! only if no other writer published in between, otherwise retry from the newer state.
//!
//! # Invariants
//!
//! - Concurrent mutations are linearizable; none is lost.
//! - A reader observes either the state before a mutation or the state after it.
//! - A failed mutation publishes nothing.

use std::sync::Arc;

use arc_swap::ArcSwap;
use toolcap_protocol::{BinaryDescriptor, CapabilityFlags, CapabilityRecord, RiskLevel, encode};

use crate::config::{ConfigError, RegistryConfig};
use crate::entry::RegistryHandle;
use crate::error::{LookupError, RegisterError};
use crate::snapshot::{RegistryStats, Snapshot};

/// Capability registry keyed by command identity.
///
/// Explicitly constructed; independent registries share nothing.
pub struct Registry {
	snap: ArcSwap<Snapshot>,
	config: RegistryConfig,
}

impl Default for Registry {
	fn default() -> Self {
		Self::new()
	}
}

impl std::fmt::Debug for Registry {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let snap = self.snap.load();
		f.debug_struct("Registry")
			.field("label", &self.config.label)
			.field("len", &snap.len())
			.field("generation", &snap.generation())
			.finish()
	}
}

impl Registry {
	/// Creates an empty registry with default configuration.
	pub fn new() -> Self {
		Self {
			snap: ArcSwap::from_pointee(Snapshot::default()),
			config: RegistryConfig::default(),
		}
	}

	/// Creates an empty registry after validating `config`.
	pub fn with_config(config: RegistryConfig) -> Result<Self, ConfigError> {
		config.validate()?;
		Ok(Self {
			snap: ArcSwap::from_pointee(Snapshot::default()),
			config,
		})
	}

	pub fn config(&self) -> &RegistryConfig {
		&self.config
	}

	/// Pins the current state for a series of consistent reads.
	pub fn snapshot(&self) -> Arc<Snapshot> {
		self.snap.load_full()
	}

	/// Encodes `record` and stores it under `identity`, replacing any previous entry.
	///
	/// An identity whose family has a registered parent may be stored as a delta;
	/// lookups cannot tell the difference.
	pub fn register(
		&self,
		identity: &str,
		record: &CapabilityRecord,
	) -> Result<RegistryHandle, RegisterError> {
		check_identity(identity, record)?;
		let desc = encode(record)?;

		let (snap, (storage, neighbour)) = self.update::<_, RegisterError>(|old| {
			let mut next = old.clone();
			let placed = next.insert(&self.config.family, identity, desc)?;
			Ok((Some(next), placed))
		})?;

		if let Some(other) = neighbour {
			tracing::warn!(
				registry = %self.config.label,
				identity,
				other = &*other,
				hash = desc.identity_hash(),
				"identity hash collision, entries kept apart"
			);
		}
		tracing::debug!(
			registry = %self.config.label,
			identity,
			risk = %record.risk,
			?storage,
			generation = snap.generation(),
			"registered capability"
		);

		Ok(RegistryHandle {
			identity: identity.to_owned(),
			hash: desc.identity_hash(),
			storage,
			generation: snap.generation(),
		})
	}

	/// Returns the record registered under `identity`.
	pub fn lookup(&self, identity: &str) -> Result<CapabilityRecord, LookupError> {
		self.snap.load().lookup(identity)
	}

	/// Returns the materialised descriptor registered under `identity`.
	pub fn lookup_descriptor(&self, identity: &str) -> Result<BinaryDescriptor, LookupError> {
		self.snap.load().lookup_descriptor(identity)
	}

	/// Removes `identity`. Returns false if it was not registered.
	pub fn remove(&self, identity: &str) -> bool {
		let removed = self
			.update::<_, std::convert::Infallible>(|old| {
				if !old.contains(identity) {
					return Ok((None, false));
				}
				let mut next = old.clone();
				next.remove(identity);
				Ok((Some(next), true))
			})
			.map(|(_, removed)| removed)
			.unwrap_or_else(|never| match never {});

		if removed {
			tracing::debug!(registry = %self.config.label, identity, "removed capability");
		}
		removed
	}

	/// Installs or replaces the parent descriptor of `family`.
	///
	/// Existing identities of the family are rematerialised against the previous
	/// parent and re-placed against the new one. Returns how many are now stored
	/// as deltas.
	pub fn register_family(
		&self,
		family: &str,
		parent: &CapabilityRecord,
	) -> Result<usize, RegisterError> {
		check_identity(family, parent)?;
		let desc = encode(parent)?;

		let (snap, members) = self.update::<_, RegisterError>(|old| {
			let mut next = old.clone();
			next.families.insert(Arc::from(family), desc);
			let members = next.rebase_family(old, &self.config.family, family)?;
			Ok((Some(next), members))
		})?;

		tracing::debug!(
			registry = %self.config.label,
			family,
			members,
			generation = snap.generation(),
			"registered family parent"
		);
		Ok(members)
	}

	/// Drops the parent of `family`, converting its members to standalone storage.
	///
	/// Returns false if no such family was registered.
	pub fn remove_family(&self, family: &str) -> Result<bool, RegisterError> {
		let (_, converted) = self.update::<_, RegisterError>(|old| {
			if !old.families.contains_key(family) {
				return Ok((None, None));
			}
			let mut next = old.clone();
			next.families.remove(family);
			next.rebase_family(old, &self.config.family, family)?;
			let converted = old.stats().members - next.stats().members;
			Ok((Some(next), Some(converted)))
		})?;

		if let Some(converted) = converted {
			tracing::debug!(registry = %self.config.label, family, converted, "removed family parent");
		}
		Ok(converted.is_some())
	}

	pub fn len(&self) -> usize {
		self.snap.load().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn contains(&self, identity: &str) -> bool {
		self.snap.load().contains(identity)
	}

	/// Registered identities in sorted order.
	pub fn identities(&self) -> Vec<String> {
		let snap = self.snap.load();
		snap.identities().into_iter().map(str::to_owned).collect()
	}

	/// Records whose risk does not exceed `max`, sorted by identity.
	pub fn find_at_most(&self, max: RiskLevel) -> Vec<CapabilityRecord> {
		self.snap.load().find_at_most(max)
	}

	/// Records that declare every flag in `required`, sorted by identity.
	pub fn find_with(&self, required: CapabilityFlags) -> Vec<CapabilityRecord> {
		self.snap.load().find_with(required)
	}

	pub fn stats(&self) -> RegistryStats {
		self.snap.load().stats()
	}

	/// Applies `f` to the latest snapshot and publishes its result with CAS.
	///
	/// `f` returns the replacement snapshot, or `None` to leave the registry as is,
	/// along with a value passed back to the caller. It may run more than once.
	fn update<R, E>(
		&self,
		mut f: impl FnMut(&Snapshot) -> Result<(Option<Snapshot>, R), E>,
	) -> Result<(Arc<Snapshot>, R), E> {
		loop {
			let old = self.snap.load_full();
			let (next, out) = f(&old)?;
			let Some(mut next) = next else {
				return Ok((old, out));
			};
			next.generation = old.generation + 1;
			let next = Arc::new(next);

			let prev = self.snap.compare_and_swap(&old, Arc::clone(&next));
			if Arc::ptr_eq(&prev, &old) {
				return Ok((next, out));
			}
			tracing::trace!(registry = %self.config.label, "snapshot changed concurrently, retrying");
		}
	}
}

fn check_identity(identity: &str, record: &CapabilityRecord) -> Result<(), RegisterError> {
	if record.identity != identity {
		return Err(RegisterError::IdentityMismatch {
			requested: identity.to_owned(),
			record: record.identity.clone(),
		});
	}
	Ok(())
}
