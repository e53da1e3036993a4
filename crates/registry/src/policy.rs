//! Storage placement for newly registered descriptors.
//!
//! A descriptor becomes a family member only when all of these hold:
//!
//! 1. family storage is enabled,
//! 2. the identity has a family key with a registered parent,
//! 3. the delta changes at most `max_differing_fields` behavioral fields, and
//! 4. the delta is shorter than a full descriptor.
//!
//! Anything else is stored standalone. Lookups are unaffected by the choice.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use toolcap_protocol::{BinaryDescriptor, DESCRIPTOR_LEN, compress_family, family_key};

use crate::config::FamilyConfig;
use crate::entry::StoredEntry;
use crate::error::RegisterError;

pub(crate) fn place(
	families: &FxHashMap<Arc<str>, BinaryDescriptor>,
	config: &FamilyConfig,
	identity: &str,
	desc: BinaryDescriptor,
) -> Result<StoredEntry, RegisterError> {
	if !config.enabled {
		return Ok(StoredEntry::Standalone(desc));
	}
	let Some((family, parent)) = family_key(identity, &config.separators)
		.and_then(|key| families.get_key_value(key))
	else {
		return Ok(StoredEntry::Standalone(desc));
	};

	let delta = compress_family(parent, &desc)?;
	let changes = delta.behavioral_changes();
	if changes > config.max_differing_fields || delta.len() >= DESCRIPTOR_LEN {
		tracing::trace!(
			identity,
			family = &**family,
			changes,
			delta_len = delta.len(),
			"member too far from parent, storing standalone"
		);
		return Ok(StoredEntry::Standalone(desc));
	}

	Ok(StoredEntry::Member {
		family: Arc::clone(family),
		delta,
	})
}
