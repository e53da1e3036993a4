use toolcap_protocol::{CompressionError, DecodeError, EncodingError};

/// Why a registration was rejected. The registry is unchanged after any error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegisterError {
	/// The record does not fit the descriptor format.
	#[error("cannot encode record: {0}")]
	Encoding(#[from] EncodingError),

	/// The identity argument and the record's own identity disagree.
	#[error("identity '{requested}' does not match record identity '{record}'")]
	IdentityMismatch { requested: String, record: String },

	/// Delta compression against a family parent failed.
	#[error("family compression failed: {0}")]
	Compression(#[from] CompressionError),

	/// An existing member could not be rematerialised while rebasing its family.
	#[error("stored entry for '{identity}' is corrupted: {reason}")]
	Corrupted { identity: String, reason: Corruption },
}

/// Outcome of a failed lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
	/// Nothing is stored under the identity's hash.
	#[error("no capability registered")]
	NotFound,

	/// The hash bucket holds only other identities.
	#[error("'{requested}' shares identity hash {hash:#010x} with registered '{stored}'")]
	Collision {
		requested: String,
		stored: String,
		hash: u32,
	},

	/// The stored entry no longer reconstructs a valid descriptor.
	#[error("stored entry for '{identity}' is corrupted: {reason}")]
	Corrupted { identity: String, reason: Corruption },
}

/// Why a stored entry failed to materialise.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Corruption {
	#[error("family parent '{0}' is missing")]
	MissingParent(String),
	#[error(transparent)]
	Merge(#[from] CompressionError),
	#[error(transparent)]
	Decode(#[from] DecodeError),
}
