use crate::descriptor::DecodeError;
use crate::record::Field;

/// Failures of hierarchical compression and merging.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompressionError {
	/// Parent and member were encoded with different protocol versions.
	#[error("cannot merge across protocol versions: parent v{parent}, member v{member}")]
	VersionMismatch { parent: u8, member: u8 },
	/// The delta bytes are not a well-formed delta record.
	#[error("malformed delta: {0}")]
	Malformed(#[from] MalformedDelta),
	/// Parent plus delta did not produce a valid descriptor.
	#[error("merged descriptor is invalid: {0}")]
	InvalidMerge(#[source] DecodeError),
}

/// Structural defects in delta bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedDelta {
	#[error("delta is {len} bytes, more than any field set can need")]
	TooLong { len: usize },
	#[error("entry at offset {at} is truncated")]
	Truncated { at: usize },
	#[error("unknown field id {0}")]
	UnknownField(u8),
	#[error("{field} entry is {width} bytes wide")]
	WidthTooLarge { field: Field, width: u8 },
	#[error("{field} entry is not minimally encoded")]
	NonMinimal { field: Field },
	#[error("{field} entry is out of order or repeated")]
	OutOfOrder { field: Field },
}
