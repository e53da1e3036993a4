use crate::record::Field;

/// Caller-correctable encoding failures. Encoding never truncates.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
	/// A numeric field does not fit its allotted wire width.
	#[error("{0} does not fit its wire width")]
	ValueOutOfRange(Field),
	/// The identity does not fit the one-byte length field.
	#[error("identity is {len} bytes, at most 255 fit the length byte")]
	IdentityTooLong { len: usize },
}

/// Descriptor validation failures, reported in validation order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
	/// Input is not exactly 24 bytes.
	#[error("descriptor must be 24 bytes, got {len}")]
	WrongLength { len: usize },
	/// Format identifier is not `TCP`.
	#[error("bad magic {found:02x?}")]
	BadMagic { found: [u8; 3] },
	/// Protocol version is not supported by this decoder.
	#[error("unsupported protocol version {0}")]
	UnsupportedVersion(u8),
	/// Stored checksum disagrees with the recomputed one: the bytes are corrupt.
	#[error("checksum mismatch: stored {stored:#06x}, computed {computed:#06x}")]
	ChecksumMismatch { stored: u16, computed: u16 },
	/// A field holds an illegal value or a reserved bit is set.
	#[error("invalid {0} field")]
	InvalidField(Field),
	/// The supplied identity does not match the stored hash or length.
	#[error("identity does not match descriptor")]
	IdentityMismatch,
}
