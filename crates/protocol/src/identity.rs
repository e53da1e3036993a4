//! Command identity hashing.

use sha2::{Digest, Sha256};

/// Maximum identity length in bytes (stored in a single length byte).
pub const MAX_IDENTITY_LEN: usize = u8::MAX as usize;

/// Returns the 32-bit identity hash stored at descriptor offset 4.
///
/// The hash is the first four bytes of the SHA-256 digest of the UTF-8 identity,
/// read big-endian. Distinct identities may share a hash; consumers must compare
/// the identity string itself before trusting a match.
pub fn identity_hash(identity: &str) -> u32 {
	let digest = Sha256::digest(identity.as_bytes());
	u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_hash_is_deterministic() {
		assert_eq!(identity_hash("git commit"), identity_hash("git commit"));
		assert_ne!(identity_hash("git commit"), identity_hash("git push"));
	}

	#[test]
	fn test_hash_matches_digest_prefix() {
		// SHA-256("abc") = ba7816bf...
		assert_eq!(identity_hash("abc"), 0xBA78_16BF);
	}
}
