//! Integrity codec for descriptor bytes.
//!
//! CRC-16/MODBUS: reflected polynomial `0xA001`, initial value `0xFFFF`, no final XOR.
//! Detects accidental corruption (all single-bit and most burst errors). It is not an
//! authentication code and offers no protection against deliberate tampering.

const POLY: u16 = 0xA001;
const INIT: u16 = 0xFFFF;

/// Length of the trailing checksum field.
pub const CHECKSUM_LEN: usize = 2;

/// Computes the checksum of `bytes`.
pub fn checksum(bytes: &[u8]) -> u16 {
	let mut crc = INIT;
	for &byte in bytes {
		crc ^= u16::from(byte);
		for _ in 0..8 {
			crc = if crc & 1 != 0 {
				(crc >> 1) ^ POLY
			} else {
				crc >> 1
			};
		}
	}
	crc
}

/// Verifies a buffer whose last two bytes are the big-endian checksum of the rest.
///
/// Returns `false` for buffers too short to hold a checksum.
pub fn verify(bytes: &[u8]) -> bool {
	let Some(split) = bytes.len().checked_sub(CHECKSUM_LEN) else {
		return false;
	};
	let (body, trailer) = bytes.split_at(split);
	u16::from_be_bytes([trailer[0], trailer[1]]) == checksum(body)
}

/// Returns the checksum stored in the trailing two bytes, if present.
pub(crate) fn stored(bytes: &[u8]) -> Option<u16> {
	let split = bytes.len().checked_sub(CHECKSUM_LEN)?;
	Some(u16::from_be_bytes([bytes[split], bytes[split + 1]]))
}
