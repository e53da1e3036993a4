use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;

use super::*;
use crate::checksum;
use crate::record::{CapabilityRecord, Field};
use crate::test_support::arb_record;

fn delete_record() -> CapabilityRecord {
	CapabilityRecord::new(
		"tool.delete",
		RiskLevel::Critical,
		CapabilityFlags::DESTRUCTIVE | CapabilityFlags::MODIFIES_FILES,
		PerformanceProfile::new(10, 5, 1),
	)
}

fn reseal(bytes: &mut [u8; DESCRIPTOR_LEN]) {
	let crc = checksum::checksum(&bytes[..offset::CHECKSUM]);
	bytes[offset::CHECKSUM..].copy_from_slice(&crc.to_be_bytes());
}

#[test]
fn test_layout_offsets() {
	let desc = encode(&delete_record()).unwrap();
	let b = desc.as_bytes();

	assert_eq!(&b[0..3], b"TCP");
	assert_eq!(b[3], PROTOCOL_VERSION);
	assert_eq!(&b[4..8], &crate::identity_hash("tool.delete").to_be_bytes());
	assert_eq!(&b[8..10], &0x000Au16.to_be_bytes());
	assert_eq!(&b[10..12], &[0, 4]);
	assert_eq!(&b[12..14], &[0, 10]);
	assert_eq!(&b[14..16], &[0, 5]);
	assert_eq!(&b[16..18], &[0, 1]);
	assert_eq!(b[18], 11);
	assert_eq!(&b[19..22], &[0, 0, 0]);
	assert_eq!(desc.checksum(), checksum::checksum(&b[..22]));
}

#[test]
fn test_scenario_roundtrip() {
	let record = delete_record();
	let desc = encode(&record).unwrap();

	let decoded = decode_record(desc.as_bytes(), "tool.delete").unwrap();
	assert_eq!(decoded, record);
	assert_eq!(encode(&decoded).unwrap(), desc);
}

#[test]
fn test_identity_mismatch() {
	let desc = encode(&delete_record()).unwrap();
	assert_eq!(
		decode_record(desc.as_bytes(), "tool.deleet"),
		Err(DecodeError::IdentityMismatch)
	);
}

#[test]
fn test_identity_too_long() {
	let mut record = delete_record();
	record.identity = "x".repeat(256);
	assert_eq!(
		encode(&record),
		Err(EncodingError::IdentityTooLong { len: 256 })
	);

	record.identity = "x".repeat(255);
	assert!(encode(&record).is_ok());
}

#[rstest]
#[case(PerformanceProfile::new(65_536, 0, 0), Field::ExecTime)]
#[case(PerformanceProfile::new(0, 70_000, 0), Field::Memory)]
#[case(PerformanceProfile::new(0, 0, u32::MAX), Field::OutputSize)]
fn test_value_out_of_range(#[case] perf: PerformanceProfile, #[case] field: Field) {
	let mut record = delete_record();
	record.performance = perf;
	assert_eq!(encode(&record), Err(EncodingError::ValueOutOfRange(field)));
}

#[test]
fn test_reserved_flag_bits_rejected_by_encoder() {
	let mut record = delete_record();
	record.flags = CapabilityFlags::from_bits_retain(0x8000);
	assert_eq!(
		encode(&record),
		Err(EncodingError::ValueOutOfRange(Field::Flags))
	);
}

#[test]
fn test_max_values_fit() {
	let record = CapabilityRecord::new(
		"x",
		RiskLevel::Safe,
		CapabilityFlags::all(),
		PerformanceProfile::new(65_535, 65_535, 65_535),
	);
	let desc = encode(&record).unwrap();
	assert_eq!(decode_record(desc.as_bytes(), "x").unwrap(), record);
}

#[rstest]
#[case(0)]
#[case(23)]
#[case(25)]
fn test_wrong_length(#[case] len: usize) {
	let bytes = vec![0u8; len];
	assert_eq!(decode(&bytes), Err(DecodeError::WrongLength { len }));
}

#[test]
fn test_bad_magic_before_checksum() {
	let mut bytes = encode(&delete_record()).unwrap().into_bytes();
	bytes[0] = b'X';
	assert_eq!(
		decode(&bytes),
		Err(DecodeError::BadMagic { found: *b"XCP" })
	);
}

#[test]
fn test_unsupported_version() {
	let mut bytes = encode(&delete_record()).unwrap().into_bytes();
	bytes[3] = 0x01;
	reseal(&mut bytes);
	assert_eq!(decode(&bytes), Err(DecodeError::UnsupportedVersion(1)));
}

#[test]
fn test_checksum_mismatch() {
	let mut bytes = encode(&delete_record()).unwrap().into_bytes();
	bytes[11] = 0;
	assert!(matches!(
		decode(&bytes),
		Err(DecodeError::ChecksumMismatch { .. })
	));
}

#[rstest]
#[case::risk_code(10, [0x00, 0x05], Field::Risk)]
#[case::risk_reserved(10, [0x80, 0x01], Field::Risk)]
#[case::flag_reserved(8, [0x40, 0x00], Field::Flags)]
#[case::reserved_word(20, [0x00, 0x01], Field::Reserved)]
#[case::reserved_byte(18, [0x0B, 0x01], Field::Reserved)]
fn test_invalid_fields(#[case] at: usize, #[case] value: [u8; 2], #[case] field: Field) {
	let mut bytes = encode(&delete_record()).unwrap().into_bytes();
	bytes[at..at + 2].copy_from_slice(&value);
	reseal(&mut bytes);
	assert_eq!(decode(&bytes), Err(DecodeError::InvalidField(field)));
}

#[test]
fn test_header_flags_rejected() {
	let mut bytes = encode(&delete_record()).unwrap().into_bytes();
	bytes[3] |= 0x10;
	reseal(&mut bytes);
	assert_eq!(decode(&bytes), Err(DecodeError::InvalidField(Field::Header)));
}

/// Every single-bit flip is rejected. Past the header it is always a checksum failure;
/// inside the magic/version bytes the earlier checks may fire first.
#[test]
fn test_single_bit_flips_detected() {
	let original = encode(&delete_record()).unwrap().into_bytes();
	for byte in 0..DESCRIPTOR_LEN {
		for bit in 0..8 {
			let mut bytes = original;
			bytes[byte] ^= 1 << bit;
			let err = decode(&bytes).expect_err("flip must be detected");
			if byte >= offset::IDENTITY_HASH {
				assert!(
					matches!(err, DecodeError::ChecksumMismatch { .. }),
					"byte {byte} bit {bit}: {err:?}"
				);
			}
		}
	}
}

#[test]
fn test_try_from_validates() {
	let desc = encode(&delete_record()).unwrap();
	let slice: &[u8] = desc.as_ref();
	assert_eq!(BinaryDescriptor::try_from(slice).unwrap(), desc);

	let mut bytes = desc.into_bytes();
	bytes[5] ^= 0xFF;
	assert!(BinaryDescriptor::try_from(bytes).is_err());
}

#[test]
fn test_view_matches_decode() {
	let desc = encode(&delete_record()).unwrap();
	assert_eq!(desc.view(), decode(desc.as_bytes()).unwrap());
	assert_eq!(desc.version(), PROTOCOL_VERSION);
	assert_eq!(desc.identity_hash(), crate::identity_hash("tool.delete"));
}

proptest! {
	/// `decode(encode(r)) == r` and re-encoding is byte-identical.
	#[test]
	fn prop_roundtrip(record in arb_record()) {
		let desc = encode(&record).unwrap();
		let decoded = decode_record(desc.as_bytes(), &record.identity).unwrap();
		prop_assert_eq!(&decoded, &record);
		prop_assert_eq!(encode(&decoded).unwrap(), desc);
	}
}
