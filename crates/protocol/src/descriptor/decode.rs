use super::{
	DESCRIPTOR_LEN, DecodeError, DecodedDescriptor, DescriptorFields, MAGIC, RISK_MASK,
	SUPPORTED_VERSIONS, offset,
};
use crate::checksum;
use crate::record::{CapabilityFlags, CapabilityRecord, Field, RiskLevel};

/// Validates and decodes a descriptor.
///
/// Checks run in a fixed order and stop at the first failure: length, magic, version,
/// checksum, field ranges.
pub fn decode(bytes: &[u8]) -> Result<DecodedDescriptor, DecodeError> {
	let bytes: &[u8; DESCRIPTOR_LEN] = bytes
		.try_into()
		.map_err(|_| DecodeError::WrongLength { len: bytes.len() })?;

	let magic = [bytes[0], bytes[1], bytes[2]];
	if magic != MAGIC {
		return Err(DecodeError::BadMagic { found: magic });
	}

	let fields = DescriptorFields::read(bytes);
	if !SUPPORTED_VERSIONS.contains(&fields.version) {
		return Err(DecodeError::UnsupportedVersion(fields.version));
	}

	if !checksum::verify(bytes) {
		let stored = checksum::stored(bytes).unwrap_or_default();
		let computed = checksum::checksum(&bytes[..offset::CHECKSUM]);
		return Err(DecodeError::ChecksumMismatch { stored, computed });
	}

	validate_fields(&fields)?;
	Ok(DecodedDescriptor::from_fields(&fields))
}

/// Decodes a descriptor and attaches the out-of-band identity.
///
/// Fails with [`DecodeError::IdentityMismatch`] when `identity` does not hash to the
/// stored value or has a different length.
pub fn decode_record(bytes: &[u8], identity: &str) -> Result<CapabilityRecord, DecodeError> {
	decode(bytes)?.into_record(identity)
}

pub(crate) fn validate_fields(fields: &DescriptorFields) -> Result<(), DecodeError> {
	if fields.header_flags != 0 {
		return Err(DecodeError::InvalidField(Field::Header));
	}
	if fields.risk_word & !RISK_MASK != 0
		|| RiskLevel::from_code((fields.risk_word & RISK_MASK) as u8).is_none()
	{
		return Err(DecodeError::InvalidField(Field::Risk));
	}
	if CapabilityFlags::from_bits(fields.flags).is_none() {
		return Err(DecodeError::InvalidField(Field::Flags));
	}
	if fields.reserved_byte != 0 || fields.reserved_word != 0 {
		return Err(DecodeError::InvalidField(Field::Reserved));
	}
	Ok(())
}
