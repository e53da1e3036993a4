use super::{BinaryDescriptor, DescriptorFields, EncodingError, PROTOCOL_VERSION};
use crate::identity::{MAX_IDENTITY_LEN, identity_hash};
use crate::record::{CapabilityFlags, CapabilityRecord, Field};

/// Encodes a record into its 24-byte descriptor.
///
/// Pure: the same record always yields the same bytes.
pub fn encode(record: &CapabilityRecord) -> Result<BinaryDescriptor, EncodingError> {
	let len = record.identity.len();
	if len > MAX_IDENTITY_LEN {
		return Err(EncodingError::IdentityTooLong { len });
	}

	// `from_bits_retain` can smuggle reserved bits past the type.
	if record.flags.bits() & !CapabilityFlags::all().bits() != 0 {
		return Err(EncodingError::ValueOutOfRange(Field::Flags));
	}

	let perf = &record.performance;
	let fields = DescriptorFields {
		version: PROTOCOL_VERSION,
		identity_hash: identity_hash(&record.identity),
		flags: record.flags.bits(),
		risk_word: u16::from(record.risk.code()),
		exec_time: narrow(perf.exec_time, Field::ExecTime)?,
		memory: narrow(perf.memory, Field::Memory)?,
		output_size: narrow(perf.output_size, Field::OutputSize)?,
		identity_len: len as u8,
		..DescriptorFields::default()
	};

	Ok(BinaryDescriptor::from_validated(fields.write()))
}

fn narrow(value: u32, field: Field) -> Result<u16, EncodingError> {
	u16::try_from(value).map_err(|_| EncodingError::ValueOutOfRange(field))
}
