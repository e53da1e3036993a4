//! Logical capability records, prior to encoding.

use serde::{Deserialize, Serialize};

/// Ordered risk classification of executing a tool.
///
/// Ordering is meaningful: `Safe < Low < Medium < High < Critical`. Policies compare
/// monotonically ("permit if risk <= X").
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RiskLevel {
	/// No side effects.
	#[default]
	Safe = 0,
	/// Read-mostly, information gathering.
	Low = 1,
	/// Local, recoverable modifications.
	Medium = 2,
	/// System modifications or elevated privilege.
	High = 3,
	/// System-wide destructive impact.
	Critical = 4,
}

impl RiskLevel {
	/// All levels in ascending order.
	pub const ALL: [RiskLevel; 5] = [
		RiskLevel::Safe,
		RiskLevel::Low,
		RiskLevel::Medium,
		RiskLevel::High,
		RiskLevel::Critical,
	];

	/// Returns the wire code.
	pub const fn code(self) -> u8 {
		self as u8
	}

	/// Parses a wire code, rejecting anything outside `0..=4`.
	pub const fn from_code(code: u8) -> Option<Self> {
		match code {
			0 => Some(Self::Safe),
			1 => Some(Self::Low),
			2 => Some(Self::Medium),
			3 => Some(Self::High),
			4 => Some(Self::Critical),
			_ => None,
		}
	}

	/// Returns true if this level does not exceed `max`.
	pub fn permits(self, max: RiskLevel) -> bool {
		self <= max
	}
}

impl std::fmt::Display for RiskLevel {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			Self::Safe => "safe",
			Self::Low => "low",
			Self::Medium => "medium",
			Self::High => "high",
			Self::Critical => "critical",
		};
		f.write_str(s)
	}
}

/// A single behavioral capability of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
	/// Reads files from disk.
	ReadsFiles,
	/// Creates or modifies files.
	ModifiesFiles,
	/// Deletes files.
	DeletesFiles,
	/// May destroy data.
	Destructive,
	/// Opens network connections.
	NetworkAccess,
	/// Needs root or sudo.
	RequiresElevation,
	/// Spawns child processes.
	CreatesSubprocesses,
	/// Changes system configuration.
	ModifiesSystem,
	/// Signals or controls other processes.
	ProcessControl,
	/// Can grant additional privileges.
	PrivilegeEscalation,
	/// Effects cannot be undone.
	Irreversible,
	/// Consumes standard input.
	ReadsStdin,
	/// Produces unbounded streaming output.
	StreamingOutput,
	/// Operates recursively over trees.
	Recursive,
}

bitflags::bitflags! {
	/// Fixed 16-bit capability set, protocol version 2.
	///
	/// Bit positions are part of the wire format. Bits 14 and 15 are reserved and
	/// rejected by the decoder.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
	#[serde(transparent)]
	pub struct CapabilityFlags: u16 {
		/// Reads files from disk.
		const READS_FILES = 1 << 0;
		/// Creates or modifies files.
		const MODIFIES_FILES = 1 << 1;
		/// Deletes files.
		const DELETES_FILES = 1 << 2;
		/// May destroy data.
		const DESTRUCTIVE = 1 << 3;
		/// Opens network connections.
		const NETWORK_ACCESS = 1 << 4;
		/// Needs root or sudo.
		const REQUIRES_ELEVATION = 1 << 5;
		/// Spawns child processes.
		const CREATES_SUBPROCESSES = 1 << 6;
		/// Changes system configuration.
		const MODIFIES_SYSTEM = 1 << 7;
		/// Signals or controls other processes.
		const PROCESS_CONTROL = 1 << 8;
		/// Can grant additional privileges.
		const PRIVILEGE_ESCALATION = 1 << 9;
		/// Effects cannot be undone.
		const IRREVERSIBLE = 1 << 10;
		/// Consumes standard input.
		const READS_STDIN = 1 << 11;
		/// Produces unbounded streaming output.
		const STREAMING_OUTPUT = 1 << 12;
		/// Operates recursively over trees.
		const RECURSIVE = 1 << 13;
	}
}

impl Capability {
	/// Returns the bitflag for this capability.
	pub const fn as_set(self) -> CapabilityFlags {
		match self {
			Self::ReadsFiles => CapabilityFlags::READS_FILES,
			Self::ModifiesFiles => CapabilityFlags::MODIFIES_FILES,
			Self::DeletesFiles => CapabilityFlags::DELETES_FILES,
			Self::Destructive => CapabilityFlags::DESTRUCTIVE,
			Self::NetworkAccess => CapabilityFlags::NETWORK_ACCESS,
			Self::RequiresElevation => CapabilityFlags::REQUIRES_ELEVATION,
			Self::CreatesSubprocesses => CapabilityFlags::CREATES_SUBPROCESSES,
			Self::ModifiesSystem => CapabilityFlags::MODIFIES_SYSTEM,
			Self::ProcessControl => CapabilityFlags::PROCESS_CONTROL,
			Self::PrivilegeEscalation => CapabilityFlags::PRIVILEGE_ESCALATION,
			Self::Irreversible => CapabilityFlags::IRREVERSIBLE,
			Self::ReadsStdin => CapabilityFlags::READS_STDIN,
			Self::StreamingOutput => CapabilityFlags::STREAMING_OUTPUT,
			Self::Recursive => CapabilityFlags::RECURSIVE,
		}
	}
}

impl From<Capability> for CapabilityFlags {
	fn from(cap: Capability) -> Self {
		cap.as_set()
	}
}

impl FromIterator<Capability> for CapabilityFlags {
	fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
		let mut set = CapabilityFlags::empty();
		for cap in iter {
			set |= cap.as_set();
		}
		set
	}
}

impl CapabilityFlags {
	/// Returns true if `cap` is present.
	pub const fn has(self, cap: Capability) -> bool {
		self.contains(cap.as_set())
	}

	/// Shorthand for [`CapabilityFlags::DESTRUCTIVE`].
	pub const fn is_destructive(self) -> bool {
		self.contains(Self::DESTRUCTIVE)
	}

	/// Shorthand for [`CapabilityFlags::NETWORK_ACCESS`].
	pub const fn needs_network(self) -> bool {
		self.contains(Self::NETWORK_ACCESS)
	}

	/// Shorthand for [`CapabilityFlags::REQUIRES_ELEVATION`].
	pub const fn needs_elevation(self) -> bool {
		self.contains(Self::REQUIRES_ELEVATION)
	}
}

/// Performance classes measured by an external producer.
///
/// Values are carried wider than the wire so the encoder can reject, rather than
/// truncate, anything that does not fit 16 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PerformanceProfile {
	/// Execution-time class.
	pub exec_time: u32,
	/// Memory-usage class.
	pub memory: u32,
	/// Output-size class.
	pub output_size: u32,
}

impl PerformanceProfile {
	pub const fn new(exec_time: u32, memory: u32, output_size: u32) -> Self {
		Self {
			exec_time,
			memory,
			output_size,
		}
	}
}

/// Descriptor field, used in error reports and delta entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
	/// Format identifier and header byte.
	Header,
	/// 32-bit identity hash.
	IdentityHash,
	/// Capability flag bitset.
	Flags,
	/// Risk word.
	Risk,
	/// Execution-time class.
	ExecTime,
	/// Memory class.
	Memory,
	/// Output-size class.
	OutputSize,
	/// Identity length byte.
	IdentityLen,
	/// Reserved bytes.
	Reserved,
}

impl std::fmt::Display for Field {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let s = match self {
			Self::Header => "header",
			Self::IdentityHash => "identity_hash",
			Self::Flags => "capability_flags",
			Self::Risk => "risk_level",
			Self::ExecTime => "exec_time",
			Self::Memory => "memory",
			Self::OutputSize => "output_size",
			Self::IdentityLen => "identity_len",
			Self::Reserved => "reserved",
		};
		f.write_str(s)
	}
}

/// Capability metadata for one command, as produced by an analysis pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CapabilityRecord {
	/// Command identity, e.g. `"git push"`.
	pub identity: String,
	/// Risk classification.
	pub risk: RiskLevel,
	/// Behavioral capabilities.
	#[serde(default)]
	pub flags: CapabilityFlags,
	/// Performance classes.
	#[serde(default)]
	pub performance: PerformanceProfile,
}

impl CapabilityRecord {
	pub fn new(
		identity: impl Into<String>,
		risk: RiskLevel,
		flags: CapabilityFlags,
		performance: PerformanceProfile,
	) -> Self {
		Self {
			identity: identity.into(),
			risk,
			flags,
			performance,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_risk_ordering() {
		assert!(RiskLevel::Safe < RiskLevel::Low);
		assert!(RiskLevel::High < RiskLevel::Critical);
		assert!(RiskLevel::Medium.permits(RiskLevel::High));
		assert!(!RiskLevel::Critical.permits(RiskLevel::High));
	}

	#[test]
	fn test_risk_codes_roundtrip() {
		for level in RiskLevel::ALL {
			assert_eq!(RiskLevel::from_code(level.code()), Some(level));
		}
		assert_eq!(RiskLevel::from_code(5), None);
	}

	#[test]
	fn test_capability_collect() {
		let set: CapabilityFlags = [Capability::Destructive, Capability::ModifiesFiles]
			.into_iter()
			.collect();
		assert!(set.is_destructive());
		assert!(set.has(Capability::ModifiesFiles));
		assert!(!set.needs_network());
		assert_eq!(set.bits(), 0b1010);
	}

	#[test]
	fn test_reserved_bits_unnamed() {
		assert_eq!(CapabilityFlags::all().bits() & 0xC000, 0);
		assert!(CapabilityFlags::from_bits(0x4000).is_none());
	}
}
