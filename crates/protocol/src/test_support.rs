//! Shared proptest strategies.

use proptest::prelude::*;

use crate::record::{CapabilityFlags, CapabilityRecord, PerformanceProfile, RiskLevel};

pub(crate) fn arb_risk() -> impl Strategy<Value = RiskLevel> {
	prop::sample::select(RiskLevel::ALL.to_vec())
}

pub(crate) fn arb_flags() -> impl Strategy<Value = CapabilityFlags> {
	any::<u16>().prop_map(CapabilityFlags::from_bits_truncate)
}

pub(crate) fn arb_performance() -> impl Strategy<Value = PerformanceProfile> {
	(any::<u16>(), any::<u16>(), any::<u16>())
		.prop_map(|(exec, mem, out)| PerformanceProfile::new(exec.into(), mem.into(), out.into()))
}

pub(crate) fn arb_record() -> impl Strategy<Value = CapabilityRecord> {
	(
		"[a-z]{1,12}( [a-z-]{1,16})?",
		arb_risk(),
		arb_flags(),
		arb_performance(),
	)
		.prop_map(|(identity, risk, flags, perf)| {
			CapabilityRecord::new(identity, risk, flags, perf)
		})
}
