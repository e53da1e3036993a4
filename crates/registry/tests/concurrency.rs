//! Readers and writers sharing one registry across threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use toolcap_protocol::{CapabilityFlags, CapabilityRecord, PerformanceProfile, RiskLevel};
use toolcap_registry::{LookupError, Registry};

fn record(identity: &str, risk: RiskLevel, exec: u32) -> CapabilityRecord {
	CapabilityRecord::new(
		identity,
		risk,
		CapabilityFlags::READS_FILES,
		PerformanceProfile::new(exec, 8, 8),
	)
}

#[test]
fn concurrent_registrations_are_not_lost() {
	const THREADS: usize = 8;
	const PER_THREAD: usize = 64;

	let registry = Registry::new();
	registry
		.register_family("pkg", &record("pkg", RiskLevel::Low, 10))
		.unwrap();

	thread::scope(|s| {
		for t in 0..THREADS {
			let registry = &registry;
			s.spawn(move || {
				for i in 0..PER_THREAD {
					let id = format!("pkg t{t}-{i}");
					registry
						.register(&id, &record(&id, RiskLevel::Low, (i % 3) as u32 * 10))
						.unwrap();
				}
			});
		}
	});

	assert_eq!(registry.len(), THREADS * PER_THREAD);
	for t in 0..THREADS {
		for i in 0..PER_THREAD {
			let id = format!("pkg t{t}-{i}");
			assert_eq!(
				registry.lookup(&id).unwrap(),
				record(&id, RiskLevel::Low, (i % 3) as u32 * 10)
			);
		}
	}
	// One family parent plus one registration per mutation.
	assert_eq!(
		registry.snapshot().generation(),
		1 + (THREADS * PER_THREAD) as u64
	);
}

#[test]
fn readers_see_old_or_new_never_partial() {
	let registry = Registry::new();
	let low = record("deploy", RiskLevel::Low, 1);
	let critical = CapabilityRecord::new(
		"deploy",
		RiskLevel::Critical,
		CapabilityFlags::DESTRUCTIVE | CapabilityFlags::NETWORK_ACCESS,
		PerformanceProfile::new(900, 900, 900),
	);
	registry.register("deploy", &low).unwrap();
	let done = AtomicBool::new(false);

	thread::scope(|s| {
		s.spawn(|| {
			for round in 0..500 {
				let next = if round % 2 == 0 { &critical } else { &low };
				registry.register("deploy", next).unwrap();
				if round % 50 == 0 {
					registry.remove("deploy");
					registry.register("deploy", &low).unwrap();
				}
			}
			done.store(true, Ordering::Release);
		});

		for _ in 0..4 {
			s.spawn(|| {
				while !done.load(Ordering::Acquire) {
					match registry.lookup("deploy") {
						Ok(seen) => assert!(seen == low || seen == critical, "torn read: {seen:?}"),
						Err(LookupError::NotFound) => {}
						Err(other) => panic!("unexpected lookup error: {other}"),
					}
				}
			});
		}
	});
}

#[test]
fn pinned_snapshot_survives_concurrent_writes() {
	let registry = Registry::new();
	for i in 0..32 {
		let id = format!("tool {i}");
		registry.register(&id, &record(&id, RiskLevel::Safe, 1)).unwrap();
	}
	let pinned = registry.snapshot();

	thread::scope(|s| {
		s.spawn(|| {
			for i in 0..32 {
				registry.remove(&format!("tool {i}"));
			}
		});
		s.spawn(|| {
			for i in 32..64 {
				let id = format!("tool {i}");
				registry.register(&id, &record(&id, RiskLevel::High, 5)).unwrap();
			}
		});
	});

	assert_eq!(pinned.len(), 32);
	assert_eq!(pinned.find_at_most(RiskLevel::Safe).len(), 32);
	assert_eq!(registry.len(), 32);
	assert!(registry.find_at_most(RiskLevel::Safe).is_empty());
}
