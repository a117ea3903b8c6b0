//! Property tests for the near-miss detector.
//!
//! 1. The grid scan counts exactly the pairs the pairwise scan counts.
//! 2. Pairs farther apart than the proximity threshold never contribute.
//! 3. Average risk is zero exactly when nothing qualifies.

use phasetune::config::{DetectorConfig, ScanStrategy};
use phasetune::risk::{NearMissDetector, VehicleSnapshot};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

fn vehicles(max: usize, extent: f64) -> impl Strategy<Value = Vec<VehicleSnapshot>> {
    prop::collection::vec((-extent..extent, -extent..extent, -5.0f64..30.0), 0..max).prop_map(
        |raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, (x, y, speed))| VehicleSnapshot::new(format!("veh{i}"), x, y, speed))
                .collect()
        },
    )
}

fn detector(proximity: f64, ttc: f64, scan: ScanStrategy) -> NearMissDetector {
    NearMissDetector::new(&DetectorConfig {
        proximity_threshold: proximity,
        ttc_threshold: ttc,
        scan,
    })
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Grid equals pairwise
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn grid_scan_matches_pairwise(
        population in vehicles(60, 300.0),
        proximity in 5.0f64..120.0,
        ttc in 0.5f64..6.0,
    ) {
        let pairwise = detector(proximity, ttc, ScanStrategy::Pairwise).assess(&population);
        let grid = detector(proximity, ttc, ScanStrategy::Grid).assess(&population);
        prop_assert_eq!(pairwise.near_miss_count, grid.near_miss_count);
        prop_assert!((pairwise.avg_risk - grid.avg_risk).abs() < 1e-9);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Proximity cut-off
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn distant_pairs_never_count(
        gap in 50.001f64..1000.0,
        speed_a in 0.0f64..200.0,
        speed_b in 0.0f64..200.0,
    ) {
        let pair = [
            VehicleSnapshot::new("a", 0.0, 0.0, speed_a),
            VehicleSnapshot::new("b", gap, 0.0, speed_b),
        ];
        let d = NearMissDetector::default();
        prop_assert!(d.time_to_collision(&pair[0], &pair[1]).is_none());
        prop_assert_eq!(d.assess(&pair).near_miss_count, 0);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Zero risk iff no near miss
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn zero_risk_iff_no_near_miss(population in vehicles(30, 80.0)) {
        let sample = NearMissDetector::default().assess(&population);
        if sample.near_miss_count == 0 {
            prop_assert!(sample.avg_risk.abs() < f64::EPSILON);
        } else {
            prop_assert!(sample.avg_risk >= 0.0);
            prop_assert!(sample.avg_risk < 2.0);
        }
    }
}

#[test]
fn reference_pairs() {
    let d = NearMissDetector::default();
    let at_threshold = [
        VehicleSnapshot::new("a", 0.0, 0.0, 5.0),
        VehicleSnapshot::new("b", 10.0, 0.0, 0.0),
    ];
    assert_eq!(d.assess(&at_threshold).near_miss_count, 0);

    let closing = [
        VehicleSnapshot::new("a", 0.0, 0.0, 5.0),
        VehicleSnapshot::new("b", 10.0, 0.0, -1.0),
    ];
    let sample = d.assess(&closing);
    assert_eq!(sample.near_miss_count, 1);
    assert!((sample.avg_risk - 1.67).abs() < 0.01);

    assert_eq!(d.assess(&[]).near_miss_count, 0);
}
