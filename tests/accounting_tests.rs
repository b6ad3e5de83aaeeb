//! Delta/peaked arithmetic over arbitrary interval sequences

use cellmem_session::{account, IntervalState, PerAxis};
use proptest::prelude::*;

proptest! {
    #[test]
    fn delta_is_final_minus_previous_final(
        initial in 0i64..100_000,
        steps in prop::collection::vec((0i64..100_000, prop::option::of(0i64..200_000)), 1..40),
    ) {
        let mut state = IntervalState::initial(PerAxis::new(Some(initial), None));
        let mut prev = initial;
        for (final_mb, peak) in steps {
            state = account(&state, PerAxis::new(Some(final_mb), None), PerAxis::new(peak, None), 0.0);
            prop_assert_eq!(state.last_delta_host_mb, Some(final_mb - prev));
            prev = final_mb;
        }
    }

    #[test]
    fn peaked_is_clipped_distance_above_final(
        final_mb in 0i64..100_000,
        peak in prop::option::of(0i64..200_000),
    ) {
        let prior = IntervalState::initial(PerAxis::new(Some(0), Some(0)));
        let next = account(&prior, PerAxis::new(Some(final_mb), Some(final_mb)), PerAxis::new(peak, peak), 0.0);
        let expected = peak.map_or(0, |p| (p - final_mb).max(0));
        prop_assert_eq!(next.last_peaked_host_mb, Some(expected));
        prop_assert_eq!(next.last_peaked_device_mb, Some(expected));
        prop_assert!(expected >= 0);
    }
}

#[test]
fn test_documented_scenario() {
    let prior = IntervalState::initial(PerAxis::new(Some(100), None));
    let next = account(
        &prior,
        PerAxis::new(Some(120), None),
        PerAxis::new(Some(150), None),
        1.0,
    );
    let snap = next.snapshot();
    assert_eq!(snap.gen_mem_used_delta, Some(20));
    assert_eq!(snap.gen_mem_peaked, Some(30));
    assert_eq!(snap.gen_mem_used, Some(120));
    assert!(snap.device_unavailable());
}

#[test]
fn test_reclaimed_interval_has_negative_delta() {
    let prior = IntervalState::initial(PerAxis::new(Some(800), Some(2_000)));
    let next = account(
        &prior,
        PerAxis::new(Some(500), Some(1_200)),
        PerAxis::new(Some(850), Some(2_100)),
        0.0,
    );
    assert_eq!(next.last_delta_host_mb, Some(-300));
    assert_eq!(next.last_peaked_host_mb, Some(350));
    assert_eq!(next.last_delta_device_mb, Some(-800));
    assert_eq!(next.last_peaked_device_mb, Some(900));
}
