use super::common::*;
use crate::routing::{
    ActivityFlags, CandidateLimits, RealtimeValidator, Rejection, SelectionConfig, UsageStats,
};
use rust_decimal_macros::dec;

#[test]
fn idle_active_candidate_passes() {
    let candidate = endpoint("ep-1");

    let verdict =
        RealtimeValidator::validate(&candidate, &idle_usage(), dec!(500), now(), &config());

    assert!(verdict.is_ok());
}

#[test]
fn legacy_flag_keeps_candidate_available() {
    let mut candidate = endpoint("ep-legacy");
    candidate.activity = ActivityFlags {
        is_active: false,
        legacy_enabled: true,
    };

    let verdict =
        RealtimeValidator::validate(&candidate, &idle_usage(), dec!(500), now(), &config());

    assert!(verdict.is_ok());
}

#[test]
fn inactive_candidate_is_rejected_before_anything_else() {
    let mut candidate = endpoint("ep-off");
    candidate.activity = ActivityFlags::default();
    let overloaded = UsageStats {
        active_workload: 50,
        today_count: 500,
        ..UsageStats::default()
    };

    let verdict = RealtimeValidator::validate(&candidate, &overloaded, dec!(500), now(), &config());

    assert_eq!(verdict, Err(Rejection::Inactive));
    assert_eq!(
        Rejection::Inactive.to_string(),
        "Candidate is no longer active"
    );
}

#[test]
fn capacity_ceiling_honours_candidate_limit() {
    let mut candidate = endpoint("ep-small");
    candidate.limits = CandidateLimits {
        max_concurrent: Some(2),
        ..CandidateLimits::default()
    };
    let usage = UsageStats {
        active_workload: 2,
        ..UsageStats::default()
    };

    match RealtimeValidator::validate(&candidate, &usage, dec!(500), now(), &config()) {
        Err(rejection @ Rejection::AtCapacity { active: 2, ceiling: 2 }) => {
            assert_eq!(rejection.to_string(), "At max capacity");
        }
        other => panic!("expected capacity rejection, got {other:?}"),
    }
}

#[test]
fn daily_count_and_cancellations_are_enforced_in_order() {
    let candidate = endpoint("ep-1");
    let config = SelectionConfig {
        max_daily_transactions: 3,
        max_daily_cancellations: 1,
        ..SelectionConfig::default()
    };
    let both = UsageStats {
        today_count: 3,
        cancelled_today: 1,
        ..UsageStats::default()
    };
    let cancellations_only = UsageStats {
        today_count: 2,
        cancelled_today: 1,
        ..UsageStats::default()
    };

    let first = RealtimeValidator::validate(&candidate, &both, dec!(500), now(), &config);
    let second =
        RealtimeValidator::validate(&candidate, &cancellations_only, dec!(500), now(), &config);

    assert!(matches!(first, Err(Rejection::DailyCountReached { count: 3, limit: 3 })));
    assert_eq!(
        second.map_err(|rejection| rejection.to_string()),
        Err("Too many cancellations today".to_string())
    );
}

#[test]
fn half_cooldown_must_elapse_before_reselection() {
    let candidate = endpoint("ep-1");
    let just_used = UsageStats {
        last_assigned_at: Some(minutes_ago(2)),
        ..UsageStats::default()
    };
    let half_rested = UsageStats {
        last_assigned_at: Some(minutes_ago(5)),
        ..UsageStats::default()
    };

    let blocked = RealtimeValidator::validate(&candidate, &just_used, dec!(500), now(), &config());
    let allowed =
        RealtimeValidator::validate(&candidate, &half_rested, dec!(500), now(), &config());

    match blocked {
        Err(rejection @ Rejection::CoolingDown { remaining_minutes: 3 }) => {
            assert_eq!(rejection.to_string(), "Cooling down (3 min remaining)");
        }
        other => panic!("expected cooldown rejection, got {other:?}"),
    }
    assert!(allowed.is_ok());
}

#[test]
fn zero_cooldown_never_blocks() {
    let candidate = endpoint("ep-1");
    let config = SelectionConfig {
        cooldown_minutes: 0,
        ..SelectionConfig::default()
    };
    let usage = UsageStats {
        last_assigned_at: Some(now()),
        ..UsageStats::default()
    };

    assert!(RealtimeValidator::validate(&candidate, &usage, dec!(500), now(), &config).is_ok());
}

#[test]
fn endpoint_projected_volume_is_checked_before_bounds() {
    let mut candidate = endpoint("ep-capped");
    candidate.limits = CandidateLimits {
        min_amount: Some(dec!(100)),
        max_amount: Some(dec!(5000)),
        daily_volume_cap: Some(dec!(10000)),
        max_concurrent: None,
    };
    let usage = UsageStats {
        today_volume: dec!(9000),
        ..UsageStats::default()
    };

    let over_cap = RealtimeValidator::validate(&candidate, &usage, dec!(6000), now(), &config());
    let out_of_range =
        RealtimeValidator::validate(&candidate, &idle_usage(), dec!(6000), now(), &config());

    assert_eq!(
        over_cap,
        Err(Rejection::DailyVolumeExceeded {
            projected: dec!(15000),
            cap: dec!(10000)
        })
    );
    match out_of_range {
        Err(rejection @ Rejection::AmountOutOfRange { .. }) => {
            assert_eq!(rejection.to_string(), "Amount outside transaction limits");
        }
        other => panic!("expected range rejection, got {other:?}"),
    }
}

#[test]
fn agents_skip_volume_rules() {
    let mut candidate = agent("ag-1", Vec::new());
    candidate.limits.daily_volume_cap = Some(dec!(100));
    let usage = UsageStats {
        today_volume: dec!(10000),
        ..UsageStats::default()
    };

    assert!(RealtimeValidator::validate(&candidate, &usage, dec!(5000), now(), &config()).is_ok());
}
