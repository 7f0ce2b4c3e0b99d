//! Tests de las reglas de decisión del motor a través de la API pública

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use shift_dispatch::models::assignment::CancelType;
use shift_dispatch::models::bid::{BidMode, BidTrigger};
use shift_dispatch::models::health::HealthEventType;
use shift_dispatch::models::shift::delivery_ratio;
use shift_dispatch::repositories::driver_repository::ScheduleCandidate;
use shift_dispatch::services::bidding_service::{
    rank_bidders, score_bid, select_mode, ScoredBidder,
};
use shift_dispatch::services::health_service::{week_qualifies, WeekStats};
use shift_dispatch::services::lifecycle_service::classify_cancellation;
use shift_dispatch::services::metrics_service::{flag_decision, reward_decision};
use shift_dispatch::services::scheduler_service::rank_candidates;
use shift_dispatch::utils::time::{shift_start, week_start, weekday_index};

#[test]
fn competitive_score_prefers_familiarity_over_raw_health() {
    // escenario de referencia: salud 82, 12 completions en la ruta,
    // 8 meses de antigüedad y ruta preferida le gana a salud 90 con
    // poca familiaridad y sin preferencia
    let incumbent = score_bid(82, 12, 8.0, true);
    let challenger = score_bid(90, 3, 11.0, false);

    assert!((incumbent - 0.78).abs() < 0.01);
    assert!((challenger - 0.60).abs() < 0.01);
    assert!(incumbent > challenger);
}

#[test]
fn competitive_score_is_bounded_by_one() {
    assert!(score_bid(100, 500, 120.0, true) <= 1.0 + 1e-9);
    assert!(score_bid(0, 0, 0.0, false) >= 0.0);
}

#[test]
fn window_mode_follows_time_to_shift() {
    assert_eq!(
        select_mode(BidTrigger::Cancellation, Duration::hours(30), 24),
        BidMode::Competitive
    );
    assert_eq!(
        select_mode(BidTrigger::AutoDrop, Duration::hours(23), 24),
        BidMode::Instant
    );
    // no-show y manual son emergency sin importar el tiempo restante
    assert_eq!(
        select_mode(BidTrigger::NoShow, Duration::hours(72), 24),
        BidMode::Emergency
    );
    assert_eq!(
        select_mode(BidTrigger::Manual, Duration::hours(1), 24),
        BidMode::Emergency
    );
}

#[test]
fn ranking_breaks_score_ties_by_earliest_bid() {
    let t0 = Utc.with_ymd_and_hms(2026, 8, 3, 8, 0, 0).unwrap();
    let first = ScoredBidder {
        bid_id: Uuid::new_v4(),
        driver_id: Uuid::new_v4(),
        bid_at: t0,
        score: 0.75,
    };
    let second = ScoredBidder {
        bid_id: Uuid::new_v4(),
        driver_id: Uuid::new_v4(),
        bid_at: t0 + Duration::minutes(5),
        score: 0.75,
    };

    let ranked = rank_bidders(vec![second.clone(), first.clone()]);
    assert_eq!(ranked[0].bid_id, first.bid_id);
}

#[test]
fn scheduler_ranking_is_strict_tiebreak_chain() {
    let veteran = ScheduleCandidate {
        driver_id: Uuid::new_v4(),
        weekly_cap: 4,
        route_completions: 8,
        completion_rate: 0.90,
        attendance_rate: 0.85,
    };
    let newcomer = ScheduleCandidate {
        driver_id: Uuid::new_v4(),
        weekly_cap: 4,
        route_completions: 0,
        completion_rate: 1.0,
        attendance_rate: 1.0,
    };

    // los completions en la ruta dominan, no se promedian
    let ranked = rank_candidates(vec![newcomer.clone(), veteran.clone()]);
    assert_eq!(ranked[0].driver_id, veteran.driver_id);
}

#[test]
fn penalty_magnitudes_are_strictly_ordered() {
    let late = HealthEventType::LateCancel.points();
    let auto_drop = HealthEventType::AutoDrop.points();
    let driver = HealthEventType::DriverCancel.points();

    assert_eq!(auto_drop, -12);
    assert!(late < auto_drop);
    assert!(auto_drop < driver);
    assert!(driver < 0);
}

#[test]
fn cancellation_classification_matches_policy() {
    // sin confirmar siempre es 'driver', aunque falten pocas horas
    assert_eq!(
        classify_cancellation(false, Duration::hours(2), 48),
        CancelType::Driver
    );
    // confirmado a más de 48h sigue siendo 'driver'
    assert_eq!(
        classify_cancellation(true, Duration::hours(49), 48),
        CancelType::Driver
    );
    // confirmado dentro de las 48h es 'late'
    assert_eq!(
        classify_cancellation(true, Duration::hours(12), 48),
        CancelType::Late
    );
}

#[test]
fn qualifying_week_requires_all_four_criteria() {
    let qualifying = WeekStats {
        completions: 4,
        misses: 0,
        no_shows: 0,
        late_cancels: 0,
        completion_rate: Some(0.96),
    };
    assert!(week_qualifies(&qualifying));

    // cada criterio roto por separado descalifica
    assert!(!week_qualifies(&WeekStats {
        misses: 1,
        ..qualifying
    }));
    assert!(!week_qualifies(&WeekStats {
        no_shows: 1,
        ..qualifying
    }));
    assert!(!week_qualifies(&WeekStats {
        late_cancels: 1,
        ..qualifying
    }));
    assert!(!week_qualifies(&WeekStats {
        completion_rate: Some(0.90),
        ..qualifying
    }));
    // semana sin turnos: neutral, nunca califica
    assert!(!week_qualifies(&WeekStats::default()));
}

#[test]
fn flagging_thresholds_depend_on_lifetime_volume() {
    // antes de 10 turnos: umbral 80%
    assert!(flag_decision(6, 0.75));
    assert!(!flag_decision(6, 0.85));
    // desde 10 turnos: umbral 70%
    assert!(flag_decision(15, 0.65));
    assert!(!flag_decision(15, 0.75));
    // reward con 20 turnos y 95%
    assert!(reward_decision(20, 0.95));
    assert!(!reward_decision(12, 0.99));
}

#[test]
fn delivery_ratio_counts_excepted_returns_as_delivered() {
    // 120 cargados, 10 devueltos, 4 justificados => 95%
    let ratio = delivery_ratio(120, 10, 4).unwrap();
    assert!((ratio - 0.95).abs() < 1e-9);
    // turnos sin paquetes cargados quedan fuera de la métrica
    assert!(delivery_ratio(0, 0, 0).is_none());
}

#[test]
fn weeks_run_monday_to_sunday() {
    let wednesday = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
    let monday = week_start(wednesday);
    assert_eq!(monday, NaiveDate::from_ymd_opt(2026, 8, 3).unwrap());
    assert_eq!(weekday_index(monday), 0);
    assert_eq!(weekday_index(monday + Duration::days(6)), 6);
}

#[test]
fn shift_start_is_date_plus_route_time() {
    let date = NaiveDate::from_ymd_opt(2026, 8, 5).unwrap();
    let time = chrono::NaiveTime::from_hms_opt(6, 45, 0).unwrap();
    let start = shift_start(date, time);
    assert_eq!(start, Utc.with_ymd_and_hms(2026, 8, 5, 6, 45, 0).unwrap());
}

#[test]
fn auto_drop_penalty_is_exactly_twelve_points() {
    // el escenario de auto-drop del miércoles: el score baja exactamente 12
    let before = 60;
    let after = (before + HealthEventType::AutoDrop.points()).clamp(0, 100);
    assert_eq!(before - after, 12);
}

#[test]
fn score_floor_never_goes_negative() {
    let low = 5;
    let after = (low + HealthEventType::LateCancel.points()).clamp(0, 100);
    assert_eq!(after, 0);
}
