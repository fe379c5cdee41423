//! Integration tests for the visit aggregation engine
//!
//! These exercise the public API the way a report page does: group visits,
//! build gap-filled series, overlay highlighted visits and map clicks back
//! to visits.

use chrono::{DateTime, Duration, NaiveDateTime};
use chrono_tz::Tz;
use lynx_visits::models::Visit;
use lynx_visits::visits::{
    build_series, fill_gaps, group_by_step, infer_step, Step, VisitsChart,
};

fn utc() -> Tz {
    Tz::UTC
}

fn visit(date: &str) -> Visit {
    Visit::new(DateTime::parse_from_rfc3339(date).unwrap())
}

/// Visits spread irregularly over roughly eight months, newest first
fn spread_visits() -> Vec<Visit> {
    let start = DateTime::parse_from_rfc3339("2023-07-03T08:00:00+00:00").unwrap();
    let mut visits: Vec<Visit> = (0..120)
        .map(|i| Visit::new(start + Duration::hours(i * i * 2 / 5 + i)))
        .collect();
    visits.reverse();
    visits
}

#[test]
fn test_bucket_count_conservation() {
    let visits = spread_visits();

    for step in Step::ALL {
        let grouped = group_by_step(step, &visits, &utc());
        assert_eq!(grouped.total(), visits.len() as u64, "step {step}");

        for skip_empty in [true, false] {
            let series = build_series(&visits, step, skip_empty, &utc());
            assert_eq!(
                series.counts.iter().sum::<u64>(),
                visits.len() as u64,
                "step {step}, skip_empty {skip_empty}"
            );
        }
    }
}

#[test]
fn test_gap_fill_completeness() {
    let visits = spread_visits();
    let oldest = visits.last().unwrap().local_date(&utc());
    let newest = visits.first().unwrap().local_date(&utc());

    for step in Step::ALL {
        let series = build_series(&visits, step, false, &utc());
        let diff = step.diff(step.bucket_start(newest), step.bucket_start(oldest));

        assert_eq!(series.labels.len() as i64, diff + 1, "step {step}");
        assert_eq!(series.labels[0], step.format_key(oldest));
        assert_eq!(series.labels.last(), Some(&step.format_key(newest)));
    }
}

#[test]
fn test_gap_filled_labels_are_unique_and_chronological() {
    let visits = spread_visits();

    for step in Step::ALL {
        let series = build_series(&visits, step, false, &utc());
        let mut deduped = series.labels.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), series.labels.len(), "step {step}");

        // Weekly keys are ranges; their first date still orders them
        let mut sorted = series.labels.clone();
        sorted.sort();
        assert_eq!(sorted, series.labels, "step {step}");
    }
}

#[test]
fn test_idempotent_regrouping() {
    let visits = spread_visits();

    for step in Step::ALL {
        assert_eq!(
            group_by_step(step, &visits, &utc()),
            group_by_step(step, &visits, &utc())
        );
    }
}

#[test]
fn test_overlay_alignment_for_any_subset() {
    let visits = spread_visits();
    let subsets: Vec<Vec<Visit>> = vec![
        Vec::new(),
        visits.iter().step_by(7).cloned().collect(),
        visits[..3].to_vec(),
        visits[visits.len() - 1..].to_vec(),
        visits.clone(),
    ];

    for step in Step::ALL {
        for skip_empty in [true, false] {
            let series = build_series(&visits, step, skip_empty, &utc());
            for subset in &subsets {
                let highlighted = fill_gaps(&group_by_step(step, subset, &utc()), &series.labels);
                assert_eq!(highlighted.len(), series.labels.len());
                assert_eq!(highlighted.iter().sum::<u64>(), subset.len() as u64);
            }
        }
    }
}

#[test]
fn test_toggle_selection() {
    let visits = vec![
        visit("2024-01-03T10:00:00+00:00"),
        visit("2024-01-02T10:00:00+00:00"),
        visit("2024-01-02T09:00:00+00:00"),
    ];
    let now = NaiveDateTime::parse_from_str("2024-03-01 00:00", "%Y-%m-%d %H:%M").unwrap();
    let mut chart = VisitsChart::new_at(visits, utc(), now);
    chart.set_step(Step::Daily);

    let k = chart.select_point(0);
    assert_eq!(k.len(), 2);
    assert!(chart.select_point(0).is_empty());

    chart.select_point(0);
    let j = chart.select_point(1);
    assert_eq!(j, vec![visit("2024-01-03T10:00:00+00:00")]);
}

#[test]
fn test_single_day_of_hourly_visits() {
    let visits = vec![
        visit("2024-01-01T00:15:00+00:00"),
        visit("2024-01-01T05:40:00+00:00"),
        visit("2024-01-01T23:00:00+00:00"),
    ];

    let series = build_series(&visits, Step::Hourly, false, &utc());

    let expected_labels: Vec<String> = (0..24)
        .map(|hour| format!("2024-01-01 {hour:02}:00"))
        .collect();
    assert_eq!(series.labels, expected_labels);

    let mut expected_counts = vec![0u64; 24];
    expected_counts[0] = 1;
    expected_counts[5] = 1;
    expected_counts[23] = 1;
    assert_eq!(series.counts, expected_counts);
}

#[test]
fn test_empty_input() {
    let chart = VisitsChart::new(Vec::<Visit>::new(), utc());

    assert_eq!(chart.step(), Step::Monthly);
    assert!(chart.labels().is_empty());
    assert!(chart.counts().is_empty());

    let series = build_series(&[], Step::Monthly, false, &utc());
    assert!(series.labels.is_empty());
}

#[test]
fn test_inferred_step_matches_visit_age() {
    let now = NaiveDateTime::parse_from_str("2024-03-01 00:00", "%Y-%m-%d %H:%M").unwrap();
    let at = |s: &str| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap();

    assert_eq!(infer_step(at("2024-02-29 00:00"), now), Step::Hourly);
    assert_eq!(infer_step(at("2024-02-10 00:00"), now), Step::Daily);
    assert_eq!(infer_step(at("2023-11-01 00:00"), now), Step::Weekly);
    assert_eq!(infer_step(at("2022-01-01 00:00"), now), Step::Monthly);
}

#[test]
fn test_visits_bucketed_in_configured_time_zone() {
    // 23:30 UTC on Sunday is already Monday in Helsinki
    let visits = vec![visit("2024-03-10T23:30:00+00:00")];
    let helsinki: Tz = "Europe/Helsinki".parse().unwrap();

    let utc_series = build_series(&visits, Step::Weekly, true, &utc());
    let local_series = build_series(&visits, Step::Weekly, true, &helsinki);

    assert_eq!(utc_series.labels, vec!["2024-03-04 - 2024-03-10"]);
    assert_eq!(local_series.labels, vec!["2024-03-11 - 2024-03-17"]);
}

#[test]
fn test_buckets_across_daylight_saving_change() {
    let madrid = Tz::Europe__Madrid;

    // Same UTC time of day, one hour apart on the wall clock once summer time starts
    let visits = vec![
        visit("2024-04-02T22:30:00+00:00"),
        visit("2024-03-28T22:30:00+00:00"),
    ];
    let daily = build_series(&visits, Step::Daily, true, &madrid);
    assert_eq!(daily.labels, vec!["2024-03-28", "2024-04-03"]);

    // Clocks jump from 02:00 to 03:00 on the night of 2024-03-31
    let visits = vec![
        visit("2024-03-31T01:30:00+00:00"),
        visit("2024-03-31T00:30:00+00:00"),
    ];
    let hourly = build_series(&visits, Step::Hourly, false, &madrid);
    assert_eq!(hourly.labels.first().map(String::as_str), Some("2024-03-31 01:00"));
    assert_eq!(hourly.labels.last().map(String::as_str), Some("2024-03-31 03:00"));
    assert_eq!(hourly.counts.iter().sum::<u64>(), 2);

    let daily = build_series(&visits, Step::Daily, true, &madrid);
    assert_eq!(daily.labels, vec!["2024-03-31"]);
    assert_eq!(daily.counts, vec![2]);
}
