//! End-to-end tests: push notifications reloading a visits report
//!
//! A file export stands in for the server and an in-memory hub for the push
//! transport.

use chrono::{Duration, Utc};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use lynx_visits::config::{ChartConfig, RealTimeUpdatesConfig};
use lynx_visits::live::{topics, MemoryHub, PushTransport, TopicBinder};
use lynx_visits::models::{Visit, VisitsParams};
use lynx_visits::report::{FileVisitsSource, VisitsReport};
use lynx_visits::visits::Step;

fn recent_visits(hours_ago: &[i64]) -> Vec<Visit> {
    let now = Utc::now().fixed_offset();
    hours_ago
        .iter()
        .map(|h| Visit::new(now - Duration::hours(*h)))
        .collect()
}

fn write_visits(path: &std::path::Path, visits: &[Visit]) {
    let mut file = std::fs::File::create(path).unwrap();
    file.write_all(serde_json::to_string(visits).unwrap().as_bytes())
        .unwrap();
}

struct ShortUrlProps {
    short_code: String,
}

fn short_url_topics(props: &ShortUrlProps) -> Vec<String> {
    vec![topics::short_url_visits(&props.short_code)]
}

struct Fixture {
    _dir: tempfile::TempDir,
    path: std::path::PathBuf,
    hub: Arc<MemoryHub>,
    report: Arc<VisitsReport>,
}

async fn setup(visits: &[Visit]) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("visits.json");
    write_visits(&path, visits);

    let source = Arc::new(FileVisitsSource::new(&path));
    let report = Arc::new(VisitsReport::spawn(source, &ChartConfig::default()).unwrap());
    report.load(VisitsParams::default());
    report.wait_for_loads(1).await;

    Fixture {
        _dir: dir,
        path,
        hub: Arc::new(MemoryHub::new()),
        report,
    }
}

#[tokio::test]
async fn test_new_visit_reloads_report_and_keeps_selection() {
    let fixture = setup(&recent_visits(&[1, 26, 50])).await;
    let report = &fixture.report;
    report.set_step(Step::Daily);

    let transport: Arc<dyn PushTransport> = fixture.hub.clone();
    let mut binder = TopicBinder::new(
        Arc::clone(report),
        short_url_topics,
        Some(transport),
        &RealTimeUpdatesConfig::default(),
    );
    binder.mount(ShortUrlProps {
        short_code: "abc123".to_string(),
    });

    report.select_point(0);
    let selected = report.selected_label();
    assert!(selected.is_some());

    write_visits(&fixture.path, &recent_visits(&[1, 2, 26, 50]));
    let delivered = fixture.hub.publish(&topics::short_url_visits("abc123"));
    assert_eq!(delivered, 1);
    report.wait_for_loads(2).await;

    assert_eq!(report.visits().len(), 4);
    assert_eq!(report.step(), Step::Daily);
    assert_eq!(report.selected_label(), selected);
    assert_eq!(
        report.chart_data().datasets[0].data.iter().sum::<u64>(),
        4
    );
}

#[tokio::test]
async fn test_no_reload_after_unmount() {
    let fixture = setup(&recent_visits(&[1])).await;
    let report = &fixture.report;

    let transport: Arc<dyn PushTransport> = fixture.hub.clone();
    let mut binder = TopicBinder::new(
        Arc::clone(report),
        |_: &()| vec![topics::visits(), topics::orphan_visits()],
        Some(transport),
        &RealTimeUpdatesConfig::default(),
    );

    binder.mount(());
    fixture.hub.publish(&topics::visits());
    report.wait_for_loads(2).await;

    binder.unmount();
    assert_eq!(fixture.hub.publish(&topics::visits()), 0);
    assert_eq!(fixture.hub.publish(&topics::orphan_visits()), 0);
    tokio::time::sleep(StdDuration::from_millis(50)).await;

    assert_eq!(report.completed_loads(), 2);
}

#[tokio::test]
async fn test_messages_for_other_short_urls_are_ignored() {
    let fixture = setup(&recent_visits(&[1])).await;
    let report = &fixture.report;

    let transport: Arc<dyn PushTransport> = fixture.hub.clone();
    let mut binder = TopicBinder::new(
        Arc::clone(report),
        short_url_topics,
        Some(transport),
        &RealTimeUpdatesConfig::default(),
    );
    binder.mount(ShortUrlProps {
        short_code: "abc123".to_string(),
    });

    assert_eq!(fixture.hub.publish(&topics::short_url_visits("other")), 0);
    tokio::time::sleep(StdDuration::from_millis(50)).await;
    assert_eq!(report.completed_loads(), 1);

    binder.update(ShortUrlProps {
        short_code: "other".to_string(),
    });
    assert_eq!(fixture.hub.publish(&topics::short_url_visits("abc123")), 0);
    assert_eq!(fixture.hub.publish(&topics::short_url_visits("other")), 1);
    report.wait_for_loads(2).await;
}

#[tokio::test]
async fn test_batched_updates_reload_once_per_interval() {
    let fixture = setup(&recent_visits(&[1])).await;
    let report = &fixture.report;

    let config = RealTimeUpdatesConfig {
        enabled: true,
        interval: StdDuration::from_millis(50),
    };
    let transport: Arc<dyn PushTransport> = fixture.hub.clone();
    let mut binder = TopicBinder::new(
        Arc::clone(report),
        |_: &()| vec![topics::visits()],
        Some(transport),
        &config,
    );
    binder.mount(());

    write_visits(&fixture.path, &recent_visits(&[1, 2, 3]));
    for _ in 0..5 {
        fixture.hub.publish(&topics::visits());
    }
    assert_eq!(report.completed_loads(), 1);

    report.wait_for_loads(2).await;
    tokio::time::sleep(StdDuration::from_millis(120)).await;

    assert_eq!(report.completed_loads(), 2);
    assert_eq!(report.visits().len(), 3);
}
