mod support;

use chrono::Duration;
use support::*;
use tube_harvest::model::{Channel, ChannelStatus, IgnoreCause, Window};
use tube_harvest::notify::Notification;
use tube_harvest::scanner::{ChannelScanner, ScanPolicy};
use tube_harvest::youtube::UpstreamError;

fn channels(ids: &[&str]) -> Vec<Channel> {
    ids.iter()
        .map(|id| Channel {
            id: id.to_string(),
            category: "MUSIQUE".into(),
        })
        .collect()
}

fn week() -> Window {
    Window::new(latest() - Duration::days(7), latest())
}

fn recent(prefix: &str, n: usize, channel: &str) -> Vec<tube_harvest::model::PlaylistEntry> {
    (0..n)
        .map(|i| entry(&format!("{}{:03}", prefix, i), latest() - Duration::hours(i as i64 + 1), channel))
        .collect()
}

#[tokio::test]
async fn active_and_inactive_channels() {
    let tube = FakeTube::new()
        .channel("C1", "One", recent("a", 3, "One"))
        .channel("C2", "Two", vec![entry("old", latest() - Duration::days(500), "Two")]);
    let policy = ScanPolicy::default();

    let report = ChannelScanner::new(&tube, quick_retry(), &policy)
        .scan(&channels(&["C1", "C2"]), &week())
        .await
        .unwrap();

    assert_eq!(report.aggregate.len(), 3);
    assert_eq!(report.channels[0].status, ChannelStatus::Active);
    assert_eq!(report.channels[0].channel_name, "One");
    assert_eq!(report.channels[1].status, ChannelStatus::Inactive);
    assert_eq!(report.channels[1].trailing_year, 0);
    assert_eq!(
        report.notifications,
        vec![Notification::DormantChannel {
            channel_id: "C2".into(),
            channel_name: "Two".into()
        }]
    );
    assert!(report.log.contains("Channel 1 out of 2 (50.00 %)."));
    assert!(report.log.contains("Channel 2 out of 2 (100.00 %)."));
    assert_eq!(report.log.matches("STATUS: ACTIVE").count(), 1);
    assert_eq!(report.log.matches("STATUS: INACTIVE").count(), 1);
    assert!(!report.cost_warning);
}

#[tokio::test]
async fn active_channel_with_nothing_new_contributes_nothing() {
    let tube = FakeTube::new().channel("C1", "One", vec![entry("x", latest() - Duration::days(30), "One")]);
    let policy = ScanPolicy::default();

    let report = ChannelScanner::new(&tube, quick_retry(), &policy)
        .scan(&channels(&["C1"]), &week())
        .await
        .unwrap();

    assert_eq!(report.channels[0].status, ChannelStatus::Active);
    assert!(report.aggregate.is_empty());
    assert!(report.notifications.is_empty());
}

#[tokio::test]
async fn cost_cap_ignores_expensive_channel() {
    let tube = FakeTube::new()
        .page_size(20)
        .channel("BIG", "Big", recent("b", 50, "Big"))
        .channel("C1", "One", recent("a", 2, "One"));
    let policy = ScanPolicy {
        per_item_cost: 50,
        channel_cost_cap: 2000,
        ..ScanPolicy::default()
    };

    let report = ChannelScanner::new(&tube, quick_retry(), &policy)
        .scan(&channels(&["BIG", "C1"]), &week())
        .await
        .unwrap();

    assert_eq!(report.channels[0].selected, 50);
    assert_eq!(report.channels[0].status, ChannelStatus::Ignored(IgnoreCause::TooExpensive));
    assert_eq!(report.aggregate.len(), 2);
    assert!(report.aggregate.iter().all(|i| i.id.starts_with('a')));
    assert!(report.notifications.is_empty());
    assert!(report
        .log
        .contains("Channel \"Big\" (BIG) ignored - Cause: Too many videos selected - N_Videos: 50"));
}

#[tokio::test]
async fn ignore_list_wins_over_dormancy() {
    let tube = FakeTube::new().channel("C1", "One", Vec::new());
    let policy = ScanPolicy {
        ignored: ["C1".to_string()].into_iter().collect(),
        ..ScanPolicy::default()
    };

    let report = ChannelScanner::new(&tube, quick_retry(), &policy)
        .scan(&channels(&["C1"]), &week())
        .await
        .unwrap();

    assert_eq!(report.channels[0].status, ChannelStatus::Ignored(IgnoreCause::Listed));
    assert!(report.notifications.is_empty());
    assert_eq!(report.ignored().count(), 1);
}

#[tokio::test]
async fn exception_channels_stay_quiet() {
    let tube = FakeTube::new()
        .channel("C1", "One", Vec::new())
        .channel("C2", "Two", Vec::new());
    let policy = ScanPolicy {
        exceptions: ["C1".to_string()].into_iter().collect(),
        ..ScanPolicy::default()
    };

    let report = ChannelScanner::new(&tube, quick_retry(), &policy)
        .scan(&channels(&["C1", "C2"]), &week())
        .await
        .unwrap();

    assert_eq!(report.with_status(ChannelStatus::Inactive).count(), 2);
    assert_eq!(report.notifications.len(), 1);
    assert!(matches!(&report.notifications[0], Notification::DormantChannel { channel_id, .. } if channel_id == "C2"));
}

#[tokio::test]
async fn run_cost_warning_is_advisory() {
    let tube = FakeTube::new()
        .channel("C1", "One", recent("a", 30, "One"))
        .channel("C2", "Two", recent("b", 30, "Two"))
        .channel("C3", "Three", recent("c", 30, "Three"));
    let policy = ScanPolicy {
        run_cost_warning: 4000,
        ..ScanPolicy::default()
    };

    let report = ChannelScanner::new(&tube, quick_retry(), &policy)
        .scan(&channels(&["C1", "C2", "C3"]), &week())
        .await
        .unwrap();

    assert!(report.cost_warning);
    assert_eq!(report.aggregate.len(), 90);
    assert!(report.log.contains("Warning! API cost could be higher than 4000"));
}

#[tokio::test]
async fn failed_lookups_are_not_reported_dormant() {
    let tube = FakeTube::new();
    let policy = ScanPolicy::default();

    let report = ChannelScanner::new(&tube, quick_retry(), &policy)
        .scan(&channels(&["G1", "G2", "G3"]), &week())
        .await
        .unwrap();

    assert!(report
        .channels
        .iter()
        .all(|c| c.status == ChannelStatus::Ignored(IgnoreCause::Unavailable)));
    assert_eq!(report.channels[0].channel_name, "G1");
    assert!(report.notifications.is_empty());
    assert!(report
        .log
        .contains("Channel \"G2\" (G2) ignored - Cause: Channel unavailable - N_Videos: 0"));
}

#[tokio::test]
async fn interrupted_listing_without_activity_is_unavailable() {
    let tube = FakeTube::new()
        .page_size(1)
        .channel(
            "C1",
            "One",
            vec![
                entry("old", latest() - Duration::days(500), "One"),
                entry("new", latest() - Duration::days(1), "One"),
            ],
        )
        .list_script(&uploads_of("C1"), vec![None, Some(rejected("quotaExceeded"))]);
    let policy = ScanPolicy::default();

    let report = ChannelScanner::new(&tube, quick_retry(), &policy)
        .scan(&channels(&["C1"]), &week())
        .await
        .unwrap();

    assert_eq!(report.channels[0].status, ChannelStatus::Ignored(IgnoreCause::Unavailable));
    assert!(report.aggregate.is_empty());
    assert!(report.notifications.is_empty());
}

#[tokio::test]
async fn interrupted_listing_with_activity_stays_active() {
    let tube = FakeTube::new()
        .page_size(1)
        .channel(
            "C1",
            "One",
            vec![
                entry("new", latest() - Duration::days(1), "One"),
                entry("older", latest() - Duration::days(2), "One"),
            ],
        )
        .list_script(&uploads_of("C1"), vec![None, Some(rejected("quotaExceeded"))]);
    let policy = ScanPolicy::default();

    let report = ChannelScanner::new(&tube, quick_retry(), &policy)
        .scan(&channels(&["C1"]), &week())
        .await
        .unwrap();

    assert_eq!(report.channels[0].status, ChannelStatus::Active);
    assert_eq!(report.aggregate.len(), 1);
}

#[tokio::test]
async fn fatal_listing_aborts_scan() {
    let tube = FakeTube::new()
        .channel("C1", "One", recent("a", 1, "One"))
        .fail_list(&uploads_of("C1"), vec![UpstreamError::Fatal("garbled".into())]);
    let policy = ScanPolicy::default();

    let err = ChannelScanner::new(&tube, quick_retry(), &policy)
        .scan(&channels(&["C1"]), &week())
        .await
        .unwrap_err();
    assert!(matches!(err, UpstreamError::Fatal(_)));
}
