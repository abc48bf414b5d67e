//! Integration tests for quota tracking on top of the file-backed store

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;
use voiceprompt_core::services::quota::{
    parse_records, DenialReason, QuotaTracker, Verdict, QUOTA_STORAGE_KEY,
};
use voiceprompt_core::storage::STORAGE_FILE_NAME;
use voiceprompt_core::{App, FileKeyValueStore, KeyValueStore, ProviderCatalog};

fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
}

/// Helper to open a tracker over a fresh storage file
fn open_tracker(dir: &TempDir) -> (QuotaTracker, Arc<FileKeyValueStore>) {
    let storage = Arc::new(
        FileKeyValueStore::open(dir.path().join(STORAGE_FILE_NAME))
            .expect("Failed to open storage"),
    );
    let tracker = QuotaTracker::open(storage.clone(), ProviderCatalog::builtin());
    (tracker, storage)
}

#[test]
fn test_usage_survives_restart_and_resets_next_day() {
    let dir = TempDir::new().unwrap();
    let day1 = at(2024, 1, 1, 23, 59, 59);

    {
        let (mut tracker, _) = open_tracker(&dir);
        for _ in 0..50 {
            tracker.record_usage_at("openrouter", 1, day1).unwrap();
        }
    }

    // Restart on the same day: still exhausted
    let (mut tracker, _) = open_tracker(&dir);
    let verdict = tracker.check_quota_at("openrouter", 1, day1);
    let denial = verdict.denial().expect("should be denied");
    assert_eq!(denial.reason, DenialReason::QuotaExhausted);
    assert_eq!(denial.next_refresh, Some(at(2024, 1, 2, 0, 0, 0)));

    // First call after midnight resets and persists the reset
    let day2 = at(2024, 1, 2, 0, 0, 1);
    assert_eq!(
        tracker.check_quota_at("openrouter", 1, day2),
        Verdict::Allowed { remaining: 50 }
    );
    drop(tracker);

    let (tracker, _) = open_tracker(&dir);
    let record = tracker.store().peek("openrouter").unwrap();
    assert_eq!(record.used, 0);
    assert_eq!(record.last_reset, Some(day2));
}

#[test]
fn test_persisted_layout() {
    let dir = TempDir::new().unwrap();
    let (mut tracker, storage) = open_tracker(&dir);
    let now = at(2024, 1, 1, 8, 0, 0);

    tracker.record_usage_at("gemini", 2, now).unwrap();
    tracker.record_usage_at("siliconflow", 1_200, now).unwrap();

    let raw = storage.get(QUOTA_STORAGE_KEY).unwrap().unwrap();
    assert_eq!(
        raw,
        r#"{"gemini":{"used":2,"lastReset":"2024-01-01T08:00:00Z"},"siliconflow":{"used":1200,"lastReset":null}}"#
    );
}

#[test]
fn test_corrupt_quota_value_is_treated_as_empty() {
    let dir = TempDir::new().unwrap();
    {
        let (_, storage) = open_tracker(&dir);
        storage.set(QUOTA_STORAGE_KEY, "[1, 2, 3]").unwrap();
    }

    let (mut tracker, storage) = open_tracker(&dir);
    assert!(tracker.store().records().is_empty());

    // The next write replaces the corrupt value
    tracker.record_usage_at("groq", 1, at(2024, 1, 1, 0, 0, 0)).unwrap();
    let raw = storage.get(QUOTA_STORAGE_KEY).unwrap().unwrap();
    assert_eq!(parse_records(&raw).unwrap()["groq"].used, 1);
}

#[test]
fn test_save_of_load_keeps_file_bytes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(STORAGE_FILE_NAME);
    let now = at(2024, 2, 29, 12, 0, 0);

    let (mut tracker, _) = open_tracker(&dir);
    tracker.record_usage_at("openrouter", 3, now).unwrap();
    tracker.record_usage_at("siliconflow", 42, now).unwrap();
    drop(tracker);

    let before = std::fs::read(&path).unwrap();

    let storage = Arc::new(FileKeyValueStore::open(&path).unwrap());
    let mut store = voiceprompt_core::QuotaStore::open(storage);
    let loaded = store.load();
    store.save(loaded);

    assert_eq!(before, std::fs::read(&path).unwrap());
}

#[test]
fn test_reset_all_wipes_file_state_but_keeps_api_keys() {
    let dir = TempDir::new().unwrap();
    let mut app = App::open(dir.path()).unwrap();

    app.keys.set("openrouter", "sk-or-v1-0000").unwrap();
    app.quota.record_usage("openrouter", 10).unwrap();
    app.quota.reset_all();
    drop(app);

    let mut app = App::open(dir.path()).unwrap();
    assert!(app.quota.store().records().is_empty());
    assert_eq!(app.quota.get_snapshot("openrouter").used, 0);
    assert_eq!(
        app.keys.get("openrouter").unwrap(),
        Some("sk-or-v1-0000".to_string())
    );
}

#[test]
fn test_config_plan_override_applies() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("config.json"),
        r#"{"providers":{"openrouter":{"kind":"daily","limit":2,"unit":"calls/day"}}}"#,
    )
    .unwrap();

    let mut app = App::open(dir.path()).unwrap();
    let now = at(2024, 1, 1, 12, 0, 0);
    app.quota.record_usage_at("openrouter", 2, now).unwrap();
    assert!(!app.quota.check_quota_at("openrouter", 1, now).is_allowed());
}
