// Settings persistence across reopen, and counter behavior under concurrency

use std::sync::Arc;

use teradrop::core::settings::Stats;
use teradrop::SettingsStore;

#[test]
fn test_settings_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("teradrop.db");

    {
        let store = SettingsStore::open(&path).unwrap();
        store.set_force_sub_channel("@club").unwrap();
        store.set_relay_channel("-100555").unwrap();
        store.set_api_template("https://r.example/?l={link}").unwrap();
        store.record_request().unwrap();
        store.record_upload(2048).unwrap();
    }

    let store = SettingsStore::open(&path).unwrap();
    assert_eq!(store.force_sub_channel().unwrap().as_deref(), Some("@club"));
    assert_eq!(store.relay_channel().unwrap().as_deref(), Some("-100555"));
    assert_eq!(
        store.api_template().unwrap().as_deref(),
        Some("https://r.example/?l={link}")
    );
    assert_eq!(
        store.stats().unwrap(),
        Stats {
            total_requests: 1,
            resolved_links: 0,
            uploaded_files: 1,
            bytes_transferred: 2048,
        }
    );
}

#[test]
fn test_seed_does_not_override_admin_template() {
    let store = SettingsStore::open_in_memory().unwrap();
    store.seed_api_template("https://first/?l={link}").unwrap();
    store.set_api_template("https://admin/?l={link}").unwrap();
    store.seed_api_template("https://env/?l={link}").unwrap();
    assert_eq!(
        store.api_template().unwrap().as_deref(),
        Some("https://admin/?l={link}")
    );
}

#[test]
fn test_clear_reports_whether_anything_was_removed() {
    let store = SettingsStore::open_in_memory().unwrap();
    assert!(!store.clear_relay_channel().unwrap());
    store.set_relay_channel("@dump").unwrap();
    assert!(store.clear_relay_channel().unwrap());
    assert_eq!(store.relay_channel().unwrap(), None);
}

#[test]
fn test_concurrent_counters_do_not_lose_updates() {
    let store = Arc::new(SettingsStore::open_in_memory().unwrap());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..25 {
                    store.record_request().unwrap();
                    store.record_upload(10).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let stats = store.stats().unwrap();
    assert_eq!(stats.total_requests, 200);
    assert_eq!(stats.uploaded_files, 200);
    assert_eq!(stats.bytes_transferred, 2000);
}
