use std::fs;
use std::sync::Arc;
use std::thread;

use weather_stats::{list, DatasetCache};

#[test]
fn readers_share_one_snapshot_while_reload_replaces_it() {
    let path = std::env::temp_dir().join(format!("weather-stats-cache-{}.txt", std::process::id()));
    fs::write(&path, "Belgrade;10.0\nBelgrade;20.0\n").unwrap();

    let cache = Arc::new(DatasetCache::new(&path));
    let original = cache.dataset();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                let snapshot = cache.dataset();
                list(&snapshot, Some("bel")).total_cities
            })
        })
        .collect();
    for reader in readers {
        assert_eq!(reader.join().unwrap(), 1);
    }
    assert_eq!(cache.load_count(), 1);

    fs::write(&path, "Belgrade;10.0\nBelgrade;20.0\nBergen;6.0\n").unwrap();
    let reloaded = cache.reload();

    assert_eq!(original.len(), 1);
    assert_eq!(reloaded.len(), 2);
    assert!(!Arc::ptr_eq(&original, &reloaded));
    assert_eq!(cache.last_report().unwrap().cities, 2);

    fs::remove_file(&path).ok();
}
