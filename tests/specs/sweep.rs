//! TTL sweep specs over the cache directory.

use std::thread;
use std::time::Duration;
use wp_storage::CacheDir;

#[test]
fn sweep_deletes_only_files_strictly_older_than_ttl() {
    let dir = tempfile::tempdir().unwrap();
    let cache = CacheDir::open(dir.path().join("waypost")).unwrap();

    cache.write_file("stale", b"old").unwrap();
    thread::sleep(Duration::from_millis(50));
    cache.write_file("fresh", b"new").unwrap();

    let removed = cache.sweep_stale(Duration::from_millis(20)).unwrap();

    assert_eq!(removed, 1);
    assert_eq!(cache.read_file("stale").unwrap(), None);
    assert_eq!(cache.read_file("fresh").unwrap(), Some(b"new".to_vec()));
}

#[test]
fn zero_ttl_disables_the_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let cache = CacheDir::open(dir.path().join("waypost")).unwrap();

    cache.write_file("kept", b"x").unwrap();
    thread::sleep(Duration::from_millis(30));

    assert_eq!(cache.sweep_stale(Duration::ZERO).unwrap(), 0);
    assert_eq!(cache.read_file("kept").unwrap(), Some(b"x".to_vec()));
}

#[test]
fn generous_ttl_retains_recent_files() {
    let dir = tempfile::tempdir().unwrap();
    let cache = CacheDir::open(dir.path().join("waypost")).unwrap();

    cache.write_file("recent", b"x").unwrap();

    assert_eq!(cache.sweep_stale(Duration::from_secs(3600)).unwrap(), 0);
    assert_eq!(cache.read_file("recent").unwrap(), Some(b"x".to_vec()));
}
