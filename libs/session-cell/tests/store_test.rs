use tempfile::tempdir;

use session_cell::{FileStore, KeyValueStore, SessionError};

#[tokio::test]
async fn test_file_store_persists_across_instances() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("device").join("session.json");

    let store = FileStore::new(&path);
    store.set("token", "abc").await.unwrap();
    store.set("selectedHospitalId", "h-1").await.unwrap();

    let reopened = FileStore::new(&path);
    assert_eq!(reopened.get("token").await.unwrap().as_deref(), Some("abc"));
    assert_eq!(
        reopened.get("selectedHospitalId").await.unwrap().as_deref(),
        Some("h-1")
    );
}

#[tokio::test]
async fn test_file_store_last_write_wins() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path().join("session.json"));

    store.set("hospital", "North").await.unwrap();
    store.set("hospital", "South").await.unwrap();

    assert_eq!(store.get("hospital").await.unwrap().as_deref(), Some("South"));
}

#[tokio::test]
async fn test_file_store_remove_and_clear() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path().join("session.json"));

    store.set("token", "abc").await.unwrap();
    store.set("user", "{}").await.unwrap();
    store.remove("token").await.unwrap();
    assert_eq!(store.get("token").await.unwrap(), None);
    assert_eq!(store.get("user").await.unwrap().as_deref(), Some("{}"));

    store.clear().await.unwrap();
    assert_eq!(store.get("user").await.unwrap(), None);
    // clearing an already-empty store is fine
    store.clear().await.unwrap();
}

#[tokio::test]
async fn test_file_store_reports_corrupt_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("session.json");
    std::fs::write(&path, "not json").unwrap();

    let store = FileStore::new(&path);
    let result = store.get("token").await;
    assert!(matches!(result, Err(SessionError::Serialization(_))));
}
