use portal_core::model::{ProjectDraft, ProjectId, SectionNumber, Theme, User, UserId, UserProgress};
use storage::KeyValueStore;
use storage::repository::Storage;
use storage::sqlite::SqliteStore;

#[tokio::test]
async fn sqlite_store_set_get_remove_clear() {
    let store = SqliteStore::connect("sqlite:file:memdb_kv_basic?mode=memory&cache=shared")
        .await
        .expect("connect");
    store.migrate().await.expect("migrate");
    // running twice is a no-op
    store.migrate().await.expect("migrate again");

    store.set("iot:initialized", "true".into()).await.unwrap();
    store.set("k", "v1".into()).await.unwrap();
    store.set("k", "v2".into()).await.unwrap();
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));

    store.remove("k").await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), None);

    store.clear().await.unwrap();
    assert_eq!(store.get("iot:initialized").await.unwrap(), None);
}

#[tokio::test]
async fn sqlite_storage_round_trips_catalog_and_progress() {
    let storage = Storage::sqlite("sqlite:file:memdb_storage_roundtrip?mode=memory&cache=shared")
        .await
        .expect("open storage");

    let mut draft = ProjectDraft::new("Temperature Sensor Reading", "Read a DHT22");
    draft.section = 2;
    draft.device_id = "device-002".into();
    draft.objectives = vec!["Wire the sensor".into(), "Plot readings".into()];
    draft.api_endpoint = Some("https://api.example.com/v1".into());
    let project = draft.validate(ProjectId::new("proj_1_abc")).unwrap();
    storage.projects.save_projects(&[project.clone()]).await.unwrap();

    let loaded = storage.projects.list_projects().await.unwrap();
    assert_eq!(loaded, vec![project]);

    let user_id = UserId::new("student-001");
    let mut progress = UserProgress::new(user_id.clone());
    progress.mark_complete(ProjectId::new("proj_1_abc"));
    progress.unlock(SectionNumber::new(2).unwrap());
    progress.set_theme(Theme::Light);
    storage.progress.save_progress(&progress).await.unwrap();

    let reloaded = storage.progress.get_progress(&user_id).await.unwrap();
    assert_eq!(reloaded, Some(progress));
}

#[tokio::test]
async fn sqlite_storage_tracks_current_user() {
    let storage = Storage::sqlite("sqlite:file:memdb_current_user?mode=memory&cache=shared")
        .await
        .expect("open storage");
    let user = User::new(UserId::new("student-001"), "student@example.com", "Student", false)
        .unwrap();

    storage.users.save_users(&[user.clone()]).await.unwrap();
    storage.users.set_current_user(Some(&user)).await.unwrap();
    assert_eq!(storage.users.current_user().await.unwrap(), Some(user));

    storage.users.set_current_user(None).await.unwrap();
    assert_eq!(storage.users.current_user().await.unwrap(), None);
    assert_eq!(storage.users.list_users().await.unwrap().len(), 1);
}
