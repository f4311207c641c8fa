mod common;

use common::{encoding_for, uid};
use facebot_session::{EncodingStore, FsEncodingStore, InMemoryEncodingStore, SessionError};
use std::path::PathBuf;
use uuid::Uuid;

fn scratch_dir() -> PathBuf {
    std::env::temp_dir().join(format!("facebot-session-test-{}", Uuid::new_v4()))
}

async fn assert_store_contract<S: EncodingStore>(store: &S) {
    let user = uid("store-user");
    let other = uid("store-other");

    assert!(store.load(&user, "Alice").await.expect("load").is_empty());
    assert!(store.list_names(&user).await.expect("list").is_empty());
    assert!(!store.delete(&user, "Alice").await.expect("delete"));

    store
        .save(&user, "Alice", vec![encoding_for("a1"), encoding_for("a2")])
        .await
        .expect("save alice");
    store
        .save(&user, "Bob", vec![encoding_for("b1")])
        .await
        .expect("save bob");

    assert_eq!(
        store.list_names(&user).await.expect("list"),
        vec!["Alice".to_owned(), "Bob".to_owned()],
        "names come back sorted"
    );
    assert_eq!(store.load(&user, "Alice").await.expect("load").len(), 2);
    assert!(
        store.list_names(&other).await.expect("list").is_empty(),
        "records are scoped per user"
    );

    // Wholesale overwrite, not a merge.
    store
        .save(&user, "Alice", vec![encoding_for("a3")])
        .await
        .expect("re-save alice");
    assert_eq!(
        store.load(&user, "Alice").await.expect("load"),
        vec![encoding_for("a3")]
    );

    // Empty sets may never be persisted.
    let err = store
        .save(&user, "Alice", Vec::new())
        .await
        .expect_err("empty save must fail");
    assert!(matches!(err, SessionError::InvalidInput(_)));
    assert_eq!(
        store.load(&user, "Alice").await.expect("load"),
        vec![encoding_for("a3")],
        "failed save leaves the record alone"
    );

    assert!(store.delete(&user, "Alice").await.expect("delete"));
    assert!(store.load(&user, "Alice").await.expect("load").is_empty());
    assert_eq!(
        store.list_names(&user).await.expect("list"),
        vec!["Bob".to_owned()]
    );
    assert!(!store.delete(&user, "Alice").await.expect("re-delete"));
}

#[tokio::test]
async fn inmemory_store_honours_the_contract() {
    let store = InMemoryEncodingStore::new();
    assert_store_contract(&store).await;
}

#[tokio::test]
async fn fs_store_honours_the_contract() {
    let dir = scratch_dir();
    let store = FsEncodingStore::new(&dir);
    assert_store_contract(&store).await;
    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn fs_store_round_trips_across_instances() {
    let dir = scratch_dir();
    let user = uid("persist-user");

    {
        let store = FsEncodingStore::new(&dir);
        store
            .save(&user, "Alice", vec![encoding_for("alice")])
            .await
            .expect("save");
    }

    let reopened = FsEncodingStore::new(&dir);
    assert_eq!(
        reopened.load(&user, "Alice").await.expect("load"),
        vec![encoding_for("alice")]
    );
    assert_eq!(
        reopened.list_names(&user).await.expect("list"),
        vec!["Alice".to_owned()]
    );
    let _ = tokio::fs::remove_dir_all(&dir).await;
}

#[tokio::test]
async fn fs_store_accepts_hostile_names_without_escaping_its_root() {
    let dir = scratch_dir();
    let store = FsEncodingStore::new(&dir);
    let user = uid("../sneaky");
    let name = "../../etc/passwd";

    store
        .save(&user, name, vec![encoding_for("x")])
        .await
        .expect("save");
    assert_eq!(
        store.list_names(&user).await.expect("list"),
        vec![name.to_owned()]
    );
    assert_eq!(store.load(&user, name).await.expect("load").len(), 1);

    // Everything stayed inside the root.
    let mut walker = vec![dir.clone()];
    while let Some(path) = walker.pop() {
        let mut entries = tokio::fs::read_dir(&path).await.expect("read dir");
        while let Some(entry) = entries.next_entry().await.expect("entry") {
            assert!(entry.path().starts_with(&dir));
            if entry.file_type().await.expect("type").is_dir() {
                walker.push(entry.path());
            }
        }
    }
    assert!(store.delete(&user, name).await.expect("delete"));
    let _ = tokio::fs::remove_dir_all(&dir).await;
}
