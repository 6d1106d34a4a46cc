//! Download integration tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;
    use cossync_core::{HaltReason, InMemoryObjectStore, SyncDriver};
    use tokio_util::sync::CancellationToken;

    use crate::{RecordingStore, ScriptedPage, init_tracing, shared, sync_config};

    fn seeded(keys: &[&str]) -> InMemoryObjectStore {
        let store = InMemoryObjectStore::default();
        for key in keys {
            store.insert(*key, Bytes::from(format!("body of {key}")));
        }
        store
    }

    #[tokio::test]
    async fn test_should_follow_markers_across_pages() {
        init_tracing();
        let out = tempfile::tempdir().unwrap();
        let root = out.path().join("restore");
        let store = Arc::new(
            RecordingStore::new(seeded(&["x/1.txt", "x/2.txt", "x/3.txt"])).with_listing_script(
                vec![
                    ScriptedPage::keys(&["x/1.txt", "x/2.txt"], true, Some("m1")),
                    ScriptedPage::keys(&["x/3.txt"], false, None),
                ],
            ),
        );

        let mut driver = SyncDriver::new(sync_config("download", &root, "x"));
        let report = driver
            .run(|_| Ok(shared(&store)), &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.listing_calls, 2);
        assert_eq!(store.list_markers(), vec!["", "m1"]);
        assert_eq!(store.get_keys(), vec!["x/1.txt", "x/2.txt", "x/3.txt"]);
        assert_eq!(report.summary.succeeded, 3);
        assert_eq!(
            std::fs::read_to_string(root.join("3.txt")).unwrap(),
            "body of x/3.txt"
        );
    }

    #[tokio::test]
    async fn test_should_skip_directory_markers_and_create_parents() {
        let out = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordingStore::new(seeded(&[
            "x/dir/",
            "x/dir/f.txt",
            "x/deep/er/g.txt",
        ])));

        let mut driver = SyncDriver::new(sync_config("download", out.path(), "x"));
        let report = driver
            .run(|_| Ok(shared(&store)), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(store.get_keys(), vec!["x/deep/er/g.txt", "x/dir/f.txt"]);
        assert_eq!(report.summary.succeeded, 2);
        assert!(out.path().join("dir").is_dir());
        assert!(out.path().join("deep/er/g.txt").is_file());
    }

    #[tokio::test]
    async fn test_should_decode_url_encoded_keys() {
        let out = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordingStore::new(seeded(&["x/my file+v1.txt"])));

        let mut driver = SyncDriver::new(sync_config("download", out.path(), "x"));
        driver
            .run(|_| Ok(shared(&store)), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(store.get_keys(), vec!["x/my file+v1.txt"]);
        assert!(out.path().join("my file+v1.txt").is_file());
    }

    #[tokio::test]
    async fn test_should_drain_queued_work_after_listing_failure() {
        let out = tempfile::tempdir().unwrap();
        let store = Arc::new(
            RecordingStore::new(seeded(&["x/1.txt", "x/2.txt"])).with_listing_script(vec![
                ScriptedPage::keys(&["x/1.txt", "x/2.txt"], true, Some("x/2.txt")),
                ScriptedPage::Fail("service unavailable".to_owned()),
            ]),
        );

        let mut driver = SyncDriver::new(sync_config("download", out.path(), "x"));
        let report = driver
            .run(|_| Ok(shared(&store)), &CancellationToken::new())
            .await
            .unwrap();

        assert!(!report.is_success());
        assert!(matches!(report.halted, Some(HaltReason::Enumeration(_))));
        assert_eq!(store.get_keys(), vec!["x/1.txt", "x/2.txt"]);
        assert_eq!(report.summary.succeeded, 2);
    }

    #[tokio::test]
    async fn test_should_skip_keys_escaping_destination() {
        let out = tempfile::tempdir().unwrap();
        let root = out.path().join("inner");
        let store = Arc::new(
            RecordingStore::new(seeded(&["x/ok.txt"])).with_listing_script(vec![
                ScriptedPage::keys(&["x/../evil.txt", "x/ok.txt"], false, None),
            ]),
        );

        let mut driver = SyncDriver::new(sync_config("download", &root, "x"));
        let report = driver
            .run(|_| Ok(shared(&store)), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.summary.skipped, 1);
        assert_eq!(store.get_keys(), vec!["x/ok.txt"]);
        assert!(!out.path().join("evil.txt").exists());
    }

    #[tokio::test]
    async fn test_should_record_failed_get_and_continue() {
        let out = tempfile::tempdir().unwrap();
        let store = Arc::new(RecordingStore::new(seeded(&["x/1.txt", "x/2.txt", "x/3.txt"])));
        store.fail_key("x/2.txt");

        let mut driver = SyncDriver::new(sync_config("download", out.path(), "x"));
        let report = driver
            .run(|_| Ok(shared(&store)), &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.summary.succeeded, 2);
        assert_eq!(report.summary.failed.len(), 1);
        assert_eq!(report.summary.failed[0].source, "x/2.txt");
    }
}
