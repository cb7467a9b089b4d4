//! Storage Module Tests
//!
//! Validates the command semantics of the key-value backends.
//!
//! ## Test Scopes
//! - **MemoryStore**: scalar, counter and set commands, type checking, batch behaviour.
//! - **Pipeline**: reply alignment and the empty-batch shortcut.
//! - **RemoteStore**: the same commands executed over HTTP against a hosted `MemoryStore`.

#[cfg(test)]
mod tests {
    use crate::error::StoreError;
    use crate::storage::handlers::handle_batch;
    use crate::storage::memory::MemoryStore;
    use crate::storage::partitioner::PartitionManager;
    use crate::storage::protocol::{Command, ENDPOINT_BATCH, Reply, ValueKind};
    use crate::storage::remote::{RemoteStore, RemoteStoreConfig};
    use crate::storage::store::Store;
    use axum::{Extension, Router, routing::post};
    use std::collections::BTreeSet;
    use std::net::SocketAddr;
    use std::sync::Arc;

    fn members(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    async fn spawn_store_node(store: Arc<MemoryStore>) -> SocketAddr {
        let app = Router::new()
            .route(ENDPOINT_BATCH, post(handle_batch))
            .layer(Extension(store));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    // ============================================================
    // MEMORY STORE - SCALARS AND COUNTERS
    // ============================================================

    #[tokio::test]
    async fn test_get_missing_key_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let store = MemoryStore::new();
        store.set("expr:1:text", "<mi>x</mi>").await.unwrap();
        assert_eq!(
            store.get("expr:1:text").await.unwrap(),
            Some("<mi>x</mi>".to_string())
        );

        store.set("expr:1:text", "<mi>y</mi>").await.unwrap();
        assert_eq!(
            store.get("expr:1:text").await.unwrap(),
            Some("<mi>y</mi>".to_string())
        );
    }

    #[tokio::test]
    async fn test_incr_starts_at_one_and_increases() {
        let store = MemoryStore::new();
        assert_eq!(store.incr("next_expr_id").await.unwrap(), 1);
        assert_eq!(store.incr("next_expr_id").await.unwrap(), 2);
        assert_eq!(store.incr("next_expr_id").await.unwrap(), 3);
        assert_eq!(
            store.get("next_expr_id").await.unwrap(),
            Some("3".to_string())
        );
    }

    #[tokio::test]
    async fn test_incr_on_non_numeric_value_fails() {
        let store = MemoryStore::new();
        store.set("next_expr_id", "seven").await.unwrap();

        let err = store.incr("next_expr_id").await.unwrap_err();
        assert!(
            matches!(err, StoreError::NotAnInteger { ref value, .. } if value == "seven"),
            "unexpected error: {err}"
        );
        // The corrupt value is left untouched
        assert_eq!(
            store.get("next_expr_id").await.unwrap(),
            Some("seven".to_string())
        );
    }

    #[tokio::test]
    async fn test_concurrent_incr_hands_out_unique_values() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                for _ in 0..50 {
                    seen.push(store.incr("counter").await.unwrap());
                }
                seen
            }));
        }

        let mut all = BTreeSet::new();
        for handle in handles {
            for value in handle.await.unwrap() {
                assert!(all.insert(value), "value {} handed out twice", value);
            }
        }
        assert_eq!(all.len(), 400);
        assert_eq!(all.iter().next_back(), Some(&400));
    }

    // ============================================================
    // MEMORY STORE - SETS
    // ============================================================

    #[tokio::test]
    async fn test_sadd_reports_new_members_only() {
        let store = MemoryStore::new();
        assert!(store.sadd("expr:1:doc", "d1").await.unwrap());
        assert!(!store.sadd("expr:1:doc", "d1").await.unwrap());
        assert!(store.sadd("expr:1:doc", "d2").await.unwrap());

        assert_eq!(
            store.smembers("expr:1:doc").await.unwrap(),
            members(&["d1", "d2"])
        );
    }

    #[tokio::test]
    async fn test_smembers_missing_key_is_empty() {
        let store = MemoryStore::new();
        assert!(store.smembers("pair:x:exprs").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sinter_of_several_sets() {
        let store = MemoryStore::new();
        for id in ["1", "2", "3"] {
            store.sadd("a", id).await.unwrap();
        }
        for id in ["2", "3", "4"] {
            store.sadd("b", id).await.unwrap();
        }
        for id in ["3", "2", "9"] {
            store.sadd("c", id).await.unwrap();
        }

        let common = store
            .sinter(vec!["a".to_string(), "b".to_string(), "c".to_string()])
            .await
            .unwrap();
        assert_eq!(common, members(&["2", "3"]));
    }

    #[tokio::test]
    async fn test_sinter_with_missing_set_is_empty() {
        let store = MemoryStore::new();
        store.sadd("a", "1").await.unwrap();

        let common = store
            .sinter(vec!["a".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert!(common.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_type_access_is_rejected() {
        let store = MemoryStore::new();
        store.set("scalar", "1").await.unwrap();
        store.sadd("set", "1").await.unwrap();

        let err = store.sadd("scalar", "x").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::WrongType {
                expected: ValueKind::Set,
                ..
            }
        ));

        let err = store.get("set").await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::WrongType {
                expected: ValueKind::Scalar,
                ..
            }
        ));

        assert!(store.set("set", "2").await.is_err());
        assert!(store.incr("set").await.is_err());
    }

    #[tokio::test]
    async fn test_keys_spread_over_partitions() {
        let store = MemoryStore::with_partitioner(PartitionManager::with_partitions(16));
        for i in 0..200 {
            store.set(&format!("key_{}", i), "v").await.unwrap();
        }

        assert_eq!(store.local_entry_count(), 200);
        assert!(
            store.local_partition_count() > 8,
            "keys should land in most partitions, got {}",
            store.local_partition_count()
        );
    }

    // ============================================================
    // BATCHES AND PIPELINES
    // ============================================================

    #[tokio::test]
    async fn test_pipeline_replies_align_with_commands() {
        let store = MemoryStore::new();
        let mut pipe = store.pipeline();
        pipe.push(Command::set("k", "v"))
            .push(Command::incr("n"))
            .push(Command::sadd("s", "m"))
            .push(Command::get("k"))
            .push(Command::smembers("s"));
        assert_eq!(pipe.len(), 5);

        let replies = pipe.execute().await.unwrap();
        assert_eq!(
            replies,
            vec![
                Reply::Ok,
                Reply::Int(1),
                Reply::Int(1),
                Reply::Text("v".to_string()),
                Reply::Members(members(&["m"])),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_pipeline_returns_no_replies() {
        let store = MemoryStore::new();
        let pipe = store.pipeline();
        assert!(pipe.is_empty());
        assert!(pipe.execute().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_batch_keeps_earlier_commands_applied() {
        let store = MemoryStore::new();
        store.set("scalar", "x").await.unwrap();

        let (replies, error) = store.run_batch(vec![
            Command::set("first", "1"),
            Command::sadd("scalar", "boom"),
            Command::set("never", "1"),
        ]);

        assert_eq!(replies, vec![Reply::Ok]);
        assert!(matches!(error, Some(StoreError::WrongType { .. })));
        assert_eq!(store.get("first").await.unwrap(), Some("1".to_string()));
        assert_eq!(store.get("never").await.unwrap(), None);
    }

    #[test]
    fn test_command_wire_format() {
        let json = serde_json::to_value(Command::sadd("pair:a:exprs", 7)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"op": "sadd", "key": "pair:a:exprs", "member": "7"})
        );

        let reply: Reply = serde_json::from_value(serde_json::json!({"type": "nil"})).unwrap();
        assert_eq!(reply, Reply::Nil);
    }

    #[test]
    fn test_ok_reply_accepts_only_ok() {
        assert!(Reply::Ok.into_ok().is_ok());

        let err = Reply::Int(1).into_ok().unwrap_err();
        assert!(
            matches!(err, StoreError::UnexpectedReply { expected: "ok", .. }),
            "unexpected error: {err}"
        );
        assert!(Reply::Nil.into_ok().is_err());
    }

    // ============================================================
    // REMOTE STORE (HTTP)
    // ============================================================

    #[tokio::test]
    async fn test_remote_store_executes_against_hosted_store() {
        let hosted = Arc::new(MemoryStore::new());
        let addr = spawn_store_node(hosted.clone()).await;
        let remote = RemoteStore::new(RemoteStoreConfig::new(addr));

        assert_eq!(remote.incr("next_expr_id").await.unwrap(), 1);
        assert!(remote.sadd("expr:1:doc", "d1").await.unwrap());
        remote.set("expr:1:text", "x + y").await.unwrap();

        // Writes are visible on the hosting node
        assert_eq!(
            hosted.get("expr:1:text").await.unwrap(),
            Some("x + y".to_string())
        );
        assert_eq!(
            remote.smembers("expr:1:doc").await.unwrap(),
            members(&["d1"])
        );
        assert_eq!(remote.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remote_store_pipeline_is_one_batch() {
        let hosted = Arc::new(MemoryStore::new());
        let addr = spawn_store_node(hosted).await;
        let remote = RemoteStore::new(RemoteStoreConfig::new(addr));

        let mut pipe = remote.pipeline();
        for id in 1..=3 {
            pipe.push(Command::sadd("pair:a:exprs", id));
        }
        pipe.push(Command::smembers("pair:a:exprs"));
        let replies = pipe.execute().await.unwrap();

        assert_eq!(replies.len(), 4);
        assert_eq!(replies[3], Reply::Members(members(&["1", "2", "3"])));
    }

    #[tokio::test]
    async fn test_remote_store_surfaces_faults() {
        let hosted = Arc::new(MemoryStore::new());
        hosted.set("next_expr_id", "garbage").await.unwrap();
        let addr = spawn_store_node(hosted).await;
        let remote = RemoteStore::new(RemoteStoreConfig::new(addr));

        let err = remote.incr("next_expr_id").await.unwrap_err();
        assert!(
            matches!(err, StoreError::NotAnInteger { ref key, .. } if key == "next_expr_id"),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn test_remote_store_unreachable_node_is_an_error() {
        // Bind then drop to get a port nobody listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let remote = RemoteStore::new(RemoteStoreConfig::new(addr));
        let err = remote.get("anything").await.unwrap_err();
        assert!(matches!(err, StoreError::Http(_)));
    }

    #[test]
    fn test_remote_store_base_path_normalisation() {
        let addr: SocketAddr = "127.0.0.1:7000".parse().unwrap();
        let mut config = RemoteStoreConfig::new(addr);
        config.base_path = "cluster/".to_string();

        let remote = RemoteStore::new(config);
        assert_eq!(remote.batch_url(), "http://127.0.0.1:7000/cluster/store/batch");
    }
}
