use super::*;
use crate::config::CacheConfig;
use crate::models::ThoughtKind;
use crate::storage::MockStorage;
use crate::thinking::QuotaWarningKind;
use pretty_assertions::assert_eq;

fn config() -> ThinkingConfig {
    ThinkingConfig {
        max_thoughts: 50,
        thoughts_increment: 10,
        max_tool_calls: 5,
        max_tool_calls_per_thought: 3,
    }
}

fn engine(mock: MockStorage) -> ThinkingEngine {
    ThinkingEngine::new(Arc::new(mock), config())
}

/// Storage that has no sessions and must never be written.
fn read_only_empty() -> MockStorage {
    let mut mock = MockStorage::new();
    mock.expect_get_session().returning(|_| Ok(None));
    mock.expect_put_session().never();
    mock
}

fn calls(n: usize) -> Vec<Value> {
    (0..n).map(|i| json!({"name": format!("tool{}", i)})).collect()
}

#[tokio::test]
async fn test_range_errors_precede_storage_access() {
    // no expectations: any storage call would panic
    let engine = engine(MockStorage::new());

    let err = engine
        .submit_thought_step(ThoughtStepRequest::new("x", 0, 5, true))
        .await
        .unwrap_err();
    assert!(matches!(err, ThinkingError::Range { .. }));

    let err = engine
        .submit_thought_step(ThoughtStepRequest::new("x", 4, 3, true))
        .await
        .unwrap_err();
    assert!(matches!(err, ThinkingError::Range { .. }));

    let err = engine
        .submit_thought_step(ThoughtStepRequest::new("   ", 1, 3, true))
        .await
        .unwrap_err();
    assert!(matches!(err, ThinkingError::Validation { .. }));

    let err = engine
        .submit_thought_step(ThoughtStepRequest::new("x", 1, 51, true).with_more_thoughts())
        .await
        .unwrap_err();
    assert!(matches!(err, ThinkingError::QuotaExceeded { .. }));
}

#[tokio::test]
async fn test_per_thought_quota_boundary() {
    let engine = engine(read_only_empty());
    let result = engine
        .submit_thought_step(ThoughtStepRequest::new("x", 1, 3, true).with_tool_calls(calls(4)))
        .await
        .unwrap();
    let warning = result.warning().unwrap();
    assert_eq!(warning.kind, QuotaWarningKind::ToolCallsPerThought);

    let mut mock = MockStorage::new();
    mock.expect_get_session().returning(|_| Ok(None));
    mock.expect_put_session()
        .withf(|s| s.tool_call_history.len() == 3 && s.thought_count() == 1)
        .times(1)
        .returning(|_| Ok(true));
    let engine = self::engine(mock);
    let result = engine
        .submit_thought_step(ThoughtStepRequest::new("x", 1, 3, true).with_tool_calls(calls(3)))
        .await
        .unwrap();
    assert!(result.is_recorded());
    assert_eq!(result.summary().unwrap().tool_calls.len(), 3);
}

#[tokio::test]
async fn test_session_quota_counts_history() {
    let mut existing = ThinkingSession::new("busy").unwrap().with_id("busy").unwrap();
    let records = correlate(1, &calls(3), &[]).unwrap();
    for record in records {
        existing.add_tool_call_record(record);
    }

    let mut mock = MockStorage::new();
    mock.expect_get_session()
        .returning(move |_| Ok(Some(existing.clone())));
    mock.expect_put_session().never();
    let engine = engine(mock);

    let result = engine
        .submit_thought_step(
            ThoughtStepRequest::new("x", 2, 3, true)
                .with_session("busy")
                .with_tool_calls(calls(3)),
        )
        .await
        .unwrap();
    match result {
        ThoughtStepResult::Rejected(rejection) => {
            assert_eq!(rejection.warning.kind, QuotaWarningKind::SessionToolCalls);
            assert_eq!(rejection.tool_call_count, 3);
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ceiling_warning_writes_nothing() {
    let engine = engine(read_only_empty());
    let result = engine
        .submit_thought_step(ThoughtStepRequest::new("x", 50, 50, true).with_more_thoughts())
        .await
        .unwrap();
    let warning = result.warning().unwrap();
    assert_eq!(warning.kind, QuotaWarningKind::ThoughtCeiling);
    assert!(warning.message.contains("ceiling"));
}

#[tokio::test]
async fn test_auto_vivified_session() {
    let mut mock = MockStorage::new();
    mock.expect_get_session().returning(|_| Ok(None));
    mock.expect_put_session()
        .withf(|s| {
            s.session_id == "abcdefghijkl"
                && s.name == "Session-abcdefgh"
                && s.metadata["session_type"] == json!("sequential_thinking")
        })
        .times(1)
        .returning(|_| Ok(true));
    let engine = engine(mock);

    let result = engine
        .submit_thought_step(ThoughtStepRequest::new("x", 1, 2, true).with_session("abcdefghijkl"))
        .await
        .unwrap();
    assert!(result.summary().unwrap().session_created);
}

#[tokio::test]
async fn test_extension_recorded_in_metadata() {
    let mut mock = MockStorage::new();
    mock.expect_get_session().returning(|_| Ok(None));
    mock.expect_put_session()
        .withf(|s| {
            let history = s.total_thoughts_history();
            history.len() == 1 && history[0].original_total == 45 && history[0].new_total == 50
        })
        .times(1)
        .returning(|_| Ok(true));
    let engine = engine(mock);

    let result = engine
        .submit_thought_step(ThoughtStepRequest::new("x", 45, 45, true).with_more_thoughts())
        .await
        .unwrap();
    let summary = result.summary().unwrap();
    assert_eq!(summary.total_thoughts, 50);
    assert_eq!(summary.adjustment.as_ref().unwrap().thought_number, 45);
}

#[tokio::test]
async fn test_completion_and_kind() {
    let mut mock = MockStorage::new();
    mock.expect_get_session().returning(|_| Ok(None));
    mock.expect_put_session()
        .withf(|s| {
            s.is_completed()
                && s.thoughts[0].kind == ThoughtKind::Revision { revises_thought: 1 }
        })
        .times(1)
        .returning(|_| Ok(true));
    let engine = engine(mock);

    let result = engine
        .submit_thought_step(ThoughtStepRequest::new("x", 2, 2, false).with_revision(1))
        .await
        .unwrap();
    let summary = result.summary().unwrap();
    assert_eq!(summary.session_status, SessionStatus::Completed);
    assert_eq!(summary.thought_type, "revision");
}

#[tokio::test]
async fn test_invalid_kind_writes_nothing() {
    let engine = engine(read_only_empty());
    let err = engine
        .submit_thought_step(ThoughtStepRequest::new("x", 2, 3, true).with_revision(2))
        .await
        .unwrap_err();
    assert!(matches!(err, ThinkingError::Validation { .. }));
}

#[tokio::test]
async fn test_storage_failure_propagates() {
    let mut mock = MockStorage::new();
    mock.expect_get_session().returning(|_| {
        Err(crate::error::StorageError::Query {
            message: "locked".to_string(),
        })
    });
    let engine = engine(mock);

    let err = engine
        .submit_thought_step(ThoughtStepRequest::new("x", 1, 1, false))
        .await
        .unwrap_err();
    assert!(matches!(err, ThinkingError::Storage(_)));
}

#[tokio::test]
async fn test_results_feed_cache() {
    let mut mock = MockStorage::new();
    mock.expect_get_session().returning(|_| Ok(None));
    mock.expect_put_session().returning(|_| Ok(true));

    let cache = Arc::new(Mutex::new(ToolCallManager::new(&CacheConfig::default())));
    let engine = engine(mock).with_cache(cache.clone());

    engine
        .submit_thought_step(
            ThoughtStepRequest::new("x", 1, 2, true)
                .with_tool_calls(vec![
                    json!({"name": "search", "call_id": "a", "arguments": {"q": "rust"}}),
                    json!({"name": "fetch", "call_id": "b"}),
                ])
                .with_tool_results(vec![
                    json!({"call_id": "a", "result": "hit", "execution_time_ms": 4.0}),
                    json!({"call_id": "b", "success": false}),
                ]),
        )
        .await
        .unwrap();

    let mut manager = cache.lock().await;
    assert_eq!(manager.statistics().total_calls, 2);
    assert_eq!(manager.statistics().failed_calls, 1);
    let args = json!({"q": "rust"}).as_object().cloned().unwrap();
    let cached = manager.lookup("search", &args).unwrap();
    assert_eq!(cached.result, json!("hit"));
    assert!(manager.lookup("fetch", &Map::new()).is_none());
}

#[tokio::test]
async fn test_cache_call_quota_is_respected() {
    let mut mock = MockStorage::new();
    mock.expect_get_session().returning(|_| Ok(None));
    mock.expect_put_session().returning(|_| Ok(true));

    let cache = Arc::new(Mutex::new(ToolCallManager::new(&CacheConfig {
        cache_size: 10,
        max_calls: 1,
    })));
    let engine = engine(mock).with_cache(cache.clone());

    let result = engine
        .submit_thought_step(
            ThoughtStepRequest::new("x", 1, 2, true)
                .with_tool_calls(vec![
                    json!({"name": "search", "call_id": "a"}),
                    json!({"name": "fetch", "call_id": "b"}),
                ])
                .with_tool_results(vec![
                    json!({"call_id": "a", "result": "one"}),
                    json!({"call_id": "b", "result": "two"}),
                ]),
        )
        .await
        .unwrap();
    // the step itself is unaffected by the cache quota
    assert_eq!(result.summary().unwrap().tool_calls.len(), 2);

    let mut manager = cache.lock().await;
    assert!(!manager.can_execute());
    assert_eq!(manager.remaining_calls(), 0);
    assert_eq!(manager.statistics().total_calls, 1);
    assert_eq!(manager.cache_len(), 1);
    assert!(manager.lookup("search", &Map::new()).is_some());
    assert!(manager.lookup("fetch", &Map::new()).is_none());
}

#[tokio::test]
async fn test_set_config_rejects_zero_limits() {
    let engine = engine(MockStorage::new());
    let bad = ThinkingConfig {
        max_thoughts: 0,
        ..config()
    };
    assert!(engine.set_config(bad).await.is_err());
    assert_eq!(engine.config().await, config());

    let tighter = ThinkingConfig {
        max_thoughts: 5,
        ..config()
    };
    engine.set_config(tighter).await.unwrap();
    let err = engine
        .submit_thought_step(ThoughtStepRequest::new("x", 1, 6, true))
        .await
        .unwrap_err();
    assert!(matches!(err, ThinkingError::QuotaExceeded { .. }));
}
