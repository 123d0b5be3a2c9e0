use std::sync::Arc;

use rowdraw::{
    CancelHandle, DataType, Error, Field, RowDrawEngine, RowDrawSession, SampleOptions,
    SampleStatus, SamplerConfig, Schema, TableName, Value,
};
use rowdraw_test_utils::{dense_catalog, text_catalog};

fn users_session() -> RowDrawSession {
    let session = RowDrawEngine::new().create_session();
    let users = TableName::new(None, "users");
    session
        .catalog()
        .create_table(
            &users,
            Schema::from_fields(vec![
                Field::required("id", DataType::Int64),
                Field::nullable("name", DataType::String),
            ]),
        )
        .unwrap();
    session
        .catalog()
        .insert_rows(
            &users,
            (1..=25)
                .map(|i| vec![Value::int64(i * 3), Value::string(format!("user{}", i))])
                .collect(),
        )
        .unwrap();
    session
}

#[tokio::test]
async fn test_async_sample() {
    let session = users_session();
    let outcome = session
        .sample("users", SampleOptions::new(5).with_key_column("id"))
        .await
        .unwrap();
    assert_eq!(outcome.status, SampleStatus::Complete);
    assert_eq!(outcome.row_count(), 5);
    assert_eq!(session.metrics().get_sample_count(), 1);
}

#[tokio::test]
async fn test_query_returns_row_results() {
    let session = users_session();
    let result = session
        .query("public.users", SampleOptions::new(4))
        .await
        .unwrap();
    assert_eq!(result.row_count(), 4);
    assert_eq!(result.column_names(), vec!["id", "name"]);
    let id = result.get_by_name(0, "id").and_then(Value::as_i64).unwrap();
    assert_eq!(id % 3, 0);

    let json = result.to_json_response();
    assert_eq!(json["rows"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_cancelled_sample_returns_error() {
    let session = RowDrawSession::with_catalog(text_catalog(30));
    let cancel = CancelHandle::new();
    cancel.cancel();
    let err = session
        .sample_with_cancel("notes", SampleOptions::new(3), cancel)
        .await
        .unwrap_err();
    assert_eq!(err, Error::Cancelled);
    assert_eq!(session.metrics().get_error_count(), 1);
}

#[tokio::test]
async fn test_unknown_relation_and_bad_names() {
    let session = RowDrawSession::new();
    assert!(matches!(
        session.sample("ghost", SampleOptions::new(1)).await.unwrap_err(),
        Error::UnknownRelation(_)
    ));
    assert!(matches!(
        session.sample("a.b.c", SampleOptions::new(1)).await.unwrap_err(),
        Error::InvalidIdentifier(_)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_samples_share_metrics() {
    let session = Arc::new(RowDrawSession::with_catalog(dense_catalog(1000)));
    let mut handles = Vec::new();
    for seed in 0..8u64 {
        let session = Arc::clone(&session);
        handles.push(tokio::spawn(async move {
            session
                .sample(
                    "items",
                    SampleOptions::new(30).with_key_column("id").with_seed(seed),
                )
                .await
        }));
    }
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        assert_eq!(outcome.row_count(), 30);
    }
    assert_eq!(session.metrics().get_sample_count(), 8);
}

#[tokio::test]
async fn test_writes_between_samples_are_visible() {
    let session = users_session();
    let users = TableName::parse("users");
    let before = session
        .sample("users", SampleOptions::new(100).with_key_column("id"))
        .await
        .unwrap();
    assert_eq!(before.status, SampleStatus::DomainExhausted);
    assert_eq!(before.row_count(), 25);

    session
        .catalog()
        .insert_rows(
            &users,
            (26..=200)
                .map(|i| vec![Value::int64(i * 3), Value::string(format!("user{}", i))])
                .collect(),
        )
        .unwrap();
    let after = session
        .sample("users", SampleOptions::new(100).with_key_column("id"))
        .await
        .unwrap();
    assert_eq!(after.status, SampleStatus::Complete);
    assert_eq!(after.row_count(), 100);
}

#[test]
fn test_configured_defaults_flow_into_options() {
    let config = SamplerConfig::from_toml_str(
        r#"
        [sampler]
        gaps = 1.5
        seed = 77
        count_source = "exact"

        [retry]
        max_attempts = 5
        "#,
    )
    .unwrap();
    let session = RowDrawEngine::with_config(config).create_session();
    let options = session.options(3);
    assert_eq!(options.limit, 3);
    assert_eq!(options.gaps, 1.5);
    assert_eq!(options.seed, Some(77));
    assert_eq!(options.retry.max_attempts, 5);

    assert!(SamplerConfig::from_toml_str("[sampler]\nunknown = 1").is_err());
}

#[test]
fn test_blocking_sample_and_columns() {
    let session = users_session();
    let columns = session.columns("users").unwrap();
    assert_eq!(columns.len(), 2);
    assert!(!columns[0].nullable);
    assert!(columns[1].nullable);

    let outcome = session
        .sample_blocking("users", &session.options(2).with_key_column("id"))
        .unwrap();
    assert_eq!(outcome.row_count(), 2);

    let statements = session
        .explain("users", &session.options(2).with_key_column("id"))
        .unwrap();
    assert!(statements.iter().all(|s| !s.sql().is_empty()));
}
