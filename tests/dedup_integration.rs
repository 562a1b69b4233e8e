//! Integration tests for the dedup decorator over the JSON sink

use std::sync::Arc;
use std::time::Duration;

use deduplog::{DedupConfig, DedupSink, Field, JsonSink, Level, Record, Sink};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Take and parse everything written so far, one JSON object per line.
fn drain(buf: &Arc<Mutex<Vec<u8>>>) -> Vec<Value> {
    let mut buf = buf.lock();
    let out = String::from_utf8_lossy(&buf)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    buf.clear();
    out
}

fn minute() -> DedupConfig {
    DedupConfig::default().retention(Duration::from_secs(60))
}

#[tokio::test]
async fn test_dedup_log() {
    let json_sink = JsonSink::new(Vec::new());
    let buf = json_sink.writer();
    let logger = DedupSink::new(json_sink, minute(), CancellationToken::new()).unwrap();

    logger.handle(&Record::new(Level::Info, "test")).unwrap();
    assert_eq!(drain(&buf), vec![json!({"level": "INFO", "msg": "test"})]);

    // The same log is deduplicated
    logger.handle(&Record::new(Level::Info, "test")).unwrap();
    assert!(drain(&buf).is_empty());

    // Slightly different log is not deduplicated
    logger.handle(&Record::new(Level::Info, "test2")).unwrap();
    assert_eq!(drain(&buf), vec![json!({"level": "INFO", "msg": "test2"})]);
}

#[tokio::test]
async fn test_dedup_log_with_fields_and_group() {
    let json_sink = JsonSink::with_level(Vec::new(), Level::Debug);
    let buf = json_sink.writer();
    let logger = DedupSink::new(json_sink, minute(), CancellationToken::new()).unwrap();

    logger
        .handle(
            &Record::new(Level::Info, "test")
                .with_field("key1", 1)
                .with_field("g1", json!({"key2": 2})),
        )
        .unwrap();
    let first = drain(&buf);
    assert_eq!(first[0]["msg"], "test");
    assert_eq!(first[0]["g1"]["key2"], 2);

    // Fields are ignored when deciding duplicates
    logger.handle(&Record::new(Level::Info, "test")).unwrap();
    assert!(drain(&buf).is_empty());

    // The derived logger has its own history but inherits the sink's options
    let derived = logger
        .with_group("g1")
        .with_fields(&[Field::new("key1", "value1")]);
    derived
        .handle(&Record::new(Level::Info, "test").with_field("key2", "value2"))
        .unwrap();
    assert_eq!(
        drain(&buf),
        vec![json!({"level": "INFO", "msg": "test", "g1": {"key1": "value1", "key2": "value2"}})]
    );
    assert!(derived.enabled(Level::Debug));
    assert_eq!(derived.config(), logger.config());
}

#[tokio::test]
async fn test_delete_history_synchronously() {
    let json_sink = JsonSink::new(Vec::new());
    let buf = json_sink.writer();
    let logger =
        DedupSink::new(json_sink, minute().max_history(2), CancellationToken::new()).unwrap();

    logger.handle(&Record::new(Level::Info, "test1")).unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    logger.handle(&Record::new(Level::Info, "test2")).unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    logger.handle(&Record::new(Level::Info, "test3")).unwrap();
    drain(&buf);

    // The oldest entry was evicted, so it is logged again
    logger.handle(&Record::new(Level::Info, "test1")).unwrap();
    assert_eq!(drain(&buf), vec![json!({"level": "INFO", "msg": "test1"})]);
    assert!(logger.history_len() <= 2);
}

#[tokio::test]
async fn test_errors_bypass_dedup() {
    let json_sink = JsonSink::new(Vec::new());
    let buf = json_sink.writer();
    let logger = DedupSink::with_defaults(json_sink, CancellationToken::new()).unwrap();

    for _ in 0..3 {
        logger.handle(&Record::new(Level::Error, "upstream down")).unwrap();
    }

    assert_eq!(drain(&buf).len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_sweeper_bounds_memory_for_one_off_messages() {
    let logger = DedupSink::new(
        JsonSink::new(Vec::new()),
        DedupConfig::default().retention(Duration::from_secs(2)),
        CancellationToken::new(),
    )
    .unwrap();

    for i in 0..100 {
        logger
            .handle(&Record::new(Level::Info, format!("request {i} served")))
            .unwrap();
    }
    assert_eq!(logger.history_len(), 100);

    // Default sweep interval is 5s; entries expired at 2s
    tokio::time::sleep(Duration::from_secs(6)).await;
    tokio::task::yield_now().await;

    assert_eq!(logger.history_len(), 0);
    let stats = logger.stats();
    assert_eq!(stats.forwarded, 100);
    assert_eq!(stats.expired, 100);
}

#[tokio::test]
async fn test_config_file_drives_decorator() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "retention: 1m\nmax_history: 1\ndedup_level: warn").unwrap();
    let config = DedupConfig::load(Some(file.path())).unwrap();

    let json_sink = JsonSink::new(Vec::new());
    let buf = json_sink.writer();
    let logger = DedupSink::new(json_sink, config, CancellationToken::new()).unwrap();

    logger.handle(&Record::new(Level::Warn, "slow query")).unwrap();
    logger.handle(&Record::new(Level::Warn, "slow query")).unwrap();
    logger.handle(&Record::new(Level::Info, "cache miss")).unwrap();
    logger.handle(&Record::new(Level::Warn, "slow query")).unwrap();

    let msgs: Vec<Value> = drain(&buf).into_iter().map(|v| v["msg"].clone()).collect();
    assert_eq!(msgs, vec![json!("slow query"), json!("cache miss"), json!("slow query")]);
}

#[tokio::test]
async fn test_dropping_decorator_leaves_caller_token_untouched() {
    let cancel = CancellationToken::new();
    let logger = DedupSink::with_defaults(JsonSink::new(Vec::new()), cancel.clone()).unwrap();
    assert!(logger.is_sweeping());
    drop(logger);

    // The caller's token is untouched by the drop
    assert!(!cancel.is_cancelled());
}
