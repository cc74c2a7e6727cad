#![forbid(unsafe_code)]

use cafe_kernel_contracts::intent::{SourceService, FALLBACK_INTENT, ORDER_INTENT};
use cafe_kernel_contracts::interaction::InteractionRecord;
use cafe_kernel_contracts::language::LanguageCode;
use cafe_kernel_contracts::sentiment::SentimentLabel;
use cafe_kernel_contracts::slot::{SlotMap, SlotValue};
use cafe_storage::interaction_log::{FsInteractionLog, StorageError, LOGS_DIR};
use cafe_storage::repo::InteractionLogRepo;

fn record(id: &str, session: &str, timestamp: &str, source: SourceService) -> InteractionRecord {
    let mut slots = SlotMap::new();
    slots.insert("TiposDeBebida".to_string(), Some(SlotValue::interpreted("Latte")));
    InteractionRecord {
        interaction_id: id.to_string(),
        session_id: session.to_string(),
        timestamp: timestamp.to_string(),
        user_input: "I want a latte".to_string(),
        detected_language: LanguageCode::new("en").unwrap(),
        translated_input: "quiero a latte".to_string(),
        intent: match source {
            SourceService::Structured => ORDER_INTENT.to_string(),
            SourceService::Generative => FALLBACK_INTENT.to_string(),
        },
        slots,
        response_text: "Perfecto, un Latte.".to_string(),
        source_service: source,
        sentiment: SentimentLabel::Neutral,
        is_fallback: source == SourceService::Generative,
    }
}

#[test]
fn at_log_db_01_rows_land_in_dated_partitions() {
    let dir = tempfile::tempdir().unwrap();
    let log = FsInteractionLog::new(dir.path());
    log.append_interaction_row(&record(
        "i-1",
        "s1",
        "2026-10-13T23:59:59Z",
        SourceService::Structured,
    ))
    .unwrap();
    log.append_interaction_row(&record(
        "i-2",
        "s1",
        "2026-10-14T00:00:01Z",
        SourceService::Generative,
    ))
    .unwrap();

    let first = dir.path().join(LOGS_DIR).join("2026-10-13").join("i-1.json");
    let second = dir.path().join(LOGS_DIR).join("2026-10-14").join("i-2.json");
    assert!(first.is_file());
    assert!(second.is_file());

    let raw: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&second).unwrap()).unwrap();
    assert_eq!(raw["interactionId"], "i-2");
    assert_eq!(raw["sourceService"], "generative");
    assert_eq!(raw["isFallback"], true);
    assert_eq!(raw["slots"]["TiposDeBebida"]["interpretedValue"], "Latte");
}

#[test]
fn at_log_db_02_session_rows_read_back_in_time_order() {
    let dir = tempfile::tempdir().unwrap();
    let log = FsInteractionLog::new(dir.path());
    for (id, session, ts) in [
        ("b", "s1", "2026-10-14T10:00:00Z"),
        ("a", "s1", "2026-10-14T09:00:00Z"),
        ("c", "s2", "2026-10-14T09:30:00Z"),
    ] {
        log.append_interaction_row(&record(id, session, ts, SourceService::Structured))
            .unwrap();
    }
    let rows = log.interaction_rows_for_session("s1").unwrap();
    let ids: Vec<&str> = rows.iter().map(|r| r.interaction_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert!(log.interaction_rows_for_session("nobody").unwrap().is_empty());
}

#[test]
fn at_log_db_03_duplicate_id_is_refused_and_file_kept() {
    let dir = tempfile::tempdir().unwrap();
    let log = FsInteractionLog::new(dir.path());
    let r = record("dup", "s1", "2026-10-14T09:00:00Z", SourceService::Structured);
    log.append_interaction_row(&r).unwrap();
    let mut again = r.clone();
    again.response_text = "overwritten".to_string();
    assert!(matches!(
        log.append_interaction_row(&again),
        Err(StorageError::DuplicateKey { .. })
    ));
    let rows = log.interaction_rows_for_session("s1").unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].response_text, "Perfecto, un Latte.");
}

#[test]
fn at_log_db_04_empty_root_reads_as_no_rows() {
    let dir = tempfile::tempdir().unwrap();
    let log = FsInteractionLog::new(dir.path().join("missing"));
    assert!(log.interaction_rows_for_session("s1").unwrap().is_empty());
}
