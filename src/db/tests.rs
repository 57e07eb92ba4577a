use super::init::migrate;
use super::operations::*;
use crate::call::{CallDirection, StoredCallRecord};
use anyhow::Result;
use rusqlite::Connection;

fn setup_test_db() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    migrate(&conn)?;
    Ok(conn)
}

fn create_test_call(id: i64, number: &str, direction: CallDirection) -> StoredCallRecord {
    let recorded = direction != CallDirection::Missed;
    StoredCallRecord {
        id,
        number: number.to_string(),
        direction,
        start: id - 1000,
        end: id,
        duration_ms: 1000,
        audio_base64: recorded.then(|| "AAEC".to_string()),
        mime: recorded.then(|| "audio/L16;rate=16000;channels=1".to_string()),
    }
}

#[test]
fn test_migrate_creates_table() {
    let conn = Connection::open_in_memory().unwrap();
    migrate(&conn).unwrap();

    // Verify table exists by querying it
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='calls'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 1);

    // Running twice is harmless
    migrate(&conn).unwrap();
}

#[test]
fn test_insert_and_get_call() {
    let conn = setup_test_db().unwrap();
    let call = create_test_call(1_700_000_000_000, "+919876543210", CallDirection::Outgoing);

    let seq = insert_call(&conn, &call).unwrap();
    assert!(seq > 0);

    let loaded = get_call(&conn, call.id).unwrap().unwrap();
    assert_eq!(loaded.number, "+919876543210");
    assert_eq!(loaded.direction, CallDirection::Outgoing);
    assert_eq!(loaded.start, call.start);
    assert_eq!(loaded.end, call.end);
    assert_eq!(loaded.duration_ms, 1000);
    assert_eq!(loaded.audio_base64.as_deref(), Some("AAEC"));

    assert!(get_call(&conn, 42).unwrap().is_none());
}

#[test]
fn test_missed_call_keeps_null_audio() {
    let conn = setup_test_db().unwrap();
    let call = create_test_call(5000, "+911234567890", CallDirection::Missed);
    insert_call(&conn, &call).unwrap();

    let loaded = get_call(&conn, 5000).unwrap().unwrap();
    assert!(loaded.audio_base64.is_none());
    assert!(loaded.mime.is_none());
}

#[test]
fn test_duplicate_id_is_rejected() {
    let conn = setup_test_db().unwrap();
    let call = create_test_call(7000, "+911234567890", CallDirection::Missed);
    insert_call(&conn, &call).unwrap();
    assert!(insert_call(&conn, &call).is_err());
}

#[test]
fn test_recent_calls_are_most_recent_first() {
    let conn = setup_test_db().unwrap();

    // Insertion order decides recency, not the id value.
    insert_call(&conn, &create_test_call(3000, "1111111", CallDirection::Outgoing)).unwrap();
    insert_call(&conn, &create_test_call(1000, "2222222", CallDirection::Incoming)).unwrap();
    insert_call(&conn, &create_test_call(2000, "3333333", CallDirection::Missed)).unwrap();

    let calls = get_recent_calls(&conn, None).unwrap();
    let numbers: Vec<&str> = calls.iter().map(|c| c.number.as_str()).collect();
    assert_eq!(numbers, vec!["3333333", "2222222", "1111111"]);

    let limited = get_recent_calls(&conn, Some(2)).unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].number, "3333333");
}

#[test]
fn test_last_call_id() {
    let conn = setup_test_db().unwrap();
    assert_eq!(last_call_id(&conn).unwrap(), None);

    insert_call(&conn, &create_test_call(9000, "1111111", CallDirection::Outgoing)).unwrap();
    insert_call(&conn, &create_test_call(4000, "1111111", CallDirection::Outgoing)).unwrap();
    assert_eq!(last_call_id(&conn).unwrap(), Some(9000));
}

#[test]
fn test_count_calls() {
    let conn = setup_test_db().unwrap();

    // Initially empty
    assert_eq!(count_calls(&conn).unwrap(), 0);

    insert_call(&conn, &create_test_call(1, "1111111", CallDirection::Outgoing)).unwrap();
    assert_eq!(count_calls(&conn).unwrap(), 1);

    insert_call(&conn, &create_test_call(2, "1111111", CallDirection::Missed)).unwrap();
    assert_eq!(count_calls(&conn).unwrap(), 2);
}

#[test]
fn test_prune_old_calls() {
    let conn = setup_test_db().unwrap();

    for i in 1..=15 {
        let number = format!("+9100000000{:02}", i);
        let call = create_test_call(i * 10, &number, CallDirection::Outgoing);
        insert_call(&conn, &call).unwrap();
    }

    assert_eq!(count_calls(&conn).unwrap(), 15);

    // Prune to keep only 10
    let pruned = prune_old_calls(&conn, 10).unwrap();
    assert_eq!(pruned, 5);
    assert_eq!(count_calls(&conn).unwrap(), 10);

    // The oldest five are gone
    assert!(get_call(&conn, 50).unwrap().is_none());
    assert!(get_call(&conn, 60).unwrap().is_some());

    // Pruning again should do nothing
    let pruned_again = prune_old_calls(&conn, 10).unwrap();
    assert_eq!(pruned_again, 0);
}

#[test]
fn test_search_calls_by_number_and_direction() {
    let conn = setup_test_db().unwrap();

    insert_call(&conn, &create_test_call(1, "+919876543210", CallDirection::Outgoing)).unwrap();
    insert_call(&conn, &create_test_call(2, "+911234567890", CallDirection::Missed)).unwrap();
    insert_call(&conn, &create_test_call(3, "+919876500000", CallDirection::Incoming)).unwrap();

    let results = search_calls(&conn, Some("98765"), None, None).unwrap();
    assert_eq!(results.len(), 2);

    let results = search_calls(&conn, None, Some(CallDirection::Missed), None).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].number, "+911234567890");

    let results =
        search_calls(&conn, Some("98765"), Some(CallDirection::Incoming), Some(10)).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, 3);
}

#[test]
fn test_search_treats_wildcards_literally() {
    let conn = setup_test_db().unwrap();

    insert_call(&conn, &create_test_call(1, "+919876543210", CallDirection::Outgoing)).unwrap();
    insert_call(&conn, &create_test_call(2, "+911234567890", CallDirection::Missed)).unwrap();

    assert!(search_calls(&conn, Some("%"), None, None).unwrap().is_empty());
    assert!(search_calls(&conn, Some("_"), None, None).unwrap().is_empty());
    assert!(search_calls(&conn, Some("98_6"), None, None).unwrap().is_empty());

    let results = search_calls(&conn, Some("+9198"), None, None).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, 1);
}

#[test]
fn test_unknown_direction_is_a_conversion_error() {
    let conn = setup_test_db().unwrap();
    conn.execute(
        "INSERT INTO calls (id, number, direction, start_ms, end_ms, duration_ms)
         VALUES (7, '+919876543210', 'sideways', 0, 0, 0)",
        [],
    )
    .unwrap();

    let err = get_call(&conn, 7).unwrap_err();
    let sql_err = err.downcast_ref::<rusqlite::Error>().unwrap();
    assert!(matches!(
        sql_err,
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, _)
    ));
    assert!(sql_err.to_string().contains("unknown call direction"));
}
