use anyhow::{Context, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, Row};

use crate::call::{CallDirection, StoredCallRecord};

const CALL_COLUMNS: &str =
    "id, number, direction, start_ms, end_ms, duration_ms, audio_base64, mime";

fn call_from_row(row: &Row<'_>) -> rusqlite::Result<StoredCallRecord> {
    let raw: String = row.get(2)?;
    let direction = CallDirection::parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            Type::Text,
            format!("unknown call direction {raw:?}").into(),
        )
    })?;

    Ok(StoredCallRecord {
        id: row.get(0)?,
        number: row.get(1)?,
        direction,
        start: row.get(3)?,
        end: row.get(4)?,
        duration_ms: row.get(5)?,
        audio_base64: row.get(6)?,
        mime: row.get(7)?,
    })
}

pub fn insert_call(conn: &Connection, call: &StoredCallRecord) -> Result<i64> {
    conn.execute(
        "INSERT INTO calls (id, number, direction, start_ms, end_ms, duration_ms, audio_base64, mime)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            call.id,
            call.number,
            call.direction.as_str(),
            call.start,
            call.end,
            call.duration_ms,
            call.audio_base64,
            call.mime,
        ],
    )
    .context("Failed to insert call")?;

    Ok(conn.last_insert_rowid())
}

/// Most recent first. `limit` of `None` returns every call.
pub fn get_recent_calls(conn: &Connection, limit: Option<usize>) -> Result<Vec<StoredCallRecord>> {
    search_calls(conn, None, None, limit)
}

pub fn get_call(conn: &Connection, id: i64) -> Result<Option<StoredCallRecord>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {CALL_COLUMNS} FROM calls WHERE id = ?1"))
        .context("Failed to prepare call query")?;

    let mut rows = stmt
        .query_map(params![id], call_from_row)
        .context("Failed to query call")?;

    match rows.next() {
        Some(Ok(call)) => Ok(Some(call)),
        Some(Err(e)) => Err(e.into()),
        None => Ok(None),
    }
}

pub fn last_call_id(conn: &Connection) -> Result<Option<i64>> {
    let id: Option<i64> = conn
        .query_row("SELECT MAX(id) FROM calls", [], |row| row.get(0))
        .context("Failed to read last call id")?;

    Ok(id)
}

pub fn count_calls(conn: &Connection) -> Result<i64> {
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM calls", [], |row| row.get(0))
        .context("Failed to count calls")?;

    Ok(count)
}

pub fn prune_old_calls(conn: &Connection, max_count: i64) -> Result<usize> {
    let count = count_calls(conn)?;

    if count <= max_count {
        return Ok(0);
    }

    let to_delete = count - max_count;

    let deleted = conn
        .execute(
            "DELETE FROM calls WHERE seq IN (
                SELECT seq FROM calls ORDER BY seq ASC LIMIT ?1
            )",
            [to_delete],
        )
        .context("Failed to prune old calls")?;

    Ok(deleted)
}

pub fn search_calls(
    conn: &Connection,
    number: Option<&str>,
    direction: Option<CallDirection>,
    limit: Option<usize>,
) -> Result<Vec<StoredCallRecord>> {
    let mut sql = format!("SELECT {CALL_COLUMNS} FROM calls WHERE 1=1");
    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(n) = number {
        sql.push_str(" AND number LIKE ? ESCAPE '\\'");
        params.push(Box::new(format!("%{}%", escape_like(n))));
    }

    if let Some(d) = direction {
        sql.push_str(" AND direction = ?");
        params.push(Box::new(d.as_str().to_string()));
    }

    sql.push_str(" ORDER BY seq DESC");
    if let Some(limit) = limit {
        sql.push_str(" LIMIT ?");
        params.push(Box::new(limit as i64));
    }

    let mut stmt = conn
        .prepare(&sql)
        .context("Failed to prepare search query")?;

    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let calls = stmt
        .query_map(param_refs.as_slice(), call_from_row)
        .context("Failed to execute search query")?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to map search results")?;

    Ok(calls)
}

/// Match `%`, `_` and `\` literally inside a LIKE pattern.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
