//! Named monotonic counters backing sequential entity codes.
//!
//! # Invariants
//! - Allocation is claim-on-commit: callers claim inside the same IMMEDIATE
//!   transaction as the insert that uses the value, so a rolled-back insert
//!   never consumes a code.
//! - Counters never move backwards.

use super::RepoResult;
use rusqlite::{Connection, OptionalExtension};

/// Sequence that numbers community health unit codes.
pub const COMMUNITY_HEALTH_UNIT_SEQUENCE: &str = "community_health_unit";

/// Claims the next value of `name`, starting at 1.
pub(crate) fn claim_next(conn: &Connection, name: &str) -> RepoResult<i64> {
    let value = conn.query_row(
        "INSERT INTO sequences (name, last_value) VALUES (?1, 1)
         ON CONFLICT(name) DO UPDATE SET last_value = last_value + 1
         RETURNING last_value;",
        [name],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(value)
}

/// Raises `name` to at least `value` so later claims skip an explicit code.
pub(crate) fn observe(conn: &Connection, name: &str, value: i64) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO sequences (name, last_value) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET last_value = MAX(last_value, excluded.last_value);",
        rusqlite::params![name, value],
    )?;
    Ok(())
}

/// Returns the last claimed value, or `None` if nothing was claimed yet.
pub fn current_value(conn: &Connection, name: &str) -> RepoResult<Option<i64>> {
    let value = conn
        .query_row(
            "SELECT last_value FROM sequences WHERE name = ?1;",
            [name],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(value)
}
