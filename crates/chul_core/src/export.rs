//! Denormalized facility export snapshot.
//!
//! # Responsibility
//! - Rebuild `facilities_excel_export` from `facilities_excel_export_source`.
//! - Read the snapshot for bulk spreadsheet export.
//!
//! # Invariants
//! - The snapshot changes only through [`refresh_export_view`]; nothing
//!   refreshes it implicitly on facility writes.
//! - A refresh swaps the whole snapshot in one transaction, so readers never
//!   see a half-built export.

use crate::db::DbResult;
use log::info;
use rusqlite::{Connection, Row, Transaction, TransactionBehavior};
use std::time::Instant;

/// One facility row of the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacilityExportRow {
    pub id: String,
    pub name: String,
    pub code: Option<i64>,
    pub registration_number: Option<String>,
    pub beds: i64,
    pub cots: i64,
    pub ward_name: Option<String>,
    pub county: Option<String>,
    pub constituency: Option<String>,
    pub facility_type_name: Option<String>,
    pub keph_level: Option<String>,
    pub owner_name: Option<String>,
    pub regulatory_body_name: Option<String>,
    pub operation_status: Option<String>,
}

/// Replaces the export snapshot with the current source view and returns the
/// number of rows written.
pub fn refresh_export_view(conn: &Connection) -> DbResult<usize> {
    let started_at = Instant::now();
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    tx.execute("DELETE FROM facilities_excel_export;", [])?;
    let rows = tx.execute(
        "INSERT INTO facilities_excel_export SELECT * FROM facilities_excel_export_source;",
        [],
    )?;
    tx.commit()?;

    info!(
        "event=export_refresh module=export status=ok rows={} duration_ms={}",
        rows,
        started_at.elapsed().as_millis()
    );
    Ok(rows)
}

/// Reads the export snapshot ordered by facility name.
pub fn list_export_rows(conn: &Connection) -> DbResult<Vec<FacilityExportRow>> {
    let mut stmt = conn.prepare(
        "SELECT
            id,
            name,
            code,
            registration_number,
            beds,
            cots,
            ward_name,
            county,
            constituency,
            facility_type_name,
            keph_level,
            owner_name,
            regulatory_body_name,
            operation_status
         FROM facilities_excel_export
         ORDER BY name ASC, id ASC;",
    )?;
    let rows = stmt
        .query_map([], parse_export_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn parse_export_row(row: &Row<'_>) -> rusqlite::Result<FacilityExportRow> {
    Ok(FacilityExportRow {
        id: row.get("id")?,
        name: row.get("name")?,
        code: row.get("code")?,
        registration_number: row.get("registration_number")?,
        beds: row.get("beds")?,
        cots: row.get("cots")?,
        ward_name: row.get("ward_name")?,
        county: row.get("county")?,
        constituency: row.get("constituency")?,
        facility_type_name: row.get("facility_type_name")?,
        keph_level: row.get("keph_level")?,
        owner_name: row.get("owner_name")?,
        regulatory_body_name: row.get("regulatory_body_name")?,
        operation_status: row.get("operation_status")?,
    })
}
