use chul_core::{
    list_export_rows, open_db_in_memory, refresh_export_view, run_bootstrap, BootstrapConfig,
    Facility, RegistryRepository, SqliteRegistryRepository,
};
use rusqlite::Connection;
use std::fs;
use uuid::Uuid;

fn county_and_ward(conn: &Connection) -> Uuid {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("geo.json"),
        r#"{"model": "common.County", "unique_fields": ["code"], "records": [{"name": "KWALE", "code": 2}]}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("geo_constituency.json"),
        r#"{"model": "common.Constituency", "unique_fields": ["code"], "records": [{"name": "MSAMBWENI", "code": 5, "county": {"code": 2}}]}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("geo_ward.json"),
        r#"{"model": "common.Ward", "unique_fields": ["code"], "records": [{"name": "GOMBATO BONGWE", "code": 1001, "constituency": {"code": 5}}]}"#,
    )
    .unwrap();
    run_bootstrap(
        conn,
        &BootstrapConfig::new(dir.path()).with_files([
            "geo.json",
            "geo_constituency.json",
            "geo_ward.json",
        ]),
    )
    .unwrap();

    let ward_id: String = conn
        .query_row("SELECT id FROM wards WHERE code = 1001;", [], |row| {
            row.get(0)
        })
        .unwrap();
    Uuid::parse_str(&ward_id).unwrap()
}

#[test]
fn snapshot_changes_only_on_refresh() {
    let conn = open_db_in_memory().unwrap();
    let ward_id = county_and_ward(&conn);
    let registry = SqliteRegistryRepository::new(&conn);

    let mut facility = Facility::new("Msambweni County Referral");
    facility.code = Some(11_620);
    facility.number_of_beds = 120;
    facility.number_of_cots = 10;
    facility.ward_id = Some(ward_id);
    registry.create_facility(&facility).unwrap();

    assert!(list_export_rows(&conn).unwrap().is_empty());

    let refreshed = refresh_export_view(&conn).unwrap();
    assert_eq!(refreshed, 1);

    let rows = list_export_rows(&conn).unwrap();
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.id, facility.id.to_string());
    assert_eq!(row.code, Some(11_620));
    assert_eq!(row.beds, 120);
    assert_eq!(row.cots, 10);
    assert_eq!(row.ward_name.as_deref(), Some("GOMBATO BONGWE"));
    assert_eq!(row.constituency.as_deref(), Some("MSAMBWENI"));
    assert_eq!(row.county.as_deref(), Some("KWALE"));
    assert!(row.owner_name.is_none());
}

#[test]
fn refresh_replaces_previous_snapshot() {
    let conn = open_db_in_memory().unwrap();
    let registry = SqliteRegistryRepository::new(&conn);

    registry.create_facility(&Facility::new("Zeta Dispensary")).unwrap();
    registry.create_facility(&Facility::new("Alpha Clinic")).unwrap();
    assert_eq!(refresh_export_view(&conn).unwrap(), 2);
    assert_eq!(refresh_export_view(&conn).unwrap(), 2);

    let names = list_export_rows(&conn)
        .unwrap()
        .into_iter()
        .map(|row| row.name)
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Alpha Clinic", "Zeta Dispensary"]);

    conn.execute(
        "UPDATE facilities SET deleted_at = 1 WHERE name = 'Zeta Dispensary';",
        [],
    )
    .unwrap();
    assert_eq!(list_export_rows(&conn).unwrap().len(), 2);
    assert_eq!(refresh_export_view(&conn).unwrap(), 1);
    assert_eq!(list_export_rows(&conn).unwrap().len(), 1);
}
