use chul_core::model::registry::{Contact, ContactType};
use chul_core::repo::revision::{list_revisions, RevisionAction, ENTITY_HEALTH_UNIT};
use chul_core::repo::sequence::{current_value, COMMUNITY_HEALTH_UNIT_SEQUENCE};
use chul_core::{
    open_db_in_memory, CatalogRepository, ChuRating, CommunityHealthUnit, Facility,
    HealthUnitListQuery, HealthUnitRepository, HealthUnitService, RatingRepository,
    RegistryRepository, RepoError, SqliteCatalogRepository, SqliteHealthUnitRepository,
    SqliteRatingRepository, SqliteRegistryRepository, Status, ValidationError,
};
use rusqlite::Connection;
use uuid::Uuid;

struct Fixture {
    facility: Facility,
    status: Status,
}

fn seed(conn: &Connection) -> Fixture {
    let facility = Facility::new("Kibera Health Centre");
    SqliteRegistryRepository::new(conn)
        .create_facility(&facility)
        .unwrap();
    let status = Status::new("fully-functional");
    SqliteCatalogRepository::new(conn)
        .create_status(&status)
        .unwrap();
    Fixture { facility, status }
}

fn service(conn: &Connection) -> HealthUnitService<SqliteHealthUnitRepository<'_>> {
    HealthUnitService::new(SqliteHealthUnitRepository::new(conn))
}

fn new_unit(fixture: &Fixture, name: &str) -> CommunityHealthUnit {
    CommunityHealthUnit::new(name, fixture.facility.id, fixture.status.id)
}

#[test]
fn first_save_assigns_sequential_codes() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = service(&conn);

    let mut first = new_unit(&fixture, "Kibera East");
    let mut second = new_unit(&fixture, "Kibera West");
    service.save(&mut first).unwrap();
    service.save(&mut second).unwrap();

    assert_eq!(first.code, Some(1));
    assert_eq!(second.code, Some(2));
    assert_eq!(
        current_value(&conn, COMMUNITY_HEALTH_UNIT_SEQUENCE).unwrap(),
        Some(2)
    );
}

#[test]
fn code_never_changes_on_later_saves() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = service(&conn);

    let mut unit = new_unit(&fixture, "Kibera East");
    service.save(&mut unit).unwrap();
    let code = unit.code;

    unit.name = "Kibera East Renamed".to_string();
    service.save(&mut unit).unwrap();
    let loaded = service.get(unit.id).unwrap().unwrap();
    assert_eq!(loaded.code, code);
    assert_eq!(loaded.name, "Kibera East Renamed");

    unit.code = None;
    service.save(&mut unit).unwrap();
    assert_eq!(unit.code, code);

    unit.code = Some(999);
    let err = service.save(&mut unit).unwrap_err();
    assert_eq!(err.validation_field(), Some("code"));
    assert_eq!(service.get(unit.id).unwrap().unwrap().code, code);
}

#[test]
fn explicit_code_is_kept_and_raises_the_sequence() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = service(&conn);

    let mut imported = new_unit(&fixture, "Imported");
    imported.code = Some(100);
    service.save(&mut imported).unwrap();

    let mut next = new_unit(&fixture, "Next");
    service.save(&mut next).unwrap();

    assert_eq!(imported.code, Some(100));
    assert_eq!(next.code, Some(101));
}

#[test]
fn failed_insert_does_not_consume_a_code() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = service(&conn);

    let mut orphan = CommunityHealthUnit::new("Orphan", fixture.facility.id, Uuid::new_v4());
    let err = service.save(&mut orphan).unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));
    assert_eq!(
        current_value(&conn, COMMUNITY_HEALTH_UNIT_SEQUENCE).unwrap(),
        None
    );

    let mut unit = new_unit(&fixture, "Kibera East");
    service.save(&mut unit).unwrap();
    assert_eq!(unit.code, Some(1));
}

#[test]
fn closed_facility_rejects_save() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    SqliteRegistryRepository::new(&conn)
        .set_facility_closed(fixture.facility.id, true)
        .unwrap();
    let facility = SqliteRegistryRepository::new(&conn)
        .get_facility(fixture.facility.id)
        .unwrap()
        .unwrap();
    assert!(facility.closed);
    assert!(facility.audit.updated_at >= facility.audit.created_at);
    let service = service(&conn);

    let mut unit = new_unit(&fixture, "Kibera East");
    let err = service.save(&mut unit).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::FacilityClosed)
    ));
    assert_eq!(err.validation_field(), Some("facility"));
    assert!(service
        .list(&HealthUnitListQuery::default())
        .unwrap()
        .is_empty());
}

#[test]
fn approve_and_reject_are_mutually_exclusive() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = service(&conn);

    let mut unit = new_unit(&fixture, "Kibera East");
    service.save(&mut unit).unwrap();

    let approved = service
        .approve(unit.id, Some("meets criteria".to_string()))
        .unwrap();
    assert!(approved.is_approved);
    assert!(approved.approval_date.is_some());

    let err = service.reject(unit.id, Some("late".to_string())).unwrap_err();
    assert_eq!(err.validation_field(), Some("approve/reject"));

    let loaded = service.get(unit.id).unwrap().unwrap();
    assert!(loaded.is_approved);
    assert!(!loaded.is_rejected);

    let mut direct = new_unit(&fixture, "Both flags");
    direct.is_approved = true;
    direct.is_rejected = true;
    let err = service.save(&mut direct).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::ApprovedAndRejected)
    ));
}

#[test]
fn list_filters_by_approval_and_hides_rejected() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = service(&conn);

    let mut pending = new_unit(&fixture, "Pending");
    let mut approved = new_unit(&fixture, "Approved");
    let mut rejected = new_unit(&fixture, "Rejected");
    for unit in [&mut pending, &mut approved, &mut rejected] {
        service.save(unit).unwrap();
    }
    service.approve(approved.id, None).unwrap();
    service.reject(rejected.id, None).unwrap();

    let visible = service.list(&HealthUnitListQuery::default()).unwrap();
    let names = visible.iter().map(|unit| unit.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["Pending", "Approved"]);

    let only_approved = service
        .list(&HealthUnitListQuery {
            approved: Some(true),
            ..HealthUnitListQuery::default()
        })
        .unwrap();
    assert_eq!(only_approved.len(), 1);
    assert_eq!(only_approved[0].id, approved.id);

    let everything = service
        .list(&HealthUnitListQuery {
            include_rejected: true,
            ..HealthUnitListQuery::default()
        })
        .unwrap();
    assert_eq!(everything.len(), 3);
}

#[test]
fn average_rating_is_mean_or_zero() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = service(&conn);
    let ratings = SqliteRatingRepository::new(&conn);

    let mut unit = new_unit(&fixture, "Kibera East");
    service.save(&mut unit).unwrap();
    assert_eq!(service.average_rating(unit.id).unwrap(), 0.0);

    ratings.create_rating(&ChuRating::new(unit.id, 3)).unwrap();
    ratings.create_rating(&ChuRating::new(unit.id, 5)).unwrap();
    assert_eq!(service.average_rating(unit.id).unwrap(), 4.0);
}

#[test]
fn contacts_view_joins_contact_and_type() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let registry = SqliteRegistryRepository::new(&conn);
    let repo = SqliteHealthUnitRepository::new(&conn);
    let service = service(&conn);

    let mut unit = new_unit(&fixture, "Kibera East");
    service.save(&mut unit).unwrap();

    let mobile = ContactType::new("MOBILE");
    registry.create_contact_type(&mobile).unwrap();
    let contact = Contact::new(mobile.id, "0712345678");
    registry.create_contact(&contact).unwrap();

    let link_id = repo.link_contact(unit.id, contact.id).unwrap();

    let contacts = service.contacts(unit.id).unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].id, link_id);
    assert_eq!(contacts[0].contact_id, contact.id);
    assert_eq!(contacts[0].contact, "0712345678");
    assert_eq!(contacts[0].contact_type, mobile.id);
    assert_eq!(contacts[0].contact_type_name, "MOBILE");
}

#[test]
fn soft_delete_hides_unit_and_keeps_history() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = service(&conn);

    let mut unit = new_unit(&fixture, "Kibera East");
    service.save(&mut unit).unwrap();
    service.approve(unit.id, None).unwrap();
    service.soft_delete(unit.id).unwrap();
    service.soft_delete(unit.id).unwrap();

    assert!(service.get(unit.id).unwrap().is_none());
    assert!(service
        .list(&HealthUnitListQuery::default())
        .unwrap()
        .is_empty());
    let err = service.average_rating(unit.id).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));

    let revisions = list_revisions(&conn, ENTITY_HEALTH_UNIT, unit.id).unwrap();
    let actions = revisions
        .iter()
        .map(|revision| revision.action)
        .collect::<Vec<_>>();
    assert_eq!(
        actions,
        vec![
            RevisionAction::Create,
            RevisionAction::Update,
            RevisionAction::Delete
        ]
    );
    assert_eq!(
        revisions.iter().map(|r| r.version).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(revisions[0].snapshot["code"], 1);
    assert_eq!(revisions[1].snapshot["is_approved"], true);
}

#[test]
fn close_records_comment_and_blank_name_fails() {
    let conn = open_db_in_memory().unwrap();
    let fixture = seed(&conn);
    let service = service(&conn);

    let mut unit = new_unit(&fixture, "Kibera East");
    service.save(&mut unit).unwrap();
    let closed = service
        .close(unit.id, Some("merged into Kibera West".to_string()))
        .unwrap();
    assert!(closed.is_closed);
    assert!(!closed.is_pending());
    assert_eq!(
        service.get(unit.id).unwrap().unwrap().closing_comment.as_deref(),
        Some("merged into Kibera West")
    );

    let mut blank = new_unit(&fixture, "   ");
    let err = service.save(&mut blank).unwrap_err();
    assert_eq!(err.validation_field(), Some("name"));
}
