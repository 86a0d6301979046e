use chul_core::model::registry::{Contact, ContactType};
use chul_core::repo::revision::{list_revisions, RevisionAction, ENTITY_WORKER};
use chul_core::{
    open_db_in_memory, CatalogRepository, ChuRating, CommunityHealthUnit, CommunityHealthWorker,
    Facility, HealthUnitRepository, RatingRepository, RegistryRepository, RepoError,
    SqliteCatalogRepository, SqliteHealthUnitRepository, SqliteRatingRepository,
    SqliteRegistryRepository, SqliteWorkerRepository, Status, ValidationError, WorkerRepository,
};
use rusqlite::Connection;

fn seed_unit(conn: &Connection) -> CommunityHealthUnit {
    let facility = Facility::new("Mathare North HC");
    SqliteRegistryRepository::new(conn)
        .create_facility(&facility)
        .unwrap();
    let status = Status::new("semi-functional");
    SqliteCatalogRepository::new(conn)
        .create_status(&status)
        .unwrap();

    let mut unit = CommunityHealthUnit::new("Mathare 4A", facility.id, status.id);
    SqliteHealthUnitRepository::new(conn)
        .create_unit(&mut unit)
        .unwrap();
    unit
}

#[test]
fn rating_bounds_are_inclusive() {
    let conn = open_db_in_memory().unwrap();
    let unit = seed_unit(&conn);
    let repo = SqliteRatingRepository::new(&conn);

    let err = repo.create_rating(&ChuRating::new(unit.id, 6)).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::RatingOutOfRange(6))
    ));
    assert_eq!(err.validation_field(), Some("rating"));

    repo.create_rating(&ChuRating::new(unit.id, 0)).unwrap();
    repo.create_rating(&ChuRating::new(unit.id, 5)).unwrap();

    let stored = repo
        .list_ratings(unit.id)
        .unwrap()
        .into_iter()
        .map(|rating| rating.rating)
        .collect::<Vec<_>>();
    assert_eq!(stored, vec![0, 5]);
}

#[test]
fn rating_requires_live_unit() {
    let conn = open_db_in_memory().unwrap();
    let unit = seed_unit(&conn);
    SqliteHealthUnitRepository::new(&conn)
        .soft_delete_unit(unit.id)
        .unwrap();

    let err = SqliteRatingRepository::new(&conn)
        .create_rating(&ChuRating::new(unit.id, 4))
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound { .. }));
}

#[test]
fn workers_list_in_charge_first() {
    let conn = open_db_in_memory().unwrap();
    let unit = seed_unit(&conn);
    let repo = SqliteWorkerRepository::new(&conn);

    let assistant = CommunityHealthWorker::new(unit.id, "Amina");
    let mut lead = CommunityHealthWorker::new(unit.id, "Wanjiru");
    lead.is_incharge = true;
    repo.create_worker(&assistant).unwrap();
    repo.create_worker(&lead).unwrap();

    let workers = repo.list_workers(unit.id).unwrap();
    assert_eq!(workers.len(), 2);
    assert_eq!(workers[0].id, lead.id);
    assert_eq!(workers[1].id, assistant.id);
}

#[test]
fn worker_id_number_is_unique_within_unit() {
    let conn = open_db_in_memory().unwrap();
    let unit = seed_unit(&conn);
    let repo = SqliteWorkerRepository::new(&conn);

    let mut first = CommunityHealthWorker::new(unit.id, "Otieno");
    first.id_number = Some(12_345_678);
    repo.create_worker(&first).unwrap();

    let mut duplicate = CommunityHealthWorker::new(unit.id, "Odhiambo");
    duplicate.id_number = Some(12_345_678);
    let err = repo.create_worker(&duplicate).unwrap_err();
    assert!(matches!(err, RepoError::Conflict(_)));
}

#[test]
fn blank_worker_name_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let unit = seed_unit(&conn);

    let err = SqliteWorkerRepository::new(&conn)
        .create_worker(&CommunityHealthWorker::new(unit.id, "  "))
        .unwrap_err();
    assert_eq!(err.validation_field(), Some("first_name"));
}

#[test]
fn worker_update_and_soft_delete() {
    let conn = open_db_in_memory().unwrap();
    let unit = seed_unit(&conn);
    let repo = SqliteWorkerRepository::new(&conn);

    let mut worker = CommunityHealthWorker::new(unit.id, "Kamau");
    repo.create_worker(&worker).unwrap();

    worker.last_name = Some("Njoroge".to_string());
    repo.update_worker(&worker).unwrap();
    let loaded = repo.get_worker(worker.id, false).unwrap().unwrap();
    assert_eq!(loaded.name(), "Kamau Njoroge");

    repo.soft_delete_worker(worker.id).unwrap();
    assert!(repo.get_worker(worker.id, false).unwrap().is_none());
    assert!(repo.get_worker(worker.id, true).unwrap().is_some());
    assert!(repo.list_workers(unit.id).unwrap().is_empty());
}

#[test]
fn worker_contacts_use_unit_contact_projection() {
    let conn = open_db_in_memory().unwrap();
    let unit = seed_unit(&conn);
    let registry = SqliteRegistryRepository::new(&conn);
    let repo = SqliteWorkerRepository::new(&conn);

    let worker = CommunityHealthWorker::new(unit.id, "Achieng");
    repo.create_worker(&worker).unwrap();

    let email = ContactType::new("EMAIL");
    registry.create_contact_type(&email).unwrap();
    let contact = Contact::new(email.id, "achieng@example.org");
    registry.create_contact(&contact).unwrap();
    repo.link_contact(worker.id, contact.id).unwrap();

    let contacts = repo.list_contacts(worker.id).unwrap();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].contact, "achieng@example.org");
    assert_eq!(contacts[0].contact_type_name, "EMAIL");
}

#[test]
fn immediate_worker_update_never_predates_insert() {
    let conn = open_db_in_memory().unwrap();
    let unit = seed_unit(&conn);
    let repo = SqliteWorkerRepository::new(&conn);

    for index in 0..20 {
        let mut worker = CommunityHealthWorker::new(unit.id, format!("Worker {index}"));
        repo.create_worker(&worker).unwrap();
        worker.last_name = Some("Otieno".to_string());
        repo.update_worker(&worker).unwrap();

        let loaded = repo.get_worker(worker.id, false).unwrap().unwrap();
        assert_eq!(loaded.audit.created_at, worker.audit.created_at);
        assert!(
            loaded.audit.updated_at >= loaded.audit.created_at,
            "updated_at {} predates created_at {}",
            loaded.audit.updated_at,
            loaded.audit.created_at
        );

        let revisions = list_revisions(&conn, ENTITY_WORKER, worker.id).unwrap();
        let update = revisions.last().unwrap();
        assert_eq!(update.action, RevisionAction::Update);
        assert_eq!(update.snapshot["audit"]["updated_at"], loaded.audit.updated_at);
    }
}

#[test]
fn contact_type_requires_name() {
    let conn = open_db_in_memory().unwrap();
    let registry = SqliteRegistryRepository::new(&conn);

    let err = registry
        .create_contact_type(&ContactType::new("  "))
        .unwrap_err();
    assert_eq!(err.validation_field(), Some("name"));
    assert!(registry.find_contact_type("  ").unwrap().is_none());
}
