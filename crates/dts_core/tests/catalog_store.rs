use chrono::{NaiveDate, TimeZone, Utc};
use dts_core::db::open_db_in_memory;
use dts_core::{
    CatalogService, CreateDocumentRequest, DocumentService, FixedClock, ReferenceIssue,
    ServiceError, SqliteCatalogRepository, SqliteDocumentRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

fn catalog(conn: &Connection) -> CatalogService<SqliteCatalogRepository<'_>> {
    CatalogService::new(SqliteCatalogRepository::try_new(conn).unwrap())
}

fn template_count(conn: &Connection, document_type_id: Uuid) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM checkpoint_templates WHERE document_type_id = ?1;",
        [document_type_id.to_string()],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn document_type_names_are_unique_after_trim() {
    let conn = open_db_in_memory().unwrap();
    let service = catalog(&conn);

    let invoice = service.create_document_type("Invoice", "", None).unwrap();
    assert_eq!(invoice.name, "Invoice");
    assert!(invoice.is_active);

    let err = service
        .create_document_type("  Invoice ", "again", None)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::DuplicateName { entity: "document type", ref name } if name == "Invoice"
    ));
}

#[test]
fn blank_names_are_rejected_before_storage() {
    let conn = open_db_in_memory().unwrap();
    let service = catalog(&conn);

    assert!(matches!(
        service.create_route("   ", ""),
        Err(ServiceError::Validation(_))
    ));
    assert!(matches!(
        service.create_document_type("", "", None),
        Err(ServiceError::Validation(_))
    ));
}

#[test]
fn templates_list_in_sequence_order_and_reject_duplicate_positions() {
    let conn = open_db_in_memory().unwrap();
    let service = catalog(&conn);
    let invoice = service.create_document_type("Invoice", "", None).unwrap();

    service
        .add_checkpoint_template(invoice.id, "Approve", 2, "")
        .unwrap();
    service
        .add_checkpoint_template(invoice.id, "Review", 1, "")
        .unwrap();

    let err = service
        .add_checkpoint_template(invoice.id, "Archive", 2, "")
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::DuplicateSequence { document_type_id, sequence_order: 2 }
            if document_type_id == invoice.id
    ));

    let names: Vec<_> = service
        .list_checkpoint_templates(invoice.id)
        .unwrap()
        .into_iter()
        .map(|template| (template.sequence_order, template.name))
        .collect();
    assert_eq!(
        names,
        vec![(1, "Review".to_string()), (2, "Approve".to_string())]
    );
}

#[test]
fn non_positive_sequence_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = catalog(&conn);
    let invoice = service.create_document_type("Invoice", "", None).unwrap();

    assert!(matches!(
        service.add_checkpoint_template(invoice.id, "Review", 0, ""),
        Err(ServiceError::Validation(_))
    ));
}

#[test]
fn template_for_missing_type_is_a_reference_error() {
    let conn = open_db_in_memory().unwrap();
    let service = catalog(&conn);
    let missing = Uuid::new_v4();

    let err = service
        .add_checkpoint_template(missing, "Review", 1, "")
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Reference { issue: ReferenceIssue::Missing, id, .. } if id == missing
    ));
}

#[test]
fn listings_are_name_ordered_and_hide_inactive_by_default() {
    let conn = open_db_in_memory().unwrap();
    let service = catalog(&conn);

    let north = service.create_route("North", "").unwrap();
    service.create_route("East", "").unwrap();
    service.create_route("South", "").unwrap();
    service.set_route_active(north.id, false).unwrap();

    let active: Vec<_> = service
        .list_routes(false)
        .unwrap()
        .into_iter()
        .map(|route| route.name)
        .collect();
    assert_eq!(active, vec!["East", "South"]);

    let all: Vec<_> = service
        .list_routes(true)
        .unwrap()
        .into_iter()
        .map(|route| route.name)
        .collect();
    assert_eq!(all, vec!["East", "North", "South"]);
}

#[test]
fn deleting_unreferenced_type_cascades_templates() {
    let conn = open_db_in_memory().unwrap();
    let service = catalog(&conn);
    let memo = service.create_document_type("Memo", "", None).unwrap();
    service.add_checkpoint_template(memo.id, "Sign", 1, "").unwrap();
    service.add_checkpoint_template(memo.id, "File", 2, "").unwrap();
    assert_eq!(template_count(&conn, memo.id), 2);

    service.delete_document_type(memo.id).unwrap();

    assert!(service.get_document_type(memo.id).unwrap().is_none());
    assert_eq!(template_count(&conn, memo.id), 0);
}

#[test]
fn referenced_route_and_type_are_protected() {
    let conn = open_db_in_memory().unwrap();
    let service = catalog(&conn);
    let invoice = service.create_document_type("Invoice", "", None).unwrap();
    let route = service.create_route("Main", "").unwrap();

    let documents = DocumentService::with_clock(
        SqliteDocumentRepository::try_new(&conn).unwrap(),
        FixedClock::on(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
    );
    documents
        .create_document(&CreateDocumentRequest::new(
            invoice.id,
            route.id,
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
        ))
        .unwrap();

    let err = service.delete_route(route.id).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::ProtectedReference { entity: "route", referencing_documents: 1, .. }
    ));
    let err = service.delete_document_type(invoice.id).unwrap_err();
    assert!(matches!(err, ServiceError::ProtectedReference { .. }));

    assert!(service.get_route(route.id).unwrap().is_some());
    assert!(service.get_document_type(invoice.id).unwrap().is_some());
}

#[test]
fn missing_catalog_entities_report_typed_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = catalog(&conn);
    let missing = Uuid::new_v4();

    assert!(matches!(
        service.delete_route(missing),
        Err(ServiceError::NotFound { entity: "route", id }) if id == missing
    ));
    assert!(matches!(
        service.delete_document_type(missing),
        Err(ServiceError::NotFound { entity: "document type", id }) if id == missing
    ));
    assert!(matches!(
        service.set_route_active(missing, false),
        Err(ServiceError::NotFound { entity: "route", .. })
    ));
    assert!(matches!(
        service.remove_checkpoint_template(missing),
        Err(ServiceError::NotFound { entity: "checkpoint template", .. })
    ));
}

#[test]
fn deactivating_type_stamps_clock_time() {
    let conn = open_db_in_memory().unwrap();
    let stamped_at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 15).unwrap();
    let service = CatalogService::with_clock(
        SqliteCatalogRepository::try_new(&conn).unwrap(),
        FixedClock::new(stamped_at),
    );
    let invoice = service.create_document_type("Invoice", "", None).unwrap();

    service.set_document_type_active(invoice.id, false).unwrap();

    let stored = service.get_document_type(invoice.id).unwrap().unwrap();
    assert!(!stored.is_active);
    assert_eq!(stored.updated_at, stamped_at.timestamp_millis());
}
