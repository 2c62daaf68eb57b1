use dts_core::db::open_db_in_memory;
use dts_core::{NewUser, ServiceError, SqliteUserRepository, UserRole, UserService};

#[test]
fn new_users_default_to_viewer() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());

    let user = service
        .create_user(&NewUser::new("  jdoe ").unwrap().with_full_name("Jane Doe"))
        .unwrap();

    assert_eq!(user.username, "jdoe");
    assert_eq!(user.full_name, "Jane Doe");
    assert_eq!(user.role, UserRole::Viewer);
    assert!(user.is_active);
    assert!(!user.can_edit_documents());
    assert_eq!(service.get_user(user.id).unwrap(), Some(user.clone()));
    assert_eq!(service.get_user_by_username("jdoe").unwrap(), Some(user));
}

#[test]
fn duplicate_username_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());
    service.create_user(&NewUser::new("jdoe").unwrap()).unwrap();

    let err = service
        .create_user(&NewUser::new("jdoe").unwrap().with_role(UserRole::Staff))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::DuplicateName { entity: "user", ref name } if name == "jdoe"
    ));
}

#[test]
fn ensure_admin_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(SqliteUserRepository::try_new(&conn).unwrap());

    let (admin, created) = service.ensure_admin("admin").unwrap();
    assert!(created);
    assert!(admin.is_admin());
    assert_eq!(admin.department, "Administration");

    let (again, created) = service.ensure_admin("admin").unwrap();
    assert!(!created);
    assert_eq!(again.id, admin.id);

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}
