//! User repository contracts and SQLite implementation.

use crate::model::user::{NewUser, User, UserId, UserRole};
use crate::repo::error::{unique_violation, RepoError, RepoResult};
use crate::repo::schema::{ensure_connection_ready, int_to_bool, parse_uuid, TableLayout};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const USER_SELECT_SQL: &str = "SELECT
    id,
    username,
    full_name,
    email,
    department,
    role,
    is_active,
    created_at,
    updated_at
FROM users";

const USER_TABLES: &[TableLayout] = &[(
    "users",
    &[
        "id",
        "username",
        "full_name",
        "email",
        "department",
        "role",
        "is_active",
        "created_at",
        "updated_at",
    ],
)];

/// Repository interface for user directory operations.
pub trait UserRepository {
    fn create_user(&self, user: &NewUser) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, USER_TABLES)?;
        Ok(Self { conn })
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &NewUser) -> RepoResult<User> {
        let id = Uuid::new_v4();
        self.conn
            .execute(
                "INSERT INTO users (id, username, full_name, email, department, role)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
                params![
                    id.to_string(),
                    user.username.as_str(),
                    user.full_name.as_str(),
                    user.email.as_str(),
                    user.department.as_str(),
                    user.role.as_str(),
                ],
            )
            .map_err(|err| match unique_violation(&err) {
                Some(_) => RepoError::DuplicateName {
                    entity: "user",
                    name: user.username.clone(),
                },
                None => err.into(),
            })?;

        self.get_user(id)?.ok_or(RepoError::NotFound { entity: "user", id })
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        self.conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                |row| Ok(parse_user_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE username = ?1;"),
                [username.trim()],
                |row| Ok(parse_user_row(row)),
            )
            .optional()?
            .transpose()
    }
}

/// True when a user row with `id` exists.
pub(crate) fn user_exists(conn: &Connection, id: UserId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1);",
        [id.to_string()],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn parse_user_row(row: &Row<'_>) -> RepoResult<User> {
    let id_text: String = row.get("id")?;
    let role_text: String = row.get("role")?;
    let role = UserRole::parse(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid user role `{role_text}` in users.role"))
    })?;

    Ok(User {
        id: parse_uuid(&id_text, "users.id")?,
        username: row.get("username")?,
        full_name: row.get("full_name")?,
        email: row.get("email")?,
        department: row.get("department")?,
        role,
        is_active: int_to_bool(row.get("is_active")?, "users.is_active")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
