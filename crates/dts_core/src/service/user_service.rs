//! User directory use-case service.

use crate::model::user::{NewUser, User, UserId, UserRole};
use crate::repo::user_repo::UserRepository;
use crate::service::error::ServiceResult;
use log::info;

/// Username of the bootstrap administrator.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_DEPARTMENT: &str = "Administration";

/// User service facade.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    /// Creates service from repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_user(&self, user: &NewUser) -> ServiceResult<User> {
        Ok(self.repo.create_user(user)?)
    }

    pub fn get_user(&self, id: UserId) -> ServiceResult<Option<User>> {
        Ok(self.repo.get_user(id)?)
    }

    pub fn get_user_by_username(&self, username: &str) -> ServiceResult<Option<User>> {
        Ok(self.repo.get_user_by_username(username)?)
    }

    /// Creates the default administrator unless `username` already exists.
    ///
    /// Returns the stored user and whether this call created it.
    pub fn ensure_admin(&self, username: &str) -> ServiceResult<(User, bool)> {
        let admin = NewUser::new(username)?
            .with_role(UserRole::Admin)
            .with_department(DEFAULT_ADMIN_DEPARTMENT);
        if let Some(existing) = self.repo.get_user_by_username(&admin.username)? {
            info!(
                "event=admin_bootstrap module=service status=skipped user_id={}",
                existing.id
            );
            return Ok((existing, false));
        }

        let created = self.repo.create_user(&admin)?;
        info!(
            "event=admin_bootstrap module=service status=ok user_id={}",
            created.id
        );
        Ok((created, true))
    }
}
