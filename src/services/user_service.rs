use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::models::{
    CurrentUser, Role, ServiceError, ServiceResult, UpdateProfileRequest, User, UserFilters,
    Validate,
};
use crate::repositories::UserRepository;

/// Profile and account administration
pub struct UserService {
    users: Arc<dyn UserRepository>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    #[instrument(skip(self), fields(user_id = current.id))]
    pub async fn me(&self, current: &CurrentUser) -> ServiceResult<User> {
        self.users
            .find_by_id(current.id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", current.id))
    }

    #[instrument(skip(self, request), fields(user_id = current.id))]
    pub async fn update_profile(
        &self,
        current: &CurrentUser,
        request: UpdateProfileRequest,
    ) -> ServiceResult<User> {
        request.validate()?;

        let mut user = self.me(current).await?;
        if let Some(name) = request.name {
            user.name = name.trim().to_string();
        }
        if let Some(phone) = request.phone {
            let phone = phone.trim().to_string();
            user.phone = if phone.is_empty() { None } else { Some(phone) };
        }
        user.updated_at = Utc::now();

        let updated = self.users.update(user).await?;
        info!("Profile updated");
        Ok(updated)
    }

    #[instrument(skip(self), fields(user_id = current.id))]
    pub async fn list_users(
        &self,
        current: &CurrentUser,
        filters: UserFilters,
    ) -> ServiceResult<Vec<User>> {
        require_admin(current)?;
        Ok(self.users.find_all(filters).await?)
    }

    #[instrument(skip(self), fields(admin_id = current.id))]
    pub async fn set_role(&self, current: &CurrentUser, user_id: i64, role: Role) -> ServiceResult<User> {
        require_admin(current)?;

        if user_id == current.id && role != Role::Admin {
            warn!("Admin attempted to demote themself");
            return Err(ServiceError::forbidden("Administrators cannot demote themselves"));
        }

        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id))?;
        let previous = user.role;
        user.role = role;
        user.updated_at = Utc::now();

        let updated = self.users.update(user).await?;
        crate::info_with_trace!(user_id, from = %previous, to = %role, "User role changed");
        Ok(updated)
    }

    #[instrument(skip(self), fields(admin_id = current.id))]
    pub async fn delete_user(&self, current: &CurrentUser, user_id: i64) -> ServiceResult<()> {
        require_admin(current)?;

        if user_id == current.id {
            return Err(ServiceError::forbidden("Administrators cannot delete themselves"));
        }

        if !self.users.delete(user_id).await? {
            return Err(ServiceError::not_found("User", user_id));
        }

        crate::info_with_trace!(user_id, "User deleted");
        Ok(())
    }
}

pub(crate) fn require_admin(current: &CurrentUser) -> ServiceResult<()> {
    if current.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::forbidden("Administrator role required"))
    }
}

pub(crate) fn require_staff(current: &CurrentUser) -> ServiceResult<()> {
    if current.is_staff_or_admin() {
        Ok(())
    } else {
        Err(ServiceError::forbidden("Staff or administrator role required"))
    }
}

pub(crate) fn require_moderator(current: &CurrentUser) -> ServiceResult<()> {
    if current.role.can_moderate() {
        Ok(())
    } else {
        Err(ServiceError::forbidden("Moderator or administrator role required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewUser, RepositoryError};
    use async_trait::async_trait;
    use mockall::{mock, predicate::*};

    mock! {
        TestUserRepository {}

        #[async_trait]
        impl UserRepository for TestUserRepository {
            async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;
            async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepositoryError>;
            async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;
            async fn find_all(&self, filters: UserFilters) -> Result<Vec<User>, RepositoryError>;
            async fn update(&self, user: User) -> Result<User, RepositoryError>;
            async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;
            async fn count(&self) -> Result<i64, RepositoryError>;
        }
    }

    fn current(id: i64, role: Role) -> CurrentUser {
        CurrentUser {
            id,
            email: format!("{}@example.com", id),
            role,
        }
    }

    fn user(id: i64, role: Role) -> User {
        let now = Utc::now();
        User {
            id,
            name: "Someone".to_string(),
            email: format!("{}@example.com", id),
            phone: None,
            role,
            password_hash: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_update_profile_clears_blank_phone() {
        let mut repo = MockTestUserRepository::new();
        repo.expect_find_by_id().with(eq(5)).returning(|id| {
            let mut u = user(id, Role::User);
            u.phone = Some("+1 555 0000".to_string());
            Ok(Some(u))
        });
        repo.expect_update()
            .withf(|u| u.name == "New Name" && u.phone.is_none())
            .times(1)
            .returning(Ok);

        let service = UserService::new(Arc::new(repo));
        let updated = service
            .update_profile(
                &current(5, Role::User),
                UpdateProfileRequest {
                    name: Some(" New Name ".to_string()),
                    phone: Some("  ".to_string()),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "New Name");
    }

    #[tokio::test]
    async fn test_set_role_requires_admin() {
        let repo = MockTestUserRepository::new();
        let service = UserService::new(Arc::new(repo));

        let result = service
            .set_role(&current(2, Role::Moderator), 3, Role::Staff)
            .await;
        assert!(matches!(result, Err(ServiceError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_admin_cannot_demote_self() {
        let mut repo = MockTestUserRepository::new();
        repo.expect_update().never();
        let service = UserService::new(Arc::new(repo));

        let result = service.set_role(&current(1, Role::Admin), 1, Role::User).await;
        assert!(matches!(result, Err(ServiceError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_set_role() {
        let mut repo = MockTestUserRepository::new();
        repo.expect_find_by_id()
            .with(eq(7))
            .returning(|id| Ok(Some(user(id, Role::User))));
        repo.expect_update()
            .withf(|u| u.role == Role::Courier)
            .returning(Ok);

        let service = UserService::new(Arc::new(repo));
        let updated = service
            .set_role(&current(1, Role::Admin), 7, Role::Courier)
            .await
            .unwrap();

        assert_eq!(updated.role, Role::Courier);
    }

    #[tokio::test]
    async fn test_delete_user() {
        let mut repo = MockTestUserRepository::new();
        repo.expect_delete().with(eq(9)).returning(|_| Ok(false));

        let service = UserService::new(Arc::new(repo));

        let missing = service.delete_user(&current(1, Role::Admin), 9).await;
        assert!(matches!(missing, Err(ServiceError::NotFound { .. })));

        let own = service.delete_user(&current(1, Role::Admin), 1).await;
        assert!(matches!(own, Err(ServiceError::Forbidden { .. })));
    }
}
