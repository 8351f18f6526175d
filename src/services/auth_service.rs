use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::auth::{hash_password, verify_password, JwtService};
use crate::models::{
    normalize_email, AuthResponse, CurrentUser, LoginRequest, NewUser, RegisterRequest,
    RepositoryError, Role, ServiceError, ServiceResult, User, Validate,
};
use crate::repositories::UserRepository;

/// Registration, login and token issuing
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    jwt: Arc<JwtService>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, jwt: Arc<JwtService>) -> Self {
        Self { users, jwt }
    }

    /// Create a `user` account and sign it in
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> ServiceResult<AuthResponse> {
        request.validate()?;

        let email = normalize_email(&request.email);
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(ServiceError::conflict(format!(
                "Email {} is already registered",
                email
            )));
        }

        let password = request.password;
        let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| ServiceError::Authentication {
                message: format!("password hashing task failed: {}", e),
            })??;

        let user = self
            .users
            .create(NewUser {
                name: request.name.trim().to_string(),
                email,
                phone: request.phone.filter(|p| !p.trim().is_empty()),
                role: Role::User,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                // Lost a race with a concurrent registration
                RepositoryError::ConstraintViolation { .. } => {
                    ServiceError::conflict("Email is already registered")
                }
                other => other.into(),
            })?;

        crate::info_with_trace!(user_id = user.id, "User registered");
        self.issue(user)
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> ServiceResult<AuthResponse> {
        request.validate()?;

        let email = normalize_email(&request.email);
        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!("Login for unknown email");
            return Err(ServiceError::InvalidCredentials);
        };

        let password = request.password;
        let stored_hash = user.password_hash.clone();
        let verified =
            tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
                .await
                .map_err(|e| ServiceError::Authentication {
                    message: format!("password verification task failed: {}", e),
                })?;

        if !verified {
            warn!(user_id = user.id, "Login with wrong password");
            return Err(ServiceError::InvalidCredentials);
        }

        crate::info_with_trace!(user_id = user.id, role = %user.role, "User logged in");
        self.issue(user)
    }

    /// Reload the account behind a validated token; the stored role wins over the claim
    #[instrument(skip(self, claimed), fields(user_id = claimed.id))]
    pub async fn resolve(&self, claimed: CurrentUser) -> ServiceResult<CurrentUser> {
        let Some(user) = self.users.find_by_id(claimed.id).await? else {
            warn!("Token presented for a deleted account");
            return Err(ServiceError::Authentication {
                message: "Account no longer exists".to_string(),
            });
        };

        if user.role != claimed.role {
            debug!(
                token_role = %claimed.role,
                role = %user.role,
                "Role changed since token was issued"
            );
        }
        Ok(CurrentUser {
            id: user.id,
            email: user.email,
            role: user.role,
        })
    }

    fn issue(&self, user: User) -> ServiceResult<AuthResponse> {
        let issued = self
            .jwt
            .issue(&user)
            .map_err(|e| ServiceError::Authentication {
                message: e.to_string(),
            })?;

        Ok(AuthResponse {
            token: issued.token,
            token_type: "Bearer".to_string(),
            expires_at: issued.expires_at,
            user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserFilters;
    use async_trait::async_trait;
    use chrono::Utc;
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

    fn jwt() -> Arc<JwtService> {
        Arc::new(JwtService::new("auth-service-test-secret", "restaurant-rs", 60))
    }

    fn stored_user(password: &str) -> User {
        let now = Utc::now();
        User {
            id: 11,
            name: "Linus".to_string(),
            email: "linus@example.com".to_string(),
            phone: None,
            role: Role::User,
            password_hash: hash_password(password).unwrap(),
            created_at: now,
            updated_at: now,
        }
    }

    fn register_request() -> RegisterRequest {
        RegisterRequest {
            name: " Linus ".to_string(),
            email: "Linus@Example.com".to_string(),
            password: "hunter22".to_string(),
            phone: None,
        }
    }

    #[tokio::test]
    async fn test_register_normalizes_email_and_issues_token() {
        let mut repo = MockTestUserRepository::new();
        repo.expect_find_by_email()
            .with(eq("linus@example.com"))
            .times(1)
            .returning(|_| Ok(None));
        repo.expect_create()
            .withf(|u| u.email == "linus@example.com" && u.name == "Linus" && u.role == Role::User)
            .times(1)
            .returning(|u| {
                let now = Utc::now();
                Ok(User {
                    id: 1,
                    name: u.name,
                    email: u.email,
                    phone: u.phone,
                    role: u.role,
                    password_hash: u.password_hash,
                    created_at: now,
                    updated_at: now,
                })
            });

        let jwt = jwt();
        let service = AuthService::new(Arc::new(repo), jwt.clone());
        let response = service.register(register_request()).await.unwrap();

        assert_eq!(response.token_type, "Bearer");
        let claims = jwt.validate(&response.token).unwrap();
        let current = CurrentUser::try_from(claims).unwrap();
        assert_eq!(current.id, 1);
        assert_eq!(current.role, Role::User);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let mut repo = MockTestUserRepository::new();
        repo.expect_find_by_email()
            .returning(|_| Ok(Some(stored_user("whatever"))));
        repo.expect_create().never();

        let service = AuthService::new(Arc::new(repo), jwt());
        let result = service.register(register_request()).await;

        assert!(matches!(result, Err(ServiceError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_register_rejects_short_password() {
        let repo = MockTestUserRepository::new();
        let service = AuthService::new(Arc::new(repo), jwt());

        let mut request = register_request();
        request.password = "123".to_string();

        let result = service.register(request).await;
        assert!(matches!(result, Err(ServiceError::ValidationError { .. })));
    }

    #[tokio::test]
    async fn test_login() {
        let mut repo = MockTestUserRepository::new();
        let user = stored_user("correct-password");
        repo.expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));

        let service = AuthService::new(Arc::new(repo), jwt());

        let ok = service
            .login(LoginRequest {
                email: "linus@example.com".to_string(),
                password: "correct-password".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(ok.user.id, 11);

        let wrong = service
            .login(LoginRequest {
                email: "linus@example.com".to_string(),
                password: "wrong-password".to_string(),
            })
            .await;
        assert!(matches!(wrong, Err(ServiceError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let mut repo = MockTestUserRepository::new();
        repo.expect_find_by_email().returning(|_| Ok(None));

        let service = AuthService::new(Arc::new(repo), jwt());
        let result = service
            .login(LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "irrelevant".to_string(),
            })
            .await;

        assert!(matches!(result, Err(ServiceError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_resolve_uses_stored_role() {
        let mut repo = MockTestUserRepository::new();
        repo.expect_find_by_id()
            .with(eq(11))
            .returning(|_| Ok(Some(stored_user("irrelevant"))));

        let service = AuthService::new(Arc::new(repo), jwt());
        let resolved = service
            .resolve(CurrentUser {
                id: 11,
                email: "old@example.com".to_string(),
                role: Role::Admin,
            })
            .await
            .unwrap();

        assert_eq!(resolved.role, Role::User);
        assert_eq!(resolved.email, "linus@example.com");
    }

    #[tokio::test]
    async fn test_resolve_rejects_deleted_account() {
        let mut repo = MockTestUserRepository::new();
        repo.expect_find_by_id().returning(|_| Ok(None));

        let service = AuthService::new(Arc::new(repo), jwt());
        let result = service
            .resolve(CurrentUser {
                id: 99,
                email: "gone@example.com".to_string(),
                role: Role::Admin,
            })
            .await;

        assert!(matches!(result, Err(ServiceError::Authentication { .. })));
    }
}
