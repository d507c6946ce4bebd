use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};

use crate::config::AdminUserConfig;
use crate::dto::user_dto::{AuthResponse, LoginRequest, RefreshResponse, UserView};
use crate::model::user::{User, ADMIN_ROLE};
use crate::repository::user_repo::UserRepository;
use crate::util::error::ServiceError;
use crate::util::jwt::JwtTokenUtils;
use crate::util::password::{PasswordUtils, PasswordUtilsImpl};
use crate::util::time::now_iso;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

#[async_trait]
pub trait UserService: Send + Sync {
    async fn login(&self, request: LoginRequest) -> Result<AuthResponse, ServiceError>;
    async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshResponse, ServiceError>;
    /// Create the configured admin account unless that email already exists.
    async fn seed_admin(&self, config: &AdminUserConfig) -> Result<(), ServiceError>;
}

pub struct UserServiceImpl {
    users: Arc<dyn UserRepository>,
    jwt_utils: Arc<dyn JwtTokenUtils>,
}

impl UserServiceImpl {
    pub fn new(users: Arc<dyn UserRepository>, jwt_utils: Arc<dyn JwtTokenUtils>) -> Self {
        Self { users, jwt_utils }
    }
}

#[async_trait]
impl UserService for UserServiceImpl {
    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn login(&self, request: LoginRequest) -> Result<AuthResponse, ServiceError> {
        info!("Admin login attempt");
        let email = request.email.trim().to_lowercase();
        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!("Login for unknown email");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        };

        let valid = PasswordUtilsImpl::verify_password(&request.password, &user.password_hash).map_err(|e| {
            error!("Stored password hash unusable: {}", e);
            ServiceError::InternalError(e.to_string())
        })?;
        if !valid {
            warn!("Invalid password");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let user_id = user.id.map(|id| id.to_hex()).unwrap_or_default();
        let tokens = self
            .jwt_utils
            .generate_token_pair(&user_id, &user.email, &user.role)
            .map_err(|e| ServiceError::InternalError(format!("JWT error: {}", e)))?;
        info!(user_id = %user_id, "Admin logged in");

        Ok(AuthResponse { success: true, user: UserView::from(user), tokens })
    }

    #[instrument(skip_all)]
    async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshResponse, ServiceError> {
        let claims = self
            .jwt_utils
            .validate_refresh_token(refresh_token)
            .map_err(|e| ServiceError::Unauthorized(format!("Invalid refresh token: {}", e)))?;
        let tokens = self
            .jwt_utils
            .generate_token_pair(&claims.sub, &claims.email, &claims.role)
            .map_err(|e| ServiceError::InternalError(format!("JWT error: {}", e)))?;
        info!(user_id = %claims.sub, "Token refreshed");
        Ok(RefreshResponse { success: true, tokens })
    }

    #[instrument(skip_all, fields(email = %config.email))]
    async fn seed_admin(&self, config: &AdminUserConfig) -> Result<(), ServiceError> {
        if self.users.find_by_email(&config.email).await?.is_some() {
            info!("Admin account already present");
            return Ok(());
        }

        let password_hash = PasswordUtilsImpl::hash_password(&config.password)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        let now = now_iso();
        let admin = User {
            id: None,
            username: config.username.clone(),
            first_name: config.first_name.clone(),
            last_name: config.last_name.clone(),
            email: config.email.trim().to_lowercase(),
            password_hash,
            role: ADMIN_ROLE.to_string(),
            created_at: Some(now.clone()),
            updated_at: Some(now),
        };
        self.users.insert(admin).await?;
        info!("Admin account created");
        Ok(())
    }
}
