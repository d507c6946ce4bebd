//! Prints an admin token pair signed with the configured secret, for
//! exercising the admin API by hand.
//!
//! cargo run --example generate_token -- admin@example.com

use dotenv::dotenv;
use servicebody_backend::config::JwtConfig;
use servicebody_backend::model::user::ADMIN_ROLE;
use servicebody_backend::util::jwt::{JwtTokenUtils, JwtTokenUtilsImpl};
use servicebody_backend::util::logger::Logger;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logger = Logger::new()?;
    let _guards = logger.guards;

    match dotenv() {
        Ok(_) => info!("✅ Successfully loaded .env file"),
        Err(e) => warn!("⚠️ Failed to load .env file: {} (using system env vars)", e),
    }

    let jwt_util = JwtTokenUtilsImpl::new(JwtConfig::from_env()?);
    let email = std::env::args().nth(1).unwrap_or_else(|| "admin@example.com".to_string());
    let user_id = Uuid::new_v4().to_string();
    debug!(user_id = %user_id, email = %email, "Generating admin token pair");

    let tokens = jwt_util.generate_token_pair(&user_id, &email, ADMIN_ROLE)?;
    let claims = jwt_util.validate_access_token(&tokens.access_token)?;
    info!(expires = claims.exp, "Access token valid for {} minutes", tokens.expires_in / 60);

    println!("Authorization: Bearer {}", tokens.access_token);
    println!("Refresh token: {}", tokens.refresh_token);
    Ok(())
}
