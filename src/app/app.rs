use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, routing::get, Json, Router};
use serde_json::json;
use tracing::{error, info, warn};

use crate::config::{AdminUserConfig, AppConfig, EmailConfig, JwtConfig, MongoConfig};
use crate::handler::ApiState;
use crate::middlewares::admin_middleware::AdminAuthState;
use crate::middlewares::visitor_tracker::{visitor_tracker, VisitorTrackerState};
use crate::repository::catalog_repo::MongoCatalogLookup;
use crate::repository::contact_repo::MongoContactRepository;
use crate::repository::user_repo::MongoUserRepository;
use crate::repository::visitor_repo::MongoVisitorRepository;
use crate::router::contact_router::contact_router;
use crate::router::user_router::user_router;
use crate::router::visitor_router::visitor_router;
use crate::service::contact_service::{ContactService, ContactServiceImpl};
use crate::service::notification_service::NotificationService;
use crate::service::user_service::{UserService, UserServiceImpl};
use crate::service::visitor_service::{VisitorService, VisitorServiceImpl};
use crate::util::email::LazyMailer;
use crate::util::error::{HandlerError, HandlerErrorKind};
use crate::util::jwt::{JwtTokenUtils, JwtTokenUtilsImpl};

/// Everything the HTTP layer needs, independent of how it was wired.
#[derive(Clone)]
pub struct AppServices {
    pub contact_service: Arc<dyn ContactService>,
    pub visitor_service: Arc<dyn VisitorService>,
    pub user_service: Arc<dyn UserService>,
    pub jwt_utils: Arc<dyn JwtTokenUtils>,
}

pub fn build_router(services: &AppServices, config: &AppConfig) -> Router {
    let environment = config.environment;
    let admin_auth_state = Arc::new(AdminAuthState { jwt_utils: services.jwt_utils.clone() });
    let tracker_state = Arc::new(VisitorTrackerState {
        service: services.visitor_service.clone(),
        excluded_prefixes: config.tracker_excluded_prefixes.clone(),
    });

    Router::new()
        .merge(contact_router(
            ApiState::new(services.contact_service.clone(), environment),
            admin_auth_state.clone(),
        ))
        .merge(visitor_router(
            ApiState::new(services.visitor_service.clone(), environment),
            admin_auth_state,
        ))
        .merge(user_router(ApiState::new(services.user_service.clone(), environment)))
        .route("/health", get(|| async { Json(json!({ "success": true, "status": "OK" })) }))
        .fallback(|| async { HandlerError::new(HandlerErrorKind::NotFound, "Route not found") })
        .layer(middleware::from_fn_with_state(tracker_state, visitor_tracker))
}

pub struct App {
    config: AppConfig,
    router: Router,
}

impl App {
    pub async fn new() -> Self {
        let config = AppConfig::from_env().expect("App config error");
        let mongo_config = MongoConfig::from_env().expect("Mongo config error");
        let jwt_config = JwtConfig::from_env().expect("JWT config error");
        let email_config = EmailConfig::from_env_optional().expect("Email config error");

        let db = mongo_config.connect().await.expect("Failed to connect to MongoDB");
        let contact_repo = Arc::new(MongoContactRepository::new(&db, &mongo_config.contact_collection));
        let visitor_repo = Arc::new(MongoVisitorRepository::new(&db, &mongo_config.visitor_collection));
        let user_repo = Arc::new(MongoUserRepository::new(&db, &mongo_config.user_collection));
        let catalog = Arc::new(MongoCatalogLookup::new(&db));

        let admin_inbox = config
            .admin_notification_email
            .clone()
            .or_else(|| email_config.as_ref().map(|c| c.from_email.clone()));
        if admin_inbox.is_none() {
            warn!("No admin inbox configured; enquiry notifications will be skipped");
        }
        let default_sender = email_config
            .as_ref()
            .map(|c| c.from_name.clone())
            .unwrap_or_else(|| config.site_name.clone());
        let mailer = Arc::new(LazyMailer::new(email_config));
        if !mailer.is_configured() {
            warn!("SMTP not configured; outgoing email is disabled");
        }
        let notifier = Arc::new(NotificationService::new(mailer, config.site_name.clone(), admin_inbox));

        let jwt_utils: Arc<dyn JwtTokenUtils> = Arc::new(JwtTokenUtilsImpl::new(jwt_config));
        let user_service = Arc::new(UserServiceImpl::new(user_repo.clone(), jwt_utils.clone()));
        let services = AppServices {
            contact_service: Arc::new(ContactServiceImpl::new(
                contact_repo,
                catalog,
                user_repo,
                notifier,
                default_sender,
            )),
            visitor_service: Arc::new(VisitorServiceImpl::new(visitor_repo)),
            user_service: user_service.clone(),
            jwt_utils,
        };

        Self::create_first_admin_user(user_service.as_ref()).await;

        let router = build_router(&services, &config);
        App { config, router }
    }

    pub async fn start(self) {
        let addr = SocketAddr::new(self.config.host.parse().expect("Invalid host"), self.config.port);
        info!("🚀 Server running at http://{}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await.expect("Failed to bind address");
        axum::serve(listener, self.router.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .expect("Failed to start server");
    }

    async fn create_first_admin_user(user_service: &dyn UserService) {
        let admin_conf = match AdminUserConfig::from_env() {
            Ok(c) => c,
            Err(e) => {
                warn!("Admin user config not loaded: {e}");
                return;
            }
        };
        if let Err(e) = user_service.seed_admin(&admin_conf).await {
            error!("Failed to create admin user: {e}");
        }
    }
}
