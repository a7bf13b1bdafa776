use axum::{Router, routing::get};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::app_conf::AppConfig;
use crate::config::email_conf::EmailConfig;
use crate::config::mongo_conf::MongoConfig;
use crate::repository::policy_repo::MongoPolicyRepository;
use crate::repository::quote_repo::MongoQuoteRepository;
use crate::repository::user_repo::MongoUserRepository;
use crate::router::policy_router::policy_router;
use crate::router::quote_router::quote_router;
use crate::service::policy_service::PolicyServiceImpl;
use crate::service::quote_service::QuoteServiceImpl;
use crate::util::email::{EmailService, NoopEmailService, SmtpEmailService};
use crate::util::identifier::{NumberGenerator, RandomNumberGenerator};

pub struct App {
    config: AppConfig,
    router: Router,
    pub quote_service: Arc<QuoteServiceImpl>,
    pub policy_service: Arc<PolicyServiceImpl>,
}

/// All routes of the service, including `/health`.
pub fn create_router(quote_service: Arc<QuoteServiceImpl>, policy_service: Arc<PolicyServiceImpl>) -> Router {
    Router::new()
        .merge(quote_router(quote_service))
        .merge(policy_router(policy_service))
        .route("/health", get(|| async { "OK" }))
}

impl App {
    pub async fn new() -> Self {
        let config = AppConfig::from_env();
        config.validate().expect("App config error");
        let mongo_config = MongoConfig::from_env().expect("Mongo config error");

        let client = mongo_config.connect().await.expect("Mongo connection error");
        let quote_repo = Arc::new(MongoQuoteRepository::new(client.clone(), &mongo_config));
        let user_repo = Arc::new(MongoUserRepository::new(&client, &mongo_config));
        let policy_repo = Arc::new(MongoPolicyRepository::new(&client, &mongo_config));
        quote_repo.ensure_indexes().await.expect("Quote indexes error");
        user_repo.ensure_indexes().await.expect("User indexes error");
        policy_repo.ensure_indexes().await.expect("Policy indexes error");

        let email_service: Arc<dyn EmailService> = match EmailConfig::from_env_optional() {
            Ok(Some(email_config)) => match SmtpEmailService::new(email_config) {
                Ok(service) => Arc::new(service),
                Err(e) => {
                    warn!("Email service not available, notifications disabled: {e}");
                    Arc::new(NoopEmailService)
                }
            },
            Ok(None) => Arc::new(NoopEmailService),
            Err(e) => {
                warn!("Email config not loaded, notifications disabled: {e}");
                Arc::new(NoopEmailService)
            }
        };
        let numbers: Arc<dyn NumberGenerator> = Arc::new(RandomNumberGenerator);

        let quote_service = Arc::new(QuoteServiceImpl::new(
            quote_repo.clone(),
            user_repo,
            numbers.clone(),
            email_service.clone(),
            config.admin_path_prefix.clone(),
        ));
        let policy_service = Arc::new(PolicyServiceImpl::new(quote_repo, policy_repo, numbers, email_service));

        let router = create_router(quote_service.clone(), policy_service.clone());
        App { config, router, quote_service, policy_service }
    }

    pub async fn start(self) {
        let addr = SocketAddr::new(self.config.host.parse().expect("Invalid host"), self.config.port);
        info!("🚀 Server running at http://{}", addr);
        let listener = tokio::net::TcpListener::bind(addr).await.expect("Failed to bind address");
        axum::serve(listener, self.router).await.expect("Failed to start server");
    }
}
