use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::{get, post},
    Router,
};
use shared::jwt::{JwtError, ProviderJwt};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, require_super_admin, route_guard,
    security_headers_middleware, trace_id, RateLimiterState, REQUEST_ID_HEADER,
};
use crate::routes::{
    auth, chat_query, chats, debug, dioceses, health, me, testing_centers, users,
};
use crate::services::cookies::CookieHelper;
use crate::services::llm::SqlGenerator;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub sql_generator: Arc<dyn SqlGenerator>,
    /// `None` when provider sessions are not configured.
    pub provider_jwt: Option<Arc<ProviderJwt>>,
    /// `None` when the chat rate limit is 0.
    pub rate_limiter: Option<Arc<RateLimiterState>>,
}

impl AppState {
    pub fn new(
        config: Config,
        pool: PgPool,
        sql_generator: Arc<dyn SqlGenerator>,
    ) -> Result<Self, JwtError> {
        let provider_jwt = if config.provider.is_enabled() {
            Some(Arc::new(ProviderJwt::new(
                &config.provider.jwt_secret,
                config.provider.audience.clone(),
                config.provider.leeway_secs,
            )?))
        } else {
            None
        };

        let rate_limiter = (config.security.chat_rate_limit_per_minute > 0).then(|| {
            Arc::new(RateLimiterState::new(
                config.security.chat_rate_limit_per_minute,
            ))
        });

        Ok(Self {
            pool,
            config: Arc::new(config),
            sql_generator,
            provider_jwt,
            rate_limiter,
        })
    }

    pub fn cookies(&self) -> CookieHelper {
        CookieHelper::new(self.config.cookies.clone())
    }
}

/// Cookies carry the session, so configured origins get credentials; the
/// permissive development default does not.
fn cors_layer(config: &Config) -> CorsLayer {
    if config.security.cors_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }

    let origins: Vec<_> = config
        .security
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(REQUEST_ID_HEADER)])
        .allow_credentials(true)
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/logout", post(auth::logout));

    // Authentication is enforced per handler by the CurrentUser/Scoped extractors.
    let api_routes = Router::new()
        .route("/api/v1/me", get(me::me))
        .route(
            "/api/v1/dioceses",
            get(dioceses::list_dioceses).post(dioceses::create_diocese),
        )
        .route(
            "/api/v1/dioceses/:id",
            get(dioceses::get_diocese)
                .put(dioceses::update_diocese)
                .delete(dioceses::delete_diocese),
        )
        .route(
            "/api/v1/testing-centers",
            get(testing_centers::list_testing_centers).post(testing_centers::create_testing_center),
        )
        .route(
            "/api/v1/testing-centers/:id",
            get(testing_centers::get_testing_center)
                .put(testing_centers::update_testing_center)
                .delete(testing_centers::delete_testing_center),
        )
        .route("/api/v1/users", get(users::list_users).post(users::create_user))
        .route("/api/v1/users/import", post(users::import_users))
        .route("/api/v1/users/:id", axum::routing::delete(users::delete_user))
        .route("/api/v1/chats", get(chats::list_chats).post(chats::create_chat))
        .route(
            "/api/v1/chats/:id",
            get(chats::get_chat)
                .put(chats::update_chat)
                .delete(chats::delete_chat),
        )
        .route("/api/v1/chat/query", post(chat_query::chat_query));

    let mut app = Router::new().merge(public_routes).merge(api_routes);

    if config.debug.enabled {
        tracing::warn!("Debug data endpoint is enabled");
        let debug_routes = Router::new()
            .route("/api/v1/debug/data", get(debug::debug_data))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_super_admin,
            ));
        app = app.merge(debug_routes);
    }

    // Global middleware (bottom layers run first)
    app.layer(middleware::from_fn_with_state(state.clone(), route_guard))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors_layer(&config))
        .with_state(state)
}
