use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, patch, post, put},
    Router,
};
use domain::models::system_config::ConfigSnapshot;
use domain::services::{EventPublisher, LoggingEventPublisher};
use shared::jwt::{JwtConfig, JwtError};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{
    metrics_handler, metrics_middleware, optional_user_auth, rate_limit_middleware,
    require_user_auth, security_headers_middleware, trace_id, RateLimiterState,
};
use crate::routes::{
    auth, commerce, dashboard, engagement, health, prompts, rbac, system_config, taxonomy, users,
};
use crate::services::ConfigStore;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub jwt: Arc<JwtConfig>,
    /// Runtime settings loaded from `system_config`.
    pub config_store: ConfigStore,
    pub events: Arc<dyn EventPublisher>,
    pub rate_limiter: Option<Arc<RateLimiterState>>,
}

impl AppState {
    /// State with a logging event publisher and an empty settings snapshot.
    pub fn new(config: Config, pool: PgPool) -> Result<Self, JwtError> {
        let jwt = JwtConfig::new(
            &config.jwt.secret,
            config.jwt.access_token_expiry_secs,
            config.jwt.refresh_token_expiry_secs,
            config.jwt.leeway_secs,
        )?;

        // Disabled when rate_limit_per_minute is 0
        let rate_limiter = (config.security.rate_limit_per_minute > 0).then(|| {
            Arc::new(RateLimiterState::new(
                config.security.rate_limit_per_minute,
                config.security.trusted_proxies.clone(),
            ))
        });

        Ok(Self {
            pool,
            config: Arc::new(config),
            jwt: Arc::new(jwt),
            config_store: ConfigStore::default(),
            events: Arc::new(LoggingEventPublisher),
            rate_limiter,
        })
    }

    pub fn with_events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = events;
        self
    }

    pub fn with_config_store(mut self, store: ConfigStore) -> Self {
        self.config_store = store;
        self
    }

    /// Settings as of this call. Later overrides do not affect the returned snapshot.
    pub fn settings(&self) -> Arc<ConfigSnapshot> {
        self.config_store.snapshot()
    }
}

/// Builds the router with a fresh state. Used by tests.
pub fn create_app(config: Config, pool: PgPool) -> Result<Router, JwtError> {
    Ok(router(AppState::new(config, pool)?))
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.security.cors_origins.is_empty() {
        // Development default
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        use tower_http::cors::AllowOrigin;
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Routes readable without a token. Handlers resolve the guest actor when
/// no bearer token is sent.
fn public_routes() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        // Catalog
        .route("/prompts", get(prompts::list_prompts))
        .route("/prompts/:slug", get(prompts::get_prompt))
        .route("/prompts/:slug/view", post(prompts::record_view))
        .route("/prompts/:slug/share", post(prompts::record_share))
        .route("/prompts/:slug/comments", get(engagement::list_comments))
        .route("/prompts/:slug/reviews", get(engagement::list_reviews))
        .route("/prompts/:slug/access", get(commerce::check_access))
        .route("/plans", get(commerce::list_plans))
        // Taxonomy
        .route("/categories", get(taxonomy::list_categories))
        .route("/tags", get(taxonomy::list_tags))
        .route("/platforms", get(taxonomy::list_platforms))
        .route("/platforms/:code/models", get(taxonomy::list_models))
        .route("/sources", get(taxonomy::list_sources))
        .route("/levels", get(taxonomy::list_levels))
        .route("/authors", get(taxonomy::list_authors))
        // Settings
        .route("/config/public", get(system_config::list_public))
}

/// Routes requiring a valid access token.
fn authenticated_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // Current user
        .route("/users/me", get(users::get_me).patch(users::update_me))
        .route("/users/me/purchases", get(commerce::my_purchases))
        .route("/users/me/saved", get(engagement::my_saved))
        // Catalog writes
        .route("/prompts", post(prompts::create_prompt))
        .route(
            "/prompts/:slug",
            patch(prompts::update_prompt).delete(prompts::delete_prompt),
        )
        .route("/prompts/:slug/status", post(prompts::transition_status))
        .route(
            "/prompts/:slug/tags/:tag_slug",
            put(prompts::attach_tag).delete(prompts::detach_tag),
        )
        .route(
            "/prompts/:slug/categories/:code",
            put(prompts::attach_category).delete(prompts::detach_category),
        )
        .route(
            "/prompts/:slug/models/:model_id",
            put(prompts::attach_model).delete(prompts::detach_model),
        )
        // Engagement
        .route("/prompts/:slug/like", put(engagement::set_like))
        .route("/prompts/:slug/save", put(engagement::set_save))
        .route("/prompts/:slug/rating", put(engagement::rate))
        .route("/prompts/:slug/comments", post(engagement::add_comment))
        .route("/comments/:id/status", patch(engagement::set_comment_status))
        .route("/prompts/:slug/review", put(engagement::write_review))
        // Commerce
        .route("/prompts/:slug/unlock", post(commerce::unlock))
        .route("/prompts/:slug/purchase", post(commerce::purchase))
        .route("/plans", post(commerce::create_plan))
        .route("/plans/:code", patch(commerce::update_plan))
        .route("/plans/:code/subscribe", post(commerce::subscribe))
        .route("/subscriptions/me", get(commerce::my_subscription))
        // Taxonomy writes
        .route("/categories", post(taxonomy::create_category))
        .route(
            "/categories/:code",
            patch(taxonomy::update_category).delete(taxonomy::delete_category),
        )
        .route("/tags", post(taxonomy::create_tag))
        .route("/platforms", post(taxonomy::create_platform))
        .route("/platforms/:code/models", post(taxonomy::create_model))
        .route("/sources", post(taxonomy::create_source))
        .route("/levels", post(taxonomy::create_level))
        .route("/authors", post(taxonomy::create_author))
        // RBAC
        .route("/roles", get(rbac::list_roles).post(rbac::create_role))
        .route("/roles/:code", patch(rbac::update_role))
        .route("/roles/:code/grants", get(rbac::list_grants))
        .route(
            "/roles/:code/grants/:permission_code",
            put(rbac::set_grant).delete(rbac::revoke_grant),
        )
        .route(
            "/permissions",
            get(rbac::list_permissions).post(rbac::create_permission),
        )
        .route("/permissions/:code", patch(rbac::update_permission))
        .route(
            "/users/:id/roles/:role_code",
            put(rbac::assign_role).delete(rbac::remove_role),
        )
        // Settings
        .route("/config", get(system_config::list_all))
        .route("/config/:key", put(system_config::set_entry))
        // Dashboards
        .route("/dashboard/stats", get(dashboard::seller_stats))
        .route("/admin/stats", get(dashboard::admin_stats))
        .route("/admin/reconcile", post(dashboard::reconcile))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_user_auth,
        ))
}

pub fn router(state: AppState) -> Router {
    let config = state.config.clone();

    let api_v1 = public_routes()
        .merge(authenticated_routes(&state))
        // Keyed by user id when a token is present, so it runs on every v1 route
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            optional_user_auth,
        ));

    let probes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(probes)
        // Global middleware (order matters: bottom layers run first)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            security_headers_middleware,
        ))
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
