/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use teampulse_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config)?;
/// let app = teampulse_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::ApiError,
    middleware::{security::SecurityHeadersLayer, team_context::team_context_middleware},
    routes,
};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{get, post, put},
    Extension, Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use teampulse_shared::auth::authorization::require_admin;
use teampulse_shared::auth::middleware::{authenticate, AuthContext};
use teampulse_shared::mail::{HttpMailer, LogMailer, Mailer};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,

    pub config: Arc<Config>,

    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    /// Creates state with the mailer the configuration asks for
    ///
    /// # Errors
    ///
    /// Fails when an HTTP mailer is configured with an invalid endpoint.
    pub fn new(db: PgPool, config: Config) -> anyhow::Result<Self> {
        let mailer: Arc<dyn Mailer> = match (&config.mail.api_url, &config.mail.api_key) {
            (Some(url), Some(key)) => {
                tracing::info!(endpoint = %url, "Using HTTP mailer");
                Arc::new(HttpMailer::new(url.clone(), key.clone(), config.mail.from.clone())?)
            }
            _ => {
                tracing::info!("MAIL_API_URL not set, mails will only be logged");
                Arc::new(LogMailer::new(config.mail.from.clone()))
            }
        };

        Ok(Self::with_mailer(db, config, mailer))
    }

    pub fn with_mailer(db: PgPool, config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            mailer,
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                          # Health check (public)
/// └── /v1/
///     ├── /auth/{register,login,refresh}   # public
///     ├── GET /invitations/:token          # public invitation preview
///     ├── user routes                      # JWT
///     │   ├── /me, /dashboard, /search
///     │   ├── /teams (list, create)
///     │   └── /invitations/:token/accept
///     ├── team routes                      # JWT + team context
///     │   ├── /teams/:team_id/...          # team from the path
///     │   └── /customers, /projects, /tasks, /comments  # current team
///     └── /admin/...                       # JWT + global admin role
/// ```
///
/// # Middleware Stack
///
/// Outermost first: security headers, CORS, compression, tracing, then per-route JWT
/// authentication, team context resolution or the admin check.
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let public_routes = Router::new()
        .nest("/auth", auth_routes)
        .route("/invitations/:token", get(routes::invitations::show_invitation));

    let user_routes = Router::new()
        .route("/me", get(routes::me::me))
        .route("/dashboard", get(routes::me::dashboard))
        .route("/search", get(routes::search::search))
        .route("/teams", get(routes::teams::list_teams).post(routes::teams::create_team))
        .route("/invitations/:token/accept", post(routes::invitations::accept_invitation));

    let team_routes = Router::new()
        .route(
            "/teams/:team_id",
            put(routes::teams::update_team).delete(routes::teams::delete_team),
        )
        .route("/teams/:team_id/switch", post(routes::teams::switch_team))
        .route("/teams/:team_id/members", get(routes::teams::list_members))
        .route("/teams/:team_id/members/roles", put(routes::teams::update_roles))
        .route(
            "/teams/:team_id/members/:user_id",
            axum::routing::delete(routes::teams::remove_member),
        )
        .route(
            "/teams/:team_id/invitations",
            get(routes::invitations::list_invitations).post(routes::invitations::create_invitation),
        )
        .route(
            "/teams/:team_id/invitations/:invitation_id",
            axum::routing::delete(routes::invitations::revoke_invitation),
        )
        .route(
            "/customers",
            get(routes::customers::list_customers).post(routes::customers::create_customer),
        )
        .route(
            "/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/projects/:project_id",
            get(routes::projects::show_project)
                .put(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/projects/:project_id/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:task_id",
            get(routes::tasks::show_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route(
            "/tasks/:task_id/watchers",
            get(routes::tasks::list_watchers)
                .post(routes::tasks::watch_task)
                .delete(routes::tasks::unwatch_task),
        )
        .route("/tasks/:task_id/comments", post(routes::comments::create_comment))
        .route(
            "/comments/:comment_id",
            put(routes::comments::update_comment).delete(routes::comments::delete_comment),
        )
        .route_layer(from_fn_with_state(state.clone(), team_context_middleware));

    let admin_routes = Router::new()
        .route(
            "/users",
            get(routes::admin::list_users).post(routes::admin::create_user),
        )
        .route("/roles", post(routes::admin::create_role))
        .route("/users/:user_id/role", post(routes::admin::update_user_role))
        .route(
            "/users/:user_id/permissions",
            post(routes::admin::update_user_permissions),
        )
        .route_layer(from_fn_with_state(state.clone(), admin_layer));

    let protected_routes = Router::new()
        .merge(user_routes)
        .merge(team_routes)
        .nest("/admin", admin_routes)
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_layer));

    let v1_routes = Router::new().merge(public_routes).merge(protected_routes);

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Validates the bearer token and injects the caller's [`AuthContext`]
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate(req.headers(), state.jwt_secret())?;
    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}

/// Lets only global `admin` / `superadmin` users through
async fn admin_layer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    require_admin(&state.db, auth.user_id).await?;

    Ok(next.run(req).await)
}
