use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, Path, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection},
    },
    http::{self, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use platform_api::{ApiError, ApiResult};
use platform_db::DbPool;
use platform_files::LocalFileStore;
use products_roster::{
    AvatarUpload, CreateEmployee, Employee, MAX_AVATAR_BYTES, RosterService, UpdateStatus,
};
use sea_orm::{ConnectionTrait, Statement};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;

use crate::config::AppConfig;

/// Headroom over the avatar limit so oversized files reach validation.
const AVATAR_BODY_LIMIT: usize = MAX_AVATAR_BYTES + 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub roster: RosterService,
    pub files: LocalFileStore,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wires the roster service to the pool and the uploads directory,
    /// creating the directory if needed.
    pub async fn build(pool: DbPool, config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let files = LocalFileStore::new(config.uploads_dir.clone());
        files
            .ensure_ready()
            .await
            .context("failed to prepare uploads directory")?;
        let roster = RosterService::new(pool.clone(), Arc::new(files.clone()));
        Ok(Self {
            pool,
            roster,
            files,
            config,
        })
    }
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let uploads = state.files.root().display().to_string();
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, %uploads, "roster server listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    let uploads = ServeDir::new(state.files.root());
    let prefix = state.files.public_prefix().to_string();
    Router::new()
        .route("/health", get(health_handler))
        .route("/employees", get(list_employees).post(create_employee))
        .route("/employees/{id}", delete(delete_employee))
        .route("/employees/{id}/status", patch(update_status))
        .route(
            "/employees/{id}/avatar",
            post(upload_avatar).layer(DefaultBodyLimit::max(AVATAR_BODY_LIMIT)),
        )
        .nest_service(&prefix, uploads)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

type HttpResult<T> = ApiResult<T>;

async fn list_employees(State(state): State<AppState>) -> HttpResult<Json<Vec<Employee>>> {
    state.roster.list().await.map(Json)
}

async fn create_employee(
    State(state): State<AppState>,
    payload: Result<Json<CreateEmployee>, JsonRejection>,
) -> HttpResult<(StatusCode, Json<Employee>)> {
    let Json(input) = payload.map_err(json_rejection)?;
    let employee = state.roster.create(input).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

async fn update_status(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateStatus>, JsonRejection>,
) -> HttpResult<Json<Employee>> {
    let id = parse_id(id)?;
    let Json(input) = payload.map_err(json_rejection)?;
    state.roster.update_status(id, input).await.map(Json)
}

async fn delete_employee(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> HttpResult<StatusCode> {
    let id = parse_id(id)?;
    state.roster.delete(id).await?;
    Ok(StatusCode::OK)
}

async fn upload_avatar(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> HttpResult<(StatusCode, Json<Employee>)> {
    let id = parse_id(id)?;
    let mut multipart =
        multipart.map_err(|rejection| ApiError::validation(rejection.body_text()))?;
    let upload = read_file_field(&mut multipart)
        .await?
        .ok_or_else(|| ApiError::validation("No file uploaded"))?;
    let employee = state.roster.update_avatar(id, upload).await?;
    Ok((StatusCode::CREATED, Json(employee)))
}

/// Reads the first multipart field named `file`.
async fn read_file_field(multipart: &mut Multipart) -> HttpResult<Option<AvatarUpload>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let content_type = field.content_type().map(str::to_string);
        let file_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok(Some(AvatarUpload {
            content_type,
            file_name,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let backend = state.pool.get_database_backend();
    let db_ok = state
        .pool
        .execute(Statement::from_string(backend, "SELECT 1".to_string()))
        .await
        .is_ok();
    Json(HealthResponse {
        ok: db_ok,
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

fn parse_id(id: Result<Path<i64>, PathRejection>) -> HttpResult<i64> {
    id.map(|Path(id)| id)
        .map_err(|_| ApiError::validation("Validation failed (numeric string is expected)"))
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::validation(rejection.body_text())
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::validation(format!(
            "file is too large (maximum is {MAX_AVATAR_BYTES} bytes)"
        ))
    } else {
        ApiError::validation(err.body_text())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        signal(SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
    info!("shutdown signal received");
}
