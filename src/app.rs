use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::client::BackendClient;
use crate::config::Config;
use crate::credentials::CredentialStore;
use crate::downloader::{self, DEFAULT_EXPORT_NAME, ExportTable};
use crate::error::{ClientError, StoreError};
use crate::floors::validate_floor_elevations;
use crate::forms::{
    BuildingGeometryForm, EngineerType, LoadCombinationForm, SiteParamsForm, WindFactorForm,
};
use crate::height_zone::{Zone, ZoneAssignment, compute_height_zones, validate_zone_assignments};
use crate::results::climate_seismic_table;
use crate::saving::{self, ProjectSave, Snapshot};

pub struct AppState {
    pub store: Arc<dyn CredentialStore>,
    pub config: Config,
}

impl AppState {
    fn backend(&self) -> Result<BackendClient, ClientError> {
        Ok(BackendClient::from_store(self.store.as_ref())?.disable_cache(self.config.disable_http_cache))
    }
}

#[derive(Deserialize)]
struct TokenBody {
    token: String,
}

#[derive(Deserialize)]
struct AddressBody {
    address: String,
}

#[derive(Deserialize)]
struct ElevationsBody {
    elevations: Vec<Option<f64>>,
}

#[derive(Deserialize)]
struct AssignmentsBody {
    assignments: Vec<ZoneAssignment>,
}

#[derive(Deserialize)]
struct EngineerBody {
    engineer_type: String,
}

#[derive(Deserialize)]
struct ExportQuery {
    format: Option<String>,
    filename: Option<String>,
}

#[derive(Deserialize)]
struct SnapshotBody {
    save_file_id: Option<i64>,
    project: ProjectSave,
}

#[derive(Serialize)]
struct StatusResponse {
    status: String,
    message: Option<String>,
}

#[derive(Serialize)]
struct ZonesResponse {
    zones: Vec<Zone>,
}

impl StatusResponse {
    fn ok() -> Self {
        StatusResponse {
            status: "ok".to_string(),
            message: None,
        }
    }

    fn error(code: StatusCode, message: impl Into<String>) -> Response {
        (
            code,
            Json(StatusResponse {
                status: "error".to_string(),
                message: Some(message.into()),
            }),
        )
            .into_response()
    }
}

/// Maps a failed workflow to the status the pages act on: form problems
/// are the user's to fix, service problems are reported as a bad gateway.
impl IntoResponse for ClientError {
    fn into_response(self) -> Response {
        let code = match &self {
            ClientError::Form(_) => StatusCode::BAD_REQUEST,
            ClientError::Store(StoreError::Missing(_)) => StatusCode::UNAUTHORIZED,
            ClientError::Store(_) | ClientError::Save(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ClientError::Status { .. } | ClientError::Transport { .. } | ClientError::Decode { .. } => {
                StatusCode::BAD_GATEWAY
            }
        };
        if code == StatusCode::BAD_REQUEST {
            warn!("{}", self);
        } else {
            error!("{}", self);
        }
        StatusResponse::error(code, self.to_string())
    }
}

/// Build the shell's router. Split from [`run`] so it can be driven
/// without a socket.
pub fn router(state: Arc<AppState>) -> Router {
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .route("/api/store-token", post(store_token))
        .route("/api/get-token", get(get_token))
        .route("/api/store-connection-address", post(store_connection_address))
        .route("/api/get-connection-address", get(get_connection_address))
        .route("/api/floor_elevations/validate", post(validate_elevations))
        .route("/api/height_zones", post(height_zones))
        .route("/api/building_geometry", post(building_geometry))
        .route("/api/site_params", post(site_params))
        .route("/api/location", post(location))
        .route("/api/wind_pressure", post(wind_pressure))
        .route("/api/load_combination", post(load_combination))
        .route("/api/save", get(load_project).post(save_project))
        .route("/api/engineer_selection", post(engineer_selection))
        .route("/api/export", post(export_table))
        .route("/api/snapshot", post(export_snapshot))
        .route("/api/snapshot/load", post(load_snapshot))
        .fallback_service(ServeDir::new(static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the shell on the configured address.
///
/// The configured backend URL is stored as the connection address before
/// the first request is served, as the desktop shell does on startup.
pub async fn run(config: Config, store: Arc<dyn CredentialStore>) -> Result<(), Box<dyn std::error::Error>> {
    store.set_connection_address(&config.backend_url)?;
    let bind = config.bind;

    let app_state = Arc::new(AppState { store, config });
    let app = router(app_state);

    let listener = TcpListener::bind(bind).await?;
    info!("Listening on http://{}", bind);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn store_token(State(state): State<Arc<AppState>>, Json(body): Json<TokenBody>) -> Response {
    match state.store.set_token(&body.token) {
        Ok(()) => Json(StatusResponse::ok()).into_response(),
        Err(e) => StatusResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn get_token(State(state): State<Arc<AppState>>) -> Response {
    match state.store.get_token() {
        Ok(token) => Json(serde_json::json!({ "token": token })).into_response(),
        Err(e @ StoreError::Missing(_)) => StatusResponse::error(StatusCode::NOT_FOUND, e.to_string()),
        Err(e) => StatusResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn store_connection_address(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddressBody>,
) -> Response {
    match state.store.set_connection_address(&body.address) {
        Ok(()) => Json(StatusResponse::ok()).into_response(),
        Err(e) => StatusResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn get_connection_address(State(state): State<Arc<AppState>>) -> Response {
    match state.store.get_connection_address() {
        Ok(address) => Json(serde_json::json!({ "address": address })).into_response(),
        Err(e @ StoreError::Missing(_)) => StatusResponse::error(StatusCode::NOT_FOUND, e.to_string()),
        Err(e) => StatusResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn validate_elevations(Json(body): Json<ElevationsBody>) -> impl IntoResponse {
    Json(serde_json::json!({ "valid": validate_floor_elevations(&body.elevations) }))
}

async fn height_zones(Json(body): Json<AssignmentsBody>) -> Response {
    if let Err(e) = validate_zone_assignments(&body.assignments) {
        warn!("{}", e);
        return StatusResponse::error(StatusCode::BAD_REQUEST, format!("invalid height zone data: {}", e));
    }
    Json(ZonesResponse {
        zones: compute_height_zones(&body.assignments),
    })
    .into_response()
}

async fn building_geometry(
    State(state): State<Arc<AppState>>,
    Json(form): Json<BuildingGeometryForm>,
) -> Result<Response, ClientError> {
    let submission = state.backend()?.submit_building_geometry(&form).await?;
    Ok(Json(submission).into_response())
}

async fn site_params(
    State(state): State<Arc<AppState>>,
    Json(form): Json<SiteParamsForm>,
) -> Result<Response, ClientError> {
    state.backend()?.submit_site_params(&form).await?;
    Ok(Json(StatusResponse::ok()).into_response())
}

/// Climate and seismic lookup for the site page, with its result table.
async fn location(
    State(state): State<Arc<AppState>>,
    Json(form): Json<SiteParamsForm>,
) -> Result<Response, ClientError> {
    let request = form.location_request()?;
    let location = state.backend()?.location(&request).await?;
    let table = climate_seismic_table(&location);
    Ok(Json(serde_json::json!({ "location": location, "table": table })).into_response())
}

async fn wind_pressure(
    State(state): State<Arc<AppState>>,
    Json(form): Json<WindFactorForm>,
) -> Result<Json<ExportTable>, ClientError> {
    Ok(Json(state.backend()?.wind_pressure_results(&form).await?))
}

async fn load_combination(
    State(state): State<Arc<AppState>>,
    Json(form): Json<LoadCombinationForm>,
) -> Result<Json<ExportTable>, ClientError> {
    Ok(Json(state.backend()?.load_combination_results(&form).await?))
}

async fn save_project(
    State(state): State<Arc<AppState>>,
    Json(update): Json<ProjectSave>,
) -> Result<Response, ClientError> {
    let id = state.backend()?.save_project(&update).await?;
    Ok(Json(serde_json::json!({ "status": "ok", "id": id })).into_response())
}

/// The saved project, and the site page refilled from it.
async fn load_project(State(state): State<Arc<AppState>>) -> Result<Response, ClientError> {
    let project = state.backend()?.load_project().await?;
    let mut site = SiteParamsForm::default();
    project.apply_to(&mut site);
    Ok(Json(serde_json::json!({ "project": project, "site": site })).into_response())
}

async fn engineer_selection(Json(body): Json<EngineerBody>) -> Result<Response, ClientError> {
    let engineer = EngineerType::select(&body.engineer_type)?;
    Ok(Json(serde_json::json!({
        "engineer_type": engineer,
        "next_page": engineer.next_page(),
    }))
    .into_response())
}

async fn export_table(Query(params): Query<ExportQuery>, Json(table): Json<ExportTable>) -> Response {
    let xlsx = params.format.as_deref() == Some("xlsx");
    let filename = params.filename.unwrap_or_else(|| {
        if xlsx {
            DEFAULT_EXPORT_NAME.replace(".csv", ".xlsx")
        } else {
            DEFAULT_EXPORT_NAME.to_string()
        }
    });

    let (content_type, bytes) = if xlsx {
        match downloader::to_xlsx(&table) {
            Ok(bytes) => (
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
                bytes,
            ),
            Err(e) => return StatusResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    } else {
        ("text/csv", downloader::to_csv(&table).into_bytes())
    };

    attachment(content_type, &filename, bytes)
}

/// Download the given project state as a gzip snapshot.
async fn export_snapshot(Json(body): Json<SnapshotBody>) -> Response {
    let snapshot = Snapshot::new(body.save_file_id, body.project);
    match saving::snapshot_to_bytes(&snapshot) {
        Ok(bytes) => attachment("application/gzip", "project.bin.gz", bytes),
        Err(e) => StatusResponse::error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

async fn load_snapshot(body: Bytes) -> Response {
    if body.is_empty() {
        return StatusResponse::error(StatusCode::BAD_REQUEST, "No file data received");
    }
    match saving::snapshot_from_bytes(&body) {
        Ok(snapshot) => Json(snapshot).into_response(),
        Err(e) => StatusResponse::error(
            StatusCode::BAD_REQUEST,
            format!("Failed to load snapshot: {}", e),
        ),
    }
}

fn attachment(content_type: &'static str, filename: &str, bytes: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', ""));
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from(bytes),
    )
        .into_response()
}
