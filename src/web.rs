use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::config::{Config, TextEncoding};
use crate::error::PipelineError;
use crate::export::{self, CONTENT_TYPE, EXPORT_FILENAME};
use crate::loader;
use crate::pipeline::{self, Analysis};
use crate::types::{DailySummary, MergedRecord, Totals};

/// Largest accepted request body (both uploads together).
pub const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub totals: Totals,
    pub daily: Vec<DailySummary>,
    pub preview: Vec<MergedRecord>,
    pub merged_rows: usize,
}

struct AppState {
    config: Config,
}

pub enum ApiError {
    BadRequest(String),
    Pipeline(PipelineError),
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        ApiError::Pipeline(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Pipeline(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        };
        warn!(%status, error = %message, "request rejected");
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

struct Uploads {
    ads: Vec<u8>,
    orders: Vec<u8>,
}

pub fn router(config: Config) -> Router {
    let state = Arc::new(AppState { config });

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/analyze", post(analyze_handler))
        .route("/api/export", post(export_handler))
        .fallback_service(ServeDir::new("static"))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

pub async fn run(port: u16, config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(config);

    let addr = format!("0.0.0.0:{port}");
    println!("Dashboard at http://localhost:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn read_uploads(mut multipart: Multipart) -> Result<Uploads, ApiError> {
    let bad = |e: axum::extract::multipart::MultipartError| ApiError::BadRequest(e.body_text());

    let mut ads = None;
    let mut orders = None;
    while let Some(field) = multipart.next_field().await.map_err(bad)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "ads" => ads = Some(field.bytes().await.map_err(bad)?.to_vec()),
            "orders" => orders = Some(field.bytes().await.map_err(bad)?.to_vec()),
            _ => {}
        }
    }

    match (ads, orders) {
        (Some(ads), Some(orders)) => Ok(Uploads { ads, orders }),
        _ => Err(ApiError::BadRequest(
            "Please upload both Etsy Ads and Sales CSV files to begin.".into(),
        )),
    }
}

/// One isolated pipeline run over the uploaded bytes.
fn analyze_uploads(config: &Config, uploads: &Uploads) -> Result<Analysis, PipelineError> {
    let ads = loader::load_ads(uploads.ads.as_slice(), config)?;
    let orders = loader::load_orders(uploads.orders.as_slice(), config)?;
    Ok(pipeline::analyze(&ads, &orders, config.aggregation))
}

async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let uploads = read_uploads(multipart).await?;
    let analysis = analyze_uploads(&state.config, &uploads)?;

    Ok(Json(AnalyzeResponse {
        totals: analysis.totals(),
        preview: analysis.preview(state.config.preview_rows).to_vec(),
        merged_rows: analysis.merged.len(),
        daily: analysis.daily,
    }))
}

async fn export_handler(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let uploads = read_uploads(multipart).await?;
    let analysis = analyze_uploads(&state.config, &uploads)?;
    let bytes = export::export(&analysis.merged, &state.config.export_options())?;

    let charset = match state.config.export_encoding {
        TextEncoding::Utf8 => "utf-8",
        TextEncoding::Latin1 => "iso-8859-1",
    };
    let headers = [
        (header::CONTENT_TYPE, format!("{CONTENT_TYPE}; charset={charset}")),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{EXPORT_FILENAME}\"")),
    ];
    Ok((headers, bytes))
}
