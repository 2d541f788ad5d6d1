use crate::{
    app::{App, AppError},
    bundle::BundleSelector,
    similarity::Neighbor,
    storage::is_contained_relative,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::{path::PathBuf, sync::Arc};
use tokio::signal;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

const PNG_ATTACHMENT: &str = "logos_compare.png";
const ZIP_ATTACHMENT: &str = "exported_logos.zip";
const ASSET_FALLBACK_DIR: &str = "logos";

#[derive(Clone)]
struct SharedState {
    app: Arc<App>,
}

pub fn router(app: Arc<App>) -> Router {
    let static_dir = app.config().resolve(&app.config().static_dir);
    let shared_state = Arc::new(SharedState { app });

    Router::new()
        .route("/api/logos", get(logos))
        .route("/api/similar/*logo", get(similar))
        .route("/api/categories", get(categories))
        .route("/api/export_png", post(export_png))
        .route("/api/export_svgs", post(export_svgs))
        .route("/logos/*path", get(asset))
        .fallback_service(tower_http::services::ServeDir::new(static_dir))
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state)
}

async fn start_app(app: App) -> anyhow::Result<()> {
    let listen = app.config().listen.clone();
    let router = router(Arc::new(app));

    async fn shutdown_signal() {
        let ctrl_c = async {
            if let Err(err) = signal::ctrl_c().await {
                log::error!("failed to install Ctrl+C handler: {err}");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(err) => {
                    log::error!("failed to install signal handler: {err}");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        log::warn!("shutting down");
    }

    let listener = tokio::net::TcpListener::bind(listen.as_str()).await?;
    log::info!("listening on {listen}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn start_daemon(app: App) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(start_app(app))
}

#[derive(Debug)]
struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            AppError::NotFound(_) | AppError::NoAssets => StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::DataFormat { .. } => {
                log::error!("{self:?}");
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::IO(_) | AppError::Image(_) | AppError::Zip(_) | AppError::Other(_) => {
                log::error!("{self:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

// Lets handlers use `?` on anything convertible into `AppError`.
impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PartitionQuery {
    pub set: Option<String>,
    pub category: Option<String>,
}

impl PartitionQuery {
    /// A non-empty category wins over the set; a missing set means `A`.
    fn selector(&self) -> Option<&str> {
        match self.category.as_deref().filter(|c| !c.is_empty()) {
            Some(category) => Some(category),
            None => Some(self.set.as_deref().unwrap_or("A")).filter(|s| !s.is_empty()),
        }
    }
}

async fn logos(
    State(state): State<Arc<SharedState>>,
    Query(query): Query<PartitionQuery>,
) -> Result<Json<Vec<String>>, HttpError> {
    log::debug!("query: {query:?}");

    let Some(selector) = query.selector() else {
        return Ok(Json(Vec::new()));
    };

    tokio::task::block_in_place(|| state.app.logos(selector))
        .map(Json)
        .map_err(Into::into)
}

async fn similar(
    State(state): State<Arc<SharedState>>,
    Path(logo): Path<String>,
    Query(query): Query<PartitionQuery>,
) -> Result<Json<Vec<Neighbor>>, HttpError> {
    log::debug!("logo: {logo}, query: {query:?}");

    let Some(selector) = query.selector() else {
        return Ok(Json(Vec::new()));
    };

    tokio::task::block_in_place(|| state.app.similar(selector, &logo))
        .map(Json)
        .map_err(Into::into)
}

async fn categories(State(state): State<Arc<SharedState>>) -> Json<Vec<String>> {
    Json(tokio::task::block_in_place(|| state.app.categories()))
}

#[derive(Debug, Deserialize)]
pub struct SimilarLogo {
    pub filename: String,
}

#[derive(Debug, Deserialize)]
pub struct ExportPngRequest {
    pub main_logo: String,
    #[serde(default)]
    pub similar_logos: Vec<SimilarLogo>,
}

async fn export_png(
    State(state): State<Arc<SharedState>>,
    Json(payload): Json<ExportPngRequest>,
) -> Result<Response, HttpError> {
    log::debug!("payload: {payload:?}");

    let idents: Vec<String> = std::iter::once(payload.main_logo)
        .chain(payload.similar_logos.into_iter().map(|logo| logo.filename))
        .collect();

    let png = tokio::task::block_in_place(|| state.app.compose(&idents))?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CONTENT_DISPOSITION, attachment(PNG_ATTACHMENT)),
        ],
        png,
    )
        .into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportSvgsRequest {
    pub filenames: Option<Vec<String>>,
    pub letter: Option<String>,
}

impl ExportSvgsRequest {
    fn selector(self) -> BundleSelector {
        match (self.filenames, self.letter) {
            (Some(filenames), _) if !filenames.is_empty() => BundleSelector::Files(filenames),
            (_, Some(letter)) if !letter.is_empty() => BundleSelector::Partition(letter),
            _ => BundleSelector::All,
        }
    }
}

async fn export_svgs(
    State(state): State<Arc<SharedState>>,
    payload: Option<Json<ExportSvgsRequest>>,
) -> Result<Response, HttpError> {
    let payload = payload.map(|Json(payload)| payload).unwrap_or_default();
    log::debug!("payload: {payload:?}");

    let selector = payload.selector();
    let bundle = tokio::task::block_in_place(|| state.app.bundle(&selector))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/zip"));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&attachment(ZIP_ATTACHMENT)).map_err(anyhow::Error::from)?,
    );
    headers.insert(
        HeaderName::from_static("x-bundle-found"),
        HeaderValue::from(bundle.found.len()),
    );
    headers.insert(
        HeaderName::from_static("x-bundle-missing"),
        HeaderValue::from(bundle.missing.len()),
    );

    Ok((headers, bundle.archive).into_response())
}

async fn asset(
    State(state): State<Arc<SharedState>>,
    Path(path): Path<String>,
) -> Result<Response, HttpError> {
    let path = to_ascii(&path);
    let file = asset_path(&state.app, &path)?;

    let bytes = tokio::task::block_in_place(|| match std::fs::read(&file) {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("asset {} not found", file.display());
            Err(AppError::NotFound(path.clone()))
        }
        Err(err) => Err(err.into()),
    })?;

    let content_type = content_type(&path, &bytes);
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

/// File backing `/logos/<path>`: under the logo root when the path names
/// it, otherwise under the shared `logos` directory.
fn asset_path(app: &App, path: &str) -> Result<PathBuf, AppError> {
    if !is_contained_relative(std::path::Path::new(path)) {
        return Err(AppError::InvalidInput(format!("invalid asset path {path:?}")));
    }

    let config = app.config();
    let logo_root = config.logo_root.trim_end_matches('/');
    if path.starts_with(&format!("{logo_root}/")) {
        Ok(config.resolve(path))
    } else {
        Ok(config.resolve(ASSET_FALLBACK_DIR).join(path))
    }
}

/// ASCII form of `path`: accents are stripped after compatibility
/// decomposition, anything still outside ASCII is dropped.
fn to_ascii(path: &str) -> String {
    path.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(char::is_ascii)
        .collect()
}

fn content_type(path: &str, bytes: &[u8]) -> String {
    if let Some(kind) = infer::get(bytes) {
        return kind.mime_type().to_string();
    }
    if path.to_ascii_lowercase().ends_with(".svg") {
        return "image/svg+xml".to_string();
    }
    "application/octet-stream".to_string()
}

fn attachment(filename: &str) -> String {
    format!("attachment; filename=\"{filename}\"")
}
