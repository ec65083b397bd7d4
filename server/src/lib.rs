use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use wordstat_core::{
    AnalyticsError, Analyzer, AnalyzerConfig, CollectionId, CorpusStore, DocId, DocumentRef, EncodedDocument,
    Metrics, SledStore, UploadReport, UserId, WordStat,
};

pub const USER_HEADER: &str = "X-User-Id";

#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer<SledStore>>,
}

#[derive(Deserialize)]
pub struct UploadParams {
    #[serde(default = "default_name")]
    pub name: String,
}
fn default_name() -> String { "untitled.txt".into() }

#[derive(Deserialize)]
pub struct CreateCollection {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Serialize)]
pub struct CollectionSummary {
    pub collection_id: CollectionId,
    pub collection_name: String,
    pub description: Option<String>,
    pub document_ids: Vec<DocId>,
}

#[derive(Serialize)]
pub struct DocumentContent {
    pub id: DocId,
    pub name: String,
    pub content: String,
    pub unique_words: u32,
    pub created_at: String,
}

pub enum ApiError {
    Unauthorized(&'static str),
    Analytics(AnalyticsError),
}

impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self { ApiError::Analytics(err) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.to_string()),
            ApiError::Analytics(err) => {
                let status = match &err {
                    AnalyticsError::DecodeFailure
                    | AnalyticsError::EmptyCorpus
                    | AnalyticsError::CorruptEncoding { .. }
                    | AnalyticsError::InvalidCodeTable(_) => StatusCode::BAD_REQUEST,
                    AnalyticsError::NotFound { .. } => StatusCode::NOT_FOUND,
                    AnalyticsError::Store(_) | AnalyticsError::Config(_) => {
                        tracing::error!(error = %err, "request failed");
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                (status, err.to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Open (or create) the sled store under `data_dir` and build the router.
pub fn open_app(data_dir: &str, config: AnalyzerConfig) -> Result<Router> {
    let store = SledStore::open(data_dir)?;
    let analyzer = Analyzer::new(store, config)?;
    Ok(build_app(analyzer))
}

pub fn build_app(analyzer: Analyzer<SledStore>) -> Router {
    let app_state = AppState { analyzer: Arc::new(analyzer) };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/documents", get(list_documents).post(upload_document))
        .route("/documents/:doc_id", get(get_document).delete(delete_document))
        .route("/documents/:doc_id/statistics", get(document_statistics))
        .route("/documents/:doc_id/huffman", get(document_huffman))
        .route("/collections", get(list_collections).post(create_collection))
        .route("/collections/:collection_id", get(collection_documents))
        .route("/collections/:collection_id/statistics", get(collection_statistics))
        .route(
            "/collections/:collection_id/documents/:doc_id",
            post(add_to_collection).delete(remove_from_collection),
        )
        .route("/metrics", get(metrics))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn user_id(headers: &HeaderMap) -> ApiResult<UserId> {
    let raw = headers
        .get(USER_HEADER)
        .ok_or(ApiError::Unauthorized("missing X-User-Id"))?;
    raw.to_str()
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .ok_or(ApiError::Unauthorized("invalid X-User-Id"))
}

pub async fn upload_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<UploadReport>)> {
    let user = user_id(&headers)?;
    let report = state.analyzer.analyze_upload(user, &params.name, &body)?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn list_documents(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Vec<DocumentRef>>> {
    let user = user_id(&headers)?;
    Ok(Json(state.analyzer.store().list_documents(user)?))
}

pub async fn get_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(doc_id): Path<DocId>,
) -> ApiResult<Json<DocumentContent>> {
    let user = user_id(&headers)?;
    let doc = state.analyzer.store().get_document(user, doc_id)?;
    Ok(Json(DocumentContent {
        id: doc.id,
        name: doc.name,
        content: doc.content,
        unique_words: doc.unique_words,
        created_at: doc.created_at,
    }))
}

pub async fn delete_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(doc_id): Path<DocId>,
) -> ApiResult<StatusCode> {
    let user = user_id(&headers)?;
    state.analyzer.delete_document(user, doc_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn document_statistics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(doc_id): Path<DocId>,
) -> ApiResult<Json<Vec<WordStat>>> {
    let user = user_id(&headers)?;
    Ok(Json(state.analyzer.document_statistics(user, doc_id)?))
}

pub async fn document_huffman(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(doc_id): Path<DocId>,
) -> ApiResult<Json<EncodedDocument>> {
    let user = user_id(&headers)?;
    Ok(Json(state.analyzer.encode_document(user, doc_id)?))
}

pub async fn list_collections(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<CollectionSummary>>> {
    let user = user_id(&headers)?;
    let store = state.analyzer.store();
    let mut out = Vec::new();
    for collection in store.list_collections(user)? {
        let document_ids = store.list_documents_in_collection(collection.id)?.into_iter().map(|d| d.id).collect();
        out.push(CollectionSummary {
            collection_id: collection.id,
            collection_name: collection.name,
            description: collection.description,
            document_ids,
        });
    }
    Ok(Json(out))
}

pub async fn create_collection(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateCollection>,
) -> ApiResult<(StatusCode, Json<wordstat_core::Collection>)> {
    let user = user_id(&headers)?;
    let collection = state.analyzer.store().create_collection(user, &req.name, req.description.as_deref())?;
    tracing::info!(user, collection = collection.id, "created collection");
    Ok((StatusCode::CREATED, Json(collection)))
}

pub async fn collection_documents(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(collection_id): Path<CollectionId>,
) -> ApiResult<Json<Vec<DocId>>> {
    let user = user_id(&headers)?;
    let store = state.analyzer.store();
    let collection = store.get_collection(user, collection_id)?;
    Ok(Json(store.list_documents_in_collection(collection.id)?.into_iter().map(|d| d.id).collect()))
}

pub async fn collection_statistics(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(collection_id): Path<CollectionId>,
) -> ApiResult<Json<Vec<WordStat>>> {
    let user = user_id(&headers)?;
    Ok(Json(state.analyzer.collection_statistics(user, collection_id)?))
}

pub async fn add_to_collection(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((collection_id, doc_id)): Path<(CollectionId, DocId)>,
) -> ApiResult<StatusCode> {
    let user = user_id(&headers)?;
    state.analyzer.store().add_to_collection(user, collection_id, doc_id)?;
    tracing::info!(user, collection = collection_id, doc = doc_id, "added document to collection");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn remove_from_collection(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((collection_id, doc_id)): Path<(CollectionId, DocId)>,
) -> ApiResult<StatusCode> {
    let user = user_id(&headers)?;
    state.analyzer.store().remove_from_collection(user, collection_id, doc_id)?;
    tracing::info!(user, collection = collection_id, doc = doc_id, "removed document from collection");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn metrics(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Json<Metrics>> {
    let user = user_id(&headers)?;
    Ok(Json(state.analyzer.metrics(user)?))
}
