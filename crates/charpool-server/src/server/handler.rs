//! HTTP routes over [`AllocationService`].
//!
//! Store calls are synchronous (and for redb, hit the disk), so every handler
//! runs its service call on Tokio's blocking pool.

use crate::server::{
    error::ApiError,
    telemetry::{increment_allocations, increment_requests, record_allocation_duration},
};
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::{get, post},
};
use charpool::{
    Allocation, AllocationService, AllocatorConfig, Error, IdentityStore, Participant,
    ThreadRandom, Token,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// The store shared by every request.
pub type SharedStore = Arc<dyn IdentityStore + Send + Sync>;

/// The concrete service type the server runs.
pub type Service = AllocationService<SharedStore, ThreadRandom>;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    service: Arc<Service>,
}

impl AppState {
    pub fn new(store: SharedStore, config: AllocatorConfig) -> Self {
        Self {
            service: Arc::new(AllocationService::new(store, config, ThreadRandom)),
        }
    }

    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Runs `f` against the service on the blocking pool.
    async fn run<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Service) -> charpool::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let service = Arc::clone(&self.service);
        tokio::task::spawn_blocking(move || f(&service))
            .await
            .map_err(|e| ApiError::TaskFailed(e.to_string()))?
            .map_err(ApiError::from)
    }
}

#[derive(Debug, Deserialize)]
pub struct IdRequest {
    pub id: String,
}

/// Body of `POST /random`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AllocationResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Token>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<Allocation> for AllocationResponse {
    fn from(allocation: Allocation) -> Self {
        match allocation {
            Allocation::Allocated { token } => Self {
                ok: true,
                token: Some(token),
                reason: None,
            },
            Allocation::AlreadyAllocated { .. } => Self {
                ok: false,
                token: None,
                reason: Some("already allocated".to_string()),
            },
        }
    }
}

/// Builds the application router with CORS and request tracing.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/login", post(login))
        .route("/participants/{id}", get(participant))
        .route("/random", post(random))
        .route("/getcount", get(remaining))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn root() -> &'static str {
    "Hello API"
}

async fn health() -> &'static str {
    "OK"
}

#[tracing::instrument(skip_all, fields(id = tracing::field::Empty))]
async fn login(
    State(state): State<AppState>,
    body: Result<Json<IdRequest>, JsonRejection>,
) -> Result<Json<Participant>, ApiError> {
    increment_requests("login");
    let Json(body) = body?;
    tracing::Span::current().record("id", body.id.as_str());
    let participant = state.run(move |service| service.login(&body.id)).await?;
    tracing::debug!(allocated = participant.is_allocated(), "Logged in");
    Ok(Json(participant))
}

async fn participant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Participant>, ApiError> {
    increment_requests("participant");
    state
        .run(move |service| {
            service
                .participant(&id)?
                .ok_or(Error::UnknownParticipant { code: id })
        })
        .await
        .map(Json)
}

#[tracing::instrument(skip_all, fields(id = tracing::field::Empty))]
async fn random(
    State(state): State<AppState>,
    body: Result<Json<IdRequest>, JsonRejection>,
) -> Result<Json<AllocationResponse>, ApiError> {
    increment_requests("random");
    let Json(body) = body?;
    tracing::Span::current().record("id", body.id.as_str());
    let start = std::time::Instant::now();

    let allocation = state
        .run(move |service| service.request_allocation(&body.id))
        .await?;

    record_allocation_duration(start.elapsed().as_secs_f64() * 1_000.0);
    match allocation {
        Allocation::Allocated { token } => {
            increment_allocations("allocated");
            tracing::info!(%token, "Token allocated");
        }
        Allocation::AlreadyAllocated { token } => {
            increment_allocations("already_allocated");
            tracing::debug!(%token, "Participant already holds a token");
        }
    }

    Ok(Json(allocation.into()))
}

async fn remaining(State(state): State<AppState>) -> Result<Json<usize>, ApiError> {
    increment_requests("getcount");
    state.run(Service::remaining).await.map(Json)
}
