use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use ledger_core::{
    Block, Ledger, LedgerDocument, LedgerError, LedgerStore, PartyIndex, ValidationReport,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared handle to the node's single ledger.
///
/// Every request runs under the same mutex on the blocking pool, so mining
/// never stalls the runtime and mutations never interleave.
#[derive(Clone)]
pub struct AppState {
    ledger: Arc<Mutex<Ledger>>,
    store: Arc<dyn LedgerStore>,
}

impl AppState {
    pub fn new(ledger: Ledger, store: Arc<dyn LedgerStore>) -> Self {
        Self {
            ledger: Arc::new(Mutex::new(ledger)),
            store,
        }
    }

    async fn read<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Ledger) -> T + Send + 'static,
        T: Send + 'static,
    {
        self.run(move |ledger, _| Ok(f(&*ledger))).await
    }

    /// Applies a mutation to a copy of the ledger and installs it only once
    /// its snapshot is persisted, all under the lock.
    async fn write<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Ledger) -> Result<T, LedgerError> + Send + 'static,
        T: Send + 'static,
    {
        self.run(move |ledger, store| {
            let mut next = ledger.clone();
            let value = f(&mut next)?;
            next.save_to(store)?;
            *ledger = next;
            Ok(value)
        })
        .await
    }

    async fn run<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&mut Ledger, &dyn LedgerStore) -> Result<T, ApiError> + Send + 'static,
        T: Send + 'static,
    {
        let ledger = self.ledger.clone();
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = ledger
                .lock()
                .map_err(|_| ApiError::Internal("ledger lock poisoned".into()))?;
            f(&mut *guard, store.as_ref())
        })
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
    }
}

#[derive(Debug)]
pub enum ApiError {
    Ledger(LedgerError),
    Internal(String),
}

impl From<LedgerError> for ApiError {
    fn from(e: LedgerError) -> Self {
        ApiError::Ledger(e)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        ApiError::Internal(format!("{e:#}"))
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Ledger(
                LedgerError::IndexOutOfRange { .. } | LedgerError::DifficultyOutOfRange { .. },
            ) => StatusCode::BAD_REQUEST,
            ApiError::Ledger(LedgerError::MiningExhausted { .. } | LedgerError::Load(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Ledger(LedgerError::Json(_)) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Ledger(e) => e.to_string(),
            ApiError::Internal(e) => e.clone(),
        };
        if status.is_server_error() {
            error!(%message, "request failed");
        }
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Serialize, Deserialize)]
pub struct Health {
    pub status: String,
}

#[derive(Serialize, Deserialize)]
pub struct Head {
    pub height: usize,
    pub hash: String,
    pub chain_hash: String,
}

#[derive(Serialize, Deserialize)]
pub struct TxIn {
    pub sender: String,
    pub recipient: String,
    pub data: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Appended {
    pub index: usize,
    pub block: Block,
}

#[derive(Serialize, Deserialize)]
pub struct CorruptIn {
    pub index: usize,
    pub data: String,
}

#[derive(Serialize, Deserialize)]
pub struct DifficultyIn {
    pub index: usize,
    pub difficulty: u32,
}

#[derive(Serialize, Deserialize)]
pub struct Repaired {
    pub changed: usize,
}

pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".into(),
    })
}

pub async fn head(State(state): State<AppState>) -> Result<Json<Head>, ApiError> {
    let head = state
        .read(|ledger| Head {
            height: ledger.len() - 1,
            hash: ledger.tip().hash(),
            chain_hash: ledger.chain_hash().to_string(),
        })
        .await?;
    Ok(Json(head))
}

pub async fn chain(State(state): State<AppState>) -> Result<Json<LedgerDocument>, ApiError> {
    Ok(Json(state.read(Ledger::to_document).await?))
}

pub async fn validate(
    State(state): State<AppState>,
) -> Result<Json<ValidationReport>, ApiError> {
    Ok(Json(state.read(Ledger::validate).await?))
}

pub async fn add_tx(
    State(state): State<AppState>,
    Json(tx): Json<TxIn>,
) -> Result<Json<Appended>, ApiError> {
    let appended = state
        .write(move |ledger| {
            let block = ledger
                .add_transaction(&tx.sender, &tx.recipient, &tx.data)?
                .clone();
            Ok(Appended {
                index: ledger.len() - 1,
                block,
            })
        })
        .await?;
    Ok(Json(appended))
}

pub async fn corrupt(
    State(state): State<AppState>,
    Json(req): Json<CorruptIn>,
) -> Result<Json<Block>, ApiError> {
    let block = state
        .write(move |ledger| {
            ledger.corrupt(req.index, req.data)?;
            Ok(ledger.block(req.index)?.clone())
        })
        .await?;
    Ok(Json(block))
}

pub async fn change_difficulty(
    State(state): State<AppState>,
    Json(req): Json<DifficultyIn>,
) -> Result<Json<Block>, ApiError> {
    let block = state
        .write(move |ledger| {
            ledger.change_difficulty(req.index, req.difficulty)?;
            Ok(ledger.block(req.index)?.clone())
        })
        .await?;
    Ok(Json(block))
}

pub async fn repair(State(state): State<AppState>) -> Result<Json<Repaired>, ApiError> {
    let changed = state.write(Ledger::repair).await?;
    Ok(Json(Repaired { changed }))
}

pub async fn senders(State(state): State<AppState>) -> Result<Json<PartyIndex>, ApiError> {
    Ok(Json(state.read(|ledger| ledger.sender_map().clone()).await?))
}

pub async fn receivers(State(state): State<AppState>) -> Result<Json<PartyIndex>, ApiError> {
    Ok(Json(state.read(|ledger| ledger.receiver_map().clone()).await?))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/chain", get(chain))
        .route("/chain/head", get(head))
        .route("/chain/validate", get(validate))
        .route("/chain/corrupt", post(corrupt))
        .route("/chain/repair", post(repair))
        .route("/chain/difficulty", post(change_difficulty))
        .route("/tx", post(add_tx))
        .route("/index/senders", get(senders))
        .route("/index/receivers", get(receivers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
