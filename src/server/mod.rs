// HTTP transport: parses query/path parameters, calls the ledger service,
// and renders `{"status": ...}` / `{"error": ...}` bodies.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::application::{AppError, LedgerService};
use crate::domain::{AccountId, format_cents, parse_cents};

type SharedService = Arc<LedgerService>;

#[derive(Debug, Deserialize)]
pub struct CreateAccountParams {
    pub name: String,
    pub initial_balance: String,
}

#[derive(Debug, Deserialize)]
pub struct DepositParams {
    pub id: AccountId,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct TransferParams {
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub amount: String,
}

/// An [`AppError`] rendered as `{"error": reason}` with a matching status.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::InvalidInput(_) | AppError::InvalidIdFormat(_) | AppError::SameAccount(_) => {
                StatusCode::BAD_REQUEST
            }
            e if e.is_not_found() => StatusCode::NOT_FOUND,
            AppError::InsufficientBalance { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let reason = match &self.0 {
            AppError::Database(e) => {
                error!(error = ?e, "storage failure while serving request");
                "Internal storage error".to_string()
            }
            e => e.to_string(),
        };

        (status, Json(json!({ "error": reason }))).into_response()
    }
}

/// Build the router with a permissive cross-origin policy.
pub fn router(service: SharedService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/create-account", post(create_account))
        .route("/balance/:id", get(get_balance))
        .route("/deposit", put(deposit))
        .route("/transfer", put(transfer))
        .layer(cors)
        .with_state(service)
}

/// Serve until Ctrl+C, then close the store.
pub async fn serve(service: SharedService, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(addr = %listener.local_addr()?, "HTTP server listening");

    axum::serve(listener, router(service.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    service.close().await;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            error!(error = %e, "failed to listen for Ctrl+C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}

fn rejected(reason: String) -> ApiError {
    ApiError(AppError::InvalidInput(reason))
}

// ========================
// Handlers
// ========================

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn create_account(
    State(service): State<SharedService>,
    params: Result<Query<CreateAccountParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params.map_err(|r| rejected(r.body_text()))?;
    let initial_balance = parse_cents(&params.initial_balance).map_err(AppError::from)?;

    let account = service
        .create_account(params.name, initial_balance)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Account created",
        "id": account.id,
        "name": account.name,
    })))
}

async fn get_balance(
    State(service): State<SharedService>,
    id: Result<Path<AccountId>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let Path(id) = id.map_err(|r| rejected(r.body_text()))?;
    let account = service.get_balance(id).await?;

    Ok(Json(json!({
        "status": "success",
        "id": account.id,
        "name": account.name,
        "balance": format_cents(account.balance),
    })))
}

async fn deposit(
    State(service): State<SharedService>,
    params: Result<Query<DepositParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params.map_err(|r| rejected(r.body_text()))?;
    let amount = parse_cents(&params.amount).map_err(AppError::from)?;

    let receipt = service.deposit(params.id, amount).await?;

    Ok(Json(json!({
        "status": "success",
        "message": format!("Successfully deposited {}", format_cents(receipt.amount)),
    })))
}

async fn transfer(
    State(service): State<SharedService>,
    params: Result<Query<TransferParams>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(params) = params.map_err(|r| rejected(r.body_text()))?;
    let amount = parse_cents(&params.amount).map_err(AppError::from)?;

    service
        .transfer(params.sender_id, params.receiver_id, amount)
        .await?;

    Ok(Json(json!({
        "status": "success",
        "message": "Transfer completed",
    })))
}
