//! HTTP request handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::inference::CarInput;

use super::error::{Result, ServerError};
use super::state::AppState;

#[derive(Debug, Serialize)]
pub struct CompaniesResponse {
    pub company: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct NamesResponse {
    pub company: String,
    pub name: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub predicted_price: f64,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let uptime = chrono::Utc::now().signed_duration_since(state.started_at);
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": uptime.num_seconds(),
    }))
}

/// Companies present in the catalog dataset
pub async fn list_companies(State(state): State<Arc<AppState>>) -> Json<CompaniesResponse> {
    Json(CompaniesResponse {
        company: state.catalog.companies().to_vec(),
    })
}

/// Car names sold under `company_name`
pub async fn list_names(
    State(state): State<Arc<AppState>>,
    Path(company_name): Path<String>,
) -> Json<NamesResponse> {
    let name = state.catalog.names_for(&company_name);
    Json(NamesResponse {
        company: company_name,
        name,
    })
}

pub async fn predict(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<CarInput>, JsonRejection>,
) -> Result<Json<PredictionResponse>> {
    let Json(input) = payload.map_err(|e| ServerError::Unprocessable(e.body_text()))?;

    let predicted_price = state.service.predict(&input)?;
    info!(
        company = %input.company,
        name = %input.name,
        year = input.year,
        predicted_price,
        "Price predicted"
    );
    Ok(Json(PredictionResponse { predicted_price }))
}
