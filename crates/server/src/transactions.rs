//! Transactions API endpoints

use api_types::transaction::{
    ConvertQuery, ConvertedTransactionView, TransactionCreated, TransactionNew, TransactionView,
};
use axum::{
    Extension, Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use engine::{
    ConvertedTransaction, CreateTransactionCmd, DATE_FORMAT, EngineError, MoneyCents,
    RequestContext, Transaction,
};
use rust_decimal::{
    Decimal,
    prelude::{FromPrimitive, ToPrimitive},
};

use crate::{ServerError, server::ServerState};

fn money(value: MoneyCents) -> f64 {
    value.to_decimal().to_f64().unwrap_or_default()
}

fn view(tx: Transaction) -> TransactionView {
    TransactionView {
        id: tx.id.to_string(),
        description: tx.description,
        date: tx.date.format(DATE_FORMAT).to_string(),
        amount: money(tx.amount),
    }
}

fn converted_view(converted: ConvertedTransaction) -> ConvertedTransactionView {
    ConvertedTransactionView {
        id: converted.id.to_string(),
        description: converted.description,
        date: converted.date.format(DATE_FORMAT).to_string(),
        original_amount: money(converted.original_amount),
        currency: converted.currency.to_string(),
        exchange_rate: converted.exchange_rate.to_f64().unwrap_or_default(),
        converted_amount: money(converted.converted_amount),
        rate_date: converted.rate_date.format(DATE_FORMAT).to_string(),
    }
}

pub async fn create(
    Extension(ctx): Extension<RequestContext>,
    State(state): State<ServerState>,
    payload: Result<Json<TransactionNew>, JsonRejection>,
) -> Result<(StatusCode, Json<TransactionCreated>), ServerError> {
    let Json(payload) =
        payload.map_err(|rejection| ServerError::invalid_request(&ctx, rejection.body_text()))?;

    let amount = Decimal::from_f64(payload.amount).ok_or_else(|| {
        ServerError::engine(
            &ctx,
            EngineError::InvalidAmount(format!("{} is not a number", payload.amount)),
        )
    })?;
    let cmd = CreateTransactionCmd::new(payload.description, payload.date, amount);

    let id = state
        .engine
        .create_transaction(&ctx, cmd)
        .await
        .map_err(|err| ServerError::engine(&ctx, err))?;

    Ok((StatusCode::CREATED, Json(TransactionCreated { id })))
}

pub async fn get(
    Extension(ctx): Extension<RequestContext>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<TransactionView>, ServerError> {
    let tx = state
        .engine
        .transaction(&ctx, &id)
        .await
        .map_err(|err| ServerError::engine(&ctx, err))?;

    Ok(Json(view(tx)))
}

pub async fn convert(
    Extension(ctx): Extension<RequestContext>,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    query: Result<Query<ConvertQuery>, QueryRejection>,
) -> Result<Json<ConvertedTransactionView>, ServerError> {
    let Query(query) =
        query.map_err(|rejection| ServerError::invalid_request(&ctx, rejection.body_text()))?;
    let currency = query.currency.unwrap_or_default();

    let converted = state
        .engine
        .convert(&ctx, &id, &currency)
        .await
        .map_err(|err| ServerError::engine(&ctx, err))?;

    Ok(Json(converted_view(converted)))
}
