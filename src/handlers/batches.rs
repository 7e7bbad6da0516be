use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::error::AppError;
use crate::middleware::auth::FarmerIdentity;
use crate::services::registration::{BatchSubmission, ImageUpload};
use crate::validation;
use crate::AppState;

#[utoipa::path(
    post,
    path = "/farmer/batches",
    responses(
        (status = 201, description = "Batch registered", body = crate::db::models::Batch),
        (status = 400, description = "Invalid submission"),
        (status = 401, description = "Missing or invalid farmer identity"),
        (status = 409, description = "Batch token already registered"),
        (status = 500, description = "Ledger, mint or storage failure")
    ),
    tag = "Batches"
)]
pub async fn register_batch(
    State(state): State<AppState>,
    farmer: FarmerIdentity,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let submission = parse_submission(multipart).await?;

    // A signed submission cannot be un-submitted, so the registration runs
    // to completion even if the caller disconnects mid-flight.
    let service = state.registration.clone();
    let batch = tokio::spawn(async move { service.register(farmer.account_id(), submission).await })
        .await
        .map_err(|err| AppError::Internal(format!("registration task failed: {err}")))??;

    Ok((StatusCode::CREATED, Json(batch)))
}

#[utoipa::path(
    get,
    path = "/farmer/batches",
    responses(
        (status = 200, description = "The farmer's batches, newest first", body = [crate::db::models::Batch]),
        (status = 401, description = "Missing or invalid farmer identity")
    ),
    tag = "Batches"
)]
pub async fn list_batches(
    State(state): State<AppState>,
    farmer: FarmerIdentity,
) -> Result<impl IntoResponse, AppError> {
    if let Some(cached) = state.listings.get(farmer.account_id()) {
        return Ok(Json(cached.as_ref().clone()));
    }

    let batches = state.repository.list_for_farmer(farmer.account_id()).await?;
    let cached = state.listings.store(farmer.account_id(), batches);

    Ok(Json(cached.as_ref().clone()))
}

#[utoipa::path(
    get,
    path = "/farmer/batches/{batch_id}",
    params(("batch_id" = String, Path, description = "Batch identifier")),
    responses(
        (status = 200, description = "One batch", body = crate::db::models::Batch),
        (status = 400, description = "Syntactically invalid batch id"),
        (status = 404, description = "Batch absent or owned by another farmer")
    ),
    tag = "Batches"
)]
pub async fn get_batch(
    State(state): State<AppState>,
    farmer: FarmerIdentity,
    Path(batch_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let batch_id = batch_id.trim();
    // Clients have been observed interpolating an unset variable into the
    // path, which arrives as the literal string "undefined".
    if batch_id.is_empty() || batch_id == "undefined" {
        return Err(AppError::validation("batchId", "Valid Batch ID is required"));
    }

    match state
        .repository
        .find_for_farmer(batch_id, farmer.account_id())
        .await?
    {
        Some(batch) => Ok(Json(batch)),
        None => Err(AppError::NotFound(
            "Batch not found or access denied".to_string(),
        )),
    }
}

async fn parse_submission(mut multipart: Multipart) -> Result<BatchSubmission, AppError> {
    let mut product_name = None;
    let mut quantity_raw = None;
    let mut unit = None;
    let mut image = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::validation("body", format!("malformed form data: {err}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("productName") => {
                product_name = Some(read_text_field(field, "productName").await?);
            }
            Some("quantity") => {
                quantity_raw = Some(read_text_field(field, "quantity").await?);
            }
            Some("unit") => {
                unit = Some(read_text_field(field, "unit").await?);
            }
            Some("image") => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "image".to_string());
                let bytes = field.bytes().await.map_err(|err| {
                    AppError::validation("image", format!("unreadable image field: {err}"))
                })?;
                // An empty file input still submits a zero-byte part.
                if !bytes.is_empty() {
                    image = Some(ImageUpload {
                        filename,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    let product_name = validation::validate_product_name(product_name.as_deref().unwrap_or(""))?;
    let quantity = validation::parse_quantity(quantity_raw.as_deref().unwrap_or(""))?;
    let unit = validation::validate_unit(unit.as_deref().unwrap_or(""))?;

    Ok(BatchSubmission {
        product_name,
        quantity,
        unit,
        image,
    })
}

async fn read_text_field(
    field: axum::extract::multipart::Field<'_>,
    name: &'static str,
) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|err| AppError::validation(name, format!("unreadable field: {err}")))
}
