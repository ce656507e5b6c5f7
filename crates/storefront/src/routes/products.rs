//! Product route handlers.

use axum::{
    Json,
    extract::{FromRequest, Multipart, Request, State, multipart::MultipartError},
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::middleware::RequireAuth;
use crate::models::Product;
use crate::services::ProductForm;
use crate::services::media::ImageUpload;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductAddedResponse {
    pub success: bool,
    pub message: &'static str,
    pub new_product: Product,
}

fn invalid_multipart(err: &MultipartError) -> AppError {
    tracing::debug!(error = %err, "Rejected multipart body");
    AppError::BadRequest("Invalid form data".to_string())
}

/// Collect the listing fields and image files from a multipart body.
async fn read_form(mut multipart: Multipart) -> Result<ProductForm> {
    let mut form = ProductForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| invalid_multipart(&e))? {
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };

        if name == "images" {
            let file_name = field.file_name().unwrap_or("image").to_string();
            let content_type = field.content_type().map(ToString::to_string);
            let bytes = field.bytes().await.map_err(|e| invalid_multipart(&e))?;
            if !bytes.is_empty() {
                form.images.push(ImageUpload {
                    file_name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field.text().await.map_err(|e| invalid_multipart(&e))?;
        match name.as_str() {
            "name" => form.name = Some(value),
            "description" => form.description = Some(value),
            "category" => form.category = Some(value),
            "price" => form.price = Some(value),
            "offerPrice" => form.offer_price = Some(value),
            _ => tracing::debug!(field = %name, "Ignoring unknown form field"),
        }
    }

    Ok(form)
}

/// `POST /api/product/add` (multipart: name, description, category, price,
/// offerPrice, images).
///
/// The caller must be a seller before the body is read.
#[instrument(skip(state, request))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    request: Request,
) -> Result<(StatusCode, Json<ProductAddedResponse>)> {
    state.products().authorize(&user).await?;

    let multipart = Multipart::from_request(request, &state).await.map_err(|e| {
        tracing::debug!(error = %e.body_text(), "Rejected multipart request");
        AppError::BadRequest("Invalid form data".to_string())
    })?;
    let form = read_form(multipart).await?;
    let new_product = state.products().add(&user, form).await?;

    Ok((
        StatusCode::CREATED,
        Json(ProductAddedResponse {
            success: true,
            message: "Upload successful",
            new_product,
        }),
    ))
}
