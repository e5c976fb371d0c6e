use actix_multipart::Multipart;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse, Result};
use futures_util::TryStreamExt;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::file::{UploadImageRequest, UploadImageResponse};
use crate::utils::errors::ServiceError;

// Max image size: 5MB
const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

fn ensure_upload_dir(dir: &str) -> Result<PathBuf, ServiceError> {
    let upload_dir = Path::new(dir);
    if !upload_dir.exists() {
        std::fs::create_dir_all(upload_dir).map_err(|e| {
            log::error!("Failed to create upload directory: {}", e);
            ServiceError::InternalError("Failed to create upload directory".to_string())
        })?;
    }
    Ok(upload_dir.to_path_buf())
}

fn file_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default()
}

/// Checks the extension against the accepted image types and returns the MIME type.
fn validate_image(file_name: &str, file_size: usize) -> Result<mime::Mime, ServiceError> {
    if file_size == 0 {
        return Err(ServiceError::ValidationError("Uploaded file is empty".to_string()));
    }
    if file_size > MAX_IMAGE_SIZE {
        return Err(ServiceError::ValidationError(
            "File size exceeds 5MB limit".to_string(),
        ));
    }

    match file_extension(file_name).as_str() {
        "jpg" | "jpeg" => Ok(mime::IMAGE_JPEG),
        "png" => Ok(mime::IMAGE_PNG),
        "gif" => Ok(mime::IMAGE_GIF),
        "webp" => "image/webp"
            .parse()
            .map_err(|_| ServiceError::InternalError("Invalid MIME literal".to_string())),
        other => Err(ServiceError::ValidationError(format!(
            "File type '{}' not allowed, only .jpeg, .jpg, .png, .gif and .webp formats are allowed",
            other
        ))),
    }
}

fn content_type_for(file_name: &str) -> mime::Mime {
    match file_extension(file_name).as_str() {
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "png" => mime::IMAGE_PNG,
        "gif" => mime::IMAGE_GIF,
        "webp" => "image/webp".parse().unwrap_or(mime::APPLICATION_OCTET_STREAM),
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

/// Stored names are generated by `upload_image`; anything that could escape
/// the upload directory is rejected.
fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Upload a profile image
#[utoipa::path(
    post,
    path = "/api/auth/upload-image",
    tag = "auth",
    request_body(
        content = inline(UploadImageRequest),
        description = "Image to upload as multipart/form-data",
        content_type = "multipart/form-data"
    ),
    responses(
        (status = 200, description = "Image uploaded", body = UploadImageResponse),
        (status = 400, description = "Validation error", body = crate::models::auth::ErrorResponse)
    )
)]
pub async fn upload_image(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    mut payload: Multipart,
) -> Result<HttpResponse, ServiceError> {
    log::info!("POST /api/auth/upload-image");

    let upload_dir = ensure_upload_dir(&config.upload_dir)?;

    while let Some(mut field) = payload.try_next().await.map_err(|e| {
        log::error!("Multipart error: {}", e);
        ServiceError::ValidationError("Invalid multipart data".to_string())
    })? {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = match field.content_disposition().and_then(|cd| cd.get_filename()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        log::info!("Processing image: {}", file_name);

        let mut file_data = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(|e| {
            log::error!("File chunk error: {}", e);
            ServiceError::ValidationError("Error reading file data".to_string())
        })? {
            file_data.extend_from_slice(&chunk);
            if file_data.len() > MAX_IMAGE_SIZE {
                return Err(ServiceError::ValidationError(
                    "File size exceeds 5MB limit".to_string(),
                ));
            }
        }

        validate_image(&file_name, file_data.len())?;

        let stored_file_name = format!(
            "{}-{}.{}",
            chrono::Utc::now().timestamp_millis(),
            Uuid::new_v4(),
            file_extension(&file_name)
        );
        let file_path = upload_dir.join(&stored_file_name);

        let mut file = std::fs::File::create(&file_path).map_err(|e| {
            log::error!("Failed to create file: {}", e);
            ServiceError::InternalError("Failed to save file".to_string())
        })?;
        file.write_all(&file_data).map_err(|e| {
            log::error!("Failed to write file: {}", e);
            let _ = std::fs::remove_file(&file_path);
            ServiceError::InternalError("Failed to save file".to_string())
        })?;

        let conn = req.connection_info();
        let image_url = format!(
            "{}://{}/uploads/{}",
            conn.scheme(),
            conn.host(),
            stored_file_name
        );

        log::info!("Image uploaded: {} ({})", file_name, stored_file_name);
        return Ok(HttpResponse::Ok().json(UploadImageResponse { image_url }));
    }

    Err(ServiceError::ValidationError("No file uploaded".to_string()))
}

/// Serve a previously uploaded file
pub async fn serve_upload(
    config: web::Data<AppConfig>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let file_name = path.into_inner();
    log::info!("GET /uploads/{}", file_name);

    if !is_safe_file_name(&file_name) {
        log::warn!("Rejected upload path: {}", file_name);
        return Err(ServiceError::NotFound("File not found".to_string()));
    }

    let file_path = Path::new(&config.upload_dir).join(&file_name);
    if !file_path.exists() {
        return Err(ServiceError::NotFound("File not found".to_string()));
    }

    let file_data = std::fs::read(&file_path).map_err(|e| {
        log::error!("Failed to read file {}: {}", file_path.display(), e);
        ServiceError::InternalError("Failed to read file".to_string())
    })?;

    Ok(HttpResponse::Ok()
        .content_type(content_type_for(&file_name))
        .insert_header(ContentDisposition {
            disposition: DispositionType::Inline,
            parameters: vec![DispositionParam::Filename(file_name)],
        })
        .body(file_data))
}

// Uploaded files are served without a token so image tags can load them.
pub fn file_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/uploads/{file_name}", web::get().to(serve_upload));
}
