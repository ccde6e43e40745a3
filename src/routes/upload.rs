use std::path::Path;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use futures_util::TryStreamExt as _;
use sanitize_filename::sanitize;

use crate::{config::Config, convert::convert_xlsx_to_csv, errors::ApiError, storage};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResp {
    pub success: bool,
    pub message: String,
    pub download_url: String,
    pub file_name: String,
}

/// Upload pipeline: validate the multipart field, persist it under a
/// unique name, convert on the blocking pool, respond with a download
/// reference. The persisted input is dropped on every exit path; the
/// converter guarantees no partial output survives a failure.
pub async fn upload(
    cfg: web::Data<Config>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let field = payload
        .try_next()
        .await
        .map_err(|_| ApiError::BadRequest("invalid multipart payload".into()))?
        .ok_or_else(|| ApiError::BadRequest("select an .xlsx file to upload".into()))?;

    let (original, data) = read_spreadsheet_field(&cfg, field).await?;

    let stored = storage::unique_upload_name(&original);
    let input = storage::TempArtifact::new(Path::new(&cfg.uploads_dir).join(&stored));
    std::fs::write(input.path(), &data)?;

    let csv_name = storage::converted_name(&original);
    let src = input.path().to_path_buf();
    let dst = Path::new(&cfg.downloads_dir).join(&csv_name);
    let converted = web::block(move || convert_xlsx_to_csv(&src, &dst))
        .await
        .map_err(|e| {
            log::error!("conversion task failed: {e}");
            ApiError::Internal
        })?;

    // input artifact is never retained past this point, success or not
    drop(input);
    converted.map_err(|e| ApiError::Conversion(e.to_string()))?;

    Ok(HttpResponse::Ok().json(UploadResp {
        success: true,
        message: "file converted successfully".into(),
        download_url: format!("/download/{csv_name}"),
        file_name: csv_name,
    }))
}

/// Validates type and size before anything touches disk: the extension
/// or declared MIME must identify an xlsx workbook, and the body may not
/// exceed the configured cap.
async fn read_spreadsheet_field(
    cfg: &Config,
    mut field: actix_multipart::Field,
) -> Result<(String, Vec<u8>), ApiError> {
    let content_disposition = field.content_disposition().cloned();
    let original = content_disposition
        .and_then(|cd| cd.get_filename().map(|s| s.to_string()))
        .unwrap_or_else(|| "upload.xlsx".into());
    let original = sanitize(&original);

    let xlsx_ext = Path::new(&original)
        .extension()
        .and_then(|s| s.to_str())
        .map(|e| e.eq_ignore_ascii_case("xlsx"))
        .unwrap_or(false);
    let xlsx_mime = field
        .content_type()
        .map(|m| m.essence_str() == XLSX_MIME)
        .unwrap_or(false);
    if !xlsx_ext && !xlsx_mime {
        return Err(ApiError::BadRequest(
            "only .xlsx spreadsheets are supported".into(),
        ));
    }

    let mut data: Vec<u8> = Vec::new();
    while let Some(chunk) = field
        .try_next()
        .await
        .map_err(|_| ApiError::BadRequest("upload read error".into()))?
    {
        if data.len() + chunk.len() > cfg.max_upload_size {
            return Err(ApiError::TooLarge(cfg.max_upload_mb()));
        }
        data.extend_from_slice(&chunk);
    }
    Ok((original, data))
}
