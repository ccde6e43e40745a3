use std::path::Path;
use std::time::Duration;

use actix_files::NamedFile;
use actix_web::http::header::{self, HeaderValue};
use actix_web::{rt, web, HttpRequest, HttpResponse};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use sanitize_filename::sanitize;

use crate::{config::Config, errors::ApiError, storage};

/// Serves a converted artifact as an attachment, then schedules its
/// deletion after a short grace delay so the delete never races the
/// transfer's own close. References are single-use by delete-then-404;
/// two downloads landing inside the grace window may both succeed.
pub async fn download(
    cfg: web::Data<Config>,
    req: HttpRequest,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let reference = sanitize(&path.into_inner());
    let file_path = Path::new(&cfg.downloads_dir).join(&reference);
    if !file_path.is_file() {
        return Err(ApiError::NotFound);
    }

    let named = NamedFile::open_async(&file_path)
        .await
        .map_err(|_| ApiError::NotFound)?;
    let mut resp = named.into_response(&req);

    let encoded = utf8_percent_encode(&reference, NON_ALPHANUMERIC);
    let disposition = format!("attachment; filename*=UTF-8''{encoded}");
    resp.headers_mut().insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).map_err(|_| ApiError::Internal)?,
    );
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );

    let grace = Duration::from_secs(cfg.download_grace_secs);
    rt::spawn(async move {
        rt::time::sleep(grace).await;
        storage::remove_quiet(&file_path);
    });

    Ok(resp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> Config {
        let cfg = Config {
            listen: "127.0.0.1:0".into(),
            uploads_dir: dir.path().join("uploads").to_string_lossy().into_owned(),
            downloads_dir: dir.path().join("downloads").to_string_lossy().into_owned(),
            max_upload_size: 10 * 1024 * 1024,
            janitor_interval_secs: 30 * 60,
            download_grace_secs: 0,
        };
        std::fs::create_dir_all(&cfg.uploads_dir).unwrap();
        std::fs::create_dir_all(&cfg.downloads_dir).unwrap();
        cfg
    }

    async fn get(
        cfg: &Config,
        uri: &str,
    ) -> actix_web::dev::ServiceResponse {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(cfg.clone()))
                .route("/download/{filename}", web::get().to(download)),
        )
        .await;
        let req = test::TestRequest::get().uri(uri).to_request();
        test::call_service(&app, req).await
    }

    #[actix_web::test]
    async fn download_streams_csv_then_deletes_it() {
        let dir = TempDir::new().unwrap();
        let cfg = test_config(&dir);
        let artifact = Path::new(&cfg.downloads_dir).join("data_converted.csv");
        std::fs::write(&artifact, "a,b\n1,2\n").unwrap();

        let resp = get(&cfg, "/download/data_converted.csv").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/csv; charset=utf-8"
        );
        let disposition = resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(disposition.starts_with("attachment; filename*=UTF-8''"));
        let body = test::read_body(resp).await;
        assert_eq!(&body[..], b"a,b\n1,2\n");

        // zero grace in tests; give the deletion task a moment to run
        rt::time::sleep(Duration::from_millis(100)).await;
        assert!(!artifact.exists());

        let resp = get(&cfg, "/download/data_converted.csv").await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_web::test]
    async fn unknown_reference_returns_404() {
        let dir = TempDir::new().unwrap();
        let cfg = test_config(&dir);

        let resp = get(&cfg, "/download/never_issued.csv").await;
        assert_eq!(resp.status(), 404);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }

    #[actix_web::test]
    async fn traversal_references_cannot_escape_downloads_dir() {
        let dir = TempDir::new().unwrap();
        let cfg = test_config(&dir);
        // reachable only via "..", which sanitize strips
        std::fs::write(dir.path().join("secret.csv"), "secret\n").unwrap();

        let resp = get(&cfg, "/download/..%2Fsecret.csv").await;
        assert_eq!(resp.status(), 404);
        assert!(dir.path().join("secret.csv").exists());
    }

    #[actix_web::test]
    async fn non_ascii_reference_is_percent_encoded_in_headers() {
        let dir = TempDir::new().unwrap();
        let cfg = test_config(&dir);
        let artifact = Path::new(&cfg.downloads_dir).join("销售报表_converted.csv");
        std::fs::write(&artifact, "a,b\n").unwrap();

        let resp = get(&cfg, "/download/%E9%94%80%E5%94%AE%E6%8A%A5%E8%A1%A8_converted.csv").await;
        assert_eq!(resp.status(), 200);
        let disposition = resp
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(disposition.contains("filename*=UTF-8''"));
        assert!(disposition.is_ascii());
    }
}
