use actix_files::NamedFile;
use actix_web::HttpResponse;

use crate::errors::ApiError;

pub async fn index() -> Result<NamedFile, ApiError> {
    NamedFile::open_async("public/index.html")
        .await
        .map_err(|_| ApiError::NotFound)
}

/// Catch-all for unmatched routes; keeps the error surface JSON-only.
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "success": false,
        "message": "requested resource does not exist"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, web, App};

    #[actix_web::test]
    async fn unmatched_route_returns_json_404() {
        let app = test::init_service(
            App::new().default_service(web::route().to(not_found)),
        )
        .await;

        let req = test::TestRequest::get().uri("/no/such/route").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 404);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
    }
}
