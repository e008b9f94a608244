//! Web interface for receipt upload, review and export.

pub mod error;
pub mod forms;
pub mod handlers;
pub mod views;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use rcpt_core::{
    HeuristicReceiptParser, OcrBackend, RcptConfig, ReceiptParser, ReceiptStore, TesseractOcr,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use handlers::{api, pages};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: ReceiptStore,
    pub config: Arc<RcptConfig>,
    pub parser: Arc<dyn ReceiptParser>,
    pub ocr: Option<Arc<dyn OcrBackend>>,
}

impl AppState {
    /// Build parser and OCR backend from the configuration.
    pub fn new(store: ReceiptStore, config: RcptConfig) -> Self {
        let parser = Arc::new(HeuristicReceiptParser::from_config(&config.extraction));
        let ocr = TesseractOcr::from_config(&config.ocr).map(|o| Arc::new(o) as Arc<dyn OcrBackend>);

        Self {
            store,
            config: Arc::new(config),
            parser,
            ocr,
        }
    }

    /// Replace the OCR backend.
    pub fn with_ocr(mut self, ocr: Option<Arc<dyn OcrBackend>>) -> Self {
        self.ocr = ocr;
        self
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let max_upload = state.config.server.max_upload_bytes;

    Router::new()
        .route("/", get(pages::index))
        .route("/health", get(api::health_check))
        .route("/static/styles.css", get(api::stylesheet))
        .route("/upload", post(pages::upload))
        .route("/export", get(pages::export_all))
        .route("/receipt/:id", get(pages::show_receipt))
        .route("/receipt/:id/export", get(pages::export_receipt))
        .route("/receipt/:id/update", post(pages::update_receipt))
        .route("/receipt/:id/delete", post(pages::delete_receipt))
        .route("/receipt/:id/reparse", post(pages::reparse_receipt))
        .route("/receipt/:id/items/add", post(pages::add_item))
        .route("/receipt/:id/items/:item_id/update", post(pages::update_item))
        .route("/receipt/:id/items/:item_id/delete", post(pages::delete_item))
        .route("/api/receipts", get(api::list_receipts))
        .route("/api/receipts/:id", get(api::get_receipt))
        .route("/api/parse", post(api::parse_text))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Open the database and serve until the process is stopped.
pub async fn serve(config: RcptConfig) -> rcpt_core::Result<()> {
    tokio::fs::create_dir_all(&config.storage.upload_dir).await?;
    let store = ReceiptStore::connect(&config.storage.database_path).await?;

    let addr = config.bind_addr();
    let state = AppState::new(store, config);
    if state.ocr.is_none() {
        info!("OCR is disabled; image uploads will need manual entry");
    }

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);
    axum::serve(listener, router(state)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use image::DynamicImage;
    use pretty_assertions::assert_eq;
    use rcpt_core::error::OcrError;
    use rcpt_core::ingest::OcrResult;
    use tower::ServiceExt;

    const CORNER_STORE: &str = "Corner Store\n2024-01-15\nMilk 3.50\nBread 2.00\nTotal 5.50";
    const BOUNDARY: &str = "rcpt-test-boundary";

    struct NoOcr;

    impl OcrBackend for NoOcr {
        fn name(&self) -> &str {
            "none"
        }

        fn recognize(&self, _image: &DynamicImage) -> Result<OcrResult, OcrError> {
            Err(OcrError::Disabled)
        }
    }

    async fn test_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RcptConfig::default();
        config.storage.upload_dir = dir.path().join("uploads");

        let store = ReceiptStore::in_memory().await.unwrap();
        let state = AppState::new(store, config).with_ocr(Some(Arc::new(NoOcr)));
        (state, dir)
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn location(response: &Response) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    fn multipart_upload(filename: &str, content: &str) -> Request<Body> {
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"receipt\"; filename=\"{f}\"\r\n\
             Content-Type: text/plain\r\n\r\n{c}\r\n--{b}--\r\n",
            b = BOUNDARY,
            f = filename,
            c = content
        );
        Request::post("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn form(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (state, _dir) = test_state().await;
        let response = router(state).oneshot(get_req("/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "OK");
    }

    #[tokio::test]
    async fn test_upload_parses_and_redirects() {
        let (state, dir) = test_state().await;
        let app = router(state.clone());

        let response = app
            .clone()
            .oneshot(multipart_upload("my receipt.txt", CORNER_STORE))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/receipt/1");

        let receipt = state.store.get_receipt(1).await.unwrap().unwrap();
        assert_eq!(receipt.store_name.as_deref(), Some("Corner Store"));
        assert_eq!(receipt.items.len(), 2);

        let saved: Vec<_> = std::fs::read_dir(dir.path().join("uploads"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(saved.len(), 1);
        assert!(saved[0].ends_with("_my_receipt.txt"));

        let page = body_text(app.oneshot(get_req("/receipt/1")).await.unwrap()).await;
        assert!(page.contains("Corner Store"));
        assert!(page.contains("Bread"));
    }

    #[tokio::test]
    async fn test_unknown_receipt_redirects_home() {
        let (state, _dir) = test_state().await;
        let response = router(state).oneshot(get_req("/receipt/99")).await.unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn test_edit_flow() {
        let (state, _dir) = test_state().await;
        let app = router(state.clone());
        let draft = state.parser.parse(CORNER_STORE);
        let id = state.store.insert_draft(&draft).await.unwrap();

        let response = app
            .clone()
            .oneshot(form(
                &format!("/receipt/{}/update", id),
                "store_name=Corner+Shop&purchase_date=2024-02-01&total=6.00",
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        app.clone()
            .oneshot(form(
                &format!("/receipt/{}/items/add", id),
                "description=Eggs&quantity=6&unit_price=0.40",
            ))
            .await
            .unwrap();
        app.clone()
            .oneshot(form(&format!("/receipt/{}/items/1/delete", id), ""))
            .await
            .unwrap();

        let receipt = state.store.get_receipt(id).await.unwrap().unwrap();
        assert_eq!(receipt.store_name.as_deref(), Some("Corner Shop"));
        assert_eq!(receipt.purchase_date.map(|d| d.to_string()).as_deref(), Some("2024-02-01"));
        let names: Vec<&str> = receipt.items.iter().map(|i| i.description.as_str()).collect();
        assert_eq!(names, vec!["Bread", "Eggs"]);

        let bad = app
            .oneshot(form(&format!("/receipt/{}/update", id), "total=abc"))
            .await
            .unwrap();
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_export_csv() {
        let (state, _dir) = test_state().await;
        let id = state
            .store
            .insert_draft(&state.parser.parse(CORNER_STORE))
            .await
            .unwrap();

        let response = router(state)
            .oneshot(get_req(&format!("/receipt/{}/export", id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );

        let csv = body_text(response).await;
        assert!(csv.starts_with("receipt_id,store_name,purchase_date,total,item_description"));
        assert!(csv.contains("Corner Store,2024-01-15,5.50,Milk,1,3.50,3.50"));
    }

    #[tokio::test]
    async fn test_api_parse_and_fetch() {
        let (state, _dir) = test_state().await;
        let app = router(state.clone());

        let response = app
            .clone()
            .oneshot(Request::post("/api/parse").body(Body::from(CORNER_STORE)).unwrap())
            .await
            .unwrap();
        let draft: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(draft["store_name"], "Corner Store");
        assert_eq!(draft["total"], "5.50");
        assert_eq!(draft["items"].as_array().unwrap().len(), 2);
        assert!(state.store.list_receipts().await.unwrap().is_empty());

        let missing = app.oneshot(get_req("/api/receipts/5")).await.unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
