//! Upload/download endpoints driven through the router without a socket.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use tower::ServiceExt;

use etsy_ads_dashboard::config::Config;
use etsy_ads_dashboard::web::router;

const BOUNDARY: &str = "etsy-ads-test-boundary";

const ADS: &str = "date,ad_group,spend,clicks\n2024-01-01,Mugs,10,4\n2024-01-02,Mugs,0,0\n";
const ORDERS: &str = "date,order_id,product,revenue\n2024-01-01,ORD-1,Mug,50\n2024-01-02,ORD-2,Mug,30\n";

fn multipart(fields: &[(&str, &str)]) -> String {
    let mut body = String::new();
    for (name, content) in fields {
        body.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{name}.csv\"\r\nContent-Type: text/csv\r\n\r\n{content}\r\n"
        ));
    }
    body.push_str(&format!("--{BOUNDARY}--\r\n"));
    body
}

fn upload(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart(fields)))
        .unwrap()
}

async fn json_body(resp: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health() {
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = router(Config::default()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_analyze_returns_daily_summary() {
    let resp = router(Config::default())
        .oneshot(upload("/api/analyze", &[("ads", ADS), ("orders", ORDERS)]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["merged_rows"], 2);

    let daily = body["daily"].as_array().expect("daily should be an array");
    assert_eq!(daily.len(), 2);
    assert_eq!(daily[0]["date"], "2024-01-01");
    assert_eq!(daily[0]["total_spend"], 10.0);
    assert_eq!(daily[0]["total_revenue"], 50.0);
    assert_eq!(daily[0]["roas"], 5.0);
    assert!(daily[1]["roas"].is_null(), "zero spend ROAS should serialize as null");

    assert_eq!(body["totals"]["spend"], 10.0);
    assert_eq!(body["totals"]["revenue"], 80.0);
    assert_eq!(body["preview"][0]["order_id"], "ORD-1");
}

#[tokio::test]
async fn test_analyze_requires_both_files() {
    let resp = router(Config::default())
        .oneshot(upload("/api/analyze", &[("ads", ADS)]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = json_body(resp).await;
    assert!(body["error"].as_str().unwrap().contains("upload both"));
}

#[tokio::test]
async fn test_analyze_reports_pipeline_errors() {
    let bad_orders = "date,order_id\n2024-01-01,ORD-1\n";
    let resp = router(Config::default())
        .oneshot(upload("/api/analyze", &[("ads", ADS), ("orders", bad_orders)]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(resp).await;
    assert_eq!(body["error"], "orders data: missing required column `revenue`");
}

#[tokio::test]
async fn test_export_download() {
    let resp = router(Config::default())
        .oneshot(upload("/api/export", &[("ads", ADS), ("orders", ORDERS)]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/csv; charset=utf-8");
    assert_eq!(
        resp.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"etsy_ads_merged.csv\""
    );

    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(
        text,
        "date,ad_group,spend,clicks,order_id,product,revenue\n\
         2024-01-01,Mugs,10,4,ORD-1,Mug,50\n\
         2024-01-02,Mugs,0,0,ORD-2,Mug,30\n"
    );
}
