mod common;

use axum::{body::to_bytes, body::Body, http::{Request, StatusCode}, Router};
use eventsure_backend::app::app::create_router;
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup_app() -> Router {
    let h = common::harness();
    create_router(h.quotes, h.policies)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

fn step1_body(email: &str) -> Value {
    json!({
        "email": email,
        "residentState": "CA",
        "coverageLevel": 5,
        "liabilityCoverage": "option2",
        "liquorLiability": true,
        "covidDisclosure": true,
        "status": "STEP1",
        "event": { "eventType": "wedding", "eventDate": "2026-06-20", "maxGuests": 120 },
        "venue": { "name": "Rose Hall", "ceremonyLocationType": "indoor" }
    })
}

#[tokio::test]
async fn test_health() {
    let app = setup_app();
    let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_create_quote_handler() {
    let app = setup_app();
    let (status, body) = send(&app, "POST", "/quotes", Some(step1_body("http@example.com"))).await;
    assert_eq!(status, StatusCode::CREATED);
    let number = body["quoteNumber"].as_str().unwrap();
    assert!(number.starts_with("QI-"));
    assert_eq!(body["quote"]["quoteNumber"], number);
    assert_eq!(body["quote"]["totalPremium"], 620);
    assert_eq!(body["quote"]["status"], "STEP1");
    assert_eq!(body["quote"]["event"]["maxGuests"], 120);
    assert_eq!(body["quote"]["venue"]["country"], "United States");
}

#[tokio::test]
async fn test_create_quote_validation_error() {
    let app = setup_app();
    let (status, body) = send(&app, "POST", "/quotes", Some(json!({ "email": "only@example.com" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation");
    assert!(body["message"].as_str().unwrap().contains("residentState"));
}

#[tokio::test]
async fn test_unknown_liability_code_prices_at_zero() {
    let app = setup_app();
    let mut body = step1_body("option4@example.com");
    body["liabilityCoverage"] = json!("option4");
    body["liquorLiability"] = json!(false);
    let (status, body) = send(&app, "POST", "/quotes", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["quote"]["liabilityCoverage"], "none");
    assert_eq!(body["quote"]["liabilityPremium"], 0);
    assert_eq!(body["quote"]["totalPremium"], 355);
}

#[tokio::test]
async fn test_admin_referrer_sets_admin_source() {
    let app = setup_app();
    let mut body = step1_body("referred@example.com");
    body["status"] = json!("COMPLETE");
    body["source"] = json!("CUSTOMER");
    body["referrer"] = json!("/admin/create-quote");
    let (status, body) = send(&app, "POST", "/quotes", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["quote"]["source"], "ADMIN");
}

#[tokio::test]
async fn test_update_quote_handler() {
    let app = setup_app();
    let (_, created) = send(&app, "POST", "/quotes", Some(step1_body("patch@example.com"))).await;
    let number = created["quoteNumber"].as_str().unwrap();

    let patch = json!({ "quoteNumber": number, "step": "STEP2", "event": { "maxGuests": 300 } });
    let (status, body) = send(&app, "PATCH", "/quotes", Some(patch)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quote"]["status"], "STEP2");
    assert_eq!(body["quote"]["liquorLiabilityPremium"], 100);
    assert_eq!(body["quote"]["totalPremium"], 635);

    let (status, body) = send(&app, "PATCH", "/quotes", Some(json!({ "step": "STEP3" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Quote number is required");

    let missing = json!({ "quoteNumber": "QI-01012026-000000", "residentState": "NY" });
    let (status, body) = send(&app, "PATCH", "/quotes", Some(missing)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_get_quotes_handler() {
    let app = setup_app();
    let (_, created) = send(&app, "POST", "/quotes", Some(step1_body("get@example.com"))).await;
    let number = created["quoteNumber"].as_str().unwrap();

    let (status, body) = send(&app, "GET", &format!("/quotes?quoteNumber={}", number), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quote"]["email"], "get@example.com");

    let (status, body) = send(&app, "GET", "/quotes?email=get@example.com", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quote"]["quoteNumber"], number);

    let (status, body) = send(&app, "GET", "/quotes", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["quotes"].as_array().unwrap().len(), 1);
    assert_eq!(body["policies"].as_array().unwrap().len(), 0);

    let (status, _) = send(&app, "GET", "/quotes?id=not-an-object-id", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_convert_and_delete_handlers() {
    let app = setup_app();
    let (_, created) = send(&app, "POST", "/quotes", Some(step1_body("convert@example.com"))).await;
    let number = created["quoteNumber"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "POST", "/policies/convert", Some(json!({ "quoteNumber": number }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Conflict");

    let (status, body) = send(
        &app,
        "POST",
        "/policies/convert",
        Some(json!({ "quoteNumber": number, "forceConvert": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let policy_number = body["policyNumber"].as_str().unwrap().to_string();
    assert!(policy_number.starts_with("WI-POL-"));

    let (status, body) = send(
        &app,
        "POST",
        "/payments",
        Some(json!({ "quoteNumber": number, "amount": 620, "method": "card", "status": "COMPLETED" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["payment"]["amount"], 620);

    let (_, body) = send(&app, "GET", "/policies", None).await;
    assert_eq!(body["policies"][0]["policyNumber"], policy_number.as_str());
    let (_, body) = send(&app, "GET", "/transactions", None).await;
    assert_eq!(body["transactions"][0]["transactionId"], format!("T{}", &number[1..]));

    let (status, body) = send(&app, "DELETE", &format!("/quotes?quoteNumber={}", number), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains(&number));

    let (status, _) = send(&app, "GET", &format!("/quotes?quoteNumber={}", number), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", "/quotes", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
