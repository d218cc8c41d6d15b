use super::batch::substitute_vars;
use super::*;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::{get, post}, Json, Router};
use mbote_core::config::WhatsAppSettings;
use mbote_core::message::{MediaKind, MediaRef, OutboundRequest, WhatsAppConfig};
use mbote_memory::Store;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type CapturedBody = Arc<Mutex<Option<Value>>>;

/// Bind a stub Graph API server on a random loopback port.
async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn ok_handler(State(captured): State<CapturedBody>, Json(body): Json<Value>) -> Json<Value> {
    *captured.lock().unwrap() = Some(body);
    Json(json!({
        "messaging_product": "whatsapp",
        "messages": [{"id": "wamid.test.1"}],
    }))
}

async fn reject_handler() -> impl IntoResponse {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": {"message": "Invalid parameter", "type": "GraphMethodException", "code": 100}
        })),
    )
}

async fn expired_token_handler() -> impl IntoResponse {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": {"message": "Session has expired", "type": "OAuthException", "code": 190}
        })),
    )
}

/// Stub server answering sends with a fixed wamid; returns the base URL
/// and a handle on the last request body.
async fn ok_stub() -> (String, CapturedBody) {
    let captured: CapturedBody = Arc::new(Mutex::new(None));
    let router = Router::new()
        .route("/10455/messages", post(ok_handler))
        .route("/media/sample.jpg", get(|| async { "jpeg" }))
        .with_state(captured.clone());
    (spawn_stub(router).await, captured)
}

async fn test_store() -> Arc<Store> {
    let store = Store::open_in_memory().await.unwrap();
    let settings = WhatsAppSettings {
        access_token: "EAAG-test".into(),
        phone_number_id: "10455".into(),
        ..Default::default()
    };
    store.seed_config(&settings).await.unwrap();
    Arc::new(store)
}

fn channel(base_url: &str, store: Arc<Store>) -> WhatsAppChannel {
    let settings = WhatsAppSettings {
        api_base_url: base_url.to_string(),
        probe_timeout_secs: 2,
        send_timeout_secs: 5,
        pacing_ms: 0,
        ..Default::default()
    };
    WhatsAppChannel::new(&settings, "+242", store).unwrap()
}

async fn active_config(store: &Store) -> WhatsAppConfig {
    use mbote_core::traits::RecordStore;
    store.resolve_config(None).await.unwrap()
}

async fn count_deliveries(store: &Store, status: &str) -> i64 {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM delivery_records WHERE status = ?")
        .bind(status)
        .fetch_one(store.pool())
        .await
        .unwrap();
    row.0
}

// --- Pure helpers ---

#[test]
fn test_text_payload_shape() {
    let payload = SendPayload::text("+242061234567", "Bonjour");
    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(json["messaging_product"], "whatsapp");
    assert_eq!(json["recipient_type"], "individual");
    assert_eq!(json["to"], "+242061234567");
    assert_eq!(json["type"], "text");
    assert_eq!(json["text"]["body"], "Bonjour");
    assert!(json.get("image").is_none());
}

#[test]
fn test_media_payload_carries_caption() {
    let payload = SendPayload::media(
        "+242061234567",
        MediaKind::Image,
        "https://cdn.example.com/a.jpg",
        "Voici le document",
    );
    let json = serde_json::to_value(&payload).unwrap();
    assert_eq!(json["type"], "image");
    assert_eq!(json["image"]["link"], "https://cdn.example.com/a.jpg");
    assert_eq!(json["image"]["caption"], "Voici le document");
    assert!(json.get("text").is_none());
}

#[test]
fn test_media_payload_empty_caption_omitted() {
    let payload = SendPayload::media("+242", MediaKind::Document, "https://x.test/d.pdf", "");
    let json = serde_json::to_value(&payload).unwrap();
    assert!(json["document"].get("caption").is_none());
}

#[test]
fn test_parse_error_body_auth_code() {
    let body = r#"{"error":{"message":"Session has expired","type":"OAuthException","code":190}}"#;
    let (message, auth) = parse_error_body(reqwest::StatusCode::BAD_REQUEST, body);
    assert!(auth);
    assert_eq!(message, "Session has expired");
}

#[test]
fn test_parse_error_body_generic() {
    let body = r#"{"error":{"message":"Invalid parameter","type":"GraphMethodException","code":100}}"#;
    let (message, auth) = parse_error_body(reqwest::StatusCode::BAD_REQUEST, body);
    assert!(!auth);
    assert_eq!(message, "Invalid parameter");
}

#[test]
fn test_parse_error_body_unparsable() {
    let (message, auth) = parse_error_body(reqwest::StatusCode::UNAUTHORIZED, "<html>");
    assert!(auth); // 401 alone marks an auth failure
    assert!(message.contains("401"));
}

#[test]
fn test_substitute_vars() {
    let mut vars = HashMap::new();
    vars.insert("name".to_string(), "Aimée".to_string());
    let out = substitute_vars("Bonjour {{name}}, votre code est {{code}}", Some(&vars));
    assert_eq!(out, "Bonjour Aimée, votre code est {{code}}");
}

#[test]
fn test_substitute_vars_none() {
    assert_eq!(substitute_vars("Salut {{name}}", None), "Salut {{name}}");
}

// --- Against the stub provider ---

#[tokio::test]
async fn test_send_success_persists_sent_record() {
    use mbote_core::traits::{DeliveryChannel, RecordStore};
    let (base, captured) = ok_stub().await;
    let store = test_store().await;
    let ch = channel(&base, store.clone());
    let config = active_config(&store).await;

    let record = ch
        .send("+242061234567", "Bonjour <b>!</b>", None, &config)
        .await
        .unwrap();

    assert_eq!(record.provider_message_id.as_deref(), Some("wamid.test.1"));
    assert!(store.find_delivery("wamid.test.1").await.unwrap().is_some());

    // The payload carried the sanitized body.
    let body = captured.lock().unwrap().clone().unwrap();
    assert_eq!(body["type"], "text");
    assert_eq!(body["text"]["body"], "Bonjour !");
}

#[tokio::test]
async fn test_send_rejection_persists_error_record_and_propagates() {
    use mbote_core::traits::DeliveryChannel;
    let router = Router::new().route("/10455/messages", post(reject_handler));
    let base = spawn_stub(router).await;
    let store = test_store().await;
    let ch = channel(&base, store.clone());
    let config = active_config(&store).await;

    let err = ch
        .send("+242061234567", "Bonjour", None, &config)
        .await
        .unwrap_err();

    match err {
        mbote_core::error::MboteError::Delivery { message, auth_failure } => {
            assert!(!auth_failure);
            assert_eq!(message, "Invalid parameter");
        }
        other => panic!("expected delivery error, got {other:?}"),
    }
    assert_eq!(count_deliveries(&store, "error").await, 1);
    assert_eq!(count_deliveries(&store, "sent").await, 0);
}

#[tokio::test]
async fn test_send_auth_failure_deactivates_config() {
    use mbote_core::traits::{DeliveryChannel, RecordStore};
    let router = Router::new().route("/10455/messages", post(expired_token_handler));
    let base = spawn_stub(router).await;
    let store = test_store().await;
    let ch = channel(&base, store.clone());
    let config = active_config(&store).await;

    let err = ch
        .send("+242061234567", "Bonjour", None, &config)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        mbote_core::error::MboteError::Delivery { auth_failure: true, .. }
    ));

    // Future sends now fail fast with a configuration error.
    let resolve = store.resolve_config(None).await;
    assert!(matches!(
        resolve,
        Err(mbote_core::error::MboteError::NoActiveConfig)
    ));
}

#[tokio::test]
async fn test_send_empty_content_records_error() {
    use mbote_core::traits::DeliveryChannel;
    let (base, _) = ok_stub().await;
    let store = test_store().await;
    let ch = channel(&base, store.clone());
    let config = active_config(&store).await;

    let err = ch
        .send("+242061234567", "<p></p>", None, &config)
        .await
        .unwrap_err();
    assert!(matches!(err, mbote_core::error::MboteError::EmptyContent));
    assert_eq!(count_deliveries(&store, "error").await, 1);
}

#[tokio::test]
async fn test_media_send_attaches_caption() {
    use mbote_core::traits::DeliveryChannel;
    let (base, captured) = ok_stub().await;
    let store = test_store().await;
    let ch = channel(&base, store.clone());
    let config = active_config(&store).await;

    let media = MediaRef {
        kind: MediaKind::Image,
        url: format!("{base}/media/sample.jpg"),
    };
    ch.send("+242061234567", "Voici l'image", Some(&media), &config)
        .await
        .unwrap();

    let body = captured.lock().unwrap().clone().unwrap();
    assert_eq!(body["type"], "image");
    assert_eq!(body["image"]["caption"], "Voici l'image");
    assert!(body.get("text").is_none());
}

#[tokio::test]
async fn test_media_invalid_url_fails_fast() {
    use mbote_core::traits::DeliveryChannel;
    let (base, captured) = ok_stub().await;
    let store = test_store().await;
    let ch = channel(&base, store.clone());
    let config = active_config(&store).await;

    let media = MediaRef {
        kind: MediaKind::Image,
        url: "not a url".into(),
    };
    let err = ch
        .send("+242061234567", "image", Some(&media), &config)
        .await
        .unwrap_err();

    assert!(matches!(err, mbote_core::error::MboteError::InvalidMediaUrl(_)));
    assert_eq!(count_deliveries(&store, "error").await, 1);
    // No send attempt reached the provider.
    assert!(captured.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_media_unreachable_records_error_not_sent() {
    use mbote_core::traits::DeliveryChannel;
    let (base, captured) = ok_stub().await;
    let store = test_store().await;
    let ch = channel(&base, store.clone());
    let config = active_config(&store).await;

    let media = MediaRef {
        kind: MediaKind::Image,
        url: format!("{base}/media/missing.jpg"),
    };
    let err = ch
        .send("+242061234567", "image", Some(&media), &config)
        .await
        .unwrap_err();

    assert!(matches!(err, mbote_core::error::MboteError::MediaUnreachable(_)));
    assert_eq!(count_deliveries(&store, "error").await, 1);
    assert_eq!(count_deliveries(&store, "sent").await, 0);
    assert!(captured.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_batch_invalid_number_keeps_result_alignment() {
    use mbote_core::traits::DeliveryChannel;
    let (base, _) = ok_stub().await;
    let store = test_store().await;
    let ch = channel(&base, store.clone());
    let config = active_config(&store).await;

    let batch = vec![
        OutboundRequest {
            to: "+242061111111".into(),
            message: "premier".into(),
            ..Default::default()
        },
        OutboundRequest {
            to: "not-a-number".into(),
            message: "deuxième".into(),
            ..Default::default()
        },
        OutboundRequest {
            to: "0653333333".into(),
            message: "troisième".into(),
            ..Default::default()
        },
    ];

    let results = ch.send_many(&batch, &config).await;

    assert_eq!(results.len(), 3);
    assert!(results[0].success);
    assert!(!results[1].success);
    assert_eq!(results[1].error.as_deref(), Some("invalid phone number"));
    assert!(results[2].success);
    // The local-format number was normalized before sending.
    assert_eq!(results[2].to, "+242653333333");
}

#[tokio::test]
async fn test_batch_applies_template_variables() {
    use mbote_core::traits::DeliveryChannel;
    let (base, captured) = ok_stub().await;
    let store = test_store().await;
    let ch = channel(&base, store.clone());
    let config = active_config(&store).await;

    let mut vars = HashMap::new();
    vars.insert("name".to_string(), "Pauline".to_string());
    let batch = vec![OutboundRequest {
        to: "+242061111111".into(),
        message: "Bonjour {{name}}".into(),
        variables: Some(vars),
        media: None,
    }];

    let results = ch.send_many(&batch, &config).await;
    assert!(results[0].success);

    let body = captured.lock().unwrap().clone().unwrap();
    assert_eq!(body["text"]["body"], "Bonjour Pauline");
}
