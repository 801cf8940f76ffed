use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use gsm_bot_host::bot::{HELP_TEXT, WELCOME_TEXT};
use gsm_bot_host::build_state;
use gsm_bot_host::http::{AppState, build_router};
use gsm_bot_host::security::IngressAuth;
use gsm_bridge::BridgeConfig;
use gsm_bridge::testkit::{RecordedCall, RecordingConversationClient, StaticTokenProvider};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

struct Host {
    app: Router,
    state: AppState,
    connector: Arc<RecordingConversationClient>,
}

fn host(bearer: Option<&str>) -> Host {
    let connector = Arc::new(RecordingConversationClient::new());
    let state = build_state(
        BridgeConfig::new("bot-app"),
        Arc::new(StaticTokenProvider::new("tok")),
        connector.clone(),
    )
    .unwrap();
    let app = build_router(
        state.clone(),
        IngressAuth {
            bearer: bearer.map(str::to_string),
        },
    );
    Host {
        app,
        state,
        connector,
    }
}

fn activity(kind: &str, extra: Value) -> Value {
    let mut payload = json!({
        "type": kind,
        "id": "act-1",
        "channelId": "msteams",
        "serviceUrl": "https://smba.example/emea/",
        "from": { "id": "29:user", "name": "Ada" },
        "recipient": { "id": "28:bot", "name": "Helper" },
        "conversation": { "id": "19:room@thread.v2" }
    });
    if let (Some(target), Some(extra)) = (payload.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            target.insert(key.clone(), value.clone());
        }
    }
    payload
}

fn post_json(uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn sent_texts(connector: &RecordingConversationClient) -> Vec<String> {
    connector
        .sent_activities()
        .iter()
        .filter_map(|activity| activity.str_property("text").map(str::to_string))
        .collect()
}

#[tokio::test]
async fn healthz_is_open() {
    let host = host(Some("secret"));
    let req = Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let resp = host.app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn api_requires_configured_bearer() {
    let host = host(Some("secret"));
    let payload = activity("message", json!({ "text": "hello" }));

    let resp = host
        .app
        .clone()
        .oneshot(post_json("/api/messages", &payload))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(host.connector.calls().is_empty());

    let mut req = post_json("/api/messages", &payload);
    req.headers_mut()
        .insert(header::AUTHORIZATION, "Bearer secret".parse().unwrap());
    let resp = host.app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn message_is_echoed_as_threaded_reply() {
    let host = host(None);
    let payload = activity("message", json!({ "text": "  hello there " }));
    let resp = host
        .app
        .oneshot(post_json("/api/messages", &payload))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let calls = host.connector.calls();
    assert_eq!(calls.len(), 1);
    let RecordedCall::Reply {
        endpoint,
        reply_to_id,
        activity,
        token,
    } = &calls[0]
    else {
        panic!("expected a threaded reply, got {:?}", calls[0]);
    };
    assert_eq!(endpoint.conversation_id, "19:room@thread.v2");
    assert_eq!(reply_to_id, "act-1");
    assert_eq!(token, "tok");
    assert_eq!(activity.str_property("text"), Some("echo: hello there"));
    assert_eq!(host.state.store.conversation_ids(), vec!["19:room@thread.v2"]);
}

#[tokio::test]
async fn help_route_wins_over_echo() {
    let host = host(None);
    let payload = activity("message", json!({ "text": "HELP" }));
    let resp = host
        .app
        .oneshot(post_json("/api/messages", &payload))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(sent_texts(&host.connector), vec![HELP_TEXT.to_string()]);
}

#[tokio::test]
async fn members_added_greets_everyone_but_the_bot() {
    let host = host(None);
    let payload = activity(
        "conversationUpdate",
        json!({
            "membersAdded": [
                { "id": "28:bot", "name": "Helper" },
                { "id": "29:grace", "name": "Grace" },
                { "id": "29:alan" }
            ]
        }),
    );
    let resp = host
        .app
        .oneshot(post_json("/api/messages", &payload))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let calls = host.connector.calls();
    assert_eq!(calls.len(), 1);
    assert!(matches!(calls[0], RecordedCall::Send { .. }));
    assert_eq!(
        sent_texts(&host.connector),
        vec![format!("{WELCOME_TEXT} Welcome, Grace, 29:alan.")]
    );
}

#[tokio::test]
async fn uninstall_drops_the_stored_reference() {
    let host = host(None);
    let message = activity("message", json!({ "text": "hi" }));
    host.app
        .clone()
        .oneshot(post_json("/api/messages", &message))
        .await
        .unwrap();
    assert_eq!(host.state.store.len(), 1);

    let removal = activity("installationUpdate", json!({ "action": "remove" }));
    let resp = host
        .app
        .oneshot(post_json("/api/messages", &removal))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(host.state.store.is_empty());
}

#[tokio::test]
async fn card_action_invoke_returns_its_response() {
    let host = host(None);
    let payload = activity(
        "invoke",
        json!({
            "name": "adaptiveCard/action",
            "value": { "action": { "type": "Action.Execute", "verb": "approve" } }
        }),
    );
    let resp = host
        .app
        .oneshot(post_json("/api/messages", &payload))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["statusCode"], 200);
    assert_eq!(body["value"], "action `approve` received");
}

#[tokio::test]
async fn unrouted_invoke_is_not_implemented() {
    let host = host(None);
    let payload = activity("invoke", json!({ "name": "task/fetch" }));
    let resp = host
        .app
        .oneshot(post_json("/api/messages", &payload))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn non_json_content_type_is_rejected() {
    let host = host(None);
    let req = Request::builder()
        .method("POST")
        .uri("/api/messages")
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from("hello"))
        .unwrap();
    let resp = host.app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("text/plain"));
}

#[tokio::test]
async fn connector_failure_is_a_bad_gateway() {
    let host = host(None);
    host.connector.fail_with_status(502);
    let payload = activity("message", json!({ "text": "hello" }));
    let resp = host
        .app
        .oneshot(post_json("/api/messages", &payload))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("502"));
    assert!(host.connector.calls().is_empty());
}

#[tokio::test]
async fn notify_continues_a_known_conversation() {
    let host = host(None);
    let message = activity("message", json!({ "text": "hi" }));
    host.app
        .clone()
        .oneshot(post_json("/api/messages", &message))
        .await
        .unwrap();

    let resp = host
        .app
        .oneshot(post_json(
            "/api/notify/19:room@thread.v2",
            &json!({ "text": "build finished" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["conversation_id"], "19:room@thread.v2");
    assert_eq!(body["activity_ids"], json!(["activity-2"]));

    let calls = host.connector.calls();
    let RecordedCall::Send {
        endpoint,
        activity,
        ..
    } = &calls[1]
    else {
        panic!("proactive sends are not threaded, got {:?}", calls[1]);
    };
    assert_eq!(endpoint.service_url, "https://smba.example/emea/");
    assert_eq!(activity.str_property("text"), Some("build finished"));
    assert_eq!(activity.recipient.as_ref().unwrap().id.as_deref(), Some("29:user"));
}

#[tokio::test]
async fn notify_unknown_conversation_is_not_found() {
    let host = host(None);
    let resp = host
        .app
        .oneshot(post_json("/api/notify/19:nobody", &json!({ "text": "hi" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn routes_are_listed_in_registration_order() {
    let host = host(None);
    let req = Request::builder()
        .uri("/api/routes")
        .body(Body::empty())
        .unwrap();
    let resp = host.app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let names: Vec<String> = body_json(resp)
        .await
        .as_array()
        .unwrap()
        .iter()
        .map(|route| route["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        names,
        vec![
            "message/help",
            "message",
            "conversationUpdate/membersAdded",
            "installationUpdate/add",
            "installationUpdate/remove",
            "invoke/adaptiveCard/action",
        ]
    );
}
