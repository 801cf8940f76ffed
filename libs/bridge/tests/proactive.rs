mod support;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gsm_activity::{
    AGENTIC_USER_ROLE, Activity, ActivityKind, CONTINUE_CONVERSATION_EVENT, ConversationReference,
};
use gsm_bridge::testkit::RecordedCall;
use gsm_bridge::{
    BOT_APP_ID_KEY, BridgeError, CONVERSATION_OPERATIONS_KEY, HandlerError, TURN_CREDENTIALS_KEY,
    TurnContext, TurnErrorHandler, TurnHandler,
};
use support::{Harness, message, request};
use tokio_util::sync::CancellationToken;

/// Records what a turn could see, then sends one message.
#[derive(Default)]
struct Observer {
    seen: Mutex<Vec<Observation>>,
}

#[derive(Debug, Clone, PartialEq)]
struct Observation {
    kind: ActivityKind,
    state_keys: Vec<String>,
    app_id: Option<String>,
    agentic: bool,
}

#[async_trait]
impl TurnHandler for Observer {
    async fn on_turn(&self, ctx: &mut TurnContext) -> Result<(), HandlerError> {
        let mut state_keys: Vec<String> = ctx.state().keys().map(str::to_string).collect();
        state_keys.sort();
        let credentials = ctx.credentials()?;
        self.seen.lock().unwrap().push(Observation {
            kind: ctx.activity().kind(),
            state_keys,
            app_id: ctx.bot_app_id().map(|id| id.as_str().to_string()),
            agentic: credentials.agentic().is_some(),
        });
        ctx.send_text("status update").await?;
        Ok(())
    }
}

fn stored_reference() -> ConversationReference {
    Activity::from_value(message("hi"))
        .unwrap()
        .conversation_reference()
}

#[tokio::test]
async fn continuation_receives_the_same_collaborators_as_inbound_turns() {
    let harness = Harness::new();
    let bridge = harness.builder().build();
    let observer = Observer::default();

    bridge
        .process(request(&message("hi")), &observer, CancellationToken::new())
        .await
        .unwrap();
    bridge
        .continue_conversation(
            "app-123",
            &stored_reference(),
            &observer,
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let seen = observer.seen.lock().unwrap().clone();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].kind, ActivityKind::Message);
    assert_eq!(seen[1].kind, ActivityKind::Event);
    assert_eq!(seen[0].state_keys, seen[1].state_keys);
    assert_eq!(
        seen[1].state_keys,
        [
            BOT_APP_ID_KEY,
            CONVERSATION_OPERATIONS_KEY,
            TURN_CREDENTIALS_KEY
        ]
    );
    assert_eq!(seen[0].app_id, seen[1].app_id);
}

#[tokio::test]
async fn continuation_sends_into_the_referenced_conversation() {
    let harness = Harness::new();
    let bridge = harness.builder().build();
    let observer = Observer::default();

    let sent = bridge
        .continue_conversation(
            "bot-777",
            &stored_reference(),
            &observer,
            CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(sent, ["activity-1"]);

    let calls = harness.connector.calls();
    let RecordedCall::Send {
        endpoint, activity, ..
    } = &calls[0]
    else {
        panic!("proactive sends are not threaded replies: {:?}", calls[0]);
    };
    assert_eq!(endpoint.conversation_id, "19:conv@thread.v2");
    assert_eq!(endpoint.service_url, "https://smba.example/amer/");
    assert_eq!(activity.str_property("text"), Some("status update"));
    assert_eq!(activity.from.as_ref().unwrap().id.as_deref(), Some("28:bot"));

    // Credentials act as the bot passed to the call, not the configured one.
    assert_eq!(harness.tokens.requests()[0].app_id, "bot-777");
}

#[tokio::test]
async fn continuation_activity_is_a_continue_conversation_event() {
    struct Inspect(Arc<Mutex<Option<Activity>>>);

    #[async_trait]
    impl TurnHandler for Inspect {
        async fn on_turn(&self, ctx: &mut TurnContext) -> Result<(), HandlerError> {
            *self.0.lock().unwrap() = Some(ctx.activity().activity().clone());
            Ok(())
        }
    }

    let harness = Harness::new();
    let bridge = harness.builder().build();
    let slot = Arc::new(Mutex::new(None));
    bridge
        .continue_conversation(
            "app-123",
            &stored_reference(),
            &Inspect(slot.clone()),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    let activity = slot.lock().unwrap().take().unwrap();
    assert_eq!(
        activity.str_property("name"),
        Some(CONTINUE_CONVERSATION_EVENT)
    );
    assert_eq!(activity.conversation_id(), Some("19:conv@thread.v2"));
    assert_eq!(activity.recipient.as_ref().unwrap().id.as_deref(), Some("28:bot"));
}

#[tokio::test]
async fn empty_bot_id_is_an_argument_error() {
    let harness = Harness::new();
    let bridge = harness.builder().build();

    let err = bridge
        .continue_conversation(
            "",
            &stored_reference(),
            &Observer::default(),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.missing_field(), Some("botId"));
}

#[tokio::test]
async fn reference_without_conversation_fails_when_sending() {
    let harness = Harness::new();
    let bridge = harness.builder().build();
    let mut reference = stored_reference();
    reference.conversation = None;

    let err = bridge
        .continue_conversation("app-123", &reference, &Observer::default(), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::Argument(_)), "got {err:?}");
    assert_eq!(err.missing_field(), Some("conversation.id"));
    assert!(harness.connector.calls().is_empty());
}

/// Sends once, then fails.
struct SendThenFail;

#[async_trait]
impl TurnHandler for SendThenFail {
    async fn on_turn(&self, ctx: &mut TurnContext) -> Result<(), HandlerError> {
        ctx.send_text("partial update").await?;
        Err(ctx.fail(anyhow::anyhow!("report generation failed")))
    }
}

struct SendApology;

#[async_trait]
impl TurnErrorHandler for SendApology {
    async fn on_turn_error(
        &self,
        ctx: &mut TurnContext,
        _error: &HandlerError,
    ) -> anyhow::Result<()> {
        ctx.send_text("sorry").await?;
        Ok(())
    }
}

#[tokio::test]
async fn recovered_continuation_reports_every_sent_id() {
    let harness = Harness::new();
    let bridge = harness.builder().on_turn_error(SendApology).build();

    let sent = bridge
        .continue_conversation(
            "app-123",
            &stored_reference(),
            &SendThenFail,
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(sent, ["activity-1", "activity-2"]);
    let texts: Vec<_> = harness
        .connector
        .sent_activities()
        .iter()
        .filter_map(|activity| activity.str_property("text").map(str::to_string))
        .collect();
    assert_eq!(texts, ["partial update", "sorry"]);
}

#[tokio::test]
async fn agentic_recipient_flows_into_credentials() {
    let harness = Harness::new();
    let bridge = harness.builder().build();
    let observer = Observer::default();

    let mut payload = message("hi");
    payload["recipient"] = serde_json::json!({
        "id": "28:agent",
        "role": AGENTIC_USER_ROLE,
        "agenticAppId": "instance-9",
        "agenticUserId": "user-9"
    });
    bridge
        .process(request(&payload), &observer, CancellationToken::new())
        .await
        .unwrap();

    assert!(observer.seen.lock().unwrap()[0].agentic);
    let token_request = &harness.tokens.requests()[0];
    assert_eq!(
        token_request
            .agentic
            .as_ref()
            .map(|a| a.app_instance_id.as_str()),
        Some("instance-9")
    );
}
