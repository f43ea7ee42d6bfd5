//! Router tests against the in-memory store and recording senders.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode},
};
use leadform_core::{
  form::MoveDirection,
  memory::MemoryStore,
  notify::{
    NotificationDispatcher,
    testing::{RecordingEmail, RecordingSms},
  },
  pipeline::{DispatchMode, SubmissionPolicy},
  store::LeadStore,
};
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{AppState, api_router};

type State = AppState<MemoryStore, RecordingEmail, RecordingSms>;

fn make_state(enforce_required: bool) -> State {
  let dispatcher = NotificationDispatcher::new(
    Arc::new(RecordingEmail::default()),
    Arc::new(RecordingSms::default()),
  );
  AppState::new(
    Arc::new(MemoryStore::new()),
    dispatcher,
    SubmissionPolicy {
      enforce_required,
      dispatch: DispatchMode::Inline,
    },
    "https://forms.example",
  )
}

fn router(state: &State) -> Router { api_router(state.clone()) }

async fn call(state: &State, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(json) => {
      builder = builder.header("content-type", "application/json");
      Body::from(json.to_string())
    }
    None => Body::empty(),
  };
  let resp = router(state)
    .oneshot(builder.body(body).unwrap())
    .await
    .unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, json)
}

async fn onboard(state: &State) -> Uuid {
  let (status, body) = call(
    state,
    "POST",
    "/tenants",
    Some(json!({ "company_name": "Garage Martin", "admin_email": "owner@garage.test" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["tenant"]["tenant_id"]
    .as_str()
    .unwrap()
    .parse()
    .unwrap()
}

fn starter_answers() -> Value {
  json!({
    "answers": {
      "contact": {
        "lastName": "Martin",
        "firstName": "Léa",
        "email": "lea@example.com",
        "phone": "0611112233"
      },
      "description": "The boiler is leaking",
      "photo": "uploads/abc.jpg",
      "urgent": true,
      "consent": true
    },
    "marketing_optin": true
  })
}

// ─── Onboarding & editor ─────────────────────────────────────────────────────

#[tokio::test]
async fn onboarding_creates_a_starter_form() {
  let state = make_state(true);
  let tenant_id = onboard(&state).await;

  let (status, form) = call(&state, "GET", &format!("/tenants/{tenant_id}/form"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(form["enabled"], true);
  assert_eq!(form["notifications"]["admin_email"]["enabled"], true);
  assert!(form["blocks"].as_array().unwrap().len() > 3);

  let (_, tenants) = call(&state, "GET", "/tenants", None).await;
  assert_eq!(tenants[0]["company_name"], "Garage Martin");
  assert_eq!(tenants[0]["sms_credits"], 10);
}

#[tokio::test]
async fn onboarding_rejects_a_malformed_admin_email() {
  let state = make_state(true);
  let (status, body) = call(
    &state,
    "POST",
    "/tenants",
    Some(json!({ "company_name": "Garage Martin", "admin_email": "not-an-email" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
  assert_eq!(body["issues"][0]["channel"], "admin_email");

  let (_, tenants) = call(&state, "GET", "/tenants", None).await;
  assert_eq!(tenants, json!([]));
}

#[tokio::test]
async fn editor_add_move_update_remove() {
  let state = make_state(true);
  let tenant_id = onboard(&state).await;
  let base = format!("/tenants/{tenant_id}/form/blocks");

  let (status, block) = call(&state, "POST", &base, Some(json!({ "variant": "header" }))).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(block["label"], "New heading");
  let id = block["id"].as_str().unwrap().to_owned();

  let (_, moved) = call(
    &state,
    "POST",
    &format!("{base}/{id}/move"),
    Some(json!({ "direction": MoveDirection::Up })),
  )
  .await;
  let form = state
    .store
    .get_form_definition(tenant_id)
    .await
    .unwrap()
    .unwrap();
  let last = form.blocks.len() - 1;
  assert_eq!(moved["index"], last - 1);
  assert_eq!(form.blocks[last - 1].id, id);

  let (status, updated) = call(
    &state,
    "PATCH",
    &format!("{base}/{id}"),
    Some(json!({ "label": "Your vehicle", "required": true })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(updated["label"], "Your vehicle");
  // Headings cannot be required.
  assert_eq!(updated["required"], false);

  let (status, _) = call(&state, "DELETE", &format!("{base}/{id}"), None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = call(&state, "DELETE", &format!("{base}/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn saving_an_enabled_channel_without_destination_is_rejected() {
  let state = make_state(true);
  let tenant_id = onboard(&state).await;
  let uri = format!("/tenants/{tenant_id}/form");

  let (_, mut form) = call(&state, "GET", &uri, None).await;
  form["notifications"]["admin_sms"]["enabled"] = json!(true);
  form["notifications"]["admin_sms"]["destination"] = json!("");

  let (status, body) = call(&state, "PUT", &uri, Some(form)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["issues"][0]["issue"], "missing_destination");
}

#[tokio::test]
async fn palette_lists_every_variant() {
  let state = make_state(true);
  let (status, body) = call(&state, "GET", "/blocks/palette", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 9);
}

// ─── Public form ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn public_submit_returns_ticket_and_notifies_admin() {
  let state = make_state(true);
  let tenant_id = onboard(&state).await;

  let (status, body) = call(
    &state,
    "POST",
    &format!("/public/forms/{tenant_id}/submissions"),
    Some(starter_answers()),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  let ticket = body["ticket_number"].as_str().unwrap().to_owned();
  assert!(ticket.starts_with("#REQ-"));

  let (_, inbox) = call(&state, "GET", &format!("/tenants/{tenant_id}/submissions"), None).await;
  let inbox = inbox.as_array().unwrap();
  assert_eq!(inbox.len(), 1);
  assert_eq!(inbox[0]["phone"], "0611112233");
  assert_eq!(inbox[0]["status"], "new");
  assert_eq!(inbox[0]["marketing_optin"], true);

  let emails = state.pipeline.dispatcher().email().sent();
  let admin = emails.iter().find(|m| m.to == "owner@garage.test").unwrap();
  assert!(admin.subject.contains(&ticket));
  assert!(emails.iter().any(|m| m.to == "lea@example.com"));
}

#[tokio::test]
async fn public_submit_missing_required_is_rejected_when_hardened() {
  let state = make_state(true);
  let tenant_id = onboard(&state).await;

  let (status, body) = call(
    &state,
    "POST",
    &format!("/public/forms/{tenant_id}/submissions"),
    Some(json!({ "answers": { "urgent": true } })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["issues"][0]["issue"], "missing_required");
}

#[tokio::test]
async fn public_submit_missing_required_is_accepted_when_lax() {
  let state = make_state(false);
  let tenant_id = onboard(&state).await;

  let (status, _) = call(
    &state,
    "POST",
    &format!("/public/forms/{tenant_id}/submissions"),
    Some(json!({ "answers": { "urgent": true } })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn public_submit_rejects_wrong_shapes_and_unknown_blocks() {
  let state = make_state(false);
  let tenant_id = onboard(&state).await;
  let uri = format!("/public/forms/{tenant_id}/submissions");

  let (status, body) = call(&state, "POST", &uri, Some(json!({ "answers": { "urgent": "yes" } }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["issues"][0]["issue"], "value_shape");

  let (status, body) = call(&state, "POST", &uri, Some(json!({ "answers": { "nope": "x" } }))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["issues"][0]["issue"], "unknown_block");
}

#[tokio::test]
async fn disabled_form_is_hidden_and_refuses_submissions() {
  let state = make_state(true);
  let tenant_id = onboard(&state).await;
  let mut form = state
    .store
    .get_form_definition(tenant_id)
    .await
    .unwrap()
    .unwrap();
  form.enabled = false;
  state
    .store
    .save_form_definition(tenant_id, form)
    .await
    .unwrap();

  let (status, _) = call(&state, "GET", &format!("/public/forms/{tenant_id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = call(
    &state,
    "POST",
    &format!("/public/forms/{tenant_id}/submissions"),
    Some(starter_answers()),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn store_outage_yields_generic_error_without_ticket() {
  let state = make_state(true);
  let tenant_id = onboard(&state).await;
  state.store.set_unavailable(true).await;

  let (status, body) = call(
    &state,
    "POST",
    &format!("/public/forms/{tenant_id}/submissions"),
    Some(starter_answers()),
  )
  .await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body["error"], "submission failed, please try again");
  assert!(body.get("ticket_number").is_none());
}

#[tokio::test]
async fn public_render_is_interactive() {
  let state = make_state(true);
  let tenant_id = onboard(&state).await;

  let (status, body) = call(&state, "GET", &format!("/public/forms/{tenant_id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["interactive"], true);
  assert!(body["marketing_optin"].is_object());

  let (_, preview) = call(&state, "GET", &format!("/tenants/{tenant_id}/form/preview"), None).await;
  assert_eq!(preview["interactive"], false);
}

// ─── Triage ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn archiving_moves_submission_between_buckets() {
  let state = make_state(true);
  let tenant_id = onboard(&state).await;
  call(
    &state,
    "POST",
    &format!("/public/forms/{tenant_id}/submissions"),
    Some(starter_answers()),
  )
  .await;
  let list = format!("/tenants/{tenant_id}/submissions");
  let (_, inbox) = call(&state, "GET", &list, None).await;
  let id = inbox[0]["id"].as_str().unwrap().to_owned();

  let (status, updated) = call(
    &state,
    "PATCH",
    &format!("/submissions/{id}/status"),
    Some(json!({ "status": "archived" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(updated["status"], "archived");

  let count = |bucket: &'static str| {
    let state = state.clone();
    let uri = format!("{list}?bucket={bucket}");
    async move { call(&state, "GET", &uri, None).await.1.as_array().unwrap().len() }
  };
  assert_eq!(count("to_process").await, 0);
  assert_eq!(count("all").await, 0);
  assert_eq!(count("archived").await, 1);

  let (_, stats) = call(&state, "GET", &format!("/tenants/{tenant_id}/stats"), None).await;
  assert_eq!(stats["submissions"]["archived"], 1);
}

#[tokio::test]
async fn unknown_submission_is_404() {
  let state = make_state(true);
  let (status, _) = call(&state, "GET", &format!("/submissions/{}", Uuid::new_v4()), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Missed calls ────────────────────────────────────────────────────────────

#[tokio::test]
async fn missed_call_from_mobile_sends_form_link() {
  let state = make_state(true);
  let tenant_id = onboard(&state).await;

  let (status, log) = call(
    &state,
    "POST",
    "/webhooks/missed-call",
    Some(json!({
      "tenant_id": tenant_id,
      "caller": "+33612345678",
      "at": "2026-10-14T10:00:00+02:00"
    })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{log}");
  assert_eq!(log["status"], "sent");
  assert!(
    log["message"]
      .as_str()
      .unwrap()
      .contains(&format!("https://forms.example/f/{tenant_id}"))
  );

  let (_, landline) = call(
    &state,
    "POST",
    "/webhooks/missed-call",
    Some(json!({ "tenant_id": tenant_id, "caller": "0140404040" })),
  )
  .await;
  assert_eq!(landline["status"], "filtered");
  assert_eq!(landline["reason"], "is_landline");

  let (_, calls) = call(&state, "GET", &format!("/tenants/{tenant_id}/calls"), None).await;
  assert_eq!(calls.as_array().unwrap().len(), 2);

  let (_, stats) = call(&state, "GET", &format!("/tenants/{tenant_id}/stats"), None).await;
  assert_eq!(stats["calls"]["sms_sent"], 1);
  assert_eq!(stats["calls"]["calls_filtered"], 1);
  assert_eq!(stats["sms_credits"], 9);
}

#[tokio::test]
async fn credits_top_up_and_settings_save() {
  let state = make_state(true);
  let tenant_id = onboard(&state).await;

  let (status, tenant) = call(
    &state,
    "POST",
    &format!("/tenants/{tenant_id}/credits"),
    Some(json!({ "amount": 40 })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(tenant["sms_credits"], 50);

  let (status, _) = call(
    &state,
    "POST",
    &format!("/tenants/{tenant_id}/credits"),
    Some(json!({ "amount": 0 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = call(
    &state,
    "POST",
    &format!("/tenants/{tenant_id}/credits"),
    Some(json!({ "amount": i64::MAX })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
  let (_, unchanged) = call(&state, "GET", &format!("/tenants/{tenant_id}"), None).await;
  assert_eq!(unchanged["sms_credits"], 50);

  let mut settings = tenant["settings"].clone();
  settings["auto_sms_enabled"] = json!(false);
  let (status, saved) = call(
    &state,
    "PUT",
    &format!("/tenants/{tenant_id}/settings"),
    Some(json!({ "settings": settings })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(saved["settings"]["auto_sms_enabled"], false);
  assert_eq!(saved["sms_credits"], 50);
}
