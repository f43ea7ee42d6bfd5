//! Integration tests for `SqliteStore` against an in-memory database.

use leadform_core::{
  answer::{Answer, AnswerValue, ContactValue},
  call::{CallReason, CallStatus, NewCallLog},
  form::{FormDefinition, MoveDirection},
  store::LeadStore,
  submission::{
    NewSubmission, SubmissionFilter, SubmissionStatus, TicketNumber, TriageBucket,
  },
  tenant::WELCOME_CREDITS,
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn new_submission(tenant_id: Uuid, phone: &str) -> NewSubmission {
  NewSubmission {
    ticket_number: TicketNumber::generate(),
    tenant_id,
    phone: phone.into(),
    answers: vec![
      Answer {
        block_id: "contact".into(),
        label:    "Your details".into(),
        value:    AnswerValue::Contact(ContactValue {
          phone: phone.into(),
          ..Default::default()
        }),
      },
      Answer {
        block_id: "urgent".into(),
        label:    "Is this urgent?".into(),
        value:    AnswerValue::Flag(true),
      },
    ],
    marketing_optin: true,
  }
}

// ─── Tenants ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_tenant() {
  let s = store().await;

  let tenant = s.add_tenant("Garage Martin".into()).await.unwrap();
  assert_eq!(tenant.sms_credits, WELCOME_CREDITS);

  let fetched = s.get_tenant(tenant.tenant_id).await.unwrap().unwrap();
  assert_eq!(fetched, tenant);
  assert!(s.get_tenant(Uuid::new_v4()).await.unwrap().is_none());
  assert_eq!(s.list_tenants().await.unwrap().len(), 1);
}

#[tokio::test]
async fn save_tenant_updates_settings_but_not_credits() {
  let s = store().await;
  let mut tenant = s.add_tenant("Garage Martin".into()).await.unwrap();

  tenant.settings.auto_sms_enabled = false;
  tenant.settings.schedule.enabled = true;
  tenant.sms_credits = 999;
  let saved = s.save_tenant(tenant.clone()).await.unwrap().unwrap();

  assert!(!saved.settings.auto_sms_enabled);
  assert!(saved.settings.schedule.enabled);
  assert_eq!(saved.sms_credits, WELCOME_CREDITS);

  let mut ghost = tenant;
  ghost.tenant_id = Uuid::new_v4();
  assert!(s.save_tenant(ghost).await.unwrap().is_none());
}

#[tokio::test]
async fn adjust_credits_returns_new_balance() {
  let s = store().await;
  let tenant = s.add_tenant("Acme".into()).await.unwrap();

  assert_eq!(
    s.adjust_credits(tenant.tenant_id, -1).await.unwrap(),
    Some(WELCOME_CREDITS - 1)
  );
  assert_eq!(
    s.adjust_credits(tenant.tenant_id, 50).await.unwrap(),
    Some(WELCOME_CREDITS + 49)
  );
  assert_eq!(s.adjust_credits(Uuid::new_v4(), 1).await.unwrap(), None);
}

#[tokio::test]
async fn debit_credit_never_goes_below_zero() {
  let s = store().await;
  let tenant = s.add_tenant("Acme".into()).await.unwrap();
  s.adjust_credits(tenant.tenant_id, 1 - WELCOME_CREDITS)
    .await
    .unwrap();

  assert_eq!(s.debit_credit(tenant.tenant_id).await.unwrap(), Some(0));
  assert_eq!(s.debit_credit(tenant.tenant_id).await.unwrap(), None);
  assert_eq!(s.debit_credit(Uuid::new_v4()).await.unwrap(), None);

  let after = s.get_tenant(tenant.tenant_id).await.unwrap().unwrap();
  assert_eq!(after.sms_credits, 0);
}

// ─── Form definitions ────────────────────────────────────────────────────────

#[tokio::test]
async fn form_round_trip_preserves_blocks() {
  let s = store().await;
  let tenant = s.add_tenant("Acme".into()).await.unwrap();

  let mut form = FormDefinition::starter(Some("owner@acme.test"));
  form
    .move_block("description", MoveDirection::Up)
    .unwrap();
  s.save_form_definition(tenant.tenant_id, form.clone())
    .await
    .unwrap();

  let loaded = s
    .get_form_definition(tenant.tenant_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(loaded, form);
}

#[tokio::test]
async fn saving_a_form_is_last_write_wins() {
  let s = store().await;
  let tenant = s.add_tenant("Acme".into()).await.unwrap();

  let first = FormDefinition::starter(None);
  let mut second = first.clone();
  second.page_title = "Second".into();
  second.blocks.clear();

  s.save_form_definition(tenant.tenant_id, first).await.unwrap();
  s.save_form_definition(tenant.tenant_id, second.clone())
    .await
    .unwrap();

  let loaded = s
    .get_form_definition(tenant.tenant_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(loaded, second);
}

#[tokio::test]
async fn form_for_unknown_tenant_is_rejected() {
  let s = store().await;
  let err = s
    .save_form_definition(Uuid::new_v4(), FormDefinition::default())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::TenantNotFound(_)));
  assert!(
    s.get_form_definition(Uuid::new_v4())
      .await
      .unwrap()
      .is_none()
  );
}

// ─── Submissions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get_submission() {
  let s = store().await;
  let tenant = s.add_tenant("Acme".into()).await.unwrap();

  let inserted = s
    .insert_submission(new_submission(tenant.tenant_id, "0611112233"))
    .await
    .unwrap();
  assert_eq!(inserted.status, SubmissionStatus::New);

  let fetched = s.get_submission(inserted.id).await.unwrap().unwrap();
  assert_eq!(fetched, inserted);
}

#[tokio::test]
async fn triage_buckets_follow_status() {
  let s = store().await;
  let tenant = s.add_tenant("Acme".into()).await.unwrap();
  let sub = s
    .insert_submission(new_submission(tenant.tenant_id, "0611112233"))
    .await
    .unwrap();

  let tenant_id = tenant.tenant_id;
  let count = |bucket| {
    let s = s.clone();
    async move {
      s.list_submissions(tenant_id, &SubmissionFilter::bucket(bucket))
        .await
        .unwrap()
        .len()
    }
  };

  assert_eq!(count(TriageBucket::ToProcess).await, 1);

  let archived = s
    .update_submission_status(sub.id, SubmissionStatus::Archived)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(archived.status, SubmissionStatus::Archived);

  assert_eq!(count(TriageBucket::ToProcess).await, 0);
  assert_eq!(count(TriageBucket::All).await, 0);
  assert_eq!(count(TriageBucket::Archived).await, 1);

  // Archived is not terminal.
  s.update_submission_status(sub.id, SubmissionStatus::Pending)
    .await
    .unwrap();
  assert_eq!(count(TriageBucket::ToProcess).await, 1);
}

#[tokio::test]
async fn update_status_of_missing_submission_returns_none() {
  let s = store().await;
  let result = s
    .update_submission_status(Uuid::new_v4(), SubmissionStatus::Done)
    .await
    .unwrap();
  assert!(result.is_none());
}

#[tokio::test]
async fn list_is_newest_first_with_search_and_paging() {
  let s = store().await;
  let tenant = s.add_tenant("Acme".into()).await.unwrap();
  let other = s.add_tenant("Other".into()).await.unwrap();

  let mut ids = Vec::new();
  for phone in ["0611111111", "0622222222", "0633333333"] {
    let sub = s
      .insert_submission(new_submission(tenant.tenant_id, phone))
      .await
      .unwrap();
    ids.push(sub.id);
  }
  s.insert_submission(new_submission(other.tenant_id, "0699999999"))
    .await
    .unwrap();

  let all = s
    .list_submissions(tenant.tenant_id, &SubmissionFilter::default())
    .await
    .unwrap();
  let listed: Vec<_> = all.iter().map(|x| x.id).collect();
  ids.reverse();
  assert_eq!(listed, ids);

  let page = s
    .list_submissions(tenant.tenant_id, &SubmissionFilter {
      limit: Some(1),
      offset: Some(1),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(page.len(), 1);
  assert_eq!(page[0].id, ids[1]);

  let hits = s
    .list_submissions(tenant.tenant_id, &SubmissionFilter {
      text: Some("2222".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0].phone, "0622222222");

  let ticket = all[0].ticket_number.to_string();
  let by_ticket = s
    .list_submissions(tenant.tenant_id, &SubmissionFilter {
      text: Some(ticket.clone()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert!(by_ticket.iter().any(|x| x.ticket_number.as_str() == ticket));
}

#[tokio::test]
async fn search_text_is_matched_literally() {
  let s = store().await;
  let tenant = s.add_tenant("Acme".into()).await.unwrap();
  s.insert_submission(new_submission(tenant.tenant_id, "0611111111"))
    .await
    .unwrap();

  for q in ["%", "_", "06%11"] {
    let hits = s
      .list_submissions(tenant.tenant_id, &SubmissionFilter {
        text: Some(q.into()),
        ..Default::default()
      })
      .await
      .unwrap();
    assert!(hits.is_empty(), "{q:?} matched {hits:?}");
  }

  let ticket = s
    .list_submissions(tenant.tenant_id, &SubmissionFilter::default())
    .await
    .unwrap()[0]
    .ticket_number
    .to_string();
  let lowered = s
    .list_submissions(tenant.tenant_id, &SubmissionFilter {
      text: Some(ticket.to_lowercase()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert!(lowered.is_empty());
}

// ─── Call log ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn call_logs_round_trip_newest_first() {
  let s = store().await;
  let tenant = s.add_tenant("Acme".into()).await.unwrap();

  let log = |status, reason| NewCallLog {
    tenant_id: tenant.tenant_id,
    phone: "+33612345678".into(),
    message: String::new(),
    status,
    reason,
    call_id: "c".into(),
  };

  let first = s
    .insert_call_log(log(CallStatus::Filtered, CallReason::OutsideScheduleTime))
    .await
    .unwrap();
  let second = s
    .insert_call_log(log(CallStatus::Sent, CallReason::MobileOk))
    .await
    .unwrap();

  let logs = s.list_call_logs(tenant.tenant_id, None).await.unwrap();
  assert_eq!(logs, vec![second.clone(), first]);

  let latest = s.list_call_logs(tenant.tenant_id, Some(1)).await.unwrap();
  assert_eq!(latest, vec![second]);
}
