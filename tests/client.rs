use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use carelink_api::client::{Client, ClientError, Transport, WireCall};
use carelink_api::filter::{FilterCondition, FilterOp, FilterValue, Scalar};

/// Records each call and answers with the next canned `data` value.
#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<WireCall>>,
    answers: Mutex<Vec<Value>>,
}

impl Recorder {
    fn answering(answers: Vec<Value>) -> Self {
        Self { calls: Mutex::new(vec![]), answers: Mutex::new(answers) }
    }

    fn calls(&self) -> Vec<WireCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for Recorder {
    async fn send(&self, call: WireCall) -> Result<Value, ClientError> {
        self.calls.lock().unwrap().push(call);
        let mut answers = self.answers.lock().unwrap();
        Ok(if answers.is_empty() { json!([]) } else { answers.remove(0) })
    }
}

#[tokio::test]
async fn none_values_are_skipped() -> Result<()> {
    let client = Client::new(Recorder::default());
    let status: Option<&str> = None;

    let request = client
        .from("therapy_sessions")
        .eq("status", status)
        .in_("therapist_id", None::<Vec<&str>>)
        .eq("session_type", Some("video"))
        .into_request();

    assert_eq!(request.filters, vec![FilterCondition::eq("session_type", "video")]);
    Ok(())
}

#[tokio::test]
async fn empty_in_list_is_sent_for_the_server_to_reject() -> Result<()> {
    let client = Client::new(Recorder::default());

    client.from("support_groups").in_("meeting_day", Vec::<&str>::new()).execute().await?;

    match &client.transport().calls()[0] {
        WireCall::Find { query, .. } => {
            assert_eq!(query.filters[0].op, FilterOp::In);
            assert_eq!(query.filters[0].value, FilterValue::Many(vec![]));
        }
        other => panic!("expected a find call, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn single_forces_limit_one_and_returns_the_first_row() -> Result<()> {
    let client = Client::new(Recorder::answering(vec![json!([{ "id": "a" }])]));

    let row = client.from("profiles").eq("email", "sam@example.org").limit(50).single().await?;

    assert_eq!(row["id"], json!("a"));
    match &client.transport().calls()[0] {
        WireCall::Find { table, query } => {
            assert_eq!(table, "profiles");
            assert_eq!(query.limit, Some(1));
        }
        other => panic!("expected a find call, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn single_with_no_rows_is_not_found() -> Result<()> {
    let client = Client::new(Recorder::answering(vec![json!([])]));

    let err = client.from("profiles").single().await.unwrap_err();

    assert!(matches!(err, ClientError::NotFound));
    assert_eq!(err.code(), Some("NOT_FOUND"));
    Ok(())
}

#[tokio::test]
async fn terminal_calls_map_to_wire_calls() -> Result<()> {
    let client = Client::new(Recorder::answering(vec![json!(3), json!([]), json!([])]));

    let count = client.from("mood_entries").gte("mood_score", 4).count().await?;
    client
        .from("mood_entries")
        .eq("id", "m1")
        .update(json!({ "note": "better" }).as_object().cloned().unwrap())
        .await?;
    client.from("mood_entries").eq("id", "m1").delete().await?;

    assert_eq!(count, 3);
    let calls = client.transport().calls();
    assert!(matches!(&calls[0], WireCall::Count { table, .. } if table == "mood_entries"));
    match &calls[1] {
        WireCall::Update { body, .. } => {
            assert_eq!(body.patch["note"], json!("better"));
            assert_eq!(body.filters, vec![FilterCondition::eq("id", "m1")]);
        }
        other => panic!("expected an update call, got {:?}", other),
    }
    match &calls[2] {
        WireCall::Delete { body, .. } => assert_eq!(body.filters.len(), 1),
        other => panic!("expected a delete call, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn builder_preserves_call_order() -> Result<()> {
    let client = Client::new(Recorder::default());

    let request = client
        .from("therapy_sessions")
        .select("id, scheduled_at")
        .gt("duration_minutes", 30)
        .like("notes", "anxiety")
        .order("scheduled_at", false)
        .offset(20)
        .into_request();

    assert_eq!(request.select, vec!["id", "scheduled_at"]);
    assert_eq!(request.filters[0].value, FilterValue::One(Scalar::Int(30)));
    assert_eq!(request.filters[1].op, FilterOp::Like);
    assert_eq!(request.pagination.offset, Some(20));
    assert_eq!(request.pagination.limit, None);
    Ok(())
}
