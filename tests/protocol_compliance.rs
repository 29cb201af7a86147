//! A2A wire-format compliance tests
//!
//! These tests pin the JSON shapes exchanged with peer agents.

use a2a_mesh::{
    codec::{parse_request, JsonRpcResponse, RequestId},
    protocol::{
        agent::{AgentCard, AgentSkill},
        error::A2AError,
        message::{Message, MessagePart, Role},
        task::{Task, TaskState},
    },
};
use serde_json::json;

#[test]
fn test_role_serialization() {
    let json = serde_json::to_value(Message::user("Hello")).unwrap();
    assert_eq!(json["role"], "user");

    let json = serde_json::to_value(Message::agent("Hi there")).unwrap();
    assert_eq!(json["role"], "agent");
}

#[test]
fn test_parts_are_tagged_by_kind() {
    let json = serde_json::to_value(MessagePart::text("Hello, world!")).unwrap();
    assert_eq!(json, json!({"kind": "text", "text": "Hello, world!"}));

    let json = serde_json::to_value(MessagePart::file("doc.pdf", "https://example.com/doc.pdf")).unwrap();
    assert_eq!(json["kind"], "file");
    assert_eq!(json["file"]["name"], "doc.pdf");
    assert_eq!(json["file"]["uri"], "https://example.com/doc.pdf");

    let json = serde_json::to_value(MessagePart::tool_result("call-1", json!("ok"), false)).unwrap();
    assert_eq!(json["kind"], "tool_result");
    assert_eq!(json["toolCallId"], "call-1");
    assert_eq!(json["isError"], false);
}

#[test]
fn test_inbound_message_without_id_gets_one() {
    let message: Message = serde_json::from_value(json!({
        "role": "user",
        "parts": [{"kind": "text", "text": "Hello"}]
    }))
    .unwrap();

    assert!(!message.message_id.is_empty());
    assert_eq!(message.role, Role::User);
    assert_eq!(message.text_content(), "Hello");
}

#[test]
fn test_task_uses_camel_case_and_kebab_states() {
    let task = Task::new("task-1", "ctx-1");
    let json = serde_json::to_value(&task).unwrap();

    assert_eq!(json["contextId"], "ctx-1");
    assert_eq!(json["status"]["state"], "submitted");
    assert!(json.get("createdAt").is_some());
    assert!(json.get("artifacts").is_none());

    assert_eq!(serde_json::to_value(TaskState::Canceled).unwrap(), "canceled");
}

#[test]
fn test_agent_card_wire_shape() {
    let card = AgentCard::new("Agent", "Test agent", "http://127.0.0.1:4100/a2a")
        .with_skill(AgentSkill::new("echo", "Echo").with_tags(["test"]));
    let json = serde_json::to_value(&card).unwrap();

    assert!(json["protocolVersion"].is_string());
    assert_eq!(json["defaultInputModes"], json!(["text/plain"]));
    assert_eq!(json["skills"][0]["id"], "echo");
    assert!(card.validate().is_ok());
}

#[test]
fn test_card_without_skills_lists_every_violation() {
    let card: AgentCard = serde_json::from_value(json!({
        "protocolVersion": "0.3.0",
        "name": "",
        "description": "No skills",
        "url": "http://127.0.0.1:4100/a2a",
        "version": "1.0.0",
        "capabilities": {},
        "skills": []
    }))
    .unwrap();

    let err = card.validate().unwrap_err();
    let text = err.to_string();
    assert!(text.contains("name is required"));
    assert!(text.contains("at least one skill is required"));
}

#[test]
fn test_error_response_envelope() {
    let response = JsonRpcResponse::from_error(
        Some(RequestId::String("abc".into())),
        &A2AError::TaskNotFound {
            task_id: "t-9".into(),
        },
    );
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["jsonrpc"], "2.0");
    assert_eq!(json["id"], "abc");
    assert_eq!(json["error"]["code"], -32001);
    assert!(json.get("result").is_none());
}

#[test]
fn test_parse_request_rejections() {
    let parse_error = parse_request(b"not json").unwrap_err();
    assert_eq!(parse_error.error.unwrap().code, -32700);
    assert_eq!(parse_error.id, None);

    let invalid = parse_request(br#"{"jsonrpc":"2.0","id":3}"#).unwrap_err();
    assert_eq!(invalid.error.unwrap().code, -32600);
}
