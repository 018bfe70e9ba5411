//! The four collections an admin manages

use super::{Field, Resource};
use crate::api::models::{Agent, ChatKeyword, FlaggedObject, Platform, Stream};
use crate::api::{require, ValidationError};
use serde::Serialize;
use serde_json::json;

pub struct Agents;

#[derive(Debug, Clone, Default, Serialize)]
pub struct AgentDraft {
    pub username: String,
    pub password: String,
}

impl Resource for Agents {
    type Item = Agent;
    type Draft = AgentDraft;

    const TITLE: &'static str = "Agents";
    const NOUN: &'static str = "agent";
    const PATH: &'static str = "/api/agents";
    const CREATE_FAILED: &'static str = "Error creating agent.";
    const COLUMNS: &'static [&'static str] = &["ID", "Username"];
    const DRAFT_FIELDS: &'static [Field] = &[Field::Username, Field::Password];
    const EDIT_FIELDS: &'static [Field] = &[Field::Username, Field::Password];

    fn id(item: &Agent) -> i64 {
        item.id
    }

    fn cells(item: &Agent) -> Vec<String> {
        vec![item.id.to_string(), item.username.clone()]
    }

    fn validate(draft: &AgentDraft) -> Result<(), ValidationError> {
        const MSG: &str = "Username and password are required.";
        require(&draft.username, MSG)?;
        require(&draft.password, MSG)
    }

    fn trimmed(draft: &AgentDraft) -> AgentDraft {
        // Passwords are sent as typed
        AgentDraft {
            username: draft.username.trim().to_string(),
            password: draft.password.clone(),
        }
    }

    fn draft_value(draft: &AgentDraft, field: Field) -> String {
        match field {
            Field::Username => draft.username.clone(),
            Field::Password => draft.password.clone(),
            _ => String::new(),
        }
    }

    fn set_draft_value(draft: &mut AgentDraft, field: Field, value: String) {
        match field {
            Field::Username => draft.username = value,
            Field::Password => draft.password = value,
            _ => {}
        }
    }

    fn current_value(item: &Agent, field: Field) -> Option<String> {
        match field {
            Field::Username => Some(item.username.clone()),
            _ => None,
        }
    }

    fn patch(field: Field, value: &str) -> serde_json::Value {
        match field {
            Field::Password => json!({ "password": value }),
            _ => json!({ "username": value }),
        }
    }
}

pub struct Streams;

#[derive(Debug, Clone, Default, Serialize)]
pub struct StreamDraft {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub streamer_username: Option<String>,
}

impl Resource for Streams {
    type Item = Stream;
    type Draft = StreamDraft;

    const TITLE: &'static str = "Streams";
    const NOUN: &'static str = "stream";
    const PATH: &'static str = "/api/streams";
    const CREATE_FAILED: &'static str = "Error creating stream.";
    const COLUMNS: &'static [&'static str] = &["ID", "URL", "Platform", "Streamer"];
    const DRAFT_FIELDS: &'static [Field] = &[Field::Url];
    const EDIT_FIELDS: &'static [Field] = &[Field::Url];

    fn id(item: &Stream) -> i64 {
        item.id
    }

    fn cells(item: &Stream) -> Vec<String> {
        vec![
            item.id.to_string(),
            item.location().to_string(),
            item.platform.unwrap_or_default().as_str().to_string(),
            item.streamer_username.clone().unwrap_or_default(),
        ]
    }

    fn validate(draft: &StreamDraft) -> Result<(), ValidationError> {
        require(&draft.url, "Stream URL is required.")
    }

    fn trimmed(draft: &StreamDraft) -> StreamDraft {
        let trim = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        StreamDraft {
            url: draft.url.trim().to_string(),
            room_url: trim(&draft.room_url),
            platform: draft.platform,
            streamer_username: trim(&draft.streamer_username),
        }
    }

    fn draft_value(draft: &StreamDraft, field: Field) -> String {
        match field {
            Field::Url => draft.url.clone(),
            _ => String::new(),
        }
    }

    fn set_draft_value(draft: &mut StreamDraft, field: Field, value: String) {
        if field == Field::Url {
            draft.url = value;
        }
    }

    fn current_value(item: &Stream, field: Field) -> Option<String> {
        (field == Field::Url).then(|| item.location().to_string())
    }

    fn patch(_field: Field, value: &str) -> serde_json::Value {
        json!({ "url": value })
    }
}

pub struct Keywords;

#[derive(Debug, Clone, Default, Serialize)]
pub struct KeywordDraft {
    pub keyword: String,
}

impl Resource for Keywords {
    type Item = ChatKeyword;
    type Draft = KeywordDraft;

    const TITLE: &'static str = "Keywords";
    const NOUN: &'static str = "keyword";
    const PATH: &'static str = "/api/keywords";
    const CREATE_FAILED: &'static str = "Error adding keyword.";
    const COLUMNS: &'static [&'static str] = &["ID", "Keyword"];
    const DRAFT_FIELDS: &'static [Field] = &[Field::Keyword];
    const EDIT_FIELDS: &'static [Field] = &[Field::Keyword];

    fn id(item: &ChatKeyword) -> i64 {
        item.id
    }

    fn cells(item: &ChatKeyword) -> Vec<String> {
        vec![item.id.to_string(), item.keyword.clone()]
    }

    fn validate(draft: &KeywordDraft) -> Result<(), ValidationError> {
        require(&draft.keyword, "Keyword is required.")
    }

    fn trimmed(draft: &KeywordDraft) -> KeywordDraft {
        KeywordDraft {
            keyword: draft.keyword.trim().to_string(),
        }
    }

    fn draft_value(draft: &KeywordDraft, _field: Field) -> String {
        draft.keyword.clone()
    }

    fn set_draft_value(draft: &mut KeywordDraft, _field: Field, value: String) {
        draft.keyword = value;
    }

    fn current_value(item: &ChatKeyword, _field: Field) -> Option<String> {
        Some(item.keyword.clone())
    }

    fn patch(_field: Field, value: &str) -> serde_json::Value {
        json!({ "keyword": value })
    }
}

pub struct Objects;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ObjectDraft {
    pub object_name: String,
}

impl Resource for Objects {
    type Item = FlaggedObject;
    type Draft = ObjectDraft;

    const TITLE: &'static str = "Objects";
    const NOUN: &'static str = "object";
    const PATH: &'static str = "/api/objects";
    const CREATE_FAILED: &'static str = "Error adding object.";
    const COLUMNS: &'static [&'static str] = &["ID", "Object"];
    const DRAFT_FIELDS: &'static [Field] = &[Field::ObjectName];
    const EDIT_FIELDS: &'static [Field] = &[Field::ObjectName];

    fn id(item: &FlaggedObject) -> i64 {
        item.id
    }

    fn cells(item: &FlaggedObject) -> Vec<String> {
        vec![item.id.to_string(), item.object_name.clone()]
    }

    fn validate(draft: &ObjectDraft) -> Result<(), ValidationError> {
        require(&draft.object_name, "Object name is required.")
    }

    fn trimmed(draft: &ObjectDraft) -> ObjectDraft {
        ObjectDraft {
            object_name: draft.object_name.trim().to_string(),
        }
    }

    fn draft_value(draft: &ObjectDraft, _field: Field) -> String {
        draft.object_name.clone()
    }

    fn set_draft_value(draft: &mut ObjectDraft, _field: Field, value: String) {
        draft.object_name = value;
    }

    fn current_value(item: &FlaggedObject, _field: Field) -> Option<String> {
        Some(item.object_name.clone())
    }

    fn patch(_field: Field, value: &str) -> serde_json::Value {
        json!({ "object_name": value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_password_is_write_only() {
        let agent = Agent {
            id: 3,
            username: "bob".into(),
        };
        assert_eq!(
            Agents::current_value(&agent, Field::Username).as_deref(),
            Some("bob")
        );
        assert_eq!(Agents::current_value(&agent, Field::Password), None);
        assert_eq!(
            Agents::patch(Field::Password, "s3cret"),
            json!({"password": "s3cret"})
        );
    }

    #[test]
    fn test_stream_draft_omits_empty_optionals() {
        let draft = Streams::trimmed(&StreamDraft {
            url: " https://chaturbate.com/caylin/ ".into(),
            room_url: Some("   ".into()),
            platform: None,
            streamer_username: None,
        });
        assert_eq!(
            serde_json::to_value(&draft).unwrap(),
            json!({"url": "https://chaturbate.com/caylin/"})
        );
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            Keywords::validate(&KeywordDraft::default()),
            Err(ValidationError("Keyword is required."))
        );
        assert_eq!(
            Objects::validate(&ObjectDraft::default()),
            Err(ValidationError("Object name is required."))
        );
        assert_eq!(
            Streams::validate(&StreamDraft::default()),
            Err(ValidationError("Stream URL is required."))
        );
    }
}
