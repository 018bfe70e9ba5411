//! Generic CRUD manager over one REST collection
//!
//! Each resource kind (agents, streams, chat keywords, flagged objects)
//! implements [`Resource`]; [`ResourceManager`] does the rest. The visible
//! list is a [`Snapshot`] refreshed by a full `list()` after every successful
//! mutation. Nothing is spliced in locally.
//!
//! Edits are an explicit per-row edit mode (`begin_edit` → `set_edit_draft` →
//! `commit_edit` | `cancel_edit`) rather than a blocking prompt.

pub mod kinds;

use crate::api::models::Ack;
use crate::api::{ApiClient, OpError, OpPolicy, ValidationError};
use crate::poller::{refresh_into, Snapshot};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;

pub use kinds::{Agents, Keywords, Objects, Streams};

/// A text field of a create form or an edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Username,
    Password,
    Url,
    Keyword,
    ObjectName,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Username => "Username",
            Self::Password => "Password",
            Self::Url => "Stream URL",
            Self::Keyword => "Keyword",
            Self::ObjectName => "Object name",
        }
    }

    /// Masked on screen, never pre-filled
    pub fn is_secret(&self) -> bool {
        matches!(self, Self::Password)
    }
}

/// One kind of server-owned collection
pub trait Resource: Send + Sync + 'static {
    type Item: DeserializeOwned + Clone + Send + Sync + 'static;
    type Draft: Serialize + Default + Clone + Send + Sync + 'static;

    /// Tab title
    const TITLE: &'static str;
    /// Singular noun used in messages
    const NOUN: &'static str;
    /// Collection endpoint; items live at `{PATH}/{id}`
    const PATH: &'static str;
    const CREATE_FAILED: &'static str;
    const COLUMNS: &'static [&'static str];
    const DRAFT_FIELDS: &'static [Field];
    const EDIT_FIELDS: &'static [Field];

    fn id(item: &Self::Item) -> i64;
    fn cells(item: &Self::Item) -> Vec<String>;

    /// Required-field checks run before any request is built
    fn validate(draft: &Self::Draft) -> Result<(), ValidationError>;
    /// Copy of the draft with surrounding whitespace removed
    fn trimmed(draft: &Self::Draft) -> Self::Draft;

    fn draft_value(draft: &Self::Draft, field: Field) -> String;
    fn set_draft_value(draft: &mut Self::Draft, field: Field, value: String);

    /// Current value the edit starts from; `None` for write-only fields
    fn current_value(item: &Self::Item, field: Field) -> Option<String>;
    /// PUT body for one edited field
    fn patch(field: Field, value: &str) -> serde_json::Value;
}

/// Feedback line under a form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// An in-progress inline edit of one field of one row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditState {
    pub editing_id: i64,
    pub field: Field,
    pub draft_value: String,
}

struct FormState<D> {
    draft: D,
    notice: Option<Notice>,
    edit: Option<EditState>,
}

impl<D: Default> Default for FormState<D> {
    fn default() -> Self {
        Self {
            draft: D::default(),
            notice: None,
            edit: None,
        }
    }
}

pub struct ResourceManager<R: Resource> {
    api: ApiClient,
    items: Snapshot<Vec<R::Item>>,
    form: Arc<Mutex<FormState<R::Draft>>>,
}

impl<R: Resource> Clone for ResourceManager<R> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            items: self.items.clone(),
            form: Arc::clone(&self.form),
        }
    }
}

impl<R: Resource> ResourceManager<R> {
    pub const LIST_POLICY: OpPolicy = OpPolicy::READ;
    pub const MUTATE_POLICY: OpPolicy = OpPolicy::WRITE;

    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            items: Snapshot::new(),
            form: Arc::new(Mutex::new(FormState::default())),
        }
    }

    fn form(&self) -> MutexGuard<'_, FormState<R::Draft>> {
        self.form.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn item_path(id: i64) -> String {
        format!("{}/{}", R::PATH, id)
    }

    pub fn items(&self) -> &Snapshot<Vec<R::Item>> {
        &self.items
    }

    /// Replace the snapshot with the server's list
    pub async fn list(&self) {
        let api = self.api.clone();
        let fetch = async move { api.get::<Vec<R::Item>>(R::PATH).await };
        if let Err(e) = refresh_into(&self.items, fetch).await {
            if Self::LIST_POLICY.report_errors {
                self.set_notice(Notice::Error(e.to_string()));
            } else {
                tracing::warn!(resource = R::NOUN, "List failed, keeping previous snapshot: {}", e);
            }
        }
    }

    /// Validate, POST, and on success clear the form draft and re-list
    pub async fn create(&self, draft: R::Draft) -> Result<String, OpError> {
        let result = self.try_create(&draft).await;
        match &result {
            Ok(message) => {
                {
                    let mut form = self.form();
                    form.draft = R::Draft::default();
                    form.notice = Some(Notice::Success(message.clone()));
                }
                self.list().await;
            }
            Err(e) => self.report(e, R::CREATE_FAILED),
        }
        result
    }

    async fn try_create(&self, draft: &R::Draft) -> Result<String, OpError> {
        R::validate(draft)?;
        let body = R::trimmed(draft);
        let ack: Ack = self.api.post_json(R::PATH, &body).await?;
        Ok(ack
            .message
            .unwrap_or_else(|| format!("{} created.", capitalize(R::NOUN))))
    }

    /// Submit whatever is currently in the form
    pub async fn submit_draft(&self) -> Result<String, OpError> {
        let draft = self.form().draft.clone();
        self.create(draft).await
    }

    /// PUT one field. Returns `Ok(None)` when the change was elided: the
    /// value is blank or equal to the current one, and nothing was sent.
    pub async fn update(&self, id: i64, field: Field, value: &str) -> Result<Option<String>, OpError> {
        let value = value.trim();
        let current = self.items.with(|items| {
            items
                .and_then(|items| items.iter().find(|item| R::id(item) == id))
                .and_then(|item| R::current_value(item, field))
        });
        if value.is_empty() || current.as_deref() == Some(value) {
            tracing::debug!(resource = R::NOUN, id, "Edit unchanged, skipping update");
            return Ok(None);
        }

        let patch = R::patch(field, value);
        match self.api.put_json::<_, Ack>(&Self::item_path(id), &patch).await {
            Ok(ack) => {
                let message = ack
                    .message
                    .unwrap_or_else(|| format!("{} updated.", capitalize(R::NOUN)));
                self.set_notice(Notice::Success(message.clone()));
                self.list().await;
                Ok(Some(message))
            }
            Err(e) => {
                let e = OpError::Request(e);
                self.report(&e, &format!("Error updating {}.", R::NOUN));
                Err(e)
            }
        }
    }

    /// Enter edit mode for one field of one row
    pub fn begin_edit(&self, id: i64, field: Field) {
        if !R::EDIT_FIELDS.contains(&field) {
            return;
        }
        let current = self.items.with(|items| {
            items
                .and_then(|items| items.iter().find(|item| R::id(item) == id))
                .and_then(|item| R::current_value(item, field))
        });
        self.form().edit = Some(EditState {
            editing_id: id,
            field,
            draft_value: current.unwrap_or_default(),
        });
    }

    pub fn set_edit_draft(&self, value: String) {
        if let Some(edit) = self.form().edit.as_mut() {
            edit.draft_value = value;
        }
    }

    pub fn cancel_edit(&self) {
        self.form().edit = None;
    }

    pub fn editing(&self) -> Option<EditState> {
        self.form().edit.clone()
    }

    /// Leave edit mode and send the edit (unless elided)
    pub async fn commit_edit(&self) -> Result<Option<String>, OpError> {
        let edit = self.form().edit.take();
        let Some(edit) = edit else {
            return Ok(None);
        };
        self.update(edit.editing_id, edit.field, &edit.draft_value).await
    }

    /// Fire-and-forget delete, followed by a refresh whatever the outcome
    pub async fn delete(&self, id: i64) {
        match self.api.delete::<Ack>(&Self::item_path(id)).await {
            Ok(_) => tracing::info!(resource = R::NOUN, id, "Deleted"),
            Err(e) => tracing::warn!(resource = R::NOUN, id, "Delete failed: {}", e),
        }
        self.list().await;
    }

    pub fn draft(&self) -> R::Draft {
        self.form().draft.clone()
    }

    pub fn draft_value(&self, field: Field) -> String {
        R::draft_value(&self.form().draft, field)
    }

    pub fn set_draft_value(&self, field: Field, value: String) {
        R::set_draft_value(&mut self.form().draft, field, value);
    }

    pub fn notice(&self) -> Option<Notice> {
        self.form().notice.clone()
    }

    fn set_notice(&self, notice: Notice) {
        self.form().notice = Some(notice);
    }

    fn report(&self, error: &OpError, fallback: &str) {
        if !Self::MUTATE_POLICY.report_errors {
            return;
        }
        if let OpError::Request(e) = error {
            tracing::warn!(resource = R::NOUN, "Request failed: {}", e);
        }
        self.set_notice(Notice::Error(error.user_message(fallback)));
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Type-erased view of a [`ResourceManager`] for the TUI
///
/// The `spawn_*` methods start the operation on the runtime and return
/// immediately; results land in the snapshot and the notice.
pub trait CrudView: Send + Sync {
    fn title(&self) -> &'static str;
    fn columns(&self) -> &'static [&'static str];
    /// `None` until the first list lands
    fn rows(&self) -> Option<Vec<(i64, Vec<String>)>>;
    fn draft_fields(&self) -> &'static [Field];
    fn edit_fields(&self) -> &'static [Field];
    fn draft_value(&self, field: Field) -> String;
    fn set_draft_value(&self, field: Field, value: String);
    fn notice(&self) -> Option<Notice>;
    fn editing(&self) -> Option<EditState>;
    fn begin_edit(&self, id: i64, field: Field);
    fn set_edit_draft(&self, value: String);
    fn cancel_edit(&self);
    /// Refresh the list; the handle lets a view own the load
    fn spawn_list(&self) -> JoinHandle<()>;
    fn spawn_create(&self);
    fn spawn_commit_edit(&self);
    fn spawn_delete(&self, id: i64);
}

impl<R: Resource> CrudView for ResourceManager<R> {
    fn title(&self) -> &'static str {
        R::TITLE
    }

    fn columns(&self) -> &'static [&'static str] {
        R::COLUMNS
    }

    fn rows(&self) -> Option<Vec<(i64, Vec<String>)>> {
        self.items.with(|items| {
            items.map(|items| {
                items
                    .iter()
                    .map(|item| (R::id(item), R::cells(item)))
                    .collect()
            })
        })
    }

    fn draft_fields(&self) -> &'static [Field] {
        R::DRAFT_FIELDS
    }

    fn edit_fields(&self) -> &'static [Field] {
        R::EDIT_FIELDS
    }

    fn draft_value(&self, field: Field) -> String {
        ResourceManager::draft_value(self, field)
    }

    fn set_draft_value(&self, field: Field, value: String) {
        ResourceManager::set_draft_value(self, field, value)
    }

    fn notice(&self) -> Option<Notice> {
        ResourceManager::notice(self)
    }

    fn editing(&self) -> Option<EditState> {
        ResourceManager::editing(self)
    }

    fn begin_edit(&self, id: i64, field: Field) {
        ResourceManager::begin_edit(self, id, field)
    }

    fn set_edit_draft(&self, value: String) {
        ResourceManager::set_edit_draft(self, value)
    }

    fn cancel_edit(&self) {
        ResourceManager::cancel_edit(self)
    }

    fn spawn_list(&self) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move { manager.list().await })
    }

    fn spawn_create(&self) {
        let manager = self.clone();
        tokio::spawn(async move {
            let _ = manager.submit_draft().await;
        });
    }

    fn spawn_commit_edit(&self) {
        let manager = self.clone();
        tokio::spawn(async move {
            let _ = manager.commit_edit().await;
        });
    }

    fn spawn_delete(&self, id: i64) {
        let manager = self.clone();
        tokio::spawn(async move { manager.delete(id).await });
    }
}
