// Demo mode: an in-process monitoring API backed by in-memory state
//
// Serves every endpoint the console talks to so the TUI can be explored (and
// tested) without the real backend. Detections are deterministic fakes; the
// scraper just parses the room URL. Nothing is persisted.
//
// Behaviour mirrors the production API where the console depends on it:
// - cookie sessions, 401 when anonymous, 403 on role mismatch
// - duplicate usernames/URLs/keywords/objects are rejected with a message
// - assigning the same stream to the same agent twice is rejected
// - concurrent edits are last-write-wins
//
// Every request is recorded (method + path) so tests can count round trips.
//
// Run with: STREAMWATCH_DEMO=1 cargo run --release

use crate::api::models::{Platform, Role};
use anyhow::{Context, Result};
use axum::{
    extract::{Multipart, Path, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{Duration as ChronoDuration, Utc};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const SESSION_COOKIE: &str = "sw_session";

/// Thumbnails revealed per gallery poll (simulates incremental processing)
const GALLERY_CLASSES: [&str; 3] = ["knife", "gun", "rifle"];

/// A request seen by the demo backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
}

#[derive(Debug, Clone)]
struct UserRow {
    id: i64,
    username: String,
    password: String,
    role: Role,
}

#[derive(Debug, Clone)]
struct StreamRow {
    id: i64,
    url: String,
    room_url: Option<String>,
    platform: Platform,
    streamer_username: Option<String>,
}

#[derive(Debug, Clone)]
struct AssignmentRow {
    id: i64,
    agent_id: i64,
    stream_id: i64,
}

#[derive(Debug, Clone)]
struct UploadJob {
    polls_gallery: usize,
    polls_audio: usize,
}

#[derive(Debug, Default)]
struct Store {
    next_id: i64,
    users: Vec<UserRow>,
    streams: Vec<StreamRow>,
    assignments: Vec<AssignmentRow>,
    keywords: Vec<(i64, String)>,
    objects: Vec<(i64, String)>,
    logs: Vec<Value>,
    sessions: HashMap<String, i64>,
    uploads: HashMap<i64, UploadJob>,
    requests: Vec<RecordedRequest>,
}

impl Store {
    fn seeded() -> Self {
        let mut store = Self::default();
        store.add_user("admin", "admin", Role::Admin);
        store.add_user("agent", "agent", Role::Agent);
        for keyword in ["gun", "knife", "hate"] {
            let id = store.id();
            store.keywords.push((id, keyword.to_string()));
        }
        for object in ["knife", "gun", "rifle", "blade"] {
            let id = store.id();
            store.objects.push((id, object.to_string()));
        }
        let now = Utc::now();
        for (minutes_ago, url, event) in [
            (42, "https://chaturbate.com/caylin/", "visual"),
            (17, "https://stripchat.com/nova/", "chat"),
            (3, "https://chaturbate.com/caylin/", "audio"),
        ] {
            let id = store.id();
            store.logs.push(json!({
                "id": id,
                "timestamp": (now - ChronoDuration::minutes(minutes_ago)).to_rfc3339(),
                "stream_url": url,
                "event_type": event,
            }));
        }
        store
    }

    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn add_user(&mut self, username: &str, password: &str, role: Role) -> i64 {
        let id = self.id();
        self.users.push(UserRow {
            id,
            username: username.to_string(),
            password: password.to_string(),
            role,
        });
        id
    }

    fn session_user(&self, headers: &HeaderMap) -> Option<&UserRow> {
        let token = session_token(headers)?;
        let user_id = self.sessions.get(&token)?;
        self.users.iter().find(|u| u.id == *user_id)
    }

    /// Role guard: 401 without a session, 403 on role mismatch
    fn guard(&self, headers: &HeaderMap, role: Option<Role>) -> Result<UserRow, Reply> {
        let Some(user) = self.session_user(headers) else {
            return Err(reply(StatusCode::UNAUTHORIZED, "Authentication required"));
        };
        match role {
            Some(required) if user.role != required => {
                Err(reply(StatusCode::FORBIDDEN, "Unauthorized"))
            }
            _ => Ok(user.clone()),
        }
    }

    fn stream_json(stream: &StreamRow) -> Value {
        json!({
            "id": stream.id,
            "url": stream.url,
            "room_url": stream.room_url,
            "platform": stream.platform.as_str(),
            "streamer_username": stream.streamer_username,
        })
    }

    fn ongoing(&self, filter_agent: Option<i64>) -> Value {
        let rows: Vec<Value> = self
            .assignments
            .iter()
            .filter(|a| filter_agent.map_or(true, |agent| a.agent_id == agent))
            .filter_map(|a| {
                let stream = self.streams.iter().find(|s| s.id == a.stream_id)?;
                let agent = self.users.iter().find(|u| u.id == a.agent_id)?;
                Some(json!({
                    "assignment_id": a.id,
                    "stream_id": stream.id,
                    "stream_url": stream.url,
                    "agent_id": agent.id,
                    "agent_username": agent.username,
                    "streamer_username": stream.streamer_username,
                    "platform": stream.platform.as_str(),
                }))
            })
            .collect();
        let mut ids: Vec<i64> = rows
            .iter()
            .filter_map(|r| r["stream_id"].as_i64())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        json!({ "ongoing_streams": ids.len(), "assignments": rows })
    }
}

type Shared = Arc<Mutex<Store>>;
type Reply = (StatusCode, Json<Value>);

fn lock(state: &Shared) -> MutexGuard<'_, Store> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn reply(status: StatusCode, message: &str) -> Reply {
    (status, Json(json!({ "message": message })))
}

fn ok(message: &str) -> Reply {
    reply(StatusCode::OK, message)
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

/// Session token without pulling in a RNG crate
fn new_token(seq: i64) -> String {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_i64(seq);
    hasher.write_i64(Utc::now().timestamp_nanos_opt().unwrap_or_default());
    format!("{:016x}", hasher.finish())
}

fn text_field(body: &Value, key: &str) -> String {
    body.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Ids arrive as numbers or numeric strings depending on the client
fn id_field(body: &Value, key: &str) -> Option<i64> {
    match body.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn platform_field(body: &Value) -> Platform {
    body.get("platform")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let username = text_field(&body, "username");
    let password = text_field(&body, "password");
    let mut store = lock(&state);

    let found = store
        .users
        .iter()
        .find(|u| u.username == username && u.password == password)
        .map(|u| (u.id, u.role));

    let Some((user_id, role)) = found else {
        return reply(StatusCode::UNAUTHORIZED, "Invalid credentials").into_response();
    };

    let seq = store.id();
    let token = new_token(seq);
    store.sessions.insert(token.clone(), user_id);

    let cookie = format!("{}={}; Path=/; HttpOnly", SESSION_COOKIE, token);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "message": "Login successful", "role": role })),
    )
        .into_response()
}

async fn logout(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if let Some(token) = session_token(&headers) {
        lock(&state).sessions.remove(&token);
    }
    let expired = format!("{}=; Path=/; Max-Age=0", SESSION_COOKIE);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, expired)],
        Json(json!({ "message": "Logged out" })),
    )
        .into_response()
}

async fn session(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let store = lock(&state);
    match store.session_user(&headers) {
        Some(user) => (
            StatusCode::OK,
            Json(json!({
                "logged_in": true,
                "user": { "id": user.id, "username": user.username, "role": user.role },
            })),
        ),
        None => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "logged_in": false })),
        ),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Agents
// ─────────────────────────────────────────────────────────────────────────────

async fn list_agents(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let store = lock(&state);
    if let Err(denied) = store.guard(&headers, Some(Role::Admin)) {
        return denied;
    }
    let agents: Vec<Value> = store
        .users
        .iter()
        .filter(|u| u.role == Role::Agent)
        .map(|u| json!({ "id": u.id, "username": u.username }))
        .collect();
    (StatusCode::OK, Json(Value::Array(agents)))
}

async fn create_agent(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut store = lock(&state);
    if let Err(denied) = store.guard(&headers, Some(Role::Admin)) {
        return denied;
    }
    let username = text_field(&body, "username");
    let password = text_field(&body, "password");
    if username.is_empty() || password.is_empty() {
        return reply(StatusCode::BAD_REQUEST, "Username and password required");
    }
    if store.users.iter().any(|u| u.username == username) {
        return reply(StatusCode::BAD_REQUEST, "Username already exists");
    }
    let id = store.add_user(&username, &password, Role::Agent);
    (
        StatusCode::CREATED,
        Json(json!({
            "message": "Agent created successfully",
            "agent": { "id": id, "username": username },
        })),
    )
}

async fn update_agent(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut store = lock(&state);
    if let Err(denied) = store.guard(&headers, Some(Role::Admin)) {
        return denied;
    }
    let Some(agent) = store
        .users
        .iter_mut()
        .find(|u| u.id == id && u.role == Role::Agent)
    else {
        return reply(StatusCode::NOT_FOUND, "Agent not found");
    };
    let username = text_field(&body, "username");
    let password = text_field(&body, "password");
    if !username.is_empty() {
        agent.username = username;
    }
    if !password.is_empty() {
        agent.password = password;
    }
    ok("Agent updated successfully")
}

async fn delete_agent(State(state): State<Shared>, Path(id): Path<i64>, headers: HeaderMap) -> Reply {
    let mut store = lock(&state);
    if let Err(denied) = store.guard(&headers, Some(Role::Admin)) {
        return denied;
    }
    let before = store.users.len();
    store.users.retain(|u| !(u.id == id && u.role == Role::Agent));
    if store.users.len() == before {
        return reply(StatusCode::NOT_FOUND, "Agent not found");
    }
    store.assignments.retain(|a| a.agent_id != id);
    ok("Agent deleted successfully")
}

// ─────────────────────────────────────────────────────────────────────────────
// Streams
// ─────────────────────────────────────────────────────────────────────────────

async fn list_streams(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let store = lock(&state);
    if let Err(denied) = store.guard(&headers, Some(Role::Admin)) {
        return denied;
    }
    let streams: Vec<Value> = store.streams.iter().map(Store::stream_json).collect();
    (StatusCode::OK, Json(Value::Array(streams)))
}

async fn create_stream(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut store = lock(&state);
    if let Err(denied) = store.guard(&headers, Some(Role::Admin)) {
        return denied;
    }
    let url = text_field(&body, "url");
    if url.is_empty() {
        return reply(StatusCode::BAD_REQUEST, "Stream URL required");
    }
    if store.streams.iter().any(|s| s.url == url) {
        return reply(StatusCode::BAD_REQUEST, "Stream already exists");
    }
    let room_url = Some(text_field(&body, "room_url")).filter(|s| !s.is_empty());
    let streamer_username = Some(text_field(&body, "streamer_username"))
        .filter(|s| !s.is_empty())
        .or_else(|| room_url.as_deref().and_then(streamer_from_url));
    let stream = StreamRow {
        id: store.id(),
        url,
        room_url,
        platform: platform_field(&body),
        streamer_username,
    };
    let created = Store::stream_json(&stream);
    store.streams.push(stream);
    (
        StatusCode::CREATED,
        Json(json!({ "message": "Stream created successfully", "stream": created })),
    )
}

async fn update_stream(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    let mut store = lock(&state);
    if let Err(denied) = store.guard(&headers, Some(Role::Admin)) {
        return denied;
    }
    let Some(stream) = store.streams.iter_mut().find(|s| s.id == id) else {
        return reply(StatusCode::NOT_FOUND, "Stream not found");
    };
    let url = text_field(&body, "url");
    if !url.is_empty() {
        stream.url = url;
    }
    ok("Stream updated successfully")
}

async fn delete_stream(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Reply {
    let mut store = lock(&state);
    if let Err(denied) = store.guard(&headers, Some(Role::Admin)) {
        return denied;
    }
    let before = store.streams.len();
    store.streams.retain(|s| s.id != id);
    if store.streams.len() == before {
        return reply(StatusCode::NOT_FOUND, "Stream not found");
    }
    store.assignments.retain(|a| a.stream_id != id);
    ok("Stream deleted successfully")
}

// ─────────────────────────────────────────────────────────────────────────────
// Keywords and flagged objects (same flat shape)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
enum Lookup {
    Keywords,
    Objects,
}

impl Lookup {
    fn key(self) -> &'static str {
        match self {
            Self::Keywords => "keyword",
            Self::Objects => "object_name",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Keywords => "Keyword",
            Self::Objects => "Object",
        }
    }

    fn rows(self, store: &mut Store) -> &mut Vec<(i64, String)> {
        match self {
            Self::Keywords => &mut store.keywords,
            Self::Objects => &mut store.objects,
        }
    }
}

fn lookup_list(state: &Shared, headers: &HeaderMap, kind: Lookup) -> Reply {
    let mut store = lock(state);
    if let Err(denied) = store.guard(headers, Some(Role::Admin)) {
        return denied;
    }
    let rows: Vec<Value> = kind
        .rows(&mut store)
        .iter()
        .map(|(id, value)| json!({ "id": id, kind.key(): value }))
        .collect();
    (StatusCode::OK, Json(Value::Array(rows)))
}

fn lookup_create(state: &Shared, headers: &HeaderMap, kind: Lookup, body: &Value) -> Reply {
    let mut store = lock(state);
    if let Err(denied) = store.guard(headers, Some(Role::Admin)) {
        return denied;
    }
    let value = text_field(body, kind.key());
    if value.is_empty() {
        return reply(
            StatusCode::BAD_REQUEST,
            &format!("{} required", kind.label()),
        );
    }
    if kind.rows(&mut store).iter().any(|(_, v)| *v == value) {
        return reply(
            StatusCode::BAD_REQUEST,
            &format!("{} already exists", kind.label()),
        );
    }
    let id = store.id();
    kind.rows(&mut store).push((id, value.clone()));
    (
        StatusCode::CREATED,
        Json(json!({
            "message": format!("{} added successfully", kind.label()),
            kind.key(): { "id": id, kind.key(): value },
        })),
    )
}

fn lookup_update(state: &Shared, headers: &HeaderMap, kind: Lookup, id: i64, body: &Value) -> Reply {
    let mut store = lock(state);
    if let Err(denied) = store.guard(headers, Some(Role::Admin)) {
        return denied;
    }
    let value = text_field(body, kind.key());
    let Some(row) = kind.rows(&mut store).iter_mut().find(|(row_id, _)| *row_id == id) else {
        return reply(StatusCode::NOT_FOUND, &format!("{} not found", kind.label()));
    };
    if !value.is_empty() {
        row.1 = value;
    }
    ok(&format!("{} updated successfully", kind.label()))
}

fn lookup_delete(state: &Shared, headers: &HeaderMap, kind: Lookup, id: i64) -> Reply {
    let mut store = lock(state);
    if let Err(denied) = store.guard(headers, Some(Role::Admin)) {
        return denied;
    }
    let rows = kind.rows(&mut store);
    let before = rows.len();
    rows.retain(|(row_id, _)| *row_id != id);
    if rows.len() == before {
        return reply(StatusCode::NOT_FOUND, &format!("{} not found", kind.label()));
    }
    ok(&format!("{} deleted successfully", kind.label()))
}

async fn list_keywords(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    lookup_list(&state, &headers, Lookup::Keywords)
}

async fn create_keyword(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    lookup_create(&state, &headers, Lookup::Keywords, &body)
}

async fn update_keyword(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    lookup_update(&state, &headers, Lookup::Keywords, id, &body)
}

async fn delete_keyword(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Reply {
    lookup_delete(&state, &headers, Lookup::Keywords, id)
}

async fn list_objects(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    lookup_list(&state, &headers, Lookup::Objects)
}

async fn create_object(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    lookup_create(&state, &headers, Lookup::Objects, &body)
}

async fn update_object(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    lookup_update(&state, &headers, Lookup::Objects, id, &body)
}

async fn delete_object(
    State(state): State<Shared>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Reply {
    lookup_delete(&state, &headers, Lookup::Objects, id)
}

// ─────────────────────────────────────────────────────────────────────────────
// Assignments, dashboards, logs
// ─────────────────────────────────────────────────────────────────────────────

async fn assign(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    let mut store = lock(&state);
    if let Err(denied) = store.guard(&headers, Some(Role::Admin)) {
        return denied;
    }
    let (Some(agent_id), Some(stream_id)) = (id_field(&body, "agent_id"), id_field(&body, "stream_id"))
    else {
        return reply(StatusCode::BAD_REQUEST, "Agent and Stream are required");
    };
    let Some(stream_url) = store
        .streams
        .iter()
        .find(|s| s.id == stream_id)
        .map(|s| s.url.clone())
    else {
        return reply(StatusCode::NOT_FOUND, "Stream not found");
    };
    if !store
        .users
        .iter()
        .any(|u| u.id == agent_id && u.role == Role::Agent)
    {
        return reply(StatusCode::NOT_FOUND, "Agent not found");
    }
    if store
        .assignments
        .iter()
        .any(|a| a.agent_id == agent_id && a.stream_id == stream_id)
    {
        return reply(
            StatusCode::BAD_REQUEST,
            "This stream is already assigned to this agent",
        );
    }
    let id = store.id();
    store.assignments.push(AssignmentRow {
        id,
        agent_id,
        stream_id,
    });
    let log_id = store.id();
    store.logs.push(json!({
        "id": log_id,
        "timestamp": Utc::now().to_rfc3339(),
        "stream_url": stream_url,
        "event_type": "assignment",
    }));
    ok("Stream assigned successfully")
}

async fn admin_dashboard(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let store = lock(&state);
    if let Err(denied) = store.guard(&headers, Some(Role::Admin)) {
        return denied;
    }
    (StatusCode::OK, Json(store.ongoing(None)))
}

async fn agent_dashboard(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let store = lock(&state);
    let agent = match store.guard(&headers, Some(Role::Agent)) {
        Ok(agent) => agent,
        Err(denied) => return denied,
    };
    (StatusCode::OK, Json(store.ongoing(Some(agent.id))))
}

async fn logs(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    let store = lock(&state);
    if let Err(denied) = store.guard(&headers, None) {
        return denied;
    }
    (StatusCode::OK, Json(Value::Array(store.logs.clone())))
}

// ─────────────────────────────────────────────────────────────────────────────
// Scraper and detection
// ─────────────────────────────────────────────────────────────────────────────

/// Last non-empty path segment of a room URL
fn streamer_from_url(room_url: &str) -> Option<String> {
    let without_query = room_url.split(['?', '#']).next().unwrap_or_default();
    let path = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);
    let mut segments = path.split('/').filter(|s| !s.is_empty());
    segments.next()?; // host
    segments.last().map(str::to_string)
}

async fn scrape(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    let store = lock(&state);
    if let Err(denied) = store.guard(&headers, None) {
        return denied;
    }
    let room_url = text_field(&body, "room_url");
    let Some(streamer) = streamer_from_url(&room_url) else {
        return reply(StatusCode::BAD_REQUEST, "Could not parse streamer from room URL");
    };
    (
        StatusCode::OK,
        Json(json!({
            "room_url": room_url,
            "streamer_username": streamer,
            "page_title": format!("{}'s room", streamer),
        })),
    )
}

/// Read one named multipart field, ignoring the rest
async fn multipart_field(mut multipart: Multipart, name: &str) -> Option<Vec<u8>> {
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some(name) {
            return field.bytes().await.ok().map(|b| b.to_vec());
        }
    }
    None
}

async fn upload_video(
    State(state): State<Shared>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Reply {
    if let Err(denied) = lock(&state).guard(&headers, None) {
        return denied;
    }
    let Some(video) = multipart_field(multipart, "video").await else {
        return reply(StatusCode::BAD_REQUEST, "No video file provided");
    };
    if video.is_empty() {
        return reply(StatusCode::BAD_REQUEST, "Uploaded video is empty");
    }
    let mut store = lock(&state);
    let id = store.id();
    store.uploads.insert(
        id,
        UploadJob {
            polls_gallery: 0,
            polls_audio: 0,
        },
    );
    (
        StatusCode::OK,
        Json(json!({
            "video_url": format!("/media/uploads/{}.mp4", id),
            "gallery_url": format!("/api/test/visual/gallery/{}", id),
            "audio_flags_url": format!("/api/test/visual/audio/{}", id),
        })),
    )
}

async fn gallery(State(state): State<Shared>, Path(id): Path<i64>, headers: HeaderMap) -> Reply {
    let mut store = lock(&state);
    if let Err(denied) = store.guard(&headers, None) {
        return denied;
    }
    let Some(job) = store.uploads.get_mut(&id) else {
        return reply(StatusCode::NOT_FOUND, "Upload not found");
    };
    job.polls_gallery += 1;
    let revealed = job.polls_gallery.min(GALLERY_CLASSES.len());
    let started = Utc::now();
    let thumbnails: Vec<Value> = GALLERY_CLASSES[..revealed]
        .iter()
        .enumerate()
        .map(|(i, class)| {
            let offset = 1.5 + 4.0 * i as f64;
            json!({
                "class": class,
                "thumb_url": format!("/media/thumbs/{}_{}.jpg", id, class),
                "video_timestamp": offset,
                "realworld_timestamp": started.to_rfc3339(),
            })
        })
        .collect();
    (StatusCode::OK, Json(json!({ "thumbnails": thumbnails })))
}

async fn audio_flags(State(state): State<Shared>, Path(id): Path<i64>, headers: HeaderMap) -> Reply {
    let mut store = lock(&state);
    if let Err(denied) = store.guard(&headers, None) {
        return denied;
    }
    let Some(job) = store.uploads.get_mut(&id) else {
        return reply(StatusCode::NOT_FOUND, "Upload not found");
    };
    job.polls_audio += 1;
    let flags = if job.polls_audio >= 2 {
        json!({
            "hate": {
                "phrase": "i hate this",
                "audio_timestamp": 7.25,
                "realworld_timestamp": Utc::now().to_rfc3339(),
            }
        })
    } else {
        json!({})
    };
    (StatusCode::OK, Json(json!({ "audio_flags": flags })))
}

/// Deterministic fake classifier keyed on the frame's size
fn classify(frame: &[u8]) -> Vec<Value> {
    let mut results = vec![json!({ "class": "person", "confidence": 0.91 })];
    if frame.len() % 2 == 0 {
        results.push(json!({ "class": "knife", "confidence": 0.64 }));
    }
    results
}

async fn detect_frame(
    State(state): State<Shared>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Reply {
    if let Err(denied) = lock(&state).guard(&headers, None) {
        return denied;
    }
    match multipart_field(multipart, "frame").await {
        Some(frame) if !frame.is_empty() => {
            (StatusCode::OK, Json(json!({ "results": classify(&frame) })))
        }
        _ => reply(StatusCode::BAD_REQUEST, "No frame provided"),
    }
}

async fn record_request(State(state): State<Shared>, request: Request, next: Next) -> Response {
    lock(&state).requests.push(RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
    });
    next.run(request).await
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/logout", post(logout))
        .route("/api/session", get(session))
        .route("/api/agents", get(list_agents).post(create_agent))
        .route("/api/agents/:id", put(update_agent).delete(delete_agent))
        .route("/api/streams", get(list_streams).post(create_stream))
        .route("/api/streams/:id", put(update_stream).delete(delete_stream))
        .route("/api/keywords", get(list_keywords).post(create_keyword))
        .route("/api/keywords/:id", put(update_keyword).delete(delete_keyword))
        .route("/api/objects", get(list_objects).post(create_object))
        .route("/api/objects/:id", put(update_object).delete(delete_object))
        .route("/api/assign", post(assign))
        .route("/api/dashboard", get(admin_dashboard))
        .route("/api/agent/dashboard", get(agent_dashboard))
        .route("/api/logs", get(logs))
        .route("/api/scrape", post(scrape))
        .route("/api/test/visual/upload", post(upload_video))
        .route("/api/test/visual/gallery/:id", get(gallery))
        .route("/api/test/visual/audio/:id", get(audio_flags))
        .route("/api/test/visual/frame", post(detect_frame))
        .layer(middleware::from_fn_with_state(state.clone(), record_request))
        .with_state(state)
}

/// A running demo backend. Dropping it shuts the server down.
pub struct DemoBackend {
    addr: SocketAddr,
    state: Shared,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl DemoBackend {
    /// Bind and serve. Use port 0 to let the OS pick one.
    pub async fn start(bind_addr: SocketAddr) -> Result<Self> {
        let state: Shared = Arc::new(Mutex::new(Store::seeded()));
        let listener = TcpListener::bind(bind_addr)
            .await
            .context("Failed to bind demo backend")?;
        let addr = listener
            .local_addr()
            .context("Failed to read demo backend address")?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = router(state.clone());
        let task = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_rx.await.ok();
                })
                .await;
            if let Err(e) = served {
                tracing::error!("Demo backend failed: {}", e);
            }
        });

        tracing::info!("Demo backend listening on {}", addr);
        Ok(Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Every request served so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }

    /// Number of requests matching `method` and `path` exactly
    pub fn count(&self, method: &str, path: &str) -> usize {
        lock(&self.state)
            .requests
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn clear_requests(&self) {
        lock(&self.state).requests.clear();
    }

    /// Stop accepting requests and wait for the server task
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for DemoBackend {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streamer_from_url() {
        assert_eq!(
            streamer_from_url("https://chaturbate.com/caylin/").as_deref(),
            Some("caylin")
        );
        assert_eq!(
            streamer_from_url("https://stripchat.com/nova?tab=profile").as_deref(),
            Some("nova")
        );
        assert_eq!(streamer_from_url("https://chaturbate.com/"), None);
        assert_eq!(streamer_from_url(""), None);
    }

    #[test]
    fn test_session_token_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "theme=dark; sw_session=abc123".parse().unwrap(),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_ongoing_counts_distinct_streams() {
        let mut store = Store::seeded();
        let agent_two = store.add_user("second", "pw", Role::Agent);
        let stream_id = store.id();
        store.streams.push(StreamRow {
            id: stream_id,
            url: "https://chaturbate.com/caylin/".to_string(),
            room_url: None,
            platform: Platform::Chaturbate,
            streamer_username: Some("caylin".to_string()),
        });
        for agent_id in [2, agent_two] {
            let id = store.id();
            store.assignments.push(AssignmentRow {
                id,
                agent_id,
                stream_id,
            });
        }

        let all = store.ongoing(None);
        assert_eq!(all["ongoing_streams"], 1);
        assert_eq!(all["assignments"].as_array().unwrap().len(), 2);

        let mine = store.ongoing(Some(agent_two));
        assert_eq!(mine["assignments"].as_array().unwrap().len(), 1);
    }
}
