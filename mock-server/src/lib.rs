use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// Password every user logs in with.
pub const PASSWORD: &str = "secret";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: Uuid,
    pub title: String,
    pub done: bool,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginQuery {
    #[serde(default)]
    pub remember: bool,
}

#[derive(Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateItem {
    pub title: String,
    #[serde(default)]
    pub done: bool,
}

#[derive(Deserialize)]
pub struct UpdateItem {
    pub title: Option<String>,
    pub done: Option<bool>,
}

#[derive(Debug, Default)]
pub struct AppState {
    items: RwLock<HashMap<Uuid, Item>>,
    sessions: RwLock<HashSet<String>>,
    flaky_failures: AtomicU32,
}

pub type Shared = Arc<AppState>;

type Reply = (StatusCode, Json<Value>);

pub fn app() -> Router {
    app_with_flaky(0)
}

/// Router whose `/flaky` endpoint answers 503 for the first `failures` calls.
pub fn app_with_flaky(failures: u32) -> Router {
    let state: Shared = Arc::new(AppState {
        flaky_failures: AtomicU32::new(failures),
        ..AppState::default()
    });
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/items", get(list_items).post(create_item))
        .route("/items/{id}", get(get_item).put(update_item).delete(delete_item))
        .route("/form", post(echo_form))
        .route("/ping", get(ping))
        .route("/flaky", get(flaky))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_flaky(listener: TcpListener, failures: u32) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_flaky(failures)).await
}

fn ok(payload: Value) -> Reply {
    (StatusCode::OK, Json(payload))
}

fn rejected(status: StatusCode, code: &str) -> Reply {
    (status, Json(json!({ "success": false, "code": code })))
}

async fn authorized(state: &AppState, query: &TokenQuery) -> bool {
    match &query.token {
        Some(token) => state.sessions.read().await.contains(token),
        None => false,
    }
}

async fn login(
    State(state): State<Shared>,
    Query(query): Query<LoginQuery>,
    Json(credentials): Json<Credentials>,
) -> Reply {
    if credentials.password != PASSWORD {
        return ok(json!({ "success": false, "code": "auth.invalid" }));
    }
    let token = Uuid::new_v4().to_string();
    state.sessions.write().await.insert(token.clone());
    info!(user = %credentials.username, remember = query.remember, "login");
    ok(json!({
        "success": true,
        "user": { "name": credentials.username },
        "token": token,
    }))
}

async fn logout(State(state): State<Shared>, Query(query): Query<TokenQuery>) -> Reply {
    if let Some(token) = &query.token {
        state.sessions.write().await.remove(token);
    }
    ok(json!({ "success": true }))
}

async fn list_items(State(state): State<Shared>, Query(query): Query<TokenQuery>) -> Reply {
    if !authorized(&state, &query).await {
        return ok(json!({ "success": false, "code": "auth.required" }));
    }
    let items: Vec<Item> = state.items.read().await.values().cloned().collect();
    ok(json!({ "success": true, "items": items }))
}

async fn create_item(
    State(state): State<Shared>,
    Query(query): Query<TokenQuery>,
    Json(input): Json<CreateItem>,
) -> Reply {
    if !authorized(&state, &query).await {
        return ok(json!({ "success": false, "code": "auth.required" }));
    }
    let item = Item {
        id: Uuid::new_v4(),
        title: input.title,
        done: input.done,
    };
    state.items.write().await.insert(item.id, item.clone());
    (StatusCode::CREATED, Json(json!({ "success": true, "item": item })))
}

async fn get_item(
    State(state): State<Shared>,
    Path(id): Path<Uuid>,
    Query(query): Query<TokenQuery>,
) -> Reply {
    if !authorized(&state, &query).await {
        return ok(json!({ "success": false, "code": "auth.required" }));
    }
    match state.items.read().await.get(&id) {
        Some(item) => ok(json!({ "success": true, "item": item })),
        None => rejected(StatusCode::NOT_FOUND, "item.not_found"),
    }
}

async fn update_item(
    State(state): State<Shared>,
    Path(id): Path<Uuid>,
    Query(query): Query<TokenQuery>,
    Json(input): Json<UpdateItem>,
) -> Reply {
    if !authorized(&state, &query).await {
        return ok(json!({ "success": false, "code": "auth.required" }));
    }
    let mut items = state.items.write().await;
    let Some(item) = items.get_mut(&id) else {
        return rejected(StatusCode::NOT_FOUND, "item.not_found");
    };
    if let Some(title) = input.title {
        item.title = title;
    }
    if let Some(done) = input.done {
        item.done = done;
    }
    ok(json!({ "success": true, "item": item }))
}

async fn delete_item(
    State(state): State<Shared>,
    Path(id): Path<Uuid>,
    Query(query): Query<TokenQuery>,
) -> Reply {
    if !authorized(&state, &query).await {
        return ok(json!({ "success": false, "code": "auth.required" }));
    }
    match state.items.write().await.remove(&id) {
        Some(_) => ok(json!({ "success": true })),
        None => rejected(StatusCode::NOT_FOUND, "item.not_found"),
    }
}

async fn echo_form(Form(fields): Form<HashMap<String, String>>) -> Reply {
    ok(json!({ "success": true, "fields": fields }))
}

async fn ping() -> &'static str {
    "pong"
}

async fn flaky(State(state): State<Shared>) -> Result<Json<Value>, (StatusCode, &'static str)> {
    let failing = state
        .flaky_failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        debug!("flaky endpoint failing on purpose");
        return Err((StatusCode::SERVICE_UNAVAILABLE, "try again"));
    }
    Ok(Json(json!({ "success": true })))
}
