use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{info, warn};
use uuid::Uuid;

/// Header the session token travels in.
pub const TOKEN_HEADER: &str = "token";

#[derive(Clone, Debug, Serialize)]
pub struct User {
    pub user_id: String,
    pub user_type: u8,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password: String,
    pub age: Option<u32>,
    pub work: String,
    pub bio: String,
    pub age_min: Option<u32>,
    pub age_max: Option<u32>,
    pub photos: Vec<String>,
}

#[derive(Default)]
pub struct Store {
    /// Registration order; the feed pages through this.
    users: Vec<User>,
    tokens: HashMap<String, String>,
    /// (collector, collected) pairs.
    collects: HashSet<(String, String)>,
}

impl Store {
    fn user(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.user_id == user_id)
    }

    fn is_collected(&self, by: &str, user_id: &str) -> bool {
        self.collects.contains(&(by.to_string(), user_id.to_string()))
    }
}

#[derive(Deserialize)]
pub struct RegisterBody {
    pub user_type: u8,
    pub name: String,
    pub email: String,
    pub photo: Option<String>,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub user_type: u8,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct FeedParams {
    #[serde(default)]
    pub page: usize,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    10
}

#[derive(Deserialize)]
pub struct CollectBody {
    pub user_id: String,
    #[serde(rename = "type")]
    pub action: String,
}

#[derive(Deserialize)]
pub struct ProfileBody {
    pub photos: Vec<String>,
    pub name: String,
    pub age: u32,
    pub work: String,
    pub bio: String,
    pub age_min: u32,
    pub age_max: u32,
}

pub type Db = Arc<RwLock<Store>>;

type Reply = Result<Json<Value>, (StatusCode, Json<Value>)>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/upload", post(upload))
        .route("/profile", post(save_profile))
        .route("/profile/{user_id}", get(get_profile))
        .route("/feed", get(feed))
        .route("/collect", post(collect))
        .route("/me", get(me))
        .route("/friends", get(friends))
        .route("/favorites", get(favorites))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn envelope(message: &str, data: Value) -> Json<Value> {
    Json(json!({ "message": message, "data": data }))
}

fn failure(status: StatusCode, code: &str, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "message": message, "code": code })))
}

fn authenticate(store: &Store, headers: &HeaderMap) -> Result<String, (StatusCode, Json<Value>)> {
    let token = headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    store.tokens.get(token).cloned().ok_or_else(|| {
        warn!("rejected request with unknown token");
        failure(StatusCode::UNAUTHORIZED, "unauthorized", "missing or unknown token")
    })
}

fn profile_json(user: &User) -> Value {
    json!({
        "user_id": user.user_id,
        "name": user.name,
        "age": user.age,
        "work": user.work,
        "bio": user.bio,
        "age_min": user.age_min,
        "age_max": user.age_max,
        "photos": user.photos,
    })
}

fn summary_json(user: &User, collected: bool) -> Value {
    json!({
        "user_id": user.user_id,
        "name": user.name,
        "age": user.age,
        "work": user.work,
        "photo": user.photos.first(),
        "collected": collected,
    })
}

async fn register(State(db): State<Db>, Json(input): Json<RegisterBody>) -> Reply {
    if input.name.trim().is_empty() || input.email.trim().is_empty() || input.password.is_empty() {
        return Err(failure(StatusCode::BAD_REQUEST, "invalid_input", "name, email and password are required"));
    }
    let mut store = db.write().await;
    if store.users.iter().any(|u| u.email == input.email) {
        return Err(failure(StatusCode::CONFLICT, "duplicate_email", "email already registered"));
    }
    let user = User {
        user_id: Uuid::new_v4().to_string(),
        user_type: input.user_type,
        name: input.name,
        email: input.email,
        password: input.password,
        age: None,
        work: String::new(),
        bio: String::new(),
        age_min: None,
        age_max: None,
        photos: input.photo.into_iter().collect(),
    };
    info!(user_id = %user.user_id, "registered");
    let data = json!({
        "user_id": user.user_id,
        "name": user.name,
        "email": user.email,
        "photo": user.photos.first(),
    });
    store.users.push(user);
    Ok(envelope("registered", data))
}

async fn login(State(db): State<Db>, Json(input): Json<LoginBody>) -> Reply {
    let mut store = db.write().await;
    let user_id = store
        .users
        .iter()
        .find(|u| u.email == input.email && u.password == input.password && u.user_type == input.user_type)
        .map(|u| u.user_id.clone())
        .ok_or_else(|| failure(StatusCode::UNAUTHORIZED, "unauthorized", "wrong email or password"))?;
    let token = Uuid::new_v4().simple().to_string();
    store.tokens.insert(token.clone(), user_id.clone());
    Ok(envelope("logged in", json!({ "token": token, "user_id": user_id })))
}

async fn upload(mut multipart: Multipart) -> Reply {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| failure(StatusCode::BAD_REQUEST, "invalid_multipart", &e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("image").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| failure(StatusCode::BAD_REQUEST, "invalid_multipart", &e.to_string()))?;
        if bytes.is_empty() {
            return Err(failure(StatusCode::BAD_REQUEST, "empty_file", "uploaded file is empty"));
        }
        let url = format!("/images/{}-{file_name}", Uuid::new_v4().simple());
        info!(%url, size = bytes.len(), "stored upload");
        return Ok(envelope("uploaded", json!({ "url": url })));
    }
    Err(failure(StatusCode::BAD_REQUEST, "missing_file", "multipart field 'file' is required"))
}

async fn get_profile(State(db): State<Db>, headers: HeaderMap, Path(user_id): Path<String>) -> Reply {
    let store = db.read().await;
    authenticate(&store, &headers)?;
    let user = store
        .user(&user_id)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "not_found", "no such user"))?;
    Ok(envelope("ok", profile_json(user)))
}

async fn me(State(db): State<Db>, headers: HeaderMap) -> Reply {
    let store = db.read().await;
    let me = authenticate(&store, &headers)?;
    let user = store
        .user(&me)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "not_found", "no such user"))?;
    Ok(envelope("ok", profile_json(user)))
}

async fn save_profile(State(db): State<Db>, headers: HeaderMap, Json(input): Json<ProfileBody>) -> Reply {
    let mut store = db.write().await;
    let me = authenticate(&store, &headers)?;
    if input.photos.is_empty() || input.photos.len() > 4 || input.age_min > input.age_max {
        return Err(failure(StatusCode::BAD_REQUEST, "invalid_input", "invalid profile"));
    }
    let user = store
        .users
        .iter_mut()
        .find(|u| u.user_id == me)
        .ok_or_else(|| failure(StatusCode::NOT_FOUND, "not_found", "no such user"))?;
    user.photos = input.photos;
    user.name = input.name;
    user.age = Some(input.age);
    user.work = input.work;
    user.bio = input.bio;
    user.age_min = Some(input.age_min);
    user.age_max = Some(input.age_max);
    Ok(envelope("saved", profile_json(user)))
}

async fn feed(State(db): State<Db>, headers: HeaderMap, Query(params): Query<FeedParams>) -> Reply {
    let store = db.read().await;
    let me = authenticate(&store, &headers)?;
    if params.page_size == 0 {
        return Err(failure(StatusCode::BAD_REQUEST, "invalid_input", "page_size must be positive"));
    }
    let page: Vec<Value> = store
        .users
        .iter()
        .filter(|u| u.user_id != me)
        .skip(params.page.saturating_mul(params.page_size))
        .take(params.page_size)
        .map(|u| summary_json(u, store.is_collected(&me, &u.user_id)))
        .collect();
    Ok(envelope("ok", Value::Array(page)))
}

async fn collect(State(db): State<Db>, headers: HeaderMap, Json(input): Json<CollectBody>) -> Reply {
    let mut store = db.write().await;
    let me = authenticate(&store, &headers)?;
    if store.user(&input.user_id).is_none() {
        return Err(failure(StatusCode::NOT_FOUND, "not_found", "no such user"));
    }
    let pair = (me, input.user_id.clone());
    let collected = match input.action.as_str() {
        "collect" => {
            store.collects.insert(pair);
            true
        }
        "cancel" => {
            store.collects.remove(&pair);
            false
        }
        _ => return Err(failure(StatusCode::BAD_REQUEST, "invalid_input", "type must be collect or cancel")),
    };
    Ok(envelope("ok", json!({ "user_id": input.user_id, "collected": collected })))
}

async fn favorites(State(db): State<Db>, headers: HeaderMap) -> Reply {
    let store = db.read().await;
    let me = authenticate(&store, &headers)?;
    let list: Vec<Value> = store
        .users
        .iter()
        .filter(|u| store.is_collected(&me, &u.user_id))
        .map(|u| {
            json!({
                "user_id": u.user_id,
                "name": u.name,
                "photo": u.photos.first(),
                "collected": true,
            })
        })
        .collect();
    Ok(envelope("ok", Value::Array(list)))
}

/// Friends are users who collected each other.
async fn friends(State(db): State<Db>, headers: HeaderMap) -> Reply {
    let store = db.read().await;
    let me = authenticate(&store, &headers)?;
    let list: Vec<Value> = store
        .users
        .iter()
        .filter(|u| store.is_collected(&me, &u.user_id) && store.is_collected(&u.user_id, &me))
        .map(|u| {
            json!({
                "user_id": u.user_id,
                "name": u.name,
                "photo": u.photos.first(),
                "collected": true,
            })
        })
        .collect();
    Ok(envelope("ok", Value::Array(list)))
}
