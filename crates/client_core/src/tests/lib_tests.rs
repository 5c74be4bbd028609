use super::*;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{TimeZone, Utc};
use shared::{domain::Location, domain::UserId, error::ErrorCode};
use std::{collections::HashMap, sync::Arc};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct ServerState {
    memos: Arc<Mutex<Vec<Memo>>>,
    last_query: Arc<Mutex<Option<HashMap<String, String>>>>,
    last_authorization: Arc<Mutex<Option<String>>>,
    creation_fields: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

fn memo(id: &str, owner: &str, position: Option<(f64, f64)>) -> Memo {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    Memo {
        memo_id: MemoId::from(id),
        user_id: UserId::from(owner),
        user_name: "Jane Ranger".to_string(),
        user_color: None,
        title: None,
        audio_url: None,
        text: format!("memo {id}"),
        duration_seconds: 1.0,
        location: position.map(|(lat, lng)| Location::from(Coordinates::new(lat, lng))),
        park_name: None,
        created_at: at,
        updated_at: at,
    }
}

fn not_found() -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"detail": "Memo not found"})),
    )
        .into_response()
}

async fn handle_list(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<MemosResponse> {
    *state.last_authorization.lock().await = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let limit = query
        .get("limit")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(usize::MAX);
    *state.last_query.lock().await = Some(query);
    let memos = state.memos.lock().await;
    Json(MemosResponse {
        memos: memos.iter().take(limit).cloned().collect(),
        pagination: None,
    })
}

async fn handle_create(
    State(state): State<ServerState>,
    mut multipart: Multipart,
) -> axum::response::Response {
    let mut fields = HashMap::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let Ok(bytes) = field.bytes().await else {
            return StatusCode::BAD_REQUEST.into_response();
        };
        fields.insert(name, bytes.to_vec());
    }

    let text_field = |name: &str| {
        fields
            .get(name)
            .map(|v| String::from_utf8_lossy(v).to_string())
    };
    let (Some(text), Some(lat), Some(lng)) = (
        text_field("text"),
        text_field("latitude").and_then(|v| v.parse::<f64>().ok()),
        text_field("longitude").and_then(|v| v.parse::<f64>().ok()),
    ) else {
        return StatusCode::UNPROCESSABLE_ENTITY.into_response();
    };
    if !fields.contains_key("audio") {
        return StatusCode::UNPROCESSABLE_ENTITY.into_response();
    }

    let mut memos = state.memos.lock().await;
    let mut created = memo(&format!("created-{}", memos.len()), "u1", Some((lat, lng)));
    created.text = text;
    created.title = text_field("title");
    created.park_name = text_field("park_name");
    memos.push(created.clone());
    *state.creation_fields.lock().await = fields;
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn handle_get(
    State(state): State<ServerState>,
    Path(memo_id): Path<String>,
) -> axum::response::Response {
    let memos = state.memos.lock().await;
    match memos.iter().find(|m| m.memo_id.as_str() == memo_id) {
        Some(found) => Json(found.clone()).into_response(),
        None => not_found(),
    }
}

async fn handle_update(
    State(state): State<ServerState>,
    Path(memo_id): Path<String>,
    Json(body): Json<UpdateLocationRequest>,
) -> axum::response::Response {
    let mut memos = state.memos.lock().await;
    match memos.iter_mut().find(|m| m.memo_id.as_str() == memo_id) {
        Some(found) => {
            found.location = Some(Location::from(Coordinates::new(
                body.latitude,
                body.longitude,
            )));
            Json(found.clone()).into_response()
        }
        None => not_found(),
    }
}

async fn handle_delete(
    State(state): State<ServerState>,
    Path(memo_id): Path<String>,
) -> axum::response::Response {
    let mut memos = state.memos.lock().await;
    let before = memos.len();
    memos.retain(|m| m.memo_id.as_str() != memo_id);
    if memos.len() == before {
        return not_found();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn spawn_memo_server(seed: Vec<Memo>) -> (String, ServerState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = ServerState::default();
    *state.memos.lock().await = seed;
    let app = Router::new()
        .route("/memos", get(handle_list).post(handle_create))
        .route(
            "/memos/:memo_id",
            get(handle_get).put(handle_update).delete(handle_delete),
        )
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), state)
}

#[tokio::test]
async fn list_memos_sends_limit_and_decodes_collection() {
    let (url, state) = spawn_memo_server(vec![
        memo("a", "u1", Some((45.0, -111.0))),
        memo("b", "u2", None),
    ])
    .await;
    let store = HttpMemoStore::new(&url).expect("store");

    let response = store
        .list_memos(&ListMemosQuery::with_limit(500))
        .await
        .expect("list");
    assert_eq!(response.memos.len(), 2);
    assert_eq!(response.memos[1].location, None);

    let query = state.last_query.lock().await.clone().expect("query");
    assert_eq!(query.get("limit").map(String::as_str), Some("500"));
    assert!(!query.contains_key("page"));
    assert_eq!(*state.last_authorization.lock().await, None);
}

#[tokio::test]
async fn bearer_token_is_attached_when_configured() {
    let (url, state) = spawn_memo_server(Vec::new()).await;
    let store = HttpMemoStore::new(&url)
        .expect("store")
        .with_bearer_token("field-token");

    store
        .list_memos(&ListMemosQuery::with_limit(1))
        .await
        .expect("list");
    assert_eq!(
        state.last_authorization.lock().await.as_deref(),
        Some("Bearer field-token")
    );
}

#[tokio::test]
async fn create_memo_attaches_placeholder_audio() {
    let (url, state) = spawn_memo_server(Vec::new()).await;
    let store = HttpMemoStore::new(&url).expect("store");

    let created = store
        .create_memo(&CreateMemoDraft {
            text: "note".to_string(),
            title: None,
            park_name: Some("Hyalite".to_string()),
            position: Coordinates::new(45.1, -111.2),
        })
        .await
        .expect("create");
    assert_eq!(created.text, "note");
    assert_eq!(created.park_name.as_deref(), Some("Hyalite"));
    assert_eq!(created.map_position(), Some(Coordinates::new(45.1, -111.2)));

    let fields = state.creation_fields.lock().await;
    let audio = fields.get("audio").expect("audio part");
    assert!(!audio.is_empty());
    let duration: f64 = String::from_utf8_lossy(fields.get("duration_seconds").expect("duration"))
        .parse()
        .expect("numeric duration");
    assert!(duration >= 1.0);
    assert!(!fields.contains_key("title"));
}

#[tokio::test]
async fn update_location_then_reload_reflects_new_position() {
    let (url, _state) = spawn_memo_server(vec![memo("a", "u1", Some((45.0, -111.0)))]).await;
    let store = Arc::new(HttpMemoStore::new(&url).expect("store"));
    let sync = SyncCoordinator::new(store);
    sync.load(DEFAULT_LOAD_LIMIT).await.expect("load");

    let mutation = sync
        .update_location(&MemoId::from("a"), Coordinates::new(46.0, -112.0))
        .await
        .expect("update");
    assert_eq!(
        mutation.value.map_position(),
        Some(Coordinates::new(46.0, -112.0))
    );
    let reloaded = mutation.reload.expect("reload");
    let a = reloaded
        .memos
        .iter()
        .find(|m| m.memo_id == MemoId::from("a"))
        .expect("memo a");
    assert_eq!(a.map_position(), Some(Coordinates::new(46.0, -112.0)));
}

#[tokio::test]
async fn get_and_delete_round_trip_through_store() {
    let (url, state) = spawn_memo_server(vec![memo("a", "u1", None)]).await;
    let store = HttpMemoStore::new(&url).expect("store");

    let fetched = store.get_memo(&MemoId::from("a")).await.expect("get");
    assert_eq!(fetched.text, "memo a");

    store.delete_memo(&MemoId::from("a")).await.expect("delete");
    assert!(state.memos.lock().await.is_empty());
}

#[tokio::test]
async fn rejected_request_surfaces_store_message() {
    let (url, _state) = spawn_memo_server(Vec::new()).await;
    let store = HttpMemoStore::new(&url).expect("store");

    let err = store
        .delete_memo(&MemoId::from("missing"))
        .await
        .expect_err("delete should fail");
    match err {
        SyncError::Status {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 404);
            assert_eq!(code, ErrorCode::NotFound);
            assert_eq!(message, "Memo not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_store_is_a_transport_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let store = HttpMemoStore::new(&format!("http://{addr}")).expect("store");
    let err = store
        .list_memos(&ListMemosQuery::with_limit(1))
        .await
        .expect_err("list should fail");
    assert!(matches!(err, SyncError::Transport(_)), "got {err:?}");
}

#[test]
fn endpoints_extend_base_path() {
    let store = HttpMemoStore::new("https://memos.example/api/v1/").expect("store");
    let url = store
        .endpoint(&["memos", "a b"])
        .expect("endpoint");
    assert_eq!(url.as_str(), "https://memos.example/api/v1/memos/a%20b");

    let bare = HttpMemoStore::new("https://memos.example").expect("store");
    assert_eq!(
        bare.endpoint(&["memos"]).expect("endpoint").as_str(),
        "https://memos.example/memos"
    );
}

#[test]
fn rejects_unusable_base_urls() {
    assert!(matches!(
        HttpMemoStore::new("not a url"),
        Err(SyncError::InvalidBaseUrl { .. })
    ));
    assert!(matches!(
        HttpMemoStore::new("mailto:ranger@example.com"),
        Err(SyncError::InvalidBaseUrl { .. })
    ));
}
