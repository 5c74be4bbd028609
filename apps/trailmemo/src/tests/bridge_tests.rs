use super::*;

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use client_core::MemoStore;
use map_controller::{events::AlertCategory, DeleteStep, MapSession, ModeKind, SessionConfig};
use shared::{
    domain::{Coordinates, Location, Memo, MemoId, UserId},
    error::ErrorCode,
    protocol::{CreateMemoDraft, ListMemosQuery, MemosResponse},
};

fn memo(id: &str, owner: &str, position: (f64, f64)) -> Memo {
    let at = Utc.with_ymd_and_hms(2024, 6, 2, 8, 30, 0).unwrap();
    Memo {
        memo_id: MemoId::from(id),
        user_id: UserId::from(owner),
        user_name: format!("Hiker {owner}"),
        user_color: None,
        title: None,
        audio_url: None,
        text: format!("memo {id}"),
        duration_seconds: 1.0,
        location: Some(Location::from(Coordinates::new(position.0, position.1))),
        park_name: None,
        created_at: at,
        updated_at: at,
    }
}

#[derive(Default)]
struct FakeStore {
    memos: Mutex<Vec<Memo>>,
    lists: AtomicUsize,
    reject_mutations: AtomicBool,
    fail_lists_after: Mutex<Option<usize>>,
    next_list_delay: Mutex<Option<Duration>>,
}

impl FakeStore {
    fn seeded(memos: Vec<Memo>) -> Arc<Self> {
        let store = Self::default();
        *store.memos.lock().unwrap() = memos;
        Arc::new(store)
    }

    fn check_mutation(&self) -> Result<(), SyncError> {
        if self.reject_mutations.load(Ordering::SeqCst) {
            return Err(SyncError::Status {
                status: 403,
                code: ErrorCode::Forbidden,
                message: "not your memo".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl MemoStore for FakeStore {
    async fn list_memos(&self, query: &ListMemosQuery) -> Result<MemosResponse, SyncError> {
        let calls = self.lists.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_lists_after
            .lock()
            .unwrap()
            .is_some_and(|after| calls >= after)
        {
            return Err(SyncError::Transport("connection refused".to_string()));
        }
        let memos: Vec<Memo> = self.memos.lock().unwrap().clone();
        let delay = self.next_list_delay.lock().unwrap().take();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(MemosResponse {
            memos: memos.into_iter().take(query.limit as usize).collect(),
            pagination: None,
        })
    }

    async fn get_memo(&self, memo_id: &MemoId) -> Result<Memo, SyncError> {
        self.memos
            .lock()
            .unwrap()
            .iter()
            .find(|m| &m.memo_id == memo_id)
            .cloned()
            .ok_or_else(|| SyncError::from_response_body(404, r#"{"detail":"Memo not found"}"#))
    }

    async fn create_memo(&self, draft: &CreateMemoDraft) -> Result<Memo, SyncError> {
        self.check_mutation()?;
        let mut memos = self.memos.lock().unwrap();
        let mut created = memo(
            &format!("m{}", memos.len() + 1),
            "u1",
            (draft.position.latitude, draft.position.longitude),
        );
        created.text = draft.text.clone();
        memos.push(created.clone());
        Ok(created)
    }

    async fn update_location(
        &self,
        memo_id: &MemoId,
        position: Coordinates,
    ) -> Result<Memo, SyncError> {
        self.check_mutation()?;
        let mut memos = self.memos.lock().unwrap();
        let target = memos
            .iter_mut()
            .find(|m| &m.memo_id == memo_id)
            .ok_or_else(|| SyncError::from_response_body(404, ""))?;
        target.location = Some(Location::from(position));
        Ok(target.clone())
    }

    async fn delete_memo(&self, memo_id: &MemoId) -> Result<(), SyncError> {
        self.check_mutation()?;
        self.memos.lock().unwrap().retain(|m| &m.memo_id != memo_id);
        Ok(())
    }
}

async fn drive(session: &mut MapSession, coordinator: &SyncCoordinator, request: SyncRequest) {
    for outcome in execute(coordinator, request).await {
        session.apply(outcome);
    }
}

#[tokio::test]
async fn load_feeds_markers() {
    let store = FakeStore::seeded(vec![
        memo("a", "u1", (45.0, -111.0)),
        memo("b", "u2", (45.1, -111.1)),
    ]);
    let coordinator = SyncCoordinator::new(store.clone());
    let mut session = MapSession::new(SessionConfig::default());

    let request = session.refresh();
    drive(&mut session, &coordinator, request).await;

    assert_eq!(session.markers().len(), 2);
    assert_eq!(session.total_items(), 2);
    assert_eq!(store.lists.load(Ordering::SeqCst), 1);

    // Served from the fresh cache.
    let request = session.refresh();
    drive(&mut session, &coordinator, request).await;
    assert_eq!(store.lists.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn creation_returns_to_viewing_and_shows_new_marker() {
    let store = FakeStore::seeded(Vec::new());
    let coordinator = SyncCoordinator::new(store.clone());
    let mut session = MapSession::new(SessionConfig::default());
    let request = session.refresh();
    drive(&mut session, &coordinator, request).await;

    session.start_new_memo().expect("placing");
    session
        .map_clicked(Coordinates::new(45.2, -111.3))
        .expect("capture");
    let request = session
        .submit_new_memo("bear sighting", None, None)
        .expect("submit");
    let outcomes = execute(&coordinator, request).await;
    assert_eq!(outcomes.len(), 2);
    assert!(matches!(outcomes[0], SyncOutcome::Created(_)));
    for outcome in outcomes {
        session.apply(outcome);
    }

    assert_eq!(session.mode(), ModeKind::Viewing);
    let markers = session.markers();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0].position, Coordinates::new(45.2, -111.3));
}

#[tokio::test]
async fn relocation_updates_marker_after_reload() {
    let store = FakeStore::seeded(vec![memo("a", "u1", (45.0, -111.0))]);
    let coordinator = SyncCoordinator::new(store.clone());
    let mut session = MapSession::new(SessionConfig::default());
    let request = session.refresh();
    drive(&mut session, &coordinator, request).await;

    let a = MemoId::from("a");
    session.edit_location(Some(&a)).expect("editing");
    session
        .marker_drag_ended(&a, Coordinates::new(46.0, -112.0))
        .expect("drag");
    let request = session.save_location().expect("save");
    drive(&mut session, &coordinator, request).await;

    assert_eq!(session.mode(), ModeKind::Viewing);
    assert_eq!(session.markers()[0].position, Coordinates::new(46.0, -112.0));
    assert_eq!(store.lists.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn rejected_delete_surfaces_auth_alert_and_keeps_memo() {
    let store = FakeStore::seeded(vec![memo("a", "u1", (45.0, -111.0))]);
    let coordinator = SyncCoordinator::new(store.clone());
    let mut session = MapSession::new(SessionConfig::default());
    let request = session.refresh();
    drive(&mut session, &coordinator, request).await;

    store.reject_mutations.store(true, Ordering::SeqCst);
    let a = MemoId::from("a");
    assert_eq!(session.request_delete(&a), Ok(DeleteStep::Armed));
    let DeleteStep::Commit(request) = session.request_delete(&a).expect("commit") else {
        panic!("expected commit");
    };
    let outcomes = execute(&coordinator, request).await;
    assert_eq!(outcomes.len(), 1);
    for outcome in outcomes {
        session.apply(outcome);
    }

    let alerts = session.take_alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].category(), AlertCategory::Auth);
    assert_eq!(session.markers().len(), 1);
    assert_eq!(store.lists.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn accepted_delete_with_failed_reload_shows_banner() {
    let store = FakeStore::seeded(vec![memo("a", "u1", (45.0, -111.0))]);
    let coordinator = SyncCoordinator::new(store.clone());
    let mut session = MapSession::new(SessionConfig::default());
    let request = session.refresh();
    drive(&mut session, &coordinator, request).await;

    *store.fail_lists_after.lock().unwrap() = Some(1);
    let a = MemoId::from("a");
    session.request_delete(&a).expect("arm");
    let DeleteStep::Commit(request) = session.request_delete(&a).expect("commit") else {
        panic!("expected commit");
    };
    let outcomes = execute(&coordinator, request).await;
    assert!(matches!(outcomes[0], SyncOutcome::Deleted { .. }));
    assert!(matches!(outcomes[1], SyncOutcome::LoadFailed(_)));
    for outcome in outcomes {
        session.apply(outcome);
    }

    let banner = session.load_banner().expect("banner");
    assert_eq!(banner.category(), AlertCategory::Transport);
    assert!(session.take_alerts().is_empty());
}

#[test]
fn store_failure_keeps_error_code() {
    let err = SyncError::from_response_body(404, r#"{"detail":"Memo not found"}"#);
    let converted = failure(&err);
    assert_eq!(converted.code, Some(ErrorCode::NotFound));
    assert!(converted.message.contains("Memo not found"));

    let transport = failure(&SyncError::Transport("dns error".to_string()));
    assert_eq!(transport.code, None);
}

fn marker_ids(session: &mut MapSession) -> Vec<String> {
    session
        .markers()
        .iter()
        .map(|m| m.memo_id.to_string())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn slow_refresh_cannot_bring_back_deleted_memo() {
    let store = FakeStore::seeded(vec![
        memo("a", "u1", (45.0, -111.0)),
        memo("b", "u1", (45.1, -111.1)),
    ]);
    let coordinator = SyncCoordinator::new(store.clone());
    let mut session = MapSession::new(SessionConfig::default());
    let request = session.refresh();
    drive(&mut session, &coordinator, request).await;
    assert_eq!(marker_ids(&mut session), vec!["a", "b"]);

    let b = MemoId::from("b");
    session.request_delete(&b).expect("arm");
    let DeleteStep::Commit(delete) = session.request_delete(&b).expect("commit") else {
        panic!("expected commit");
    };
    coordinator.invalidate().await;
    let refresh = session.refresh();
    *store.next_list_delay.lock().unwrap() = Some(Duration::from_millis(200));

    let (refreshed, deleted) = tokio::join!(execute(&coordinator, refresh), async {
        tokio::task::yield_now().await;
        execute(&coordinator, delete).await
    });

    for outcome in deleted {
        session.apply(outcome);
    }
    assert_eq!(marker_ids(&mut session), vec!["a"]);

    assert!(refreshed.is_empty());
    for outcome in refreshed {
        session.apply(outcome);
    }
    assert_eq!(marker_ids(&mut session), vec!["a"]);
    assert!(session.load_banner().is_none());
    assert!(!session.is_loading());
    let cached = coordinator.cached().await.expect("cached");
    assert_eq!(cached.memos.len(), 1);
}
