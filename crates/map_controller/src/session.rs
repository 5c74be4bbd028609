//! Single owner of map interaction state.
//!
//! Every mutation goes through a named command. Commands that need the remote
//! store return a [`SyncRequest`]; the caller runs it and feeds the resulting
//! [`SyncOutcome`]s back through [`MapSession::apply`]. Domain data only changes
//! when a reload lands.

use std::sync::Arc;

use shared::{
    domain::{Coordinates, Memo, MemoId, UserId},
    format::memo_count_label,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    color::UserColorAssigner,
    events::{AlertContext, SessionAlert, SyncFailure, SyncOutcome, SyncRequest},
    filter::{authors, AuthorSummary, FilterSet},
    markers::{Marker, MarkerRegistry},
    mode::{ClickOutcome, ClickRouting, Cursor, ModeController, ModeError, ModeKind},
    viewport::{CameraPosition, MapStyle, ViewportConfig, ViewportController},
};

pub const DEFAULT_LOAD_LIMIT: u32 = 500;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error(transparent)]
    Mode(#[from] ModeError),
    #[error("memo {0} is not in the loaded collection")]
    UnknownMemo(MemoId),
    #[error("memo {memo_id} belongs to another user")]
    NotOwner { memo_id: MemoId },
    #[error("a {0} request is already in flight")]
    MutationInFlight(&'static str),
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub viewport: ViewportConfig,
    pub load_limit: u32,
    /// Signed-in user. When set, only their memos can be relocated or deleted.
    pub current_user: Option<UserId>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            viewport: ViewportConfig::default(),
            load_limit: DEFAULT_LOAD_LIMIT,
            current_user: None,
        }
    }
}

/// Result of the last load that landed. A load in flight does not change it.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Idle,
    Loaded,
    /// Persistent banner; cleared only by a successful reload.
    Failed(SessionAlert),
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteStep {
    Armed,
    Commit(SyncRequest),
}

#[derive(Debug, Default)]
struct InFlight {
    creating: bool,
    saving: Option<MemoId>,
    deleting: Option<MemoId>,
}

pub struct MapSession {
    config: SessionConfig,
    colors: UserColorAssigner,
    memos: Arc<[Memo]>,
    total_items: usize,
    load_status: LoadStatus,
    loading: bool,
    filter: FilterSet,
    modes: ModeController,
    registry: MarkerRegistry,
    viewport: ViewportController,
    style: MapStyle,
    selected: Option<MemoId>,
    delete_armed: Option<MemoId>,
    in_flight: InFlight,
    alerts: Vec<SessionAlert>,
}

impl MapSession {
    pub fn new(config: SessionConfig) -> Self {
        let viewport = ViewportController::new(config.viewport);
        Self {
            config,
            colors: UserColorAssigner,
            memos: Arc::from(Vec::new()),
            total_items: 0,
            load_status: LoadStatus::Idle,
            loading: false,
            filter: FilterSet::new(),
            modes: ModeController::new(),
            registry: MarkerRegistry::new(),
            viewport,
            style: MapStyle::default(),
            selected: None,
            delete_armed: None,
            in_flight: InFlight::default(),
            alerts: Vec::new(),
        }
    }

    // Queries

    pub fn memos(&self) -> &Arc<[Memo]> {
        &self.memos
    }

    pub fn memo(&self, memo_id: &MemoId) -> Option<&Memo> {
        self.memos.iter().find(|m| &m.memo_id == memo_id)
    }

    pub fn filter(&self) -> &FilterSet {
        &self.filter
    }

    pub fn mode(&self) -> ModeKind {
        self.modes.kind()
    }

    pub fn modes(&self) -> &ModeController {
        &self.modes
    }

    pub fn cursor(&self) -> Cursor {
        self.modes.cursor()
    }

    pub fn click_routing(&self) -> ClickRouting {
        self.modes.click_routing()
    }

    pub fn load_status(&self) -> &LoadStatus {
        &self.load_status
    }

    pub fn load_banner(&self) -> Option<&SessionAlert> {
        match &self.load_status {
            LoadStatus::Failed(alert) => Some(alert),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_busy(&self) -> bool {
        self.is_loading()
            || self.in_flight.creating
            || self.in_flight.saving.is_some()
            || self.in_flight.deleting.is_some()
    }

    pub fn is_saving(&self) -> bool {
        self.in_flight.saving.is_some()
    }

    pub fn is_deleting(&self) -> bool {
        self.in_flight.deleting.is_some()
    }

    pub fn delete_armed(&self) -> Option<&MemoId> {
        self.delete_armed.as_ref()
    }

    pub fn selected_memo(&self) -> Option<&Memo> {
        self.selected.as_ref().and_then(|id| self.memo(id))
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn memo_count_label(&self) -> String {
        memo_count_label(self.memos.len())
    }

    pub fn style(&self) -> MapStyle {
        self.style
    }

    pub fn markers(&mut self) -> Arc<[Marker]> {
        self.registry
            .markers(&self.memos, &self.filter, self.modes.edit_session())
    }

    pub fn authors(&self) -> Vec<AuthorSummary> {
        authors(&self.memos, &self.filter, &self.colors)
    }

    /// Initial camera. The first call fixes it for the lifetime of the session.
    pub fn mount_camera(&mut self) -> CameraPosition {
        self.viewport.mount(&self.memos)
    }

    pub fn focus_marker(&self, memo_id: &MemoId, current_zoom: f64) -> Option<CameraPosition> {
        let position = self.memo(memo_id)?.map_position()?;
        Some(self.viewport.focus(position, current_zoom))
    }

    pub fn take_alerts(&mut self) -> Vec<SessionAlert> {
        std::mem::take(&mut self.alerts)
    }

    // Commands

    /// Initial load, refresh and "try again" all go through here. A failure banner
    /// stays up while the retry runs.
    pub fn refresh(&mut self) -> SyncRequest {
        self.loading = true;
        SyncRequest::Load {
            limit: self.config.load_limit,
        }
    }

    pub fn toggle_filter(&mut self, user_id: &UserId) {
        self.filter = self.filter.toggle(user_id);
        debug!(user_id = %user_id, active = self.filter.len(), "author filter toggled");
    }

    pub fn clear_filters(&mut self) {
        self.filter = self.filter.clear();
    }

    pub fn set_style(&mut self, style: MapStyle) {
        self.style = style;
    }

    /// Refused while an earlier creation is still in flight, so its late outcome
    /// cannot close a newer placement.
    pub fn start_new_memo(&mut self) -> Result<(), SessionError> {
        if self.in_flight.creating {
            return Err(SessionError::MutationInFlight("create"));
        }
        self.modes.enter_placing()?;
        self.selected = None;
        Ok(())
    }

    pub fn map_clicked(&mut self, position: Coordinates) -> Result<ClickOutcome, SessionError> {
        let outcome = self.modes.map_clicked(position)?;
        if outcome == ClickOutcome::PassedThrough {
            self.selected = None;
        }
        Ok(outcome)
    }

    /// Opens the popup for a marker in Viewing; ignored in the other modes.
    pub fn marker_clicked(&mut self, memo_id: &MemoId) -> bool {
        if self.modes.kind() != ModeKind::Viewing || self.memo(memo_id).is_none() {
            return false;
        }
        self.selected = Some(memo_id.clone());
        true
    }

    pub fn close_popup(&mut self) {
        self.selected = None;
        self.delete_armed = None;
    }

    pub fn submit_new_memo(
        &mut self,
        text: &str,
        title: Option<&str>,
        park_name: Option<&str>,
    ) -> Result<SyncRequest, SessionError> {
        if self.in_flight.creating {
            return Err(SessionError::MutationInFlight("create"));
        }
        let draft = self.modes.creation_draft(text, title, park_name)?;
        self.in_flight.creating = true;
        Ok(SyncRequest::Create(draft))
    }

    /// Closes the creation flow without submitting.
    pub fn dismiss_new_memo(&mut self) -> Result<(), SessionError> {
        self.modes.finish_placement()?;
        Ok(())
    }

    pub fn edit_location(&mut self, memo_id: Option<&MemoId>) -> Result<(), SessionError> {
        let memo_id = memo_id.ok_or(ModeError::MissingMemoId)?;
        self.ensure_owned(memo_id)?;
        self.modes.enter_editing(Some(memo_id.clone()))?;
        self.selected = None;
        self.delete_armed = None;
        Ok(())
    }

    pub fn marker_drag_ended(
        &mut self,
        memo_id: &MemoId,
        position: Coordinates,
    ) -> Result<(), SessionError> {
        self.modes.drag_ended(memo_id, position)?;
        Ok(())
    }

    pub fn save_location(&mut self) -> Result<SyncRequest, SessionError> {
        if self.in_flight.saving.is_some() {
            return Err(SessionError::MutationInFlight("update_location"));
        }
        let (memo_id, position) = self.modes.pending_save()?;
        self.in_flight.saving = Some(memo_id.clone());
        Ok(SyncRequest::UpdateLocation { memo_id, position })
    }

    /// Leaves Placing or Editing, dropping any capture or draft. No request is made.
    pub fn cancel(&mut self) -> ModeKind {
        self.modes.cancel()
    }

    /// First call arms the confirmation, a second call for the same memo commits it.
    pub fn request_delete(&mut self, memo_id: &MemoId) -> Result<DeleteStep, SessionError> {
        self.ensure_owned(memo_id)?;
        if self.in_flight.deleting.is_some() {
            return Err(SessionError::MutationInFlight("delete"));
        }
        if self.delete_armed.as_ref() != Some(memo_id) {
            self.delete_armed = Some(memo_id.clone());
            return Ok(DeleteStep::Armed);
        }
        self.in_flight.deleting = Some(memo_id.clone());
        Ok(DeleteStep::Commit(SyncRequest::Delete {
            memo_id: memo_id.clone(),
        }))
    }

    pub fn disarm_delete(&mut self) {
        self.delete_armed = None;
    }

    pub fn apply(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Loaded { memos, total_items } => {
                self.replace_collection(memos, total_items)
            }
            SyncOutcome::LoadFailed(failure) => {
                let alert = SessionAlert::from_failure(AlertContext::Load, &failure);
                warn!("memo load failed: {}", alert.message());
                self.loading = false;
                self.load_status = LoadStatus::Failed(alert);
            }
            SyncOutcome::Created(memo) => {
                self.in_flight.creating = false;
                info!(memo_id = %memo.memo_id, "memo placed");
                if self.modes.kind() == ModeKind::Placing {
                    let _ = self.modes.finish_placement();
                }
            }
            SyncOutcome::CreateFailed(failure) => {
                self.in_flight.creating = false;
                self.push_alert(AlertContext::Create, &failure);
            }
            SyncOutcome::LocationUpdated { memo_id } => {
                self.in_flight.saving = None;
                if self.modes.is_editing(&memo_id) {
                    let _ = self.modes.finish_editing(&memo_id);
                }
            }
            SyncOutcome::UpdateFailed { memo_id, failure } => {
                self.in_flight.saving = None;
                debug!(memo_id = %memo_id, "keeping draft after failed save");
                self.push_alert(AlertContext::UpdateLocation, &failure);
            }
            SyncOutcome::Deleted { memo_id } => {
                self.in_flight.deleting = None;
                self.delete_armed = None;
                if self.selected.as_ref() == Some(&memo_id) {
                    self.selected = None;
                }
            }
            SyncOutcome::DeleteFailed { memo_id, failure } => {
                self.in_flight.deleting = None;
                if self.delete_armed.as_ref() == Some(&memo_id) {
                    self.delete_armed = None;
                }
                self.push_alert(AlertContext::Delete, &failure);
            }
        }
    }

    fn replace_collection(&mut self, memos: Arc<[Memo]>, total_items: usize) {
        self.memos = memos;
        self.total_items = total_items;
        self.loading = false;
        self.load_status = LoadStatus::Loaded;

        if self
            .selected
            .as_ref()
            .is_some_and(|id| self.memo(id).is_none())
        {
            self.selected = None;
        }
        if self
            .delete_armed
            .as_ref()
            .is_some_and(|id| self.memo(id).is_none())
        {
            self.delete_armed = None;
        }
        let vanished = self
            .modes
            .edit_session()
            .map(|s| s.memo_id().clone())
            .filter(|id| self.memo(id).is_none());
        if let Some(id) = vanished {
            warn!(memo_id = %id, "edited memo disappeared on reload; leaving edit mode");
            self.modes.cancel();
        }
    }

    fn push_alert(&mut self, context: AlertContext, failure: &SyncFailure) {
        let alert = SessionAlert::from_failure(context, failure);
        warn!("{}: {}", alert.headline(), alert.message());
        self.alerts.push(alert);
    }

    fn ensure_owned(&self, memo_id: &MemoId) -> Result<(), SessionError> {
        let memo = self
            .memo(memo_id)
            .ok_or_else(|| SessionError::UnknownMemo(memo_id.clone()))?;
        match &self.config.current_user {
            Some(user) if user != &memo.user_id => Err(SessionError::NotOwner {
                memo_id: memo_id.clone(),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
