//! Interaction mode state machine: Viewing, Placing, Editing(memo).
//!
//! Exactly one mode is live. Placing and Editing never switch into each other;
//! the caller cancels first. Leaving either mode drops its transient state
//! (captured click, draft location) in the same step.

use std::fmt;

use shared::{
    domain::{Coordinates, MemoId},
    protocol::CreateMemoDraft,
};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    Viewing,
    Placing,
    Editing,
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Viewing => "viewing",
            Self::Placing => "placing",
            Self::Editing => "editing",
        })
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModeError {
    #[error("cannot enter editing without a memo id")]
    MissingMemoId,
    #[error("cannot start {requested} while {active} is active; cancel first")]
    InteractionActive {
        active: ModeKind,
        requested: ModeKind,
    },
    #[error("no memo placement in progress")]
    NotPlacing,
    #[error("no location edit in progress")]
    NotEditing,
    #[error("memo placement has no captured location")]
    NoCapturedLocation,
    #[error("location edit has no draft position")]
    NoDraftLocation,
    #[error("editing memo {editing} but received a position for memo {target}")]
    DraftTargetMismatch { editing: MemoId, target: MemoId },
    #[error("memo text must not be empty")]
    EmptyText,
    #[error("coordinates out of range: {latitude}, {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placement {
    captured: Option<Coordinates>,
}

impl Placement {
    pub fn captured(&self) -> Option<Coordinates> {
        self.captured
    }
}

/// Draft relocation of one memo. Only lives inside `Mode::Editing`.
#[derive(Debug, Clone, PartialEq)]
pub struct EditSession {
    memo_id: MemoId,
    draft: Option<Coordinates>,
}

impl EditSession {
    pub fn memo_id(&self) -> &MemoId {
        &self.memo_id
    }

    pub fn draft(&self) -> Option<Coordinates> {
        self.draft
    }

    pub fn targets(&self, memo_id: &MemoId) -> bool {
        &self.memo_id == memo_id
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum Mode {
    #[default]
    Viewing,
    Placing(Placement),
    Editing(EditSession),
}

impl Mode {
    pub fn kind(&self) -> ModeKind {
        match self {
            Self::Viewing => ModeKind::Viewing,
            Self::Placing(_) => ModeKind::Placing,
            Self::Editing(_) => ModeKind::Editing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Grab,
    Crosshair,
    Move,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickRouting {
    /// Clicks reach markers and open their popup.
    MarkerSelection,
    /// Clicks are consumed as location captures.
    LocationCapture,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickOutcome {
    PassedThrough,
    Captured(Coordinates),
    DraftMoved(Coordinates),
}

#[derive(Debug, Default)]
pub struct ModeController {
    mode: Mode,
}

impl ModeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn kind(&self) -> ModeKind {
        self.mode.kind()
    }

    pub fn edit_session(&self) -> Option<&EditSession> {
        match &self.mode {
            Mode::Editing(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_editing(&self, memo_id: &MemoId) -> bool {
        self.edit_session().is_some_and(|s| s.targets(memo_id))
    }

    pub fn captured_location(&self) -> Option<Coordinates> {
        match &self.mode {
            Mode::Placing(placement) => placement.captured,
            _ => None,
        }
    }

    pub fn cursor(&self) -> Cursor {
        match self.mode {
            Mode::Viewing => Cursor::Grab,
            Mode::Placing(_) => Cursor::Crosshair,
            Mode::Editing(_) => Cursor::Move,
        }
    }

    pub fn click_routing(&self) -> ClickRouting {
        match self.mode {
            Mode::Viewing => ClickRouting::MarkerSelection,
            Mode::Placing(_) | Mode::Editing(_) => ClickRouting::LocationCapture,
        }
    }

    /// "Start new memo". Re-entering while already placing keeps the capture.
    pub fn enter_placing(&mut self) -> Result<(), ModeError> {
        match &self.mode {
            Mode::Viewing => {
                self.mode = Mode::Placing(Placement::default());
                debug!("mode: viewing -> placing");
                Ok(())
            }
            Mode::Placing(_) => Ok(()),
            Mode::Editing(_) => Err(ModeError::InteractionActive {
                active: ModeKind::Editing,
                requested: ModeKind::Placing,
            }),
        }
    }

    pub fn enter_editing(&mut self, memo_id: Option<MemoId>) -> Result<(), ModeError> {
        let memo_id = memo_id.ok_or(ModeError::MissingMemoId)?;
        match &self.mode {
            Mode::Viewing => {
                debug!(memo_id = %memo_id, "mode: viewing -> editing");
                self.mode = Mode::Editing(EditSession {
                    memo_id,
                    draft: None,
                });
                Ok(())
            }
            Mode::Editing(session) if session.memo_id == memo_id => Ok(()),
            active => Err(ModeError::InteractionActive {
                active: active.kind(),
                requested: ModeKind::Editing,
            }),
        }
    }

    /// Routes a map click according to the current mode. A later capture replaces
    /// an earlier one.
    pub fn map_clicked(&mut self, position: Coordinates) -> Result<ClickOutcome, ModeError> {
        match &mut self.mode {
            Mode::Viewing => Ok(ClickOutcome::PassedThrough),
            Mode::Placing(placement) => {
                ensure_valid(position)?;
                placement.captured = Some(position);
                Ok(ClickOutcome::Captured(position))
            }
            Mode::Editing(session) => {
                ensure_valid(position)?;
                session.draft = Some(position);
                Ok(ClickOutcome::DraftMoved(position))
            }
        }
    }

    /// Commits the terminal position of a marker drag into the draft. Intermediate
    /// drag positions are never fed here.
    pub fn drag_ended(&mut self, memo_id: &MemoId, position: Coordinates) -> Result<(), ModeError> {
        let Mode::Editing(session) = &mut self.mode else {
            return Err(ModeError::NotEditing);
        };
        if &session.memo_id != memo_id {
            return Err(ModeError::DraftTargetMismatch {
                editing: session.memo_id.clone(),
                target: memo_id.clone(),
            });
        }
        ensure_valid(position)?;
        session.draft = Some(position);
        Ok(())
    }

    pub fn creation_draft(
        &self,
        text: &str,
        title: Option<&str>,
        park_name: Option<&str>,
    ) -> Result<CreateMemoDraft, ModeError> {
        let Mode::Placing(placement) = &self.mode else {
            return Err(ModeError::NotPlacing);
        };
        let position = placement.captured.ok_or(ModeError::NoCapturedLocation)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(ModeError::EmptyText);
        }
        Ok(CreateMemoDraft {
            text: text.to_string(),
            title: non_blank(title),
            park_name: non_blank(park_name),
            position,
        })
    }

    /// The memo and position a save would persist.
    pub fn pending_save(&self) -> Result<(MemoId, Coordinates), ModeError> {
        let session = self.edit_session().ok_or(ModeError::NotEditing)?;
        let draft = session.draft.ok_or(ModeError::NoDraftLocation)?;
        Ok((session.memo_id.clone(), draft))
    }

    /// Placing -> Viewing once the creation flow is submitted or dismissed.
    pub fn finish_placement(&mut self) -> Result<(), ModeError> {
        if !matches!(self.mode, Mode::Placing(_)) {
            return Err(ModeError::NotPlacing);
        }
        self.mode = Mode::Viewing;
        debug!("mode: placing -> viewing");
        Ok(())
    }

    /// Editing(m) -> Viewing after `m` was saved.
    pub fn finish_editing(&mut self, memo_id: &MemoId) -> Result<(), ModeError> {
        match &self.mode {
            Mode::Editing(session) if &session.memo_id == memo_id => {
                self.mode = Mode::Viewing;
                debug!(memo_id = %memo_id, "mode: editing -> viewing");
                Ok(())
            }
            Mode::Editing(session) => Err(ModeError::DraftTargetMismatch {
                editing: session.memo_id.clone(),
                target: memo_id.clone(),
            }),
            _ => Err(ModeError::NotEditing),
        }
    }

    /// Returns to Viewing from any mode, discarding transient state.
    pub fn cancel(&mut self) -> ModeKind {
        let previous = std::mem::take(&mut self.mode).kind();
        if previous != ModeKind::Viewing {
            debug!(from = %previous, "mode: cancelled");
        }
        previous
    }
}

fn ensure_valid(position: Coordinates) -> Result<(), ModeError> {
    if position.is_valid() {
        Ok(())
    } else {
        Err(ModeError::InvalidCoordinates {
            latitude: position.latitude,
            longitude: position.longitude,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
#[path = "tests/mode_tests.rs"]
mod tests;
