use std::sync::Arc;

use shared::domain::{Coordinates, Memo, MemoId, UserId};

use crate::{
    color::{MarkerColor, UserColorAssigner},
    filter::FilterSet,
    mode::EditSession,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub memo_id: MemoId,
    pub owner_id: UserId,
    pub position: Coordinates,
    pub color: MarkerColor,
    pub initials: String,
    pub editable: bool,
}

/// First letters of the first and last name tokens, or the first two characters of
/// a single-token name.
pub fn display_initials(name: &str) -> String {
    let tokens: Vec<&str> = name.split_whitespace().collect();
    let letters: String = match tokens.as_slice() {
        [] => String::new(),
        [only] => only.chars().take(2).collect(),
        [first, .., last] => first.chars().take(1).chain(last.chars().take(1)).collect(),
    };
    letters.chars().flat_map(char::to_uppercase).collect()
}

/// Renderable markers for `memos`, in collection order.
///
/// Memos without a location are skipped, a non-empty filter keeps only its
/// authors, and the memo under edit is drawn at its draft position when one
/// exists. The memos themselves are never modified.
pub fn derive_markers(
    memos: &[Memo],
    filter: &FilterSet,
    edit: Option<&EditSession>,
    colors: &UserColorAssigner,
) -> Vec<Marker> {
    memos
        .iter()
        .filter(|memo| filter.admits(&memo.user_id))
        .filter_map(|memo| {
            let persisted = memo.map_position()?;
            let editing = edit.filter(|session| session.targets(&memo.memo_id));
            let position = editing
                .and_then(EditSession::draft)
                .unwrap_or(persisted);
            Some(Marker {
                memo_id: memo.memo_id.clone(),
                owner_id: memo.user_id.clone(),
                position,
                color: colors.color(&memo.user_id, memo.user_color.as_deref()),
                initials: display_initials(&memo.user_name),
                editable: editing.is_some(),
            })
        })
        .collect()
}

struct Derivation {
    memos: Arc<[Memo]>,
    filter: FilterSet,
    edit: Option<EditSession>,
    markers: Arc<[Marker]>,
}

/// Memoizes `derive_markers` on its three inputs. The collection is compared by
/// identity since it is only ever replaced wholesale.
#[derive(Default)]
pub struct MarkerRegistry {
    colors: UserColorAssigner,
    last: Option<Derivation>,
    derivations: usize,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markers(
        &mut self,
        memos: &Arc<[Memo]>,
        filter: &FilterSet,
        edit: Option<&EditSession>,
    ) -> Arc<[Marker]> {
        if let Some(last) = &self.last {
            if Arc::ptr_eq(&last.memos, memos)
                && &last.filter == filter
                && last.edit.as_ref() == edit
            {
                return Arc::clone(&last.markers);
            }
        }

        let markers: Arc<[Marker]> = derive_markers(memos, filter, edit, &self.colors).into();
        self.derivations += 1;
        self.last = Some(Derivation {
            memos: Arc::clone(memos),
            filter: filter.clone(),
            edit: edit.cloned(),
            markers: Arc::clone(&markers),
        });
        markers
    }

    /// Number of times the marker list was actually recomputed.
    pub fn derivations(&self) -> usize {
        self.derivations
    }
}

#[cfg(test)]
#[path = "tests/markers_tests.rs"]
mod tests;
