use std::{
    collections::{BTreeSet, HashSet},
    sync::Arc,
};

use shared::domain::{Memo, UserId};

use crate::{
    color::{MarkerColor, UserColorAssigner},
    markers::display_initials,
};

/// Authors whose memos are shown. The empty set means no filter, never "show none".
///
/// Values are immutable: `toggle` and `clear` return a new set and leave the
/// receiver untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    selected: Arc<BTreeSet<UserId>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSummary {
    AllUsers,
    Selected(usize),
}

impl FilterSummary {
    pub fn label(self) -> String {
        match self {
            Self::AllUsers => "Showing all users".to_string(),
            Self::Selected(1) => "Showing 1 user".to_string(),
            Self::Selected(count) => format!("Showing {count} users"),
        }
    }
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn toggle(&self, user_id: &UserId) -> Self {
        let mut next = (*self.selected).clone();
        if !next.remove(user_id) {
            next.insert(user_id.clone());
        }
        Self {
            selected: Arc::new(next),
        }
    }

    #[must_use]
    pub fn clear(&self) -> Self {
        Self::default()
    }

    pub fn is_active(&self, user_id: &UserId) -> bool {
        self.selected.contains(user_id)
    }

    /// Whether memos by `owner` pass this filter.
    pub fn admits(&self, owner: &UserId) -> bool {
        self.selected.is_empty() || self.selected.contains(owner)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UserId> {
        self.selected.iter()
    }

    pub fn summary(&self) -> FilterSummary {
        match self.selected.len() {
            0 => FilterSummary::AllUsers,
            count => FilterSummary::Selected(count),
        }
    }
}

impl FromIterator<UserId> for FilterSet {
    fn from_iter<T: IntoIterator<Item = UserId>>(iter: T) -> Self {
        Self {
            selected: Arc::new(iter.into_iter().collect()),
        }
    }
}

/// One row of the author filter panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorSummary {
    pub user_id: UserId,
    pub display_name: String,
    pub color: MarkerColor,
    pub initials: String,
    pub selected: bool,
}

/// Unique authors of `memos` in first-seen order, including authors whose memos
/// have no location.
pub fn authors(
    memos: &[Memo],
    filter: &FilterSet,
    colors: &UserColorAssigner,
) -> Vec<AuthorSummary> {
    let mut seen = HashSet::new();
    memos
        .iter()
        .filter(|memo| seen.insert(memo.user_id.clone()))
        .map(|memo| AuthorSummary {
            user_id: memo.user_id.clone(),
            display_name: memo.user_name.clone(),
            color: colors.color(&memo.user_id, memo.user_color.as_deref()),
            initials: display_initials(&memo.user_name),
            selected: filter.is_active(&memo.user_id),
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/filter_tests.rs"]
mod tests;
