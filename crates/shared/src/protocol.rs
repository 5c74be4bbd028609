use serde::{Deserialize, Serialize};

use crate::domain::{Coordinates, Memo, UserId};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemosResponse {
    pub memos: Vec<Memo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl MemosResponse {
    /// Server-side total when paginated, otherwise the number of memos returned.
    pub fn total_items(&self) -> usize {
        self.pagination
            .as_ref()
            .map(|p| p.total_items)
            .unwrap_or(self.memos.len())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: usize,
    pub items_per_page: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListMemosQuery {
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub park_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl ListMemosQuery {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpdateLocationRequest {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<Coordinates> for UpdateLocationRequest {
    fn from(value: Coordinates) -> Self {
        Self {
            latitude: value.latitude,
            longitude: value.longitude,
        }
    }
}

/// Fields of a text memo about to be submitted. Audio is attached by the client.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateMemoDraft {
    pub text: String,
    pub title: Option<String>,
    pub park_name: Option<String>,
    pub position: Coordinates,
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
