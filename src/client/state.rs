use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CLIENT_STATE_KEY;
use crate::core::store::KvStore;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Success,
    Error,
}

/// A freet as the client caches it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FreetView {
    #[serde(rename = "_id")]
    pub id: String,
    pub author: String,
    pub content: String,
    pub date_created: String,
    #[serde(default)]
    pub date_modified: Option<String>,
}

/// Shared UI state. Everything except `alerts` survives a reload.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppState {
    pub followed_users: Vec<String>,
    /// Username to filter shown freets by; `None` shows all.
    pub filter: Option<String>,
    pub freets: Vec<FreetView>,
    pub is_recommended_enabled: bool,
    pub recommended_freets: Vec<FreetView>,
    pub username: Option<String>,
    pub session_start_time: Option<DateTime<Utc>>,
    pub time_limit: Option<i64>,
    pub milestone: Option<i64>,
    #[serde(skip)]
    pub alerts: BTreeMap<String, AlertStatus>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            followed_users: Vec::new(),
            filter: None,
            freets: Vec::new(),
            is_recommended_enabled: true,
            recommended_freets: Vec::new(),
            username: None,
            session_start_time: None,
            time_limit: None,
            milestone: None,
            alerts: BTreeMap::new(),
        }
    }
}

/// One named state change. Each replaces a single field.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    SetUsername(Option<String>),
    UpdateFilter(Option<String>),
    SetSessionStartTime(Option<DateTime<Utc>>),
    SetTimeLimit(Option<i64>),
    SetMilestone(Option<i64>),
    SetFollowedUsers(Vec<String>),
    SetFreets(Vec<FreetView>),
    SetRecommendedFreets(Vec<FreetView>),
    SetIsRecommendedEnabled(bool),
}

pub fn apply(mut state: AppState, mutation: Mutation) -> AppState {
    match mutation {
        Mutation::SetUsername(username) => state.username = username,
        Mutation::UpdateFilter(filter) => state.filter = filter,
        Mutation::SetSessionStartTime(start) => state.session_start_time = start,
        Mutation::SetTimeLimit(limit) => state.time_limit = limit,
        Mutation::SetMilestone(milestone) => state.milestone = milestone,
        Mutation::SetFollowedUsers(users) => state.followed_users = users,
        Mutation::SetFreets(freets) => state.freets = freets,
        Mutation::SetRecommendedFreets(freets) => state.recommended_freets = freets,
        Mutation::SetIsRecommendedEnabled(enabled) => state.is_recommended_enabled = enabled,
    }
    state
}

pub fn insert_alert(state: &mut AppState, message: &str, status: AlertStatus) {
    state.alerts.insert(message.to_string(), status);
}

pub fn remove_alert(state: &mut AppState, message: &str) {
    state.alerts.remove(message);
}

// === Persistence ===

pub fn save<S: KvStore>(store: &S, state: &AppState) -> anyhow::Result<()> {
    store.set_json(CLIENT_STATE_KEY, state)
}

/// Read the persisted snapshot, or a fresh state when there is none.
pub fn load<S: KvStore>(store: &S) -> anyhow::Result<AppState> {
    Ok(store.get_json(CLIENT_STATE_KEY)?.unwrap_or_default())
}

pub fn clear<S: KvStore>(store: &S) -> anyhow::Result<()> {
    store.delete(CLIENT_STATE_KEY)
}
