use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct User {
    pub id: String,
    pub username: String,
    pub password: String,
    pub date_joined: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
pub struct TokenData {
    pub user_id: String,
    pub created_at: String,
}

/// Per-user switch for mixing recommended freets into the timeline.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Feed {
    pub id: String,
    pub user_id: String,
    pub is_recommended_enabled: bool,
}

/// Directed edge: `follower_id` receives `following_id`'s freets.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Follow {
    pub id: String,
    pub follower_id: String,
    pub following_id: String,
    pub date_created: DateTime<Utc>,
}

/// Usage-moderation settings for one user.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TimeManager {
    pub id: String,
    pub user_id: String,
    pub milestone: i64,
    pub time_limit: i64,
    pub is_enabled: bool,
}

/// Fields a PUT may carry; `None` leaves the stored value alone.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeManagerPatch {
    pub milestone: Option<i64>,
    pub time_limit: Option<i64>,
    pub is_enabled: Option<bool>,
}
