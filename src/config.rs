use std::time::Duration;

// === Runtime settings ===
pub fn token_expiration_hours() -> i64 {
    std::env::var("FRITTER_TOKEN_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24)
}

pub fn bind_address() -> String {
    std::env::var("FRITTER_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
}

pub fn worker_count() -> Option<usize> {
    std::env::var("FRITTER_WORKERS")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| *n > 0)
}

// === Validation limits ===
pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 50;
pub const MIN_PASSWORD_LENGTH: usize = 3;

/// How long a client alert stays visible before it is dropped.
pub const ALERT_EXPIRY: Duration = Duration::from_secs(3);

pub const CLIENT_STATE_KEY: &str = "fritter:client_state";

// === Store keys ===
pub const USERS_LIST_KEY: &str = "users_list";
pub const TOKENS_LIST_KEY: &str = "tokens_list";
pub const FEEDS_LIST_KEY: &str = "feeds_list";
pub const FOLLOWS_LIST_KEY: &str = "follows_list";
pub const TIME_MANAGERS_LIST_KEY: &str = "time_managers_list";

pub fn user_key(user_id: &str) -> String {
    format!("user:{}", user_id)
}

pub fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

pub fn feed_key(feed_id: &str) -> String {
    format!("feed:{}", feed_id)
}

pub fn feed_owner_key(user_id: &str) -> String {
    format!("feed_owner:{}", user_id)
}

pub fn follow_key(follow_id: &str) -> String {
    format!("follow:{}", follow_id)
}

pub fn follow_edge_key(follower_id: &str, following_id: &str) -> String {
    format!("follow_edge:{}:{}", follower_id, following_id)
}

pub fn time_manager_key(time_manager_id: &str) -> String {
    format!("time_manager:{}", time_manager_id)
}

pub fn time_manager_owner_key(user_id: &str) -> String {
    format!("time_manager_owner:{}", user_id)
}
