use serde::Serialize;
use spin_sdk::http::Response;

use crate::config::*;
use crate::core::checks::{is_user_logged_in, run_checks, RequestContext};
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, message_response, new_id};
use crate::core::store::{list_ids, push_id, remove_id, KvStore};
use crate::models::models::{TimeManager, TimeManagerPatch, User};
use crate::users;

/// Milestone and time limit travel as strings, the way clients submit them.
#[derive(Serialize, Debug, PartialEq)]
pub struct TimeManagerResponse {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    pub milestone: String,
    #[serde(rename = "timeLimit")]
    pub time_limit: String,
    #[serde(rename = "isEnabled")]
    pub is_enabled: bool,
}

pub fn construct_time_manager_response(time_manager: &TimeManager, owner: &User) -> TimeManagerResponse {
    TimeManagerResponse {
        id: time_manager.id.clone(),
        user_id: owner.username.clone(),
        milestone: time_manager.milestone.to_string(),
        time_limit: time_manager.time_limit.to_string(),
        is_enabled: time_manager.is_enabled,
    }
}

/// Trim and parse a submitted integer. `None` means the value is not numeric.
///
/// Parsing is strict on the whole trimmed string: `"42abc"` and a JSON number
/// such as `42.5` (read as `"42.5"`) are both rejected rather than truncated.
pub fn parse_numeric(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

// === Collection ===

pub fn add_one<S: KvStore>(store: &S, user_id: &str, milestone: i64, time_limit: i64) -> anyhow::Result<TimeManager> {
    let time_manager = TimeManager {
        id: new_id(),
        user_id: user_id.to_string(),
        milestone,
        time_limit,
        is_enabled: true,
    };
    store.set_json(&time_manager_key(&time_manager.id), &time_manager)?;
    store.set_json(&time_manager_owner_key(user_id), &time_manager.id)?;
    push_id(store, TIME_MANAGERS_LIST_KEY, &time_manager.id)?;
    Ok(time_manager)
}

/// Apply only the fields present in `patch`. Returns `None` when the user has
/// no time manager.
pub fn update_one<S: KvStore>(store: &S, user_id: &str, patch: &TimeManagerPatch) -> anyhow::Result<Option<TimeManager>> {
    let Some(mut time_manager) = find_by_user_id(store, user_id)? else {
        return Ok(None);
    };
    if let Some(milestone) = patch.milestone {
        time_manager.milestone = milestone;
    }
    if let Some(time_limit) = patch.time_limit {
        time_manager.time_limit = time_limit;
    }
    if let Some(is_enabled) = patch.is_enabled {
        time_manager.is_enabled = is_enabled;
    }
    store.set_json(&time_manager_key(&time_manager.id), &time_manager)?;
    Ok(Some(time_manager))
}

pub fn find_one<S: KvStore>(store: &S, time_manager_id: &str) -> anyhow::Result<Option<TimeManager>> {
    store.get_json(&time_manager_key(time_manager_id))
}

pub fn find_by_user_id<S: KvStore>(store: &S, user_id: &str) -> anyhow::Result<Option<TimeManager>> {
    match store.get_json::<String>(&time_manager_owner_key(user_id))? {
        Some(id) => find_one(store, &id),
        None => Ok(None),
    }
}

pub fn find_by_username<S: KvStore>(store: &S, username: &str) -> anyhow::Result<Option<TimeManager>> {
    match users::find_by_username(store, username)? {
        Some(user) => find_by_user_id(store, &user.id),
        None => Ok(None),
    }
}

pub fn find_all<S: KvStore>(store: &S) -> anyhow::Result<Vec<TimeManager>> {
    let mut time_managers = Vec::new();
    for id in list_ids(store, TIME_MANAGERS_LIST_KEY)? {
        if let Some(time_manager) = find_one(store, &id)? {
            time_managers.push(time_manager);
        }
    }
    Ok(time_managers)
}

pub fn delete_one<S: KvStore>(store: &S, time_manager_id: &str) -> anyhow::Result<bool> {
    let Some(time_manager) = find_one(store, time_manager_id)? else {
        return Ok(false);
    };
    store.delete(&time_manager_key(&time_manager.id))?;
    store.delete(&time_manager_owner_key(&time_manager.user_id))?;
    remove_id(store, TIME_MANAGERS_LIST_KEY, &time_manager.id)?;
    Ok(true)
}

pub fn delete_by_user_id<S: KvStore>(store: &S, user_id: &str) -> anyhow::Result<bool> {
    match find_by_user_id(store, user_id)? {
        Some(time_manager) => delete_one(store, &time_manager.id),
        None => Ok(false),
    }
}

pub fn delete_by_username<S: KvStore>(store: &S, username: &str) -> anyhow::Result<bool> {
    match users::find_by_username(store, username)? {
        Some(user) => delete_by_user_id(store, &user.id),
        None => Ok(false),
    }
}

// === Checks ===

fn non_empty_field<S: KvStore>(ctx: &RequestContext<'_, S>, name: &str) -> Option<String> {
    ctx.field(name).filter(|value| !value.is_empty())
}

pub fn is_empty_milestone<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<(), ApiError> {
    if non_empty_field(ctx, "milestone").is_none() {
        return Err(ApiError::BadRequest("Milestone must be nonempty.".to_string()));
    }
    Ok(())
}

pub fn is_empty_time_limit<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<(), ApiError> {
    if non_empty_field(ctx, "timeLimit").is_none() {
        return Err(ApiError::BadRequest("Time Limit must be nonempty.".to_string()));
    }
    Ok(())
}

/// Absent or empty values pass; the emptiness checks own that case.
pub fn is_numeric_milestone<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<(), ApiError> {
    match non_empty_field(ctx, "milestone") {
        Some(raw) if parse_numeric(&raw).is_none() => {
            Err(ApiError::BadRequest("Milestone must be numeric.".to_string()))
        }
        _ => Ok(()),
    }
}

pub fn is_numeric_time_limit<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<(), ApiError> {
    match non_empty_field(ctx, "timeLimit") {
        Some(raw) if parse_numeric(&raw).is_none() => {
            Err(ApiError::BadRequest("Time limit must be numeric.".to_string()))
        }
        _ => Ok(()),
    }
}

pub fn is_valid_enabled<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<(), ApiError> {
    match non_empty_field(ctx, "isEnabled").as_deref() {
        None | Some("true") | Some("false") => Ok(()),
        Some(_) => Err(ApiError::BadRequest("isEnabled must be true or false.".to_string())),
    }
}

pub fn is_time_manager_already_exists<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<(), ApiError> {
    if find_by_user_id(ctx.store, ctx.user_id()?)?.is_some() {
        return Err(ApiError::Exists("Time Manager already exists.".to_string()));
    }
    Ok(())
}

pub fn is_time_manager_not_exists<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<(), ApiError> {
    if find_by_user_id(ctx.store, ctx.user_id()?)?.is_none() {
        return Err(ApiError::missing("Time Manager does not exist."));
    }
    Ok(())
}

fn patch_from<S: KvStore>(ctx: &RequestContext<'_, S>) -> TimeManagerPatch {
    TimeManagerPatch {
        milestone: non_empty_field(ctx, "milestone").and_then(|raw| parse_numeric(&raw)),
        time_limit: non_empty_field(ctx, "timeLimit").and_then(|raw| parse_numeric(&raw)),
        is_enabled: non_empty_field(ctx, "isEnabled").map(|raw| raw == "true"),
    }
}

// === HTTP Handlers ===

pub fn get_time_manager<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<Response, ApiError> {
    run_checks(ctx, &[is_user_logged_in, is_time_manager_not_exists])?;

    let user_id = ctx.user_id()?;
    let time_manager = find_by_user_id(ctx.store, user_id)?
        .ok_or_else(|| ApiError::missing("Time Manager does not exist."))?;
    let owner = users::require_by_id(ctx.store, user_id)?;
    json_response(200, &construct_time_manager_response(&time_manager, &owner))
}

pub fn create_time_manager<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<Response, ApiError> {
    run_checks(
        ctx,
        &[
            is_user_logged_in,
            is_empty_milestone,
            is_empty_time_limit,
            is_numeric_milestone,
            is_numeric_time_limit,
            is_time_manager_already_exists,
        ],
    )?;

    let user_id = ctx.user_id()?;
    let patch = patch_from(ctx);
    let (Some(milestone), Some(time_limit)) = (patch.milestone, patch.time_limit) else {
        return Err(ApiError::BadRequest("Milestone and time limit are required.".to_string()));
    };
    let time_manager = add_one(ctx.store, user_id, milestone, time_limit)?;
    let owner = users::require_by_id(ctx.store, user_id)?;
    tracing::info!(user_id, milestone, time_limit, "time manager created");

    json_response(
        201,
        &serde_json::json!({
            "message": "Your Time Manager was created successfully.",
            "timeManager": construct_time_manager_response(&time_manager, &owner),
        }),
    )
}

pub fn update_time_manager<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<Response, ApiError> {
    run_checks(
        ctx,
        &[
            is_user_logged_in,
            is_numeric_milestone,
            is_numeric_time_limit,
            is_valid_enabled,
            is_time_manager_not_exists,
        ],
    )?;

    let user_id = ctx.user_id()?;
    let patch = patch_from(ctx);
    let time_manager = update_one(ctx.store, user_id, &patch)?
        .ok_or_else(|| ApiError::missing("Time Manager does not exist."))?;
    let owner = users::require_by_id(ctx.store, user_id)?;
    tracing::info!(user_id, ?patch, "time manager updated");

    json_response(
        200,
        &serde_json::json!({
            "message": "Your Time Manager was modified successfully.",
            "timeManager": construct_time_manager_response(&time_manager, &owner),
        }),
    )
}

pub fn delete_time_manager<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<Response, ApiError> {
    run_checks(ctx, &[is_user_logged_in, is_time_manager_not_exists])?;

    let user_id = ctx.user_id()?;
    delete_by_user_id(ctx.store, user_id)?;
    tracing::info!(user_id, "time manager deleted");
    message_response(200, "Your Time Manager was deleted successfully.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::users::add_user;

    #[test]
    fn numeric_parsing_trims_but_stays_strict() {
        assert_eq!(parse_numeric("42"), Some(42));
        assert_eq!(parse_numeric("  42  "), Some(42));
        assert_eq!(parse_numeric("-7"), Some(-7));
        assert_eq!(parse_numeric("abc"), None);
        assert_eq!(parse_numeric("42abc"), None);
        assert_eq!(parse_numeric("42.5"), None);
        assert_eq!(parse_numeric(""), None);
    }

    #[test]
    fn new_time_managers_start_enabled() {
        let store = MemoryStore::new();
        let bob = add_user(&store, "bob", "pw1").unwrap();
        let created = add_one(&store, &bob.id, 5, 30).unwrap();

        assert!(created.is_enabled);
        assert_eq!(find_by_user_id(&store, &bob.id).unwrap(), Some(created.clone()));
        assert_eq!(find_by_username(&store, "bob").unwrap(), Some(created.clone()));
        assert_eq!(find_all(&store).unwrap(), vec![created]);
    }

    #[test]
    fn patches_leave_missing_fields_alone() {
        let store = MemoryStore::new();
        let bob = add_user(&store, "bob", "pw1").unwrap();
        add_one(&store, &bob.id, 5, 30).unwrap();

        let patch = TimeManagerPatch {
            time_limit: Some(45),
            ..Default::default()
        };
        let updated = update_one(&store, &bob.id, &patch).unwrap().unwrap();
        assert_eq!((updated.milestone, updated.time_limit, updated.is_enabled), (5, 45, true));

        let patch = TimeManagerPatch {
            is_enabled: Some(false),
            ..Default::default()
        };
        let updated = update_one(&store, &bob.id, &patch).unwrap().unwrap();
        assert_eq!((updated.milestone, updated.time_limit, updated.is_enabled), (5, 45, false));

        assert!(update_one(&store, "nobody", &patch).unwrap().is_none());
    }

    #[test]
    fn delete_variants_clear_the_owner_index() {
        let store = MemoryStore::new();
        let bob = add_user(&store, "bob", "pw1").unwrap();
        let alice = add_user(&store, "alice", "pw2").unwrap();
        let first = add_one(&store, &bob.id, 1, 2).unwrap();
        add_one(&store, &alice.id, 3, 4).unwrap();

        assert!(delete_one(&store, &first.id).unwrap());
        assert!(find_by_user_id(&store, &bob.id).unwrap().is_none());
        assert!(delete_by_username(&store, "alice").unwrap());
        assert!(!delete_by_user_id(&store, &alice.id).unwrap());
        assert!(find_all(&store).unwrap().is_empty());
    }

    #[test]
    fn response_renders_numbers_as_strings() {
        let store = MemoryStore::new();
        let bob = add_user(&store, "bob", "pw1").unwrap();
        let time_manager = add_one(&store, &bob.id, 10, 60).unwrap();

        let dto = serde_json::to_value(construct_time_manager_response(&time_manager, &bob)).unwrap();
        assert_eq!(
            dto,
            serde_json::json!({
                "_id": time_manager.id,
                "userId": "bob",
                "milestone": "10",
                "timeLimit": "60",
                "isEnabled": true,
            })
        );
    }
}
