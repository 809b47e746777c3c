use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use serde::Serialize;
use spin_sdk::http::Response;

use crate::auth::revoke_user_tokens;
use crate::config::*;
use crate::core::checks::{is_user_logged_in, is_user_logged_out, run_checks, RequestContext};
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, json_response, message_response, new_id};
use crate::core::store::{list_ids, push_id, remove_id, KvStore};
use crate::models::models::User;
use crate::{feed, follow, time_manager};

#[derive(Serialize, Debug, PartialEq)]
pub struct UserResponse {
    #[serde(rename = "_id")]
    pub id: String,
    pub username: String,
    #[serde(rename = "dateJoined")]
    pub date_joined: String,
}

pub fn construct_user_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id.clone(),
        username: user.username.clone(),
        date_joined: crate::core::helpers::format_date(&user.date_joined),
    }
}

// === Collection ===

pub fn find_by_id<S: KvStore>(store: &S, user_id: &str) -> anyhow::Result<Option<User>> {
    store.get_json(&user_key(user_id))
}

pub fn find_by_username<S: KvStore>(store: &S, username: &str) -> anyhow::Result<Option<User>> {
    for id in list_ids(store, USERS_LIST_KEY)? {
        if let Some(user) = find_by_id(store, &id)? {
            if user.username.eq_ignore_ascii_case(username) {
                return Ok(Some(user));
            }
        }
    }
    Ok(None)
}

pub fn add_user<S: KvStore>(store: &S, username: &str, password: &str) -> anyhow::Result<User> {
    let user = User {
        id: new_id(),
        username: username.to_string(),
        password: hash_password(password)?,
        date_joined: Utc::now(),
    };
    store.set_json(&user_key(&user.id), &user)?;
    push_id(store, USERS_LIST_KEY, &user.id)?;
    Ok(user)
}

/// Remove a user and everything they own.
pub fn delete_user<S: KvStore>(store: &S, user_id: &str) -> anyhow::Result<()> {
    feed::delete_by_user_id(store, user_id)?;
    time_manager::delete_by_user_id(store, user_id)?;
    follow::delete_all_by_follower(store, user_id)?;
    follow::delete_all_by_following(store, user_id)?;
    revoke_user_tokens(store, user_id)?;

    store.delete(&user_key(user_id))?;
    remove_id(store, USERS_LIST_KEY, user_id)?;
    tracing::info!(user_id, "user deleted");
    Ok(())
}

/// Look up a user the caller referenced by name; unknown names are a 404.
pub fn require_by_username<S: KvStore>(store: &S, username: &str) -> Result<User, ApiError> {
    find_by_username(store, username)?
        .ok_or_else(|| ApiError::UnknownUser(format!("A user with username {} does not exist.", username)))
}

/// Resolve a stored foreign key. A dangling id is a storage fault, not a client error.
pub fn require_by_id<S: KvStore>(store: &S, user_id: &str) -> Result<User, ApiError> {
    find_by_id(store, user_id)?
        .ok_or_else(|| ApiError::InternalError(format!("dangling user reference {}", user_id)))
}

// === Checks ===

fn username_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^\w+$").expect("Regex should compile"))
}

fn password_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^\S+$").expect("Regex should compile"))
}

pub fn is_valid_username<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<(), ApiError> {
    let username = ctx.field("username").unwrap_or_default();
    if !username_regex().is_match(&username) {
        return Err(ApiError::BadRequest(
            "Username must be a nonempty alphanumeric string.".to_string(),
        ));
    }
    if username.len() < MIN_USERNAME_LENGTH || username.len() > MAX_USERNAME_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Username must be {}-{} characters.",
            MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
        )));
    }
    Ok(())
}

pub fn is_valid_password<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<(), ApiError> {
    let password = ctx.field("password").unwrap_or_default();
    if !password_regex().is_match(&password) {
        return Err(ApiError::BadRequest(
            "Password must be a nonempty string without spaces.".to_string(),
        ));
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters.",
            MIN_PASSWORD_LENGTH
        )));
    }
    Ok(())
}

pub fn is_username_not_taken<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<(), ApiError> {
    let username = ctx.field("username").unwrap_or_default();
    if find_by_username(ctx.store, &username)?.is_some() {
        return Err(ApiError::Conflict("An account with this username already exists.".to_string()));
    }
    Ok(())
}

/// `?username=` must name an existing user.
pub fn is_user_exists<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<(), ApiError> {
    let username = ctx.query.get("username").map(String::as_str).unwrap_or_default();
    if username.is_empty() {
        return Err(ApiError::BadRequest("Provided username must be nonempty.".to_string()));
    }
    require_by_username(ctx.store, username)?;
    Ok(())
}

/// The `:username` path segment must name an existing user.
pub fn is_valid_following<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<(), ApiError> {
    require_by_username(ctx.store, ctx.path_username())?;
    Ok(())
}

// === HTTP Handlers ===

pub fn create_user<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<Response, ApiError> {
    run_checks(
        ctx,
        &[is_user_logged_out, is_valid_username, is_valid_password, is_username_not_taken],
    )?;

    let username = ctx.field("username").unwrap_or_default();
    let password = ctx.field("password").unwrap_or_default();
    let user = add_user(ctx.store, &username, &password)?;
    tracing::info!(user_id = %user.id, username = %user.username, "user created");

    json_response(
        201,
        &serde_json::json!({
            "message": format!("Your account was created successfully. Log in as {} to continue.", user.username),
            "user": construct_user_response(&user),
        }),
    )
}

pub fn delete_account<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<Response, ApiError> {
    run_checks(ctx, &[is_user_logged_in])?;

    delete_user(ctx.store, ctx.user_id()?)?;
    message_response(200, "Your account has been deleted successfully.")
}
