use serde::Serialize;
use spin_sdk::http::Response;

use crate::config::*;
use crate::core::checks::{is_user_logged_in, run_checks, RequestContext};
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, message_response, new_id};
use crate::core::store::{list_ids, push_id, remove_id, KvStore};
use crate::models::models::{Feed, User};
use crate::users;

#[derive(Serialize, Debug, PartialEq)]
pub struct FeedResponse {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "isRecommendedEnabled")]
    pub is_recommended_enabled: bool,
}

/// Wire shape of a feed: the owner's username stands in for their id.
pub fn construct_feed_response(feed: &Feed, owner: &User) -> FeedResponse {
    FeedResponse {
        id: feed.id.clone(),
        user_id: owner.username.clone(),
        is_recommended_enabled: feed.is_recommended_enabled,
    }
}

// === Collection ===

pub fn add_one<S: KvStore>(store: &S, user_id: &str, is_recommended_enabled: bool) -> anyhow::Result<Feed> {
    let feed = Feed {
        id: new_id(),
        user_id: user_id.to_string(),
        is_recommended_enabled,
    };
    store.set_json(&feed_key(&feed.id), &feed)?;
    store.set_json(&feed_owner_key(user_id), &feed.id)?;
    push_id(store, FEEDS_LIST_KEY, &feed.id)?;
    Ok(feed)
}

/// Returns `None` when the user has no feed.
pub fn update_one<S: KvStore>(store: &S, user_id: &str, is_recommended_enabled: bool) -> anyhow::Result<Option<Feed>> {
    let Some(mut feed) = find_by_user_id(store, user_id)? else {
        return Ok(None);
    };
    feed.is_recommended_enabled = is_recommended_enabled;
    store.set_json(&feed_key(&feed.id), &feed)?;
    Ok(Some(feed))
}

pub fn find_one<S: KvStore>(store: &S, feed_id: &str) -> anyhow::Result<Option<Feed>> {
    store.get_json(&feed_key(feed_id))
}

pub fn find_by_user_id<S: KvStore>(store: &S, user_id: &str) -> anyhow::Result<Option<Feed>> {
    match store.get_json::<String>(&feed_owner_key(user_id))? {
        Some(feed_id) => find_one(store, &feed_id),
        None => Ok(None),
    }
}

pub fn find_by_username<S: KvStore>(store: &S, username: &str) -> anyhow::Result<Option<Feed>> {
    match users::find_by_username(store, username)? {
        Some(user) => find_by_user_id(store, &user.id),
        None => Ok(None),
    }
}

pub fn find_all<S: KvStore>(store: &S) -> anyhow::Result<Vec<Feed>> {
    let mut feeds = Vec::new();
    for id in list_ids(store, FEEDS_LIST_KEY)? {
        if let Some(feed) = find_one(store, &id)? {
            feeds.push(feed);
        }
    }
    Ok(feeds)
}

/// Returns whether a feed was removed.
pub fn delete_one<S: KvStore>(store: &S, feed_id: &str) -> anyhow::Result<bool> {
    let Some(feed) = find_one(store, feed_id)? else {
        return Ok(false);
    };
    store.delete(&feed_key(&feed.id))?;
    store.delete(&feed_owner_key(&feed.user_id))?;
    remove_id(store, FEEDS_LIST_KEY, &feed.id)?;
    Ok(true)
}

pub fn delete_by_user_id<S: KvStore>(store: &S, user_id: &str) -> anyhow::Result<bool> {
    match find_by_user_id(store, user_id)? {
        Some(feed) => delete_one(store, &feed.id),
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

pub fn is_feed_exists<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<(), ApiError> {
    if find_by_user_id(ctx.store, ctx.user_id()?)?.is_none() {
        return Err(ApiError::missing("Feed does not exist."));
    }
    Ok(())
}

pub fn is_feed_not_exists<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<(), ApiError> {
    if find_by_user_id(ctx.store, ctx.user_id()?)?.is_some() {
        return Err(ApiError::Exists("Feed already exists.".to_string()));
    }
    Ok(())
}

pub fn is_valid_recommended_enabled<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<(), ApiError> {
    match ctx.field("isRecommendedEnabled").as_deref() {
        Some("true") | Some("false") => Ok(()),
        _ => Err(ApiError::BadRequest(
            "isRecommendedEnabled must be true or false.".to_string(),
        )),
    }
}

fn recommended_flag<S: KvStore>(ctx: &RequestContext<'_, S>) -> bool {
    ctx.field("isRecommendedEnabled").as_deref() == Some("true")
}

// === HTTP Handlers ===

pub fn get_feed<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<Response, ApiError> {
    run_checks(ctx, &[is_user_logged_in, is_feed_exists])?;

    let user_id = ctx.user_id()?;
    let feed = find_by_user_id(ctx.store, user_id)?.ok_or_else(|| ApiError::missing("Feed does not exist."))?;
    let owner = users::require_by_id(ctx.store, user_id)?;
    json_response(200, &construct_feed_response(&feed, &owner))
}

pub fn create_feed<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<Response, ApiError> {
    run_checks(
        ctx,
        &[is_user_logged_in, is_feed_not_exists, is_valid_recommended_enabled],
    )?;

    let user_id = ctx.user_id()?;
    let feed = add_one(ctx.store, user_id, recommended_flag(ctx))?;
    let owner = users::require_by_id(ctx.store, user_id)?;
    tracing::info!(user_id, feed_id = %feed.id, "feed created");

    json_response(
        201,
        &serde_json::json!({
            "message": "Your Feed was created successfully.",
            "feed": construct_feed_response(&feed, &owner),
        }),
    )
}

pub fn update_feed<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<Response, ApiError> {
    run_checks(
        ctx,
        &[is_user_logged_in, is_feed_exists, is_valid_recommended_enabled],
    )?;

    let user_id = ctx.user_id()?;
    let feed = update_one(ctx.store, user_id, recommended_flag(ctx))?
        .ok_or_else(|| ApiError::missing("Feed does not exist."))?;
    let owner = users::require_by_id(ctx.store, user_id)?;
    tracing::info!(user_id, recommended = feed.is_recommended_enabled, "feed updated");

    json_response(
        201,
        &serde_json::json!({
            "message": "Your Feed was modified successfully.",
            "feed": construct_feed_response(&feed, &owner),
        }),
    )
}

pub fn delete_feed<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<Response, ApiError> {
    run_checks(ctx, &[is_user_logged_in, is_feed_exists])?;

    let user_id = ctx.user_id()?;
    delete_by_user_id(ctx.store, user_id)?;
    tracing::info!(user_id, "feed deleted");
    message_response(200, "Your Feed was deleted successfully.")
}
