use chrono::Utc;
use serde::Serialize;
use spin_sdk::http::Response;

use crate::config::*;
use crate::core::checks::{is_user_logged_in, run_checks, RequestContext};
use crate::core::errors::ApiError;
use crate::core::helpers::{format_date, json_response, message_response, new_id};
use crate::core::store::{list_ids, push_id, remove_id, KvStore};
use crate::models::models::{Follow, User};
use crate::users::{self, is_user_exists, is_valid_following};

#[derive(Serialize, Debug, PartialEq)]
pub struct FollowResponse {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "followerId")]
    pub follower_id: String,
    #[serde(rename = "followingId")]
    pub following_id: String,
    #[serde(rename = "dateCreated")]
    pub date_created: String,
}

pub fn construct_follow_response(follow: &Follow, follower: &User, following: &User) -> FollowResponse {
    FollowResponse {
        id: follow.id.clone(),
        follower_id: follower.username.clone(),
        following_id: following.username.clone(),
        date_created: format_date(&follow.date_created),
    }
}

fn resolve_response<S: KvStore>(store: &S, follow: &Follow) -> Result<FollowResponse, ApiError> {
    let follower = users::require_by_id(store, &follow.follower_id)?;
    let following = users::require_by_id(store, &follow.following_id)?;
    Ok(construct_follow_response(follow, &follower, &following))
}

// === Collection ===

/// Resolve `following_username` and record the edge. Duplicate and self
/// edges are the caller's checks to reject.
pub fn add_one<S: KvStore>(store: &S, follower_id: &str, following_username: &str) -> anyhow::Result<Follow> {
    let following = users::find_by_username(store, following_username)?
        .ok_or_else(|| anyhow::anyhow!("no user named {}", following_username))?;

    let follow = Follow {
        id: new_id(),
        follower_id: follower_id.to_string(),
        following_id: following.id,
        date_created: Utc::now(),
    };
    store.set_json(&follow_key(&follow.id), &follow)?;
    store.set_json(&follow_edge_key(&follow.follower_id, &follow.following_id), &follow.id)?;
    push_id(store, FOLLOWS_LIST_KEY, &follow.id)?;
    Ok(follow)
}

pub fn find_one<S: KvStore>(store: &S, follow_id: &str) -> anyhow::Result<Option<Follow>> {
    store.get_json(&follow_key(follow_id))
}

pub fn find_one_by_ids<S: KvStore>(store: &S, follower_id: &str, following_id: &str) -> anyhow::Result<Option<Follow>> {
    match store.get_json::<String>(&follow_edge_key(follower_id, following_id))? {
        Some(follow_id) => find_one(store, &follow_id),
        None => Ok(None),
    }
}

/// Every follow, newest first.
pub fn find_all<S: KvStore>(store: &S) -> anyhow::Result<Vec<Follow>> {
    let mut follows = Vec::new();
    for id in list_ids(store, FOLLOWS_LIST_KEY)? {
        if let Some(follow) = find_one(store, &id)? {
            follows.push(follow);
        }
    }
    follows.sort_by(|a, b| b.date_created.cmp(&a.date_created));
    Ok(follows)
}

pub fn find_all_by_username<S: KvStore>(store: &S, username: &str) -> anyhow::Result<Vec<Follow>> {
    let Some(follower) = users::find_by_username(store, username)? else {
        return Ok(Vec::new());
    };
    Ok(find_all(store)?
        .into_iter()
        .filter(|follow| follow.follower_id == follower.id)
        .collect())
}

pub fn delete_one<S: KvStore>(store: &S, follow_id: &str) -> anyhow::Result<bool> {
    let Some(follow) = find_one(store, follow_id)? else {
        return Ok(false);
    };
    store.delete(&follow_key(&follow.id))?;
    store.delete(&follow_edge_key(&follow.follower_id, &follow.following_id))?;
    remove_id(store, FOLLOWS_LIST_KEY, &follow.id)?;
    Ok(true)
}

/// Username lookup, edge lookup, then delete: three store round-trips with
/// no isolation between them.
pub fn delete_by_usernames<S: KvStore>(store: &S, follower_id: &str, following_username: &str) -> anyhow::Result<bool> {
    let Some(following) = users::find_by_username(store, following_username)? else {
        return Ok(false);
    };
    match find_one_by_ids(store, follower_id, &following.id)? {
        Some(follow) => delete_one(store, &follow.id),
        None => Ok(false),
    }
}

pub fn delete_all_by_follower<S: KvStore>(store: &S, follower_id: &str) -> anyhow::Result<()> {
    for follow in find_all(store)? {
        if follow.follower_id == follower_id {
            delete_one(store, &follow.id)?;
        }
    }
    Ok(())
}

pub fn delete_all_by_following<S: KvStore>(store: &S, following_id: &str) -> anyhow::Result<()> {
    for follow in find_all(store)? {
        if follow.following_id == following_id {
            delete_one(store, &follow.id)?;
        }
    }
    Ok(())
}

// === Checks ===

fn edge_for_path_user<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<Option<Follow>, ApiError> {
    let following = users::require_by_username(ctx.store, ctx.path_username())?;
    Ok(find_one_by_ids(ctx.store, ctx.user_id()?, &following.id)?)
}

pub fn is_not_self_follow<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<(), ApiError> {
    let following = users::require_by_username(ctx.store, ctx.path_username())?;
    if following.id == ctx.user_id()? {
        return Err(ApiError::Exists("You cannot follow yourself.".to_string()));
    }
    Ok(())
}

pub fn is_follow_already_exists<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<(), ApiError> {
    if edge_for_path_user(ctx)?.is_some() {
        return Err(ApiError::Exists(format!(
            "Follow with {} already exists.",
            ctx.path_username()
        )));
    }
    Ok(())
}

pub fn is_follow_not_exists<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<(), ApiError> {
    if edge_for_path_user(ctx)?.is_none() {
        return Err(ApiError::missing_not_found(format!(
            "Follow with {} does not exist.",
            ctx.path_username()
        )));
    }
    Ok(())
}

// === HTTP Handlers ===

/// `GET /api/follows` lists every follow; with `?username=` only that user's.
pub fn get_follows<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<Response, ApiError> {
    let follows = if ctx.query.contains_key("username") {
        run_checks(ctx, &[is_user_exists])?;
        find_all_by_username(ctx.store, &ctx.query["username"])?
    } else {
        find_all(ctx.store)?
    };

    let response = follows
        .iter()
        .map(|follow| resolve_response(ctx.store, follow))
        .collect::<Result<Vec<_>, _>>()?;
    json_response(200, &response)
}

pub fn create_follow<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<Response, ApiError> {
    run_checks(
        ctx,
        &[is_user_logged_in, is_valid_following, is_not_self_follow, is_follow_already_exists],
    )?;

    let follow = add_one(ctx.store, ctx.user_id()?, ctx.path_username())?;
    tracing::info!(
        follower_id = %follow.follower_id,
        following_id = %follow.following_id,
        "follow created"
    );

    json_response(
        201,
        &serde_json::json!({
            "message": "Your Follow was created successfully.",
            "follow": resolve_response(ctx.store, &follow)?,
        }),
    )
}

pub fn delete_follow<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<Response, ApiError> {
    run_checks(ctx, &[is_user_logged_in, is_valid_following, is_follow_not_exists])?;

    let user_id = ctx.user_id()?;
    if !delete_by_usernames(ctx.store, user_id, ctx.path_username())? {
        // Lost a race with a concurrent unfollow.
        return Err(ApiError::missing_not_found(format!(
            "Follow with {} does not exist.",
            ctx.path_username()
        )));
    }
    tracing::info!(follower_id = user_id, following = ctx.path_username(), "follow deleted");
    message_response(200, "Your Follow was deleted successfully.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::users::add_user;
    use chrono::TimeZone;

    #[test]
    fn edges_are_found_by_both_ids() {
        let store = MemoryStore::new();
        let alice = add_user(&store, "alice", "pw1").unwrap();
        let bob = add_user(&store, "bob", "pw2").unwrap();

        let follow = add_one(&store, &alice.id, "bob").unwrap();

        assert_eq!(follow.following_id, bob.id);
        assert_eq!(find_one_by_ids(&store, &alice.id, &bob.id).unwrap(), Some(follow.clone()));
        assert!(find_one_by_ids(&store, &bob.id, &alice.id).unwrap().is_none());
        assert_eq!(find_all_by_username(&store, "alice").unwrap(), vec![follow]);
        assert!(find_all_by_username(&store, "bob").unwrap().is_empty());
    }

    #[test]
    fn add_one_rejects_unknown_targets() {
        let store = MemoryStore::new();
        let alice = add_user(&store, "alice", "pw1").unwrap();
        assert!(add_one(&store, &alice.id, "ghost").is_err());
        assert!(find_all(&store).unwrap().is_empty());
    }

    #[test]
    fn find_all_orders_newest_first() {
        let store = MemoryStore::new();
        let alice = add_user(&store, "alice", "pw1").unwrap();
        add_user(&store, "bob", "pw2").unwrap();
        add_user(&store, "carol", "pw3").unwrap();

        let mut older = add_one(&store, &alice.id, "bob").unwrap();
        older.date_created = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        store.set_json(&follow_key(&older.id), &older).unwrap();
        let newer = add_one(&store, &alice.id, "carol").unwrap();

        let ids: Vec<String> = find_all(&store).unwrap().into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[test]
    fn delete_by_usernames_removes_only_that_edge() {
        let store = MemoryStore::new();
        let alice = add_user(&store, "alice", "pw1").unwrap();
        add_user(&store, "bob", "pw2").unwrap();
        add_user(&store, "carol", "pw3").unwrap();
        add_one(&store, &alice.id, "bob").unwrap();
        let kept = add_one(&store, &alice.id, "carol").unwrap();

        assert!(delete_by_usernames(&store, &alice.id, "bob").unwrap());
        assert!(!delete_by_usernames(&store, &alice.id, "bob").unwrap());
        assert!(!delete_by_usernames(&store, &alice.id, "ghost").unwrap());
        assert_eq!(find_all(&store).unwrap(), vec![kept]);
    }

    #[test]
    fn bulk_deletes_by_follower() {
        let store = MemoryStore::new();
        let alice = add_user(&store, "alice", "pw1").unwrap();
        let bob = add_user(&store, "bob", "pw2").unwrap();
        add_user(&store, "carol", "pw3").unwrap();
        add_one(&store, &alice.id, "bob").unwrap();
        add_one(&store, &alice.id, "carol").unwrap();
        let kept = add_one(&store, &bob.id, "carol").unwrap();

        delete_all_by_follower(&store, &alice.id).unwrap();

        assert_eq!(find_all(&store).unwrap(), vec![kept]);
        assert!(find_one_by_ids(&store, &alice.id, &bob.id).unwrap().is_none());
    }

    #[test]
    fn response_uses_usernames_and_readable_date() {
        let store = MemoryStore::new();
        let alice = add_user(&store, "alice", "pw1").unwrap();
        let bob = add_user(&store, "bob", "pw2").unwrap();
        let follow = Follow {
            id: "f1".into(),
            follower_id: alice.id.clone(),
            following_id: bob.id.clone(),
            date_created: Utc.with_ymd_and_hms(2022, 10, 2, 9, 5, 0).unwrap(),
        };

        let dto = serde_json::to_value(construct_follow_response(&follow, &alice, &bob)).unwrap();
        assert_eq!(
            dto,
            serde_json::json!({
                "_id": "f1",
                "followerId": "alice",
                "followingId": "bob",
                "dateCreated": "October 2nd 2022, 9:05:00 am",
            })
        );
    }
}
