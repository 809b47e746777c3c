use spin_sdk::http::Response;
use crate::config::*;
use crate::core::checks::{is_user_logged_in, is_user_logged_out, run_checks, RequestContext};
use crate::core::errors::ApiError;
use crate::core::helpers::{
    json_response, message_response, new_id, now_iso, validate_uuid, verify_password,
};
use crate::core::store::{list_ids, push_id, remove_id, KvStore};
use crate::models::models::{TokenData, User};
use crate::users::{construct_user_response, find_by_username, is_valid_password, is_valid_username};

pub fn issue_token<S: KvStore>(store: &S, user_id: &str) -> anyhow::Result<String> {
    let token = new_id();
    let data = TokenData {
        user_id: user_id.to_string(),
        created_at: now_iso(),
    };
    store.set_json(&token_key(&token), &data)?;
    push_id(store, TOKENS_LIST_KEY, &token)?;
    Ok(token)
}

/// Resolve a bearer token to the id of a user that still exists.
///
/// Expired tokens and tokens of deleted users are revoked on sight.
pub fn session_user<S: KvStore>(store: &S, token: &str) -> anyhow::Result<Option<String>> {
    if !validate_uuid(token) {
        return Ok(None);
    }
    let Some(data) = store.get_json::<TokenData>(&token_key(token))? else {
        return Ok(None);
    };

    let lifetime = chrono::Duration::hours(token_expiration_hours());
    let expired = match chrono::DateTime::parse_from_rfc3339(&data.created_at) {
        Ok(created) => chrono::Utc::now() - created.with_timezone(&chrono::Utc) > lifetime,
        Err(_) => true,
    };
    if expired {
        tracing::debug!(user_id = %data.user_id, "session token expired");
        revoke_token(store, token)?;
        return Ok(None);
    }

    if store.get_json::<User>(&user_key(&data.user_id))?.is_none() {
        revoke_token(store, token)?;
        return Ok(None);
    }
    Ok(Some(data.user_id))
}

pub fn revoke_token<S: KvStore>(store: &S, token: &str) -> anyhow::Result<()> {
    store.delete(&token_key(token))?;
    remove_id(store, TOKENS_LIST_KEY, token)
}

pub fn revoke_user_tokens<S: KvStore>(store: &S, user_id: &str) -> anyhow::Result<()> {
    for token in list_ids(store, TOKENS_LIST_KEY)? {
        match store.get_json::<TokenData>(&token_key(&token))? {
            Some(data) if data.user_id != user_id => {}
            _ => revoke_token(store, &token)?,
        }
    }
    Ok(())
}

// === HTTP Handlers ===

pub fn login_user<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<Response, ApiError> {
    run_checks(ctx, &[is_user_logged_out, is_valid_username, is_valid_password])?;

    let username = ctx.field("username").unwrap_or_default();
    let password = ctx.field("password").unwrap_or_default();

    let user = match find_by_username(ctx.store, &username)? {
        Some(user) if verify_password(&password, &user.password) => user,
        _ => return Err(ApiError::InvalidCredentials),
    };

    let token = issue_token(ctx.store, &user.id)?;
    tracing::info!(user_id = %user.id, "user logged in");

    json_response(
        201,
        &serde_json::json!({
            "message": "You have logged in successfully",
            "token": token,
            "user": construct_user_response(&user),
        }),
    )
}

pub fn logout_user<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<Response, ApiError> {
    run_checks(ctx, &[is_user_logged_in])?;

    if let Some(token) = &ctx.token {
        revoke_token(ctx.store, token)?;
    }
    message_response(200, "You have been logged out successfully.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::users::{add_user, delete_user};

    #[test]
    fn issued_tokens_resolve_until_revoked() {
        let store = MemoryStore::new();
        let bob = add_user(&store, "bob", "pw1").unwrap();
        let token = issue_token(&store, &bob.id).unwrap();

        assert_eq!(session_user(&store, &token).unwrap(), Some(bob.id.clone()));

        revoke_token(&store, &token).unwrap();
        assert_eq!(session_user(&store, &token).unwrap(), None);
    }

    fn store_token(store: &MemoryStore, user_id: &str, created_at: String) -> String {
        let token = new_id();
        let data = TokenData {
            user_id: user_id.to_string(),
            created_at,
        };
        store.set_json(&token_key(&token), &data).unwrap();
        push_id(store, TOKENS_LIST_KEY, &token).unwrap();
        token
    }

    #[test]
    fn stale_tokens_do_not_resolve() {
        let store = MemoryStore::new();
        let bob = add_user(&store, "bob", "pw1").unwrap();
        let created = chrono::Utc::now() - chrono::Duration::hours(48);
        let token = store_token(&store, &bob.id, created.to_rfc3339());

        assert_eq!(session_user(&store, &token).unwrap(), None);
        assert_eq!(session_user(&store, "not-a-token").unwrap(), None);
    }

    #[test]
    fn tokens_expire_within_the_final_hour() {
        let store = MemoryStore::new();
        let bob = add_user(&store, "bob", "pw1").unwrap();
        let lifetime = chrono::Duration::hours(token_expiration_hours());

        let created = chrono::Utc::now() - lifetime - chrono::Duration::minutes(50);
        let late = store_token(&store, &bob.id, created.to_rfc3339());
        assert_eq!(session_user(&store, &late).unwrap(), None);

        let created = chrono::Utc::now() - lifetime + chrono::Duration::minutes(10);
        let fresh = store_token(&store, &bob.id, created.to_rfc3339());
        assert_eq!(session_user(&store, &fresh).unwrap(), Some(bob.id));
    }

    #[test]
    fn unreadable_creation_time_counts_as_expired() {
        let store = MemoryStore::new();
        let bob = add_user(&store, "bob", "pw1").unwrap();
        let token = store_token(&store, &bob.id, "yesterday".to_string());

        assert_eq!(session_user(&store, &token).unwrap(), None);
    }

    #[test]
    fn expired_tokens_are_removed_on_lookup() {
        let store = MemoryStore::new();
        let bob = add_user(&store, "bob", "pw1").unwrap();
        let created = chrono::Utc::now() - chrono::Duration::hours(48);
        let stale = store_token(&store, &bob.id, created.to_rfc3339());
        let live = issue_token(&store, &bob.id).unwrap();

        assert_eq!(session_user(&store, &stale).unwrap(), None);

        assert!(store.get(&token_key(&stale)).unwrap().is_none());
        assert_eq!(list_ids(&store, TOKENS_LIST_KEY).unwrap(), vec![live]);
    }

    #[test]
    fn orphaned_tokens_are_removed_on_lookup() {
        let store = MemoryStore::new();
        let token = store_token(&store, &new_id(), chrono::Utc::now().to_rfc3339());

        assert_eq!(session_user(&store, &token).unwrap(), None);
        assert!(list_ids(&store, TOKENS_LIST_KEY).unwrap().is_empty());
    }

    #[test]
    fn deleted_users_lose_their_sessions() {
        let store = MemoryStore::new();
        let bob = add_user(&store, "bob", "pw1").unwrap();
        let alice = add_user(&store, "alice", "pw2").unwrap();
        let bob_token = issue_token(&store, &bob.id).unwrap();
        let alice_token = issue_token(&store, &alice.id).unwrap();

        delete_user(&store, &bob.id).unwrap();

        assert_eq!(session_user(&store, &bob_token).unwrap(), None);
        assert!(store.get(&token_key(&bob_token)).unwrap().is_none());
        assert_eq!(session_user(&store, &alice_token).unwrap(), Some(alice.id));
    }
}
