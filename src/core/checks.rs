//! Ordered request checks.
//!
//! A route lists its checks in order; `run_checks` stops at the first one
//! that fails and its error becomes the response. The handler only runs when
//! every check passes.

use std::collections::HashMap;

use serde_json::Value;
use spin_sdk::http::Request;

use crate::auth::session_user;
use crate::core::errors::ApiError;
use crate::core::query_params::parse_query_params;
use crate::core::store::KvStore;

/// Everything a check or handler may look at for one request.
pub struct RequestContext<'a, S: KvStore> {
    pub store: &'a S,
    pub session: Option<String>,
    pub token: Option<String>,
    pub body: Value,
    pub query: HashMap<String, String>,
    /// Decoded `:username` path segment, when the route has one.
    pub username: Option<String>,
}

pub type Check<S> = for<'a> fn(&RequestContext<'a, S>) -> Result<(), ApiError>;

impl<'a, S: KvStore> RequestContext<'a, S> {
    pub fn from_request(
        store: &'a S,
        req: &Request,
        username: Option<String>,
    ) -> Result<Self, ApiError> {
        let body = if req.body().iter().all(u8::is_ascii_whitespace) {
            Value::Object(Default::default())
        } else {
            serde_json::from_slice(req.body())
                .map_err(|_| ApiError::BadRequest("Request body must be valid JSON.".to_string()))?
        };
        let token = bearer_token(req);
        let session = match &token {
            Some(token) => session_user(store, token)?,
            None => None,
        };

        Ok(Self {
            store,
            session,
            token,
            body,
            query: parse_query_params(req.uri()),
            username,
        })
    }

    /// The logged-in user id. Only call after `is_user_logged_in` passed.
    pub fn user_id(&self) -> Result<&str, ApiError> {
        self.session.as_deref().ok_or(ApiError::AuthRequired)
    }

    /// Path username, or an empty string when the route has none.
    pub fn path_username(&self) -> &str {
        self.username.as_deref().unwrap_or_default()
    }

    /// A body field as a string. JSON numbers and booleans are rendered the
    /// way a form post would carry them; anything else counts as absent.
    pub fn field(&self, name: &str) -> Option<String> {
        match self.body.get(name)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

pub fn run_checks<S: KvStore>(
    ctx: &RequestContext<'_, S>,
    checks: &[Check<S>],
) -> Result<(), ApiError> {
    for check in checks {
        check(ctx)?;
    }
    Ok(())
}

fn bearer_token(req: &Request) -> Option<String> {
    let auth_header = req.header("Authorization")?.as_str()?;
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

// === Session checks shared by every resource ===

pub fn is_user_logged_in<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<(), ApiError> {
    if ctx.session.is_none() {
        return Err(ApiError::AuthRequired);
    }
    Ok(())
}

pub fn is_user_logged_out<S: KvStore>(ctx: &RequestContext<'_, S>) -> Result<(), ApiError> {
    if ctx.session.is_some() {
        return Err(ApiError::AlreadyLoggedIn);
    }
    Ok(())
}
