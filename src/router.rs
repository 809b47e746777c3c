use spin_sdk::http::{Method, Request, Response};

use crate::core::checks::RequestContext;
use crate::core::errors::ApiError;
use crate::core::query_params::{decode_path_segment, request_path};
use crate::core::store::KvStore;
use crate::{auth, feed, follow, time_manager, users};

/// Route one request against `store`. Never fails: rejections and storage
/// faults come back as JSON error responses.
pub fn handle<S: KvStore>(store: &S, req: &Request) -> Response {
    let method = method_name(req.method());
    let path = request_path(req.uri()).trim_end_matches('/').to_string();
    tracing::debug!(%method, %path, "request");

    let result = dispatch(store, req, method, &path);
    match result {
        Ok(resp) => resp,
        Err(err) => err.into(),
    }
}

fn method_name(method: &Method) -> &'static str {
    match method {
        Method::Get => "GET",
        Method::Post => "POST",
        Method::Put => "PUT",
        Method::Delete => "DELETE",
        Method::Patch => "PATCH",
        Method::Head => "HEAD",
        Method::Options => "OPTIONS",
        _ => "OTHER",
    }
}

fn dispatch<S: KvStore>(store: &S, req: &Request, method: &str, path: &str) -> Result<Response, ApiError> {
    let username = path
        .strip_prefix("/api/follows/")
        .filter(|rest| !rest.is_empty() && !rest.contains('/'))
        .map(decode_path_segment);
    let ctx = || RequestContext::from_request(store, req, username.clone());

    match (method, path) {
        ("POST", "/api/users") => users::create_user(&ctx()?),
        ("DELETE", "/api/users") => users::delete_account(&ctx()?),
        ("POST", "/api/users/session") => auth::login_user(&ctx()?),
        ("DELETE", "/api/users/session") => auth::logout_user(&ctx()?),

        ("GET", "/api/feed") => feed::get_feed(&ctx()?),
        ("POST", "/api/feed") => feed::create_feed(&ctx()?),
        ("PUT", "/api/feed") => feed::update_feed(&ctx()?),
        ("DELETE", "/api/feed") => feed::delete_feed(&ctx()?),

        ("GET", "/api/follows") => follow::get_follows(&ctx()?),
        ("POST", _) if username.is_some() => follow::create_follow(&ctx()?),
        ("DELETE", _) if username.is_some() => follow::delete_follow(&ctx()?),

        ("GET", "/api/timemanager") => time_manager::get_time_manager(&ctx()?),
        ("POST", "/api/timemanager") => time_manager::create_time_manager(&ctx()?),
        ("PUT", "/api/timemanager") => time_manager::update_time_manager(&ctx()?),
        ("DELETE", "/api/timemanager") => time_manager::delete_time_manager(&ctx()?),

        _ => Err(ApiError::NotFound("No route found".to_string())),
    }
}
