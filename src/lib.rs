//! Fritter: feeds, follows and time managers over a key-value store.
//!
//! Deployed as a Spin component the routes run against the Spin key-value
//! store; natively `server` serves the same routes from actix-web with an
//! in-process store.

pub mod auth;
pub mod client;
pub mod config;
pub mod core;
pub mod feed;
pub mod follow;
pub mod models;
pub mod router;
#[cfg(not(target_arch = "wasm32"))]
pub mod server;
pub mod time_manager;
pub mod users;

#[cfg(target_arch = "wasm32")]
mod component {
    use spin_sdk::http::{IntoResponse, Request};
    use spin_sdk::http_component;

    use crate::core::helpers::store;
    use crate::router;

    #[http_component]
    fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
        let store = store()?;
        Ok(router::handle(&store, &req))
    }
}
