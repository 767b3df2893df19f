pub mod auth;
pub mod config;
pub mod core;
pub mod follow;
pub mod forms;
pub mod models;
pub mod posts;
pub mod router;
pub mod templates;
pub mod users;

#[cfg(target_arch = "wasm32")]
mod component {
    use spin_sdk::http::{IntoResponse, Request};
    use spin_sdk::http_component;
    use spin_sdk::key_value::Store;

    use crate::config::seed_demo_data;
    use crate::core::db::init_test_data;
    use crate::router::dispatch;

    #[http_component]
    fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
        let store = Store::open_default()?;
        if seed_demo_data() {
            init_test_data(&store)?;
        }
        Ok(dispatch(&store, &req))
    }
}
