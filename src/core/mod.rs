pub mod db;
pub mod errors;
pub mod helpers;
pub mod pagination;
pub mod query_params;
pub mod session;
pub mod static_server;
pub mod store;
