pub mod log;

pub mod analytics;
pub mod apply;
pub mod assistants;
pub mod config;
pub mod coordinator;
pub mod feedback;
pub mod golem_error;
pub mod http;
pub mod ledger;
pub mod memory_store;
pub mod model;
pub mod prompt;
pub mod rest_store;
pub mod session;
pub mod status;
pub mod store;
pub mod types;
pub mod worker;
