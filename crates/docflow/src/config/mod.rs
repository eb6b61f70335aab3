pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_str, ENV_API_BASE, ENV_APPROVER};
pub use schema::ClientConfig;
