//! Configuration schema and loading.
//!
//! Settings drive backend selection, the reachability probe and logging.
//! Everything has a default, so a missing config file is not an error.

mod load;
mod schema;

pub use load::{default_config_path, load_settings, resolve_config_path, try_load_settings};
pub use schema::*;
