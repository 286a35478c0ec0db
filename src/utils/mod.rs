pub mod config_loader;
pub mod constants;

pub use config_loader::{LoadConfigError, has_unexpanded_var, load_from_file, load_from_file_sync, load_from_str};
pub use constants::*;
