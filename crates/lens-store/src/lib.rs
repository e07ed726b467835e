pub mod config;
pub mod error;
pub mod schema;
pub mod store;

pub use config::{CONFIG_FILE, DATA_DIR_ENV, DB_FILE, load_params, open_store, parse_params, resolve_data_dir};
pub use error::{Result, StoreError};
pub use store::{MEMORY_KEY, Store};
