pub mod config;
pub mod credentials;
pub mod naming;
pub mod print;
pub mod types;

pub use config::{ConfigError, SampleConfig};
pub use credentials::Credentials;
pub use print::{print_item, print_properties};
pub use types::*;
