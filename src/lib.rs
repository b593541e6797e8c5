pub mod config;
pub mod domain;
pub mod events;
pub mod infrastructure;
pub mod models;
pub mod services;

pub use config::*;
pub use domain::*;
pub use events::*;
pub use models::*;
pub use services::*;
