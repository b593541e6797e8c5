pub mod friendship_service;
pub mod notification_transport;

pub use friendship_service::*;
pub use notification_transport::*;
