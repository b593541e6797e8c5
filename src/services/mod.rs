pub mod friend_request_coordinator;
pub mod notification_store;
pub mod pagination_cursor;
pub mod push_ingestor;
pub mod sync_controller;
pub mod unread_counter;

pub use friend_request_coordinator::*;
pub use notification_store::*;
pub use pagination_cursor::*;
pub use push_ingestor::*;
pub use sync_controller::*;
pub use unread_counter::*;
