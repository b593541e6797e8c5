#![allow(dead_code)]
#![allow(unused_imports)]
pub mod friendship_helpers;
pub mod record_helpers;
pub mod scripted_transport;

pub use friendship_helpers::*;
pub use record_helpers::*;
pub use scripted_transport::*;
