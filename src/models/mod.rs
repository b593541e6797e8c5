pub mod notification;
pub mod view;

pub use notification::*;
pub use view::*;
