pub mod messages;
pub mod persistence;

pub use messages::*;
pub use persistence::*;
