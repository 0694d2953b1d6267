pub mod model;
pub mod slot;
pub mod state_store;

pub use model::*;
pub use slot::*;
pub use state_store::*;
