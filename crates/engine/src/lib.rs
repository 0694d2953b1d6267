pub mod arbiter;
pub mod config;
pub mod dispatch;
pub mod drive;
pub mod guard;
pub mod outbound;
pub mod reconcile;
pub mod session;

pub use arbiter::*;
pub use config::*;
pub use dispatch::*;
pub use drive::*;
pub use outbound::*;
pub use reconcile::*;
pub use session::*;
