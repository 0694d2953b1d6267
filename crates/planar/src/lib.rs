pub mod bbox;
pub mod polygon;
pub mod vec;

// Planar crate: small, well-tested geometry primitives only.
pub use bbox::*;
pub use polygon::*;
pub use vec::*;
