//! Request handlers.

pub mod convert;
pub mod download;
pub mod health;
pub mod inputs;

pub use convert::*;
pub use download::*;
pub use health::*;
pub use inputs::*;
