//! Request handlers.

pub mod billing;
pub mod dashboard;
pub mod generate;
pub mod health;
pub mod presets;
pub mod videos;

pub use billing::*;
pub use dashboard::*;
pub use generate::*;
pub use health::*;
pub use presets::*;
pub use videos::*;
