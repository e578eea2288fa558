pub mod configuration;
pub mod modules;
pub mod types;

pub use configuration::*;
pub use modules::*;
pub use types::*;
