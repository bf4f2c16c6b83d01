pub mod backend;
pub mod memory;
pub mod types;

pub use backend::*;
pub use memory::*;
pub use types::*;
