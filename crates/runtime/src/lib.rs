pub mod refresh;
pub mod status;

pub use refresh::*;
pub use status::*;
