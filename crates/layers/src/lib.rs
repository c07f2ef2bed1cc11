pub mod layer;
pub mod presentation;
pub mod symbology;

pub use layer::*;
pub use presentation::*;
pub use symbology::*;
