pub mod client;
pub mod error;
pub mod geojson;

pub use client::*;
pub use error::*;
pub use geojson::*;
