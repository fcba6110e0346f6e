pub mod common;
pub mod gemini;
pub mod generation;
pub mod image;
pub mod style;

pub use common::*;
pub use generation::*;
pub use image::*;
pub use style::*;
