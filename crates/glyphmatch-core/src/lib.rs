pub mod error;
pub mod features;
pub mod grid;
pub mod normalize;
pub mod traits;
pub mod types;

pub use error::{OcrError, Result};
pub use grid::{hamming_distance_percentage, PixelGrid};
pub use traits::Lexicon;
pub use types::*;
