pub mod image;

pub use self::image::ImageDecoder;
