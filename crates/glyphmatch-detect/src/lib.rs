pub mod band;
pub mod builder;
pub mod contour;
pub mod order;
pub mod split;

pub use band::Band;
pub use builder::BandBuilder;
pub use contour::{find_artifacts, find_regions, flood_fill, flood_fill_bounds, Connectivity};
pub use order::{reading_order, Positioned, ROW_TOLERANCE};
pub use split::{split_large_artifact, valley_threshold};
