pub mod date_parser;
pub mod gradient;
pub mod normalize;

pub use gradient::{map_colors, ColorGradient, GradientError, GradientMapping, Rgb};
pub use normalize::{normalize_cell, normalize_column};
