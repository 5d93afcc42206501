pub mod geodesy;
pub mod matrix;
pub mod mercator;
pub mod vec;

pub use geodesy::*;
pub use matrix::*;
pub use mercator::*;
pub use vec::*;
