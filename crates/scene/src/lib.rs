pub mod feature;
pub mod geojson;
pub mod picking;
pub mod selection;

pub use feature::*;
pub use selection::*;
