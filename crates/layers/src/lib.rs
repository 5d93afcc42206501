pub mod base;
pub mod labels;
pub mod layer;
pub mod raster;
pub mod stack;
pub mod style;
pub mod symbology;
pub mod vector;
pub mod viewport;

pub use layer::*;
pub use stack::*;
pub use style::{LayerStyleResolver, StyleResolver, VisualPrimitive};
pub use viewport::{Pixel, Viewport};
