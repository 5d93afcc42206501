pub mod backend;
pub mod camera;
pub mod controls;
pub mod panorama;
pub mod sphere;
pub mod texture;

pub use backend::*;
pub use panorama::*;
pub use texture::{PanoramaImage, TextureLoadError};
