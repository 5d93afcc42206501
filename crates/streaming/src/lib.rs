pub mod media;
pub mod query;
pub mod request;
pub mod source;
pub mod tiles;

pub use media::*;
pub use query::*;
pub use request::*;
pub use source::*;
pub use tiles::*;
