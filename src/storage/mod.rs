pub mod image;
pub mod local;
pub mod provider;

pub use image::ImageStore;
pub use local::*;
pub use provider::*;
