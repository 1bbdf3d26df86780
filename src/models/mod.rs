pub mod image;
pub mod usage;
pub mod user;

pub use image::*;
pub use usage::*;
pub use user::*;
