//! Resource models
//!
//! Page records and path resolution consumed from the project, and the media
//! resources the cache stores.

pub mod media;
pub mod page;

pub use media::{load_image, AudioHandle, ResourceLoaders, TextDocument};
pub use page::{JumpPoint, Page, PageRecord, PathResolver, ProjectLayout};
