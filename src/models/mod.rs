//! Data models for the school site.
//!
//! JSON field names follow the camelCase shape the site front-end reads.

mod blog;
mod content;
mod gallery;
mod icon;
mod message;
mod notice;

pub use blog::*;
pub use content::*;
pub use gallery::*;
pub use icon::*;
pub use message::*;
pub use notice::*;
