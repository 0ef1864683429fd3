//! Miscellaneous common structs used throughout the library.

mod id;
mod kbucket;
mod peer;

pub use id::*;
pub use kbucket::*;
pub use peer::*;
