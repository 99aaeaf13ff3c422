//! Feed handling: finding feeds for an outlet and turning documents into items.
//!
//! - [`discover`]: homepage scan for feed-looking links, used when an outlet
//!   has no configured feeds and discovery is enabled
//! - [`parser`]: RSS/Atom detection and normalization into
//!   [`FeedItem`](crate::models::FeedItem)s

pub mod discover;
pub mod parser;

pub use discover::discover;
pub use parser::{FeedFormat, parse};
