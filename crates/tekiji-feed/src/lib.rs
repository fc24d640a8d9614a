//! Timely-disclosure feed.
//!
//! A [`DisclosureSource`] yields raw listing rows; [`DisclosureFilter`]
//! keeps today's in-session rows whose headline carries a positive keyword
//! and none of the excluded ones, one row per symbol.

pub mod config;
pub mod error;
pub mod filter;
pub mod source;

pub use config::{FeedConfig, SourceConfig};
pub use error::{FeedError, FeedResult};
pub use filter::DisclosureFilter;
pub use source::{build_source, DisclosureSource, DynDisclosureSource, FileSource, HttpSource, StaticSource};
