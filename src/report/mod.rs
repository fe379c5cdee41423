//! Visits reports and the sources they load from

pub mod actor;
mod api;
pub mod file;
pub mod http;
pub mod source;

pub use actor::{HighlightFilter, VisitsReport};
pub use file::FileVisitsSource;
pub use http::{HttpVisitsSource, VisitsEndpoint};
pub use source::{LoadError, LoadResult, VisitsSource};
