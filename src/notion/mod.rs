mod client;
mod filter;
mod projection;
mod source;
mod types;

pub use client::NotionClient;
pub use filter::{Filter, QueryRequest, Sort, SortDirection};
pub use projection::project_article;
pub use source::{ContentSource, MAX_BLOCKS_PER_PAGE};
pub use types::{FileObject, Page, PaginatedList, PropertyValue};
