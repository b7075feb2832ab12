use serde::{Serialize, Serializer};
use serde_json::{json, Value};

pub const STATUS_PROPERTY: &str = "Status";
pub const PUBLISH_DATE_PROPERTY: &str = "Publish Date";

/// Boolean filter tree accepted by the database query endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    StatusEquals { property: String, value: String },
    LastEditedOnOrAfter(String),
}

impl Filter {
    pub fn published() -> Self {
        Filter::StatusEquals {
            property: STATUS_PROPERTY.to_string(),
            value: crate::models::ArticleStatus::PUBLISHED.to_string(),
        }
    }

    /// Published pages, narrowed to those edited at or after `watermark` when given.
    pub fn published_since(watermark: Option<&str>) -> Self {
        match watermark {
            Some(ts) => Filter::And(vec![
                Filter::published(),
                Filter::LastEditedOnOrAfter(ts.to_string()),
            ]),
            None => Filter::published(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Filter::And(filters) => {
                json!({ "and": filters.iter().map(Filter::to_json).collect::<Vec<_>>() })
            }
            Filter::Or(filters) => {
                json!({ "or": filters.iter().map(Filter::to_json).collect::<Vec<_>>() })
            }
            Filter::StatusEquals { property, value } => {
                json!({ "property": property, "status": { "equals": value } })
            }
            Filter::LastEditedOnOrAfter(ts) => json!({
                "timestamp": "last_edited_time",
                "last_edited_time": { "on_or_after": ts }
            }),
        }
    }
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sort {
    pub property: String,
    pub direction: SortDirection,
}

impl Sort {
    pub fn newest_first() -> Self {
        Sort {
            property: PUBLISH_DATE_PROPERTY.to_string(),
            direction: SortDirection::Descending,
        }
    }
}

/// Body of a database query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    pub filter: Filter,
    pub sorts: Vec<Sort>,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
}

impl QueryRequest {
    pub fn new(filter: Filter, page_size: u32) -> Self {
        Self {
            filter,
            sorts: vec![Sort::newest_first()],
            page_size,
            start_cursor: None,
        }
    }

    pub fn with_cursor(mut self, cursor: Option<String>) -> Self {
        self.start_cursor = cursor;
        self
    }
}
