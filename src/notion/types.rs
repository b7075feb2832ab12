use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::RichText;

/// `{results, has_more, next_cursor}` envelope shared by every list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginatedList<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl<T> PaginatedList<T> {
    /// Cursor for the next request, only when the remote says there is more.
    pub fn continuation(&self) -> Option<&str> {
        if self.has_more {
            self.next_cursor.as_deref()
        } else {
            None
        }
    }
}

/// A database page. Properties stay raw until read through [`Page::property`]
/// so one odd property never fails the whole page.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub last_edited_time: String,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
    #[serde(default)]
    pub cover: Option<Value>,
}

impl Page {
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| AppError::MalformedRecord(e.to_string()))
    }

    /// Typed view of a property, `None` when it is absent or unreadable.
    pub fn property(&self, name: &str) -> Option<PropertyValue> {
        self.properties
            .get(name)
            .and_then(|raw| PropertyValue::deserialize(raw).ok())
    }

    pub fn cover(&self) -> Option<FileObject> {
        self.cover
            .as_ref()
            .and_then(|raw| FileObject::deserialize(raw).ok())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Title {
        title: Vec<RichText>,
    },
    RichText {
        rich_text: Vec<RichText>,
    },
    Date {
        date: Option<DateValue>,
    },
    People {
        people: Vec<Person>,
    },
    MultiSelect {
        multi_select: Vec<SelectOption>,
    },
    Status {
        status: Option<SelectOption>,
    },
    Files {
        files: Vec<FileObject>,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DateValue {
    #[serde(default)]
    pub start: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectOption {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileObject {
    External {
        external: FileUrl,
    },
    File {
        file: FileUrl,
    },
    #[serde(other)]
    Unsupported,
}

impl FileObject {
    pub fn url(&self) -> Option<&str> {
        match self {
            FileObject::External { external } => Some(&external.url),
            FileObject::File { file } => Some(&file.url),
            FileObject::Unsupported => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileUrl {
    pub url: String,
}
