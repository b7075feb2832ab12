//! Mapping from remote pages to [`Article`] records.
//!
//! Every lookup is total: a missing property, a property of an unexpected
//! type, or a malformed property body all produce the field's default.

use crate::models::{Article, ArticleStatus, RichText};

use super::types::{Page, PropertyValue};

const TITLE: &str = "Title";
const SLUG: &str = "Slug";
const EXCERPT: &str = "Excerpt";
const PUBLISH_DATE: &str = "Publish Date";
const AUTHOR: &str = "Author";
const TOPIC: &str = "Topic";
const WHY_IT_MATTERS: &str = "Why It Matters";
const STATUS: &str = "Status";
const COVER_IMAGE: &str = "Cover Image";

/// Project a page into an article without content.
pub fn project_article(page: &Page) -> Article {
    Article {
        id: page.id.clone(),
        title: title(page, TITLE),
        slug: rich_text(page, SLUG),
        excerpt: rich_text(page, EXCERPT),
        publish_date: date(page, PUBLISH_DATE),
        last_edited_time: page.last_edited_time.clone(),
        author: people(page, AUTHOR),
        topics: multi_select(page, TOPIC),
        why_it_matters: rich_text(page, WHY_IT_MATTERS),
        status: status(page, STATUS),
        cover_image: cover_image(page),
        content: None,
        ..Article::default()
    }
}

fn title(page: &Page, name: &str) -> String {
    match page.property(name) {
        Some(PropertyValue::Title { title }) => RichText::join(&title),
        _ => String::new(),
    }
}

fn rich_text(page: &Page, name: &str) -> String {
    match page.property(name) {
        Some(PropertyValue::RichText { rich_text }) => RichText::join(&rich_text),
        _ => String::new(),
    }
}

fn date(page: &Page, name: &str) -> String {
    match page.property(name) {
        Some(PropertyValue::Date { date: Some(date) }) => date.start,
        _ => String::new(),
    }
}

fn people(page: &Page, name: &str) -> Vec<String> {
    match page.property(name) {
        Some(PropertyValue::People { people }) => people
            .into_iter()
            .map(|p| p.name.unwrap_or_else(|| "Unknown".to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

fn multi_select(page: &Page, name: &str) -> Vec<String> {
    match page.property(name) {
        Some(PropertyValue::MultiSelect { multi_select }) => {
            multi_select.into_iter().map(|o| o.name).collect()
        }
        _ => Vec::new(),
    }
}

fn status(page: &Page, name: &str) -> ArticleStatus {
    match page.property(name) {
        Some(PropertyValue::Status {
            status: Some(option),
        }) => ArticleStatus::from(option.name),
        _ => ArticleStatus::Unset,
    }
}

/// The first "Cover Image" file, else the page cover.
fn cover_image(page: &Page) -> Option<String> {
    let from_property = match page.property(COVER_IMAGE) {
        Some(PropertyValue::Files { files }) => {
            files.first().and_then(|f| f.url()).map(str::to_string)
        }
        _ => None,
    };

    from_property.or_else(|| page.cover().and_then(|c| c.url().map(str::to_string)))
}
