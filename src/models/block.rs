use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Formatting flags on a rich-text span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RichText {
    pub plain_text: String,
    pub annotations: Annotations,
    pub href: Option<String>,
}

impl RichText {
    /// Concatenated plain text of a span list.
    pub fn join(spans: &[RichText]) -> String {
        spans.iter().map(|s| s.plain_text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    BulletedListItem,
    NumberedListItem,
    Quote,
    Divider,
    Image,
    Unknown(String),
}

impl BlockKind {
    fn from_tag(tag: &str) -> Self {
        match tag {
            "paragraph" => BlockKind::Paragraph,
            "heading_1" => BlockKind::Heading1,
            "heading_2" => BlockKind::Heading2,
            "heading_3" => BlockKind::Heading3,
            "bulleted_list_item" => BlockKind::BulletedListItem,
            "numbered_list_item" => BlockKind::NumberedListItem,
            "quote" => BlockKind::Quote,
            "divider" => BlockKind::Divider,
            "image" => BlockKind::Image,
            other => BlockKind::Unknown(other.to_string()),
        }
    }
}

/// One unit of page content.
///
/// The block keeps the remote JSON tree as-is so nothing is lost when it is
/// stored and served back, including block types this crate does not know.
/// Typed accessors read from that tree on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Block(Value);

impl Block {
    pub fn from_value(value: Value) -> Self {
        Block(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    fn tag(&self) -> &str {
        self.0.get("type").and_then(Value::as_str).unwrap_or("")
    }

    pub fn kind(&self) -> BlockKind {
        BlockKind::from_tag(self.tag())
    }

    /// Spans under `<type>.rich_text`; empty for blocks that carry none.
    pub fn rich_text(&self) -> Vec<RichText> {
        self.0
            .get(self.tag())
            .and_then(|body| body.get("rich_text"))
            .and_then(|spans| serde_json::from_value(spans.clone()).ok())
            .unwrap_or_default()
    }

    pub fn plain_text(&self) -> String {
        RichText::join(&self.rich_text())
    }

    /// External or hosted URL of an image block.
    pub fn image_url(&self) -> Option<&str> {
        if self.kind() != BlockKind::Image {
            return None;
        }
        let image = self.0.get("image")?;
        image
            .get("external")
            .or_else(|| image.get("file"))
            .and_then(|f| f.get("url"))
            .and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn paragraph_exposes_spans_and_annotations() {
        let block = Block::from_value(json!({
            "id": "b1",
            "type": "paragraph",
            "paragraph": {
                "rich_text": [
                    {"plain_text": "Tariffs ", "annotations": {"bold": true}},
                    {"plain_text": "rise", "href": "https://example.com"}
                ]
            }
        }));

        assert_eq!(block.kind(), BlockKind::Paragraph);
        assert_eq!(block.id(), Some("b1"));
        let spans = block.rich_text();
        assert!(spans[0].annotations.bold);
        assert!(!spans[0].annotations.italic);
        assert_eq!(spans[1].href.as_deref(), Some("https://example.com"));
        assert_eq!(block.plain_text(), "Tariffs rise");
    }

    #[test]
    fn unknown_blocks_survive_serialization() {
        let raw = json!({"id": "b2", "type": "synced_block", "synced_block": {"x": 1}});
        let block: Block = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(block.kind(), BlockKind::Unknown("synced_block".to_string()));
        assert!(block.rich_text().is_empty());
        assert_eq!(serde_json::to_value(&block).unwrap(), raw);
    }

    #[test]
    fn image_url_prefers_external() {
        let block = Block::from_value(json!({
            "type": "image",
            "image": {"type": "external", "external": {"url": "https://img/1.png"}}
        }));
        assert_eq!(block.image_url(), Some("https://img/1.png"));

        let divider = Block::from_value(json!({"type": "divider", "divider": {}}));
        assert_eq!(divider.kind(), BlockKind::Divider);
        assert_eq!(divider.image_url(), None);
    }
}
