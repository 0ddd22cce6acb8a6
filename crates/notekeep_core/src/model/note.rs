//! Note and content-block model.
//!
//! # Responsibility
//! - Define the closed two-variant block union and the note record.
//! - Provide pure helpers used by the editing and listing flows.
//!
//! # Invariants
//! - `ContentBlock` is matched exhaustively everywhere; adding a block kind
//!   must touch `BlockKind` and the codec, nothing else.
//! - `id == UNSAVED_NOTE_ID` marks a draft that storage has never seen.

use serde::{Deserialize, Serialize};

/// Storage-assigned note identity.
pub type NoteId = i64;

/// Identity carried by drafts before the first save.
pub const UNSAVED_NOTE_ID: NoteId = 0;

/// One unit of note content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text span. Blank only while the editor is open.
    Text { body: String },
    /// Image reference. External URI before save, owned path after.
    Image { path: String },
}

/// Payload-free discriminant of [`ContentBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Text,
    Image,
}

impl BlockKind {
    /// Stored discriminant tag.
    pub fn as_db_str(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Image => "IMAGE",
        }
    }

    /// Parses a stored discriminant tag. Tags are case-sensitive.
    pub fn from_db_str(value: &str) -> Option<Self> {
        match value {
            "TEXT" => Some(Self::Text),
            "IMAGE" => Some(Self::Image),
            _ => None,
        }
    }
}

impl ContentBlock {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }

    pub fn image(path: impl Into<String>) -> Self {
        Self::Image { path: path.into() }
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Text { .. } => BlockKind::Text,
            Self::Image { .. } => BlockKind::Image,
        }
    }

    /// Returns the string payload: text body or image path.
    pub fn payload(&self) -> &str {
        match self {
            Self::Text { body } => body,
            Self::Image { path } => path,
        }
    }

    /// Returns `true` for text blocks containing only whitespace.
    pub fn is_blank_text(&self) -> bool {
        match self {
            Self::Text { body } => body.trim().is_empty(),
            Self::Image { .. } => false,
        }
    }
}

/// Canonical note record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// `UNSAVED_NOTE_ID` until the first save.
    pub id: NoteId,
    pub title: String,
    /// Ordered blocks; order is render order.
    pub content: Vec<ContentBlock>,
    /// Unix epoch milliseconds, stamped by the caller on write.
    pub updated_at: i64,
    pub is_pinned: bool,
}

impl Note {
    /// Creates an unsaved draft.
    pub fn draft(title: impl Into<String>, content: Vec<ContentBlock>, updated_at: i64) -> Self {
        Self {
            id: UNSAVED_NOTE_ID,
            title: title.into(),
            content,
            updated_at,
            is_pinned: false,
        }
    }

    pub fn is_saved(&self) -> bool {
        self.id != UNSAVED_NOTE_ID
    }

    /// Image paths in content order.
    pub fn image_paths(&self) -> Vec<&str> {
        image_paths(&self.content)
    }

    /// Returns a copy without blank text blocks.
    pub fn without_blank_text(&self) -> Self {
        Self {
            content: self
                .content
                .iter()
                .filter(|block| !block.is_blank_text())
                .cloned()
                .collect(),
            ..self.clone()
        }
    }

    /// Whether the editor may save this note.
    ///
    /// Requires a non-blank title and at least one image or non-blank text.
    pub fn is_savable(&self) -> bool {
        !self.title.trim().is_empty() && self.content.iter().any(|block| !block.is_blank_text())
    }

    /// Returns a copy that ends in a text block, appending an empty one when needed.
    pub fn with_trailing_text(&self) -> Self {
        let mut note = self.clone();
        if !matches!(note.content.last(), Some(ContentBlock::Text { .. })) {
            note.content.push(ContentBlock::text(""));
        }
        note
    }
}

/// Image paths of a block sequence, in order.
pub fn image_paths(blocks: &[ContentBlock]) -> Vec<&str> {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Image { path } => Some(path.as_str()),
            ContentBlock::Text { .. } => None,
        })
        .collect()
}

/// Notes grouped for list display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PinnedSplit {
    pub pinned: Vec<Note>,
    pub others: Vec<Note>,
}

/// Splits notes into pinned and other groups, keeping relative order.
pub fn split_pinned(notes: Vec<Note>) -> PinnedSplit {
    let (pinned, others) = notes.into_iter().partition(|note| note.is_pinned);
    PinnedSplit { pinned, others }
}

#[cfg(test)]
mod tests {
    use super::{split_pinned, BlockKind, ContentBlock, Note};

    fn note(title: &str, content: Vec<ContentBlock>) -> Note {
        Note::draft(title, content, 1_000)
    }

    #[test]
    fn block_kind_tags_are_stable() {
        assert_eq!(BlockKind::Text.as_db_str(), "TEXT");
        assert_eq!(BlockKind::from_db_str("IMAGE"), Some(BlockKind::Image));
        assert_eq!(BlockKind::from_db_str("image"), None);
    }

    #[test]
    fn without_blank_text_keeps_images_and_order() {
        let draft = note(
            "t",
            vec![
                ContentBlock::text("  "),
                ContentBlock::image("/a.png"),
                ContentBlock::text("hello"),
                ContentBlock::text(""),
            ],
        );
        let pruned = draft.without_blank_text();
        assert_eq!(
            pruned.content,
            vec![ContentBlock::image("/a.png"), ContentBlock::text("hello")]
        );
    }

    #[test]
    fn is_savable_requires_title_and_real_content() {
        assert!(!note(" ", vec![ContentBlock::text("x")]).is_savable());
        assert!(!note("t", vec![]).is_savable());
        assert!(!note("t", vec![ContentBlock::text("\n")]).is_savable());
        assert!(note("t", vec![ContentBlock::image("/a.png")]).is_savable());
    }

    #[test]
    fn with_trailing_text_appends_only_after_image_or_empty() {
        let after_image = note("t", vec![ContentBlock::image("/a.png")]).with_trailing_text();
        assert_eq!(after_image.content.last(), Some(&ContentBlock::text("")));

        let after_text = note("t", vec![ContentBlock::text("x")]).with_trailing_text();
        assert_eq!(after_text.content.len(), 1);

        let empty = note("t", vec![]).with_trailing_text();
        assert_eq!(empty.content, vec![ContentBlock::text("")]);
    }

    #[test]
    fn split_pinned_preserves_relative_order() {
        let mut first = note("first", vec![]);
        first.is_pinned = true;
        let second = note("second", vec![]);
        let mut third = note("third", vec![]);
        third.is_pinned = true;

        let split = split_pinned(vec![first, second, third]);
        let pinned: Vec<_> = split.pinned.iter().map(|n| n.title.as_str()).collect();
        let others: Vec<_> = split.others.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(pinned, vec!["first", "third"]);
        assert_eq!(others, vec!["second"]);
    }

    #[test]
    fn content_block_serializes_as_tagged_union() {
        let json = serde_json::to_value(ContentBlock::image("/a.png")).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["path"], "/a.png");
    }
}
