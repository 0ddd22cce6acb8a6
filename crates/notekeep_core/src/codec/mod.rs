//! Content codec between `ContentBlock` sequences and child rows.
//!
//! # Responsibility
//! - Map each block to one `(content_type, content, order)` row.
//! - Rebuild the block sequence from rows fetched in any order.
//!
//! # Invariants
//! - `decode(encode(blocks)) == blocks` for every sequence, including empty.
//! - `order` values within one note are unique; duplicates are corruption.

use crate::model::note::{BlockKind, ContentBlock};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Persisted form of one content block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRow {
    /// Discriminant tag, `TEXT` or `IMAGE`.
    pub content_type: String,
    /// Text body or image path.
    pub content: String,
    /// Position within the note.
    pub order: i64,
}

/// Persisted content could not be turned back into blocks.
///
/// Treated as data corruption; never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MalformedContentError {
    UnknownContentType { content_type: String, order: i64 },
    DuplicateOrder(i64),
}

impl Display for MalformedContentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownContentType {
                content_type,
                order,
            } => write!(
                f,
                "unknown content type `{content_type}` at content order {order}"
            ),
            Self::DuplicateOrder(order) => {
                write!(f, "duplicate content order {order}")
            }
        }
    }
}

impl Error for MalformedContentError {}

/// Encodes blocks into rows, using the sequence index as `order`.
pub fn encode(blocks: &[ContentBlock]) -> Vec<ContentRow> {
    blocks
        .iter()
        .enumerate()
        .map(|(index, block)| ContentRow {
            content_type: block.kind().as_db_str().to_string(),
            content: block.payload().to_string(),
            order: index as i64,
        })
        .collect()
}

/// Decodes rows into blocks sorted by `order`.
///
/// # Errors
/// - `UnknownContentType` when a row carries an unrecognized tag.
/// - `DuplicateOrder` when two rows claim the same position.
pub fn decode(mut rows: Vec<ContentRow>) -> Result<Vec<ContentBlock>, MalformedContentError> {
    rows.sort_by_key(|row| row.order);

    let mut blocks = Vec::with_capacity(rows.len());
    let mut previous_order = None;
    for row in rows {
        if previous_order == Some(row.order) {
            return Err(MalformedContentError::DuplicateOrder(row.order));
        }
        previous_order = Some(row.order);
        let kind = BlockKind::from_db_str(&row.content_type).ok_or_else(|| {
            MalformedContentError::UnknownContentType {
                content_type: row.content_type.clone(),
                order: row.order,
            }
        })?;
        blocks.push(match kind {
            BlockKind::Text => ContentBlock::Text { body: row.content },
            BlockKind::Image => ContentBlock::Image { path: row.content },
        });
    }

    Ok(blocks)
}
