//! Note domain model.
//!
//! # Responsibility
//! - Define the block-structured note shape shared by storage and use-cases.
//! - Keep editing-flow helpers (blank pruning, savability) next to the data.
//!
//! # Invariants
//! - `Note.content` order is render order and must survive persistence.
//! - A persisted note (`id != UNSAVED_NOTE_ID`) only references owned images.

pub mod note;
