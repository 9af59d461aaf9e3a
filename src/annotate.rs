//! Utterance span annotation.
//!
//! Turns an utterance text and its variable occurrences into an ordered
//! sequence of plain and annotated chunks.
//!
//! ## Algorithm
//!
//! 1. Sort occurrences by `start_index` (input order is irrelevant)
//! 2. Walk the text left to right:
//!    - emit a plain chunk for any non-empty gap before the occurrence
//!    - emit an annotated chunk for the occurrence, markers stripped
//! 3. Emit the trailing text if non-empty
//!
//! With no occurrences the whole text is returned as a single plain chunk,
//! even when it is empty. Offsets are counted in chars.

use std::sync::OnceLock;

use regex_lite::Regex;

use crate::types::{Chunk, VariableOccurrence};

/// Error type for annotation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnnotateError {
    /// Occurrence starts before the previous one ends.
    #[error("Variable occurrence at {start} overlaps previous occurrence ending at {previous_end}")]
    Overlap {
        /// Start of the offending occurrence.
        start: usize,
        /// End of the previous occurrence.
        previous_end: usize,
    },
    /// Occurrence extends past the end of the text.
    #[error("Variable occurrence {start}..{end} exceeds text length {len}")]
    OutOfBounds {
        /// Start of the offending occurrence.
        start: usize,
        /// End of the offending occurrence.
        end: usize,
        /// Text length in chars.
        len: usize,
    },
    /// The text at the occurrence offset is not the occurrence name.
    #[error("Variable occurrence at {start} expects '{expected}' but text has '{found}'")]
    Mismatch {
        /// Start of the offending occurrence.
        start: usize,
        /// Occurrence name.
        expected: String,
        /// Text found at the occurrence span.
        found: String,
    },
}

fn marker_regex() -> &'static Regex {
    static MARKERS: OnceLock<Regex> = OnceLock::new();
    MARKERS.get_or_init(|| {
        Regex::new(r"^[%<{\[$]+|[%>}\]]+$").expect("marker pattern is valid")
    })
}

/// Strip positional markers (`%name%`, `<name>`, `{name}`, `[name]`, `$name`).
pub fn strip_markers(name: &str) -> String {
    marker_regex().replace_all(name, "").into_owned()
}

/// Annotate an utterance.
pub fn annotate(text: &str, occurrences: &[VariableOccurrence]) -> Result<Vec<Chunk>, AnnotateError> {
    // Byte offset of every char boundary, including the end of the text.
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = boundaries.len() - 1;

    let mut sorted: Vec<&VariableOccurrence> = occurrences.iter().collect();
    sorted.sort_by_key(|occ| occ.start_index);

    let mut chunks = Vec::with_capacity(sorted.len() * 2 + 1);
    let mut cursor = 0;

    for occ in sorted {
        let start = occ.start_index;
        let end = occ.end_index();
        if end > len {
            return Err(AnnotateError::OutOfBounds { start, end, len });
        }
        if start < cursor {
            return Err(AnnotateError::Overlap {
                start,
                previous_end: cursor,
            });
        }
        let covered = &text[boundaries[start]..boundaries[end]];
        if covered != occ.name {
            return Err(AnnotateError::Mismatch {
                start,
                expected: occ.name.clone(),
                found: covered.to_string(),
            });
        }

        if start > cursor {
            chunks.push(Chunk::plain(&text[boundaries[cursor]..boundaries[start]]));
        }
        chunks.push(Chunk::annotated(strip_markers(&occ.name), &occ.entity_name));
        cursor = end;
    }

    if cursor < len || chunks.is_empty() {
        chunks.push(Chunk::plain(&text[boundaries[cursor]..]));
    }

    Ok(chunks)
}
