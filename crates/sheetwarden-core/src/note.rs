//! Cell notes
//!
//! A note is the plain annotation Excel shows in a hover box (stored as a
//! legacy comment in XLSX). sheetwarden uses them to record why an
//! assumption has the value it has.

/// A note attached to a cell
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellNote {
    /// Author shown in the note header
    pub author: String,
    /// Note text
    pub text: String,
}

impl CellNote {
    /// Create a new note with the given author and text
    ///
    /// ```rust
    /// use sheetwarden_core::CellNote;
    ///
    /// let note = CellNote::new("sheetwarden", "Long-run growth rate");
    /// assert_eq!(note.author, "sheetwarden");
    /// assert!(note.has_author());
    /// ```
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
        }
    }

    /// Create a note with just text (empty author)
    pub fn text_only(text: impl Into<String>) -> Self {
        Self::new(String::new(), text)
    }

    /// Check if this note has an author
    pub fn has_author(&self) -> bool {
        !self.author.is_empty()
    }
}
