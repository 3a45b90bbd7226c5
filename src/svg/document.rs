/// Raw textual description of one or more 2D vector primitives.
///
/// Immutable once loaded; a new upload replaces the document wholesale.
/// The accessors below are textual scans used by the hollow heuristic.
/// They are substring checks by contract, not a structural XML parse;
/// downstream behavior depends on exactly these checks.
#[derive(Debug, Clone)]
pub struct VectorDocument {
    text: String,
    filename: String,
}

impl VectorDocument {
    /// Wraps raw vector markup and a display filename.
    #[must_use]
    pub fn new(text: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            filename: filename.into(),
        }
    }

    /// The raw markup.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The display filename the document was uploaded under.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// `true` if the markup contains an explicit close command anywhere.
    #[must_use]
    pub fn has_close_command(&self) -> bool {
        self.text.contains('Z') || self.text.contains('z')
    }

    /// Number of `<path` elements in the markup.
    #[must_use]
    pub fn path_count(&self) -> usize {
        self.text.matches("<path").count()
    }

    /// `true` if the markup contains a `<circle` element.
    #[must_use]
    pub fn has_circle(&self) -> bool {
        self.text.contains("<circle")
    }

    /// `true` if the markup contains an `<ellipse` element.
    #[must_use]
    pub fn has_ellipse(&self) -> bool {
        self.text.contains("<ellipse")
    }

    /// `true` if the markup contains a `<rect` element.
    #[must_use]
    pub fn has_rect(&self) -> bool {
        self.text.contains("<rect")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textual_scans() {
        let doc = VectorDocument::new(
            r#"<svg><path d="M0 0 L1 0 Z"/><circle cx="1" cy="1" r="2"/></svg>"#,
            "icon.svg",
        );
        assert!(doc.has_close_command());
        assert_eq!(doc.path_count(), 1);
        assert!(doc.has_circle());
        assert!(!doc.has_rect());
        assert_eq!(doc.filename(), "icon.svg");
    }
}
