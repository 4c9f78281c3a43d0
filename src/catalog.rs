//! Registry of supported output formats

use crate::types::FormatDescriptor;

/// Read-only, insertion-ordered registry of supported output formats
///
/// `list()` order is the display/selection order. The catalog never changes
/// after construction; no conversion logic lives here.
#[derive(Clone, Debug)]
pub struct FormatCatalog {
    formats: Vec<FormatDescriptor>,
}

impl FormatCatalog {
    /// The built-in spreadsheet output formats
    pub fn builtin() -> Self {
        let formats = [
            (
                "csv",
                "CSV",
                ".csv",
                "Comma-Separated Values, ideal for data interchange",
            ),
            (
                "pdf",
                "PDF",
                ".pdf",
                "Portable Document Format, maintains formatting & layout",
            ),
            (
                "json",
                "JSON",
                ".json",
                "JavaScript Object Notation, for API integration",
            ),
            (
                "xml",
                "XML",
                ".xml",
                "Extensible Markup Language, structured data format",
            ),
            (
                "html",
                "HTML",
                ".html",
                "Web page format, viewable in any browser",
            ),
            (
                "txt",
                "Text",
                ".txt",
                "Plain text format, universally compatible",
            ),
        ]
        .into_iter()
        .map(|(id, name, extension, description)| FormatDescriptor {
            id: id.to_string(),
            name: name.to_string(),
            extension: extension.to_string(),
            description: description.to_string(),
        })
        .collect();
        Self { formats }
    }

    /// Build a catalog from a custom format list, preserving order
    pub fn with_formats(formats: Vec<FormatDescriptor>) -> Self {
        Self { formats }
    }

    /// All formats in insertion order
    pub fn list(&self) -> &[FormatDescriptor] {
        &self.formats
    }

    /// Look up a format by its identifier
    pub fn find(&self, id: &str) -> Option<&FormatDescriptor> {
        self.formats.iter().find(|f| f.id == id)
    }
}

impl Default for FormatCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
