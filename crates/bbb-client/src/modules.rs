//! Presentations uploaded with `create`.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use bbb_core::{ResponseMap, Value};
use bbb_protocol::XmlError;
use bbb_protocol::xml;

/// Documents to preload into a new meeting.
///
/// Documents are written as URLs first, then base64 documents, then local
/// files, each group in the order it was added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresentationModules {
    urls: Vec<String>,
    embedded: Vec<(String, String)>,
    files: Vec<(String, String)>,
}

impl PresentationModules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a document the server downloads itself.
    pub fn add_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.urls.push(url.into());
        self
    }

    /// Adds an already base64-encoded document.
    pub fn add_base64(&mut self, name: impl Into<String>, data: impl Into<String>) -> &mut Self {
        self.embedded.push((name.into(), data.into()));
        self
    }

    /// Reads a local file and embeds it, named after the file.
    ///
    /// The file is read now; it is written after every URL and base64
    /// document.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be read.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> std::io::Result<&mut Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.files.push((name, STANDARD.encode(bytes)));
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty() && self.embedded.is_empty() && self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.urls.len() + self.embedded.len() + self.files.len()
    }

    /// Serializes the documents as the `create` request body.
    ///
    /// Returns an empty string when there is nothing to upload.
    pub fn to_xml(&self) -> Result<String, XmlError> {
        if self.is_empty() {
            return Ok(String::new());
        }

        let by_url = self.urls.iter().map(|url| {
            let doc: ResponseMap = [("url", url.as_str())].into_iter().collect();
            Value::Map(doc)
        });
        let embedded = self.embedded.iter().chain(&self.files).map(|(name, data)| {
            let doc: ResponseMap = [("name", name.as_str()), (xml::CONTENT_KEY, data.as_str())]
                .into_iter()
                .collect();
            Value::Map(doc)
        });

        let mut module = ResponseMap::new();
        module.insert("name", "presentation");
        module.insert("document", by_url.chain(embedded).collect::<Vec<_>>());

        let mut modules = ResponseMap::new();
        modules.insert("module", module);
        xml::encode("modules", &modules)
    }
}
