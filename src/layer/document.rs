use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::{
    engine::pipeline::PageRequest,
    foundation::error::{TrellisError, TrellisResult},
    layer::model::{ComponentLibrary, Layer},
};

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// Stored page: its layer tree plus the components it instantiates.
pub struct PageDocument {
    /// Top-level layers.
    pub layers: Vec<Layer>,
    /// Component definitions.
    #[serde(default, skip_serializing_if = "ComponentLibrary::is_empty")]
    pub components: ComponentLibrary,
}

impl PageDocument {
    /// Parse a page document from a JSON reader and validate it.
    pub fn from_reader<R: std::io::Read>(r: R) -> TrellisResult<Self> {
        let doc: Self = serde_json::from_reader(r)
            .map_err(|e| TrellisError::serde(format!("parse page JSON: {e}")))?;
        doc.validate()?;
        Ok(doc)
    }

    /// Parse a page document from a JSON file on disk and validate it.
    pub fn from_path(path: impl AsRef<Path>) -> TrellisResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            TrellisError::validation(format!("open page JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    /// Check structural rules a stored page must follow.
    ///
    /// Layer ids are non-empty and unique within the page and within each component body, and
    /// stored trees never contain resolver output (fragments or clones).
    pub fn validate(&self) -> TrellisResult<()> {
        validate_tree(&self.layers, "page")?;
        for c in self.components.iter() {
            if c.id.trim().is_empty() {
                return Err(TrellisError::validation("component id must be non-empty"));
            }
            validate_tree(&c.layers, &format!("component '{}'", c.id))?;
        }
        Ok(())
    }

    /// Resolution request over this page.
    pub fn into_request(self) -> PageRequest {
        PageRequest::new(self.layers).with_components(self.components)
    }
}

fn validate_tree(layers: &[Layer], scope: &str) -> TrellisResult<()> {
    let mut seen = BTreeSet::new();
    let mut err = None;
    for root in layers {
        root.visit(&mut |l| {
            if err.is_some() {
                return;
            }
            if l.id.trim().is_empty() {
                err = Some(TrellisError::validation(format!(
                    "{scope}: layer id must be non-empty"
                )));
            } else if l.is_fragment() || l.collection_item.is_some() {
                err = Some(TrellisError::contract(format!(
                    "{scope}: stored layer '{}' is resolver output",
                    l.id
                )));
            } else if !seen.insert(l.id.as_str()) {
                err = Some(TrellisError::validation(format!(
                    "{scope}: duplicate layer id '{}'",
                    l.id
                )));
            }
        });
    }
    err.map_or(Ok(()), Err)
}

#[cfg(test)]
#[path = "../../tests/unit/layer/document.rs"]
mod tests;
