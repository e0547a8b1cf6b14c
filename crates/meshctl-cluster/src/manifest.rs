use serde::Deserialize;

use crate::error::ClusterError;
use crate::object::{ClusterObject, ObjectKey};

/// An ordered set of cluster objects, as rendered for one apply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Manifest {
    objects: Vec<ClusterObject>,
}

impl Manifest {
    pub fn new(objects: Vec<ClusterObject>) -> Self {
        Self { objects }
    }

    /// Parse multi-document YAML. Empty documents are skipped; a document
    /// without `kind` or `metadata.name` is an error.
    pub fn parse_yaml(text: &str) -> Result<Self, ClusterError> {
        let mut objects = Vec::new();
        for document in serde_yaml::Deserializer::from_str(text) {
            let value = serde_yaml::Value::deserialize(document)?;
            if value.is_null() {
                continue;
            }
            let object: ClusterObject = serde_yaml::from_value(value)?;
            object.validate().map_err(ClusterError::InvalidObject)?;
            objects.push(object);
        }
        Ok(Self { objects })
    }

    /// Emit multi-document YAML, documents separated by `---`.
    pub fn to_yaml(&self) -> Result<String, ClusterError> {
        let documents = self
            .objects
            .iter()
            .map(serde_yaml::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(documents.join("---\n"))
    }

    pub fn objects(&self) -> &[ClusterObject] {
        &self.objects
    }

    pub fn keys(&self) -> Vec<ObjectKey> {
        self.objects.iter().map(ClusterObject::key).collect()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Distinct kinds in first-seen order.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = Vec::new();
        for object in &self.objects {
            if !kinds.contains(&object.kind.as_str()) {
                kinds.push(&object.kind);
            }
        }
        kinds
    }
}
