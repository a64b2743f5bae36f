//! Tag-keyed registry of GCM datasets.
//!
//! The collection owns every stored dataset. Iteration follows insertion
//! order; replacing an existing tag keeps its original position. There is no
//! internal locking: a caller sharing one collection between threads has to
//! synchronise access itself.

use indexmap::IndexMap;

use crate::dataset::{AttributeValue, GcmDataset};
use crate::error::{GcmError, Result};
use crate::names;

/// Result of [`GcmDatasetCollection::select_all`]
#[derive(Debug, Clone, Copy)]
pub enum Selection<'a> {
    /// Exactly one dataset was selected
    One(&'a GcmDataset),
    /// The whole collection
    All(&'a GcmDatasetCollection),
}

impl<'a> Selection<'a> {
    /// Number of datasets covered by this selection
    pub fn len(&self) -> usize {
        match self {
            Selection::One(_) => 1,
            Selection::All(collection) => collection.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Mapping from tag to dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GcmDatasetCollection {
    models: IndexMap<String, GcmDataset>,
}

/// Check that a tag can key the collection (and name a file on disk).
pub fn validate_tag(tag: &str) -> Result<()> {
    let message = if tag.is_empty() {
        "tag cannot be empty"
    } else if tag.trim() != tag {
        "tag cannot start or end with whitespace"
    } else if tag.contains(|c| c == '/' || c == '\\') {
        "tag cannot contain path separators"
    } else {
        return Ok(());
    };
    Err(GcmError::InvalidTag {
        tag: tag.to_string(),
        message: message.to_string(),
    })
}

impl GcmDatasetCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `ds` under `tag`, replacing any dataset already stored there.
    /// The dataset's `tag` attribute is set to `tag`.
    pub fn insert(&mut self, tag: &str, mut ds: GcmDataset) -> Result<()> {
        validate_tag(tag)?;
        ds.set_attribute(names::TAG, AttributeValue::Text(tag.to_string()));
        self.models.insert(tag.to_string(), ds);
        Ok(())
    }

    /// Select one dataset.
    ///
    /// With a tag, returns that dataset. Without one, returns the only
    /// stored dataset and fails if there are zero or several.
    pub fn select(&self, tag: Option<&str>) -> Result<&GcmDataset> {
        match tag {
            Some(tag) => self.models.get(tag).ok_or_else(|| GcmError::NotFound {
                tag: tag.to_string(),
            }),
            None if self.models.len() == 1 => self
                .models
                .values()
                .next()
                .ok_or(GcmError::AmbiguousSelection { count: 1 }),
            None => Err(GcmError::AmbiguousSelection {
                count: self.models.len(),
            }),
        }
    }

    /// Mutable counterpart of [`select`](Self::select)
    pub fn select_mut(&mut self, tag: Option<&str>) -> Result<&mut GcmDataset> {
        let count = self.models.len();
        match tag {
            Some(tag) => self.models.get_mut(tag).ok_or_else(|| GcmError::NotFound {
                tag: tag.to_string(),
            }),
            None if count == 1 => self
                .models
                .values_mut()
                .next()
                .ok_or(GcmError::AmbiguousSelection { count }),
            None => Err(GcmError::AmbiguousSelection { count }),
        }
    }

    /// Select one dataset or the whole collection.
    ///
    /// Without a tag, several stored datasets yield the whole collection
    /// instead of an error; `always_collection` returns the collection even
    /// when it holds a single dataset (or none).
    pub fn select_all(
        &self,
        tag: Option<&str>,
        always_collection: bool,
    ) -> Result<Selection<'_>> {
        match tag {
            Some(_) => self.select(tag).map(Selection::One),
            None if always_collection => Ok(Selection::All(self)),
            None if self.models.len() == 1 => self.select(None).map(Selection::One),
            None if self.models.is_empty() => Err(GcmError::AmbiguousSelection { count: 0 }),
            None => Ok(Selection::All(self)),
        }
    }

    /// Dataset for `tag`, if stored
    pub fn get(&self, tag: &str) -> Option<&GcmDataset> {
        self.models.get(tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.models.contains_key(tag)
    }

    /// Tags in insertion order
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(|k| k.as_str())
    }

    /// Fresh iterator over `(tag, dataset)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &GcmDataset)> {
        self.models.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

impl<'a> IntoIterator for &'a GcmDatasetCollection {
    type Item = (&'a String, &'a GcmDataset);
    type IntoIter = indexmap::map::Iter<'a, String, GcmDataset>;

    fn into_iter(self) -> Self::IntoIter {
        self.models.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(marker: f64) -> GcmDataset {
        let mut ds = GcmDataset::new();
        ds.set_attribute("marker", marker);
        ds
    }

    #[test]
    fn test_insert_stamps_tag() {
        let mut collection = GcmDatasetCollection::new();
        collection.insert("run1", dataset(1.0)).unwrap();
        let ds = collection.select(Some("run1")).unwrap();
        assert_eq!(ds.tag(), Some("run1"));
        assert_eq!(ds.number_attribute("marker"), Some(1.0));
    }

    #[test]
    fn test_invalid_tags_leave_collection_untouched() {
        let mut collection = GcmDatasetCollection::new();
        for tag in ["", " run", "a/b", "a\\b"] {
            assert!(matches!(
                collection.insert(tag, dataset(0.0)),
                Err(GcmError::InvalidTag { .. })
            ));
        }
        assert!(collection.is_empty());
    }

    #[test]
    fn test_select_without_tag() {
        let mut collection = GcmDatasetCollection::new();
        assert!(matches!(
            collection.select(None),
            Err(GcmError::AmbiguousSelection { count: 0 })
        ));

        collection.insert("a", dataset(1.0)).unwrap();
        assert_eq!(collection.select(None).unwrap().tag(), Some("a"));

        collection.insert("b", dataset(2.0)).unwrap();
        assert!(matches!(
            collection.select(None),
            Err(GcmError::AmbiguousSelection { count: 2 })
        ));
        assert!(matches!(
            collection.select(Some("c")),
            Err(GcmError::NotFound { .. })
        ));
    }

    #[test]
    fn test_select_all() {
        let mut collection = GcmDatasetCollection::new();
        assert!(collection.select_all(None, false).is_err());
        assert!(matches!(
            collection.select_all(None, true),
            Ok(Selection::All(c)) if c.is_empty()
        ));

        collection.insert("a", dataset(1.0)).unwrap();
        assert!(matches!(collection.select_all(None, false), Ok(Selection::One(_))));
        assert!(matches!(collection.select_all(None, true), Ok(Selection::All(_))));

        collection.insert("b", dataset(2.0)).unwrap();
        let selection = collection.select_all(None, false).unwrap();
        assert!(matches!(selection, Selection::All(_)));
        assert_eq!(selection.len(), 2);
        assert!(matches!(collection.select_all(Some("b"), true), Ok(Selection::One(_))));
    }

    #[test]
    fn test_replace_keeps_order() {
        let mut collection = GcmDatasetCollection::new();
        collection.insert("first", dataset(1.0)).unwrap();
        collection.insert("second", dataset(2.0)).unwrap();
        collection.insert("first", dataset(3.0)).unwrap();

        assert_eq!(collection.len(), 2);
        let tags: Vec<&str> = collection.tags().collect();
        assert_eq!(tags, vec!["first", "second"]);
        assert_eq!(
            collection.get("first").and_then(|d| d.number_attribute("marker")),
            Some(3.0)
        );

        // iteration is restartable
        assert_eq!(collection.iter().count(), 2);
        assert_eq!(collection.iter().count(), 2);
    }
}
