//! The fixed set of filters accepted by template listings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::cache::FilterSet;
use crate::core::{Template, TemplateId};

/// Every key a listing can be filtered on.
///
/// The set is closed: callers cannot pass arbitrary keys, so the cache key
/// space for list queries is fully determined by the values below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterKey {
    BlockType,
    ControlLibrary,
    Ids,
    Segment,
}

impl FilterKey {
    /// Name used in canonical cache keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BlockType => "block_type",
            Self::ControlLibrary => "control_library",
            Self::Ids => "ids",
            Self::Segment => "segment",
        }
    }
}

/// Filter for template listings. Every field is optional; empty strings and
/// empty id lists count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateFilter {
    pub segment: Option<String>,
    pub block_type: Option<String>,
    pub control_library: Option<String>,
    pub ids: Option<Vec<TemplateId>>,
}

impl TemplateFilter {
    /// Filter matching every template.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = Some(segment.into());
        self
    }

    #[must_use]
    pub fn block_type(mut self, block_type: impl Into<String>) -> Self {
        self.block_type = Some(block_type.into());
        self
    }

    #[must_use]
    pub fn control_library(mut self, library: impl Into<String>) -> Self {
        self.control_library = Some(library.into());
        self
    }

    #[must_use]
    pub fn ids(mut self, ids: impl IntoIterator<Item = TemplateId>) -> Self {
        self.ids = Some(ids.into_iter().collect());
        self
    }

    /// True when no field restricts the listing.
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.filter_pairs().is_empty()
    }

    /// Whether `template` passes every present filter.
    #[must_use]
    pub fn matches(&self, template: &Template) -> bool {
        if let Some(segment) = present(self.segment.as_deref()) {
            if template.segment != segment {
                return false;
            }
        }
        if let Some(block_type) = present(self.block_type.as_deref()) {
            if template.block_type != block_type {
                return false;
            }
        }
        if let Some(library) = present(self.control_library.as_deref()) {
            if template.control_library.as_deref() != Some(library) {
                return false;
            }
        }
        match self.id_set() {
            Some(ids) => ids.contains(&template.id),
            None => true,
        }
    }

    fn id_set(&self) -> Option<BTreeSet<TemplateId>> {
        self.ids.as_ref().filter(|ids| !ids.is_empty()).map(|ids| ids.iter().copied().collect())
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

impl FilterSet for TemplateFilter {
    fn filter_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(block_type) = present(self.block_type.as_deref()) {
            pairs.push((FilterKey::BlockType.as_str(), block_type.to_string()));
        }
        if let Some(library) = present(self.control_library.as_deref()) {
            pairs.push((FilterKey::ControlLibrary.as_str(), library.to_string()));
        }
        if let Some(ids) = self.id_set() {
            let joined = ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(",");
            pairs.push((FilterKey::Ids.as_str(), joined));
        }
        if let Some(segment) = present(self.segment.as_deref()) {
            pairs.push((FilterKey::Segment.as_str(), segment.to_string()));
        }
        pairs
    }
}
