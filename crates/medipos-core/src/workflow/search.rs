//! Medicine search overlay: filtering and highlight movement.

use crate::types::CatalogItem;

/// Items the overlay lists for `query`: in stock, name or generic name
/// containing the query (case-insensitive). A blank query lists nothing.
pub fn filter_catalog(catalog: &[CatalogItem], query: &str) -> Vec<CatalogItem> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    catalog
        .iter()
        .filter(|item| item.is_in_stock() && item.matches(&needle))
        .cloned()
        .collect()
}

/// The open search overlay.
///
/// The query text itself belongs to the search field in the session; the
/// overlay holds the filtered list computed from it and the highlight.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchOverlay {
    results: Vec<CatalogItem>,
    highlight: Option<usize>,
}

impl SearchOverlay {
    /// Opened from the search hotkey: empty query, nothing highlighted.
    pub fn fresh() -> Self {
        SearchOverlay::default()
    }

    /// Opened with an existing query (focus or typing): first row highlighted.
    pub fn with_query(catalog: &[CatalogItem], query: &str) -> Self {
        let mut overlay = SearchOverlay::default();
        overlay.refilter(catalog, query);
        overlay
    }

    /// Re-filters after a query change and resets the highlight to 0.
    pub fn refilter(&mut self, catalog: &[CatalogItem], query: &str) {
        self.results = filter_catalog(catalog, query);
        self.highlight = Some(0);
    }

    pub fn results(&self) -> &[CatalogItem] {
        &self.results
    }

    pub fn highlight(&self) -> Option<usize> {
        self.highlight
    }

    /// Wraps to the top after the last row. No-op on an empty list.
    pub fn move_down(&mut self) {
        let len = self.results.len();
        if len == 0 {
            return;
        }
        self.highlight = Some(match self.highlight {
            Some(idx) if idx + 1 < len => idx + 1,
            _ => 0,
        });
    }

    /// Wraps to the bottom before the first row. No-op on an empty list.
    pub fn move_up(&mut self) {
        let len = self.results.len();
        if len == 0 {
            return;
        }
        self.highlight = Some(match self.highlight {
            Some(idx) if idx > 0 && idx < len => idx - 1,
            _ => len - 1,
        });
    }

    /// The row Enter would pick: the highlight, or the first row when
    /// nothing is highlighted.
    pub fn selection(&self) -> Option<&CatalogItem> {
        self.results.get(self.highlight.unwrap_or(0))
    }

    pub fn get(&self, index: usize) -> Option<&CatalogItem> {
        self.results.get(index)
    }
}
