//! Interactive session state
//!
//! Owned by the studio loop and threaded through each handler by value, so
//! nothing about the current view lives in process-wide globals.

use std::path::PathBuf;

use imagegen_core::{SortKey, StoredArtifact};

/// The most recent successful generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastGenerated {
    pub image_path: PathBuf,
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioState {
    pub page: usize,
    pub page_size: usize,
    pub sort: SortKey,
    pub last_generated: Option<LastGenerated>,
}

impl StudioState {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            sort: SortKey::default(),
            last_generated: None,
        }
    }

    pub fn next_page(mut self, total_pages: usize) -> Self {
        if self.page < total_pages {
            self.page += 1;
        }
        self
    }

    pub fn prev_page(mut self) -> Self {
        self.page = self.page.saturating_sub(1).max(1);
        self
    }

    pub fn go_to(mut self, page: usize, total_pages: usize) -> Self {
        self.page = page.clamp(1, total_pages.max(1));
        self
    }

    /// Changing the order starts over at the first page
    pub fn with_sort(mut self, sort: SortKey) -> Self {
        if self.sort != sort {
            self.sort = sort;
            self.page = 1;
        }
        self
    }

    /// A new image shows up first under the default order
    pub fn with_generated(mut self, stored: &StoredArtifact) -> Self {
        self.last_generated = Some(LastGenerated {
            image_path: stored.image_path.clone(),
            seed: stored.resolved_seed,
        });
        if self.sort == SortKey::Newest {
            self.page = 1;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging_stays_in_range() {
        let state = StudioState::new(9);
        let state = state.prev_page();
        assert_eq!(state.page, 1);

        let state = state.next_page(2).next_page(2);
        assert_eq!(state.page, 2);

        assert_eq!(state.clone().go_to(7, 2).page, 2);
        assert_eq!(state.go_to(0, 2).page, 1);
    }

    #[test]
    fn test_sort_change_resets_page() {
        let state = StudioState::new(9).next_page(3).next_page(3);
        assert_eq!(state.page, 3);
        assert_eq!(state.clone().with_sort(SortKey::Newest).page, 3);
        assert_eq!(state.with_sort(SortKey::Model).page, 1);
    }

    #[test]
    fn test_generation_is_remembered() {
        let stored = StoredArtifact {
            image_path: PathBuf::from("images/generated_image_20240101_000000_aaaaaaaa.webp"),
            metadata_path: PathBuf::from("images/generated_image_20240101_000000_aaaaaaaa.json"),
            resolved_seed: Some(9),
        };
        let state = StudioState::new(9).next_page(2).with_generated(&stored);
        assert_eq!(state.page, 1);
        assert_eq!(state.last_generated.unwrap().seed, Some(9));
    }
}
