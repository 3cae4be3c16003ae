//! Remote file layout.
//!
//! ```text
//! {root}/{collection}/index.json
//! {root}/{collection}/page_{n}.json
//! ```

use serde::{Deserialize, Serialize};
use studysync_store::Collection;

/// Default remote root folder.
pub const DEFAULT_ROOT: &str = "studysync";

const INDEX_FILE: &str = "index.json";

/// Paths of the remote documents, relative to the server base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLayout {
    root: String,
}

impl Default for RemoteLayout {
    fn default() -> Self {
        Self::new(DEFAULT_ROOT)
    }
}

impl RemoteLayout {
    /// Creates a layout under `root`. Surrounding slashes are ignored and an
    /// empty root places collections directly under the base URL.
    pub fn new(root: impl AsRef<str>) -> Self {
        Self {
            root: root.as_ref().trim_matches('/').to_string(),
        }
    }

    /// Root folder, if any.
    #[must_use]
    pub fn root_dir(&self) -> Option<&str> {
        if self.root.is_empty() {
            None
        } else {
            Some(&self.root)
        }
    }

    /// Folder holding one collection.
    #[must_use]
    pub fn collection_dir(&self, collection: Collection) -> String {
        match self.root_dir() {
            Some(root) => format!("{root}/{}", collection.as_str()),
            None => collection.as_str().to_string(),
        }
    }

    /// Path of the collection's index.
    #[must_use]
    pub fn index_path(&self, collection: Collection) -> String {
        format!("{}/{INDEX_FILE}", self.collection_dir(collection))
    }

    /// Path of page `n`.
    #[must_use]
    pub fn page_path(&self, collection: Collection, page_number: u32) -> String {
        format!("{}/page_{page_number}.json", self.collection_dir(collection))
    }

    /// Folders a full sync must ensure, parents first.
    #[must_use]
    pub fn directories(&self) -> Vec<String> {
        let mut dirs: Vec<String> = self.root_dir().map(str::to_string).into_iter().collect();
        dirs.extend(Collection::ALL.iter().map(|c| self.collection_dir(*c)));
        dirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths() {
        let layout = RemoteLayout::default();
        assert_eq!(
            layout.index_path(Collection::History),
            "studysync/history/index.json"
        );
        assert_eq!(
            layout.page_path(Collection::Notebook, 3),
            "studysync/notebook/page_3.json"
        );
        assert_eq!(
            layout.directories(),
            vec!["studysync", "studysync/history", "studysync/notebook"]
        );
    }

    #[test]
    fn empty_root_uses_base_directly() {
        let layout = RemoteLayout::new("/");
        assert_eq!(layout.root_dir(), None);
        assert_eq!(layout.page_path(Collection::History, 0), "history/page_0.json");
        assert_eq!(layout.directories(), vec!["history", "notebook"]);
    }

    #[test]
    fn slashes_are_trimmed() {
        let layout = RemoteLayout::new("/apps/studysync/");
        assert_eq!(
            layout.index_path(Collection::Notebook),
            "apps/studysync/notebook/index.json"
        );
    }
}
