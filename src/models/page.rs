//! Page records and project path resolution
//!
//! A page is a JSON file inside a group directory. It names its text, image
//! and music files relative to the group's media folders, links to its
//! neighbours by page name, and may offer jump points into other groups.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Extension of page record files.
pub const PAGE_EXTENSION: &str = "json";

/// On-disk page record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Rich-text dialogue file, relative to the group's `text` folder
    #[serde(default)]
    pub text_path: Option<String>,
    /// Background image, relative to the group's `image` folder
    #[serde(default)]
    pub image_path: Option<String>,
    /// Background music, relative to the group's `music` folder
    #[serde(default)]
    pub music_path: Option<String>,
    /// Name of the previous page in the same group
    #[serde(default)]
    pub previous_page_path: Option<String>,
    /// Name of the next page in the same group
    #[serde(default)]
    pub next_page_path: Option<String>,
    #[serde(default)]
    pub jump_to_page_paths: Vec<String>,
    #[serde(default)]
    pub jump_points: Vec<JumpPoint>,
}

/// A branch offered on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpPoint {
    /// Label shown to the reader
    pub text: String,
    pub target_page: String,
    /// Group holding the target; the current group when absent
    #[serde(default)]
    pub target_group: Option<String>,
}

impl JumpPoint {
    pub fn new(text: impl Into<String>, target_page: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_page: target_page.into(),
            target_group: None,
        }
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.target_group = Some(group.into());
        self
    }
}

// == Page ==
/// A page record together with where it lives.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Absolute path of the page file; the page cache key
    pub path: PathBuf,
    /// Name of the group directory containing the page
    pub group: String,
    pub record: PageRecord,
}

impl Page {
    /// Builds a page located at `path`, deriving its group from the parent
    /// directory.
    pub fn new(path: impl Into<PathBuf>, record: PageRecord) -> Result<Self> {
        let path = path.into();
        let group = group_of(&path)?;
        Ok(Self {
            path,
            group,
            record,
        })
    }

    /// Reads and parses a page file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let record: PageRecord = serde_json::from_str(&content)?;
        Self::new(path, record)
    }

    /// Cache key of this page.
    pub fn key(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }

    pub fn text_path(&self, resolver: &dyn PathResolver) -> Option<PathBuf> {
        non_empty(&self.record.text_path).map(|rel| resolver.text_path(&self.group, rel))
    }

    pub fn image_path(&self, resolver: &dyn PathResolver) -> Option<PathBuf> {
        non_empty(&self.record.image_path).map(|rel| resolver.image_path(&self.group, rel))
    }

    pub fn audio_path(&self, resolver: &dyn PathResolver) -> Option<PathBuf> {
        non_empty(&self.record.music_path).map(|rel| resolver.audio_path(&self.group, rel))
    }

    pub fn next_page(&self, resolver: &dyn PathResolver) -> Option<PathBuf> {
        non_empty(&self.record.next_page_path).map(|name| resolver.page_path(&self.group, name))
    }

    pub fn previous_page(&self, resolver: &dyn PathResolver) -> Option<PathBuf> {
        non_empty(&self.record.previous_page_path)
            .map(|name| resolver.page_path(&self.group, name))
    }

    /// Resolved page files of every jump point with a target.
    pub fn jump_targets(&self, resolver: &dyn PathResolver) -> Vec<PathBuf> {
        self.record
            .jump_points
            .iter()
            .filter(|jump| !jump.target_page.is_empty())
            .map(|jump| {
                let group = jump
                    .target_group
                    .as_deref()
                    .filter(|g| !g.is_empty())
                    .unwrap_or(&self.group);
                resolver.page_path(group, &jump.target_page)
            })
            .collect()
    }
}

fn group_of(path: &Path) -> Result<String> {
    path.parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            CacheError::Decode(format!(
                "page file {} is not inside a group directory",
                path.display()
            ))
        })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

// == Path Resolver ==
/// Turns group-relative names into absolute paths and checks for files.
pub trait PathResolver: Send + Sync {
    fn page_path(&self, group: &str, page: &str) -> PathBuf;
    fn text_path(&self, group: &str, relative: &str) -> PathBuf;
    fn image_path(&self, group: &str, relative: &str) -> PathBuf;
    fn audio_path(&self, group: &str, relative: &str) -> PathBuf;

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}

/// Standard project layout:
///
/// ```text
/// <root>/<group>/<page>.json
/// <root>/<group>/text/<file>
/// <root>/<group>/image/<file>
/// <root>/<group>/music/<file>
/// ```
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Layout whose root is the grandparent of a page file.
    pub fn for_page(page_file: &Path) -> Option<Self> {
        page_file.parent()?.parent().map(Self::new)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn group_dir(&self, group: &str) -> PathBuf {
        self.root.join(group)
    }
}

impl PathResolver for ProjectLayout {
    fn page_path(&self, group: &str, page: &str) -> PathBuf {
        self.group_dir(group)
            .join(format!("{}.{}", page, PAGE_EXTENSION))
    }

    fn text_path(&self, group: &str, relative: &str) -> PathBuf {
        self.group_dir(group).join("text").join(relative)
    }

    fn image_path(&self, group: &str, relative: &str) -> PathBuf {
        self.group_dir(group).join("image").join(relative)
    }

    fn audio_path(&self, group: &str, relative: &str) -> PathBuf {
        self.group_dir(group).join("music").join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> ProjectLayout {
        ProjectLayout::new("/novel")
    }

    #[test]
    fn test_record_deserialize_partial() {
        let json = r#"{"text_path": "t1.rtf", "next_page_path": "page_2"}"#;
        let record: PageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.text_path.as_deref(), Some("t1.rtf"));
        assert_eq!(record.next_page_path.as_deref(), Some("page_2"));
        assert!(record.image_path.is_none());
        assert!(record.jump_points.is_empty());
    }

    #[test]
    fn test_record_deserialize_jump_points() {
        let json = r#"{
            "jump_points": [
                {"text": "Go left", "target_page": "left"},
                {"text": "Go right", "target_page": "right", "target_group": "forest"}
            ]
        }"#;
        let record: PageRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.jump_points.len(), 2);
        assert!(record.jump_points[0].target_group.is_none());
        assert_eq!(record.jump_points[1].target_group.as_deref(), Some("forest"));
    }

    #[test]
    fn test_page_group_from_parent() {
        let page = Page::new("/novel/chapter1/page_1.json", PageRecord::default()).unwrap();
        assert_eq!(page.group, "chapter1");
        assert_eq!(page.key(), "/novel/chapter1/page_1.json");
    }

    #[test]
    fn test_page_without_group_rejected() {
        assert!(Page::new("page.json", PageRecord::default()).is_err());
    }

    #[test]
    fn test_resource_paths() {
        let record = PageRecord {
            text_path: Some("t.rtf".into()),
            image_path: Some("bg.png".into()),
            music_path: Some(String::new()),
            ..PageRecord::default()
        };
        let page = Page::new("/novel/ch1/p.json", record).unwrap();
        let layout = layout();

        assert_eq!(
            page.text_path(&layout).unwrap(),
            PathBuf::from("/novel/ch1/text/t.rtf")
        );
        assert_eq!(
            page.image_path(&layout).unwrap(),
            PathBuf::from("/novel/ch1/image/bg.png")
        );
        // Empty paths count as unset
        assert!(page.audio_path(&layout).is_none());
    }

    #[test]
    fn test_neighbour_and_jump_targets() {
        let record = PageRecord {
            previous_page_path: Some("a".into()),
            next_page_path: Some("b".into()),
            jump_points: vec![
                JumpPoint::new("stay", "c"),
                JumpPoint::new("leave", "d").in_group("ch2"),
                JumpPoint::new("broken", ""),
            ],
            ..PageRecord::default()
        };
        let page = Page::new("/novel/ch1/p.json", record).unwrap();
        let layout = layout();

        assert_eq!(
            page.next_page(&layout).unwrap(),
            PathBuf::from("/novel/ch1/b.json")
        );
        assert_eq!(
            page.previous_page(&layout).unwrap(),
            PathBuf::from("/novel/ch1/a.json")
        );
        assert_eq!(
            page.jump_targets(&layout),
            vec![
                PathBuf::from("/novel/ch1/c.json"),
                PathBuf::from("/novel/ch2/d.json")
            ]
        );
    }

    #[test]
    fn test_layout_for_page() {
        let layout = ProjectLayout::for_page(Path::new("/novel/ch1/p.json")).unwrap();
        assert_eq!(layout.root(), Path::new("/novel"));
    }
}
