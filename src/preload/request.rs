//! Preload requests and target discovery

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::models::{Page, PathResolver};

// == Preload Priority ==
/// Decides how much of a candidate page is warmed, not when it runs.
///
/// `High < Medium < Low`: a lower value warms more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PreloadPriority {
    /// Next page: record, image and text
    High = 0,
    /// Previous page: record and image
    Medium = 1,
    /// Jump target: record only
    Low = 2,
}

impl PreloadPriority {
    pub fn warms_image(self) -> bool {
        self <= PreloadPriority::Medium
    }

    pub fn warms_text(self) -> bool {
        self <= PreloadPriority::High
    }
}

impl fmt::Display for PreloadPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PreloadPriority::High => "high",
            PreloadPriority::Medium => "medium",
            PreloadPriority::Low => "low",
        };
        f.write_str(name)
    }
}

// == Preload Request ==
/// A page file to warm, consumed exactly once by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreloadRequest {
    pub path: PathBuf,
    pub priority: PreloadPriority,
}

impl PreloadRequest {
    pub fn new(path: impl Into<PathBuf>, priority: PreloadPriority) -> Self {
        Self {
            path: path.into(),
            priority,
        }
    }
}

/// Pages reachable from `page` whose files exist: the next page at high
/// priority, the previous page at medium, every jump target at low.
pub fn discover_targets(page: &Page, resolver: &dyn PathResolver) -> Vec<PreloadRequest> {
    let mut requests = Vec::new();

    if let Some(next) = page.next_page(resolver).filter(|p| resolver.exists(p)) {
        requests.push(PreloadRequest::new(next, PreloadPriority::High));
    }
    if let Some(previous) = page.previous_page(resolver).filter(|p| resolver.exists(p)) {
        requests.push(PreloadRequest::new(previous, PreloadPriority::Medium));
    }
    requests.extend(
        page.jump_targets(resolver)
            .into_iter()
            .filter(|p| resolver.exists(p))
            .map(|p| PreloadRequest::new(p, PreloadPriority::Low)),
    );

    requests
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JumpPoint, PageRecord, ProjectLayout};
    use std::collections::HashSet;
    use std::path::Path;

    /// Layout where only listed files exist.
    struct FakeLayout {
        inner: ProjectLayout,
        present: HashSet<PathBuf>,
    }

    impl PathResolver for FakeLayout {
        fn page_path(&self, group: &str, page: &str) -> PathBuf {
            self.inner.page_path(group, page)
        }
        fn text_path(&self, group: &str, relative: &str) -> PathBuf {
            self.inner.text_path(group, relative)
        }
        fn image_path(&self, group: &str, relative: &str) -> PathBuf {
            self.inner.image_path(group, relative)
        }
        fn audio_path(&self, group: &str, relative: &str) -> PathBuf {
            self.inner.audio_path(group, relative)
        }
        fn exists(&self, path: &Path) -> bool {
            self.present.contains(path)
        }
    }

    fn layout(present: &[&str]) -> FakeLayout {
        FakeLayout {
            inner: ProjectLayout::new("/novel"),
            present: present.iter().map(|p| PathBuf::from(*p)).collect(),
        }
    }

    fn page(record: PageRecord) -> Page {
        Page::new("/novel/ch1/current.json", record).unwrap()
    }

    #[test]
    fn test_priority_gating() {
        assert!(PreloadPriority::High.warms_image());
        assert!(PreloadPriority::High.warms_text());
        assert!(PreloadPriority::Medium.warms_image());
        assert!(!PreloadPriority::Medium.warms_text());
        assert!(!PreloadPriority::Low.warms_image());
        assert!(!PreloadPriority::Low.warms_text());
    }

    #[test]
    fn test_priority_order() {
        assert!(PreloadPriority::High < PreloadPriority::Medium);
        assert!(PreloadPriority::Medium < PreloadPriority::Low);
        assert_eq!(PreloadPriority::Low.to_string(), "low");
    }

    #[test]
    fn test_discover_all_kinds() {
        let record = PageRecord {
            next_page_path: Some("b".into()),
            previous_page_path: Some("a".into()),
            jump_points: vec![JumpPoint::new("branch", "c").in_group("ch2")],
            ..PageRecord::default()
        };
        let layout = layout(&[
            "/novel/ch1/a.json",
            "/novel/ch1/b.json",
            "/novel/ch2/c.json",
        ]);

        let requests = discover_targets(&page(record), &layout);
        assert_eq!(
            requests,
            vec![
                PreloadRequest::new("/novel/ch1/b.json", PreloadPriority::High),
                PreloadRequest::new("/novel/ch1/a.json", PreloadPriority::Medium),
                PreloadRequest::new("/novel/ch2/c.json", PreloadPriority::Low),
            ]
        );
    }

    #[test]
    fn test_discover_skips_missing_and_unset() {
        let record = PageRecord {
            next_page_path: Some("b".into()),
            previous_page_path: Some(String::new()),
            jump_points: vec![
                JumpPoint::new("gone", "missing"),
                JumpPoint::new("same group", "d"),
            ],
            ..PageRecord::default()
        };
        let layout = layout(&["/novel/ch1/d.json"]);

        let requests = discover_targets(&page(record), &layout);
        assert_eq!(
            requests,
            vec![PreloadRequest::new("/novel/ch1/d.json", PreloadPriority::Low)]
        );
    }

    #[test]
    fn test_discover_nothing() {
        assert!(discover_targets(&page(PageRecord::default()), &layout(&[])).is_empty());
    }
}
