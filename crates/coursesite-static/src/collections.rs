//! Collections: named, ordered groups of pages exposed to templates.

use chrono::{DateTime, Local};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::glob::{Glob, GlobError};

/// Location and identity of a page, available to templates as `page`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    /// Public URL, or `None` when the page is not written
    pub url: Option<String>,

    /// Source path relative to the project root
    pub input_path: String,

    /// Output path relative to the project root
    pub output_path: Option<String>,

    /// File stem, or the parent directory name for `index` files
    pub file_slug: String,

    /// Path relative to the input directory without extension, with a leading `/`
    pub file_path_stem: String,

    /// Page date
    pub date: DateTime<Local>,
}

/// A page as it appears inside a collection.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollectionItem {
    #[serde(flatten)]
    pub page: PageData,

    /// Frontmatter data
    pub data: Map<String, Value>,

    /// Source body after the frontmatter block
    pub raw_input: String,

    /// Tags from the frontmatter
    #[serde(skip)]
    pub tags: Vec<String>,
}

/// Query interface handed to collection selectors.
///
/// Items are already in collection order: by date, then by input path.
#[derive(Debug, Clone, Copy)]
pub struct CollectionApi<'a> {
    items: &'a [CollectionItem],
}

impl<'a> CollectionApi<'a> {
    /// Wrap the sorted list of collectable pages.
    pub fn new(items: &'a [CollectionItem]) -> Self {
        Self { items }
    }

    /// Every collectable page.
    pub fn all(&self) -> Vec<CollectionItem> {
        self.items.to_vec()
    }

    /// Pages whose input path matches `pattern`.
    pub fn filtered_by_glob(&self, pattern: &str) -> Result<Vec<CollectionItem>, GlobError> {
        let glob = Glob::new(pattern)?;
        Ok(self
            .items
            .iter()
            .filter(|item| glob.is_match(&item.page.input_path))
            .cloned()
            .collect())
    }

    /// Pages carrying `tag`.
    pub fn filtered_by_tag(&self, tag: &str) -> Vec<CollectionItem> {
        self.items
            .iter()
            .filter(|item| item.tags.iter().any(|t| t == tag))
            .cloned()
            .collect()
    }
}

/// Sort items into collection order.
pub fn sort_items(items: &mut [CollectionItem]) {
    items.sort_by(|a, b| {
        a.page
            .date
            .cmp(&b.page.date)
            .then_with(|| a.page.input_path.cmp(&b.page.input_path))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(input_path: &str, day: u32, tags: &[&str]) -> CollectionItem {
        CollectionItem {
            page: PageData {
                url: Some(format!("/{}/", input_path)),
                input_path: input_path.to_string(),
                output_path: None,
                file_slug: String::new(),
                file_path_stem: String::new(),
                date: Local.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            },
            data: Map::new(),
            raw_input: String::new(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn filters_courses_by_glob() {
        let items = vec![
            item("Lessons/a/README.md", 1, &[]),
            item("Lessons/b/README.md", 2, &[]),
            item("Lessons/b/extra.md", 3, &[]),
        ];
        let api = CollectionApi::new(&items);

        let courses = api.filtered_by_glob("Lessons/*/README.md").unwrap();

        let paths: Vec<_> = courses.iter().map(|c| c.page.input_path.as_str()).collect();
        assert_eq!(paths, vec!["Lessons/a/README.md", "Lessons/b/README.md"]);
    }

    #[test]
    fn filters_by_tag() {
        let items = vec![
            item("Lessons/a/summary.md", 1, &["summary"]),
            item("Lessons/a/reference.md", 2, &["reference", "summary"]),
            item("Lessons/a/other.md", 3, &["other"]),
        ];
        let api = CollectionApi::new(&items);

        assert_eq!(api.filtered_by_tag("summary").len(), 2);
        assert_eq!(api.filtered_by_tag("missing").len(), 0);
        assert_eq!(api.all().len(), 3);
    }

    #[test]
    fn sorts_by_date_then_path() {
        let mut items = vec![
            item("Lessons/c.md", 2, &[]),
            item("Lessons/b.md", 1, &[]),
            item("Lessons/a.md", 2, &[]),
        ];
        sort_items(&mut items);

        let paths: Vec<_> = items.iter().map(|c| c.page.input_path.as_str()).collect();
        assert_eq!(paths, vec!["Lessons/b.md", "Lessons/a.md", "Lessons/c.md"]);
    }

    #[test]
    fn bad_glob_is_an_error() {
        let items = vec![];
        let api = CollectionApi::new(&items);
        assert!(api.filtered_by_glob("Lessons/{a").is_err());
    }

    #[test]
    fn serializes_with_template_field_names() {
        let json = serde_json::to_value(item("Lessons/a/README.md", 1, &["x"])).unwrap();

        assert_eq!(json["inputPath"], "Lessons/a/README.md");
        assert!(json.get("rawInput").is_some());
        assert!(json.get("tags").is_none());
        assert!(json["date"].as_str().unwrap().starts_with("2024-01-01"));
    }
}
