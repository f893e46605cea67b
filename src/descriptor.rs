//! Image descriptors as returned by the search service.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub path: String,
}

/// One search hit. Treated as immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub file: FileRef,
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dhash: Option<String>,
    /// Any further fields the backend attaches.
    #[serde(flatten)]
    pub meta: Map<String, Value>,
}

impl ImageDescriptor {
    pub fn new(path: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            file: FileRef { path: path.into() },
            format: format.into(),
            dhash: None,
            meta: Map::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.file.path
    }

    pub fn format(&self) -> &str {
        &self.format
    }
}

/// `GET {endpoint}/file?path=<urlencoded path>`
pub fn image_url(endpoint: &str, image: &ImageDescriptor) -> Result<Url> {
    let base = format!("{}/file", endpoint.trim_end_matches('/'));
    Url::parse_with_params(&base, &[("path", image.path())])
        .map_err(|err| Error::InvalidUrl(format!("{base}: {err}")))
}

/// Longest directory prefix (ending in `/`) shared by every path.
pub fn common_path_prefix<'a, I>(paths: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut iter = paths.into_iter();
    let Some(first) = iter.next() else {
        return String::new();
    };
    // only whole directory components count
    let mut prefix = match first.rfind('/') {
        Some(idx) => &first[..=idx],
        None => "",
    };
    for path in iter {
        while !prefix.is_empty() && !path.starts_with(prefix) {
            let trimmed = &prefix[..prefix.len() - 1];
            prefix = match trimmed.rfind('/') {
                Some(idx) => &trimmed[..=idx],
                None => "",
            };
        }
        if prefix.is_empty() {
            break;
        }
    }
    prefix.to_string()
}

/// Path as shown in the overlay: the result set's shared prefix removed.
pub fn display_path<'a>(image: &'a ImageDescriptor, prefix: &str) -> &'a str {
    image.path().strip_prefix(prefix).unwrap_or(image.path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_descriptor_and_keeps_metadata() {
        let json = r#"{
            "file": {"path": "/pics/a b.jpg"},
            "format": "jpeg",
            "dhash": "00ff",
            "width": 640
        }"#;
        let image: ImageDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(image.path(), "/pics/a b.jpg");
        assert_eq!(image.format(), "jpeg");
        assert_eq!(image.dhash.as_deref(), Some("00ff"));
        assert_eq!(image.meta.get("width"), Some(&Value::from(640)));
    }

    #[test]
    fn image_url_encodes_path() {
        let image = ImageDescriptor::new("/pics/a b&c.jpg", "jpeg");
        let url = image_url("http://localhost:8080/", &image).unwrap();
        assert_eq!(url.path(), "/file");
        let (key, value) = url.query_pairs().next().unwrap();
        assert_eq!(key, "path");
        assert_eq!(value, "/pics/a b&c.jpg");
    }

    #[test]
    fn common_prefix_stops_at_directory_boundary() {
        let paths = ["/pics/wallpaper/a.jpg", "/pics/wallpaper2/b.jpg"];
        assert_eq!(common_path_prefix(paths), "/pics/");

        let paths = ["/pics/wallpaper/a.jpg", "/pics/wallpaper/sub/b.jpg"];
        assert_eq!(common_path_prefix(paths), "/pics/wallpaper/");

        assert_eq!(common_path_prefix(["relative.jpg", "/abs.jpg"]), "");
        assert_eq!(common_path_prefix(std::iter::empty()), "");
    }

    #[test]
    fn display_path_strips_prefix() {
        let image = ImageDescriptor::new("/pics/wallpaper/a.jpg", "jpeg");
        assert_eq!(display_path(&image, "/pics/"), "wallpaper/a.jpg");
        assert_eq!(display_path(&image, "/other/"), "/pics/wallpaper/a.jpg");
    }
}
