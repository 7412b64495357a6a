//! Settings UI files compiled into the binary

use std::path::Path;

/// Asset served for `/`
pub const INDEX_ASSET: &str = "settings-ui.html";

/// Embedded files, keyed by their path below the crate root
const ASSETS: &[(&str, &[u8])] = &[
    ("web/settings-ui.html", include_bytes!("../../web/settings-ui.html")),
    ("web/settings-ui.css", include_bytes!("../../web/settings-ui.css")),
    ("web/settings-ui.js", include_bytes!("../../web/settings-ui.js")),
    ("web/Icon256x256.png", include_bytes!("../../web/Icon256x256.png")),
];

/// An embedded file ready to be served
#[derive(Debug, Clone, Copy)]
pub struct Asset {
    pub name: &'static str,
    pub bytes: &'static [u8],
}

impl Asset {
    pub fn content_type(&self) -> &'static str {
        content_type(self.name)
    }
}

/// Resolve a request path: exact name first, then a case-insensitive suffix match
pub fn find(request_path: &str) -> Option<Asset> {
    let name = request_path.trim_start_matches('/');
    let name = if name.is_empty() { INDEX_ASSET } else { name };

    let exact = ASSETS.iter().find(|(asset, _)| *asset == name);
    let by_suffix = || {
        let wanted = name.to_ascii_lowercase();
        ASSETS
            .iter()
            .find(|(asset, _)| asset.to_ascii_lowercase().ends_with(&wanted))
    };

    exact
        .or_else(by_suffix)
        .map(|&(name, bytes)| Asset { name, bytes })
}

/// MIME type for a file name, by extension
pub fn content_type(name: &str) -> &'static str {
    let extension = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_serves_the_settings_page() {
        assert_eq!(find("/").unwrap().name, "web/settings-ui.html");
        assert_eq!(find("").unwrap().name, "web/settings-ui.html");
    }

    #[test]
    fn resolves_by_exact_name_then_suffix() {
        assert_eq!(find("/web/settings-ui.js").unwrap().name, "web/settings-ui.js");
        assert_eq!(find("/settings-ui.css").unwrap().name, "web/settings-ui.css");
        assert_eq!(find("/icon256x256.PNG").unwrap().name, "web/Icon256x256.png");
    }

    #[test]
    fn unknown_assets_are_missing() {
        assert!(find("/nonexistent.png").is_none());
        assert!(find("/settings-ui.html/extra").is_none());
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(content_type("a.html"), "text/html");
        assert_eq!(content_type("a.JS"), "application/javascript");
        assert_eq!(content_type("a.jpeg"), "image/jpeg");
        assert_eq!(content_type("a.svg"), "image/svg+xml");
        assert_eq!(content_type("a.woff2"), "application/octet-stream");
        assert_eq!(content_type("README"), "application/octet-stream");
    }
}
