//! Product image resolution.
//!
//! Stored image references are relative names served by the API under
//! `/uploads/`. A product without an image, or whose image fails to load,
//! shows an embedded placeholder that can never fail itself.

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::config::ClientConfig;

const PLACEHOLDER_SVG: &str = concat!(
    r##"<svg width="300" height="300" xmlns="http://www.w3.org/2000/svg">"##,
    r##"<rect width="100%" height="100%" fill="#f3f4f6"/>"##,
    r##"<text x="50%" y="50%" font-family="Arial, sans-serif" font-size="14" "##,
    r##"fill="#9ca3af" text-anchor="middle" dy=".3em">No Image</text></svg>"##,
);

static PLACEHOLDER_URI: LazyLock<String> = LazyLock::new(|| {
    format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(PLACEHOLDER_SVG)
    )
});

/// The embedded "No Image" graphic as a `data:` URI.
#[must_use]
pub fn placeholder() -> &'static str {
    &PLACEHOLDER_URI
}

/// Maps stored image references to fetchable URLs.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    uploads_base: String,
}

impl ImageResolver {
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_base(config.api_base())
    }

    /// Resolver for an API served at `api_base`.
    #[must_use]
    pub fn with_base(api_base: &str) -> Self {
        Self {
            uploads_base: format!("{}/uploads", api_base.trim_end_matches('/')),
        }
    }

    /// URL for a stored reference, or `None` when there is no image.
    #[must_use]
    pub fn resolve(&self, reference: Option<&str>) -> Option<String> {
        let reference = reference
            .map(|r| r.trim().trim_start_matches('/'))
            .filter(|r| !r.is_empty())?;
        Some(format!("{}/{reference}", self.uploads_base))
    }

    /// An image slot for a stored reference.
    #[must_use]
    pub fn slot(&self, reference: Option<&str>) -> ImageSlot {
        ImageSlot {
            source: self.resolve(reference),
            failed: false,
        }
    }
}

/// What an image element should display.
///
/// Starts at the resolved URL. After [`ImageSlot::mark_failed`] it shows the
/// placeholder for good, so a broken image is requested at most once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSlot {
    source: Option<String>,
    failed: bool,
}

impl ImageSlot {
    /// The URL to display.
    #[must_use]
    pub fn src(&self) -> &str {
        match (&self.source, self.failed) {
            (Some(url), false) => url,
            _ => placeholder(),
        }
    }

    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        self.source.is_none() || self.failed
    }

    /// Record a load failure. Returns `false` if the slot was already showing
    /// the placeholder, so callers never retry it.
    pub fn mark_failed(&mut self) -> bool {
        if self.is_placeholder() {
            return false;
        }
        self.failed = true;
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_under_uploads() {
        let images = ImageResolver::with_base("http://localhost:8080/");
        assert_eq!(
            images.resolve(Some("brake-pad.jpg")).as_deref(),
            Some("http://localhost:8080/uploads/brake-pad.jpg")
        );
        assert_eq!(
            images.resolve(Some("/x.png")).as_deref(),
            Some("http://localhost:8080/uploads/x.png")
        );
        assert_eq!(images.resolve(None), None);
        assert_eq!(images.resolve(Some("  ")), None);
    }

    #[test]
    fn test_placeholder_is_embedded_svg() {
        let uri = placeholder();
        let encoded = uri.strip_prefix("data:image/svg+xml;base64,").unwrap();
        let svg = String::from_utf8(STANDARD.decode(encoded).unwrap()).unwrap();
        assert!(svg.contains("No Image"));
    }

    #[test]
    fn test_slot_falls_back_once() {
        let images = ImageResolver::with_base("http://localhost:8080");
        let mut slot = images.slot(Some("pad.jpg"));
        assert_eq!(slot.src(), "http://localhost:8080/uploads/pad.jpg");

        assert!(slot.mark_failed());
        assert_eq!(slot.src(), placeholder());
        assert!(!slot.mark_failed());
    }

    #[test]
    fn test_slot_without_image_starts_on_placeholder() {
        let images = ImageResolver::with_base("http://localhost:8080");
        let mut slot = images.slot(None);
        assert!(slot.is_placeholder());
        assert!(!slot.mark_failed());
    }
}
