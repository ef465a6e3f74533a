//! Uploaded document and image references

/// Resolves stored file references to URLs a recipient can open.
pub trait FileStore: Send + Sync {
    fn resolve(&self, reference: &str) -> String;
}

/// Files served from a public base URL (local `/uploads` mount or a CDN)
#[derive(Debug, Clone)]
pub struct PublicFileStore {
    base_url: String,
}

impl PublicFileStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl FileStore for PublicFileStore {
    fn resolve(&self, reference: &str) -> String {
        let reference = reference.trim();
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return reference.to_string();
        }
        // Refs are stored either bare or with the upload directory already in front.
        let path = reference.trim_start_matches('/');
        let path = path.strip_prefix("uploads/").unwrap_or(path);
        format!("{}/{}", self.base_url, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_refs() {
        let files = PublicFileStore::new("https://cdn.example.com/uploads/");
        assert_eq!(files.resolve("qr-1.png"), "https://cdn.example.com/uploads/qr-1.png");
        assert_eq!(files.resolve("/uploads/qr-1.png"), "https://cdn.example.com/uploads/qr-1.png");
        assert_eq!(files.resolve("uploads/receipts/r.jpg"), "https://cdn.example.com/uploads/receipts/r.jpg");
    }

    #[test]
    fn test_absolute_refs_pass_through() {
        let files = PublicFileStore::new("/uploads");
        assert_eq!(files.resolve("https://img.example.com/a.png"), "https://img.example.com/a.png");
        assert_eq!(files.resolve("a.png"), "/uploads/a.png");
    }
}
