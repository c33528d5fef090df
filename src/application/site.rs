//! Public identity of the site: base URL, naming and item paths.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProfile {
    public_url: String,
    pub site_name: String,
    pub author: String,
    item_path: String,
}

impl SiteProfile {
    pub fn new(
        public_url: &str,
        site_name: impl Into<String>,
        author: impl Into<String>,
        item_path: &str,
    ) -> Self {
        Self {
            public_url: public_url.trim().trim_end_matches('/').to_string(),
            site_name: site_name.into(),
            author: author.into(),
            item_path: item_path.trim_matches('/').to_string(),
        }
    }

    /// Base URL without a trailing slash.
    pub fn root_url(&self) -> &str {
        &self.public_url
    }

    pub fn item_url(&self, id: &str) -> String {
        canonical_url(&self.public_url, &format!("/{}/{id}", self.item_path))
    }

    pub fn sitemap_url(&self) -> String {
        canonical_url(&self.public_url, "/sitemap.xml")
    }
}

pub fn canonical_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    if path == "/" {
        base.to_string()
    } else {
        format!("{base}{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_slashes_from_configuration() {
        let site = SiteProfile::new("https://example.com/", "Example", "Author", "/blog/");
        assert_eq!(site.root_url(), "https://example.com");
        assert_eq!(site.item_url("42"), "https://example.com/blog/42");
        assert_eq!(site.sitemap_url(), "https://example.com/sitemap.xml");
    }
}
