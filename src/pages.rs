//! Page catalog: the content pages available under the pages directory.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::error::CoordinatorError;

/// Page whose URL carries the known email as a query parameter.
pub const ENTER_CODE_PAGE: &str = "enter-code";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    /// Display name, title-cased from the directory.
    pub name: String,
    /// Directory under the pages root; doubles as the page id.
    pub directory: String,
    /// Root-relative URL the page is served from.
    pub url: String,
}

impl PageLink {
    pub fn from_directory(directory: &str) -> Self {
        Self {
            name: title_case(directory),
            directory: directory.to_string(),
            url: format!("/pages/{}/", directory),
        }
    }

    pub fn id(&self) -> &str {
        &self.directory
    }
}

/// Pages sorted by display name.
#[derive(Debug, Clone, Default)]
pub struct PageCatalog {
    pages: Vec<PageLink>,
}

impl PageCatalog {
    /// Every sub-directory of `root` holding an `index.html` is a page. A
    /// missing root yields an empty catalog.
    pub fn scan(root: &Path) -> std::io::Result<Self> {
        if !root.exists() {
            warn!(pages_dir = %root.display(), "pages directory does not exist");
            return Ok(Self::default());
        }
        let mut pages = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() || !path.join("index.html").is_file() {
                continue;
            }
            if let Some(directory) = path.file_name().and_then(|n| n.to_str()) {
                pages.push(PageLink::from_directory(directory));
            }
        }
        debug!(count = pages.len(), "scanned page catalog");
        Ok(Self::from_links(pages))
    }

    pub fn from_links(mut pages: Vec<PageLink>) -> Self {
        pages.sort_by(|a, b| a.name.cmp(&b.name));
        Self { pages }
    }

    pub fn get(&self, id: &str) -> Option<&PageLink> {
        self.pages.iter().find(|page| page.directory == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PageLink> {
        self.pages.iter()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Absolute URL for loading `page`. The enter-code page gets `?email=` when
/// an email is known.
pub fn content_url(
    base: &Url,
    page: &PageLink,
    email: Option<&str>,
) -> Result<String, CoordinatorError> {
    let mut url = base
        .join(&page.url)
        .map_err(|e| CoordinatorError::UnknownPage(format!("{}: {}", page.directory, e)))?;
    if let Some(email) = email.filter(|_| page.directory.contains(ENTER_CODE_PAGE)) {
        url.query_pairs_mut().append_pair("email", email);
    }
    Ok(url.to_string())
}

fn title_case(directory: &str) -> String {
    directory
        .split(['-', '_', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
