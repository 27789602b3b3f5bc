//! Resource resolution for external buffers and images
//!
//! The loader never touches the filesystem itself; every URI that is not a
//! data URI is handed to a [`ResourceResolver`]. Hosts provide one of the
//! adapters below or pass a closure.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use percent_encoding::percent_decode_str;

/// Maps a logical URI to its bytes, or `None` when it cannot be found
pub trait ResourceResolver {
    fn resolve(&self, uri: &str) -> Option<Vec<u8>>;
}

impl<F> ResourceResolver for F
where
    F: Fn(&str) -> Option<Vec<u8>>,
{
    fn resolve(&self, uri: &str) -> Option<Vec<u8>> {
        self(uri)
    }
}

/// Resolver that knows nothing; suitable for self-contained GLB files
#[derive(Debug, Default, Clone, Copy)]
pub struct NullResolver;

impl ResourceResolver for NullResolver {
    fn resolve(&self, _uri: &str) -> Option<Vec<u8>> {
        None
    }
}

/// Local-file adapter rooted at a directory
///
/// URIs are percent-decoded and joined onto the root. Absolute URIs and
/// parent-directory escapes are refused.
#[derive(Debug, Clone)]
pub struct FileResolver {
    root: PathBuf,
}

impl FileResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates a resolver rooted at the directory containing `path`
    pub fn for_file(path: &Path) -> Self {
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ResourceResolver for FileResolver {
    fn resolve(&self, uri: &str) -> Option<Vec<u8>> {
        let decoded = percent_decode(uri);
        let relative = Path::new(&decoded);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            log::warn!("Refusing to resolve '{}' outside of {:?}", uri, self.root);
            return None;
        }

        let full = self.root.join(relative);
        match std::fs::read(&full) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                log::debug!("Failed to read {}: {}", full.display(), e);
                None
            }
        }
    }
}

/// Bundled-asset adapter: an in-memory table of named files
#[derive(Debug, Default, Clone)]
pub struct MemoryResolver {
    files: HashMap<String, Vec<u8>>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.insert(name, bytes);
        self
    }

    pub fn insert(&mut self, name: &str, bytes: Vec<u8>) {
        self.files.insert(name.to_string(), bytes);
    }
}

impl ResourceResolver for MemoryResolver {
    fn resolve(&self, uri: &str) -> Option<Vec<u8>> {
        self.files
            .get(uri)
            .or_else(|| self.files.get(&percent_decode(uri)))
            .cloned()
    }
}

/// Decodes `%XX` escapes; malformed escapes are kept verbatim
pub fn percent_decode(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}
