//! Static resource providers and the composed provider chain.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::api::EmbeddedResource;

/// Answers "does resource path P exist, and what are its bytes"
pub trait ResourceProvider: fmt::Debug {
    /// Short label used in diagnostics
    fn name(&self) -> &str;

    /// Bytes of the resource at `path`, if this provider has it
    fn lookup(&self, path: &str) -> Option<Vec<u8>>;

    /// Whether this provider serves `path`, without reading it
    fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Every normalized path this provider can serve
    fn paths(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Canonical form of a request path: no leading slash, forward slashes only.
/// Returns `None` for paths that try to climb out of the root.
#[must_use]
pub fn normalize_path(path: &str) -> Option<String> {
    let path = path.replace('\\', "/");
    let mut segments = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => return None,
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

/// Serves files under a directory on disk. A missing directory serves nothing.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    name: String,
    root: PathBuf,
}

impl DirectoryProvider {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file(&self, path: &str) -> Option<PathBuf> {
        let full = self.root.join(normalize_path(path)?);
        full.is_file().then_some(full)
    }

    fn collect(&self, dir: &Path, prefix: &str, out: &mut Vec<String>) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };

        for entry in entries.flatten() {
            // Symlinked directories are not entered, so a link loop cannot recurse forever
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let relative = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };

            if file_type.is_dir() {
                self.collect(&entry.path(), &relative, out);
            } else if file_type.is_file() || (file_type.is_symlink() && entry.path().is_file()) {
                out.push(relative);
            }
        }
    }
}

impl ResourceProvider for DirectoryProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, path: &str) -> Option<Vec<u8>> {
        let full = self.file(path)?;
        fs::read(full).ok()
    }

    fn contains(&self, path: &str) -> bool {
        self.file(path).is_some()
    }

    fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect(&self.root, "", &mut out);
        out.sort();
        out
    }
}

/// Serves the resources a module embedded under a base namespace.
///
/// With base `wwwroot`, the embedded `wwwroot/css/site.css` answers
/// `/css/site.css`. Embedded paths outside the namespace are not served.
#[derive(Clone)]
pub struct EmbeddedProvider {
    name: String,
    files: BTreeMap<String, Vec<u8>>,
}

impl EmbeddedProvider {
    pub fn new<'a>(
        name: impl Into<String>,
        base: &str,
        resources: impl IntoIterator<Item = &'a EmbeddedResource>,
    ) -> Self {
        let base = normalize_path(base);
        let mut files = BTreeMap::new();

        for resource in resources {
            let Some(path) = normalize_path(&resource.path) else {
                continue;
            };

            let served = match &base {
                Some(base) => path
                    .strip_prefix(base.as_str())
                    .and_then(|rest| rest.strip_prefix('/'))
                    .map(str::to_string),
                None => Some(path),
            };

            if let Some(served) = served {
                files.insert(served, resource.bytes.clone());
            }
        }

        Self {
            name: name.into(),
            files,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl fmt::Debug for EmbeddedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmbeddedProvider")
            .field("name", &self.name)
            .field("files", &self.files.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ResourceProvider for EmbeddedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, path: &str) -> Option<Vec<u8>> {
        self.files.get(&normalize_path(path)?).cloned()
    }

    fn contains(&self, path: &str) -> bool {
        normalize_path(path).is_some_and(|p| self.files.contains_key(&p))
    }

    fn paths(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }
}

/// What to do when a newly composed provider serves a path an earlier member
/// already serves. The earlier member wins either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadowPolicy {
    Allow,
    #[default]
    Warn,
}

/// Ordered providers, first match wins. The host's provider goes in first, so
/// host resources always take precedence over plugin resources of the same name.
#[derive(Debug, Default)]
pub struct ResourceChain {
    members: Vec<Box<dyn ResourceProvider>>,
    shadowing: ShadowPolicy,
}

impl ResourceChain {
    #[must_use]
    pub fn new(host: Box<dyn ResourceProvider>, shadowing: ShadowPolicy) -> Self {
        Self {
            members: vec![host],
            shadowing,
        }
    }

    /// Append `provider` after every existing member
    #[must_use]
    pub fn compose(mut self, provider: Box<dyn ResourceProvider>) -> Self {
        if self.shadowing == ShadowPolicy::Warn {
            for path in provider.paths() {
                if let Some(owner) = self.members.iter().find(|m| m.contains(&path)) {
                    warn!(
                        "Resource /{} from {} is shadowed by {}",
                        path,
                        provider.name(),
                        owner.name()
                    );
                }
            }
        }

        debug!("Composed provider {} at position {}", provider.name(), self.members.len());
        self.members.push(provider);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member names in lookup order
    #[must_use]
    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.name()).collect()
    }
}

impl ResourceProvider for ResourceChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn lookup(&self, path: &str) -> Option<Vec<u8>> {
        self.members.iter().find_map(|m| m.lookup(path))
    }

    fn contains(&self, path: &str) -> bool {
        self.members.iter().any(|m| m.contains(path))
    }

    fn paths(&self) -> Vec<String> {
        let mut all: Vec<String> = self.members.iter().flat_map(|m| m.paths()).collect();
        all.sort();
        all.dedup();
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::tempdir;

    fn embedded(name: &str, files: &[(&str, &str)]) -> EmbeddedProvider {
        let resources: Vec<EmbeddedResource> = files
            .iter()
            .map(|(path, body)| EmbeddedResource {
                path: (*path).to_string(),
                bytes: body.as_bytes().to_vec(),
            })
            .collect();
        EmbeddedProvider::new(name, "wwwroot", &resources)
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/css/site.css").as_deref(), Some("css/site.css"));
        assert_eq!(normalize_path("css\\site.css").as_deref(), Some("css/site.css"));
        assert_eq!(normalize_path("./a//b").as_deref(), Some("a/b"));
        assert_eq!(normalize_path("/../etc/passwd"), None);
        assert_eq!(normalize_path("/"), None);
    }

    #[test]
    fn test_embedded_provider_strips_namespace() {
        let provider = embedded(
            "rcl_a",
            &[("wwwroot/css/site.css", "body {}"), ("Views/Index.cshtml", "x")],
        );
        assert_eq!(provider.lookup("/css/site.css"), Some(b"body {}".to_vec()));
        assert_eq!(provider.lookup("/Views/Index.cshtml"), None);
        assert_eq!(provider.paths(), vec!["css/site.css".to_string()]);
    }

    #[test]
    fn test_directory_provider_serves_files_only_inside_root() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("js")).unwrap();
        std::fs::write(dir.path().join("js/app.js"), b"host").unwrap();

        let provider = DirectoryProvider::new("host", dir.path());
        assert_eq!(provider.lookup("/js/app.js"), Some(b"host".to_vec()));
        assert_eq!(provider.lookup("/js"), None);
        assert_eq!(provider.lookup("/../x"), None);
        assert_eq!(provider.paths(), vec!["js/app.js".to_string()]);

        let missing = DirectoryProvider::new("host", dir.path().join("missing"));
        assert_eq!(missing.lookup("/js/app.js"), None);
        assert!(missing.paths().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_provider_does_not_follow_symlink_loops() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css/site.css"), b"body {}").unwrap();
        std::os::unix::fs::symlink(dir.path(), dir.path().join("css/loop")).unwrap();

        let provider = DirectoryProvider::new("host", dir.path());
        assert_eq!(provider.paths(), vec!["css/site.css".to_string()]);
    }

    /// Counts full reads, so shadowing checks can be shown not to touch file contents
    #[derive(Debug)]
    struct CountingProvider {
        inner: DirectoryProvider,
        reads: Rc<Cell<usize>>,
    }

    impl ResourceProvider for CountingProvider {
        fn name(&self) -> &str {
            self.inner.name()
        }

        fn lookup(&self, path: &str) -> Option<Vec<u8>> {
            self.reads.set(self.reads.get() + 1);
            self.inner.lookup(path)
        }

        fn contains(&self, path: &str) -> bool {
            self.inner.contains(path)
        }
    }

    #[test]
    fn test_shadow_check_does_not_read_host_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a"), b"host-a").unwrap();
        let reads = Rc::new(Cell::new(0));
        let host = CountingProvider {
            inner: DirectoryProvider::new("host", dir.path()),
            reads: Rc::clone(&reads),
        };

        let chain = ResourceChain::new(Box::new(host), ShadowPolicy::Warn)
            .compose(Box::new(embedded("rcl_a", &[("wwwroot/a", "a-a"), ("wwwroot/b", "a-b")])));
        assert_eq!(reads.get(), 0);

        assert!(chain.contains("/a"));
        assert!(chain.contains("/b"));
        assert!(!chain.contains("/c"));
        assert!(!DirectoryProvider::new("host", dir.path()).contains("/../a"));
        assert_eq!(reads.get(), 0);

        assert_eq!(chain.lookup("/a"), Some(b"host-a".to_vec()));
        assert_eq!(reads.get(), 1);
    }

    #[test]
    fn test_chain_host_first_then_plugins_in_order() {
        let host = embedded("host", &[("wwwroot/a", "host-a")]);
        let chain = ResourceChain::new(Box::new(host), ShadowPolicy::Warn)
            .compose(Box::new(embedded("rcl_a", &[("wwwroot/a", "a-a"), ("wwwroot/b", "a-b")])))
            .compose(Box::new(embedded("rcl_b", &[("wwwroot/b", "b-b"), ("wwwroot/c", "b-c")])));

        assert_eq!(chain.member_names(), vec!["host", "rcl_a", "rcl_b"]);
        assert_eq!(chain.lookup("/a"), Some(b"host-a".to_vec()));
        assert_eq!(chain.lookup("/b"), Some(b"a-b".to_vec()));
        assert_eq!(chain.lookup("/c"), Some(b"b-c".to_vec()));
        assert_eq!(chain.lookup("/d"), None);
        assert_eq!(chain.paths(), vec!["a", "b", "c"]);
    }
}
