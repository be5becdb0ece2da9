//! Plugin directory scanner.
//!
//! Enumerates the immediate files of one directory that follow the plugin
//! naming convention (`<prefix>*.<ext>`) and classifies each one as a code
//! module or a resources-only module (`*<suffix>.<ext>`).

use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::bundle::{Bundle, ModuleKind};
use super::error::ScanError;
use crate::config::PluginConfig;

/// Read-only scanner for one naming convention
#[derive(Debug, Clone)]
pub struct PluginScanner {
    pattern: Regex,
    resources_ending: String,
}

impl PluginScanner {
    /// Build a scanner for `<prefix>*.<extension>` files, where names ending in
    /// `<resources_suffix>.<extension>` are resources-only modules.
    ///
    /// # Errors
    /// Returns an error if the escaped pattern cannot be compiled.
    pub fn new(
        prefix: &str,
        resources_suffix: &str,
        extension: &str,
    ) -> Result<Self, regex::Error> {
        let extension = extension.trim_start_matches('.');
        let pattern = Regex::new(&format!(
            r"^{}.*\.{}$",
            regex::escape(prefix),
            regex::escape(extension)
        ))?;

        Ok(Self {
            pattern,
            resources_ending: format!("{resources_suffix}.{extension}"),
        })
    }

    /// Build a scanner from the `plugins` section of the host config
    ///
    /// # Errors
    /// Returns an error if the configured convention cannot be compiled.
    pub fn from_config(config: &PluginConfig) -> Result<Self, regex::Error> {
        Self::new(
            &config.prefix,
            &config.resources_suffix,
            &config.extension,
        )
    }

    /// Whether a bare file name follows the plugin naming convention
    #[must_use]
    pub fn matches(&self, file_name: &str) -> bool {
        self.pattern.is_match(file_name)
    }

    /// Classify a matching module path by its file name
    #[must_use]
    pub fn classify(&self, path: &Path) -> ModuleKind {
        let is_resources = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(&self.resources_ending));

        if is_resources {
            ModuleKind::Resources
        } else {
            ModuleKind::Code
        }
    }

    /// Enumerate matching module files in `dir`, sorted by file name.
    ///
    /// A directory that does not exist yields an empty list: running without
    /// plugins is a valid deployment. Subdirectories are never entered.
    ///
    /// # Errors
    /// Returns [`ScanError::Io`] if the directory exists but cannot be read.
    pub fn scan(&self, dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
        let io_err = |source| ScanError::Io {
            path: dir.to_path_buf(),
            source,
        };

        // Only a definite "not found" means no plugins; permission errors are fatal
        if !dir.try_exists().map_err(io_err)? {
            debug!("Plugin directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }

        let root = dir.canonicalize().map_err(io_err)?;
        let entries = match fs::read_dir(&root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(e)),
        };

        let mut found: Vec<(String, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(io_err)?;
            let path = entry.path();

            if !path.is_file() {
                continue;
            }

            // Names that are not valid UTF-8 can never follow the convention
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if self.matches(name) {
                found.push((name.to_string(), path));
            }
        }

        // Filesystem enumeration order is not stable; precedence depends on this
        found.sort_by(|a, b| a.0.cmp(&b.0));

        debug!("Scanned {}: {} module file(s)", root.display(), found.len());
        Ok(found.into_iter().map(|(_, path)| path).collect())
    }

    /// Scan `dir` and turn every match into a classified [`Bundle`]
    ///
    /// # Errors
    /// Propagates [`ScanError`] from [`PluginScanner::scan`].
    pub fn discover(&self, dir: &Path) -> Result<Vec<Bundle>, ScanError> {
        Ok(self
            .scan(dir)?
            .into_iter()
            .filter_map(|path| {
                let kind = self.classify(&path);
                Bundle::from_module(path, kind)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn scanner() -> PluginScanner {
        PluginScanner::new("rcl_", ".Views", "mod").unwrap()
    }

    #[test]
    fn test_matches_prefix_and_extension() {
        let s = scanner();
        assert!(s.matches("rcl_a.mod"));
        assert!(s.matches("rcl_a.Views.mod"));
        assert!(!s.matches("other.mod"));
        assert!(!s.matches("rcl_a.mod.bak"));
        assert!(!s.matches("xrcl_a.mod"));
    }

    #[test]
    fn test_prefix_is_literal() {
        let s = PluginScanner::new("rcl.", ".Views", ".mod").unwrap();
        assert!(s.matches("rcl.a.mod"));
        assert!(!s.matches("rclxa.mod"));
    }

    #[test]
    fn test_classify_resources_suffix() {
        let s = scanner();
        assert_eq!(s.classify(Path::new("/p/rcl_a.Views.mod")), ModuleKind::Resources);
        assert_eq!(s.classify(Path::new("/p/rcl_a.mod")), ModuleKind::Code);
        assert_eq!(s.classify(Path::new("/p/rcl_Views.mod")), ModuleKind::Code);
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = tempdir().unwrap();
        let found = scanner().scan(&dir.path().join("nope")).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_scan_skips_subdirectories_and_sorts() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join("rcl_dir.mod")).unwrap();
        std::fs::write(dir.path().join("rcl_b.mod"), b"").unwrap();
        std::fs::write(dir.path().join("rcl_a.mod"), b"").unwrap();
        std::fs::write(dir.path().join("readme.txt"), b"").unwrap();

        let found = scanner().scan(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["rcl_a.mod", "rcl_b.mod"]);
        assert!(found.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn test_scan_of_a_file_is_an_error() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not_a_dir");
        std::fs::write(&file, b"").unwrap();
        assert!(matches!(scanner().scan(&file), Err(ScanError::Io { .. })));
    }

    #[test]
    fn test_uncheckable_directory_is_an_error_not_empty() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plugins");
        std::fs::write(&file, b"").unwrap();

        // Looking up a child of a regular file fails with ENOTDIR, not NotFound
        let result = scanner().scan(&file.join("rcl"));
        assert!(matches!(result, Err(ScanError::Io { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn test_locked_parent_directory_is_an_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        let plugins = locked.join("plugins");
        std::fs::create_dir_all(&plugins).unwrap();
        std::fs::write(plugins.join("rcl_a.mod"), b"").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

        // Privileged users bypass permission bits; nothing to check then
        let bypassed = std::fs::metadata(&plugins).is_ok();
        let result = scanner().scan(&plugins);
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        if !bypassed {
            assert!(matches!(result, Err(ScanError::Io { .. })));
        }
    }
}
