//! Discovery of source files below the configured roots
//!
//! Exclusions are exact path matches, checked before anything else: an
//! excluded directory is never descended into and an excluded file is never
//! read. Entries that are neither directories nor regular files (symlinks
//! when links are not followed, sockets, FIFOs, devices) are skipped.
//! Directory entries are visited sorted by file name so repeated runs over an
//! unchanged tree discover files in the same order.

use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
};

use indexmap::IndexSet;
use log::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{BundleError, BundleResult};

/// A discovered source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Directory containing the file, as reached from its root
    pub dir: PathBuf,
    pub file_name: OsString,
}

impl DiscoveredFile {
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

#[derive(Debug, Clone)]
pub struct SourceWalker {
    roots: Vec<PathBuf>,
    recursive: bool,
    follow_links: bool,
    /// Accepted extensions, without the leading dot
    extensions: IndexSet<String>,
    excludes: Vec<PathBuf>,
}

impl SourceWalker {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            recursive: true,
            follow_links: false,
            extensions: IndexSet::from(["py".to_owned()]),
            excludes: Vec::new(),
        }
    }

    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    #[must_use]
    pub fn follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    /// Replace the accepted extensions. A leading dot is optional.
    #[must_use]
    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_owned())
            .collect();
        self
    }

    #[must_use]
    pub fn excludes(mut self, excludes: Vec<PathBuf>) -> Self {
        self.excludes = excludes;
        self
    }

    /// Check every root up front: a missing or non-directory root aborts the
    /// run before any file is processed.
    pub fn check_roots(&self) -> BundleResult<()> {
        for root in &self.roots {
            match std::fs::metadata(root) {
                Ok(metadata) if metadata.is_dir() => {}
                Ok(_) => return Err(BundleError::NotADirectory(root.clone())),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    return Err(BundleError::MissingRoot(root.clone()));
                }
                Err(source) => {
                    return Err(BundleError::Read {
                        path: root.clone(),
                        source,
                    });
                }
            }
        }
        Ok(())
    }

    /// Lazily yield every matching file below every root, root by root.
    ///
    /// Call [`Self::check_roots`] first; an unreadable directory surfaces as
    /// an `Err` item.
    pub fn walk(&self) -> impl Iterator<Item = BundleResult<DiscoveredFile>> + '_ {
        self.roots.iter().flat_map(move |root| self.walk_root(root))
    }

    /// Collect the whole walk, stopping at the first error
    pub fn discover(&self) -> BundleResult<Vec<DiscoveredFile>> {
        self.check_roots()?;
        self.walk().collect()
    }

    fn walk_root<'w>(
        &'w self,
        root: &'w Path,
    ) -> impl Iterator<Item = BundleResult<DiscoveredFile>> + 'w {
        let mut walk = WalkDir::new(root)
            .follow_links(self.follow_links)
            .sort_by_file_name();
        if !self.recursive {
            walk = walk.max_depth(1);
        }

        walk.into_iter()
            .filter_entry(move |entry| !self.is_excluded(entry.path()))
            .filter_map(move |entry| match entry {
                Ok(entry) => self.accept(&entry).map(Ok),
                Err(err) => self.walk_error(err),
            })
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let excluded = self.excludes.iter().any(|exclude| exclude == path);
        if excluded {
            debug!("Excluded {}", path.display());
        }
        excluded
    }

    fn accept(&self, entry: &DirEntry) -> Option<DiscoveredFile> {
        let file_type = entry.file_type();
        if file_type.is_dir() {
            return None;
        }
        if !file_type.is_file() {
            debug!("Skipping special entry {}", entry.path().display());
            return None;
        }

        let path = entry.path();
        let extension = path.extension()?.to_str()?;
        if !self.extensions.contains(extension) {
            return None;
        }

        Some(DiscoveredFile {
            dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            file_name: entry.file_name().to_os_string(),
        })
    }

    /// Broken links and link cycles are skipped; anything else is fatal
    fn walk_error(&self, err: walkdir::Error) -> Option<BundleResult<DiscoveredFile>> {
        let path = err.path().map(Path::to_path_buf).unwrap_or_default();

        if let Some(ancestor) = err.loop_ancestor() {
            warn!(
                "Skipping {}: symlink loop back to {}",
                path.display(),
                ancestor.display()
            );
            return None;
        }
        let is_broken_link = err.depth() > 0
            && err
                .io_error()
                .is_some_and(|io_err| io_err.kind() == io::ErrorKind::NotFound);
        if is_broken_link {
            warn!("Skipping {}: link target does not exist", path.display());
            return None;
        }

        Some(Err(BundleError::Walk { path, source: err }))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "pass\n").unwrap();
    }

    fn relative_paths(root: &Path, files: &[DiscoveredFile]) -> Vec<String> {
        files
            .iter()
            .map(|file| {
                file.path()
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_discovers_matching_files_recursively_in_name_order() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("pedal");
        touch(&root.join("b.py"));
        touch(&root.join("a.py"));
        touch(&root.join("notes.txt"));
        touch(&root.join("sub/c.py"));
        touch(&root.join("sub/deeper/d.py"));

        let files = SourceWalker::new(vec![root.clone()]).discover().unwrap();
        assert_eq!(
            relative_paths(&root, &files),
            vec!["a.py", "b.py", "sub/c.py", "sub/deeper/d.py"]
        );
        assert_eq!(files[2].dir, root.join("sub"));
        assert_eq!(files[2].file_name, OsString::from("c.py"));
    }

    #[test]
    fn test_non_recursive_walk_stays_at_top_level() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        touch(&root.join("top.py"));
        touch(&root.join("sub/nested.py"));

        let files = SourceWalker::new(vec![root.clone()])
            .recursive(false)
            .discover()
            .unwrap();
        assert_eq!(relative_paths(&root, &files), vec!["top.py"]);
    }

    #[test]
    fn test_excluded_directory_and_file_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("src");
        touch(&root.join("keep.py"));
        touch(&root.join("drop.py"));
        touch(&root.join("skip/z.py"));
        touch(&root.join("other/skip/kept.py"));

        let files = SourceWalker::new(vec![root.clone()])
            .excludes(vec![root.join("skip"), root.join("drop.py")])
            .discover()
            .unwrap();
        assert_eq!(
            relative_paths(&root, &files),
            vec!["keep.py", "other/skip/kept.py"]
        );
    }

    #[test]
    fn test_extension_filter_accepts_dotted_and_bare() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().to_path_buf();
        touch(&root.join("a.py"));
        touch(&root.join("b.pyi"));
        touch(&root.join("c.js"));

        let files = SourceWalker::new(vec![root.clone()])
            .extensions([".py", "pyi"])
            .discover()
            .unwrap();
        assert_eq!(relative_paths(&root, &files), vec!["a.py", "b.pyi"]);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");

        let err = SourceWalker::new(vec![missing.clone()])
            .discover()
            .expect_err("missing root");
        assert!(matches!(err, BundleError::MissingRoot(ref path) if *path == missing));
    }

    #[test]
    fn test_file_root_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let file = temp_dir.path().join("x.py");
        touch(&file);

        let err = SourceWalker::new(vec![file]).discover().expect_err("file root");
        assert!(matches!(err, BundleError::NotADirectory(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_skipped_unless_followed() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("root");
        let outside = temp_dir.path().join("outside");
        touch(&root.join("real.py"));
        touch(&outside.join("linked.py"));
        std::os::unix::fs::symlink(&outside, root.join("link")).unwrap();
        std::os::unix::fs::symlink(root.join("gone.py"), root.join("dangling.py")).unwrap();

        let files = SourceWalker::new(vec![root.clone()]).discover().unwrap();
        assert_eq!(relative_paths(&root, &files), vec!["real.py"]);

        let followed = SourceWalker::new(vec![root.clone()])
            .follow_links(true)
            .discover()
            .unwrap();
        assert_eq!(
            relative_paths(&root, &followed),
            vec!["link/linked.py", "real.py"]
        );
    }
}
