//! Resource file discovery
//!
//! Lists the eligible files of one resource directory, non-recursively and in
//! file-name order. Every call re-reads the filesystem.

use crate::error::{Error, Result};
use crate::types::ResourceFile;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions recognized as resource definitions
pub const RESOURCE_EXTENSIONS: &[&str] = &["json", "xml"];

/// Additional per-command file filter
///
/// Applied after the default extension filter; return `false` to skip a file.
pub trait FileFilter: Send + Sync {
    fn accept(&self, path: &Path) -> bool;
}

/// Skips files whose name is in a fixed set
///
/// Used when a more specific command already owns some files of a shared
/// directory (e.g. content database files under `databases/`).
#[derive(Debug, Clone, Default)]
pub struct ExcludeFilenames {
    names: HashSet<String>,
}

impl ExcludeFilenames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Exclude the file names of the given paths
    pub fn from_paths<'a>(paths: impl IntoIterator<Item = &'a PathBuf>) -> Self {
        Self::new(
            paths
                .into_iter()
                .filter_map(|p| p.file_name())
                .map(|n| n.to_string_lossy().into_owned()),
        )
    }

    pub fn add(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }
}

impl FileFilter for ExcludeFilenames {
    fn accept(&self, path: &Path) -> bool {
        path.file_name()
            .map(|n| !self.names.contains(n.to_string_lossy().as_ref()))
            .unwrap_or(false)
    }
}

/// Accepts only files whose name is in a fixed set
#[derive(Debug, Clone, Default)]
pub struct IncludeFilenames {
    names: HashSet<String>,
}

impl IncludeFilenames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl FileFilter for IncludeFilenames {
    fn accept(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|n| self.names.contains(n.to_string_lossy().as_ref()))
    }
}

/// Default eligibility: not hidden, with a recognized extension
pub fn is_resource_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(true);
    if hidden {
        return false;
    }
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            RESOURCE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Lists resource files in a directory
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceFileScanner;

impl ResourceFileScanner {
    /// Paths of eligible files in `dir`, sorted by file name
    ///
    /// A directory that does not exist yields an empty list.
    pub fn list_paths(&self, dir: &Path, filter: Option<&dyn FileFilter>) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            log::debug!("Resource directory does not exist: {}", dir.display());
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
                match e.into_io_error() {
                    Some(source) => Error::io(path, source),
                    None => Error::Config(format!("filesystem loop at {}", path.display())),
                }
            })?;

            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !is_resource_file(path) {
                continue;
            }
            if let Some(f) = filter
                && !f.accept(path)
            {
                log::debug!("Skipping filtered file: {}", path.display());
                continue;
            }
            paths.push(path.to_path_buf());
        }
        Ok(paths)
    }

    /// Eligible files in `dir` with their content, sorted by file name
    pub fn list(&self, dir: &Path, filter: Option<&dyn FileFilter>) -> Result<Vec<ResourceFile>> {
        self.list_paths(dir, filter)?
            .into_iter()
            .map(read_resource_file)
            .collect()
    }

    /// Immediate subdirectories of `dir`, sorted by name
    pub fn list_subdirectories(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut dirs = Vec::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = dir.to_path_buf();
                match e.into_io_error() {
                    Some(source) => Error::io(path, source),
                    None => Error::Config(format!("filesystem loop at {}", path.display())),
                }
            })?;
            if entry.file_type().is_dir() {
                dirs.push(entry.into_path());
            }
        }
        Ok(dirs)
    }
}

/// Read one resource file verbatim
pub fn read_resource_file(path: PathBuf) -> Result<ResourceFile> {
    let content = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    Ok(ResourceFile { path, content })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let tmp = TempDir::new().unwrap();
        let files = ResourceFileScanner
            .list(&tmp.path().join("nope"), None)
            .unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_lists_in_file_name_order_with_content() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "c.json", r#"{"user-name":"c"}"#);
        write(tmp.path(), "a.json", r#"{"user-name":"a"}"#);
        write(tmp.path(), "b.xml", "<user-properties/>");

        let files = ResourceFileScanner.list(tmp.path(), None).unwrap();
        let names: Vec<_> = files.iter().map(ResourceFile::file_name).collect();
        assert_eq!(names, ["a.json", "b.xml", "c.json"]);
        assert_eq!(files[0].content, r#"{"user-name":"a"}"#);
    }

    #[test]
    fn test_default_filter_skips_hidden_and_unknown() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), ".hidden.json", "{}");
        write(tmp.path(), "notes.txt", "hello");
        write(tmp.path(), "UPPER.JSON", "{}");
        fs::create_dir(tmp.path().join("nested.json")).unwrap();

        let paths = ResourceFileScanner.list_paths(tmp.path(), None).unwrap();
        assert_eq!(paths, vec![tmp.path().join("UPPER.JSON")]);
    }

    #[test]
    fn test_exclusion_filter() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "content-database.json", "{}");
        write(tmp.path(), "other-database.json", "{}");

        let filter = ExcludeFilenames::new(["content-database.json"]);
        let paths = ResourceFileScanner
            .list_paths(tmp.path(), Some(&filter))
            .unwrap();
        assert_eq!(paths, vec![tmp.path().join("other-database.json")]);
    }

    #[test]
    fn test_exclude_from_paths() {
        let paths = vec![PathBuf::from("/x/databases/content-database.json")];
        let mut filter = ExcludeFilenames::from_paths(&paths);
        filter.add("schemas-database.json");
        assert!(!filter.accept(Path::new("/y/content-database.json")));
        assert!(!filter.accept(Path::new("/y/schemas-database.json")));
        assert!(filter.accept(Path::new("/y/extra-database.json")));
    }

    #[test]
    fn test_include_filter() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "content-database.json", "{}");
        write(tmp.path(), "schemas-database.json", "{}");

        let filter = IncludeFilenames::new(["schemas-database.json"]);
        let paths = ResourceFileScanner
            .list_paths(tmp.path(), Some(&filter))
            .unwrap();
        assert_eq!(paths, vec![tmp.path().join("schemas-database.json")]);
    }

    #[test]
    fn test_subdirectories() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("b-db")).unwrap();
        fs::create_dir(tmp.path().join("a-db")).unwrap();
        write(tmp.path(), "stray.json", "{}");

        let dirs = ResourceFileScanner.list_subdirectories(tmp.path()).unwrap();
        assert_eq!(dirs, vec![tmp.path().join("a-db"), tmp.path().join("b-db")]);
    }
}
