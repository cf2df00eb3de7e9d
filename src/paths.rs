//! Well-known directories relative to the application base path.

use std::path::{Path, PathBuf};

/// Directory helpers rooted at an optional base path.
///
/// Without a base path every helper resolves relative to the working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paths {
    base: Option<PathBuf>,
}

impl Paths {
    pub fn new(base: Option<PathBuf>) -> Self {
        Self { base }
    }

    pub fn base(&self) -> Option<&Path> {
        self.base.as_deref()
    }

    /// `<base>/<sub>`, or `sub` alone without a base.
    pub fn base_path(&self, sub: impl AsRef<Path>) -> PathBuf {
        match &self.base {
            Some(base) => base.join(sub),
            None => sub.as_ref().to_path_buf(),
        }
    }

    pub fn config(&self, sub: impl AsRef<Path>) -> PathBuf {
        self.under("config", sub)
    }

    pub fn app(&self, sub: impl AsRef<Path>) -> PathBuf {
        self.under("app", sub)
    }

    pub fn bootstrap(&self, sub: impl AsRef<Path>) -> PathBuf {
        self.under("bootstrap", sub)
    }

    pub fn storage(&self, sub: impl AsRef<Path>) -> PathBuf {
        self.under("storage", sub)
    }

    pub fn databases(&self, sub: impl AsRef<Path>) -> PathBuf {
        self.under("databases", sub)
    }

    fn under(&self, dir: &str, sub: impl AsRef<Path>) -> PathBuf {
        let sub = sub.as_ref();
        let dir = self.base_path(dir);
        if sub.as_os_str().is_empty() {
            dir
        } else {
            dir.join(sub)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_with_base() {
        let paths = Paths::new(Some(PathBuf::from("/srv/app")));
        assert_eq!(paths.config("kernel.toml"), PathBuf::from("/srv/app/config/kernel.toml"));
        assert_eq!(paths.storage(""), PathBuf::from("/srv/app/storage"));
        assert_eq!(paths.databases("main.db"), PathBuf::from("/srv/app/databases/main.db"));
        assert_eq!(paths.bootstrap("cache"), PathBuf::from("/srv/app/bootstrap/cache"));
    }

    #[test]
    fn test_helpers_without_base() {
        let paths = Paths::default();
        assert_eq!(paths.base(), None);
        assert_eq!(paths.app("models"), PathBuf::from("app/models"));
        assert_eq!(paths.base_path("README.md"), PathBuf::from("README.md"));
    }
}
