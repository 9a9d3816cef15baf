//! Font registry
//!
//! Maps logical font names (file stems) to font files found on the system.
//! The process-wide registry is built once on first use and never refreshed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::kernel::{CadError, CadResult};

/// Environment variable naming an extra font directory, scanned first
pub const FONT_DIR_ENV: &str = "PK_FONT_DIR";

const FONT_EXTENSIONS: [&str; 2] = ["ttf", "otf"];

static REGISTRY: OnceLock<FontRegistry> = OnceLock::new();

/// Logical name to font file lookup
#[derive(Debug, Clone, Default)]
pub struct FontRegistry {
    fonts: BTreeMap<String, PathBuf>,
}

impl FontRegistry {
    /// Build a registry from explicit entries
    pub fn from_entries<I, S, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, P)>,
        S: Into<String>,
        P: Into<PathBuf>,
    {
        Self {
            fonts: entries
                .into_iter()
                .map(|(name, path)| (name.into(), path.into()))
                .collect(),
        }
    }

    /// Scan directories recursively for font files. Earlier directories win
    /// when two files share a name.
    pub fn scan<P: AsRef<Path>>(dirs: &[P]) -> Self {
        let mut registry = Self::default();
        for dir in dirs {
            registry.scan_dir(dir.as_ref());
        }
        tracing::debug!("Font registry holds {} fonts", registry.fonts.len());
        registry
    }

    fn scan_dir(&mut self, dir: &Path) {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                self.scan_dir(&path);
                continue;
            }
            let is_font = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| FONT_EXTENSIONS.contains(&e.to_lowercase().as_str()));
            if is_font && let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                self.fonts.entry(stem.to_string()).or_insert(path);
            }
        }
    }

    /// Directories searched by the process-wide registry
    pub fn system_dirs() -> Vec<PathBuf> {
        let mut dirs = Vec::new();
        if let Some(dir) = std::env::var_os(FONT_DIR_ENV) {
            dirs.push(PathBuf::from(dir));
        }
        dirs.push(PathBuf::from("/usr/share/fonts"));
        dirs.push(PathBuf::from("/usr/local/share/fonts"));
        if let Some(home) = std::env::var_os("HOME") {
            let home = PathBuf::from(home);
            dirs.push(home.join(".fonts"));
            dirs.push(home.join(".local/share/fonts"));
        }
        dirs.push(PathBuf::from("/Library/Fonts"));
        dirs.push(PathBuf::from("/System/Library/Fonts"));
        dirs.push(PathBuf::from(r"C:\Windows\Fonts"));
        dirs
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fonts.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&Path> {
        self.fonts.get(name).map(PathBuf::as_path)
    }

    /// Shortest name, ties broken lexicographically
    pub fn default_font(&self) -> Option<(&str, &Path)> {
        self.fonts
            .iter()
            .min_by_key(|(name, _)| name.len())
            .map(|(name, path)| (name.as_str(), path.as_path()))
    }

    /// Resolve a font by name, or the default font when `name` is `None`
    pub fn resolve(&self, name: Option<&str>) -> CadResult<PathBuf> {
        match name {
            Some(name) => self.get(name).map(Path::to_path_buf).ok_or_else(|| {
                CadError::MissingResource(format!("Font '{}' is not installed", name))
            }),
            None => self
                .default_font()
                .map(|(_, path)| path.to_path_buf())
                .ok_or_else(|| CadError::MissingResource("No fonts installed".into())),
        }
    }
}

/// The process-wide registry, scanned on first access
pub fn registry() -> &'static FontRegistry {
    REGISTRY.get_or_init(|| FontRegistry::scan(&FontRegistry::system_dirs()))
}

/// Resolve a font through the process-wide registry
pub fn resolve_font(name: Option<&str>) -> CadResult<PathBuf> {
    registry().resolve(name)
}

/// An installed Latin font for tests that need real glyphs
#[cfg(test)]
pub(crate) fn test_font() -> Option<PathBuf> {
    let registry = registry();
    ["DejaVuSans", "LiberationSans-Regular", "FreeSans", "Arial", "Helvetica"]
        .iter()
        .find_map(|name| registry.get(name))
        .map(Path::to_path_buf)
}
