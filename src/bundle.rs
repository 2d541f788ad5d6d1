//! Zip export of vector logos.
//!
//! Members are flattened and renamed `logo_<k>.<ext>` in discovery order, so
//! the archive never reveals the original file names and never has two
//! members with the same name.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::app::AppError;
use crate::storage::is_contained_relative;

/// Which logos go into the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleSelector {
    /// Paths relative to the svg root, in the given order.
    Files(Vec<String>),
    /// Every logo directly inside one partition directory.
    Partition(String),
    /// Every logo under the svg root, recursively.
    All,
}

#[derive(Debug)]
pub struct Bundle {
    /// Zip archive bytes
    pub archive: Vec<u8>,
    /// Relative paths that were packed, in member order
    pub found: Vec<String>,
    /// Requested paths that do not exist; only filled for [`BundleSelector::Files`]
    pub missing: Vec<String>,
}

impl Bundle {
    /// Archive member name of the `position`-th (1-based) packed file.
    pub fn member_name(position: usize, extension: &str) -> String {
        format!("logo_{position}.{extension}")
    }
}

pub struct Bundler {
    root: PathBuf,
    extension: String,
}

impl Bundler {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    /// Collect the selected logos and pack them.
    ///
    /// Fails with [`AppError::NoAssets`] when nothing matched.
    pub fn bundle(&self, selector: &BundleSelector) -> Result<Bundle, AppError> {
        let mut missing = Vec::new();
        let files: Vec<(String, PathBuf)> = match selector {
            BundleSelector::Files(names) => {
                let mut files = Vec::with_capacity(names.len());
                for name in names {
                    match self.requested_file(name) {
                        Some(path) => files.push((name.clone(), path)),
                        None => missing.push(name.clone()),
                    }
                }
                if !missing.is_empty() {
                    log::debug!("missing logos requested for export: {missing:?}");
                }
                files
            }
            BundleSelector::Partition(partition) => self.partition_files(partition)?,
            BundleSelector::All => {
                let mut files = Vec::new();
                if self.root.is_dir() {
                    self.collect_recursive(&self.root, Path::new(""), &mut files)?;
                }
                files
            }
        };

        if files.is_empty() {
            log::debug!("no logos found for export ({selector:?})");
            return Err(AppError::NoAssets);
        }

        let archive = self.pack(&files)?;
        log::info!(
            "bundled {} logos ({} missing), {} bytes",
            files.len(),
            missing.len(),
            archive.len()
        );

        Ok(Bundle {
            archive,
            found: files.into_iter().map(|(name, _)| name).collect(),
            missing,
        })
    }

    fn requested_file(&self, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        if !is_contained_relative(relative) {
            return None;
        }
        let path = self.root.join(relative);
        path.is_file().then_some(path)
    }

    fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == self.extension)
    }

    fn partition_files(&self, partition: &str) -> Result<Vec<(String, PathBuf)>, AppError> {
        let relative = Path::new(partition);
        if !is_contained_relative(relative) {
            return Err(AppError::InvalidInput(format!(
                "invalid partition name {partition:?}"
            )));
        }

        let dir = self.root.join(relative);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut files = Vec::new();
        for (file_name, path) in sorted_entries(&dir)? {
            if path.is_file() && self.matches_extension(&path) {
                files.push((format!("{partition}/{file_name}"), path));
            }
        }
        Ok(files)
    }

    fn collect_recursive(
        &self,
        dir: &Path,
        relative: &Path,
        files: &mut Vec<(String, PathBuf)>,
    ) -> Result<(), AppError> {
        for (file_name, path) in sorted_entries(dir)? {
            let relative = relative.join(&file_name);
            if path.is_dir() {
                self.collect_recursive(&path, &relative, files)?;
            } else if self.matches_extension(&path) {
                files.push((relative.to_string_lossy().replace('\\', "/"), path));
            }
        }
        Ok(())
    }

    fn pack(&self, files: &[(String, PathBuf)]) -> Result<Vec<u8>, AppError> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        for (position, (_, path)) in files.iter().enumerate() {
            let data = std::fs::read(path)?;
            zip.start_file(Bundle::member_name(position + 1, &self.extension), options)?;
            zip.write_all(&data)?;
        }

        Ok(zip.finish()?.into_inner())
    }
}

/// Directory entries sorted by file name.
fn sorted_entries(dir: &Path) -> Result<Vec<(String, PathBuf)>, AppError> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        entries.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
    }
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    /// Helper: svg root with two letter dirs and a loose file.
    fn populate_svg_root(dir: &Path) {
        std::fs::create_dir_all(dir.join("A")).unwrap();
        std::fs::create_dir_all(dir.join("B/nested")).unwrap();
        std::fs::write(dir.join("A/alpha.svg"), "<svg>alpha</svg>").unwrap();
        std::fs::write(dir.join("A/apple.svg"), "<svg>apple</svg>").unwrap();
        std::fs::write(dir.join("A/notes.txt"), "skip me").unwrap();
        std::fs::write(dir.join("B/beta.svg"), "<svg>beta</svg>").unwrap();
        std::fs::write(dir.join("B/nested/deep.svg"), "<svg>deep</svg>").unwrap();
        std::fs::write(dir.join("loose.svg"), "<svg>loose</svg>").unwrap();
    }

    /// Helper: member name -> contents, in archive order.
    fn read_members(archive: &[u8]) -> Vec<(String, String)> {
        let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
        (0..zip.len())
            .map(|i| {
                let mut file = zip.by_index(i).unwrap();
                let mut contents = String::new();
                file.read_to_string(&mut contents).unwrap();
                (file.name().to_string(), contents)
            })
            .collect()
    }

    #[test]
    fn test_explicit_list_reports_missing() {
        let root = TempDir::new().unwrap();
        populate_svg_root(root.path());
        let bundler = Bundler::new(root.path(), "svg");

        let bundle = bundler
            .bundle(&BundleSelector::Files(vec![
                "A/alpha.svg".into(),
                "A/missing.svg".into(),
                "B/beta.svg".into(),
            ]))
            .unwrap();

        assert_eq!(bundle.found, vec!["A/alpha.svg", "B/beta.svg"]);
        assert_eq!(bundle.missing, vec!["A/missing.svg"]);
        assert_eq!(
            read_members(&bundle.archive),
            vec![
                ("logo_1.svg".to_string(), "<svg>alpha</svg>".to_string()),
                ("logo_2.svg".to_string(), "<svg>beta</svg>".to_string()),
            ]
        );
    }

    #[test]
    fn test_explicit_list_rejects_escaping_paths() {
        let root = TempDir::new().unwrap();
        populate_svg_root(&root.path().join("svgs"));
        std::fs::write(root.path().join("secret.svg"), "<svg/>").unwrap();
        let bundler = Bundler::new(root.path().join("svgs"), "svg");

        let bundle = bundler
            .bundle(&BundleSelector::Files(vec![
                "../secret.svg".into(),
                "loose.svg".into(),
            ]))
            .unwrap();

        assert_eq!(bundle.found, vec!["loose.svg"]);
        assert_eq!(bundle.missing, vec!["../secret.svg"]);
    }

    #[test]
    fn test_partition_is_not_recursive() {
        let root = TempDir::new().unwrap();
        populate_svg_root(root.path());
        let bundler = Bundler::new(root.path(), "svg");

        let bundle = bundler.bundle(&BundleSelector::Partition("B".into())).unwrap();

        assert_eq!(bundle.found, vec!["B/beta.svg"]);
        assert!(bundle.missing.is_empty());
        assert_eq!(read_members(&bundle.archive).len(), 1);
    }

    #[test]
    fn test_partition_filters_extension_and_sorts() {
        let root = TempDir::new().unwrap();
        populate_svg_root(root.path());
        let bundler = Bundler::new(root.path(), ".svg");

        let bundle = bundler.bundle(&BundleSelector::Partition("A".into())).unwrap();

        assert_eq!(bundle.found, vec!["A/alpha.svg", "A/apple.svg"]);
        let names: Vec<String> = read_members(&bundle.archive).into_iter().map(|m| m.0).collect();
        assert_eq!(names, vec!["logo_1.svg", "logo_2.svg"]);
    }

    #[test]
    fn test_all_is_recursive() {
        let root = TempDir::new().unwrap();
        populate_svg_root(root.path());
        let bundler = Bundler::new(root.path(), "svg");

        let bundle = bundler.bundle(&BundleSelector::All).unwrap();

        assert_eq!(
            bundle.found,
            vec![
                "A/alpha.svg",
                "A/apple.svg",
                "B/beta.svg",
                "B/nested/deep.svg",
                "loose.svg",
            ]
        );
        assert_eq!(read_members(&bundle.archive).len(), 5);
    }

    #[test]
    fn test_nothing_matched_is_no_assets() {
        let root = TempDir::new().unwrap();
        populate_svg_root(root.path());
        let bundler = Bundler::new(root.path(), "svg");

        assert!(matches!(
            bundler.bundle(&BundleSelector::Partition("Z".into())),
            Err(AppError::NoAssets)
        ));
        assert!(matches!(
            bundler.bundle(&BundleSelector::Files(vec!["nope.svg".into()])),
            Err(AppError::NoAssets)
        ));

        let empty = Bundler::new(root.path().join("absent"), "svg");
        assert!(matches!(empty.bundle(&BundleSelector::All), Err(AppError::NoAssets)));
    }

    #[test]
    fn test_invalid_partition_name() {
        let root = TempDir::new().unwrap();
        let bundler = Bundler::new(root.path(), "svg");
        assert!(matches!(
            bundler.bundle(&BundleSelector::Partition("../etc".into())),
            Err(AppError::InvalidInput(_))
        ));
    }
}
