//! Mapping partition selectors to similarity files and identifier prefixes.
//!
//! Nothing is registered up front: which partitions exist, and whether a
//! selector names a letter or a category, is decided by the similarity files
//! present in the similarities directory.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use regex::Regex;

use crate::{
    app::AppError,
    config::{Config, LETTER_PLACEHOLDER},
    similarity::{PairStore, PartitionPrefix, StoreCache},
    storage::{BackendLocal, StorageManager},
};

const SIMILARITY_FILE_PREFIX: &str = "block4_similarities_";
const SIMILARITY_FILE_SUFFIX: &str = ".json";

/// Pseudo-category covering every logo; loadable but never listed.
pub const ALL_LOGOS_CATEGORY: &str = "All Logos";

/// Name of the similarity file of `selector`.
pub fn similarity_file(selector: &str) -> String {
    format!("{SIMILARITY_FILE_PREFIX}{selector}{SIMILARITY_FILE_SUFFIX}")
}

/// The letter of a single-letter selector.
pub fn letter_selector(selector: &str) -> Option<char> {
    let mut chars = selector.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => Some(c.to_ascii_uppercase()),
        _ => None,
    }
}

/// A loaded store with the prefix its identifiers qualify to.
#[derive(Debug)]
pub struct ResolvedStore {
    /// Similarity file the store came from
    pub file: String,
    pub prefix: PartitionPrefix,
    pub store: PairStore,
}

pub struct PartitionResolver {
    similarities: BackendLocal,
    base_path: PathBuf,
    logo_root: String,
    letter_dir_template: String,
    letter_dir_pattern: Regex,
    category_fallback_dir: String,
    image_extension: String,
    cache: Option<StoreCache<String, ResolvedStore>>,
}

impl PartitionResolver {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let (before, after) = config
            .letter_dir_template
            .split_once(LETTER_PLACEHOLDER)
            .ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "letter_dir_template {:?} has no {LETTER_PLACEHOLDER}",
                    config.letter_dir_template
                ))
            })?;
        let pattern = format!("^{}[A-Z]{}$", regex::escape(before), regex::escape(after));
        let letter_dir_pattern = Regex::new(&pattern).map_err(anyhow::Error::from)?;

        Ok(Self {
            similarities: BackendLocal::open(config.resolve(&config.similarities_dir)),
            base_path: config.base_path().to_path_buf(),
            logo_root: config.logo_root.trim_end_matches('/').to_string(),
            letter_dir_template: config.letter_dir_template.clone(),
            letter_dir_pattern,
            category_fallback_dir: config.category_fallback_dir.clone(),
            image_extension: config.image_extension.clone(),
            cache: config.cache_pair_stores.then(StoreCache::new),
        })
    }

    /// Whether `name` is a letter partition directory, e.g. `pngs_A_inkscape_512`.
    pub fn is_letter_dir(&self, name: &str) -> bool {
        self.letter_dir_pattern.is_match(name)
    }

    fn letter_dir(&self, letter: char) -> String {
        self.letter_dir_template
            .replace(LETTER_PLACEHOLDER, &letter.to_ascii_uppercase().to_string())
    }

    pub fn letter_prefix(&self, letter: char) -> PartitionPrefix {
        PartitionPrefix::join(&self.logo_root, &self.letter_dir(letter))
    }

    /// Prefix of a category; non-letter categories share the fallback directory.
    pub fn category_prefix(&self, name: &str) -> PartitionPrefix {
        if self.is_letter_dir(name) {
            PartitionPrefix::join(&self.logo_root, name)
        } else {
            PartitionPrefix::join(&self.logo_root, &self.category_fallback_dir)
        }
    }

    /// Similarity store of `selector`.
    ///
    /// A category file named after the selector wins; a single letter then
    /// falls back to its letter partition file. Fails with
    /// [`AppError::NotFound`] when neither exists.
    pub fn load(&self, selector: &str) -> Result<Arc<ResolvedStore>, AppError> {
        match &self.cache {
            Some(cache) => cache.get_or_try_load(&selector.to_string(), || {
                let resolved = self.load_uncached(selector)?;
                log::info!(
                    "cached {} for partition {selector} ({} cached before)",
                    resolved.file,
                    cache.len()
                );
                Ok(resolved)
            }),
            None => self.load_uncached(selector).map(Arc::new),
        }
    }

    fn load_uncached(&self, selector: &str) -> Result<ResolvedStore, AppError> {
        if selector.is_empty() {
            return Err(AppError::NotFound(selector.to_string()));
        }
        if selector.contains(['/', '\\']) || selector.contains("..") {
            return Err(AppError::InvalidInput(format!(
                "invalid partition {selector:?}"
            )));
        }

        let file = similarity_file(selector);
        if let Some(store) = PairStore::load(&self.similarities.base_dir.join(&file))? {
            log::debug!("partition {selector} resolved to category file {file}");
            return Ok(ResolvedStore {
                file,
                prefix: self.category_prefix(selector),
                store,
            });
        }

        if let Some(letter) = letter_selector(selector) {
            let file = similarity_file(&self.letter_dir(letter));
            if let Some(store) = PairStore::load(&self.similarities.base_dir.join(&file))? {
                log::debug!("partition {selector} resolved to letter file {file}");
                return Ok(ResolvedStore {
                    file,
                    prefix: self.letter_prefix(letter),
                    store,
                });
            }
        }

        Err(AppError::NotFound(selector.to_string()))
    }

    /// Category names with a similarity file, sorted case-insensitively.
    ///
    /// Letter partitions and the "All Logos" pseudo-category are left out.
    pub fn list_partitions(&self) -> Vec<String> {
        let mut categories: Vec<String> = self
            .similarities
            .list()
            .into_iter()
            .filter_map(|file| {
                file.strip_prefix(SIMILARITY_FILE_PREFIX)?
                    .strip_suffix(SIMILARITY_FILE_SUFFIX)
                    .map(str::to_string)
            })
            .filter(|name| !name.is_empty())
            .filter(|name| !self.is_letter_dir(name))
            .filter(|name| !name.eq_ignore_ascii_case(ALL_LOGOS_CATEGORY))
            .collect();

        categories.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
        categories
    }

    /// Qualified identifiers of every logo of `selector` that exists on disk.
    ///
    /// A letter without similarity data lists its partition directory
    /// instead; any other unknown selector has no logos.
    pub fn list_identifiers(&self, selector: &str) -> Result<Vec<String>, AppError> {
        let resolved = match self.load(selector) {
            Ok(resolved) => resolved,
            Err(AppError::NotFound(_)) => {
                return Ok(match letter_selector(selector) {
                    Some(letter) => self.scan_letter_dir(letter),
                    None => Vec::new(),
                });
            }
            Err(err) => return Err(err),
        };

        let qualified: BTreeSet<String> = resolved
            .store
            .identifiers()
            .map(|ident| resolved.prefix.qualify(ident))
            .collect();
        let total = qualified.len();

        let present: Vec<String> = qualified
            .into_iter()
            .filter(|ident| self.base_path.join(ident).is_file())
            .collect();

        if present.len() < total {
            log::debug!(
                "{} of {total} logos listed in {} are missing on disk",
                total - present.len(),
                resolved.file
            );
        }

        Ok(present)
    }

    /// Raster logos directly inside a letter partition directory.
    fn scan_letter_dir(&self, letter: char) -> Vec<String> {
        let prefix = self.letter_prefix(letter);
        let dir = BackendLocal::open(self.base_path.join(prefix.as_str()));
        let suffix = format!(".{}", self.image_extension);

        let logos: Vec<String> = dir
            .list()
            .into_iter()
            .filter(|name| name.ends_with(&suffix))
            .map(|name| prefix.qualify(&name))
            .collect();

        log::debug!("listed {} logos from {}", logos.len(), dir.base_dir.display());
        logos
    }
}
