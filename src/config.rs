use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::{
    images::{parse_hex_color, CompositeStyle},
    storage::{self, StorageManager},
};

const CONFIG_FILE: &str = "config.yaml";

/// Placeholder replaced by the partition letter in `letter_dir_template`.
pub const LETTER_PLACEHOLDER: &str = "{letter}";

const DEFAULT_LISTEN: &str = "127.0.0.1:5001";
const DEFAULT_SIMILARITIES_DIR: &str = "data/similarities";
const DEFAULT_LOGO_ROOT: &str = "data/logos/pngs_ALL_inkscape_512";
const DEFAULT_LETTER_DIR_TEMPLATE: &str = "pngs_{letter}_inkscape_512";
const DEFAULT_CATEGORY_FALLBACK_DIR: &str = "new_logos";
const DEFAULT_SVG_ROOT: &str = "data/logos/svgs";

/// Settings of the composite PNG export.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_thumb_size")]
    pub thumb_size: u32,

    #[serde(default = "default_padding")]
    pub padding: u32,

    #[serde(default = "default_corner_radius")]
    pub corner_radius: u32,

    /// Space between the card edge and the logo
    #[serde(default = "default_logo_margin")]
    pub logo_margin: u32,

    /// Canvas color as `#rrggbb`
    #[serde(default = "default_background")]
    pub background: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            thumb_size: default_thumb_size(),
            padding: default_padding(),
            corner_radius: default_corner_radius(),
            logo_margin: default_logo_margin(),
            background: default_background(),
        }
    }
}

fn default_thumb_size() -> u32 {
    256
}

fn default_padding() -> u32 {
    48
}

fn default_corner_radius() -> u32 {
    32
}

fn default_logo_margin() -> u32 {
    16
}

fn default_background() -> String {
    "#111111".to_string()
}

impl ExportConfig {
    pub fn style(&self) -> Result<CompositeStyle> {
        let background = parse_hex_color(&self.background)
            .with_context(|| format!("export.background {:?} is not a #rrggbb color", self.background))?;

        Ok(CompositeStyle {
            thumb_size: self.thumb_size,
            padding: self.padding,
            corner_radius: self.corner_radius,
            logo_margin: self.logo_margin,
            background,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Address the http service binds to
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Directory holding `block4_similarities_*.json`
    #[serde(default = "default_similarities_dir")]
    pub similarities_dir: String,

    /// Root of the raster logos; qualified identifiers start with it
    #[serde(default = "default_logo_root")]
    pub logo_root: String,

    /// Name of a letter partition directory under `logo_root`
    #[serde(default = "default_letter_dir_template")]
    pub letter_dir_template: String,

    /// Directory under `logo_root` shared by all non-letter categories
    #[serde(default = "default_category_fallback_dir")]
    pub category_fallback_dir: String,

    #[serde(default = "default_image_extension")]
    pub image_extension: String,

    /// Root of the vector logos used by the svg bundle export
    #[serde(default = "default_svg_root")]
    pub svg_root: String,

    #[serde(default = "default_svg_extension")]
    pub svg_extension: String,

    /// Roots searched, in order, for composite export logos that do not
    /// exist as given
    #[serde(default = "default_fallback_roots")]
    pub fallback_roots: Vec<String>,

    /// Keep loaded similarity files in memory
    #[serde(default = "default_cache_pair_stores")]
    pub cache_pair_stores: bool,

    /// Frontend files served for any unmatched route
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    #[serde(default)]
    pub export: ExportConfig,

    #[serde(skip_serializing, skip_deserializing)]
    base_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            similarities_dir: default_similarities_dir(),
            logo_root: default_logo_root(),
            letter_dir_template: default_letter_dir_template(),
            category_fallback_dir: default_category_fallback_dir(),
            image_extension: default_image_extension(),
            svg_root: default_svg_root(),
            svg_extension: default_svg_extension(),
            fallback_roots: default_fallback_roots(),
            cache_pair_stores: default_cache_pair_stores(),
            static_dir: default_static_dir(),
            export: ExportConfig::default(),
            base_path: PathBuf::from("."),
        }
    }
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

fn default_similarities_dir() -> String {
    DEFAULT_SIMILARITIES_DIR.to_string()
}

fn default_logo_root() -> String {
    DEFAULT_LOGO_ROOT.to_string()
}

fn default_letter_dir_template() -> String {
    DEFAULT_LETTER_DIR_TEMPLATE.to_string()
}

fn default_category_fallback_dir() -> String {
    DEFAULT_CATEGORY_FALLBACK_DIR.to_string()
}

fn default_image_extension() -> String {
    "png".to_string()
}

fn default_svg_root() -> String {
    DEFAULT_SVG_ROOT.to_string()
}

fn default_svg_extension() -> String {
    "svg".to_string()
}

fn default_fallback_roots() -> Vec<String> {
    vec!["pngs_A_inkscape_512".to_string(), "logos".to_string()]
}

fn default_cache_pair_stores() -> bool {
    true
}

fn default_static_dir() -> String {
    "static".to_string()
}

impl Config {
    /// Config rooted at `base_path` without reading or writing any file.
    #[cfg(test)]
    pub fn with_base_path(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.letter_dir_template.contains(LETTER_PLACEHOLDER) {
            bail!(
                "letter_dir_template {:?} must contain {LETTER_PLACEHOLDER}",
                self.letter_dir_template
            );
        }

        if self.logo_root.trim_matches('/').is_empty() {
            bail!("logo_root must not be empty");
        }

        if self.image_extension.is_empty() || self.svg_extension.is_empty() {
            bail!("image_extension and svg_extension must not be empty");
        }

        let export = &self.export;
        if export.thumb_size == 0 {
            bail!("export.thumb_size must be greater than 0");
        }
        if export.logo_margin.saturating_mul(2) >= export.thumb_size {
            bail!(
                "export.logo_margin {} leaves no room for a logo in a {}px thumbnail",
                export.logo_margin,
                export.thumb_size
            );
        }
        export.style()?;

        Ok(())
    }

    pub fn load_with(base_path: impl AsRef<Path>) -> Result<Self> {
        let base_path = base_path.as_ref();
        let store = storage::BackendLocal::new(base_path)
            .with_context(|| format!("failed to open {}", base_path.display()))?;

        // create new if does not exist
        if !store.exists(CONFIG_FILE) {
            store.write(CONFIG_FILE, serde_yml::to_string(&Self::default())?.as_bytes())?;
        }

        let config_str =
            String::from_utf8(store.read(CONFIG_FILE)?).context("config file is not valid utf8")?;
        let mut config: Self = serde_yml::from_str(&config_str).context("config is malformed")?;

        config.base_path = base_path.to_path_buf();

        config.validate()?;

        // resave in case config version needs an upgrade
        if config_str != serde_yml::to_string(&config)? {
            config.save()?;
        }

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let store = storage::BackendLocal::new(&self.base_path)?;

        let config_str = serde_yml::to_string(&self)?;
        store.write(CONFIG_FILE, config_str.as_bytes())?;
        Ok(())
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// `path` from the config, relative to the base directory.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.base_path.join(path)
    }
}
