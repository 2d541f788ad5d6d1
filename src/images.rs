//! Side-by-side composite of several logos.
//!
//! Every logo is placed on a white rounded card over a solid background:
//!
//! ```text
//!  pad  thumb  pad  thumb  pad
//! +----------------------------+
//! |    +-----+     +-----+     |  pad
//! |    |logo |     |logo |     |  thumb
//! |    +-----+     +-----+     |
//! +----------------------------+  pad
//! ```
//!
//! Logos that cannot be found or decoded become transparent placeholders so
//! one broken file never fails the export.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::{imageops, DynamicImage, ImageFormat, Rgb, Rgba, RgbaImage};
use rayon::prelude::*;

use crate::{app::AppError, storage::has_parent_component};

const CARD_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Layout and colors of a composite.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeStyle {
    pub thumb_size: u32,
    pub padding: u32,
    pub corner_radius: u32,
    pub logo_margin: u32,
    pub background: Rgb<u8>,
}

impl CompositeStyle {
    /// Canvas dimensions for `count` logos.
    pub fn canvas_size(&self, count: u32) -> (u32, u32) {
        let width = count * self.thumb_size + (count + 1) * self.padding;
        let height = self.thumb_size + 2 * self.padding;
        (width, height)
    }

    /// Top-left corner of the card at `index`.
    pub fn card_origin(&self, index: u32) -> (u32, u32) {
        (self.padding + index * (self.thumb_size + self.padding), self.padding)
    }

    /// Side of the square the logo is scaled into.
    pub fn logo_size(&self) -> u32 {
        self.thumb_size.saturating_sub(2 * self.logo_margin).max(1)
    }
}

/// Parse `#rrggbb` (leading `#` optional).
pub fn parse_hex_color(value: &str) -> Option<Rgb<u8>> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}

#[derive(thiserror::Error, Debug)]
pub enum AssetError {
    #[error("logo {0:?} not found in any source")]
    Missing(String),

    #[error("failed to decode {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// One place a logo may live.
pub trait AssetSource: Send + Sync {
    fn locate(&self, ident: &str) -> Option<PathBuf>;
}

/// The identifier itself, relative to `base`.
pub struct AsGiven {
    pub base: PathBuf,
}

impl AssetSource for AsGiven {
    fn locate(&self, ident: &str) -> Option<PathBuf> {
        existing_file(self.base.join(ident), ident)
    }
}

/// The identifier under a fallback directory.
pub struct UnderRoot {
    pub root: PathBuf,
}

impl AssetSource for UnderRoot {
    fn locate(&self, ident: &str) -> Option<PathBuf> {
        existing_file(self.root.join(ident), ident)
    }
}

fn existing_file(path: PathBuf, ident: &str) -> Option<PathBuf> {
    if ident.is_empty() || has_parent_component(Path::new(ident)) {
        return None;
    }
    path.is_file().then_some(path)
}

/// Sources tried in order until one has the logo.
#[derive(Default)]
pub struct SourceChain {
    sources: Vec<Box<dyn AssetSource>>,
}

impl SourceChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl AssetSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }

    pub fn locate(&self, ident: &str) -> Option<PathBuf> {
        self.sources.iter().find_map(|source| source.locate(ident))
    }

    /// Decoded logo for `ident`.
    pub fn load(&self, ident: &str) -> Result<DynamicImage, AssetError> {
        let path = self
            .locate(ident)
            .ok_or_else(|| AssetError::Missing(ident.to_string()))?;
        log::debug!("logo {ident} resolved to {}", path.display());

        image::ImageReader::open(&path)
            .map_err(|err| AssetError::Decode {
                path: path.clone(),
                source: err.into(),
            })?
            .with_guessed_format()
            .map_err(|err| AssetError::Decode {
                path: path.clone(),
                source: err.into(),
            })?
            .decode()
            .map_err(|source| AssetError::Decode { path, source })
    }
}

/// Logo scaled to the card, or a transparent square if it can't be loaded.
fn thumbnail(sources: &SourceChain, ident: &str, style: &CompositeStyle) -> RgbaImage {
    let size = style.logo_size();
    match sources.load(ident) {
        Ok(img) => imageops::resize(&img.to_rgba8(), size, size, imageops::FilterType::Lanczos3),
        Err(err) => {
            log::warn!("using placeholder: {err}");
            RgbaImage::new(size, size)
        }
    }
}

/// Render `idents` side by side and encode the result as PNG.
pub fn compose(
    idents: &[String],
    style: &CompositeStyle,
    sources: &SourceChain,
) -> Result<Vec<u8>, AppError> {
    let thumbs: Vec<RgbaImage> = idents
        .par_iter()
        .map(|ident| thumbnail(sources, ident, style))
        .collect();

    let count = u32::try_from(thumbs.len())
        .map_err(|_| AppError::InvalidInput("too many logos".to_string()))?;
    let (width, height) = style.canvas_size(count);
    let Rgb([r, g, b]) = style.background;
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255]));

    for (index, thumb) in (0..count).zip(thumbs.iter()) {
        let (x, y) = style.card_origin(index);
        fill_rounded_square(&mut canvas, x, y, style.thumb_size, style.corner_radius, CARD_COLOR);
        imageops::overlay(
            &mut canvas,
            thumb,
            i64::from(x + style.logo_margin),
            i64::from(y + style.logo_margin),
        );
    }

    let flattened = DynamicImage::ImageRgba8(canvas).into_rgb8();
    let mut buf = Vec::new();
    flattened.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;

    log::debug!("composed {count} logos into {width}x{height} png ({} bytes)", buf.len());

    Ok(buf)
}

/// Fill a `size`x`size` square at (`x`, `y`) with corners rounded by `radius`.
fn fill_rounded_square(canvas: &mut RgbaImage, x: u32, y: u32, size: u32, radius: u32, color: Rgba<u8>) {
    let side = size as f32;
    let r = (radius as f32).min(side / 2.0);

    for dy in 0..size {
        for dx in 0..size {
            let (px, py) = (x + dx, y + dy);
            if px >= canvas.width() || py >= canvas.height() {
                continue;
            }
            // distance from the pixel center to the square shrunk by r
            let fx = dx as f32 + 0.5;
            let fy = dy as f32 + 0.5;
            let ex = fx - fx.clamp(r, side - r);
            let ey = fy - fy.clamp(r, side - r);
            if ex * ex + ey * ey <= r * r {
                canvas.put_pixel(px, py, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn style() -> CompositeStyle {
        CompositeStyle {
            thumb_size: 256,
            padding: 48,
            corner_radius: 32,
            logo_margin: 16,
            background: Rgb([17, 17, 17]),
        }
    }

    fn small_style() -> CompositeStyle {
        CompositeStyle {
            thumb_size: 40,
            padding: 8,
            corner_radius: 8,
            logo_margin: 4,
            background: Rgb([17, 17, 17]),
        }
    }

    fn write_png(path: &Path, color: Rgba<u8>) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbaImage::from_pixel(10, 10, color)
            .save_with_format(path, ImageFormat::Png)
            .unwrap();
    }

    fn decode(png: &[u8]) -> image::RgbImage {
        image::load_from_memory_with_format(png, ImageFormat::Png)
            .unwrap()
            .to_rgb8()
    }

    #[test]
    fn test_canvas_size_two_logos() {
        assert_eq!(style().canvas_size(2), (656, 352));
        assert_eq!(style().canvas_size(1), (352, 352));
        assert_eq!(style().canvas_size(0), (48, 352));
    }

    #[test]
    fn test_card_origin() {
        assert_eq!(style().card_origin(0), (48, 48));
        assert_eq!(style().card_origin(2), (48 + 2 * 304, 48));
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#111111"), Some(Rgb([17, 17, 17])));
        assert_eq!(parse_hex_color("ff8000"), Some(Rgb([255, 128, 0])));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#gggggg"), None);
        assert_eq!(parse_hex_color("#ééé"), None);
    }

    #[test]
    fn test_source_chain_order() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        write_png(&first.join("a.png"), Rgba([1, 2, 3, 255]));
        write_png(&second.join("a.png"), Rgba([1, 2, 3, 255]));
        write_png(&second.join("b.png"), Rgba([1, 2, 3, 255]));

        let chain = SourceChain::new()
            .with(AsGiven { base: dir.path().to_path_buf() })
            .with(UnderRoot { root: first.clone() })
            .with(UnderRoot { root: second.clone() });

        assert_eq!(chain.locate("first/a.png"), Some(dir.path().join("first/a.png")));
        assert_eq!(chain.locate("a.png"), Some(first.join("a.png")));
        assert_eq!(chain.locate("b.png"), Some(second.join("b.png")));
        assert_eq!(chain.locate("c.png"), None);
        assert_eq!(chain.locate("../second/b.png"), None);
    }

    #[test]
    fn test_missing_and_broken_assets_degrade() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("broken.png"), b"definitely not a png").unwrap();
        let chain = SourceChain::new().with(AsGiven { base: dir.path().to_path_buf() });

        assert!(matches!(chain.load("nope.png"), Err(AssetError::Missing(_))));
        assert!(matches!(chain.load("broken.png"), Err(AssetError::Decode { .. })));

        let style = small_style();
        let png = compose(
            &["nope.png".to_string(), "broken.png".to_string()],
            &style,
            &chain,
        )
        .unwrap();

        let img = decode(&png);
        assert_eq!(img.dimensions(), style.canvas_size(2));
        // placeholder is transparent, so the white card shows through
        let (x, y) = style.card_origin(1);
        assert_eq!(img.get_pixel(x + 20, y + 20), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_compose_draws_cards_and_logos() {
        let dir = TempDir::new().unwrap();
        write_png(&dir.path().join("red.png"), Rgba([255, 0, 0, 255]));
        write_png(&dir.path().join("clear.png"), Rgba([0, 0, 255, 0]));
        let chain = SourceChain::new().with(AsGiven { base: dir.path().to_path_buf() });

        let style = small_style();
        let png = compose(
            &["red.png".to_string(), "clear.png".to_string()],
            &style,
            &chain,
        )
        .unwrap();
        let img = decode(&png);

        assert_eq!(img.dimensions(), (2 * 40 + 3 * 8, 40 + 2 * 8));

        // canvas background outside the cards
        assert_eq!(img.get_pixel(2, 2), &Rgb([17, 17, 17]));
        // rounded corner leaves the background visible
        let (x0, y0) = style.card_origin(0);
        assert_eq!(img.get_pixel(x0, y0), &Rgb([17, 17, 17]));
        // card margin is white, logo area is red
        assert_eq!(img.get_pixel(x0 + 1, y0 + 20), &Rgb([255, 255, 255]));
        assert_eq!(img.get_pixel(x0 + 20, y0 + 20), &Rgb([255, 0, 0]));

        // fully transparent logo shows the white card, not the background
        let (x1, y1) = style.card_origin(1);
        assert_eq!(img.get_pixel(x1 + 20, y1 + 20), &Rgb([255, 255, 255]));
    }

    #[test]
    fn test_compose_empty_list_still_renders() {
        let chain = SourceChain::new();
        let png = compose(&[], &small_style(), &chain).unwrap();
        assert_eq!(decode(&png).dimensions(), small_style().canvas_size(0));
    }

    #[test]
    fn test_compose_reference_size() {
        let chain = SourceChain::new();
        let png = compose(&["a.png".to_string(), "b.png".to_string()], &style(), &chain).unwrap();
        assert_eq!(decode(&png).dimensions(), (656, 352));
    }
}
