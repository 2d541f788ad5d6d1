use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::{app::App, config::Config};

pub const LOGO_ROOT: &str = "data/logos/pngs_ALL_inkscape_512";

/// Qualified identifier of `name` inside `dir` under the logo root.
pub fn qualified(dir: &str, name: &str) -> String {
    format!("{LOGO_ROOT}/{dir}/{name}")
}

fn write(base: &Path, relative: &str, contents: &[u8]) {
    let path = base.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

fn write_png(base: &Path, relative: &str, color: [u8; 4]) {
    let path = base.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbaImage::from_pixel(8, 8, Rgba(color)).save(path).unwrap();
}

/// Data tree shared by the app and web tests:
///
/// - letter `A` has a similarity file, `a3.png` is listed but not on disk
/// - letter `B` has logos but no similarity file
/// - category `Cars` lives in the shared `new_logos` directory
/// - category `Broken` has an unusable similarity file
/// - the `All Logos` file exists but is never listed as a category
pub fn populate(base: &Path) {
    let similarities = "data/similarities";
    write(
        base,
        &format!("{similarities}/block4_similarities_pngs_A_inkscape_512.json"),
        br#"{"scores": {"a1.png|a2.png": 0.9, "a1.png|a3.png": 0.5, "a2.png|a3.png": 0.7}}"#,
    );
    write(
        base,
        &format!("{similarities}/block4_similarities_Cars.json"),
        br#"{"scores": {"car1.png|car2.png": 0.8}}"#,
    );
    write(
        base,
        &format!("{similarities}/block4_similarities_Broken.json"),
        br#"{"pairs": []}"#,
    );
    write(
        base,
        &format!("{similarities}/block4_similarities_All Logos.json"),
        br#"{"scores": {}}"#,
    );

    write_png(base, &format!("{LOGO_ROOT}/pngs_A_inkscape_512/a1.png"), [255, 0, 0, 255]);
    write_png(base, &format!("{LOGO_ROOT}/pngs_A_inkscape_512/a2.png"), [0, 255, 0, 255]);
    write_png(base, &format!("{LOGO_ROOT}/pngs_B_inkscape_512/b2.png"), [0, 0, 255, 255]);
    write_png(base, &format!("{LOGO_ROOT}/pngs_B_inkscape_512/b1.png"), [0, 0, 255, 255]);
    write(base, &format!("{LOGO_ROOT}/pngs_B_inkscape_512/notes.txt"), b"not a logo");
    write_png(base, &format!("{LOGO_ROOT}/new_logos/car1.png"), [9, 9, 9, 255]);
    write_png(base, &format!("{LOGO_ROOT}/new_logos/car2.png"), [9, 9, 9, 255]);

    write(base, "data/logos/svgs/A/alpha.svg", b"<svg>alpha</svg>");
    write(base, "data/logos/svgs/A/apple.svg", b"<svg>apple</svg>");
    write(base, "data/logos/svgs/B/beta.svg", b"<svg>beta</svg>");

    write_png(base, "logos/legacy.png", [1, 2, 3, 255]);
    write(base, "static/index.html", b"<html>lookalike</html>");
}

/// App over a populated temp directory with the default config.
pub fn create_app() -> (App, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("failed to create temp dir");
    populate(tmp.path());

    let config = Config::load_with(tmp.path()).expect("failed to load config");
    let app = App::new(config).expect("failed to create app");
    (app, tmp)
}
