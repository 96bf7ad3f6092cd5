//! End-to-end checks over the public API that need no model or server.

use image::{Rgb, RgbImage};
use std::path::Path;
use tempfile::tempdir;
use vista_core::annotate::{open_image, ClickOutcome};
use vista_core::pipeline::ImageLoader;
use vista_core::{render_overlay, Annotator, Config, Direction, Quadrilateral};

fn write_png(path: &Path, width: u32, height: u32) {
    RgbImage::from_pixel(width, height, Rgb([10, 200, 30]))
        .save(path)
        .unwrap();
}

#[test]
fn annotate_save_and_reload() {
    let dir = tempdir().unwrap();
    let image_path = dir.path().join("scan.png");
    write_png(&image_path, 200, 100);

    let image = open_image(&image_path).unwrap();
    let config = Config::default();
    let mut annotator = Annotator::new(image.width(), image.height(), config.annotator.clone());

    // Work at 2x-ish zoom, as a user looking at a small image would.
    annotator.zoom_in();
    annotator.zoom_in();
    let z = annotator.zoom();
    for (x, y) in [(10.0, 10.0), (190.0, 12.0), (188.0, 90.0), (12.0, 88.0)] {
        assert!(matches!(
            annotator.click(x * z, y * z),
            ClickOutcome::Added(_)
        ));
    }
    assert_eq!(annotator.click(100.0 * z, 50.0 * z), ClickOutcome::Refused);

    // Select the third point and push it one view pixel right.
    annotator.click(188.0 * z + 2.0, 90.0 * z - 2.0);
    assert_eq!(annotator.selected(), Some(2));
    annotator.nudge(Direction::Right);

    let preview = render_overlay(&image, &annotator);
    assert_eq!(preview.width(), (200.0 * z).round() as u32);

    let quad = annotator.quad().unwrap();
    assert_eq!(quad.corners()[0], [10, 10]);
    assert_eq!(quad.corners()[2], [189, 90]);

    let out = dir.path().join("points.json");
    quad.save(&out).unwrap();
    let text = std::fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("[[10,10],"));
    assert_eq!(Quadrilateral::load(&out).unwrap(), quad);

    let mut reopened = Annotator::new(200, 100, config.annotator);
    reopened.load_quad(&quad);
    assert_eq!(reopened.quad().unwrap(), quad);
}

#[test]
fn save_refused_until_four_points() {
    let mut annotator = Annotator::new(50, 50, Config::default().annotator);
    annotator.click(5.0, 5.0);
    annotator.click(40.0, 5.0);
    annotator.click(40.0, 40.0);
    let err = annotator.quad().unwrap_err();
    assert!(err.to_string().contains("have 3"));
}

#[tokio::test]
async fn loader_discovers_and_inspects_directory() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("nested");
    std::fs::create_dir(&nested).unwrap();
    write_png(&dir.path().join("a.png"), 40, 20);
    write_png(&nested.join("b.PNG"), 16, 16);
    std::fs::write(dir.path().join("readme.txt"), b"not an image").unwrap();

    let mut config = Config::default();
    let loader = ImageLoader::new(&config);
    let files = loader.discover(dir.path());
    assert_eq!(files.len(), 2);

    let stats = loader.stats(&files[0].path).await.unwrap();
    assert_eq!(stats.width, 40);
    assert_eq!(stats.height, 20);
    assert_eq!(stats.format, "png");
    assert!((stats.aspect_ratio - 2.0).abs() < 1e-9);

    config.processing.recursive = false;
    let flat = ImageLoader::new(&config).discover(dir.path());
    assert_eq!(flat.len(), 1);
}

#[test]
fn config_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = Config::default();
    config.store.backend = vista_core::StoreBackend::Weaviate;
    config.store.weaviate.default_limit = 7;
    std::fs::write(&path, config.to_toml().unwrap()).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded.store.backend, vista_core::StoreBackend::Weaviate);
    assert_eq!(loaded.store.weaviate.default_limit, 7);
}
