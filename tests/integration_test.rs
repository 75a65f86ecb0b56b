use docrectify::params::{load_parameter_file, save_parameter_file};
use docrectify::predictor::{FIELD_SHAPE, MASK_SHAPE, TILE_SIZE};
use docrectify::{BackwardMapPredictor, MaskPredictor, ParameterMap, Rectifier, RectifyError};
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use ndarray::{Array4, ArrayD, ArrayView4, IxDyn};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct OnesMask;

impl MaskPredictor for OnesMask {
    fn name(&self) -> &'static str {
        "ones"
    }

    fn predict(&self, _tile: ArrayView4<'_, f32>) -> Result<Array4<f32>, RectifyError> {
        Ok(Array4::ones(MASK_SHAPE))
    }
}

/// Field whose values map each tile pixel onto itself
struct IdentityMap;

impl BackwardMapPredictor for IdentityMap {
    fn name(&self) -> &'static str {
        "identity"
    }

    fn predict(&self, _tile: ArrayView4<'_, f32>) -> Result<Array4<f32>, RectifyError> {
        let step = 286.8 / (TILE_SIZE - 1) as f32;
        Ok(Array4::from_shape_fn(FIELD_SHAPE, |(_, c, y, x)| {
            if c == 0 {
                x as f32 * step
            } else {
                y as f32 * step
            }
        }))
    }
}

/// Returns a wrongly shaped field once, then behaves like `IdentityMap`
struct FlakyMap {
    failed: AtomicBool,
}

impl BackwardMapPredictor for FlakyMap {
    fn name(&self) -> &'static str {
        "flaky"
    }

    fn predict(&self, tile: ArrayView4<'_, f32>) -> Result<Array4<f32>, RectifyError> {
        if !self.failed.swap(true, Ordering::SeqCst) {
            return Ok(Array4::zeros((1, 2, 144, 144)));
        }
        IdentityMap.predict(tile)
    }
}

fn rectifier() -> Rectifier {
    Rectifier::new(Arc::new(OnesMask), Arc::new(IdentityMap))
}

fn page(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        if (y % 16) < 3 && (x % 12) < 8 {
            Rgb([20, 20, 20])
        } else {
            Rgb([235, 230, 225])
        }
    })
}

fn is_binary(image: &GrayImage) -> bool {
    image.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255)
}

#[test]
fn test_all_white_page_stays_white() {
    let white = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));

    let binary = rectifier()
        .rectify_image(DynamicImage::ImageRgb8(white))
        .unwrap();

    assert_eq!(binary.dimensions(), (4, 4));
    assert!(binary.pixels().all(|p| p.0[0] == 255));
}

#[test]
fn test_output_matches_input_size_and_is_binary() {
    let rectifier = rectifier();

    for (width, height) in [(97, 131), (300, 200), (5, 400)] {
        let binary = rectifier
            .rectify_image(DynamicImage::ImageRgb8(page(width, height)))
            .unwrap();

        assert_eq!(binary.dimensions(), (width, height));
        assert!(is_binary(&binary));
    }
}

#[test]
fn test_text_lines_survive_identity_warp() {
    let binary = rectifier()
        .rectify_image(DynamicImage::ImageRgb8(page(240, 160)))
        .unwrap();

    let dark = binary.pixels().filter(|p| p.0[0] == 0).count();
    let total = (240 * 160) as usize;
    assert!(dark > 0, "text should remain dark");
    assert!(dark < total / 2, "paper should remain white, {} dark pixels", dark);
}

#[test]
fn test_shape_mismatch_does_not_poison_the_rectifier() {
    let rectifier = Rectifier::new(
        Arc::new(OnesMask),
        Arc::new(FlakyMap {
            failed: AtomicBool::new(false),
        }),
    );

    let first = rectifier.rectify_image(DynamicImage::ImageRgb8(page(64, 48)));
    match first {
        Err(RectifyError::ShapeMismatch {
            expected, actual, ..
        }) => {
            assert_eq!(expected, FIELD_SHAPE.to_vec());
            assert_eq!(actual, vec![1, 2, 144, 144]);
        }
        other => panic!("expected ShapeMismatch, got {:?}", other.map(|i| i.dimensions())),
    }

    let second = rectifier
        .rectify_image(DynamicImage::ImageRgb8(page(64, 48)))
        .unwrap();
    assert_eq!(second.dimensions(), (64, 48));
}

#[test]
fn test_rectify_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("photo.png");
    page(120, 90).save(&path).unwrap();

    let output = rectifier().rectify_path(&path).unwrap();

    assert_eq!(output.image.dimensions(), (120, 90));
    assert_eq!(output.steps[0].name, "load");
    assert_eq!(output.steps.len(), 7);
    assert_eq!(output.mask_coverage, 1.0);
}

#[test]
fn test_grayscale_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gray.png");
    GrayImage::from_pixel(10, 10, image::Luma([128])).save(&path).unwrap();

    let result = rectifier().rectify(&path);

    assert!(matches!(result, Err(RectifyError::ImageLoad(_))));
}

#[test]
fn test_missing_file_is_rejected() {
    let result = rectifier().rectify(std::path::Path::new("/no/such/photo.jpg"));
    assert!(matches!(result, Err(RectifyError::ImageLoad(_))));
}

#[test]
fn test_rectifier_is_shared_across_threads() {
    let rectifier = Arc::new(rectifier());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let rectifier = Arc::clone(&rectifier);
            std::thread::spawn(move || {
                rectifier
                    .rectify_image(DynamicImage::ImageRgb8(page(40 + i, 30)))
                    .map(|img| img.dimensions())
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap().unwrap(), (40 + i as u32, 30));
    }
}

fn array(shape: &[usize], value: f32) -> ArrayD<f32> {
    ArrayD::from_elem(IxDyn(shape), value)
}

#[test]
fn test_merge_params_command() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("checkpoint.json");
    let into = dir.path().join("seg.json");
    let output = dir.path().join("merged.json");

    save_parameter_file(
        &source,
        &ParameterMap::from([
            ("model.enc.weight".to_string(), array(&[2, 2], 1.0)),
            ("model.aux.scale".to_string(), array(&[1], 3.0)),
        ]),
    )
    .unwrap();
    save_parameter_file(
        &into,
        &ParameterMap::from([
            ("enc.weight".to_string(), array(&[2, 2], 0.0)),
            ("dec.bias".to_string(), array(&[3], 0.5)),
        ]),
    )
    .unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_docrectify"))
        .args(["--log-level", "warn", "merge-params", "--strip-prefix", "6"])
        .arg("--source")
        .arg(&source)
        .arg("--into")
        .arg(&into)
        .arg("--output")
        .arg(&output)
        .output()
        .expect("Failed to run docrectify");
    assert!(status.status.success(), "{}", String::from_utf8_lossy(&status.stderr));

    let report: serde_json::Value = serde_json::from_slice(&status.stdout).unwrap();
    assert_eq!(report["updated"], serde_json::json!(["enc.weight"]));
    assert_eq!(report["untouched"], 1);

    let merged = load_parameter_file(&output).unwrap();
    assert_eq!(merged.len(), 2);
    assert_eq!(merged["enc.weight"], array(&[2, 2], 1.0));
    assert_eq!(merged["dec.bias"], array(&[3], 0.5));
}

#[test]
fn test_merge_params_command_rejects_shape_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("checkpoint.json");
    let into = dir.path().join("bm.json");
    let output = dir.path().join("merged.json");

    save_parameter_file(
        &source,
        &ParameterMap::from([("head.weight".to_string(), array(&[4], 1.0))]),
    )
    .unwrap();
    save_parameter_file(
        &into,
        &ParameterMap::from([("head.weight".to_string(), array(&[2, 2], 0.0))]),
    )
    .unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_docrectify"))
        .args(["--log-level", "error", "merge-params"])
        .arg("--source")
        .arg(&source)
        .arg("--into")
        .arg(&into)
        .arg("--output")
        .arg(&output)
        .status()
        .expect("Failed to run docrectify");

    assert!(!status.success());
    assert!(!output.exists());
}

#[test]
fn test_rectify_command_fails_without_models() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("photo.png");
    page(32, 32).save(&input).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_docrectify"))
        .args(["--log-level", "error", "rectify"])
        .arg(&input)
        .arg("--output-dir")
        .arg(dir.path().join("out"))
        .arg("--mask-model")
        .arg(dir.path().join("missing-seg.rten"))
        .arg("--backward-map-model")
        .arg(dir.path().join("missing-bm.rten"))
        .status()
        .expect("Failed to run docrectify");

    assert!(!status.success());
}
