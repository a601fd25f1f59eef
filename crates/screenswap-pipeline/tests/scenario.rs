// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end scenario: detect a green square in a synthetic photo and
// composite a solid replacement into it.

use image::{Rgb, RgbImage};
use screenswap_core::{AdjustmentParameters, CornerSet, Detection, PhotometricMode, Point};
use screenswap_pipeline::{Pipeline, codec};

const BACKGROUND: Rgb<u8> = Rgb([128, 128, 128]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);

fn base() -> RgbImage {
    RgbImage::from_fn(500, 500, |x, y| {
        if (100..=400).contains(&x) && (100..=400).contains(&y) {
            Rgb([0, 255, 0])
        } else {
            BACKGROUND
        }
    })
}

fn assert_near(got: Point, want: (f64, f64)) {
    assert!(
        (got.x - want.0).abs() <= 3.0 && (got.y - want.1).abs() <= 3.0,
        "corner {got:?} not within 3 px of {want:?}"
    );
}

#[test]
fn green_square_is_detected_within_three_pixels() {
    let detection = Pipeline::default().detect(&base()).unwrap();
    assert_eq!((detection.width, detection.height), (500, 500));
    assert_near(detection.corners.top_left(), (100.0, 100.0));
    assert_near(detection.corners.top_right(), (400.0, 100.0));
    assert_near(detection.corners.bottom_right(), (400.0, 400.0));
    assert_near(detection.corners.bottom_left(), (100.0, 400.0));
}

#[test]
fn default_render_puts_replacement_inside_and_keeps_base_outside() {
    let replacement = RgbImage::from_pixel(200, 200, RED);
    let result = Pipeline::default()
        .render(&base(), None, &replacement, &AdjustmentParameters::default())
        .unwrap();

    assert!(result.detected);
    assert_eq!(result.image.dimensions(), (500, 500));
    assert_eq!(*result.image.get_pixel(250, 250), RED);
    assert_eq!(*result.image.get_pixel(10, 10), BACKGROUND);
}

#[test]
fn detection_json_feeds_back_into_render() {
    let pipeline = Pipeline::default();
    let detection = pipeline.detect(&base()).unwrap();
    let json = serde_json::to_string(&detection).unwrap();
    let parsed: Detection = serde_json::from_str(&json).unwrap();

    let corners: CornerSet = serde_json::to_string(&parsed.corners)
        .unwrap()
        .parse()
        .unwrap();
    let replacement = RgbImage::from_pixel(64, 64, RED);
    let result = pipeline
        .render(&base(), Some(corners), &replacement, &AdjustmentParameters::default())
        .unwrap();
    assert!(!result.detected);
    assert_eq!(*result.image.get_pixel(250, 250), RED);
}

#[test]
fn auto_match_darkens_bright_replacement_toward_scene() {
    let replacement = RgbImage::from_pixel(200, 200, Rgb([250, 250, 250]));
    let params = AdjustmentParameters {
        photometric: PhotometricMode::Auto,
        ..AdjustmentParameters::default()
    };
    let result = Pipeline::default()
        .render(&base(), None, &replacement, &params)
        .unwrap();
    let [r, g, b] = result.image.get_pixel(250, 250).0;
    for v in [r, g, b] {
        assert!((v as i32 - 128).abs() <= 2, "channel {v} not matched to the gray surround");
    }
    assert_eq!(*result.image.get_pixel(10, 10), BACKGROUND);
}

#[test]
fn png_round_trip_through_bytes() {
    let pipeline = Pipeline::default();
    let base_png = codec::encode_png(&base()).unwrap();
    let replacement_png = codec::encode_png(&RgbImage::from_pixel(40, 40, RED)).unwrap();
    let out = pipeline
        .render_bytes(&base_png, None, &replacement_png, &AdjustmentParameters::default())
        .unwrap();
    let image = codec::decode(&out).unwrap();
    assert_eq!(*image.get_pixel(250, 250), RED);

    let preview = pipeline.preview(&image).unwrap();
    assert_eq!((preview.width, preview.height), (500, 500));
    assert_eq!(preview.scale, 1.0);
}
