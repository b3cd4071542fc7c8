use abanim_core::{load_manifest, write_package, PixelFormat, Rgb, Scaling};
use abanim_decoder::{load_package_file, PlaybackSchedule};
use abanim_encoder::{extract, ExtractConfig, FrameFormat};
use image::codecs::gif::GifEncoder;
use image::{Delay, Frame, Rgba, RgbaImage};
use std::fs::File;
use std::path::Path;
use tempfile::tempdir;

fn write_gif(path: &Path) {
    let file = File::create(path).unwrap();
    let mut encoder = GifEncoder::new(file);
    for (color, delay_ms) in [(Rgba([255, 0, 0, 255]), 80), (Rgba([0, 0, 255, 255]), 120)] {
        let image = RgbaImage::from_pixel(8, 4, color);
        encoder
            .encode_frame(Frame::from_parts(
                image,
                0,
                0,
                Delay::from_numer_denom_ms(delay_ms, 1),
            ))
            .unwrap();
    }
}

fn config(format: FrameFormat) -> ExtractConfig {
    ExtractConfig {
        width: 16,
        height: 16,
        fps: 25,
        scaling: Scaling::Letterbox,
        background: Rgb::new(0, 255, 0),
        format,
        threads: 2,
        ..ExtractConfig::default()
    }
}

fn round_trip(format: FrameFormat, expected_format: PixelFormat) {
    let dir = tempdir().unwrap();
    let input = dir.path().join("intro.gif");
    write_gif(&input);
    let frames_dir = dir.path().join("frames");

    let summary = extract(&input, &frames_dir, None, &config(format)).unwrap();
    assert_eq!(summary.frame_paths.len(), 2);
    assert!(summary.frame_paths.iter().all(|p| p.exists()));
    assert_eq!(
        summary.manifest_path,
        frames_dir.join("sequence.anim.json")
    );

    let manifest = load_manifest(&summary.manifest_path).unwrap();
    assert_eq!(manifest, summary.manifest);
    assert_eq!(manifest.frames[0].duration_us, 80_000);
    assert_eq!(manifest.frames[1].duration_us, 120_000);
    assert_eq!(manifest.frame_duration_us, 40_000);

    let output = dir.path().join("boot.abanim");
    let header = write_package(&manifest, &frames_dir, &output).unwrap();
    assert_eq!(header.frame_count, 2);
    assert_eq!(header.target_fps, 25);

    let loaded = load_package_file(&output).unwrap();
    assert_eq!(loaded.pixel_format, expected_format);
    assert_eq!((loaded.width, loaded.height), (16, 16));
    assert_eq!(loaded.frame_count(), 2);
    assert_eq!(loaded.manifest, manifest);

    // 8x4 letterboxed into 16x16 leaves green bars above and below
    let first = &loaded.frame(0).unwrap().image;
    assert_eq!(*first.get_pixel(8, 0), Rgba([0, 255, 0, 255]));
    assert!(first.get_pixel(8, 8)[0] > 200);
    assert!(loaded.frames.iter().all(|f| f.image.pixels().all(|p| p[3] == 255)));

    let schedule = PlaybackSchedule::from_package(&loaded);
    assert_eq!(schedule.pass_duration_us(), 200_000);
    assert_eq!(schedule.total_duration_us(), Some(200_000));
}

#[test_log::test]
fn test_bmp_pipeline_round_trip() {
    round_trip(FrameFormat::Bmp, PixelFormat::Encoded);
}

#[test_log::test]
fn test_raw_pipeline_round_trip() {
    round_trip(FrameFormat::Raw, PixelFormat::Bgra32);
}

#[test]
fn test_custom_manifest_path_and_prefix() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("logo.png");
    RgbaImage::from_pixel(4, 4, Rgba([10, 20, 30, 255]))
        .save(&input)
        .unwrap();

    let manifest_path = dir.path().join("logo.json");
    let config = ExtractConfig {
        prefix: "logo_".to_string(),
        ..config(FrameFormat::Raw)
    };
    let summary = extract(&input, &dir.path().join("out"), Some(&manifest_path), &config).unwrap();

    assert_eq!(summary.manifest_path, manifest_path);
    assert_eq!(
        summary.manifest.frames[0].normalized_path(),
        "logo_0001.raw"
    );
    assert_eq!(summary.manifest.frames[0].duration_us, 40_000);
    assert_eq!(
        std::fs::metadata(&summary.frame_paths[0]).unwrap().len(),
        16 * 16 * 4
    );
}
