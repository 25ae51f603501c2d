use serde::Serialize;
use unmosaic::config;
use unmosaic::diagnostics::DetectionDiagnostics;
use unmosaic::image::io::{load_rgb8, save_mask, write_json_file};
use unmosaic::types::CensorRegion;
use unmosaic::MosaicDetector;

#[derive(Serialize)]
struct DetectReport<'a> {
    regions: &'a [CensorRegion],
    masked_pixels: usize,
    diagnostics: &'a DetectionDiagnostics,
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config = config::parse_cli("detect_demo")?;

    let image = load_rgb8(&config.input_path)?;
    let detector = MosaicDetector::new(config.params.detector.clone());
    let detection = detector
        .detect(&image, config.params.sensitivity)
        .map_err(|e| e.to_string())?;

    println!(
        "{} region(s), {} candidate blocks, {:.1} ms",
        detection.regions.len(),
        detection.diagnostics.candidate_blocks,
        detection.diagnostics.elapsed_ms
    );
    for region in &detection.regions {
        println!(
            "  region ({}, {}) {}x{} confidence={:.2}",
            region.bbox.x, region.bbox.y, region.bbox.w, region.bbox.h, region.confidence
        );
    }

    if let Some(path) = &config.output.mask_out {
        save_mask(&detection.mask, path)?;
        println!("mask written to {}", path.display());
    }

    if let Some(path) = &config.output.json_out {
        let report = DetectReport {
            regions: &detection.regions,
            masked_pixels: detection.mask.count_set(),
            diagnostics: &detection.diagnostics,
        };
        write_json_file(path, &report)?;
        println!("JSON report written to {}", path.display());
    }

    Ok(())
}
