use serde::Serialize;
use unmosaic::config;
use unmosaic::diagnostics::RestoreDiagnostics;
use unmosaic::image::io::{load_mask, load_rgb8, save_rgb8, write_json_file};
use unmosaic::types::CensorRegion;
use unmosaic::{MosaicRestorer, NeighborhoodFill};

#[derive(Serialize)]
struct RestoreReport<'a> {
    regions: &'a [CensorRegion],
    fallback_used: bool,
    partial: bool,
    elapsed_ms: f64,
    diagnostics: &'a RestoreDiagnostics,
}

fn main() {
    env_logger::init();
    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let config = config::parse_cli("restore_demo")?;

    let image = load_rgb8(&config.input_path)?;
    let mask = match &config.mask_path {
        Some(path) => Some(load_mask(path)?),
        None => None,
    };

    let mut restorer = MosaicRestorer::new(config.params.clone());
    let mut inpainter = NeighborhoodFill::default();

    let result = restorer
        .process(&image, mask.as_ref(), &mut inpainter, None)
        .map_err(|e| e.to_string())?;

    println!(
        "regions={} fallback={} partial={} elapsed_ms={:.1}",
        result.regions.len(),
        result.fallback_used,
        result.partial,
        result.elapsed_ms
    );
    for region in &result.regions {
        println!(
            "  region ({}, {}) {}x{} confidence={:.2}",
            region.bbox.x, region.bbox.y, region.bbox.w, region.bbox.h, region.confidence
        );
    }

    if let Some(path) = &config.output.image_out {
        save_rgb8(&result.image, path)?;
        println!("restored image written to {}", path.display());
    }

    if let Some(path) = &config.output.json_out {
        let report = RestoreReport {
            regions: &result.regions,
            fallback_used: result.fallback_used,
            partial: result.partial,
            elapsed_ms: result.elapsed_ms,
            diagnostics: &result.diagnostics,
        };
        write_json_file(path, &report)?;
        println!("JSON report written to {}", path.display());
    }

    Ok(())
}
