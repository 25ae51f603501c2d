use unmosaic::image::ImageBuf;
use unmosaic::{DetectorParams, MosaicDetector};

fn main() {
    // Demo stub: runs the detector over a blank synthetic buffer
    let image = ImageBuf::new(640, 480, 3);

    let detector = MosaicDetector::new(DetectorParams::default());
    match detector.detect(&image, 0.5) {
        Ok(detection) => println!(
            "regions={} candidates={} elapsed_ms={:.3}",
            detection.regions.len(),
            detection.diagnostics.candidate_blocks,
            detection.diagnostics.elapsed_ms
        ),
        Err(err) => eprintln!("Error: {err}"),
    }
}
