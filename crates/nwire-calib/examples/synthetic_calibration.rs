//! Calibrate from a synthetic sweep and write the report as JSON.
//!
//! Usage: `synthetic_calibration [config.json]`. Without a config the built-in
//! reference phantom is used. Log level comes from `NWIRE_LOG`.

use std::{env, fs};

use nwire_calib::core::synthetic::{reference_nwire_phantom, SyntheticRig};
use nwire_calib::{AcquiredFrame, FrameDots, NWireCalibConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = match env::args().nth(1) {
        Some(path) => NWireCalibConfig::load_json(path)?,
        None => NWireCalibConfig {
            phantom: reference_nwire_phantom(),
            ..NWireCalibConfig::default()
        },
    };
    let pipeline = config.build_pipeline()?;

    let rig = SyntheticRig::reference();
    let to_acquired = |count: usize| -> Vec<AcquiredFrame> {
        rig.sweep(&config.phantom, count)
            .into_iter()
            .map(|f| AcquiredFrame {
                dots: FrameDots {
                    dots: f.dots,
                    mm_per_pixel: rig.mm_per_pixel,
                },
                probe_to_reference: Some(f.probe_to_reference),
                phantom_to_reference: Some(f.phantom_to_reference),
            })
            .collect()
    };
    let calibration = to_acquired(40);
    let validation = to_acquired(11);

    let result = pipeline.run(&validation, &calibration)?;
    println!("image-to-probe:{}", result.image_to_probe);
    println!(
        "3-D error {:.6} mm, 2-D rms {:.6} px, {} outliers",
        result.calibration.errors_3d.stats.mean,
        result.calibration.errors_2d.rms,
        result.outliers.len()
    );

    let output_path = config.output_path();
    fs::write(&output_path, serde_json::to_string_pretty(&result)?)?;
    println!("wrote calibration report to {}", output_path.display());
    Ok(())
}

fn init_logging() {
    #[cfg(feature = "tracing")]
    nwire_calib::core::init_tracing(false);
    #[cfg(not(feature = "tracing"))]
    {
        let _ = nwire_calib::core::init_from_env();
    }
}
