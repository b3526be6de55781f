#![no_main]
use libfuzzer_sys::fuzz_target;
use zhome_config::{DriftFit, SampleRow, fit_drift};

fuzz_target!(|data: Vec<(f64, f64)>| {
    let rows: Vec<SampleRow> = data
        .into_iter()
        .filter(|(p, c)| p.is_finite() && c.is_finite())
        .map(|(position, calibration_input)| SampleRow {
            position,
            calibration_input,
        })
        .collect();
    // Degenerate and overflowing inputs must error out, never panic.
    if let Ok(DriftFit::Line { scale_factor, .. }) = fit_drift(&rows) {
        assert!(scale_factor.is_finite());
    }
});
