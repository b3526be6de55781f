//! Recorded homing sessions.
//!
//! A recording is a CSV with one row per homing move:
//!
//! ```text
//! position,calibration_input
//! 0.0500,0.0
//! 17.9750,0.0
//! ```
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct SampleRow {
    pub position: f64,
    pub calibration_input: f64,
}

/// Drift constants estimated from a recording.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriftFit {
    /// The calibration input varied: `offset = base_offset + scale_factor * input`.
    Line {
        base_offset: f64,
        scale_factor: f64,
        rms: f64,
    },
    /// The calibration input never changed, so only the offset at that input
    /// is observable.
    Constant {
        input: f64,
        expected_offset: f64,
        rms: f64,
    },
}

pub fn load_samples_csv(path: &std::path::Path) -> eyre::Result<Vec<SampleRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open recording CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["position", "calibration_input"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "recording CSV must have headers 'position,calibration_input', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<SampleRow>().enumerate() {
        match rec {
            Ok(row) if row.position.is_finite() && row.calibration_input.is_finite() => {
                rows.push(row);
            }
            Ok(_) => eyre::bail!("invalid CSV row {}: values must be finite", idx + 2),
            Err(e) => eyre::bail!("invalid CSV row {}: {}", idx + 2, e),
        }
    }
    if rows.is_empty() {
        eyre::bail!("recording CSV {:?} has no samples", path);
    }
    Ok(rows)
}

/// Estimate the per-move drift from consecutive position deltas.
///
/// Each delta `position[i] - position[i-1]` is paired with the calibration
/// input in effect for move `i`. An ordinary least-squares line is fitted,
/// points with |residual| > 2σ are rejected and the line refitted once.
pub fn fit_drift(rows: &[SampleRow]) -> eyre::Result<DriftFit> {
    if rows.len() < 3 {
        eyre::bail!(
            "drift fit requires at least three samples, got {}",
            rows.len()
        );
    }
    let pts: Vec<(f64, f64)> = rows
        .windows(2)
        .map(|w| (w[1].calibration_input, w[1].position - w[0].position))
        .collect();

    let n = pts.len() as f64;
    let mean_x = pts.iter().map(|p| p.0).sum::<f64>() / n;
    let sxx: f64 = pts.iter().map(|p| (p.0 - mean_x).powi(2)).sum();

    if sxx == 0.0 {
        let mean_d = pts.iter().map(|p| p.1).sum::<f64>() / n;
        let rms = (pts.iter().map(|p| (p.1 - mean_d).powi(2)).sum::<f64>() / n).sqrt();
        return Ok(DriftFit::Constant {
            input: mean_x,
            expected_offset: mean_d,
            rms,
        });
    }

    let (a0, b0) = ols(&pts)?;
    let sumsq: f64 = pts
        .iter()
        .map(|(x, y)| (y - (a0 * x + b0)).powi(2))
        .sum();
    let rms0 = (sumsq / n).sqrt();

    let (a, b) = robust_refit(&pts, a0, b0, rms0, 2.0).unwrap_or((a0, b0));
    let rms = (pts.iter().map(|(x, y)| (y - (a * x + b)).powi(2)).sum::<f64>() / n).sqrt();

    Ok(DriftFit::Line {
        base_offset: b,
        scale_factor: a,
        rms,
    })
}

/// Fit y = a*x + b over all points.
fn ols(pts: &[(f64, f64)]) -> eyre::Result<(f64, f64)> {
    let n = pts.len() as f64;
    let mean_x = pts.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pts.iter().map(|p| p.1).sum::<f64>() / n;
    let mut sxx = 0.0f64;
    let mut sxy = 0.0f64;
    for (x, y) in pts {
        let dx = x - mean_x;
        sxx += dx * dx;
        sxy += dx * (y - mean_y);
    }
    if !sxx.is_finite() || sxx == 0.0 {
        eyre::bail!("drift fit cannot determine slope (degenerate input variance)");
    }
    let a = sxy / sxx;
    if !a.is_finite() {
        eyre::bail!("drift fit produced non-finite slope");
    }
    Ok((a, mean_y - a * mean_x))
}

/// Refit over inliers with |residual| <= k * rms. Returns None when nothing
/// was rejected, fewer than two inliers remain, or the inliers are degenerate.
fn robust_refit(pts: &[(f64, f64)], a0: f64, b0: f64, rms: f64, k: f64) -> Option<(f64, f64)> {
    if !(rms.is_finite() && rms > 0.0) {
        return None;
    }
    let thr = k * rms;
    let inliers: Vec<(f64, f64)> = pts
        .iter()
        .copied()
        .filter(|(x, y)| (y - (a0 * x + b0)).abs() <= thr)
        .collect();
    if inliers.len() < 2 || inliers.len() == pts.len() {
        return None;
    }
    ols(&inliers).ok()
}
