//! Tone curve fitting and inverse-gamma LUT generation

use tracing::{debug, info, warn};

use crate::config::GammaConfig;
use crate::constants::tone;
use crate::error::{CalibrationError, Result};
use crate::numeric::{minimize, SimplexOptions};
use crate::session::ToneCurveModel;
use crate::{Solved, WarningKind};

/// Fits `luminance = signal^gamma` to measured samples
#[derive(Debug, Clone, Default)]
pub struct GammaSolver {
    config: GammaConfig,
}

impl GammaSolver {
    pub fn new(config: GammaConfig) -> Self {
        Self { config }
    }

    /// Fit gamma and derive the inverse LUT.
    ///
    /// # Arguments
    ///
    /// * `samples` - `(signal, luminance)` pairs, both in [0, 1]
    ///
    /// # Returns
    ///
    /// The fitted [`ToneCurveModel`]. If the fit does not converge, or the
    /// samples cannot determine gamma, the model uses gamma 2.2 and carries a
    /// [`WarningKind::GammaFitFallback`].
    ///
    /// # Errors
    ///
    /// `InvalidInputShape` if any sample does not have exactly 2 components.
    pub fn solve<R: AsRef<[f64]>>(&self, samples: &[R]) -> Result<Solved<ToneCurveModel>> {
        let mut signal = Vec::with_capacity(samples.len());
        let mut luminance = Vec::with_capacity(samples.len());
        for (index, sample) in samples.iter().enumerate() {
            match *sample.as_ref() {
                [s, l] => {
                    signal.push(s);
                    luminance.push(l);
                }
                ref other => {
                    return Err(CalibrationError::InvalidInputShape {
                        index,
                        expected: 2,
                        found: other.len(),
                    })
                }
            }
        }

        let (gamma, warnings) = match self.fit(&signal, &luminance) {
            Ok(gamma) => (gamma, Vec::new()),
            Err(reason) => {
                warn!(
                    reason = %reason,
                    fallback = tone::DEFAULT_GAMMA,
                    "Tone curve fit failed, using default gamma"
                );
                (
                    tone::DEFAULT_GAMMA,
                    vec![WarningKind::GammaFitFallback { reason }],
                )
            }
        };

        let model = ToneCurveModel::from_gamma(gamma)?;
        info!(gamma = model.gamma(), samples = samples.len(), "Tone curve model built");
        Ok(Solved::with_warnings(model, warnings))
    }

    /// Least-squares gamma, or the reason the fit is not usable
    fn fit(&self, signal: &[f64], luminance: &[f64]) -> std::result::Result<f64, String> {
        if signal.is_empty() {
            return Err("no samples".to_string());
        }
        if signal.iter().chain(luminance).any(|v| !v.is_finite()) {
            return Err("non-finite sample".to_string());
        }

        let options = SimplexOptions {
            sd_tolerance: self.config.tolerance,
            max_iterations: self.config.max_iterations as u64,
        };
        let min = minimize(
            |p| residual_sum_squares(signal, luminance, p[0]),
            &[self.config.initial_gamma],
            options,
        )
        .map_err(|e| e.to_string())?;

        let gamma = min.x[0];
        if !min.converged {
            return Err(format!(
                "iteration limit reached at gamma = {gamma:.6} after {} iterations",
                min.iterations
            ));
        }
        if !(gamma.is_finite() && gamma > 0.0) {
            return Err(format!("fit produced gamma = {gamma}"));
        }
        if sensitivity(signal, gamma) <= MIN_SENSITIVITY {
            return Err("samples do not constrain gamma".to_string());
        }
        debug!(
            gamma,
            rss = min.value,
            iterations = min.iterations,
            "Tone curve fit converged"
        );
        Ok(gamma)
    }
}

/// Below this sum of squared derivatives the samples carry no information
/// about gamma (every signal is 0 or 1)
const MIN_SENSITIVITY: f64 = 1e-12;

fn residual_sum_squares(signal: &[f64], luminance: &[f64], gamma: f64) -> f64 {
    if gamma.is_nan() || gamma <= 0.0 {
        return f64::INFINITY;
    }
    signal
        .iter()
        .zip(luminance)
        .map(|(&s, &l)| (s.powf(gamma) - l).powi(2))
        .sum()
}

/// Sum of squared derivatives d/dγ s^γ = s^γ ln s over positive signals
fn sensitivity(signal: &[f64], gamma: f64) -> f64 {
    signal
        .iter()
        .filter(|&&s| s > 0.0)
        .map(|&s| (s.powf(gamma) * s.ln()).powi(2))
        .sum()
}
