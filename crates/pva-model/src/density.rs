use statrs::distribution::{Continuous, Normal};

/// Log density of `N(mean, sd²)` at `x`; `-inf` for invalid scale.
pub fn normal_ln_pdf(x: f64, mean: f64, sd: f64) -> f64 {
    if sd.is_nan() || sd <= 0.0 {
        return f64::NEG_INFINITY;
    }
    match Normal::new(mean, sd) {
        Ok(dist) => dist.ln_pdf(x),
        Err(_) => f64::NEG_INFINITY,
    }
}

/// Unnormalised log density of `N(mean, sd²)` restricted to `x > 0`.
pub fn positive_normal_ln_pdf(x: f64, mean: f64, sd: f64) -> f64 {
    if x > 0.0 {
        normal_ln_pdf(x, mean, sd)
    } else {
        f64::NEG_INFINITY
    }
}

/// Log density of `Uniform(lower, upper)` at `x`.
pub fn uniform_ln_pdf(x: f64, lower: f64, upper: f64) -> f64 {
    if x > lower && x < upper {
        -(upper - lower).ln()
    } else {
        f64::NEG_INFINITY
    }
}
