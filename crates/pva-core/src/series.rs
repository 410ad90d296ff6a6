//! Annual log-abundance series consumed by every model fit.

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, PvaError};

/// Number of observed years in the reference series.
pub const DEFAULT_OBSERVED: usize = 29;
/// Number of trailing forecast placeholders.
pub const DEFAULT_FORECAST: usize = 20;

/// Expected layout of a series: `observed` leading values followed by
/// `forecast` absent placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesShape {
    /// Number of leading years carrying an observation (H).
    pub observed: usize,
    /// Number of trailing years without an observation.
    pub forecast: usize,
}

impl SeriesShape {
    /// Creates a new shape descriptor.
    pub const fn new(observed: usize, forecast: usize) -> Self {
        Self { observed, forecast }
    }

    /// Total number of time steps (T).
    pub const fn total(&self) -> usize {
        self.observed + self.forecast
    }
}

impl Default for SeriesShape {
    fn default() -> Self {
        Self::new(DEFAULT_OBSERVED, DEFAULT_FORECAST)
    }
}

/// One `(year, value-or-absent)` entry of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    /// Calendar year.
    pub year: i32,
    /// Log abundance, absent for forecast years.
    pub value: Option<f64>,
}

/// Immutable, validated log-abundance series.
///
/// Indices are zero-based: index `0` is the first year, `horizon() - 1` the
/// last observed year and `len() - 1` the final forecast step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeries", into = "RawSeries")]
pub struct TimeSeries {
    points: Vec<SeriesPoint>,
    shape: SeriesShape,
}

#[derive(Serialize, Deserialize)]
struct RawSeries {
    points: Vec<SeriesPoint>,
    shape: SeriesShape,
}

impl TryFrom<RawSeries> for TimeSeries {
    type Error = PvaError;

    fn try_from(raw: RawSeries) -> Result<Self, Self::Error> {
        TimeSeries::new(raw.points, raw.shape)
    }
}

impl From<TimeSeries> for RawSeries {
    fn from(series: TimeSeries) -> Self {
        RawSeries {
            points: series.points,
            shape: series.shape,
        }
    }
}

impl TimeSeries {
    /// Validates and wraps a list of points against the expected shape.
    pub fn new(points: Vec<SeriesPoint>, shape: SeriesShape) -> Result<Self, PvaError> {
        if shape.observed < 2 {
            return Err(PvaError::Configuration(
                ErrorInfo::new("series-shape", "at least two observed years are required")
                    .with_context("observed", shape.observed.to_string()),
            ));
        }
        if points.len() != shape.total() {
            return Err(PvaError::Configuration(
                ErrorInfo::new("series-length", "series length does not match the expected shape")
                    .with_context("expected", shape.total().to_string())
                    .with_context("actual", points.len().to_string()),
            ));
        }
        for (index, pair) in points.windows(2).enumerate() {
            if pair[1].year <= pair[0].year {
                return Err(PvaError::Configuration(
                    ErrorInfo::new("series-years", "years must be strictly increasing")
                        .with_context("index", (index + 1).to_string())
                        .with_context("year", pair[1].year.to_string()),
                ));
            }
        }
        for (index, point) in points.iter().enumerate() {
            let expect_observed = index < shape.observed;
            match (expect_observed, point.value) {
                (true, Some(value)) if !value.is_finite() => {
                    return Err(PvaError::Configuration(
                        ErrorInfo::new("series-value", "observed value is not finite")
                            .with_context("year", point.year.to_string()),
                    ));
                }
                (true, None) => {
                    return Err(PvaError::Configuration(
                        ErrorInfo::new("series-gap", "observed years must all carry a value")
                            .with_context("year", point.year.to_string())
                            .with_hint("the forecast horizon must be the trailing block"),
                    ));
                }
                (false, Some(_)) => {
                    return Err(PvaError::Configuration(
                        ErrorInfo::new("series-horizon", "forecast years must be absent")
                            .with_context("year", point.year.to_string())
                            .with_hint("the forecast horizon must be the trailing block"),
                    ));
                }
                _ => {}
            }
        }
        Ok(Self { points, shape })
    }

    /// Builds a series of consecutive years starting at `start_year` from the
    /// observed values, appending `shape.forecast` absent years.
    pub fn from_observed(
        start_year: i32,
        observed: &[f64],
        shape: SeriesShape,
    ) -> Result<Self, PvaError> {
        let points = (0..observed.len() + shape.forecast)
            .map(|offset| SeriesPoint {
                year: start_year + offset as i32,
                value: observed.get(offset).copied(),
            })
            .collect();
        Self::new(points, shape)
    }

    /// Total number of time steps (T).
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// A validated series is never empty.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of observed years (H).
    pub fn horizon(&self) -> usize {
        self.shape.observed
    }

    /// Layout of the series.
    pub fn shape(&self) -> SeriesShape {
        self.shape
    }

    /// Observation at `index`, `None` for forecast steps or out of range.
    pub fn value(&self, index: usize) -> Option<f64> {
        self.points.get(index).and_then(|point| point.value)
    }

    /// Observed prefix as a plain slice of values.
    pub fn observed(&self) -> Vec<f64> {
        self.points.iter().filter_map(|point| point.value).collect()
    }

    /// First observation, which anchors the prior of the first latent state.
    pub fn first(&self) -> f64 {
        // Validation guarantees at least two observed values.
        self.points[0].value.unwrap_or_default()
    }

    /// Year of every time step.
    pub fn years(&self) -> Vec<i32> {
        self.points.iter().map(|point| point.year).collect()
    }

    /// Underlying points.
    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }
}

/// Early-year correction factor applied by the external merge step.
///
/// Each pair holds the `(larger, smaller)` regional counts for one year. The
/// factor is one plus the mean of `smaller / larger` over the years where both
/// regions report; years where either region is missing are skipped.
pub fn coverage_correction_factor(pairs: &[(Option<f64>, Option<f64>)]) -> Result<f64, PvaError> {
    let ratios: Vec<f64> = pairs
        .iter()
        .filter_map(|pair| match *pair {
            (Some(larger), Some(smaller)) => Some((larger, smaller)),
            _ => None,
        })
        .map(|(larger, smaller)| {
            if larger > 0.0 && larger.is_finite() && smaller.is_finite() {
                Ok(smaller / larger)
            } else {
                Err(PvaError::Configuration(
                    ErrorInfo::new("coverage-ratio", "regional counts must be finite and positive")
                        .with_context("larger", larger.to_string())
                        .with_context("smaller", smaller.to_string()),
                ))
            }
        })
        .collect::<Result<_, _>>()?;
    if ratios.is_empty() {
        return Err(PvaError::configuration(
            "coverage-overlap",
            "no year carries counts for both regions",
        ));
    }
    Ok(1.0 + ratios.iter().sum::<f64>() / ratios.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correction_factor_uses_overlapping_years_only() {
        let pairs = [
            (Some(100.0), None),
            (Some(100.0), Some(20.0)),
            (Some(200.0), Some(60.0)),
            (None, Some(5.0)),
        ];
        let factor = coverage_correction_factor(&pairs).unwrap();
        assert!((factor - 1.25).abs() < 1e-12);
    }

    #[test]
    fn correction_factor_requires_overlap() {
        let err = coverage_correction_factor(&[(Some(1.0), None)]).unwrap_err();
        assert_eq!(err.info().code, "coverage-overlap");
    }
}
