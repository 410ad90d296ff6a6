#![deny(missing_docs)]
#![doc = "Core error, randomness and series types shared by the PVA crates."]

pub mod errors;
pub mod rng;
pub mod series;

pub use errors::{ErrorInfo, PvaError, PvaWarning};
pub use rng::{derive_substream_seed, RngHandle};
pub use series::{coverage_correction_factor, SeriesPoint, SeriesShape, TimeSeries};
