//! Unscented Kalman filtering over the CTRV motion model
//!
//! `sigma` and `ctrv` implement the prediction half, `measurement` the
//! sensor-specific correction half, `ukf` ties them to a filter instance.
pub mod ctrv;
pub mod measurement;
pub mod nis;
pub mod sigma;
pub mod ukf;

pub use nis::NisMonitor;
pub use ukf::{ProcessOutcome, Ukf, UkfSnapshot};
