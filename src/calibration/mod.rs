//! Display calibration solvers
//!
//! This module turns raw measurement samples into calibration artifacts:
//! tone curve, color correction matrix, white balance gains and the mura
//! compensation map. Every solver is a pure function of its inputs and
//! configuration and may run in parallel with the others.

pub mod ccm;
pub mod gamma;
pub mod mura;
pub mod white_balance;

pub use ccm::{CcmFit, CcmSolver};
pub use gamma::GammaSolver;
pub use mura::MuraMapBuilder;
pub use white_balance::WhiteBalanceEstimator;
