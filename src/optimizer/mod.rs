pub mod cce;
pub mod partition;
pub mod population;
pub mod runner;
pub mod sampling;
pub mod weights;

pub use self::cce::{CceEngine, CceSettings, CceStats};
pub use self::partition::{partition, recombine, Complex, Member};
pub use self::population::Population;
pub use self::runner::{
    calibrate, CalibrationOptions, CalibrationOutcome, Calibrator, CancelToken, ProgressCallback,
    RoundReport, Silent, TerminationReason,
};
pub use self::weights::{rank_weight, rank_weights};
