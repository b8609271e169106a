//! Consumer-side sync pipeline: sample queue, rate estimation, buffer-level control

pub mod controller;
pub mod monitor;
pub mod rate_estimator;
pub mod sample_queue;
pub mod starvation;
pub mod sync;

pub use controller::{BufferLevelController, ConsumptionPlan};
pub use monitor::{SyncMonitor, SyncStats};
pub use rate_estimator::{RateEstimator, RateHistory};
pub use sample_queue::{RawSampleQueue, SampleConsumer, SampleProducer};
pub use starvation::{EmptyFrameGuard, SkipCounter};
pub use sync::{AudioSync, FillOutcome};
