pub mod android_jni;
pub mod classifier;
pub mod config;
pub mod error;
pub mod geo;
pub mod gpx;
pub mod pipeline;
pub mod trajectory;

pub use classifier::{ClassifierModel, FeatureVector, Label, SegmentClassifier};
pub use config::Config;
pub use error::{Error, Result};
pub use gpx::{Fix, Point};
pub use pipeline::{classify_fixes, ClassifiedTrajectory, LabeledSegment, Pipeline};
pub use trajectory::{Segment, Trajectory, Warning};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
