pub mod config;
pub mod ffprobe;
pub mod metadata;
pub mod classifier;
pub mod sniff;
pub mod pipeline;
pub mod router;
pub mod scan;
pub mod batch;

pub use config::SorterConfig;
pub use ffprobe::{FFProbeData, FFProbeStream, FfprobeCommand, ProbeError, Prober};
pub use metadata::{MediaDuration, MediaFacts, ParseError};
pub use classifier::{DurationVerdict, Orientation};
pub use pipeline::{Category, ClassificationResult, ClassifyOptions, MediaClassifier, SkipReason};
pub use router::{FileRouter, RouteError, RouteOutcome};
pub use sniff::{MediaType, MimeSniffer};
