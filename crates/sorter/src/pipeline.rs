use std::fmt;
use std::path::{Path, PathBuf};
use log::{debug, info, warn};

use crate::classifier::{self, DurationVerdict, Orientation, MIN_DURATION_MICROS};
use crate::config::SorterConfig;
use crate::ffprobe::Prober;
use crate::metadata::{self, MediaFacts, ParseErrorKind};
use crate::sniff::{ImageCrateInspector, ImageInspector, MediaType};

/// Where a file ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Portrait,
    Landscape,
    Image,
    Skipped,
}

impl Category {
    /// Categories that have a directory of their own
    pub const ROUTED: [Category; 3] = [Category::Portrait, Category::Landscape, Category::Image];

    /// Destination subdirectory name; `None` for files that stay put
    pub fn dir_name(&self) -> Option<&'static str> {
        match self {
            Category::Portrait => Some("Portrait"),
            Category::Landscape => Some("Landscape"),
            Category::Image => Some("Image"),
            Category::Skipped => None,
        }
    }
}

impl From<Orientation> for Category {
    fn from(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Portrait => Category::Portrait,
            Orientation::Landscape => Category::Landscape,
            Orientation::Unknown => Category::Skipped,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name().unwrap_or("Skipped"))
    }
}

/// Why a file was not sorted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    ProbeFailed,
    Parse(ParseErrorKind),
    TooShort,
    UnknownType,
    UnknownOrientation,
    ImageUnreadable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ProbeFailed => f.write_str("ProbeFailed"),
            SkipReason::Parse(kind) => write!(f, "ParseError:{}", kind),
            SkipReason::TooShort => f.write_str("TooShort"),
            SkipReason::UnknownType => f.write_str("UnknownType"),
            SkipReason::UnknownOrientation => f.write_str("UnknownOrientation"),
            SkipReason::ImageUnreadable => f.write_str("ImageUnreadable"),
        }
    }
}

/// The classification decision for one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub source_path: PathBuf,
    pub category: Category,
    pub reason: Option<SkipReason>,
}

impl ClassificationResult {
    pub fn routed(source_path: impl Into<PathBuf>, category: Category) -> Self {
        Self {
            source_path: source_path.into(),
            category,
            reason: None,
        }
    }

    pub fn skipped(source_path: impl Into<PathBuf>, reason: SkipReason) -> Self {
        Self {
            source_path: source_path.into(),
            category: Category::Skipped,
            reason: Some(reason),
        }
    }
}

/// Knobs for [`MediaClassifier`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyOptions {
    pub min_duration_micros: u64,
    pub apply_rotation: bool,
    pub image_orientation: bool,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            min_duration_micros: MIN_DURATION_MICROS,
            apply_rotation: true,
            image_orientation: false,
        }
    }
}

impl From<&SorterConfig> for ClassifyOptions {
    fn from(cfg: &SorterConfig) -> Self {
        Self {
            min_duration_micros: cfg.min_duration_micros,
            apply_rotation: cfg.apply_rotation,
            image_orientation: cfg.image_orientation,
        }
    }
}

/// Probes, parses and classifies one file at a time
pub struct MediaClassifier<P, I = ImageCrateInspector> {
    prober: P,
    images: I,
    options: ClassifyOptions,
}

impl<P: Prober> MediaClassifier<P, ImageCrateInspector> {
    pub fn new(prober: P, options: ClassifyOptions) -> Self {
        Self::with_inspector(prober, ImageCrateInspector, options)
    }
}

impl<P: Prober, I: ImageInspector> MediaClassifier<P, I> {
    pub fn with_inspector(prober: P, images: I, options: ClassifyOptions) -> Self {
        Self { prober, images, options }
    }

    pub fn prober(&self) -> &P {
        &self.prober
    }

    /// Decide the category of one file; never fails
    pub async fn classify(&self, path: &Path, media_type: MediaType) -> ClassificationResult {
        match media_type {
            MediaType::Unknown => ClassificationResult::skipped(path, SkipReason::UnknownType),
            MediaType::Image => self.classify_image(path),
            MediaType::Video => self.classify_video(path).await,
        }
    }

    fn classify_image(&self, path: &Path) -> ClassificationResult {
        if !self.options.image_orientation {
            return ClassificationResult::routed(path, Category::Image);
        }

        match self.images.dimensions(path) {
            Ok((width, height)) => {
                let facts = MediaFacts::from_dimensions(width, height);
                match classifier::orientation(&facts, false) {
                    Orientation::Unknown => ClassificationResult::skipped(path, SkipReason::UnknownOrientation),
                    known => ClassificationResult::routed(path, known.into()),
                }
            }
            Err(e) => {
                warn!("Cannot read image {}: {:#}", path.display(), e);
                ClassificationResult::skipped(path, SkipReason::ImageUnreadable)
            }
        }
    }

    async fn classify_video(&self, path: &Path) -> ClassificationResult {
        let data = match self.prober.probe(path).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Probe failed for {}: {}", path.display(), e);
                return ClassificationResult::skipped(path, SkipReason::ProbeFailed);
            }
        };

        let facts = match metadata::parse(&data) {
            Ok(facts) => facts,
            Err(e) => {
                warn!("Unusable metadata for {}: {}", path.display(), e);
                return ClassificationResult::skipped(path, SkipReason::Parse(e.kind()));
            }
        };

        match facts.duration() {
            Some(d) => debug!("{}: duration {}", path.display(), d),
            None => warn!("{}: no stream duration reported, treating as long enough", path.display()),
        }

        if classifier::duration_verdict(&facts, self.options.min_duration_micros) == DurationVerdict::TooShort {
            info!(
                "Media is shorter than the minimum duration: {}",
                facts.duration().map(|d| d.to_string()).unwrap_or_default()
            );
            return ClassificationResult::skipped(path, SkipReason::TooShort);
        }

        match classifier::orientation(&facts, self.options.apply_rotation) {
            Orientation::Unknown => ClassificationResult::skipped(path, SkipReason::UnknownOrientation),
            known => ClassificationResult::routed(path, known.into()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ffprobe::{FFProbeData, FFProbeSideData, FFProbeStream, ProbeError};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned probe responses keyed by file name
    #[derive(Default)]
    pub(crate) struct FakeProber {
        pub responses: HashMap<String, FFProbeData>,
        pub calls: AtomicUsize,
        pub unavailable: bool,
    }

    impl FakeProber {
        pub fn with(mut self, name: &str, data: FFProbeData) -> Self {
            self.responses.insert(name.to_string(), data);
            self
        }
    }

    #[async_trait]
    impl Prober for FakeProber {
        async fn probe(&self, path: &Path) -> Result<FFProbeData, ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            self.responses.get(name).cloned().ok_or_else(|| ProbeError::Failed {
                path: path.to_path_buf(),
                code: 1,
                stderr: "Invalid data found when processing input".to_string(),
            })
        }

        async fn check_available(&self) -> Result<(), ProbeError> {
            if self.unavailable {
                return Err(ProbeError::Unavailable {
                    bin: "ffprobe".into(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
            Ok(())
        }
    }

    struct FakeImages(Option<(u32, u32)>);

    impl ImageInspector for FakeImages {
        fn dimensions(&self, _path: &Path) -> anyhow::Result<(u32, u32)> {
            self.0.ok_or_else(|| anyhow!("unsupported image format"))
        }
    }

    pub(crate) fn video(width: i64, height: i64, duration: &str) -> FFProbeData {
        FFProbeData {
            streams: vec![
                FFProbeStream {
                    codec_type: Some("video".to_string()),
                    codec_name: Some("h264".to_string()),
                    duration: Some(duration.to_string()),
                    width: Some(width),
                    height: Some(height),
                    ..Default::default()
                },
                FFProbeStream {
                    index: 1,
                    codec_type: Some("audio".to_string()),
                    codec_name: Some("aac".to_string()),
                    duration: Some(duration.to_string()),
                    ..Default::default()
                },
            ],
        }
    }

    fn classifier(prober: FakeProber) -> MediaClassifier<FakeProber, FakeImages> {
        MediaClassifier::with_inspector(prober, FakeImages(None), ClassifyOptions::default())
    }

    #[tokio::test]
    async fn test_video_orientation_categories() {
        let prober = FakeProber::default()
            .with("wide.mp4", video(1920, 1080, "0:00:10.000000"))
            .with("tall.mp4", video(1080, 1920, "0:00:10.000000"));
        let c = classifier(prober);

        let wide = c.classify(Path::new("/in/wide.mp4"), MediaType::Video).await;
        assert_eq!(wide, ClassificationResult::routed("/in/wide.mp4", Category::Landscape));

        let tall = c.classify(Path::new("/in/tall.mp4"), MediaType::Video).await;
        assert_eq!(tall.category, Category::Portrait);
        assert_eq!(tall.reason, None);
        assert_eq!(c.prober().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_short_video_skipped() {
        let prober = FakeProber::default().with("blip.mp4", video(1920, 1080, "0:00:00.500000"));
        let result = classifier(prober).classify(Path::new("blip.mp4"), MediaType::Video).await;
        assert_eq!(result, ClassificationResult::skipped("blip.mp4", SkipReason::TooShort));
    }

    #[tokio::test]
    async fn test_probe_failure_skipped() {
        let result = classifier(FakeProber::default())
            .classify(Path::new("corrupt.mp4"), MediaType::Video)
            .await;
        assert_eq!(result.reason, Some(SkipReason::ProbeFailed));
        assert_eq!(result.reason.unwrap().to_string(), "ProbeFailed");
    }

    #[tokio::test]
    async fn test_parse_error_reason_names_kind() {
        let prober = FakeProber::default()
            .with("bad.mov", video(1920, 1080, "ten seconds"))
            .with("flat.mov", video(1920, 0, "0:00:10.000000"))
            .with("empty.mov", FFProbeData::default());
        let c = classifier(prober);

        let bad = c.classify(Path::new("bad.mov"), MediaType::Video).await;
        assert_eq!(bad.reason.unwrap().to_string(), "ParseError:MalformedDuration");

        let flat = c.classify(Path::new("flat.mov"), MediaType::Video).await;
        assert_eq!(flat.reason, Some(SkipReason::Parse(ParseErrorKind::InvalidDimensions)));

        let empty = c.classify(Path::new("empty.mov"), MediaType::Video).await;
        assert_eq!(empty.reason, Some(SkipReason::Parse(ParseErrorKind::MissingStream)));
    }

    #[tokio::test]
    async fn test_audio_only_video_has_unknown_orientation() {
        let mut data = video(1920, 1080, "0:00:10.000000");
        data.streams.remove(0);
        let prober = FakeProber::default().with("podcast.mp4", data);
        let result = classifier(prober).classify(Path::new("podcast.mp4"), MediaType::Video).await;
        assert_eq!(result.reason, Some(SkipReason::UnknownOrientation));
    }

    #[tokio::test]
    async fn test_rotated_phone_clip() {
        let mut data = video(1920, 1080, "0:00:10.000000");
        data.streams[0].side_data_list = Some(vec![FFProbeSideData {
            side_data_type: Some("Display Matrix".to_string()),
            rotation: Some(-90),
        }]);
        let prober = FakeProber::default().with("phone.mov", data);

        let rotated = classifier(prober);
        let result = rotated.classify(Path::new("phone.mov"), MediaType::Video).await;
        assert_eq!(result.category, Category::Portrait);

        let options = ClassifyOptions {
            apply_rotation: false,
            ..Default::default()
        };
        let literal = MediaClassifier::with_inspector(rotated.prober, FakeImages(None), options);
        let result = literal.classify(Path::new("phone.mov"), MediaType::Video).await;
        assert_eq!(result.category, Category::Landscape);
    }

    #[tokio::test]
    async fn test_images_and_unknown_types_are_not_probed() {
        let c = classifier(FakeProber::default());

        let image = c.classify(Path::new("photo.jpg"), MediaType::Image).await;
        assert_eq!(image.category, Category::Image);

        let unknown = c.classify(Path::new("notes.txt"), MediaType::Unknown).await;
        assert_eq!(unknown.reason, Some(SkipReason::UnknownType));

        assert_eq!(c.prober().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_image_orientation_variant() {
        let options = ClassifyOptions {
            image_orientation: true,
            ..Default::default()
        };

        let tall = MediaClassifier::with_inspector(FakeProber::default(), FakeImages(Some((1080, 1920))), options);
        let result = tall.classify(Path::new("tall.png"), MediaType::Image).await;
        assert_eq!(result.category, Category::Portrait);

        let broken = MediaClassifier::with_inspector(FakeProber::default(), FakeImages(None), options);
        let result = broken.classify(Path::new("broken.png"), MediaType::Image).await;
        assert_eq!(result.reason, Some(SkipReason::ImageUnreadable));

        let zero = MediaClassifier::with_inspector(FakeProber::default(), FakeImages(Some((10, 0))), options);
        let result = zero.classify(Path::new("zero.png"), MediaType::Image).await;
        assert_eq!(result.reason, Some(SkipReason::UnknownOrientation));
    }

    #[test]
    fn test_category_dir_names() {
        assert_eq!(Category::Portrait.dir_name(), Some("Portrait"));
        assert_eq!(Category::Landscape.dir_name(), Some("Landscape"));
        assert_eq!(Category::Image.dir_name(), Some("Image"));
        assert_eq!(Category::Skipped.dir_name(), None);
        assert_eq!(Category::from(Orientation::Unknown), Category::Skipped);
    }
}
