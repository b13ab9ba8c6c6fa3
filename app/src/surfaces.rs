//! Surface selection by source path.

use framegrab_capture::{
    CaptureResult, PatternSurfaceFactory, RenderSurface, SequenceSurfaceFactory, SurfaceFactory,
};
use framegrab_ipc::SourceRef;
use tracing::debug;

/// Opens directories as image sequences and anything else as a synthetic
/// test pattern.
#[derive(Debug, Default)]
pub struct SourceFactory {
    sequence: SequenceSurfaceFactory,
    pattern: PatternSurfaceFactory,
}

impl SourceFactory {
    pub fn new(sequence_fps: Option<f64>) -> Self {
        Self {
            sequence: SequenceSurfaceFactory::new(sequence_fps),
            pattern: PatternSurfaceFactory::default(),
        }
    }
}

impl SurfaceFactory for SourceFactory {
    fn open(&self, source: &SourceRef) -> CaptureResult<Box<dyn RenderSurface>> {
        if source.path.is_dir() {
            debug!(path = %source.path.display(), "Opening image sequence");
            self.sequence.open(source)
        } else {
            debug!(file = %source.file_name, "Opening test pattern");
            self.pattern.open(source)
        }
    }
}
