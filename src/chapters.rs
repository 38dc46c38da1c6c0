use crate::attractor::{Family, Params};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::warn;

/// Frame rate of the raw stdout stream, used for its chapter timestamps.
pub const CHAPTER_FPS: u64 = 60;

/// A family taking over, with the coefficients it was resolved to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChapterEvent {
    pub frame: u64,
    pub family: Family,
    pub params: Params,
}

impl ChapterEvent {
    /// `(minutes, seconds)` of the event in a video played at `fps`.
    pub fn timestamp(&self, fps: u64) -> (u64, u64) {
        let secs = self.frame / fps.max(1);
        (secs / 60, secs % 60)
    }

    /// `MM:SS Name params` line for a video played at `fps`.
    pub fn line(&self, fps: u64) -> ChapterLine<'_> {
        ChapterLine { event: self, fps }
    }
}

pub struct ChapterLine<'a> {
    event: &'a ChapterEvent,
    fps: u64,
}

impl fmt::Display for ChapterLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ev = self.event;
        let (mins, secs) = ev.timestamp(self.fps);
        write!(
            f,
            "{mins:02}:{secs:02} {} {}",
            ev.family.name(),
            ev.params.describe(ev.family)
        )
    }
}

/// Best-effort line sink for chapter events. Write failures are logged
/// once and the log goes quiet; they never stop rendering.
pub struct ChapterLog {
    sink: Option<Box<dyn Write>>,
    fps: u64,
    written: usize,
}

impl ChapterLog {
    pub fn disabled() -> Self {
        Self {
            sink: None,
            fps: CHAPTER_FPS,
            written: 0,
        }
    }

    pub fn to_writer(w: impl Write + 'static, fps: u64) -> Self {
        Self {
            sink: Some(Box::new(w)),
            fps,
            written: 0,
        }
    }

    pub fn create(path: &Path, fps: u64) -> Self {
        match File::create(path) {
            Ok(file) => Self::to_writer(BufWriter::new(file), fps),
            Err(err) => {
                warn!("could not open {} for writing: {err}", path.display());
                Self::disabled()
            }
        }
    }

    pub fn record(&mut self, event: &ChapterEvent) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let res = writeln!(sink, "{}", event.line(self.fps)).and_then(|_| sink.flush());
        match res {
            Ok(()) => self.written += 1,
            Err(err) => {
                warn!("chapter log write failed, disabling: {err}");
                self.sink = None;
            }
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }
}
