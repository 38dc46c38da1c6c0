use std::io::{self, Write};

/// Writes whole RGB24 frames, row-major from the top, to a byte sink.
pub struct FrameEmitter<W: Write> {
    sink: W,
    frame_len: usize,
    frames: u64,
}

impl<W: Write> FrameEmitter<W> {
    pub fn new(sink: W, width: usize, height: usize) -> Self {
        Self {
            sink,
            frame_len: width.saturating_mul(height).saturating_mul(3),
            frames: 0,
        }
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    /// Writes one frame in a single `write_all`. A buffer of the wrong
    /// size is rejected before anything reaches the sink.
    pub fn emit(&mut self, rgb: &[u8]) -> io::Result<()> {
        if rgb.len() != self.frame_len {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("frame is {} bytes, expected {}", rgb.len(), self.frame_len),
            ));
        }
        self.sink.write_all(rgb)?;
        self.frames += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}
