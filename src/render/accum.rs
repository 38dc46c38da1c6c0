use crate::sim::{try_alloc, AllocError};
use rayon::prelude::*;
use std::sync::atomic::{AtomicU32, Ordering};

/// Adds `v` to the `f32` stored as bits in `cell`. Concurrent adds are
/// never lost: the read-modify-write retries until it lands.
#[inline]
pub fn atomic_add_f32(cell: &AtomicU32, v: f32) {
    let mut cur = cell.load(Ordering::Relaxed);
    loop {
        let next = (f32::from_bits(cur) + v).to_bits();
        match cell.compare_exchange_weak(cur, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return,
            Err(actual) => cur = actual,
        }
    }
}

/// Per-pixel RGB float sums shared by every rasterizing worker.
///
/// Each channel of each pixel is one `AtomicU32` holding `f32` bits, so
/// `add` takes `&self` and may be called from any number of threads.
pub struct AccumBuffer {
    cells: Vec<AtomicU32>,
}

impl AccumBuffer {
    pub fn new(width: usize, height: usize) -> Result<Self, AllocError> {
        let len = width.saturating_mul(height).saturating_mul(3);
        let mut cells = try_alloc("accumulation buffer", len)?;
        // 0u32 is the bit pattern of 0.0f32.
        cells.resize_with(len, || AtomicU32::new(0));
        Ok(Self { cells })
    }

    pub fn pixels(&self) -> usize {
        self.cells.len() / 3
    }

    /// Zeroes every cell. Exclusive access, so no atomics needed.
    pub fn clear(&mut self) {
        self.cells.par_iter_mut().for_each(|c| *c.get_mut() = 0);
    }

    #[inline]
    pub fn add(&self, pixel: usize, rgb: [f32; 3]) {
        let base = pixel * 3;
        atomic_add_f32(&self.cells[base], rgb[0]);
        atomic_add_f32(&self.cells[base + 1], rgb[1]);
        atomic_add_f32(&self.cells[base + 2], rgb[2]);
    }

    pub fn load(&self, pixel: usize) -> [f32; 3] {
        let base = pixel * 3;
        [
            f32::from_bits(self.cells[base].load(Ordering::Relaxed)),
            f32::from_bits(self.cells[base + 1].load(Ordering::Relaxed)),
            f32::from_bits(self.cells[base + 2].load(Ordering::Relaxed)),
        ]
    }
}
