use std::sync::{Mutex, MutexGuard, RwLock};

use rayon::prelude::*;
use tracing::warn;

use mandelzoom_core::SurfaceSize;

use crate::palette::{argb_to_rgba, INTERIOR_COLOR};
use crate::region::Region;

/// Render generation stamped on every block write.
pub type Generation = u64;

struct BackBuffer {
    pixels: Vec<u32>,
    generation: Generation,
}

/// A double-buffered ARGB surface shared between render workers and the
/// display side.
///
/// Workers write whole blocks into the back buffer through
/// [`commit_region`](Self::commit_region); a write stamped with anything
/// other than the current generation is discarded under the same lock that
/// guards the pixels, so a worker that outlives its session can never land a
/// block. [`publish`](Self::publish) copies the back buffer to the front,
/// which is all readers ever see.
pub struct Framebuffer {
    size: SurfaceSize,
    back: Mutex<BackBuffer>,
    front: RwLock<Vec<u32>>,
}

impl Framebuffer {
    /// A surface filled with the interior colour.
    pub fn new(size: SurfaceSize) -> Self {
        let len = size.pixel_count();
        Self {
            size,
            back: Mutex::new(BackBuffer {
                pixels: vec![INTERIOR_COLOR; len],
                generation: 0,
            }),
            front: RwLock::new(vec![INTERIOR_COLOR; len]),
        }
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    // A writer that panicked leaves at worst one torn block.
    fn back(&self) -> MutexGuard<'_, BackBuffer> {
        self.back.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn generation(&self) -> Generation {
        self.back().generation
    }

    /// Accept writes stamped with `generation` from now on.
    pub fn set_generation(&self, generation: Generation) {
        self.back().generation = generation;
    }

    /// Copy a region of the back buffer out, row-major.
    pub fn read_region(&self, region: Region) -> Vec<u32> {
        let region = region.clip_to(self.size);
        let stride = self.size.width as usize;
        let back = self.back();
        let mut out = Vec::with_capacity(region.pixel_count());
        for row in region.y..region.y + region.height {
            let start = row as usize * stride + region.x as usize;
            out.extend_from_slice(&back.pixels[start..start + region.width as usize]);
        }
        out
    }

    /// Write `pixels` (row-major, `region`-sized) into the back buffer if
    /// `generation` is still current. Returns whether the write landed.
    pub fn commit_region(&self, generation: Generation, region: Region, pixels: &[u32]) -> bool {
        let region = region.clip_to(self.size);
        if pixels.len() != region.pixel_count() {
            warn!(len = pixels.len(), ?region, "block size does not match its region");
            return false;
        }
        let stride = self.size.width as usize;
        let w = region.width as usize;
        let mut back = self.back();
        if back.generation != generation {
            return false;
        }
        for (i, src) in pixels.chunks_exact(w.max(1)).enumerate() {
            let start = (region.y as usize + i) * stride + region.x as usize;
            back.pixels[start..start + w].copy_from_slice(src);
        }
        true
    }

    /// Copy the back buffer to the front buffer.
    pub fn publish(&self) {
        let back = self.back();
        let mut front = self.front.write().unwrap_or_else(|e| e.into_inner());
        front.copy_from_slice(&back.pixels);
    }

    /// A copy of the front buffer.
    pub fn front_pixels(&self) -> Vec<u32> {
        self.front.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Front pixel at `(x, y)`, if inside the surface.
    pub fn pixel(&self, x: u32, y: u32) -> Option<u32> {
        if x >= self.size.width || y >= self.size.height {
            return None;
        }
        let front = self.front.read().unwrap_or_else(|e| e.into_inner());
        front.get(y as usize * self.size.width as usize + x as usize).copied()
    }

    /// The front buffer as RGBA bytes, 4 per pixel, row-major.
    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        let front = self.front.read().unwrap_or_else(|e| e.into_inner());
        let mut bytes = vec![0u8; front.len() * 4];
        bytes
            .par_chunks_mut(4)
            .zip(front.par_iter())
            .for_each(|(px, &color)| px.copy_from_slice(&argb_to_rgba(color)));
        bytes
    }
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framebuffer")
            .field("size", &self.size)
            .field("generation", &self.generation())
            .finish()
    }
}
