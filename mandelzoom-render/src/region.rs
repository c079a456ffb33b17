use mandelzoom_core::{FractalKind, SurfaceSize};

/// A rectangular pixel area of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    /// Pixel x of the top-left corner.
    pub x: u32,
    /// Pixel y of the top-left corner.
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole surface.
    pub fn full(size: SurfaceSize) -> Self {
        Self::new(0, 0, size.width, size.height)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// The part of this region that lies on a surface of `size`.
    pub fn clip_to(&self, size: SurfaceSize) -> Region {
        let x = self.x.min(size.width);
        let y = self.y.min(size.height);
        let right = self.x.saturating_add(self.width).min(size.width);
        let bottom = self.y.saturating_add(self.height).min(size.height);
        Region::new(x, y, right - x, bottom - y)
    }
}

/// Split a surface into the sub-regions rendered by independent workers.
///
/// Mandelbrot views are cut into a top and a bottom half. Julia views draw
/// a single centred square whose side is the shorter surface edge.
pub fn split_regions(kind: FractalKind, size: SurfaceSize) -> Vec<Region> {
    if size.is_degenerate() {
        return Vec::new();
    }
    match kind {
        FractalKind::Mandelbrot => {
            let top = size.height / 2;
            let halves = [
                Region::new(0, 0, size.width, top),
                Region::new(0, top, size.width, size.height - top),
            ];
            halves.into_iter().filter(|r| !r.is_empty()).collect()
        }
        FractalKind::Julia => {
            let side = size.width.min(size.height);
            vec![Region::new(
                (size.width - side) / 2,
                (size.height - side) / 2,
                side,
                side,
            )]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn covered(regions: &[Region], size: SurfaceSize) -> Vec<u8> {
        let mut hits = vec![0u8; size.pixel_count()];
        for r in regions {
            for py in r.y..r.y + r.height {
                for px in r.x..r.x + r.width {
                    hits[py as usize * size.width as usize + px as usize] += 1;
                }
            }
        }
        hits
    }

    #[test]
    fn mandelbrot_halves_cover_surface_once() {
        for &(w, h) in &[(200, 150), (7, 9), (1, 1), (640, 481)] {
            let size = SurfaceSize::new(w, h);
            let regions = split_regions(FractalKind::Mandelbrot, size);
            assert!(covered(&regions, size).iter().all(|&c| c == 1), "{w}x{h}");
        }
    }

    #[test]
    fn mandelbrot_uses_two_workers() {
        let regions = split_regions(FractalKind::Mandelbrot, SurfaceSize::new(100, 50));
        assert_eq!(
            regions,
            vec![Region::new(0, 0, 100, 25), Region::new(0, 25, 100, 25)]
        );
    }

    #[test]
    fn julia_is_centred_square() {
        let regions = split_regions(FractalKind::Julia, SurfaceSize::new(300, 200));
        assert_eq!(regions, vec![Region::new(50, 0, 200, 200)]);
        let regions = split_regions(FractalKind::Julia, SurfaceSize::new(120, 400));
        assert_eq!(regions, vec![Region::new(0, 140, 120, 120)]);
    }

    #[test]
    fn degenerate_surface_has_no_regions() {
        assert!(split_regions(FractalKind::Mandelbrot, SurfaceSize::new(0, 10)).is_empty());
        assert!(split_regions(FractalKind::Julia, SurfaceSize::new(10, 0)).is_empty());
    }

    #[test]
    fn clipping() {
        let size = SurfaceSize::new(10, 10);
        assert_eq!(Region::new(8, 8, 5, 5).clip_to(size), Region::new(8, 8, 2, 2));
        assert!(Region::new(12, 0, 5, 5).clip_to(size).is_empty());
        assert_eq!(Region::new(0, 0, 10, 10).clip_to(size), Region::full(size));
    }
}
