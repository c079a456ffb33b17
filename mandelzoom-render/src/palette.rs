//! Colour ramps for mapping escape counts to pixels.
//!
//! Colours are packed ARGB32 (`0xAARRGGBB`). Generated entries are always
//! fully opaque.

use std::fmt;

/// Fully opaque alpha, OR-ed into every generated entry.
pub const OPAQUE: u32 = 0xFF00_0000;

/// Colour painted for points that never escape.
pub const INTERIOR_COLOR: u32 = OPAQUE;

/// Length of one hue band in the rainbow palettes.
const RAINBOW_BAND: u32 = 64;

// ---------------------------------------------------------------------------
// Rgb
// ---------------------------------------------------------------------------

/// A control colour for [`Palette::generate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const RED: Rgb = Rgb::new(255, 0, 0);
    pub const GREEN: Rgb = Rgb::new(0, 255, 0);
    pub const BLUE: Rgb = Rgb::new(0, 0, 255);
    pub const YELLOW: Rgb = Rgb::new(255, 255, 0);
    pub const MAGENTA: Rgb = Rgb::new(255, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// From a `0xRRGGBB` literal; any alpha byte is ignored.
    pub const fn from_hex(rgb: u32) -> Self {
        Self::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    pub const fn to_argb(self) -> u32 {
        pack_argb(self.r, self.g, self.b)
    }

    fn channels(self) -> [f64; 3] {
        [self.r as f64, self.g as f64, self.b as f64]
    }
}

#[inline]
pub const fn pack_argb(r: u8, g: u8, b: u8) -> u32 {
    OPAQUE | (r as u32) << 16 | (g as u32) << 8 | b as u32
}

/// Split a packed colour into `[r, g, b, a]` bytes.
#[inline]
pub fn argb_to_rgba(color: u32) -> [u8; 4] {
    [
        (color >> 16) as u8,
        (color >> 8) as u8,
        color as u8,
        (color >> 24) as u8,
    ]
}

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

/// An immutable, non-empty ring of packed colours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    name: String,
    colors: Vec<u32>,
}

impl Palette {
    /// Wrap an explicit colour list. An empty list becomes a single
    /// interior-coloured entry so lookups never divide by zero.
    pub fn new(name: impl Into<String>, mut colors: Vec<u32>) -> Self {
        if colors.is_empty() {
            colors.push(INTERIOR_COLOR);
        }
        Self {
            name: name.into(),
            colors,
        }
    }

    /// Build `total` entries by piecewise-linear interpolation through
    /// `control`.
    ///
    /// The ramp is cut into `control.len() - 1` segments of
    /// `total / (control.len() - 1)` entries (integer division). Any
    /// remainder is produced by the final segment running past its end
    /// colour, clamped per channel.
    pub fn generate(name: impl Into<String>, control: &[Rgb], total: usize) -> Self {
        let colors = match control {
            [] => vec![INTERIOR_COLOR; total],
            [only] => vec![only.to_argb(); total],
            _ => {
                let segments = control.len() - 1;
                let segment_len = (total / segments).max(1);
                (0..total)
                    .map(|i| {
                        let segment = (i / segment_len).min(segments - 1);
                        let step = (i - segment * segment_len) as f64;
                        let from = control[segment].channels();
                        let to = control[segment + 1].channels();
                        let channel = |k: usize| {
                            let v = from[k] + step * (to[k] - from[k]) / segment_len as f64;
                            v.clamp(0.0, 255.0) as u8
                        };
                        pack_argb(channel(0), channel(1), channel(2))
                    })
                    .collect()
            }
        };
        Self::new(name, colors)
    }

    /// Five 64-entry hue bands: blue→green, green→yellow, yellow→red,
    /// red→magenta, magenta→blue.
    pub fn rainbow() -> Self {
        let up = |i: u32| (i * 4) as u8;
        let down = |i: u32| ((RAINBOW_BAND - 1 - i) * 4) as u8;
        let mut colors = Vec::with_capacity(5 * RAINBOW_BAND as usize);
        colors.extend((0..RAINBOW_BAND).map(|i| pack_argb(0, up(i), down(i))));
        colors.extend((0..RAINBOW_BAND).map(|i| pack_argb(up(i), 0xFF, 0)));
        colors.extend((0..RAINBOW_BAND).map(|i| pack_argb(0xFF, down(i), 0)));
        colors.extend((0..RAINBOW_BAND).map(|i| pack_argb(0xFF, 0, up(i))));
        colors.extend((0..RAINBOW_BAND).map(|i| pack_argb(down(i), 0, 0xFF)));
        Self::new("Rainbow", colors)
    }

    /// The rainbow with every colour channel bitwise inverted.
    pub fn rainbow_inverted() -> Self {
        let colors = Self::rainbow()
            .colors
            .iter()
            .map(|&c| OPAQUE | (!c & 0x00FF_FFFF))
            .collect();
        Self::new("Inverted rainbow", colors)
    }

    /// A cyclic rotation: `result[i] = self[(i + n) % len]`.
    pub fn shifted(&self, n: usize) -> Self {
        let len = self.colors.len();
        let colors = (0..len).map(|i| self.colors[(i + n) % len]).collect();
        Self {
            name: self.name.clone(),
            colors,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn colors(&self) -> &[u32] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Always false; kept for the `len` convention.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Colour for a point that escaped after `iterations` steps under a
    /// budget of `max_iterations`.
    ///
    /// Budgets smaller than the palette are stretched so that low budgets
    /// still span the whole ramp.
    #[inline]
    pub fn escape_color(&self, iterations: u32, max_iterations: u32) -> u32 {
        let len = self.colors.len();
        let max = max_iterations.max(1) as usize;
        let scale = if max < len { len / max } else { 1 };
        self.colors[(iterations as usize * scale) % len]
    }
}

impl fmt::Display for Palette {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} colours)", self.name, self.colors.len())
    }
}

// ---------------------------------------------------------------------------
// Palette table
// ---------------------------------------------------------------------------

/// The ordered set of selectable palettes, built once at startup and passed
/// to whoever needs it.
#[derive(Debug, Clone)]
pub struct PaletteTable {
    palettes: Vec<Palette>,
}

impl PaletteTable {
    /// The built-in palettes, in selection order.
    pub fn standard() -> Self {
        Self {
            palettes: vec![
                Palette::generate(
                    "Blue-green-red",
                    &[Rgb::BLUE, Rgb::GREEN, Rgb::RED, Rgb::BLUE],
                    256,
                ),
                Palette::generate(
                    "Yellow-magenta-blue-green",
                    &[Rgb::YELLOW, Rgb::MAGENTA, Rgb::BLUE, Rgb::GREEN, Rgb::YELLOW],
                    256,
                ),
                Palette::generate("White-black-white", &[Rgb::WHITE, Rgb::BLACK, Rgb::WHITE], 256),
                Palette::generate("Black-white-black", &[Rgb::BLACK, Rgb::WHITE, Rgb::BLACK], 256),
                Palette::new("Black/white", vec![Rgb::BLACK.to_argb(), Rgb::WHITE.to_argb()]),
                Palette::rainbow(),
                Palette::rainbow_inverted(),
            ],
        }
    }

    /// A custom table. Falls back to the standard table when `palettes` is
    /// empty.
    pub fn from_palettes(palettes: Vec<Palette>) -> Self {
        if palettes.is_empty() {
            return Self::standard();
        }
        Self { palettes }
    }

    pub fn len(&self) -> usize {
        self.palettes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.palettes.is_empty()
    }

    /// Reduce any index into the table's range.
    pub fn wrap_index(&self, index: usize) -> usize {
        index % self.palettes.len()
    }

    /// The index after `index`, wrapping to the first palette.
    pub fn next_index(&self, index: usize) -> usize {
        self.wrap_index(self.wrap_index(index) + 1)
    }

    /// Palette at `index`, wrapping modulo the table size.
    pub fn get(&self, index: usize) -> &Palette {
        &self.palettes[self.wrap_index(index)]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Palette> {
        self.palettes.iter()
    }
}

impl Default for PaletteTable {
    fn default() -> Self {
        Self::standard()
    }
}
