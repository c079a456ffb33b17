//! PNG export with embedded metadata (tEXt chunks).

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tracing::debug;

use mandelzoom_core::{Complex, FractalKind, ViewportState};

use crate::error::RenderError;

/// Metadata to embed in an exported PNG as tEXt chunks.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportMetadata {
    pub kind: FractalKind,
    pub center: Complex,
    pub extent: f64,
    pub iterations: u32,
    pub palette_name: String,
    pub julia_seed: Option<Complex>,
    pub width: u32,
    pub height: u32,
}

impl ExportMetadata {
    /// Describe the current state of `viewport`. The centre is taken from
    /// the bounds, so it is current even between renders.
    pub fn from_viewport(viewport: &ViewportState, palette_name: &str) -> Self {
        let bounds = viewport.bounds();
        Self {
            kind: viewport.kind(),
            center: bounds.center(),
            extent: bounds.width(),
            iterations: viewport.iterations(),
            palette_name: palette_name.to_string(),
            julia_seed: viewport.is_julia().then(|| viewport.julia_seed()),
            width: viewport.size().width,
            height: viewport.size().height,
        }
    }
}

/// Write an RGBA pixel buffer as a PNG file with embedded fractal metadata.
pub fn export_png(
    pixels: &[u8],
    width: u32,
    height: u32,
    path: &Path,
    metadata: &ExportMetadata,
) -> crate::Result<()> {
    if width == 0 || height == 0 || pixels.len() != width as usize * height as usize * 4 {
        return Err(RenderError::InvalidDimensions { width, height });
    }
    let writer = BufWriter::new(File::create(path)?);

    let mut encoder = png::Encoder::new(writer, width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_compression(png::Compression::Default);

    encoder.add_text_chunk("Software".to_string(), "Mandelzoom".to_string())?;
    encoder.add_text_chunk("Description".to_string(), build_description(metadata))?;
    for (key, value) in build_metadata_pairs(metadata) {
        encoder.add_text_chunk(key, value)?;
    }

    let mut png_writer = encoder.write_header()?;
    png_writer.write_image_data(pixels)?;
    png_writer.finish()?;

    debug!(width, height, path = %path.display(), "Exported PNG");
    Ok(())
}

fn build_description(meta: &ExportMetadata) -> String {
    let mut desc = format!(
        "{} - Center: {}, Extent: {}, Iterations: {}",
        meta.kind, meta.center, meta.extent, meta.iterations,
    );
    if let Some(seed) = meta.julia_seed {
        desc.push_str(&format!(", Julia seed: {seed}"));
    }
    desc
}

fn build_metadata_pairs(meta: &ExportMetadata) -> Vec<(String, String)> {
    let mut pairs = vec![
        ("Mandelzoom.FractalType".into(), meta.kind.label().to_string()),
        ("Mandelzoom.CenterRe".into(), meta.center.re.to_string()),
        ("Mandelzoom.CenterIm".into(), meta.center.im.to_string()),
        ("Mandelzoom.Extent".into(), meta.extent.to_string()),
        ("Mandelzoom.Iterations".into(), meta.iterations.to_string()),
        ("Mandelzoom.Palette".into(), meta.palette_name.clone()),
        ("Mandelzoom.Resolution".into(), format!("{}x{}", meta.width, meta.height)),
    ];
    if let Some(seed) = meta.julia_seed {
        pairs.push(("Mandelzoom.JuliaSeedRe".into(), seed.re.to_string()));
        pairs.push(("Mandelzoom.JuliaSeedIm".into(), seed.im.to_string()));
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn meta(kind: FractalKind, w: u32, h: u32) -> ExportMetadata {
        let mut vp = ViewportState::new(kind);
        vp.set_julia_seed(Complex::new(-0.7, 0.27015));
        vp.init_bounds(w, h);
        ExportMetadata::from_viewport(&vp, "Rainbow")
    }

    #[test]
    fn export_creates_valid_png() {
        let (w, h) = (4u32, 4u32);
        let pixels = vec![128u8; (w * h * 4) as usize];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.png");
        export_png(&pixels, w, h, &path, &meta(FractalKind::Mandelbrot, w, h))
            .expect("export should succeed");

        let mut header = [0u8; 8];
        File::open(&path).unwrap().read_exact(&mut header).unwrap();
        assert_eq!(&header, b"\x89PNG\r\n\x1a\n", "valid PNG signature");
    }

    #[test]
    fn export_embeds_text_chunks() {
        let (w, h) = (2u32, 2u32);
        let pixels = vec![0u8; (w * h * 4) as usize];
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.png");
        export_png(&pixels, w, h, &path, &meta(FractalKind::Julia, w, h)).unwrap();

        let decoder = png::Decoder::new(File::open(&path).unwrap());
        let reader = decoder.read_info().unwrap();
        let texts = &reader.info().uncompressed_latin1_text;
        let has = |k: &str, v: &str| texts.iter().any(|t| t.keyword == k && t.text == v);
        assert!(has("Software", "Mandelzoom"));
        assert!(has("Mandelzoom.FractalType", "Julia"));
        assert!(has("Mandelzoom.JuliaSeedRe", "-0.7"));
        assert!(has("Mandelzoom.Palette", "Rainbow"));
    }

    #[test]
    fn mandelbrot_has_no_seed_chunk() {
        let pairs = build_metadata_pairs(&meta(FractalKind::Mandelbrot, 8, 8));
        assert!(pairs.iter().all(|(k, _)| !k.contains("JuliaSeed")));
        assert!(pairs.contains(&("Mandelzoom.Iterations".to_string(), "128".to_string())));
    }

    #[test]
    fn rejects_mismatched_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.png");
        let err = export_png(&[0u8; 12], 2, 2, &path, &meta(FractalKind::Mandelbrot, 2, 2));
        assert!(matches!(err, Err(RenderError::InvalidDimensions { width: 2, height: 2 })));
        assert!(!path.exists());
    }

    #[test]
    fn unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.png");
        let err = export_png(&[0u8; 4], 1, 1, &path, &meta(FractalKind::Mandelbrot, 1, 1));
        assert!(matches!(err, Err(RenderError::Io(_))));
    }
}
