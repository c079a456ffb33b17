use anyhow::Result;

use mandelzoom_render::PaletteTable;

pub fn run() -> Result<()> {
    for (index, palette) in PaletteTable::standard().iter().enumerate() {
        println!("{index:>2}  {:<36} {:>4} colours", palette.name(), palette.len());
    }
    Ok(())
}
