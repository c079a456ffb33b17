//! Gesture scripts: a JSON list of input steps replayed against an
//! [`Explorer`], standing in for a touch screen.
//!
//! ```json
//! {
//!   "width": 400,
//!   "height": 300,
//!   "steps": [
//!     { "op": "toggle_julia" },
//!     { "op": "pointer", "event": { "action": "down", "primary": { "x": 200, "y": 150 } } },
//!     { "op": "pointer", "event": { "action": "move", "primary": { "x": 180, "y": 150 } } },
//!     { "op": "pointer", "event": { "action": "up", "primary": { "x": 180, "y": 150 } } },
//!     { "op": "next_palette" },
//!     { "op": "iterations_up" }
//!   ]
//! }
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use mandelzoom_core::PointerEvent;
use mandelzoom_render::ComputeEngine;

use crate::explorer::Explorer;
use crate::settings::JuliaSeedMode;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Surface size; the persisted size when absent.
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Pointer input on the Mandelbrot view.
    Pointer { event: PointerEvent },
    /// Pointer input on the Julia view.
    JuliaPointer { event: PointerEvent },
    NextPalette,
    IterationsUp,
    IterationsDown,
    SetIterations { value: i64 },
    Slider { progress: u32 },
    Reset,
    ToggleJulia,
    SeedMode { mode: JuliaSeedMode },
    Resize { width: u32, height: u32 },
    /// Let both sweeps run to the finest level before the next step.
    Wait,
}

impl Script {
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse script {}", path.display()))
    }

    /// Apply every step in order, then let both views finish.
    pub fn run<E: ComputeEngine + 'static>(&self, explorer: &mut Explorer<E>) -> Result<()> {
        for (index, step) in self.steps.iter().enumerate() {
            debug!(index, ?step, "Replaying step");
            apply(explorer, step).with_context(|| format!("Step {index} ({step:?}) failed"))?;
        }
        explorer.wait();
        explorer.process_events()?;
        Ok(())
    }
}

fn apply<E: ComputeEngine + 'static>(
    explorer: &mut Explorer<E>,
    step: &Step,
) -> mandelzoom_render::Result<()> {
    match step {
        Step::Pointer { event } => explorer.handle_pointer(event).map(drop),
        Step::JuliaPointer { event } => explorer.handle_julia_pointer(event).map(drop),
        Step::NextPalette => explorer.next_palette(),
        Step::IterationsUp => explorer.step_iterations(true),
        Step::IterationsDown => explorer.step_iterations(false),
        Step::SetIterations { value } => explorer.set_iterations(*value),
        Step::Slider { progress } => explorer.set_iterations_from_slider(*progress),
        Step::Reset => explorer.reset(),
        Step::ToggleJulia => explorer.toggle_julia().map(drop),
        Step::SeedMode { mode } => {
            explorer.set_seed_mode(*mode);
            Ok(())
        }
        Step::Resize { width, height } => explorer.resize(*width, *height),
        Step::Wait => {
            explorer.wait();
            explorer.process_events()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::settings::AppSettings;
    use mandelzoom_core::PointerAction;
    use mandelzoom_render::{CpuEngine, PaletteTable};

    const SCRIPT: &str = r#"{
        "width": 48,
        "height": 32,
        "steps": [
            { "op": "toggle_julia" },
            { "op": "pointer", "event": { "action": "down", "primary": { "x": 24, "y": 16 } } },
            { "op": "pointer", "event": { "action": "move", "primary": { "x": 24, "y": 16 } } },
            { "op": "pointer", "event": { "action": "move", "primary": { "x": 20, "y": 16 } } },
            { "op": "pointer", "event": { "action": "up", "primary": { "x": 20, "y": 16 } } },
            { "op": "next_palette" },
            { "op": "iterations_up" },
            { "op": "wait" }
        ]
    }"#;

    fn explorer() -> Explorer<CpuEngine> {
        let settings = AppSettings {
            julia_size: 24,
            ..AppSettings::default()
        };
        let mut ex =
            Explorer::new(Arc::new(CpuEngine::new()), PaletteTable::standard(), &settings).unwrap();
        ex.resize(48, 32).unwrap();
        ex
    }

    #[test]
    fn parses_tagged_steps() {
        let script: Script = serde_json::from_str(SCRIPT).unwrap();
        assert_eq!(script.width, Some(48));
        assert_eq!(script.steps.len(), 8);
        assert_eq!(script.steps[0], Step::ToggleJulia);
        match &script.steps[1] {
            Step::Pointer { event } => {
                assert_eq!(event.action, PointerAction::Down);
                assert_eq!(event.secondary, None);
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn unknown_op_is_rejected() {
        let err = serde_json::from_str::<Script>(r#"{ "steps": [{ "op": "teleport" }] }"#);
        assert!(err.is_err());
    }

    #[test]
    fn replay_drives_both_views() {
        let script: Script = serde_json::from_str(SCRIPT).unwrap();
        let mut ex = explorer();
        script.run(&mut ex).unwrap();

        assert!(ex.julia_enabled());
        assert_eq!(ex.palette_index(), 1);
        assert_eq!(ex.mandelbrot().iterations(), 136);
        let centre = ex.mandelbrot().viewport().bounds().center();
        assert!(centre.re > -0.5, "drag moved the window: {centre}");
        assert_eq!(ex.julia().viewport().julia_seed(), centre);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Script::load(&dir.path().join("nope.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read script"));
    }
}
