use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::driver::AnimationDriver;
use crate::effects::mount_page;
use crate::layout::{ElementGeometry, StaticLayout, Viewport};
use crate::style::{RecordingSink, StyleWrite};

/// Nominal display refresh used to stamp simulated frames.
const FRAME_MS: f64 = 1000.0 / 60.0;

/// Upper bound on `--frames` (about 4.6 hours at 60 fps).
pub const MAX_FRAMES: u64 = 1_000_000;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scroll trace headlessly and dump the style writes
    Simulate {
        /// Engine configuration (JSON); defaults are used when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Scene description (JSON): viewport, elements and scroll events
        #[arg(long)]
        scene: PathBuf,

        /// Number of frames to run
        #[arg(long, default_value_t = 120)]
        frames: u64,

        /// Output file; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check a configuration file
    Validate {
        #[arg(long)]
        config: PathBuf,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            config,
            scene,
            frames,
            out,
        } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => EngineConfig::default(),
            };
            let scene_json = fs::read_to_string(&scene)
                .with_context(|| format!("Failed to read scene {:?}", scene))?;
            let scene: Scene = serde_json::from_str(&scene_json)
                .with_context(|| format!("Failed to parse scene {:?}", scene))?;

            let report = simulate(&config, &scene, frames)?;
            let json = serde_json::to_string_pretty(&report)?;
            match out {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("Failed to write {:?}", path))?;
                    println!("Wrote {} frames to {:?}", report.frames.len(), path);
                }
                None => println!("{}", json),
            }
        }
        Commands::Validate { config } => {
            load_config(&config)?;
            println!("{:?}: ok", config);
        }
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<EngineConfig> {
    let json =
        fs::read_to_string(path).with_context(|| format!("Failed to read config {:?}", path))?;
    EngineConfig::from_json(&json).with_context(|| format!("Invalid config {:?}", path))
}

/// A page to simulate: element geometry plus a timeline of host events.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Scene {
    pub viewport: Viewport,
    /// Whether late content has loaded before the first frame.
    pub loaded: bool,
    /// Frame at which late content finishes loading, when `loaded` is false.
    pub load_frame: Option<u64>,
    pub elements: BTreeMap<String, Vec<ElementGeometry>>,
    pub events: Vec<SceneEvent>,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            viewport: Viewport::default(),
            loaded: true,
            load_frame: None,
            elements: BTreeMap::new(),
            events: Vec::new(),
        }
    }
}

/// Host event delivered just before the given frame runs.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneEvent {
    pub frame: u64,
    #[serde(default)]
    pub scroll_top: Option<f32>,
    /// A new viewport, delivered as a resize.
    #[serde(default)]
    pub viewport: Option<Viewport>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameRecord {
    pub frame: u64,
    pub scroll_top: f32,
    pub writes: Vec<StyleWrite>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationReport {
    pub effects: Vec<&'static str>,
    /// Writes made while mounting, before the first frame.
    pub mount: Vec<StyleWrite>,
    pub frames: Vec<FrameRecord>,
}

impl Scene {
    fn layout(&self) -> StaticLayout {
        let mut layout = StaticLayout::new(self.viewport);
        layout.set_loaded(self.loaded);
        for (selector, elements) in &self.elements {
            for element in elements {
                layout.insert(selector.as_str(), *element);
            }
        }
        layout
    }
}

/// Run `frames` frames of `scene` through a freshly mounted page.
pub fn simulate(config: &EngineConfig, scene: &Scene, frames: u64) -> Result<SimulationReport> {
    if frames > MAX_FRAMES {
        anyhow::bail!("At most {} frames can be simulated, got {}", MAX_FRAMES, frames);
    }
    let mut layout = scene.layout();
    let mut sink = RecordingSink::new();
    let mut driver = AnimationDriver::new(0.0);
    let handles = mount_page(config, &mut driver, &layout, &mut sink)
        .context("Failed to mount page")?;
    let mount = sink.take();

    let mut events = scene.events.clone();
    events.sort_by_key(|e| e.frame);
    let mut pending = events.into_iter().peekable();

    let mut records = Vec::new();
    for frame in 0..frames {
        if !scene.loaded && scene.load_frame == Some(frame) {
            layout.set_loaded(true);
            driver.content_loaded(&layout, &mut sink);
        }
        while let Some(event) = pending.next_if(|e| e.frame <= frame) {
            if let Some(viewport) = event.viewport {
                layout.set_viewport(viewport);
                driver.resize(&layout, &mut sink);
            }
            if let Some(offset) = event.scroll_top {
                layout.set_scroll_offset(offset);
                driver.scroll_to(offset, &layout, &mut sink);
            }
        }
        driver.frame(frame as f64 * FRAME_MS, &layout, &mut sink);
        records.push(FrameRecord {
            frame,
            scroll_top: layout.scroll_offset(),
            writes: sink.take(),
        });
    }
    log::info!("Simulated {} frames with {} effects", frames, handles.len());

    Ok(SimulationReport {
        effects: handles.iter().map(|h| h.name()).collect(),
        mount,
        frames: records,
    })
}
