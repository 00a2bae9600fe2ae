// SPDX-License-Identifier: CEPL-1.0
use std::path::Path;
use std::{fs, io};

use lumen_render::{PresentPreference, RendererConfig, SceneKind};
use serde::Deserialize;
use tracing::{info, warn};

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub render: RenderSection,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RenderSection {
    pub clear_color: [f32; 4],
    pub frames_in_flight: usize,
    pub present_mode: PresentModeCfg,
    pub scene: SceneCfg,
    pub validation: bool,
    /// Force FIFO while the window is unfocused.
    pub vsync_when_unfocused: bool,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.0, 0.0, 1.0],
            frames_in_flight: 2,
            present_mode: PresentModeCfg::Mailbox,
            scene: SceneCfg::VertexBuffer,
            validation: false,
            vsync_when_unfocused: true,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PresentModeCfg {
    #[default]
    Mailbox,
    Fifo,
}

#[derive(Debug, Deserialize, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SceneCfg {
    Procedural,
    #[default]
    #[value(name = "vertex_buffer")]
    VertexBuffer,
}

impl From<PresentModeCfg> for PresentPreference {
    fn from(mode: PresentModeCfg) -> Self {
        match mode {
            PresentModeCfg::Mailbox => PresentPreference::LowLatency,
            PresentModeCfg::Fifo => PresentPreference::Fifo,
        }
    }
}

impl From<SceneCfg> for SceneKind {
    fn from(scene: SceneCfg) -> Self {
        match scene {
            SceneCfg::Procedural => SceneKind::Procedural,
            SceneCfg::VertexBuffer => SceneKind::VertexBuffer,
        }
    }
}

impl AppConfig {
    pub fn parse(src: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(src)
    }

    /// Missing file: defaults. Unreadable or malformed file: warn, then defaults.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(src) => match Self::parse(&src) {
                Ok(cfg) => {
                    info!("loaded {}", path.display());
                    cfg
                }
                Err(e) => {
                    warn!("{}: {e}; using defaults", path.display());
                    Self::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                warn!("{}: {e}; using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn renderer_config(&self) -> RendererConfig {
        let r = &self.render;
        let scene = SceneKind::from(r.scene);
        RendererConfig {
            app_name: "lumen".to_owned(),
            clear_color: r.clear_color,
            frames_in_flight: r.frames_in_flight,
            present: r.present_mode.into(),
            scene,
            validation: r.validation,
            shaders: lumen_render_vk::shaders::builtin(scene),
        }
    }
}
