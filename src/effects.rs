//! Models behind the decorative page effects.
//!
//! Nothing here draws; the frontend asks whether a loop may run and pulls
//! frames or bar geometry from these types.

use crate::config::LowEndMode;
use rand::Rng;
use serde::Serialize;
use sysinfo::System;

const LOW_END_MAX_CORES: usize = 4;
const LOW_END_MAX_MEMORY_BYTES: u64 = 4 * 1024 * 1024 * 1024;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
    pub cpu_cores: usize,
    pub memory_bytes: u64,
    pub low_end: bool,
}

impl DeviceProfile {
    pub fn from_capabilities(cpu_cores: usize, memory_bytes: u64, mode: LowEndMode) -> Self {
        let low_end = match mode {
            LowEndMode::Forced => true,
            LowEndMode::Disabled => false,
            LowEndMode::Auto => {
                cpu_cores <= LOW_END_MAX_CORES
                    || (memory_bytes > 0 && memory_bytes <= LOW_END_MAX_MEMORY_BYTES)
            }
        };
        Self {
            cpu_cores,
            memory_bytes,
            low_end,
        }
    }

    pub fn detect(mode: LowEndMode) -> Self {
        let mut system = System::new();
        system.refresh_memory();
        let cores = std::thread::available_parallelism()
            .map(|value| value.get())
            .unwrap_or(1);
        Self::from_capabilities(cores, system.total_memory(), mode)
    }
}

/// Animation loops run only while the page is visible on a capable device.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationGate {
    visible: bool,
    capable: bool,
}

impl AnimationGate {
    pub fn new(device: &DeviceProfile) -> Self {
        Self {
            visible: true,
            capable: !device.low_end,
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn should_run(&self) -> bool {
        self.visible && self.capable
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Particle {
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
}

/// Particles drifting across a wrap-around canvas.
#[derive(Clone, Debug, Serialize)]
pub struct ParticleField {
    pub width: f32,
    pub height: f32,
    particles: Vec<Particle>,
}

impl ParticleField {
    /// Fewer particles are spawned on low-end devices.
    pub fn particle_count(width: f32, height: f32, low_end: bool) -> usize {
        let density = if low_end { 30_000.0 } else { 12_000.0 };
        ((width * height) / density).clamp(10.0, 150.0) as usize
    }

    pub fn new(width: f32, height: f32, count: usize, rng: &mut impl Rng) -> Self {
        let particles = (0..count)
            .map(|_| Particle {
                x: rng.random_range(0.0..width.max(1.0)),
                y: rng.random_range(0.0..height.max(1.0)),
                vx: rng.random_range(-0.5..0.5),
                vy: rng.random_range(-0.5..0.5),
            })
            .collect();
        Self {
            width,
            height,
            particles,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Advances every particle by `dt` frames, wrapping at the edges.
    pub fn step(&mut self, dt: f32) {
        for particle in &mut self.particles {
            particle.x = wrap(particle.x + particle.vx * dt, self.width);
            particle.y = wrap(particle.y + particle.vy * dt, self.height);
        }
    }

    /// ASCII frame of `cols` x `rows` cells.
    pub fn render_ascii(&self, cols: usize, rows: usize) -> Vec<String> {
        if cols == 0 || rows == 0 {
            return vec![];
        }
        let mut grid = vec![vec![' '; cols]; rows];
        for particle in &self.particles {
            let col = ((particle.x / self.width) * cols as f32) as usize;
            let row = ((particle.y / self.height) * rows as f32) as usize;
            if let Some(cell) = grid
                .get_mut(row.min(rows - 1))
                .and_then(|r| r.get_mut(col.min(cols - 1)))
            {
                *cell = if *cell == ' ' { '.' } else { '*' };
            }
        }
        grid.into_iter().map(|row| row.into_iter().collect()).collect()
    }
}

fn wrap(value: f32, max: f32) -> f32 {
    if max <= 0.0 {
        return 0.0;
    }
    let wrapped = value.rem_euclid(max);
    if wrapped >= max { 0.0 } else { wrapped }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Bar {
    pub x: f32,
    pub width: f32,
    pub height: f32,
}

/// Bar geometry for one analyser frame: `width / bins * 1.5` wide, scaled
/// to 85% of the canvas height, one pixel apart.
pub fn visualizer_bars(frequencies: &[u8], width: f32, height: f32) -> Vec<Bar> {
    if frequencies.is_empty() {
        return vec![];
    }
    let bar_width = (width / frequencies.len() as f32) * 1.5;
    let mut x = 0.0;
    frequencies
        .iter()
        .map(|value| {
            let bar = Bar {
                x,
                width: bar_width,
                height: (*value as f32 / 255.0) * height * 0.85,
            };
            x += bar_width + 1.0;
            bar
        })
        .collect()
}

/// Text rendering of [`visualizer_bars`], tallest bar on top.
pub fn visualizer_ascii(frequencies: &[u8], rows: usize) -> Vec<String> {
    let bars = visualizer_bars(frequencies, frequencies.len() as f32, rows as f32);
    (0..rows)
        .rev()
        .map(|level| {
            bars.iter()
                .map(|bar| if bar.height > level as f32 { '█' } else { ' ' })
                .collect()
        })
        .collect()
}
