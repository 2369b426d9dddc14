//! # Particles 模块
//!
//! 粒子连线背景的纯模拟部分：位置、速度、边缘反弹与近邻连线。
//! 绘制交给宿主（浏览器中是 canvas 2D 上下文）。

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::capability::CapabilityTier;
use crate::effect::Viewport;

/// 粒子效果配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleConfig {
    /// Normal 档位下的粒子数量（Low 档位按比例缩减）
    #[serde(default = "default_base_count")]
    pub base_count: usize,

    /// 两个粒子之间连线的最大距离（像素）
    #[serde(default = "default_link_distance")]
    pub link_distance: f64,

    /// 粒子最大速度（像素/秒）
    #[serde(default = "default_speed")]
    pub speed: f64,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            base_count: default_base_count(),
            link_distance: default_link_distance(),
            speed: default_speed(),
        }
    }
}

fn default_base_count() -> usize {
    80
}

fn default_link_distance() -> f64 {
    120.0
}

fn default_speed() -> f64 {
    30.0
}

/// 粒子速度上限（像素/秒）
pub const MAX_SPEED: f64 = 10_000.0;

/// 粒子数量上限
pub const MAX_BASE_COUNT: usize = 2_000;

/// 单个粒子
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
}

/// 两个粒子之间的连线
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub from: usize,
    pub to: usize,
    /// 透明度，距离越近越不透明 (0.0 - 1.0]
    pub alpha: f64,
}

/// 粒子场
#[derive(Debug, Clone)]
pub struct ParticleField {
    particles: Vec<Particle>,
    viewport: Viewport,
    rng: SmallRng,
}

impl ParticleField {
    /// 按档位生成粒子场
    ///
    /// 粒子数量为 `tier.scale(config.base_count)`，同一 `seed` 生成同样的初始布局。
    pub fn new(
        config: &ParticleConfig,
        tier: CapabilityTier,
        viewport: Viewport,
        seed: u64,
    ) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let count = tier.scale(config.base_count.min(MAX_BASE_COUNT));
        let speed = clamp_speed(config.speed);
        let particles = (0..count)
            .map(|_| spawn(&mut rng, viewport, speed))
            .collect();
        Self {
            particles,
            viewport,
            rng,
        }
    }

    /// 推进 `dt_secs` 秒，碰到边缘时反弹
    pub fn step(&mut self, dt_secs: f64) {
        let Viewport { width, height } = self.viewport;
        for p in &mut self.particles {
            p.x += p.vx * dt_secs;
            p.y += p.vy * dt_secs;

            if p.x < 0.0 {
                p.x = -p.x;
                p.vx = p.vx.abs();
            } else if p.x > width {
                p.x = (2.0 * width - p.x).max(0.0);
                p.vx = -p.vx.abs();
            }

            if p.y < 0.0 {
                p.y = -p.y;
                p.vy = p.vy.abs();
            } else if p.y > height {
                p.y = (2.0 * height - p.y).max(0.0);
                p.vy = -p.vy.abs();
            }
        }
    }

    /// 视口尺寸变化
    ///
    /// 粒子按比例映射到新视口，速度保持不变。
    pub fn resize(&mut self, viewport: Viewport) {
        let sx = ratio(viewport.width, self.viewport.width);
        let sy = ratio(viewport.height, self.viewport.height);
        for p in &mut self.particles {
            p.x = (p.x * sx).clamp(0.0, viewport.width.max(0.0));
            p.y = (p.y * sy).clamp(0.0, viewport.height.max(0.0));
        }
        self.viewport = viewport;
    }

    /// 计算距离小于 `max_distance` 的粒子对
    pub fn links(&self, max_distance: f64) -> Vec<Link> {
        if !(max_distance > 0.0) {
            return Vec::new();
        }
        let max_sq = max_distance * max_distance;
        let mut links = Vec::new();
        for (i, a) in self.particles.iter().enumerate() {
            for (j, b) in self.particles.iter().enumerate().skip(i + 1) {
                let dx = a.x - b.x;
                let dy = a.y - b.y;
                let dist_sq = dx * dx + dy * dy;
                if dist_sq < max_sq {
                    links.push(Link {
                        from: i,
                        to: j,
                        alpha: 1.0 - dist_sq.sqrt() / max_distance,
                    });
                }
            }
        }
        links
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

fn spawn(rng: &mut SmallRng, viewport: Viewport, speed: f64) -> Particle {
    let x = random_extent(rng, viewport.width);
    let y = random_extent(rng, viewport.height);
    let (vx, vy) = if speed > 0.0 {
        (
            rng.random_range(-speed..speed),
            rng.random_range(-speed..speed),
        )
    } else {
        (0.0, 0.0)
    };
    Particle { x, y, vx, vy }
}

/// 在 `[0, extent)` 内取随机坐标；非正或非有限的尺寸取 0
fn random_extent(rng: &mut SmallRng, extent: f64) -> f64 {
    if extent > 0.0 && extent.is_finite() {
        rng.random_range(0.0..extent)
    } else {
        0.0
    }
}

/// NaN 与负数视为 0，超过上限的截断到 [`MAX_SPEED`]
fn clamp_speed(speed: f64) -> f64 {
    if speed.is_nan() {
        0.0
    } else {
        speed.clamp(0.0, MAX_SPEED)
    }
}

fn ratio(new: f64, old: f64) -> f64 {
    if old > 0.0 { new / old } else { 1.0 }
}
