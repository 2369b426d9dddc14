//! # Effects 模块
//!
//! 内置效果的纯计算部分，不接触 DOM，可在任何宿主上测试。
//!
//! - [`particles`]: 粒子连线背景
//! - [`counter`]: 数字滚动
//! - [`reveal`]: 分组依次出现
//! - [`easing`]: 缓动曲线

pub mod counter;
pub mod easing;
pub mod particles;
pub mod reveal;

pub use counter::CountUp;
pub use easing::Easing;
pub use particles::{Link, Particle, ParticleConfig, ParticleField};
pub use reveal::StaggerPlan;
