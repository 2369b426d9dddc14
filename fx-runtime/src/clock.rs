//! # Clock 模块
//!
//! 帧时钟：根据宿主给出的帧时间戳计算相邻两帧的时间差。
//!
//! 时间差超过上限（例如标签页从后台恢复）时按一个标准帧处理，
//! 避免模拟一次性跳跃过大。

use crate::config::FxConfig;

/// 传给 `on_frame` 的帧上下文
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameContext {
    /// 与上一帧的时间差（秒，已钳制）
    pub dt_secs: f64,
    /// 自首次激活以来累计的有效时间（秒）
    pub elapsed_secs: f64,
    /// 帧序号，从 0 开始
    pub frame_index: u64,
    /// 宿主给出的原始时间戳（毫秒）
    pub timestamp_ms: f64,
}

/// 帧时钟
#[derive(Debug, Clone)]
pub struct FrameClock {
    nominal_ms: f64,
    max_delta_ms: f64,
    last_timestamp_ms: Option<f64>,
    elapsed_secs: f64,
    frame_index: u64,
}

impl FrameClock {
    /// 创建帧时钟
    pub fn new(nominal_ms: f64, max_delta_ms: f64) -> Self {
        Self {
            nominal_ms,
            max_delta_ms,
            last_timestamp_ms: None,
            elapsed_secs: 0.0,
            frame_index: 0,
        }
    }

    /// 使用配置创建帧时钟
    pub fn from_config(config: &FxConfig) -> Self {
        Self::new(config.nominal_frame_ms, config.max_frame_delta_ms)
    }

    /// 重新激活时调用
    ///
    /// 丢弃上一帧时间戳，下一帧按标准帧计算；累计时间和帧序号保留。
    pub fn resume(&mut self) {
        self.last_timestamp_ms = None;
    }

    /// 推进一帧
    pub fn tick(&mut self, timestamp_ms: f64) -> FrameContext {
        let delta_ms = match self.last_timestamp_ms {
            None => self.nominal_ms,
            Some(prev) => {
                let delta = timestamp_ms - prev;
                if delta.is_nan() || delta < 0.0 {
                    0.0
                } else if delta > self.max_delta_ms {
                    self.nominal_ms
                } else {
                    delta
                }
            }
        };
        self.last_timestamp_ms = Some(timestamp_ms);

        let dt_secs = delta_ms / 1000.0;
        self.elapsed_secs += dt_secs;

        let ctx = FrameContext {
            dt_secs,
            elapsed_secs: self.elapsed_secs,
            frame_index: self.frame_index,
            timestamp_ms,
        };
        self.frame_index += 1;
        ctx
    }

    /// 已推进的帧数
    pub fn frames(&self) -> u64 {
        self.frame_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOMINAL: f64 = 16.0;

    fn clock() -> FrameClock {
        FrameClock::new(NOMINAL, 1000.0)
    }

    #[test]
    fn test_first_frame_is_nominal() {
        let mut clock = clock();
        let ctx = clock.tick(5000.0);
        assert_eq!(ctx.dt_secs, NOMINAL / 1000.0);
        assert_eq!(ctx.frame_index, 0);
    }

    #[test]
    fn test_regular_delta() {
        let mut clock = clock();
        clock.tick(0.0);
        let ctx = clock.tick(20.0);
        assert!((ctx.dt_secs - 0.020).abs() < 1e-9);
        assert_eq!(ctx.frame_index, 1);
    }

    #[test]
    fn test_large_gap_becomes_nominal() {
        let mut clock = clock();
        clock.tick(0.0);
        // 标签页在后台停留了 30 秒
        let ctx = clock.tick(30_000.0);
        assert_eq!(ctx.dt_secs, NOMINAL / 1000.0);
    }

    #[test]
    fn test_backwards_timestamp_is_zero() {
        let mut clock = clock();
        clock.tick(100.0);
        let ctx = clock.tick(90.0);
        assert_eq!(ctx.dt_secs, 0.0);
    }

    #[test]
    fn test_resume_restarts_delta() {
        let mut clock = clock();
        clock.tick(0.0);
        clock.tick(16.0);
        clock.resume();
        let ctx = clock.tick(500.0);
        assert_eq!(ctx.dt_secs, NOMINAL / 1000.0);
        assert_eq!(ctx.frame_index, 2);
        assert_eq!(clock.frames(), 3);
    }
}
