//! 固定频率控制循环
//!
//! 宿主框架不提供周期调度时，用 [`run_controller`] 驱动任意 [`ControllerLifecycle`]：
//!
//! - **绝对时间锚点**: 每周期睡眠到 `next_tick`，自动扣除 `update` 的耗时
//! - **超时追赶**: `update` 超过一个周期时不睡眠，锚点重置到当前时间
//! - **dt 钳位**: 实际周期超过 `dt_clamp_multiplier` 倍标称周期时调用 `on_time_jump()`
//! - **停止标志**: 只在周期边界检查
//!
//! ```rust,ignore
//! let stop = AtomicBool::new(false);
//! let config = LoopConfig::from_rate(1000.0);
//! let stats = run_controller(&mut controller, &config, &stop)?;
//! ```

use super::lifecycle::ControllerLifecycle;
use crate::error::ControlError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// 控制循环配置
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// 控制频率（Hz）
    pub frequency_hz: f64,

    /// dt 钳位倍数
    ///
    /// 实际周期超过 `dt_clamp_multiplier / frequency_hz` 时触发 `on_time_jump()`。
    pub dt_clamp_multiplier: f64,

    /// 最大迭代次数（None 表示运行到停止标志置位）
    pub max_iterations: Option<u64>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        LoopConfig {
            frequency_hz: 1000.0,
            dt_clamp_multiplier: 2.0,
            max_iterations: None,
        }
    }
}

impl LoopConfig {
    /// 以给定频率创建，其余取默认值
    pub fn from_rate(frequency_hz: f64) -> Self {
        Self {
            frequency_hz,
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(), ControlError> {
        if !(self.frequency_hz.is_finite() && self.frequency_hz > 0.0) {
            return Err(ControlError::LoopConfig(format!(
                "Invalid frequency_hz: {} (must be > 0)",
                self.frequency_hz
            )));
        }
        if self.frequency_hz > 10000.0 {
            warn!(
                "Very high control frequency: {} Hz. This may cause performance issues.",
                self.frequency_hz
            );
        }
        if !(self.dt_clamp_multiplier.is_finite() && self.dt_clamp_multiplier >= 1.0) {
            return Err(ControlError::LoopConfig(format!(
                "Invalid dt_clamp_multiplier: {} (must be >= 1)",
                self.dt_clamp_multiplier
            )));
        }
        Ok(())
    }

    /// 标称周期与 dt 钳位上限
    fn periods(&self) -> Result<(Duration, Duration), ControlError> {
        let nominal = 1.0 / self.frequency_hz;
        let period = Duration::try_from_secs_f64(nominal).map_err(|e| {
            ControlError::LoopConfig(format!(
                "Invalid frequency_hz: {} (period out of range: {})",
                self.frequency_hz, e
            ))
        })?;
        let max_dt =
            Duration::try_from_secs_f64(nominal * self.dt_clamp_multiplier).map_err(|e| {
                ControlError::LoopConfig(format!(
                    "Invalid dt_clamp_multiplier: {} (clamp out of range: {})",
                    self.dt_clamp_multiplier, e
                ))
            })?;
        Ok((period, max_dt))
    }
}

/// 循环运行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// 完成的 `update` 次数
    pub iterations: u64,
    /// 耗时超过一个周期的次数
    pub overruns: u64,
    /// 触发 `on_time_jump()` 的次数
    pub time_jumps: u64,
    /// 观测到的最大实际周期
    pub max_period: Duration,
}

/// 运行控制循环（阻塞）
///
/// 先调用 `starting()`，然后按固定频率调用 `update()`，直到：
/// - `update()` 返回错误
/// - 达到 `max_iterations`
/// - `stop` 被置位
///
/// 正常结束和出错时都会调用 `stopping()`。
pub fn run_controller<C>(
    controller: &mut C,
    config: &LoopConfig,
    stop: &AtomicBool,
) -> Result<LoopStats, ControlError>
where
    C: ControllerLifecycle,
    ControlError: From<C::Error>,
{
    config.validate()?;
    let (period, max_dt) = config.periods()?;

    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;
        use tracing::info;

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => {
                info!("Control thread priority set to MAX (realtime)");
            },
            Err(e) => {
                warn!(
                    "Failed to set control thread priority: {}. \
                    On Linux, you may need to run with CAP_SYS_NICE or use rtkit.",
                    e
                );
            },
        }
    }

    controller.starting()?;
    debug!("Control loop started at {} Hz", config.frequency_hz);

    let result = run_ticks(controller, config, stop, period, max_dt);
    if let Err(e) = &result {
        error!("Control loop aborted: {}", e);
    }

    // 出错时也要停用控制器；先报告的错误优先
    let stopped = controller.stopping().map_err(ControlError::from);
    let stats = result?;
    stopped?;

    debug!(
        "Control loop finished: {} iterations, {} overruns",
        stats.iterations, stats.overruns
    );
    Ok(stats)
}

fn run_ticks<C>(
    controller: &mut C,
    config: &LoopConfig,
    stop: &AtomicBool,
    period: Duration,
    max_dt: Duration,
) -> Result<LoopStats, ControlError>
where
    C: ControllerLifecycle,
    ControlError: From<C::Error>,
{
    let mut stats = LoopStats::default();
    let mut last_time = Instant::now();
    let mut next_tick = last_time + period;
    let mut first = true;

    loop {
        if stop.load(Ordering::Acquire) {
            return Ok(stats);
        }
        if let Some(max_iter) = config.max_iterations
            && stats.iterations >= max_iter
        {
            return Ok(stats);
        }

        // 1. 计算 dt（第一个周期使用标称周期）
        let now = Instant::now();
        let real_dt = if first { period } else { now - last_time };
        first = false;
        last_time = now;
        stats.max_period = stats.max_period.max(real_dt);

        // 2. dt 钳位
        let mut dt = real_dt;
        if real_dt > max_dt {
            controller.on_time_jump(real_dt)?;
            stats.time_jumps += 1;
            dt = max_dt;
        }

        // 3. 控制周期
        controller.update(dt)?;
        stats.iterations += 1;

        // 4. 睡眠到下一个锚点
        let now = Instant::now();
        if next_tick > now {
            spin_sleep::sleep(next_tick - now);
            next_tick += period;
        } else {
            stats.overruns += 1;
            warn!(
                "Control loop overrun: tick finished {:?} past its deadline (period {:?})",
                now.duration_since(next_tick),
                period
            );
            next_tick = now + period;
        }
    }
}
