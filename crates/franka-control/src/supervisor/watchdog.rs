//! 命令超时看门狗
//!
//! 独立线程按固定频率（默认 100Hz）调用 [`ModeSupervisor::check_command_timeout`]。
//! 与命令到达无关：即使没有任何消息，检查也会持续进行。
//!
//! 停止方式：丢弃 [`WatchdogHandle`]（或调用 [`WatchdogHandle::shutdown`]）关闭停止通道，
//! 线程在下一次 `select!` 时退出。

use super::mode::ModeSupervisor;
use crate::error::ControlError;
use crossbeam_channel::{Sender, bounded, select, tick};
use franka_driver::{Clock, ControllerSwitcher};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace};

/// 看门狗线程句柄
///
/// Drop 时停止并 join 线程。
pub struct WatchdogHandle {
    shutdown_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<u64>>,
}

impl WatchdogHandle {
    /// 停止看门狗，返回执行过的回退次数
    pub fn shutdown(mut self) -> u64 {
        self.stop()
    }

    fn stop(&mut self) -> u64 {
        // 关闭通道即通知线程退出
        drop(self.shutdown_tx.take());
        match self.thread.take().map(JoinHandle::join) {
            Some(Ok(fallbacks)) => fallbacks,
            Some(Err(_)) => {
                error!("Watchdog thread panicked");
                0
            },
            None => 0,
        }
    }
}

impl Drop for WatchdogHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 启动看门狗线程
pub fn spawn_watchdog<S, C>(
    supervisor: Arc<ModeSupervisor<S, C>>,
    rate_hz: f64,
) -> Result<WatchdogHandle, ControlError>
where
    S: ControllerSwitcher + 'static,
    C: Clock + 'static,
{
    if !(rate_hz.is_finite() && rate_hz > 0.0) {
        return Err(ControlError::LoopConfig(format!(
            "Invalid watchdog rate: {} Hz (must be > 0)",
            rate_hz
        )));
    }
    // 周期必须可表示，且能加到当前时刻上
    let period = Duration::try_from_secs_f64(1.0 / rate_hz)
        .ok()
        .filter(|p| Instant::now().checked_add(*p).is_some())
        .ok_or_else(|| {
            ControlError::LoopConfig(format!(
                "Invalid watchdog rate: {} Hz (period out of range)",
                rate_hz
            ))
        })?;
    let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

    let thread = thread::Builder::new()
        .name("franka-watchdog".to_string())
        .spawn(move || {
            let ticker = tick(period);
            let mut fallbacks = 0u64;
            debug!("Watchdog started ({:?} period)", period);
            loop {
                select! {
                    recv(shutdown_rx) -> _ => break,
                    recv(ticker) -> _ => {
                        match supervisor.check_command_timeout() {
                            Ok(true) => fallbacks += 1,
                            Ok(false) => trace!("Watchdog check passed"),
                            // 已在 apply 内记录；下一周期重试
                            Err(_) => {},
                        }
                    },
                }
            }
            debug!("Watchdog stopped after {} fallbacks", fallbacks);
            fallbacks
        })
        .map_err(|e| ControlError::LoopConfig(format!("Failed to spawn watchdog thread: {}", e)))?;

    Ok(WatchdogHandle {
        shutdown_tx: Some(shutdown_tx),
        thread: Some(thread),
    })
}
