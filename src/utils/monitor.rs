#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct StageStats {
    pub cpu_usage: f32,
    pub memory_usage_mb: u64,
    pub peak_memory_mb: u64,
    pub elapsed_time: Duration,
}

/// 每個 pipeline 階段結束時記錄 CPU 與記憶體使用量
#[cfg(feature = "cli")]
pub struct SystemMonitor {
    system: Mutex<System>,
    pid: Option<Pid>,
    start_time: Instant,
    peak_memory: Mutex<u64>,
    enabled: bool,
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let pid = if enabled {
            sysinfo::get_current_pid().ok()
        } else {
            None
        };
        let mut system = System::new_with_specifics(RefreshKind::everything());
        if pid.is_some() {
            system.refresh_all();
        }

        Self {
            system: Mutex::new(system),
            pid,
            start_time: Instant::now(),
            peak_memory: Mutex::new(0),
            enabled: enabled && pid.is_some(),
        }
    }

    pub fn stats(&self) -> Option<StageStats> {
        if !self.enabled {
            return None;
        }
        let pid = self.pid?;

        let mut system = self.system.lock().ok()?;
        system.refresh_all();
        let process = system.process(pid)?;
        let memory_mb = process.memory() / 1024 / 1024;

        let mut peak = self.peak_memory.lock().ok()?;
        *peak = (*peak).max(memory_mb);

        Some(StageStats {
            cpu_usage: process.cpu_usage(),
            memory_usage_mb: memory_mb,
            peak_memory_mb: *peak,
            elapsed_time: self.start_time.elapsed(),
        })
    }

    pub fn log_stage(&self, stage: &str, rows: usize) {
        if let Some(stats) = self.stats() {
            tracing::info!(
                "📊 {} ({} rows) - CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Time: {:?}",
                stage,
                rows,
                stats.cpu_usage,
                stats.memory_usage_mb,
                stats.peak_memory_mb,
                stats.elapsed_time
            );
        }
    }

    pub fn log_final_stats(&self) {
        if let Some(stats) = self.stats() {
            tracing::info!(
                "📊 Run finished - Total Time: {:?}, Peak Memory: {}MB",
                stats.elapsed_time,
                stats.peak_memory_mb
            );
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

#[cfg(feature = "cli")]
impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

// 非 CLI 建置沒有 sysinfo，提供空實作
#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct SystemMonitor;

#[cfg(not(feature = "cli"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn log_stage(&self, _stage: &str, _rows: usize) {}

    pub fn log_final_stats(&self) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_monitor_reports_nothing() {
        let monitor = SystemMonitor::new(false);
        assert!(!monitor.is_enabled());
        assert!(monitor.stats().is_none());
    }
}
