use std::sync::Mutex;
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};

#[derive(Debug, Clone)]
pub struct PhaseStats {
    pub phase: String,
    pub phase_time: Duration,
    pub elapsed_time: Duration,
    pub memory_usage_mb: Option<u64>,
}

/// 紀錄各階段 (extract / transform / load) 耗時與記憶體用量
pub struct SystemMonitor {
    enabled: bool,
    start_time: Instant,
    last_mark: Mutex<Instant>,
    #[cfg(feature = "cli")]
    system: Option<(Mutex<System>, Pid)>,
    peak_memory: Mutex<u64>,
}

impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let now = Instant::now();

        #[cfg(feature = "cli")]
        let system = if enabled {
            sysinfo::get_current_pid().ok().map(|pid| {
                let mut system = System::new_with_specifics(RefreshKind::everything());
                system.refresh_all();
                (Mutex::new(system), pid)
            })
        } else {
            None
        };

        Self {
            enabled,
            start_time: now,
            last_mark: Mutex::new(now),
            #[cfg(feature = "cli")]
            system,
            peak_memory: Mutex::new(0),
        }
    }

    #[cfg(feature = "cli")]
    fn memory_mb(&self) -> Option<u64> {
        let (system, pid) = self.system.as_ref()?;
        let mut system = system.lock().ok()?;
        system.refresh_all();
        let process = system.process(*pid)?;
        Some(process.memory() / 1024 / 1024)
    }

    #[cfg(not(feature = "cli"))]
    fn memory_mb(&self) -> Option<u64> {
        None
    }

    /// 結束一個階段並回傳統計；未啟用時回傳 None
    pub fn mark(&self, phase: &str) -> Option<PhaseStats> {
        if !self.enabled {
            return None;
        }

        let now = Instant::now();
        let phase_time = {
            let mut last = self.last_mark.lock().ok()?;
            let elapsed = now.duration_since(*last);
            *last = now;
            elapsed
        };

        let memory_usage_mb = self.memory_mb();
        if let Some(memory) = memory_usage_mb {
            let mut peak = self.peak_memory.lock().ok()?;
            *peak = (*peak).max(memory);
        }

        Some(PhaseStats {
            phase: phase.to_string(),
            phase_time,
            elapsed_time: self.start_time.elapsed(),
            memory_usage_mb,
        })
    }

    pub fn log_stats(&self, phase: &str) {
        if let Some(stats) = self.mark(phase) {
            match stats.memory_usage_mb {
                Some(memory) => tracing::info!(
                    "📊 {} - Phase: {:?}, Memory: {}MB, Time: {:?}",
                    stats.phase,
                    stats.phase_time,
                    memory,
                    stats.elapsed_time
                ),
                None => tracing::info!(
                    "📊 {} - Phase: {:?}, Time: {:?}",
                    stats.phase,
                    stats.phase_time,
                    stats.elapsed_time
                ),
            }
        }
    }

    pub fn log_final_stats(&self) {
        if !self.enabled {
            return;
        }
        let peak = self.peak_memory.lock().map(|p| *p).unwrap_or(0);
        tracing::info!(
            "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
            self.start_time.elapsed(),
            peak
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_monitor_reports_nothing() {
        let monitor = SystemMonitor::default();
        assert!(!monitor.is_enabled());
        assert!(monitor.mark("extract").is_none());
    }

    #[test]
    fn test_enabled_monitor_tracks_phases() {
        let monitor = SystemMonitor::new(true);
        let first = monitor.mark("extract").unwrap();
        let second = monitor.mark("transform").unwrap();
        assert_eq!(first.phase, "extract");
        assert!(second.elapsed_time >= first.elapsed_time);
    }
}
