//! Host-side collaborator seams: audio mixer and CPU load.
//!
//! The supervisor only talks to these traits. OS audio bindings are
//! out of scope, so the shipped mixer is an in-memory one; it also
//! serves as the test mixer. CPU load comes from a `/proc/stat` delta
//! sampler on Linux and reads as 0 elsewhere.

use anyhow::Result;

/// System volume and mute control, 0–100 plus a mute flag.
pub trait Mixer {
    fn volume(&self) -> Result<u8>;
    fn set_volume(&mut self, level: u8) -> Result<()>;
    fn muted(&self) -> Result<bool>;
    fn set_muted(&mut self, muted: bool) -> Result<()>;
}

/// In-memory mixer state.
#[derive(Debug, Clone)]
pub struct SoftMixer {
    volume: u8,
    muted: bool,
}

impl SoftMixer {
    pub fn new(volume: u8) -> Self {
        Self {
            volume: volume.min(100),
            muted: false,
        }
    }
}

impl Default for SoftMixer {
    fn default() -> Self {
        Self::new(50)
    }
}

impl Mixer for SoftMixer {
    fn volume(&self) -> Result<u8> {
        Ok(self.volume)
    }

    fn set_volume(&mut self, level: u8) -> Result<()> {
        self.volume = level.min(100);
        Ok(())
    }

    fn muted(&self) -> Result<bool> {
        Ok(self.muted)
    }

    fn set_muted(&mut self, muted: bool) -> Result<()> {
        self.muted = muted;
        Ok(())
    }
}

/// Instantaneous CPU load as a 0–100 percentage.
pub trait CpuSampler {
    fn cpu_percent(&mut self) -> u8;
}

/// CPU load from `/proc/stat` deltas between calls.
///
/// The first call has no previous sample and reads 0.
#[derive(Debug, Default)]
pub struct ProcStat {
    prev: Option<(u64, u64)>,
}

impl ProcStat {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(target_os = "linux")]
    fn sample() -> Option<(u64, u64)> {
        let stat = std::fs::read_to_string("/proc/stat").ok()?;
        let line = stat.lines().next()?;
        let fields: Vec<u64> = line
            .split_whitespace()
            .skip(1)
            .filter_map(|f| f.parse().ok())
            .collect();
        if fields.len() < 4 {
            return None;
        }
        let total: u64 = fields.iter().sum();
        // idle + iowait
        let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
        Some((total, idle))
    }

    #[cfg(not(target_os = "linux"))]
    fn sample() -> Option<(u64, u64)> {
        None
    }
}

impl CpuSampler for ProcStat {
    fn cpu_percent(&mut self) -> u8 {
        let Some((total, idle)) = Self::sample() else {
            return 0;
        };
        let percent = match self.prev {
            Some((prev_total, prev_idle)) if total > prev_total => {
                let dt = total - prev_total;
                let didle = idle.saturating_sub(prev_idle);
                let busy = dt.saturating_sub(didle);
                (busy * 100 / dt).min(100)
            }
            _ => 0,
        };
        self.prev = Some((total, idle));
        #[allow(clippy::cast_possible_truncation)] // clamped to 100 above
        {
            percent as u8
        }
    }
}

/// Fixed CPU reading, for tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedCpu(pub u8);

impl CpuSampler for FixedCpu {
    fn cpu_percent(&mut self) -> u8 {
        self.0
    }
}
