//! Hardware probing and derived run parameters

use std::process::Command;

use sysinfo::{System, SystemExt};
use tracing::{debug, info};

/// Accelerator kind detected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accelerator {
    None,
    Gpu,
    AppleSilicon,
}

/// Numeric precision selected for inference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Fp16,
    Fp32,
    Int8,
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Precision::Fp16 => write!(f, "fp16"),
            Precision::Fp32 => write!(f, "fp32"),
            Precision::Int8 => write!(f, "int8"),
        }
    }
}

/// Snapshot of the machine taken once at startup
#[derive(Debug, Clone)]
pub struct HardwareProfile {
    pub total_memory_gb: f64,
    pub available_memory_gb: f64,
    pub accelerator: Accelerator,
    pub accelerator_memory_gb: f64,
}

impl HardwareProfile {
    /// Probe memory and accelerator state. Detection never fails: anything
    /// inconclusive degrades to a plain CPU profile.
    pub fn detect() -> Self {
        let mut sys = System::new();
        sys.refresh_memory();

        let total_memory_gb = sys.total_memory() as f64 / 1024.0 / 1024.0 / 1024.0;
        let available_memory_gb = sys.available_memory() as f64 / 1024.0 / 1024.0 / 1024.0;

        let (accelerator, accelerator_memory_gb) = detect_accelerator();

        let profile = Self {
            total_memory_gb,
            available_memory_gb,
            accelerator,
            accelerator_memory_gb,
        };

        info!(
            "Hardware profile: {} | memory {:.1} GB total, {:.1} GB available",
            profile.description(),
            profile.total_memory_gb,
            profile.available_memory_gb
        );

        profile
    }

    /// Human-readable description used in checkpoint headers
    pub fn description(&self) -> String {
        match self.accelerator {
            Accelerator::AppleSilicon => format!("Apple Silicon ({})", std::env::consts::ARCH),
            Accelerator::Gpu => format!(
                "{} + NVIDIA GPU ({:.1} GB)",
                std::env::consts::ARCH,
                self.accelerator_memory_gb
            ),
            Accelerator::None => format!("{} CPU", std::env::consts::ARCH),
        }
    }
}

fn detect_accelerator() -> (Accelerator, f64) {
    if cfg!(all(target_os = "macos", target_arch = "aarch64")) {
        return (Accelerator::AppleSilicon, 0.0);
    }

    if let Some(vram_gb) = probe_nvidia_vram() {
        return (Accelerator::Gpu, vram_gb);
    }

    (Accelerator::None, 0.0)
}

/// Best-effort NVIDIA probe. Any failure (missing binary, nonzero exit,
/// unparseable output) means no accelerator.
fn probe_nvidia_vram() -> Option<f64> {
    let output = Command::new("nvidia-smi")
        .args(["--query-gpu=memory.total", "--format=csv,noheader,nounits"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mb: f64 = stdout.lines().next()?.trim().parse().ok()?;
    debug!("Detected NVIDIA GPU with {:.0} MB VRAM", mb);
    Some(mb / 1024.0)
}

/// Run parameters derived from the hardware profile once at startup
#[derive(Debug, Clone)]
pub struct RunParameters {
    /// Length of each transcription segment (seconds)
    pub segment_duration_sec: u32,
    /// Overlap between adjacent segments (seconds)
    pub stride_sec: u32,
    /// Inference batch size
    pub batch_size: u32,
    /// Numeric precision for the model
    pub precision: Precision,
    /// Upper bound for the preprocessing gain adjustment (dB)
    pub volume_boost_db: f64,
}

impl RunParameters {
    /// Pure function of the hardware profile.
    pub fn derive(profile: &HardwareProfile) -> Self {
        let avail = profile.available_memory_gb;

        let segment_duration_sec = if avail >= 16.0 {
            120
        } else if avail >= 8.0 {
            90
        } else {
            60
        };

        let stride_sec = (segment_duration_sec / 20).clamp(5, 15);

        let batch_size = if avail >= 16.0 { 2 } else { 1 };

        let precision = match profile.accelerator {
            Accelerator::AppleSilicon => Precision::Fp16,
            Accelerator::Gpu if avail >= 8.0 => Precision::Fp16,
            Accelerator::Gpu => Precision::Int8,
            Accelerator::None => Precision::Fp32,
        };

        let volume_boost_db = (5.0 + (avail - 4.0)).clamp(5.0, 15.0);

        Self {
            segment_duration_sec,
            stride_sec,
            batch_size,
            precision,
            volume_boost_db,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(avail: f64, accelerator: Accelerator) -> HardwareProfile {
        HardwareProfile {
            total_memory_gb: avail * 2.0,
            available_memory_gb: avail,
            accelerator,
            accelerator_memory_gb: 0.0,
        }
    }

    #[test]
    fn test_segment_duration_tiers() {
        let p = RunParameters::derive(&profile(32.0, Accelerator::None));
        assert_eq!(p.segment_duration_sec, 120);
        assert_eq!(p.batch_size, 2);

        let p = RunParameters::derive(&profile(8.0, Accelerator::None));
        assert_eq!(p.segment_duration_sec, 90);
        assert_eq!(p.batch_size, 1);

        let p = RunParameters::derive(&profile(4.0, Accelerator::None));
        assert_eq!(p.segment_duration_sec, 60);
    }

    #[test]
    fn test_stride_bounds() {
        // 120 / 20 = 6, within [5, 15]
        let p = RunParameters::derive(&profile(16.0, Accelerator::None));
        assert_eq!(p.stride_sec, 6);

        // 60 / 20 = 3, clamped up to 5
        let p = RunParameters::derive(&profile(4.0, Accelerator::None));
        assert_eq!(p.stride_sec, 5);
    }

    #[test]
    fn test_precision_selection() {
        assert_eq!(
            RunParameters::derive(&profile(8.0, Accelerator::AppleSilicon)).precision,
            Precision::Fp16
        );
        assert_eq!(
            RunParameters::derive(&profile(16.0, Accelerator::Gpu)).precision,
            Precision::Fp16
        );
        assert_eq!(
            RunParameters::derive(&profile(4.0, Accelerator::Gpu)).precision,
            Precision::Int8
        );
        assert_eq!(
            RunParameters::derive(&profile(16.0, Accelerator::None)).precision,
            Precision::Fp32
        );
    }

    #[test]
    fn test_volume_boost_clamped() {
        assert_eq!(
            RunParameters::derive(&profile(2.0, Accelerator::None)).volume_boost_db,
            5.0
        );
        assert_eq!(
            RunParameters::derive(&profile(10.0, Accelerator::None)).volume_boost_db,
            11.0
        );
        assert_eq!(
            RunParameters::derive(&profile(64.0, Accelerator::None)).volume_boost_db,
            15.0
        );
    }

    #[test]
    fn test_detect_never_fails() {
        let profile = HardwareProfile::detect();
        assert!(profile.total_memory_gb > 0.0);
    }
}
