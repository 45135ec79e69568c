// ============================================================
// Layer 5 — Backend Selection
// ============================================================
// Training runs on Autodiff<Inner>; evaluation and inference
// run on Inner directly (no graph bookkeeping, dropout off).
//
//   cpu  → NdArray
//   wgpu → Wgpu (Vulkan / Metal / DX12)

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type CpuBackend      = burn::backend::NdArray;
pub type CpuTrainBackend = burn::backend::Autodiff<CpuBackend>;
pub type GpuBackend      = burn::backend::Wgpu;
pub type GpuTrainBackend = burn::backend::Autodiff<GpuBackend>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Cpu,
    Wgpu,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceKind::Cpu  => "cpu",
            DeviceKind::Wgpu => "wgpu",
        })
    }
}
