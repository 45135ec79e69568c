// ============================================================
// Layer 5 — Learning-Rate Schedules
// ============================================================
// Every schedule starts with linear warmup from 0 over
// `warmup_ratio × total_steps` optimiser steps, then:
//
//   constant: lr
//   linear:   lr · (total − t) / (total − warmup)
//   cosine:   lr · ½ (1 + cos(π · progress))
//
// Stateless: the trainer asks for the rate of step t.

use serde::{Deserialize, Serialize};
use std::{f64::consts::PI, fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    Constant,
    #[default]
    Linear,
    Cosine,
}

impl fmt::Display for ScheduleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScheduleKind::Constant => "constant",
            ScheduleKind::Linear   => "linear",
            ScheduleKind::Cosine   => "cosine",
        })
    }
}

impl FromStr for ScheduleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "constant" => Ok(ScheduleKind::Constant),
            "linear"   => Ok(ScheduleKind::Linear),
            "cosine"   => Ok(ScheduleKind::Cosine),
            other      => Err(format!("unknown schedule '{other}' (constant, linear, cosine)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LrSchedule {
    kind:         ScheduleKind,
    base_lr:      f64,
    warmup_steps: usize,
    total_steps:  usize,
}

impl LrSchedule {
    pub fn new(kind: ScheduleKind, base_lr: f64, warmup_ratio: f64, total_steps: usize) -> Self {
        let warmup_steps = (warmup_ratio.clamp(0.0, 1.0) * total_steps as f64).ceil() as usize;
        Self { kind, base_lr, warmup_steps, total_steps }
    }

    pub fn warmup_steps(&self) -> usize {
        self.warmup_steps
    }

    /// Learning rate for 0-based optimiser step `step`.
    pub fn lr_at(&self, step: usize) -> f64 {
        if step < self.warmup_steps {
            return self.base_lr * step as f64 / self.warmup_steps as f64;
        }

        let decay_steps = self.total_steps.saturating_sub(self.warmup_steps).max(1);
        let progress    = ((step - self.warmup_steps) as f64 / decay_steps as f64).min(1.0);

        match self.kind {
            ScheduleKind::Constant => self.base_lr,
            ScheduleKind::Linear   => self.base_lr * (1.0 - progress),
            ScheduleKind::Cosine   => self.base_lr * 0.5 * (1.0 + (PI * progress).cos()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warmup_ramps_linearly() {
        let s = LrSchedule::new(ScheduleKind::Constant, 1.0, 0.1, 100);
        assert_eq!(s.warmup_steps(), 10);
        assert_eq!(s.lr_at(0), 0.0);
        assert!((s.lr_at(5) - 0.5).abs() < 1e-12);
        assert_eq!(s.lr_at(10), 1.0);
        assert_eq!(s.lr_at(99), 1.0);
    }

    #[test]
    fn test_linear_decays_to_zero() {
        let s = LrSchedule::new(ScheduleKind::Linear, 2.0, 0.0, 10);
        assert_eq!(s.lr_at(0), 2.0);
        assert!((s.lr_at(5) - 1.0).abs() < 1e-12);
        assert_eq!(s.lr_at(10), 0.0);
        assert_eq!(s.lr_at(20), 0.0);
    }

    #[test]
    fn test_cosine_midpoint_is_half() {
        let s = LrSchedule::new(ScheduleKind::Cosine, 1.0, 0.0, 100);
        assert!((s.lr_at(50) - 0.5).abs() < 1e-9);
        assert!(s.lr_at(100).abs() < 1e-9);
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("Cosine".parse::<ScheduleKind>(), Ok(ScheduleKind::Cosine));
        assert!("noam".parse::<ScheduleKind>().is_err());
    }
}
