// ============================================================
// Layer 5 — LoReFT Intervention
// ============================================================
// Low-rank linear subspace representation fine-tuning.
// For a hidden state h (row vector of size d):
//
//   Φ(h) = h + (W h + b − R h) Rᵀ
//
//   R : [rank, d]  rows orthonormal at initialisation
//   W : [rank, d], b : [rank]  a learned linear projection
//
// Only the first `positions` tokens of the layer output are
// edited; the rest of the sequence passes through untouched.
// Dropout applies to the low-rank difference (W h + b − R h).
//
// Reference: Wu et al. (2024) ReFT: Representation Finetuning
//            for Language Models

use burn::{
    module::Param,
    nn::{Dropout, DropoutConfig, Linear, LinearConfig},
    prelude::*,
    tensor::Distribution,
};

#[derive(Config, Debug)]
pub struct LoreftConfig {
    pub d_model:   usize,
    pub rank:      usize,
    /// Encoder block whose output this intervention edits
    pub layer:     usize,
    /// Number of leading token positions edited
    pub positions: usize,
    #[config(default = 0.0)]
    pub dropout:   f64,
}

impl LoreftConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LoreftIntervention<B> {
        let random = Tensor::<B, 2>::random(
            [self.rank, self.d_model],
            Distribution::Normal(0.0, 1.0),
            device,
        );
        let mut rows: Vec<f32> = random.into_data().iter::<f32>().collect();
        orthonormalize_rows(&mut rows, self.rank, self.d_model);

        let rotate = Tensor::<B, 2>::from_data(
            TensorData::new(rows, [self.rank, self.d_model]),
            device,
        );

        LoreftIntervention {
            rotate:         Param::from_tensor(rotate),
            learned_source: LinearConfig::new(self.d_model, self.rank).init(device),
            dropout:        DropoutConfig::new(self.dropout).init(),
            rank:           self.rank,
            layer:          self.layer,
            positions:      self.positions,
        }
    }
}

#[derive(Module, Debug)]
pub struct LoreftIntervention<B: Backend> {
    /// R — [rank, d_model]
    pub rotate:         Param<Tensor<B, 2>>,
    /// W h + b — d_model → rank
    pub learned_source: Linear<B>,
    pub dropout:        Dropout,
    pub rank:           usize,
    pub layer:          usize,
    pub positions:      usize,
}

impl<B: Backend> LoreftIntervention<B> {
    /// hidden: [batch, seq, d_model] → same shape, prefix edited
    pub fn forward(&self, hidden: Tensor<B, 3>) -> Tensor<B, 3> {
        let [batch, seq_len, d_model] = hidden.dims();
        let positions = self.positions.min(seq_len);
        if positions == 0 {
            return hidden;
        }

        let prefix = hidden.clone().slice([0..batch, 0..positions, 0..d_model]);

        // [rank, d] → [batch, rank, d] for batched matmul
        let rotate = self.rotate.val()
            .unsqueeze::<3>()
            .expand([batch, self.rank, d_model]);

        let projected = prefix.clone().matmul(rotate.clone().swap_dims(1, 2)); // [b, p, rank]
        let source    = self.learned_source.forward(prefix.clone());          // [b, p, rank]
        let edit      = self.dropout.forward(source - projected).matmul(rotate); // [b, p, d]

        hidden.slice_assign([0..batch, 0..positions, 0..d_model], prefix + edit)
    }
}

/// Gram-Schmidt over the rows of a row-major [rows, cols] matrix.
/// Requires rows <= cols.
pub fn orthonormalize_rows(values: &mut [f32], rows: usize, cols: usize) {
    for i in 0..rows {
        let (done, rest) = values.split_at_mut(i * cols);
        let row = &mut rest[..cols];

        if !project_out_and_normalize(row, done, cols) {
            // degenerate draw: take the standard basis vector that keeps
            // the most length once the accepted rows are removed
            let mut best: Option<(f32, Vec<f32>)> = None;
            for k in 0..cols {
                let mut candidate = vec![0.0; cols];
                candidate[k] = 1.0;
                let residual = remove_components(&mut candidate, done, cols);
                if best.as_ref().map_or(true, |(norm, _)| residual > *norm) {
                    best = Some((residual, candidate));
                }
            }
            if let Some((norm, candidate)) = best {
                row.iter_mut().zip(candidate).for_each(|(v, c)| *v = c / norm);
            }
        }
    }
}

/// Subtract the projections onto the accepted rows; returns the
/// remaining norm.
fn remove_components(row: &mut [f32], accepted: &[f32], cols: usize) -> f32 {
    for basis in accepted.chunks_exact(cols) {
        let dot: f32 = row.iter().zip(basis).map(|(a, b)| a * b).sum();
        row.iter_mut().zip(basis).for_each(|(v, b)| *v -= dot * b);
    }
    row.iter().map(|v| v * v).sum::<f32>().sqrt()
}

fn project_out_and_normalize(row: &mut [f32], accepted: &[f32], cols: usize) -> bool {
    let norm = remove_components(row, accepted, cols);
    if norm > 1e-6 {
        row.iter_mut().for_each(|v| *v /= norm);
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestBackend, D_MODEL};

    fn intervention(rank: usize, positions: usize) -> LoreftIntervention<TestBackend> {
        LoreftConfig::new(D_MODEL, rank, 0, positions).init(&Default::default())
    }

    #[test]
    fn test_rotation_rows_are_orthonormal() {
        let iv   = intervention(3, 1);
        let r    = iv.rotate.val();
        let gram: Vec<f32> = r.clone().matmul(r.transpose()).into_data().iter::<f32>().collect();

        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((gram[i * 3 + j] - expected).abs() < 1e-4, "gram[{i},{j}]={}", gram[i * 3 + j]);
            }
        }
    }

    #[test]
    fn test_only_prefix_positions_are_edited() {
        let device = Default::default();
        let iv     = intervention(2, 2);
        let hidden = Tensor::<TestBackend, 3>::random([2, 5, D_MODEL], Distribution::Default, &device);

        let out = iv.forward(hidden.clone());
        assert_eq!(out.dims(), [2, 5, D_MODEL]);

        let tail_in:  Vec<f32> = hidden.clone().slice([0..2, 2..5, 0..D_MODEL]).into_data().iter::<f32>().collect();
        let tail_out: Vec<f32> = out.clone().slice([0..2, 2..5, 0..D_MODEL]).into_data().iter::<f32>().collect();
        assert_eq!(tail_in, tail_out);

        let head_in:  Vec<f32> = hidden.slice([0..2, 0..2, 0..D_MODEL]).into_data().iter::<f32>().collect();
        let head_out: Vec<f32> = out.slice([0..2, 0..2, 0..D_MODEL]).into_data().iter::<f32>().collect();
        assert_ne!(head_in, head_out);
    }

    #[test]
    fn test_positions_beyond_sequence_are_clamped() {
        let device = Default::default();
        let iv     = intervention(1, 10);
        let hidden = Tensor::<TestBackend, 3>::zeros([1, 3, D_MODEL], &device);
        assert_eq!(iv.forward(hidden).dims(), [1, 3, D_MODEL]);
    }

    #[test]
    fn test_parameter_count() {
        let rank = 2;
        // R + W + b
        assert_eq!(intervention(rank, 1).num_params(), rank * D_MODEL * 2 + rank);
    }

    #[test]
    fn test_orthonormalize_degenerate_row() {
        let mut values = vec![1.0, 0.0, 0.0, 2.0, 0.0, 0.0];
        orthonormalize_rows(&mut values, 2, 3);
        assert_eq!(&values[0..3], &[1.0, 0.0, 0.0]);
        assert_eq!(&values[3..6], &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_degenerate_row_never_repeats_an_accepted_row() {
        // the second row collapses onto e1, which the first row already uses
        let mut values = vec![0.0, 1.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 0.0];
        orthonormalize_rows(&mut values, 3, 3);

        for i in 0..3 {
            for j in 0..3 {
                let dot: f32 = (0..3).map(|k| values[i * 3 + k] * values[j * 3 + k]).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-5, "rows {i},{j}: {dot}");
            }
        }
    }
}
