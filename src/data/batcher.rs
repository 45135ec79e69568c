// ============================================================
// Layer 4 — NLI Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks N fixed-length
// samples into tensors the model consumes.
//
//   Input:  Vec of N NliSamples, each of length S
//   Output: NliBatch with input_ids/attention_mask [N, S]
//           and labels [N]
//
// Samples are pre-padded by the preprocessor, so the batcher
// only flattens and reshapes.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::NliSample;

/// A batch of NLI samples ready for the forward pass.
#[derive(Debug, Clone)]
pub struct NliBatch<B: Backend> {
    /// Token ids — shape: [batch_size, seq_len]
    pub input_ids: Tensor<B, 2, Int>,

    /// 1 = real token, 0 = padding — shape: [batch_size, seq_len]
    pub attention_mask: Tensor<B, 2, Int>,

    /// Gold label indices — shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

/// Holds the device so tensors are created where the model lives.
#[derive(Clone, Debug)]
pub struct NliBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> NliBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<NliSample, NliBatch<B>> for NliBatcher<B> {
    fn batch(&self, items: Vec<NliSample>) -> NliBatch<B> {
        let batch_size = items.len();
        let seq_len    = items.first().map_or(0, |s| s.input_ids.len());

        // Vec<Vec<u32>> → flat Vec<i32> (Burn Int tensors take i32)
        let ids_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.input_ids.iter().map(|&x| x as i32))
            .collect();

        let mask_flat: Vec<i32> = items
            .iter()
            .flat_map(|s| s.attention_mask.iter().map(|&x| x as i32))
            .collect();

        let labels: Vec<i32> = items.iter().map(|s| s.label as i32).collect();

        let input_ids = Tensor::<B, 1, Int>::from_ints(
            ids_flat.as_slice(), &self.device
        ).reshape([batch_size, seq_len]);

        let attention_mask = Tensor::<B, 1, Int>::from_ints(
            mask_flat.as_slice(), &self.device
        ).reshape([batch_size, seq_len]);

        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        NliBatch { input_ids, attention_mask, labels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestBackend;

    fn sample(ids: [u32; 4], mask: [u32; 4], label: usize) -> NliSample {
        NliSample { input_ids: ids.to_vec(), attention_mask: mask.to_vec(), label }
    }

    #[test]
    fn test_batch_shapes_and_values() {
        let batcher = NliBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.batch(vec![
            sample([2, 7, 3, 0], [1, 1, 1, 0], 1),
            sample([2, 8, 9, 3], [1, 1, 1, 1], 2),
        ]);

        assert_eq!(batch.input_ids.dims(), [2, 4]);
        assert_eq!(batch.attention_mask.dims(), [2, 4]);
        assert_eq!(batch.labels.dims(), [2]);

        let labels: Vec<i64> = batch.labels.into_data().iter::<i64>().collect();
        assert_eq!(labels, vec![1, 2]);

        let mask_sum: i64 = batch.attention_mask.sum().into_scalar().elem();
        assert_eq!(mask_sum, 7);
    }
}
