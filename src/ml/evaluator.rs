// ============================================================
// Layer 5 — Evaluation
// ============================================================
// Mean cross-entropy and argmax accuracy over a labelled
// dataset. Always runs on a non-autodiff backend.
//
//   accuracy = #{argmax(logits) == label} / #examples  ∈ [0, 1]

use std::sync::Arc;

use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    prelude::*,
};

use crate::data::{
    batcher::{NliBatch, NliBatcher},
    dataset::NliDataset,
};
use crate::ml::model::ReftClassifier;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalOutcome {
    /// Mean per-example cross-entropy
    pub loss:     f64,
    pub accuracy: f64,
    pub count:    usize,
}

/// Number of rows whose argmax matches the label.
/// argmax(1) returns [batch, 1], flattened before comparing.
pub fn count_correct<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> usize {
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    let correct: i64 = predicted
        .equal(labels)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>();
    correct.max(0) as usize
}

pub fn evaluate<B: Backend>(
    model:  &ReftClassifier<B>,
    loader: &Arc<dyn DataLoader<NliBatch<B>>>,
) -> EvalOutcome {
    let mut loss_sum = 0.0f64;
    let mut correct  = 0usize;
    let mut count    = 0usize;

    for batch in loader.iter() {
        let size   = batch.labels.dims()[0];
        let output = model.forward_classification(batch.input_ids, batch.attention_mask, batch.labels);

        let batch_loss: f64 = output.loss.into_scalar().elem::<f64>();
        loss_sum += batch_loss * size as f64;
        correct  += count_correct(output.output, output.targets);
        count    += size;
    }

    if count == 0 {
        return EvalOutcome { loss: f64::NAN, accuracy: 0.0, count: 0 };
    }

    EvalOutcome {
        loss:     loss_sum / count as f64,
        accuracy: correct as f64 / count as f64,
        count,
    }
}

/// Build an ordered loader over `dataset` and evaluate it.
pub fn evaluate_dataset<B: Backend>(
    model:      &ReftClassifier<B>,
    dataset:    NliDataset,
    batch_size: usize,
    device:     &B::Device,
) -> EvalOutcome {
    let loader = DataLoaderBuilder::new(NliBatcher::<B>::new(device.clone()))
        .batch_size(batch_size.max(1))
        .num_workers(1)
        .build(dataset);
    evaluate(model, &loader)
}
