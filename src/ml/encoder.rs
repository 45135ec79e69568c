// ============================================================
// Layer 5 — Base Transformer Encoder
// ============================================================
// BERT-style post-LayerNorm encoder:
//   • token + learned position embeddings, LayerNorm, dropout
//   • N blocks of padded self-attention and a GELU FFN,
//     each sub-layer wrapped in residual + LayerNorm
//
// The encoder is the frozen part of the assembly. Its forward
// pass takes an `edit` hook called with every block's output,
// which is where representation interventions are applied.
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Devlin et al. (2019) BERT

use anyhow::{bail, Result};
use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

// #[derive(Config)] already provides Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct EncoderConfig {
    pub vocab_size:              usize,
    pub max_position_embeddings: usize,
    pub d_model:                 usize,
    pub num_heads:               usize,
    pub num_layers:              usize,
    pub d_ff:                    usize,
    #[config(default = 0.1)]
    pub dropout:                 f64,
    #[config(default = 1e-5)]
    pub layer_norm_eps:          f64,
}

impl EncoderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_heads == 0 || self.d_model % self.num_heads != 0 {
            bail!(
                "d_model ({}) must be a positive multiple of num_heads ({})",
                self.d_model, self.num_heads
            );
        }
        if self.vocab_size == 0 || self.max_position_embeddings == 0 || self.num_layers == 0 {
            bail!("vocab_size, max_position_embeddings and num_layers must be non-zero");
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Encoder<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_position_embeddings, self.d_model).init(device);
        let embedding_norm     = self.layer_norm(device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_block(device))
            .collect();
        Encoder {
            token_embedding,
            position_embedding,
            embedding_norm,
            layers,
            dropout: DropoutConfig::new(self.dropout).init(),
            d_model: self.d_model,
            max_position_embeddings: self.max_position_embeddings,
        }
    }

    fn layer_norm<B: Backend>(&self, device: &B::Device) -> LayerNorm<B> {
        LayerNormConfig::new(self.d_model)
            .with_epsilon(self.layer_norm_eps)
            .init(device)
    }

    fn build_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        EncoderBlock {
            self_attn: MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
                .with_dropout(self.dropout)
                .init(device),
            ffn_in:    LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_out:   LinearConfig::new(self.d_ff, self.d_model).init(device),
            attn_norm: self.layer_norm(device),
            ffn_norm:  self.layer_norm(device),
            dropout:   DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn: MultiHeadAttention<B>,
    pub ffn_in:    Linear<B>,
    pub ffn_out:   Linear<B>,
    pub attn_norm: LayerNorm<B>,
    pub ffn_norm:  LayerNorm<B>,
    pub dropout:   Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// x: [batch, seq, d_model], mask_pad: [batch, seq] (true = padding)
    pub fn forward(&self, x: Tensor<B, 3>, mask_pad: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn = self.self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_pad(mask_pad))
            .context;
        let x = self.attn_norm.forward(x + self.dropout.forward(attn));

        let ffn = self.ffn_out.forward(
            burn::tensor::activation::gelu(self.ffn_in.forward(x.clone()))
        );
        self.ffn_norm.forward(x + self.dropout.forward(ffn))
    }
}

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub token_embedding:         Embedding<B>,
    pub position_embedding:      Embedding<B>,
    pub embedding_norm:          LayerNorm<B>,
    pub layers:                  Vec<EncoderBlock<B>>,
    pub dropout:                 Dropout,
    pub d_model:                 usize,
    pub max_position_embeddings: usize,
}

impl<B: Backend> Encoder<B> {
    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    /// input_ids: [batch, seq] → embeddings [batch, seq, d_model]
    pub fn embed(&self, input_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = input_ids.dims();
        let tok_emb = self.token_embedding.forward(input_ids);

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        self.dropout.forward(self.embedding_norm.forward(tok_emb + pos_emb))
    }

    /// Hidden states of the last layer: [batch, seq, d_model]
    pub fn forward(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Tensor<B, 3> {
        self.forward_with(input_ids, attention_mask, |_, hidden| hidden)
    }

    /// Like [`Encoder::forward`], passing each block's output through
    /// `edit(layer_index, hidden)` before it feeds the next block.
    pub fn forward_with<F>(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        mut edit:       F,
    ) -> Tensor<B, 3>
    where
        F: FnMut(usize, Tensor<B, 3>) -> Tensor<B, 3>,
    {
        let mask_pad = attention_mask.equal_elem(0);
        let mut x = self.embed(input_ids);
        for (index, layer) in self.layers.iter().enumerate() {
            x = layer.forward(x, mask_pad.clone());
            x = edit(index, x);
        }
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, TestBackend};

    #[test]
    fn test_forward_shape() {
        let device  = Default::default();
        let encoder = test_support::encoder_config().init::<TestBackend>(&device);
        let ids  = Tensor::<TestBackend, 2, Int>::from_ints([[2, 5, 6, 3, 0, 0]], &device);
        let mask = Tensor::<TestBackend, 2, Int>::from_ints([[1, 1, 1, 1, 0, 0]], &device);

        assert_eq!(encoder.forward(ids, mask).dims(), [1, 6, test_support::D_MODEL]);
    }

    #[test]
    fn test_first_token_ignores_padding_content() {
        let device  = Default::default();
        let encoder = test_support::encoder_config().init::<TestBackend>(&device);
        let mask = Tensor::<TestBackend, 2, Int>::from_ints([[1, 1, 1, 0, 0]], &device);
        let a = Tensor::<TestBackend, 2, Int>::from_ints([[2, 5, 3, 0, 0]], &device);
        let b = Tensor::<TestBackend, 2, Int>::from_ints([[2, 5, 3, 9, 7]], &device);

        let first = |ids: Tensor<TestBackend, 2, Int>| -> Vec<f32> {
            encoder
                .forward(ids, mask.clone())
                .slice([0..1, 0..1, 0..test_support::D_MODEL])
                .into_data()
                .iter::<f32>()
                .collect()
        };
        let (ha, hb) = (first(a), first(b));
        for (x, y) in ha.iter().zip(&hb) {
            assert!((x - y).abs() < 1e-4, "{x} vs {y}");
        }
    }

    #[test]
    fn test_edit_hook_sees_every_layer() {
        let device  = Default::default();
        let encoder = test_support::encoder_config().init::<TestBackend>(&device);
        let ids  = Tensor::<TestBackend, 2, Int>::from_ints([[2, 5, 3]], &device);
        let mask = Tensor::<TestBackend, 2, Int>::from_ints([[1, 1, 1]], &device);

        let mut seen = Vec::new();
        encoder.forward_with(ids, mask, |i, h| { seen.push(i); h });
        assert_eq!(seen, (0..test_support::NUM_LAYERS).collect::<Vec<_>>());
    }

    #[test]
    fn test_validate_rejects_indivisible_heads() {
        let cfg = EncoderConfig::new(100, 16, 30, 4, 1, 64);
        assert!(cfg.validate().is_err());
        assert!(test_support::encoder_config().validate().is_ok());
    }
}
