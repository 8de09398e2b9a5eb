//! Disease classifier
//!
//! Wraps the pre-trained leaf-disease model. Weights are loaded exactly
//! once at process start from a safetensors artifact; if loading fails the
//! service still starts, degraded, and every `classify()` call fails fast
//! with `PredictError::ModelUnavailable` until restart. The loaded model is
//! shared read-only across requests and never reloaded.

use candle_core::{DType, Device, Tensor, D};
use candle_nn::{conv2d, linear, ops::softmax, Conv2d, Conv2dConfig, Linear, Module, VarBuilder};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{error, info};

use super::PredictError;

/// One classification outcome: arg-max label, its probability, and the
/// full per-class distribution (one entry per configured class).
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    pub predicted_label: String,
    pub confidence: f32,
    pub per_class_scores: BTreeMap<String, f32>,
}

/// Small convolutional network over NCHW [0,1] input.
///
/// Three conv/pool stages, global average pooling, one dense layer to the
/// class logits. Variable names (conv1..conv3, fc) must match the artifact.
pub struct LeafCnn {
    conv1: Conv2d,
    conv2: Conv2d,
    conv3: Conv2d,
    fc: Linear,
}

impl LeafCnn {
    pub fn new(vb: VarBuilder, num_classes: usize) -> candle_core::Result<Self> {
        let cfg = Conv2dConfig {
            padding: 1,
            ..Default::default()
        };
        Ok(Self {
            conv1: conv2d(3, 16, 3, cfg, vb.pp("conv1"))?,
            conv2: conv2d(16, 32, 3, cfg, vb.pp("conv2"))?,
            conv3: conv2d(32, 64, 3, cfg, vb.pp("conv3"))?,
            fc: linear(64, num_classes, vb.pp("fc"))?,
        })
    }

    fn forward(&self, input: &Tensor) -> candle_core::Result<Tensor> {
        let x = self.conv1.forward(input)?.relu()?.max_pool2d(2)?;
        let x = self.conv2.forward(&x)?.relu()?.max_pool2d(2)?;
        let x = self.conv3.forward(&x)?.relu()?.max_pool2d(2)?;
        // Global average pool over the spatial dimensions
        let x = x.mean(D::Minus1)?.mean(D::Minus1)?;
        self.fc.forward(&x)
    }
}

pub struct Classifier {
    model: Option<LeafCnn>,
    labels: Vec<String>,
}

impl Classifier {
    /// Load the model artifact. Never fails: a load error produces a
    /// degraded classifier whose `classify()` reports `ModelUnavailable`.
    pub fn load(artifact_path: &Path, labels: Vec<String>) -> Self {
        let device = Device::Cpu;
        let model = match Self::load_model(artifact_path, labels.len(), &device) {
            Ok(model) => {
                info!("✓ Classifier model loaded: {}", artifact_path.display());
                Some(model)
            }
            Err(e) => {
                error!(
                    "Classifier model load failed ({}): {}; predictions disabled until restart",
                    artifact_path.display(),
                    e
                );
                None
            }
        };

        Self { model, labels }
    }

    fn load_model(
        path: &Path,
        num_classes: usize,
        device: &Device,
    ) -> anyhow::Result<LeafCnn> {
        let tensors = candle_core::safetensors::load(path, device)?;
        let vb = VarBuilder::from_tensors(tensors, DType::F32, device);
        Ok(LeafCnn::new(vb, num_classes)?)
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Run one forward pass over a normalized `(1, 3, S, S)` tensor.
    ///
    /// Deterministic: identical input tensors produce bit-identical scores
    /// (CPU inference, no sampling).
    pub fn classify(&self, input: &Tensor) -> Result<PredictionResult, PredictError> {
        let model = self.model.as_ref().ok_or(PredictError::ModelUnavailable)?;

        let logits = model
            .forward(input)
            .map_err(|e| PredictError::Inference(e.to_string()))?;
        let probs = softmax(&logits, D::Minus1)
            .and_then(|p| p.squeeze(0))
            .and_then(|p| p.to_vec1::<f32>())
            .map_err(|e| PredictError::Inference(e.to_string()))?;

        if probs.len() != self.labels.len() {
            return Err(PredictError::Inference(format!(
                "model produced {} scores for {} classes",
                probs.len(),
                self.labels.len()
            )));
        }

        let (best_idx, best_score) = probs
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .ok_or_else(|| PredictError::Inference("empty score vector".to_string()))?;

        let per_class_scores: BTreeMap<String, f32> = self
            .labels
            .iter()
            .cloned()
            .zip(probs.iter().copied())
            .collect();

        Ok(PredictionResult {
            predicted_label: self.labels[best_idx].clone(),
            confidence: *best_score,
            per_class_scores,
        })
    }
}
