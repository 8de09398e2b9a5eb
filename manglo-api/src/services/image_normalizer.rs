//! Image normalization for classifier input
//!
//! Decodes an uploaded image, forces 3-channel RGB, resizes to the model's
//! fixed square resolution with a deterministic triangle filter, scales
//! pixels to [0, 1], and lays the result out as an NCHW tensor with a
//! batch dimension of 1. Pure function of the input bytes aside from
//! logging on failure.

use candle_core::{Device, Tensor};
use image::imageops::FilterType;
use tracing::warn;

use super::PredictError;

pub struct ImageNormalizer {
    input_size: u32,
    device: Device,
}

impl ImageNormalizer {
    pub fn new(input_size: u32) -> Self {
        Self {
            input_size,
            device: Device::Cpu,
        }
    }

    /// Decode and normalize raw image bytes into a `(1, 3, S, S)` tensor
    /// of f32 values in [0, 1].
    pub fn normalize(&self, bytes: &[u8]) -> Result<Tensor, PredictError> {
        let decoded = image::load_from_memory(bytes).map_err(|e| {
            warn!("Rejected upload: not a decodable image: {}", e);
            PredictError::Decode(e.to_string())
        })?;

        // to_rgb8 collapses grayscale, RGBA, and palette sources alike
        let rgb = decoded.to_rgb8();
        let resized = image::imageops::resize(
            &rgb,
            self.input_size,
            self.input_size,
            FilterType::Triangle,
        );

        let size = self.input_size as usize;
        let pixels: Vec<f32> = resized
            .into_raw()
            .into_iter()
            .map(|v| f32::from(v) / 255.0)
            .collect();

        // HWC from the decoder, CHW for the model, then the batch dimension
        Tensor::from_vec(pixels, (size, size, 3), &self.device)
            .and_then(|t| t.permute((2, 0, 1)))
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| PredictError::Inference(e.to_string()))
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}
