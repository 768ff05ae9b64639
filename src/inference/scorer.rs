/// Scoring session abstraction
///
/// The network is a black box that takes a resized RGB buffer and returns
/// named floats: eleven `fc9_*` attribute scores and the overall `fc11_score`.
/// `OnnxScorer` is the long-lived session built once per process.

use image::RgbImage;
use std::collections::HashMap;
use std::path::Path;
use tract_onnx::prelude::*;

use super::AnalysisError;
use crate::config::Settings;

/// Named network outputs, one scalar per output
pub type ModelOutput = HashMap<String, f32>;

/// Anything that can score a photo
pub trait AestheticScorer {
    /// Fixed (width, height) the input buffer must have
    fn input_size(&self) -> (u32, u32);

    fn score(&self, image: &RgbImage) -> Result<ModelOutput, AnalysisError>;
}

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX export of the aesthetic network, run with tract (pure Rust, CPU)
pub struct OnnxScorer {
    plan: Plan,
    output_names: Vec<String>,
    width: u32,
    height: u32,
    /// Per-channel mean in BGR order
    channel_mean: [f32; 3],
}

impl OnnxScorer {
    /// Load and optimize the model for a fixed `[1, 3, height, width]` input
    pub fn load(
        path: &Path,
        width: u32,
        height: u32,
        channel_mean: [f32; 3],
    ) -> Result<Self, AnalysisError> {
        if !path.exists() {
            return Err(AnalysisError::ModelNotFound(path.to_path_buf()));
        }

        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(model_error)?
            .with_input_fact(0, f32::fact([1, 3, height as usize, width as usize]).into())
            .map_err(model_error)?
            .into_optimized()
            .map_err(model_error)?;

        let output_names: Vec<String> = model
            .output_outlets()
            .map_err(model_error)?
            .iter()
            .map(|outlet| {
                model
                    .outlet_label(*outlet)
                    .map(str::to_string)
                    .unwrap_or_else(|| model.node(outlet.node).name.clone())
            })
            .collect();

        let plan = model.into_runnable().map_err(model_error)?;

        tracing::info!(
            model = %path.display(),
            outputs = output_names.len(),
            "🧠 scoring model loaded ({}x{})",
            width,
            height
        );

        Ok(Self {
            plan,
            output_names,
            width,
            height,
            channel_mean,
        })
    }

    /// Load the model named in the settings
    pub fn from_settings(settings: &Settings) -> Result<Self, AnalysisError> {
        let path = settings
            .model_path
            .as_deref()
            .ok_or(AnalysisError::ModelNotConfigured)?;
        Self::load(
            path,
            settings.input_width,
            settings.input_height,
            settings.channel_mean,
        )
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }
}

impl AestheticScorer for OnnxScorer {
    fn input_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn score(&self, image: &RgbImage) -> Result<ModelOutput, AnalysisError> {
        if image.dimensions() != (self.width, self.height) {
            return Err(AnalysisError::Model(format!(
                "input is {}x{}, model expects {}x{}",
                image.width(),
                image.height(),
                self.width,
                self.height
            )));
        }

        let input = image_to_tensor(image, self.channel_mean);
        let outputs = self.plan.run(tvec!(input.into())).map_err(model_error)?;

        let mut named = ModelOutput::new();
        for (name, value) in self.output_names.iter().zip(outputs.iter()) {
            let view = value.to_array_view::<f32>().map_err(model_error)?;
            if let Some(first) = view.iter().next() {
                named.insert(name.clone(), *first);
            }
        }
        Ok(named)
    }
}

/// Convert to a `[1, 3, H, W]` BGR tensor with the channel mean subtracted
///
/// The network was trained in caffe, which feeds BGR planes.
pub fn image_to_tensor(image: &RgbImage, channel_mean: [f32; 3]) -> Tensor {
    let (width, height) = image.dimensions();
    let array = tract_ndarray::Array4::from_shape_fn(
        (1, 3, height as usize, width as usize),
        |(_, c, y, x)| {
            let pixel = image.get_pixel(x as u32, y as u32);
            pixel[2 - c] as f32 - channel_mean[c]
        },
    );
    array.into()
}

fn model_error(e: impl std::fmt::Display) -> AnalysisError {
    AnalysisError::Model(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_is_bgr_planar_minus_mean() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(0, 0, image::Rgb([10, 20, 30]));
        image.put_pixel(1, 0, image::Rgb([200, 100, 50]));

        let tensor = image_to_tensor(&image, [1.0, 2.0, 3.0]);
        assert_eq!(tensor.shape(), &[1, 3, 1, 2]);

        let view = tensor
            .to_array_view::<f32>()
            .unwrap()
            .into_dimensionality::<tract_ndarray::Ix4>()
            .unwrap();
        // Blue plane first
        assert_eq!(view[[0, 0, 0, 0]], 29.0);
        assert_eq!(view[[0, 0, 0, 1]], 49.0);
        // Green plane
        assert_eq!(view[[0, 1, 0, 0]], 18.0);
        // Red plane last
        assert_eq!(view[[0, 2, 0, 1]], 197.0);
    }

    #[test]
    fn test_missing_model_file() {
        let result = OnnxScorer::load(Path::new("/nonexistent/model.onnx"), 227, 227, [0.0; 3]);
        assert!(matches!(result, Err(AnalysisError::ModelNotFound(_))));
    }

    #[test]
    fn test_unconfigured_model() {
        let settings = Settings::default();
        assert!(matches!(
            OnnxScorer::from_settings(&settings),
            Err(AnalysisError::ModelNotConfigured)
        ));
    }
}
