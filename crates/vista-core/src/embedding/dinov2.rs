//! DINOv2 ONNX session management and inference.
//!
//! Loads a DINOv2 backbone exported to ONNX and turns its output into one
//! embedding per image: `pooler_output` when the export provides it, otherwise
//! the CLS token of `last_hidden_state`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::Array4;
use ort::session::Session;
use ort::value::Value;

use crate::error::PipelineError;

/// Wraps an ONNX Runtime session for DINOv2 embedding.
///
/// Uses a `Mutex` because `Session::run` requires `&mut self`.
pub struct DinoSession {
    session: Mutex<Session>,
    /// Name of the input tensor (detected from model metadata).
    input_name: String,
    /// Expected embedding length for the loaded variant.
    dimension: usize,
}

impl DinoSession {
    /// Load a DINOv2 model from an ONNX file.
    pub fn load(model_path: &Path, dimension: usize) -> Result<Self, PipelineError> {
        let session = Session::builder()
            .map_err(|e| PipelineError::Embedding {
                path: model_path.to_path_buf(),
                message: format!("Failed to create ONNX session builder: {e}"),
            })?
            .commit_from_file(model_path)
            .map_err(|e| PipelineError::Embedding {
                path: model_path.to_path_buf(),
                message: format!("Failed to load ONNX model: {e}"),
            })?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "pixel_values".to_string());

        tracing::debug!(
            "Loaded DINOv2 model from {:?} (input: {:?}, outputs: {:?})",
            model_path,
            input_name,
            session
                .outputs()
                .iter()
                .map(|o| o.name())
                .collect::<Vec<_>>()
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            dimension,
        })
    }

    /// Run batch inference on several preprocessed tensors.
    ///
    /// Each tensor must have shape \[1, 3, H, W\]; they are stacked into one
    /// \[N, 3, H, W\] tensor for a single ONNX call. Returns N L2-normalized
    /// vectors.
    pub fn embed_batch(
        &self,
        tensors: &[Array4<f32>],
        paths: &[PathBuf],
    ) -> Result<Vec<Vec<f32>>, PipelineError> {
        let batch_size = tensors.len();
        if batch_size == 0 {
            return Ok(vec![]);
        }
        let first_path = paths.first().cloned().unwrap_or_default();

        let shape_0 = tensors[0].shape();
        let single_len = tensors[0].len();
        for (i, t) in tensors.iter().enumerate().skip(1) {
            if t.shape() != shape_0 {
                return Err(PipelineError::Embedding {
                    path: paths.get(i).cloned().unwrap_or_default(),
                    message: format!(
                        "Tensor shape mismatch in batch: expected {:?}, got {:?}",
                        shape_0,
                        t.shape()
                    ),
                });
            }
        }

        let mut flat_data = Vec::with_capacity(batch_size * single_len);
        for t in tensors {
            flat_data.extend(t.iter().copied());
        }
        let batch_shape: Vec<i64> = vec![
            batch_size as i64,
            shape_0[1] as i64,
            shape_0[2] as i64,
            shape_0[3] as i64,
        ];

        let input_value =
            Value::from_array((batch_shape, flat_data)).map_err(|e| PipelineError::Embedding {
                path: first_path.clone(),
                message: format!("Failed to create input tensor: {e}"),
            })?;

        let inputs = ort::inputs![self.input_name.as_str() => input_value];

        let mut session = self.session.lock().map_err(|e| PipelineError::Embedding {
            path: first_path.clone(),
            message: format!("Session lock poisoned: {e}"),
        })?;

        let outputs = session.run(inputs).map_err(|e| PipelineError::Embedding {
            path: first_path.clone(),
            message: format!("ONNX inference failed: {e}"),
        })?;

        let mut named = Vec::new();
        for (name, value) in outputs.iter() {
            let (shape, data) =
                value
                    .try_extract_tensor::<f32>()
                    .map_err(|e| PipelineError::Embedding {
                        path: first_path.clone(),
                        message: format!("Failed to extract output tensor {name}: {e}"),
                    })?;
            let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
            named.push((name.to_string(), dims, data.to_vec()));
        }

        let embeddings = select_embeddings(&named, batch_size, self.dimension).map_err(
            |message| PipelineError::Embedding {
                path: first_path,
                message,
            },
        )?;

        Ok(embeddings
            .into_iter()
            .map(|mut v| {
                crate::math::l2_normalize_in_place(&mut v);
                v
            })
            .collect())
    }
}

/// Pick per-image embeddings out of the model outputs.
///
/// Prefers `pooler_output` (`[N, D]`), then the CLS token of
/// `last_hidden_state` (`[N, T, D]`, token 0), then any other 2-D output.
/// The result is not normalized.
pub(crate) fn select_embeddings(
    outputs: &[(String, Vec<usize>, Vec<f32>)],
    batch_size: usize,
    dimension: usize,
) -> Result<Vec<Vec<f32>>, String> {
    let by_name = |wanted: &str| outputs.iter().find(|(name, _, _)| name == wanted);

    let (name, shape, data) = by_name("pooler_output")
        .or_else(|| by_name("last_hidden_state"))
        .or_else(|| outputs.iter().find(|(_, shape, _)| shape.len() == 2))
        .ok_or_else(|| {
            let names: Vec<&str> = outputs.iter().map(|(n, _, _)| n.as_str()).collect();
            format!("Model produced no usable output (outputs: {names:?})")
        })?;

    let vectors: Vec<Vec<f32>> = match shape.as_slice() {
        [n, d] if *n == batch_size => data.chunks(*d).map(|c| c.to_vec()).collect(),
        [n, t, d] if *n == batch_size && *t > 0 => data
            .chunks(t * d)
            .map(|tokens| tokens[..*d].to_vec())
            .collect(),
        _ => {
            return Err(format!(
                "Unexpected {name} shape {shape:?} for batch of {batch_size}"
            ))
        }
    };

    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(format!(
            "Embedding has {} dimensions, expected {dimension}; does the model match the configured size?",
            bad.len()
        ));
    }

    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(name: &str, shape: &[usize], data: Vec<f32>) -> (String, Vec<usize>, Vec<f32>) {
        (name.to_string(), shape.to_vec(), data)
    }

    #[test]
    fn test_prefers_pooler_output() {
        let outputs = vec![
            output("last_hidden_state", &[1, 2, 3], vec![9.0; 6]),
            output("pooler_output", &[1, 3], vec![1.0, 2.0, 3.0]),
        ];
        let vectors = select_embeddings(&outputs, 1, 3).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 2.0, 3.0]]);
    }

    #[test]
    fn test_falls_back_to_cls_token() {
        // Two images, three tokens each, dimension two.
        let data = vec![
            1.0, 2.0, 0.0, 0.0, 0.0, 0.0, // image 0
            3.0, 4.0, 0.0, 0.0, 0.0, 0.0, // image 1
        ];
        let outputs = vec![output("last_hidden_state", &[2, 3, 2], data)];
        let vectors = select_embeddings(&outputs, 2, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn test_unnamed_two_dim_output_accepted() {
        let outputs = vec![output("output", &[1, 2], vec![0.5, 0.5])];
        assert!(select_embeddings(&outputs, 1, 2).is_ok());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let outputs = vec![output("pooler_output", &[1, 4], vec![0.0; 4])];
        let err = select_embeddings(&outputs, 1, 768).unwrap_err();
        assert!(err.contains("expected 768"));
    }

    #[test]
    fn test_batch_size_mismatch_rejected() {
        let outputs = vec![output("pooler_output", &[1, 2], vec![0.0; 2])];
        assert!(select_embeddings(&outputs, 3, 2).is_err());
    }

    #[test]
    fn test_no_outputs_rejected() {
        let err = select_embeddings(&[], 1, 2).unwrap_err();
        assert!(err.contains("no usable output"));
    }
}
