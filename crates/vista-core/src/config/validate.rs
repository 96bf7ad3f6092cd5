//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

fn invalid(message: &str) -> Result<(), ConfigError> {
    Err(ConfigError::ValidationError(message.into()))
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.batch_size == 0 {
            return invalid("processing.batch_size must be > 0");
        }
        if self.processing.supported_formats.is_empty() {
            return invalid("processing.supported_formats must not be empty");
        }
        if self.limits.max_file_size_mb == 0 {
            return invalid("limits.max_file_size_mb must be > 0");
        }
        if self.limits.max_image_dimension == 0 {
            return invalid("limits.max_image_dimension must be > 0");
        }
        if self.limits.decode_timeout_ms == 0 {
            return invalid("limits.decode_timeout_ms must be > 0");
        }
        if self.limits.embed_timeout_ms == 0 {
            return invalid("limits.embed_timeout_ms must be > 0");
        }
        if self.embedding.crop_size == 0 {
            return invalid("embedding.crop_size must be > 0");
        }
        if self.embedding.resize < self.embedding.crop_size {
            return invalid("embedding.resize must be >= embedding.crop_size");
        }
        if self.store.request_timeout_ms == 0 {
            return invalid("store.request_timeout_ms must be > 0");
        }
        if self.store.milvus.endpoint.trim().is_empty() {
            return invalid("store.milvus.endpoint must not be empty");
        }
        if self.store.milvus.collection.trim().is_empty() {
            return invalid("store.milvus.collection must not be empty");
        }
        if self.store.milvus.max_path_length == 0 {
            return invalid("store.milvus.max_path_length must be > 0");
        }
        if self.store.weaviate.endpoint.trim().is_empty() {
            return invalid("store.weaviate.endpoint must not be empty");
        }
        if self.store.weaviate.class_name.trim().is_empty() {
            return invalid("store.weaviate.class_name must not be empty");
        }
        if self.annotator.hit_radius <= 0.0 {
            return invalid("annotator.hit_radius must be > 0");
        }
        if self.annotator.button_zoom_step <= 1.0 || self.annotator.wheel_zoom_step <= 1.0 {
            return invalid("annotator zoom steps must be > 1.0");
        }
        if self.annotator.min_zoom <= 0.0 {
            return invalid("annotator.min_zoom must be > 0");
        }
        if self.annotator.max_zoom <= self.annotator.min_zoom {
            return invalid("annotator.max_zoom must be > annotator.min_zoom");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_batch_size() {
        let mut config = Config::default();
        config.processing.batch_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.limits.decode_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("decode_timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_crop_larger_than_resize() {
        let mut config = Config::default();
        config.embedding.crop_size = 300;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("embedding.resize"));
    }

    #[test]
    fn test_validate_rejects_empty_collection() {
        let mut config = Config::default();
        config.store.milvus.collection = "  ".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("milvus.collection"));
    }

    #[test]
    fn test_validate_rejects_shrinking_zoom_step() {
        let mut config = Config::default();
        config.annotator.wheel_zoom_step = 0.9;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("zoom steps"));
    }

    #[test]
    fn test_validate_rejects_max_zoom_below_min() {
        let mut config = Config::default();
        config.annotator.max_zoom = 0.05;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_zoom"));
    }
}
