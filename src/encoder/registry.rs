//! Codec registry with lookup by identifier
//!
//! The registry answers two questions for the encoding context: is there an
//! implementation for this [`CodecId`], and can it be opened with this
//! configuration.
//!
//! # Default Backends
//!
//! [`CodecRegistry::with_defaults`] registers `rawvideo` always and `h264`
//! when the `h264` feature is enabled. Applications and tests can register
//! further backends with [`CodecRegistry::register`].

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::{CodecBackend, CodecId, CodecResult, EncoderConfig, RawVideoBackend, VideoCodec};

/// Map from codec identifier to backend
#[derive(Clone, Default)]
pub struct CodecRegistry {
    backends: BTreeMap<CodecId, Arc<dyn CodecBackend>>,
}

impl CodecRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with every backend compiled into this build
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(RawVideoBackend));

        #[cfg(feature = "h264")]
        registry.register(Arc::new(super::h264::OpenH264Backend));

        debug!("Codec registry initialized: {:?}", registry.available());
        registry
    }

    /// Register a backend, replacing any backend with the same identifier
    pub fn register(&mut self, backend: Arc<dyn CodecBackend>) {
        let id = backend.codec_id();
        if self.backends.insert(id.clone(), backend).is_some() {
            debug!("Replaced codec backend {}", id);
        }
    }

    /// Look up the backend for an identifier
    pub fn find(&self, id: &CodecId) -> Option<Arc<dyn CodecBackend>> {
        self.backends.get(id).cloned()
    }

    /// Whether an implementation exists for an identifier
    pub fn contains(&self, id: &CodecId) -> bool {
        self.backends.contains_key(id)
    }

    /// Registered identifiers, sorted
    pub fn available(&self) -> Vec<CodecId> {
        self.backends.keys().cloned().collect()
    }

    /// Open a handle for `id`
    ///
    /// Returns `None` if no backend is registered for `id`.
    pub fn open(
        &self,
        id: &CodecId,
        config: &EncoderConfig,
    ) -> Option<CodecResult<Box<dyn VideoCodec>>> {
        let backend = self.find(id)?;

        info!(
            "Opening codec {}: {}x{}, {} bps, timebase {}, gop {}",
            id, config.width, config.height, config.bit_rate, config.time_base, config.gop_size
        );

        Some(backend.open(config))
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("backends", &self.available())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::super::{EncoderTuning, MockCodecBackend};
    use super::*;

    #[test]
    fn test_default_registry_has_rawvideo() {
        let registry = CodecRegistry::with_defaults();
        assert!(registry.contains(&CodecId::RAWVIDEO));
        assert_eq!(registry.contains(&CodecId::H264), cfg!(feature = "h264"));
    }

    #[test]
    fn test_unknown_codec() {
        let registry = CodecRegistry::with_defaults();
        let config = EncoderConfig::new(64, 64, &EncoderTuning::default());
        assert!(registry.open(&CodecId::new("mpeg2video"), &config).is_none());
    }

    #[test]
    fn test_register_custom_backend() {
        let mut backend = MockCodecBackend::new();
        backend
            .expect_codec_id()
            .return_const(CodecId::new("mock"));
        backend
            .expect_open()
            .times(1)
            .returning(|config| Ok(Box::new(crate::encoder::RawVideoCodec::new(config.clone()))));

        let mut registry = CodecRegistry::new();
        registry.register(Arc::new(backend));
        assert_eq!(registry.available(), vec![CodecId::new("mock")]);

        let config = EncoderConfig::new(64, 64, &EncoderTuning::default());
        let codec = registry
            .open(&CodecId::new("mock"), &config)
            .expect("backend registered")
            .expect("open succeeds");
        assert_eq!(codec.config().width, 64);
    }
}
