//! Name-keyed decoder factories

use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

use super::{Fenix3Decoder, Fenix52BDecoder};
use crate::decoder::BoxedDecoder;
use crate::types::EngineRecord;
use crate::{Result, TelemetryError};

type Factory<R> = Box<dyn Fn() -> BoxedDecoder<R> + Send + Sync>;

/// Immutable map from variant name to decoder factory.
///
/// Built once through [`RegistryBuilder`]; there is no way to add or remove
/// variants afterwards. Each [`create`](Self::create) call returns a fresh
/// decoder instance.
///
/// ```rust
/// use xr25::FrameDecoder;
/// use xr25::decoders::DecoderRegistry;
///
/// let registry = DecoderRegistry::builtin();
/// let decoder = registry.create("Fenix3").unwrap();
/// assert_eq!(decoder.name(), "Fenix3");
/// assert!(registry.create("Fenix9").is_err());
/// ```
pub struct DecoderRegistry<R> {
    factories: BTreeMap<String, Factory<R>>,
}

impl<R: 'static> DecoderRegistry<R> {
    pub fn builder() -> RegistryBuilder<R> {
        RegistryBuilder { factories: BTreeMap::new() }
    }

    /// Instantiate the decoder registered under `name`.
    pub fn create(&self, name: &str) -> Result<BoxedDecoder<R>> {
        let factory = self.factories.get(name).ok_or_else(|| TelemetryError::UnknownVariant {
            name: name.to_string(),
            available: self.names().map(str::to_string).collect(),
        })?;
        debug!(variant = name, "Creating frame decoder");
        Ok(factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered variant names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl DecoderRegistry<EngineRecord> {
    /// Process-wide registry of the XR25 variants shipped with this crate.
    pub fn builtin() -> &'static DecoderRegistry<EngineRecord> {
        static BUILTIN: OnceLock<DecoderRegistry<EngineRecord>> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            DecoderRegistry::builder()
                .register("Fenix3", || Box::new(Fenix3Decoder))
                .register("Fenix52B", || Box::new(Fenix52BDecoder))
                .build()
        })
    }
}

/// Collects factories before freezing them into a [`DecoderRegistry`].
pub struct RegistryBuilder<R> {
    factories: BTreeMap<String, Factory<R>>,
}

impl<R: 'static> RegistryBuilder<R> {
    /// Register a factory; a later registration under the same name wins.
    pub fn register<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> BoxedDecoder<R> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
        self
    }

    pub fn build(self) -> DecoderRegistry<R> {
        DecoderRegistry { factories: self.factories }
    }
}
