//! Cache-key construction from content hashes.
//!
//! A key concatenates the wrapped function's identity with one hash per
//! argument: raster arguments hash their shape *and* raw bytes (two
//! buffers with identical bytes but different declared shapes must key
//! differently), configuration arguments hash a canonical JSON
//! serialization of every field, and anything else hashes its string
//! form. Two calls with bit-identical images and field-for-field
//! identical configurations therefore produce the same key.
//!
//! When a configuration value cannot be serialized, the builder falls
//! back to a weaker SipHash over its `Debug` form instead of failing —
//! a degraded but non-fatal path.

use std::fmt;
use std::hash::Hasher;

use serde::Serialize;
use sha2::{Digest, Sha256};
use siphasher::sip::SipHasher13;
use togi_pipeline::Raster;

/// A fully built cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builder accumulating one hashed part per argument, in call order.
#[must_use]
#[derive(Debug)]
pub struct KeyBuilder {
    parts: Vec<String>,
}

impl KeyBuilder {
    /// Start a key for the named function.
    pub fn new(function: &str) -> Self {
        Self {
            parts: vec![function.to_owned()],
        }
    }

    /// Add a raster argument: SHA-256 over channel count, dimensions,
    /// and raw bytes.
    pub fn raster(mut self, raster: &Raster) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(raster.channel_count().to_le_bytes());
        hasher.update(raster.width().to_le_bytes());
        hasher.update(raster.height().to_le_bytes());
        hasher.update(raster.as_bytes());
        self.parts.push(format!("img_{}", hex::encode(hasher.finalize())));
        self
    }

    /// Add a configuration argument: SHA-256 over its canonical JSON
    /// form, or a SipHash of its `Debug` form when serialization fails.
    pub fn config<T: Serialize + fmt::Debug>(mut self, config: &T) -> Self {
        let part = match serde_json::to_vec(config) {
            Ok(canonical) => format!("cfg_{}", hex::encode(Sha256::digest(&canonical))),
            Err(error) => {
                tracing::debug!(%error, "config not serializable, using weak string hash");
                let mut hasher = SipHasher13::new();
                hasher.write(format!("{config:?}").as_bytes());
                format!("cfg_weak_{:016x}", hasher.finish())
            }
        };
        self.parts.push(part);
        self
    }

    /// Add any other argument by hashing its string form.
    pub fn value<T: fmt::Display>(mut self, value: &T) -> Self {
        let digest = Sha256::digest(value.to_string().as_bytes());
        self.parts.push(format!("val_{}", hex::encode(digest)));
        self
    }

    /// Finish the key.
    pub fn build(self) -> CacheKey {
        CacheKey(self.parts.join("/"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::GrayImage;
    use togi_pipeline::Config;

    #[test]
    fn identical_inputs_produce_identical_keys() {
        let image = Raster::Gray(GrayImage::from_pixel(4, 4, image::Luma([7])));
        let config = Config::default();
        let a = KeyBuilder::new("process").raster(&image).config(&config).build();
        let b = KeyBuilder::new("process").raster(&image).config(&config).build();
        assert_eq!(a, b);
    }

    #[test]
    fn different_pixels_produce_different_keys() {
        let a = Raster::Gray(GrayImage::from_pixel(4, 4, image::Luma([7])));
        let b = Raster::Gray(GrayImage::from_pixel(4, 4, image::Luma([8])));
        let key_a = KeyBuilder::new("process").raster(&a).build();
        let key_b = KeyBuilder::new("process").raster(&b).build();
        assert_ne!(key_a, key_b);
    }

    #[test]
    fn same_bytes_different_shape_produce_different_keys() {
        let bytes: Vec<u8> = (0..16).collect();
        let wide = Raster::Gray(GrayImage::from_raw(8, 2, bytes.clone()).unwrap());
        let tall = Raster::Gray(GrayImage::from_raw(2, 8, bytes).unwrap());
        let key_wide = KeyBuilder::new("process").raster(&wide).build();
        let key_tall = KeyBuilder::new("process").raster(&tall).build();
        assert_ne!(key_wide, key_tall);
    }

    #[test]
    fn config_field_changes_change_the_key() {
        let image = Raster::Gray(GrayImage::new(4, 4));
        let base = Config::default();
        let mut tweaked = Config::default();
        tweaked.threshold.value = 128;
        let key_base = KeyBuilder::new("process").raster(&image).config(&base).build();
        let key_tweaked = KeyBuilder::new("process")
            .raster(&image)
            .config(&tweaked)
            .build();
        assert_ne!(key_base, key_tweaked);
    }

    #[test]
    fn function_identity_separates_keys() {
        let image = Raster::Gray(GrayImage::new(4, 4));
        let a = KeyBuilder::new("process").raster(&image).build();
        let b = KeyBuilder::new("recognize").raster(&image).build();
        assert_ne!(a, b);
    }

    #[test]
    fn argument_order_is_significant() {
        let a = KeyBuilder::new("f").value(&1).value(&2).build();
        let b = KeyBuilder::new("f").value(&2).value(&1).build();
        assert_ne!(a, b);
    }

    #[derive(Debug)]
    struct Unserializable(u32);

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("deliberately unserializable"))
        }
    }

    #[test]
    fn unserializable_config_falls_back_without_failing() {
        let a = KeyBuilder::new("f").config(&Unserializable(1)).build();
        let b = KeyBuilder::new("f").config(&Unserializable(1)).build();
        let c = KeyBuilder::new("f").config(&Unserializable(2)).build();
        assert_eq!(a, b, "the weak hash must still be deterministic");
        assert_ne!(a, c, "the weak hash must still separate values");
        assert!(a.to_string().contains("cfg_weak_"));
    }
}
