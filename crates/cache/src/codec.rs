//! Durable payload serialization strategies
//!
//! The engine is agnostic about the byte format of data files; a
//! [`Codec`] pair decides it per call. [`Text`] is the raw pass-through
//! default, [`Raw`] its binary counterpart, and [`Json`] covers structured
//! payloads via serde.

use crate::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Encodes values to and decodes values from durable data files.
pub trait Codec<T> {
    /// Serialize a value to the bytes stored in its data file.
    fn encode(&self, value: &T) -> Result<Vec<u8>>;
    /// Reconstruct a value from its data file's bytes.
    fn decode(&self, bytes: &[u8]) -> Result<T>;
}

/// Raw text pass-through: the value is the file's UTF-8 contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct Text;

impl Codec<String> for Text {
    fn encode(&self, value: &String) -> Result<Vec<u8>> {
        Ok(value.clone().into_bytes())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String> {
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::format(format!("cached data is not valid UTF-8: {e}")))
    }
}

/// Raw binary pass-through: the value is the file's bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Raw;

impl Codec<Vec<u8>> for Raw {
    fn encode(&self, value: &Vec<u8>) -> Result<Vec<u8>> {
        Ok(value.clone())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

/// Structured payloads as JSON documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json;

impl<T> Codec<T> for Json
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value)
            .map_err(|e| Error::format(format!("failed to encode cached value: {e}")))
    }

    fn decode(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::format(format!("failed to decode cached value: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_pass_through() {
        let bytes = Text.encode(&"hello".to_string()).unwrap();
        assert_eq!(bytes, b"hello");
        assert_eq!(Text.decode(&bytes).unwrap(), "hello");
    }

    #[test]
    fn text_rejects_invalid_utf8() {
        assert!(matches!(
            Text.decode(&[0xff, 0xfe]),
            Err(Error::Format { .. })
        ));
    }

    #[test]
    fn raw_is_pass_through() {
        let payload = vec![0u8, 1, 255];
        let bytes = Raw.encode(&payload).unwrap();
        assert_eq!(Raw.decode(&bytes).unwrap(), payload);
    }

    #[test]
    fn json_roundtrips_structured_values() {
        let value = vec![(1u32, "a".to_string()), (2, "b".to_string())];
        let bytes = Json.encode(&value).unwrap();
        let decoded: Vec<(u32, String)> = Json.decode(&bytes).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn json_decode_failure_is_a_format_error() {
        let result: Result<Vec<u32>> = Json.decode(b"not json");
        assert!(matches!(result, Err(Error::Format { .. })));
    }
}
