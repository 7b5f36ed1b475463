//! Pluggable JSON codecs for application value types.
//!
//! A [`CodecRegistry`] holds an ordered list of [`JsonDescriptor`]s. Lookup
//! walks the list front to back and the first descriptor that accepts the
//! requested type wins; types nobody claims go through their serde
//! implementation. The container shapes the protocol uses (parameter maps and
//! bucket-name sets) are registered first, ahead of every custom descriptor.
//!
//! Key/value maps returned by list, range and predicate queries are read by
//! [`CodecRegistry::deserialize_values`], which checks the outer JSON object
//! itself and hands each element to the per-type lookup, so custom
//! descriptors apply inside query results as well.

use crate::error::{Error, Result};
use crate::types::{Buckets, Parameters, Values};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::any::{type_name, Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// A serializer/deserializer pair claiming one or more value types.
pub trait JsonDescriptor: Send + Sync {
    /// Human-readable name used in logs and errors.
    fn name(&self) -> &str;

    /// Whether this descriptor handles values of the given type.
    fn accepts(&self, type_id: TypeId) -> bool;

    /// Writes a value of an accepted type as JSON.
    fn to_json(&self, value: &dyn Any) -> Result<Value>;

    /// Reads a value of an accepted type from JSON.
    fn from_json(&self, json: Value) -> Result<Box<dyn Any>>;
}

type Serializer<T> = Box<dyn Fn(&T) -> Result<Value> + Send + Sync>;
type Deserializer<T> = Box<dyn Fn(Value) -> Result<T> + Send + Sync>;

/// Descriptor for a single application type, built from two closures.
///
/// ```
/// use serde_json::json;
/// use terrastore_client::{CodecRegistry, Error, JsonObjectDescriptor};
///
/// #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// struct Reading(String);
///
/// let descriptor = JsonObjectDescriptor::<Reading>::new(
///     |reading| Ok(json!({ "key": reading.0 })),
///     |json| {
///         json.get("key")
///             .and_then(|key| key.as_str())
///             .map(|key| Reading(key.to_string()))
///             .ok_or_else(|| Error::Codec("missing key".to_string()))
///     },
/// );
///
/// let mut registry = CodecRegistry::new();
/// registry.register_descriptor(descriptor);
/// let bytes = registry.serialize(&Reading("v".to_string())).unwrap();
/// assert_eq!(&bytes[..], br#"{"key":"v"}"#);
/// ```
pub struct JsonObjectDescriptor<T> {
    serializer: Serializer<T>,
    deserializer: Deserializer<T>,
}

impl<T: 'static> JsonObjectDescriptor<T> {
    pub fn new<S, D>(serializer: S, deserializer: D) -> Self
    where
        S: Fn(&T) -> Result<Value> + Send + Sync + 'static,
        D: Fn(Value) -> Result<T> + Send + Sync + 'static,
    {
        Self {
            serializer: Box::new(serializer),
            deserializer: Box::new(deserializer),
        }
    }
}

impl<T: 'static> JsonDescriptor for JsonObjectDescriptor<T> {
    fn name(&self) -> &str {
        type_name::<T>()
    }

    fn accepts(&self, type_id: TypeId) -> bool {
        type_id == TypeId::of::<T>()
    }

    fn to_json(&self, value: &dyn Any) -> Result<Value> {
        let value = value.downcast_ref::<T>().ok_or_else(|| {
            Error::Codec(format!("descriptor for {} got a foreign value", self.name()))
        })?;
        (self.serializer)(value)
    }

    fn from_json(&self, json: Value) -> Result<Box<dyn Any>> {
        let value = (self.deserializer)(json)?;
        Ok(Box::new(value))
    }
}

impl<T> fmt::Debug for JsonObjectDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsonObjectDescriptor<{}>", type_name::<T>())
    }
}

/// Writes update and map-reduce parameter maps as a flat JSON object.
struct ParametersDescriptor;

impl JsonDescriptor for ParametersDescriptor {
    fn name(&self) -> &str {
        "parameters"
    }

    fn accepts(&self, type_id: TypeId) -> bool {
        type_id == TypeId::of::<Parameters>()
    }

    fn to_json(&self, value: &dyn Any) -> Result<Value> {
        let parameters = value
            .downcast_ref::<Parameters>()
            .ok_or_else(|| Error::Codec("parameters descriptor got a foreign value".to_string()))?;
        Ok(Value::Object(
            parameters
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        ))
    }

    fn from_json(&self, json: Value) -> Result<Box<dyn Any>> {
        match json {
            Value::Object(map) => Ok(Box::new(map.into_iter().collect::<Parameters>())),
            other => Err(Error::Codec(format!(
                "expected a JSON object of parameters, got {}",
                json_kind(&other)
            ))),
        }
    }
}

/// Reads the bucket listing, a JSON array of names.
struct BucketsDescriptor;

impl JsonDescriptor for BucketsDescriptor {
    fn name(&self) -> &str {
        "buckets"
    }

    fn accepts(&self, type_id: TypeId) -> bool {
        type_id == TypeId::of::<Buckets>()
    }

    fn to_json(&self, value: &dyn Any) -> Result<Value> {
        let buckets = value
            .downcast_ref::<Buckets>()
            .ok_or_else(|| Error::Codec("buckets descriptor got a foreign value".to_string()))?;
        Ok(Value::Array(
            buckets.iter().cloned().map(Value::String).collect(),
        ))
    }

    fn from_json(&self, json: Value) -> Result<Box<dyn Any>> {
        let Value::Array(names) = json else {
            return Err(Error::Codec(format!(
                "expected a JSON array of bucket names, got {}",
                json_kind(&json)
            )));
        };
        let buckets = names
            .into_iter()
            .map(|name| match name {
                Value::String(name) => Ok(name),
                other => Err(Error::Codec(format!(
                    "bucket name must be a string, got {}",
                    json_kind(&other)
                ))),
            })
            .collect::<Result<Buckets>>()?;
        Ok(Box::new(buckets))
    }
}

/// Ordered, instance-scoped set of codecs owned by a connection.
///
/// Registration happens before the registry is handed to a connection; after
/// that it is only read, so lookups need no locking.
#[derive(Clone)]
pub struct CodecRegistry {
    descriptors: Vec<Arc<dyn JsonDescriptor>>,
}

impl CodecRegistry {
    /// Creates a registry holding only the built-in container codecs.
    pub fn new() -> Self {
        Self {
            descriptors: vec![Arc::new(ParametersDescriptor), Arc::new(BucketsDescriptor)],
        }
    }

    /// Creates a registry with `descriptors` registered in the given order.
    pub fn with_descriptors(descriptors: Vec<Arc<dyn JsonDescriptor>>) -> Self {
        let mut registry = Self::new();
        registry.descriptors.extend(descriptors);
        registry
    }

    /// Adds a descriptor behind every descriptor registered so far, but ahead
    /// of the serde fallback.
    pub fn register_descriptor<D: JsonDescriptor + 'static>(&mut self, descriptor: D) {
        self.descriptors.push(Arc::new(descriptor));
    }

    pub fn register_shared(&mut self, descriptor: Arc<dyn JsonDescriptor>) {
        self.descriptors.push(descriptor);
    }

    /// Number of registered descriptors, built-ins included.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Serializes `value` into a JSON request body.
    pub fn serialize<T: Serialize + 'static>(&self, value: &T) -> Result<Bytes> {
        let json = self.to_json(value)?;
        Ok(Bytes::from(serde_json::to_vec(&json)?))
    }

    /// Deserializes a single JSON value from a response body.
    pub fn deserialize<T: DeserializeOwned + 'static>(&self, body: &[u8]) -> Result<T> {
        let json: Value = serde_json::from_slice(body)?;
        self.from_json(json)
    }

    /// Deserializes a JSON object of key → value into [`Values`], keeping server order.
    pub fn deserialize_values<T: DeserializeOwned + 'static>(&self, body: &[u8]) -> Result<Values<T>> {
        let json: Value = serde_json::from_slice(body)?;
        let Value::Object(entries) = json else {
            return Err(Error::Codec(format!(
                "expected a JSON object of key/value pairs, got {}",
                json_kind(&json)
            )));
        };
        entries
            .into_iter()
            .map(|(key, value)| self.from_json(value).map(|value| (key, value)))
            .collect()
    }

    pub fn to_json<T: Serialize + 'static>(&self, value: &T) -> Result<Value> {
        match self.find(TypeId::of::<T>()) {
            Some(descriptor) => {
                tracing::trace!(descriptor = descriptor.name(), "writing with registered descriptor");
                descriptor.to_json(value)
            }
            None => Ok(serde_json::to_value(value)?),
        }
    }

    pub fn from_json<T: DeserializeOwned + 'static>(&self, json: Value) -> Result<T> {
        match self.find(TypeId::of::<T>()) {
            Some(descriptor) => {
                tracing::trace!(descriptor = descriptor.name(), "reading with registered descriptor");
                descriptor
                    .from_json(json)?
                    .downcast::<T>()
                    .map(|value| *value)
                    .map_err(|_| {
                        Error::Codec(format!(
                            "descriptor {} did not produce a {}",
                            descriptor.name(),
                            type_name::<T>()
                        ))
                    })
            }
            None => Ok(serde_json::from_value(json)?),
        }
    }

    fn find(&self, type_id: TypeId) -> Option<&Arc<dyn JsonDescriptor>> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.accepts(type_id))
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.descriptors.iter().map(|descriptor| descriptor.name()))
            .finish()
    }
}

fn json_kind(json: &Value) -> &'static str {
    match json {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct TestValue {
        value: String,
    }

    fn keyed_descriptor() -> JsonObjectDescriptor<TestValue> {
        JsonObjectDescriptor::new(
            |value: &TestValue| Ok(json!({ "key": value.value })),
            |json| {
                json.get("key")
                    .and_then(Value::as_str)
                    .map(|key| TestValue {
                        value: key.to_string(),
                    })
                    .ok_or_else(|| Error::Codec("missing key".to_string()))
            },
        )
    }

    fn counting_descriptor(counter: Arc<AtomicUsize>) -> JsonObjectDescriptor<TestValue> {
        let writes = Arc::clone(&counter);
        JsonObjectDescriptor::new(
            move |value: &TestValue| {
                writes.fetch_add(1, Ordering::SeqCst);
                Ok(json!({ "value": value.value }))
            },
            move |json| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(serde_json::from_value(json)?)
            },
        )
    }

    #[test]
    fn test_default_mapping() {
        let registry = CodecRegistry::new();
        let value = TestValue {
            value: "value_1".to_string(),
        };

        let bytes = registry.serialize(&value).unwrap();
        assert_eq!(&bytes[..], br#"{"value":"value_1"}"#);
        assert_eq!(registry.deserialize::<TestValue>(&bytes).unwrap(), value);
    }

    #[test]
    fn test_custom_descriptor_round_trip() {
        let mut registry = CodecRegistry::new();
        registry.register_descriptor(keyed_descriptor());
        let value = TestValue {
            value: "custom".to_string(),
        };

        let bytes = registry.serialize(&value).unwrap();
        assert_eq!(&bytes[..], br#"{"key":"custom"}"#);
        assert_eq!(registry.deserialize::<TestValue>(&bytes).unwrap(), value);
    }

    #[test]
    fn test_first_registered_descriptor_wins() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut registry = CodecRegistry::new();
        registry.register_descriptor(counting_descriptor(Arc::clone(&first)));
        registry.register_descriptor(counting_descriptor(Arc::clone(&second)));

        let value = TestValue {
            value: "v".to_string(),
        };
        let bytes = registry.serialize(&value).unwrap();
        registry.deserialize::<TestValue>(&bytes).unwrap();

        assert_eq!(first.load(Ordering::SeqCst), 2);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_serializer_failure_is_codec_error() {
        let mut registry = CodecRegistry::new();
        registry.register_descriptor(JsonObjectDescriptor::<TestValue>::new(
            |_| Err(Error::Codec("refusing to write".to_string())),
            |json| Ok(serde_json::from_value(json)?),
        ));

        let err = registry
            .serialize(&TestValue {
                value: "v".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, Error::Codec(message) if message == "refusing to write"));
    }

    #[test]
    fn test_default_mapper_shape_mismatch() {
        let registry = CodecRegistry::new();
        let err = registry.deserialize::<TestValue>(br#"[1, 2, 3]"#).unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
    }

    #[test]
    fn test_buckets_read_from_array() {
        let registry = CodecRegistry::new();
        let buckets: Buckets = registry.deserialize(br#"["bucket2","bucket1"]"#).unwrap();
        assert_eq!(buckets.len(), 2);
        assert!(buckets.contains("bucket1"));
        assert!(buckets.contains("bucket2"));
    }

    #[test]
    fn test_buckets_reject_non_string_names() {
        let registry = CodecRegistry::new();
        let err = registry.deserialize::<Buckets>(br#"["bucket1", 2]"#).unwrap_err();
        assert!(matches!(err, Error::Codec(_)));
    }

    #[test]
    fn test_parameters_written_as_object() {
        let registry = CodecRegistry::new();
        let parameters = Parameters::new().with("value", "15").with("limit", 3);
        let bytes = registry.serialize(&parameters).unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json, json!({"value": "15", "limit": 3}));
    }

    #[test]
    fn test_values_keep_server_order_and_use_descriptors() {
        let mut registry = CodecRegistry::new();
        registry.register_descriptor(keyed_descriptor());

        let values: Values<TestValue> = registry
            .deserialize_values(br#"{"k3":{"key":"c"},"k1":{"key":"a"},"k2":{"key":"b"}}"#)
            .unwrap();

        assert_eq!(values.keys().collect::<Vec<_>>(), vec!["k3", "k1", "k2"]);
        assert_eq!(
            values.get("k1"),
            Some(&TestValue {
                value: "a".to_string()
            })
        );
    }

    #[test]
    fn test_values_reject_array_body() {
        let registry = CodecRegistry::new();
        let err = registry
            .deserialize_values::<TestValue>(br#"[{"value":"a"}]"#)
            .unwrap_err();
        assert!(matches!(err, Error::Codec(message) if message.contains("an array")));
    }

    #[test]
    fn test_builtins_registered_ahead_of_custom() {
        let mut registry = CodecRegistry::new();
        assert_eq!(registry.len(), 2);
        registry.register_descriptor(keyed_descriptor());
        assert_eq!(
            format!("{:?}", registry),
            format!("[\"parameters\", \"buckets\", \"{}\"]", type_name::<TestValue>())
        );
    }
}
