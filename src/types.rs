use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Names of the buckets known to the cluster
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Buckets(BTreeSet<String>);

impl Buckets {
    pub fn contains(&self, bucket: &str) -> bool {
        self.0.contains(bucket)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    pub fn into_inner(self) -> BTreeSet<String> {
        self.0
    }
}

impl FromIterator<String> for Buckets {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Buckets(iter.into_iter().collect())
    }
}

impl IntoIterator for Buckets {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Key/value pairs returned by list, range and predicate queries, in server order
#[derive(Debug, Clone, PartialEq)]
pub struct Values<T> {
    entries: Vec<(String, T)>,
}

impl<T> Values<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for Values<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<(String, T)> for Values<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<T> IntoIterator for Values<T> {
    type Item = (String, T);
    type IntoIter = std::vec::IntoIter<(String, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Named arguments passed to server-side update functions and map-reduce tasks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, Value>);

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with `name` set to `value`.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Parameters(
            iter.into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

/// Put, get or remove of a single key, optionally guarded by a predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRequest {
    pub bucket: String,
    pub key: String,
    pub predicate: Option<String>,
}

impl KeyRequest {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            predicate: None,
        }
    }

    /// Returns a conditional copy of this request.
    pub fn conditional(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }
}

/// Listing of the values in a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuesQuery {
    pub bucket: String,
    pub limit: Option<u32>,
    /// When set, the listing runs as a predicate query on the same bucket.
    pub predicate: Option<String>,
}

impl ValuesQuery {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            limit: None,
            predicate: None,
        }
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn conditional(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }
}

/// Range query over the keys of a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    pub bucket: String,
    pub start_key: String,
    pub end_key: Option<String>,
    pub comparator: Option<String>,
    pub limit: Option<u32>,
    /// Maximum age, in milliseconds, of the key snapshot the server may answer from.
    pub time_to_live: Option<u64>,
    pub predicate: Option<String>,
}

impl RangeQuery {
    pub fn new(bucket: impl Into<String>, start_key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            start_key: start_key.into(),
            end_key: None,
            comparator: None,
            limit: None,
            time_to_live: None,
            predicate: None,
        }
    }

    pub fn to(mut self, end_key: impl Into<String>) -> Self {
        self.end_key = Some(end_key.into());
        self
    }

    pub fn comparator(mut self, comparator: impl Into<String>) -> Self {
        self.comparator = Some(comparator.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn time_to_live(mut self, millis: u64) -> Self {
        self.time_to_live = Some(millis);
        self
    }

    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }
}

/// Predicate query over every value in a bucket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredicateQuery {
    pub bucket: String,
    pub predicate: String,
}

impl PredicateQuery {
    pub fn new(bucket: impl Into<String>, predicate: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            predicate: predicate.into(),
        }
    }
}

/// Server-side update of a single value
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRequest {
    pub bucket: String,
    pub key: String,
    /// Update function id, such as `replace`, `merge` or `counter`.
    pub function: String,
    /// Server-side execution timeout in milliseconds.
    pub timeout: u64,
    pub parameters: Parameters,
}

impl UpdateRequest {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        function: impl Into<String>,
        timeout: u64,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            function: function.into(),
            timeout,
            parameters: Parameters::new(),
        }
    }

    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Partial update instructions for a stored document.
///
/// Serializes as a JSON object: `"+"` adds fields, `"*"` replaces fields,
/// `"-"` removes fields, an array key mapped to `["+", ...]` or `["-", ...]`
/// edits that array, and any other key carries a nested descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MergeDescriptor(Map<String, Value>);

impl MergeDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<K, V>(self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.with_fields("+", fields)
    }

    pub fn replace<K, V>(self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.with_fields("*", fields)
    }

    pub fn remove<K: Into<String>>(mut self, names: impl IntoIterator<Item = K>) -> Self {
        let names = names.into_iter().map(|name| Value::String(name.into()));
        self.0.insert("-".to_string(), Value::Array(names.collect()));
        self
    }

    pub fn add_to_array<V: Into<Value>>(
        self,
        array_key: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.with_array_edit(array_key, "+", values)
    }

    pub fn remove_from_array<V: Into<Value>>(
        self,
        array_key: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.with_array_edit(array_key, "-", values)
    }

    pub fn merge(mut self, key: impl Into<String>, nested: MergeDescriptor) -> Self {
        self.0.insert(key.into(), Value::Object(nested.0));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn with_fields<K, V>(mut self, marker: &str, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let fields: Map<String, Value> = fields
            .into_iter()
            .map(|(name, value)| (name.into(), value.into()))
            .collect();
        self.0.insert(marker.to_string(), Value::Object(fields));
        self
    }

    fn with_array_edit<V: Into<Value>>(
        mut self,
        array_key: impl Into<String>,
        marker: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let edit = std::iter::once(Value::String(marker.to_string()))
            .chain(values.into_iter().map(Into::into))
            .collect();
        self.0.insert(array_key.into(), Value::Array(edit));
        self
    }
}

/// Merge of a descriptor into a stored document
#[derive(Debug, Clone, PartialEq)]
pub struct MergeRequest {
    pub bucket: String,
    pub key: String,
    pub descriptor: MergeDescriptor,
}

impl MergeRequest {
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        descriptor: MergeDescriptor,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            descriptor,
        }
    }
}

/// Key range a map-reduce task runs over
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapReduceRange {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<u64>,
}

/// Mapper, optional combiner and reducer functions of a map-reduce task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapReduceTask {
    pub mapper: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combiner: Option<String>,
    pub reducer: String,
    pub timeout: u64,
    #[serde(default, skip_serializing_if = "Parameters::is_empty")]
    pub parameters: Parameters,
}

/// Request body of a map-reduce execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapReduceQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<MapReduceRange>,
    pub task: MapReduceTask,
}

/// Map-reduce execution against one bucket
#[derive(Debug, Clone, PartialEq)]
pub struct MapReduceRequest {
    pub bucket: String,
    pub query: MapReduceQuery,
}

impl MapReduceRequest {
    pub fn new(bucket: impl Into<String>, query: MapReduceQuery) -> Self {
        Self {
            bucket: bucket.into(),
            query,
        }
    }
}

/// Export or import of a bucket backup file on the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRequest {
    pub bucket: String,
    pub file_name: String,
    pub secret_key: String,
}

impl BackupRequest {
    pub fn new(
        bucket: impl Into<String>,
        file_name: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            file_name: file_name.into(),
            secret_key: secret_key.into(),
        }
    }
}

/// Cluster membership as reported by the stats endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterStats {
    #[serde(default)]
    pub clusters: Vec<ClusterInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub nodes: Vec<NodeInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    pub host: String,
    pub port: u16,
}
