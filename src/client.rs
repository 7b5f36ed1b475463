use crate::codec::CodecRegistry;
use crate::config::ClientConfig;
use crate::connection::{Connection, ConnectionFactory, HttpConnectionFactory};
use crate::error::Result;
use crate::host::{host_manager_for, Host, HostManager, OrderedHostManager, SingleHostManager};
use crate::types::*;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

const DEFAULT_UPDATE_TIMEOUT_MS: u64 = 10_000;

/// Entry point for talking to a Terrastore cluster.
///
/// The client owns one [`Connection`]; bucket, key, range and update
/// operations are reached through short-lived handles that borrow it.
#[derive(Debug, Clone)]
pub struct TerrastoreClient {
    connection: Connection,
}

impl TerrastoreClient {
    /// Create a client for a single server
    pub fn new(address: &str) -> Result<Self> {
        let hosts = Arc::new(SingleHostManager::parse(address)?);
        Self::from_parts(hosts, CodecRegistry::new(), &HttpConnectionFactory::new())
    }

    /// Create a client failing over across `addresses` in order
    pub fn ordered<S: AsRef<str>>(addresses: &[S]) -> Result<Self> {
        let hosts = Arc::new(OrderedHostManager::parse(addresses)?);
        Self::from_parts(hosts, CodecRegistry::new(), &HttpConnectionFactory::new())
    }

    /// Create a client for a list of hosts, picking the policy from the list length
    pub fn with_hosts(hosts: Vec<Host>) -> Result<Self> {
        Self::from_parts(
            host_manager_for(hosts),
            CodecRegistry::new(),
            &HttpConnectionFactory::new(),
        )
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::from_config_with_codecs(config, CodecRegistry::new())
    }

    pub fn from_config_with_codecs(config: &ClientConfig, codecs: CodecRegistry) -> Result<Self> {
        let hosts = config.host_manager()?;
        Self::from_parts(hosts, codecs, &HttpConnectionFactory::from_config(config))
    }

    /// Create a client from an explicit host manager, codec registry and factory
    pub fn from_parts<F: ConnectionFactory + ?Sized>(
        hosts: Arc<dyn HostManager>,
        codecs: CodecRegistry,
        factory: &F,
    ) -> Result<Self> {
        let connection = factory.make_connection(hosts, codecs)?;
        Ok(Self { connection })
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// List the names of all buckets
    pub fn buckets(&self) -> Result<Buckets> {
        self.connection.list_buckets()
    }

    pub fn cluster_stats(&self) -> Result<ClusterStats> {
        self.connection.cluster_stats()
    }

    /// Operations on one bucket
    pub fn bucket(&self, name: impl Into<String>) -> BucketOperation<'_> {
        BucketOperation {
            connection: &self.connection,
            bucket: name.into(),
        }
    }
}

/// Operations scoped to a bucket
#[derive(Debug, Clone)]
pub struct BucketOperation<'a> {
    connection: &'a Connection,
    bucket: String,
}

impl<'a> BucketOperation<'a> {
    pub fn name(&self) -> &str {
        &self.bucket
    }

    pub fn create(&self) -> Result<()> {
        self.connection.create_bucket(&self.bucket)
    }

    pub fn remove(&self) -> Result<()> {
        self.connection.remove_bucket(&self.bucket)
    }

    /// Operations on one key of this bucket
    pub fn key(&self, key: impl Into<String>) -> KeyOperation<'a> {
        KeyOperation {
            connection: self.connection,
            request: KeyRequest::new(self.bucket.clone(), key),
        }
    }

    /// All values in the bucket
    pub fn values<T: DeserializeOwned + 'static>(&self) -> Result<Values<T>> {
        self.connection.list_values(&ValuesQuery::new(self.bucket.clone()))
    }

    /// At most `limit` values from the bucket
    pub fn values_limited<T: DeserializeOwned + 'static>(&self, limit: u32) -> Result<Values<T>> {
        self.connection
            .list_values(&ValuesQuery::new(self.bucket.clone()).limit(limit))
    }

    /// Values matching a predicate such as `jxpath:/value`
    pub fn predicate<T: DeserializeOwned + 'static>(&self, predicate: &str) -> Result<Values<T>> {
        self.connection
            .query_by_predicate(&PredicateQuery::new(self.bucket.clone(), predicate))
    }

    /// Range query starting at `start_key`
    pub fn range(&self, start_key: impl Into<String>) -> RangeOperation<'a> {
        RangeOperation {
            connection: self.connection,
            query: RangeQuery::new(self.bucket.clone(), start_key),
        }
    }

    pub fn export_backup(&self, file_name: &str, secret_key: &str) -> Result<()> {
        self.connection
            .export_backup(&BackupRequest::new(self.bucket.clone(), file_name, secret_key))
    }

    pub fn import_backup(&self, file_name: &str, secret_key: &str) -> Result<()> {
        self.connection
            .import_backup(&BackupRequest::new(self.bucket.clone(), file_name, secret_key))
    }

    pub fn map_reduce<T: DeserializeOwned + 'static>(&self, query: MapReduceQuery) -> Result<T> {
        self.connection
            .execute_map_reduce(&MapReduceRequest::new(self.bucket.clone(), query))
    }
}

/// Operations scoped to a single key.
///
/// [`conditional`](Self::conditional) returns a new handle; the original keeps
/// operating unconditionally.
#[derive(Debug, Clone)]
pub struct KeyOperation<'a> {
    connection: &'a Connection,
    request: KeyRequest,
}

impl<'a> KeyOperation<'a> {
    pub fn key(&self) -> &str {
        &self.request.key
    }

    /// Guard put/get/remove with a server-side predicate
    pub fn conditional(&self, predicate: impl Into<String>) -> Self {
        Self {
            connection: self.connection,
            request: self.request.clone().conditional(predicate),
        }
    }

    pub fn put<T: Serialize + 'static>(&self, value: &T) -> Result<()> {
        self.connection.put_value(&self.request, value)
    }

    pub fn get<T: DeserializeOwned + 'static>(&self) -> Result<T> {
        self.connection.get_value(&self.request)
    }

    pub fn remove(&self) -> Result<()> {
        self.connection.remove_value(&self.request)
    }

    /// Server-side update with the named function
    pub fn update(&self, function: impl Into<String>) -> UpdateOperation<'a> {
        UpdateOperation {
            connection: self.connection,
            request: UpdateRequest::new(
                self.request.bucket.clone(),
                self.request.key.clone(),
                function,
                DEFAULT_UPDATE_TIMEOUT_MS,
            ),
        }
    }

    /// Merge `descriptor` into the stored value and return the result
    pub fn merge<T: DeserializeOwned + 'static>(&self, descriptor: MergeDescriptor) -> Result<T> {
        self.connection.execute_merge(&MergeRequest::new(
            self.request.bucket.clone(),
            self.request.key.clone(),
            descriptor,
        ))
    }
}

/// Range query under construction
#[derive(Debug, Clone)]
pub struct RangeOperation<'a> {
    connection: &'a Connection,
    query: RangeQuery,
}

impl<'a> RangeOperation<'a> {
    pub fn to(mut self, end_key: impl Into<String>) -> Self {
        self.query = self.query.to(end_key);
        self
    }

    pub fn comparator(mut self, comparator: impl Into<String>) -> Self {
        self.query = self.query.comparator(comparator);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.query = self.query.limit(limit);
        self
    }

    /// Accept cached range results no older than `millis`
    pub fn time_to_live(mut self, millis: u64) -> Self {
        self.query = self.query.time_to_live(millis);
        self
    }

    pub fn predicate(mut self, predicate: impl Into<String>) -> Self {
        self.query = self.query.predicate(predicate);
        self
    }

    pub fn get<T: DeserializeOwned + 'static>(&self) -> Result<Values<T>> {
        self.connection.query_by_range(&self.query)
    }
}

/// Update under construction
#[derive(Debug, Clone)]
pub struct UpdateOperation<'a> {
    connection: &'a Connection,
    request: UpdateRequest,
}

impl<'a> UpdateOperation<'a> {
    pub fn timeout(mut self, millis: u64) -> Self {
        self.request.timeout = millis;
        self
    }

    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.request = self.request.parameters(parameters);
        self
    }

    pub fn execute(&self) -> Result<()> {
        self.connection.execute_update(&self.request)
    }

    pub fn execute_and_get<T: DeserializeOwned + 'static>(&self) -> Result<T> {
        self.connection.execute_update_and_get(&self.request)
    }
}
