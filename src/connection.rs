use crate::codec::CodecRegistry;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::error_translator;
use crate::host::{Host, HostManager};
use crate::types::*;
use bytes::Bytes;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// One REST call, independent of the host it ends up being sent to.
#[derive(Debug, Clone)]
struct RestRequest {
    method: Method,
    segments: Vec<String>,
    query: Vec<(&'static str, String)>,
    body: Option<Bytes>,
}

impl RestRequest {
    fn new(method: Method) -> Self {
        Self {
            method,
            segments: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    fn query(mut self, name: &'static str, value: impl ToString) -> Self {
        self.query.push((name, value.to_string()));
        self
    }

    fn query_opt<V: ToString>(self, name: &'static str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(name, value),
            None => self,
        }
    }

    fn body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    fn url(&self, host: &Host) -> Result<Url> {
        let mut url = host.url().clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidArgument(format!("host cannot carry a path: {}", host)))?
            .pop_if_empty()
            .extend(&self.segments);
        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.query {
                pairs.append_pair(name, value);
            }
        }
        Ok(url)
    }
}

/// Connection to a Terrastore cluster over HTTP.
///
/// Every operation picks a host from the [`HostManager`], sends exactly one
/// REST call to it and fails over to the next host only when no HTTP response
/// could be obtained. Cloning is cheap and clones share the host manager.
#[derive(Debug, Clone)]
pub struct Connection {
    hosts: Arc<dyn HostManager>,
    codecs: Arc<CodecRegistry>,
    http: Client,
}

impl Connection {
    /// Create a new connection from its parts
    pub fn new(hosts: Arc<dyn HostManager>, codecs: CodecRegistry, http: Client) -> Self {
        Self {
            hosts,
            codecs: Arc::new(codecs),
            http,
        }
    }

    /// The host the next operation will target
    pub fn current_host(&self) -> Result<Host> {
        self.hosts.next()
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    /// Create a bucket
    pub fn create_bucket(&self, bucket: &str) -> Result<()> {
        require_segment("bucket", bucket)?;
        self.execute(RestRequest::new(Method::PUT).segment(bucket))?;
        Ok(())
    }

    /// Remove a bucket and every value in it
    pub fn remove_bucket(&self, bucket: &str) -> Result<()> {
        require_segment("bucket", bucket)?;
        self.execute(RestRequest::new(Method::DELETE).segment(bucket))?;
        Ok(())
    }

    /// List the names of all buckets
    pub fn list_buckets(&self) -> Result<Buckets> {
        let body = self.execute(RestRequest::new(Method::GET))?;
        self.codecs.deserialize(&body)
    }

    /// Put a value under a key, replacing any previous value
    pub fn put_value<T: Serialize + 'static>(&self, request: &KeyRequest, value: &T) -> Result<()> {
        let body = self.codecs.serialize(value)?;
        self.execute(key_request(Method::PUT, request)?.body(body))?;
        Ok(())
    }

    /// Get the value stored under a key
    pub fn get_value<T: DeserializeOwned + 'static>(&self, request: &KeyRequest) -> Result<T> {
        let body = self.execute(key_request(Method::GET, request)?)?;
        self.codecs.deserialize(&body)
    }

    /// Remove a key and its value
    pub fn remove_value(&self, request: &KeyRequest) -> Result<()> {
        self.execute(key_request(Method::DELETE, request)?)?;
        Ok(())
    }

    /// List the values of a bucket, up to the query limit
    pub fn list_values<T: DeserializeOwned + 'static>(&self, query: &ValuesQuery) -> Result<Values<T>> {
        if let Some(predicate) = &query.predicate {
            if query.limit.is_some() {
                tracing::debug!(bucket = %query.bucket, "limit ignored for predicate listing");
            }
            return self.query_by_predicate(&PredicateQuery::new(query.bucket.clone(), predicate.clone()));
        }

        require_segment("bucket", &query.bucket)?;
        let request = RestRequest::new(Method::GET)
            .segment(query.bucket.as_str())
            .query_opt("limit", query.limit);
        let body = self.execute(request)?;
        self.codecs.deserialize_values(&body)
    }

    /// Query a bucket by key range
    pub fn query_by_range<T: DeserializeOwned + 'static>(&self, query: &RangeQuery) -> Result<Values<T>> {
        require_segment("bucket", &query.bucket)?;
        require_present("start key", &query.start_key)?;

        let request = RestRequest::new(Method::GET)
            .segment(query.bucket.as_str())
            .segment("range")
            .query("startKey", &query.start_key)
            .query_opt("endKey", query.end_key.as_ref())
            .query_opt("comparator", query.comparator.as_ref())
            .query_opt("limit", query.limit)
            .query_opt("timeToLive", query.time_to_live)
            .query_opt("predicate", query.predicate.as_ref());
        let body = self.execute(request)?;
        self.codecs.deserialize_values(&body)
    }

    /// Query a bucket for every value matching a predicate
    pub fn query_by_predicate<T: DeserializeOwned + 'static>(
        &self,
        query: &PredicateQuery,
    ) -> Result<Values<T>> {
        require_segment("bucket", &query.bucket)?;
        require_present("predicate", &query.predicate)?;

        let request = RestRequest::new(Method::GET)
            .segment(query.bucket.as_str())
            .segment("predicate")
            .query("predicate", &query.predicate);
        let body = self.execute(request)?;
        self.codecs.deserialize_values(&body)
    }

    /// Run a server-side update function against a value
    pub fn execute_update(&self, request: &UpdateRequest) -> Result<()> {
        self.execute(self.update_request(request)?)?;
        Ok(())
    }

    /// Run a server-side update function and return the updated value
    pub fn execute_update_and_get<T: DeserializeOwned + 'static>(
        &self,
        request: &UpdateRequest,
    ) -> Result<T> {
        let body = self.execute(self.update_request(request)?)?;
        self.codecs.deserialize(&body)
    }

    /// Merge a descriptor into a stored value and return the merged value
    pub fn execute_merge<T: DeserializeOwned + 'static>(&self, request: &MergeRequest) -> Result<T> {
        require_segment("bucket", &request.bucket)?;
        require_segment("key", &request.key)?;

        let body = self.codecs.serialize(&request.descriptor)?;
        let request = RestRequest::new(Method::POST)
            .segment(request.bucket.as_str())
            .segment(request.key.as_str())
            .segment("merge")
            .body(body);
        let body = self.execute(request)?;
        self.codecs.deserialize(&body)
    }

    /// Run a map-reduce task over a bucket
    pub fn execute_map_reduce<T: DeserializeOwned + 'static>(
        &self,
        request: &MapReduceRequest,
    ) -> Result<T> {
        require_segment("bucket", &request.bucket)?;
        require_present("mapper", &request.query.task.mapper)?;
        require_present("reducer", &request.query.task.reducer)?;

        let body = self.codecs.serialize(&request.query)?;
        let request = RestRequest::new(Method::POST)
            .segment(request.bucket.as_str())
            .segment("mapReduce")
            .body(body);
        let body = self.execute(request)?;
        self.codecs.deserialize(&body)
    }

    /// Export a bucket to a backup file on the server
    pub fn export_backup(&self, request: &BackupRequest) -> Result<()> {
        self.execute(backup_request("export", "destination", request)?)?;
        Ok(())
    }

    /// Import a bucket from a backup file on the server
    pub fn import_backup(&self, request: &BackupRequest) -> Result<()> {
        self.execute(backup_request("import", "source", request)?)?;
        Ok(())
    }

    /// Cluster membership statistics
    pub fn cluster_stats(&self) -> Result<ClusterStats> {
        let request = RestRequest::new(Method::GET).segment("_stats").segment("cluster");
        let body = self.execute(request)?;
        self.codecs.deserialize(&body)
    }

    fn update_request(&self, request: &UpdateRequest) -> Result<RestRequest> {
        require_segment("bucket", &request.bucket)?;
        require_segment("key", &request.key)?;
        require_present("update function", &request.function)?;

        let body = self.codecs.serialize(&request.parameters)?;
        Ok(RestRequest::new(Method::POST)
            .segment(request.bucket.as_str())
            .segment(request.key.as_str())
            .segment("update")
            .query("function", &request.function)
            .query("timeout", request.timeout)
            .body(body))
    }

    /// Sends `request`, failing over across hosts until one answers.
    ///
    /// After a host returns response headers the call is never sent to another host.
    fn execute(&self, request: RestRequest) -> Result<Bytes> {
        loop {
            let host = self.hosts.next()?;
            let url = request.url(&host)?;
            tracing::debug!(host = %host, method = %request.method, url = %url, "sending request");

            let response = match self.send(&request, url) {
                Ok(response) => response,
                Err(err) if err.is_builder() => {
                    return Err(Error::InvalidArgument(err.to_string()));
                }
                Err(err) => {
                    tracing::warn!(host = %host, error = %err, "request failed before a response");
                    if self.hosts.on_failure(&host) {
                        continue;
                    }
                    return Err(Error::Connectivity { host, source: err });
                }
            };

            self.hosts.on_success(&host);
            let status = response.status();
            tracing::debug!(status = status.as_u16(), "received response");
            let body = match response.bytes() {
                Ok(body) => body,
                Err(err) => {
                    tracing::warn!(host = %host, error = %err, "response body cut short");
                    return Err(Error::ResponseBody { host, source: err });
                }
            };

            if status.is_success() {
                return Ok(body);
            }
            return Err(error_translator::translate(status, &body));
        }
    }

    fn send(&self, request: &RestRequest, url: Url) -> reqwest::Result<Response> {
        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(ACCEPT, mime::APPLICATION_JSON.as_ref());
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, mime::APPLICATION_JSON.as_ref())
                .body(body.clone());
        }
        builder.send()
    }
}

fn key_request(method: Method, request: &KeyRequest) -> Result<RestRequest> {
    require_segment("bucket", &request.bucket)?;
    require_segment("key", &request.key)?;
    if let Some(predicate) = &request.predicate {
        require_present("predicate", predicate)?;
    }

    Ok(RestRequest::new(method)
        .segment(request.bucket.as_str())
        .segment(request.key.as_str())
        .query_opt("predicate", request.predicate.as_ref()))
}

fn backup_request(action: &str, file_param: &'static str, request: &BackupRequest) -> Result<RestRequest> {
    require_segment("bucket", &request.bucket)?;
    require_present("backup file name", &request.file_name)?;
    require_present("backup secret key", &request.secret_key)?;

    Ok(RestRequest::new(Method::POST)
        .segment(request.bucket.as_str())
        .segment(action)
        .query(file_param, &request.file_name)
        .query("secret", &request.secret_key)
        .body(Bytes::new()))
}

/// Bucket and key names become path segments; `.` and `..` would be swallowed by URL normalization.
fn require_segment(what: &str, value: &str) -> Result<()> {
    require_present(what, value)?;
    if value == "." || value == ".." {
        return Err(Error::InvalidArgument(format!("{} cannot be {:?}", what, value)));
    }
    Ok(())
}

fn require_present(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("{} must not be empty", what)));
    }
    Ok(())
}

/// Binds a host manager and a codec registry into a ready-to-use [`Connection`].
pub trait ConnectionFactory {
    fn make_connection(&self, hosts: Arc<dyn HostManager>, codecs: CodecRegistry) -> Result<Connection>;
}

/// Builds connections backed by a blocking `reqwest` client
#[derive(Debug, Clone)]
pub struct HttpConnectionFactory {
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl HttpConnectionFactory {
    pub fn new() -> Self {
        Self::from_config(&ClientConfig::default())
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            request_timeout: config.request_timeout(),
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for HttpConnectionFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionFactory for HttpConnectionFactory {
    fn make_connection(&self, hosts: Arc<dyn HostManager>, codecs: CodecRegistry) -> Result<Connection> {
        let http = Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| Error::Configuration(e.to_string()))?;

        Ok(Connection::new(hosts, codecs, http))
    }
}
