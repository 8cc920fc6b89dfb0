//! An in-process fake of a blob cluster: one master and a number of replicated volume servers.
//!
//! The fake keeps all files in memory. Every volume server holds its own copy, so a file can be
//! evicted from a single replica to simulate drift. All requests are recorded and can be
//! inspected after the fact.
//!
//! ```
//! use weedstore_test::cluster::TestCluster;
//!
//! #[tokio::main]
//! async fn main() {
//!    let cluster = TestCluster::new(2).await;
//!    let endpoint = cluster.endpoint();
//!    // point a client at the endpoint...
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::{HeaderMap, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use bytes::Bytes;
use serde_json::{Value, json};
use weedstore_types::{ClusterEndpoint, Scheme};

use crate::server::TestServer;

/// The only volume the fake master knows about.
pub const VOLUME_ID: &str = "3";

/// Cookie appended to every generated file key.
const COOKIE: &str = "637037d6";

/// Identifies which server of the cluster received a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Server {
    /// The master.
    Master,
    /// The volume server with the given replica index.
    Volume(usize),
}

/// A request as received by one of the servers.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// The server that handled the request.
    pub server: Server,
    /// HTTP method.
    pub method: Method,
    /// Request path, including the leading slash.
    pub path: String,
    /// Raw query string, if any.
    pub query: Option<String>,
    /// All request headers.
    pub headers: HeaderMap,
}

#[derive(Debug, Default)]
struct Inner {
    stores: Vec<HashMap<String, Bytes>>,
    ports: Vec<u16>,
    next_key: u64,
    next_fid: Option<String>,
    assign_error: Option<String>,
    upload_errors: HashMap<String, String>,
    locations_cleared: bool,
    requests: Vec<RecordedRequest>,
}

type Shared = Arc<Mutex<Inner>>;

fn lock(shared: &Shared) -> MutexGuard<'_, Inner> {
    shared.lock().unwrap()
}

/// A fake master with `N` volume servers, each serving on its own random localhost port.
///
/// Volume servers advertise `127.0.0.1:<port>` as their URL and `localhost:<port>` as their
/// public URL, so both addresses reach the same server and can be told apart by the `Host`
/// header.
#[derive(Debug)]
pub struct TestCluster {
    shared: Shared,
    master: TestServer,
    volumes: Vec<TestServer>,
}

impl TestCluster {
    /// Starts a cluster with `replicas` volume servers that all hold volume [`VOLUME_ID`].
    pub async fn new(replicas: usize) -> Self {
        assert!(replicas > 0, "a cluster needs at least one volume server");

        let shared = Shared::default();
        lock(&shared).next_key = 1;

        let mut volumes = Vec::with_capacity(replicas);
        for index in 0..replicas {
            lock(&shared).stores.push(HashMap::new());
            volumes.push(TestServer::with_router(volume_router(shared.clone(), index)).await);
        }
        lock(&shared).ports = volumes.iter().map(TestServer::port).collect();

        let master = TestServer::with_router(master_router(shared.clone())).await;

        Self {
            shared,
            master,
            volumes,
        }
    }

    /// The endpoint of the master.
    pub fn endpoint(&self) -> ClusterEndpoint {
        ClusterEndpoint::new(Scheme::Http, "127.0.0.1", self.master.port())
    }

    /// The internal address of the given replica, as reported in `url`.
    pub fn volume_address(&self, replica: usize) -> String {
        format!("127.0.0.1:{}", self.volumes[replica].port())
    }

    /// The public address of the given replica, as reported in `publicUrl`.
    pub fn public_address(&self, replica: usize) -> String {
        format!("localhost:{}", self.volumes[replica].port())
    }

    /// Makes every subsequent assign fail with `message`.
    pub fn fail_assign(&self, message: impl Into<String>) {
        lock(&self.shared).assign_error = Some(message.into());
    }

    /// Makes every subsequent upload of `fid` fail with a server error carrying `message`.
    pub fn fail_upload(&self, fid: impl Into<String>, message: impl Into<String>) {
        lock(&self.shared)
            .upload_errors
            .insert(fid.into(), message.into());
    }

    /// Makes every subsequent lookup report no replicas.
    pub fn clear_locations(&self) {
        lock(&self.shared).locations_cleared = true;
    }

    /// Removes a file from a single replica and returns its contents.
    pub fn evict(&self, replica: usize, fid: &str) -> Option<Bytes> {
        lock(&self.shared).stores[replica].remove(fid)
    }

    /// Makes the next assign hand out `fid` instead of a generated one.
    pub fn set_next_fid(&self, fid: impl Into<String>) {
        lock(&self.shared).next_fid = Some(fid.into());
    }

    /// Returns the contents of a file on the given replica.
    pub fn stored(&self, replica: usize, fid: &str) -> Option<Bytes> {
        lock(&self.shared).stores[replica].get(fid).cloned()
    }

    /// Returns all requests received so far, in order of arrival.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.shared).requests.clone()
    }

    /// Returns all requests received by any volume server.
    pub fn volume_requests(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| matches!(request.server, Server::Volume(_)))
            .collect()
    }
}

#[derive(Debug, Clone)]
struct Recorder {
    shared: Shared,
    server: Server,
}

async fn record(State(recorder): State<Recorder>, request: Request, next: Next) -> Response {
    let recorded = RecordedRequest {
        server: recorder.server,
        method: request.method().clone(),
        path: request.uri().path().to_owned(),
        query: request.uri().query().map(str::to_owned),
        headers: request.headers().clone(),
    };
    lock(&recorder.shared).requests.push(recorded);

    next.run(request).await
}

fn location(port: u16) -> Value {
    json!({
        "url": format!("127.0.0.1:{port}"),
        "publicUrl": format!("localhost:{port}"),
    })
}

fn master_router(shared: Shared) -> Router {
    let recorder = Recorder {
        shared: shared.clone(),
        server: Server::Master,
    };

    Router::new()
        .route("/dir/assign", get(assign))
        .route("/dir/lookup", get(lookup))
        .route("/dir/status", get(dir_status))
        .route("/cluster/status", get(cluster_status))
        .route("/vol/vacuum", get(vacuum))
        .layer(middleware::from_fn_with_state(recorder, record))
        .with_state(shared)
}

async fn assign(
    State(shared): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut inner = lock(&shared);
    if let Some(error) = inner.assign_error.clone() {
        return (StatusCode::NOT_ACCEPTABLE, Json(json!({ "error": error }))).into_response();
    }

    let count: u64 = query
        .get("count")
        .and_then(|count| count.parse().ok())
        .unwrap_or(1);
    let fid = match inner.next_fid.take() {
        Some(fid) => fid,
        None => {
            let key = inner.next_key;
            inner.next_key += count;
            format!("{VOLUME_ID},{key:02x}{COOKIE}")
        }
    };

    let port = inner.ports[0];
    Json(json!({
        "fid": fid,
        "url": format!("127.0.0.1:{port}"),
        "publicUrl": format!("localhost:{port}"),
        "count": count,
    }))
    .into_response()
}

async fn lookup(
    State(shared): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let volume_id = query.get("volumeId").cloned().unwrap_or_default();
    if volume_id != VOLUME_ID {
        let body = json!({
            "volumeId": volume_id,
            "error": format!("volume id {volume_id} not found"),
        });
        return (StatusCode::NOT_FOUND, Json(body)).into_response();
    }

    let inner = lock(&shared);
    let locations: Vec<Value> = if inner.locations_cleared {
        Vec::new()
    } else {
        inner.ports.iter().copied().map(location).collect()
    };

    Json(json!({ "volumeId": volume_id, "locations": locations })).into_response()
}

async fn dir_status(State(shared): State<Shared>) -> Json<Value> {
    let inner = lock(&shared);
    let nodes: Vec<Value> = inner.ports.iter().copied().map(location).collect();
    Json(json!({
        "Version": "test",
        "Topology": { "Max": 1, "Free": 0, "DataNodes": nodes },
    }))
}

async fn cluster_status() -> Json<Value> {
    Json(json!({ "IsLeader": true, "Leader": "", "Peers": [] }))
}

async fn vacuum(Query(query): Query<HashMap<String, String>>) -> Json<HashMap<String, String>> {
    Json(query)
}

#[derive(Debug, Clone)]
struct Volume {
    shared: Shared,
    index: usize,
}

fn volume_router(shared: Shared, index: usize) -> Router {
    let recorder = Recorder {
        shared: shared.clone(),
        server: Server::Volume(index),
    };

    Router::new()
        .route("/status", get(volume_status))
        .route(
            "/{fid}",
            get(read_file).post(write_file).delete(delete_file),
        )
        .layer(middleware::from_fn_with_state(recorder, record))
        .with_state(Volume { shared, index })
}

async fn volume_status(State(volume): State<Volume>) -> Json<Value> {
    let inner = lock(&volume.shared);
    Json(json!({
        "Version": "test",
        "Volumes": [{ "Id": 3, "FileCount": inner.stores[volume.index].len() }],
    }))
}

async fn write_file(
    State(volume): State<Volume>,
    Path(fid): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let mut contents = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            contents = field.bytes().await.ok();
        }
    }
    let Some(contents) = contents else {
        let body = json!({ "error": "missing form field 'file'" });
        return (StatusCode::BAD_REQUEST, Json(body)).into_response();
    };

    let mut inner = lock(&volume.shared);
    if let Some(error) = inner.upload_errors.get(&fid) {
        let body = json!({ "error": error });
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response();
    }

    let size = contents.len();
    // Replication is synchronous: every replica has the file once the upload returns.
    for store in &mut inner.stores {
        store.insert(fid.clone(), contents.clone());
    }

    (StatusCode::CREATED, Json(json!({ "size": size }))).into_response()
}

async fn read_file(State(volume): State<Volume>, Path(fid): Path<String>) -> Response {
    // Extensions such as `.jpg` are cosmetic.
    let fid = fid.split('.').next().unwrap_or_default();

    let inner = lock(&volume.shared);
    match inner.stores[volume.index].get(fid) {
        Some(contents) => (
            [(header::CONTENT_TYPE, "application/octet-stream")],
            contents.clone(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_file(State(volume): State<Volume>, Path(fid): Path<String>) -> Response {
    let mut inner = lock(&volume.shared);
    match inner.stores[volume.index].remove(&fid) {
        Some(contents) => Json(json!({ "size": contents.len() })).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "size": 0 }))).into_response(),
    }
}
