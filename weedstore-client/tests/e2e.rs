use std::collections::BTreeSet;
use std::io::Write as _;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use tokio::io::AsyncWrite;
use weedstore_client::{Client, Error, Payload, ReadSink, TransferOptions, VacuumOptions};
use weedstore_test::cluster::{Server, TestCluster};

fn client(cluster: &TestCluster) -> Client {
    weedstore_test::tracing::init();
    Client::new(cluster.endpoint()).unwrap()
}

/// A sink that records everything the client tells it.
#[derive(Debug, Default)]
struct RecordingSink {
    body: Vec<u8>,
    status: Option<StatusCode>,
    headers: Option<HeaderMap>,
    failure: Option<String>,
}

impl AsyncWrite for RecordingSink {
    fn poll_write(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
        buf: &[u8],
    ) -> std::task::Poll<std::io::Result<usize>> {
        std::pin::Pin::new(&mut self.body).poll_write(cx, buf)
    }

    fn poll_flush(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::pin::Pin::new(&mut self.body).poll_flush(cx)
    }

    fn poll_shutdown(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        std::pin::Pin::new(&mut self.body).poll_shutdown(cx)
    }
}

impl ReadSink for RecordingSink {
    fn write_head(&mut self, status: StatusCode, headers: &HeaderMap) {
        self.status = Some(status);
        self.headers = Some(headers.clone());
    }

    fn fail(&mut self, error: &Error) {
        self.failure = Some(error.to_string());
    }
}

#[tokio::test]
async fn writes_and_reads_single_file() {
    let cluster = TestCluster::new(1).await;
    let client = client(&cluster);

    let assignment = client.write_one(&b"oh hai!"[..]).send().await.unwrap();
    assert_eq!(assignment.count, 1);

    let response = client.read(assignment.fid.as_str()).send().await.unwrap();
    assert_eq!(response.status, StatusCode::OK);

    let received = response.payload().await.unwrap();
    assert_eq!(received, "oh hai!");
}

#[tokio::test]
async fn round_trips_known_fid() {
    let cluster = TestCluster::new(1).await;
    let client = client(&cluster);
    cluster.set_next_fid("3,01637037d6");

    let assignment = client.write_one(&b"hello world!"[..]).send().await.unwrap();
    assert_eq!(assignment.fid.as_str(), "3,01637037d6");

    let mut sink = RecordingSink::default();
    let copied = client
        .read("3,01637037d6")
        .send_to(&mut sink)
        .await
        .unwrap();

    assert_eq!(copied, 12);
    assert_eq!(sink.body, b"hello world!");
    assert_eq!(sink.status, Some(StatusCode::OK));
    let headers = sink.headers.unwrap();
    assert_eq!(headers["content-type"], "application/octet-stream");
    assert_eq!(sink.failure, None);
}

#[tokio::test]
async fn writes_batch_under_one_assignment() {
    let cluster = TestCluster::new(1).await;
    let client = client(&cluster);

    let payloads = [&b"first"[..], &b"second"[..], &b"third"[..]];
    let assignment = client.write(payloads).send().await.unwrap();
    assert_eq!(assignment.count, 3);

    for (index, (fid, expected)) in assignment.slots().zip(payloads).enumerate() {
        assert_eq!(fid, assignment.fid.part(index));
        let received = client
            .read(fid.as_str())
            .send()
            .await
            .unwrap()
            .payload()
            .await
            .unwrap();
        assert_eq!(received, expected);
    }

    let assigns = cluster
        .requests()
        .into_iter()
        .filter(|request| request.path == "/dir/assign")
        .count();
    assert_eq!(assigns, 1);
}

#[tokio::test]
async fn fails_batch_if_one_upload_fails() {
    let cluster = TestCluster::new(1).await;
    let client = client(&cluster);
    cluster.set_next_fid("3,01637037d6");
    cluster.fail_upload("3,01637037d6_1", "disk full");

    let err = client
        .write([&b"first"[..], &b"second"[..], &b"third"[..]])
        .send()
        .await
        .unwrap_err();

    let Error::Cluster { message, volume_id } = &err else {
        panic!("expected cluster error, got {err:?}");
    };
    assert_eq!(message, "disk full");
    assert_eq!(volume_id, &None);
    assert!(cluster.stored(0, "3,01637037d6_1").is_none());
}

#[tokio::test]
async fn uploads_file_from_disk() {
    let cluster = TestCluster::new(1).await;
    let client = client(&cluster);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"from disk").unwrap();

    let assignment = client
        .write_one(Payload::path(file.path()))
        .send()
        .await
        .unwrap();

    let stored = cluster.stored(0, assignment.fid.as_str()).unwrap();
    assert_eq!(stored, "from disk");
}

#[tokio::test]
async fn fails_on_missing_file() {
    let cluster = TestCluster::new(1).await;
    let client = client(&cluster);

    let dir = tempfile::tempdir().unwrap();
    let err = client
        .write_one(Payload::path(dir.path().join("missing")))
        .send()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Io(_)));
}

#[tokio::test]
async fn uploads_stream() {
    let cluster = TestCluster::new(1).await;
    let client = client(&cluster);

    let reader = std::io::Cursor::new(b"streamed".to_vec());
    let assignment = client
        .write_one(Payload::read(reader))
        .send()
        .await
        .unwrap();

    let stored = cluster.stored(0, assignment.fid.as_str()).unwrap();
    assert_eq!(stored, "streamed");
}

#[tokio::test]
async fn fails_write_when_assign_fails() {
    let cluster = TestCluster::new(1).await;
    let client = client(&cluster);
    cluster.fail_assign("No free volumes left!");

    let err = client.write_one(&b"data"[..]).send().await.unwrap_err();

    let Error::Cluster { message, .. } = &err else {
        panic!("expected cluster error, got {err:?}");
    };
    assert_eq!(message, "No free volumes left!");
    assert!(cluster.volume_requests().is_empty());
}

#[tokio::test]
async fn removes_from_every_replica() {
    let cluster = TestCluster::new(3).await;
    let client = client(&cluster);

    let assignment = client.write_one(&b"replicated"[..]).send().await.unwrap();
    let fid = assignment.fid.as_str();
    for replica in 0..3 {
        assert!(cluster.stored(replica, fid).is_some());
    }

    let response = client.remove(fid).send().await.unwrap();
    assert_eq!(response.count, 3);

    for replica in 0..3 {
        assert!(cluster.stored(replica, fid).is_none());
    }
}

#[tokio::test]
async fn fails_remove_if_one_replica_lacks_file() {
    let cluster = TestCluster::new(3).await;
    let client = client(&cluster);

    let assignment = client.write_one(&b"replicated"[..]).send().await.unwrap();
    let fid = assignment.fid.as_str();
    cluster.evict(1, fid).unwrap();

    let err = client.remove(fid).send().await.unwrap_err();

    let Error::NotFound { fid: missing } = &err else {
        panic!("expected not found, got {err:?}");
    };
    assert_eq!(missing.as_str(), fid);
    assert!(err.is_not_found());
}

#[tokio::test]
async fn fails_remove_of_empty_file() {
    let cluster = TestCluster::new(1).await;
    let client = client(&cluster);

    let assignment = client.write_one(Vec::<u8>::new()).send().await.unwrap();
    let err = client
        .remove(assignment.fid.as_str())
        .send()
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Removal { .. }));
}

#[tokio::test]
async fn reports_missing_volume_servers() {
    let cluster = TestCluster::new(2).await;
    let client = client(&cluster);

    let assignment = client.write_one(&b"data"[..]).send().await.unwrap();
    cluster.clear_locations();
    let uploads = cluster.volume_requests().len();

    let err = client
        .read(assignment.fid.as_str())
        .send()
        .await
        .unwrap_err();

    let Error::NoVolumeServers { fid } = &err else {
        panic!("expected no volume servers, got {err:?}");
    };
    assert_eq!(fid, &assignment.fid);
    assert_eq!(err.to_string(), "no volume servers found for volume 3");
    assert_eq!(cluster.volume_requests().len(), uploads);
}

#[tokio::test]
async fn removes_nothing_without_locations() {
    let cluster = TestCluster::new(2).await;
    let client = client(&cluster);
    cluster.clear_locations();

    let response = client.remove("3,01637037d6").send().await.unwrap();

    assert_eq!(response.count, 0);
    assert!(cluster.volume_requests().is_empty());
}

#[tokio::test]
async fn notifies_sink_about_missing_file() {
    let cluster = TestCluster::new(1).await;
    let client = client(&cluster);

    let assignment = client.write_one(&b"data"[..]).send().await.unwrap();
    cluster.evict(0, assignment.fid.as_str()).unwrap();

    let mut sink = RecordingSink::default();
    let err = client
        .read(assignment.fid.as_str())
        .send_to(&mut sink)
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(sink.failure, Some(err.to_string()));
    assert_eq!(sink.status, None);
    assert!(sink.body.is_empty());
}

#[tokio::test]
async fn reports_unknown_volume() {
    let cluster = TestCluster::new(1).await;
    let client = client(&cluster);

    let err = client.read("99,abc").send().await.unwrap_err();

    let Error::Cluster { message, volume_id } = &err else {
        panic!("expected cluster error, got {err:?}");
    };
    assert_eq!(message, "volume id 99 not found");
    assert_eq!(volume_id.as_deref(), Some("99"));
    assert_eq!(err.volume_id(), Some("99"));
}

#[tokio::test]
async fn looks_up_same_replicas_repeatedly() {
    let cluster = TestCluster::new(3).await;
    let client = client(&cluster);

    let assignment = client.write_one(&b"data"[..]).send().await.unwrap();
    let fid = assignment.fid.as_str();

    let first = client.lookup(fid).send().await.unwrap();
    let second = client.lookup(fid).send().await.unwrap();

    assert_eq!(first.volume_id, "3");
    assert_eq!(first.locations.len(), 3);
    let first: BTreeSet<_> = first.locations.into_iter().collect();
    let second: BTreeSet<_> = second.locations.into_iter().collect();
    assert_eq!(first, second);
}

#[tokio::test]
async fn concurrent_writes_get_distinct_fids() {
    let cluster = TestCluster::new(1).await;
    let client = client(&cluster);

    let (a, b) = tokio::join!(
        client.write_one(&b"alpha"[..]).send(),
        client.write_one(&b"beta"[..]).send(),
    );
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_ne!(a.fid, b.fid);

    let a = client.read(a.fid.as_str()).send().await.unwrap();
    let b = client.read(b.fid.as_str()).send().await.unwrap();
    assert_eq!(a.payload().await.unwrap(), "alpha");
    assert_eq!(b.payload().await.unwrap(), "beta");
}

#[tokio::test]
async fn forwards_headers_to_volume_servers_only() {
    let cluster = TestCluster::new(2).await;
    let client = client(&cluster);

    let assignment = client
        .write_one(&b"data"[..])
        .collection("pictures")
        .ttl("3d")
        .header("authorization", "Bearer secret")
        .send()
        .await
        .unwrap();
    client
        .read(assignment.fid.as_str())
        .header("authorization", "Bearer secret")
        .send()
        .await
        .unwrap();
    client
        .remove(assignment.fid.as_str())
        .header("authorization", "Bearer secret")
        .send()
        .await
        .unwrap();

    for request in cluster.requests() {
        let forwarded = request.headers.get("authorization");
        match request.server {
            Server::Master => assert_eq!(forwarded, None, "{request:?}"),
            Server::Volume(_) => assert_eq!(forwarded.unwrap(), "Bearer secret"),
        }
    }

    let assign = cluster
        .requests()
        .into_iter()
        .find(|request| request.path == "/dir/assign")
        .unwrap();
    let query = assign.query.unwrap();
    assert!(query.contains("count=1"));
    assert!(query.contains("collection=pictures"));
    assert!(query.contains("ttl=3d"));
    assert!(!query.contains("authorization"));
}

#[tokio::test]
async fn uses_public_url_when_asked() {
    let cluster = TestCluster::new(1).await;
    let client = Client::builder(cluster.endpoint())
        .use_public_url(true)
        .build()
        .unwrap();

    let assignment = client.write_one(&b"data"[..]).send().await.unwrap();
    client
        .read(assignment.fid.as_str())
        .use_public_url(false)
        .send()
        .await
        .unwrap();

    let hosts: Vec<_> = cluster
        .volume_requests()
        .into_iter()
        .map(|request| request.headers["host"].to_str().unwrap().to_owned())
        .collect();
    assert_eq!(
        hosts,
        [cluster.public_address(0), cluster.volume_address(0)]
    );
}

#[tokio::test]
async fn appends_url_suffix() {
    let cluster = TestCluster::new(1).await;
    let client = client(&cluster);

    let assignment = client.write_one(&b"pixels"[..]).send().await.unwrap();
    let received = client
        .read(assignment.fid.as_str())
        .url_suffix(".jpg")
        .send()
        .await
        .unwrap()
        .payload()
        .await
        .unwrap();
    assert_eq!(received, "pixels");

    let last = cluster.volume_requests().pop().unwrap();
    assert_eq!(last.path, format!("/{}.jpg", assignment.fid));
}

#[tokio::test]
async fn sends_vacuum_options() {
    let cluster = TestCluster::new(1).await;
    let client = client(&cluster);

    let options = VacuumOptions {
        garbage_threshold: Some(0.4),
        collection: None,
    };
    let echoed = client.vacuum(&options).await.unwrap();

    assert_eq!(echoed["garbageThreshold"], "0.4");
    assert!(echoed.get("collection").is_none());
}

#[tokio::test]
async fn queries_status_endpoints() {
    let cluster = TestCluster::new(2).await;
    let client = client(&cluster);

    let system = client.system_status().await.unwrap();
    assert_eq!(system["Topology"]["DataNodes"].as_array().unwrap().len(), 2);

    let master = client.master_status().await.unwrap();
    assert_eq!(master["IsLeader"], true);

    let volume = client
        .volume_status(&cluster.volume_address(1))
        .await
        .unwrap();
    assert_eq!(volume["Version"], "test");
}

#[tokio::test]
async fn applies_collection_to_lookup() {
    let cluster = TestCluster::new(1).await;
    let client = client(&cluster);

    let options = TransferOptions {
        collection: Some("pictures".into()),
        ..Default::default()
    };
    let assignment = client
        .write_one(&b"data"[..])
        .options(options.clone())
        .send()
        .await
        .unwrap();
    client
        .read(assignment.fid.as_str())
        .options(options)
        .send()
        .await
        .unwrap();

    let lookup = cluster
        .requests()
        .into_iter()
        .find(|request| request.path == "/dir/lookup")
        .unwrap();
    let query = lookup.query.unwrap();
    assert!(query.contains("volumeId=3"));
    assert!(query.contains("collection=pictures"));
}
