#![cfg(feature = "tokio-runtime")]

use mapstudio::{
    background::ingest::{DatasetSource, HttpSource, InlineSource},
    core::config::IngestionConfig,
    AnalysisResponse, MapStudio, StudioError, StudioOptions,
};
use serde_json::json;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Source that always fails, standing in for an unreachable server
struct BrokenSource;

#[async_trait::async_trait]
impl DatasetSource for BrokenSource {
    fn name(&self) -> &str {
        "broken"
    }

    async fn fetch(&self, _limits: &IngestionConfig) -> mapstudio::Result<AnalysisResponse> {
        Err(StudioError::ParseError("truncated response".into()))
    }
}

fn parks() -> String {
    json!({
        "type": "FeatureCollection",
        "features": (0..12).map(|i| json!({
            "type": "Feature",
            "properties": {"name": format!("park {i}"), "group": if i < 6 { "city" } else { "state" }},
            "geometry": {"type": "Point", "coordinates": [-122.0 + i as f64 * 0.1, 37.5]}
        })).collect::<Vec<_>>()
    })
    .to_string()
}

#[tokio::test]
async fn test_async_ingestion_applies_on_poll() {
    let mut studio = MapStudio::default();
    let job = studio
        .begin_ingestion(Arc::new(InlineSource::new("parks.geojson", parks())))
        .unwrap();

    tokio::spawn(job.run()).await.unwrap();
    assert!(studio.snapshot().is_empty());

    let reports = studio.poll_ingestion();
    assert_eq!(reports.len(), 1);
    let report = reports[0].as_ref().unwrap();
    assert_eq!(report.layer_ids.len(), 2);

    let snapshot = studio.snapshot();
    assert_eq!(snapshot.layers()[0].name, "parks · city");
    assert_eq!(snapshot.layers()[1].name, "parks · state");
    assert!(studio.poll_ingestion().is_empty());
}

#[tokio::test]
async fn test_failed_source_releases_guard() {
    let mut studio = MapStudio::default();
    let job = studio.begin_ingestion(Arc::new(BrokenSource)).unwrap();
    tokio::spawn(job.run()).await.unwrap();

    let reports = studio.poll_ingestion();
    assert!(matches!(reports[0], Err(StudioError::ParseError(_))));
    assert!(studio.snapshot().is_empty());
    assert!(!studio.is_ingesting());

    let retry = studio
        .begin_ingestion(Arc::new(InlineSource::new("parks", parks())))
        .unwrap();
    tokio::spawn(retry.run()).await.unwrap();
    assert!(studio.poll_ingestion()[0].is_ok());
}

fn studio_with_payload_limit(max_payload_bytes: usize) -> MapStudio {
    MapStudio::new(StudioOptions {
        ingestion: IngestionConfig {
            max_payload_bytes,
            ..IngestionConfig::default()
        },
        ..StudioOptions::default()
    })
    .unwrap()
}

/// Serves `body` once with chunked transfer encoding and no Content-Length
async fn serve_chunked(body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                return;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let mut response = String::from(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
        );
        for piece in body.as_bytes().chunks(256) {
            response.push_str(&format!("{:x}\r\n", piece.len()));
            response.push_str(std::str::from_utf8(piece).unwrap());
            response.push_str("\r\n");
        }
        response.push_str("0\r\n\r\n");
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    });

    format!("http://{}/parks.geojson", addr)
}

fn local_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn test_async_path_honours_configured_payload_limit() {
    let payload = parks();
    let mut studio = studio_with_payload_limit(64);
    assert!(payload.len() > 64);

    assert!(matches!(
        studio.ingest_str("parks", &payload),
        Err(StudioError::Oversize(_))
    ));

    let job = studio
        .begin_ingestion(Arc::new(InlineSource::new("parks", payload)))
        .unwrap();
    tokio::spawn(job.run()).await.unwrap();

    let reports = studio.poll_ingestion();
    assert!(matches!(reports[0], Err(StudioError::Oversize(_))));
    assert!(studio.snapshot().is_empty());
}

#[tokio::test]
async fn test_chunked_http_body_over_limit_rejected() {
    let body = parks();
    assert!(body.len() > 1000);
    let url = serve_chunked(body).await;

    let mut studio = studio_with_payload_limit(100);
    let source = HttpSource::new("parks", url).with_client(local_client());
    let job = studio.begin_ingestion(Arc::new(source)).unwrap();
    tokio::spawn(job.run()).await.unwrap();

    let reports = studio.poll_ingestion();
    assert!(matches!(reports[0], Err(StudioError::Oversize(_))));
    assert!(studio.snapshot().is_empty());
}

#[tokio::test]
async fn test_chunked_http_body_within_limit_ingested() {
    let url = serve_chunked(parks()).await;

    let mut studio = MapStudio::default();
    let source = HttpSource::new("parks", url).with_client(local_client());
    let job = studio.begin_ingestion(Arc::new(source)).unwrap();
    tokio::spawn(job.run()).await.unwrap();

    let reports = studio.poll_ingestion();
    assert_eq!(reports[0].as_ref().unwrap().layer_ids.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_background_encoding_on_runtime() {
    let mut studio = MapStudio::default();
    let features: Vec<_> = (0..2000)
        .map(|i| json!({
            "type": "Feature",
            "properties": {"depth": i as f64 / 10.0},
            "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}
        }))
        .collect();
    let report = studio
        .ingest_str(
            "quakes",
            &json!({"type": "FeatureCollection", "features": features}).to_string(),
        )
        .unwrap();
    let id = report.layer_ids[0].clone();

    let job = studio.color_by_job(&id, "depth").unwrap();
    tokio::spawn(job.run_into(studio.encoding_sender()))
        .await
        .unwrap();

    let applied = studio.poll_encodings();
    assert_eq!(applied.len(), 1);
    match &studio.layer(&id).unwrap().color_by {
        Some(encoding) => assert_eq!(
            encoding.domain,
            mapstudio::ColorDomain::Numeric {
                min: 0.0,
                max: 199.9
            }
        ),
        None => panic!("encoding was not applied"),
    }
}
