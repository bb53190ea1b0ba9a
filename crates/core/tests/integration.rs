//! Integration tests: HTTP transport against a local camera stand-in.
//!
//! Each test starts a `TcpListener` on an ephemeral port that answers fixed
//! responses by request path, then talks to it through the public API.

use std::net::SocketAddr;
use std::time::Instant;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use camstream::playback::{PlaybackSource, StreamCatalog, fetch_snapshot};
use camstream::{
    MjpegReader, PlaybackAction, PlaybackCoordinator, PlaybackState, ReaderConfig, StreamError,
};

const JPEG_A: &[u8] = b"\xff\xd8first\xff\xd9";
const JPEG_B: &[u8] = b"\xff\xd8second\r\n--cam\r\n\xff\xd9";

const MJPEG_HEAD: &[u8] = b"HTTP/1.1 200 OK\r\n\
    Content-Type: multipart/x-mixed-replace; boundary=cam\r\n\
    Connection: close\r\n";

fn mjpeg_body() -> Vec<u8> {
    let mut body = Vec::new();
    for jpeg in [JPEG_A, JPEG_B] {
        body.extend_from_slice(
            format!(
                "--cam\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
                jpeg.len()
            )
            .as_bytes(),
        );
        body.extend_from_slice(jpeg);
        body.extend_from_slice(b"\r\n");
    }
    body
}

fn mjpeg_response() -> Vec<u8> {
    let mut out = MJPEG_HEAD.to_vec();
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(&mjpeg_body());
    out
}

/// The same stream with `Transfer-Encoding: chunked`, in pieces of `size`.
fn chunked_mjpeg_response(size: usize) -> Vec<u8> {
    let mut out = MJPEG_HEAD.to_vec();
    out.extend_from_slice(b"Transfer-Encoding: chunked\r\n\r\n");
    for chunk in mjpeg_body().chunks(size) {
        out.extend_from_slice(format!("{:x}\r\n", chunk.len()).as_bytes());
        out.extend_from_slice(chunk);
        out.extend_from_slice(b"\r\n");
    }
    out.extend_from_slice(b"0\r\n\r\n");
    out
}

fn response(status: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n",
        status,
        content_type,
        body.len()
    )
    .into_bytes();
    out.extend_from_slice(body);
    out
}

/// Serve `routes` (path, raw response) until the test ends. Unknown paths
/// get a 404.
async fn serve(routes: Vec<(&'static str, Vec<u8>)>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let routes = routes.clone();

            tokio::spawn(async move {
                let mut reader = BufReader::new(stream);

                let mut request_line = String::new();
                reader.read_line(&mut request_line).await.unwrap();
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).await.unwrap() == 0 || line == "\r\n" {
                        break;
                    }
                }

                let path = request_line.split(' ').nth(1).unwrap_or("").to_string();
                let reply = routes
                    .iter()
                    .find(|(p, _)| *p == path)
                    .map(|(_, reply)| reply.clone())
                    .unwrap_or_else(|| response("404 Not Found", "text/plain", b"not found"));

                let stream = reader.get_mut();
                stream.write_all(&reply).await.unwrap();
                stream.shutdown().await.unwrap();
            });
        }
    });

    addr
}

#[tokio::test]
async fn fetch_reads_all_frames() {
    let addr = serve(vec![("/video.mjpeg", mjpeg_response())]).await;

    let url = format!("http://{}/video.mjpeg", addr);
    let mut reader = MjpegReader::fetch(&url, &ReaderConfig::default())
        .await
        .expect("open stream");
    assert_eq!(reader.boundary(), "cam");

    let first = reader.read_frame().await.unwrap().expect("first frame");
    assert_eq!(first.content_type, "image/jpeg");
    assert_eq!(first.data, JPEG_A);

    // the second picture contains the delimiter; Content-Length decides
    let second = reader.read_frame().await.unwrap().expect("second frame");
    assert_eq!(second.data, JPEG_B);

    assert!(reader.read_frame().await.unwrap().is_none());
    assert_eq!(reader.frames_read(), 2);
}

#[tokio::test]
async fn fetch_chunked_stream() {
    let addr = serve(vec![("/video.mjpeg", chunked_mjpeg_response(7))]).await;

    let url = format!("http://{}/video.mjpeg", addr);
    let mut reader = MjpegReader::fetch(&url, &ReaderConfig::default()).await.unwrap();

    let mut frames = Vec::new();
    while let Some(frame) = reader.read_frame().await.unwrap() {
        frames.push(frame.data);
    }
    assert_eq!(frames, vec![JPEG_A.to_vec(), JPEG_B.to_vec()]);
}

#[tokio::test]
async fn fetch_rejects_non_multipart() {
    let addr = serve(vec![("/still.jpg", response("200 OK", "image/jpeg", JPEG_A))]).await;

    let url = format!("http://{}/still.jpg", addr);
    let err = MjpegReader::fetch(&url, &ReaderConfig::default())
        .await
        .err()
        .expect("must fail");
    assert!(matches!(err, StreamError::UnexpectedContentType(ct) if ct == "image/jpeg"));
}

#[tokio::test]
async fn http_error_status() {
    let addr = serve(Vec::new()).await;

    let url = format!("http://{}/missing", addr);
    let err = MjpegReader::fetch(&url, &ReaderConfig::default())
        .await
        .err()
        .expect("must fail");
    assert!(matches!(err, StreamError::HttpStatus { code: 404, .. }));
}

#[tokio::test]
async fn catalog_and_snapshot() {
    let media = serve(vec![("/snapshot.jpg", response("200 OK", "image/jpeg", JPEG_A))]).await;

    let catalog_json = format!(
        r#"[
            {{"name": "main", "urls": [{{"format": "mjpeg", "url": "http://{media}/video.mjpeg"}}]}},
            {{"name": "still", "urls": [{{"format": "jpeg", "url": "http://{media}/snapshot.jpg"}}]}}
        ]"#
    );
    let api = serve(vec![(
        "/api/v1/streams",
        response("200 OK", "application/json", catalog_json.as_bytes()),
    )])
    .await;

    let catalog = StreamCatalog::fetch(&api.to_string()).await.unwrap();
    assert_eq!(catalog.streams().len(), 2);
    assert_eq!(
        catalog.select("main").unwrap(),
        PlaybackSource::Mjpeg(format!("http://{}/video.mjpeg", media))
    );
    assert!(matches!(
        catalog.select("still"),
        Err(StreamError::NoPlayableSource(_))
    ));

    let snapshot = fetch_snapshot(&catalog).await.unwrap().expect("snapshot");
    assert_eq!(snapshot.content_type, "image/jpeg");
    assert_eq!(snapshot.data, JPEG_A);
}

#[tokio::test]
async fn oversized_snapshot_is_refused() {
    let huge = b"HTTP/1.1 200 OK\r\n\
        Content-Type: image/jpeg\r\n\
        Content-Length: 1000000000000\r\n\r\n\xff\xd8"
        .to_vec();
    let media = serve(vec![("/snapshot.jpg", huge)]).await;

    let catalog = StreamCatalog::from_json(
        format!(r#"[{{"name": "still", "urls": [{{"format": "jpeg", "url": "http://{media}/snapshot.jpg"}}]}}]"#)
            .as_bytes(),
    )
    .unwrap();

    let err = fetch_snapshot(&catalog).await.unwrap_err();
    assert!(matches!(err, StreamError::BodyTooLarge { .. }));
}

#[tokio::test]
async fn overflowing_content_length_is_an_error() {
    let huge = b"HTTP/1.1 200 OK\r\n\
        Content-Type: application/json\r\n\
        Content-Length: 18446744073709551615\r\n\r\n[]"
        .to_vec();
    let api = serve(vec![("/api/v1/streams", huge)]).await;

    assert!(StreamCatalog::fetch(&api.to_string()).await.is_err());
}

#[tokio::test]
async fn invalid_url() {
    let err = MjpegReader::fetch("not a url", &ReaderConfig::default())
        .await
        .err()
        .expect("must fail");
    assert!(matches!(err, StreamError::InvalidUrl(_)));
}

#[tokio::test]
async fn catalog_fetch_error() {
    let api = serve(Vec::new()).await;
    let err = StreamCatalog::fetch(&api.to_string()).await.unwrap_err();
    assert!(matches!(err, StreamError::HttpStatus { code: 404, .. }));
}

#[tokio::test]
async fn coordinator_restarts_after_stream_end() {
    let addr = serve(vec![("/video.mjpeg", mjpeg_response())]).await;
    let url = format!("http://{}/video.mjpeg", addr);

    let mut coordinator = PlaybackCoordinator::default();
    let now = Instant::now();
    coordinator.play(Some("main"), now).unwrap();

    let mut reader = MjpegReader::fetch(&url, &ReaderConfig::default()).await.unwrap();
    while reader.read_frame().await.unwrap().is_some() {
        assert_eq!(coordinator.frame_displayed(Instant::now()), None);
    }
    assert_eq!(coordinator.state(), PlaybackState::Playing);

    let action = coordinator.stream_finished(reader.is_cancelled(), Instant::now());
    assert_eq!(action, Some(PlaybackAction::Restart));
    assert_eq!(coordinator.resume(Instant::now()).as_deref(), Some("main"));
}
