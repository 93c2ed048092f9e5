use std::time::Duration;

use thumb_server::domain::FetchError;
use thumb_server::domain::ports::ImageFetcher;
use thumb_server::infrastructure::fetcher::{HttpImageFetcher, USER_AGENT};
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{TEST_FETCH_TIMEOUT, png_image};

const IMAGE_PATH: &str = "/taiga.jpg";

fn image_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}{IMAGE_PATH}", server.uri())).expect("valid mock URL")
}

fn fetcher(timeout: Duration) -> HttpImageFetcher {
    HttpImageFetcher::with_timeout(timeout).expect("Failed to build HTTP client")
}

#[tokio::test]
async fn fetches_image_bytes_with_origin_referer() {
    let server = MockServer::start().await;
    let image = png_image(16, 16);

    Mock::given(method("GET"))
        .and(path(IMAGE_PATH))
        .and(header("referer", server.uri().as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(image.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let bytes = fetcher(TEST_FETCH_TIMEOUT)
        .fetch(&image_url(&server))
        .await
        .expect("fetch should succeed");

    assert_eq!(bytes, image);

    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 1);
    let referer = requests[0]
        .headers
        .get("referer")
        .and_then(|v| v.to_str().ok());
    assert_eq!(referer, Some(server.uri().as_str()));
    assert!(!server.uri().ends_with('/'));
}

#[tokio::test]
async fn identifies_with_user_agent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(IMAGE_PATH))
        .and(header("user-agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"bytes".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    fetcher(TEST_FETCH_TIMEOUT)
        .fetch(&image_url(&server))
        .await
        .expect("fetch should succeed");
}

#[tokio::test]
async fn does_not_validate_body_as_image() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(IMAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"No image for you".to_vec()))
        .mount(&server)
        .await;

    let bytes = fetcher(TEST_FETCH_TIMEOUT)
        .fetch(&image_url(&server))
        .await
        .expect("fetch should succeed");

    assert_eq!(bytes, b"No image for you");
}

#[tokio::test]
async fn rejects_bad_status_with_code_in_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(IMAGE_PATH))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let err = fetcher(TEST_FETCH_TIMEOUT)
        .fetch(&image_url(&server))
        .await
        .expect_err("fetch should fail");

    assert!(matches!(err, FetchError::Status { status: 403, .. }));
    assert!(err.to_string().contains("403"), "{err}");
}

#[tokio::test]
async fn treats_299_as_a_bad_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(IMAGE_PATH))
        .respond_with(ResponseTemplate::new(299))
        .mount(&server)
        .await;

    let err = fetcher(TEST_FETCH_TIMEOUT)
        .fetch(&image_url(&server))
        .await
        .expect_err("fetch should fail");

    assert!(err.to_string().contains("299"), "{err}");
}

#[tokio::test]
async fn rejects_timed_out_request_with_transport_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(IMAGE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"late".to_vec())
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let err = fetcher(Duration::from_millis(100))
        .fetch(&image_url(&server))
        .await
        .expect_err("fetch should time out");

    assert!(matches!(err, FetchError::Network { .. }));
    assert!(err.to_string().contains("timed out"), "{err}");
}

#[tokio::test]
async fn rejects_refused_connection_with_transport_message() {
    let port = portpicker::pick_unused_port().expect("no free port");
    let url = Url::parse(&format!("http://127.0.0.1:{port}{IMAGE_PATH}")).expect("valid URL");

    let err = fetcher(TEST_FETCH_TIMEOUT)
        .fetch(&url)
        .await
        .expect_err("fetch should fail");

    let FetchError::Network { message, .. } = &err else {
        panic!("expected a network error, got {err:?}");
    };
    assert!(message.to_lowercase().contains("refused"), "{message}");
}

#[tokio::test]
async fn rejects_bodies_over_the_size_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(IMAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0_u8; 2048]))
        .mount(&server)
        .await;

    let err = fetcher(TEST_FETCH_TIMEOUT)
        .with_max_body_bytes(1024)
        .fetch(&image_url(&server))
        .await
        .expect_err("oversized body should be rejected");

    assert!(matches!(err, FetchError::Body { .. }));
    assert!(err.to_string().contains("exceeds 1024 bytes"), "{err}");
}

#[tokio::test]
async fn accepts_bodies_at_the_size_limit() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(IMAGE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7_u8; 1024]))
        .mount(&server)
        .await;

    let bytes = fetcher(TEST_FETCH_TIMEOUT)
        .with_max_body_bytes(1024)
        .fetch(&image_url(&server))
        .await
        .expect("body at the limit should be accepted");

    assert_eq!(bytes.len(), 1024);
}
