use rangezip::{Error, HttpRangeReader, RangeRead};

fn reader_for(server: &mockito::Server, path: &str) -> HttpRangeReader {
    HttpRangeReader::new(format!("{}{}", server.url(), path))
        .unwrap()
        .with_max_retry(1)
}

#[tokio::test]
async fn test_missing_object_is_not_found() {
    let mut server = mockito::Server::new_async().await;
    let _head = server
        .mock("HEAD", "/missing.zip")
        .with_status(404)
        .create_async()
        .await;

    let err = reader_for(&server, "/missing.zip").size().await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "{:?}", err);
}

#[tokio::test]
async fn test_server_without_ranges_is_rejected() {
    let mut server = mockito::Server::new_async().await;
    let _head = server
        .mock("HEAD", "/scene.zip")
        .with_status(200)
        .with_header("accept-ranges", "none")
        .create_async()
        .await;

    let err = reader_for(&server, "/scene.zip").size().await.unwrap_err();
    assert!(matches!(err, Error::RangeRead(_)), "{:?}", err);
}

#[tokio::test]
async fn test_partial_content_is_returned() {
    let mut server = mockito::Server::new_async().await;
    let get = server
        .mock("GET", "/scene.zip")
        .match_header("range", "bytes=100-103")
        .with_status(206)
        .with_body(b"\x14\x00\x2a\x00")
        .create_async()
        .await;

    let reader = reader_for(&server, "/scene.zip");
    let bytes = reader.read_range(100, 103).await.unwrap();

    assert_eq!(&bytes[..], b"\x14\x00\x2a\x00");
    assert_eq!(reader.transferred_bytes(), 4);
    get.assert_async().await;
}

#[tokio::test]
async fn test_full_body_response_is_range_error() {
    let mut server = mockito::Server::new_async().await;
    let _get = server
        .mock("GET", "/scene.zip")
        .with_status(200)
        .with_body(vec![0u8; 64])
        .create_async()
        .await;

    let err = reader_for(&server, "/scene.zip")
        .read_range(0, 3)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RangeRead(_)), "{:?}", err);
}

#[tokio::test]
async fn test_short_body_is_range_error() {
    let mut server = mockito::Server::new_async().await;
    let _get = server
        .mock("GET", "/scene.zip")
        .match_header("range", "bytes=0-9")
        .with_status(206)
        .with_body(b"abc")
        .create_async()
        .await;

    let err = reader_for(&server, "/scene.zip")
        .read_range(0, 9)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RangeRead(ref msg) if msg.contains("short read")), "{:?}", err);
}
