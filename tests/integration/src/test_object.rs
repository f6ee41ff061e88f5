//! Object round-trip integration tests.

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use bytes::Bytes;
    use futures::stream;
    use http::{Method, StatusCode};
    use rustack_s3_client::{DispatchRequest, ProgressCallback, RequestBody};

    use crate::{cleanup_bucket, create_test_bucket, s3_client};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_put_and_get_object() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "putget").await;

        let put = client
            .execute(
                DispatchRequest::builder()
                    .method(Method::PUT)
                    .bucket(bucket.as_str())
                    .object("greeting.txt")
                    .body("hello, rustack!")
                    .build(),
            )
            .await
            .expect("put object");
        assert_eq!(put.status, StatusCode::OK);

        let get = client
            .execute(
                DispatchRequest::builder()
                    .method(Method::GET)
                    .bucket(bucket.as_str())
                    .object("greeting.txt")
                    .build(),
            )
            .await
            .expect("get object");
        assert_eq!(get.text(), "hello, rustack!");

        cleanup_bucket(&client, &bucket, &["greeting.txt"]).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_stream_object_body() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "stream").await;

        let payload = vec![b'x'; 200_000];
        client
            .execute(
                DispatchRequest::builder()
                    .method(Method::PUT)
                    .bucket(bucket.as_str())
                    .object("big.bin")
                    .body(payload.clone())
                    .build(),
            )
            .await
            .expect("put object");

        let response = client
            .execute_streaming(
                DispatchRequest::builder()
                    .method(Method::GET)
                    .bucket(bucket.as_str())
                    .object("big.bin")
                    .build(),
            )
            .await
            .expect("get object");
        let body = response.bytes().await.expect("read body");
        assert_eq!(body.len(), payload.len());

        cleanup_bucket(&client, &bucket, &["big.bin"]).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_report_upload_progress() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "progress").await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        client
            .execute(
                DispatchRequest::builder()
                    .method(Method::PUT)
                    .bucket(bucket.as_str())
                    .object("tracked.bin")
                    .body(vec![0_u8; 150_000])
                    .progress(ProgressCallback::new(move |sent| {
                        recorder.lock().expect("progress lock").push(sent);
                    }))
                    .build(),
            )
            .await
            .expect("put object");

        let seen = seen.lock().expect("progress lock").clone();
        assert!(seen.windows(2).all(|w| w[0] < w[1]), "not increasing: {seen:?}");
        assert_eq!(seen.last().copied(), Some(150_000));

        cleanup_bucket(&client, &bucket, &["tracked.bin"]).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_stream_body_over_plain_http() {
        let client = s3_client();
        let body = RequestBody::from_stream(stream::iter(vec![Ok::<_, io::Error>(
            Bytes::from_static(b"chunk"),
        )]));

        let err = client
            .execute(
                DispatchRequest::builder()
                    .method(Method::PUT)
                    .bucket("any-bucket")
                    .object("streamed.bin")
                    .body(body)
                    .build(),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("body"), "unexpected error: {err}");
    }
}
