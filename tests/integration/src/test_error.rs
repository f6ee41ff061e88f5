//! Error mapping integration tests.

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};
    use rustack_s3_client::{DispatchRequest, S3ClientError};

    use crate::{cleanup_bucket, create_test_bucket, s3_client};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_map_missing_key_to_http_error() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "missing").await;

        let err = client
            .execute(
                DispatchRequest::builder()
                    .method(Method::GET)
                    .bucket(bucket.as_str())
                    .object("does-not-exist.txt")
                    .build(),
            )
            .await
            .unwrap_err();

        match err {
            S3ClientError::Http { status, body, .. } => {
                assert_eq!(status, StatusCode::NOT_FOUND);
                assert!(body.unwrap_or_default().contains("NoSuchKey"));
            }
            other => panic!("expected HTTP error, got {other:?}"),
        }

        cleanup_bucket(&client, &bucket, &[]).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_return_no_body_for_streaming_error() {
        let client = s3_client();

        let err = client
            .execute_streaming(
                DispatchRequest::builder()
                    .method(Method::GET)
                    .bucket(crate::test_bucket_name("absent"))
                    .object("key.txt")
                    .build(),
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            S3ClientError::Http {
                status: StatusCode::NOT_FOUND,
                body: None,
                ..
            }
        ));
    }
}
