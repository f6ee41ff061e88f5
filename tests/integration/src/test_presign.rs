//! Presigned URL and POST policy integration tests.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use http::Method;
    use rustack_s3_client::{DispatchRequest, PresignRequest};
    use rustack_s3_signer::PostPolicy;

    use crate::{cleanup_bucket, create_test_bucket, s3_client};

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_fetch_object_with_presigned_url() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "presign").await;

        client
            .execute(
                DispatchRequest::builder()
                    .method(Method::PUT)
                    .bucket(bucket.as_str())
                    .object("shared.txt")
                    .body("shared content")
                    .build(),
            )
            .await
            .expect("put object");

        let url = client
            .presigned_url(
                PresignRequest::builder()
                    .bucket(bucket.as_str())
                    .object("shared.txt")
                    .expiry(Duration::from_secs(300))
                    .build(),
            )
            .await
            .expect("presign");

        let response = reqwest::get(&url).await.expect("fetch presigned URL");
        assert!(response.status().is_success(), "status: {}", response.status());
        assert_eq!(response.text().await.expect("body"), "shared content");

        cleanup_bucket(&client, &bucket, &["shared.txt"]).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_upload_with_presigned_put_url() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "presignput").await;

        let url = client
            .presigned_url(
                PresignRequest::builder()
                    .method(Method::PUT)
                    .bucket(bucket.as_str())
                    .object("uploaded.txt")
                    .expiry(Duration::from_secs(300))
                    .build(),
            )
            .await
            .expect("presign");

        let response = reqwest::Client::new()
            .put(&url)
            .body("via presigned put")
            .send()
            .await
            .expect("put via presigned URL");
        assert!(response.status().is_success(), "status: {}", response.status());

        let get = client
            .execute(
                DispatchRequest::builder()
                    .method(Method::GET)
                    .bucket(bucket.as_str())
                    .object("uploaded.txt")
                    .build(),
            )
            .await
            .expect("get object");
        assert_eq!(get.text(), "via presigned put");

        cleanup_bucket(&client, &bucket, &["uploaded.txt"]).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_sign_post_policy_form() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "post").await;

        let policy = PostPolicy::new(bucket.as_str(), Utc::now() + chrono::Duration::minutes(10))
            .key_starts_with("uploads/");
        let form = client
            .presigned_post_policy(&policy)
            .await
            .expect("sign policy");

        assert!(form.url.ends_with(&format!("/{bucket}")));
        assert!(form.fields.contains_key("policy"));
        assert!(form.fields.contains_key("x-amz-signature"));

        cleanup_bucket(&client, &bucket, &[]).await;
    }
}
