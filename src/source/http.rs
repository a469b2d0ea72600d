//! Remote HTTP source client.

use super::{FetchError, SourceClient};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};
use std::time::Duration;

/// Serves originals fetched with GET from a base URL.
///
/// The same `timeout` bounds both connecting and the whole request. Any
/// response outside 200–399 is a [`FetchError::Status`].
///
/// Request paths arrive percent-decoded, so each segment is escaped again
/// when appended to the base URL.
#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: Url,
    client: Client,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| FetchError::Config(format!("invalid base URL {base_url}: {e}")))?;
        if parsed.host_str().is_none() {
            return Err(FetchError::Config(format!(
                "base URL {base_url} has no host"
            )));
        }

        let client = Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|source| FetchError::Http {
                url: base_url.to_string(),
                source,
            })?;

        Ok(Self {
            base_url: parsed,
            client,
        })
    }

    fn url(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        // Only fails for cannot-be-a-base URLs, which `new` rejects
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(path.trim_start_matches('/').split('/'));
        }
        url
    }
}

#[async_trait]
impl SourceClient for HttpSource {
    async fn get_content(&self, path: &str) -> Result<Bytes, FetchError> {
        let url = self.url(path);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Http {
                url: url.to_string(),
                source,
            })?;
        let url = url.to_string();

        let status = response.status().as_u16();
        if !(200..400).contains(&status) {
            return Err(FetchError::Status { url, status });
        }

        response
            .bytes()
            .await
            .map_err(|source| FetchError::Http { url, source })
    }

    fn normalized_path(&self, path: &str) -> String {
        self.url(path).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn rejects_unparseable_base_url() {
        assert!(matches!(
            HttpSource::new("not a url", TIMEOUT),
            Err(FetchError::Config(_))
        ));
    }

    #[test]
    fn rejects_base_url_without_host() {
        assert!(matches!(
            HttpSource::new("file:///srv/images", TIMEOUT),
            Err(FetchError::Config(_))
        ));
    }

    #[test]
    fn joins_with_single_slash() {
        let with_slash = HttpSource::new("http://cdn.example.com/img/", TIMEOUT).unwrap();
        let without = HttpSource::new("http://cdn.example.com/img", TIMEOUT).unwrap();
        assert_eq!(
            with_slash.normalized_path("/cats/a.jpg"),
            "http://cdn.example.com/img/cats/a.jpg"
        );
        assert_eq!(
            without.normalized_path("cats/a.jpg"),
            "http://cdn.example.com/img/cats/a.jpg"
        );
    }

    #[test]
    fn reserved_characters_are_escaped() {
        let source = HttpSource::new("http://cdn.example.com/img", TIMEOUT).unwrap();
        assert_eq!(
            source.normalized_path("cats/a?b#c.jpg"),
            "http://cdn.example.com/img/cats/a%3Fb%23c.jpg"
        );
        assert_eq!(
            source.normalized_path("cats/100%.jpg"),
            "http://cdn.example.com/img/cats/100%25.jpg"
        );
    }

    #[tokio::test]
    async fn fetches_path_with_question_mark() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cats/a%3Fb.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8]))
            .expect(1)
            .mount(&server)
            .await;

        let source = HttpSource::new(&server.uri(), TIMEOUT).unwrap();
        let bytes = source.get_content("cats/a?b.jpg").await.unwrap();
        assert_eq!(bytes.as_ref(), &[7]);
    }

    #[tokio::test]
    async fn fetches_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cats/a.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .expect(1)
            .mount(&server)
            .await;

        let source = HttpSource::new(&server.uri(), TIMEOUT).unwrap();
        let bytes = source.get_content("cats/a.jpg").await.unwrap();
        assert_eq!(bytes.as_ref(), &[1, 2, 3]);
    }

    #[tokio::test]
    async fn not_found_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = HttpSource::new(&server.uri(), TIMEOUT).unwrap();
        let result = source.get_content("missing.jpg").await;
        assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn server_error_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let source = HttpSource::new(&server.uri(), TIMEOUT).unwrap();
        let result = source.get_content("a.jpg").await;
        assert!(matches!(result, Err(FetchError::Status { status: 503, .. })));
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![1u8])
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let source = HttpSource::new(&server.uri(), Duration::from_millis(50)).unwrap();
        let result = source.get_content("a.jpg").await;
        assert!(matches!(result, Err(FetchError::Http { .. })));
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        // Port 9 (discard) on localhost is closed in test environments
        let source = HttpSource::new("http://127.0.0.1:9", TIMEOUT).unwrap();
        let result = source.get_content("a.jpg").await;
        assert!(matches!(result, Err(FetchError::Http { .. })));
    }
}
