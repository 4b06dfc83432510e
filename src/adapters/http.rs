use async_trait::async_trait;
use reqwest::Client;

use crate::domain::ports::Source;
use crate::utils::error::Result;

/// HTTP GET source for the extract stage. Non-2xx responses fail the fetch;
/// there is no fallback data.
pub struct HttpSource {
    client: Client,
    endpoint: String,
}

impl HttpSource {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl Source for HttpSource {
    async fn fetch(&self) -> Result<Vec<u8>> {
        tracing::debug!("fetching source data from {}", self.endpoint);
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await?
            .error_for_status()?;

        let bytes = response.bytes().await?;
        tracing::debug!(bytes = bytes.len(), "source fetch complete");
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn fetch_returns_body_bytes() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/export");
            then.status(200).body("patient_id,email\np-1,ab@example.com\n");
        });

        let source = HttpSource::new(server.url("/export"));
        let bytes = source.fetch().await.unwrap();

        mock.assert();
        assert_eq!(bytes, b"patient_id,email\np-1,ab@example.com\n");
    }

    #[tokio::test]
    async fn non_2xx_status_is_an_error() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/export");
            then.status(503);
        });

        let source = HttpSource::new(server.url("/export"));
        assert!(source.fetch().await.is_err());
        mock.assert();
    }
}
