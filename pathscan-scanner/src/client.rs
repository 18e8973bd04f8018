use crate::error::{Result, ScanError};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_USER_AGENT: &str = concat!("pathscan/", env!("CARGO_PKG_VERSION"));

/// Builds the shared HTTP client. `timeout` bounds every request made with it.
pub fn build_client(timeout: Duration, user_agent: &str) -> Result<Client> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout / 2)
        .pool_idle_timeout(Duration::from_secs(90))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(ScanError::from)
}

/// Fetches `url` and returns its body, requiring a 2xx status and an HTML
/// content type.
pub async fn fetch_html(client: &Client, url: &str, timeout: Duration) -> Result<String> {
    debug!("Fetching {}", url);

    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT, "text/html")
        .timeout(timeout)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScanError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !content_type.contains("text/html") {
        return Err(ScanError::NotHtml(content_type));
    }

    Ok(response.text().await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn client() -> Client {
        build_client(Duration::from_secs(5), DEFAULT_USER_AGENT).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_html_ok() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><body>hi</body></html>", "text/html; charset=utf-8"),
            )
            .mount(&server)
            .await;

        let body = fetch_html(&client(), &server.uri(), Duration::from_secs(5))
            .await
            .unwrap();
        assert!(body.contains("hi"));
    }

    #[tokio::test]
    async fn test_fetch_html_rejects_non_html() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("{}", "application/json"),
            )
            .mount(&server)
            .await;

        let url = format!("{}/data.json", server.uri());
        let err = fetch_html(&client(), &url, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::NotHtml(_)));
    }

    #[tokio::test]
    async fn test_fetch_html_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let url = format!("{}/missing", server.uri());
        let err = fetch_html(&client(), &url, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::HttpStatus { status: 404, .. }));
    }
}
