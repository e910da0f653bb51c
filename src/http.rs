use std::time::Duration;

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};

/// Returns an HTTP client whose requests time out after `timeout` and that retries
/// transient failures up to `max_retries` times with increasing intervals between attempts.
pub(crate) fn client(
    timeout: Duration,
    max_retries: u32,
) -> Result<ClientWithMiddleware, reqwest::Error> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// GETs `url` and returns its body, failing on non-success status codes
pub(crate) async fn get(
    client: &ClientWithMiddleware,
    url: reqwest::Url,
) -> Result<Vec<u8>, crate::Error> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}
