use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;

/// Build the client shared by every remote backend. The timeout bounds the
/// whole request, connect through body.
pub(crate) fn client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("tribe/", env!("CARGO_PKG_VERSION")))
        .build()
        .or_raise(|| ErrorKind::Config("HTTP client"))
}

/// Send a request and return the body of a successful response.
pub(crate) async fn send(request: RequestBuilder) -> Result<String> {
    let response = request.send().await.or_raise(|| ErrorKind::Connection("request failed".into()))?;
    let status = response.status();
    if !status.is_success() {
        exn::bail!(ErrorKind::Connection(format!("remote answered {status}")));
    }
    response.text().await.or_raise(|| ErrorKind::Connection("unreadable response body".into()))
}
