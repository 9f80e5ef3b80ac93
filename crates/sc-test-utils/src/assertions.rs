//! Response assertions.

use reqwest::{Response, StatusCode};

/// Assert an error response's status and `error.code`, returning the body.
///
/// # Panics
///
/// Panics if the status or code differ, or the body is not the error shape.
pub async fn assert_error(
    response: Response,
    status: StatusCode,
    code: &str,
) -> serde_json::Value {
    let actual = response.status();
    let body: serde_json::Value = response
        .json()
        .await
        .expect("error response should be JSON");
    assert_eq!(actual, status, "unexpected status, body: {body}");
    assert_eq!(
        body["error"]["code"], code,
        "unexpected error code, body: {body}"
    );
    body
}

/// Assert a success status and decode the JSON body.
///
/// # Panics
///
/// Panics if the status differs or the body is not JSON.
pub async fn assert_json(response: Response, status: StatusCode) -> serde_json::Value {
    let actual = response.status();
    let text = response.text().await.expect("response body should be readable");
    assert_eq!(actual, status, "unexpected status, body: {text}");
    serde_json::from_str(&text).expect("response should be JSON")
}
