//! Provider request/response logging
//!
//! Installed on S3 clients when the session asks for debug requests. Logs at
//! DEBUG under this module's target, so `RUST_LOG=llama_s3::wire=debug`
//! shows the traffic.

use aws_sdk_s3::config::interceptors::{
    BeforeDeserializationInterceptorContextRef, BeforeTransmitInterceptorContextRef,
};
use aws_sdk_s3::config::{ConfigBag, Intercept, RuntimeComponents};
use aws_sdk_s3::error::BoxError;

/// Headers whose values never reach the log
const REDACTED_HEADERS: &[&str] = &["authorization", "x-amz-security-token"];

#[derive(Debug, Default)]
pub(crate) struct WireLogger;

impl Intercept for WireLogger {
    fn name(&self) -> &'static str {
        "WireLogger"
    }

    fn read_before_transmit(
        &self,
        context: &BeforeTransmitInterceptorContextRef<'_>,
        _runtime_components: &RuntimeComponents,
        _cfg: &mut ConfigBag,
    ) -> Result<(), BoxError> {
        let request = context.request();
        let headers = redact(request.headers().iter());
        tracing::debug!(
            method = request.method(),
            uri = request.uri(),
            headers = ?headers,
            body_bytes = request.body().bytes().map(<[u8]>::len),
            "S3 request"
        );
        Ok(())
    }

    fn read_before_deserialization(
        &self,
        context: &BeforeDeserializationInterceptorContextRef<'_>,
        _runtime_components: &RuntimeComponents,
        _cfg: &mut ConfigBag,
    ) -> Result<(), BoxError> {
        let response = context.response();
        let headers = redact(response.headers().iter());
        // Streaming bodies (object downloads) are not buffered and log as None.
        let body = response.body().bytes().map(String::from_utf8_lossy);
        tracing::debug!(
            status = response.status().as_u16(),
            headers = ?headers,
            body = body.as_deref(),
            "S3 response"
        );
        Ok(())
    }
}

fn redact<'a>(headers: impl Iterator<Item = (&'a str, &'a str)>) -> Vec<(&'a str, &'a str)> {
    headers
        .map(|(name, value)| {
            if REDACTED_HEADERS
                .iter()
                .any(|redacted| name.eq_ignore_ascii_case(redacted))
            {
                (name, "<redacted>")
            } else {
                (name, value)
            }
        })
        .collect()
}
