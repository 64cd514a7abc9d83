//! Request rate limiting at the HTTP boundary.

use actix_web::HttpRequest;

use crate::domain::rate_limit::{RateBucket, RateLimiter};
use crate::domain::Error;

/// Fallback identifier when no client address header is present.
///
/// All such clients share one counter; acceptable coarseness for this
/// deployment shape (always behind a proxy in production).
const ANONYMOUS_CLIENT: &str = "anonymous";

fn header_value<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
    request
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
}

/// Derive the rate-limit key for a request.
///
/// Prefers the first `x-forwarded-for` entry, then `x-real-ip`.
pub(crate) fn client_identifier(request: &HttpRequest) -> String {
    if let Some(forwarded) = header_value(request, "x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_owned();
            }
        }
    }
    if let Some(real_ip) = header_value(request, "x-real-ip") {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return real_ip.to_owned();
        }
    }
    ANONYMOUS_CLIENT.to_owned()
}

/// Count this request against the bucket, rejecting when over quota.
pub(crate) fn enforce(
    limiter: &RateLimiter,
    bucket: RateBucket,
    request: &HttpRequest,
) -> Result<(), Error> {
    limiter.check(bucket, &client_identifier(request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use rstest::rstest;

    #[rstest]
    fn forwarded_for_takes_the_first_entry() {
        let request = TestRequest::default()
            .insert_header(("x-forwarded-for", "203.0.113.9, 10.0.0.1"))
            .insert_header(("x-real-ip", "10.0.0.2"))
            .to_http_request();
        assert_eq!(client_identifier(&request), "203.0.113.9");
    }

    #[rstest]
    fn real_ip_is_the_fallback() {
        let request = TestRequest::default()
            .insert_header(("x-real-ip", "10.0.0.2"))
            .to_http_request();
        assert_eq!(client_identifier(&request), "10.0.0.2");
    }

    #[rstest]
    fn headerless_requests_share_the_anonymous_counter() {
        let request = TestRequest::default().to_http_request();
        assert_eq!(client_identifier(&request), ANONYMOUS_CLIENT);
    }
}
