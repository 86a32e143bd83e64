//! Attaches the caller's authorization context to each request.
//!
//! The context comes from a header set by trusted infrastructure in front of
//! this service (an authenticating proxy or gateway), never by the caller
//! directly. Handlers read it through the [`AuthorizationContext`] extension.

use axum::{
    body::Body,
    extract::State,
    http::{header::HeaderName, HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::error::DomainsError;

/// Resource identifiers granted to the caller, or `None` when the request
/// carries no authorization context.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthorizationContext(pub Option<Vec<String>>);

impl AuthorizationContext {
    pub fn granted(&self) -> Option<&[String]> {
        self.0.as_deref()
    }
}

/// Header the authorization context is read from; `None` disables it.
#[derive(Clone, Debug, Default)]
pub struct AuthorizationHeader(pub Option<HeaderName>);

impl AuthorizationHeader {
    pub fn parse(name: Option<&str>) -> anyhow::Result<Self> {
        let header = name
            .map(|n| HeaderName::from_bytes(n.trim().as_bytes()))
            .transpose()
            .map_err(|e| anyhow::anyhow!("Invalid authorization header name: {}", e))?;
        Ok(Self(header))
    }
}

pub async fn authorization_context_middleware(
    State(header): State<AuthorizationHeader>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, DomainsError> {
    let context = match &header.0 {
        Some(name) => read_authorization_context(request.headers(), name)?,
        None => AuthorizationContext(None),
    };

    request.extensions_mut().insert(context);
    Ok(next.run(request).await)
}

/// Reads every value of `name` as a comma-separated list of resource ids.
///
/// A value that is not UTF-8 means the infrastructure is misconfigured and is
/// reported as an internal error rather than treated as "no grants".
fn read_authorization_context(
    headers: &HeaderMap,
    name: &HeaderName,
) -> Result<AuthorizationContext, DomainsError> {
    let mut values = headers.get_all(name).iter().peekable();
    if values.peek().is_none() {
        return Ok(AuthorizationContext(None));
    }

    let mut granted = Vec::new();
    for value in values {
        let value = std::str::from_utf8(value.as_bytes()).map_err(|e| {
            anyhow::anyhow!(
                "Invalid value for header '{}' used to specify authorized resources: {}",
                name,
                e
            )
        })?;
        granted.extend(
            value
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
        );
    }

    Ok(AuthorizationContext(Some(granted)))
}
