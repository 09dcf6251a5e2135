use thiserror::Error;

/// Failure modes of one token acquisition attempt. All of them surface to the
/// caller as an authorization failure; none abort the process. The next
/// `acquire()` call is the retry.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Key material is malformed or the signing operation itself failed.
    #[error("failed to sign client assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// The capability statement was unreachable or did not carry the
    /// expected OAuth extension. Upstream misconfiguration, not a
    /// credentials problem.
    #[error("upstream metadata unavailable: {0}")]
    MetadataUnavailable(String),

    /// The token endpoint answered, but with an error body or something
    /// that is not a token response.
    #[error("token exchange rejected: {0}")]
    Exchange(String),

    /// Network-level failure talking to the upstream server.
    #[error("transport failure during token exchange: {0}")]
    Transport(#[from] reqwest::Error),

    /// `static_auth` was configured without a "{type} {token}" shape.
    #[error("static_auth must look like \"Bearer <token>\" (type and value separated by a space)")]
    MalformedStaticAuth,
}

impl TokenError {
    /// Stable label for the failure counter.
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::Signing(_) => "signing",
            TokenError::MetadataUnavailable(_) => "metadata",
            TokenError::Exchange(_) => "exchange",
            TokenError::Transport(_) => "transport",
            TokenError::MalformedStaticAuth => "static_auth",
        }
    }
}
