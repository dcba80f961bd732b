//! Error taxonomy for token acquisition and completion dispatch.
//!
//! Every variant is local to a single panel request; none leaves the panel
//! unusable. The `Display` text is what the panel shows to the user.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// An interactive sign-in was requested but the host returned no session.
    #[error("GitHub sign-in was canceled.")]
    AuthenticationCanceled,

    /// The token endpoint answered with a non-2xx status.
    #[error("Copilot token request failed ({status}): {body}")]
    TokenRequestFailed { status: u16, body: String },

    /// The token endpoint answered 2xx but without a usable token.
    #[error("Copilot token response missing token.")]
    MalformedTokenResponse,

    /// Network-level failure talking to either endpoint.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The completion endpoint answered with a non-2xx status.
    #[error("Copilot request failed ({status}): {body}")]
    Upstream { status: u16, body: String },

    /// The completion endpoint answered 2xx with a body that is not JSON.
    #[error("Invalid response from Copilot: {0}")]
    InvalidResponse(String),

    /// The host session provider itself failed.
    #[error("GitHub session lookup failed: {0}")]
    Session(String),

    /// The request was aborted because its panel was disposed.
    #[error("Request cancelled.")]
    Cancelled,
}

pub type Result<T, E = ChatError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_failure_message_embeds_status_and_body() {
        let err = ChatError::TokenRequestFailed {
            status: 401,
            body: "bad credentials".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Copilot token request failed (401): bad credentials"
        );
    }

    #[test]
    fn canceled_and_malformed_are_distinct() {
        assert_eq!(
            ChatError::AuthenticationCanceled.to_string(),
            "GitHub sign-in was canceled."
        );
        assert_eq!(
            ChatError::MalformedTokenResponse.to_string(),
            "Copilot token response missing token."
        );
    }
}
