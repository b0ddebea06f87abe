//! User-facing reply texts
//!
//! Template lookup/localization belongs to the host; these are the
//! default English renderings.

/// Generic denial reply.
pub const NO_ACCESS: &str = "Sorry, you are not authorized to use this command.";

/// Public reply when a login link was sent privately.
pub const LOGIN_REQUIRED: &str =
    "Sorry, you are not authorized to use this command. Login is required; I sent you a link in a private message.";

/// Private reply carrying the login link.
pub fn login_prompt(login_url: &str) -> String {
    format!("Please log in to continue: {}", login_url)
}

/// Shown in the browser after a successful SSO callback.
pub const LOGIN_SUCCEEDED: &str = "Login successful. You can return to the chat and retry your command.";

/// Shown in the browser when the callback token is unknown.
pub const LOGIN_SESSION_UNKNOWN: &str = "This login link is invalid or has already been used.";
