//! Summary delivery through a transactional email provider.

use crate::error::UpstreamError;
use std::future::Future;
use std::pin::Pin;

pub mod resend;

pub use resend::ResendMailer;

pub const SUBJECT: &str = "Meeting Summary";

/// Message id reported when the provider accepts a message without returning one.
pub const FALLBACK_MESSAGE_ID: &str = "sent";

pub trait Mailer: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_available(&self) -> bool;

    /// Sends `summary` to `to`, returning the provider message id if one was given.
    fn send<'a>(
        &'a self,
        to: &'a str,
        summary: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, UpstreamError>> + Send + 'a>>;
}

/// Wraps the summary in the email's single container element.
///
/// Unless `escape` is set the summary is inserted as raw HTML.
pub fn render_html(summary: &str, escape: bool) -> String {
    if escape {
        format!("<div>{}</div>", escape_html(summary))
    } else {
        format!("<div>{}</div>", summary)
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
