//! Signature appending for outgoing message bodies.
//!
//! The signature is looked up for the sending user, rendered in the
//! message's own format as untrusted content and joined to the body with
//! two line breaks. Any missing piece leaves the body untouched.

use tracing::{debug, info};

use crate::{FormatOptions, RenderContext, SignatureStore, TextFormat, TextFormatter};

/// Separator placed between the body and the formatted signature.
pub const SIGNATURE_SEPARATOR: &str = "<br><br>";

/// Appends a user's signature to a message body.
#[derive(Debug, Clone)]
pub struct SignatureAppender {
    body: String,
    user_id: i64,
    signature_id: i64,
    format: TextFormat,
    context: RenderContext,
}

impl SignatureAppender {
    /// Creates an appender for `body` sent by `user_id`, formatting as HTML
    /// in the system context. A `signature_id` of `0` means no signature.
    pub fn new(body: impl Into<String>, user_id: i64, signature_id: i64) -> Self {
        Self {
            body: body.into(),
            user_id,
            signature_id,
            format: TextFormat::default(),
            context: RenderContext::default(),
        }
    }

    /// Sets the message format the signature is rendered in.
    pub fn with_format(mut self, format: TextFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets the rendering context, `None` selects the system context.
    pub fn with_context(mut self, context: Option<RenderContext>) -> Self {
        self.context = context.unwrap_or_default();
        self
    }

    /// Returns `body` with the signature appended, or unchanged when the
    /// signature id is `0` or does not resolve for `user_id`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use quickmail_utils::{BasicFormatter, MemorySignatureStore, Signature, SignatureAppender};
    ///
    /// let store = MemorySignatureStore::from_signatures([Signature::new(1, 7, "Ann")]);
    /// let formatter = BasicFormatter::new();
    ///
    /// let body = SignatureAppender::append_user_signature_to_body("Hi", 7, 1, &store, &formatter);
    /// assert_eq!(body, "Hi<br><br>Ann");
    ///
    /// let body = SignatureAppender::append_user_signature_to_body("Hi", 8, 1, &store, &formatter);
    /// assert_eq!(body, "Hi");
    /// ```
    pub fn append_user_signature_to_body(
        body: impl Into<String>,
        user_id: i64,
        signature_id: i64,
        store: &dyn SignatureStore,
        formatter: &dyn TextFormatter,
    ) -> String {
        Self::new(body, user_id, signature_id).signature_appended_body(store, formatter)
    }

    /// Consumes the appender, returning the body with the signature appended.
    pub fn signature_appended_body(
        self,
        store: &dyn SignatureStore,
        formatter: &dyn TextFormatter,
    ) -> String {
        if self.signature_id == 0 {
            return self.body;
        }

        let Some(signature) = store.find_user_signature(self.signature_id, self.user_id) else {
            debug!(
                signature_id = self.signature_id,
                user_id = self.user_id,
                "Signature not found for user, leaving body unchanged"
            );
            return self.body;
        };

        let options = FormatOptions::untrusted(self.context);
        let formatted = formatter.format_text(&signature.signature, self.format, &options);

        info!(
            signature_id = signature.id,
            user_id = self.user_id,
            format = ?self.format,
            "Appending signature to message body"
        );

        let mut body = self.body;
        body.reserve(SIGNATURE_SEPARATOR.len() + formatted.len());
        body.push_str(SIGNATURE_SEPARATOR);
        body.push_str(&formatted);
        body
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use crate::{BasicFormatter, MemorySignatureStore, Signature};

    use super::*;

    /// Formatter that records its calls and returns the raw text unchanged.
    #[derive(Default)]
    struct RecordingFormatter {
        calls: Mutex<Vec<(String, TextFormat, FormatOptions)>>,
    }

    impl TextFormatter for RecordingFormatter {
        fn format_text(&self, raw: &str, format: TextFormat, options: &FormatOptions) -> String {
            self.calls
                .lock()
                .unwrap()
                .push((raw.to_string(), format, *options));
            raw.to_string()
        }
    }

    fn store() -> MemorySignatureStore {
        MemorySignatureStore::from_signatures([
            Signature::new(1, 10, "B"),
            Signature::new(2, 20, "Someone else"),
        ])
    }

    #[test]
    fn test_zero_signature_id_is_noop() {
        let formatter = RecordingFormatter::default();
        let body = SignatureAppender::append_user_signature_to_body(
            "Body text",
            10,
            0,
            &store(),
            &formatter,
        );
        assert_eq!(body, "Body text");
        assert!(formatter.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_signature_is_noop() {
        let formatter = RecordingFormatter::default();
        let body =
            SignatureAppender::append_user_signature_to_body("Body", 10, 99, &store(), &formatter);
        assert_eq!(body, "Body");
    }

    #[test]
    fn test_foreign_signature_is_noop() {
        let formatter = RecordingFormatter::default();
        let body =
            SignatureAppender::append_user_signature_to_body("Body", 10, 2, &store(), &formatter);
        assert_eq!(body, "Body");
        assert!(formatter.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_append_signature() {
        let formatter = RecordingFormatter::default();
        let body = SignatureAppender::append_user_signature_to_body("A", 10, 1, &store(), &formatter);
        assert_eq!(body, "A<br><br>B");
    }

    #[test]
    fn test_format_options_are_untrusted_system() {
        let formatter = RecordingFormatter::default();
        SignatureAppender::append_user_signature_to_body("A", 10, 1, &store(), &formatter);

        let calls = formatter.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (raw, format, options) = &calls[0];
        assert_eq!(raw, "B");
        assert_eq!(*format, TextFormat::Html);
        assert_eq!(options.context, RenderContext::System);
        assert!(!options.trusted);
        assert!(!options.noclean);
    }

    #[test]
    fn test_custom_format_and_context() {
        let formatter = RecordingFormatter::default();
        let body = SignatureAppender::new("A", 10, 1)
            .with_format(TextFormat::Plain)
            .with_context(Some(RenderContext::Course(5)))
            .signature_appended_body(&store(), &formatter);
        assert_eq!(body, "A<br><br>B");

        let calls = formatter.calls.lock().unwrap();
        assert_eq!(calls[0].1, TextFormat::Plain);
        assert_eq!(calls[0].2.context, RenderContext::Course(5));
    }

    #[test]
    fn test_none_context_defaults_to_system() {
        let formatter = RecordingFormatter::default();
        SignatureAppender::new("A", 10, 1)
            .with_context(None)
            .signature_appended_body(&store(), &formatter);
        assert_eq!(
            formatter.calls.lock().unwrap()[0].2.context,
            RenderContext::System
        );
    }

    #[test]
    fn test_signature_is_cleaned() {
        let store = MemorySignatureStore::from_signatures([Signature::new(
            1,
            10,
            "<b>Ann</b><script>alert(1)</script>",
        )]);
        let body = SignatureAppender::append_user_signature_to_body(
            "<p>Hi</p>",
            10,
            1,
            &store,
            &BasicFormatter::new(),
        );
        assert_eq!(body, "<p>Hi</p><br><br><b>Ann</b>");
    }
}
