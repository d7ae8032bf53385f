use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use crate::{
    is_empty, loose_eq_int, to_bool, to_int, to_string, ComposeRequest, ConfigSource, FormData,
    FormTransformer, TextFormat, ALLOW_MENTOR_COPY_KEY, DEFAULT_MESSAGE_TYPE_KEY,
    MENTOR_COPY_ALWAYS,
};

/// Message type used when neither the form nor the configuration has one.
pub const FALLBACK_MESSAGE_TYPE: &str = "email";

/// `from_email_id` value selecting the site's no-reply address.
pub const NO_REPLY_FROM_EMAIL_ID: i64 = -1;

/// Transformer producing a [`ComposeRequest`] from the compose form.
///
/// Each field has its own rule. Some fields default on "falsy" input and
/// others on "empty" input, so `"0"`, `0` and a missing key do not always
/// normalize the same way; see the individual field functions.
pub struct ComposeTransformer {
    config: Arc<dyn ConfigSource>,
}

impl ComposeTransformer {
    /// Creates a new [`ComposeTransformer`] reading settings from `config`.
    pub fn new(config: Arc<dyn ConfigSource>) -> Self {
        info!("Compose transformer initialized");
        Self { config }
    }

    /// Form value if it is non-empty and has a scalar string form, otherwise
    /// the configured default type.
    pub fn message_type(&self, form: &FormData) -> String {
        let value = form.get("message_type");
        if !is_empty(value) {
            let message_type = to_string(value);
            if !message_type.is_empty() {
                return message_type;
            }
        }
        self.config
            .get(DEFAULT_MESSAGE_TYPE_KEY)
            .map(|setting| setting.as_text())
            .unwrap_or_else(|| FALLBACK_MESSAGE_TYPE.to_string())
    }

    /// Forced on when the block policy always copies mentors, otherwise the
    /// form's choice.
    pub fn mentor_copy(&self, form: &FormData) -> bool {
        let forced = self
            .config
            .block(ALLOW_MENTOR_COPY_KEY)
            .map(|setting| setting.loose_eq_int(MENTOR_COPY_ALWAYS))
            .unwrap_or(false);
        forced || to_bool(form.get("mentor_copy"))
    }
}

impl FormTransformer for ComposeTransformer {
    type Output = ComposeRequest;

    fn transform(&self, form: &FormData) -> ComposeRequest {
        let request = ComposeRequest {
            subject: to_string(form.get("subject")),
            message: to_string(form.get_nested("message_editor", "text")),
            editor_format: editor_format(form),
            included_entity_ids: included_entity_ids(form),
            excluded_entity_ids: excluded_entity_ids(form),
            additional_emails: additional_emails(form),
            signature_id: signature_id(form),
            message_type: self.message_type(form),
            receipt: to_bool(form.get("receipt")),
            mentor_copy: self.mentor_copy(form),
            alternate_email_id: alternate_email_id(form),
            to_send_at: to_send_at(form),
            attachments_draftitem_id: attachments_draftitem_id(form),
            message_draftitem_id: message_draftitem_id(form),
            no_reply: no_reply(form),
        };
        debug!(
            transformer = self.name(),
            included = request.included_entity_ids.len(),
            excluded = request.excluded_entity_ids.len(),
            additional = request.additional_emails.len(),
            message_type = %request.message_type,
            scheduled = request.is_scheduled(),
            no_reply = request.no_reply,
            "Transformed compose form"
        );
        request
    }

    fn name(&self) -> &str {
        "compose"
    }
}

/// `message_editor[format]` if non-empty, otherwise HTML.
pub fn editor_format(form: &FormData) -> i64 {
    let value = form.get_nested("message_editor", "format");
    if is_empty(value) {
        TextFormat::HTML_CODE
    } else {
        to_int(value)
    }
}

/// Empty gives no recipients, a comma joined string is split, a list is
/// taken as is.
pub fn included_entity_ids(form: &FormData) -> Vec<String> {
    let value = form.get("included_entity_ids");
    if is_empty(value) {
        return Vec::new();
    }
    match value {
        Value::String(joined) => joined.split(',').map(str::to_string).collect(),
        other => list_items(other),
    }
}

/// Empty gives no recipients, anything else is taken as is. Unlike the
/// included ids a string is not split.
pub fn excluded_entity_ids(form: &FormData) -> Vec<String> {
    let value = form.get("excluded_entity_ids");
    if is_empty(value) {
        return Vec::new();
    }
    list_items(value)
}

/// Comma separated addresses, trimmed, without blanks and duplicates. The
/// first occurrence of an address keeps its position.
pub fn additional_emails(form: &FormData) -> Vec<String> {
    let value = form.get("additional_emails");
    if is_empty(value) {
        return Vec::new();
    }
    let candidates = match value {
        Value::String(joined) => joined.split(',').map(str::to_string).collect(),
        other => list_items(other),
    };

    let mut emails: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let email = candidate.trim();
        if email.is_empty() || emails.iter().any(|e| e == email) {
            continue;
        }
        emails.push(email.to_string());
    }
    emails
}

/// `0` when falsy, otherwise the integer cast.
pub fn signature_id(form: &FormData) -> i64 {
    falsy_or_int(form.get("signature_id"))
}

/// `from_email_id` when it casts to a positive integer, otherwise `0`.
pub fn alternate_email_id(form: &FormData) -> i64 {
    let id = to_int(form.get("from_email_id"));
    if id > 0 {
        id
    } else {
        0
    }
}

/// `0` (send now) when falsy, otherwise the integer timestamp.
pub fn to_send_at(form: &FormData) -> i64 {
    falsy_or_int(form.get("to_send_at"))
}

/// Draft item id of the attachments area, `0` when falsy.
pub fn attachments_draftitem_id(form: &FormData) -> i64 {
    falsy_or_int(form.get("attachments"))
}

/// Draft item id of the editor area, `0` when falsy.
pub fn message_draftitem_id(form: &FormData) -> i64 {
    falsy_or_int(form.get_nested("message_editor", "itemid"))
}

/// Whether `from_email_id` selects the no-reply address.
pub fn no_reply(form: &FormData) -> bool {
    loose_eq_int(form.get("from_email_id"), NO_REPLY_FROM_EMAIL_ID)
}

fn falsy_or_int(value: &Value) -> i64 {
    if to_bool(value) {
        to_int(value)
    } else {
        0
    }
}

/// List elements (or map values) as strings, a lone scalar as one element.
fn list_items(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(to_string).collect(),
        Value::Object(map) => map.values().map(to_string).collect(),
        scalar => vec![to_string(scalar)],
    }
}
