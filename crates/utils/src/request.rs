//! Normalized compose requests.
//!
//! A [`ComposeRequest`] is the typed description of a message a user is
//! composing, produced from the raw form by the
//! [`ComposeTransformer`](crate::ComposeTransformer) and handed on to
//! recipient resolution and delivery.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{EntityId, TextFormat};

/// A composed message with every field normalized to a concrete value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeRequest {
    pub subject: String,

    /// Message body as entered in the editor.
    pub message: String,

    /// Editor format code, see [`TextFormat::code`].
    pub editor_format: i64,

    /// Recipient tokens (`user_*`, `role_*`, `group_*`) in submission order.
    pub included_entity_ids: Vec<String>,

    /// Recipient tokens removed from the included set.
    pub excluded_entity_ids: Vec<String>,

    /// Trimmed, de-duplicated addresses outside the course.
    pub additional_emails: Vec<String>,

    /// Signature to append, `0` for none.
    pub signature_id: i64,

    /// Delivery channel, e.g. `email` or `message`.
    pub message_type: String,

    /// Whether the sender asked for a delivery receipt.
    pub receipt: bool,

    /// Whether mentors of the recipients get a copy.
    pub mentor_copy: bool,

    /// Alternate sender address, `0` for the user's own address.
    pub alternate_email_id: i64,

    /// Scheduled send time as a unix timestamp, `0` to send immediately.
    pub to_send_at: i64,

    /// Draft area holding attachments, `0` for none.
    pub attachments_draftitem_id: i64,

    /// Draft area holding files embedded in the message, `0` for none.
    pub message_draftitem_id: i64,

    /// Send from the site's no-reply address.
    pub no_reply: bool,
}

impl Default for ComposeRequest {
    fn default() -> Self {
        Self {
            subject: String::new(),
            message: String::new(),
            editor_format: TextFormat::HTML_CODE,
            included_entity_ids: Vec::new(),
            excluded_entity_ids: Vec::new(),
            additional_emails: Vec::new(),
            signature_id: 0,
            message_type: String::new(),
            receipt: false,
            mentor_copy: false,
            alternate_email_id: 0,
            to_send_at: 0,
            attachments_draftitem_id: 0,
            message_draftitem_id: 0,
            no_reply: false,
        }
    }
}

impl ComposeRequest {
    /// Parsed included recipients, malformed tokens are skipped.
    pub fn included_entities(&self) -> Vec<EntityId> {
        parse_entities(&self.included_entity_ids)
    }

    /// Parsed excluded recipients, malformed tokens are skipped.
    pub fn excluded_entities(&self) -> Vec<EntityId> {
        parse_entities(&self.excluded_entity_ids)
    }

    /// Whether the message waits for [`to_send_at`](Self::to_send_at).
    pub fn is_scheduled(&self) -> bool {
        self.to_send_at > 0
    }

    /// The editor format as a known [`TextFormat`], if it is one.
    pub fn text_format(&self) -> Option<TextFormat> {
        TextFormat::from_code(self.editor_format)
    }
}

fn parse_entities(tokens: &[String]) -> Vec<EntityId> {
    tokens
        .iter()
        .filter_map(|token| match token.trim().parse::<EntityId>() {
            Ok(entity) => Some(entity),
            Err(e) => {
                debug!(token = %token, error = %e, "Skipping malformed entity token");
                None
            }
        })
        .collect()
}
