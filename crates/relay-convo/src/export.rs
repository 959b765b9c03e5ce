// Copyright (c) 2025-2026 Relay Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Chat-history CSV export.
//!
//! BOM-prefixed UTF-8 with RFC 4180 quoting so spreadsheet imports keep
//! non-ASCII content intact.  Null/structured-null content serialises as an
//! empty field.

use std::sync::Arc;

use relay_store::{Repository, StoredContent, User};

use crate::ConvoError;

const HEADER: &str = "conversation_id,conversation_title,conversation_created_at,\
message_id,message_role,message_content,message_timestamp,message_model";

fn quote(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn content_field(content: &StoredContent) -> String {
    match content {
        StoredContent::Structured(v) if v.is_null() => String::new(),
        other => other.as_display_text(),
    }
}

/// Export every conversation owned by `user` as one CSV document.
pub async fn export_history_csv(
    repo: &Arc<dyn Repository>,
    user: &User,
) -> Result<String, ConvoError> {
    let mut out = String::from("\u{feff}");
    out.push_str(HEADER);
    out.push_str("\r\n");

    for conversation in repo.list_conversations(user.id).await? {
        for message in repo.list_messages(&conversation.id).await? {
            let role = serde_json::to_value(message.role)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            let row = [
                quote(&conversation.id),
                quote(&conversation.title),
                conversation.created_at.to_string(),
                quote(&message.id),
                quote(&role),
                quote(&content_field(&message.content)),
                message.timestamp.to_string(),
                quote(message.model.as_deref().unwrap_or("")),
            ];
            out.push_str(&row.join(","));
            out.push_str("\r\n");
        }
    }
    Ok(out)
}

// ─── Unit tests ──────────────────────────────────────────────────────────────
