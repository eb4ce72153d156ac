//! Coordinated-mention decomposition.
//!
//! A mention like "breast/ovarian cancer" names two linkable concepts at
//! once. The whole stays in the list flagged `Composite` (the run loop
//! skips it) and its completed parts follow as `Individual` mentions.

use relink_common::{Mention, MentionKind};

const SEPARATORS: [&str; 3] = [" and ", " or ", "/"];

/// Split a coordinated mention into completed parts.
///
/// The first separator present wins; comma coordination ("a, b and c") is
/// left alone. Each part is completed with the final word of the last part
/// ("breast" becomes "breast cancer"), parts equal to that bare word are
/// dropped, and None means nothing was actually decomposed.
pub fn decompose(text: &str) -> Option<Vec<String>> {
    if text.contains(", ") {
        return None;
    }
    let separator = SEPARATORS.into_iter().find(|s| text.contains(s))?;
    let parts: Vec<&str> = text.split(separator).collect();
    let last_word = parts.last()?.split_whitespace().next_back()?;

    let mut sub_entities = Vec::new();
    for part in parts {
        if !part.contains(last_word) {
            sub_entities.push(format!("{part} {last_word}"));
        } else if part != last_word {
            sub_entities.push(part.to_string());
        }
    }
    if sub_entities.is_empty() || sub_entities[0] == text {
        return None;
    }
    Some(sub_entities)
}

/// Rewrite a document's mention list in place, expanding every decomposable
/// plain mention. Parts inherit the gold id of the whole; mentions already
/// flagged by the upstream recognizer pass through untouched.
pub fn expand_mentions(mentions: &mut Vec<Mention>) {
    let mut expanded = Vec::with_capacity(mentions.len());
    for mut mention in mentions.drain(..) {
        let parts = match mention.kind {
            MentionKind::Plain => decompose(&mention.text),
            _ => None,
        };
        match parts {
            Some(parts) => {
                mention.kind = MentionKind::Composite;
                let true_id = mention.true_id.clone();
                expanded.push(mention);
                for text in parts {
                    expanded.push(Mention {
                        text,
                        true_id: true_id.clone(),
                        kind: MentionKind::Individual,
                    });
                }
            }
            None => expanded.push(mention),
        }
    }
    *mentions = expanded;
}
