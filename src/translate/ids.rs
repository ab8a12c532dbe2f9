//! Response id generation.
//!
//! Ids come from a v4 UUID rendered without separators, so every id carries
//! 122 random bits and independent proxy instances never need to coordinate.

use uuid::Uuid;

pub const MESSAGE_ID_PREFIX: &str = "msg_";
/// Hex digits following the prefix.
pub const MESSAGE_ID_HEX_LEN: usize = 32;

#[must_use]
pub fn generate_message_id() -> String {
    format!("{MESSAGE_ID_PREFIX}{}", Uuid::new_v4().simple())
}

/// Whether `id` has the shape produced by [`generate_message_id`].
#[must_use]
pub fn is_message_id(id: &str) -> bool {
    id.strip_prefix(MESSAGE_ID_PREFIX).is_some_and(|hex| {
        hex.len() == MESSAGE_ID_HEX_LEN
            && hex
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    })
}
