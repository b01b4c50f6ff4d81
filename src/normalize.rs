//! Legacy shape normalization.
//!
//! Older clients send the deprecated `nick` field where `handle` is meant,
//! in any of the containers a request can carry account data in. This pass
//! rewrites each container to the canonical `handle` field before any
//! policy logic runs; stored documents that predate the rename go through
//! [`fix_entity`] on load.

use serde_json::Value;

use crate::options::Options;

/// Containers rewritten besides the top level of the request.
const NESTED_CONTAINERS: [&str; 3] = ["user", "user_data", "q"];

/// Canonicalize `nick` into `handle` across every container, in place.
/// Idempotent; containers without either field are left untouched.
pub fn fix_nick_handle(msg: &mut Value, options: &Options) {
    fix_entity(msg, options);
    for key in NESTED_CONTAINERS {
        if let Some(container) = msg.get_mut(key) {
            fix_entity(container, options);
        }
    }
}

/// Canonicalize a single container or loaded document, in place.
///
/// `handle` wins when both are present; the survivor is case-folded per
/// policy; `nick` is always removed.
pub(crate) fn fix_entity(data: &mut Value, options: &Options) {
    let Some(map) = data.as_object_mut() else {
        return;
    };
    let Some(nick) = map.remove("nick") else {
        return;
    };
    if !map.contains_key("handle") || map.get("handle") == Some(&Value::Null) {
        map.insert("handle".to_string(), nick);
    }
    if options.handle().downcase() {
        if let Some(Value::String(handle)) = map.get("handle") {
            let folded = handle.to_lowercase();
            map.insert("handle".to_string(), Value::String(folded));
        }
    }
}
