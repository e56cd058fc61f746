//! Template clip sanitizing
//!
//! Turns a live clip into a structural template: the clip id and the ids of
//! its typed parameters are zeroed, and every `"id"` key inside the opaque
//! sub-objects is removed at any depth. Those ids were assigned by the remote
//! application to the source instance and must never be replayed onto another
//! clip. Null sub-objects are left as they are.

use crate::resolume::{Clip, Document};
use serde_json::Value;

const ID_KEY: &str = "id";

/// Sanitized copy of `template`; the input is not modified
///
/// Idempotent: sanitizing an already sanitized clip yields the same clip.
pub fn sanitize(template: &Clip) -> Clip {
    let mut clip = template.clone();

    clip.id = 0;
    clip.name.id = 0;
    clip.connected.id = 0;
    strip_ids(&mut clip.name.extra);
    strip_ids(&mut clip.connected.extra);
    strip_ids(&mut clip.params);

    if let Some(video) = clip.video.as_mut() {
        for effect in video.effects.iter_mut() {
            strip_ids(effect);
        }
        strip_ids(&mut video.extra);
        if let Some(fileinfo) = video.fileinfo.as_mut() {
            strip_ids(&mut fileinfo.extra);
        }
    }

    clip
}

/// Remove every `"id"` key from a document and everything nested in it
pub fn strip_ids(document: &mut Document) {
    document.remove_key(ID_KEY);
    for value in document.values_mut() {
        strip_value_ids(value);
    }
}

fn strip_value_ids(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.shift_remove(ID_KEY);
            for nested in map.values_mut() {
                strip_value_ids(nested);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                strip_value_ids(item);
            }
        }
        _ => {}
    }
}
