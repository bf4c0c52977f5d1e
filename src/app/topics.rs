//! MQTT topic layout.
//!
//! Every topic hangs off one configurable prefix:
//!
//! | Suffix       | Direction | Payload              | Retained |
//! |--------------|-----------|----------------------|----------|
//! | `door`       | out       | `OPEN` / `CLOSE`     | no       |
//! | `rawsamples` | out       | weight, 3 decimals   | yes      |
//! | `online`     | out       | `true` / `false` LWT | yes      |
//! | `bottles/out`| out       | bottles taken        | no       |
//! | `reset`      | in        | ignored              | —        |
//!
//! The device subscribes to the whole namespace (`<prefix>#`), so it also
//! receives its own publications; those are filtered out by exact-topic
//! routing in [`commands`](super::commands).

/// Fully-qualified topic strings for one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub door: String,
    pub rawsamples: String,
    pub online: String,
    pub bottles_out: String,
    pub reset: String,
    /// Subscription filter covering the whole device namespace.
    pub subscription: String,
}

impl Topics {
    /// Build the topic set; `prefix` is expected to end in `/`.
    pub fn new(prefix: &str) -> Self {
        Self {
            door: format!("{prefix}door"),
            rawsamples: format!("{prefix}rawsamples"),
            online: format!("{prefix}online"),
            bottles_out: format!("{prefix}bottles/out"),
            reset: format!("{prefix}reset"),
            subscription: format!("{prefix}#"),
        }
    }
}

/// MQTT topic-filter matching (`+` single level, `#` trailing multi level).
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');

    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return filter_levels.next().is_none(),
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}
