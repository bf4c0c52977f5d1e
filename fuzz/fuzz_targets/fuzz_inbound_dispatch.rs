//! Fuzz target: inbound topic routing
//!
//! Drives arbitrary topic strings through the command router and the
//! topic-filter matcher, asserting that neither panics and that only the
//! exact reset topic ever produces a command.
//!
//! cargo fuzz run fuzz_inbound_dispatch

#![no_main]

use fridgewatch::app::commands::FridgeCommand;
use fridgewatch::app::ports::InboundMessage;
use fridgewatch::app::topics::{Topics, topic_matches};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let topics = Topics::new("devlol/h19/fridge/");

    // Split the input: first half is the topic, the rest the payload.
    let mid = data.len() / 2;
    let topic = String::from_utf8_lossy(&data[..mid]).into_owned();
    let msg = InboundMessage {
        topic,
        payload: data[mid..].to_vec(),
    };

    let routed = FridgeCommand::from_message(&topics, &msg);
    assert_eq!(routed.is_some(), msg.topic == topics.reset);

    // Matching must be total, also with the fuzzed string as the filter.
    let _ = topic_matches(&topics.subscription, &msg.topic);
    let _ = topic_matches(&msg.topic, &topics.reset);
});
