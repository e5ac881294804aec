use rust_decimal::Decimal;
use std::sync::{Arc, Mutex};
use vega_trace::{EventKind, TokenUsage, TraceBus, TraceEvent};

#[test]
fn exported_jsonl_round_trips_through_serde_json() {
    let mut bus = TraceBus::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen2 = seen.clone();
    bus.subscribe(Box::new(move |ev: &TraceEvent| seen2.lock().unwrap().push(ev.clone())));

    let usage = TokenUsage { input_tokens: 120, output_tokens: 40, cost: Decimal::new(36, 3) };
    let event = TraceEvent::new(EventKind::MessageReceived, 10)
        .with_agent(7, Some("Researcher".to_string()))
        .with_usage(usage)
        .with_duration(250);
    bus.publish(&event);

    assert_eq!(seen.lock().unwrap().len(), 1);

    let rendered = bus.export_jsonl(std::slice::from_ref(&event));
    let line = rendered.lines().next().unwrap();
    let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
    assert_eq!(parsed["agent_id"], 7);
    assert_eq!(parsed["kind"], "message_received");
}
