//! Integration tests for wildfire-client.
//!
//! These tests drive the public API end to end and check the headers that
//! reach the transport.

use wildfire_client::codec::JsonBackend;
use wildfire_client::console::GroupOptions;
use wildfire_client::protocol::{INDEX_HEADER, MAX_MESSAGE_INDEX, SEGMENT_BUDGET};
use wildfire_client::trace::{ExceptionInfo, Frame};
use wildfire_client::transport::{MemoryTransport, ResponseState, SourceLocation, Transport};
use wildfire_client::value::{FieldDescriptor, Object, SharedRef, TypeDescriptor, Value};
use wildfire_client::{Emission, Emitter, EmitterBuilder, EmitterConfig, WildfireError};

fn quiet() -> Emitter<MemoryTransport> {
    EmitterBuilder::new()
        .include_line_numbers(false)
        .build(MemoryTransport::new())
}

/// Join the chunks of all console segments back into one message.
fn reassemble(transport: &MemoryTransport) -> String {
    let mut message = String::new();
    for (_, value) in transport.headers_with_prefix("X-Wf-1-1-1-") {
        let start = value.find('|').unwrap() + 1;
        let end = value.rfind('|').unwrap();
        message.push_str(&value[start..end]);
    }
    message
}

#[test]
fn test_log_mapping() {
    let mut console = quiet();
    let value = Value::map([("a", Value::Int(1)), ("b", Value::seq([1, 2, 3]))]);
    console.log(value, None).unwrap();

    let t = console.transport();
    assert_eq!(
        t.header("X-Wf-Protocol-1"),
        Some("http://meta.wildfirehq.org/Protocol/JsonStream/0.2")
    );
    assert_eq!(
        t.header("X-Wf-1-Structure-1"),
        Some("http://meta.firephp.org/Wildfire/Structure/FirePHP/FirebugConsole/0.1")
    );
    assert_eq!(
        t.header("X-Wf-1-1-1-1"),
        Some(r#"36|[{"Type":"LOG"},{"a":1,"b":[1,2,3]}]|"#)
    );
    assert_eq!(t.header(INDEX_HEADER), Some("1"));
}

#[test]
fn test_message_at_budget_is_one_segment() {
    // 17 bytes of envelope prefix and 2 closing bytes around the string
    let mut console = quiet();
    console.log("x".repeat(SEGMENT_BUDGET - 19), None).unwrap();

    let t = console.transport();
    assert_eq!(t.headers_with_prefix("X-Wf-1-1-1-").count(), 1);
    assert!(t.header("X-Wf-1-1-1-1").unwrap().starts_with("5000|[{"));
    assert_eq!(t.header(INDEX_HEADER), Some("1"));
}

#[test]
fn test_message_over_budget_is_split() {
    let mut console = quiet();
    let emission = console.log("x".repeat(SEGMENT_BUDGET - 18), None).unwrap();
    assert_eq!(
        emission,
        Emission::Sent {
            first_index: 1,
            segments: 2
        }
    );

    let t = console.transport();
    let first = t.header("X-Wf-1-1-1-1").unwrap();
    assert!(first.starts_with("5001|[{"));
    assert!(first.ends_with("|\\"));
    assert_eq!(first.len(), "5001|".len() + SEGMENT_BUDGET + "|\\".len());
    assert_eq!(t.header("X-Wf-1-1-1-2"), Some("|]|"));
    assert_eq!(t.header(INDEX_HEADER), Some("2"));
}

#[test]
fn test_segments_cut_on_char_boundaries() {
    let mut console = EmitterBuilder::new()
        .include_line_numbers(false)
        .backend(JsonBackend::SerdeJson)
        .build(MemoryTransport::new());
    let text = "\u{e9}".repeat(2491);
    console.log(text.as_str(), None).unwrap();

    let t = console.transport();
    assert_eq!(t.headers_with_prefix("X-Wf-1-1-1-").count(), 2);
    assert!(t.header("X-Wf-1-1-1-1").unwrap().starts_with("5001|"));
    assert_eq!(reassemble(t), format!("[{{\"Type\":\"LOG\"}},\"{}\"]", text));
}

#[test]
fn test_indices_are_contiguous_across_structures() {
    let mut console = quiet();
    console.log("one", None).unwrap();
    console.dump("two", 2).unwrap();
    console.log("x".repeat(SEGMENT_BUDGET * 2), None).unwrap();
    console.warn("four", None).unwrap();

    let t = console.transport();
    assert!(t.header("X-Wf-1-1-1-1").is_some());
    assert!(t.header("X-Wf-1-2-1-2").is_some());
    for i in 3..=5 {
        assert!(t.header(&format!("X-Wf-1-1-1-{}", i)).is_some());
    }
    assert!(t.header("X-Wf-1-1-1-6").unwrap().contains("four"));
    assert_eq!(t.header(INDEX_HEADER), Some("6"));
    assert_eq!(console.message_index(), 6);
}

#[test]
fn test_committed_transport() {
    let mut console = quiet();
    console.transport_mut().start(Some(SourceLocation {
        file: "/srv/app/index.rs".into(),
        line: 12,
    }));

    let err = console.log("late", None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Headers already sent in /srv/app/index.rs on line 12. Cannot send log data"
    );
    assert!(err.is_terminal());
    assert!(console.transport().headers().is_empty());

    console.set_in_failure_handler(true);
    assert_eq!(console.log("late", None).unwrap(), Emission::NoticeWritten);
    assert_eq!(console.transport().notices().len(), 1);
}

#[test]
fn test_group_nesting() {
    let mut console = quiet();
    console
        .group("Outer", &GroupOptions::new().collapsed(true))
        .unwrap();
    console.group("Inner", &GroupOptions::new()).unwrap();
    console.log("inside", None).unwrap();
    console.group_end().unwrap();
    console.group_end().unwrap();

    let err = console.group_end().unwrap_err();
    assert!(matches!(err, WildfireError::InvalidCallArguments(_)));
    assert!(!err.is_terminal());
    assert_eq!(console.message_index(), 5);
    assert!(console
        .transport()
        .header("X-Wf-1-1-1-1")
        .unwrap()
        .contains(r#""Collapsed":"true""#));
}

#[test]
fn test_cyclic_composite() {
    let node = TypeDescriptor::new("Node")
        .field(FieldDescriptor::public("next"))
        .shared();
    let n = Object::new(&node);
    n.set("next", n.clone());

    let mut console = quiet();
    console.log(n, Some("cycle")).unwrap();
    assert_eq!(
        reassemble(console.transport()),
        r#"[{"Type":"LOG","Label":"cycle"},{"__className":"Node","public:next":"Recursion(Node)"}]"#
    );
}

#[test]
fn test_shared_self_reference() {
    let shared = SharedRef::new(Value::map([("name", "root")]));
    if let Value::Mapping(map) = &mut *shared.borrow_mut() {
        map.insert("self", shared.clone());
    }

    let mut console = quiet();
    console.log(shared, None).unwrap();
    assert_eq!(
        reassemble(console.transport()),
        r#"[{"Type":"LOG"},{"name":"root","self":"Recursion(self)"}]"#
    );
}

#[test]
fn test_exception_with_trace() {
    let mut console = Emitter::new(MemoryTransport::new());
    let info = ExceptionInfo::new("ParseError", "unexpected token")
        .at("/app/src/parse.rs", 31)
        .with_trace(vec![
            Frame::new("parse").at("/app/src/parse.rs", 31),
            Frame::new("emit").in_class("wildfire_client::Emitter", "->"),
            Frame::new("main").at("/app/src/main.rs", 4),
        ]);
    console.exception(&info, None).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&reassemble(console.transport())).unwrap();
    assert_eq!(json[0]["Type"], "EXCEPTION");
    assert_eq!(json[0]["File"], "/app/src/parse.rs");
    assert_eq!(json[0]["Line"], 31);
    let trace = json[1]["Trace"].as_array().unwrap();
    let functions: Vec<_> = trace.iter().map(|f| f["function"].as_str().unwrap()).collect();
    assert_eq!(functions, vec!["parse", "main"]);
}

#[test]
fn test_emitter_from_config() {
    let config = EmitterConfig::from_json_str(
        r#"{
            "maxArrayDepth": 1,
            "includeLineNumbers": false,
            "objectFilters": { "Credentials": true }
        }"#,
    )
    .unwrap();
    let mut console = EmitterBuilder::new().config(config).build(MemoryTransport::new());

    let creds = Object::new(&TypeDescriptor::new("Credentials").shared());
    let value = Value::seq([Value::from(creds), Value::seq([Value::seq([1])])]);
    console.log(value, None).unwrap();
    assert_eq!(
        reassemble(console.transport()),
        r#"[{"Type":"LOG"},["Excluded by Filter(Credentials)","Max Array Depth(1)"]]"#
    );
}

/// Transport that keeps only the latest index, for long runs.
#[derive(Default)]
struct CountingTransport {
    writes: usize,
    last_index: Option<String>,
}

impl Transport for CountingTransport {
    fn set_header(&mut self, name: &str, value: &str) {
        self.writes += 1;
        if name == INDEX_HEADER {
            self.last_index = Some(value.to_string());
        }
    }

    fn response_state(&self) -> ResponseState {
        ResponseState::Pending
    }
}

#[test]
fn test_index_exhaustion_is_fatal() {
    let mut console = EmitterBuilder::new()
        .include_line_numbers(false)
        .build(CountingTransport::default());

    for _ in 0..MAX_MESSAGE_INDEX {
        console.log(Value::Null, None).unwrap();
    }
    assert_eq!(
        console.transport().last_index.as_deref(),
        Some("99999")
    );

    let writes = console.transport().writes;
    let err = console.log(Value::Null, None).unwrap_err();
    assert!(matches!(err, WildfireError::IndexExhausted { limit: 99_999 }));
    assert!(err.is_terminal());
    assert!(console.is_exhausted());
    assert_eq!(console.transport().writes, writes);
}
