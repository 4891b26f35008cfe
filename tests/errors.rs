//! Rejected models report their status and source location

use alloy_finder::{analyze, AnalysisRequest, Status};

#[test]
fn parse_error_location() {
    let result = analyze(&AnalysisRequest::new("sig A {\n  f: \n}")).unwrap();
    assert_eq!(result.status, Status::ParseError);

    let error = result.error.unwrap();
    assert_eq!((error.line, error.column), (3, 1));
    assert!(error.message.contains("a signature name"));
    assert!(result.stats.is_none());
}

#[test]
fn unterminated_block_is_a_parse_error() {
    let result = analyze(&AnalysisRequest::new("sig A {")).unwrap();
    assert_eq!(result.status, Status::ParseError);
    assert!(result.error.is_some());
}

#[test]
fn unknown_name_is_a_type_error() {
    let result = analyze(&AnalysisRequest::new("sig A {}\nfact { some Bogus }")).unwrap();
    assert_eq!(result.status, Status::TypeError);

    let error = result.error.unwrap();
    assert_eq!((error.line, error.column), (2, 13));
    assert!(error.message.contains("Bogus"));
}

#[test]
fn ill_typed_join_location() {
    let result = analyze(&AnalysisRequest::new("sig A {}\nsig B { f: set B }\nfact { some A.f }")).unwrap();
    assert_eq!(result.status, Status::TypeError);

    let error = result.error.unwrap();
    assert_eq!((error.line, error.column), (3, 13));
    assert!(error.message.contains("A.f"));
}

#[test]
fn error_result_serializes_location() {
    let result = analyze(&AnalysisRequest::new("sig A {}\nfact { some Bogus }")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
    assert_eq!(json["status"], "TYPE_ERROR");
    assert_eq!(json["error"]["line"], 2);
    assert_eq!(json["error"]["column"], 13);
    assert_eq!(json["signatures"], serde_json::json!([]));
    assert_eq!(json["fields"], serde_json::json!([]));
}

#[test]
fn unclosed_comment_is_a_parse_error() {
    let result = analyze(&AnalysisRequest::new("sig A {}\n/* never closed * \nrun {}")).unwrap();
    assert_eq!(result.status, Status::ParseError);

    let error = result.error.unwrap();
    assert_eq!((error.line, error.column), (2, 1));
    assert!(error.message.contains("*/"));
}

#[test]
fn runaway_nesting_is_a_parse_error() {
    let source = format!("sig A {{}}\nfact {{ {}some A{} }}", "(".repeat(100_000), ")".repeat(100_000));
    let result = analyze(&AnalysisRequest::new(source)).unwrap();
    assert_eq!(result.status, Status::ParseError);
    assert!(result.error.unwrap().message.contains("shallower nesting"));
}
