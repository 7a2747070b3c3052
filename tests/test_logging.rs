//! Tests for logging configuration and format parsing

use cloud_helpers::observability::logging::{parse_level, LogFormat};
use cloud_helpers::observability::{init_default_logging, init_logging};
use tracing::Level;

#[test]
fn test_log_format_parse_is_case_insensitive() {
    for input in ["json", "JSON", "Json"] {
        assert_eq!(LogFormat::parse(input), LogFormat::Json);
    }
    for input in ["pretty", "PRETTY", "Pretty"] {
        assert_eq!(LogFormat::parse(input), LogFormat::Pretty);
    }
    for input in ["compact", "COMPACT", "Compact"] {
        assert_eq!(LogFormat::parse(input), LogFormat::Compact);
    }
}

#[test]
fn test_log_format_parse_invalid_defaults_to_compact() {
    for input in ["invalid", "", "xml", "yaml", "123"] {
        assert_eq!(LogFormat::parse(input), LogFormat::Compact, "input: {input:?}");
    }
}

#[test]
fn test_log_format_parse_whitespace() {
    assert_eq!(LogFormat::parse("  json  "), LogFormat::Json);
    assert_eq!(LogFormat::parse("json\n"), LogFormat::Json);
    assert_eq!(LogFormat::parse("\tpretty"), LogFormat::Pretty);
}

#[test]
fn test_parse_level_falls_back_to_default() {
    assert_eq!(parse_level("debug", Level::WARN), Level::DEBUG);
    assert_eq!(parse_level(" TRACE ", Level::WARN), Level::TRACE);
    assert_eq!(parse_level("loud", Level::WARN), Level::WARN);
    assert_eq!(parse_level("", Level::INFO), Level::INFO);
}

#[test]
fn test_repeated_initialization_is_harmless() {
    init_default_logging(0);
    init_default_logging(2);
    init_logging(Level::TRACE, LogFormat::Json, true);

    let span = cloud_helpers::call_span!(session = "mock", destination = "topic/hello");
    let _entered = span.enter();
    tracing::info!("inside call span");
}
