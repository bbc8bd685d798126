use std::sync::Arc;

use crate::config::ParserConfig;
use crate::error::ConfigError;
use crate::event::Event;
use crate::parsers::LogfmtParser;
use crate::reporting::Rejection;
use crate::timestamp::{DefaultResolver, TimestampResolver};

pub mod prefix_extractor;
pub mod stages;

pub use prefix_extractor::{extract_prefix, PrefixMatch, PrefixMatcher, RegexPrefix, SeparatorPrefix};
pub use stages::{check_rejections, merge_headers, FilterOutcome, LineFilter};

/// Turns one raw line into an event, or says why it can't.
///
/// Stages run in a fixed order: filter, prefix extraction, tokenizer,
/// rejection rules, header merge, timestamp resolution. Holds no per-line
/// state, so every worker borrows the same instance.
pub struct LineProcessor {
    filter: LineFilter,
    prefix_matcher: Option<Arc<dyn PrefixMatcher>>,
    parser: LogfmtParser,
    resolver: Arc<dyn TimestampResolver>,
    time_field_name: Option<String>,
    time_field_format: Option<String>,
}

impl LineProcessor {
    pub fn new(config: &ParserConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            filter: LineFilter::new(config.filter_regex.as_deref(), config.invert_filter)?,
            prefix_matcher: None,
            parser: LogfmtParser::new(),
            resolver: Arc::new(DefaultResolver),
            time_field_name: config.time_field_name.clone(),
            time_field_format: config.time_field_format.clone(),
        })
    }

    pub fn with_prefix_matcher(mut self, matcher: Arc<dyn PrefixMatcher>) -> Self {
        self.prefix_matcher = Some(matcher);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn TimestampResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn process(&self, line: &str) -> Result<Event, Rejection> {
        if let FilterOutcome::Skip { matched } = self.filter.check(line) {
            return Err(Rejection::Filtered { matched });
        }

        let (body, headers) = extract_prefix(line, self.prefix_matcher.as_deref());

        let mut fields = self.parser.parse_line(body)?;
        check_rejections(&fields)?;
        merge_headers(&mut fields, headers);

        let timestamp = self.resolver.resolve(
            &fields,
            self.time_field_name.as_deref(),
            self.time_field_format.as_deref(),
        );

        tracing::trace!(fields = fields.len(), %timestamp, "Parsed line");
        Ok(Event::new(timestamp, fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{FieldMap, FieldValue};
    use crate::reporting::RejectionReason;
    use chrono::{DateTime, TimeZone, Utc};

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
    }

    fn processor(config: ParserConfig) -> LineProcessor {
        let fixed = fixed_time();
        LineProcessor::new(&config)
            .unwrap()
            .with_resolver(Arc::new(
                move |_: &FieldMap, _: Option<&str>, _: Option<&str>| fixed,
            ))
    }

    #[test]
    fn test_basic_line() {
        let event = processor(ParserConfig::default())
            .process(r#"status=200 path="/x y" ok=true dur=1.5"#)
            .unwrap();

        assert_eq!(event.timestamp, fixed_time());
        assert_eq!(event.get("status"), Some(&FieldValue::Int(200)));
        assert_eq!(event.get("path"), Some(&FieldValue::from("/x y")));
        assert_eq!(event.get("ok"), Some(&FieldValue::Bool(true)));
        assert_eq!(event.get("dur"), Some(&FieldValue::Float(1.5)));
    }

    #[test]
    fn test_filter_runs_first() {
        let p = processor(ParserConfig {
            filter_regex: Some("^ERROR".to_string()),
            ..Default::default()
        });
        // Would otherwise be a tokenize error
        let rejection = p.process(r#"INFO msg="open"#).unwrap_err();
        assert_eq!(rejection, Rejection::Filtered { matched: false });
        assert!(p.process("ERROR a=1").is_ok());
    }

    #[test]
    fn test_rejection_kinds() {
        let p = processor(ParserConfig::default());
        assert_eq!(p.process("   ").unwrap_err(), Rejection::EmptyResult);
        assert_eq!(p.process("a= b").unwrap_err(), Rejection::AllValuesEmpty);
        assert_eq!(
            p.process(r#"a="x"#).unwrap_err().reason(),
            RejectionReason::TokenizeError
        );
    }

    #[test]
    fn test_headers_do_not_rescue_all_empty_line() {
        let matcher: Arc<dyn PrefixMatcher> =
            Arc::new(RegexPrefix::new(r"^(?P<host>\S+) ").unwrap());
        let p = processor(ParserConfig::default()).with_prefix_matcher(matcher);

        assert_eq!(
            p.process("web01 starting up").unwrap_err(),
            Rejection::AllValuesEmpty
        );
    }

    #[test]
    fn test_headers_override_tokenized_fields() {
        let matcher: Arc<dyn PrefixMatcher> =
            Arc::new(RegexPrefix::new(r"^(?P<host>\S+) ").unwrap());
        let p = processor(ParserConfig::default()).with_prefix_matcher(matcher);

        let event = p.process("web01 host=other a=1").unwrap();
        assert_eq!(event.get("host"), Some(&FieldValue::from("web01")));
        assert_eq!(event.get("a"), Some(&FieldValue::Int(1)));
    }

    #[test]
    fn test_merged_key_order_is_stable() {
        let pattern = r"^(?P<d>\w+) (?P<c>\w+) (?P<a>\w+) (?P<b>\w+): ";
        for _ in 0..20 {
            let matcher: Arc<dyn PrefixMatcher> = Arc::new(RegexPrefix::new(pattern).unwrap());
            let p = processor(ParserConfig::default()).with_prefix_matcher(matcher);

            let event = p.process("w x y z: k=1 c=override").unwrap();
            let keys: Vec<&str> = event.data.keys().map(String::as_str).collect();
            // Tokenized keys first, then headers in group order; a collision keeps its slot
            assert_eq!(keys, vec!["k", "c", "d", "a", "b"]);
            assert_eq!(event.get("c"), Some(&FieldValue::from("x")));
        }
    }

    #[test]
    fn test_non_finite_floats_stay_text() {
        let event = processor(ParserConfig::default())
            .process("big=1e400 n=nan ok=1")
            .unwrap();

        assert_eq!(event.get("big"), Some(&FieldValue::from("1e400")));
        assert_eq!(event.get("n"), Some(&FieldValue::from("nan")));
        assert_eq!(
            event.to_json_line().unwrap(),
            r#"{"timestamp":"2024-01-02T03:04:05Z","data":{"big":"1e400","n":"nan","ok":true}}"#
        );
    }

    #[test]
    fn test_resolver_sees_merged_fields_and_config() {
        let matcher: Arc<dyn PrefixMatcher> =
            Arc::new(RegexPrefix::new(r"^(?P<date>\S+) ").unwrap());
        let resolver = |fields: &FieldMap, name: Option<&str>, format: Option<&str>| {
            assert_eq!(name, Some("date"));
            assert_eq!(format, Some("%Y-%m-%d"));
            assert!(fields.contains_key("date"));
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
        };
        let p = LineProcessor::new(&ParserConfig {
            time_field_name: Some("date".to_string()),
            time_field_format: Some("%Y-%m-%d".to_string()),
            ..Default::default()
        })
        .unwrap()
        .with_prefix_matcher(matcher)
        .with_resolver(Arc::new(resolver));

        let event = p.process("2020-01-01 a=1").unwrap();
        assert_eq!(event.timestamp.timestamp(), 1_577_836_800);
        // The time field stays in the data
        assert_eq!(event.get("date"), Some(&FieldValue::from("2020-01-01")));
    }

    #[test]
    fn test_default_resolver_reads_time_field() {
        let p = LineProcessor::new(&ParserConfig {
            time_field_name: Some("ts".to_string()),
            time_field_format: Some("unix".to_string()),
            ..Default::default()
        })
        .unwrap();

        let event = p.process("ts=1700000000 msg=hi").unwrap();
        assert_eq!(event.timestamp.timestamp(), 1_700_000_000);
        assert_eq!(event.get("ts"), Some(&FieldValue::Int(1_700_000_000)));
    }
}
