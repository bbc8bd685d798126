use crate::error::TokenizeError;
use crate::event::FieldMap;
use crate::parsers::type_conversion::infer_value;

/// Tokenizer for `key=value` lines.
///
/// The grammar is deliberately lenient:
/// - anything that can't start a key (whitespace, `=`, `"`) is skipped
/// - a key without `=` is a bare key with an empty value
/// - unquoted values end at whitespace, `=` or `"`
/// - quoted values may contain spaces and `=`, with JSON-style escapes
///
/// The only failures are an unterminated quoted value and an unknown escape.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogfmtParser;

impl LogfmtParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse one line into a typed field mapping.
    ///
    /// A line with no tokens yields an empty mapping, not an error.
    pub fn parse_line(&self, line: &str) -> Result<FieldMap, TokenizeError> {
        let line = line.trim_end_matches('\n').trim_end_matches('\r');
        let pairs = self.parse_logfmt_pairs(line)?;

        let mut fields = FieldMap::with_capacity(pairs.len());
        for (key, value) in pairs {
            fields.insert(key, infer_value(&value));
        }
        Ok(fields)
    }

    /// Split a line into raw (key, value) pairs in the order they appear
    pub fn parse_logfmt_pairs(&self, line: &str) -> Result<Vec<(String, String)>, TokenizeError> {
        let bytes = line.as_bytes();
        let mut pairs = Vec::new();
        let mut i = 0;

        while i < bytes.len() {
            if !is_key_byte(bytes[i]) {
                i += 1;
                continue;
            }

            // Key: delimiters are all ASCII, so these slices stay on char boundaries
            let key_start = i;
            while i < bytes.len() && is_key_byte(bytes[i]) {
                i += 1;
            }
            let key = &line[key_start..i];

            if i >= bytes.len() || bytes[i] != b'=' {
                pairs.push((key.to_string(), String::new()));
                continue;
            }
            i += 1;

            if i >= bytes.len() {
                pairs.push((key.to_string(), String::new()));
                break;
            }

            match bytes[i] {
                b'"' => {
                    let value_start = i + 1;
                    let mut escaped = false;
                    i = value_start;
                    loop {
                        if i >= bytes.len() {
                            return Err(TokenizeError::UnterminatedString {
                                key: key.to_string(),
                            });
                        }
                        match bytes[i] {
                            b'\\' => {
                                escaped = true;
                                i += 2;
                            }
                            b'"' => break,
                            _ => i += 1,
                        }
                    }
                    let raw = &line[value_start..i];
                    i += 1; // closing quote

                    let value = if escaped {
                        unquote(key, raw)?
                    } else {
                        raw.to_string()
                    };
                    pairs.push((key.to_string(), value));
                }
                b if is_key_byte(b) => {
                    let value_start = i;
                    while i < bytes.len() && is_key_byte(bytes[i]) {
                        i += 1;
                    }
                    pairs.push((key.to_string(), line[value_start..i].to_string()));
                }
                _ => {
                    // `key=` followed by whitespace or another delimiter
                    pairs.push((key.to_string(), String::new()));
                    i += 1;
                }
            }
        }

        Ok(pairs)
    }
}

fn is_key_byte(b: u8) -> bool {
    b > b' ' && b != b'"' && b != b'='
}

/// Decode the escapes of a quoted value (quotes already removed)
fn unquote(key: &str, raw: &str) -> Result<String, TokenizeError> {
    let mut value = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            value.push(ch);
            continue;
        }

        let Some(escaped_ch) = chars.next() else {
            return Err(TokenizeError::InvalidEscape {
                key: key.to_string(),
                sequence: String::new(),
            });
        };

        match escaped_ch {
            '"' => value.push('"'),
            '\\' => value.push('\\'),
            '/' => value.push('/'),
            '\'' => value.push('\''),
            'b' => value.push('\u{8}'),
            'f' => value.push('\u{c}'),
            'n' => value.push('\n'),
            'r' => value.push('\r'),
            't' => value.push('\t'),
            'u' => {
                let Some(unit) = read_hex4(&mut chars) else {
                    return Err(TokenizeError::InvalidEscape {
                        key: key.to_string(),
                        sequence: "u".to_string(),
                    });
                };

                if (0xD800..0xDC00).contains(&unit) {
                    // High surrogate: only valid when a low surrogate escape follows
                    let mut lookahead = chars.clone();
                    let low = match (lookahead.next(), lookahead.next()) {
                        (Some('\\'), Some('u')) => read_hex4(&mut lookahead),
                        _ => None,
                    };
                    match low {
                        Some(low) if (0xDC00..0xE000).contains(&low) => {
                            let combined = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                            value.push(char::from_u32(combined).unwrap_or('\u{FFFD}'));
                            chars = lookahead;
                        }
                        _ => value.push('\u{FFFD}'),
                    }
                } else {
                    value.push(char::from_u32(unit).unwrap_or('\u{FFFD}'));
                }
            }
            other => {
                return Err(TokenizeError::InvalidEscape {
                    key: key.to_string(),
                    sequence: other.to_string(),
                });
            }
        }
    }

    Ok(value)
}

fn read_hex4(chars: &mut std::str::Chars<'_>) -> Option<u32> {
    let mut unit = 0u32;
    for _ in 0..4 {
        let digit = chars.next()?.to_digit(16)?;
        unit = unit * 16 + digit;
    }
    Some(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::FieldValue;
    use proptest::prelude::*;

    fn parse(line: &str) -> FieldMap {
        LogfmtParser::new().parse_line(line).unwrap()
    }

    #[test]
    fn test_logfmt_parser_basic() {
        let result = parse(r#"level=info message="test message" count=42"#);

        assert_eq!(result.get("level"), Some(&FieldValue::from("info")));
        assert_eq!(result.get("message"), Some(&FieldValue::from("test message")));
        assert_eq!(result.get("count"), Some(&FieldValue::Int(42)));
    }

    #[test]
    fn test_logfmt_parser_types() {
        let result = parse(r#"str="hello" int=123 float=2.5 bool_true=true bool_false=false"#);

        assert_eq!(result.get("str"), Some(&FieldValue::from("hello")));
        assert_eq!(result.get("int"), Some(&FieldValue::Int(123)));
        assert_eq!(result.get("float"), Some(&FieldValue::Float(2.5)));
        assert_eq!(result.get("bool_true"), Some(&FieldValue::Bool(true)));
        assert_eq!(result.get("bool_false"), Some(&FieldValue::Bool(false)));
    }

    #[test]
    fn test_quoted_values_are_still_typed() {
        let result = parse(r#"n="42" s="4 2""#);
        assert_eq!(result.get("n"), Some(&FieldValue::Int(42)));
        assert_eq!(result.get("s"), Some(&FieldValue::from("4 2")));
    }

    #[test]
    fn test_logfmt_parser_quoted_values() {
        let result = parse(
            r#"key1="value with spaces" key2="value with \"quotes\"" key3=simple key4="a=b""#,
        );

        assert_eq!(result.get("key1"), Some(&FieldValue::from("value with spaces")));
        assert_eq!(result.get("key2"), Some(&FieldValue::from("value with \"quotes\"")));
        assert_eq!(result.get("key3"), Some(&FieldValue::from("simple")));
        assert_eq!(result.get("key4"), Some(&FieldValue::from("a=b")));
    }

    #[test]
    fn test_logfmt_parser_escape_sequences() {
        let result = parse(
            r#"newline="line1\nline2" tab="col1\tcol2" backslash="back\\slash" snow="\u2603" emoji="\ud83d\ude00""#,
        );

        assert_eq!(result.get("newline"), Some(&FieldValue::from("line1\nline2")));
        assert_eq!(result.get("tab"), Some(&FieldValue::from("col1\tcol2")));
        assert_eq!(result.get("backslash"), Some(&FieldValue::from("back\\slash")));
        assert_eq!(result.get("snow"), Some(&FieldValue::from("\u{2603}")));
        assert_eq!(result.get("emoji"), Some(&FieldValue::from("\u{1F600}")));
    }

    #[test]
    fn test_lone_surrogate_is_replaced() {
        let result = parse(r#"x="\ud83dabc""#);
        assert_eq!(result.get("x"), Some(&FieldValue::from("\u{FFFD}abc")));
    }

    #[test]
    fn test_logfmt_parser_empty_values() {
        let result = parse(r#"empty="" bare= trailing"#);

        assert_eq!(result.get("empty"), Some(&FieldValue::from("")));
        assert_eq!(result.get("bare"), Some(&FieldValue::from("")));
        assert_eq!(result.get("trailing"), Some(&FieldValue::from("")));
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_bare_words_become_empty_keys() {
        let result = parse("INFO starting up");
        let keys: Vec<&str> = result.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["INFO", "starting", "up"]);
        assert!(result.values().all(|v| v.is_empty_str()));
    }

    #[test]
    fn test_garbage_is_skipped() {
        let result = parse(r#"  ="" a=1=2 "quoted" b==c"#);
        assert_eq!(result.get("a"), Some(&FieldValue::Bool(true)));
        assert_eq!(result.get("2"), Some(&FieldValue::from("")));
        assert_eq!(result.get("quoted"), Some(&FieldValue::from("")));
        assert_eq!(result.get("b"), Some(&FieldValue::from("")));
        assert_eq!(result.get("c"), Some(&FieldValue::from("")));
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let result = parse("a=1.5 b=x a=hello");
        assert_eq!(result.len(), 2);
        assert_eq!(result.get("a"), Some(&FieldValue::from("hello")));
        // Position of the first occurrence is kept
        assert_eq!(result.get_index(0).map(|(k, _)| k.as_str()), Some("a"));
    }

    #[test]
    fn test_empty_and_blank_lines() {
        assert!(parse("").is_empty());
        assert!(parse("   \t ").is_empty());
        assert!(parse("\r\n").is_empty());
    }

    #[test]
    fn test_unicode_keys_and_values() {
        let result = parse("café=crème größe=3");
        assert_eq!(result.get("café"), Some(&FieldValue::from("crème")));
        assert_eq!(result.get("größe"), Some(&FieldValue::Int(3)));
    }

    #[test]
    fn test_trailing_newline_stripped() {
        let result = parse("a=b\r\n");
        assert_eq!(result.get("a"), Some(&FieldValue::from("b")));
    }

    #[test]
    fn test_logfmt_parser_errors() {
        let parser = LogfmtParser::new();

        assert_eq!(
            parser.parse_line(r#"a=1 msg="never closed"#),
            Err(TokenizeError::UnterminatedString {
                key: "msg".to_string()
            })
        );

        // Escaped closing quote leaves the value open
        assert!(matches!(
            parser.parse_line(r#"msg="ends with escape\"#),
            Err(TokenizeError::UnterminatedString { .. })
        ));

        assert_eq!(
            parser.parse_line(r#"msg="bad \q escape""#),
            Err(TokenizeError::InvalidEscape {
                key: "msg".to_string(),
                sequence: "q".to_string()
            })
        );

        assert!(matches!(
            parser.parse_line(r#"msg="\u12""#),
            Err(TokenizeError::InvalidEscape { .. })
        ));
    }

    fn arb_value() -> impl Strategy<Value = FieldValue> {
        prop_oneof![
            any::<bool>().prop_map(FieldValue::Bool),
            any::<i64>()
                .prop_filter("0 and 1 read as booleans", |i| *i != 0 && *i != 1)
                .prop_map(FieldValue::Int),
            (-1.0e9f64..1.0e9).prop_map(|f| FieldValue::Float(f + 0.5)),
            "[a-zA-Z_][a-zA-Z0-9_./-]{0,12}"
                .prop_filter("must stay a string", |s| {
                    infer_value(s) == FieldValue::Str(s.clone())
                })
                .prop_map(FieldValue::Str),
            "[a-z ]{1,10}=[a-z]{0,4}".prop_map(FieldValue::Str),
        ]
    }

    fn render(value: &FieldValue) -> String {
        match value {
            FieldValue::Str(s) if s.contains(' ') || s.contains('=') => format!("{:?}", s),
            // Debug keeps the ".0" so whole floats don't read back as ints
            FieldValue::Float(f) => format!("{:?}", f),
            other => other.to_string(),
        }
    }

    proptest! {
        #[test]
        fn prop_rendered_fields_parse_back(
            pairs in prop::collection::vec(("k[a-z0-9]{0,6}", arb_value()), 1..8)
        ) {
            let line = pairs
                .iter()
                .map(|(k, v)| format!("{}={}", k, render(v)))
                .collect::<Vec<_>>()
                .join(" ");

            let parsed = LogfmtParser::new().parse_line(&line).unwrap();

            // Later duplicates win
            let mut expected = FieldMap::new();
            for (k, v) in pairs {
                expected.insert(k, v);
            }
            prop_assert_eq!(parsed, expected);
        }

        #[test]
        fn prop_never_panics(line in "\\PC{0,64}") {
            let _ = LogfmtParser::new().parse_line(&line);
        }

        #[test]
        fn prop_lines_without_quotes_never_fail(line in "[^\"]{0,64}") {
            prop_assert!(LogfmtParser::new().parse_line(&line).is_ok());
        }
    }
}
