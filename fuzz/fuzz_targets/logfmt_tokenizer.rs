#![no_main]

use keyval::parsers::LogfmtParser;
use keyval::{LineProcessor, ParserConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Tokenize errors and rejections are fine; we only care about panics.
        let parser = LogfmtParser::new();
        let _ = parser.parse_line(input);

        if let Ok(processor) = LineProcessor::new(&ParserConfig::default()) {
            let _ = processor.process(input);
        }
    }
});
