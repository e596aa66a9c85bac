#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let tokens = gbmc_trace::tokenize(s);
        let by_line = gbmc_trace::map_tokens_by_line(&tokens);
        let mapped: usize = by_line.values().map(Vec::len).sum();
        assert_eq!(tokens.len(), mapped);
    }
});
