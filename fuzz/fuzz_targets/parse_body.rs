#![no_main]

use libfuzzer_sys::fuzz_target;
use memex_core::hypertext;

fuzz_target!(|data: &[u8]| {
    let Ok(body) = std::str::from_utf8(data) else {
        return;
    };

    let spans = hypertext::parse(body);
    assert_eq!(hypertext::render(&spans), body);
    assert_eq!(hypertext::parse(&hypertext::render(&spans)), spans);

    let mut cursor = 0;
    for item in hypertext::parse_with_offsets(body) {
        assert_eq!(item.range.start, cursor);
        cursor = item.range.end;
    }
    assert_eq!(cursor, body.len());
});
