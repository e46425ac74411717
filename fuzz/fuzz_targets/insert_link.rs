#![no_main]

use libfuzzer_sys::fuzz_target;
use memex_core::model::DocId;
use memex_core::{DocumentStore, MemoryStore, Navigator};

fuzz_target!(|input: (&str, &str, u32)| {
    let (body, text, raw_id) = input;
    let mut nav = Navigator::new(MemoryStore::new());
    let Ok(id) = nav.store_mut().create("fuzz", body) else {
        return;
    };
    if nav.open(id).is_err() {
        return;
    }

    let target = DocId::new(u64::from(raw_id));
    let Ok(outcome) = nav.insert_link(text, target) else {
        return;
    };
    if let memex_core::LinkInsertion::Inserted { range, .. } = outcome {
        let updated = nav.store().get(id).ok().flatten().map(|doc| doc.body);
        let Some(updated) = updated else {
            return;
        };
        let expected = memex_core::hypertext::Span::link(text, target);
        let located = memex_core::hypertext::parse_with_offsets(&updated);
        assert!(
            located
                .iter()
                .any(|span| span.range == range && span.span == expected)
        );
    }
});
