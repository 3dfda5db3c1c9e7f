use jobstream_core::{FragmentExtractor, Framing};

fn delimited() -> FragmentExtractor {
    FragmentExtractor::new(Framing::Delimited {
        end: "</message>".to_string(),
    })
}

#[test]
fn no_delimiter_emits_nothing_and_cursor_stays() {
    let mut extractor = delimited();
    let buffer = "<message>still going";

    assert!(extractor.drain(buffer).is_empty());
    assert_eq!(extractor.cursor(), 0);

    // Second pass over the same buffer is also empty.
    assert!(extractor.drain(buffer).is_empty());
    assert_eq!(extractor.cursor(), 0);
}

#[test]
fn concatenated_units_come_out_in_document_order() {
    let mut extractor = delimited();
    let buffer = "<message>1</message><message>2</message><message>3</message>";

    let units = extractor.drain(buffer);
    assert_eq!(
        units,
        vec![
            "<message>1</message>".to_string(),
            "<message>2</message>".to_string(),
            "<message>3</message>".to_string(),
        ]
    );
    assert_eq!(extractor.cursor(), buffer.len());
}

#[test]
fn partial_tail_waits_for_more_data() {
    let mut extractor = delimited();

    let tick1 = "<message>A</message><mess";
    assert_eq!(extractor.drain(tick1), vec!["<message>A</message>".to_string()]);
    assert_eq!(extractor.cursor(), 20);

    let tick2 = "<message>A</message><message>B DONE</message>";
    assert_eq!(
        extractor.drain(tick2),
        vec!["<message>B DONE</message>".to_string()]
    );
    assert_eq!(extractor.cursor(), tick2.len());
}

#[test]
fn redelivering_the_full_buffer_is_idempotent() {
    let mut extractor = delimited();
    let buffer = "<message>A</message><message>B</message>";

    let first = extractor.drain(buffer);
    assert_eq!(first.len(), 2);
    assert!(extractor.drain(buffer).is_empty());
    assert_eq!(extractor.cursor(), buffer.len());
}

#[test]
fn tickwise_extraction_equals_one_shot_extraction() {
    let full = "<message>alpha</message><message>beta</message><message>gamma DONE</message>";

    let mut one_shot = delimited();
    let expected = one_shot.drain(full);
    assert_eq!(expected.len(), 3);

    // Feed the growing buffer at every possible byte split point.
    for split in 0..=full.len() {
        if !full.is_char_boundary(split) {
            continue;
        }
        let mut tickwise = delimited();
        let mut units = tickwise.drain(&full[..split]);
        units.extend(tickwise.drain(full));
        assert_eq!(units, expected, "split at byte {split}");
        assert_eq!(tickwise.cursor(), one_shot.cursor());
    }
}

#[test]
fn multibyte_content_between_delimiters() {
    let mut extractor = delimited();
    let buffer = "<message>héllo wörld</message><message>再见</message>";

    let units = extractor.drain(buffer);
    assert_eq!(
        units,
        vec![
            "<message>héllo wörld</message>".to_string(),
            "<message>再见</message>".to_string(),
        ]
    );
    assert_eq!(extractor.cursor(), buffer.len());
}

#[test]
fn frame_per_chunk_consumes_the_whole_suffix() {
    let mut extractor = FragmentExtractor::new(Framing::FramePerChunk);

    assert!(extractor.drain("").is_empty());

    assert_eq!(extractor.drain("frame one"), vec!["frame one".to_string()]);
    assert_eq!(extractor.cursor(), 9);
    assert!(extractor.drain("frame one").is_empty());

    assert_eq!(
        extractor.drain("frame oneframe two"),
        vec!["frame two".to_string()]
    );
}
