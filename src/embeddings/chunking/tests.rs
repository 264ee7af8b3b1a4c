use super::*;

fn config(max_segment_size: usize, overlap: usize) -> ChunkingConfig {
    ChunkingConfig {
        max_segment_size,
        overlap,
        split_long_words: false,
    }
}

fn reconstruct(segments: &[Segment]) -> String {
    segments.iter().map(Segment::fresh_text).collect()
}

fn sample_document() -> Document {
    let paragraphs = [
        "Retrieval augmented generation combines search with generation. \
         A query is embedded and compared against indexed segments.",
        "Segments are produced by a recursive splitter! It prefers paragraph breaks, \
         then sentences, then words. Overlap keeps context between neighbours.",
        "Conversation memory keeps the most recent turns. Older turns are evicted first.",
    ];
    Document::new("course.txt", paragraphs.join("\n\n"))
}

#[test]
fn small_document_is_one_segment() {
    let document = Document::new("short.txt", "A short note.");

    let segments = chunk_document(&document, &ChunkingConfig::default())
        .expect("chunk_document should succeed");

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].text, "A short note.");
    assert_eq!(segments[0].span, 0..13);
    assert_eq!(segments[0].overlap, 0);
    assert_eq!(segments[0].index, 0);
    assert_eq!(segments[0].source, PathBuf::from("short.txt"));
}

#[test]
fn empty_document_has_no_segments() {
    let document = Document::new("empty.txt", "");
    let segments = chunk_document(&document, &ChunkingConfig::default())
        .expect("chunk_document should succeed");
    assert!(segments.is_empty());
}

#[test]
fn segments_respect_max_size() {
    let document = sample_document();

    for (max, overlap) in [(40, 10), (60, 0), (80, 30), (150, 50)] {
        let segments =
            chunk_document(&document, &config(max, overlap)).expect("chunk_document should succeed");
        assert!(segments.len() > 1, "max {} should split the document", max);
        for segment in &segments {
            assert!(
                segment.char_len() <= max,
                "segment {:?} exceeds {} chars",
                segment.text,
                max
            );
        }
    }
}

#[test]
fn stripping_overlap_reconstructs_text() {
    let document = sample_document();

    for (max, overlap) in [(20, 5), (40, 10), (60, 0), (80, 30), (150, 50), (299, 298)] {
        let segments =
            chunk_document(&document, &config(max, overlap)).expect("chunk_document should succeed");
        assert_eq!(
            reconstruct(&segments),
            document.text,
            "max {} overlap {}",
            max,
            overlap
        );
    }
}

#[test]
fn overlap_is_bounded_and_shared() {
    let document = sample_document();
    let segments =
        chunk_document(&document, &config(60, 20)).expect("chunk_document should succeed");

    assert_eq!(segments[0].overlap, 0);
    for pair in segments.windows(2) {
        let (previous, next) = (&pair[0], &pair[1]);
        let shared = next.text.get(..next.overlap).expect("overlap is a char boundary");

        assert!(shared.chars().count() <= 20);
        assert!(previous.text.ends_with(shared));
        assert_eq!(next.span.start + next.overlap, previous.span.end);
    }
    assert!(
        segments.iter().any(|s| s.overlap > 0),
        "some segment should carry overlap"
    );
}

#[test]
fn spans_match_text() {
    let document = sample_document();
    let segments =
        chunk_document(&document, &config(50, 15)).expect("chunk_document should succeed");

    for (i, segment) in segments.iter().enumerate() {
        assert_eq!(segment.index, i);
        assert_eq!(document.text.get(segment.span.clone()), Some(segment.text.as_str()));
    }
}

#[test]
fn prefers_paragraph_boundaries() {
    let first = "a".repeat(10) + " " + &"b".repeat(10);
    let second = "c".repeat(10) + " " + &"d".repeat(10);
    let document = Document::new("doc.txt", format!("{}\n\n{}", first, second));

    let segments =
        chunk_document(&document, &config(30, 0)).expect("chunk_document should succeed");

    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].text, format!("{}\n\n", first));
    assert_eq!(segments[1].text, second);
}

#[test]
fn long_word_is_kept_whole() {
    let word = "x".repeat(50);
    let document = Document::new("doc.txt", format!("short words {} end", word));

    let segments =
        chunk_document(&document, &config(20, 5)).expect("chunk_document should succeed");

    let long = segments
        .iter()
        .find(|s| s.text.contains(&word))
        .expect("long word should be emitted");
    assert!(long.char_len() > 20);
    assert_eq!(reconstruct(&segments), document.text);
}

#[test]
fn long_word_split_when_enabled() {
    let word = "x".repeat(50);
    let document = Document::new("doc.txt", word.clone());
    let config = ChunkingConfig {
        max_segment_size: 20,
        overlap: 0,
        split_long_words: true,
    };

    let segments = chunk_document(&document, &config).expect("chunk_document should succeed");

    assert_eq!(segments.len(), 3);
    assert!(segments.iter().all(|s| s.char_len() <= 20));
    assert_eq!(reconstruct(&segments), word);
}

#[test]
fn sizes_are_counted_in_characters() {
    let document = Document::new("doc.txt", "é".repeat(10));

    let segments =
        chunk_document(&document, &config(10, 2)).expect("chunk_document should succeed");

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].span, 0..20);
}

#[test]
fn invalid_config_is_rejected() {
    let document = sample_document();

    assert!(chunk_document(&document, &config(10, 10)).is_err());
    assert!(chunk_document(&document, &config(0, 0)).is_err());
}

#[test]
fn overlap_lands_on_char_boundaries_in_accented_text() {
    let document = Document::new(
        "été.txt",
        "Élève réservé, très âgé. Où êtes-vous allé hier ? À côté, près du théâtre.",
    );
    let segments =
        chunk_document(&document, &config(25, 8)).expect("chunk_document should succeed");

    assert!(segments.len() > 1);
    assert_eq!(segments[0].overlap, 0);
    for pair in segments.windows(2) {
        let (previous, next) = (&pair[0], &pair[1]);
        assert!(next.text.get(..next.overlap).is_some());
        assert_eq!(next.span.start + next.overlap, previous.span.end);
    }
    assert_eq!(reconstruct(&segments), document.text);
}
