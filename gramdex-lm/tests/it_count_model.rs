//! End-to-end count model tests: build an image, load it (from bytes and
//! from disk), and check exact-count lookup semantics.

use gramdex_lm::{CountModel, CountModelBuilder, LoadError, ProbModel, QueryError};
use std::io::Write;

/// vocabulary {begin, this, is, a, test, end}; unigram counts this=5,
/// is=3, a=4, test=2; bigram "this is" count=3.
fn toy_count_image() -> Vec<u8> {
    let mut b = CountModelBuilder::new(2).unwrap();
    b.push(&["begin"], 1).unwrap();
    b.push(&["this"], 5).unwrap();
    b.push(&["is"], 3).unwrap();
    b.push(&["a"], 4).unwrap();
    b.push(&["test"], 2).unwrap();
    b.push(&["end"], 1).unwrap();
    b.push(&["this", "is"], 3).unwrap();
    b.finish().unwrap()
}

#[test]
fn test_stored_ngrams_return_exact_counts() {
    let model = CountModel::from_bytes(&toy_count_image()).unwrap();

    assert_eq!(model.lookup(&["this", "is"]).unwrap(), 3);
    assert_eq!(model.lookup(&["this"]).unwrap(), 5);
    assert_eq!(model.lookup(&["is"]).unwrap(), 3);
    assert_eq!(model.lookup(&["a"]).unwrap(), 4);
    assert_eq!(model.lookup(&["test"]).unwrap(), 2);
}

#[test]
fn test_absent_ngrams_return_zero() {
    let model = CountModel::from_bytes(&toy_count_image()).unwrap();

    // never inserted — a miss, not an error
    assert_eq!(model.lookup(&["is", "a"]).unwrap(), 0);
    assert_eq!(model.lookup(&["test", "end"]).unwrap(), 0);
}

#[test]
fn test_unknown_words_resolve_to_unk() {
    let model = CountModel::from_bytes(&toy_count_image()).unwrap();

    // out-of-vocabulary words map to the reserved unknown id, whose
    // unigram was never counted
    assert_eq!(model.lookup(&["never-seen"]).unwrap(), 0);
    assert_eq!(model.lookup(&["never", "seen"]).unwrap(), 0);
}

#[test]
fn test_invalid_queries() {
    let model = CountModel::from_bytes(&toy_count_image()).unwrap();

    assert_eq!(model.lookup(&[]).unwrap_err(), QueryError::EmptyNgram);
    assert_eq!(
        model.lookup(&["this", "is", "a"]).unwrap_err(),
        QueryError::OrderExceedsModel { got: 3, max: 2 }
    );
}

#[test]
fn test_open_from_disk_matches_bytes() {
    let bytes = toy_count_image();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&bytes).unwrap();
    file.flush().unwrap();

    let from_disk = CountModel::open(file.path()).unwrap();
    let from_bytes = CountModel::from_bytes(&bytes).unwrap();

    for gram in [
        &["this"][..],
        &["this", "is"][..],
        &["is", "a"][..],
        &["end"][..],
    ] {
        assert_eq!(
            from_disk.lookup(gram).unwrap(),
            from_bytes.lookup(gram).unwrap()
        );
    }
}

#[test]
fn test_kind_mismatch_rejected() {
    let bytes = toy_count_image();
    let err = ProbModel::from_bytes(&bytes).unwrap_err();
    assert!(matches!(err, LoadError::KindMismatch { .. }));
}

#[test]
fn test_higher_order_chain() {
    // order-3 model exercises two boundary levels
    let mut b = CountModelBuilder::new(3).unwrap();
    b.push(&["a"], 10).unwrap();
    b.push(&["b"], 7).unwrap();
    b.push(&["c"], 4).unwrap();
    b.push(&["a", "b"], 6).unwrap();
    b.push(&["a", "c"], 2).unwrap();
    b.push(&["b", "c"], 3).unwrap();
    b.push(&["a", "b", "c"], 5).unwrap();
    let model = CountModel::from_bytes(&b.finish().unwrap()).unwrap();

    assert_eq!(model.lookup(&["a", "b", "c"]).unwrap(), 5);
    assert_eq!(model.lookup(&["a", "b"]).unwrap(), 6);
    assert_eq!(model.lookup(&["a", "c", "b"]).unwrap(), 0);
    assert_eq!(model.lookup(&["b", "c", "a"]).unwrap(), 0);
}
