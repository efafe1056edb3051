use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use textindex::store::{deserialize, serialize};
use textindex::{
    BUILD_CONFIRMATION, Engine, IndexSource, IndexStore, NumberedText, Payload, Query, Rebuild,
    Request, WordIndex, number_lines,
};
use textindex_dict::Dictionary;

fn write_doc(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

fn running_dictionary() -> Dictionary {
    [("бежал", "бежать"), ("бежит", "бежать")].into_iter().collect()
}

#[test]
fn two_forms_fold_into_one_lemma() {
    let lines = number_lines(["Он бежал.", "Потом бежит."]);
    let index = WordIndex::build(&lines, &running_dictionary());

    assert_eq!(index.len(), 1);
    let record = index.get("бежать").unwrap();
    assert_eq!(record.occurrence_count, 2);
    assert_eq!(record.surface_forms, vec!["бежал", "бежит"]);
    assert_eq!(record.lines, vec![1, 2]);
}

#[test]
fn empty_document_builds_empty_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let doc = write_doc(dir.path(), "empty.txt", "");
    let store = IndexStore::new(dir.path().join("indices"));
    let engine = Engine::new(Arc::new(running_dictionary()), store.clone());

    let request = Request::from_args(&[doc.to_str().unwrap(), "1"]).unwrap();
    assert_eq!(engine.process(&request).unwrap(), BUILD_CONFIRMATION);

    let artifact = fs::read_to_string(store.artifact_path(&doc)).unwrap();
    assert!(artifact.is_empty());
    assert!(store.load(&doc).unwrap().is_empty());
}

#[test]
fn unknown_word_detail_is_not_found() {
    let index = WordIndex::build(&number_lines(["Он бежал."]), &running_dictionary());
    let text = NumberedText::default();
    let answer = Query::Detail(Payload::Word("прыгать".into())).answer(&index, &text);
    assert_eq!(answer, "Word прыгать was not found.");
}

#[test]
fn top_n_larger_than_index_returns_all_lemmas() {
    let dict: Dictionary = [("кот", "кот"), ("пёс", "пёс"), ("ёж", "ёж")]
        .into_iter()
        .collect();
    let text = NumberedText::parse("кот пёс ёж\nкот");
    let index = WordIndex::build(text.lines(), &dict);
    assert_eq!(index.len(), 3);

    let answer = Query::Detail(Payload::Number(5)).answer(&index, &text);
    let lemmas: Vec<&str> = answer.split(", ").collect();
    // "пёс" sorts before "ёж" by code point.
    assert_eq!(lemmas, vec!["кот", "пёс", "ёж"]);
}

#[test]
fn cached_artifact_answers_like_a_fresh_build() {
    let dir = tempfile::tempdir().unwrap();
    let body = "Он бежал по полю.\n\nКот бежит за ним,\nи снова бежит.\n";
    let doc = write_doc(dir.path(), "story.txt", body);
    let engine = Engine::new(
        Arc::new(running_dictionary()),
        IndexStore::new(dir.path().join("indices")),
    );

    let queries = [
        Query::BuildOnly,
        Query::Detail(Payload::Number(3)),
        Query::Detail(Payload::Word("бежать".into())),
        Query::Detail(Payload::Group(vec!["бежать".into(), "кот".into()])),
        Query::Lines("бежать".into()),
    ];

    let first = engine.prepare(&doc, Rebuild::IfMissing).unwrap();
    let second = engine.prepare(&doc, Rebuild::IfMissing).unwrap();
    assert_eq!(first.source, IndexSource::Built);
    assert_eq!(second.source, IndexSource::Artifact);
    for query in &queries {
        assert_eq!(
            query.answer(&first.index, &first.text),
            query.answer(&second.index, &second.text),
            "{query:?}"
        );
    }

    let request = Request {
        document: doc.clone(),
        query: Query::Lines("бежать".into()),
    };
    assert_eq!(
        engine.process(&request).unwrap(),
        "Он бежал по полю.\n\nКот бежит за ним,\n\nи снова бежит."
    );
}

#[test]
fn closed_class_words_never_become_keys() {
    let dict = Dictionary::from_csv("и,союз,и\nв,предл.,во\nкот,м,кота\n", false).unwrap();
    let index = WordIndex::build(&number_lines(["И кот, и кота во дворе в саду."]), &dict);
    assert!(!index.contains("и"));
    assert!(!index.contains("в"));
    assert_eq!(index.get("кот").map(|r| r.occurrence_count), Some(2));
}

#[test]
fn serialized_index_round_trips_through_text() {
    let dict: Dictionary = [("кот", "кот"), ("кота", "кот"), ("ёж", "ёж")]
        .into_iter()
        .collect();
    let lines: Vec<String> = (0..100)
        .map(|i| if i % 7 == 0 { "кота и ёж".to_string() } else { format!("кот {i}") })
        .collect();
    let index = WordIndex::build(&number_lines(lines), &dict);
    assert_eq!(deserialize(&serialize(&index)).unwrap(), index);
}
