use std::io::Write;
use std::path::PathBuf;

use tempfile::NamedTempFile;
use textindex_dict::{Dictionary, DictionaryError, DictionaryOptions, LoadMode, SourceEncoding};

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("odict.csv")
}

#[test]
fn loads_fixture_with_both_modes() {
    let mmap = Dictionary::load(fixture()).expect("load via mmap");
    let owned = Dictionary::load_with_options(
        fixture(),
        &DictionaryOptions {
            mode: LoadMode::Owned,
            ..DictionaryOptions::default()
        },
    )
    .expect("load owned");
    assert_eq!(mmap, owned);
    assert_eq!(mmap.lemma_for("бежит"), Some("бежать"));
    assert_eq!(mmap.lemma_for("котом"), Some("кот"));
    assert_eq!(mmap.lemma_for("селу"), Some("село"));
}

#[test]
fn closed_class_forms_never_appear() {
    let dict = Dictionary::load(fixture()).unwrap();
    for form in ["и", "в", "во", "же", "ах", "а"] {
        assert!(!dict.contains(form), "{form} leaked into the dictionary");
    }
    assert_eq!(dict.len(), 12);
}

#[test]
fn missing_source_is_reported() {
    let err = Dictionary::load("/definitely/not/here/odict.csv").unwrap_err();
    assert!(matches!(err, DictionaryError::Missing(_)));
}

#[test]
fn empty_source_loads_empty_dictionary() {
    let file = NamedTempFile::new().unwrap();
    let dict = Dictionary::load(file.path()).expect("empty file is valid");
    assert!(dict.is_empty());
}

#[test]
fn reads_windows_1251_source() {
    let mut file = NamedTempFile::new().unwrap();
    // "кот,м,кота" in code page 1251.
    file.write_all(&[0xea, 0xee, 0xf2, b',', 0xec, b',', 0xea, 0xee, 0xf2, 0xe0, b'\n'])
        .unwrap();
    let options = DictionaryOptions {
        encoding: SourceEncoding::Windows1251,
        ..DictionaryOptions::default()
    };
    let dict = Dictionary::load_with_options(file.path(), &options).unwrap();
    assert_eq!(dict.lemma_for("кота"), Some("кот"));
}

#[test]
fn short_row_fails_the_load() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "кот,м,кота").unwrap();
    writeln!(file, "одинокий").unwrap();
    let err = Dictionary::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("row 2"), "{err}");
}
