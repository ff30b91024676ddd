use std::fs;
use std::path::Path;
use tempfile::TempDir;

use docqa_core::chunker::{Chunker, ChunkingConfig};
use docqa_core::loader::{discover, load_pages};
use docqa_core::Error;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Object, Stream};

fn write_pdf(path: &Path, text: &str) {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

#[test]
fn discover_empty_folder_yields_nothing() {
    let tmp = TempDir::new().unwrap();
    assert!(discover(tmp.path()).is_empty());
    assert!(discover(&tmp.path().join("missing")).is_empty());
}

#[test]
fn discover_is_recursive_and_filters_extensions() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("nested/deeper")).unwrap();
    fs::write(dir.join("b.txt"), "b").unwrap();
    fs::write(dir.join("a.pdf"), "a").unwrap();
    fs::write(dir.join("nested/deeper/c.txt"), "c").unwrap();
    fs::write(dir.join("nested/notes.md"), "skip").unwrap();
    fs::write(dir.join("image.png"), "skip").unwrap();

    let found = discover(dir);
    let names: Vec<_> = found.iter().map(|p| p.strip_prefix(dir).unwrap().to_string_lossy().to_string()).collect();
    assert_eq!(names, vec!["a.pdf", "b.txt", "nested/deeper/c.txt"]);
}

#[test]
fn text_file_chunks_carry_document_metadata() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("notes.txt");
    fs::write(&path, "First paragraph.\n\nSecond paragraph.").unwrap();

    let chunker = Chunker::with_heuristic(ChunkingConfig::default());
    let chunks = chunker.chunk_file(&path, true).expect("chunk");
    assert_eq!(chunks.len(), 1, "small peers merge into one chunk");
    let meta = &chunks[0].metadata;
    assert_eq!(meta.filename, "notes.txt");
    assert_eq!(meta.source_path, path.to_string_lossy());
    assert!(meta.is_permanent);
    assert!(chunks[0].content.contains("Second paragraph."));
}

#[test]
fn pdf_text_is_extracted() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("hello.pdf");
    write_pdf(&path, "Hello from a generated PDF");

    let pages = load_pages(&path).expect("load pdf");
    assert_eq!(pages.len(), 1);
    assert!(pages[0].contains("Hello from a generated PDF"), "got {:?}", pages[0]);
}

#[test]
fn malformed_pdf_is_an_ingestion_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("broken.pdf");
    fs::write(&path, b"this is not a pdf").unwrap();

    let err = Chunker::with_heuristic(ChunkingConfig::default()).chunk_file(&path, false).unwrap_err();
    match err {
        Error::Ingestion { path: p, .. } => assert!(p.ends_with("broken.pdf")),
        other => panic!("expected ingestion error, got {other:?}"),
    }
}

#[test]
fn unsupported_and_missing_files_are_ingestion_errors() {
    let tmp = TempDir::new().unwrap();
    let md = tmp.path().join("readme.md");
    fs::write(&md, "# title").unwrap();
    let chunker = Chunker::with_heuristic(ChunkingConfig::default());
    assert!(matches!(chunker.chunk_file(&md, true), Err(Error::Ingestion { .. })));
    assert!(matches!(chunker.chunk_file(&tmp.path().join("gone.txt"), true), Err(Error::Ingestion { .. })));
}
