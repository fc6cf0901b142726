use super::*;
use std::io::Write;
use tempfile::TempDir;

fn sample_book() -> BookRecord {
    BookRecord {
        isbn13: 9780002005883,
        title: "Gilead".to_string(),
        authors: "Marilynne Robinson".to_string(),
        description: "A novel about the reverend John Ames, written as a letter to his young son, \
            reflecting on three generations of fathers and sons in a small Iowa town during \
            hard and hopeful years alike."
            .to_string(),
        simple_categories: "Fiction".to_string(),
        joy: 0.4,
        surprise: 0.1,
        anger: 0.05,
        fear: 0.1,
        sadness: 0.3,
        thumbnail: Some("http://books.google.com/books/content?id=KQZCPgAACAAJ".to_string()),
    }
}

#[test]
fn large_thumbnail_upscales_url() {
    let book = sample_book();
    assert_eq!(
        book.large_thumbnail(),
        "http://books.google.com/books/content?id=KQZCPgAACAAJ&fife=w800"
    );
}

#[test]
fn missing_thumbnail_uses_placeholder() {
    let mut book = sample_book();
    book.thumbnail = None;
    assert_eq!(book.large_thumbnail(), FALLBACK_THUMBNAIL);

    book.thumbnail = Some("   ".to_string());
    assert_eq!(book.large_thumbnail(), FALLBACK_THUMBNAIL);
}

#[test]
fn single_author_passes_through() {
    let book = sample_book();
    assert_eq!(book.formatted_authors(), "Marilynne Robinson");
}

#[test]
fn two_authors_join_with_space() {
    let mut book = sample_book();
    book.authors = "Terry Pratchett;Neil Gaiman".to_string();
    assert_eq!(book.formatted_authors(), "Terry Pratchett Neil Gaiman");
}

#[test]
fn three_authors_join_with_commas_and_and() {
    let mut book = sample_book();
    book.authors = "Anne Rice;Stan Rice;Christopher Rice".to_string();
    assert_eq!(
        book.formatted_authors(),
        "Anne Rice, Stan Rice and Christopher Rice"
    );
}

#[test]
fn four_authors_join_with_commas_and_and() {
    let mut book = sample_book();
    book.authors = "A;B;C;D".to_string();
    assert_eq!(book.formatted_authors(), "A, B, C and D");
}

#[test]
fn caption_truncates_to_thirty_words() {
    let book = sample_book();
    let caption = book.caption();

    assert!(caption.ends_with("..."));
    let word_count = caption.trim_end_matches("...").split_whitespace().count();
    assert_eq!(word_count, 30);
}

#[test]
fn short_description_is_not_truncated() {
    let mut book = sample_book();
    book.description = "A short tale.".to_string();
    assert_eq!(book.caption(), "A short tale.");
}

#[test]
fn gallery_caption_includes_title_and_authors() {
    let mut book = sample_book();
    book.description = "A short tale.".to_string();
    assert_eq!(
        book.gallery_caption(),
        "Gilead by Marilynne Robinson: A short tale."
    );
}

#[test]
fn tone_parsing() {
    assert_eq!(Tone::parse("Happy"), Some(Tone::Happy));
    assert_eq!(Tone::parse("Suspenseful"), Some(Tone::Suspenseful));
    assert_eq!(Tone::parse("All"), None);
    assert_eq!(Tone::parse("Melancholy"), None);
}

#[test]
fn tone_scores_map_to_emotions() {
    let book = sample_book();
    assert!((Tone::Happy.score(&book) - 0.4).abs() < f64::EPSILON);
    assert!((Tone::Suspenseful.score(&book) - 0.1).abs() < f64::EPSILON);
    assert!((Tone::Sad.score(&book) - 0.3).abs() < f64::EPSILON);
}

#[test]
fn catalog_lookup_by_isbn() {
    let catalog = BookCatalog::from_records(vec![sample_book()]);
    assert_eq!(catalog.len(), 1);
    assert!(catalog.get(9780002005883).is_some());
    assert!(catalog.get(1).is_none());
}

#[test]
fn categories_are_sorted_and_deduped() {
    let mut fiction = sample_book();
    fiction.isbn13 = 1;
    let mut nonfiction = sample_book();
    nonfiction.isbn13 = 2;
    nonfiction.simple_categories = "Nonfiction".to_string();
    let mut fiction_again = sample_book();
    fiction_again.isbn13 = 3;

    let catalog = BookCatalog::from_records(vec![nonfiction, fiction, fiction_again]);
    assert_eq!(catalog.categories(), vec!["All", "Fiction", "Nonfiction"]);
}

#[test]
fn tone_choices_include_all() {
    let tones = BookCatalog::tones();
    assert_eq!(tones[0], "All");
    assert!(tones.contains(&"Suspenseful".to_string()));
    assert_eq!(tones.len(), 6);
}

#[test]
fn load_catalog_from_csv() {
    let temp_dir = TempDir::new().expect("temp dir");
    let csv_path = temp_dir.path().join("books.csv");
    let mut file = std::fs::File::create(&csv_path).expect("create csv");
    writeln!(
        file,
        "isbn13,title,authors,description,simple_categories,joy,surprise,anger,fear,sadness,thumbnail"
    )
    .expect("write header");
    writeln!(
        file,
        "9780002005883,Gilead,Marilynne Robinson,\"A novel, with a comma in its description.\",Fiction,0.4,0.1,0.05,0.1,0.3,http://example.com/cover"
    )
    .expect("write row");
    writeln!(
        file,
        "9780002261982,Spider's Web,Charles Osborne;Agatha Christie,A spy thriller.,Fiction,0.2,0.3,0.1,0.4,0.1,"
    )
    .expect("write row");
    drop(file);

    let catalog = BookCatalog::load(&csv_path).expect("catalog loads");
    assert_eq!(catalog.len(), 2);

    let gilead = catalog.get(9780002005883).expect("gilead present");
    assert_eq!(gilead.description, "A novel, with a comma in its description.");

    let web = catalog.get(9780002261982).expect("spider's web present");
    assert_eq!(web.formatted_authors(), "Charles Osborne Agatha Christie");
    assert_eq!(web.large_thumbnail(), FALLBACK_THUMBNAIL);
}
