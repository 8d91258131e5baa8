//! Quantified pipeline properties over generated books.

mod common;

use common::EpubFixture;
use epubfix::epub::open_book;
use epubfix::{Mode, Pipeline, Reporter};
use proptest::prelude::*;
use tempfile::TempDir;

/// Body fragments covering every rule: fake headings, stray headings,
/// markers, divs, break runs, page breaks, images and blank paragraphs
/// nested in otherwise inline divs.
const FRAGMENTS: &[&str] = &[
    "<p>Plain paragraph text.</p>",
    "<p></p>",
    r#"<p class="heading1">Chapter One</p>"#,
    r#"<p class="chapter">Part Two</p>"#,
    "<h2>Chapter Three</h2>",
    "<h1>Prologue</h1>",
    "<p><h2>Chapter Four</h2></p>",
    "<p>- Bullet item</p>",
    "<p>1. Numbered item</p>",
    "<div>Inline <em>div</em> text</div>",
    "<div><p>Nested block</p></div>",
    "<p>Line one<br/><br/><br/>Line two</p>",
    "<p>Ends with a break<br/></p>",
    r#"<p style="page-break-before: always">Styled text</p>"#,
    r#"<p class="pagebreak"></p>"#,
    r#"<p><img src="figure.png"/></p>"#,
    "<div>Text<p></p></div>",
    "<div>a<br/><p></p><br/>b</div>",
    "<div>Closing line<br/><p></p></div>",
    r#"<div class="chapter">Chapter Five<p></p></div>"#,
];

const CSS_RULES: &[&str] = &[
    "body { font-size: 12px; line-height: 1.0; font-family: serif; }",
    "p { line-height: 1.5; margin: 0 }",
    ".box { display: flex; }",
    "h1 { font-family: Georgia, serif; font-size: 2em }",
    "@font-face { font-family: Custom; src: url(custom.otf) }",
    "@media screen { p { display: grid } }",
];

fn fixture(docs: &[Vec<usize>], css: &[usize]) -> EpubFixture {
    let mut fixture = EpubFixture::new();
    for (i, picks) in docs.iter().enumerate() {
        let body: Vec<&str> = picks.iter().map(|&p| FRAGMENTS[p]).collect();
        fixture = fixture.document(&format!("ch{i}.xhtml"), &body.join("\n"));
    }
    let sheet: Vec<&str> = css.iter().map(|&c| CSS_RULES[c]).collect();
    fixture.stylesheet("style.css", &sheet.join("\n"))
}

/// Open the book extracted in `dir` and run `mode` over it once.
fn run_once(dir: &TempDir, mode: Mode) -> Reporter {
    let book = open_book(dir.path()).unwrap();
    let mut reporter = Reporter::new();
    Pipeline::new(mode).run(&book, &mut reporter);
    reporter
}

fn book_strategy() -> impl Strategy<Value = (Vec<Vec<usize>>, Vec<usize>)> {
    (
        prop::collection::vec(prop::collection::vec(0..FRAGMENTS.len(), 1..10), 1..3),
        prop::collection::vec(0..CSS_RULES.len(), 0..6),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn safe_is_subset_of_aggressive((docs, css) in book_strategy()) {
        let fixture = fixture(&docs, &css);

        let safe_dir = TempDir::new().unwrap();
        fixture.write_dir(safe_dir.path());
        let safe = run_once(&safe_dir, Mode::Safe);

        let aggressive_dir = TempDir::new().unwrap();
        fixture.write_dir(aggressive_dir.path());
        let aggressive = run_once(&aggressive_dir, Mode::Aggressive);

        for (category, count) in safe.counters() {
            prop_assert_eq!(aggressive.counter(category), Some(*count), "{}", category);
        }
        prop_assert!(aggressive.changes().len() >= safe.changes().len());
        prop_assert_eq!(&aggressive.changes()[..safe.changes().len()], safe.changes());
    }

    #[test]
    fn safe_pipeline_is_idempotent((docs, css) in book_strategy()) {
        let fixture = fixture(&docs, &css);
        let dir = TempDir::new().unwrap();
        fixture.write_dir(dir.path());

        run_once(&dir, Mode::Safe);
        let second = run_once(&dir, Mode::Safe);

        for (category, count) in second.counters() {
            prop_assert_eq!(*count, 0, "{} fired again", category);
        }
        prop_assert!(second.changes().is_empty(), "{:?}", second.changes());
    }
}
