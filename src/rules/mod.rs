//! Structural repair rules and the pipeline that runs them.
//!
//! ## Pipeline Order
//!
//! 1. **Headings** - Promote class-styled paragraphs, lift nested headings
//! 2. **Paragraphs** - Inline-only divs become paragraphs, redundant breaks go
//! 3. **Lists** - Marker-prefixed paragraph runs become lists
//! 4. **Breaks** - Classify page breaks and scene breaks
//! 5. **Images** - Add missing alt text
//! 6. **CSS (safe)** - Drop layout-hostile declarations
//! 7. **CSS (aggressive)** - Drop font families, aggressive mode only
//!
//! Every rule reads, edits and writes its own files. A rule that fails or
//! panics is recorded in the change log and the pipeline moves on.

mod breaks;
mod css_cleanup;
mod headings;
mod images;
mod lists;
mod paragraphs;
mod predicates;

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use serde::Serialize;

pub use breaks::BreakRule;
pub use css_cleanup::{CssAggressiveRule, CssSafeRule};
pub use headings::HeadingRule;
pub use images::ImageRule;
pub use lists::ListRule;
pub use paragraphs::ParagraphRule;

use crate::book::Book;
use crate::css::Stylesheet;
use crate::dom::{self, Document};
use crate::report::Reporter;

/// Which rule set to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Safe,
    Aggressive,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Safe => f.write_str("safe"),
            Mode::Aggressive => f.write_str("aggressive"),
        }
    }
}

/// Result of applying one rule to a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    Ok,
    Failed {
        file: Option<PathBuf>,
        reason: String,
    },
}

/// A repair rule: reads the files it cares about, edits them, writes them
/// back and reports what changed.
pub trait Rule {
    fn name(&self) -> &'static str;

    fn apply(&self, book: &Book, reporter: &mut Reporter) -> RuleOutcome;
}

/// Ordered rule set for one mode.
pub struct Pipeline {
    mode: Mode,
    rules: Vec<Box<dyn Rule>>,
}

impl Pipeline {
    pub fn new(mode: Mode) -> Self {
        let mut rules: Vec<Box<dyn Rule>> = vec![
            Box::new(HeadingRule),
            Box::new(ParagraphRule),
            Box::new(ListRule),
            Box::new(BreakRule),
            Box::new(ImageRule),
            Box::new(CssSafeRule),
        ];
        if mode == Mode::Aggressive {
            rules.push(Box::new(CssAggressiveRule));
        }
        Self { mode, rules }
    }

    /// Build a pipeline from an explicit rule list.
    pub fn with_rules(mode: Mode, rules: Vec<Box<dyn Rule>>) -> Self {
        Self { mode, rules }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Apply every rule in order. Failures are logged against the file being
    /// processed when known, `unknown` otherwise.
    pub fn run(&self, book: &Book, reporter: &mut Reporter) {
        tracing::info!(mode = %self.mode, rules = self.rules.len(), "running repair pipeline");
        for rule in &self.rules {
            reporter.set_current_file(None);
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| rule.apply(book, reporter)))
                .unwrap_or_else(|payload| RuleOutcome::Failed {
                    file: None,
                    reason: panic_message(payload.as_ref()),
                });

            if let RuleOutcome::Failed { file, reason } = outcome {
                let file = file
                    .map(|f| book.display_path(&f))
                    .or_else(|| reporter.current_file().map(String::from))
                    .unwrap_or_else(|| "unknown".to_string());
                tracing::warn!(rule = rule.name(), file = %file, "rule failed: {reason}");
                reporter.log_change(file, format!("Rule {} failed: {reason}", rule.name()));
            }
        }
        reporter.set_current_file(None);
        tracing::info!(
            files = reporter.total_files_modified(),
            "repair pipeline finished"
        );
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

/// Load each spine content document, let `edit` change it, and write it back
/// when `edit` returns a change description.
///
/// Each document stands alone: one that cannot be read, edited or written is
/// logged as "Error processing" and the rest are still processed. Missing
/// documents only produce a warning.
pub(crate) fn for_each_document<F>(book: &Book, reporter: &mut Reporter, mut edit: F) -> RuleOutcome
where
    F: FnMut(&mut Document, &mut Reporter) -> Option<String>,
{
    for path in book.content_documents() {
        if !path.is_file() {
            tracing::warn!("content document {} not found", path.display());
            continue;
        }
        let display = book.display_path(path);
        reporter.set_current_file(Some(display.clone()));

        let result = dom::load_markup(path).map_err(|e| e.to_string()).and_then(|mut doc| {
            match guarded(|| edit(&mut doc, reporter))? {
                Some(description) => dom::save_xhtml(&doc, path)
                    .map(|()| Some(description))
                    .map_err(|e| e.to_string()),
                None => Ok(None),
            }
        });
        record(reporter, display, result);
    }
    RuleOutcome::Ok
}

/// Stylesheet counterpart of [`for_each_document`].
pub(crate) fn for_each_stylesheet<F>(book: &Book, reporter: &mut Reporter, mut edit: F) -> RuleOutcome
where
    F: FnMut(&mut Stylesheet, &mut Reporter) -> Option<String>,
{
    for path in book.stylesheets() {
        if !path.is_file() {
            tracing::warn!("stylesheet {} not found", path.display());
            continue;
        }
        let display = book.display_path(&path);
        reporter.set_current_file(Some(display.clone()));

        let result = std::fs::read(&path).map_err(|e| e.to_string()).and_then(|bytes| {
            let mut sheet = Stylesheet::parse(&crate::util::decode_text(&bytes, None));
            match guarded(|| edit(&mut sheet, reporter))? {
                Some(description) => std::fs::write(&path, sheet.to_css())
                    .map(|()| Some(description))
                    .map_err(|e| e.to_string()),
                None => Ok(None),
            }
        });
        record(reporter, display, result);
    }
    RuleOutcome::Ok
}

/// Run one file's edit, turning a panic into an error message.
fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

fn record(reporter: &mut Reporter, file: String, result: Result<Option<String>, String>) {
    match result {
        Ok(Some(description)) => reporter.log_change(file, description),
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(file = %file, "error processing: {e}");
            reporter.log_change(file, format!("Error processing: {e}"));
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeMap;
    use std::fs;
    use std::path::Path;

    use crate::book::{Book, CSS_MEDIA_TYPE, ManifestItem, SpineItem, XHTML_MEDIA_TYPE};

    /// Write `docs` and `sheets` under `root` and describe them as a book.
    pub fn book_with(root: &Path, docs: &[(&str, &str)], sheets: &[(&str, &str)]) -> Book {
        let mut manifest = BTreeMap::new();
        let mut spine = Vec::new();
        for (i, (name, body)) in docs.iter().enumerate() {
            let path = root.join(name);
            fs::write(&path, body).unwrap();
            let id = format!("doc{i}");
            let item = ManifestItem::new(id.clone(), *name, XHTML_MEDIA_TYPE).unwrap();
            manifest.insert(id.clone(), item);
            spine.push(SpineItem::new(id, path));
        }
        for (i, (name, body)) in sheets.iter().enumerate() {
            fs::write(root.join(name), body).unwrap();
            let id = format!("css{i}");
            let item = ManifestItem::new(id.clone(), *name, CSS_MEDIA_TYPE).unwrap();
            manifest.insert(id, item);
        }
        Book::new(root, root.join("content.opf"), spine, manifest).unwrap()
    }

    pub fn xhtml(body: &str) -> String {
        format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<html xmlns=\"http://www.w3.org/1999/xhtml\"><head><title>t</title></head><body>{body}</body></html>"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{book_with, xhtml};
    use super::*;

    struct Exploding;

    impl Rule for Exploding {
        fn name(&self) -> &'static str {
            "exploding"
        }

        fn apply(&self, book: &Book, reporter: &mut Reporter) -> RuleOutcome {
            for_each_document(book, reporter, |_, _| panic!("boom"))
        }
    }

    struct Refusing;

    impl Rule for Refusing {
        fn name(&self) -> &'static str {
            "refusing"
        }

        fn apply(&self, _book: &Book, _reporter: &mut Reporter) -> RuleOutcome {
            RuleOutcome::Failed {
                file: None,
                reason: "nope".into(),
            }
        }
    }

    #[test]
    fn test_rule_sets() {
        let safe = Pipeline::new(Mode::Safe).rule_names();
        let aggressive = Pipeline::new(Mode::Aggressive).rule_names();
        assert_eq!(
            safe,
            vec!["headings", "paragraphs", "lists", "breaks", "images", "css-safe"]
        );
        assert_eq!(&aggressive[..safe.len()], &safe[..]);
        assert_eq!(aggressive.last(), Some(&"css-aggressive"));
    }

    #[test]
    fn test_failures_do_not_stop_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let book = book_with(
            dir.path(),
            &[("ch1.xhtml", &xhtml("<img src=\"a.png\"/>"))],
            &[],
        );
        let pipeline = Pipeline::with_rules(
            Mode::Safe,
            vec![Box::new(Exploding), Box::new(Refusing), Box::new(ImageRule)],
        );
        let mut reporter = Reporter::new();
        pipeline.run(&book, &mut reporter);

        let changes = reporter.changes();
        assert_eq!(changes[0].file, "ch1.xhtml");
        assert_eq!(changes[0].description, "Error processing: boom");
        assert_eq!(changes[1].file, "unknown");
        assert_eq!(changes[1].description, "Rule refusing failed: nope");
        assert_eq!(reporter.counter("images.added_alt"), Some(1));
    }

    #[test]
    fn test_failing_document_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let book = book_with(
            &root,
            &[
                ("ch1.xhtml", &xhtml("<img src=\"a.png\"/>")),
                ("ch2.xhtml", &xhtml("<img src=\"b.png\"/>")),
                ("ch3.xhtml", &xhtml("<img src=\"c.png\"/>")),
            ],
            &[],
        );
        let mut reporter = Reporter::new();
        let mut calls = 0;
        let outcome = for_each_document(&book, &mut reporter, |doc, _| {
            calls += 1;
            match calls {
                1 => panic!("bad markup"),
                2 => {
                    // A directory in place of the file makes the write fail.
                    std::fs::remove_file(root.join("ch2.xhtml")).unwrap();
                    std::fs::create_dir(root.join("ch2.xhtml")).unwrap();
                    Some("edited".to_string())
                }
                _ => (images::add_missing_alt(doc) > 0).then(|| "edited".to_string()),
            }
        });
        assert_eq!(outcome, RuleOutcome::Ok);

        let changes = reporter.changes();
        assert_eq!(changes.len(), 3);
        assert_eq!(changes[0].file, "ch1.xhtml");
        assert_eq!(changes[0].description, "Error processing: bad markup");
        assert_eq!(changes[1].file, "ch2.xhtml");
        assert!(changes[1].description.starts_with("Error processing: "));
        assert_eq!(changes[2].file, "ch3.xhtml");
        assert_eq!(changes[2].description, "edited");
        let repaired = std::fs::read_to_string(root.join("ch3.xhtml")).unwrap();
        assert!(repaired.contains(r#"alt="""#));
    }

    #[test]
    fn test_failing_stylesheet_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let book = book_with(
            dir.path(),
            &[],
            &[("a.css", "p { color: red }"), ("b.css", "p { display: flex }")],
        );
        let mut reporter = Reporter::new();
        let mut first = true;
        for_each_stylesheet(&book, &mut reporter, |sheet, _| {
            if std::mem::take(&mut first) {
                panic!("bad sheet");
            }
            (css_cleanup::simplify_safe(sheet) > 0).then(|| "edited".to_string())
        });

        let changes = reporter.changes();
        assert_eq!(changes[0].file, "a.css");
        assert_eq!(changes[0].description, "Error processing: bad sheet");
        assert_eq!(changes[1].file, "b.css");
        let css = std::fs::read_to_string(dir.path().join("b.css")).unwrap();
        assert!(!css.contains("flex"));
    }

    #[test]
    fn test_missing_document_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let book = book_with(dir.path(), &[("ch1.xhtml", &xhtml("<p>x</p>"))], &[]);
        std::fs::remove_file(dir.path().join("ch1.xhtml")).unwrap();
        let mut reporter = Reporter::new();
        Pipeline::new(Mode::Safe).run(&book, &mut reporter);
        assert!(reporter.changes().is_empty());
    }

    #[test]
    fn test_mode_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Mode::Aggressive).unwrap(), "\"aggressive\"");
        assert_eq!(Mode::Safe.to_string(), "safe");
    }
}
