//! Stylesheet simplification.
//!
//! Only style rules are edited. `@font-face` blocks are left alone in both
//! modes: `css.removed_font_faces` is reported but always zero.

use super::{Rule, RuleOutcome, for_each_stylesheet};
use crate::book::Book;
use crate::css::{CssRule, Declaration, Stylesheet};
use crate::report::Reporter;

const REMOVED: &str = "css.removed_properties";
const MODIFIED: &str = "css.modified_properties";
const REMOVED_FONT_FAMILIES: &str = "css.removed_font_families";
const REMOVED_FONT_FACES: &str = "css.removed_font_faces";

const ABSOLUTE_UNITS: &[&str] = &["px", "pt"];
const MIN_LINE_HEIGHT: f32 = 1.2;

/// Drops absolute body font sizes, cramped or fixed line heights and
/// flex/grid layouts.
pub struct CssSafeRule;

impl Rule for CssSafeRule {
    fn name(&self) -> &'static str {
        "css-safe"
    }

    fn apply(&self, book: &Book, reporter: &mut Reporter) -> RuleOutcome {
        reporter.increment(REMOVED, 0);
        reporter.increment(MODIFIED, 0);
        for_each_stylesheet(book, reporter, |sheet, reporter| {
            let removed = simplify_safe(sheet);
            reporter.increment(REMOVED, removed as u64);
            (removed > 0).then(|| format!("Removed {removed} aggressive CSS properties"))
        })
    }
}

/// Drops every `font-family` declaration.
pub struct CssAggressiveRule;

impl Rule for CssAggressiveRule {
    fn name(&self) -> &'static str {
        "css-aggressive"
    }

    fn apply(&self, book: &Book, reporter: &mut Reporter) -> RuleOutcome {
        reporter.increment(REMOVED_FONT_FAMILIES, 0);
        reporter.increment(REMOVED_FONT_FACES, 0);
        for_each_stylesheet(book, reporter, |sheet, reporter| {
            let removed = remove_font_families(sheet);
            reporter.increment(REMOVED_FONT_FAMILIES, removed as u64);
            (removed > 0).then(|| format!("Removed {removed} font-family declarations"))
        })
    }
}

fn is_root_selector(selector: &str) -> bool {
    let selector = selector.trim();
    selector.eq_ignore_ascii_case("body") || selector.eq_ignore_ascii_case("html")
}

fn is_absolute_font_size(decl: &Declaration) -> bool {
    decl.is("font-size") && decl.has_unit(ABSOLUTE_UNITS)
}

fn is_fixed_line_height(decl: &Declaration) -> bool {
    decl.is("line-height")
        && (decl.has_unit(ABSOLUTE_UNITS)
            || decl.unitless_number().is_some_and(|n| n < MIN_LINE_HEIGHT))
}

fn is_flex_or_grid(decl: &Declaration) -> bool {
    decl.is("display") && (decl.mentions("flex") || decl.mentions("grid"))
}

/// Remove declarations matching `discard` from every style rule whose selector
/// passes `select`. Returns how many were removed.
fn remove_where(
    sheet: &mut Stylesheet,
    select: impl Fn(&str) -> bool,
    discard: impl Fn(&Declaration) -> bool,
) -> usize {
    let mut removed = 0;
    for rule in &mut sheet.rules {
        if let CssRule::Style {
            selector,
            declarations,
        } = rule
            && select(selector.as_str())
        {
            let before = declarations.len();
            declarations.retain(|d| !discard(d));
            removed += before - declarations.len();
        }
    }
    removed
}

pub fn simplify_safe(sheet: &mut Stylesheet) -> usize {
    remove_where(sheet, is_root_selector, is_absolute_font_size)
        + remove_where(sheet, |_| true, is_fixed_line_height)
        + remove_where(sheet, |_| true, is_flex_or_grid)
}

pub fn remove_font_families(sheet: &mut Stylesheet) -> usize {
    remove_where(sheet, |_| true, |d| d.is("font-family"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declarations(sheet: &Stylesheet, index: usize) -> Vec<&str> {
        match &sheet.rules[index] {
            CssRule::Style { declarations, .. } => {
                declarations.iter().map(|d| d.property.as_str()).collect()
            }
            other => panic!("expected style rule, got {other:?}"),
        }
    }

    #[test]
    fn test_safe_body_rule() {
        let mut sheet =
            Stylesheet::parse("body { font-size: 12px; line-height: 1.0; font-family: serif; }");
        assert_eq!(simplify_safe(&mut sheet), 2);
        assert_eq!(declarations(&sheet, 0), vec!["font-family"]);
        assert_eq!(remove_font_families(&mut sheet), 1);
        assert!(declarations(&sheet, 0).is_empty());
    }

    #[test]
    fn test_font_size_only_on_root_selectors() {
        let mut sheet = Stylesheet::parse("p { font-size: 12pt } html { font-size: 1em } HTML { font-size: 9pt }");
        assert_eq!(simplify_safe(&mut sheet), 1);
        assert_eq!(declarations(&sheet, 0), vec!["font-size"]);
        assert_eq!(declarations(&sheet, 1), vec!["font-size"]);
        assert!(declarations(&sheet, 2).is_empty());
    }

    #[test]
    fn test_line_height_and_display() {
        let mut sheet = Stylesheet::parse(
            ".a { line-height: 1.5; display: block } .b { line-height: 18px; display: inline-flex } .c { line-height: 1.1; display: grid }",
        );
        assert_eq!(simplify_safe(&mut sheet), 4);
        assert_eq!(declarations(&sheet, 0), vec!["line-height", "display"]);
        assert!(declarations(&sheet, 1).is_empty());
        assert!(declarations(&sheet, 2).is_empty());
    }

    #[test]
    fn test_font_face_untouched() {
        let mut sheet = Stylesheet::parse("@font-face { font-family: Foo; src: url(foo.otf) }");
        assert_eq!(remove_font_families(&mut sheet), 0);
        assert!(matches!(&sheet.rules[0], CssRule::FontFace { declarations } if declarations.len() == 2));
    }
}
