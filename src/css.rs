//! Stylesheet engine: a rule-level CSS model on top of cssparser.
//!
//! Selectors, declaration values and unknown at-rule bodies are kept as the
//! raw source text, so rewriting a stylesheet only changes what a rule edits.
//! Value predicates re-tokenize the raw text instead of matching substrings.

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, ParserState,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser, StyleSheetParser, Token,
};

/// A single `property: value` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Property name as written.
    pub property: String,
    /// Raw value text, including any `!important`.
    pub value: String,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }

    /// Case-insensitive property name comparison.
    pub fn is(&self, property: &str) -> bool {
        self.property.eq_ignore_ascii_case(property)
    }

    /// The value contains a dimension in one of the given units.
    pub fn has_unit(&self, units: &[&str]) -> bool {
        value_tokens(&self.value).iter().any(|t| {
            matches!(t, Token::Dimension { unit, .. }
                if units.iter().any(|u| unit.eq_ignore_ascii_case(u)))
        })
    }

    /// The value is a single unitless number (optionally `!important`).
    pub fn unitless_number(&self) -> Option<f32> {
        let tokens = value_tokens(&self.value);
        match tokens.as_slice() {
            [Token::Number { value, .. }] => Some(*value),
            [Token::Number { value, .. }, Token::Delim('!'), Token::Ident(important)]
                if important.eq_ignore_ascii_case("important") =>
            {
                Some(*value)
            }
            _ => None,
        }
    }

    /// Some identifier in the value contains `keyword` (case-insensitive).
    pub fn mentions(&self, keyword: &str) -> bool {
        value_tokens(&self.value).iter().any(|t| {
            matches!(t, Token::Ident(ident) if ident.to_ascii_lowercase().contains(keyword))
        })
    }
}

/// Top-level (non-whitespace) tokens of a raw value.
fn value_tokens(value: &str) -> Vec<Token<'_>> {
    let mut input = ParserInput::new(value);
    let mut parser = Parser::new(&mut input);
    let mut tokens = Vec::new();
    while let Ok(token) = parser.next() {
        tokens.push(token.clone());
    }
    tokens
}

/// One top-level rule.
#[derive(Debug, Clone, PartialEq)]
pub enum CssRule {
    /// `selector { declarations }`
    Style {
        selector: String,
        declarations: Vec<Declaration>,
    },
    /// `@font-face { declarations }`
    FontFace { declarations: Vec<Declaration> },
    /// Any other at-rule, kept verbatim. `block` is the text between braces.
    At {
        name: String,
        prelude: String,
        block: Option<String>,
    },
}

/// An ordered list of rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    pub rules: Vec<CssRule>,
}

impl Stylesheet {
    /// Parse a CSS stylesheet. Invalid rules are dropped the way browsers
    /// drop them.
    pub fn parse(css: &str) -> Self {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut rules = Vec::new();

        let mut rule_parser = TopLevelRuleParser { rules: &mut rules };
        let stylesheet_parser = StyleSheetParser::new(&mut parser, &mut rule_parser);

        for result in stylesheet_parser {
            // Lenient: skip rules that fail to parse
            let _ = result;
        }

        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Serialize back to CSS text, one rule per block.
    pub fn to_css(&self) -> String {
        let mut out = String::new();
        for (i, rule) in self.rules.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            match rule {
                CssRule::Style {
                    selector,
                    declarations,
                } => write_block(&mut out, selector, declarations),
                CssRule::FontFace { declarations } => {
                    write_block(&mut out, "@font-face", declarations)
                }
                CssRule::At {
                    name,
                    prelude,
                    block,
                } => {
                    out.push('@');
                    out.push_str(name);
                    if !prelude.is_empty() {
                        out.push(' ');
                        out.push_str(prelude);
                    }
                    match block {
                        Some(body) => {
                            out.push_str(" {");
                            out.push_str(body);
                            out.push_str("}\n");
                        }
                        None => out.push_str(";\n"),
                    }
                }
            }
        }
        out
    }
}

fn write_block(out: &mut String, head: &str, declarations: &[Declaration]) {
    out.push_str(head);
    out.push_str(" {\n");
    for decl in declarations {
        out.push_str("  ");
        out.push_str(&decl.property);
        out.push_str(": ");
        out.push_str(&decl.value);
        out.push_str(";\n");
    }
    out.push_str("}\n");
}

/// Consume the rest of the input and return its source text.
fn consume_raw<'i>(input: &mut Parser<'i, '_>) -> &'i str {
    let start = input.position();
    while input.next_including_whitespace_and_comments().is_ok() {}
    input.slice_from(start)
}

/// Parser for top-level stylesheet rules.
struct TopLevelRuleParser<'a> {
    rules: &'a mut Vec<CssRule>,
}

impl<'i> AtRuleParser<'i> for TopLevelRuleParser<'_> {
    type Prelude = (String, String);
    type AtRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let prelude = consume_raw(input).trim().to_string();
        Ok((name.to_string(), prelude))
    }

    fn rule_without_block(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
    ) -> Result<Self::AtRule, ()> {
        let (name, prelude) = prelude;
        self.rules.push(CssRule::At {
            name,
            prelude,
            block: None,
        });
        Ok(())
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        let (name, prelude) = prelude;
        if name.eq_ignore_ascii_case("font-face") {
            self.rules.push(CssRule::FontFace {
                declarations: parse_declarations(input),
            });
        } else {
            self.rules.push(CssRule::At {
                name,
                prelude,
                block: Some(consume_raw(input).to_string()),
            });
        }
        Ok(())
    }
}

impl<'i> QualifiedRuleParser<'i> for TopLevelRuleParser<'_> {
    type Prelude = String;
    type QualifiedRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let selector = consume_raw(input).trim();
        if selector.is_empty() {
            return Err(input.new_custom_error(()));
        }
        Ok(selector.to_string())
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        self.rules.push(CssRule::Style {
            selector: prelude,
            declarations: parse_declarations(input),
        });
        Ok(())
    }
}

fn parse_declarations(input: &mut Parser<'_, '_>) -> Vec<Declaration> {
    let mut declarations = Vec::new();
    let mut decl_parser = DeclarationListParser {
        declarations: &mut declarations,
    };
    for result in RuleBodyParser::new(input, &mut decl_parser) {
        // Lenient: invalid declarations are dropped
        let _ = result;
    }
    declarations
}

struct DeclarationListParser<'a> {
    declarations: &'a mut Vec<Declaration>,
}

impl<'i> AtRuleParser<'i> for DeclarationListParser<'_> {
    type Prelude = ();
    type AtRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        _name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }
}

impl<'i> QualifiedRuleParser<'i> for DeclarationListParser<'_> {
    type Prelude = ();
    type QualifiedRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Err(input.new_custom_error(()))
    }
}

impl<'i> DeclarationParser<'i> for DeclarationListParser<'_> {
    type Declaration = ();
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let value = consume_raw(input).trim();
        if value.is_empty() {
            return Err(input.new_custom_error(()));
        }
        self.declarations
            .push(Declaration::new(name.to_string(), value.to_string()));
        Ok(())
    }
}

impl<'i> RuleBodyItemParser<'i, (), ()> for DeclarationListParser<'_> {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn style_rule(sheet: &Stylesheet, index: usize) -> (&str, &[Declaration]) {
        match &sheet.rules[index] {
            CssRule::Style {
                selector,
                declarations,
            } => (selector.as_str(), declarations.as_slice()),
            other => panic!("expected style rule, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_style_rules() {
        let sheet = Stylesheet::parse(
            "body { font-size: 12px; line-height: 1.0 }\np.note, .x > a { color: red !important; }",
        );
        assert_eq!(sheet.rules.len(), 2);

        let (selector, decls) = style_rule(&sheet, 0);
        assert_eq!(selector, "body");
        assert_eq!(decls[0], Declaration::new("font-size", "12px"));
        assert_eq!(decls[1], Declaration::new("line-height", "1.0"));

        let (selector, decls) = style_rule(&sheet, 1);
        assert_eq!(selector, "p.note, .x > a");
        assert_eq!(decls[0].value, "red !important");
    }

    #[test]
    fn test_parse_at_rules() {
        let sheet = Stylesheet::parse(
            "@charset \"utf-8\";\n@import url(base.css);\n@font-face { font-family: Foo; src: url(foo.otf); }\n@media screen { p { margin: 0 } }",
        );
        // cssparser consumes a leading @charset; output is always UTF-8
        assert_eq!(sheet.rules.len(), 3);
        assert!(matches!(&sheet.rules[0], CssRule::At { name, block: None, .. } if name == "import"));
        assert!(matches!(&sheet.rules[1], CssRule::FontFace { declarations } if declarations.len() == 2));
        match &sheet.rules[2] {
            CssRule::At {
                name,
                prelude,
                block: Some(block),
            } => {
                assert_eq!(name, "media");
                assert_eq!(prelude, "screen");
                assert!(block.contains("p { margin: 0 }"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_invalid_declarations_dropped() {
        let sheet = Stylesheet::parse("p { color: ; margin: 0; }");
        let (_, decls) = style_rule(&sheet, 0);
        assert_eq!(decls, &[Declaration::new("margin", "0")]);
    }

    #[test]
    fn test_round_trip() {
        let sheet = Stylesheet::parse("h1{color:red;margin:0 auto}");
        let css = sheet.to_css();
        assert_eq!(css, "h1 {\n  color: red;\n  margin: 0 auto;\n}\n");
        assert_eq!(Stylesheet::parse(&css), sheet);
    }

    #[test]
    fn test_unit_detection() {
        assert!(Declaration::new("font-size", "12px").has_unit(&["px", "pt"]));
        assert!(Declaration::new("font-size", "10PT").has_unit(&["px", "pt"]));
        assert!(!Declaration::new("font-size", "1.2em").has_unit(&["px", "pt"]));
        assert!(!Declaration::new("font-size", "empty").has_unit(&["px", "pt"]));
    }

    #[test]
    fn test_unitless_number() {
        assert_eq!(Declaration::new("line-height", "1.0").unitless_number(), Some(1.0));
        assert_eq!(
            Declaration::new("line-height", "1.1 !important").unitless_number(),
            Some(1.1)
        );
        assert_eq!(Declaration::new("line-height", "1.5em").unitless_number(), None);
        assert_eq!(Declaration::new("line-height", "normal").unitless_number(), None);
    }

    #[test]
    fn test_keyword_mentions() {
        assert!(Declaration::new("display", "inline-flex").mentions("flex"));
        assert!(Declaration::new("display", "GRID").mentions("grid"));
        assert!(!Declaration::new("display", "block").mentions("flex"));
    }
}
