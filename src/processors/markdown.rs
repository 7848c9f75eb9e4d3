//! Markdown segmentation, reconstruction and document translation

use pulldown_cmark::{Event, LinkType, Options, Parser, Tag, TagEnd};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::errors::{Result, TranslationError};
use crate::core::port::TranslationPort;

/// Delimiter opening and closing a frontmatter block
pub const FRONTMATTER_DELIMITER: &str = "---";

/// Prefixes that start a bare URL inside prose
const BARE_URL_PREFIXES: &[&str] = &["https://", "http://", "www."];

/// A contiguous span of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub content: String,
    pub translatable: bool,
}

impl Segment {
    pub fn translatable(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            translatable: true,
        }
    }

    pub fn protected(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            translatable: false,
        }
    }

    /// Whether the segment should be sent for translation
    pub fn needs_translation(&self) -> bool {
        self.translatable && !self.content.trim().is_empty()
    }
}

/// Splits Markdown into translatable prose and protected markup.
///
/// Concatenating the produced segments always yields the input again.
#[derive(Debug, Clone)]
pub struct MarkdownSegmenter {
    options: Options,
}

impl Default for MarkdownSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownSegmenter {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
        Self { options }
    }

    /// Segment raw document bytes. Fails only when the bytes are not UTF-8.
    pub fn segment(&self, source: &[u8]) -> Result<Vec<Segment>> {
        let text = std::str::from_utf8(source).map_err(|e| TranslationError::InvalidFormat {
            format: format!("document is not valid UTF-8: {}", e),
        })?;
        Ok(self.segment_str(text))
    }

    /// Segment a document that is already text
    pub fn segment_str(&self, source: &str) -> Vec<Segment> {
        let mut builder = SegmentBuilder::new(source);
        let mut code_block_depth = 0usize;
        // Links never nest, so a flag is enough
        let mut in_autolink = false;

        for (event, range) in Parser::new_ext(source, self.options).into_offset_iter() {
            match event {
                Event::Start(Tag::CodeBlock(_)) => code_block_depth += 1,
                Event::End(TagEnd::CodeBlock) => {
                    code_block_depth = code_block_depth.saturating_sub(1)
                }
                Event::Start(Tag::Link {
                    link_type: LinkType::Autolink | LinkType::Email,
                    ..
                }) => in_autolink = true,
                Event::End(TagEnd::Link) => in_autolink = false,
                Event::Text(_) => builder.leaf(
                    range.start,
                    range.end,
                    code_block_depth == 0 && !in_autolink,
                ),
                Event::Code(_)
                | Event::Html(_)
                | Event::InlineHtml(_)
                | Event::InlineMath(_)
                | Event::DisplayMath(_) => builder.leaf(range.start, range.end, false),
                _ => {}
            }
        }

        collapse_frontmatter(protect_bare_urls(builder.finish()))
    }
}

/// Accumulates segments from leaf byte ranges
struct SegmentBuilder<'a> {
    source: &'a str,
    segments: Vec<Segment>,
    last_pos: usize,
}

impl<'a> SegmentBuilder<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            segments: Vec::new(),
            last_pos: 0,
        }
    }

    fn leaf(&mut self, start: usize, stop: usize, translatable: bool) {
        // Ranges that move backwards or do not land on the source are ignored
        if start < self.last_pos || stop < start {
            return;
        }
        let source = self.source;
        let (Some(gap), Some(content)) = (source.get(self.last_pos..start), source.get(start..stop))
        else {
            return;
        };

        if !gap.is_empty() {
            self.segments.push(Segment::protected(gap));
        }

        // Adjacent prose pieces form one run
        let extends_prose = translatable
            && gap.is_empty()
            && self.segments.last().map(|s| s.translatable).unwrap_or(false);

        if extends_prose {
            if let Some(prev) = self.segments.last_mut() {
                prev.content.push_str(content);
            }
        } else if !content.is_empty() {
            self.segments.push(Segment {
                content: content.to_string(),
                translatable,
            });
        }

        self.last_pos = stop;
    }

    fn finish(mut self) -> Vec<Segment> {
        if let Some(rest) = self.source.get(self.last_pos..) {
            if !rest.is_empty() {
                self.segments.push(Segment::protected(rest));
            }
        }
        self.segments
    }
}

/// Fold a leading frontmatter block into one protected segment.
///
/// The block runs from the first segment (which must start with the
/// delimiter) through the next segment containing the delimiter again.
/// Without a closing delimiter the segments are returned unchanged.
pub fn collapse_frontmatter(segments: Vec<Segment>) -> Vec<Segment> {
    let opens_frontmatter = segments
        .first()
        .map(|s| s.content.starts_with(FRONTMATTER_DELIMITER))
        .unwrap_or(false);
    if !opens_frontmatter {
        return segments;
    }

    let Some(end) = segments
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, s)| s.content.contains(FRONTMATTER_DELIMITER))
        .map(|(i, _)| i)
    else {
        return segments;
    };

    let mut rest = segments.into_iter();
    let frontmatter: String = rest.by_ref().take(end + 1).map(|s| s.content).collect();

    let mut collapsed = Vec::with_capacity(rest.len() + 1);
    collapsed.push(Segment::protected(frontmatter));
    collapsed.extend(rest);
    collapsed
}

/// Split bare URLs out of prose runs so they are never translated.
///
/// A URL starts with one of `BARE_URL_PREFIXES` at a word boundary and runs
/// until whitespace or `<`; trailing punctuation stays with the prose.
pub fn protect_bare_urls(segments: Vec<Segment>) -> Vec<Segment> {
    let mut out = Vec::with_capacity(segments.len());

    for segment in segments {
        if !segment.translatable {
            out.push(segment);
            continue;
        }

        let spans = bare_url_spans(&segment.content);
        if spans.is_empty() {
            out.push(segment);
            continue;
        }

        let text = segment.content.as_str();
        let mut last = 0;
        for (start, end) in spans {
            if start > last {
                out.push(Segment::translatable(&text[last..start]));
            }
            out.push(Segment::protected(&text[start..end]));
            last = end;
        }
        if last < text.len() {
            out.push(Segment::translatable(&text[last..]));
        }
    }

    out
}

/// Byte ranges of bare URLs in a piece of prose
fn bare_url_spans(text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let rest = &text[pos..];
        let at_boundary = text[..pos]
            .chars()
            .next_back()
            .map(|c| c.is_whitespace() || matches!(c, '(' | '[' | '"' | '\''))
            .unwrap_or(true);

        let prefix = BARE_URL_PREFIXES
            .iter()
            .find(|p| rest.starts_with(**p))
            .filter(|_| at_boundary);
        if let Some(prefix) = prefix {
            let len = rest
                .find(|c: char| c.is_whitespace() || c == '<')
                .unwrap_or(rest.len());
            let url = trim_url_end(&rest[..len]);
            if url.len() > prefix.len() {
                spans.push((pos, pos + url.len()));
                pos += url.len();
                continue;
            }
        }

        pos += rest.chars().next().map(char::len_utf8).unwrap_or(1);
    }

    spans
}

/// Drop trailing punctuation and unbalanced closing parentheses
fn trim_url_end(mut url: &str) -> &str {
    while let Some(last) = url.chars().next_back() {
        let trim = match last {
            '.' | ',' | ':' | ';' | '!' | '?' | '"' | '\'' | '*' | '_' | '~' => true,
            ')' => url.matches(')').count() > url.matches('(').count(),
            _ => false,
        };
        if !trim {
            break;
        }
        url = &url[..url.len() - last.len_utf8()];
    }
    url
}

/// Concatenate segments back into a document
pub fn reconstruct(segments: &[Segment]) -> String {
    let capacity = segments.iter().map(|s| s.content.len()).sum();
    segments
        .iter()
        .fold(String::with_capacity(capacity), |mut out, s| {
            out.push_str(&s.content);
            out
        })
}

/// Texts to send for translation, in document order
pub fn translatable_texts(segments: &[Segment]) -> Vec<String> {
    segments
        .iter()
        .filter(|s| s.needs_translation())
        .map(|s| s.content.clone())
        .collect()
}

/// Write translations back into the segments they came from, in order.
/// Returns how many segments were replaced; segments without a matching
/// translation keep their original text.
pub fn apply_translations(segments: &mut [Segment], translations: Vec<String>) -> usize {
    let mut translations = translations.into_iter();
    let mut applied = 0;

    for segment in segments.iter_mut().filter(|s| s.needs_translation()) {
        match translations.next() {
            Some(text) => {
                segment.content = text;
                applied += 1;
            }
            None => break,
        }
    }

    applied
}

/// Check if file is Markdown
pub fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            ext == "md" || ext == "markdown"
        })
        .unwrap_or(false)
}

/// Outcome of translating one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedDocument {
    pub content: String,
    /// Characters sent for translation
    pub translated_chars: usize,
    /// Number of segments sent for translation
    pub requested: usize,
    /// Number of segments actually replaced
    pub applied: usize,
}

/// Markdown processor that preserves code blocks and frontmatter
#[derive(Clone)]
pub struct MarkdownProcessor {
    segmenter: MarkdownSegmenter,
    translator: Arc<dyn TranslationPort>,
}

impl std::fmt::Debug for MarkdownProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkdownProcessor")
            .field("segmenter", &self.segmenter)
            .finish_non_exhaustive()
    }
}

impl MarkdownProcessor {
    /// Create a new markdown processor
    pub fn new(translator: Arc<dyn TranslationPort>) -> Self {
        Self {
            segmenter: MarkdownSegmenter::new(),
            translator,
        }
    }

    /// Translate a whole document with a single call to the translator
    pub async fn translate_document(
        &self,
        source: &[u8],
        target_lang: &str,
    ) -> Result<TranslatedDocument> {
        let mut segments = self.segmenter.segment(source)?;
        let texts = translatable_texts(&segments);

        if texts.is_empty() {
            debug!("No translatable text found");
            return Ok(TranslatedDocument {
                content: reconstruct(&segments),
                translated_chars: 0,
                requested: 0,
                applied: 0,
            });
        }

        let translated_chars = texts.iter().map(|t| t.chars().count()).sum();
        let requested = texts.len();

        let translations = self.translator.translate(&texts, target_lang).await?;
        if translations.len() != requested {
            warn!(
                "Translator returned {} texts for {} segments; unmatched segments stay untranslated",
                translations.len(),
                requested
            );
        }

        let applied = apply_translations(&mut segments, translations);

        Ok(TranslatedDocument {
            content: reconstruct(&segments),
            translated_chars,
            requested,
            applied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    const SCENARIO: &str = "# Title\n\n```go\nfmt.Println(1)\n```\n\nHello world.\n";

    fn segment(doc: &str) -> Vec<Segment> {
        MarkdownSegmenter::new().segment_str(doc)
    }

    /// Replaces every text with a fixed lookup, or tags it
    struct Dictionary;

    #[async_trait]
    impl TranslationPort for Dictionary {
        async fn translate(&self, texts: &[String], _target_lang: &str) -> Result<Vec<String>> {
            Ok(texts
                .iter()
                .map(|t| match t.as_str() {
                    "Hello world." => "Bonjour le monde.".to_string(),
                    other => other.to_string(),
                })
                .collect())
        }
    }

    /// Returns only the first translation
    struct Truncating;

    #[async_trait]
    impl TranslationPort for Truncating {
        async fn translate(&self, texts: &[String], _target_lang: &str) -> Result<Vec<String>> {
            Ok(texts.iter().take(1).map(|t| t.to_uppercase()).collect())
        }
    }

    /// Must never be reached
    struct Unreachable;

    #[async_trait]
    impl TranslationPort for Unreachable {
        async fn translate(&self, _texts: &[String], _target_lang: &str) -> Result<Vec<String>> {
            Err(TranslationError::InternalError("translator called".to_string()))
        }
    }

    #[test]
    fn test_round_trip() {
        let docs = [
            SCENARIO,
            "",
            "plain text without newline",
            "---\ntitle: Test\n---\n\n# Heading\n\nBody *with* **emphasis** and `code`.\n",
            "- one\n- two\n  - nested [link](https://example.com \"t\")\n\n> quote\n",
            "| a | b |\n|---|---|\n| 1 | two |\n\n    indented code\n\n<div>html</div>\n",
            "Line with trailing spaces  \nnext line\\\nthird &amp; fourth [^1]\n\n[^1]: note\n",
            "![alt text](img.png)\n\n1. first\n2. second\n\n***\n\n- [x] done\n- [ ] todo\n",
            "日本語のテキスト。\n\n## 見出し\n\n```\nコード\n```\n",
            "~~~\nunterminated fence",
            "# Title {#custom-id .intro}\n\nSee <https://example.com/docs> or <user@example.com>.\n",
            "Visit https://example.com/x today (or www.example.org/a_(b)).\n",
        ];
        for doc in docs {
            assert_eq!(reconstruct(&segment(doc)), doc, "round trip failed for {:?}", doc);
        }
    }

    #[test]
    fn test_scenario_segments() {
        let segments = segment(SCENARIO);

        assert!(segments
            .iter()
            .any(|s| s.translatable && s.content == "Hello world."));
        assert!(segments.iter().any(|s| s.translatable && s.content == "Title"));
        for s in segments.iter().filter(|s| s.content.contains("fmt.Println")) {
            assert!(!s.translatable, "code leaked into {:?}", s);
        }
        for s in segments.iter().filter(|s| s.translatable) {
            assert!(!s.content.contains("```"));
            assert!(!s.content.contains('#'));
        }
    }

    #[tokio::test]
    async fn test_scenario_translation() {
        let processor = MarkdownProcessor::new(Arc::new(Dictionary));
        let doc = processor
            .translate_document(SCENARIO.as_bytes(), "FR")
            .await
            .unwrap();

        assert_eq!(
            doc.content,
            "# Title\n\n```go\nfmt.Println(1)\n```\n\nBonjour le monde.\n"
        );
        assert_eq!(doc.requested, 2);
        assert_eq!(doc.applied, 2);
        assert_eq!(doc.translated_chars, "Title".len() + "Hello world.".len());
    }

    #[test]
    fn test_inline_code_is_protected() {
        let segments = segment("Run `cargo test` now.\n");
        let code = segments.iter().find(|s| s.content == "`cargo test`").unwrap();
        assert!(!code.translatable);
        assert!(segments.iter().any(|s| s.translatable && s.content == "Run "));
        assert!(segments.iter().any(|s| s.translatable && s.content == " now."));
    }

    #[test]
    fn test_autolinks_are_protected() {
        let segments = segment("See <https://example.com/docs> now.\n");
        assert_eq!(translatable_texts(&segments), vec!["See ", " now."]);
        assert!(segments
            .iter()
            .any(|s| !s.translatable && s.content == "https://example.com/docs"));

        let segments = segment("Mail <user@example.com> today.\n");
        assert!(segments
            .iter()
            .filter(|s| s.translatable)
            .all(|s| !s.content.contains("user@example.com")));
    }

    #[test]
    fn test_heading_attributes_are_protected() {
        let doc = "# Title {#custom-id}\n\nBody.\n";
        let segments = segment(doc);
        let texts = translatable_texts(&segments);

        assert!(texts.iter().all(|t| !t.contains("custom-id")), "{:?}", texts);
        assert_eq!(texts.iter().map(|t| t.trim()).collect::<Vec<_>>(), vec!["Title", "Body."]);
        assert_eq!(reconstruct(&segments), doc);
    }

    #[test]
    fn test_bare_urls_are_protected() {
        let segments = segment("Visit https://example.com/x today.\n");
        assert_eq!(translatable_texts(&segments), vec!["Visit ", " today."]);
        assert!(segments
            .iter()
            .any(|s| !s.translatable && s.content == "https://example.com/x"));
    }

    #[test]
    fn test_bare_url_trailing_punctuation_stays_prose() {
        let spans = |text: &str| -> Vec<String> {
            bare_url_spans(text)
                .into_iter()
                .map(|(start, end)| text[start..end].to_string())
                .collect()
        };

        assert_eq!(spans("Go to https://a.example/b."), vec!["https://a.example/b"]);
        assert_eq!(spans("(see www.example.org/x)"), vec!["www.example.org/x"]);
        assert_eq!(
            spans("wiki https://en.example/Foo_(bar), ok"),
            vec!["https://en.example/Foo_(bar)"]
        );
        assert!(spans("xhttps://not.a/boundary and www. alone").is_empty());
    }

    #[test]
    fn test_html_is_protected() {
        let segments = segment("Text <span>inline</span> here\n\n<div>\nblock\n</div>\n");
        for s in segments.iter().filter(|s| s.content.contains('<')) {
            assert!(!s.translatable, "html leaked into {:?}", s);
        }
    }

    #[test]
    fn test_indented_code_is_protected() {
        let segments = segment("Intro paragraph.\n\n    let x = 1;\n\nOutro.\n");
        for s in segments.iter().filter(|s| s.content.contains("let x")) {
            assert!(!s.translatable);
        }
    }

    #[test]
    fn test_frontmatter_collapses_into_one_segment() {
        let doc = "---\ntitle: Test\nauthor: Someone\n---\n\nBody text.\n";
        let segments = segment(doc);

        assert!(!segments[0].translatable);
        assert!(segments[0].content.starts_with("---\ntitle: Test"));
        assert!(segments[0].content.contains("author: Someone\n---"));
        assert!(segments[1..]
            .iter()
            .all(|s| !s.content.contains("title: Test")));
        assert!(segments.iter().any(|s| s.translatable && s.content == "Body text."));
        assert_eq!(reconstruct(&segments), doc);
    }

    #[test]
    fn test_unclosed_frontmatter_is_left_alone() {
        let segments = vec![
            Segment::protected("---\n"),
            Segment::translatable("title: Test"),
            Segment::protected("\n"),
        ];
        assert_eq!(collapse_frontmatter(segments.clone()), segments);
    }

    #[test]
    fn test_collapse_frontmatter_keeps_tail() {
        let segments = vec![
            Segment::protected("---\n"),
            Segment::translatable("title: x"),
            Segment::protected("\n---\n\n"),
            Segment::translatable("Body"),
            Segment::protected("\n"),
        ];
        let collapsed = collapse_frontmatter(segments);
        assert_eq!(
            collapsed,
            vec![
                Segment::protected("---\ntitle: x\n---\n\n"),
                Segment::translatable("Body"),
                Segment::protected("\n"),
            ]
        );
    }

    #[test]
    fn test_backwards_range_is_ignored() {
        let mut builder = SegmentBuilder::new("abcdef");
        builder.leaf(2, 4, true);
        builder.leaf(1, 3, true);
        builder.leaf(4, 99, true);
        let segments = builder.finish();
        assert_eq!(
            segments,
            vec![
                Segment::protected("ab"),
                Segment::translatable("cd"),
                Segment::protected("ef"),
            ]
        );
    }

    #[test]
    fn test_invalid_utf8_is_an_error() {
        let result = MarkdownSegmenter::new().segment(&[0x66, 0xff, 0xfe]);
        assert!(matches!(result, Err(TranslationError::InvalidFormat { .. })));
    }

    #[test]
    fn test_apply_translations_skips_blank_and_protected() {
        let mut segments = vec![
            Segment::translatable("One"),
            Segment::protected("`x`"),
            Segment::translatable("   "),
            Segment::translatable("Two"),
        ];
        assert_eq!(translatable_texts(&segments), vec!["One", "Two"]);

        let applied = apply_translations(&mut segments, vec!["Eins".into(), "Zwei".into()]);
        assert_eq!(applied, 2);
        assert_eq!(reconstruct(&segments), "Eins`x`   Zwei");
    }

    #[tokio::test]
    async fn test_shortfall_leaves_originals_in_place() {
        let processor = MarkdownProcessor::new(Arc::new(Truncating));
        let doc = processor
            .translate_document(b"First paragraph.\n\nSecond paragraph.\n", "DE")
            .await
            .unwrap();

        assert_eq!(doc.requested, 2);
        assert_eq!(doc.applied, 1);
        assert_eq!(doc.content, "FIRST PARAGRAPH.\n\nSecond paragraph.\n");
    }

    #[tokio::test]
    async fn test_document_without_prose_skips_translator() {
        let processor = MarkdownProcessor::new(Arc::new(Unreachable));
        let source = "```rust\nfn main() {}\n```\n";
        let doc = processor
            .translate_document(source.as_bytes(), "DE")
            .await
            .unwrap();

        assert_eq!(doc.content, source);
        assert_eq!(doc.requested, 0);
    }

    #[test]
    fn test_is_markdown_file() {
        assert!(is_markdown_file(Path::new("test.md")));
        assert!(is_markdown_file(Path::new("test.MD")));
        assert!(is_markdown_file(Path::new("test.markdown")));
        assert!(!is_markdown_file(Path::new("test.txt")));
        assert!(!is_markdown_file(Path::new("md")));
    }
}
