// src/checker/html.rs
// =============================================================================
// This module extracts raw links from HTML pages.
//
// We run html5ever's tokenizer (the first stage of Mozilla's HTML parser)
// and look at every start tag as it goes by:
// - No tree is built, so nothing gets moved around. A browser's tree
//   builder re-parents stray table content and hides <noscript> children,
//   a tokenizer reports each tag exactly where it was written
// - Attributes arrive in the order they appear in the tag
// - It never fails: broken markup produces ParseError tokens and the
//   tokenizer carries on
//
// Which links are returned is driven by the Config:
// - tags:  only elements with these names are inspected (a, link, img, script)
// - attrs: only these attributes are read (href, src)
// - excluded_scheme_prefixes: values starting with these are dropped (tel:)
//
// The links come back exactly as written in the page (relative or absolute).
// Resolving them against the page URL is the crawler's job (crawl/scope.rs).
//
// Rust concepts:
// - Traits: LinkSink implements html5ever's TokenSink callback trait
// - Lifetimes: LinkSink<'a> borrows the Config for as long as it lives
// =============================================================================

use crate::config::Config;
use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
    TokenizerResult,
};
use tracing::debug;

// Extracts candidate links from an HTML document
//
// Parameters:
//   html: the page body (borrowed as &str)
//   config: decides which tags/attributes count and which prefixes to skip
//
// Returns: raw link values in the order they appear in the document.
// Duplicates are kept, deduplication happens later in the crawler.
//
// Example:
//   html = "<a href='/docs'>Docs</a><a href='tel:123'>Call</a>"
//   result = ["/docs"]
pub fn extract_links(html: &str, config: &Config) -> Vec<String> {
    let mut input = BufferQueue::default();
    input.push_back(StrTendril::from_slice(html));

    let mut tokenizer = Tokenizer::new(LinkSink::new(config), TokenizerOpts::default());

    // Script results only happen when the sink asks for them, which ours never does
    while let TokenizerResult::Script(()) = tokenizer.feed(&mut input) {}
    tokenizer.end();

    let sink = tokenizer.sink;
    if sink.errors > 0 {
        debug!(errors = sink.errors, "recovered from malformed markup");
    }

    sink.links
}

// Collects links while the tokenizer walks the page
struct LinkSink<'a> {
    config: &'a Config,
    links: Vec<String>,
    errors: usize,
}

impl<'a> LinkSink<'a> {
    fn new(config: &'a Config) -> Self {
        Self {
            config,
            links: Vec::new(),
            errors: 0,
        }
    }

    fn collect(&mut self, tag: &Tag) {
        if !is_wanted(&self.config.tags, &tag.name) {
            return;
        }

        // The tokenizer already dropped repeated attribute names,
        // the first one wins like in a browser
        for attr in &tag.attrs {
            let value: &str = &attr.value;

            if !is_wanted(&self.config.attrs, &attr.name.local)
                || value.is_empty()
                || is_excluded(value, &self.config.excluded_scheme_prefixes)
            {
                continue;
            }

            self.links.push(value.to_string());
        }
    }
}

impl TokenSink for LinkSink<'_> {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) if tag.kind == TagKind::StartTag => {
                self.collect(&tag);
                match raw_text_kind(&tag) {
                    Some(kind) => TokenSinkResult::RawData(kind),
                    None => TokenSinkResult::Continue,
                }
            }
            Token::ParseError(_) => {
                self.errors += 1;
                TokenSinkResult::Continue
            }
            _ => TokenSinkResult::Continue,
        }
    }
}

// Elements whose content is text, not markup
//
// A tree builder switches the tokenizer for these. Without one, the sink
// has to, or `<script>document.write('<a href="/x">')</script>` would
// produce a link.
fn raw_text_kind(tag: &Tag) -> Option<RawKind> {
    if tag.self_closing {
        return None;
    }

    match &*tag.name {
        "script" => Some(RawKind::ScriptData),
        "style" | "xmp" | "iframe" | "noembed" | "noframes" => Some(RawKind::Rawtext),
        "title" | "textarea" => Some(RawKind::Rcdata),
        _ => None,
    }
}

// html5ever lowercases tag and attribute names, so compare without caring
// about case in case the config was written as ["A", "IMG"]
fn is_wanted(names: &[String], name: &str) -> bool {
    names.iter().any(|n| n.eq_ignore_ascii_case(name))
}

// Checks a link against the excluded scheme prefixes (case-sensitive)
fn is_excluded(link: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| link.starts_with(prefix.as_str()))
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why a tokenizer instead of a DOM?
//    - A DOM is the page after the browser "fixed" it: an <a> between
//      table rows gets moved in front of the table
//    - We want links in the order the author wrote them, so we stop one
//      stage earlier and never build the tree
//
// 2. What is a TokenSink?
//    - html5ever calls process_token() for every tag, text run, comment
//      and parse error it finds
//    - The return value can switch the tokenizer into another mode, which
//      is how <script> content is kept from being read as tags
//
// 3. What happens to entities like &amp; in attributes?
//    - html5ever decodes them, so href="?a=1&amp;b=2" becomes "?a=1&b=2"
//    - That's the same URL a browser would request
// -----------------------------------------------------------------------------
