//! Markdown to HTML preview rendering.
use pulldown_cmark::{Event, Options, Parser, html};

/// Render GitHub-flavoured Markdown to HTML.
///
/// Tables, strikethrough and task lists are enabled. Raw HTML in the input is
/// emitted as escaped text, so model output cannot inject markup.
#[must_use]
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}
