use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStyle {
    Plain,
    Strong,
    Emphasis,
    Code,
    Strike,
}

/// A stretch of text sharing one style.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    pub text: String,
    pub style: RunStyle,
}

/// Reduce inline markdown to styled runs. Markup characters are consumed;
/// line breaks become spaces. The innermost style wins when styles nest.
pub fn runs(text: &str) -> Vec<Run> {
    let mut out: Vec<Run> = Vec::new();
    let mut stack: Vec<RunStyle> = Vec::new();

    for event in Parser::new_ext(text, Options::ENABLE_STRIKETHROUGH) {
        match event {
            Event::Start(Tag::Strong) => stack.push(RunStyle::Strong),
            Event::Start(Tag::Emphasis) => stack.push(RunStyle::Emphasis),
            Event::Start(Tag::Strikethrough) => stack.push(RunStyle::Strike),
            Event::End(TagEnd::Strong | TagEnd::Emphasis | TagEnd::Strikethrough) => {
                stack.pop();
            }
            Event::Text(t) | Event::Html(t) | Event::InlineHtml(t) => {
                let style = stack.last().copied().unwrap_or(RunStyle::Plain);
                push(&mut out, &t, style);
            }
            Event::Code(t) => push(&mut out, &t, RunStyle::Code),
            Event::SoftBreak | Event::HardBreak => push(&mut out, " ", RunStyle::Plain),
            Event::End(TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item)
                if !out.is_empty() =>
            {
                push(&mut out, " ", RunStyle::Plain);
            }
            _ => {}
        }
    }

    if let Some(last) = out.last_mut() {
        let trimmed = last.text.trim_end().len();
        last.text.truncate(trimmed);
        if last.text.is_empty() {
            out.pop();
        }
    }
    out
}

/// Concatenated run text.
pub fn plain(text: &str) -> String {
    runs(text).into_iter().map(|r| r.text).collect()
}

fn push(out: &mut Vec<Run>, text: &str, style: RunStyle) {
    if text.is_empty() {
        return;
    }
    match out.last_mut() {
        Some(last) if last.style == style => last.text.push_str(text),
        _ => out.push(Run {
            text: text.to_string(),
            style,
        }),
    }
}
