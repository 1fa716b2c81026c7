//! # Pretty printing for answers
//!
//! Language models answer in loose markdown. [`print_pretty`] renders the subset that
//! matters in a terminal:
//!
//! | Markdown              | Terminal                          |
//! |-----------------------|-----------------------------------|
//! | `#`, `##`, `###`      | bold cyan line                    |
//! | `**bold**`            | bold                              |
//! | `` `code` ``          | yellow                            |
//! | ```` ```lang ````     | syntax highlighted (syntect)      |
//!
//! Everything else is written through untouched.

use std::error::Error;
use std::io::{Write, stdout};

use crossterm::{
    QueueableCommand,
    style::{Attribute, Color, SetAttribute, SetForegroundColor},
};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Style, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::{LinesWithEndings, as_24_bit_terminal_escaped};

const THEME: &str = "base16-ocean.dark";

static SYNTAXES: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEMES: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

static CODE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(\w+)?\n([\s\S]*?)```").expect("code block regex is valid"));
static INLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`]+)`|\*\*([^*]+)\*\*").expect("inline regex is valid"));

/// Render `text` to stdout.
pub fn print_pretty(text: &str) -> Result<(), Box<dyn Error>> {
    let mut out = stdout();
    render(text, &mut out)
}

/// Render `text` to any writer.
pub fn render(text: &str, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    let mut last_end = 0;
    for cap in CODE_BLOCK.captures_iter(text) {
        let Some(whole) = cap.get(0) else { continue };
        if whole.start() > last_end {
            render_markdown(&text[last_end..whole.start()], out)?;
        }
        let language = cap.get(1).map(|m| m.as_str()).unwrap_or("text");
        let code = cap.get(2).map(|m| m.as_str()).unwrap_or("");
        render_code_block(code, language, out)?;
        last_end = whole.end();
    }
    if last_end < text.len() {
        render_markdown(&text[last_end..], out)?;
    }
    out.flush()?;
    Ok(())
}

fn render_markdown(text: &str, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    for line in text.lines() {
        let header = ["### ", "## ", "# "]
            .iter()
            .find_map(|prefix| line.strip_prefix(prefix));
        match header {
            Some(title) => {
                out.queue(SetForegroundColor(Color::Cyan))?;
                out.queue(SetAttribute(Attribute::Bold))?;
                write!(out, "{title}")?;
                out.queue(SetAttribute(Attribute::Reset))?;
                out.queue(SetForegroundColor(Color::Reset))?;
                writeln!(out)?;
            }
            None => writeln!(out, "{}", render_inline(line))?,
        }
    }
    Ok(())
}

fn render_inline(line: &str) -> String {
    INLINE
        .replace_all(line, |caps: &Captures| match (caps.get(1), caps.get(2)) {
            (Some(code), _) => format!("\x1b[33m{}\x1b[0m", code.as_str()),
            (_, Some(bold)) => format!("\x1b[1m{}\x1b[0m", bold.as_str()),
            _ => caps[0].to_string(),
        })
        .into_owned()
}

fn find_syntax(language: &str) -> &'static SyntaxReference {
    let token = match language.to_ascii_lowercase().as_str() {
        "py" => "python".to_string(),
        "js" => "javascript".to_string(),
        "sh" | "bash" | "shell" => "sh".to_string(),
        "yml" => "yaml".to_string(),
        other => other.to_string(),
    };
    SYNTAXES
        .find_syntax_by_token(&token)
        .or_else(|| SYNTAXES.find_syntax_by_extension(&token))
        .unwrap_or_else(|| SYNTAXES.find_syntax_plain_text())
}

fn render_code_block(code: &str, language: &str, out: &mut impl Write) -> Result<(), Box<dyn Error>> {
    out.queue(SetForegroundColor(Color::DarkGrey))?;
    out.queue(SetAttribute(Attribute::Italic))?;
    write!(out, "[{language}]")?;
    out.queue(SetAttribute(Attribute::Reset))?;
    out.queue(SetForegroundColor(Color::Reset))?;
    writeln!(out)?;

    let Some(theme) = THEMES.themes.get(THEME) else {
        write!(out, "{code}")?;
        return Ok(());
    };
    highlight(code, find_syntax(language), theme, out)?;
    write!(out, "\x1b[0m")?;
    Ok(())
}

fn highlight(
    code: &str,
    syntax: &SyntaxReference,
    theme: &Theme,
    out: &mut impl Write,
) -> Result<(), Box<dyn Error>> {
    let mut highlighter = HighlightLines::new(syntax, theme);
    for line in LinesWithEndings::from(code) {
        let ranges: Vec<(Style, &str)> = highlighter.highlight_line(line, &SYNTAXES)?;
        write!(out, "{}", as_24_bit_terminal_escaped(&ranges, false))?;
    }
    Ok(())
}
