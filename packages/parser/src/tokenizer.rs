use crate::error::{ParseError, ParseResult};
use logos::Logos;
use std::fmt;
use std::ops::Range;

/// Tokens between tags
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"<!--([^-]|-[^-]|--[^>])*-->")]
#[logos(skip r"<![a-zA-Z][^>]*>")]
enum ContentToken {
    #[token("</")]
    CloseTagOpen,

    #[token("<")]
    TagOpen,

    #[regex(r"[^<]+")]
    Text,
}

/// Tokens inside a tag
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum TagToken {
    #[regex(r#"[^\s"'=<>`/][^\s"'=<>`]*"#)]
    Word,

    #[regex(r#""[^"]*""#)]
    Quoted,

    #[regex(r"'[^']*'")]
    SingleQuoted,

    #[token("=")]
    Equals,

    #[token("/")]
    Slash,

    #[token(">")]
    Close,

    #[token("/>")]
    SelfClose,
}

impl fmt::Display for TagToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagToken::Word => write!(f, "name"),
            TagToken::Quoted | TagToken::SingleQuoted => write!(f, "quoted value"),
            TagToken::Equals => write!(f, "'='"),
            TagToken::Slash => write!(f, "'/'"),
            TagToken::Close => write!(f, "'>'"),
            TagToken::SelfClose => write!(f, "'/>'"),
        }
    }
}

/// A unit of markup
#[derive(Debug, Clone, PartialEq)]
pub enum Markup {
    StartTag {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    /// Character data with entities decoded
    Text(String),
}

impl fmt::Display for Markup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Markup::StartTag { name, .. } => write!(f, "<{}>", name),
            Markup::EndTag { name } => write!(f, "</{}>", name),
            Markup::Text(_) => write!(f, "text"),
        }
    }
}

/// Split a serialized document into tags and text runs
pub fn tokenize(source: &str) -> ParseResult<Vec<(Markup, Range<usize>)>> {
    let mut out = Vec::new();
    let mut content = ContentToken::lexer(source);

    while let Some(token) = content.next() {
        let span = content.span();
        match token {
            Ok(ContentToken::Text) => {
                out.push((Markup::Text(decode_entities(content.slice())), span));
            }
            Ok(ContentToken::TagOpen) | Ok(ContentToken::CloseTagOpen) => {
                let closing = token == Ok(ContentToken::CloseTagOpen);
                let mut tag = content.morph::<TagToken>();
                let markup = read_tag(&mut tag, closing, span.start)?;
                let end = tag.span().end;
                out.push((markup, span.start..end));
                content = tag.morph();
            }
            Err(()) => return Err(ParseError::lexer_error(span.start)),
        }
    }

    Ok(out)
}

fn read_tag(
    lexer: &mut logos::Lexer<'_, TagToken>,
    closing: bool,
    start: usize,
) -> ParseResult<Markup> {
    let mut name = match lexer.next() {
        Some(Ok(TagToken::Word)) => lexer.slice().to_ascii_lowercase(),
        Some(Ok(other)) => {
            return Err(ParseError::unexpected_token(
                lexer.span().start,
                "tag name",
                other.to_string(),
            ))
        }
        Some(Err(())) => return Err(ParseError::lexer_error(lexer.span().start)),
        None => return Err(ParseError::unexpected_eof(start)),
    };

    // `<br/>` lexes the slash into the name
    let mut trailing_slash = false;
    if name.ends_with('/') {
        name.pop();
        trailing_slash = true;
    }

    let mut attrs: Vec<(String, String)> = Vec::new();
    let mut pending: Option<String> = None;
    let mut awaiting_value = false;

    loop {
        let token = match lexer.next() {
            Some(Ok(token)) => token,
            Some(Err(())) => return Err(ParseError::lexer_error(lexer.span().start)),
            None => return Err(ParseError::unexpected_eof(lexer.span().end)),
        };

        match token {
            TagToken::Word if awaiting_value => {
                let attr = pending.take().unwrap_or_default();
                attrs.push((attr, decode_entities(lexer.slice())));
                awaiting_value = false;
            }
            TagToken::Word => {
                if let Some(previous) = pending.take() {
                    attrs.push((previous, String::new()));
                }
                let mut word = lexer.slice().to_ascii_lowercase();
                trailing_slash = word.ends_with('/');
                if trailing_slash {
                    word.pop();
                }
                pending = Some(word);
            }
            TagToken::Quoted | TagToken::SingleQuoted if awaiting_value => {
                let raw = lexer.slice();
                let attr = pending.take().unwrap_or_default();
                attrs.push((attr, decode_entities(&raw[1..raw.len() - 1])));
                awaiting_value = false;
            }
            TagToken::Equals if pending.is_some() && !awaiting_value => {
                awaiting_value = true;
            }
            TagToken::Slash => {}
            TagToken::Close | TagToken::SelfClose => {
                if awaiting_value {
                    return Err(ParseError::unexpected_token(
                        lexer.span().start,
                        "attribute value",
                        token.to_string(),
                    ));
                }
                if let Some(previous) = pending.take() {
                    attrs.push((previous, String::new()));
                }
                let self_closing = token == TagToken::SelfClose || trailing_slash;
                return Ok(if closing {
                    Markup::EndTag { name }
                } else {
                    Markup::StartTag {
                        name,
                        attrs,
                        self_closing,
                    }
                });
            }
            other => {
                return Err(ParseError::unexpected_token(
                    lexer.span().start,
                    "attribute",
                    other.to_string(),
                ))
            }
        }
    }
}

/// Replace character references with the characters they name
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').and_then(|semi| {
            let entity = &rest[1..semi];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => entity
                    .strip_prefix("#x")
                    .or_else(|| entity.strip_prefix("#X"))
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|ch| (ch, semi + 1))
        });

        match decoded {
            Some((ch, consumed)) => {
                out.push(ch);
                rest = &rest[consumed..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Escape text for use as character data
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape text for use inside a double-quoted attribute
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
