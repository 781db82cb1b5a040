//! Template scanner.
//!
//! Splits a `.niac.php` source into text, echoes, directives and `@php`
//! blocks. Expression text is kept as byte ranges into the source so the
//! parser can report errors at their real position.

use std::ops::Range;

use super::expr::ExprError;

/// Directives recognized by the scanner. `@name` for anything else is text.
pub const DIRECTIVES: &[&str] = &[
    "extends",
    "title",
    "meta",
    "component",
    "endcomponent",
    "slot",
    "endslot",
    "if",
    "elseif",
    "else",
    "endif",
    "foreach",
    "endforeach",
    "forelse",
    "empty",
    "endforelse",
    "for",
    "endfor",
    "while",
    "endwhile",
    "isset",
    "endisset",
    "endempty",
    "switch",
    "case",
    "break",
    "continue",
    "default",
    "endswitch",
    "php",
    "endphp",
    "csrf",
    "method",
    "include",
    "yield",
    "section",
    "endsection",
    "asset",
];

/// Directives that produce output; every other directive swallows the
/// line break that follows it when it ends its line.
const OUTPUT_DIRECTIVES: &[&str] = &["csrf", "method", "include", "yield", "asset", "component"];

/// A piece of source text with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source<'src> {
    pub text: &'src str,
    pub offset: usize,
}

impl<'src> Source<'src> {
    pub fn span(&self) -> Range<usize> {
        self.offset..self.offset + self.text.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'src> {
    Text(String),
    /// `{{ expr }}` (escaped) or `{!! expr !!}` (raw).
    Echo { expr: Source<'src>, escape: bool },
    /// `@name` or `@name(args)`.
    Directive {
        name: &'src str,
        args: Option<Source<'src>>,
        span: Range<usize>,
    },
    /// `@php ... @endphp`.
    PhpBlock { body: Source<'src>, span: Range<usize> },
}

/// Scan a template into segments. Adjacent text is merged.
pub fn scan(source: &str) -> Result<Vec<Segment<'_>>, ExprError> {
    Scanner {
        source,
        pos: 0,
        text: String::new(),
        segments: Vec::new(),
    }
    .run()
}

struct Scanner<'src> {
    source: &'src str,
    pos: usize,
    text: String,
    segments: Vec<Segment<'src>>,
}

impl<'src> Scanner<'src> {
    fn run(mut self) -> Result<Vec<Segment<'src>>, ExprError> {
        while self.pos < self.source.len() {
            let rest = &self.source[self.pos..];

            if rest.starts_with("{{--") {
                self.pos = self.find_close(self.pos + 4, "--}}", "comment")?;
            } else if rest.starts_with("{---") {
                self.pos = self.find_close(self.pos + 4, "---}", "comment")?;
            } else if rest.starts_with("@{{") {
                let end = self.find_close(self.pos + 3, "}}", "echo")?;
                self.text.push_str(&self.source[self.pos + 1..end]);
                self.pos = end;
            } else if rest.starts_with("{!!") {
                self.echo(3, "!!}", false)?;
            } else if rest.starts_with("{{") {
                self.echo(2, "}}", true)?;
            } else if rest.starts_with("@@") {
                self.text.push('@');
                self.pos += 2;
            } else if rest.starts_with('@') {
                self.directive()?;
            } else {
                let first = rest.chars().next().map_or(1, char::len_utf8);
                let next = rest[first..]
                    .find(['{', '@'])
                    .map_or(self.source.len(), |i| self.pos + first + i);
                self.text.push_str(&self.source[self.pos..next]);
                self.pos = next;
            }
        }
        self.flush_text();
        Ok(self.segments)
    }

    fn flush_text(&mut self) {
        if !self.text.is_empty() {
            self.segments
                .push(Segment::Text(std::mem::take(&mut self.text)));
        }
    }

    /// Position just past `close`, searching from `from`.
    fn find_close(&self, from: usize, close: &str, what: &str) -> Result<usize, ExprError> {
        match self.source[from..].find(close) {
            Some(i) => Ok(from + i + close.len()),
            None => Err(ExprError::new(
                format!("unclosed {}", what),
                self.pos..self.source.len(),
            )),
        }
    }

    fn echo(&mut self, open: usize, close: &str, escape: bool) -> Result<(), ExprError> {
        let end = self.find_close(self.pos + open, close, "echo")?;
        let start = self.pos + open;
        self.flush_text();
        self.segments.push(Segment::Echo {
            expr: Source {
                text: &self.source[start..end - close.len()],
                offset: start,
            },
            escape,
        });
        self.pos = end;
        Ok(())
    }

    fn directive(&mut self) -> Result<(), ExprError> {
        let start = self.pos;
        let name_len = self.source[start + 1..]
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(self.source.len() - start - 1);
        let name = &self.source[start + 1..start + 1 + name_len];

        if !DIRECTIVES.contains(&name) || self.in_address(start, start + 1 + name_len) {
            self.text.push('@');
            self.pos += 1;
            return Ok(());
        }

        let mut end = start + 1 + name_len;
        let after_spaces = end
            + self.source[end..]
                .find(|c: char| c != ' ' && c != '\t')
                .unwrap_or(self.source.len() - end);
        let args = if self.source[after_spaces..].starts_with('(') {
            let close = self.matching_paren(after_spaces, name)?;
            end = close + 1;
            Some(Source {
                text: &self.source[after_spaces + 1..close],
                offset: after_spaces + 1,
            })
        } else {
            None
        };

        self.flush_text();

        if name == "php" && args.is_none() {
            let body_start = end;
            let Some(i) = self.source[body_start..].find("@endphp") else {
                return Err(ExprError::new("unclosed @php block", start..end));
            };
            let close = body_start + i + "@endphp".len();
            self.segments.push(Segment::PhpBlock {
                body: Source {
                    text: &self.source[body_start..body_start + i],
                    offset: body_start,
                },
                span: start..close,
            });
            self.pos = self.skip_line_break(close);
            return Ok(());
        }

        self.segments.push(Segment::Directive {
            name,
            args,
            span: start..end,
        });
        self.pos = if OUTPUT_DIRECTIVES.contains(&name) {
            end
        } else {
            self.skip_line_break(end)
        };
        Ok(())
    }

    /// `admin@php.net`: an `@` inside a word whose name runs on into a
    /// host name is part of an address, not a directive.
    fn in_address(&self, at: usize, name_end: usize) -> bool {
        let inside_word = self.source[..at]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        let continues = self.source[name_end..]
            .chars()
            .next()
            .is_some_and(|c| c == '.' || c == '-');
        inside_word && continues
    }

    /// Index of the `)` matching the `(` at `open`, skipping quoted strings.
    fn matching_paren(&self, open: usize, name: &str) -> Result<usize, ExprError> {
        let mut depth = 0usize;
        let mut quote: Option<char> = None;
        let mut escaped = false;

        for (i, c) in self.source[open..].char_indices() {
            if let Some(q) = quote {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '\'' | '"' => quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(open + i);
                    }
                }
                _ => {}
            }
        }

        Err(ExprError::new(
            format!("unclosed parenthesis in @{}", name),
            open..self.source.len(),
        ))
    }

    /// Skip trailing spaces and one line break, if nothing else is on the line.
    fn skip_line_break(&self, pos: usize) -> usize {
        let rest = &self.source[pos..];
        let trimmed = rest.trim_start_matches([' ', '\t']);
        let skipped = rest.len() - trimmed.len();
        if let Some(after) = trimmed.strip_prefix("\r\n") {
            self.source.len() - after.len()
        } else if trimmed.starts_with('\n') {
            pos + skipped + 1
        } else {
            pos
        }
    }
}
