//! Dual-mode command parser.
//!
//! Classifies raw input lines as either traditional shell syntax (single
//! commands and pipelines) or an embedded script payload, and tokenizes
//! traditional input into [`ParsedCommand`]s.
//!
//! `parse` is total: it never fails, and malformed input degrades to an
//! empty or best-effort result. Completion and highlighting are read-only
//! annotation services layered on the same tokenizer; they never drive
//! execution semantics.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

/// Method-call pattern: `identifier.identifier` immediately followed by
/// an opening parenthesis (optionally after whitespace).
static METHOD_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*\.[A-Za-z_][A-Za-z0-9_]*\s*\(").unwrap());

/// Script keywords: async/await and variable-declaration keywords.
static SCRIPT_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:async|await|const|let|var|function)\b").unwrap());

/// Keyword span pattern for highlighting (includes `return`).
static HIGHLIGHT_KEYWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:const|let|var|function|async|await|return)\b").unwrap());

/// Method reference span pattern for highlighting (no call parens needed).
static HIGHLIGHT_METHOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z_][A-Za-z0-9_]*\.[A-Za-z_][A-Za-z0-9_]*").unwrap());

/// Quoted string span pattern for highlighting.
static HIGHLIGHT_STRING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""(?:[^"\\]|\\.)*"|'(?:[^'\\]|\\.)*'"#).unwrap());

/// The scripting-namespace prefix recognized by completion.
const SCRIPT_NAMESPACE: &str = "nexus.";

/// Namespace methods offered by completion when the partial word starts
/// with the scripting-namespace prefix.
const NAMESPACE_METHODS: &[&str] = &[
    "nexus.fs.readFile",
    "nexus.fs.writeFile",
    "nexus.fs.listDir",
    "nexus.fs.stat",
    "nexus.fs.watch",
    "nexus.proc.exec",
    "nexus.proc.list",
    "nexus.proc.kill",
    "nexus.proc.info",
    "nexus.net.get",
    "nexus.net.post",
    "nexus.net.download",
];

/// A single traditional command after tokenization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedCommand {
    /// Command name (token 0).
    pub name: String,
    /// Positional arguments in order, unquoted.
    pub args: Vec<String>,
    /// Flag map; unique keys, last write wins.
    pub flags: HashMap<String, String>,
    /// The raw text this command was parsed from.
    pub raw: String,
    /// Set when the raw text's final character is `&`.
    pub background: bool,
}

/// The result of classification and parsing. Exactly one shape is ever
/// populated.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedInput {
    /// Blank input.
    Empty,
    /// A single traditional command.
    Command(ParsedCommand),
    /// An ordered sequence of independently tokenized pipeline stages.
    Pipeline(Vec<ParsedCommand>),
    /// A verbatim script payload plus the original trimmed text.
    Script { payload: String, raw: String },
}

impl ParsedInput {
    pub fn is_script(&self) -> bool {
        matches!(self, ParsedInput::Script { .. })
    }
}

/// A highlighting span. Presentation metadata only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxToken {
    pub start: usize,
    pub len: usize,
    pub kind: TokenKind,
}

/// Highlight categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Command,
    Argument,
    Flag,
    String,
    Keyword,
    Method,
    Operator,
}

/// The dual-mode classifier and tokenizer.
#[derive(Debug)]
pub struct CommandParser {
    known_commands: Vec<&'static str>,
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandParser {
    pub fn new() -> Self {
        Self {
            // Builtins this kernel ships plus a few external staples the
            // completer should still offer.
            known_commands: vec![
                "ls", "cd", "pwd", "mkdir", "rm", "cp", "mv", "cat", "ps", "kill", "help",
                "exit", "touch", "find", "stat", "env", "date", "git", "curl", "echo",
            ],
        }
    }

    /// Classify and parse a raw input line. Total over all inputs.
    pub fn parse(&self, input: &str) -> ParsedInput {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return ParsedInput::Empty;
        }

        if contains_unescaped_pipe(trimmed) {
            let stages = split_pipeline(trimmed);
            // If any stage reads as script, the split was wrong: the whole
            // original text is one script payload.
            if stages.iter().any(|s| is_script_syntax(s)) {
                return ParsedInput::Script {
                    payload: trimmed.to_string(),
                    raw: trimmed.to_string(),
                };
            }
            return ParsedInput::Pipeline(
                stages.iter().map(|s| self.parse_single(s)).collect(),
            );
        }

        if is_script_syntax(trimmed) {
            return ParsedInput::Script {
                payload: trimmed.to_string(),
                raw: trimmed.to_string(),
            };
        }

        ParsedInput::Command(self.parse_single(trimmed))
    }

    /// Tokenize one traditional command string.
    pub fn parse_single(&self, command_str: &str) -> ParsedCommand {
        let mut cmd = ParsedCommand {
            raw: command_str.to_string(),
            ..Default::default()
        };

        let mut body = command_str;
        if body.ends_with('&') {
            cmd.background = true;
            body = body[..body.len() - 1].trim_end();
        }

        let mut tokens = tokenize(body).into_iter().map(|(tok, _)| tok);
        let Some(name) = tokens.next() else {
            return cmd;
        };
        cmd.name = name;

        for token in tokens {
            if let Some(rest) = token.strip_prefix("--") {
                match rest.split_once('=') {
                    Some((key, value)) => {
                        cmd.flags.insert(key.to_string(), unquote(value).to_string());
                    }
                    None => {
                        cmd.flags.insert(rest.to_string(), "true".to_string());
                    }
                }
            } else if token.starts_with('-') && token.len() > 1 {
                // Short flag bundle: each trailing character is an
                // independent boolean flag.
                for c in token.chars().skip(1) {
                    cmd.flags.insert(c.to_string(), "true".to_string());
                }
            } else {
                cmd.args.push(unquote(&token).to_string());
            }
        }

        cmd
    }

    /// Advisory syntax diagnostics. Parse itself never fails, so this only
    /// reports known-unsupported constructs.
    pub fn get_syntax_errors(&self, input: &str) -> Vec<String> {
        let _ = self.parse(input);
        let mut errors = Vec::new();
        if input.contains("&&") || input.contains("||") {
            errors.push("logical operators (&&, ||) are not supported".to_string());
        }
        errors
    }

    /// Prefix completions for the word under the cursor.
    pub fn get_completions(&self, partial_input: &str, cursor_pos: usize) -> Vec<String> {
        let mut cursor = cursor_pos.min(partial_input.len());
        // Byte offsets from the line editor can land inside a multi-byte
        // character; back up to the nearest boundary.
        while !partial_input.is_char_boundary(cursor) {
            cursor -= 1;
        }
        let before = &partial_input[..cursor];
        let word_start = before
            .rfind(|c: char| c == ' ' || c == '\t')
            .map(|i| i + 1)
            .unwrap_or(0);
        let partial = &before[word_start..];

        let mut completions: Vec<String> = self
            .known_commands
            .iter()
            .filter(|c| c.starts_with(partial) && !partial.is_empty())
            .map(|c| c.to_string())
            .collect();

        if partial.starts_with(SCRIPT_NAMESPACE) || SCRIPT_NAMESPACE.starts_with(partial) {
            completions.extend(
                NAMESPACE_METHODS
                    .iter()
                    .filter(|m| m.starts_with(partial) && !partial.is_empty())
                    .map(|m| m.to_string()),
            );
        }

        completions
    }

    /// Produce highlighting spans. An independent scan that never affects
    /// `parse`.
    pub fn tokenize_for_highlighting(&self, input: &str) -> Vec<SyntaxToken> {
        if is_script_syntax(input) {
            return highlight_script(input);
        }

        let mut spans = Vec::new();
        for (i, (token, start)) in tokenize(input).into_iter().enumerate() {
            let kind = if i == 0 {
                TokenKind::Command
            } else if token.starts_with('-') && token.len() > 1 {
                TokenKind::Flag
            } else if is_quoted(&token) {
                TokenKind::String
            } else {
                TokenKind::Argument
            };
            spans.push(SyntaxToken {
                start,
                len: token.len(),
                kind,
            });
        }
        spans
    }
}

/// Script heuristic: method-call pattern, arrow-function token, or one of
/// the script keywords.
fn is_script_syntax(input: &str) -> bool {
    input.contains("=>") || METHOD_CALL.is_match(input) || SCRIPT_KEYWORD.is_match(input)
}

/// True if the input contains a pipe outside quotes and not preceded by a
/// backslash.
fn contains_unescaped_pipe(input: &str) -> bool {
    let mut quote: Option<char> = None;
    let mut prev_backslash = false;
    for c in input.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                } else if c == '|' && !prev_backslash {
                    return true;
                }
            }
        }
        prev_backslash = c == '\\';
    }
    false
}

/// Split on unescaped pipes, trimming each stage.
pub(crate) fn split_pipeline(input: &str) -> Vec<String> {
    let mut stages = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut prev_backslash = false;

    for c in input.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                current.push(c);
            }
            None => {
                if c == '"' || c == '\'' {
                    quote = Some(c);
                    current.push(c);
                } else if c == '|' && !prev_backslash {
                    stages.push(current.trim().to_string());
                    current.clear();
                } else {
                    current.push(c);
                }
            }
        }
        prev_backslash = c == '\\';
    }
    stages.push(current.trim().to_string());
    stages
}

/// Single left-to-right scan maintaining quote state. Quote characters are
/// retained in the emitted token; whitespace ends a token only outside
/// quotes. Returns each token with its start offset.
fn tokenize(input: &str) -> Vec<(String, usize)> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut start = 0usize;
    let mut quote: Option<char> = None;

    for (i, c) in input.char_indices() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None => {
                if c == '"' || c == '\'' {
                    if current.is_empty() {
                        start = i;
                    }
                    quote = Some(c);
                    current.push(c);
                } else if c.is_whitespace() {
                    if !current.is_empty() {
                        tokens.push((std::mem::take(&mut current), start));
                    }
                } else {
                    if current.is_empty() {
                        start = i;
                    }
                    current.push(c);
                }
            }
        }
    }
    if !current.is_empty() {
        tokens.push((current, start));
    }
    tokens
}

/// Unquoted tokens of a command line, in order, for handing to an
/// external process as argv.
pub(crate) fn argv(input: &str) -> Vec<String> {
    tokenize(input)
        .into_iter()
        .map(|(tok, _)| unquote(&tok).to_string())
        .collect()
}

/// A token is quoted iff its first and last characters are matching quote
/// marks.
fn is_quoted(token: &str) -> bool {
    let bytes = token.as_bytes();
    token.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[token.len() - 1] == bytes[0]
}

/// Strip surrounding quotes from a quoted token; pass everything else
/// through unchanged.
fn unquote(token: &str) -> &str {
    if is_quoted(token) {
        &token[1..token.len() - 1]
    } else {
        token
    }
}

fn highlight_script(input: &str) -> Vec<SyntaxToken> {
    let mut spans = Vec::new();
    let patterns: [(&Regex, TokenKind); 3] = [
        (&HIGHLIGHT_KEYWORD, TokenKind::Keyword),
        (&HIGHLIGHT_METHOD, TokenKind::Method),
        (&HIGHLIGHT_STRING, TokenKind::String),
    ];
    for (pattern, kind) in patterns {
        for m in pattern.find_iter(input) {
            spans.push(SyntaxToken {
                start: m.start(),
                len: m.len(),
                kind,
            });
        }
    }
    for (pos, _) in input.match_indices("=>") {
        spans.push(SyntaxToken {
            start: pos,
            len: 2,
            kind: TokenKind::Operator,
        });
    }
    spans
}
