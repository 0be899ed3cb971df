//! Structural model of a YAML document.
//!
//! # Responsibilities
//! - Confirm the text is valid YAML (via `serde_yaml`)
//! - Record every mapping key with its line, column, parent and value span
//! - Keep the original text untouched so edits can be applied in place
//!
//! # Design Decisions
//! - Sections are block mappings delimited by indentation, never by
//!   line-pattern heuristics
//! - Block scalars, multi-line quoted scalars and flow collections are
//!   opaque: nothing inside them is ever reported as a key
//! - Multi-document streams are supported; sections never span `---`

use std::ops::Range;

use serde::Deserialize;

use crate::patch::scalar::ScalarStyle;
use crate::patch::types::PatchError;

/// What follows a key's colon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Single-line plain or quoted scalar.
    Scalar(ScalarStyle),
    /// Nothing after the colon and no nested block (null).
    Empty,
    /// Nested block mapping. This is what a section is.
    Mapping,
    /// Nested block sequence.
    Sequence,
    /// `|` or `>` block scalar.
    BlockScalar,
    /// `{...}` flow mapping.
    FlowMapping,
    /// `[...]` flow sequence.
    FlowSequence,
    /// `*anchor` alias.
    Alias,
    /// Plain or quoted scalar that continues on following lines.
    Multiline,
}

impl ValueKind {
    /// True for values that are (or may resolve to) a mapping.
    ///
    /// Aliases count because their target is not resolved here.
    pub fn may_be_mapping(self) -> bool {
        matches!(self, Self::Mapping | Self::FlowMapping | Self::Alias)
    }
}

/// One mapping key found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Key with quotes removed.
    pub key: String,
    /// 1-based line number.
    pub line: usize,
    /// Column of the first character of the key.
    pub column: usize,
    /// Index of the document within a `---` separated stream.
    pub document: usize,
    /// Entry that owns the block this key lives in.
    pub parent: Option<usize>,
    pub kind: ValueKind,
    /// Byte range of the value in the document text. Empty for `Empty`
    /// values, where it marks the insertion point.
    pub value_span: Range<usize>,
}

/// A YAML document together with its key structure.
#[derive(Debug, Clone)]
pub struct StructuredDocument {
    text: String,
    entries: Vec<Entry>,
}

impl PartialEq for StructuredDocument {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for StructuredDocument {}

impl StructuredDocument {
    /// Parse `text` into the structural model.
    pub fn parse(text: impl Into<String>) -> Result<Self, PatchError> {
        let text = text.into();
        check_yaml(&text)?;
        let entries = Scanner::default().scan(&text)?;
        Ok(Self { text, entries })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Indices of the mapping entries named `key`, in document order.
    ///
    /// Flow mappings and aliases are included so that occurrence numbering
    /// matches what a YAML reader sees; only block mappings can be patched.
    pub fn sections<'a>(&'a self, key: &'a str) -> impl Iterator<Item = usize> + 'a {
        self.entries
            .iter()
            .enumerate()
            .filter(move |(_, e)| e.key == key && e.kind.may_be_mapping())
            .map(|(i, _)| i)
    }

    /// Index of the direct child `key` of entry `parent`.
    pub fn child(&self, parent: usize, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.parent == Some(parent) && e.key == key)
    }
}

fn check_yaml(text: &str) -> Result<(), PatchError> {
    for document in serde_yaml::Deserializer::from_str(text) {
        serde_yaml::Value::deserialize(document).map_err(|e| {
            let line = e.location().map(|l| l.line()).unwrap_or(0);
            PatchError::malformed(line, e.to_string())
        })?;
    }
    Ok(())
}

/// An open block that later, deeper lines may belong to.
#[derive(Debug)]
struct Frame {
    column: usize,
    entry: usize,
    has_children: bool,
    sequence_column: Option<usize>,
}

impl Frame {
    /// YAML lets a sequence sit at the same column as its owning key.
    fn accepts_sequence_at(&self, column: usize) -> bool {
        !self.has_children || self.sequence_column == Some(column)
    }
}

/// Multi-line construct whose continuation lines must be skipped.
#[derive(Debug, Clone, Copy)]
enum Pending {
    BlockScalar { column: usize },
    Quoted { quote: u8 },
    Flow { depth: i32 },
    PlainScalar { column: usize, entry: usize },
    /// Block scalar opened on a `---` line; runs to the next marker.
    DocumentScalar,
}

#[derive(Debug, Default)]
struct Scanner {
    entries: Vec<Entry>,
    stack: Vec<Frame>,
    pending: Option<Pending>,
    document: usize,
}

impl Scanner {
    fn scan(mut self, text: &str) -> Result<Vec<Entry>, PatchError> {
        let mut offset = 0;
        for (index, raw) in text.split_inclusive('\n').enumerate() {
            let content = raw.strip_suffix('\n').unwrap_or(raw);
            let content = content.strip_suffix('\r').unwrap_or(content);
            self.line(content, offset, index + 1)?;
            offset += raw.len();
        }

        match self.pending {
            Some(Pending::Quoted { .. }) => Err(PatchError::malformed(
                text.lines().count(),
                "unterminated quoted scalar",
            )),
            Some(Pending::Flow { .. }) => Err(PatchError::malformed(
                text.lines().count(),
                "unterminated flow collection",
            )),
            _ => Ok(self.entries),
        }
    }

    fn line(&mut self, content: &str, offset: usize, line: usize) -> Result<(), PatchError> {
        let trimmed = content.trim_start_matches(' ');
        let indent = content.len() - trimmed.len();
        let blank = trimmed.trim().is_empty();

        if let Some(pending) = self.pending {
            match pending {
                Pending::BlockScalar { column } => {
                    if blank || indent > column {
                        return Ok(());
                    }
                    self.pending = None;
                }
                Pending::Quoted { quote } => {
                    if find_closing_quote(content.as_bytes(), 0, quote).is_some() {
                        self.pending = None;
                    }
                    return Ok(());
                }
                Pending::Flow { depth } => {
                    let depth = depth + flow_depth(content);
                    self.pending = (depth > 0).then_some(Pending::Flow { depth });
                    return Ok(());
                }
                Pending::PlainScalar { column, entry } => {
                    if blank {
                        return Ok(());
                    }
                    if indent > column && !trimmed.starts_with('#') {
                        self.entries[entry].kind = ValueKind::Multiline;
                        return Ok(());
                    }
                    self.pending = None;
                }
                Pending::DocumentScalar => {
                    if !is_document_marker(content, "---") && !is_document_marker(content, "...") {
                        return Ok(());
                    }
                    self.pending = None;
                }
            }
        }

        if is_document_marker(content, "---") {
            self.document += 1;
            self.stack.clear();
            // `--- |`, `--- {..}`: the document root sits on the marker line.
            let (kind, _) = self.classify_value(content, 3, offset, 0, None);
            if kind == ValueKind::BlockScalar {
                self.pending = Some(Pending::DocumentScalar);
            }
            return Ok(());
        }
        if is_document_marker(content, "...") {
            self.stack.clear();
            return Ok(());
        }
        let rest = trimmed.trim_start();
        if blank || rest.starts_with('#') || (indent == 0 && rest.starts_with('%')) {
            return Ok(());
        }
        if trimmed.starts_with('\t') {
            return Err(PatchError::malformed(line, "tab character in indentation"));
        }

        let bytes = content.as_bytes();
        let mut pos = indent;
        let mut first_dash = None;
        while bytes.get(pos) == Some(&b'-') && matches!(bytes.get(pos + 1), None | Some(b' ')) {
            first_dash.get_or_insert(pos);
            pos += 1;
            while bytes.get(pos) == Some(&b' ') {
                pos += 1;
            }
        }

        let has_value = pos < bytes.len() && bytes[pos] != b'#';
        let key = if has_value { parse_key(content, pos) } else { None };

        self.close_frames(first_dash, pos);

        if first_dash.is_none() && key.is_none() {
            self.scalar_below_key(content, pos, offset);
            return Ok(());
        }

        let parent = self.attach_to_parent(first_dash);
        if !has_value {
            return Ok(());
        }

        let Some((key, after_colon)) = key else {
            // Sequence item holding a bare value.
            let column = first_dash.unwrap_or(indent);
            self.classify_value(content, pos, offset, column, None);
            return Ok(());
        };

        let index = self.entries.len();
        let (kind, value_span) =
            self.classify_value(content, after_colon, offset, pos, Some(index));
        self.entries.push(Entry {
            key,
            line,
            column: pos,
            document: self.document,
            parent,
            kind,
            value_span,
        });

        if kind == ValueKind::Empty {
            self.stack.push(Frame {
                column: pos,
                entry: index,
                has_children: false,
                sequence_column: None,
            });
        }
        Ok(())
    }

    /// A line that is neither a key nor a sequence item: either the value
    /// of the key above it or the continuation of a bare item.
    fn scalar_below_key(&mut self, content: &str, pos: usize, offset: usize) {
        match self.stack.last() {
            Some(top) if !top.has_children => {
                let (column, entry) = (top.column, top.entry);
                self.stack.pop();
                self.classify_value(content, pos, offset, column, Some(entry));
                self.entries[entry].kind = ValueKind::Multiline;
            }
            _ => {
                self.classify_value(content, pos, offset, pos, None);
            }
        }
    }

    /// Pop every frame that cannot own a line starting at `column`.
    fn close_frames(&mut self, first_dash: Option<usize>, column: usize) {
        while let Some(top) = self.stack.last() {
            let keep = match first_dash {
                Some(dash) => {
                    top.column < dash || (top.column == dash && top.accepts_sequence_at(dash))
                }
                None => top.column < column,
            };
            if keep {
                break;
            }
            self.stack.pop();
        }
    }

    /// Record that the innermost open frame has content and return its entry.
    fn attach_to_parent(&mut self, first_dash: Option<usize>) -> Option<usize> {
        let top = self.stack.last_mut()?;
        if !top.has_children {
            top.has_children = true;
            top.sequence_column = first_dash;
            self.entries[top.entry].kind = match first_dash {
                Some(_) => ValueKind::Sequence,
                None => ValueKind::Mapping,
            };
        }
        Some(top.entry)
    }

    /// Work out what the value starting at byte `start` of `content` is.
    ///
    /// `column` is the indentation that continuation lines must exceed and
    /// `entry` the key owning the value, if any. Multi-line constructs
    /// switch the scanner into skip mode.
    fn classify_value(
        &mut self,
        content: &str,
        start: usize,
        offset: usize,
        column: usize,
        entry: Option<usize>,
    ) -> (ValueKind, Range<usize>) {
        let bytes = content.as_bytes();
        let mut pos = skip_spaces(bytes, start);

        // Anchors and tags precede the value itself.
        while matches!(bytes.get(pos), Some(b'&') | Some(b'!')) {
            while pos < bytes.len() && bytes[pos] != b' ' {
                pos += 1;
            }
            pos = skip_spaces(bytes, pos);
        }

        let at = |r: Range<usize>| offset + r.start..offset + r.end;

        match bytes.get(pos).copied() {
            None | Some(b'#') => {
                let end = trailing_property_end(bytes, start);
                (ValueKind::Empty, at(end..end))
            }
            Some(b'|') | Some(b'>') => {
                self.pending = Some(Pending::BlockScalar { column });
                (ValueKind::BlockScalar, at(pos..bytes.len()))
            }
            Some(open @ (b'[' | b'{')) => {
                let depth = flow_depth(&content[pos..]);
                if depth > 0 {
                    self.pending = Some(Pending::Flow { depth });
                }
                let kind = if open == b'{' {
                    ValueKind::FlowMapping
                } else {
                    ValueKind::FlowSequence
                };
                (kind, at(pos..bytes.len()))
            }
            Some(b'*') => (ValueKind::Alias, at(pos..plain_end(bytes, pos))),
            Some(quote @ (b'"' | b'\'')) => match find_closing_quote(bytes, pos + 1, quote) {
                Some(close) => {
                    let style = if quote == b'"' {
                        ScalarStyle::DoubleQuoted
                    } else {
                        ScalarStyle::SingleQuoted
                    };
                    (ValueKind::Scalar(style), at(pos..close + 1))
                }
                None => {
                    self.pending = Some(Pending::Quoted { quote });
                    (ValueKind::Multiline, at(pos..bytes.len()))
                }
            },
            Some(_) => {
                if let Some(entry) = entry {
                    self.pending = Some(Pending::PlainScalar { column, entry });
                }
                (ValueKind::Scalar(ScalarStyle::Plain), at(pos..plain_end(bytes, pos)))
            }
        }
    }
}

fn is_document_marker(content: &str, marker: &str) -> bool {
    content
        .strip_prefix(marker)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with([' ', '\t']))
}

fn skip_spaces(bytes: &[u8], mut pos: usize) -> usize {
    while matches!(bytes.get(pos), Some(b' ') | Some(b'\t')) {
        pos += 1;
    }
    pos
}

/// Insertion point for a null value: right after the colon, or after any
/// anchor/tag that follows it.
fn trailing_property_end(bytes: &[u8], after_colon: usize) -> usize {
    let mut end = after_colon;
    let mut pos = skip_spaces(bytes, after_colon);
    while matches!(bytes.get(pos), Some(b'&') | Some(b'!')) {
        while pos < bytes.len() && bytes[pos] != b' ' {
            pos += 1;
        }
        end = pos;
        pos = skip_spaces(bytes, pos);
    }
    end
}

/// End of a plain scalar: before ` #` comment and trailing whitespace.
fn plain_end(bytes: &[u8], start: usize) -> usize {
    let mut end = bytes.len();
    for i in start..bytes.len() {
        if bytes[i] == b'#' && i > start && matches!(bytes[i - 1], b' ' | b'\t') {
            end = i;
            break;
        }
    }
    while end > start && matches!(bytes[end - 1], b' ' | b'\t') {
        end -= 1;
    }
    end
}

/// Position of the quote closing a scalar opened before `from`.
fn find_closing_quote(bytes: &[u8], from: usize, quote: u8) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if quote == b'"' => i += 2,
            b'\'' if quote == b'\'' => {
                if bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                } else {
                    return Some(i);
                }
            }
            b if b == quote => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Net bracket depth change of a flow collection fragment.
fn flow_depth(fragment: &str) -> i32 {
    let bytes = fragment.as_bytes();
    let mut depth = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'[' | b'{' => depth += 1,
            b']' | b'}' => depth -= 1,
            q @ (b'"' | b'\'') => match find_closing_quote(bytes, i + 1, q) {
                Some(close) => i = close,
                None => break,
            },
            b'#' if i == 0 || matches!(bytes[i - 1], b' ' | b'\t') => break,
            _ => {}
        }
        i += 1;
    }
    depth
}

/// Parse a mapping key at `pos`. Returns the key and the byte just past
/// its colon.
fn parse_key(content: &str, pos: usize) -> Option<(String, usize)> {
    let bytes = content.as_bytes();
    let first = *bytes.get(pos)?;

    let (key, colon) = match first {
        b'"' | b'\'' => {
            let close = find_closing_quote(bytes, pos + 1, first)?;
            let colon = skip_spaces(bytes, close + 1);
            if bytes.get(colon) != Some(&b':') {
                return None;
            }
            let inner = &content[pos + 1..close];
            let key = if first == b'\'' {
                inner.replace("''", "'")
            } else {
                inner.to_owned()
            };
            (key, colon)
        }
        b'[' | b'{' | b'#' | b'&' | b'*' | b'!' | b'|' | b'>' | b'%' | b'@' | b'`' => return None,
        b'?' if matches!(bytes.get(pos + 1), None | Some(b' ')) => return None,
        _ => {
            let mut colon = None;
            for i in pos..bytes.len() {
                match bytes[i] {
                    b'#' if i > pos && matches!(bytes[i - 1], b' ' | b'\t') => return None,
                    b':' if matches!(bytes.get(i + 1), None | Some(b' ') | Some(b'\t')) => {
                        colon = Some(i);
                        break;
                    }
                    _ => {}
                }
            }
            let colon = colon?;
            let key = content[pos..colon].trim_end();
            if key.is_empty() {
                return None;
            }
            (key.to_owned(), colon)
        }
    };

    if !matches!(bytes.get(colon + 1), None | Some(b' ') | Some(b'\t')) {
        return None;
    }
    Some((key, colon + 1))
}
