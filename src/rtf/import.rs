use std::collections::HashMap;

use crate::storage::{BlockAttrs, DocNode, Document, InlineAttrs, ListKind};

use super::export::heading_size_half;

/// Parse tagged rich markup into a document.
///
/// Never fails: input that is not markup at all becomes a single
/// unformatted document, and unrecognized structure inside markup degrades
/// to plain text. Losing formatting is acceptable; losing text is not.
pub fn rtf_to_document(input: &str) -> Document {
    if !input.trim_start().starts_with("{\\rtf") {
        return Document::from_plain_text(input);
    }
    let fonts = harvest_fonts(input);
    Scanner::new(input, fonts).run()
}

/// Inline formatting state. Copied on group open, restored on close.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct StyleState {
    bold: bool,
    italic: bool,
    underline: bool,
    strike: bool,
    font: Option<i32>,
    size_half: Option<i32>,
}

impl StyleState {
    fn to_attrs(self, fonts: &HashMap<i32, String>) -> InlineAttrs {
        InlineAttrs {
            bold: self.bold,
            italic: self.italic,
            underline: self.underline,
            strike: self.strike,
            font: self.font.and_then(|i| fonts.get(&i).cloned()),
            size: self.size_half.map(|h| h as f32 / 2.0),
        }
    }
}

/// Paragraph properties accumulated since the last `\pard`
#[derive(Debug, Clone, Copy, Default)]
struct PendingParagraph {
    header: Option<u8>,
    left_indent: i32,
    right_indent: i32,
    list: Option<ListKind>,
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
    fonts: HashMap<i32, String>,
    doc: Document,
    buf: String,
    state: StyleState,
    stack: Vec<StyleState>,
    pending: PendingParagraph,
    para_start: usize,
    just_opened: bool,
    uc_skip: u32,
    pending_high: Option<u16>,
}

impl Scanner {
    fn new(input: &str, fonts: HashMap<i32, String>) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            fonts,
            doc: Document::new(),
            buf: String::new(),
            state: StyleState::default(),
            stack: Vec::new(),
            pending: PendingParagraph::default(),
            para_start: 0,
            just_opened: false,
            uc_skip: 1,
            pending_high: None,
        }
    }

    fn run(mut self) -> Document {
        while let Some(ch) = self.next_char() {
            match ch {
                '{' => {
                    self.stack.push(self.state);
                    self.just_opened = true;
                }
                '}' => {
                    self.just_opened = false;
                    self.flush();
                    if let Some(prev) = self.stack.pop() {
                        self.state = prev;
                    }
                }
                '\\' => self.control(),
                // raw newlines in the source are markup whitespace, not text
                '\r' | '\n' => {}
                ch => {
                    self.just_opened = false;
                    self.buf.push(ch);
                }
            }
        }
        self.finish()
    }

    fn finish(mut self) -> Document {
        self.flush();
        if !matches!(self.doc.nodes.last(), Some(DocNode::Break(_))) {
            let block = self.block_attrs();
            if let Some(level) = block.header {
                self.strip_heading_preset(level);
            }
            self.doc.push_break(block);
        }
        self.doc
    }

    fn next_char(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    /// Move buffered text into a run tagged with the current style
    fn flush(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.buf);
        let attrs = self.state.to_attrs(&self.fonts);
        self.doc.push_run(text, attrs);
    }

    /// Dispatch after a backslash
    fn control(&mut self) {
        let Some(ch) = self.next_char() else { return };
        if !ch.is_ascii_alphabetic() {
            self.symbol(ch);
            return;
        }

        let mut name = String::new();
        name.push(ch);
        while let Some(c) = self.peek_char() {
            if c.is_ascii_alphabetic() {
                name.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }

        let mut negative = false;
        if self.peek_char() == Some('-') {
            negative = true;
            self.pos += 1;
        }
        let mut digits = String::new();
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        let param = if digits.is_empty() {
            None
        } else {
            let value: i64 = digits.parse().unwrap_or(0);
            let value = if negative { -value } else { value };
            Some(value.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
        };

        // a single space after a control word is its delimiter, not text
        if self.peek_char() == Some(' ') {
            self.pos += 1;
        }

        self.word(&name, param);
    }

    fn symbol(&mut self, ch: char) {
        match ch {
            '\\' | '{' | '}' => {
                self.just_opened = false;
                self.buf.push(ch);
            }
            '\'' => {
                self.just_opened = false;
                let hi = self.next_char().and_then(|c| c.to_digit(16));
                let lo = self.next_char().and_then(|c| c.to_digit(16));
                if let (Some(h), Some(l)) = (hi, lo) {
                    if let Some(c) = char::from_u32(h * 16 + l) {
                        self.buf.push(c);
                    }
                }
            }
            '*' => {
                // {\*\dest ...} is an ignorable destination
                if self.just_opened {
                    self.skip_group();
                    self.pop_after_skip();
                }
            }
            '~' => {
                self.just_opened = false;
                self.buf.push('\u{a0}');
            }
            _ => {
                self.just_opened = false;
            }
        }
    }

    fn word(&mut self, name: &str, param: Option<i32>) {
        let was_opened = self.just_opened;
        self.just_opened = false;
        match name {
            // non-content destinations; the font table was harvested up front
            "fonttbl" | "colortbl" | "stylesheet" | "info" | "pict" if was_opened => {
                self.skip_group();
                self.pop_after_skip();
            }
            // list item marker: skipped as content, sniffed for the kind
            "pntext" if was_opened => {
                let raw = self.skip_group();
                self.pop_after_skip();
                self.pending.list = Some(classify_marker(&raw));
            }
            "b" => {
                self.flush();
                self.state.bold = param != Some(0);
            }
            "i" => {
                self.flush();
                self.state.italic = param != Some(0);
            }
            "ul" => {
                self.flush();
                self.state.underline = param != Some(0);
            }
            "ulnone" => {
                self.flush();
                self.state.underline = false;
            }
            "strike" => {
                self.flush();
                self.state.strike = param != Some(0);
            }
            "f" => {
                if let Some(idx) = param {
                    self.flush();
                    self.state.font = Some(idx);
                }
            }
            "fs" => {
                if let Some(half) = param {
                    self.flush();
                    self.state.size_half = Some(half);
                }
            }
            "plain" => {
                self.flush();
                self.state = StyleState::default();
            }
            "par" => self.end_paragraph(),
            "line" => self.buf.push('\n'),
            "tab" => self.buf.push('\t'),
            "pard" => self.pending = PendingParagraph::default(),
            "outlinelevel" => {
                if let Some(level) = param {
                    self.pending.header = Some(level.saturating_add(1).clamp(1, 6) as u8);
                }
            }
            "li" => self.pending.left_indent = param.unwrap_or(0),
            "ri" => self.pending.right_indent = param.unwrap_or(0),
            "uc" => self.uc_skip = param.unwrap_or(1).max(0) as u32,
            "u" => self.unicode_escape(param),
            "bullet" => self.buf.push('\u{2022}'),
            "endash" => self.buf.push('\u{2013}'),
            "emdash" => self.buf.push('\u{2014}'),
            "lquote" => self.buf.push('\u{2018}'),
            "rquote" => self.buf.push('\u{2019}'),
            "ldblquote" => self.buf.push('\u{201c}'),
            "rdblquote" => self.buf.push('\u{201d}'),
            // every other control word is ignored
            _ => {}
        }
    }

    fn end_paragraph(&mut self) {
        self.flush();
        let block = self.block_attrs();
        if let Some(level) = block.header {
            self.strip_heading_preset(level);
        }
        self.doc.push_break(block);
        self.para_start = self.doc.nodes.len();
        // the marker belongs to one item; indents and heading level persist
        // until the next \pard, like paragraph properties do
        self.pending.list = None;
    }

    fn block_attrs(&self) -> BlockAttrs {
        BlockAttrs {
            header: self.pending.header,
            blockquote: self.pending.left_indent >= 720 && self.pending.right_indent >= 720,
            list: self.pending.list,
        }
    }

    /// Exported headings carry a bold/size preset so other readers render
    /// them; fold that preset back out of the runs
    fn strip_heading_preset(&mut self, level: u8) {
        let preset_size = heading_size_half(level) as f32 / 2.0;
        for node in &mut self.doc.nodes[self.para_start..] {
            if let DocNode::Run(run) = node {
                run.attrs.bold = false;
                if run.attrs.size == Some(preset_size) {
                    run.attrs.size = None;
                }
            }
        }
    }

    fn unicode_escape(&mut self, param: Option<i32>) {
        let Some(value) = param else { return };
        let unit = ((value % 65536 + 65536) % 65536) as u16;
        if (0xD800..0xDC00).contains(&unit) {
            self.pending_high = Some(unit);
        } else if (0xDC00..0xE000).contains(&unit) {
            if let Some(high) = self.pending_high.take() {
                let cp = 0x10000 + ((high as u32 - 0xD800) << 10) + (unit as u32 - 0xDC00);
                if let Some(c) = char::from_u32(cp) {
                    self.buf.push(c);
                }
            }
        } else {
            self.pending_high = None;
            if let Some(c) = char::from_u32(unit as u32) {
                self.buf.push(c);
            }
        }
        self.skip_fallback();
    }

    /// Consume the fallback characters that follow a `\uN` escape
    fn skip_fallback(&mut self) {
        for _ in 0..self.uc_skip {
            match self.peek_char() {
                Some('\\') => {
                    // only \'xx counts as a single fallback character; any
                    // other control belongs to the document
                    if self.peek_at(1) == Some('\'') {
                        self.pos += 2;
                        let _ = self.next_char();
                        let _ = self.next_char();
                    } else {
                        break;
                    }
                }
                Some('{') | Some('}') | None => break,
                Some(_) => self.pos += 1,
            }
        }
    }

    /// Consume the rest of the current group, tracking nesting. Escaped
    /// braces are handled so they cannot unbalance the count. Returns the
    /// raw consumed text for marker sniffing.
    fn skip_group(&mut self) -> String {
        let mut depth = 1u32;
        let mut raw = String::new();
        while let Some(ch) = self.next_char() {
            match ch {
                '{' => {
                    depth += 1;
                    raw.push(ch);
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    raw.push(ch);
                }
                '\\' => {
                    raw.push('\\');
                    if let Some(next) = self.next_char() {
                        raw.push(next);
                    }
                }
                ch => raw.push(ch),
            }
        }
        raw
    }

    /// `skip_group` consumed the matching close brace, so restore the state
    /// pushed when the group opened
    fn pop_after_skip(&mut self) {
        self.just_opened = false;
        if let Some(prev) = self.stack.pop() {
            self.state = prev;
        }
    }
}

/// Decide the list kind from the raw text of a marker group
fn classify_marker(raw: &str) -> ListKind {
    if raw.contains("bullet") || raw.contains('\u{2022}') || raw.contains("'95") {
        ListKind::Bullet
    } else if raw.chars().any(|c| c.is_ascii_digit()) {
        ListKind::Ordered
    } else {
        ListKind::Bullet
    }
}

/// Collect the font table (index to name) before the main scan
fn harvest_fonts(input: &str) -> HashMap<i32, String> {
    let mut fonts = HashMap::new();
    let Some(start) = input.find("{\\fonttbl") else {
        return fonts;
    };
    let chars: Vec<char> = input[start..].chars().collect();
    let mut pos = "{\\fonttbl".len();
    let mut depth = 1u32;
    let mut index: Option<i32> = None;
    let mut name = String::new();

    let store = |index: &mut Option<i32>, name: &mut String, fonts: &mut HashMap<i32, String>| {
        if let Some(idx) = index.take() {
            let trimmed = name.trim();
            if !trimmed.is_empty() {
                fonts.insert(idx, trimmed.to_string());
            }
        }
        name.clear();
    };

    while pos < chars.len() && depth > 0 {
        let ch = chars[pos];
        pos += 1;
        match ch {
            '{' => depth += 1,
            '}' => {
                store(&mut index, &mut name, &mut fonts);
                depth -= 1;
            }
            ';' => store(&mut index, &mut name, &mut fonts),
            '\\' => {
                let mut word = String::new();
                while pos < chars.len() && chars[pos].is_ascii_alphabetic() {
                    word.push(chars[pos]);
                    pos += 1;
                }
                let mut negative = false;
                if pos < chars.len() && chars[pos] == '-' {
                    negative = true;
                    pos += 1;
                }
                let mut digits = String::new();
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    digits.push(chars[pos]);
                    pos += 1;
                }
                if pos < chars.len() && chars[pos] == ' ' {
                    pos += 1;
                }
                if word.is_empty() {
                    // symbol escape inside a font name
                    if pos < chars.len() {
                        let sym = chars[pos];
                        pos += 1;
                        match sym {
                            '\\' | '{' | '}' => {
                                if index.is_some() {
                                    name.push(sym);
                                }
                            }
                            '\'' if pos + 1 < chars.len() => {
                                let hi = chars[pos].to_digit(16);
                                let lo = chars[pos + 1].to_digit(16);
                                pos += 2;
                                if let (Some(h), Some(l)) = (hi, lo) {
                                    if let (true, Some(c)) = (index.is_some(), char::from_u32(h * 16 + l)) {
                                        name.push(c);
                                    }
                                }
                            }
                            _ => {}
                        }
                    }
                } else if word == "f" && !digits.is_empty() {
                    // a new entry begins; flat tables have no close brace
                    store(&mut index, &mut name, &mut fonts);
                    let value: i32 = digits.parse().unwrap_or(0);
                    index = Some(if negative { -value } else { value });
                }
            }
            ch => {
                if index.is_some() {
                    name.push(ch);
                }
            }
        }
    }
    fonts
}
