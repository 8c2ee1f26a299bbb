use crate::storage::{BlockAttrs, DocNode, Document, InlineAttrs, ListKind};

/// Font carried at table index 0 when runs name no other
pub(crate) const DEFAULT_FONT: &str = "Helvetica";

/// Heading preset sizes per level, in half-points (24pt down to 9pt)
pub(crate) const HEADING_SIZES_HALF: [u16; 6] = [48, 36, 28, 24, 20, 18];

/// Preset size for a heading level, clamped to 1..=6
pub(crate) fn heading_size_half(level: u8) -> u16 {
    HEADING_SIZES_HALF[(level.clamp(1, 6) - 1) as usize]
}

/// Serialize a document to the tagged rich markup form
pub fn document_to_rtf(doc: &Document) -> String {
    let fonts = FontTable::collect(doc);
    let mut out = String::from("{\\rtf1\\ansi\\ansicpg1252\\deff0\\uc1");
    out.push_str(&fonts.header());
    out.push('\n');

    let mut para = String::new();
    let mut open: Option<InlineAttrs> = None;
    let mut ordered_n: u32 = 0;

    for node in &doc.nodes {
        match node {
            DocNode::Run(run) => {
                for (i, piece) in run.text.split('\n').enumerate() {
                    if i > 0 {
                        // embedded newline: hard paragraph break with no attrs
                        close_group(&mut para, &mut open);
                        flush_paragraph(&mut out, &mut para, &BlockAttrs::default(), &mut ordered_n);
                    }
                    if !piece.is_empty() {
                        append_run(&mut para, &mut open, piece, &run.attrs, &fonts);
                    }
                }
            }
            DocNode::Break(attrs) => {
                close_group(&mut para, &mut open);
                flush_paragraph(&mut out, &mut para, attrs, &mut ordered_n);
            }
        }
    }
    if !para.is_empty() || open.is_some() {
        close_group(&mut para, &mut open);
        flush_paragraph(&mut out, &mut para, &BlockAttrs::default(), &mut ordered_n);
    }

    out.push('}');
    out
}

/// Document font table; index 0 is always the editor default
struct FontTable {
    names: Vec<String>,
}

impl FontTable {
    fn collect(doc: &Document) -> Self {
        let mut names = vec![DEFAULT_FONT.to_string()];
        for node in &doc.nodes {
            if let DocNode::Run(run) = node {
                if let Some(font) = &run.attrs.font {
                    if !names.iter().any(|n| n == font) {
                        names.push(font.clone());
                    }
                }
            }
        }
        Self { names }
    }

    fn index_of(&self, name: &str) -> usize {
        self.names.iter().position(|n| n == name).unwrap_or(0)
    }

    fn header(&self) -> String {
        let mut out = String::from("{\\fonttbl");
        for (i, name) in self.names.iter().enumerate() {
            out.push_str(&format!("{{\\f{}\\fnil\\fcharset0 {};}}", i, name));
        }
        out.push('}');
        out
    }
}

/// Append run text to the paragraph buffer, opening or switching the
/// inline formatting group as needed
fn append_run(
    para: &mut String,
    open: &mut Option<InlineAttrs>,
    text: &str,
    attrs: &InlineAttrs,
    fonts: &FontTable,
) {
    if open.as_ref() != Some(attrs) {
        close_group(para, open);
        if !attrs.is_default() {
            para.push('{');
            para.push_str(&group_prefix(attrs, fonts));
            para.push(' ');
            *open = Some(attrs.clone());
        }
    }
    escape_into(para, text);
}

fn close_group(para: &mut String, open: &mut Option<InlineAttrs>) {
    if open.take().is_some() {
        para.push('}');
    }
}

/// Control words for an inline formatting group, without the delimiter
fn group_prefix(attrs: &InlineAttrs, fonts: &FontTable) -> String {
    let mut words = String::new();
    if let Some(font) = &attrs.font {
        words.push_str(&format!("\\f{}", fonts.index_of(font)));
    }
    if let Some(size) = attrs.size {
        words.push_str(&format!("\\fs{}", (size * 2.0).round() as i32));
    }
    if attrs.bold {
        words.push_str("\\b");
    }
    if attrs.italic {
        words.push_str("\\i");
    }
    if attrs.underline {
        words.push_str("\\ul");
    }
    if attrs.strike {
        words.push_str("\\strike");
    }
    words
}

/// Emit the buffered paragraph wrapped in its block markup
fn flush_paragraph(out: &mut String, para: &mut String, attrs: &BlockAttrs, ordered_n: &mut u32) {
    out.push_str("\\pard");
    if let Some(level) = attrs.header {
        out.push_str(&format!("\\outlinelevel{}", level.clamp(1, 6) - 1));
    }
    if attrs.blockquote {
        out.push_str("\\li720\\ri720");
    }
    if let Some(kind) = attrs.list {
        if !attrs.blockquote {
            out.push_str("\\li720");
        }
        out.push_str("\\fi-360");
        match kind {
            ListKind::Bullet => out.push_str("{\\pntext\\bullet\\tab}"),
            ListKind::Ordered => {
                *ordered_n += 1;
                out.push_str(&format!("{{\\pntext {}.\\tab}}", ordered_n));
            }
        }
    }
    if attrs.list != Some(ListKind::Ordered) {
        *ordered_n = 0;
    }

    // heading content carries the preset in a group so the formatting
    // state is restored before the next paragraph
    match attrs.header {
        Some(level) => {
            out.push_str(&format!("{{\\b\\fs{} ", heading_size_half(level)));
            out.push_str(para);
            out.push('}');
        }
        None => {
            // delimiter after the last control word; after a marker group's
            // closing brace a space would read back as text
            if !out.ends_with('}') {
                out.push(' ');
            }
            out.push_str(para);
        }
    }
    out.push_str("\\par\n");
    para.clear();
}

/// Escape text for emission inside a group
fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '{' => out.push_str("\\{"),
            '}' => out.push_str("\\}"),
            '\t' => out.push_str("\\tab "),
            ch if (ch as u32) < 0x20 => out.push_str(&format!("\\'{:02x}", ch as u32)),
            ch if (ch as u32) < 0x80 => out.push(ch),
            ch if (ch as u32) <= 0xFF => out.push_str(&format!("\\'{:02x}", ch as u32)),
            ch => escape_unicode(out, ch),
        }
    }
}

/// `\uN` escape with a `?` fallback; code points above U+FFFF emit a
/// surrogate pair, matching what other word processors produce
fn escape_unicode(out: &mut String, ch: char) {
    let cp = ch as u32;
    if cp <= 0xFFFF {
        out.push_str(&format!("\\u{}?", cp as u16 as i16));
    } else {
        let mut units = [0u16; 2];
        for unit in ch.encode_utf16(&mut units).iter() {
            out.push_str(&format!("\\u{}?", *unit as i16));
        }
    }
}
