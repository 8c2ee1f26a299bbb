use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListKind {
    Bullet,
    Ordered,
}

/// Character formatting for a run. Closed set; there is no open
/// attribute map.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InlineAttrs {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub font: Option<String>,
    pub size: Option<f32>,
}

impl InlineAttrs {
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }
}

/// Paragraph formatting carried by the break that ends the paragraph
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockAttrs {
    pub header: Option<u8>,
    pub blockquote: bool,
    pub list: Option<ListKind>,
}

impl BlockAttrs {
    pub fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

/// A maximal span of identically formatted text within one paragraph
#[derive(Debug, Clone, PartialEq)]
pub struct StyledRun {
    pub text: String,
    pub attrs: InlineAttrs,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DocNode {
    Run(StyledRun),
    Break(BlockAttrs),
}

/// The in-memory document: an ordered sequence of runs and paragraph
/// breaks. A normalized document always ends with a break, so every
/// serialization is newline-terminated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub nodes: Vec<DocNode>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append run text, merging into the previous run when the attrs match.
    /// Empty text is dropped.
    pub fn push_run(&mut self, text: impl Into<String>, attrs: InlineAttrs) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        if let Some(DocNode::Run(last)) = self.nodes.last_mut() {
            if last.attrs == attrs {
                last.text.push_str(&text);
                return;
            }
        }
        self.nodes.push(DocNode::Run(StyledRun { text, attrs }));
    }

    pub fn push_break(&mut self, attrs: BlockAttrs) {
        self.nodes.push(DocNode::Break(attrs));
    }

    /// Append a plain break unless the document already ends with one.
    /// An empty document normalizes to a single break (`"\n"`).
    pub fn ensure_terminated(&mut self) {
        if !matches!(self.nodes.last(), Some(DocNode::Break(_))) {
            self.nodes.push(DocNode::Break(BlockAttrs::default()));
        }
    }

    /// Build an unformatted document from plain text
    pub fn from_plain_text(text: &str) -> Self {
        let mut doc = Document::new();
        let mut first = true;
        for piece in text.split('\n') {
            if !first {
                doc.push_break(BlockAttrs::default());
            }
            first = false;
            doc.push_run(piece, InlineAttrs::default());
        }
        doc.ensure_terminated();
        doc
    }

    /// Flatten to plain text, dropping all formatting
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            match node {
                DocNode::Run(run) => out.push_str(&run.text),
                DocNode::Break(_) => out.push('\n'),
            }
        }
        out
    }

    /// Convert to the editor's delta interchange form
    pub fn to_delta(&self) -> Vec<DeltaOp> {
        self.nodes
            .iter()
            .map(|node| match node {
                DocNode::Run(run) => DeltaOp {
                    insert: run.text.clone(),
                    attributes: DeltaAttrs::from_inline(&run.attrs),
                },
                DocNode::Break(attrs) => DeltaOp {
                    insert: "\n".to_string(),
                    attributes: DeltaAttrs::from_block(attrs),
                },
            })
            .collect()
    }

    /// Build a normalized document from delta ops. Inserts containing
    /// newlines are split; block attrs apply to the breaks they annotate.
    pub fn from_delta(ops: &[DeltaOp]) -> Self {
        let mut doc = Document::new();
        for op in ops {
            let attrs = op.attributes.clone().unwrap_or_default();
            let mut rest = op.insert.as_str();
            loop {
                match rest.find('\n') {
                    Some(idx) => {
                        doc.push_run(&rest[..idx], attrs.to_inline());
                        doc.push_break(attrs.to_block());
                        rest = &rest[idx + 1..];
                    }
                    None => {
                        doc.push_run(rest, attrs.to_inline());
                        break;
                    }
                }
            }
        }
        doc.ensure_terminated();
        doc
    }

    /// Serialize to delta JSON
    pub fn to_delta_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_delta())
    }

    /// Parse delta JSON
    pub fn from_delta_json(json: &str) -> Result<Self, serde_json::Error> {
        let ops: Vec<DeltaOp> = serde_json::from_str(json)?;
        Ok(Self::from_delta(&ops))
    }
}

/// One insert operation of the delta interchange form
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeltaOp {
    pub insert: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<DeltaAttrs>,
}

/// Attribute bag of a delta op. Inline and block attributes share the bag;
/// which half matters depends on whether the op is a paragraph terminator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DeltaAttrs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strike: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockquote: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<ListKind>,
}

impl DeltaAttrs {
    /// Attribute bag for a text run; None when nothing is set
    pub fn from_inline(attrs: &InlineAttrs) -> Option<Self> {
        if attrs.is_default() {
            return None;
        }
        Some(Self {
            bold: attrs.bold.then_some(true),
            italic: attrs.italic.then_some(true),
            underline: attrs.underline.then_some(true),
            strike: attrs.strike.then_some(true),
            font: attrs.font.clone(),
            size: attrs.size,
            ..Self::default()
        })
    }

    /// Attribute bag for a paragraph terminator; None when the paragraph
    /// is plain
    pub fn from_block(attrs: &BlockAttrs) -> Option<Self> {
        if attrs.is_plain() {
            return None;
        }
        Some(Self {
            header: attrs.header,
            blockquote: attrs.blockquote.then_some(true),
            list: attrs.list,
            ..Self::default()
        })
    }

    pub fn to_inline(&self) -> InlineAttrs {
        InlineAttrs {
            bold: self.bold.unwrap_or(false),
            italic: self.italic.unwrap_or(false),
            underline: self.underline.unwrap_or(false),
            strike: self.strike.unwrap_or(false),
            font: self.font.clone(),
            size: self.size,
        }
    }

    pub fn to_block(&self) -> BlockAttrs {
        BlockAttrs {
            header: self.header,
            blockquote: self.blockquote.unwrap_or(false),
            list: self.list,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold() -> InlineAttrs {
        InlineAttrs {
            bold: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_plain_text_round_trip() {
        let doc = Document::from_plain_text("first line\nsecond line\n");
        assert_eq!(doc.to_plain_text(), "first line\nsecond line\n");
        assert_eq!(doc.nodes.len(), 4);
    }

    #[test]
    fn test_plain_text_normalizes_missing_terminator() {
        let doc = Document::from_plain_text("no trailing newline");
        assert_eq!(doc.to_plain_text(), "no trailing newline\n");
    }

    #[test]
    fn test_empty_text_becomes_single_break() {
        let doc = Document::from_plain_text("");
        assert_eq!(doc.nodes, vec![DocNode::Break(BlockAttrs::default())]);
        assert_eq!(doc.to_plain_text(), "\n");
    }

    #[test]
    fn test_push_run_merges_equal_attrs() {
        let mut doc = Document::new();
        doc.push_run("Hello ", bold());
        doc.push_run("world", bold());
        doc.push_run("!", InlineAttrs::default());
        assert_eq!(doc.nodes.len(), 2);
        match &doc.nodes[0] {
            DocNode::Run(run) => assert_eq!(run.text, "Hello world"),
            other => panic!("expected run, got {:?}", other),
        }
    }

    #[test]
    fn test_push_run_drops_empty_text() {
        let mut doc = Document::new();
        doc.push_run("", bold());
        assert!(doc.nodes.is_empty());
    }

    #[test]
    fn test_delta_round_trip() {
        let mut doc = Document::new();
        doc.push_run("Title", InlineAttrs::default());
        doc.push_break(BlockAttrs {
            header: Some(2),
            ..Default::default()
        });
        doc.push_run("bold", bold());
        doc.push_run(" and plain", InlineAttrs::default());
        doc.push_break(BlockAttrs::default());
        doc.push_run("quoted", InlineAttrs::default());
        doc.push_break(BlockAttrs {
            blockquote: true,
            ..Default::default()
        });
        doc.push_run("item", InlineAttrs::default());
        doc.push_break(BlockAttrs {
            list: Some(ListKind::Bullet),
            ..Default::default()
        });

        let ops = doc.to_delta();
        assert_eq!(Document::from_delta(&ops), doc);
    }

    #[test]
    fn test_delta_json_shape() {
        let mut doc = Document::new();
        doc.push_run("x", bold());
        doc.push_break(BlockAttrs {
            header: Some(1),
            ..Default::default()
        });

        let json = doc.to_delta_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["insert"], "x");
        assert_eq!(value[0]["attributes"]["bold"], true);
        assert!(value[0]["attributes"].get("italic").is_none());
        assert_eq!(value[1]["insert"], "\n");
        assert_eq!(value[1]["attributes"]["header"], 1);
    }

    #[test]
    fn test_delta_json_plain_run_has_no_attributes_key() {
        let doc = Document::from_plain_text("plain\n");
        let json = doc.to_delta_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value[0].get("attributes").is_none());
    }

    #[test]
    fn test_from_delta_splits_embedded_newlines() {
        let json = r#"[
            {"insert": "one\ntwo"},
            {"insert": "\n", "attributes": {"list": "ordered"}}
        ]"#;
        let doc = Document::from_delta_json(json).unwrap();
        assert_eq!(
            doc.nodes,
            vec![
                DocNode::Run(StyledRun {
                    text: "one".to_string(),
                    attrs: InlineAttrs::default(),
                }),
                DocNode::Break(BlockAttrs::default()),
                DocNode::Run(StyledRun {
                    text: "two".to_string(),
                    attrs: InlineAttrs::default(),
                }),
                DocNode::Break(BlockAttrs {
                    list: Some(ListKind::Ordered),
                    ..Default::default()
                }),
            ]
        );
    }

    #[test]
    fn test_from_delta_ignores_unknown_attributes() {
        let json = r#"[{"insert": "x", "attributes": {"color": "red", "bold": true}}]"#;
        let doc = Document::from_delta_json(json).unwrap();
        match &doc.nodes[0] {
            DocNode::Run(run) => assert!(run.attrs.bold),
            other => panic!("expected run, got {:?}", other),
        }
    }
}
