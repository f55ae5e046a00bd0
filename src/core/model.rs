use serde::{Deserialize, Serialize};

use crate::core::confidence::mean_confidence;
use crate::core::geometry::Rect;

/// Separator between paragraphs inside a block, and between blocks on a page.
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";
pub const LINE_SEPARATOR: &str = "\n";
pub const WORD_SEPARATOR: &str = " ";

/// The five levels of the recognition tree, outermost first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Block,
    Paragraph,
    TextLine,
    Word,
    Symbol,
}

impl Level {
    pub const ALL: [Level; 5] = [
        Level::Block,
        Level::Paragraph,
        Level::TextLine,
        Level::Word,
        Level::Symbol,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Level> {
        Self::ALL.get(index).copied()
    }

    pub fn parent(self) -> Option<Level> {
        self.index().checked_sub(1).and_then(Level::from_index)
    }

    pub fn child(self) -> Option<Level> {
        Level::from_index(self.index() + 1)
    }

    /// Levels from `self` down to `Symbol`, inclusive.
    pub fn and_below(self) -> impl DoubleEndedIterator<Item = Level> {
        Self::ALL.into_iter().skip(self.index())
    }

    /// Short tag name used by the tree dump.
    pub fn tag(self) -> &'static str {
        match self {
            Level::Block => "block",
            Level::Paragraph => "para",
            Level::TextLine => "line",
            Level::Word => "word",
            Level::Symbol => "symbol",
        }
    }
}

/// One recognition pass over a page (or over its region of interest).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageLayout {
    pub width: u32,
    pub height: u32,
    pub region: Rect,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Block {
    pub bbox: Rect,
    pub confidence: f32,
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paragraph {
    pub bbox: Rect,
    pub confidence: f32,
    pub lines: Vec<TextLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextLine {
    pub bbox: Rect,
    pub confidence: f32,
    pub words: Vec<Word>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Word {
    pub bbox: Rect,
    pub confidence: f32,
    pub text: String,
    #[serde(default)]
    pub is_from_dictionary: bool,
    #[serde(default)]
    pub is_numeric: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub symbols: Vec<Symbol>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Symbol {
    pub bbox: Rect,
    pub confidence: f32,
    pub text: String,
    #[serde(default)]
    pub is_superscript: bool,
    #[serde(default)]
    pub is_dropcap: bool,
    /// Ranked alternative recognitions, best first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Choice {
    pub text: String,
    pub confidence: f32,
}

impl PageLayout {
    pub fn new(width: u32, height: u32, region: Rect, blocks: Vec<Block>) -> Self {
        Self {
            width,
            height,
            region,
            blocks,
        }
    }

    /// A page with no recognized content covering the full image.
    pub fn empty(width: u32, height: u32) -> Self {
        Self::new(width, height, Rect::new(0, 0, width, height), Vec::new())
    }

    pub fn extent(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Full page text: blocks separated by a blank line, terminated by a newline.
    pub fn text(&self) -> String {
        if self.blocks.is_empty() {
            return String::new();
        }
        let mut text = join_texts(self.blocks.iter().map(Block::text), PARAGRAPH_SEPARATOR);
        text.push_str(LINE_SEPARATOR);
        text
    }

    pub fn words(&self) -> impl Iterator<Item = &Word> {
        self.lines().flat_map(|line| line.words.iter())
    }

    pub fn lines(&self) -> impl Iterator<Item = &TextLine> {
        self.blocks
            .iter()
            .flat_map(|block| block.paragraphs.iter())
            .flat_map(|paragraph| paragraph.lines.iter())
    }

    /// Mean word confidence, 0 for a page without words.
    pub fn mean_confidence(&self) -> f32 {
        mean_confidence(self.words().map(|w| w.confidence)).unwrap_or(0.0)
    }

    /// Bounding boxes of every node at `level`, in document order.
    pub fn segmented_regions(&self, level: Level) -> Vec<Rect> {
        let mut regions = Vec::new();
        for block in &self.blocks {
            if level == Level::Block {
                regions.push(block.bbox);
                continue;
            }
            for paragraph in &block.paragraphs {
                if level == Level::Paragraph {
                    regions.push(paragraph.bbox);
                    continue;
                }
                for line in &paragraph.lines {
                    match level {
                        Level::TextLine => regions.push(line.bbox),
                        Level::Word => regions.extend(line.words.iter().map(|w| w.bbox)),
                        _ => regions.extend(
                            line.words
                                .iter()
                                .flat_map(|w| w.symbols.iter().map(|s| s.bbox)),
                        ),
                    }
                }
            }
        }
        regions
    }

    /// Number of children at `level` under the node addressed by `path`
    /// (the indices of the ancestors, outermost first). A path that is too
    /// short or points past the tree counts as empty.
    pub fn child_count(&self, level: Level, path: &[usize]) -> usize {
        let at = |i: usize| path.get(i).copied();
        let count = match level {
            Level::Block => Some(self.blocks.len()),
            Level::Paragraph => at(0)
                .and_then(|b| self.blocks.get(b))
                .map(|b| b.paragraphs.len()),
            Level::TextLine => at(0)
                .and_then(|b| self.blocks.get(b))
                .zip(at(1))
                .and_then(|(b, p)| b.paragraphs.get(p))
                .map(|p| p.lines.len()),
            Level::Word => at(0)
                .and_then(|b| self.blocks.get(b))
                .zip(at(1))
                .and_then(|(b, p)| b.paragraphs.get(p))
                .zip(at(2))
                .and_then(|(p, l)| p.lines.get(l))
                .map(|l| l.words.len()),
            Level::Symbol => at(0)
                .and_then(|b| self.blocks.get(b))
                .zip(at(1))
                .and_then(|(b, p)| b.paragraphs.get(p))
                .zip(at(2))
                .and_then(|(p, l)| p.lines.get(l))
                .zip(at(3))
                .and_then(|(l, w)| l.words.get(w))
                .map(|w| w.symbols.len()),
        };
        count.unwrap_or(0)
    }

    /// The node at `level` addressed by the first `level + 1` entries of `indices`.
    pub fn node(&self, indices: &[usize; 5], level: Level) -> Option<NodeRef<'_>> {
        let block = self.blocks.get(indices[0])?;
        if level == Level::Block {
            return Some(NodeRef::Block(block));
        }
        let paragraph = block.paragraphs.get(indices[1])?;
        if level == Level::Paragraph {
            return Some(NodeRef::Paragraph(paragraph));
        }
        let line = paragraph.lines.get(indices[2])?;
        if level == Level::TextLine {
            return Some(NodeRef::TextLine(line));
        }
        let word = line.words.get(indices[3])?;
        if level == Level::Word {
            return Some(NodeRef::Word(word));
        }
        word.symbols.get(indices[4]).map(NodeRef::Symbol)
    }
}

impl Block {
    pub fn text(&self) -> String {
        join_texts(self.paragraphs.iter().map(Paragraph::text), PARAGRAPH_SEPARATOR)
    }
}

impl Paragraph {
    pub fn text(&self) -> String {
        join_texts(self.lines.iter().map(TextLine::text), LINE_SEPARATOR)
    }
}

impl TextLine {
    pub fn text(&self) -> String {
        join_texts(self.words.iter().map(|w| w.text.clone()), WORD_SEPARATOR)
    }
}

impl Word {
    /// Mean of the symbol confidences, falling back to the word's own score.
    pub fn symbol_mean_confidence(&self) -> f32 {
        mean_confidence(self.symbols.iter().map(|s| s.confidence)).unwrap_or(self.confidence)
    }
}

fn join_texts(parts: impl Iterator<Item = String>, separator: &str) -> String {
    parts.collect::<Vec<_>>().join(separator)
}

/// Borrowed view of a node at any level.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Block(&'a Block),
    Paragraph(&'a Paragraph),
    TextLine(&'a TextLine),
    Word(&'a Word),
    Symbol(&'a Symbol),
}

impl<'a> NodeRef<'a> {
    pub fn level(&self) -> Level {
        match self {
            NodeRef::Block(_) => Level::Block,
            NodeRef::Paragraph(_) => Level::Paragraph,
            NodeRef::TextLine(_) => Level::TextLine,
            NodeRef::Word(_) => Level::Word,
            NodeRef::Symbol(_) => Level::Symbol,
        }
    }

    pub fn bbox(&self) -> Rect {
        match self {
            NodeRef::Block(n) => n.bbox,
            NodeRef::Paragraph(n) => n.bbox,
            NodeRef::TextLine(n) => n.bbox,
            NodeRef::Word(n) => n.bbox,
            NodeRef::Symbol(n) => n.bbox,
        }
    }

    pub fn confidence(&self) -> f32 {
        match self {
            NodeRef::Block(n) => n.confidence,
            NodeRef::Paragraph(n) => n.confidence,
            NodeRef::TextLine(n) => n.confidence,
            NodeRef::Word(n) => n.confidence,
            NodeRef::Symbol(n) => n.confidence,
        }
    }

    pub fn text(&self) -> String {
        match self {
            NodeRef::Block(n) => n.text(),
            NodeRef::Paragraph(n) => n.text(),
            NodeRef::TextLine(n) => n.text(),
            NodeRef::Word(n) => n.text.clone(),
            NodeRef::Symbol(n) => n.text.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn symbol(ch: char, x: u32, y: u32) -> Symbol {
        Symbol {
            bbox: Rect::new(x, y, 8, 12),
            confidence: 90.0,
            text: ch.to_string(),
            is_superscript: false,
            is_dropcap: false,
            choices: Vec::new(),
        }
    }

    /// A word at `(x, y)` with one 8px-wide symbol per character.
    pub fn word(text: &str, x: u32, y: u32) -> Word {
        let symbols: Vec<Symbol> = text
            .chars()
            .enumerate()
            .map(|(i, ch)| symbol(ch, x + 8 * i as u32, y))
            .collect();
        Word {
            bbox: Rect::new(x, y, 8 * symbols.len() as u32, 12),
            confidence: 90.0,
            text: text.to_string(),
            is_from_dictionary: true,
            is_numeric: false,
            language: Some("eng".to_string()),
            symbols,
        }
    }

    pub fn line(words: &[&str], y: u32) -> TextLine {
        let mut x = 10;
        let words: Vec<Word> = words
            .iter()
            .map(|text| {
                let w = word(text, x, y);
                x = w.bbox.x2 + 8;
                w
            })
            .collect();
        TextLine {
            bbox: Rect::union_all(words.iter().map(|w| &w.bbox)).unwrap_or_default(),
            confidence: 90.0,
            words,
        }
    }

    pub fn paragraph(lines: Vec<TextLine>) -> Paragraph {
        Paragraph {
            bbox: Rect::union_all(lines.iter().map(|l| &l.bbox)).unwrap_or_default(),
            confidence: 90.0,
            lines,
        }
    }

    pub fn block(paragraphs: Vec<Paragraph>) -> Block {
        Block {
            bbox: Rect::union_all(paragraphs.iter().map(|p| &p.bbox)).unwrap_or_default(),
            confidence: 90.0,
            paragraphs,
        }
    }

    pub fn page(blocks: Vec<Block>) -> PageLayout {
        PageLayout::new(400, 300, Rect::new(0, 0, 400, 300), blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn joins_text_per_level() {
        let page = page(vec![
            block(vec![
                paragraph(vec![line(&["one", "two"], 10), line(&["three"], 30)]),
                paragraph(vec![line(&["four"], 50)]),
            ]),
            block(vec![paragraph(vec![line(&["five"], 100)])]),
        ]);

        let first = &page.blocks[0];
        assert_eq!(first.paragraphs[0].lines[0].text(), "one two");
        assert_eq!(first.paragraphs[0].text(), "one two\nthree");
        assert_eq!(first.text(), "one two\nthree\n\nfour");
        assert_eq!(page.text(), "one two\nthree\n\nfour\n\nfive\n");
    }

    #[test]
    fn empty_page_has_no_text() {
        let page = PageLayout::empty(10, 10);
        assert_eq!(page.text(), "");
        assert_eq!(page.mean_confidence(), 0.0);
        assert!(page.segmented_regions(Level::TextLine).is_empty());
    }

    #[test]
    fn lists_regions_per_level() {
        let page = page(vec![block(vec![paragraph(vec![
            line(&["ab", "c"], 10),
            line(&["d"], 30),
        ])])]);
        assert_eq!(page.segmented_regions(Level::Block).len(), 1);
        assert_eq!(page.segmented_regions(Level::TextLine).len(), 2);
        assert_eq!(page.segmented_regions(Level::Word).len(), 3);
        assert_eq!(page.segmented_regions(Level::Symbol).len(), 4);
    }

    #[test]
    fn counts_children_by_path() {
        let page = page(vec![block(vec![paragraph(vec![line(&["ab", "cde"], 10)])])]);
        assert_eq!(page.child_count(Level::Block, &[]), 1);
        assert_eq!(page.child_count(Level::Word, &[0, 0, 0]), 2);
        assert_eq!(page.child_count(Level::Symbol, &[0, 0, 0, 1]), 3);
        assert_eq!(page.child_count(Level::Symbol, &[0, 0, 0, 5]), 0);
        let node = page.node(&[0, 0, 0, 1, 2], Level::Symbol).unwrap();
        assert_eq!(node.text(), "e");
        assert_eq!(node.level(), Level::Symbol);
    }

    #[test]
    fn short_path_counts_no_children() {
        let page = page(vec![block(vec![paragraph(vec![line(&["ab"], 10)])])]);
        assert_eq!(page.child_count(Level::Paragraph, &[]), 0);
        assert_eq!(page.child_count(Level::TextLine, &[0]), 0);
        assert_eq!(page.child_count(Level::Word, &[0, 0]), 0);
        assert_eq!(page.child_count(Level::Symbol, &[0, 0, 0]), 0);
        assert_eq!(page.child_count(Level::Symbol, &[0, 0, 0, 0]), 2);
    }

    #[test]
    fn level_navigation() {
        assert_eq!(Level::Block.parent(), None);
        assert_eq!(Level::Word.parent(), Some(Level::TextLine));
        assert_eq!(Level::Symbol.child(), None);
        assert_eq!(Level::Word.and_below().collect::<Vec<_>>(), vec![Level::Word, Level::Symbol]);
    }
}
