//! Level-aware cursor over a [`PageLayout`].
//!
//! The cursor always rests on the deepest node reachable from its current
//! block: normally a symbol, or a shallower node when that node has no
//! children. Advances come in two flavours. [`ResultCursor::advance_element`]
//! stays inside the current parent and reports `false` at its last child,
//! which is what nested per-level loops need. [`ResultCursor::advance_level`]
//! moves through the whole page in document order and ends in the exhausted
//! state.

use crate::core::errors::{OcrError, OcrResult};
use crate::core::geometry::Rect;
use crate::core::model::{Block, Choice, Level, NodeRef, PageLayout, Paragraph, Symbol, TextLine, Word};

/// Composite index of the current node plus the deepest level that exists here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    indices: [usize; 5],
    depth: Level,
}

impl Position {
    /// Index of the current node at `level` within its parent, if one exists.
    pub fn index(&self, level: Level) -> Option<usize> {
        (level <= self.depth).then(|| self.indices[level.index()])
    }

    pub fn depth(&self) -> Level {
        self.depth
    }

    pub fn indices(&self) -> &[usize; 5] {
        &self.indices
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    NotStarted,
    Positioned(Position),
    Exhausted,
}

#[derive(Debug, Clone)]
pub struct ResultCursor<'a> {
    layout: &'a PageLayout,
    state: CursorState,
}

impl<'a> ResultCursor<'a> {
    pub fn new(layout: &'a PageLayout) -> Self {
        Self {
            layout,
            state: CursorState::NotStarted,
        }
    }

    pub fn layout(&self) -> &'a PageLayout {
        self.layout
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == CursorState::Exhausted
    }

    /// Positions the cursor on the first symbol of the page, or exhausts it
    /// straight away when the page has no blocks.
    pub fn begin(&mut self) -> OcrResult<()> {
        if self.state != CursorState::NotStarted {
            return Err(OcrError::InvalidState("begin called twice without reset"));
        }
        self.state = if self.layout.blocks.is_empty() {
            CursorState::Exhausted
        } else {
            CursorState::Positioned(self.settle([0; 5], Level::Block))
        };
        Ok(())
    }

    pub fn reset(&mut self) {
        self.state = CursorState::NotStarted;
    }

    /// Moves to the next sibling at `level` inside the current parent.
    ///
    /// Returns `false` without moving when the current node is the last one at
    /// `level`, or when the position has no node at `level` at all.
    pub fn advance_element(&mut self, level: Level) -> OcrResult<bool> {
        let position = self.positioned()?;
        if level > position.depth {
            return Ok(false);
        }
        match self.next_sibling(&position, level) {
            Some(next) => {
                self.state = CursorState::Positioned(next);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Moves to the next node at `level` in document order, ascending through
    /// exhausted parents. At the end of the page the cursor is exhausted and
    /// `false` is returned.
    pub fn advance_level(&mut self, level: Level) -> OcrResult<bool> {
        let position = self.positioned()?;
        let start = level.min(position.depth);
        for candidate in Level::ALL[..=start.index()].iter().rev() {
            if let Some(next) = self.next_sibling(&position, *candidate) {
                self.state = CursorState::Positioned(next);
                return Ok(true);
            }
        }
        self.state = CursorState::Exhausted;
        Ok(false)
    }

    /// True when the cursor has just entered the current node at `level`.
    pub fn is_at_beginning_of(&self, level: Level) -> OcrResult<bool> {
        let position = self.positioned()?;
        if level > position.depth {
            return Ok(false);
        }
        Ok(level
            .and_below()
            .skip(1)
            .take_while(|l| *l <= position.depth)
            .all(|l| position.indices[l.index()] == 0))
    }

    /// True when the current `element` is the last one inside the current
    /// node at `level`.
    pub fn is_at_final_element(&self, level: Level, element: Level) -> OcrResult<bool> {
        let position = self.positioned()?;
        if level > position.depth {
            return Ok(false);
        }
        let deepest = element.min(position.depth);
        Ok(level
            .and_below()
            .skip(1)
            .take_while(|l| *l <= deepest)
            .all(|l| {
                let count = self
                    .layout
                    .child_count(l, &position.indices[..l.index()]);
                position.indices[l.index()] + 1 == count
            }))
    }

    /// True when leaving the current position also leaves the node at `level`.
    pub fn is_at_end_of(&self, level: Level) -> OcrResult<bool> {
        self.is_at_final_element(level, Level::Symbol)
    }

    pub fn position(&self) -> OcrResult<Position> {
        self.positioned()
    }

    /// Deepest level that exists at the current position.
    pub fn depth(&self) -> OcrResult<Level> {
        Ok(self.positioned()?.depth)
    }

    pub fn node(&self, level: Level) -> OcrResult<Option<NodeRef<'a>>> {
        let position = self.positioned()?;
        if level > position.depth {
            return Ok(None);
        }
        Ok(self.layout.node(&position.indices, level))
    }

    pub fn block(&self) -> OcrResult<Option<&'a Block>> {
        Ok(match self.node(Level::Block)? {
            Some(NodeRef::Block(block)) => Some(block),
            _ => None,
        })
    }

    pub fn paragraph(&self) -> OcrResult<Option<&'a Paragraph>> {
        Ok(match self.node(Level::Paragraph)? {
            Some(NodeRef::Paragraph(paragraph)) => Some(paragraph),
            _ => None,
        })
    }

    pub fn text_line(&self) -> OcrResult<Option<&'a TextLine>> {
        Ok(match self.node(Level::TextLine)? {
            Some(NodeRef::TextLine(line)) => Some(line),
            _ => None,
        })
    }

    pub fn word(&self) -> OcrResult<Option<&'a Word>> {
        Ok(match self.node(Level::Word)? {
            Some(NodeRef::Word(word)) => Some(word),
            _ => None,
        })
    }

    pub fn symbol(&self) -> OcrResult<Option<&'a Symbol>> {
        Ok(match self.node(Level::Symbol)? {
            Some(NodeRef::Symbol(symbol)) => Some(symbol),
            _ => None,
        })
    }

    pub fn bounding_box(&self, level: Level) -> OcrResult<Option<Rect>> {
        Ok(self.node(level)?.map(|node| node.bbox()))
    }

    pub fn text(&self, level: Level) -> OcrResult<Option<String>> {
        Ok(self.node(level)?.map(|node| node.text()))
    }

    pub fn confidence(&self, level: Level) -> OcrResult<Option<f32>> {
        Ok(self.node(level)?.map(|node| node.confidence()))
    }

    /// Ranked alternatives for the current symbol. The iterator borrows the
    /// cursor, so it cannot outlive the next advance.
    pub fn choices(&self) -> OcrResult<Option<ChoiceIterator<'_>>> {
        Ok(self.symbol()?.map(|symbol| ChoiceIterator::new(&symbol.choices)))
    }

    /// Runs the canonical nested walk from the start of the page: blocks via
    /// [`advance_level`](Self::advance_level), every inner level via
    /// [`advance_element`](Self::advance_element). `visit` sees every position
    /// once, in document order.
    pub fn walk<F>(&mut self, mut visit: F) -> OcrResult<()>
    where
        F: FnMut(&ResultCursor<'a>) -> OcrResult<()>,
    {
        self.reset();
        self.begin()?;
        if self.is_exhausted() {
            return Ok(());
        }
        loop {
            loop {
                loop {
                    loop {
                        loop {
                            visit(&*self)?;
                            if !self.advance_element(Level::Symbol)? {
                                break;
                            }
                        }
                        if !self.advance_element(Level::Word)? {
                            break;
                        }
                    }
                    if !self.advance_element(Level::TextLine)? {
                        break;
                    }
                }
                if !self.advance_element(Level::Paragraph)? {
                    break;
                }
            }
            if !self.advance_level(Level::Block)? {
                break;
            }
        }
        Ok(())
    }

    fn positioned(&self) -> OcrResult<Position> {
        match self.state {
            CursorState::Positioned(position) => Ok(position),
            CursorState::NotStarted => Err(OcrError::InvalidState("cursor has not been started")),
            CursorState::Exhausted => Err(OcrError::InvalidState("cursor is exhausted")),
        }
    }

    fn next_sibling(&self, position: &Position, level: Level) -> Option<Position> {
        let i = level.index();
        let count = self.layout.child_count(level, &position.indices[..i]);
        if position.indices[i] + 1 >= count {
            return None;
        }
        let mut indices = position.indices;
        indices[i] += 1;
        Some(self.settle(indices, level))
    }

    /// Zeroes every index below `level` and descends through first children
    /// as far as the tree goes.
    fn settle(&self, mut indices: [usize; 5], level: Level) -> Position {
        for deeper in level.and_below().skip(1) {
            indices[deeper.index()] = 0;
        }
        let mut depth = level;
        while let Some(child) = depth.child() {
            if self.layout.child_count(child, &indices[..child.index()]) == 0 {
                break;
            }
            depth = child;
        }
        Position { indices, depth }
    }
}

/// Alternatives for one symbol, best first.
#[derive(Debug, Clone)]
pub struct ChoiceIterator<'c> {
    inner: std::slice::Iter<'c, Choice>,
}

impl<'c> ChoiceIterator<'c> {
    pub(crate) fn new(choices: &'c [Choice]) -> Self {
        Self {
            inner: choices.iter(),
        }
    }
}

impl<'c> Iterator for ChoiceIterator<'c> {
    type Item = &'c Choice;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for ChoiceIterator<'_> {}
