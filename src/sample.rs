//! Built-in reading passage shown before any PDF is opened.
//!
//! Text mode works on it the same way it works on a page's text layer: a
//! drag highlights a character stream and release captures it.

use crate::geometry::Point;

pub const SAMPLE_TITLE: &str = "Attention Is All You Need";
pub const SAMPLE_AUTHORS: &str = "Vaswani et al. (2017)";

pub const SAMPLE_PARAGRAPHS: [&str; 6] = [
    "3.2 Attention Mechanism",
    "An attention function can be described as mapping a query and a set of key-value pairs to an output, where the query, keys, values, and output are all vectors. The output is computed as a weighted sum of the values, where the weight assigned to each value is computed by a compatibility function of the query with the corresponding key.",
    "We call our particular attention \"Scaled Dot-Product Attention\". The input consists of queries and keys of dimension dk, and values of dimension dv. We compute the dot products of the query with all keys, divide each by sqrt(dk), and apply a softmax function to obtain the weights on the values.",
    "In practice, we compute the attention function on a set of queries simultaneously, packed together into a matrix Q. The keys and values are also packed together into matrices K and V. We compute the matrix of outputs as:",
    "Attention(Q, K, V) = softmax( (QK^T) / sqrt(dk) ) V",
    "The two most commonly used attention functions are additive attention, and dot-product (multiplicative) attention. Dot-product attention is identical to our algorithm, except for the scaling factor of 1/sqrt(dk). Additive attention computes the compatibility function using a feed-forward network with a single hidden layer. While the two are similar in theoretical complexity, dot-product attention is much faster and more space-efficient in practice, since it can be implemented using highly optimized matrix multiplication code.",
];

/// Row/column in the wrapped passage, counted in characters
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TextPosition {
    pub line: usize,
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutLine {
    pub text: String,
    /// Soft-wrapped into the next line rather than ending a paragraph
    pub wraps: bool,
}

/// The passage wrapped to a fixed width
#[derive(Debug, Clone, PartialEq)]
pub struct SampleLayout {
    width: usize,
    lines: Vec<LayoutLine>,
}

impl SampleLayout {
    pub fn new(width: usize) -> Self {
        let width = width.max(8);
        let mut lines = Vec::new();

        for paragraph in SAMPLE_PARAGRAPHS {
            let wrapped = textwrap::wrap(paragraph, width);
            let last = wrapped.len().saturating_sub(1);
            for (i, line) in wrapped.iter().enumerate() {
                lines.push(LayoutLine {
                    text: line.to_string(),
                    wraps: i < last,
                });
            }
            lines.push(LayoutLine {
                text: String::new(),
                wraps: false,
            });
        }
        lines.pop();

        Self { width, lines }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn lines(&self) -> &[LayoutLine] {
        &self.lines
    }

    /// Map a canvas point to the character cell under it, clamped into the passage
    pub fn position_at(&self, point: Point, cell_width: f64, cell_height: f64) -> TextPosition {
        let max_line = self.lines.len().saturating_sub(1);
        let line = ((point.y / cell_height).floor().max(0.0) as usize).min(max_line);
        let line_len = self.lines.get(line).map_or(0, |l| l.text.chars().count());
        let col = ((point.x / cell_width).floor().max(0.0) as usize).min(line_len);
        TextPosition { line, col }
    }

    /// Text between two positions in reading order, end exclusive
    pub fn selection_text(&self, a: TextPosition, b: TextPosition) -> String {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        let mut out = String::new();

        for index in start.line..=end.line.min(self.lines.len().saturating_sub(1)) {
            let line = &self.lines[index];
            let from = if index == start.line { start.col } else { 0 };
            let to = if index == end.line {
                end.col
            } else {
                line.text.chars().count()
            };
            out.extend(line.text.chars().skip(from).take(to.saturating_sub(from)));

            if index != end.line {
                out.push(if line.wraps { ' ' } else { '\n' });
            }
        }
        out
    }

    /// Character span of `line` covered by the selection, for highlighting
    pub fn highlight_span(
        &self,
        line: usize,
        a: TextPosition,
        b: TextPosition,
    ) -> Option<(usize, usize)> {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        if line < start.line || line > end.line {
            return None;
        }
        let len = self.lines.get(line)?.text.chars().count();
        let from = if line == start.line { start.col } else { 0 };
        let to = if line == end.line { end.col } else { len };
        (to > from).then_some((from, to))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wraps_to_width() {
        let layout = SampleLayout::new(40);
        assert_eq!(layout.lines()[0].text, "3.2 Attention Mechanism");
        assert!(!layout.lines()[0].wraps);
        assert!(layout
            .lines()
            .iter()
            .all(|l| l.text.chars().count() <= 40));
    }

    #[test]
    fn test_position_clamps() {
        let layout = SampleLayout::new(40);
        let pos = layout.position_at(Point::new(8.0 * 100.0, 16.0 * 0.5), 8.0, 16.0);
        assert_eq!(pos, TextPosition { line: 0, col: 23 });

        let below = layout.position_at(Point::new(-5.0, 1e6), 8.0, 16.0);
        assert_eq!(below.line, layout.lines().len() - 1);
        assert_eq!(below.col, 0);
    }

    #[test]
    fn test_single_line_selection_either_direction() {
        let layout = SampleLayout::new(40);
        let a = TextPosition { line: 0, col: 4 };
        let b = TextPosition { line: 0, col: 13 };
        assert_eq!(layout.selection_text(a, b), "Attention");
        assert_eq!(layout.selection_text(b, a), "Attention");
        assert_eq!(layout.highlight_span(0, b, a), Some((4, 13)));
        assert_eq!(layout.highlight_span(1, a, b), None);
    }

    #[test]
    fn test_soft_wraps_join_with_space() {
        let layout = SampleLayout::new(30);
        // line 2 is the first line of the second paragraph, which wraps
        assert!(layout.lines()[2].wraps);
        let first = &layout.lines()[2].text;
        let second = &layout.lines()[3].text;

        let text = layout.selection_text(
            TextPosition { line: 2, col: 0 },
            TextPosition { line: 3, col: second.chars().count() },
        );
        assert_eq!(text, format!("{} {}", first, second));
    }
}
