use serde::Serialize;

/// A 1-based line/column pair. Columns count bytes from the start of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

/// Pre-computed index of line start positions for on-demand line/column lookup.
///
/// Built once per source file. Positions throughout the front end are byte
/// offsets; this index turns them into something a human can read.
#[derive(Debug)]
pub struct LineIndex {
    /// Byte offset of the start of each line. The first entry is always 0.
    line_starts: Vec<u32>,
    len: u32,
}

impl LineIndex {
    /// Build a line index by scanning the source text for newlines.
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for (i, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push((i + 1) as u32);
            }
        }
        Self {
            line_starts,
            len: source.len() as u32,
        }
    }

    /// Convert a byte offset to a 1-based line/column pair.
    ///
    /// Offsets past the end of the source clamp to the last position.
    pub fn line_col(&self, offset: u32) -> LineCol {
        let offset = offset.min(self.len);
        let line_idx = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        LineCol {
            line: line_idx as u32 + 1,
            col: offset - self.line_starts[line_idx] + 1,
        }
    }

    /// The text of a 1-based line without its trailing newline.
    pub fn line_text<'s>(&self, source: &'s str, line: u32) -> Option<&'s str> {
        let idx = (line as usize).checked_sub(1)?;
        let start = *self.line_starts.get(idx)? as usize;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&s| s as usize)
            .unwrap_or(source.len());
        source
            .get(start..end)
            .map(|text| text.trim_end_matches(['\n', '\r']))
    }

    /// Number of lines in the source.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line() {
        let idx = LineIndex::new("hello");
        assert_eq!(idx.line_col(0), LineCol { line: 1, col: 1 });
        assert_eq!(idx.line_col(4), LineCol { line: 1, col: 5 });
    }

    #[test]
    fn multiple_lines() {
        let idx = LineIndex::new("def foo\n  1\nend");
        assert_eq!(idx.line_col(8), LineCol { line: 2, col: 1 });
        assert_eq!(idx.line_col(10), LineCol { line: 2, col: 3 });
        assert_eq!(idx.line_col(12), LineCol { line: 3, col: 1 });
        assert_eq!(idx.line_count(), 3);
    }

    #[test]
    fn offset_past_end_clamps() {
        let idx = LineIndex::new("ab\ncd");
        assert_eq!(idx.line_col(99), LineCol { line: 2, col: 3 });
    }

    #[test]
    fn line_text_strips_newline() {
        let src = "a = 1\r\nb = 2\n";
        let idx = LineIndex::new(src);
        assert_eq!(idx.line_text(src, 1), Some("a = 1"));
        assert_eq!(idx.line_text(src, 2), Some("b = 2"));
        assert_eq!(idx.line_text(src, 3), Some(""));
        assert_eq!(idx.line_text(src, 0), None);
        assert_eq!(idx.line_text(src, 9), None);
    }
}
