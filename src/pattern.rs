//! Level layouts: colour-or-hole symbol matrices, their text format and the built-in levels.

use crate::grid::DotColor;
use std::path::Path;
use thiserror::Error;

/// One pattern symbol: a colour, or `None` for a hole.
pub type Symbol = Option<DotColor>;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: unknown symbol {symbol:?}")]
    UnknownSymbol { line: usize, symbol: String },
    #[error("line {line}: expected {expected} symbols, found {found}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("line {line}: bad size directive {value:?} (expected COLSxROWS)")]
    BadSize { line: usize, value: String },
    #[error("pattern has no rows")]
    Empty,
    #[error("invalid grid dimensions {columns}x{rows}")]
    BadDimensions { columns: usize, rows: usize },
}

/// Row-major symbol matrix. Always rectangular and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelPattern {
    rows: Vec<Vec<Symbol>>,
}

impl LevelPattern {
    pub fn new(rows: Vec<Vec<Symbol>>) -> Result<Self, PatternError> {
        let width = rows.first().map(Vec::len).ok_or(PatternError::Empty)?;
        if width == 0 {
            return Err(PatternError::Empty);
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(PatternError::RaggedRow {
                line: i + 1,
                expected: width,
                found: row.len(),
            });
        }
        Ok(Self { rows })
    }

    /// Parse the text form: one row per line, whitespace-separated symbols.
    /// `#` starts a comment; blank lines are skipped.
    pub fn parse(s: &str) -> Result<Self, PatternError> {
        Ok(parse_layout_text(s)?.1)
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Symbol at (row, col); `None` when outside the pattern.
    pub fn get(&self, row: usize, col: usize) -> Option<Symbol> {
        self.rows.get(row).and_then(|r| r.get(col)).copied()
    }
}

/// What the layout says about one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternCell {
    Color(DotColor),
    Hole,
    /// The grid is larger than the pattern here; filled with a random colour.
    Outside,
}

/// A pattern plus the grid dimensions declared alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelLayout {
    pub columns: usize,
    pub rows: usize,
    pub pattern: LevelPattern,
}

impl LevelLayout {
    pub fn new(columns: usize, rows: usize, pattern: LevelPattern) -> Result<Self, PatternError> {
        if columns == 0 || rows == 0 {
            return Err(PatternError::BadDimensions { columns, rows });
        }
        Ok(Self {
            columns,
            rows,
            pattern,
        })
    }

    /// Layout whose dimensions are exactly the pattern's.
    pub fn from_pattern(pattern: LevelPattern) -> Self {
        Self {
            columns: pattern.width(),
            rows: pattern.height(),
            pattern,
        }
    }

    /// Parse a layout file. A `size COLSxROWS` line declares dimensions; without one the
    /// pattern's own size is used.
    pub fn parse(s: &str) -> Result<Self, PatternError> {
        let (size, pattern) = parse_layout_text(s)?;
        match size {
            Some((columns, rows)) => Self::new(columns, rows, pattern),
            None => Ok(Self::from_pattern(pattern)),
        }
    }

    pub fn load(path: &Path) -> Result<Self, PatternError> {
        let s = std::fs::read_to_string(path)?;
        Self::parse(&s)
    }

    pub fn cell(&self, row: usize, col: usize) -> PatternCell {
        match self.pattern.get(row, col) {
            Some(Some(color)) => PatternCell::Color(color),
            Some(None) => PatternCell::Hole,
            None => PatternCell::Outside,
        }
    }

    /// Opening 3x2 board.
    pub fn level_one() -> Self {
        Self::from_pattern(LevelPattern {
            rows: to_rows(&LEVEL_ONE),
        })
    }

    /// Timed 9x16 board.
    pub fn level_two() -> Self {
        Self::from_pattern(LevelPattern {
            rows: to_rows(&LEVEL_TWO),
        })
    }
}

fn to_rows<const W: usize>(rows: &[[Symbol; W]]) -> Vec<Vec<Symbol>> {
    rows.iter().map(|r| r.to_vec()).collect()
}

fn parse_symbol(token: &str) -> Option<Symbol> {
    match token {
        "." | "_" | "-" | "X" | "x" => Some(None),
        _ => {
            let mut chars = token.chars();
            let c = chars.next()?;
            if chars.next().is_some() {
                return None;
            }
            DotColor::from_code(c).map(Some)
        }
    }
}

fn parse_size(value: &str) -> Option<(usize, usize)> {
    let (c, r) = value.trim().split_once(['x', 'X'])?;
    Some((c.trim().parse().ok()?, r.trim().parse().ok()?))
}

type ParsedLayout = (Option<(usize, usize)>, LevelPattern);

fn parse_layout_text(s: &str) -> Result<ParsedLayout, PatternError> {
    let mut size = None;
    let mut rows: Vec<Vec<Symbol>> = Vec::new();
    for (i, raw) in s.lines().enumerate() {
        let line_no = i + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        if let Some(value) = line.strip_prefix("size") {
            let value = value.trim_start_matches([' ', '=', ':']);
            size = Some(parse_size(value).ok_or_else(|| PatternError::BadSize {
                line: line_no,
                value: value.to_string(),
            })?);
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|t| {
                parse_symbol(t).ok_or_else(|| PatternError::UnknownSymbol {
                    line: line_no,
                    symbol: t.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(PatternError::RaggedRow {
                    line: line_no,
                    expected: first.len(),
                    found: row.len(),
                });
            }
        }
        rows.push(row);
    }
    Ok((size, LevelPattern::new(rows)?))
}

const R: Symbol = Some(DotColor::Red);
const G: Symbol = Some(DotColor::Green);
const Y: Symbol = Some(DotColor::Yellow);
const B: Symbol = Some(DotColor::Blue);
const P: Symbol = Some(DotColor::Purple);
const H: Symbol = None;

const LEVEL_ONE: [[Symbol; 3]; 2] = [[R, B, B], [H, R, H]];

const LEVEL_TWO: [[Symbol; 9]; 16] = [
    [P, P, P, P, P, R, R, R, R],
    [P, Y, Y, B, B, R, B, B, B],
    [P, P, Y, G, B, R, G, G, G],
    [B, Y, Y, G, G, R, Y, Y, G],
    [B, B, R, R, R, R, Y, G, G],
    [R, B, B, B, B, B, Y, Y, Y],
    [R, P, P, P, P, P, Y, Y, Y],
    [R, P, P, P, Y, Y, B, B, B],
    [R, R, R, R, G, G, B, R, P],
    [Y, Y, Y, G, G, B, B, R, P],
    [Y, R, R, R, B, R, R, R, P],
    [Y, B, B, B, G, R, Y, P, P],
    [Y, Y, Y, Y, G, R, G, G, P],
    [G, P, P, P, G, Y, Y, G, P],
    [G, P, G, P, Y, Y, G, G, P],
    [G, G, G, P, Y, Y, Y, P, P],
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_layouts_have_expected_sizes() {
        let one = LevelLayout::level_one();
        assert_eq!((one.columns, one.rows), (3, 2));
        assert_eq!(one.cell(0, 0), PatternCell::Color(DotColor::Red));
        assert_eq!(one.cell(1, 0), PatternCell::Hole);

        let two = LevelLayout::level_two();
        assert_eq!((two.columns, two.rows), (9, 16));
        assert_eq!(two.cell(15, 8), PatternCell::Color(DotColor::Purple));
        assert_eq!(two.cell(16, 0), PatternCell::Outside);
    }

    #[test]
    fn parse_with_holes_comments_and_size() {
        let text = "# opening board\nsize 4x3\nR B B\n. R _\n";
        let layout = LevelLayout::parse(text).unwrap();
        assert_eq!((layout.columns, layout.rows), (4, 3));
        assert_eq!(layout.pattern.width(), 3);
        assert_eq!(layout.pattern.height(), 2);
        assert_eq!(layout.cell(1, 2), PatternCell::Hole);
        assert_eq!(layout.cell(0, 3), PatternCell::Outside);
        assert_eq!(layout.cell(2, 0), PatternCell::Outside);
    }

    #[test]
    fn parse_matches_builtin_level_one() {
        let parsed = LevelPattern::parse("R B B\nX R X").unwrap();
        assert_eq!(parsed, LevelLayout::level_one().pattern);
    }

    #[test]
    fn parse_rejects_ragged_rows() {
        let err = LevelPattern::parse("R B\nR").unwrap_err();
        assert!(matches!(
            err,
            PatternError::RaggedRow {
                line: 2,
                expected: 2,
                found: 1
            }
        ));
    }

    #[test]
    fn parse_rejects_unknown_symbol() {
        let err = LevelPattern::parse("R Q").unwrap_err();
        assert!(matches!(err, PatternError::UnknownSymbol { line: 1, .. }));
    }

    #[test]
    fn parse_rejects_empty_and_bad_size() {
        assert!(matches!(LevelPattern::parse("# nothing\n\n"), Err(PatternError::Empty)));
        assert!(matches!(
            LevelLayout::parse("size 9by16\nR"),
            Err(PatternError::BadSize { line: 1, .. })
        ));
        assert!(matches!(
            LevelLayout::parse("size 0x4\nR"),
            Err(PatternError::BadDimensions { columns: 0, rows: 4 })
        ));
    }
}
