//! Grid model: token matrix, pixel↔cell geometry, gravity, spawn colour inference.

use crate::pattern::{LevelLayout, PatternCell};
use crate::scene::{SceneHost, TokenHandle, Viewport};
use rand::Rng;
use tracing::{debug, warn};

/// Share of the viewport the grid may occupy.
const USABLE_WIDTH: f32 = 0.90;
const USABLE_HEIGHT: f32 = 0.85;
/// Grid sits slightly below centre to leave room for the clock above it.
const VERTICAL_SHIFT: f32 = 0.05;

/// Token palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DotColor {
    Red,
    Green,
    Yellow,
    Blue,
    Purple,
}

impl DotColor {
    pub const ALL: [Self; 5] = [Self::Red, Self::Green, Self::Yellow, Self::Blue, Self::Purple];

    /// Pattern symbol.
    pub const fn code(self) -> char {
        match self {
            Self::Red => 'R',
            Self::Green => 'G',
            Self::Yellow => 'Y',
            Self::Blue => 'B',
            Self::Purple => 'P',
        }
    }

    pub fn from_code(c: char) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|color| color.code() == c.to_ascii_uppercase())
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Red => "Red",
            Self::Green => "Green",
            Self::Yellow => "Yellow",
            Self::Blue => "Blue",
            Self::Purple => "Purple",
        }
    }

    /// Index 0..5, in palette order.
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Cell position; row 0 is the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Manhattan distance 1 (no diagonals).
    pub const fn is_adjacent(self, other: Self) -> bool {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col) == 1
    }
}

/// A dot. Its position is the cell that holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub color: DotColor,
    pub selected: bool,
    pub handle: Option<TokenHandle>,
}

/// One token settled by gravity, for the scene host to animate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GravityMove {
    pub handle: Option<TokenHandle>,
    pub col: usize,
    pub from_row: usize,
    pub to_row: usize,
}

impl GravityMove {
    pub const fn from(&self) -> CellPos {
        CellPos::new(self.from_row, self.col)
    }

    pub const fn to(&self) -> CellPos {
        CellPos::new(self.to_row, self.col)
    }
}

/// Offset + uniform spacing mapping cells to viewport points.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    pub offset_x: f32,
    pub offset_y: f32,
    pub spacing: f32,
    pub columns: usize,
    pub rows: usize,
}

impl Geometry {
    /// Fit `columns × rows` square cells into the viewport, centred horizontally.
    pub fn fit(viewport: Viewport, columns: usize, rows: usize) -> Self {
        let (w, h) = (viewport.width.max(0.0), viewport.height.max(0.0));
        if columns == 0 || rows == 0 {
            return Self {
                columns,
                rows,
                ..Self::default()
            };
        }
        let spacing_h = (w * USABLE_WIDTH / columns as f32).floor();
        let spacing_v = (h * USABLE_HEIGHT / rows as f32).floor();
        let spacing = spacing_h.min(spacing_v).max(0.0);
        Self {
            offset_x: ((w - spacing * columns as f32) / 2.0).floor(),
            offset_y: ((h - spacing * rows as f32) / 2.0).floor() + (h * VERTICAL_SHIFT).floor(),
            spacing,
            columns,
            rows,
        }
    }

    /// Centre of a cell in viewport units.
    pub fn cell_center(&self, pos: CellPos) -> (f32, f32) {
        let half = self.spacing / 2.0;
        (
            self.offset_x + pos.col as f32 * self.spacing + half,
            self.offset_y + pos.row as f32 * self.spacing + half,
        )
    }

    /// Inverse of [`Self::cell_center`]; `None` outside the grid.
    pub fn cell_for_point(&self, x: f32, y: f32) -> Option<CellPos> {
        if self.spacing <= 0.0 || !x.is_finite() || !y.is_finite() {
            return None;
        }
        let col = ((x - self.offset_x) / self.spacing).floor();
        let row = ((y - self.offset_y) / self.spacing).floor();
        if col < 0.0 || row < 0.0 {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        (row < self.rows && col < self.columns).then_some(CellPos::new(row, col))
    }
}

/// Rectangular token matrix. `cells[row][col]`, row 0 on top.
#[derive(Debug, Clone, Default)]
pub struct Grid {
    columns: usize,
    rows: usize,
    cells: Vec<Vec<Option<Token>>>,
    geometry: Geometry,
}

impl Grid {
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            rows,
            cells: vec![vec![None; columns]; rows],
            geometry: Geometry::default(),
        }
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Recompute the geometry for a new viewport size.
    pub fn relayout(&mut self, viewport: Viewport) {
        self.geometry = Geometry::fit(viewport, self.columns, self.rows);
    }

    pub fn in_bounds(&self, pos: CellPos) -> bool {
        pos.row < self.rows && pos.col < self.columns
    }

    /// Token at `pos`; `None` for empty or out-of-bounds cells.
    #[inline]
    pub fn token_at(&self, pos: CellPos) -> Option<&Token> {
        self.cells.get(pos.row)?.get(pos.col)?.as_ref()
    }

    #[inline]
    pub fn color_at(&self, pos: CellPos) -> Option<DotColor> {
        self.token_at(pos).map(|t| t.color)
    }

    pub fn cell_for_point(&self, x: f32, y: f32) -> Option<CellPos> {
        self.geometry.cell_for_point(x, y)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().flatten().all(Option::is_none)
    }

    pub fn token_count(&self) -> usize {
        self.cells.iter().flatten().filter(|c| c.is_some()).count()
    }

    /// True iff two orthogonally adjacent cells hold tokens of the same colour.
    pub fn has_any_valid_move(&self) -> bool {
        self.positions().any(|pos| {
            let Some(color) = self.color_at(pos) else {
                return false;
            };
            let right = CellPos::new(pos.row, pos.col + 1);
            let below = CellPos::new(pos.row + 1, pos.col);
            self.color_at(right) == Some(color) || self.color_at(below) == Some(color)
        })
    }

    /// All positions in row-major order.
    pub fn positions(&self) -> impl Iterator<Item = CellPos> + use<> {
        let columns = self.columns;
        (0..self.rows).flat_map(move |row| (0..columns).map(move |col| CellPos::new(row, col)))
    }

    /// Colour snapshot, row-major.
    pub fn color_rows(&self) -> Vec<Vec<Option<DotColor>>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|c| c.map(|t| t.color)).collect())
            .collect()
    }

    pub fn set_selected(&mut self, pos: CellPos, selected: bool) {
        if let Some(token) = self.slot_mut(pos).and_then(Option::as_mut) {
            token.selected = selected;
        }
    }

    pub fn clear_selection(&mut self) {
        for token in self.cells.iter_mut().flatten().flatten() {
            token.selected = false;
        }
    }

    /// Empty the given cells and release their visuals. Empty or out-of-bounds cells are skipped.
    pub fn destroy_tokens(&mut self, positions: &[CellPos], scene: &mut dyn SceneHost) {
        for &pos in positions {
            match self.slot_mut(pos).and_then(Option::take) {
                Some(token) => {
                    if let Some(handle) = token.handle {
                        scene.destroy_token(handle);
                    }
                }
                None => debug!(?pos, "destroy skipped: no token"),
            }
        }
    }

    /// Colour a new token at `pos` would take: nearest token above in the column; on the top
    /// row, the right then left neighbour, then the nearest token below in the column.
    pub fn infer_color(&self, pos: CellPos) -> Option<DotColor> {
        let above = (0..pos.row)
            .rev()
            .find_map(|row| self.color_at(CellPos::new(row, pos.col)));
        if above.is_some() || pos.row != 0 {
            return above;
        }
        if pos.col + 1 < self.columns {
            if let Some(color) = self.color_at(CellPos::new(0, pos.col + 1)) {
                return Some(color);
            }
        }
        if pos.col > 0 {
            if let Some(color) = self.color_at(CellPos::new(0, pos.col - 1)) {
                return Some(color);
            }
        }
        (1..self.rows).find_map(|row| self.color_at(CellPos::new(row, pos.col)))
    }

    /// Spawn a token with an inferred colour. Nothing is created when no colour can be inferred
    /// or the cell is occupied / out of bounds.
    pub fn spawn_token_infer_color(
        &mut self,
        pos: CellPos,
        scene: &mut dyn SceneHost,
    ) -> Option<DotColor> {
        let color = self.infer_color(pos)?;
        self.place(pos, color, scene).then_some(color)
    }

    /// Settle every column toward row 0, preserving order. Returns the moves made; the scene
    /// host is told about each one.
    pub fn apply_gravity(&mut self, scene: &mut dyn SceneHost) -> Vec<GravityMove> {
        let mut moves = Vec::new();
        for col in 0..self.columns {
            let mut empty = 0;
            for row in 0..self.rows {
                match self.cells[row][col].take() {
                    None => empty += 1,
                    Some(token) if empty == 0 => self.cells[row][col] = Some(token),
                    Some(token) => {
                        let to_row = row - empty;
                        self.cells[to_row][col] = Some(token);
                        moves.push(GravityMove {
                            handle: token.handle,
                            col,
                            from_row: row,
                            to_row,
                        });
                    }
                }
            }
        }
        for m in &moves {
            if let Some(handle) = m.handle {
                scene.move_token(handle, m.from(), m.to());
            }
        }
        moves
    }

    /// Release every token.
    pub fn clear(&mut self, scene: &mut dyn SceneHost) {
        for slot in self.cells.iter_mut().flatten() {
            if let Some(handle) = slot.take().and_then(|t| t.handle) {
                scene.destroy_token(handle);
            }
        }
    }

    /// Clear, resize to the layout and repopulate it. Holes stay empty; cells outside the
    /// pattern get a random colour.
    pub fn rebuild<R: Rng>(
        &mut self,
        layout: &LevelLayout,
        scene: &mut dyn SceneHost,
        rng: &mut R,
    ) {
        self.clear(scene);
        self.columns = layout.columns;
        self.rows = layout.rows;
        self.cells = vec![vec![None; layout.columns]; layout.rows];
        self.relayout(scene.viewport_size());
        for pos in self.positions() {
            let color = match layout.cell(pos.row, pos.col) {
                PatternCell::Color(color) => color,
                PatternCell::Hole => continue,
                PatternCell::Outside => DotColor::ALL[rng.gen_range(0..DotColor::ALL.len())],
            };
            self.place(pos, color, scene);
        }
        debug!(
            columns = self.columns,
            rows = self.rows,
            tokens = self.token_count(),
            "grid rebuilt"
        );
    }

    fn slot_mut(&mut self, pos: CellPos) -> Option<&mut Option<Token>> {
        self.cells.get_mut(pos.row)?.get_mut(pos.col)
    }

    fn place(&mut self, pos: CellPos, color: DotColor, scene: &mut dyn SceneHost) -> bool {
        match self.slot_mut(pos) {
            Some(slot @ None) => {
                let handle = scene.create_token(pos, color);
                if handle.is_none() {
                    debug!(?pos, ?color, "scene host gave no visual for token");
                }
                *slot = Some(Token {
                    color,
                    selected: false,
                    handle,
                });
                true
            }
            Some(Some(_)) => {
                warn!(?pos, "spawn refused: cell occupied");
                false
            }
            None => false,
        }
    }
}

#[cfg(test)]
pub(crate) fn grid_from(rows: &[&str], scene: &mut dyn SceneHost) -> Grid {
    use crate::pattern::LevelPattern;
    use rand::SeedableRng;

    let text = rows.join("\n");
    let layout = LevelLayout::from_pattern(LevelPattern::parse(&text).expect("test pattern"));
    let mut grid = Grid::default();
    grid.rebuild(&layout, scene, &mut rand::rngs::StdRng::seed_from_u64(7));
    grid
}
