//! Key bindings and mouse → pointer mapping.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Skip,
    Restart,
    Quit,
    None,
}

pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('s' | 'S') | KeyCode::Tab => Action::Skip,
        KeyCode::Char('r' | 'R') => Action::Restart,
        _ => Action::None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
}

/// Left-button pointer event at a terminal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pointer {
    pub kind: PointerKind,
    pub column: u16,
    pub row: u16,
}

impl Pointer {
    /// Centre of the terminal cell in board units: one unit per column, two per row, so
    /// board cells come out roughly square.
    pub fn point(self, origin_x: u16, origin_y: u16) -> (f32, f32) {
        (
            f32::from(self.column.saturating_sub(origin_x)) + 0.5,
            f32::from(self.row.saturating_sub(origin_y)) * 2.0 + 1.0,
        )
    }
}

pub fn mouse_to_pointer(mouse: MouseEvent) -> Option<Pointer> {
    let kind = match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => PointerKind::Down,
        MouseEventKind::Drag(MouseButton::Left) => PointerKind::Move,
        MouseEventKind::Up(MouseButton::Left) => PointerKind::Up,
        _ => return None,
    };
    Some(Pointer {
        kind,
        column: mouse.column,
        row: mouse.row,
    })
}
