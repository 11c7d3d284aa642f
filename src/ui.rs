//! Layout and drawing: board, HUD, tutorial hand, banners, end screen.

use crate::app::{Banner, Fade, Screen};
use crate::host::{Ghost, TerminalScene};
use crate::theme::Theme;
use chaindots::grid::{CellPos, Geometry, Grid};
use chaindots::level::{EndReason, Level, SkipState};
use chaindots::timer::format_clock;
use chaindots::tutorial::HandPose;
use ratatui::Frame;
use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tachyonfx::{CellFilter, Duration as TfxDuration, EffectRenderer, Interpolation, fx, ref_count};

/// Ghost fade after a chain is cleared.
const CLEAR_FADE_MS: u32 = 120;
/// Dot radius as a share of the cell spacing.
const DOT_RADIUS: f32 = 0.38;
const PULSE_TIME: Duration = Duration::from_millis(300);
const SKIP_LABEL: &str = " Skip ▸ ";

/// Everything the frame shows besides the board itself.
pub struct View<'a> {
    pub screen: Screen,
    pub grid: &'a Grid,
    pub scene: &'a TerminalScene,
    pub level: Level,
    pub merges: u32,
    pub skip: SkipState,
    pub remaining: Option<u32>,
    pub hand: Option<HandPose>,
    pub pulse: Option<(CellPos, Instant)>,
    pub banner: Option<&'a Banner>,
    pub end_reason: Option<EndReason>,
    pub now: Instant,
    pub no_animation: bool,
}

/// Clickable skip button in the top-right corner.
pub fn skip_button_rect(area: Rect) -> Rect {
    let width = SKIP_LABEL.chars().count() as u16;
    Rect {
        x: area.x + area.width.saturating_sub(width + 1),
        y: area.y,
        width: width.min(area.width),
        height: 1.min(area.height),
    }
}

pub fn draw(frame: &mut Frame, view: &View, theme: &Theme, fade: &mut Fade) {
    let area = frame.area();
    Block::default()
        .style(Style::default().bg(theme.bg))
        .render(area, frame.buffer_mut());

    match view.screen {
        Screen::Playing => {
            draw_hud(frame, view, theme, area);
            let geometry = *view.grid.geometry();
            draw_dots(frame.buffer_mut(), view, theme, area, &geometry);
            let ghost_cells =
                draw_ghosts(frame.buffer_mut(), view.scene.ghosts(), theme, area, &geometry);
            if !view.no_animation && !ghost_cells.is_empty() {
                apply_clear_fade(frame, area, ghost_cells, theme.bg, fade, view.now);
            }
            if let Some((cell, at)) = view.pulse {
                if view.now.saturating_duration_since(at) < PULSE_TIME {
                    draw_ring(frame.buffer_mut(), area, &geometry, cell, theme.title);
                }
            }
            if let Some(hand) = view.hand {
                draw_hand(frame.buffer_mut(), area, &geometry, hand, theme);
            }
            if let Some(banner) = view.banner {
                draw_banner(frame, banner, theme, area);
            }
        }
        Screen::Ended => draw_end(frame, view, theme, area),
    }
}

fn draw_hud(frame: &mut Frame, view: &View, theme: &Theme, area: Rect) {
    let text = Style::default().fg(theme.main_fg).bg(theme.bg);
    let mut spans = vec![Span::styled(
        format!(" {} ", view.level),
        Style::default()
            .fg(theme.title)
            .bg(theme.bg)
            .add_modifier(Modifier::BOLD),
    )];
    if view.level == Level::Two {
        spans.push(Span::styled(format!(" merges {} ", view.merges), text));
    }
    if let Some(remaining) = view.remaining {
        let clock = if remaining <= 10 {
            Style::default().fg(Color::White).bg(Color::Red)
        } else {
            text
        };
        spans.push(Span::styled(format!(" ⏱ {} ", format_clock(remaining)), clock));
    }
    Paragraph::new(Line::from(spans)).render(
        Rect {
            height: 1.min(area.height),
            ..area
        },
        frame.buffer_mut(),
    );

    if view.skip == SkipState::Available {
        Paragraph::new(Span::styled(
            SKIP_LABEL,
            Style::default()
                .fg(Color::Black)
                .bg(theme.title)
                .add_modifier(Modifier::BOLD),
        ))
        .render(skip_button_rect(area), frame.buffer_mut());
    }

    let hint = if view.skip == SkipState::Available {
        " drag to link dots · S skip · Q quit "
    } else {
        " drag to link dots · Q quit "
    };
    if area.height > 1 {
        Paragraph::new(Span::styled(hint, Style::default().fg(theme.inactive_fg)))
            .alignment(Alignment::Center)
            .render(
                Rect {
                    y: area.y + area.height - 1,
                    height: 1,
                    ..area
                },
                frame.buffer_mut(),
            );
    }
}

/// Fill the terminal cells whose centres fall inside a circle given in board units. The cell
/// holding the centre is always filled so tiny dots stay visible.
fn paint_disc(
    buf: &mut Buffer,
    area: Rect,
    (cx, cy): (f32, f32),
    radius: f32,
    symbol: &str,
    style: Style,
) -> Vec<Position> {
    let mut painted = Vec::new();
    if !cx.is_finite() || !cy.is_finite() {
        return painted;
    }
    let x0 = (cx - radius).floor().max(0.0) as u16;
    let x1 = (cx + radius).ceil().max(0.0) as u16;
    let y0 = ((cy - radius) / 2.0).floor().max(0.0) as u16;
    let y1 = ((cy + radius) / 2.0).ceil().max(0.0) as u16;
    let (center_x, center_y) = (cx.floor() as u16, (cy / 2.0).floor() as u16);
    for ty in y0..=y1 {
        for tx in x0..=x1 {
            let (px, py) = (f32::from(tx) + 0.5, f32::from(ty) * 2.0 + 1.0);
            let inside = (px - cx).powi(2) + (py - cy).powi(2) <= radius * radius
                || (tx == center_x && ty == center_y);
            if !inside {
                continue;
            }
            let pos = Position::new(area.x.saturating_add(tx), area.y.saturating_add(ty));
            if !area.contains(pos) {
                continue;
            }
            if let Some(cell) = buf.cell_mut(pos) {
                cell.set_symbol(symbol).set_style(style);
                painted.push(pos);
            }
        }
    }
    painted
}

fn dot_radius(geometry: &Geometry) -> f32 {
    (geometry.spacing * DOT_RADIUS).max(0.5)
}

fn draw_dots(buf: &mut Buffer, view: &View, theme: &Theme, area: Rect, geometry: &Geometry) {
    let radius = dot_radius(geometry);
    let half = geometry.spacing / 2.0;
    for sprite in view.scene.sprites() {
        let row = view.scene.sprite_row(sprite, view.now);
        let center = (
            geometry.offset_x + sprite.cell.col as f32 * geometry.spacing + half,
            geometry.offset_y + row * geometry.spacing + half,
        );
        let color = theme.dot_color(sprite.color);
        let selected = view
            .grid
            .token_at(sprite.cell)
            .is_some_and(|token| token.selected);
        let (symbol, style) = if selected {
            ("▓", Style::default().fg(color).bg(theme.main_fg))
        } else {
            ("█", Style::default().fg(color).bg(theme.bg))
        };
        paint_disc(buf, area, center, radius, symbol, style);
    }
}

fn draw_ghosts(
    buf: &mut Buffer,
    ghosts: &[Ghost],
    theme: &Theme,
    area: Rect,
    geometry: &Geometry,
) -> HashSet<(u16, u16)> {
    let radius = dot_radius(geometry);
    let mut cells = HashSet::new();
    for ghost in ghosts {
        let style = Style::default().fg(theme.dot_color(ghost.color)).bg(theme.bg);
        let painted = paint_disc(buf, area, geometry.cell_center(ghost.cell), radius, "█", style);
        cells.extend(painted.into_iter().map(|p| (p.x, p.y)));
    }
    cells
}

/// Create or advance the ghost fade (TachyonFX: fade cleared dots to bg).
fn apply_clear_fade(
    frame: &mut Frame,
    area: Rect,
    ghost_cells: HashSet<(u16, u16)>,
    bg: Color,
    fade: &mut Fade,
    now: Instant,
) {
    let delta = fade
        .last
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    fade.last = Some(now);

    if fade.effect.is_none() {
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            ghost_cells.contains(&(pos.x, pos.y))
        }));
        let effect = fx::fade_to(bg, bg, (CLEAR_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(area);
        fade.effect = Some(effect);
    }
    if let Some(effect) = fade.effect.as_mut() {
        frame.render_effect(effect, area, TfxDuration::from_millis(delta_ms));
    }
}

fn draw_ring(buf: &mut Buffer, area: Rect, geometry: &Geometry, cell: CellPos, color: Color) {
    let (cx, cy) = geometry.cell_center(cell);
    let outer = geometry.spacing * 0.5;
    let inner = dot_radius(geometry);
    let x0 = (cx - outer).floor().max(0.0) as u16;
    let x1 = (cx + outer).ceil().max(0.0) as u16;
    let y0 = ((cy - outer) / 2.0).floor().max(0.0) as u16;
    let y1 = ((cy + outer) / 2.0).ceil().max(0.0) as u16;
    for ty in y0..=y1 {
        for tx in x0..=x1 {
            let (px, py) = (f32::from(tx) + 0.5, f32::from(ty) * 2.0 + 1.0);
            let d = ((px - cx).powi(2) + (py - cy).powi(2)).sqrt();
            if d <= inner || d > outer {
                continue;
            }
            let pos = Position::new(area.x.saturating_add(tx), area.y.saturating_add(ty));
            if let Some(c) = buf.cell_mut(pos) {
                c.set_symbol("░").set_fg(color);
            }
        }
    }
}

/// Hand glyph just below the point between two cells.
fn draw_hand(buf: &mut Buffer, area: Rect, geometry: &Geometry, hand: HandPose, theme: &Theme) {
    let (ax, ay) = geometry.cell_center(hand.from);
    let (bx, by) = geometry.cell_center(hand.to);
    let x = ax + (bx - ax) * hand.progress;
    let y = ay + (by - ay) * hand.progress + geometry.spacing * 0.3;
    let pos = Position::new(
        area.x.saturating_add(x.max(0.0) as u16),
        area.y.saturating_add((y / 2.0).max(0.0) as u16),
    );
    if !area.contains(pos) {
        return;
    }
    if let Some(cell) = buf.cell_mut(pos) {
        cell.set_symbol("☝").set_fg(theme.main_fg);
    }
}

fn popup(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn draw_banner(frame: &mut Frame, banner: &Banner, theme: &Theme, area: Rect) {
    let width = banner.text.chars().count() as u16 + 6;
    let rect = popup(area, width, 3);
    Clear.render(rect, frame.buffer_mut());
    Paragraph::new(Span::styled(
        banner.text.as_str(),
        Style::default()
            .fg(Color::Black)
            .bg(theme.title)
            .add_modifier(Modifier::BOLD),
    ))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    )
    .render(rect, frame.buffer_mut());
}

fn draw_end(frame: &mut Frame, view: &View, theme: &Theme, area: Rect) {
    let (title, detail) = match view.end_reason {
        Some(EndReason::TimeUp) => (" Time's up! ", "The clock ran out."),
        Some(EndReason::Skipped) => (" Skipped ", "You skipped the rest of level 2."),
        Some(EndReason::Cleared) | None => (" Well done! ", "No more moves on level 2."),
    };
    let text = Style::default().fg(theme.main_fg);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            title,
            Style::default().fg(Color::Black).bg(theme.title),
        )),
        Line::from(""),
        Line::from(Span::styled(detail, text)),
        Line::from(Span::styled(format!(" Merges: {} ", view.merges), text)),
        Line::from(""),
        Line::from(Span::styled(" R restart · Q quit ", text)),
        Line::from(""),
    ];
    let rect = popup(area, 40, lines.len() as u16 + 2);
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
                .title(Span::styled(" chaindots ", Style::default().fg(theme.title))),
        )
        .render(rect, frame.buffer_mut());
}
