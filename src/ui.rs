//! Layout and drawing: menu, board, sidebar, pause, quit menu, game over.

use crate::app::{BOARD_CHOICES, COLOR_CHOICES, MenuState, MenuTab, QuitOption, Screen};
use crate::board::{Marble, Pos, SpecialKind};
use crate::game::GameSession;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::collections::HashSet;
use std::time::Instant;
use tachyonfx::{
    CellFilter, Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx, ref_count,
};

/// Each board cell covers 4x2 terminal cells so marbles read as roughly square.
const CELL_W: u16 = 4;
const CELL_H: u16 = 2;
const SIDEBAR_WIDTH: u16 = 24;

/// Duration of the clear fade (TachyonFX) in ms; shorter than the step delay
/// so the fade finishes before the next cascade step lands.
const CLEAR_FADE_MS: u32 = 140;

/// Board size (border + cells) in terminal cells.
fn board_pixel_size(size: u16) -> (u16, u16) {
    (size * CELL_W + 2, size * CELL_H + 2)
}

/// Inner board rect (cells only, no border) for the given area; matches the
/// draw_game layout so the clear effect lines up with the drawn marbles.
fn board_rect(area: Rect, size: u16) -> Rect {
    let (bw, bh) = board_pixel_size(size);
    let total_w = bw + SIDEBAR_WIDTH;
    let x = area.x + area.width.saturating_sub(total_w) / 2;
    let y = area.y + area.height.saturating_sub(bh) / 2;
    Rect {
        x: x + 1,
        y: y + 1,
        width: (size * CELL_W).min(area.width.saturating_sub(2)),
        height: (size * CELL_H).min(area.height.saturating_sub(2)),
    }
}

/// Buffer (x, y) positions covered by the cells cleared this step.
fn cleared_buffer_positions(board: Rect, cleared: &[Pos]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for pos in cleared {
        let x0 = board.x + pos.col as u16 * CELL_W;
        let y0 = board.y + pos.row as u16 * CELL_H;
        for bx in x0..(x0 + CELL_W).min(board.x + board.width) {
            for by in y0..(y0 + CELL_H).min(board.y + board.height) {
                set.insert((bx, by));
            }
        }
    }
    set
}

/// Create or update the clear fade and process it (fade cleared cells to bg).
fn apply_clear_effect(
    frame: &mut Frame,
    session: &GameSession,
    theme: &Theme,
    area: Rect,
    clear_effect: &mut Option<Effect>,
    clear_process_time: &mut Option<Instant>,
    now: Instant,
) {
    let board = board_rect(area, session.grid.size() as u16);
    let delta = clear_process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(std::time::Duration::ZERO);
    let delta_ms = delta.as_millis().min(u32::MAX as u128) as u32;
    let tfx_delta = TfxDuration::from_millis(delta_ms);
    *clear_process_time = Some(now);

    if clear_effect.is_none() {
        let cleared_set = cleared_buffer_positions(board, &session.last_cleared);
        let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
            cleared_set.contains(&(pos.x, pos.y))
        }));
        let bg = theme.bg;
        let effect = fx::fade_to(bg, bg, (CLEAR_FADE_MS, Interpolation::Linear))
            .with_filter(filter)
            .with_area(board);
        *clear_effect = Some(effect);
    }

    if let Some(effect) = clear_effect {
        frame.render_effect(effect, board, tfx_delta);
    }
}

/// Draw the current screen; the quit menu and pause overlay render on top of
/// the playfield. When the session just cleared cells and !no_animation, the
/// TachyonFX fade runs via `clear_effect` / `clear_process_time`.
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    session: &GameSession,
    paused: bool,
    theme: &Theme,
    menu_state: &mut MenuState,
    quit_selected: Option<QuitOption>,
    clear_effect: &mut Option<Effect>,
    clear_process_time: &mut Option<Instant>,
    now: Instant,
    no_animation: bool,
    area: Rect,
) {
    match screen {
        Screen::Menu => draw_menu(frame, theme, menu_state, area, now),
        Screen::Playing => {
            draw_game(frame, session, theme, area);
            if paused {
                draw_pause_overlay(frame, theme, area);
            }
            if session.is_busy() && !session.last_cleared.is_empty() && !no_animation {
                apply_clear_effect(
                    frame,
                    session,
                    theme,
                    area,
                    clear_effect,
                    clear_process_time,
                    now,
                );
            }
        }
        Screen::QuitMenu => {
            draw_game(frame, session, theme, area);
            if let Some(opt) = quit_selected {
                draw_quit_menu(frame, theme, opt);
            }
        }
        Screen::GameOver => {
            draw_game(frame, session, theme, area);
            draw_game_over(frame, session, theme, area);
        }
    }
}

fn draw_menu(frame: &mut Frame, theme: &Theme, menu_state: &MenuState, area: Rect, now: Instant) {
    let popup_w = 46u16;
    let popup_h = 19u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };

    let title = Line::from(vec![
        Span::styled(" Ma ", Style::default().fg(theme.marble_color(1)).bold()),
        Span::styled("Match ", Style::default().fg(theme.main_fg).bold()),
    ]);

    let highlight_style = Style::default()
        .fg(Color::Black)
        .bg(theme.marble_color(4))
        .bold();
    let selected_style = Style::default().fg(theme.marble_color(4)).bold();
    let normal_style = Style::default().fg(theme.main_fg);

    fn tab_style(
        current: bool,
        selected: bool,
        highlight: Style,
        select: Style,
        normal: Style,
    ) -> Style {
        if current {
            highlight
        } else if selected {
            select
        } else {
            normal
        }
    }

    let size_spans: Vec<Span> = BOARD_CHOICES
        .iter()
        .flat_map(|&n| {
            [
                Span::styled(
                    format!(" {n}x{n} "),
                    tab_style(
                        menu_state.current_tab == MenuTab::Board
                            && menu_state.selected_size == n,
                        menu_state.selected_size == n,
                        highlight_style,
                        selected_style,
                        normal_style,
                    ),
                ),
                Span::from("  "),
            ]
        })
        .collect();

    let color_spans: Vec<Span> = COLOR_CHOICES
        .iter()
        .flat_map(|&n| {
            [
                Span::styled(
                    format!(" {n} "),
                    tab_style(
                        menu_state.current_tab == MenuTab::Colors
                            && menu_state.selected_colors == n,
                        menu_state.selected_colors == n,
                        highlight_style,
                        selected_style,
                        normal_style,
                    ),
                ),
                Span::from("  "),
            ]
        })
        .collect();

    let start_btn = if menu_state.current_tab == MenuTab::Start {
        Span::styled(" [ START GAME ] ", highlight_style)
    } else {
        Span::styled(" [ START GAME ] ", normal_style)
    };

    let lines = vec![
        Line::from(""),
        title,
        Line::from(""),
        Line::from(""),
        Line::from(Span::styled(
            " ─ BOARD SIZE ─ ",
            Style::default().fg(theme.grid_line),
        )),
        Line::from(size_spans),
        Line::from(""),
        Line::from(Span::styled(
            " ─ COLOURS ─ ",
            Style::default().fg(theme.grid_line),
        )),
        Line::from(color_spans),
        Line::from(""),
        Line::from(""),
        Line::from(start_btn),
        Line::from(""),
        Line::from(""),
        Line::from(vec![
            Span::styled(" ↕ ", Style::default().fg(theme.marble_color(3))),
            Span::from("NAVIGATE   "),
            Span::styled(" ↔ ", Style::default().fg(theme.marble_color(3))),
            Span::from("CHANGE   "),
            Span::styled(" ENTER ", Style::default().fg(theme.marble_color(3))),
            Span::from("START"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            " [Q] QUIT ",
            Style::default().fg(Color::Rgb(255, 80, 80)),
        )),
    ];

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.grid_line).bg(theme.bg)),
    );

    // Startup animation: slide in from bottom, ease-out cubic.
    let elapsed = now.duration_since(menu_state.animation_start).as_millis() as u32;
    let anim_duration = 500u32;
    let t = (elapsed as f32 / anim_duration as f32).min(1.0);
    let offset_t = 1.0 - (1.0 - t).powi(3);
    let anim_y_offset = ((1.0 - offset_t) * 10.0) as u16;
    let mut anim_popup = popup;
    anim_popup.y += anim_y_offset;

    p.render(anim_popup, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup_w = 28u16;
    let popup_h = 5u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P — Resume    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.grid_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, session: &GameSession, theme: &Theme, area: Rect) {
    let popup_w = 30u16;
    let popup_h = 10u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " No moves left ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} ", session.score),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Best: {} ", session.best_score),
            Style::default().fg(theme.main_fg),
        )),
    ];
    if session.score > 0 && session.score == session.best_score {
        lines.push(Line::from(Span::styled(
            " New record! ",
            Style::default().fg(Color::Yellow).bold(),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " R — Restart    Q — Quit ",
        Style::default().fg(theme.main_fg),
    )));
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.grid_line).bg(theme.bg))
            .title(Span::styled(" MaMatch ", Style::default().fg(theme.title))),
    );
    p.render(popup, frame.buffer_mut());
}

/// Draw game: board + sidebar, centered in the full area.
fn draw_game(frame: &mut Frame, session: &GameSession, theme: &Theme, area: Rect) {
    let size = session.grid.size() as u16;
    let (bw, bh) = board_pixel_size(size);
    let total_w = bw + SIDEBAR_WIDTH;

    let horiz_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(bh),
            Constraint::Fill(1),
        ])
        .split(horiz_chunks[1]);
    let active_area = vert_chunks[1];

    let (board_area, sidebar_area) = {
        let inner = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
            .split(active_area);
        (inner[0], inner[1])
    };

    draw_board(frame, session, theme, board_area);
    draw_sidebar(frame, session, theme, sidebar_area);
    draw_combo_popup(frame, session, theme, area);
}

/// Glyph for a marble, centered within a CELL_W-wide cell.
fn marble_glyph(marble: &Marble) -> &'static str {
    match marble.special {
        None => " ●  ",
        Some(SpecialKind::RowClear) => " ══ ",
        Some(SpecialKind::ColClear) => " ║  ",
        Some(SpecialKind::Bomb) => " ✸  ",
    }
}

fn draw_board(frame: &mut Frame, session: &GameSession, theme: &Theme, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.grid_line).bg(theme.bg))
        .title(Span::styled(" MaMatch ", Style::default().fg(theme.title)));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let buf = frame.buffer_mut();
    for pos in session.grid.positions() {
        let x0 = inner.x + pos.col as u16 * CELL_W;
        let y0 = inner.y + pos.row as u16 * CELL_H;
        if x0 + CELL_W > inner.x + inner.width || y0 + CELL_H > inner.y + inner.height {
            continue;
        }

        let is_cursor = pos == session.cursor && !session.game_over;
        let is_selected = session.selected == Some(pos);
        let bg = if is_selected {
            theme.selected
        } else if is_cursor {
            theme.cursor
        } else {
            theme.bg
        };

        // Checkerboard tint so the grid reads without per-cell borders.
        let bg = if bg == theme.bg && (pos.row + pos.col) % 2 == 1 {
            shade(theme.bg, 1.18)
        } else {
            bg
        };

        for dy in 0..CELL_H {
            for dx in 0..CELL_W {
                buf[(x0 + dx, y0 + dy)]
                    .set_symbol(" ")
                    .set_style(Style::default().bg(bg));
            }
        }

        if let Some(marble) = session.grid.get(pos) {
            let fg = if is_cursor || is_selected {
                // Keep the marble visible on the highlight colour.
                Color::Black
            } else {
                theme.marble_color(marble.color.index())
            };
            let style = if marble.is_special() {
                Style::default().fg(fg).bg(bg).bold()
            } else {
                Style::default().fg(fg).bg(bg)
            };
            buf.set_string(x0, y0 + CELL_H / 2, marble_glyph(&marble), style);
        }
    }
}

/// Darken or lighten an RGB colour by a factor; non-RGB colours pass through.
fn shade(color: Color, factor: f32) -> Color {
    match color {
        Color::Rgb(r, g, b) => Color::Rgb(
            (r as f32 * factor).min(255.0) as u8,
            (g as f32 * factor).min(255.0) as u8,
            (b as f32 * factor).min(255.0) as u8,
        ),
        other => other,
    }
}

fn draw_sidebar(frame: &mut Frame, session: &GameSession, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let dim_style = Style::default().fg(theme.inactive_fg);
    let border_style = Style::default().fg(theme.grid_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Stats
            Constraint::Length(1), // gap
            Constraint::Length(4), // Colours strip
            Constraint::Length(1), // gap
            Constraint::Length(8), // Controls
            Constraint::Fill(1),
        ])
        .split(area);

    // --- Stats ---
    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], frame.buffer_mut());
    let status = if session.game_over {
        Span::styled("game over", Style::default().fg(Color::Red))
    } else if session.is_busy() {
        Span::styled("cascading...", Style::default().fg(theme.marble_color(4)))
    } else {
        Span::styled("your move", dim_style)
    };
    let stats_lines = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(session.score.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Best:  ", title_style),
            Span::styled(session.best_score.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Combo: ", title_style),
            Span::styled(
                if session.combo > 0 {
                    format!("x{}", session.combo)
                } else {
                    "-".to_string()
                },
                fg_style,
            ),
        ]),
        Line::from(vec![
            Span::styled("Seed:  ", title_style),
            Span::styled(session.seed.to_string(), dim_style),
        ]),
        Line::from(status),
    ];
    Paragraph::new(ratatui::text::Text::from(stats_lines))
        .render(stats_inner, frame.buffer_mut());

    // --- Colours in play ---
    let colours_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let colours_inner = colours_block.inner(chunks[2]);
    colours_block.render(chunks[2], frame.buffer_mut());
    let n = session.colors_in_play();
    let block_w = (colours_inner.width / n.max(1) as u16).max(1);
    for i in 0..n {
        let r = Rect {
            x: colours_inner.x + i as u16 * block_w,
            y: colours_inner.y,
            width: block_w,
            height: colours_inner.height.min(2),
        };
        let c = theme.marble_color(i as u8);
        Paragraph::new("██")
            .style(Style::default().fg(c).bg(c))
            .render(r, frame.buffer_mut());
    }

    // --- Controls ---
    let controls_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let controls_inner = controls_block.inner(chunks[4]);
    controls_block.render(chunks[4], frame.buffer_mut());
    let controls = vec![
        Line::from(vec![
            Span::styled("↑↓←→ ", title_style),
            Span::styled("move cursor", dim_style),
        ]),
        Line::from(vec![
            Span::styled("⏎/␣  ", title_style),
            Span::styled("select / swap", dim_style),
        ]),
        Line::from(vec![
            Span::styled("n/r  ", title_style),
            Span::styled("new game", dim_style),
        ]),
        Line::from(vec![
            Span::styled("p    ", title_style),
            Span::styled("pause", dim_style),
        ]),
        Line::from(vec![
            Span::styled("q    ", title_style),
            Span::styled("quit", dim_style),
        ]),
    ];
    Paragraph::new(ratatui::text::Text::from(controls))
        .render(controls_inner, frame.buffer_mut());
}

/// Floating combo popup near the last removal's centroid, shown while a big
/// combo cascade is running.
fn draw_combo_popup(frame: &mut Frame, session: &GameSession, theme: &Theme, area: Rect) {
    if !session.is_busy() || session.combo < crate::engine::BIG_COMBO {
        return;
    }
    let Some((crow, ccol)) = session.last_centroid else {
        return;
    };
    let board = board_rect(area, session.grid.size() as u16);
    let rx = board.x + (ccol * CELL_W as f32) as u16;
    let ry = board.y + (crow * CELL_H as f32) as u16;
    if rx >= board.x + board.width || ry >= board.y + board.height {
        return;
    }
    let label = format!(" x{} COMBO +{} ", session.combo, session.last_score_delta);
    let style = Style::default()
        .fg(Color::Black)
        .bg(theme.marble_color(4))
        .bold();
    frame.buffer_mut().set_string(rx, ry, label, style);
}

pub fn draw_quit_menu(frame: &mut Frame, theme: &Theme, selected: QuitOption) {
    let area = frame.area();
    let qw = 24;
    let qh = 8;
    let quit_rect = Rect {
        x: area.x + area.width.saturating_sub(qw) / 2,
        y: area.y + area.height.saturating_sub(qh) / 2,
        width: qw,
        height: qh,
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.title))
        .title(" Quit? ");

    for y in quit_rect.y..quit_rect.y + quit_rect.height {
        for x in quit_rect.x..quit_rect.x + quit_rect.width {
            frame.buffer_mut()[(x, y)].set_style(Style::default().bg(theme.bg));
        }
    }

    let inner = block.inner(quit_rect);
    block.render(quit_rect, frame.buffer_mut());

    let options = [
        (QuitOption::Resume, " Resume "),
        (QuitOption::MainMenu, " Main Menu "),
        (QuitOption::Exit, " Exit "),
    ];

    for (i, (opt, label)) in options.iter().enumerate() {
        let style = if *opt == selected {
            Style::default().fg(theme.bg).bg(theme.title).bold()
        } else {
            Style::default().fg(theme.title)
        };
        let rx = inner.x + (inner.width.saturating_sub(label.len() as u16)) / 2;
        let ry = inner.y + 1 + i as u16 * 2;
        frame.buffer_mut().set_string(rx, ry, label, style);
    }
}
