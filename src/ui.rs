//! Terminal UI rendering with ratatui

use crate::board::Cell;
use crate::game::Game;
use crate::settings::Settings;
use crate::tetromino::{Shape, TetrominoType, MAX_SHAPE_SIZE};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

const EMPTY: &str = "  ";

/// Sidebar width: "I: 9999 (100.0%)" plus borders
const SIDEBAR_WIDTH: u16 = 20;
/// Height of the next piece box: 4 preview rows + borders
const NEXT_HEIGHT: u16 = 6;

/// Terminal columns the bordered board takes, two per cell
fn board_cols(board_width: usize) -> u16 {
    u16::try_from(board_width)
        .unwrap_or(u16::MAX)
        .saturating_mul(2)
        .saturating_add(2)
}

/// Size of the whole game area for a board of the given dimensions
fn game_size(board_width: usize, board_height: usize) -> (u16, u16) {
    let stats_height = 2 + 2 + TetrominoType::all().len() as u16 + 2 + NEXT_HEIGHT;
    let board_rows = u16::try_from(board_height)
        .unwrap_or(u16::MAX)
        .saturating_add(2);
    (
        board_cols(board_width).saturating_add(SIDEBAR_WIDTH),
        board_rows.max(stats_height),
    )
}

/// Render the game screen
pub fn render_game(frame: &mut Frame, game: &Game, settings: &Settings) {
    let area = frame.area();
    let block_char = settings.display.block_chars();

    let (width, height) = game_size(game.board.width(), game.board.height());
    let game_area = center_rect(area, width, height);

    // board | stats + next
    let main_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(board_cols(game.board.width())),
            Constraint::Length(SIDEBAR_WIDTH),
        ])
        .split(game_area);

    render_board(frame, main_layout[0], game, block_char);

    let right_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(6), Constraint::Length(NEXT_HEIGHT)])
        .split(main_layout[1]);

    render_stats(frame, right_layout[0], game);
    render_next(frame, right_layout[1], game.next_piece.piece_type, block_char);

    if game.is_over() {
        let subtitle = format!("Score: {}", game.score.points);
        render_overlay(frame, area, "GAME OVER", &subtitle);
    }
}

fn center_rect(area: Rect, width: u16, height: u16) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

/// Render the locked cells with the falling piece on top
fn render_board(frame: &mut Frame, area: Rect, game: &Game, block_char: &str) {
    let block = Block::default()
        .title(" TETRIS ")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Cells above the top row match no row and stay hidden
    let piece_cells = if game.is_over() {
        Vec::new()
    } else {
        game.current_piece.occupied_cells()
    };
    let piece_color = game.current_piece.color();

    let lines: Vec<Line> = game
        .board
        .rows()
        .enumerate()
        .map(|(y, row)| {
            let spans: Vec<Span> = row
                .iter()
                .enumerate()
                .map(|(x, cell)| {
                    if piece_cells.contains(&(x as i32, y as i32)) {
                        Span::styled(block_char, Style::default().fg(piece_color))
                    } else {
                        match cell {
                            Cell::Filled(color) => {
                                Span::styled(block_char, Style::default().fg(*color))
                            }
                            Cell::Empty => Span::raw(EMPTY),
                        }
                    }
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines), inner);
}

/// One sidebar line per piece kind: "T: 3 (25.0%)"
fn stat_line(game: &Game, piece_type: TetrominoType) -> Line<'static> {
    Line::styled(
        format!(
            "{}: {} ({:.1}%)",
            piece_type.name(),
            game.stats.count(piece_type),
            game.stats.percentage(piece_type)
        ),
        Style::default().fg(piece_type.color()),
    )
}

/// Render score, lines and spawn statistics
fn render_stats(frame: &mut Frame, area: Rect, game: &Game) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Score: ", Style::default().fg(Color::Gray)),
            Span::styled(
                game.score.points.to_string(),
                Style::default().fg(Color::Yellow).bold(),
            ),
        ]),
        Line::from(vec![
            Span::styled("Lines: ", Style::default().fg(Color::Gray)),
            Span::styled(game.score.lines.to_string(), Style::default().fg(Color::Green)),
        ]),
        Line::raw(""),
        Line::styled(
            format!("Pieces: {}", game.stats.total()),
            Style::default().fg(Color::Gray),
        ),
    ];
    lines.extend(TetrominoType::all().into_iter().map(|t| stat_line(game, t)));

    frame.render_widget(Paragraph::new(lines), inner);
}

/// Render the next piece preview
fn render_next(frame: &mut Frame, area: Rect, piece_type: TetrominoType, block_char: &str) {
    let block = Block::default()
        .title(" NEXT ")
        .title_alignment(Alignment::Center)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height < 1 || inner.width < 4 {
        return;
    }

    let lines = preview_lines(&piece_type.shape(), piece_type.color(), block_char);
    let paragraph = Paragraph::new(lines).alignment(Alignment::Center);
    frame.render_widget(paragraph, inner);
}

/// Shape rows, padded to the full matrix width so pieces line up
fn preview_lines(shape: &Shape, color: Color, block_char: &str) -> Vec<Line<'static>> {
    let block_char = block_char.to_string();
    (0..shape.size())
        .map(|row| {
            let spans: Vec<Span> = (0..MAX_SHAPE_SIZE)
                .map(|col| {
                    if shape.is_filled(row, col) {
                        Span::styled(block_char.clone(), Style::default().fg(color))
                    } else {
                        Span::raw(EMPTY)
                    }
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}

/// Render a centered popup over the board
fn render_overlay(frame: &mut Frame, area: Rect, title: &str, subtitle: &str) {
    let popup_width = 24u16;
    let popup_height = 5u16;
    let popup_area = center_rect(area, popup_width, popup_height);

    // Clear the background
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .style(Style::default().bg(Color::Black));

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let text = vec![
        Line::styled(title, Style::default().fg(Color::Red).bold()),
        Line::raw(""),
        Line::styled(subtitle, Style::default().fg(Color::Gray)),
    ];

    let paragraph = Paragraph::new(text).alignment(Alignment::Center);
    frame.render_widget(paragraph, inner);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Rules;

    #[test]
    fn test_center_rect() {
        let area = Rect::new(0, 0, 100, 40);
        assert_eq!(center_rect(area, 20, 10), Rect::new(40, 15, 20, 10));
        // Clamped to the available area
        assert_eq!(center_rect(area, 200, 50), Rect::new(0, 0, 100, 40));
    }

    #[test]
    fn test_game_size_follows_board() {
        assert_eq!(game_size(10, 20), (42, 22));
        assert_eq!(game_size(6, 8).0, 34);
        // Short boards still leave room for the sidebar
        assert!(game_size(6, 8).1 >= 18);
    }

    #[test]
    fn test_game_size_saturates_on_huge_boards() {
        assert_eq!(game_size(40_000, 20).0, u16::MAX);
        assert_eq!(game_size(10, 1_000_000).1, u16::MAX);
        assert_eq!(board_cols(usize::MAX), u16::MAX);
    }

    #[test]
    fn test_stat_line() {
        let game = Game::with_seed(Rules::default(), 1);
        let first = game.current_piece.piece_type;
        let line = stat_line(&game, first);
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        let count = game.stats.count(first);
        let pct = game.stats.percentage(first);
        assert_eq!(text, format!("{}: {} ({:.1}%)", first.name(), count, pct));
        assert_eq!(line.style.fg, Some(first.color()));
    }

    #[test]
    fn test_preview_lines() {
        let lines = preview_lines(&TetrominoType::O.shape(), Color::Yellow, "[]");
        assert_eq!(lines.len(), 2);
        for line in &lines {
            assert_eq!(line.spans.len(), MAX_SHAPE_SIZE);
            assert_eq!(line.spans[0].content, "[]");
            assert_eq!(line.spans[2].content, EMPTY);
        }
    }
}
