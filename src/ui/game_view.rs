use crate::ui::table_view::TableView;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Token colors by player id, cycling for large tables.
const PLAYER_COLORS: [Color; 6] = [
    Color::Red,
    Color::Yellow,
    Color::Green,
    Color::Cyan,
    Color::Magenta,
    Color::Blue,
];

pub fn player_color(player: usize) -> Color {
    PLAYER_COLORS[player % PLAYER_COLORS.len()]
}

/// Rows needed for the card grid: three lines per table row plus borders.
fn table_height(rows: usize) -> u16 {
    u16::try_from(rows.saturating_mul(3).saturating_add(2)).unwrap_or(u16::MAX)
}

pub fn render(frame: &mut Frame, view: &TableView, message: &Option<String>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                            // Header
            Constraint::Min(table_height(view.rows())),       // Table + players
            Constraint::Length(3),                            // Message
            Constraint::Length(3),                            // Controls
        ])
        .split(frame.area());

    render_header(frame, view, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(30), Constraint::Length(34)])
        .split(chunks[1]);
    render_table(frame, view, body[0]);
    render_players(frame, view, body[1]);

    render_message(frame, message, chunks[2]);
    render_controls(frame, chunks[3]);
}

fn render_header(frame: &mut Frame, view: &TableView, area: Rect) {
    let (status, color) = match view.winners() {
        Some(winners) => {
            let names: Vec<&str> = winners
                .iter()
                .filter_map(|id| view.players().get(*id))
                .map(|player| player.name.as_str())
                .collect();
            let label = if names.len() == 1 { "Winner" } else { "Draw" };
            (format!("Game Over  |  {}: {}", label, names.join(", ")), Color::Green)
        }
        None => {
            let (remaining, urgent) = view.countdown();
            let text = if urgent {
                format!("Time left: {:.2}s", remaining.as_secs_f64())
            } else {
                format!("Time left: {}s", remaining.as_secs())
            };
            (text, if urgent { Color::Red } else { Color::White })
        }
    };

    let header = Paragraph::new(status)
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Set"));

    frame.render_widget(header, area);
}

fn render_table(frame: &mut Frame, view: &TableView, area: Rect) {
    let mut lines = Vec::new();

    for row in 0..view.rows() {
        let mut card_spans = vec![Span::raw("  ")];
        let mut token_spans = vec![Span::raw("  ")];
        for column in 0..view.columns() {
            let slot = row * view.columns() + column;
            match view.card_at(slot) {
                Some(card) => card_spans.push(Span::styled(
                    format!("[{:^8}]", view.card_label(card)),
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                None => card_spans.push(Span::styled(
                    format!("[{:^8}]", ""),
                    Style::default().fg(Color::DarkGray),
                )),
            }
            card_spans.push(Span::raw(" "));

            // One marker per token holder under the card
            let tokens = view.tokens_at(slot);
            token_spans.push(Span::raw(" "));
            for player in tokens {
                token_spans.push(Span::styled(
                    "●",
                    Style::default().fg(player_color(*player)),
                ));
            }
            token_spans.push(Span::raw(" ".repeat(9usize.saturating_sub(tokens.len()))));
        }
        lines.push(Line::from(card_spans));
        lines.push(Line::from(token_spans));
        lines.push(Line::from(""));
    }

    let table = Paragraph::new(lines)
        .alignment(Alignment::Left)
        .block(Block::default().borders(Borders::ALL).title("Table"));
    frame.render_widget(table, area);
}

fn render_players(frame: &mut Frame, view: &TableView, area: Rect) {
    let mut lines = Vec::new();
    for (id, player) in view.players().iter().enumerate() {
        let mut spans = vec![
            Span::styled("● ", Style::default().fg(player_color(id))),
            Span::styled(
                format!("{:<12}", player.name),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("{:>3}", player.score)),
        ];
        if !player.frozen.is_zero() {
            spans.push(Span::styled(
                format!("  frozen {:.1}s", player.frozen.as_secs_f64()),
                Style::default().fg(Color::DarkGray),
            ));
        }
        lines.push(Line::from(spans));
        match &player.keys {
            Some(keys) => lines.push(Line::from(Span::styled(
                format!("  keys: {keys}"),
                Style::default().fg(Color::Gray),
            ))),
            None => lines.push(Line::from(Span::styled(
                "  computer",
                Style::default().fg(Color::Gray),
            ))),
        }
    }

    let players = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Players"));
    frame.render_widget(players, area);
}

fn render_message(frame: &mut Frame, message: &Option<String>, area: Rect) {
    let text = message.as_deref().unwrap_or("");
    let msg_widget = Paragraph::new(text)
        .style(Style::default().fg(Color::Yellow))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));

    frame.render_widget(msg_widget, area);
}

fn render_controls(frame: &mut Frame, area: Rect) {
    let controls = Paragraph::new(Line::from(
        "Player keys: toggle a token on the matching slot  |  Esc: Quit",
    ))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL).title("Controls"));

    frame.render_widget(controls, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::ui::GameDisplay;
    use crate::ui::TableDisplay;
    use parking_lot::Mutex;
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn rendered_text(view: &TableView, message: &Option<String>) -> String {
        let backend = TestBackend::new(100, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| render(f, view, message)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_render_cards_players_and_message() {
        let view = Arc::new(Mutex::new(TableView::from_config(&AppConfig::default())));
        let display = TableDisplay::new(Arc::clone(&view));
        display.place_card(80, 0);
        display.score(1, 4);

        let text = rendered_text(&view.lock(), &Some("hello".into()));
        assert!(text.contains("2222"));
        assert!(text.contains("Player 2"));
        assert!(text.contains("keys: qwerasdfzxcv"));
        assert!(text.contains("computer"));
        assert!(text.contains("hello"));
    }

    #[test]
    fn test_table_height_saturates() {
        assert_eq!(table_height(3), 11);
        assert_eq!(table_height(30_000), u16::MAX);
        assert_eq!(table_height(usize::MAX), u16::MAX);
    }

    #[test]
    fn test_render_winners() {
        let view = Arc::new(Mutex::new(TableView::from_config(&AppConfig::default())));
        let display = TableDisplay::new(Arc::clone(&view));
        display.winners(&[0, 2]);

        let text = rendered_text(&view.lock(), &None);
        assert!(text.contains("Draw: Player 1, Player 3"));
    }
}
