//! Drawing of the garden snapshot.

use garden::{ChooserView, GardenSnapshot, PlacementView};
use garden_core::Cell;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Widget},
    Frame,
};

/// Width of one grid cell in terminal columns.
const CELL_WIDTH: u16 = 3;

/// The cell grid with placements, region and cursor.
pub struct GridView<'a> {
    block: Option<Block<'a>>,
    snapshot: &'a GardenSnapshot,
}

impl<'a> GridView<'a> {
    pub fn new(snapshot: &'a GardenSnapshot) -> Self {
        Self {
            block: None,
            snapshot,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }

    fn cell_style(&self, cell: Cell, placement: Option<&PlacementView>) -> Style {
        let mut style = match placement {
            Some(p) if p.playing => Style::default().fg(gain_color(p.gain)),
            Some(_) => Style::default().fg(Color::DarkGray),
            None => Style::default().fg(Color::Gray),
        };
        if self.snapshot.in_region(cell) {
            style = style.bg(Color::Yellow).fg(Color::Black);
        }
        if self.snapshot.cursor == Some(cell) {
            style = style.add_modifier(Modifier::REVERSED | Modifier::BOLD);
        }
        style
    }
}

fn gain_color(gain: f32) -> Color {
    if gain >= 0.66 {
        Color::LightGreen
    } else if gain >= 0.33 {
        Color::Green
    } else if gain > 0.0 {
        Color::Cyan
    } else {
        Color::Blue
    }
}

fn cell_symbol(placement: Option<&PlacementView>) -> String {
    let glyph = placement
        .and_then(|p| p.recording_name.as_ref())
        .and_then(|name| name.chars().next())
        .map(|c| c.to_uppercase().next().unwrap_or(c))
        .unwrap_or(if placement.is_some() { '?' } else { '·' });
    format!(" {} ", glyph)
}

impl<'a> Widget for GridView<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = self.block.clone().unwrap_or_default();
        let inner_area = block.inner(area);
        block.render(area, buf);

        if inner_area.width < CELL_WIDTH || inner_area.height == 0 {
            return;
        }

        let visible_cols = (inner_area.width / CELL_WIDTH) as u32;
        let visible_rows = inner_area.height as u32;
        for y in 0..self.snapshot.rows.min(visible_rows) {
            for x in 0..self.snapshot.cols.min(visible_cols) {
                let cell = Cell::new(x, y);
                let placement = self.snapshot.placement_at(cell);
                buf.set_string(
                    inner_area.left() + x as u16 * CELL_WIDTH,
                    inner_area.top() + y as u16,
                    cell_symbol(placement),
                    self.cell_style(cell, placement),
                );
            }
        }
    }
}

/// Draws the whole screen.
pub fn draw(f: &mut Frame, snapshot: &GardenSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(5),    // Grid and details
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    let title = Paragraph::new(Line::from(vec![
        Span::styled("soundgarden", Style::default().fg(Color::Green)),
        Span::raw(" - arrows move, shift+arrows select, type to choose, ctrl+c quits"),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(title, chunks[0]);

    let grid_width = u16::try_from(snapshot.cols)
        .unwrap_or(u16::MAX)
        .saturating_mul(CELL_WIDTH)
        .saturating_add(2);
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(grid_width), Constraint::Min(20)])
        .split(chunks[1]);

    f.render_widget(
        GridView::new(snapshot).block(Block::default().title("Garden").borders(Borders::ALL)),
        body[0],
    );
    f.render_widget(details(snapshot), body[1]);

    let status = Paragraph::new(status_line(snapshot))
        .style(Style::default().fg(Color::White))
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(status, chunks[2]);

    if let Some(chooser) = &snapshot.chooser {
        draw_chooser(f, chooser, chunks[1]);
    }
}

fn details(snapshot: &GardenSnapshot) -> Paragraph<'static> {
    let mut lines = Vec::new();
    match snapshot.cursor.and_then(|cell| snapshot.placement_at(cell)) {
        Some(p) => {
            lines.push(Line::from(Span::styled(
                p.recording_name
                    .clone()
                    .unwrap_or_else(|| format!("missing {}", p.recording_id)),
                Style::default().add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::raw(format!("cells   {}", p.cells.len())));
            lines.push(Line::raw(format!("volume  {:.2}", p.params.volume)));
            lines.push(Line::raw(format!("radius  {:.2}", p.params.radius)));
            lines.push(Line::raw(format!(
                "timing  {:+.2}s",
                p.params.timing_offset_seconds
            )));
            lines.push(Line::raw(format!("gain    {:.2}", p.gain)));
            lines.push(Line::raw(format!("pan     {:+.2}", p.pan)));
        }
        None => lines.push(Line::raw("Empty cell")),
    }
    lines.push(Line::raw(""));
    lines.push(Line::raw(format!(
        "{} placements, {} recordings",
        snapshot.placements.len(),
        snapshot.recordings.len()
    )));
    Paragraph::new(Text::from(lines)).block(Block::default().title("Cell").borders(Borders::ALL))
}

fn status_line(snapshot: &GardenSnapshot) -> String {
    let cursor = snapshot
        .cursor
        .map(|cell| cell.to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!("cursor {}", cursor);
    if !snapshot.region.is_empty() {
        line.push_str(&format!(" | region {} cells", snapshot.region.len()));
    }
    if let Some(status) = &snapshot.status {
        line.push_str(" | ");
        line.push_str(status);
    }
    line
}

fn draw_chooser(f: &mut Frame, chooser: &ChooserView, area: Rect) {
    let popup = centered(area, 50, 60);
    f.render_widget(Clear, popup);

    let items: Vec<ListItem> = chooser
        .matches
        .iter()
        .map(|recording| {
            let style = if recording.resolved {
                Style::default()
            } else {
                Style::default().fg(Color::DarkGray)
            };
            ListItem::new(Span::styled(recording.name.clone(), style))
        })
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .title(format!("Choose: {}", chooser.query))
                .borders(Borders::ALL),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));

    let mut state = ListState::default();
    if !chooser.matches.is_empty() {
        state.select(Some(chooser.selected));
    }
    f.render_stateful_widget(list, popup, &mut state);
}

fn centered(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
