use std::collections::VecDeque;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use core_vitrine::EngineConfig;
use vitrine_runtime::{CellFrameState, CellPhaseTag, DisplayItem, GridFrame};

pub struct UiState {
    pub last_frame: Option<GridFrame>,
    pub frames_seen: u64,
    pub logs: VecDeque<String>,
    pub max_logs: usize,
    pub visible: bool,
    pub reduced_motion: bool,
    pub wide_viewport: bool,
    pub command_mode: bool,
    pub command_input: String,
    pub seed: u64,
    pub tick_ms: u64,
    columns: u8,
    rows: u8,
}

impl UiState {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            last_frame: None,
            frames_seen: 0,
            logs: VecDeque::new(),
            max_logs: 8,
            visible: true,
            reduced_motion: config.reduced_motion,
            wide_viewport: config.wide_viewport,
            command_mode: false,
            command_input: String::new(),
            seed: config.seed,
            tick_ms: config.tick_ms,
            columns: config.columns,
            rows: config.rows,
        }
    }

    pub fn push_frame(&mut self, frame: GridFrame) {
        self.frames_seen += 1;
        self.last_frame = Some(frame);
    }

    pub fn push_log<S: Into<String>>(&mut self, line: S) {
        let mut text: String = line.into();
        while text.ends_with('\n') || text.ends_with('\r') {
            text.pop();
        }
        if text.is_empty() {
            return;
        }
        self.logs.push_front(text);
        while self.logs.len() > self.max_logs {
            self.logs.pop_back();
        }
    }
}

pub fn draw_ui(frame: &mut Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(9),
            Constraint::Length(3),
            Constraint::Length(10),
        ])
        .split(frame.size());

    draw_header(frame, chunks[0], state);
    draw_grid(frame, chunks[1], state);
    draw_footer(frame, chunks[2], state);
    draw_logs(frame, chunks[3], state);
}

fn draw_header(frame: &mut Frame, area: Rect, state: &UiState) {
    let mut spans = vec![Span::styled(
        format!("seed {:#x}  tick {}ms  ", state.seed, state.tick_ms),
        Style::default().fg(Color::DarkGray),
    )];

    if let Some(grid) = &state.last_frame {
        spans.push(Span::raw(format!(
            "tick {}  photos {}  reviews {}  rows {:?}  hash {:016x}",
            grid.header.tick,
            grid.header.photo_cells,
            grid.header.review_cells,
            grid.photo_rows,
            grid.header.hash,
        )));
    } else {
        spans.push(Span::raw("waiting for first frame"));
    }

    spans.push(Span::styled(
        format!(
            "  [{}{}{}]",
            if state.visible { "V" } else { "-" },
            if state.reduced_motion { "R" } else { "-" },
            if state.wide_viewport { "W" } else { "-" },
        ),
        Style::default().fg(Color::Yellow),
    ));

    let paragraph = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Vitrine inspector"),
    );
    frame.render_widget(paragraph, area);
}

fn draw_grid(frame: &mut Frame, area: Rect, state: &UiState) {
    let Some(grid) = &state.last_frame else {
        let placeholder =
            Paragraph::new("…").block(Block::default().borders(Borders::ALL).title("grid"));
        frame.render_widget(placeholder, area);
        return;
    };

    let rows = state.rows.max(1) as usize;
    let columns = state.columns.max(1) as usize;

    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Ratio(1, rows as u32); rows])
        .split(area);

    for (row_index, row_area) in row_areas.iter().enumerate() {
        let cell_areas = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, columns as u32); columns])
            .split(*row_area);

        for (column_index, cell_area) in cell_areas.iter().enumerate() {
            let cell = grid
                .cells
                .iter()
                .find(|cell| cell.row as usize == row_index && cell.column as usize == column_index);
            frame.render_widget(cell_widget(cell), *cell_area);
        }
    }
}

fn cell_widget(state: Option<&CellFrameState>) -> Paragraph<'static> {
    let Some(state) = state else {
        // Removed cell: hosts keep the space but render nothing.
        return Paragraph::new("").block(Block::default().borders(Borders::ALL));
    };

    let visible = &state.layers[state.active_layer as usize];
    let (title, body, color) = match &visible.item {
        Some(DisplayItem::Photo(photo)) => (
            format!("cell {} ▣ photo", state.cell),
            photo.public_id.0.clone(),
            Color::Cyan,
        ),
        Some(DisplayItem::Review(review)) => {
            let stars = "★".repeat(review.rating as usize);
            let body = review
                .body
                .as_deref()
                .map(|text| text.chars().take(60).collect::<String>())
                .unwrap_or_else(|| "Verified 5-star rating.".to_string());
            (
                format!("cell {} {} {}", state.cell, review.display_name, stars),
                body,
                Color::White,
            )
        }
        None => (format!("cell {}", state.cell), String::new(), Color::DarkGray),
    };

    let status = format!(
        "{:?}  fade {}ms  hold {}",
        state.phase,
        state.fade_ms,
        state
            .hold_remaining_ms
            .map(|ms| format!("{ms}ms"))
            .unwrap_or_else(|| "-".to_string()),
    );

    let style = match state.phase {
        CellPhaseTag::Staged | CellPhaseTag::Settling => {
            Style::default().fg(color).add_modifier(Modifier::ITALIC)
        }
        CellPhaseTag::Parked => Style::default().fg(Color::Blue),
        _ => Style::default().fg(color),
    };

    let lines = vec![
        Line::from(Span::styled(body, style)),
        Line::from(Span::styled(status, Style::default().fg(Color::DarkGray))),
    ];

    Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(title))
}

fn draw_footer(frame: &mut Frame, area: Rect, state: &UiState) {
    let text = if state.command_mode {
        format!(":{}", state.command_input)
    } else {
        "q quit  h hide/show  m motion  v viewport  : command (show | hide | motion on|off | viewport wide|narrow | remove <cell> | reseed <seed>)"
            .to_string()
    };
    let paragraph =
        Paragraph::new(text).block(Block::default().borders(Borders::ALL).title("console"));
    frame.render_widget(paragraph, area);
}

fn draw_logs(frame: &mut Frame, area: Rect, state: &UiState) {
    let lines: Vec<Line> = state
        .logs
        .iter()
        .map(|line| Line::from(line.clone()))
        .collect();
    let paragraph = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("engine log"));
    frame.render_widget(paragraph, area);
}
