use anyhow::Result;
use collateral_map::{
    build_view, full_value_range, CollateralRecord, FilterParams, RegionCount, ValueRange,
    KNOWN_REGIONS,
};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

/// The original's value-slider step: 100 000 Kč
const VALUE_STEP: i64 = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    RegionSummary,
    RecordLedger,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::RegionSummary => Page::RecordLedger,
            Page::RecordLedger => Page::RegionSummary,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::RegionSummary => "Kraje",
            Page::RecordLedger => "Nemovitosti",
        }
    }
}

pub struct App {
    pub records: Vec<CollateralRecord>,
    pub params: FilterParams,
    pub full_range: Option<ValueRange>,
    pub current_page: Page,
    pub summary_state: TableState,
    pub records_state: TableState,
}

impl App {
    pub fn new(records: Vec<CollateralRecord>) -> Self {
        let full_range = full_value_range(&records);
        let params = FilterParams::all_regions(full_range.unwrap_or(ValueRange::new(0, 0)));

        let mut summary_state = TableState::default();
        summary_state.select(Some(0));
        let mut records_state = TableState::default();
        if !records.is_empty() {
            records_state.select(Some(0));
        }

        Self {
            records,
            params,
            full_range,
            current_page: Page::RegionSummary,
            summary_state,
            records_state,
        }
    }

    /// Region counts over the value-filtered set (region selection ignored)
    pub fn counts(&self) -> Vec<RegionCount> {
        build_view(&self.records, &self.params).region_counts
    }

    /// Records passing both predicates, for the ledger page
    pub fn filtered(&self) -> Vec<CollateralRecord> {
        collateral_map::filter_records(&self.records, &self.params)
            .into_iter()
            .cloned()
            .collect()
    }

    fn active_state(&mut self) -> (&mut TableState, usize) {
        match self.current_page {
            Page::RegionSummary => {
                let len = self.counts().len();
                (&mut self.summary_state, len)
            }
            Page::RecordLedger => {
                let len = self.filtered().len();
                (&mut self.records_state, len)
            }
        }
    }

    pub fn next(&mut self) {
        let (state, len) = self.active_state();
        if len == 0 {
            state.select(None);
            return;
        }
        let i = state.selected().map(|i| (i + 1) % len).unwrap_or(0);
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let (state, len) = self.active_state();
        if len == 0 {
            state.select(None);
            return;
        }
        let i = state
            .selected()
            .map(|i| if i == 0 { len - 1 } else { i - 1 })
            .unwrap_or(0);
        state.select(Some(i));
    }

    /// Toggle the region under the summary cursor in the selected set
    pub fn toggle_selected_region(&mut self) {
        let counts = self.counts();
        let Some(i) = self.summary_state.selected() else {
            return;
        };
        let Some(entry) = counts.get(i) else { return };

        if !self.params.selected_regions.remove(&entry.region) {
            self.params.selected_regions.insert(entry.region.clone());
        }
    }

    pub fn select_all_regions(&mut self) {
        self.params.selected_regions = KNOWN_REGIONS.iter().map(|r| r.to_string()).collect();
    }

    pub fn select_no_regions(&mut self) {
        self.params.selected_regions.clear();
    }

    /// Reset both filters to their defaults
    pub fn reset_filters(&mut self) {
        let range = self.full_range.unwrap_or(ValueRange::new(0, 0));
        self.params = FilterParams::all_regions(range);
    }

    pub fn adjust_max(&mut self, delta: i64) {
        let Some(full) = self.full_range else { return };
        let max = (self.params.value_range.max + delta)
            .clamp(self.params.value_range.min, full.max);
        self.params.value_range.max = max;
    }

    pub fn adjust_min(&mut self, delta: i64) {
        let Some(full) = self.full_range else { return };
        let min = (self.params.value_range.min + delta)
            .clamp(full.min, self.params.value_range.max);
        self.params.value_range.min = min;
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Tab => app.current_page = app.current_page.next(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Enter if app.current_page == Page::RegionSummary => {
                    app.toggle_selected_region()
                }
                KeyCode::Char('a') => app.select_all_regions(),
                KeyCode::Char('n') => app.select_no_regions(),
                KeyCode::Char('r') => app.reset_filters(),
                KeyCode::Char('+') | KeyCode::Char('=') => app.adjust_max(VALUE_STEP),
                KeyCode::Char('-') => app.adjust_max(-VALUE_STEP),
                KeyCode::Char('.') => app.adjust_min(VALUE_STEP),
                KeyCode::Char(',') => app.adjust_min(-VALUE_STEP),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(())
                }
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation + filter summary
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::RegionSummary => render_summary(f, chunks[1], app),
        Page::RecordLedger => render_ledger(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::RegionSummary, Page::RecordLedger];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Záznamů: {}", app.records.len()),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));

    // The original states the single value when the range is degenerate
    match app.full_range {
        Some(full) if full.is_degenerate() => {
            tab_spans.push(Span::styled(
                format!(
                    "Všechny nemovitosti mají hodnotu: {}",
                    collateral_map::format_czk(full.min)
                ),
                Style::default().fg(Color::Cyan),
            ));
        }
        _ => {
            tab_spans.push(Span::styled(
                format!(
                    "💰 {} – {}",
                    collateral_map::format_czk(app.params.value_range.min),
                    collateral_map::format_czk(app.params.value_range.max)
                ),
                Style::default().fg(Color::Cyan),
            ));
        }
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn render_summary(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(4)])
        .split(area);

    let counts = app.counts();

    let header_cells = ["", "Kraj", "Počet nemovitostí"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = counts.iter().map(|entry| {
        let selected = app.params.selected_regions.contains(&entry.region);
        let mark = if selected { "[x]" } else { "[ ]" };
        let color = if selected { Color::Green } else { Color::DarkGray };

        Row::new(vec![
            Cell::from(mark).style(Style::default().fg(color)),
            Cell::from(entry.region.clone()),
            Cell::from(entry.count.to_string()),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(28),
            Constraint::Length(18),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Počet nemovitostí podle krajů "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, chunks[0], &mut app.summary_state);

    // Headline: most and least populated regions
    let mut lines = Vec::new();
    if let Some(max) = counts.first() {
        lines.push(Line::from(vec![
            Span::styled("✅ Nejvíce: ", Style::default().fg(Color::Green)),
            Span::raw(format!("{} ({})", max.region, max.count)),
        ]));
    }
    if let Some(min) = counts.last() {
        lines.push(Line::from(vec![
            Span::styled("❌ Nejméně: ", Style::default().fg(Color::Red)),
            Span::raw(format!("{} ({})", min.region, min.count)),
        ]));
    }
    if lines.is_empty() {
        lines.push(Line::from("Žádné záznamy v aktuálním filtru"));
    }

    let headline = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    f.render_widget(headline, chunks[1]);
}

fn render_ledger(f: &mut Frame, area: Rect, app: &mut App) {
    let filtered = app.filtered();

    let header_cells = ["Title", "Úvěr", "Hodnota", "Adresa", "Kraj", "GPS"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });
    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = filtered.iter().map(|record| {
        let gps = if record.on_map() { "✓" } else { "—" };
        let gps_color = if record.on_map() {
            Color::Green
        } else {
            Color::Red
        };

        Row::new(vec![
            Cell::from(truncate(&record.title, 26)),
            Cell::from(record.loan_reference.clone()),
            Cell::from(record.formatted_value()),
            Cell::from(truncate(&record.address, 36)),
            Cell::from(record.region.clone().unwrap_or_default()),
            Cell::from(gps).style(Style::default().fg(gps_color)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(28),
            Constraint::Length(14),
            Constraint::Length(16),
            Constraint::Length(38),
            Constraint::Length(22),
            Constraint::Length(4),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(format!(" Nemovitosti ({}) ", filtered.len())),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.records_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected_regions = app.params.selected_regions.len();

    let status_spans = vec![
        Span::styled(
            format!(" Kraje: {}/{} ", selected_regions, KNOWN_REGIONS.len()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("| "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" Kraj on/off | "),
        Span::styled("a/n", Style::default().fg(Color::Yellow)),
        Span::raw(" All/None | "),
        Span::styled("+/- ,/.", Style::default().fg(Color::Yellow)),
        Span::raw(" Rozmezí | "),
        Span::styled("r", Style::default().fg(Color::Yellow)),
        Span::raw(" Reset | "),
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(" Page | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

/// Char-safe truncation (addresses and titles carry diacritics)
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
