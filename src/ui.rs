use anyhow::Result;
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

use weekly_ledger::{
    comparison_series, ComparisonPoint, Currency, Direction as TrendDirection, Period, PeriodDraft,
    Tracker, Trend,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    History,
    Draft,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::History => Page::Draft,
            Page::Draft => Page::History,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::History => "History",
            Page::Draft => "Current Week",
        }
    }
}

pub struct App {
    pub periods: Vec<Period>,
    pub series: Vec<ComparisonPoint>,
    pub draft: PeriodDraft,
    pub currency: Currency,
    pub state: TableState,
    pub draft_state: TableState,
    pub current_page: Page,
    pub show_detail: bool,
}

impl App {
    pub fn new(tracker: &Tracker) -> Result<Self> {
        let currency = tracker.settings().comparison_currency;
        let periods = tracker.history()?;
        let series = comparison_series(&periods, currency);

        let mut state = TableState::default();
        if !periods.is_empty() {
            state.select(Some(periods.len() - 1));
        }
        let mut draft_state = TableState::default();
        if !tracker.draft().accounts().is_empty() {
            draft_state.select(Some(0));
        }

        Ok(Self {
            periods,
            series,
            draft: tracker.draft().clone(),
            currency,
            state,
            draft_state,
            current_page: Page::History,
            show_detail: false,
        })
    }

    /// Re-read history and draft from the tracker
    pub fn reload(&mut self, tracker: &Tracker) -> Result<()> {
        let selected = self.state.selected();
        self.periods = tracker.history()?;
        self.draft = tracker.draft().clone();
        self.refresh_series();
        let last = self.periods.len().checked_sub(1);
        self.state.select(selected.and_then(|i| last.map(|l| i.min(l))).or(last));
        Ok(())
    }

    pub fn cycle_currency(&mut self) {
        self.currency = match self.currency {
            Currency::BRL => Currency::USD,
            Currency::USD => Currency::EUR,
            Currency::EUR => Currency::BRL,
        };
        self.refresh_series();
    }

    fn refresh_series(&mut self) {
        self.series = comparison_series(&self.periods, self.currency);
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn selected_period(&self) -> Option<&Period> {
        self.state.selected().and_then(|i| self.periods.get(i))
    }

    fn active_len_and_state(&mut self) -> (usize, &mut TableState) {
        match self.current_page {
            Page::History => (self.periods.len(), &mut self.state),
            Page::Draft => (self.draft.accounts().len(), &mut self.draft_state),
        }
    }

    pub fn next(&mut self) {
        let (len, state) = self.active_len_and_state();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let (len, state) = self.active_len_and_state();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }
}

pub fn run_ui(app: &mut App, tracker: &Tracker) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, app, tracker);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    tracker: &Tracker,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab | KeyCode::BackTab => app.next_page(),
                KeyCode::Char('c') => app.cycle_currency(),
                KeyCode::Char('r') => app.reload(tracker)?,
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::History if app.show_detail => {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                .split(chunks[1]);
            render_history(f, content_chunks[0], app);
            render_period_detail(f, content_chunks[1], app);
        }
        Page::History => render_history(f, chunks[1], app),
        Page::Draft => render_draft(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn trend_color(trend: &Trend) -> Color {
    match trend.direction {
        TrendDirection::Up => Color::Green,
        TrendDirection::Down => Color::Red,
        TrendDirection::Neutral => Color::DarkGray,
    }
}

fn format_trend(trend: &Trend) -> String {
    match trend.percent {
        Some(p) => format!("{} {:+.2}%", trend.direction.arrow(), p),
        None => trend.direction.arrow().to_string(),
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![];
    for (i, page) in [Page::History, Page::Draft].iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" │ "));
        }
        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(page.title().to_string(), style));
    }

    spans.push(Span::raw("  |  "));
    spans.push(Span::styled(
        format!("Weeks: {}", app.periods.len()),
        Style::default().fg(Color::White),
    ));

    if let Some(last) = app.series.last() {
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(
            format!("Latest: {} {:.2}", app.currency.symbol(), last.total),
            Style::default().fg(Color::Cyan),
        ));
        spans.push(Span::raw("  "));
        spans.push(Span::styled(format_trend(&last.change), Style::default().fg(trend_color(&last.change))));
    }

    let header = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));
    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    Row::new(cells).style(Style::default().bg(Color::DarkGray)).height(1)
}

fn render_history(f: &mut Frame, area: Rect, app: &mut App) {
    let total_title = format!("Total ({})", app.currency);
    let header_cells = ["Date", "Accounts", "USD→BRL", "EUR→BRL"]
        .iter()
        .map(|h| h.to_string())
        .chain([total_title, "Change".to_string()])
        .map(|h| Cell::from(h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)));
    let header = Row::new(header_cells).style(Style::default().bg(Color::DarkGray)).height(1);

    let rows = app.periods.iter().zip(&app.series).map(|(period, point)| {
        let color = trend_color(&point.change);
        Row::new(vec![
            Cell::from(period.date.format("%Y-%m-%d").to_string()),
            Cell::from(period.account_count().to_string()),
            Cell::from(format!("{:.4}", period.rates.usd_to_brl)),
            Cell::from(format!("{:.4}", period.rates.eur_to_brl)),
            Cell::from(format!("{:.2}", point.total)),
            Cell::from(format_trend(&point.change)).style(Style::default().fg(color)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(9),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(16),
            Constraint::Length(14),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Saved Weeks "),
    )
    .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn account_rows(accounts: &[weekly_ledger::AccountBalance]) -> Vec<Row<'static>> {
    accounts
        .iter()
        .map(|a| {
            Row::new(vec![
                Cell::from(truncate(&a.name, 24)),
                Cell::from(format!("{:.2}", a.usd)),
                Cell::from(format!("{:.2}", a.brl)),
                Cell::from(format!("{:.2}", a.eur)),
            ])
        })
        .collect()
}

const ACCOUNT_WIDTHS: [Constraint; 4] = [
    Constraint::Length(26),
    Constraint::Length(14),
    Constraint::Length(14),
    Constraint::Length(14),
];

fn render_period_detail(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Week Detail ");

    let period = match app.selected_period() {
        Some(p) => p,
        None => {
            f.render_widget(Paragraph::new("No week selected").block(block), area);
            return;
        }
    };

    let mut rows = account_rows(&period.accounts);
    rows.push(totals_row(period.totals.usd, period.totals.brl, period.totals.eur));

    let table = Table::new(rows, ACCOUNT_WIDTHS)
        .header(header_row(&["Account", "USD", "BRL", "EUR"]))
        .block(block.title(format!(" {} ", period.date)));
    f.render_widget(table, area);
}

fn totals_row(usd: f64, brl: f64, eur: f64) -> Row<'static> {
    Row::new(vec![
        Cell::from("Total"),
        Cell::from(format!("{:.2}", usd)),
        Cell::from(format!("{:.2}", brl)),
        Cell::from(format!("{:.2}", eur)),
    ])
    .style(Style::default().add_modifier(Modifier::BOLD).fg(Color::Yellow))
}

fn render_draft(f: &mut Frame, area: Rect, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(area);

    let rates = app.draft.rates();
    let totals = app.draft.totals();
    let info = vec![
        Line::from(vec![
            Span::styled("Date: ", Style::default().fg(Color::Yellow)),
            Span::raw(app.draft.date.to_string()),
            Span::raw("   "),
            Span::styled("USD→BRL ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{:.4}", rates.usd_to_brl)),
            Span::raw("   "),
            Span::styled("EUR→BRL ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{:.4}", rates.eur_to_brl)),
            Span::raw("   "),
            Span::styled("BTC→USD ", Style::default().fg(Color::Yellow)),
            Span::raw(format!("{:.2}", rates.btc_to_usd)),
        ]),
        Line::from(vec![
            Span::styled(format!("Total ({}): ", app.currency), Style::default().fg(Color::Yellow)),
            Span::raw(format!("{} {:.2}", app.currency.symbol(), totals.in_currency(app.currency, rates))),
        ]),
    ];
    f.render_widget(
        Paragraph::new(info).block(Block::default().borders(Borders::ALL).title(" Draft ")),
        chunks[0],
    );

    let mut rows = account_rows(app.draft.accounts());
    rows.push(totals_row(totals.usd, totals.brl, totals.eur));

    let table = Table::new(rows, ACCOUNT_WIDTHS)
        .header(header_row(&["Account", "USD", "BRL", "EUR"]))
        .block(Block::default().borders(Borders::ALL).title(" Accounts "))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("→ ");
    f.render_stateful_widget(table, chunks[1], &mut app.draft_state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let selected = app.state.selected().map(|i| i + 1).unwrap_or(0);

    let spans = vec![
        Span::styled(
            format!(" Week: {}/{} ", selected, app.periods.len()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::styled("Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" Details | "),
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(" Page | "),
        Span::styled("c", Style::default().fg(Color::Yellow)),
        Span::raw(format!(" Currency ({}) | ", app.currency)),
        Span::styled("r", Style::default().fg(Color::Yellow)),
        Span::raw(" Reload | "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );
    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}
