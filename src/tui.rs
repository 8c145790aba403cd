use std::io::stdout;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

use crate::api::ApiClient;
use crate::filter::{self, RegionCounts};
use crate::models::{AlertPayload, FacetSelection, OpportunityRecord};
use crate::monitor::{Cadence, JobMonitor, PollOutcome};
use crate::normalize::normalize;
use crate::reconcile::{CardStore, ScoreBand};
use crate::worker::{self, Msg};

const STATUS_POLL: Duration = Duration::from_secs(4);
const LOG_POLL: Duration = Duration::from_secs(4);
const ALERT_POLL: Duration = Duration::from_secs(2);
/// Early status probe right after a trigger, before the regular cadence.
const POST_TRIGGER_PROBE: Duration = Duration::from_secs(2);
const FRAME: Duration = Duration::from_millis(100);

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

/// Region tab bar: label, facet value (None = everything).
const REGION_TABS: [(&str, Option<&str>); 4] = [
    ("Everything", None),
    ("India", Some("India")),
    ("Global", Some("International")),
    ("Remote", Some("Remote")),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
    ConfirmClear,
}

struct AppState {
    records: Vec<OpportunityRecord>,
    facets: FacetSelection,
    sources: Vec<String>,
    orgs: Vec<String>,
    roles: Vec<String>,
    counts: RegionCounts,
    visible: usize,
    store: CardStore,
    job: JobMonitor,
    refresh_in_flight: bool,
    loading: bool,
    alert: Option<AlertPayload>,
    logs: Vec<String>,
    logs_visible: bool,
    logs_scroll: u16,
    logs_follow: bool,
    selected: usize,
    scroll: u16,
    status_line: String,
    input_mode: InputMode,
    frame_tick: u64,
}

impl AppState {
    fn new() -> AppState {
        AppState {
            records: Vec::new(),
            facets: FacetSelection::default(),
            sources: Vec::new(),
            orgs: Vec::new(),
            roles: Vec::new(),
            counts: RegionCounts::default(),
            visible: 0,
            store: CardStore::new(),
            job: JobMonitor::new(),
            refresh_in_flight: false,
            loading: true,
            alert: None,
            logs: Vec::new(),
            logs_visible: false,
            logs_scroll: 0,
            logs_follow: true,
            selected: 0,
            scroll: 0,
            status_line: String::new(),
            input_mode: InputMode::Normal,
            frame_tick: 0,
        }
    }

    /// Start one fetch-normalize-render cycle unless one is already in
    /// flight; overlapping cycles would let a stale response clobber a
    /// fresher one.
    fn request_refresh(&mut self, client: &ApiClient, tx: &Sender<Msg>) {
        if self.refresh_in_flight {
            return;
        }
        self.refresh_in_flight = true;
        worker::spawn_fetch_records(client.clone(), tx.clone());
    }

    /// One atomic render pass: filter + sort the current records under
    /// the current facets, then reconcile the card store against it.
    fn apply_view(&mut self) {
        let view = filter::view(&self.records, &self.facets);
        self.visible = view.len();
        self.store.reconcile(&view);
        if self.selected >= self.visible {
            self.selected = self.visible.saturating_sub(1);
        }
    }

    fn handle_msg(&mut self, msg: Msg, client: &ApiClient, tx: &Sender<Msg>) {
        match msg {
            Msg::Records(batch) => {
                self.refresh_in_flight = false;
                self.loading = false;
                self.records = normalize(batch);
                self.sources = filter::distinct_sources(&self.records);
                self.orgs = distinct_values(&self.records, |r| &r.org_type);
                self.roles = distinct_values(&self.records, |r| &r.role_type);
                self.counts = filter::region_counts(&self.records);
                self.apply_view();
            }
            Msg::RecordsFailed(_) => {
                // Transient; the next poll or keypress will retry.
                self.refresh_in_flight = false;
                self.loading = false;
            }
            Msg::Status(running) => {
                if self.job.on_poll(running) == PollOutcome::Refresh {
                    self.request_refresh(client, tx);
                }
            }
            Msg::Logs(lines) => {
                self.logs = lines;
            }
            Msg::Alert(alert) => {
                self.alert = alert;
            }
            Msg::TriggerDone(Ok(ack)) => {
                self.status_line = ack
                    .message
                    .unwrap_or_else(|| "Scraper started".to_string());
            }
            Msg::TriggerDone(Err(e)) => {
                self.status_line = format!("Trigger failed: {e}");
                // Treat like a "not running" poll so the control re-arms.
                if self.job.on_poll(false) == PollOutcome::Refresh {
                    self.request_refresh(client, tx);
                }
            }
            Msg::ClearDone(Ok(ack)) => {
                self.status_line = ack
                    .message
                    .unwrap_or_else(|| format!("Clear: {}", ack.status));
                if ack.status == "success" {
                    self.request_refresh(client, tx);
                }
            }
            Msg::ClearDone(Err(e)) => {
                self.status_line = format!("Clear failed: {e}");
            }
        }
    }
}

fn distinct_values<F>(records: &[OpportunityRecord], pick: F) -> Vec<String>
where
    F: Fn(&OpportunityRecord) -> &str,
{
    let mut values: Vec<String> = records
        .iter()
        .map(|r| pick(r).to_string())
        .filter(|v| !v.is_empty())
        .collect();
    values.sort();
    values.dedup();
    values
}

/// Advance `current` through `options`, wrapping back to "all" (None).
fn cycle_option(current: &Option<String>, options: &[String]) -> Option<String> {
    if options.is_empty() {
        return None;
    }
    match current {
        None => Some(options[0].clone()),
        Some(value) => match options.iter().position(|o| o == value) {
            Some(i) if i + 1 < options.len() => Some(options[i + 1].clone()),
            _ => None,
        },
    }
}

pub fn run_dash(client: ApiClient) -> Result<()> {
    let (tx, rx) = mpsc::channel();
    let mut state = AppState::new();
    state.request_refresh(&client, &tx);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, &client, &tx, &rx);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    client: &ApiClient,
    tx: &Sender<Msg>,
    rx: &Receiver<Msg>,
) -> Result<()> {
    let mut status_cadence = Cadence::new(STATUS_POLL);
    let mut log_cadence = Cadence::new(LOG_POLL);
    let mut alert_cadence = Cadence::new(ALERT_POLL);

    loop {
        while let Ok(msg) = rx.try_recv() {
            state.handle_msg(msg, client, tx);
        }

        let now = Instant::now();
        if status_cadence.due(now) {
            worker::spawn_status_poll(client.clone(), tx.clone());
        }
        if alert_cadence.due(now) {
            worker::spawn_alert_poll(client.clone(), tx.clone());
        }
        if state.logs_visible && log_cadence.due(now) {
            worker::spawn_logs_fetch(client.clone(), tx.clone());
        }

        terminal.draw(|frame| draw(frame, state))?;
        state.store.tick();
        state.frame_tick = state.frame_tick.wrapping_add(1);

        if event::poll(FRAME)? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if !handle_key(state, key.code, client, tx, &mut status_cadence, &mut log_cadence) {
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Returns false when the app should exit.
fn handle_key(
    state: &mut AppState,
    code: KeyCode,
    client: &ApiClient,
    tx: &Sender<Msg>,
    status_cadence: &mut Cadence,
    log_cadence: &mut Cadence,
) -> bool {
    match state.input_mode {
        InputMode::Search => {
            match code {
                KeyCode::Esc => {
                    state.facets.search.clear();
                    state.input_mode = InputMode::Normal;
                    state.apply_view();
                }
                KeyCode::Enter => state.input_mode = InputMode::Normal,
                KeyCode::Backspace => {
                    state.facets.search.pop();
                    state.apply_view();
                }
                KeyCode::Char(c) => {
                    state.facets.search.push(c);
                    state.apply_view();
                }
                _ => {}
            }
            return true;
        }
        InputMode::ConfirmClear => {
            if code == KeyCode::Char('y') {
                state.status_line = "Clearing all data...".to_string();
                worker::spawn_clear(client.clone(), tx.clone());
            } else {
                state.status_line = "Clear cancelled".to_string();
            }
            state.input_mode = InputMode::Normal;
            return true;
        }
        InputMode::Normal => {}
    }

    match code {
        KeyCode::Char('q') | KeyCode::Esc => return false,
        KeyCode::Char('/') => state.input_mode = InputMode::Search,
        KeyCode::Char(c @ '1'..='4') => {
            let tab = (c as usize) - ('1' as usize);
            state.facets.location = REGION_TABS[tab].1.map(str::to_string);
            state.apply_view();
        }
        KeyCode::Char('s') => {
            state.facets.source = cycle_option(&state.facets.source, &state.sources);
            state.apply_view();
        }
        KeyCode::Char('p') => {
            state.facets.stipend = state.facets.stipend.next();
            state.apply_view();
        }
        KeyCode::Char('o') => {
            state.facets.org = cycle_option(&state.facets.org, &state.orgs);
            state.apply_view();
        }
        KeyCode::Char('r') => {
            state.facets.role = cycle_option(&state.facets.role, &state.roles);
            state.apply_view();
        }
        KeyCode::Char('x') => {
            state.facets = FacetSelection::default();
            state.apply_view();
        }
        KeyCode::Char('t') => {
            if !state.job.is_running() {
                state.job.on_trigger();
                state.status_line = "Starting scraper...".to_string();
                worker::spawn_trigger(client.clone(), tx.clone(), None);
                status_cadence.hasten(POST_TRIGGER_PROBE);
            }
        }
        KeyCode::Char('R') => state.request_refresh(client, tx),
        KeyCode::Char('L') => {
            state.logs_visible = !state.logs_visible;
            if state.logs_visible {
                log_cadence.hasten(Duration::ZERO);
            }
        }
        KeyCode::Char('d') => {
            if state.alert.take().is_some() {
                worker::spawn_dismiss(client.clone());
            }
        }
        KeyCode::Char('C') => {
            state.input_mode = InputMode::ConfirmClear;
            state.status_line = "Clear ALL scraped data? press y to confirm".to_string();
        }
        KeyCode::Down | KeyCode::Char('j') => {
            if state.visible > 0 && state.selected < state.visible - 1 {
                state.selected += 1;
            }
        }
        KeyCode::Up | KeyCode::Char('k') => {
            state.selected = state.selected.saturating_sub(1);
        }
        KeyCode::Char('J') | KeyCode::PageDown => {
            if state.logs_visible {
                state.logs_follow = false;
                state.logs_scroll = state.logs_scroll.saturating_add(3);
            }
        }
        KeyCode::Char('K') | KeyCode::PageUp => {
            if state.logs_visible {
                state.logs_follow = false;
                state.logs_scroll = state.logs_scroll.saturating_sub(3);
            }
        }
        KeyCode::Char('F') => state.logs_follow = true,
        _ => {}
    }
    true
}

fn draw(frame: &mut Frame, state: &mut AppState) {
    let has_alert = state.alert.is_some();

    let mut rows: Vec<Constraint> = vec![Constraint::Length(1), Constraint::Length(1)];
    if has_alert {
        rows.push(Constraint::Length(1));
    }
    rows.push(Constraint::Min(3));
    if state.logs_visible {
        rows.push(Constraint::Length(10));
    }
    rows.push(Constraint::Length(1));
    rows.push(Constraint::Length(1));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(rows)
        .split(frame.area());

    let mut next = 0;
    let mut area = || {
        let a = chunks[next];
        next += 1;
        a
    };

    draw_header(frame, area(), state);
    draw_tabs(frame, area(), state);
    if has_alert {
        draw_alert(frame, area(), state);
    }
    draw_main(frame, area(), state);
    if state.logs_visible {
        draw_logs(frame, area(), state);
    }
    draw_status(frame, area(), state);
    draw_help(frame, area());
}

fn draw_header(frame: &mut Frame, area: Rect, state: &AppState) {
    let mut spans = vec![
        Span::styled(" oppdash ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(
            "{} tracked, {} shown",
            state.counts.total, state.visible
        )),
    ];
    if state.job.is_running() {
        let spinner = SPINNER[(state.frame_tick / 2) as usize % SPINNER.len()];
        spans.push(Span::styled(
            format!("   scraping in progress {spinner}"),
            Style::default().fg(Color::Yellow),
        ));
    } else if state.loading {
        spans.push(Span::styled(
            "   loading...",
            Style::default().fg(Color::DarkGray),
        ));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_tabs(frame: &mut Frame, area: Rect, state: &AppState) {
    let fmt = |n: usize| {
        if n > 0 {
            n.to_string()
        } else {
            "—".to_string()
        }
    };
    let counts = [
        fmt(state.counts.total),
        fmt(state.counts.india),
        fmt(state.counts.international),
        fmt(state.counts.remote),
    ];

    let mut spans = vec![Span::raw(" ")];
    for (i, (label, value)) in REGION_TABS.iter().enumerate() {
        let active = state.facets.location.as_deref() == *value;
        let style = if active {
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!("{} {}", label, counts[i]), style));
        if i + 1 < REGION_TABS.len() {
            spans.push(Span::raw("  |  "));
        }
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn draw_alert(frame: &mut Frame, area: Rect, state: &AppState) {
    let Some(alert) = &state.alert else { return };
    let line = Line::from(Span::styled(
        format!(" ALERT [{}] {}  (d to dismiss)", alert.source, alert.message),
        Style::default()
            .fg(Color::White)
            .bg(Color::Red)
            .add_modifier(Modifier::BOLD),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_main(frame: &mut Frame, area: Rect, state: &mut AppState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(26), Constraint::Min(20)])
        .split(area);

    draw_sidebar(frame, columns[0], state);
    draw_cards(frame, columns[1], state);
}

fn draw_sidebar(frame: &mut Frame, area: Rect, state: &AppState) {
    let all = |v: &Option<String>| v.clone().unwrap_or_else(|| "all".to_string());
    let search = if state.facets.search.is_empty() {
        "-".to_string()
    } else {
        state.facets.search.clone()
    };
    let cursor = if state.input_mode == InputMode::Search {
        "_"
    } else {
        ""
    };

    let dim = Style::default().fg(Color::DarkGray);
    let lines = vec![
        Line::from(format!("search:  {search}{cursor}")),
        Line::from(format!("source:  {}", all(&state.facets.source))),
        Line::from(format!("region:  {}", all(&state.facets.location))),
        Line::from(format!("stipend: {}", state.facets.stipend.label())),
        Line::from(format!("org:     {}", all(&state.facets.org))),
        Line::from(format!("role:    {}", all(&state.facets.role))),
        Line::from(""),
        Line::from(Span::styled(format!("{} sources known", state.sources.len()), dim)),
    ];

    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Filters "));
    frame.render_widget(widget, area);
}

fn draw_cards(frame: &mut Frame, area: Rect, state: &mut AppState) {
    let filtered = if state.facets.is_default() {
        ""
    } else {
        " [filtered]"
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" Opportunities ({}){} ", state.visible, filtered));

    if state.store.showing_placeholder() {
        let widget = Paragraph::new("\n\n  No opportunities found matching your criteria.")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(widget, area);
        return;
    }
    if state.loading && state.store.is_empty() {
        let widget = Paragraph::new("\n\n  Loading opportunities...")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(widget, area);
        return;
    }

    let inner_width = area.width.saturating_sub(4) as usize;
    let mut lines: Vec<Line> = Vec::new();
    let mut selected_range = (0usize, 0usize);

    for (pos, handle) in state.store.ordered().iter().enumerate() {
        let Some(card) = state.store.card(*handle) else {
            continue;
        };
        let content = &card.content;
        let selected = pos == state.selected;
        let entering = card.is_entering();
        let start = lines.len();

        let marker = if selected { "> " } else { "  " };
        let accent = if entering {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::Cyan)
        };

        let mut head = vec![
            Span::raw(marker),
            Span::styled(content.company.clone(), accent.add_modifier(Modifier::BOLD)),
        ];
        if content.is_new {
            head.push(Span::styled(
                "  NEW",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ));
        }
        if let Some((score, band)) = content.score {
            let color = match band {
                ScoreBand::High => Color::Green,
                ScoreBand::Medium => Color::Yellow,
                ScoreBand::Low => Color::Red,
            };
            head.push(Span::styled(
                format!("  {score:.0}% match"),
                Style::default().fg(color),
            ));
        }
        lines.push(Line::from(head));

        let title_style = if selected {
            Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(content.title.clone(), title_style),
        ]));

        let mut tags = vec![content.location.clone(), content.stipend.clone()];
        if content.duration != "N/A" {
            tags.push(content.duration.clone());
        }
        if !content.org_type.is_empty() {
            tags.push(content.org_type.clone());
        }
        if !content.role_type.is_empty() {
            tags.push(content.role_type.clone());
        }
        lines.push(Line::from(Span::styled(
            format!("  {}", tags.join(" | ")),
            Style::default().fg(Color::Magenta),
        )));

        for wrapped in textwrap::wrap(
            &format!("Skills: {}", content.skills),
            inner_width.max(20),
        ) {
            lines.push(Line::from(format!("  {wrapped}")));
        }

        let link = content
            .link
            .as_deref()
            .unwrap_or("(no valid apply link)");
        lines.push(Line::from(Span::styled(
            format!("  {}  {}", content.footer, link),
            Style::default().fg(Color::DarkGray),
        )));
        lines.push(Line::from(""));

        if selected {
            selected_range = (start, lines.len());
        }
    }

    // Keep the selected card inside the viewport without moving others.
    let viewport = area.height.saturating_sub(2) as usize;
    let (start, end) = selected_range;
    if start < state.scroll as usize {
        state.scroll = start as u16;
    } else if viewport > 0 && end > state.scroll as usize + viewport {
        state.scroll = (end - viewport) as u16;
    }

    let widget = Paragraph::new(Text::from(lines))
        .block(block)
        .scroll((state.scroll, 0));
    frame.render_widget(widget, area);
}

fn draw_logs(frame: &mut Frame, area: Rect, state: &mut AppState) {
    let viewport = area.height.saturating_sub(2) as usize;
    let max_scroll = state.logs.len().saturating_sub(viewport) as u16;
    if state.logs_follow {
        state.logs_scroll = max_scroll;
    } else if state.logs_scroll > max_scroll {
        state.logs_scroll = max_scroll;
    }

    let lines: Vec<Line> = state.logs.iter().map(|l| Line::from(l.as_str())).collect();
    let widget = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Scraper Logs (J/K scroll, F follow, L close) "),
        )
        .scroll((state.logs_scroll, 0));
    frame.render_widget(widget, area);
}

fn draw_status(frame: &mut Frame, area: Rect, state: &AppState) {
    let text = match state.input_mode {
        InputMode::Search => format!(
            " search: {}_  (Enter done, Esc clear)",
            state.facets.search
        ),
        _ => format!(" {}", state.status_line),
    };
    frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(Color::Gray)),
        area,
    );
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let help = " q:quit  /:search  1-4:region  s:source  p:stipend  o:org  r:role  x:reset  \
                j/k:select  t:scrape  R:refresh  L:logs  d:alert  C:clear";
    frame.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}
