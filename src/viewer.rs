use anyhow::Result;
use chrono::{NaiveDate, Utc};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

use crate::classify::{event_status, filter_by_city, parse_deadline, partition_programs, ProgramBoard};
use crate::countdown::{countdown_targets, CountdownTicker, Countdowns};
use crate::error::Error;
use crate::fetcher::Fetcher;
use crate::models::{EventItem, EventStatus, FeedItem, Stats, UserId};
use crate::screen::{Activation, LoadState, Screen};
use crate::store::Store;
use crate::tags::StatusMap;

const ACCENT: Color = Color::Rgb(0xec, 0x37, 0x50);
const POLL: Duration = Duration::from_millis(200);

/// Runs the interactive dashboard until the user quits.
pub async fn run_dashboard(fetcher: Fetcher, store: Store, since: Option<NaiveDate>) -> Result<()> {
    let user_id = store.load_user_id()?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let loader = Loader { fetcher, tx, since };
    let mut app = DashboardApp::new(store, user_id);
    app.enter_tab(Tab::Programs, &loader);

    let res = run_app(&mut terminal, &mut app, &loader, &mut rx).await;

    // Stops the countdown task before the terminal goes back to normal.
    app.leave_tab();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut DashboardApp,
    loader: &Loader,
    rx: &mut mpsc::UnboundedReceiver<Loaded>,
) -> Result<()> {
    loop {
        while let Ok(loaded) = rx.try_recv() {
            app.apply(loaded);
        }

        terminal.draw(|f| ui(f, app))?;

        let key = tokio::task::block_in_place(|| -> io::Result<Option<KeyEvent>> {
            if event::poll(POLL)? {
                if let Event::Key(key) = event::read()? {
                    return Ok(Some(key));
                }
            }
            Ok(None)
        })?;

        if let Some(key) = key {
            if key.kind == KeyEventKind::Press && app.handle_key(key, loader) == Flow::Quit {
                return Ok(());
            }
        }
    }
}

/// Fetch results coming back from spawned tasks.
enum Loaded {
    Programs(Activation, Result<Vec<FeedItem>, Error>),
    Events(Activation, Result<Vec<EventItem>, Error>),
    Stats(Activation, Result<Stats, Error>),
}

struct Loader {
    fetcher: Fetcher,
    tx: mpsc::UnboundedSender<Loaded>,
    since: Option<NaiveDate>,
}

impl Loader {
    fn programs(&self, activation: Activation) {
        let fetcher = self.fetcher.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = fetcher.fetch_programs(Utc::now()).await;
            let _ = tx.send(Loaded::Programs(activation, result));
        });
    }

    fn events(&self, activation: Activation) {
        let fetcher = self.fetcher.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = fetcher.fetch_hackathons().await;
            let _ = tx.send(Loaded::Events(activation, result));
        });
    }

    fn stats(&self, activation: Activation, user: UserId) {
        let fetcher = self.fetcher.clone();
        let tx = self.tx.clone();
        let since = self.since;
        tokio::spawn(async move {
            let result = fetcher.fetch_stats(&user, since).await;
            let _ = tx.send(Loaded::Stats(activation, result));
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Programs,
    Events,
    Stats,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::Programs, Tab::Events, Tab::Stats];

    fn title(self) -> &'static str {
        match self {
            Tab::Programs => "YSWS",
            Tab::Events => "Events",
            Tab::Stats => "Stats",
        }
    }

    fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    fn next(self) -> Tab {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    fn prev(self) -> Tab {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }
}

#[derive(Debug, PartialEq, Eq)]
enum InputMode {
    Normal,
    CitySearch,
    UserId,
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

struct DashboardApp {
    tab: Tab,
    programs: Screen<ProgramBoard>,
    events: Screen<Vec<EventItem>>,
    stats: Screen<Stats>,
    ticker: Option<CountdownTicker>,
    tags: StatusMap,
    program_selected: usize,
    event_selected: usize,
    city_query: String,
    input: InputMode,
    input_buffer: String,
    store: Store,
    user_id: Option<UserId>,
    notice: Option<String>,
}

impl DashboardApp {
    fn new(store: Store, user_id: Option<UserId>) -> Self {
        Self {
            tab: Tab::Programs,
            programs: Screen::new("programs"),
            events: Screen::new("hackathons"),
            stats: Screen::new("stats"),
            ticker: None,
            tags: StatusMap::new(),
            program_selected: 0,
            event_selected: 0,
            city_query: String::new(),
            input: InputMode::Normal,
            input_buffer: String::new(),
            store,
            user_id,
            notice: None,
        }
    }

    /// One visit of a tab: each visit fetches afresh.
    fn enter_tab(&mut self, tab: Tab, loader: &Loader) {
        self.tab = tab;
        self.notice = None;
        match tab {
            Tab::Programs => {
                self.program_selected = 0;
                loader.programs(self.programs.activate());
            }
            Tab::Events => {
                self.event_selected = 0;
                loader.events(self.events.activate());
            }
            Tab::Stats => self.load_stats(loader),
        }
    }

    fn leave_tab(&mut self) {
        match self.tab {
            Tab::Programs => {
                self.ticker = None;
                self.programs.dismantle();
            }
            Tab::Events => self.events.dismantle(),
            Tab::Stats => self.stats.dismantle(),
        }
        self.input = InputMode::Normal;
    }

    fn switch_tab(&mut self, tab: Tab, loader: &Loader) {
        if tab == self.tab {
            return;
        }
        self.leave_tab();
        self.enter_tab(tab, loader);
    }

    fn load_stats(&mut self, loader: &Loader) {
        match self.user_id.clone() {
            Some(user) => loader.stats(self.stats.activate(), user),
            None => {
                self.input = InputMode::UserId;
                self.input_buffer.clear();
            }
        }
    }

    fn apply(&mut self, loaded: Loaded) {
        match loaded {
            Loaded::Programs(activation, result) => {
                let result = result.map(partition_programs);
                if self.programs.resolve(activation, result) {
                    self.ticker = self
                        .programs
                        .ready()
                        .map(|board| CountdownTicker::start(countdown_targets(board)));
                }
            }
            Loaded::Events(activation, result) => {
                self.events.resolve(activation, result);
            }
            Loaded::Stats(activation, result) => {
                self.stats.resolve(activation, result);
            }
        }
    }

    fn refresh(&mut self, loader: &Loader) {
        match self.tab {
            Tab::Programs => {
                self.ticker = None;
                self.program_selected = 0;
                loader.programs(self.programs.activate());
            }
            Tab::Events => {
                self.event_selected = 0;
                loader.events(self.events.activate());
            }
            Tab::Stats => self.load_stats(loader),
        }
    }

    fn handle_key(&mut self, key: KeyEvent, loader: &Loader) -> Flow {
        match self.input {
            InputMode::CitySearch => {
                match key.code {
                    KeyCode::Enter | KeyCode::Esc => self.input = InputMode::Normal,
                    KeyCode::Backspace => {
                        self.city_query.pop();
                        self.event_selected = 0;
                    }
                    KeyCode::Char(c) => {
                        self.city_query.push(c);
                        self.event_selected = 0;
                    }
                    _ => {}
                }
                return Flow::Continue;
            }
            InputMode::UserId => {
                match key.code {
                    KeyCode::Esc => self.input = InputMode::Normal,
                    KeyCode::Backspace => {
                        self.input_buffer.pop();
                    }
                    KeyCode::Char(c) => self.input_buffer.push(c),
                    KeyCode::Enter => self.submit_user_id(loader),
                    _ => {}
                }
                return Flow::Continue;
            }
            InputMode::Normal => {}
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Flow::Quit,
            KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => {
                self.switch_tab(self.tab.next(), loader)
            }
            KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => {
                self.switch_tab(self.tab.prev(), loader)
            }
            KeyCode::Char('1') => self.switch_tab(Tab::Programs, loader),
            KeyCode::Char('2') => self.switch_tab(Tab::Events, loader),
            KeyCode::Char('3') => self.switch_tab(Tab::Stats, loader),
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('r') => self.refresh(loader),
            KeyCode::Char('t') if self.tab == Tab::Programs => self.cycle_tag(),
            KeyCode::Char('/') if self.tab == Tab::Events => self.input = InputMode::CitySearch,
            KeyCode::Char('u') if self.tab == Tab::Stats => {
                self.input = InputMode::UserId;
                self.input_buffer = self
                    .user_id
                    .as_ref()
                    .map(|id| id.to_string())
                    .unwrap_or_default();
            }
            _ => {}
        }
        Flow::Continue
    }

    fn submit_user_id(&mut self, loader: &Loader) {
        let id = match UserId::parse(&self.input_buffer) {
            Ok(id) => id,
            Err(err) => {
                self.notice = Some(err.to_string());
                return;
            }
        };
        if let Err(err) = self.store.save_user_id(&id) {
            self.notice = Some(format!("Could not save user id: {err:#}"));
            return;
        }
        info!(user = %id, "user id saved");
        self.user_id = Some(id);
        self.input = InputMode::Normal;
        self.notice = None;
        self.load_stats(loader);
    }

    fn move_selection(&mut self, delta: isize) {
        let (selected, len) = match self.tab {
            Tab::Programs => (
                &mut self.program_selected,
                self.programs.ready().map_or(0, ProgramBoard::len),
            ),
            Tab::Events => (
                &mut self.event_selected,
                self.events
                    .ready()
                    .map_or(0, |events| filter_by_city(events, &self.city_query).len()),
            ),
            Tab::Stats => return,
        };
        if len == 0 {
            *selected = 0;
            return;
        }
        *selected = selected.saturating_add_signed(delta).min(len - 1);
    }

    fn cycle_tag(&mut self) {
        let Some(item) = self
            .programs
            .ready()
            .and_then(|board| board.get(self.program_selected))
        else {
            return;
        };
        let key = item.key.clone();
        let title = item.title.clone();
        self.notice = Some(match self.tags.cycle(&key) {
            Some(tag) => format!("{title}: {}", tag.label()),
            None => format!("{title}: tag cleared"),
        });
    }

    fn countdowns(&self) -> Countdowns {
        self.ticker
            .as_ref()
            .map(CountdownTicker::latest)
            .unwrap_or_default()
    }
}

fn ui(f: &mut Frame, app: &DashboardApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tabs
            Constraint::Min(8),    // Body
            Constraint::Length(3), // Footer
        ])
        .split(f.size());

    render_tabs(f, chunks[0], app);
    match app.tab {
        Tab::Programs => render_programs(f, chunks[1], app),
        Tab::Events => render_events(f, chunks[1], app),
        Tab::Stats => render_stats(f, chunks[1], app),
    }
    render_footer(f, chunks[2], app);
}

fn render_tabs(f: &mut Frame, area: Rect, app: &DashboardApp) {
    let titles: Vec<Line> = Tab::ALL.iter().map(|t| Line::from(t.title())).collect();
    let tabs = Tabs::new(titles)
        .select(app.tab.index())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue))
                .title(" hackdeck ")
                .title_alignment(Alignment::Center),
        )
        .highlight_style(Style::default().fg(ACCENT).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, area);
}

/// Placeholder for screens that have nothing to show yet. Returns true when
/// it drew something.
fn render_state_banner<T>(f: &mut Frame, area: Rect, screen: &Screen<T>) -> bool {
    let (text, style) = match screen.state() {
        LoadState::Ready(_) => return false,
        LoadState::Idle => (String::new(), Style::default()),
        LoadState::Loading => (
            format!("Loading {}...", screen.name()),
            Style::default().fg(Color::Gray),
        ),
        LoadState::Failed(message) => (message.clone(), Style::default().fg(Color::Red)),
    };
    let mut lines = vec![Line::from(Span::styled(text, style))];
    if screen.can_retry() {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled(" r ", Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::raw(" Retry"),
        ]));
    }
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(paragraph, area);
    true
}

fn render_programs(f: &mut Frame, area: Rect, app: &DashboardApp) {
    if render_state_banner(f, area, &app.programs) {
        return;
    }
    let Some(board) = app.programs.ready() else {
        return;
    };
    if board.is_empty() {
        let empty = Paragraph::new("No programs available at the moment.")
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(empty, area);
        return;
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let countdowns = app.countdowns();
    let items: Vec<ListItem> = board
        .ordered()
        .map(|item| {
            let title_style = if item.is_passed {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
            };
            let mut title = vec![Span::styled(item.title.clone(), title_style)];
            if let Some(tag) = app.tags.get(&item.key) {
                title.push(Span::raw(" "));
                title.push(Span::styled(
                    format!("[{}]", tag.label()),
                    Style::default().fg(Color::Yellow),
                ));
            }
            ListItem::new(vec![
                Line::from(title),
                Line::from(Span::styled(
                    deadline_line(item, &countdowns),
                    Style::default().fg(ACCENT).add_modifier(Modifier::ITALIC),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(
                    " {} upcoming · {} passed ",
                    board.upcoming.len(),
                    board.passed.len()
                )),
        )
        .highlight_style(Style::default().bg(Color::Rgb(0x1e, 0x1e, 0x1e)))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    state.select(Some(app.program_selected));
    f.render_stateful_widget(list, columns[0], &mut state);

    if let Some(item) = board.get(app.program_selected) {
        render_program_detail(f, columns[1], item);
    }
}

/// Countdown while one is running; "closed" once an upcoming deadline runs
/// out before the next refresh regroups it.
fn deadline_line(item: &FeedItem, countdowns: &Countdowns) -> String {
    if item.is_passed {
        return format!("Deadline: {} · passed", item.deadline);
    }
    match countdowns.get(&item.key) {
        Some(remaining) => format!("Deadline: {} · {remaining} left", item.deadline),
        None if parse_deadline(&item.deadline).is_some() => {
            format!("Deadline: {} · closed", item.deadline)
        }
        None => format!("Deadline: {}", item.deadline),
    }
}

fn render_program_detail(f: &mut Frame, area: Rect, item: &FeedItem) {
    let width = area.width.saturating_sub(2).max(20) as usize;
    let body = if item.raw_description.trim().is_empty() {
        item.description.clone()
    } else {
        html2text::from_read(item.raw_description.as_bytes(), width)
    };

    let mut lines = vec![
        Line::from(Span::styled(
            item.title.clone(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    lines.extend(body.lines().map(|l| Line::from(l.to_string())));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("Learn more: "),
        Span::styled(item.link.clone(), Style::default().fg(Color::Yellow)),
    ]));
    if !item.discussion_link.is_empty() {
        lines.push(Line::from(vec![
            Span::raw("Discussion: "),
            Span::styled(item.discussion_link.clone(), Style::default().fg(Color::Yellow)),
        ]));
    }

    let detail = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Details "))
        .wrap(Wrap { trim: false });
    f.render_widget(detail, area);
}

fn status_style(status: EventStatus) -> Style {
    let bg = match status {
        EventStatus::Ended => Color::Rgb(0x80, 0x08, 0x00),
        EventStatus::InPerson => Color::Rgb(0x1c, 0x80, 0x00),
        EventStatus::Online => Color::Rgb(0x00, 0x0d, 0x80),
    };
    Style::default().bg(bg).fg(Color::White).add_modifier(Modifier::BOLD)
}

fn render_events(f: &mut Frame, area: Rect, app: &DashboardApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5)])
        .split(area);

    let searching = app.input == InputMode::CitySearch;
    let search = Paragraph::new(if app.city_query.is_empty() && !searching {
        Span::styled("Search by city (press /)", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(app.city_query.clone())
    })
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(if searching {
                Style::default().fg(ACCENT)
            } else {
                Style::default().fg(Color::Gray)
            })
            .title(" City "),
    );
    f.render_widget(search, chunks[0]);

    if render_state_banner(f, chunks[1], &app.events) {
        return;
    }
    let Some(events) = app.events.ready() else {
        return;
    };

    // Status is derived from the clock on every draw.
    let now = Utc::now();
    let filtered = filter_by_city(events, &app.city_query);
    let items: Vec<ListItem> = filtered
        .iter()
        .map(|event| {
            let status = event_status(event, now);
            let dim = status == EventStatus::Ended;
            let text_style = if dim {
                Style::default().fg(Color::DarkGray)
            } else {
                Style::default().fg(Color::Gray)
            };
            let place = format!(
                "{}, {}",
                event.location.city().unwrap_or("Online"),
                event.location.country().unwrap_or("")
            );
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(format!(" {} ", status.label()), status_style(status)),
                    Span::raw(" "),
                    Span::styled(
                        event.name.clone(),
                        if dim {
                            text_style
                        } else {
                            Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
                        },
                    ),
                ]),
                Line::from(Span::styled(
                    format!(
                        "   {} - {} · {}",
                        event.starts_at.format("%Y-%m-%d"),
                        event.ends_at.format("%Y-%m-%d"),
                        place.trim_end_matches([',', ' '])
                    ),
                    text_style,
                )),
                Line::from(Span::styled(
                    format!("   {}", event.website.as_deref().unwrap_or("")),
                    Style::default().fg(Color::Yellow),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} of {} hackathons ", filtered.len(), events.len())),
        )
        .highlight_symbol("> ");
    let mut state = ListState::default();
    state.select(Some(app.event_selected));
    f.render_stateful_widget(list, chunks[1], &mut state);
}

fn render_stats(f: &mut Frame, area: Rect, app: &DashboardApp) {
    if app.input == InputMode::UserId {
        let prompt = vec![
            Line::from(Span::styled(
                "Enter your Hackatime user id",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from(Span::styled(
                format!("{}_", app.input_buffer),
                Style::default().fg(Color::White),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Enter to save · Esc to cancel",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        let paragraph = Paragraph::new(prompt)
            .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(ACCENT)))
            .alignment(Alignment::Center);
        f.render_widget(paragraph, area);
        return;
    }

    if app.user_id.is_none() {
        let paragraph = Paragraph::new("No user id saved. Press u to enter one.")
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(paragraph, area);
        return;
    }

    if render_state_banner(f, area, &app.stats) {
        return;
    }
    let Some(stats) = app.stats.ready() else {
        return;
    };

    let bar_width = area.width.saturating_sub(40).clamp(10, 40) as f64;
    let mut lines = vec![
        Line::from(Span::styled(
            stats.username.clone(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(format!("Total: {}", stats.human_readable_total)),
        Line::from(format!("Daily average: {}", stats.human_readable_daily_average)),
        Line::from(""),
    ];
    for language in stats.languages.iter().take(12) {
        let filled = ((language.percent / 100.0) * bar_width).round() as usize;
        lines.push(Line::from(vec![
            Span::styled(format!("{:<14}", language.name), Style::default().fg(Color::White)),
            Span::styled("█".repeat(filled), Style::default().fg(ACCENT)),
            Span::raw(format!(" {:>5.1}%  {}", language.percent, language.text)),
        ]));
    }

    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Coding time "));
    f.render_widget(paragraph, area);
}

fn render_footer(f: &mut Frame, area: Rect, app: &DashboardApp) {
    let key = |k: &'static str| Span::styled(k, Style::default().bg(Color::DarkGray).fg(Color::White));
    let mut spans = vec![
        key(" q "),
        Span::raw(" Quit  "),
        key(" tab "),
        Span::raw(" Switch  "),
        key(" r "),
        Span::raw(" Refresh  "),
    ];
    match app.tab {
        Tab::Programs => {
            spans.push(key(" t "));
            spans.push(Span::raw(" Tag  "));
        }
        Tab::Events => {
            spans.push(key(" / "));
            spans.push(Span::raw(" Search  "));
        }
        Tab::Stats => {
            spans.push(key(" u "));
            spans.push(Span::raw(" User  "));
        }
    }
    if let Some(notice) = &app.notice {
        spans.push(Span::styled(notice.clone(), Style::default().fg(Color::Yellow)));
    }

    let footer = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .alignment(Alignment::Center);
    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Endpoints;
    use crate::models::ProgramKey;
    use tempfile::TempDir;

    fn item(deadline: &str, is_passed: bool) -> FeedItem {
        titled("Arcade", deadline, is_passed)
    }

    fn titled(title: &str, deadline: &str, is_passed: bool) -> FeedItem {
        FeedItem {
            key: ProgramKey::from_content(title, "https://arcade.example"),
            title: title.to_string(),
            link: "https://arcade.example".to_string(),
            raw_description: String::new(),
            description: "Build things".to_string(),
            deadline: deadline.to_string(),
            discussion_link: String::new(),
            is_passed,
        }
    }

    #[test]
    fn tabs_wrap_around() {
        assert_eq!(Tab::Programs.prev(), Tab::Stats);
        assert_eq!(Tab::Stats.next(), Tab::Programs);
        assert_eq!(Tab::Events.index(), 1);
    }

    #[test]
    fn deadline_line_variants() {
        let mut countdowns = Countdowns::new();
        let running = item("2030-01-01", false);
        countdowns.insert(running.key.clone(), "3d 0h 0m 0s".to_string());
        assert_eq!(
            deadline_line(&running, &countdowns),
            "Deadline: 2030-01-01 · 3d 0h 0m 0s left"
        );

        let empty = Countdowns::new();
        assert_eq!(
            deadline_line(&item("2024-01-01", true), &empty),
            "Deadline: 2024-01-01 · passed"
        );
        // Ran out since the last refresh.
        assert_eq!(
            deadline_line(&item("2024-01-01", false), &empty),
            "Deadline: 2024-01-01 · closed"
        );
        assert_eq!(
            deadline_line(&item("No deadline provided", false), &empty),
            "Deadline: No deadline provided"
        );
    }

    // Fetches spawned by tab switches go to a closed port and are never read.
    fn create_test_app() -> (DashboardApp, Loader, mpsc::UnboundedReceiver<Loaded>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = Store::at(temp_dir.path()).unwrap();
        let fetcher = Fetcher::new(Endpoints::with_base("http://127.0.0.1:9")).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        let loader = Loader {
            fetcher,
            tx,
            since: None,
        };
        (DashboardApp::new(store, None), loader, rx, temp_dir)
    }

    #[tokio::test]
    async fn leaving_programs_stops_the_ticker_and_ignores_late_results() {
        let (mut app, loader, _rx, _temp_dir) = create_test_app();
        let activation = app.programs.activate();
        app.apply(Loaded::Programs(activation, Ok(vec![item("2030-01-01", false)])));
        let mut countdown_rx = app.ticker.as_ref().expect("ticker should start").subscribe();

        app.switch_tab(Tab::Events, &loader);
        assert!(app.ticker.is_none());
        assert!(matches!(app.programs.state(), LoadState::Idle));
        let drained = tokio::time::timeout(Duration::from_secs(3), async {
            while countdown_rx.changed().await.is_ok() {}
        })
        .await;
        assert!(drained.is_ok(), "ticker task should end with the screen");

        // A fetch from the dismantled visit lands late.
        app.apply(Loaded::Programs(activation, Ok(vec![item("2030-01-01", false)])));
        assert!(app.ticker.is_none());
        assert!(matches!(app.programs.state(), LoadState::Idle));
    }

    #[tokio::test]
    async fn refresh_restarts_programs_from_the_top() {
        let (mut app, loader, _rx, _temp_dir) = create_test_app();
        let activation = app.programs.activate();
        let items = vec![
            titled("Arcade", "2030-01-01", false),
            titled("Sprig", "2030-02-01", false),
        ];
        app.apply(Loaded::Programs(activation, Ok(items)));
        app.move_selection(1);
        assert_eq!(app.program_selected, 1);

        app.refresh(&loader);
        assert_eq!(app.program_selected, 0);
        assert!(app.ticker.is_none());
        assert!(matches!(app.programs.state(), LoadState::Loading));

        app.apply(Loaded::Programs(activation, Ok(vec![titled("Old", "2030-01-01", false)])));
        assert!(app.ticker.is_none());
        assert!(matches!(app.programs.state(), LoadState::Loading));
    }
}
