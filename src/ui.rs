use anyhow::Result;
use crossterm::{
    cursor::{Hide, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use fuzzy_matcher::{skim::SkimMatcherV2, FuzzyMatcher};
#[allow(clippy::wildcard_imports)]
use ratatui::{prelude::*, widgets::*};
use std::{
    cell::RefCell,
    io,
    path::{Path, PathBuf},
    process::Command,
    rc::Rc,
};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;
use unicode_width::UnicodeWidthStr;

use crate::searchable::Searchable;
use crate::ssh_config::{Host, HostDetails, Parser};

const LIST_INFO_TEXT: &str =
    "(enter) select | (/) filter | (e) edit config | (v) view details | (↑/k ↓/j) move | (esc) quit";
const FILTER_INFO_TEXT: &str = "(enter) apply filter | (esc) clear filter";
const DETAIL_INFO_TEXT: &str = "(esc) go back | (q) quit";

const POPUP_WIDTH: u16 = 60;

#[derive(Clone)]
pub struct AppConfig {
    pub config_path: PathBuf,

    pub search_filter: Option<String>,
}

/// Colors of the menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub accent: Color,
    pub text: Color,
    pub subtext: Color,
    pub muted: Color,
    pub surface: Color,
}

impl Theme {
    /// Catppuccin Mocha.
    pub const MOCHA: Theme = Theme {
        accent: Color::Rgb(0xcb, 0xa6, 0xf7),
        text: Color::Rgb(0xcd, 0xd6, 0xf4),
        subtext: Color::Rgb(0xba, 0xc2, 0xde),
        muted: Color::Rgb(0x6c, 0x70, 0x86),
        surface: Color::Rgb(0x1e, 0x1e, 0x2e),
    };
}

impl Default for Theme {
    fn default() -> Self {
        Theme::MOCHA
    }
}

/// How a menu run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Host(String),
    Cancelled,
}

enum View {
    List,
    Detail(HostDetails),
}

/// What the event loop has to do after a key press.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    None,
    OpenEditor,
    Done(Selection),
}

pub struct App {
    config: AppConfig,
    theme: Theme,

    search: Input,
    filtering: bool,

    table_state: TableState,
    hosts: Searchable<Host>,
    table_longest_item_lens: (u16, u16),

    view: View,
}

impl App {
    #[must_use]
    pub fn new(hosts: Vec<Host>, config: AppConfig, theme: Theme) -> App {
        let search_input = config.search_filter.clone().unwrap_or_default();

        let matcher = SkimMatcherV2::default();
        let hosts = Searchable::new(hosts, &search_input, move |host: &Host, value: &str| {
            matcher.fuzzy_match(&host.alias, value).is_some()
        });

        let mut app = App {
            config,
            theme,

            search: search_input.into(),
            filtering: false,

            table_state: TableState::default(),
            table_longest_item_lens: constraint_len_calculator(hosts.non_filtered_iter()),
            hosts,

            view: View::List,
        };
        app.reset_selection();
        app
    }

    /// Runs the menu until the user picks a host or quits.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the terminal cannot be configured or read.
    pub fn start(&mut self) -> Result<Selection> {
        let stdout = io::stdout().lock();
        let backend = CrosstermBackend::new(stdout);
        let terminal = Rc::new(RefCell::new(Terminal::new(backend)?));

        setup_terminal(&terminal)?;

        let res = self.run(&terminal);

        restore_terminal(&terminal)?;

        res
    }

    fn run<B: Backend>(&mut self, terminal: &Rc<RefCell<Terminal<B>>>) -> Result<Selection>
    where
        B: std::io::Write,
    {
        loop {
            terminal.borrow_mut().draw(|f| ui(f, self))?;

            // Anything but a key press, resizes included, only needs a redraw.
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }

            match self.on_key(key) {
                Action::None => {}
                Action::OpenEditor => self.open_editor(terminal)?,
                Action::Done(selection) => return Ok(selection),
            }
        }
    }

    fn on_key(&mut self, key: KeyEvent) -> Action {
        #[allow(clippy::enum_glob_use)]
        use KeyCode::*;

        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == Char('c') {
            return Action::Done(Selection::Cancelled);
        }

        if matches!(self.view, View::Detail(_)) {
            return match key.code {
                Esc => {
                    self.view = View::List;
                    Action::None
                }
                Char('q') => Action::Done(Selection::Cancelled),
                _ => Action::None,
            };
        }

        if self.filtering {
            self.on_filter_key(key);
            return Action::None;
        }

        match key.code {
            Enter => match self.selected_host() {
                Some(host) => Action::Done(Selection::Host(host.alias.clone())),
                None => Action::None,
            },
            Char('/') => {
                self.filtering = true;
                Action::None
            }
            Char('e') => Action::OpenEditor,
            Char('v') => {
                self.show_details();
                Action::None
            }
            Esc | Char('q') => Action::Done(Selection::Cancelled),
            Down | Char('j') => {
                self.next();
                Action::None
            }
            Up | Char('k') => {
                self.previous();
                Action::None
            }
            Home => {
                self.first();
                Action::None
            }
            End => {
                self.last();
                Action::None
            }
            _ => Action::None,
        }
    }

    fn on_filter_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.filtering = false,
            KeyCode::Esc => {
                self.filtering = false;
                self.search.reset();
                self.apply_search();
            }
            _ => {
                self.search.handle_event(&Event::Key(key));
                if self.search.value() != self.hosts.query() {
                    self.apply_search();
                }
            }
        }
    }

    fn apply_search(&mut self) {
        self.hosts.search(self.search.value());
        self.reset_selection();
    }

    fn reset_selection(&mut self) {
        let selected = if self.hosts.is_empty() { None } else { Some(0) };
        self.table_state.select(selected);
    }

    fn selected_host(&self) -> Option<&Host> {
        self.hosts.get(self.table_state.selected()?)
    }

    fn show_details(&mut self) {
        let Some(host) = self.selected_host().cloned() else {
            return;
        };

        let path = &self.config.config_path;
        match Parser::for_config(path).host_details_from_file(path, &host) {
            Ok(details) => self.view = View::Detail(details),
            Err(err) => log::debug!("cannot look up details of {}: {err}", host.alias),
        }
    }

    fn open_editor<B: Backend>(&self, terminal: &Rc<RefCell<Terminal<B>>>) -> Result<()>
    where
        B: std::io::Write,
    {
        let editor = std::env::var("EDITOR").unwrap_or_default();
        let Some(mut command) = editor_command(&editor, &self.config.config_path) else {
            return Ok(());
        };

        restore_terminal(terminal)?;

        match command.status() {
            Ok(status) if !status.success() => log::debug!("{editor} exited with {status}"),
            Ok(_) => {}
            Err(err) => log::debug!("cannot start {editor}: {err}"),
        }

        setup_terminal(terminal)?;
        terminal.borrow_mut().clear()?;

        Ok(())
    }

    fn next(&mut self) {
        if self.hosts.is_empty() {
            return;
        }

        let i = match self.table_state.selected() {
            Some(i) => {
                if i >= self.hosts.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    fn previous(&mut self) {
        if self.hosts.is_empty() {
            return;
        }

        let i = match self.table_state.selected() {
            Some(i) => {
                if i == 0 {
                    self.hosts.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.table_state.select(Some(i));
    }

    fn first(&mut self) {
        self.reset_selection();
    }

    fn last(&mut self) {
        let last = self.hosts.len().checked_sub(1);
        self.table_state.select(last);
    }
}

/// Builds the command that opens `config_path` in `editor`.
///
/// `editor` is split like a shell would, so `code --wait` works. Returns
/// `None` when no editor is configured.
fn editor_command(editor: &str, config_path: &Path) -> Option<Command> {
    let mut words = shlex::split(editor)?.into_iter();
    let program = words.next()?;

    let mut command = Command::new(program);
    command.args(words).arg(config_path);
    Some(command)
}

fn setup_terminal<B: Backend>(terminal: &Rc<RefCell<Terminal<B>>>) -> Result<()>
where
    B: std::io::Write,
{
    let mut terminal = terminal.borrow_mut();

    enable_raw_mode()?;
    execute!(terminal.backend_mut(), Hide, EnterAlternateScreen)?;

    Ok(())
}

fn restore_terminal<B: Backend>(terminal: &Rc<RefCell<Terminal<B>>>) -> Result<()>
where
    B: std::io::Write,
{
    let mut terminal = terminal.borrow_mut();

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), Show, LeaveAlternateScreen)?;

    Ok(())
}

fn ui(f: &mut Frame, app: &mut App) {
    let rects = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(5),
        Constraint::Length(3),
    ])
    .split(f.area());

    render_searchbar(f, app, rects[0]);

    render_table(f, app, rects[1]);

    render_footer(f, app, rects[2]);

    if let View::Detail(details) = &app.view {
        render_details(f, &app.theme, details, rects[1]);
    } else if app.filtering {
        f.set_cursor_position((
            rects[0].x + u16::try_from(app.search.cursor()).unwrap_or_default() + 4,
            rects[0].y + 1,
        ));
    }
}

fn bordered<'a>(theme: &Theme) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::new().fg(theme.accent))
        .border_type(BorderType::Rounded)
}

fn render_searchbar(f: &mut Frame, app: &mut App, area: Rect) {
    let style = if app.filtering {
        Style::new().fg(app.theme.text)
    } else {
        Style::new().fg(app.theme.subtext)
    };

    let searchbar = Paragraph::new(Line::from(app.search.value()))
        .style(style)
        .block(bordered(&app.theme).padding(Padding::horizontal(3)));
    f.render_widget(searchbar, area);
}

fn render_table(f: &mut Frame, app: &mut App, area: Rect) {
    let header_style = Style::default()
        .fg(app.theme.accent)
        .add_modifier(Modifier::BOLD);
    let selected_style = Style::default()
        .fg(app.theme.accent)
        .add_modifier(Modifier::REVERSED);

    let header = ["Host", "HostName"]
        .iter()
        .copied()
        .map(Cell::from)
        .collect::<Row>()
        .style(header_style)
        .height(1);

    let dimmed = matches!(app.view, View::Detail(_));
    let (title_color, subtitle_color) = if dimmed {
        (app.theme.muted, app.theme.muted)
    } else {
        (app.theme.text, app.theme.subtext)
    };

    let rows = app.hosts.iter().map(|host| {
        Row::new([
            Cell::from(host.alias.as_str()).style(Style::new().fg(title_color)),
            Cell::from(host.hostname.as_str()).style(Style::new().fg(subtitle_color)),
        ])
    });

    let bar = " █ ";
    let t = Table::new(
        rows,
        [
            // + 1 is for padding.
            Constraint::Length(app.table_longest_item_lens.0 + 1),
            Constraint::Min(app.table_longest_item_lens.1 + 1),
        ],
    )
    .header(header)
    .row_highlight_style(selected_style)
    .highlight_symbol(bar)
    .highlight_spacing(HighlightSpacing::Always)
    .block(bordered(&app.theme));

    f.render_stateful_widget(t, area, &mut app.table_state);
}

fn render_footer(f: &mut Frame, app: &mut App, area: Rect) {
    let info_text = match app.view {
        View::Detail(_) => DETAIL_INFO_TEXT,
        View::List if app.filtering => FILTER_INFO_TEXT,
        View::List => LIST_INFO_TEXT,
    };

    let info_footer = Paragraph::new(Line::from(info_text))
        .style(Style::new().fg(app.theme.subtext))
        .centered()
        .block(bordered(&app.theme));
    f.render_widget(info_footer, area);
}

fn render_details(f: &mut Frame, theme: &Theme, details: &HostDetails, area: Rect) {
    let lines = detail_lines(details);

    // Two for the borders, two for the vertical padding.
    let height = u16::try_from(lines.len() + 4).unwrap_or(u16::MAX);
    let popup = centered_rect(POPUP_WIDTH, height, area);

    let popup_block = bordered(theme)
        .title(Line::from(details.alias.as_str()).bold())
        .padding(Padding::new(2, 2, 1, 1));

    let text = Text::from(lines.into_iter().map(Line::from).collect::<Vec<_>>());
    let paragraph = Paragraph::new(text)
        .style(Style::new().fg(theme.text).bg(theme.surface))
        .block(popup_block);

    f.render_widget(Clear, popup);
    f.render_widget(paragraph, popup);
}

/// A `width` x `height` rectangle centered in `area`, shrunk to fit.
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);

    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

/// One `key    value` line per attribute, keys padded to the widest one.
fn detail_lines(details: &HostDetails) -> Vec<String> {
    let rows = details.rows();
    let key_width = rows.iter().map(|(key, _)| key.width()).max().unwrap_or(0);

    rows.iter()
        .map(|(key, value)| {
            let padding = " ".repeat(key_width - key.width());
            format!("{key}{padding}    {value}")
        })
        .collect()
}

fn constraint_len_calculator<'a>(items: impl Iterator<Item = &'a Host> + Clone) -> (u16, u16) {
    let alias_len = items
        .clone()
        .map(|d| d.alias.as_str())
        .map(UnicodeWidthStr::width)
        .max()
        .unwrap_or(0);
    let hostname_len = items
        .map(|d| d.hostname.as_str())
        .map(UnicodeWidthStr::width)
        .max()
        .unwrap_or(0);

    (
        u16::try_from(alias_len).unwrap_or_default(),
        u16::try_from(hostname_len).unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use std::fs::File;
    use std::io::Write;
    use tempdir::TempDir;

    const CONFIG: &str = "Host *
  User default

Host db
  HostName 10.0.0.5
  User postgres

Host web
  HostName web.example.com
  Port 2222
  IdentityFile ~/.ssh/web

Host web2
  HostName web2.example.com
";

    fn hosts() -> Vec<Host> {
        vec![
            Host::new("db", "10.0.0.5"),
            Host::new("web", "web.example.com"),
            Host::new("web2", "web2.example.com"),
        ]
    }

    fn app_with_config(config_path: PathBuf) -> App {
        App::new(
            hosts(),
            AppConfig {
                config_path,
                search_filter: None,
            },
            Theme::default(),
        )
    }

    fn app() -> App {
        app_with_config(PathBuf::from("/non/existent/config"))
    }

    fn write_config(temp_dir: &TempDir) -> PathBuf {
        let path = temp_dir.path().join("config");
        let mut file = File::create(&path).unwrap();
        write!(file, "{CONFIG}").unwrap();
        path
    }

    fn press(app: &mut App, code: KeyCode) -> Action {
        app.on_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            assert_eq!(press(app, KeyCode::Char(c)), Action::None);
        }
    }

    fn screen(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 24)).unwrap();
        terminal.draw(|f| ui(f, app)).unwrap();

        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(usize::from(buffer.area.width))
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_enter_selects_highlighted_host() {
        let mut app = app();

        assert_eq!(press(&mut app, KeyCode::Down), Action::None);
        assert_eq!(
            press(&mut app, KeyCode::Enter),
            Action::Done(Selection::Host("web".to_string()))
        );
    }

    #[test]
    fn test_navigation_wraps_around() {
        let mut app = app();

        press(&mut app, KeyCode::Char('k'));
        assert_eq!(app.selected_host().unwrap().alias, "web2");

        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.selected_host().unwrap().alias, "db");

        press(&mut app, KeyCode::End);
        assert_eq!(app.selected_host().unwrap().alias, "web2");

        press(&mut app, KeyCode::Home);
        assert_eq!(app.selected_host().unwrap().alias, "db");
    }

    #[test]
    fn test_quit_keys_cancel() {
        assert_eq!(press(&mut app(), KeyCode::Esc), Action::Done(Selection::Cancelled));
        assert_eq!(press(&mut app(), KeyCode::Char('q')), Action::Done(Selection::Cancelled));
        assert_eq!(
            app().on_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Action::Done(Selection::Cancelled)
        );
    }

    #[test]
    fn test_edit_key_requests_editor() {
        let mut app = app();

        assert_eq!(press(&mut app, KeyCode::Char('e')), Action::OpenEditor);
        assert!(matches!(app.view, View::List));
    }

    #[test]
    fn test_filter_then_select() {
        let mut app = app();

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "web2");
        assert_eq!(app.hosts.len(), 1);

        // Typed keys are filter text, not commands.
        assert!(app.filtering);
        assert!(matches!(app.view, View::List));

        press(&mut app, KeyCode::Enter);
        assert!(!app.filtering);
        assert_eq!(
            press(&mut app, KeyCode::Enter),
            Action::Done(Selection::Host("web2".to_string()))
        );
    }

    #[test]
    fn test_filter_escape_clears() {
        let mut app = app();

        press(&mut app, KeyCode::Char('/'));
        type_text(&mut app, "zzz");
        assert!(app.hosts.is_empty());
        assert_eq!(press(&mut app, KeyCode::Enter), Action::None);
        assert_eq!(press(&mut app, KeyCode::Enter), Action::None);

        press(&mut app, KeyCode::Char('/'));
        press(&mut app, KeyCode::Esc);
        assert!(!app.filtering);
        assert_eq!(app.search.value(), "");
        assert_eq!(app.hosts.len(), 3);
        assert_eq!(app.selected_host().unwrap().alias, "db");
    }

    #[test]
    fn test_initial_search_filter() {
        let app = App::new(
            hosts(),
            AppConfig {
                config_path: PathBuf::from("/non/existent/config"),
                search_filter: Some("db".to_string()),
            },
            Theme::default(),
        );

        assert_eq!(app.hosts.len(), 1);
        assert_eq!(app.selected_host().unwrap().alias, "db");
    }

    #[test]
    fn test_view_details_and_back() {
        let temp_dir = TempDir::new("ssm").unwrap();
        let mut app = app_with_config(write_config(&temp_dir));

        press(&mut app, KeyCode::Down);
        assert_eq!(press(&mut app, KeyCode::Char('v')), Action::None);

        let View::Detail(details) = &app.view else {
            panic!("expected the detail view");
        };
        assert_eq!(details.alias, "web");
        assert_eq!(details.attributes.len(), 3);
        assert_eq!(details.attributes["Port"], "2222");

        // Navigation is inert while the popup is open.
        assert_eq!(press(&mut app, KeyCode::Enter), Action::None);

        assert_eq!(press(&mut app, KeyCode::Esc), Action::None);
        assert!(matches!(app.view, View::List));
        assert_eq!(app.selected_host().unwrap().alias, "web");
    }

    #[test]
    fn test_quit_from_details() {
        let temp_dir = TempDir::new("ssm").unwrap();
        let mut app = app_with_config(write_config(&temp_dir));

        press(&mut app, KeyCode::Char('v'));
        assert!(matches!(app.view, View::Detail(_)));
        assert_eq!(press(&mut app, KeyCode::Char('q')), Action::Done(Selection::Cancelled));
    }

    #[test]
    fn test_failed_lookup_stays_in_list() {
        let mut app = app();

        assert_eq!(press(&mut app, KeyCode::Char('v')), Action::None);
        assert!(matches!(app.view, View::List));
    }

    #[test]
    fn test_detail_lines_are_aligned() {
        let mut details = HostDetails::new(&Host::new("web", "web.example.com"));
        details
            .attributes
            .insert("IdentityFile".to_string(), "~/.ssh/web".to_string());
        details
            .attributes
            .insert("Port".to_string(), "2222".to_string());

        assert_eq!(
            detail_lines(&details),
            vec![
                "HostName        web.example.com",
                "IdentityFile    ~/.ssh/web",
                "Port            2222",
            ]
        );
    }

    #[test]
    fn test_editor_command() {
        let path = Path::new("/home/me/.ssh/config");

        assert!(editor_command("", path).is_none());
        assert!(editor_command("   ", path).is_none());

        let command = editor_command("code --wait", path).unwrap();
        assert_eq!(command.get_program(), "code");
        assert_eq!(
            command.get_args().collect::<Vec<_>>(),
            vec!["--wait", "/home/me/.ssh/config"]
        );
    }

    #[test]
    fn test_centered_rect_fits_area() {
        let area = Rect::new(0, 3, 40, 10);

        assert_eq!(centered_rect(60, 6, area), Rect::new(0, 5, 40, 6));
        assert_eq!(centered_rect(20, 20, area), Rect::new(10, 3, 20, 10));
    }

    #[test]
    fn test_renders_list_and_popup() {
        let temp_dir = TempDir::new("ssm").unwrap();
        let mut app = app_with_config(write_config(&temp_dir));

        let list = screen(&mut app);
        assert!(list.contains("db"));
        assert!(list.contains("web.example.com"));
        assert!(list.contains("(v) view details"));

        press(&mut app, KeyCode::Char('v'));
        let popup = screen(&mut app);
        assert!(popup.contains("User        postgres"));
        assert!(popup.contains("(esc) go back"));
    }
}
