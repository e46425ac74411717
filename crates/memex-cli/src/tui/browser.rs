//! Journal browser view.
//!
//! Provides a full-screen terminal UI with:
//! - Left sidebar with the document index
//! - Main pane with the current document, links highlighted
//! - Modals for AI requests, image prompts, API key, import and export
//! - Key bindings: j/k select, Enter open, Tab cycle links, b back, a ask, i image, q quit
//!
//! Background task outcomes arrive through [`BrowserView::tick`], which runs
//! on the same thread as rendering and key handling.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use memex_core::hypertext::{self, Span as TextSpan};
use memex_core::service::openai::OpenAiClient;
use memex_core::transfer;
use memex_core::{
    BackOutcome, DocId, DocumentStore, DocumentSummary, LinkInsertion, Navigator, OpenOutcome,
    Orchestrator, TaskFailure, TaskKind, TaskObserver, TaskSuccess,
};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

const STATUS_TTL: Duration = Duration::from_secs(4);

// ---------------------------------------------------------------------------
// Input state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum InputMode {
    #[default]
    Normal,
    /// ASK modal: snippet + prompt prefix.
    Ask,
    /// IMAGE modal: prompt.
    Image,
    /// Masked API key entry.
    ApiKey,
    /// Path of a text file to import.
    Import,
    /// Destination path for exporting the current document.
    Export,
    /// Destination path for the current image.
    SaveImage,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum AskField {
    #[default]
    Snippet,
    Prefix,
}

/// Single-line editable text with a character cursor.
#[derive(Debug, Clone, Default)]
struct TextField {
    value: String,
    cursor: usize,
}

impl TextField {
    fn with_value(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = char_len(&value);
        Self { value, cursor }
    }

    fn edit(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(char_len(&self.value)),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = char_len(&self.value),
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    let remove_idx = self.cursor - 1;
                    remove_char_at(&mut self.value, remove_idx);
                    self.cursor = remove_idx;
                }
            }
            KeyCode::Delete => remove_char_at(&mut self.value, self.cursor),
            KeyCode::Char(c) => {
                insert_char_at(&mut self.value, self.cursor, c);
                self.cursor += 1;
            }
            _ => {}
        }
    }

    fn display(&self, active: bool, masked: bool) -> String {
        let shown = if masked {
            "•".repeat(char_len(&self.value))
        } else {
            self.value.clone()
        };
        if active {
            with_cursor(&shown, self.cursor)
        } else {
            shown
        }
    }
}

#[derive(Debug, Clone, Default)]
struct AskModal {
    snippet: TextField,
    prefix: TextField,
    field: AskField,
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

fn byte_index_at_char(value: &str, char_idx: usize) -> usize {
    value
        .char_indices()
        .nth(char_idx)
        .map_or(value.len(), |(idx, _)| idx)
}

fn insert_char_at(value: &mut String, char_idx: usize, ch: char) {
    let idx = byte_index_at_char(value, char_idx);
    value.insert(idx, ch);
}

fn remove_char_at(value: &mut String, char_idx: usize) {
    if char_idx >= char_len(value) {
        return;
    }
    let start = byte_index_at_char(value, char_idx);
    let end = byte_index_at_char(value, char_idx + 1);
    value.replace_range(start..end, "");
}

fn with_cursor(value: &str, char_idx: usize) -> String {
    let mut out = String::new();
    let mut inserted = false;
    for (idx, ch) in value.chars().enumerate() {
        if idx == char_idx {
            out.push('█');
            inserted = true;
        }
        out.push(ch);
    }
    if !inserted {
        out.push('█');
    }
    out
}

// ---------------------------------------------------------------------------
// Task notices
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
struct StatusMessage {
    text: String,
    is_error: bool,
    at: Instant,
}

/// Collects task outcomes during one delivery pass.
#[derive(Debug, Default)]
struct Notices {
    messages: Vec<(String, bool)>,
    index_changed: bool,
}

impl TaskObserver for Notices {
    fn on_success(&mut self, success: TaskSuccess) {
        let text = match success {
            TaskSuccess::Document { new_id, link, .. } => match link {
                LinkInsertion::Inserted { .. } => {
                    format!("AI reply stored as document {new_id} and linked.")
                }
                LinkInsertion::Skipped(reason) => {
                    format!("AI reply stored as document {new_id}; link skipped: {reason}.")
                }
            },
            TaskSuccess::Image { attached: true, .. } => {
                "Image ready. v enlarge, s save.".to_string()
            }
            TaskSuccess::Image { attached: false, .. } => {
                "Image ready, but its document is no longer open.".to_string()
            }
        };
        self.messages.push((text, false));
    }

    fn on_failure(&mut self, failure: TaskFailure) {
        self.messages.push((failure.to_string(), true));
    }

    fn on_index_changed(&mut self) {
        self.index_changed = true;
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Main application state for the journal browser.
pub struct BrowserView<S> {
    nav: Navigator<S>,
    orch: Orchestrator,
    /// Receives API keys entered with `K`.
    client: Arc<OpenAiClient>,
    /// Document index shown in the sidebar.
    index: Vec<DocumentSummary>,
    /// Sidebar selection (row in `index`).
    table_state: TableState,
    /// Focused link, as an index among the link spans of the current view.
    link_focus: Option<usize>,
    /// Whether the image panel fills the main pane.
    image_enlarged: bool,
    input_mode: InputMode,
    ask_modal: AskModal,
    /// Shared single-line modal field (image prompt, key, paths).
    line_field: TextField,
    notices: Notices,
    status_msg: Option<StatusMessage>,
    /// Directory offered for saved images.
    home: PathBuf,
    should_quit: bool,
}

impl<S: DocumentStore> BrowserView<S> {
    /// Create a browser over `nav`, loading the index and opening the first
    /// document if there is one.
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be read.
    pub fn new(nav: Navigator<S>, orch: Orchestrator, client: Arc<OpenAiClient>) -> Result<Self> {
        let mut view = Self {
            nav,
            orch,
            client,
            index: Vec::new(),
            table_state: TableState::default(),
            link_focus: None,
            image_enlarged: false,
            input_mode: InputMode::Normal,
            ask_modal: AskModal::default(),
            line_field: TextField::default(),
            notices: Notices::default(),
            status_msg: None,
            home: dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")),
            should_quit: false,
        };
        view.reload()?;
        if let Some(first) = view.index.first().map(|doc| doc.id) {
            view.open(first);
        }
        Ok(view)
    }

    /// Re-read the document index, keeping the selection on the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn reload(&mut self) -> Result<()> {
        let selected_id = self.selected_id();
        self.index = self.nav.store().list_index()?;
        let row = selected_id
            .and_then(|id| self.row_of(id))
            .or_else(|| (!self.index.is_empty()).then_some(0));
        self.table_state.select(row);
        Ok(())
    }

    fn row_of(&self, id: DocId) -> Option<usize> {
        self.index.iter().position(|doc| doc.id == id)
    }

    fn selected_id(&self) -> Option<DocId> {
        self.table_state
            .selected()
            .and_then(|row| self.index.get(row))
            .map(|doc| doc.id)
    }

    fn select_next(&mut self) {
        if self.index.is_empty() {
            return;
        }
        let next = self
            .table_state
            .selected()
            .map_or(0, |row| (row + 1).min(self.index.len() - 1));
        self.table_state.select(Some(next));
    }

    fn select_prev(&mut self) {
        if self.index.is_empty() {
            return;
        }
        let prev = self
            .table_state
            .selected()
            .map_or(0, |row| row.saturating_sub(1));
        self.table_state.select(Some(prev));
    }

    /// Targets of the current document's links, in body order.
    fn link_targets(&self) -> Vec<DocId> {
        self.nav
            .view()
            .map(|view| view.spans.iter().filter_map(TextSpan::target).collect())
            .unwrap_or_default()
    }

    fn cycle_link(&mut self, forward: bool) {
        let count = self.link_targets().len();
        if count == 0 {
            self.link_focus = None;
            self.set_status("No links in this document.".to_string());
            return;
        }
        self.link_focus = Some(match (self.link_focus, forward) {
            (None, true) => 0,
            (None, false) => count - 1,
            (Some(idx), true) => (idx + 1) % count,
            (Some(idx), false) => (idx + count - 1) % count,
        });
    }

    fn open(&mut self, id: DocId) {
        match self.nav.open(id) {
            Ok(OpenOutcome::Opened) => {
                self.link_focus = None;
                self.image_enlarged = false;
                self.table_state.select(self.row_of(id));
            }
            Ok(OpenOutcome::Refreshed) => {
                self.table_state.select(self.row_of(id));
            }
            Err(err) => self.set_error(err.to_string()),
        }
    }

    fn go_back(&mut self) {
        if self.image_enlarged {
            self.image_enlarged = false;
            return;
        }
        match self.nav.back() {
            Ok(BackOutcome::Returned(id)) => {
                self.link_focus = None;
                self.table_state.select(self.row_of(id));
            }
            Ok(BackOutcome::NoHistory) => self.set_status("No history.".to_string()),
            Err(err) => self.set_error(err.to_string()),
        }
    }

    fn activate(&mut self) {
        let focused = self
            .link_focus
            .and_then(|idx| self.link_targets().get(idx).copied());
        if let Some(target) = focused.or_else(|| self.selected_id()) {
            self.open(target);
        }
    }

    /// Handle one key press.
    ///
    /// # Errors
    ///
    /// Returns an error only for store failures that leave the view
    /// unusable (index reload).
    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return Ok(());
        }

        match self.input_mode {
            InputMode::Normal => self.handle_normal_key(key)?,
            InputMode::Ask => self.handle_ask_key(key),
            InputMode::Image
            | InputMode::ApiKey
            | InputMode::Import
            | InputMode::Export
            | InputMode::SaveImage => self.handle_line_key(key)?,
        }
        Ok(())
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.select_next(),
            KeyCode::Char('k') | KeyCode::Up => self.select_prev(),
            KeyCode::Enter => self.activate(),
            KeyCode::Tab => self.cycle_link(true),
            KeyCode::BackTab => self.cycle_link(false),
            KeyCode::Esc => self.link_focus = None,
            KeyCode::Char('b') | KeyCode::Backspace => self.go_back(),
            KeyCode::Char('r') => {
                self.reload()?;
                if let Some(id) = self.nav.current_id() {
                    self.open(id);
                }
                self.set_status("Reloaded.".to_string());
            }
            KeyCode::Char('a') => self.open_ask_modal(),
            KeyCode::Char('i') => self.open_line_modal(InputMode::Image, String::new()),
            KeyCode::Char('v') => {
                if self.nav.image().is_some() {
                    self.image_enlarged = !self.image_enlarged;
                } else {
                    self.set_status("No image for this document yet.".to_string());
                }
            }
            KeyCode::Char('s') => match self.nav.image() {
                Some(image) => {
                    let default = self.home.join(image.default_file_name());
                    self.open_line_modal(InputMode::SaveImage, default.display().to_string());
                }
                None => self.set_status("No image to save.".to_string()),
            },
            KeyCode::Char('K') => self.open_line_modal(InputMode::ApiKey, String::new()),
            KeyCode::Char('I') => self.open_line_modal(InputMode::Import, String::new()),
            KeyCode::Char('E') => match self.nav.current_id() {
                Some(id) => self.open_line_modal(InputMode::Export, format!("doc_{id}.txt")),
                None => self.set_status("Open a document first.".to_string()),
            },
            _ => {}
        }
        Ok(())
    }

    fn open_ask_modal(&mut self) {
        if self.nav.current_id().is_none() {
            self.set_status("Open a document first.".to_string());
            return;
        }
        self.ask_modal = AskModal {
            snippet: TextField::default(),
            prefix: TextField::with_value(self.orch.settings().prompt_prefix.clone()),
            field: AskField::Snippet,
        };
        self.input_mode = InputMode::Ask;
    }

    fn open_line_modal(&mut self, mode: InputMode, initial: String) {
        self.line_field = TextField::with_value(initial);
        self.input_mode = mode;
    }

    fn handle_ask_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.input_mode = InputMode::Normal,
            KeyCode::Tab | KeyCode::BackTab => {
                self.ask_modal.field = match self.ask_modal.field {
                    AskField::Snippet => AskField::Prefix,
                    AskField::Prefix => AskField::Snippet,
                };
            }
            KeyCode::Enter => self.submit_ask(),
            _ => match self.ask_modal.field {
                AskField::Snippet => self.ask_modal.snippet.edit(key),
                AskField::Prefix => self.ask_modal.prefix.edit(key),
            },
        }
    }

    fn submit_ask(&mut self) {
        let snippet = self.ask_modal.snippet.value.clone();
        if snippet.trim().is_empty() {
            self.input_mode = InputMode::Normal;
            self.set_status("Select text first.".to_string());
            return;
        }

        let located = self.nav.view().map(|view| {
            (
                view.document.id,
                hypertext::locate(&view.document.body, &snippet).is_some(),
            )
        });
        let Some((context, found)) = located else {
            self.input_mode = InputMode::Normal;
            self.set_status("Open a document first.".to_string());
            return;
        };
        if !found {
            // Keep the modal open so the snippet can be corrected.
            self.set_error("Snippet not found outside existing links.".to_string());
            return;
        }

        let prompt = format!("{}{snippet}", self.ask_modal.prefix.value);
        let handle = self
            .orch
            .dispatch_with_prompt(TaskKind::AiQuery, &snippet, prompt, Some(context));
        self.input_mode = InputMode::Normal;
        self.set_status(format!("AI request {} sent.", handle.id));
    }

    fn handle_line_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Esc => self.input_mode = InputMode::Normal,
            KeyCode::Enter => {
                let mode = self.input_mode;
                let value = std::mem::take(&mut self.line_field.value);
                self.input_mode = InputMode::Normal;
                self.submit_line(mode, &value)?;
            }
            _ => self.line_field.edit(key),
        }
        Ok(())
    }

    fn submit_line(&mut self, mode: InputMode, value: &str) -> Result<()> {
        match mode {
            InputMode::Image => {
                let prompt = value.trim();
                if prompt.is_empty() {
                    self.set_status("Select text first.".to_string());
                    return Ok(());
                }
                let handle =
                    self.orch
                        .dispatch(TaskKind::ImageGeneration, prompt, self.nav.current_id());
                self.set_status(format!("Image request {} sent.", handle.id));
            }
            InputMode::ApiKey => {
                self.client.set_api_key(value);
                if self.client.has_api_key() {
                    self.set_status("API key loaded.".to_string());
                } else {
                    self.set_status("API key cleared.".to_string());
                }
            }
            InputMode::Import => self.import(Path::new(value.trim()))?,
            InputMode::Export => {
                let Some(id) = self.nav.current_id() else {
                    return Ok(());
                };
                let path = Path::new(value.trim());
                match transfer::export_file(self.nav.store(), id, path) {
                    Ok(()) => self.set_status(format!("Exported to {}.", path.display())),
                    Err(err) => self.set_error(err.to_string()),
                }
            }
            InputMode::SaveImage => {
                let path = Path::new(value.trim());
                let saved = self.nav.image().map(|image| image.save(path));
                match saved {
                    Some(Ok(())) => self.set_status(format!("Image saved to {}.", path.display())),
                    Some(Err(err)) => self.set_error(format!("could not save image: {err}")),
                    None => self.set_status("No image to save.".to_string()),
                }
            }
            InputMode::Normal | InputMode::Ask => {}
        }
        Ok(())
    }

    fn import(&mut self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Ok(());
        }
        match transfer::import_file(self.nav.store_mut(), path) {
            Ok(id) => {
                self.reload()?;
                self.open(id);
                self.set_status(format!("Imported as document {id}."));
            }
            Err(err) => self.set_error(err.to_string()),
        }
        Ok(())
    }

    pub fn set_status(&mut self, msg: String) {
        self.status_msg = Some(StatusMessage {
            text: msg,
            is_error: false,
            at: Instant::now(),
        });
    }

    fn set_error(&mut self, msg: String) {
        tracing::warn!(message = %msg, "browser error");
        self.status_msg = Some(StatusMessage {
            text: msg,
            is_error: true,
            at: Instant::now(),
        });
    }

    /// Deliver finished background tasks and surface their outcomes.
    pub fn tick(&mut self) {
        if self.orch.deliver(&mut self.nav, &mut self.notices) == 0 {
            return;
        }

        let notices = std::mem::take(&mut self.notices);
        if notices.index_changed {
            if let Err(err) = self.reload() {
                self.set_error(format!("could not reload index: {err:#}"));
            }
        }
        if self.nav.image().is_none() {
            self.image_enlarged = false;
        }
        for (text, is_error) in notices.messages {
            if is_error {
                self.set_error(text);
            } else {
                self.set_status(text);
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.orch.pending_count()
    }

    /// Returns true once the user asked to quit.
    pub const fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Render the browser into `area` within the given frame.
    pub fn render(&mut self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        render_into(frame, self, area);
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Body lines with links green and underlined; the focused link reversed.
fn body_lines(spans: &[TextSpan], focused_link: Option<usize>) -> Vec<Line<'static>> {
    let plain = Style::default();
    let link = Style::default()
        .fg(Color::Green)
        .add_modifier(Modifier::UNDERLINED);
    let focused = link.add_modifier(Modifier::REVERSED);

    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut link_idx = 0;

    for span in spans {
        let style = if span.is_link() {
            let style = if focused_link == Some(link_idx) {
                focused
            } else {
                link
            };
            link_idx += 1;
            style
        } else {
            plain
        };

        let mut pieces = span.text().split('\n').peekable();
        while let Some(piece) = pieces.next() {
            if !piece.is_empty() {
                current.push(Span::styled(piece.to_string(), style));
            }
            if pieces.peek().is_some() {
                lines.push(Line::from(std::mem::take(&mut current)));
            }
        }
    }
    lines.push(Line::from(current));
    lines
}

fn image_lines<S>(app: &BrowserView<S>) -> Vec<Line<'static>> {
    let Some(image) = app.nav_image() else {
        return Vec::new();
    };
    let dim = Style::default().fg(Color::DarkGray);
    let size = image
        .png_dimensions()
        .map_or_else(|| "PNG".to_string(), |(w, h)| format!("{w}x{h} PNG"));
    vec![
        Line::from(vec![
            Span::styled(size, Style::default().fg(Color::Cyan)),
            Span::styled(format!("  {} KB", image.bytes.len().div_ceil(1024)), dim),
        ]),
        Line::from(vec![Span::styled("Prompt: ", dim), Span::raw(image.prompt.clone())]),
        Line::from(vec![
            Span::styled("v", Style::default().fg(Color::Cyan)),
            Span::styled(" enlarge/collapse  ", dim),
            Span::styled("s", Style::default().fg(Color::Cyan)),
            Span::styled(" save", dim),
        ]),
    ]
}

impl<S> BrowserView<S> {
    fn nav_image(&self) -> Option<&memex_core::service::GeneratedImage> {
        self.nav.image()
    }
}

fn rounded_block(title: String, active: bool) -> Block<'static> {
    let color = if active { Color::Green } else { Color::DarkGray };
    Block::default()
        .borders(Borders::ALL)
        .border_set(border::ROUNDED)
        .border_style(Style::default().fg(color))
        .title(title)
        .title_style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
}

fn render_index(frame: &mut ratatui::Frame<'_>, app: &mut BrowserView<impl DocumentStore>, area: Rect) {
    let current = app.nav.current_id();
    let rows: Vec<Row<'static>> = app
        .index
        .iter()
        .map(|doc| {
            let title_style = if Some(doc.id) == current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            Row::new([
                Cell::from(Span::styled(
                    doc.id.to_string(),
                    Style::default().fg(Color::DarkGray),
                )),
                Cell::from(Span::styled(doc.title.clone(), title_style)),
                Cell::from(Span::styled(
                    doc.description.clone(),
                    Style::default().fg(Color::DarkGray),
                )),
            ])
        })
        .collect();

    let widths = [
        Constraint::Length(5),
        Constraint::Percentage(45),
        Constraint::Min(8),
    ];
    let table = Table::new(rows, widths)
        .header(
            Row::new(["ID", "Title", "Description"])
                .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        )
        .block(rounded_block(
            format!(" memex · {} documents ", app.index.len()),
            app.link_focus.is_none(),
        ))
        .row_highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol(" ");

    frame.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_document(frame: &mut ratatui::Frame<'_>, app: &BrowserView<impl DocumentStore>, area: Rect) {
    let Some(view) = app.nav.view() else {
        let empty = Paragraph::new(vec![
            Line::from("No document open."),
            Line::from(Span::styled(
                "Create one with `mx new` or import with I.",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .block(rounded_block(" document ".to_string(), false));
        frame.render_widget(empty, area);
        return;
    };

    let has_image = app.nav_image().is_some();
    if has_image && app.image_enlarged {
        let panel = Paragraph::new(image_lines(app))
            .wrap(Wrap { trim: false })
            .block(rounded_block(format!(" image · {} ", view.document.title), true));
        frame.render_widget(panel, area);
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(if has_image {
            [Constraint::Min(3), Constraint::Length(5)]
        } else {
            [Constraint::Min(3), Constraint::Length(0)]
        })
        .split(area);

    let title = format!(
        " {} · {}  (history {}) ",
        view.document.id,
        view.document.title,
        app.nav.history().len()
    );
    let body = Paragraph::new(body_lines(&view.spans, app.link_focus))
        .wrap(Wrap { trim: false })
        .block(rounded_block(title, app.link_focus.is_some()));
    frame.render_widget(body, chunks[0]);

    if has_image {
        let panel = Paragraph::new(image_lines(app))
            .block(rounded_block(" image ".to_string(), false));
        frame.render_widget(panel, chunks[1]);
    }
}

fn modal_area(area: Rect, height: u16) -> Rect {
    let modal_width = area.width.saturating_sub(8).min(80);
    let modal_height = height.min(area.height);
    let x = area.x + area.width.saturating_sub(modal_width) / 2;
    let y = area.y + area.height.saturating_sub(modal_height) / 2;
    Rect::new(x, y, modal_width, modal_height)
}

fn field_widget(label: &'static str, text: String, active: bool) -> Paragraph<'static> {
    let color = if active { Color::Green } else { Color::DarkGray };
    Paragraph::new(Line::from(text)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_set(border::ROUNDED)
            .border_style(Style::default().fg(color))
            .title(label),
    )
}

fn render_ask_modal(frame: &mut ratatui::Frame<'_>, app: &BrowserView<impl DocumentStore>, area: Rect) {
    let modal_area = modal_area(area, 10);
    frame.render_widget(Clear, modal_area);

    let block = rounded_block(" Ask AI ".to_string(), true);
    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
        ])
        .split(inner);

    let modal = &app.ask_modal;
    let snippet_active = modal.field == AskField::Snippet;
    frame.render_widget(
        field_widget(
            " Snippet (text from this document) ",
            modal.snippet.display(snippet_active, false),
            snippet_active,
        ),
        chunks[0],
    );
    frame.render_widget(
        field_widget(
            " Prompt prefix ",
            modal.prefix.display(!snippet_active, false),
            !snippet_active,
        ),
        chunks[1],
    );
    frame.render_widget(Paragraph::new(modal_hints(InputMode::Ask)), chunks[2]);
}

fn render_line_modal(frame: &mut ratatui::Frame<'_>, app: &BrowserView<impl DocumentStore>, area: Rect) {
    let (title, label, masked) = match app.input_mode {
        InputMode::Image => (" Generate Image ", " Prompt ", false),
        InputMode::ApiKey => (" Load API Key ", " Key ", true),
        InputMode::Import => (" Import Text File ", " Path ", false),
        InputMode::Export => (" Export Document ", " Path ", false),
        InputMode::SaveImage => (" Save Image ", " Path ", false),
        InputMode::Normal | InputMode::Ask => return,
    };

    let modal_area = modal_area(area, 6);
    frame.render_widget(Clear, modal_area);

    let block = rounded_block(title.to_string(), true);
    let inner = block.inner(modal_area);
    frame.render_widget(block, modal_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(1)])
        .split(inner);
    frame.render_widget(
        field_widget(label, app.line_field.display(true, masked), true),
        chunks[0],
    );
    frame.render_widget(Paragraph::new(modal_hints(app.input_mode)), chunks[1]);
}

fn modal_hints(mode: InputMode) -> Line<'static> {
    let key_style = Style::default().fg(Color::Cyan);
    let dim_style = Style::default().fg(Color::DarkGray);
    let mut spans = Vec::new();
    if mode == InputMode::Ask {
        spans.push(Span::styled("TAB", key_style));
        spans.push(Span::styled(" switch field  ", dim_style));
    }
    spans.push(Span::styled("ENTER", key_style));
    spans.push(Span::styled(" submit  ", dim_style));
    spans.push(Span::styled("ESC", key_style));
    spans.push(Span::styled(" cancel", dim_style));
    Line::from(spans)
}

fn render_into(frame: &mut ratatui::Frame<'_>, app: &mut BrowserView<impl DocumentStore>, area: Rect) {
    // Layout: content + status bar.
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(area);

    let content = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(34), Constraint::Percentage(66)])
        .split(chunks[0]);

    render_index(frame, app, content[0]);
    render_document(frame, app, content[1]);

    let status_paragraph = Paragraph::new(build_status_bar(app)).alignment(Alignment::Left);
    frame.render_widget(status_paragraph, chunks[1]);

    match app.input_mode {
        InputMode::Normal => {}
        InputMode::Ask => render_ask_modal(frame, app, area),
        _ => render_line_modal(frame, app, area),
    }
}

/// Build the status bar: a recent message, or key hints and pending tasks.
fn build_status_bar<S>(app: &BrowserView<S>) -> Line<'static> {
    if let Some(ref msg) = app.status_msg {
        if msg.at.elapsed() < STATUS_TTL {
            let color = if msg.is_error { Color::Red } else { Color::Cyan };
            return Line::from(vec![Span::styled(
                msg.text.clone(),
                Style::default().fg(color),
            )]);
        }
    }

    let key_style = Style::default().fg(Color::Cyan);
    let dim_style = Style::default().fg(Color::DarkGray);
    let mut spans: Vec<Span<'static>> = Vec::new();

    let pending = app.orch.pending_count();
    if pending > 0 {
        spans.push(Span::styled(
            format!("⏳ {pending} pending  "),
            Style::default().fg(Color::Yellow),
        ));
    }

    let hints = [
        ("j/k", "select"),
        ("⏎", "open"),
        ("tab", "links"),
        ("b", "back"),
        ("a", "ask"),
        ("i", "image"),
        ("K", "key"),
        ("I/E", "import/export"),
        ("q", "quit"),
    ];
    for (key, label) in hints {
        spans.push(Span::styled(key, key_style));
        spans.push(Span::styled(format!(" {label}  "), dim_style));
    }
    Line::from(spans)
}
