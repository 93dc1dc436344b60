use std::{collections::BTreeMap, sync::Arc};

use chrono::Local;
use crossterm::event::{Event, KeyCode, KeyModifiers};
use drugprice::{
    auth::UserSession,
    catalog::{ColumnPreset, ColumnSet, DrugRecord, Field},
    config::{Config, TriggerMode},
    export::{
        ExportAssembler, batch_at, batch_count,
        format::{display_value, format_count, format_number, range_label},
    },
    gateway::{Gateway, PriceStats},
    query::{Logic, SearchConfiguration, SortDirection, parse_condition},
    search::{Phase, SearchCoordinator, SearchSession, SessionEvent},
    selection::{SelectionMode, SelectionSet},
    suggest::{Suggester, Suggestion},
};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Cell, Paragraph, Row, Table, TableState, Wrap},
};
use throbber_widgets_tui::{Throbber, ThrobberState};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, warn};
use unicode_width::UnicodeWidthStr;

use crate::{
    env::{EnvTx, Message, Notice, NoticeKind},
    widgets::{help, input::Input, theme::Theme},
};

const MAX_COLUMN_WIDTH: usize = 32;
const DISTINCT_FIELDS: [Field; 3] = [Field::DosageForm, Field::DrugGroup, Field::Concentration];
const DISTINCT_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prompt {
    Term,
    Include,
    Exclude,
}

impl Prompt {
    fn title(self, trigger: TriggerMode) -> &'static str {
        match (self, trigger) {
            (Prompt::Term, TriggerMode::Manual) => "Tìm kiếm (⏎ để tìm)",
            (Prompt::Term, TriggerMode::Automatic) => "Tìm kiếm (tự động)",
            (Prompt::Include, _) => "Điều kiện lọc: TRƯỜNG TOÁN_TỬ GIÁ_TRỊ",
            (Prompt::Exclude, _) => "Điều kiện loại trừ: TRƯỜNG TOÁN_TỬ GIÁ_TRỊ",
        }
    }
}

struct SuggestionView {
    drug_name: String,
    result: Result<Suggestion, String>,
}

/// The catalog browser: search box, conditions, paged table, selection and
/// export controls.
pub struct Browser {
    session: SearchSession,
    gateway: Arc<dyn Gateway>,
    assembler: Arc<ExportAssembler>,
    suggester: Option<Suggester>,
    tx: Arc<EnvTx>,
    user: Option<UserSession>,
    selection: SelectionSet,
    preset: ColumnPreset,
    columns: ColumnSet,
    column_cursor: usize,
    table_state: TableState,
    prompt: Option<Prompt>,
    input: Input,
    notice: Option<Notice>,
    overview: Option<u64>,
    stats: Option<PriceStats>,
    stats_seq: u64,
    stats_loading: bool,
    distinct: BTreeMap<Field, Vec<String>>,
    suggestion: Option<SuggestionView>,
    batch_index: u64,
    exporting: bool,
    throbber: ThrobberState,
    should_quit: bool,
}

impl Browser {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        config: &Config,
        tx: Arc<EnvTx>,
        user: Option<UserSession>,
    ) -> (Self, UnboundedReceiver<SessionEvent>) {
        let coordinator = SearchCoordinator::new(
            config.trigger,
            std::time::Duration::from_millis(config.debounce_ms),
            config.page_size(),
        );
        let (session, events) = SearchSession::new(gateway.clone(), coordinator);
        let suggester = Suggester::from_config(&config.ai)
            .inspect_err(|err| debug!(error = %err, "AI suggestions disabled"))
            .ok();
        let browser = Self {
            session,
            assembler: Arc::new(ExportAssembler::new(gateway.clone(), &config.export_dir)),
            gateway,
            suggester,
            tx,
            user,
            selection: SelectionSet::new(config.selection_limit),
            preset: ColumnPreset::Essential,
            columns: ColumnSet::from_preset(ColumnPreset::Essential),
            column_cursor: 0,
            table_state: TableState::default(),
            prompt: None,
            input: Input::default(),
            notice: None,
            overview: None,
            stats: None,
            stats_seq: 0,
            stats_loading: false,
            distinct: BTreeMap::new(),
            suggestion: None,
            batch_index: 0,
            exporting: false,
            throbber: ThrobberState::default(),
            should_quit: false,
        };
        (browser, events)
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Loads the first page, the catalog size and the filter value lists.
    pub fn start(&mut self) {
        self.session.update(|c| c.start());

        let gateway = self.gateway.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = gateway.fetch_total_count().await.map_err(|err| err.to_string());
            tx.send(Message::Overview(result));
        });

        for field in DISTINCT_FIELDS {
            let gateway = self.gateway.clone();
            let tx = self.tx.clone();
            tokio::spawn(async move {
                let values = gateway.fetch_distinct_values(field, DISTINCT_LIMIT).await;
                tx.send(Message::Distinct { field, values });
            });
        }
    }

    fn coordinator(&self) -> &SearchCoordinator {
        self.session.coordinator()
    }

    fn is_loading(&self) -> bool {
        self.coordinator().phase() == Phase::Requesting || self.stats_loading || self.exporting
    }

    pub fn tick(&mut self) {
        if self.is_loading() {
            self.throbber.calc_next();
        }
    }

    pub fn handle_session_event(&mut self, event: SessionEvent) {
        if self.session.handle(event) {
            let rows = self.coordinator().result().rows.len();
            match self.table_state.selected() {
                _ if rows == 0 => self.table_state.select(None),
                Some(selected) if selected >= rows => self.table_state.select(Some(rows - 1)),
                None => self.table_state.select(Some(0)),
                Some(_) => {}
            }
            if let Some(error) = &self.coordinator().result().error {
                self.notice = Some(Notice::new(NoticeKind::Error, error.clone()));
            }
        }
    }

    pub fn handle_message(&mut self, message: Message) {
        match message {
            Message::Overview(Ok(total)) => self.overview = Some(total),
            Message::Overview(Err(err)) => {
                warn!(error = %err, "Could not read catalog size");
            }
            Message::Stats { request_id, result } => {
                if request_id != self.stats_seq {
                    return;
                }
                self.stats_loading = false;
                match result {
                    Ok(stats) => self.stats = Some(stats),
                    Err(err) => self.notice = Some(Notice::new(NoticeKind::Error, err)),
                }
            }
            Message::Distinct { field, values } => {
                self.distinct.insert(field, values);
            }
            Message::Exported(result) => {
                self.exporting = false;
                self.notice = Some(match result {
                    Ok(artifact) => Notice::new(
                        NoticeKind::Success,
                        format!("Đã xuất {}", artifact.summary()),
                    ),
                    Err(notice) => notice,
                });
            }
            Message::Suggested { drug_name, result } => {
                self.suggestion = Some(SuggestionView { drug_name, result });
            }
        }
    }

    pub fn handle_event(&mut self, event: &Event) {
        if self.prompt.is_some() {
            self.handle_prompt_event(event);
            return;
        }
        let Some(key) = event.as_key_press_event() else {
            return;
        };
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }
        self.notice = None;
        let select_mode = self.selection.mode() == SelectionMode::Select;
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('/') => self.open_prompt(Prompt::Term),
            KeyCode::Char('f') => self.open_prompt(Prompt::Include),
            KeyCode::Char('F') => self.open_prompt(Prompt::Exclude),
            KeyCode::Char('d') => self.session.update(|c| {
                let last = c.draft().include.len().checked_sub(1)?;
                c.remove_include(last)
            }),
            KeyCode::Char('D') => self.session.update(|c| {
                let last = c.draft().exclude.len().checked_sub(1)?;
                c.remove_exclude(last)
            }),
            KeyCode::Char('o') => self.session.update(|c| {
                let logic = match c.draft().include_logic {
                    Logic::And => Logic::Or,
                    Logic::Or => Logic::And,
                };
                c.set_logic(logic)
            }),
            KeyCode::Enter => self.session.update(|c| c.submit()),
            KeyCode::Char('c') => {
                self.stats = None;
                self.session.update(|c| c.clear());
            }
            KeyCode::Char('r') => self.session.update(|c| c.refresh()),
            KeyCode::Char('n') | KeyCode::Right | KeyCode::PageDown => {
                self.session.update(|c| c.next_page())
            }
            KeyCode::Char('p') | KeyCode::Left | KeyCode::PageUp => {
                self.session.update(|c| c.previous_page())
            }
            KeyCode::Char('+') => self.session.update(|c| {
                let size = c.page().size().next();
                c.set_page_size(size)
            }),
            KeyCode::Char('-') => self.session.update(|c| {
                let size = c.page().size().previous();
                c.set_page_size(size)
            }),
            KeyCode::Char('h') => self.column_cursor = self.column_cursor.saturating_sub(1),
            KeyCode::Char('l') => {
                let last = self.columns.fields().len().saturating_sub(1);
                self.column_cursor = (self.column_cursor + 1).min(last);
            }
            KeyCode::Char('s') => {
                if let Some(field) = self.columns.fields().get(self.column_cursor).copied() {
                    self.session.update(|c| c.toggle_sort(field));
                }
            }
            KeyCode::Char('t') => {
                self.preset = self.preset.next();
                self.columns = ColumnSet::from_preset(self.preset);
                self.column_cursor = self.column_cursor.min(self.columns.fields().len() - 1);
                self.notice = Some(Notice::new(NoticeKind::Info, self.preset.title()));
            }
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1),
            KeyCode::Char('v') => {
                let mode = self.selection.toggle_mode();
                debug!(?mode, "Selection mode");
            }
            KeyCode::Char(' ') if select_mode => self.toggle_highlighted(),
            KeyCode::Char('a') if select_mode => {
                let ids = self.coordinator().result().ids();
                if let Err(err) = self.selection.select_all_on_page(&ids) {
                    self.notice = Some(Notice::new(NoticeKind::Warning, err.to_string()));
                }
            }
            KeyCode::Char('A') if select_mode => {
                let ids = self.coordinator().result().ids();
                self.selection.deselect_all_on_page(&ids);
            }
            KeyCode::Char('C') if select_mode => self.selection.clear(),
            KeyCode::Char('x') => self.export_selection(),
            KeyCode::Char('[') => self.batch_index = self.batch_index.saturating_sub(1),
            KeyCode::Char(']') => {
                let count = batch_count(self.coordinator().result().total_count);
                self.batch_index = (self.batch_index + 1).min(count.saturating_sub(1));
            }
            KeyCode::Char('b') => self.export_batch(),
            KeyCode::Char('g') => self.load_stats(),
            KeyCode::Char('i') => self.suggest_for_highlighted(),
            _ => {}
        }
    }

    fn open_prompt(&mut self, prompt: Prompt) {
        match prompt {
            Prompt::Term => {
                let term = self.coordinator().draft().term.clone();
                self.input.set_value(&term);
            }
            Prompt::Include | Prompt::Exclude => self.input.clear(),
        }
        self.input.set_active(true);
        self.prompt = Some(prompt);
    }

    fn close_prompt(&mut self) {
        self.input.set_active(false);
        self.prompt = None;
    }

    fn handle_prompt_event(&mut self, event: &Event) {
        let Some(prompt) = self.prompt else {
            return;
        };
        let Some(key) = event.as_key_press_event() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.close_prompt(),
            KeyCode::Enter => self.commit_prompt(prompt),
            _ => {
                if self.input.handle_event(event) && prompt == Prompt::Term {
                    let term = self.input.value().to_string();
                    self.session.update(|c| c.set_term(term));
                }
            }
        }
    }

    fn commit_prompt(&mut self, prompt: Prompt) {
        let value = self.input.value().to_string();
        match prompt {
            Prompt::Term => {
                self.session.update(|c| {
                    c.set_term(value);
                    c.submit()
                });
                self.close_prompt();
            }
            Prompt::Include | Prompt::Exclude => match parse_condition(&value) {
                Ok(condition) => {
                    self.session.update(|c| match prompt {
                        Prompt::Include => c.add_include(condition),
                        _ => c.add_exclude(condition),
                    });
                    self.notice = None;
                    self.close_prompt();
                }
                Err(err) => {
                    self.notice = Some(Notice::new(NoticeKind::Error, err.to_string()));
                }
            },
        }
    }

    fn move_cursor(&mut self, delta: isize) {
        let rows = self.coordinator().result().rows.len();
        if rows == 0 {
            return;
        }
        let current = self.table_state.selected().unwrap_or(0);
        let next = current.saturating_add_signed(delta).min(rows - 1);
        self.table_state.select(Some(next));
    }

    fn highlighted(&self) -> Option<&DrugRecord> {
        let index = self.table_state.selected()?;
        self.coordinator().result().rows.get(index)
    }

    fn toggle_highlighted(&mut self) {
        let Some(id) = self.highlighted().map(|row| row.id) else {
            return;
        };
        if let Err(err) = self.selection.toggle(id) {
            self.notice = Some(Notice::new(NoticeKind::Warning, err.to_string()));
        }
    }

    fn export_selection(&mut self) {
        if self.exporting {
            return;
        }
        self.exporting = true;
        let ids = self.selection.ids();
        let sort = self.coordinator().sort();
        let assembler = self.assembler.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = assembler
                .export_selection(&ids, sort, Local::now().naive_local())
                .await;
            tx.send(Message::Exported(result.map_err(export_notice)));
        });
    }

    fn export_batch(&mut self) {
        if self.exporting {
            return;
        }
        self.exporting = true;
        let descriptor = self.coordinator().descriptor();
        let total = self.coordinator().result().total_count;
        let index = self.batch_index;
        let assembler = self.assembler.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = assembler.export_batch(&descriptor, index, total).await;
            tx.send(Message::Exported(result.map_err(export_notice)));
        });
    }

    fn load_stats(&mut self) {
        self.stats_seq += 1;
        self.stats_loading = true;
        let request_id = self.stats_seq;
        let descriptor = self.coordinator().descriptor();
        let gateway = self.gateway.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = gateway
                .fetch_aggregate_stats(&descriptor)
                .await
                .map_err(|err| err.to_string());
            tx.send(Message::Stats { request_id, result });
        });
    }

    fn suggest_for_highlighted(&mut self) {
        let Some(suggester) = self.suggester.clone() else {
            self.notice = Some(Notice::new(
                NoticeKind::Warning,
                "Chưa cấu hình khoá AI (ai.api_key hoặc DRUGPRICE_AI_KEY)",
            ));
            return;
        };
        let Some(row) = self.highlighted() else {
            return;
        };
        let drug_name = row.drug_name.clone();
        let ingredient = row.active_ingredient.clone();
        let concentration = row.concentration.clone();
        self.suggestion = None;
        self.notice = Some(Notice::new(
            NoticeKind::Info,
            format!("Đang gợi ý thuốc liên quan tới {drug_name}..."),
        ));
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = suggester
                .suggest(&ingredient, &concentration)
                .await
                .map_err(|err| err.to_string());
            tx.send(Message::Suggested { drug_name, result });
        });
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let theme = Theme::detect();
        let area = frame.area();
        frame.render_widget(
            Block::default().style(Style::default().bg(theme.panel_bg()).fg(theme.text())),
            area,
        );

        let footer_entries = match (self.prompt, self.selection.mode()) {
            (Some(_), _) => help::PROMPT,
            (None, SelectionMode::Select) => help::SELECT,
            (None, SelectionMode::View) => help::BROWSE,
        };
        let info_height = if self.stats.is_some() || self.suggestion.is_some() {
            6
        } else {
            0
        };
        let [title, search, conditions, table, info, status, notice, footer] =
            Layout::vertical([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Fill(1),
                Constraint::Length(info_height),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(help::height(footer_entries, area, &theme)),
            ])
            .areas(area);

        self.render_title(frame, title, &theme);
        self.render_search(frame, search, &theme);
        self.render_conditions(frame, conditions, &theme);
        self.render_table(frame, table, &theme);
        if info_height > 0 {
            self.render_info(frame, info, &theme);
        }
        self.render_status(frame, status, &theme);
        self.render_notice(frame, notice, &theme);
        help::render(footer_entries, frame, footer, &theme);
    }

    fn render_title(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let mut spans = vec![Span::styled(
            "Tra cứu giá thuốc",
            Style::default().fg(theme.accent()).bold(),
        )];
        if let Some(total) = self.overview {
            spans.push(Span::styled(
                format!(" · CSDL {} bản ghi", format_count(total)),
                Style::default().fg(theme.text_muted()),
            ));
        }
        if let Some(user) = &self.user {
            spans.push(Span::styled(
                format!(" · {}", user.display_name),
                Style::default().fg(theme.text_muted()),
            ));
        }
        frame.render_widget(Line::from(spans), area);
    }

    fn render_search(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let trigger = self.coordinator().trigger();
        if let Some(prompt) = self.prompt {
            self.input.render(frame, area, prompt.title(trigger), theme);
            return;
        }
        let draft = &self.coordinator().draft().term;
        let (text, style) = if draft.is_empty() {
            (
                "Nhấn / để tìm theo tên thuốc, hoạt chất, cơ sở sản xuất, TBMT, nhóm",
                Style::default().fg(theme.text_muted()),
            )
        } else {
            (draft.as_str(), Style::default().fg(theme.text()))
        };
        let block = Block::bordered()
            .title(Prompt::Term.title(trigger))
            .border_style(Style::default().fg(theme.border()));
        frame.render_widget(Paragraph::new(text).style(style).block(block), area);
    }

    fn render_conditions(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        if let Some(hint) = self.prompt.and_then(|_| self.value_hint()) {
            frame.render_widget(
                Line::styled(hint, Style::default().fg(theme.text_muted())),
                area,
            );
            return;
        }
        let draft = self.coordinator().draft();
        frame.render_widget(conditions_line(draft, theme), area);
    }

    /// Known values for the field typed so far in a condition prompt.
    fn value_hint(&self) -> Option<String> {
        let first = self.input.value().split_whitespace().next()?;
        let field = first.parse::<Field>().ok()?;
        let values = self.distinct.get(&field)?;
        if values.is_empty() {
            return None;
        }
        Some(format!("Giá trị {}: {}", field.label(), values.join(" · ")))
    }

    fn render_table(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let select_mode = self.selection.mode() == SelectionMode::Select;
        let sort = self.coordinator().sort();
        let fields = self.columns.fields().to_vec();
        let result = self.session.coordinator().result();

        let mut header_cells = Vec::with_capacity(fields.len() + 1);
        if select_mode {
            let ids = result.ids();
            let mark = if self.selection.is_fully_selected(&ids) {
                "[x]"
            } else if self.selection.is_partially_selected(&ids) {
                "[-]"
            } else {
                "[ ]"
            };
            header_cells.push(Cell::from(mark));
        }
        for (col, field) in fields.iter().enumerate() {
            let arrow = match (sort.field == *field, sort.direction) {
                (true, SortDirection::Ascending) => " ▲",
                (true, SortDirection::Descending) => " ▼",
                (false, _) => "",
            };
            let mut style = Style::default().bold();
            if col == self.column_cursor {
                style = style.fg(theme.accent()).add_modifier(Modifier::UNDERLINED);
            }
            header_cells.push(Cell::from(format!("{}{arrow}", field.label())).style(style));
        }
        let header = Row::new(header_cells).style(Style::default().bg(theme.header_bg()));

        let cells: Vec<Vec<String>> = result
            .rows
            .iter()
            .map(|row| fields.iter().map(|f| display_value(row, *f)).collect())
            .collect();
        let mut widths: Vec<Constraint> = Vec::with_capacity(fields.len() + 1);
        if select_mode {
            widths.push(Constraint::Length(3));
        }
        widths.extend(fields.iter().enumerate().map(|(col, field)| {
            let values = cells.iter().map(|row| row[col].width()).max().unwrap_or(0);
            let label = field.label().width() + 2;
            Constraint::Length(values.max(label).min(MAX_COLUMN_WIDTH) as u16)
        }));

        let rows: Vec<Row> = result
            .rows
            .iter()
            .zip(cells)
            .map(|(record, values)| {
                let marked = self.selection.contains(record.id);
                let mut row_cells: Vec<Cell> = Vec::with_capacity(values.len() + 1);
                if select_mode {
                    row_cells.push(Cell::from(if marked { "[x]" } else { "[ ]" }));
                }
                row_cells.extend(values.into_iter().map(Cell::from));
                let style = if marked {
                    Style::default().fg(theme.marked())
                } else {
                    Style::default()
                };
                Row::new(row_cells).style(style)
            })
            .collect();

        let border = if result.error.is_some() {
            theme.error()
        } else {
            theme.border()
        };
        let block = Block::bordered()
            .title(format!("Kết quả · {}", self.preset.title()))
            .border_style(Style::default().fg(border));
        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .highlight_symbol("▶ ")
            .row_highlight_style(
                Style::default()
                    .bg(theme.cursor_bg())
                    .fg(theme.cursor_fg()),
            );
        frame.render_stateful_widget(table, area, &mut self.table_state);
    }

    fn render_info(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let [left, right] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                .areas(area);
        if let Some(stats) = &self.stats {
            let block = Block::bordered()
                .title("Thống kê đơn giá")
                .border_style(Style::default().fg(theme.border()));
            frame.render_widget(
                Paragraph::new(stats_lines(stats)).block(block),
                if self.suggestion.is_some() { left } else { area },
            );
        }
        if let Some(view) = &self.suggestion {
            let block = Block::bordered()
                .title(format!("Gợi ý AI · {}", view.drug_name))
                .border_style(Style::default().fg(theme.border()));
            let text = match &view.result {
                Ok(suggestion) => vec![
                    Line::from(suggestion.related_drugs.join(" · ")).bold(),
                    Line::from(suggestion.reasoning.as_str()),
                ],
                Err(err) => vec![Line::styled(err.as_str(), Style::default().fg(theme.error()))],
            };
            frame.render_widget(
                Paragraph::new(text).wrap(Wrap { trim: true }).block(block),
                if self.stats.is_some() { right } else { area },
            );
        }
    }

    fn render_status(&mut self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let coordinator = self.session.coordinator();
        let result = coordinator.result();
        let page = coordinator.page();
        let status = coordinator.status();

        let mut parts = vec![
            range_label(result.row_range(), result.total_count),
            format!("trang {}/{}", page.page(), result.total_pages().max(1)),
            format!("{} dòng/trang", page.size().get()),
        ];
        if self.selection.mode() == SelectionMode::Select {
            let stats = self.selection.stats(&result.rows, result.total_count);
            parts.push(format!(
                "đã chọn {} ({} trên trang, {:.1}%)",
                format_count(stats.selected as u64),
                stats.selected_on_page,
                stats.percentage
            ));
        }
        if let Some(batch) = batch_at(self.batch_index, result.total_count) {
            parts.push(format!("lô {}", batch.label()));
        }
        if status.typing {
            parts.push("đang nhập".to_string());
        }
        if status.pending {
            parts.push("chờ".to_string());
        }

        let text = Line::styled(parts.join(" · "), Style::default().fg(theme.text_muted()));
        if self.is_loading() {
            let [spinner, rest] =
                Layout::horizontal([Constraint::Length(16), Constraint::Fill(1)]).areas(area);
            let label = if self.exporting {
                "Đang xuất"
            } else if status.searching {
                "Đang tìm"
            } else {
                "Đang tải"
            };
            let throbber = Throbber::default()
                .label(label)
                .style(Style::default().fg(theme.warning()));
            frame.render_stateful_widget(throbber, spinner, &mut self.throbber);
            frame.render_widget(text, rest);
        } else {
            frame.render_widget(text, area);
        }
    }

    fn render_notice(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        let Some(notice) = &self.notice else {
            return;
        };
        let color = match notice.kind {
            NoticeKind::Info => theme.text(),
            NoticeKind::Success => theme.success(),
            NoticeKind::Warning => theme.warning(),
            NoticeKind::Error => theme.error(),
        };
        frame.render_widget(
            Line::styled(notice.text.as_str(), Style::default().fg(color)),
            area,
        );
    }
}

fn export_notice(err: drugprice::export::ExportError) -> Notice {
    let kind = if err.is_notice() {
        NoticeKind::Warning
    } else {
        NoticeKind::Error
    };
    Notice::new(kind, err.to_string())
}

fn conditions_line<'a>(config: &SearchConfiguration, theme: &Theme) -> Line<'a> {
    if !config.has_conditions() {
        return Line::styled(
            "Không có điều kiện lọc (f: thêm, F: loại trừ)",
            Style::default().fg(theme.text_muted()),
        );
    }
    let logic = match config.include_logic {
        Logic::And => "AND",
        Logic::Or => "OR",
    };
    let mut spans = Vec::new();
    if !config.include.is_empty() {
        let joined: Vec<String> = config.include.iter().map(ToString::to_string).collect();
        spans.push(Span::styled(
            format!("Bao gồm ({logic}): "),
            Style::default().fg(theme.accent()),
        ));
        spans.push(Span::raw(joined.join(" · ")));
    }
    if !config.exclude.is_empty() {
        let joined: Vec<String> = config.exclude.iter().map(ToString::to_string).collect();
        if !spans.is_empty() {
            spans.push(Span::raw("  "));
        }
        spans.push(Span::styled("Loại trừ: ", Style::default().fg(theme.error())));
        spans.push(Span::raw(joined.join(" · ")));
    }
    Line::from(spans)
}

fn stats_lines(stats: &PriceStats) -> Vec<Line<'static>> {
    let price = |value: Option<f64>| value.map(format_number).unwrap_or_else(|| "-".to_string());
    let mut lines = vec![
        Line::from(format!(
            "Thấp nhất {} · Cao nhất {}",
            price(stats.min),
            price(stats.max)
        )),
        Line::from(format!(
            "Trung bình {} · Trung vị {}",
            price(stats.average),
            price(stats.median)
        )),
    ];
    if let Some(record) = &stats.record_at_max {
        lines.push(Line::from(format!(
            "Cao nhất: {} ({})",
            record.drug_name, record.notice_id
        )));
    }
    let basis = if stats.capped {
        format!(
            "Ước tính trên {} / {} bản ghi",
            format_count(stats.sample_size as u64),
            format_count(stats.total_count)
        )
    } else {
        format!("{} bản ghi", format_count(stats.total_count))
    };
    lines.push(Line::from(basis));
    lines
}

#[cfg(test)]
mod tests {
    use drugprice::query::{Operator, SearchCondition};

    use super::*;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn conditions_line_lists_both_kinds() {
        let config = SearchConfiguration {
            include: vec![SearchCondition::new(
                Field::UnitPrice,
                Operator::GreaterThan,
                "1000",
            )],
            include_logic: Logic::Or,
            exclude: vec![SearchCondition::new(
                Field::DosageForm,
                Operator::Contains,
                "tiêm",
            )],
            ..SearchConfiguration::default()
        };
        let line = text(&conditions_line(&config, &Theme::dark()));
        assert!(line.starts_with("Bao gồm (OR): unitPrice > \"1000\""));
        assert!(line.contains("Loại trừ: dosageForm ~ \"tiêm\""));
    }

    #[test]
    fn stats_lines_flag_estimates() {
        let stats = PriceStats {
            min: Some(10.0),
            max: Some(20.0),
            total_count: 5_000,
            sample_size: 1_000,
            capped: true,
            ..PriceStats::default()
        };
        let lines = stats_lines(&stats);
        assert_eq!(text(&lines[0]), "Thấp nhất 10 · Cao nhất 20");
        assert_eq!(text(&lines[2]), "Ước tính trên 1.000 / 5.000 bản ghi");
    }
}
