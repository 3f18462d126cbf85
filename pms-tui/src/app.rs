//! Application state for the pms TUI.
//!
//! Wraps the shared [`AppState`] store. Sync work runs on the tokio runtime and
//! reports back over a channel, so the draw loop never blocks on the network.

use std::path::Path;
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent};
use pms::{SessionFile, SyncController};
use pms_core::codec;
use pms_core::derive::{FilterId, SortField};
use pms_core::models::{EntityId, MediaFile, ProjectDraft};
use pms_core::state::{DraftEdit, SectionId};
use pms_core::view::{self, Screen, SectionBody, ViewModel};
use pms_core::{Action, AppState, Effect, ErrorKind, Notice, SyncOutcome};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// What the bottom input line is collecting, if anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    Search,
    NewProject,
    Rename,
    Tags,
    MediaPath,
}

impl Prompt {
    pub fn label(&self) -> &'static str {
        match self {
            Prompt::Search => "search",
            Prompt::NewProject => "new project",
            Prompt::Rename => "name",
            Prompt::Tags => "tech stack",
            Prompt::MediaPath => "media file",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Input {
    pub prompt: Prompt,
    pub buffer: String,
}

pub struct App {
    pub state: AppState,
    pub selected: usize,
    pub input: Option<Input>,
    pub should_quit: bool,
    controller: Arc<SyncController>,
    session: SessionFile,
    runtime: Handle,
    outcomes_tx: mpsc::UnboundedSender<SyncOutcome>,
    outcomes_rx: mpsc::UnboundedReceiver<SyncOutcome>,
}

impl App {
    pub fn new(controller: Arc<SyncController>, session: SessionFile, runtime: Handle) -> Self {
        let saved = session.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Could not read saved session");
            None
        });
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        Self {
            state: AppState::new(saved),
            selected: 0,
            input: None,
            should_quit: false,
            controller,
            session,
            runtime,
            outcomes_tx,
            outcomes_rx,
        }
    }

    /// Kick off the initial load.
    pub fn start(&mut self) {
        let effects = self.state.start();
        self.run_effects(effects);
    }

    pub fn view(&self) -> ViewModel {
        view::render(&self.state)
    }

    pub fn dispatch(&mut self, action: Action) {
        let effects = self.state.dispatch(action);
        self.run_effects(effects);
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Sync { token, request } => {
                    let controller = Arc::clone(&self.controller);
                    let tx = self.outcomes_tx.clone();
                    self.runtime.spawn(async move {
                        let outcome = controller.perform(token, request).await;
                        // Receiver only goes away on shutdown.
                        let _ = tx.send(outcome);
                    });
                }
                Effect::PersistSession(user_id) => {
                    if let Err(e) = self.session.store(user_id) {
                        tracing::warn!(error = %e, "Could not persist session");
                    }
                }
            }
        }
    }

    /// Apply every finished request. Returns true when anything arrived.
    pub fn drain_outcomes(&mut self) -> bool {
        let mut changed = false;
        while let Ok(outcome) = self.outcomes_rx.try_recv() {
            let effects = self.state.apply_sync(outcome);
            self.run_effects(effects);
            changed = true;
        }
        if changed {
            self.clamp_selection();
        }
        changed
    }

    /// Ids of the rows the current screen lists, in display order.
    pub fn visible_ids(&self) -> Vec<EntityId> {
        match self.view().screen {
            Screen::Loading => Vec::new(),
            Screen::Login(choices) => choices.iter().map(|c| c.id).collect(),
            Screen::Section(section) => match section.body {
                SectionBody::Dashboard(dashboard) => {
                    dashboard.projects.iter().map(|p| p.id).collect()
                }
                SectionBody::Ideas(rows) => rows.iter().map(|p| p.id).collect(),
                SectionBody::Team(members) => members.iter().map(|m| m.id).collect(),
                SectionBody::MyTasks(tasks) => tasks.iter().map(|t| t.id).collect(),
            },
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.visible_ids().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.visible_ids().len() {
            self.selected += 1;
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.input.is_some() {
            self.handle_input_key(key);
            return;
        }
        if self.state.current_user.is_none() {
            self.handle_login_key(key);
        } else if self.state.current_entity.is_some() {
            self.handle_detail_key(key);
        } else {
            self.handle_section_key(key);
        }
    }

    fn handle_login_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Up | KeyCode::Char('k') => self.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => self.select_next(),
            KeyCode::Char('R') => self.dispatch(Action::Refresh),
            KeyCode::Esc => self.dispatch(Action::DismissNotice),
            KeyCode::Enter => {
                if let Some(id) = self.visible_ids().get(self.selected).copied() {
                    self.dispatch(Action::Login(id));
                    self.selected = 0;
                }
            }
            _ => {}
        }
    }

    fn handle_section_key(&mut self, key: KeyEvent) {
        let action = match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return;
            }
            KeyCode::Up | KeyCode::Char('k') => return self.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => return self.select_next(),
            KeyCode::Char(c @ '1'..='4') => {
                let section = match c {
                    '1' => SectionId::Dashboard,
                    '2' => SectionId::Ideas,
                    '3' => SectionId::Team,
                    _ => SectionId::MyTasks,
                };
                self.selected = 0;
                Action::ShowSection(section)
            }
            KeyCode::Char('a') => Action::SetFilter(FilterId::All),
            KeyCode::Char('p') => Action::SetFilter(FilterId::Planning),
            KeyCode::Char('i') => Action::SetFilter(FilterId::InProgress),
            KeyCode::Char('d') => Action::SetFilter(FilterId::Delivered),
            KeyCode::Char('u') => Action::SetFilter(FilterId::Upcoming),
            KeyCode::Char('n') => Action::SortBy(SortField::Name),
            KeyCode::Char('t') => Action::SortBy(SortField::Status),
            KeyCode::Char('r') => Action::SortBy(SortField::Priority),
            KeyCode::Char('s') => Action::SortBy(SortField::StartDate),
            KeyCode::Char('l') => Action::SortBy(SortField::Deadline),
            KeyCode::Char('g') => Action::SortBy(SortField::Progress),
            KeyCode::Char('v') => Action::ToggleViewMode,
            KeyCode::Char('R') => Action::Refresh,
            KeyCode::Char('L') => Action::Logout,
            KeyCode::Esc => Action::DismissNotice,
            KeyCode::Char('/') => {
                self.open_prompt(Prompt::Search, self.state.search_query.clone());
                return;
            }
            KeyCode::Char('c') if self.state.can_manage() => {
                self.open_prompt(Prompt::NewProject, String::new());
                return;
            }
            KeyCode::Enter => {
                let opens_project = matches!(
                    self.state.active_section,
                    SectionId::Dashboard | SectionId::Ideas
                );
                match self.visible_ids().get(self.selected).copied() {
                    Some(id) if opens_project => Action::OpenProject(id),
                    _ => return,
                }
            }
            _ => return,
        };
        self.dispatch(action);
        self.clamp_selection();
    }

    fn handle_detail_key(&mut self, key: KeyEvent) {
        if self.state.pending_delete.is_some() {
            match key.code {
                KeyCode::Char('y') => self.dispatch(Action::ConfirmDelete),
                KeyCode::Char('n') | KeyCode::Esc => self.dispatch(Action::CancelDelete),
                _ => {}
            }
            return;
        }
        if self.state.edit_mode {
            self.handle_edit_key(key);
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Esc => self.dispatch(Action::CloseProject),
            KeyCode::Char('e') => self.dispatch(Action::BeginEdit),
            KeyCode::Char('x') => self.dispatch(Action::RequestDelete),
            KeyCode::Char('R') => self.dispatch(Action::Refresh),
            _ => {}
        }
    }

    fn handle_edit_key(&mut self, key: KeyEvent) {
        let progress = self
            .state
            .edit_draft
            .as_ref()
            .map(|d| d.progress)
            .unwrap_or_default();
        let edit = match key.code {
            KeyCode::Esc => return self.dispatch(Action::CancelEdit),
            KeyCode::Enter => return self.dispatch(Action::SaveEdit),
            KeyCode::Char('s') => DraftEdit::CycleStatus,
            KeyCode::Char('p') => DraftEdit::CyclePriority,
            KeyCode::Char('+') => DraftEdit::Progress((progress + 10).min(100)),
            KeyCode::Char('-') => DraftEdit::Progress((progress - 10).max(0)),
            KeyCode::Char('M') => DraftEdit::ClearMedia,
            KeyCode::Char('n') => {
                let name = self
                    .state
                    .edit_draft
                    .as_ref()
                    .map(|d| d.name.clone())
                    .unwrap_or_default();
                return self.open_prompt(Prompt::Rename, name);
            }
            KeyCode::Char('t') => {
                let tags = self
                    .state
                    .edit_draft
                    .as_ref()
                    .map(|d| codec::join_tags(&d.tech_stack))
                    .unwrap_or_default();
                return self.open_prompt(Prompt::Tags, tags);
            }
            KeyCode::Char('m') => return self.open_prompt(Prompt::MediaPath, String::new()),
            _ => return,
        };
        self.dispatch(Action::EditDraft(edit));
    }

    fn open_prompt(&mut self, prompt: Prompt, buffer: String) {
        self.input = Some(Input { prompt, buffer });
    }

    fn handle_input_key(&mut self, key: KeyEvent) {
        let Some(input) = self.input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.input = None,
            KeyCode::Backspace => {
                input.buffer.pop();
            }
            KeyCode::Char(c) => input.buffer.push(c),
            KeyCode::Enter => {
                if let Some(input) = self.input.take() {
                    self.submit_input(input);
                }
            }
            _ => {}
        }
    }

    fn submit_input(&mut self, input: Input) {
        let Input { prompt, buffer } = input;
        let action = match prompt {
            Prompt::Search => {
                self.selected = 0;
                Action::SetSearch(buffer)
            }
            Prompt::NewProject => Action::CreateProject {
                draft: ProjectDraft::new(buffer.trim()),
                media: None,
            },
            Prompt::Rename => Action::EditDraft(DraftEdit::Name(buffer)),
            Prompt::Tags => Action::EditDraft(DraftEdit::TechStack(codec::split_tags(&buffer))),
            Prompt::MediaPath => match read_media(Path::new(buffer.trim())) {
                Ok(file) => Action::EditDraft(DraftEdit::StageMedia(file)),
                Err(e) => {
                    tracing::warn!(path = %buffer, error = %e, "Could not read media file");
                    self.state.notice = Some(Notice::new(
                        ErrorKind::Upload,
                        format!("Could not read {}: {e}", buffer.trim()),
                    ));
                    return;
                }
            },
        };
        self.dispatch(action);
    }
}

/// MIME type by file extension. Unknown types are sent as-is and left for the
/// server to reject.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "ogg" => "video/ogg",
        _ => "application/octet-stream",
    }
}

fn read_media(path: &Path) -> std::io::Result<MediaFile> {
    let bytes = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(MediaFile::new(file_name, mime_for_path(path), bytes))
}
