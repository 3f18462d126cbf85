//! UI rendering with Ratatui.
//!
//! Everything drawn comes from [`pms_core::view::render`]. Black and white,
//! with the card accent only used as a faint marker in grid mode.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Gauge, List, ListItem, Paragraph, Row, Table, Wrap},
    Frame,
};

use pms_core::derive::SortIndicator;
use pms_core::state::ViewMode;
use pms_core::view::{
    CardAccent, DashboardView, DetailView, LoginChoice, MediaKind, MemberRow, ProjectRow, Screen,
    SectionBody, SectionView, TaskRow, ViewModel,
};

use crate::app::App;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn selected_style(selected: bool) -> Style {
    if selected {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    }
}

fn accent_color(accent: CardAccent) -> Color {
    match accent {
        CardAccent::Rose => Color::LightRed,
        CardAccent::Mint => Color::LightGreen,
        CardAccent::Sky => Color::LightBlue,
        CardAccent::Sand => Color::LightYellow,
    }
}

/// Render the application UI.
pub fn render(frame: &mut Frame, app: &App) {
    let view = app.view();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Main content
            Constraint::Length(1), // Status bar
        ])
        .split(frame.area());

    match &view.screen {
        Screen::Loading => {
            let loading = Paragraph::new("loading…")
                .block(Block::default().title(" pms ").borders(Borders::ALL));
            frame.render_widget(loading, chunks[0]);
        }
        Screen::Login(choices) => render_login(frame, choices, app.selected, chunks[0]),
        Screen::Section(section) => render_section(frame, section, app.selected, chunks[0]),
    }

    render_status(frame, app, &view, chunks[1]);
}

fn render_login(frame: &mut Frame, choices: &[LoginChoice], selected: usize, area: Rect) {
    let items: Vec<ListItem> = choices
        .iter()
        .enumerate()
        .map(|(i, choice)| {
            let line = Line::from(vec![
                Span::raw(format!("  {}", choice.name)),
                Span::styled(format!("  {} · {}", choice.role, choice.title), dim()),
            ]);
            ListItem::new(line).style(selected_style(i == selected))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" who are you? ")
            .borders(Borders::ALL),
    );
    frame.render_widget(list, area);
}

fn render_section(frame: &mut Frame, section: &SectionView, selected: usize, area: Rect) {
    let title = format!(
        " {} · {} ({}) ",
        section.title, section.user_name, section.user_role
    );
    let block = Block::default().title(title).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match &section.body {
        SectionBody::Dashboard(dashboard) => {
            render_dashboard(frame, dashboard, section.view_mode, selected, inner)
        }
        SectionBody::Ideas(rows) => render_projects(frame, rows, section.view_mode, selected, inner),
        SectionBody::Team(members) => render_team(frame, members, selected, inner),
        SectionBody::MyTasks(tasks) => render_tasks(frame, tasks, selected, inner),
    }

    if let Some(detail) = &section.detail {
        render_detail(frame, detail, area);
    }
}

fn render_dashboard(
    frame: &mut Frame,
    dashboard: &DashboardView,
    mode: ViewMode,
    selected: usize,
    area: Rect,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Stats
            Constraint::Length(1), // Filters + search
            Constraint::Min(0),
        ])
        .split(area);

    let stats = &dashboard.stats;
    let stats_line = Line::from(vec![
        Span::styled(stats.total.to_string(), bold()),
        Span::raw(" total  "),
        Span::styled(stats.in_development.to_string(), bold()),
        Span::raw(" in development  "),
        Span::styled(stats.delivered.to_string(), bold()),
        Span::raw(" delivered  "),
        Span::styled(stats.upcoming.to_string(), bold()),
        Span::raw(" upcoming"),
    ]);
    frame.render_widget(Paragraph::new(stats_line), chunks[0]);

    let mut spans: Vec<Span> = dashboard
        .filters
        .iter()
        .flat_map(|chip| {
            let style = if chip.active { bold() } else { dim() };
            [Span::styled(format!("[{}]", chip.label), style), Span::raw(" ")]
        })
        .collect();
    if !dashboard.search.is_empty() {
        spans.push(Span::raw(format!(" /{}", dashboard.search)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), chunks[1]);

    match mode {
        ViewMode::Grid => render_cards(frame, &dashboard.projects, selected, chunks[2]),
        ViewMode::List => {
            let header = Row::new(dashboard.columns.iter().map(|column| {
                let marker = match column.indicator {
                    SortIndicator::Neutral => "",
                    SortIndicator::Ascending => " ↑",
                    SortIndicator::Descending => " ↓",
                };
                Cell::from(format!("{}{marker}", column.label))
            }))
            .style(bold());
            render_table(frame, header, &dashboard.projects, selected, chunks[2]);
        }
    }
}

fn render_projects(
    frame: &mut Frame,
    rows: &[ProjectRow],
    mode: ViewMode,
    selected: usize,
    area: Rect,
) {
    match mode {
        ViewMode::Grid => render_cards(frame, rows, selected, area),
        ViewMode::List => {
            let header = Row::new(["Name", "Status", "Priority", "Start", "Deadline", "Progress"])
                .style(bold());
            render_table(frame, header, rows, selected, area);
        }
    }
}

fn render_cards(frame: &mut Frame, rows: &[ProjectRow], selected: usize, area: Rect) {
    if rows.is_empty() {
        frame.render_widget(Paragraph::new("no projects").style(dim()), area);
        return;
    }
    let items: Vec<ListItem> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut heading = vec![
                Span::styled("▌", Style::default().fg(accent_color(row.accent))),
                Span::styled(format!(" {}", row.name), bold()),
                Span::styled(format!("  {} · {}", row.status, row.priority), dim()),
            ];
            if let Some(media) = &row.media {
                heading.push(Span::styled(
                    match media {
                        MediaKind::Image(_) => "  [img]",
                        MediaKind::Video(_) => "  [video]",
                    },
                    dim(),
                ));
            }
            let filled = usize::from(row.display_progress) / 5;
            let bar = format!(
                "   {}{} {}%  {}",
                "█".repeat(filled),
                "░".repeat(20 - filled),
                row.progress,
                row.deadline.as_deref().unwrap_or("no deadline"),
            );
            ListItem::new(vec![Line::from(heading), Line::from(bar)])
                .style(selected_style(i == selected))
        })
        .collect();
    frame.render_widget(List::new(items), area);
}

fn render_table(
    frame: &mut Frame,
    header: Row<'static>,
    rows: &[ProjectRow],
    selected: usize,
    area: Rect,
) {
    let body: Vec<Row> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            Row::new(vec![
                row.name.clone(),
                row.status.clone(),
                row.priority.clone(),
                row.start_date.clone().unwrap_or_default(),
                row.deadline.clone().unwrap_or_default(),
                format!("{}%", row.progress),
            ])
            .style(selected_style(i == selected))
        })
        .collect();
    let table = Table::new(
        body,
        [
            Constraint::Percentage(30),
            Constraint::Percentage(16),
            Constraint::Percentage(12),
            Constraint::Percentage(14),
            Constraint::Percentage(14),
            Constraint::Percentage(14),
        ],
    )
    .header(header);
    frame.render_widget(table, area);
}

fn render_team(frame: &mut Frame, members: &[MemberRow], selected: usize, area: Rect) {
    let items: Vec<ListItem> = members
        .iter()
        .enumerate()
        .map(|(i, member)| {
            let you = if member.is_current { " (you)" } else { "" };
            let line = Line::from(vec![
                Span::styled(format!("  {}{you}", member.name), bold()),
                Span::styled(format!("  {} · {}", member.role, member.title), dim()),
                Span::raw(format!("  {} tasks", member.assigned_tasks)),
            ]);
            ListItem::new(line).style(selected_style(i == selected))
        })
        .collect();
    frame.render_widget(List::new(items), area);
}

fn task_line(task: &TaskRow) -> Line<'static> {
    let mut spans = vec![
        Span::raw(format!("  {}", task.title)),
        Span::styled(format!("  {} · {}", task.status, task.priority), dim()),
    ];
    if let Some(project) = &task.project_name {
        spans.push(Span::raw(format!("  {project}")));
    }
    if let Some(due) = &task.due_date {
        spans.push(Span::styled(format!("  due {due}"), dim()));
    }
    Line::from(spans)
}

fn render_tasks(frame: &mut Frame, tasks: &[TaskRow], selected: usize, area: Rect) {
    if tasks.is_empty() {
        frame.render_widget(Paragraph::new("nothing assigned").style(dim()), area);
        return;
    }
    let items: Vec<ListItem> = tasks
        .iter()
        .enumerate()
        .map(|(i, task)| ListItem::new(task_line(task)).style(selected_style(i == selected)))
        .collect();
    frame.render_widget(List::new(items), area);
}

/// Centered popup covering most of `area`.
fn popup_area(area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(10),
            Constraint::Percentage(80),
            Constraint::Percentage(10),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(10),
            Constraint::Percentage(80),
            Constraint::Percentage(10),
        ])
        .split(vertical[1])[1]
}

fn render_detail(frame: &mut Frame, detail: &DetailView, area: Rect) {
    let area = popup_area(area);
    frame.render_widget(Clear, area);

    let title = if detail.editing.is_some() {
        format!(" editing {} ", detail.project.name)
    } else {
        format!(" {} ", detail.project.name)
    };
    let block = Block::default().title(title).borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Progress
            Constraint::Min(0),
        ])
        .split(inner);

    let (progress, display) = match &detail.editing {
        Some(draft) => (draft.progress, draft.progress.clamp(0, 100) as u16),
        None => (detail.project.progress, detail.project.display_progress),
    };
    let gauge = Gauge::default()
        .gauge_style(Style::default().add_modifier(Modifier::REVERSED))
        .percent(display)
        .label(format!("{progress}%"));
    frame.render_widget(gauge, chunks[0]);

    let mut lines = Vec::new();
    match &detail.editing {
        Some(draft) => {
            lines.push(Line::from(vec![Span::styled("name      ", dim()), Span::raw(draft.name.clone())]));
            lines.push(Line::from(vec![
                Span::styled("status    ", dim()),
                Span::raw(draft.status.as_str().to_string()),
            ]));
            lines.push(Line::from(vec![
                Span::styled("priority  ", dim()),
                Span::raw(draft.priority.as_str().to_string()),
            ]));
            lines.push(Line::from(vec![
                Span::styled("stack     ", dim()),
                Span::raw(draft.tech_stack.join(", ")),
            ]));
            let media = detail
                .staged_media
                .clone()
                .map(|name| format!("{name} (staged)"))
                .or_else(|| draft.media_url.clone())
                .unwrap_or_else(|| "none".to_string());
            lines.push(Line::from(vec![Span::styled("media     ", dim()), Span::raw(media)]));
        }
        None => {
            let project = &detail.project;
            lines.push(Line::from(vec![
                Span::styled(project.status.clone(), bold()),
                Span::styled(format!("  {} priority", project.priority), dim()),
            ]));
            if !project.description.is_empty() {
                lines.push(Line::from(project.description.clone()));
            }
            lines.push(Line::from(vec![
                Span::styled("dates     ", dim()),
                Span::raw(format!(
                    "{} → {}",
                    project.start_date.as_deref().unwrap_or("?"),
                    project.deadline.as_deref().unwrap_or("?"),
                )),
            ]));
            if let Some(duration) = &detail.estimated_duration {
                lines.push(Line::from(vec![Span::styled("estimate  ", dim()), Span::raw(duration.clone())]));
            }
            if !project.tech_stack.is_empty() {
                lines.push(Line::from(vec![
                    Span::styled("stack     ", dim()),
                    Span::raw(project.tech_stack.join(", ")),
                ]));
            }
            if !detail.required_team.is_empty() {
                let team = detail
                    .required_team
                    .iter()
                    .map(|req| format!("{} × {}", req.count, req.role))
                    .collect::<Vec<_>>()
                    .join(", ");
                lines.push(Line::from(vec![Span::styled("team      ", dim()), Span::raw(team)]));
            }
            if let Some(media) = &project.media {
                lines.push(Line::from(vec![
                    Span::styled("media     ", dim()),
                    Span::raw(media.url().to_string()),
                ]));
            }
            lines.push(Line::from(""));
            lines.push(Line::styled(format!("tasks ({})", detail.tasks.len()), bold()));
            lines.extend(detail.tasks.iter().map(task_line));
        }
    }
    if detail.confirm_delete {
        lines.push(Line::from(""));
        lines.push(Line::styled(
            "delete this project and its tasks? y/n",
            bold(),
        ));
    }

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), chunks[1]);
}

/// Key hints for the status bar as `(key, label)` pairs.
fn key_hints(screen: &Screen) -> Vec<(&'static str, &'static str)> {
    match screen {
        Screen::Loading => vec![("R", " retry  "), ("q", " quit")],
        Screen::Login(_) => vec![("enter", " sign in  "), ("R", " refresh  "), ("q", " quit")],
        Screen::Section(section) => match &section.detail {
            Some(detail) if detail.editing.is_some() => vec![
                ("s", " status  "),
                ("p", " priority  "),
                ("+/-", " progress  "),
                ("n", " name  "),
                ("t", " stack  "),
                ("m", " media  "),
                ("enter", " save  "),
                ("esc", " cancel"),
            ],
            Some(detail) if detail.can_manage => {
                vec![("e", " edit  "), ("x", " delete  "), ("esc", " close")]
            }
            Some(_) => vec![("esc", " close")],
            None => vec![
                ("1-4", " section  "),
                ("apidu", " filter  "),
                ("ntrslg", " sort  "),
                ("v", " view  "),
                ("/", " search  "),
                ("R", " refresh  "),
                ("L", " logout  "),
                ("q", " quit"),
            ],
        },
    }
}

/// Render the status bar.
fn render_status(frame: &mut Frame, app: &App, view: &ViewModel, area: Rect) {
    let status_text = if let Some(input) = &app.input {
        Line::from(vec![
            Span::styled(format!("{}: ", input.prompt.label()), bold()),
            Span::raw(input.buffer.as_str()),
            Span::styled("▏", dim()),
        ])
    } else if let Some(notice) = &view.notice {
        Line::from(vec![
            Span::raw(format!("{}: ", notice.kind.as_str())),
            Span::styled(notice.message.as_str(), dim()),
        ])
    } else if view.submitting {
        Line::from(Span::styled("saving…", dim()))
    } else {
        Line::from(
            key_hints(&view.screen)
                .into_iter()
                .flat_map(|(key, label)| [Span::styled(key, bold()), Span::raw(label)])
                .collect::<Vec<_>>(),
        )
    };

    frame.render_widget(Paragraph::new(status_text), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(screen: &Screen) -> Vec<&'static str> {
        key_hints(screen).into_iter().map(|(key, _)| key).collect()
    }

    #[test]
    fn loading_screen_offers_retry() {
        assert_eq!(keys(&Screen::Loading), vec!["R", "q"]);
    }

    #[test]
    fn login_screen_offers_sign_in_and_refresh() {
        assert_eq!(keys(&Screen::Login(Vec::new())), vec!["enter", "R", "q"]);
    }
}
