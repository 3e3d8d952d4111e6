use super::state::{AppState, TaskView, View};
use crate::engine::Phase;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

pub fn draw(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, state, chunks[0]);
    draw_body(f, state, chunks[1]);
    draw_answers(f, state, chunks[2]);
    draw_logs(f, state, chunks[3]);
    draw_footer(f, state, chunks[4]);
}

fn draw_header(f: &mut Frame, state: &AppState, area: Rect) {
    let title = state
        .description
        .clone()
        .unwrap_or_else(|| state.project.clone());

    let mut spans = vec![
        Span::styled(
            format!(" {} ", title),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" | Done: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            state.completed_count.to_string(),
            Style::default().fg(Color::Green),
        ),
        Span::styled(" | Failed: ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            state.failed_count.to_string(),
            Style::default().fg(if state.failed_count > 0 { Color::Red } else { Color::DarkGray }),
        ),
        Span::styled(" | Up: ", Style::default().fg(Color::DarkGray)),
        Span::raw(state.uptime()),
    ];
    if state.simulate {
        spans.push(Span::styled(
            "  SIMULATED",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" crowdtask: {} ", state.project)),
    );
    f.render_widget(header, area);
}

fn draw_body(f: &mut Frame, state: &AppState, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title(" Task ");

    let lines: Vec<Line> = match (state.view, state.task.as_ref()) {
        (View::Task, Some(task)) => task_lines(state, task),
        (View::Loading, _) => vec![Line::from(Span::styled(
            "Loading next task...",
            Style::default().fg(Color::DarkGray),
        ))],
        (View::Finished, _) => vec![
            Line::from(Span::styled(
                "There are no more tasks to complete. Thank you!",
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Press r to check again or q to quit."),
        ],
        (View::NoProject, _) => vec![
            Line::from(Span::styled(
                format!("Project '{}' was not found.", state.project),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Nothing to do here. Check presenter.project in the config."),
        ],
        (View::Error, _) | (View::Task, None) => vec![
            Line::from(Span::styled(
                "Could not load a task.",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            Line::from(state.last_error.clone().unwrap_or_default()),
            Line::from(""),
            Line::from("Press r to retry."),
        ],
    };

    let body = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(body, area);
}

fn task_lines<'a>(state: &'a AppState, task: &'a TaskView) -> Vec<Line<'a>> {
    let label = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Task   ", label),
            Span::styled(task.id.to_string(), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                task.batch_id.map(|b| format!("  (batch {})", b)).unwrap_or_default(),
                label,
            ),
        ]),
        Line::from(vec![
            Span::styled("Media  ", label),
            Span::styled(task.url.as_str(), Style::default().fg(Color::Cyan)),
        ]),
        Line::from(vec![
            Span::styled("Source ", label),
            Span::styled(task.link.as_str(), Style::default().fg(Color::Blue)),
        ]),
        Line::from(""),
    ];

    if state.showing_success() {
        lines.push(Line::from(Span::styled(
            "Answer saved!",
            Style::default().fg(Color::Black).bg(Color::Green).add_modifier(Modifier::BOLD),
        )));
    } else {
        lines.push(phase_line(task.phase));
    }

    if let Some(err) = &state.last_error {
        lines.push(Line::from(Span::styled(
            err.as_str(),
            Style::default().fg(Color::Red),
        )));
    }
    lines
}

fn phase_line(phase: Phase) -> Line<'static> {
    match phase {
        Phase::Shown => Line::from(Span::styled(
            "Pick an answer below.",
            Style::default().fg(Color::White),
        )),
        Phase::Submitting => Line::from(Span::styled(
            "Submitting...",
            Style::default().fg(Color::Yellow),
        )),
        Phase::Completed => Line::from(Span::styled(
            "Completed.",
            Style::default().fg(Color::Green),
        )),
        Phase::SubmitFailed => Line::from(Span::styled(
            "Submission failed. Answer again to retry, or r to skip.",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
    }
}

fn draw_answers(f: &mut Frame, state: &AppState, area: Rect) {
    let enabled = state.view == View::Task
        && state
            .task
            .as_ref()
            .is_some_and(|t| matches!(t.phase, Phase::Shown | Phase::SubmitFailed));

    let mut spans = Vec::new();
    for (i, answer) in state.answers.iter().enumerate() {
        let style = if enabled {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!(" [{}] ", i + 1), style));
        spans.push(Span::raw(format!("{}  ", answer)));
    }

    let answers = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title(" Answer "));
    f.render_widget(answers, area);
}

fn draw_logs(f: &mut Frame, state: &AppState, area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let skip = state.logs.len().saturating_sub(visible);

    let lines: Vec<Line> = state
        .logs
        .iter()
        .skip(skip)
        .map(|entry| {
            let color = match entry.level.as_str() {
                "ERROR" => Color::Red,
                "WARN" => Color::Yellow,
                _ => Color::Gray,
            };
            Line::from(vec![
                Span::styled(format!("{} ", entry.time), Style::default().fg(Color::DarkGray)),
                Span::styled(format!("{:<5} ", entry.level), Style::default().fg(color)),
                Span::raw(entry.message.as_str()),
            ])
        })
        .collect();

    let logs = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Log "));
    f.render_widget(logs, area);
}

fn draw_footer(f: &mut Frame, state: &AppState, area: Rect) {
    let keys = if state.answers.len() > 1 {
        format!("1-{} answer", state.answers.len())
    } else {
        "1 answer".to_string()
    };
    let footer = Paragraph::new(Line::from(vec![
        Span::styled(format!(" {} ", keys), Style::default().fg(Color::Yellow)),
        Span::styled("| r reload ", Style::default().fg(Color::DarkGray)),
        Span::styled("| q quit", Style::default().fg(Color::DarkGray)),
    ]))
    .alignment(Alignment::Left);
    f.render_widget(footer, area);
}
