use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Gauge, Paragraph, Widget, Wrap},
};
use itertools::Itertools;
use unicode_width::UnicodeWidthStr;

use crate::app::{App, AppState};
use crate::clock::Clock;
use crate::controller::{RenderSnapshot, ResultRecord};
use crate::diff::CharVerdict;
use crate::history::HistoryEntry;
use crate::session::Phase;
use crate::text::ContentKind;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

/// How a reference char is drawn when it has no visible glyph of its own
fn glyph(c: char) -> String {
    match c {
        '\n' => "↵".to_owned(),
        '\t' => "→".to_owned(),
        c => c.to_string(),
    }
}

struct Styles {
    correct: Style,
    incorrect: Style,
    current: Style,
    untouched: Style,
    dim: Style,
}

impl Styles {
    fn new() -> Self {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let dim = Style::default().patch(bold).add_modifier(Modifier::DIM);
        Self {
            correct: Style::default().patch(bold).fg(Color::Green),
            incorrect: Style::default().patch(bold).fg(Color::Red),
            current: Style::default().patch(dim).add_modifier(Modifier::UNDERLINED),
            untouched: dim,
            dim,
        }
    }
}

/// Colours every reference char by its verdict. Newlines in the reference
/// end the line after their `↵` marker.
pub fn text_lines<'a>(
    reference: &[char],
    typed: &[char],
    verdicts: &[CharVerdict],
) -> Vec<Line<'a>> {
    let styles = Styles::new();
    let mut lines = Vec::new();
    let mut spans: Vec<Span> = Vec::new();

    for (idx, (expected, verdict)) in reference.iter().zip(verdicts).enumerate() {
        let span = match verdict {
            CharVerdict::Correct => Span::styled(glyph(*expected), styles.correct),
            CharVerdict::Incorrect => {
                let shown = match typed.get(idx) {
                    Some(' ') => "·".to_owned(),
                    Some(c) => glyph(*c),
                    None => glyph(*expected),
                };
                Span::styled(shown, styles.incorrect)
            }
            CharVerdict::Current => Span::styled(glyph(*expected), styles.current),
            CharVerdict::Untouched => Span::styled(glyph(*expected), styles.untouched),
        };
        spans.push(span);

        if *expected == '\n' {
            lines.push(Line::from(std::mem::take(&mut spans)));
        }
    }
    lines.push(Line::from(spans));
    lines
}

fn stats_line(snapshot: &RenderSnapshot) -> String {
    let live = &snapshot.live;
    let secs = live.elapsed_or_remaining_secs();
    let clock = if live.remaining_secs.is_some() {
        format!("{secs}s left")
    } else {
        format!("{secs}s")
    };
    format!(
        "{clock}   {} wpm   {}% acc   {}% consistency",
        live.wpm, live.accuracy_pct, live.consistency_pct
    )
}

fn result_lines<'a>(
    record: &ResultRecord,
    best: Option<u32>,
    personal_best: bool,
    recent: &[HistoryEntry],
) -> Vec<Line<'a>> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(Span::styled(
            format!("{} wpm", record.wpm),
            bold.fg(Color::Green),
        )),
        Line::from(format!(
            "{}% acc   {}% consistency   {:.1}s",
            record.accuracy_pct, record.consistency_pct, record.elapsed_secs
        )),
        Line::from(format!(
            "{} chars   {} errors   {} mode",
            record.total_chars, record.error_count, record.mode
        )),
    ];
    if personal_best {
        lines.push(Line::from(Span::styled(
            "new personal best!",
            bold.fg(Color::Magenta),
        )));
    } else if let Some(best) = best {
        lines.push(Line::from(Span::styled(
            format!("best {best} wpm"),
            Style::default().add_modifier(Modifier::DIM),
        )));
    }
    if recent.len() > 1 {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(
                "recent: {} wpm",
                recent.iter().map(|e| e.record.wpm).join(" · ")
            ),
            Style::default().add_modifier(Modifier::DIM),
        )));
    }
    lines
}

impl<C: Clock> Widget for &App<C> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let styles = Styles::new();
        let controller = &self.controller;
        let legend = Paragraph::new(Span::styled(
            "(←) retry / (→) new text / (t)weet / (esc)ape",
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center);

        let Some(reference) = controller.reference() else {
            let reason = controller
                .presenter()
                .unavailable
                .clone()
                .unwrap_or_else(|| "no text loaded".to_owned());
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .horizontal_margin(HORIZONTAL_MARGIN)
                .constraints([Constraint::Min(1), Constraint::Length(1)])
                .split(area);
            Paragraph::new(vec![
                Line::from(Span::styled(
                    "content unavailable",
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(reason, styles.dim)),
            ])
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(chunks[0], buf);
            legend.render(chunks[1], buf);
            return;
        };

        let snapshot = controller
            .presenter()
            .latest
            .clone()
            .unwrap_or_else(|| controller.snapshot());

        match self.state {
            AppState::Typing => {
                let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
                let lines = text_lines(
                    reference.chars(),
                    controller.session().typed.chars(),
                    &snapshot.verdicts,
                );
                let fits_one_line = lines.len() == 1
                    && reference.content().width() <= max_chars_per_line as usize;
                let text_height = if fits_one_line {
                    1
                } else {
                    let wrapped: usize = lines
                        .iter()
                        .map(|l| l.width().div_ceil(max_chars_per_line as usize).max(1))
                        .sum();
                    wrapped as u16
                };

                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .horizontal_margin(HORIZONTAL_MARGIN)
                    .vertical_margin(VERTICAL_MARGIN)
                    .constraints([
                        Constraint::Length(1),
                        Constraint::Length(1),
                        Constraint::Min(text_height.min(area.height)),
                        Constraint::Length(1),
                        Constraint::Length(1),
                    ])
                    .split(area);

                let header = if snapshot.phase == Phase::Idle {
                    "start typing to begin".to_owned()
                } else {
                    stats_line(&snapshot)
                };
                Paragraph::new(Span::styled(header, styles.dim))
                    .alignment(Alignment::Center)
                    .render(chunks[0], buf);

                let wrap = Wrap {
                    // leading indentation matters in code
                    trim: reference.kind() == ContentKind::Prose,
                };
                Paragraph::new(lines)
                    .alignment(if fits_one_line {
                        Alignment::Center
                    } else {
                        Alignment::Left
                    })
                    .wrap(wrap)
                    .render(chunks[2], buf);

                Gauge::default()
                    .gauge_style(Style::default().fg(Color::Green))
                    .percent(snapshot.progress_pct.min(100) as u16)
                    .render(chunks[3], buf);
                legend.render(chunks[4], buf);
            }
            AppState::Results => {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .horizontal_margin(HORIZONTAL_MARGIN)
                    .vertical_margin(VERTICAL_MARGIN)
                    .constraints([Constraint::Min(1), Constraint::Length(1)])
                    .split(area);

                if let Some(record) = controller.result() {
                    Paragraph::new(result_lines(
                        record,
                        self.previous_best,
                        self.is_personal_best(),
                        &self.recent,
                    ))
                    .alignment(Alignment::Center)
                    .render(chunks[0], buf);
                }
                legend.render(chunks[1], buf);
            }
        }
    }
}
