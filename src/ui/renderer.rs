//! Terminal renderer for stage-tracker snapshots, built on `indicatif`.
//!
//! The renderer is a passive consumer: it reads snapshots handed to it by
//! the orchestrator and never mutates tracker or cache state. Two bars are
//! stacked vertically:
//! - Stage bar — one-line checklist of all stages with the current one
//!   spinning
//! - Message bar — the latest projected status message
//!
//! Output coordinates through `MultiProgress`; warnings and final lines
//! fall back to `eprintln!` if the rich UI is unavailable.

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

use crate::stage::{StageState, StageView};
use crate::ui::icons::{CHECK, CROSS, WARN};

pub struct StageRenderer {
    multi: MultiProgress,
    stage_bar: ProgressBar,
    message_bar: ProgressBar,
}

impl StageRenderer {
    pub fn new() -> Self {
        Self::with_target(ProgressDrawTarget::stderr())
    }

    /// A renderer that draws nothing. Used by tests and `--json` runs.
    pub fn hidden() -> Self {
        Self::with_target(ProgressDrawTarget::hidden())
    }

    fn with_target(target: ProgressDrawTarget) -> Self {
        let multi = MultiProgress::with_draw_target(target);

        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .expect("progress bar template is a valid static string");

        let stage_bar = multi.add(ProgressBar::new_spinner());
        stage_bar.set_style(spinner_style.clone());
        stage_bar.enable_steady_tick(Duration::from_millis(100));

        let message_bar = multi.add(ProgressBar::new_spinner());
        message_bar.set_style(
            ProgressStyle::default_spinner()
                .template("  {msg}")
                .expect("progress bar template is a valid static string"),
        );

        Self {
            multi,
            stage_bar,
            message_bar,
        }
    }

    /// Print a line via `MultiProgress`, falling back to `eprintln!` so
    /// warnings are never silently lost when stderr is not a terminal.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    /// Redraw the stage checklist and status message from a snapshot.
    pub fn render(&self, stages: &[StageView], message: &str) {
        self.stage_bar.set_message(render_stage_line(stages));
        self.message_bar.set_message(message.to_string());
    }

    pub fn warn(&self, msg: &str) {
        self.print_line(format!("{}{}", WARN, style(msg).yellow()));
    }

    pub fn success(&self, msg: &str) {
        self.print_line(format!("{}{}", CHECK, style(msg).green().bold()));
    }

    pub fn error(&self, msg: &str) {
        self.print_line(format!("{}{}", CROSS, style(msg).red().bold()));
    }

    /// Stop the spinners, leaving the last checklist visible.
    pub fn finish(&self) {
        self.stage_bar.finish();
        self.message_bar.finish_and_clear();
    }
}

impl Default for StageRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// One-line stage checklist: `✔ Pending › ➤ Processing › ∙ Activating`.
fn render_stage_line(stages: &[StageView]) -> String {
    stages
        .iter()
        .map(|stage| {
            let glyph = match stage.state {
                StageState::Completed => style("✔").green(),
                StageState::Failed => style("✖").red(),
                StageState::InProgress => style("➤").cyan(),
                StageState::Unknown => style("∙").dim(),
            };
            if stage.is_current {
                format!("{} {}", glyph, style(&stage.name).bold())
            } else {
                format!("{} {}", glyph, style(&stage.name).dim())
            }
        })
        .collect::<Vec<_>>()
        .join(&format!(" {} ", style("›").dim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(name: &str, state: StageState, is_current: bool) -> StageView {
        StageView {
            name: name.to_string(),
            state,
            is_current,
        }
    }

    #[test]
    fn stage_line_includes_every_stage_name() {
        let stages = vec![
            view("Pending", StageState::Completed, false),
            view("Processing", StageState::InProgress, true),
            view("Activating", StageState::Unknown, false),
        ];
        let line = render_stage_line(&stages);
        assert!(line.contains("Pending"));
        assert!(line.contains("Processing"));
        assert!(line.contains("Activating"));
    }

    #[test]
    fn hidden_renderer_accepts_calls_without_panicking() {
        let ui = StageRenderer::hidden();
        ui.render(
            &[view("Pending", StageState::InProgress, true)],
            "Sandbox 'dev1' (5% complete) is Pending",
        );
        ui.warn("a warning");
        ui.success("done");
        ui.finish();
    }
}
