//! Progress reporting for council runs

use colored::Colorize;
use council_application::ports::progress::ProgressNotifier;
use council_domain::Stage;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::sync::Mutex;

/// Reports progress during a council run with progress bars
pub struct ProgressReporter {
    multi: MultiProgress,
    stage_bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            stage_bar: Mutex::new(None),
        }
    }

    fn stage_style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix:.bold.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }

    fn stage_display_name(stage: Stage) -> String {
        format!("Stage {}: {}", stage.number(), stage.display_name())
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressNotifier for ProgressReporter {
    fn on_stage_start(&self, stage: Stage, total_tasks: usize) {
        let pb = self.multi.add(ProgressBar::new(total_tasks as u64));
        pb.set_style(Self::stage_style());
        pb.set_prefix(Self::stage_display_name(stage));
        pb.set_message("Starting...");

        *self.stage_bar.lock().unwrap_or_else(|e| e.into_inner()) = Some(pb);
    }

    fn on_task_complete(&self, _stage: Stage, persona: &str, success: bool) {
        if let Some(pb) = self.stage_bar.lock().unwrap_or_else(|e| e.into_inner()).as_ref() {
            let status = if success {
                format!("{} {}", "v".green(), persona)
            } else {
                format!("{} {}", "x".red(), persona)
            };
            pb.set_message(status);
            pb.inc(1);
        }
    }

    fn on_stage_complete(&self, stage: Stage) {
        if let Some(pb) = self.stage_bar.lock().unwrap_or_else(|e| e.into_inner()).take() {
            pb.finish_with_message(format!("Stage {} complete!", stage.number()).green().to_string());
        }
    }

    fn on_stage_skipped(&self, stage: Stage, reason: &str) {
        let pb = self.multi.add(ProgressBar::new(0));
        pb.set_style(Self::stage_style());
        pb.set_prefix(Self::stage_display_name(stage));
        pb.finish_with_message(format!("skipped ({})", reason).dimmed().to_string());
    }
}

/// Simple text-based progress (no progress bars)
pub struct SimpleProgress;

impl ProgressNotifier for SimpleProgress {
    fn on_stage_start(&self, stage: Stage, total_tasks: usize) {
        eprintln!(
            "{} {} ({} tasks)",
            "->".cyan(),
            ProgressReporter::stage_display_name(stage).bold(),
            total_tasks
        );
    }

    fn on_task_complete(&self, _stage: Stage, persona: &str, success: bool) {
        if success {
            eprintln!("  {} {}", "v".green(), persona);
        } else {
            eprintln!("  {} {} (failed)", "x".red(), persona);
        }
    }

    fn on_stage_complete(&self, _stage: Stage) {
        eprintln!();
    }

    fn on_stage_skipped(&self, stage: Stage, reason: &str) {
        eprintln!(
            "{} {} skipped: {}",
            "->".cyan(),
            ProgressReporter::stage_display_name(stage).bold(),
            reason
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_display_name() {
        assert_eq!(
            ProgressReporter::stage_display_name(Stage::Deliberate),
            "Stage 3: Deliberation"
        );
    }

    #[test]
    fn test_reporter_tolerates_events_without_a_bar() {
        let reporter = ProgressReporter::new();
        reporter.on_task_complete(Stage::Evaluate, "technical", true);
        reporter.on_stage_complete(Stage::Evaluate);

        reporter.on_stage_start(Stage::Evaluate, 2);
        reporter.on_task_complete(Stage::Evaluate, "technical", true);
        reporter.on_task_complete(Stage::Evaluate, "budget", false);
        reporter.on_stage_complete(Stage::Evaluate);
        assert!(reporter.stage_bar.lock().unwrap().is_none());
    }
}
