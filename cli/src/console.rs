//! Console progress reporting and result formatting

use colored::Colorize;
use council_application::DeliberationProgress;
use council_domain::{AgentStatus, DeliberationRun, EventKind, ParsedEvent, Stage};
use std::io::Write;

/// Streams run progress to stderr so stdout stays clean for the report.
pub struct ConsoleProgress {
    quiet: bool,
    show_events: bool,
}

impl ConsoleProgress {
    pub fn new(quiet: bool, show_events: bool) -> Self {
        Self { quiet, show_events }
    }

    fn stage_display_name(stage: Stage) -> &'static str {
        match stage {
            Stage::Compete => "Stage 1: Compete",
            Stage::Judge => "Stage 2: Judge",
            Stage::Synthesize => "Stage 3: Synthesize",
        }
    }
}

impl DeliberationProgress for ConsoleProgress {
    fn on_stage_change(&self, stage: Stage, summary: &str) {
        if self.quiet {
            return;
        }
        eprintln!(
            "\n{} {} {}",
            "->".cyan(),
            Self::stage_display_name(stage).bold(),
            summary.dimmed()
        );
    }

    fn on_agent_status(&self, agent_key: &str, status: AgentStatus) {
        if self.quiet {
            return;
        }
        let line = match status {
            AgentStatus::Running => format!("  {} {}", "*".cyan(), agent_key),
            AgentStatus::Success => format!("  {} {}", "v".green(), agent_key),
            AgentStatus::Error => format!("  {} {} (failed)", "x".red(), agent_key),
            AgentStatus::Aborted => format!("  {} {} (aborted)", "x".yellow(), agent_key),
            AgentStatus::Cancelled => format!("  {} {} (cancelled)", "x".yellow(), agent_key),
            AgentStatus::Queued => return,
        };
        eprintln!("{}", line);
    }

    fn on_agent_event(&self, agent_key: &str, event: &ParsedEvent) {
        if self.quiet || !self.show_events {
            return;
        }
        match event.kind {
            EventKind::ToolCall => {
                eprintln!("    {} {}", format!("[{agent_key}]").dimmed(), event.text)
            }
            EventKind::Status if !event.text.is_empty() => {
                eprintln!(
                    "    {} {}",
                    format!("[{agent_key}]").dimmed(),
                    event.text.dimmed()
                )
            }
            _ => {}
        }
    }

    fn on_ranking_model_start(&self, model: &str) {
        if self.quiet {
            return;
        }
        eprintln!("\n{}", format!("── {} ──", model).yellow().bold());
    }

    fn on_ranking_model_chunk(&self, _model: &str, chunk: &str) {
        if self.quiet {
            return;
        }
        eprint!("{}", chunk);
        let _ = std::io::stderr().flush();
    }

    fn on_ranking_model_complete(&self, model: &str, success: bool) {
        if self.quiet {
            return;
        }
        if success {
            eprintln!("\n  {} {}", "v".green(), model);
        } else {
            eprintln!("\n  {} {} (no usable verdict)", "x".red(), model);
        }
    }

    fn on_synthesis_start(&self) {
        if self.quiet {
            return;
        }
        eprintln!("\n{} {}", "->".cyan(), "Chairman synthesis".bold());
    }
}

/// Formats a finished deliberation run for console display.
pub struct ReportFormatter;

impl ReportFormatter {
    /// Format the complete run report.
    pub fn format(run: &DeliberationRun) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Agent Council"));
        output.push('\n');

        output.push_str(&format!("{} {}\n", "Task:".cyan().bold(), run.prompt));
        output.push_str(&format!(
            "{} {}\n",
            "Agents:".cyan().bold(),
            run.results
                .iter()
                .map(|r| r.name.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));

        output.push_str(&Self::section_header("Stage 1: Responses"));
        for result in &run.results {
            let status = match result.status {
                AgentStatus::Success => "ok".green(),
                AgentStatus::Error => "failed".red(),
                AgentStatus::Aborted => "aborted".yellow(),
                AgentStatus::Cancelled => "cancelled".yellow(),
                other => other.to_string().normal(),
            };
            output.push_str(&format!(
                "\n{} [{}]\n",
                format!("── {} ({}) ──", result.name, result.model).yellow().bold(),
                status
            ));
            if result.is_success() {
                output.push_str(&result.normalized_plan);
                output.push('\n');
            } else if let Some(err) = result.errors.last() {
                output.push_str(&format!("Error: {}\n", err));
            }
            if result.usage.input_tokens > 0 || result.usage.output_tokens > 0 {
                output.push_str(&format!(
                    "{}\n",
                    format!(
                        "tokens: {} in / {} out{}",
                        result.usage.input_tokens,
                        result.usage.output_tokens,
                        result
                            .usage
                            .total_cost
                            .map(|c| format!(", ${:.4}", c))
                            .unwrap_or_default()
                    )
                    .dimmed()
                ));
            }
        }

        if !run.aggregate.is_empty() {
            output.push_str(&Self::section_header("Stage 2: Rankings"));
            for (position, entry) in run.aggregate.iter().enumerate() {
                output.push_str(&format!(
                    "  {}. {} (avg rank {:.2}, {} of {} judges)\n",
                    position + 1,
                    entry.model.bold(),
                    entry.average_rank,
                    entry.rankings_count,
                    run.judges.len()
                ));
            }
        }

        if let Some(synthesis) = &run.synthesis {
            output.push_str(&Self::section_header("Stage 3: Synthesis"));
            output.push_str(&format!(
                "\n{}\n\n{}\n",
                format!("Chairman: {}", synthesis.model).yellow().bold(),
                synthesis.response
            ));
        }

        if !run.notes.is_empty() {
            output.push_str(&format!("\n{}\n", "Notes:".cyan().bold()));
            for note in &run.notes {
                output.push_str(&format!("  * {}\n", note));
            }
        }

        if let Some(cost) = Self::total_cost(run) {
            output.push_str(&format!(
                "\n{} ${:.4}\n",
                "Estimated cost:".cyan().bold(),
                cost
            ));
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format the synthesis only (concise output).
    pub fn format_synthesis_only(run: &DeliberationRun) -> String {
        match &run.synthesis {
            Some(synthesis) => format!("{}\n", synthesis.response),
            None => "(no synthesis produced)\n".to_string(),
        }
    }

    /// Format the whole run as JSON.
    pub fn format_json(run: &DeliberationRun) -> String {
        serde_json::to_string_pretty(run).unwrap_or_else(|_| "{}".to_string())
    }

    /// Sum of every known cost in the run. `None` when no stage reported one;
    /// unknown per-stage costs are left out rather than counted as zero.
    fn total_cost(run: &DeliberationRun) -> Option<f64> {
        let mut total = None;
        let mut add = |cost: Option<f64>| {
            if let Some(c) = cost {
                total = Some(total.unwrap_or(0.0) + c);
            }
        };
        for result in &run.results {
            add(result.usage.total_cost);
        }
        for judge in &run.judges {
            add(judge.estimated_cost);
        }
        if let Some(synthesis) = &run.synthesis {
            add(synthesis.estimated_cost);
        }
        total
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}
