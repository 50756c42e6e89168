//! Terminal rendering for envelopes, reports and stats.

use callsight_core::schema::{FollowUpTask, HealthResponse};
use callsight_core::store::{CallReport, StoreStats};
use callsight_core::{AnalysisEnvelope, AnalysisResult, Sentiment};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use std::time::Duration;

pub fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(120));
    bar.set_message(message.to_string());
    bar
}

pub fn print_envelope(envelope: &AnalysisEnvelope) {
    println!(
        "{} session {}",
        "callsight".bright_cyan(),
        envelope.session_id.dimmed()
    );

    if let Some(error) = &envelope.validation_error {
        println!("{} {}", "validation:".yellow(), error);
        println!(
            "{}",
            serde_json::to_string_pretty(&envelope.analysis).unwrap_or_default()
        );
        return;
    }

    match envelope.result() {
        Ok(result) => print_result(&result),
        Err(_) => println!(
            "{}",
            serde_json::to_string_pretty(&envelope.analysis).unwrap_or_default()
        ),
    }
}

fn print_result(result: &AnalysisResult) {
    println!("  intent       {}", result.primary_intent.bold());

    let sentiment = match result.sentiment {
        Sentiment::Positive => result.sentiment.as_str().green().to_string(),
        Sentiment::Negative => result.sentiment.as_str().red().to_string(),
        Sentiment::Neutral => result.sentiment.as_str().yellow().to_string(),
    };
    println!("  sentiment    {} ({})", sentiment, result.tone);
    println!("  rating       {}/10", result.conversation_rating);

    let mut flags = Vec::new();
    if result.need_callback {
        flags.push("callback".yellow().to_string());
    }
    if result.escalation_required {
        flags.push("escalation".red().to_string());
    }
    if result.fraud_risk {
        flags.push("fraud-risk".red().bold().to_string());
    }
    if !flags.is_empty() {
        println!("  flags        {}", flags.join(", "));
    }

    if !result.follow_up_tasks.is_empty() {
        println!("  follow-ups");
        for task in &result.follow_up_tasks {
            match task {
                FollowUpTask::Text(text) => println!("    - {text}"),
                FollowUpTask::Task { description, priority, .. } => match priority {
                    Some(priority) => println!("    - {description} [{priority}]"),
                    None => println!("    - {description}"),
                },
            }
        }
    }

    if !result.summary.is_empty() {
        println!("  summary      {}", result.summary);
    }
}

pub fn print_report(report: &CallReport) {
    println!(
        "{} call #{} ({})",
        "callsight".bright_cyan(),
        report.call_id,
        report.session_id.dimmed()
    );
    println!("  intent       {}", report.intent.bold());
    println!("  sentiment    {}", report.sentiment);
    println!("  agent score  {:.1}/100", report.agent_score);
    if report.duration_secs > 0.0 {
        println!("  duration     {:.1}s", report.duration_secs);
    }
    println!("  analyzed at  {}", report.created_at.dimmed());

    if report.tickets.is_empty() {
        println!("  no open tickets");
    } else {
        println!("  tickets");
        for ticket in &report.tickets {
            let priority = match ticket.priority.as_str() {
                "HIGH" => ticket.priority.red().to_string(),
                "MEDIUM" => ticket.priority.yellow().to_string(),
                _ => ticket.priority.dimmed().to_string(),
            };
            println!(
                "    - {} [{}] {}",
                ticket.requirement_type, priority, ticket.description
            );
        }
    }
}

pub fn print_stats(stats: &StoreStats) {
    println!("{} statistics", "callsight".bright_cyan());
    println!("  calls analyzed  {}", stats.total_calls);
    match stats.avg_agent_score {
        Some(avg) => println!("  avg agent score {avg:.1}/100"),
        None => println!("  avg agent score n/a"),
    }
    println!("  open tickets    {}", stats.open_tickets);
}

pub fn print_health(health: &HealthResponse) {
    let status = if health.status == "ok" {
        health.status.green().to_string()
    } else {
        health.status.red().to_string()
    };
    println!(
        "{} {} (v{}, up {}s)",
        "callsightd".bright_cyan(),
        status,
        health.version,
        health.uptime_secs
    );
}
