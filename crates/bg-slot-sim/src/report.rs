//! Human-readable and JSON rendering of verification reports

use std::fmt::Write;

use serde::Serialize;

use bg_slot_core::line_key;

use crate::cancel::RunStatus;
use crate::error::SimResult;
use crate::exhaustive::ExhaustiveReport;
use crate::monte_carlo::MonteCarloReport;
use crate::targets::TargetCheck;

/// Pretty JSON for any report
pub fn to_json<T: Serialize>(report: &T) -> SimResult<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// `1234567` → `1,234,567`
pub fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn percent(ratio: f64) -> String {
    format!("{:.4}%", ratio * 100.0)
}

fn status_line(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Completed => "completed",
        RunStatus::Cancelled => "CANCELLED (partial totals)",
    }
}

fn check_line(out: &mut String, name: &str, check: &TargetCheck) {
    let _ = writeln!(
        out,
        "  {name:<15} target {} ± {}  actual {}  {}",
        percent(check.target),
        percent(check.tolerance),
        percent(check.actual),
        if check.within { "PASS" } else { "FAIL" }
    );
}

/// Text summary of an exhaustive run
pub fn render_exhaustive(report: &ExhaustiveReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "EXHAUSTIVE ANALYSIS  {} ({})",
        report.machine, report.paytable_version
    );
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(
        out,
        "  Status:          {} ({}/{} chunks)",
        status_line(report.status),
        report.chunks_completed,
        report.chunks_total
    );
    let _ = writeln!(out, "  Combinations:    {}", group_digits(report.combinations));
    let _ = writeln!(out, "  Total cost:      {}", group_digits(report.total_cost));
    let _ = writeln!(out, "  Total payout:    {:.2}", report.total_payout());
    let _ = writeln!(out, "  Winning combos:  {}", group_digits(report.winning_combinations));
    let _ = writeln!(out, "  RTP:             {}", percent(report.rtp));
    let _ = writeln!(out, "  Hit frequency:   {}", percent(report.hit_frequency));
    let _ = writeln!(out, "  Elapsed:         {:.1} ms", report.elapsed_ms);
    let _ = writeln!(out);

    let _ = writeln!(out, "PAYOUT DISTRIBUTION");
    let _ = writeln!(
        out,
        "  {:>10}  {:>10}  {:>12}  {:>10}",
        "pays", "count", "probability", "rtp share"
    );
    for bucket in &report.distribution {
        let _ = writeln!(
            out,
            "  {:>10}  {:>10}  {:>12.8}  {:>10}",
            bucket.multiplier.to_string(),
            group_digits(bucket.count),
            bucket.probability,
            percent(bucket.rtp_contribution)
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "TOP WINNING LINES");
    for (rank, combo) in report.top_combinations.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:>2}. {:<10} {}",
            rank + 1,
            line_key(&combo.line),
            group_digits(combo.count)
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "TARGETS");
    check_line(&mut out, "RTP", &report.rtp_check);
    check_line(&mut out, "Hit frequency", &report.hit_frequency_check);
    out
}

/// Text summary of a Monte-Carlo run
pub fn render_monte_carlo(report: &MonteCarloReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "MONTE-CARLO SIMULATION  {}", report.machine);
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out, "  Status:          {}", status_line(report.status));
    if let Some(seed) = report.seed {
        let _ = writeln!(out, "  Seed:            {seed}");
    }
    let _ = writeln!(out, "  Rounds:          {}", group_digits(report.rounds));
    let _ = writeln!(out, "  Total payout:    {:.2}", report.total_payout);
    let _ = writeln!(out, "  RTP:             {}", percent(report.rtp));
    let _ = writeln!(out, "  Hit frequency:   {}", percent(report.hit_frequency));
    let _ = writeln!(out, "  Average win:     {:.4}", report.average_win);
    let _ = writeln!(out, "  Std deviation:   {:.4}", report.standard_deviation);
    let _ = writeln!(
        out,
        "  Streaks:         {} wins / {} losses",
        report.longest_win_streak, report.longest_loss_streak
    );
    if let Some(win) = &report.biggest_win {
        let _ = writeln!(
            out,
            "  Biggest win:     {} on {} (round {})",
            win.multiplier,
            line_key(&win.line),
            group_digits(win.round)
        );
    }
    let _ = writeln!(out, "  Elapsed:         {:.1} ms", report.elapsed_ms);
    let _ = writeln!(out);

    let _ = writeln!(out, "HOUSE EXPOSURE");
    if let (Some(low), Some(high)) = (&report.lowest_rtp, &report.highest_rtp) {
        let _ = writeln!(
            out,
            "  Running RTP range: {} (round {}) .. {} (round {})",
            percent(low.rtp),
            group_digits(low.round),
            percent(high.rtp),
            group_digits(high.round)
        );
    }
    match &report.max_house_loss {
        Some(loss) => {
            let _ = writeln!(
                out,
                "  Max house loss:    {:.2} at round {} ({} RTP)",
                loss.loss,
                group_digits(loss.round),
                percent(loss.rtp)
            );
        }
        None => {
            let _ = writeln!(out, "  Max house loss:    none (house never behind)");
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "SESSION RISK (sliding windows)");
    let _ = writeln!(
        out,
        "  {:>8}  {:>12}  {:>10}  {:>21}  {:<8}",
        "size", "house loss", "rtp", "rounds", "risk"
    );
    for session in &report.sessions {
        match (&session.worst, session.risk) {
            (Some(worst), Some(risk)) => {
                let _ = writeln!(
                    out,
                    "  {:>8}  {:>12.2}  {:>10}  {:>21}  {:<8}",
                    group_digits(session.session_size),
                    worst.house_loss,
                    percent(worst.rtp),
                    format!(
                        "{}-{}",
                        group_digits(worst.start_round),
                        group_digits(worst.end_round)
                    ),
                    risk
                );
            }
            _ => {
                let _ = writeln!(
                    out,
                    "  {:>8}  {:>12}  {:>10}  {:>21}  {:<8}",
                    group_digits(session.session_size),
                    "n/a",
                    "n/a",
                    "too few rounds",
                    "-"
                );
            }
        }
    }

    if !report.checkpoints.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "RTP CHECKPOINTS");
        for cp in &report.checkpoints {
            let _ = writeln!(
                out,
                "  {:>12}  {}  wins {}  house {:+.2}",
                group_digits(cp.round),
                percent(cp.rtp),
                group_digits(cp.wins),
                cp.house_loss
            );
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "TARGETS (tolerance includes 3 standard errors)");
    check_line(&mut out, "RTP", &report.rtp_check);
    check_line(&mut out, "Hit frequency", &report.hit_frequency_check);
    out
}
