//! Token usage overview across projects.
//!
//! Used by `ragc stats` to show which projects consume the most tokens.
//! Ordering is the backend's (descending total tokens).

use anyhow::Result;

use crate::client::RagApi;
use crate::models::TopProject;

/// Run the stats command: fetch the top projects and print a summary.
pub async fn run_stats(api: &dyn RagApi, limit: u32) -> Result<()> {
    let top = api.top_projects(limit).await?;

    println!("Top projects by token usage");
    println!("===========================");
    println!();

    if top.projects.is_empty() {
        println!("  No usage recorded.");
        println!();
        return Ok(());
    }

    let grand_total: u64 = top.projects.iter().filter_map(|p| p.total_tokens).sum();

    println!(
        "  {:<28} {:<10} {:>12} {:>10} {:>6}",
        "PROJECT", "TYPE", "TOKENS", "COST", "SHARE"
    );
    println!("  {}", "-".repeat(70));
    for p in &top.projects {
        println!(
            "  {:<28} {:<10} {:>12} {:>10} {:>5}%",
            p.name,
            p.project_type,
            format_number(p.total_tokens.unwrap_or(0)),
            format_cost(p),
            share(p.total_tokens.unwrap_or(0), grand_total)
        );
    }
    println!();

    Ok(())
}

fn share(tokens: u64, total: u64) -> u64 {
    if total > 0 {
        (tokens * 100) / total
    } else {
        0
    }
}

fn format_cost(p: &TopProject) -> String {
    match p.total_cost {
        Some(cost) => format!("{:.4}", cost),
        None => "-".to_string(),
    }
}

/// Format an integer with thousands separators (e.g. `1234567` → `"1,234,567"`).
fn format_number(n: u64) -> String {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_000), "1,000");
        assert_eq!(format_number(1_234_567), "1,234,567");
    }

    #[test]
    fn test_share_handles_zero_total() {
        assert_eq!(share(10, 0), 0);
        assert_eq!(share(25, 100), 25);
    }

    #[test]
    fn test_missing_cost_renders_dash() {
        let p = TopProject {
            name: "docs".into(),
            ..Default::default()
        };
        assert_eq!(format_cost(&p), "-");
    }
}
