//! Text views of the session state.

use std::fmt::Write as _;

use securenest_contracts::plan::{Priority, SecurityPlan};
use securenest_engine::{AppState, ImageTray, Session};

pub const CHART_LABEL_MAX_CHARS: usize = 15;
const CHART_BAR_WIDTH: usize = 30;

/// One bar of the cost-distribution chart.
#[derive(Debug, Clone, PartialEq)]
pub struct CostBar {
    pub label: String,
    pub full_name: String,
    pub cost: f64,
}

pub fn chart_label(name: &str) -> String {
    if name.chars().count() <= CHART_LABEL_MAX_CHARS {
        return name.to_string();
    }
    name.chars().take(CHART_LABEL_MAX_CHARS).collect::<String>() + "..."
}

pub fn cost_chart(plan: &SecurityPlan) -> Vec<CostBar> {
    plan.recommendations
        .iter()
        .map(|device| CostBar {
            label: chart_label(&device.name),
            full_name: device.name.clone(),
            cost: device.estimated_cost,
        })
        .collect()
}

pub fn format_usd(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("${value:.0}")
    } else {
        format!("${value:.2}")
    }
}

fn bar(cost: f64, max_cost: f64) -> String {
    if max_cost <= 0.0 || cost <= 0.0 {
        return String::new();
    }
    let filled = ((cost / max_cost) * CHART_BAR_WIDTH as f64).round() as usize;
    "█".repeat(filled.clamp(1, CHART_BAR_WIDTH))
}

fn priority_badge(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "[HIGH]  ",
        Priority::Medium => "[MEDIUM]",
        Priority::Low => "[LOW]   ",
    }
}

pub fn render_state(session: &Session) -> String {
    match session.state() {
        AppState::Idle => render_images(session.images()),
        AppState::Analyzing => {
            "Analyzing architecture... identifying entry points, assessing lighting, and calculating BOM.\n"
                .to_string()
        }
        AppState::Results(plan) => render_plan(plan),
        AppState::Error(message) => {
            format!("Error: {message}\nUse /dismiss to try again.\n")
        }
    }
}

pub fn render_images(images: &ImageTray) -> String {
    if images.is_empty() {
        return "No images yet. Add photos of your home's exterior, entryways, or rooms with /add <path...> (5 images recommended).\n"
            .to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "{} image(s) ready:", images.len());
    for image in images.iter() {
        let preview = image
            .preview()
            .map(|preview| preview.path().display().to_string())
            .unwrap_or_else(|| "no preview".to_string());
        let _ = writeln!(
            out,
            "  {}  {}  ({}, {} bytes)  {}",
            image.id(),
            image.label(),
            image.mime_type(),
            image.bytes().len(),
            preview
        );
    }
    out.push_str("Run /analyze to generate a plan.\n");
    out
}

pub fn render_plan(plan: &SecurityPlan) -> String {
    let mut out = String::new();

    out.push_str("Security Assessment\n===================\n");
    let _ = writeln!(out, "{}\n", plan.executive_summary.trim());

    if !plan.vulnerabilities.is_empty() {
        out.push_str("Vulnerabilities\n");
        for vulnerability in &plan.vulnerabilities {
            let _ = writeln!(out, "  ! {vulnerability}");
        }
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "Estimated ecosystem cost: {} - {}",
        format_usd(plan.total_estimated_cost_min),
        format_usd(plan.total_estimated_cost_max)
    );
    out.push_str("Includes hardware estimates based on current market averages.\n\n");

    out.push_str("Recommended Ecosystem\n");
    for device in &plan.recommendations {
        let _ = writeln!(
            out,
            "  {} {} ({}) {}",
            priority_badge(device.priority),
            device.name,
            device.category,
            format_usd(device.estimated_cost)
        );
        let _ = writeln!(out, "           {}", device.description);
        let _ = writeln!(out, "           Why: {}", device.reasoning);
    }
    out.push('\n');

    let chart = cost_chart(plan);
    if !chart.is_empty() {
        out.push_str("Cost Distribution\n");
        let max_cost = chart.iter().map(|entry| entry.cost).fold(0.0_f64, f64::max);
        let label_width = CHART_LABEL_MAX_CHARS + 3;
        for entry in &chart {
            let _ = writeln!(
                out,
                "  {:<label_width$} {} {}",
                entry.label,
                bar(entry.cost, max_cost),
                format_usd(entry.cost)
            );
        }
        out.push('\n');
    }

    if !plan.ecosystem_benefits.is_empty() {
        out.push_str("System Benefits\n");
        for benefit in &plan.ecosystem_benefits {
            let _ = writeln!(out, "  + {benefit}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use securenest_contracts::plan::{Priority, SecurityDevice, SecurityPlan};

    use super::{chart_label, cost_chart, format_usd, render_plan};

    fn device(name: &str, cost: f64) -> SecurityDevice {
        SecurityDevice {
            name: name.to_string(),
            category: "Camera".to_string(),
            description: "1080p, motion-activated".to_string(),
            reasoning: "covers dark driveway".to_string(),
            estimated_cost: cost,
            priority: Priority::High,
        }
    }

    fn plan() -> SecurityPlan {
        SecurityPlan {
            vulnerabilities: vec!["dark driveway".to_string()],
            recommendations: vec![
                device("Floodlight Cam", 120.0),
                device("Outdoor Floodlight Camera Pro", 249.99),
            ],
            total_estimated_cost_min: 120.0,
            total_estimated_cost_max: 400.0,
            executive_summary: "Light the driveway.".to_string(),
            ecosystem_benefits: vec!["deters intrusion".to_string()],
        }
    }

    #[test]
    fn chart_labels_truncate_after_fifteen_chars() {
        assert_eq!(chart_label("Floodlight Cam"), "Floodlight Cam");
        assert_eq!(chart_label("Exactly 15 char"), "Exactly 15 char");
        assert_eq!(
            chart_label("Outdoor Floodlight Camera Pro"),
            "Outdoor Floodli..."
        );
    }

    #[test]
    fn chart_projection_pairs_names_with_costs_without_touching_plan() {
        let plan = plan();
        let before = plan.clone();
        let chart = cost_chart(&plan);
        assert_eq!(chart.len(), 2);
        assert_eq!(chart[1].label, "Outdoor Floodli...");
        assert_eq!(chart[1].full_name, "Outdoor Floodlight Camera Pro");
        assert_eq!(chart[1].cost, 249.99);
        assert_eq!(plan, before);
    }

    #[test]
    fn usd_formatting() {
        assert_eq!(format_usd(120.0), "$120");
        assert_eq!(format_usd(35.5), "$35.50");
    }

    #[test]
    fn plan_view_contains_every_section() {
        let text = render_plan(&plan());
        assert!(text.contains("Security Assessment"));
        assert!(text.contains("Light the driveway."));
        assert!(text.contains("! dark driveway"));
        assert!(text.contains("Estimated ecosystem cost: $120 - $400"));
        assert!(text.contains("[HIGH]   Floodlight Cam (Camera) $120"));
        assert!(text.contains("Why: covers dark driveway"));
        assert!(text.contains("Cost Distribution"));
        assert!(text.contains("Outdoor Floodli..."));
        assert!(text.contains("+ deters intrusion"));
    }
}
