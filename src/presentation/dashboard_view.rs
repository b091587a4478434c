// Text rendering of dashboard snapshots
use crate::application::dashboard_controller::DashboardState;
use crate::domain::reading::Reading;
use crate::domain::stats::Statistics;
use crate::domain::tier::classify;
use chrono::{DateTime, Local, Utc};

const VISIBLE_PAGES: u32 = 3;

/// One slot of the page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Gap,
}

pub fn format_amper(value: f64) -> String {
    format!("{:.1}A", value)
}

/// `DD.MM.YY HH:MM` in local time.
pub fn format_timestamp(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(time) => time.with_timezone(&Local).format("%d.%m.%y %H:%M").to_string(),
        Err(_) => "invalid date".to_string(),
    }
}

pub fn format_relative(timestamp: &str, now: DateTime<Utc>) -> String {
    let Ok(time) = DateTime::parse_from_rfc3339(timestamp) else {
        return "invalid date".to_string();
    };

    let elapsed = now.signed_duration_since(time.with_timezone(&Utc));
    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{} minutes ago", minutes)
    } else if elapsed.num_hours() < 24 {
        format!("{} hours ago", elapsed.num_hours())
    } else if elapsed.num_days() < 7 {
        format!("{} days ago", elapsed.num_days())
    } else {
        format_timestamp(timestamp)
    }
}

/// Page numbers around `current`, with the first and last page always
/// reachable and gaps where pages are skipped.
pub fn page_window(current: u32, total_pages: u32) -> Vec<PageItem> {
    if total_pages <= 1 {
        return Vec::new();
    }

    let current = current.clamp(1, total_pages);
    let mut start = current.saturating_sub(1).max(1);
    let end = (start + VISIBLE_PAGES - 1).min(total_pages);
    if end - start < VISIBLE_PAGES - 1 {
        start = (end + 1).saturating_sub(VISIBLE_PAGES).max(1);
    }

    let mut items = Vec::new();
    if start > 1 {
        items.push(PageItem::Page(1));
        if start > 2 {
            items.push(PageItem::Gap);
        }
    }
    items.extend((start..=end).map(PageItem::Page));
    if end < total_pages {
        if end < total_pages - 1 {
            items.push(PageItem::Gap);
        }
        items.push(PageItem::Page(total_pages));
    }
    items
}

fn render_page_window(items: &[PageItem], current: u32) -> String {
    items
        .iter()
        .map(|item| match item {
            PageItem::Page(page) if *page == current => format!("[{page}]"),
            PageItem::Page(page) => page.to_string(),
            PageItem::Gap => "...".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_statistics(statistics: &Statistics) -> String {
    let stats = statistics.stats();
    let mut line = format!(
        "{:.0}% active of {} readings (off {}, min {}, mid {}, max {})",
        stats.percentage, stats.total_readings, stats.off, stats.min, stats.mid, stats.max
    );
    if statistics.is_estimated() {
        line.push_str(" [estimated from current page]");
    }
    line
}

/// Table row for a reading, or `None` for readings outside every tier.
fn render_reading(reading: &Reading) -> Option<String> {
    let tier = classify(reading.amper_value)?;
    Some(format!(
        "{}  {:>6}  {}",
        format_timestamp(&reading.sensor_timestamp),
        format_amper(reading.amper_value),
        tier.as_str().to_uppercase()
    ))
}

/// Render a snapshot as display lines.
pub fn render(state: &DashboardState, now: DateTime<Utc>) -> Vec<String> {
    let selection = &state.selection;
    let mut lines = vec![format!(
        "{} / {} / {} ({})",
        selection.product_id,
        selection.sensor,
        selection.username,
        selection.time_range.label()
    )];

    if state.is_loading {
        lines.push("Loading...".to_string());
    }

    match &state.statistics {
        Some(statistics) => lines.push(render_statistics(statistics)),
        None => lines.push("No statistics yet".to_string()),
    }

    if let Some(synced) = state.last_synced_at {
        lines.push(format!("Last synced {}", format_relative(&synced.to_rfc3339(), now)));
    }
    if let Some(error) = &state.error {
        lines.push(format!("Error: {}", error));
    }

    match &state.pagination {
        Some(pagination) => lines.push(format!(
            "{} readings found (page {}/{}), showing {}-{}",
            pagination.total,
            pagination.page,
            pagination.pages,
            pagination.first_item(),
            pagination.last_item()
        )),
        None => lines.push(format!("{} readings found", state.readings.len())),
    }

    lines.extend(state.readings.iter().filter_map(render_reading));

    if let Some(pagination) = &state.pagination {
        let window = page_window(pagination.page, pagination.pages);
        if !window.is_empty() {
            lines.push(render_page_window(&window, pagination.page));
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pages(items: &[PageItem]) -> String {
        render_page_window(items, 0)
    }

    #[test]
    fn test_page_window() {
        assert!(page_window(1, 1).is_empty());
        assert_eq!(pages(&page_window(1, 2)), "1 2");
        assert_eq!(pages(&page_window(1, 10)), "1 2 3 ... 10");
        assert_eq!(pages(&page_window(5, 10)), "1 ... 4 5 6 ... 10");
        assert_eq!(pages(&page_window(10, 10)), "1 ... 8 9 10");
        assert_eq!(pages(&page_window(3, 4)), "1 2 3 4");
    }

    #[test]
    fn test_format_amper() {
        assert_eq!(format_amper(4.26), "4.3A");
        assert_eq!(format_amper(0.0), "0.0A");
    }

    #[test]
    fn test_format_relative() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(format_relative("2024-05-01T11:59:40Z", now), "just now");
        assert_eq!(format_relative("2024-05-01T11:55:00Z", now), "5 minutes ago");
        assert_eq!(format_relative("2024-05-01T09:00:00Z", now), "3 hours ago");
        assert_eq!(format_relative("2024-04-29T12:00:00Z", now), "2 days ago");
        assert_eq!(format_relative("garbage", now), "invalid date");
    }

    #[test]
    fn test_render_marks_estimated_statistics() {
        use crate::domain::product::Selection;
        use crate::domain::reading::PaginationMeta;
        use crate::domain::stats::aggregate;
        use crate::domain::time_range::TimeRange;

        let readings: Vec<Reading> = [0.5, 2.0, 4.0, 6.0, 25.0]
            .iter()
            .map(|v| Reading::new("r", "ayse", *v))
            .collect();
        let now = Utc::now();
        let state = DashboardState {
            selection: Selection::new("p1", "ayse", "s1", TimeRange::Last6Hours),
            statistics: Some(aggregate(&readings, Some(25)).unwrap()),
            readings,
            pagination: Some(PaginationMeta { page: 2, limit: 5, total: 25, pages: 5 }),
            current_page: 2,
            is_loading: false,
            is_refreshing: false,
            error: None,
            retry_alert: None,
            last_synced_at: Some(now),
            generation: 3,
        };

        let lines = render(&state, now);
        assert_eq!(lines[0], "p1 / s1 / ayse (Last 6 hours)");
        assert_eq!(lines[1], "60% active of 25 readings (off 1, min 1, mid 1, max 1) [estimated from current page]");
        assert_eq!(lines[2], "Last synced just now");
        assert_eq!(lines[3], "25 readings found (page 2/5), showing 6-10");
        // The 25A reading has no row
        assert_eq!(lines.len(), 4 + 4 + 1);
        assert_eq!(lines.last().unwrap(), "1 [2] 3 ... 5");
    }

    #[test]
    fn test_unclassified_readings_are_not_rendered() {
        let mut reading = Reading::new("r1", "ayse", 30.0);
        assert_eq!(render_reading(&reading), None);

        reading.amper_value = 4.0;
        let row = render_reading(&reading).unwrap();
        assert!(row.contains("4.0A"));
        assert!(row.ends_with("MID"));
    }
}
