use chrono::{DateTime, Local, Utc};
use climate_core::{DashboardView, ForecastSnapshot, Headline};
use std::fmt::Write;

/// Hourly points shown; the snapshot itself holds the full series.
pub const HOURLY_SHOWN: usize = 8;

pub fn dashboard(view: &DashboardView, status: Option<&str>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "\nThe Daily Climate\n=================");

    if view.busy {
        let _ = writeln!(out, "Looking up location...");
    }
    if let Some(status) = status {
        let _ = writeln!(out, "! {status}");
    }
    if let Some(coords) = view.coordinates {
        let _ = writeln!(out, "\n{coords}");
    }
    if let Some(snapshot) = &view.forecast {
        forecast(&mut out, snapshot);
    }
    if !view.headlines.is_empty() {
        headlines(&mut out, &view.headlines);
    }

    out
}

fn forecast(out: &mut String, snapshot: &ForecastSnapshot) {
    let unit = snapshot.units.temperature_symbol();
    let current = &snapshot.current;

    let _ = writeln!(out, "\nCurrent Weather");
    let _ = writeln!(
        out,
        "  Temp: {}{unit} - {}",
        current.temperature, current.condition.description
    );
    if let Some(icon) = current.condition.icon_url() {
        let _ = writeln!(out, "  {icon}");
    }

    let _ = writeln!(out, "\nHourly Forecast (Next 24 Hours)");
    for point in snapshot.hourly.iter().take(HOURLY_SHOWN) {
        let _ = writeln!(
            out,
            "  {}  {}{unit}  {}",
            local_time(point.time),
            point.temperature,
            point.condition.description
        );
    }

    let _ = writeln!(out, "\n{}-Day Forecast", snapshot.daily.len());
    for day in &snapshot.daily {
        let t = day.temperature;
        let _ = writeln!(
            out,
            "  {}  Day: {}{unit}  Min: {}{unit}  Max: {}{unit}  {}",
            local_date(day.date),
            t.day,
            t.min,
            t.max,
            day.condition.description
        );
    }
}

fn headlines(out: &mut String, headlines: &[Headline]) {
    let _ = writeln!(out, "\nTop News Stories");
    for article in headlines {
        let _ = writeln!(out, "\n  {}", article.title);
        if !article.byline.is_empty() {
            let _ = writeln!(out, "  {}", article.byline);
        }
        if !article.summary.is_empty() {
            let _ = writeln!(out, "  {}", article.summary);
        }
        if let Some(media) = &article.media_url {
            let _ = writeln!(out, "  Image: {media}");
        }
        let _ = writeln!(out, "  Read more: {}", article.url);
    }
}

fn local_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%H:%M").to_string()
}

fn local_date(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d").to_string()
}
