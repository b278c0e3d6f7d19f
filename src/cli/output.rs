//! Rendering of canonical records for the terminal

use comfy_table::Cell;

use crate::cli::ui;
use crate::core::{CompanyInfo, Quote, Series};

pub fn render_quotes(provider_name: &str, quotes: &[(String, Option<Quote>)]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Symbol"),
        ui::header_cell("Last"),
        ui::header_cell("Open"),
        ui::header_cell("High"),
        ui::header_cell("Low"),
        ui::header_cell("Prev Close"),
        ui::header_cell("Volume"),
    ]);

    for (symbol, quote) in quotes {
        match quote {
            Some(q) => {
                table.add_row(vec![
                    Cell::new(symbol),
                    ui::format_optional_cell(q.last_price, |p| format!("{p:.2}")),
                    ui::format_optional_cell(q.open, |p| format!("{p:.2}")),
                    ui::format_optional_cell(q.high, |p| format!("{p:.2}")),
                    ui::format_optional_cell(q.low, |p| format!("{p:.2}")),
                    ui::format_optional_cell(q.previous_close, |p| format!("{p:.2}")),
                    ui::format_optional_cell(q.volume, |v| v.to_string()),
                ]);
            }
            None => {
                table.add_row(vec![
                    Cell::new(symbol),
                    Cell::new(ui::style_text("no data", ui::StyleType::Error)),
                ]);
            }
        }
    }

    format!(
        "Provider: {}\n\n{}",
        ui::style_text(provider_name, ui::StyleType::Title),
        table
    )
}

pub fn render_series(provider_name: &str, series: &Series) -> String {
    if series.is_empty() {
        return format!(
            "Provider: {}\n\n{}",
            ui::style_text(provider_name, ui::StyleType::Title),
            ui::style_text(
                &format!("No data available for {}", series.symbol),
                ui::StyleType::Subtle
            )
        );
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Timestamp"),
        ui::header_cell("Open"),
        ui::header_cell("High"),
        ui::header_cell("Low"),
        ui::header_cell("Close"),
        ui::header_cell("Volume"),
    ]);

    for bar in &series.bars {
        table.add_row(vec![
            Cell::new(bar.timestamp.format("%Y-%m-%d %H:%M").to_string()),
            Cell::new(format!("{:.2}", bar.open)),
            Cell::new(format!("{:.2}", bar.high)),
            Cell::new(format!("{:.2}", bar.low)),
            Cell::new(format!("{:.2}", bar.close)),
            ui::format_optional_cell(bar.volume, |v| v.to_string()),
        ]);
    }

    format!(
        "Provider: {} · {} bars for {}\n\n{}",
        ui::style_text(provider_name, ui::StyleType::Title),
        series.len(),
        series.symbol,
        table
    )
}

pub fn render_info(provider_name: &str, symbol: &str, info: &CompanyInfo) -> String {
    if info.is_empty() {
        return format!(
            "Provider: {}\n\n{}",
            ui::style_text(provider_name, ui::StyleType::Title),
            ui::style_text(
                &format!("No company info available for {symbol}"),
                ui::StyleType::Subtle
            )
        );
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Field"), ui::header_cell("Value")]);

    for (key, value) in &info.fields {
        let rendered = match value {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        table.add_row(vec![Cell::new(key), Cell::new(rendered)]);
    }

    format!(
        "Provider: {} · {}\n\n{}",
        ui::style_text(provider_name, ui::StyleType::Title),
        symbol,
        table
    )
}

pub fn render_provider_list(ids: &[&str], baseline: &str) -> String {
    let mut out = String::from("Registered providers:\n");
    for id in ids {
        if *id == baseline {
            out.push_str(&format!("  {id} (baseline)\n"));
        } else {
            out.push_str(&format!("  {id}\n"));
        }
    }
    out
}
