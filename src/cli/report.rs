use super::ui;
use crate::core::report::{Report, ReportDataset};
use crate::core::session::Session;
use comfy_table::Cell;

/// Opens the report for the session's favorites and renders it, showing a
/// progress bar while the per-coin fetches settle.
pub async fn open_report(session: &mut Session) -> String {
    let pb = ui::new_progress_bar(session.favorites().len() as u64, true);
    pb.set_message("Fetching price history");
    let report = session
        .on_open_report_with_progress(&|| pb.inc(1))
        .await;
    pb.finish_and_clear();
    render_report(report)
}

pub fn render_report(report: &Report) -> String {
    match report {
        Report::Empty => ui::style_text(
            "No data available for the selected favorites",
            ui::StyleType::Subtle,
        ),
        Report::Dataset(dataset) => render_dataset(dataset),
    }
}

fn render_dataset(dataset: &ReportDataset) -> String {
    let mut table = ui::new_styled_table();

    let mut header = vec![ui::header_cell("Date")];
    header.extend(
        dataset
            .series
            .iter()
            .map(|s| ui::series_header_cell(&s.label, s.color)),
    );
    table.set_header(header);

    // Series are not guaranteed to match the axis length.
    let rows = dataset
        .series
        .iter()
        .map(|s| s.values.len())
        .chain(std::iter::once(dataset.labels.len()))
        .max()
        .unwrap_or(0);
    for i in 0..rows {
        let mut row = vec![Cell::new(dataset.labels.get(i).map_or("", String::as_str))];
        row.extend(
            dataset
                .series
                .iter()
                .map(|s| ui::format_optional_cell(s.values.get(i), |v| format!("{v:.2}"))),
        );
        table.add_row(row);
    }

    format!(
        "{}\n\n{}",
        ui::style_text(
            &format!(
                "Price history: last {} days in {}",
                dataset.period_days, dataset.currency
            ),
            ui::StyleType::Title
        ),
        table
    )
}
