use super::ui;
use crate::core::coin::Coin;
use crate::core::currency::{ExchangeRateTable, REPORT_CURRENCIES};
use comfy_table::{Cell, Color};

const STAR: &str = "★";

/// Renders coins as a table with one price column per report currency.
/// Favorites are starred.
pub fn render_coin_table<'a>(
    coins: impl IntoIterator<Item = &'a Coin>,
    favorites: &[String],
    rates: &ExchangeRateTable,
) -> String {
    let mut table = ui::new_styled_table();

    let mut header = vec![
        ui::header_cell(""),
        ui::header_cell("Name"),
        ui::header_cell("Symbol"),
        ui::header_cell("Id"),
    ];
    header.extend(
        REPORT_CURRENCIES
            .iter()
            .map(|code| ui::header_cell(&format!("Price ({code})"))),
    );
    table.set_header(header);

    let mut count = 0;
    for coin in coins {
        count += 1;
        let star = if favorites.iter().any(|f| f == &coin.id) {
            Cell::new(STAR).fg(Color::Yellow)
        } else {
            Cell::new("")
        };
        let mut row = vec![
            star,
            Cell::new(&coin.name),
            Cell::new(&coin.symbol),
            Cell::new(&coin.id),
        ];
        row.extend(REPORT_CURRENCIES.iter().map(|code| {
            let price = coin
                .current_price_usd
                .and_then(|usd| rates.convert(usd, code));
            ui::format_optional_cell(price, |p| format!("{p:.2}"))
        }));
        table.add_row(row);
    }

    if count == 0 {
        return ui::style_text("No coins to show", ui::StyleType::Subtle);
    }
    table.to_string()
}

/// Detail view for a single coin.
pub fn render_coin_info(coin: &Coin, is_favorite: bool, rates: &ExchangeRateTable) -> String {
    let mut output = format!(
        "{}{}\n\n",
        ui::style_text(&coin.display_label(), ui::StyleType::Title),
        if is_favorite {
            format!(" {STAR}")
        } else {
            String::new()
        }
    );
    output.push_str(&format!(
        "{} {}\n",
        ui::style_text("Id:", ui::StyleType::Label),
        coin.id
    ));
    if let Some(image) = &coin.image_url {
        output.push_str(&format!(
            "{} {}\n",
            ui::style_text("Image:", ui::StyleType::Label),
            ui::style_text(image, ui::StyleType::Subtle)
        ));
    }
    for code in REPORT_CURRENCIES {
        let price = coin
            .current_price_usd
            .and_then(|usd| rates.convert(usd, code))
            .map_or_else(
                || ui::style_text("N/A", ui::StyleType::Subtle),
                |p| ui::style_text(&format!("{p:.2}"), ui::StyleType::Value),
            );
        output.push_str(&format!(
            "{} {}\n",
            ui::style_text(&format!("Price ({code}):"), ui::StyleType::Label),
            price
        ));
    }
    output
}
