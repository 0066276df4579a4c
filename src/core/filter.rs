//! Case-insensitive search over the catalog by a fixed set of coin fields.

use crate::core::catalog::Catalog;
use crate::core::coin::Coin;
use crate::core::error::TrackerError;
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchField {
    Id,
    Name,
    #[default]
    Symbol,
}

impl SearchField {
    pub const ALL: [SearchField; 3] = [SearchField::Id, SearchField::Name, SearchField::Symbol];

    fn value<'a>(&self, coin: &'a Coin) -> &'a str {
        match self {
            SearchField::Id => &coin.id,
            SearchField::Name => &coin.name,
            SearchField::Symbol => &coin.symbol,
        }
    }
}

impl Display for SearchField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                SearchField::Id => "id",
                SearchField::Name => "name",
                SearchField::Symbol => "symbol",
            }
        )
    }
}

impl FromStr for SearchField {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "id" => Ok(SearchField::Id),
            "name" => Ok(SearchField::Name),
            "symbol" => Ok(SearchField::Symbol),
            _ => Err(TrackerError::InvalidFilterField(s.to_string())),
        }
    }
}

/// Coins whose `field` contains `term`, ignoring case, in catalog order.
/// An empty term matches everything.
pub fn search<'a>(
    catalog: &'a Catalog,
    term: &str,
    field: SearchField,
) -> impl Iterator<Item = &'a Coin> + Clone + use<'a> {
    let needle = term.to_lowercase();
    catalog
        .all()
        .filter(move |coin| field.value(coin).to_lowercase().contains(&needle))
}
