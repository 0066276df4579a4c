pub mod coingecko;
pub mod cryptocompare;
pub mod frankfurter;

pub(crate) const USER_AGENT: &str = "coinwatch/0.1";
