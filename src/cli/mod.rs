pub mod coins;
pub mod report;
pub mod setup;
pub mod shell;
pub mod ui;
