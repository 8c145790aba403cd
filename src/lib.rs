pub mod api;
pub mod filter;
pub mod geo;
pub mod models;
pub mod monitor;
pub mod normalize;
pub mod reconcile;
pub mod tui;
pub mod worker;
