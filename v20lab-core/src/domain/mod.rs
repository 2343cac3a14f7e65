//! Domain types for the v20 backtester

pub mod bar;
pub mod category;
pub mod series;
pub mod setup;
pub mod trade;

pub use bar::Bar;
pub use category::SourceCategory;
pub use series::{PriceSeries, SeriesError};
pub use setup::Setup;
pub use trade::{CompletedTrade, OpenTrade};
