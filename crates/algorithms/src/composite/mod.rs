//! Same-day compositing
//!
//! - **daily**: group scenes by UTC calendar day and mosaic each group,
//!   first valid pixel wins

mod daily;

pub use daily::{daily_composites, group_by_date, mosaic, DailyComposite};
