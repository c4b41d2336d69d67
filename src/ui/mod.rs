pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, header, info, muted, section, success};
pub use table::{RecordTable, stats_table};
pub use theme::{theme, Theme};
