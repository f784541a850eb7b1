//! Indian-locale number, currency and date formatting plus CSV/Excel export
//! of list views.

pub mod dates;
pub mod export;
pub mod money;

pub use dates::{IST_OFFSET_SECS, format_date, format_date_long, format_datetime, ist, time_ago};
pub use export::{ExportError, ExportFormat, Exportable, export_csv};
pub use money::{format_indian_number, format_inr, format_inr_compact, format_inr_paise};
