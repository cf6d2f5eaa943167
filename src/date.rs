use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Fixed timestamp shown by `ls -l`; the listing is scenery, not metadata.
pub const LS_DATE: &str = "Jan 14 12:00";

pub fn display_offset(minutes: i32) -> UtcOffset {
    UtcOffset::from_whole_seconds(minutes * 60).unwrap_or(UtcOffset::UTC)
}

/// `dd/mm/yyyy, HH:MM`, or `dd/mm HH:MM` when `short`; empty for unparsable input.
pub fn format_display_time(input: &str, short: bool, offset: UtcOffset) -> String {
    let Ok(parsed) = OffsetDateTime::parse(input.trim(), &Rfc3339) else {
        return String::new();
    };
    let local = parsed.to_offset(offset);
    let formatted = if short {
        local.format(format_description!("[day]/[month] [hour]:[minute]"))
    } else {
        local.format(format_description!("[day]/[month]/[year], [hour]:[minute]"))
    };
    formatted.unwrap_or_default()
}

/// Human-readable current time for the `date` command.
pub fn now_string(offset: UtcOffset) -> String {
    let now = OffsetDateTime::now_utc().to_offset(offset);
    now.format(format_description!(
        "[weekday repr:short] [month repr:short] [day] [hour]:[minute]:[second] UTC[offset_hour sign:mandatory]:[offset_minute] [year]"
    ))
    .unwrap_or_else(|_| now.to_string())
}
