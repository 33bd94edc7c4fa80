use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};

/// One metering point's load curve to synthesise.
///
/// Both ends of the range are inclusive. A range whose end lies before its
/// start is legal and simply describes no grid points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesDescriptor {
    pub identifier: String,
    pub commodity: String,
    pub method: String,
    pub range_start: OffsetDateTime,
    pub range_end: OffsetDateTime,
}

impl SeriesDescriptor {
    pub fn new(
        identifier: impl Into<String>,
        commodity: impl Into<String>,
        method: impl Into<String>,
        range_start: OffsetDateTime,
        range_end: OffsetDateTime,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            commodity: commodity.into(),
            method: method.into(),
            range_start,
            range_end,
        }
    }
}

#[derive(thiserror::Error, Debug)]
#[error("invalid instant '{input}': expected RFC 3339 or 'dd.MM.yyyy HH:mm'")]
pub struct InstantParseError {
    pub input: String,
}

/// Parse an instant given either as RFC 3339 or as `dd.MM.yyyy HH:mm`.
///
/// The second form carries no offset and is always read as UTC.
pub fn parse_instant(text: &str) -> Result<OffsetDateTime, InstantParseError> {
    let trimmed = text.trim();
    if let Ok(ts) = OffsetDateTime::parse(trimmed, &Rfc3339) {
        return Ok(ts);
    }

    let minute_format = format_description!("[day].[month].[year] [hour]:[minute]");
    PrimitiveDateTime::parse(trimmed, &minute_format)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|_| InstantParseError {
            input: text.to_string(),
        })
}
