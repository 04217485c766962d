//! Export period

use time::format_description::well_known;
use time::macros::format_description;
use time::{Duration, OffsetDateTime};

use crate::{Error, Result};

/// Time range of an export, `start` strictly before `end`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl TimeWindow {
    pub fn new(start: OffsetDateTime, end: OffsetDateTime) -> Result<Self> {
        if start >= end {
            return Err(Error::Config(
                "Start time must be before end time".to_string(),
            ));
        }

        Ok(Self { start, end })
    }

    /// Both ends in RFC3339
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(
            OffsetDateTime::parse(start, &well_known::Rfc3339)?,
            OffsetDateTime::parse(end, &well_known::Rfc3339)?,
        )
    }

    /// Window ending at `now`: `1h`, `24h`, `7d`, `30d` or any `<n>h` / `<n>d`
    pub fn last(period: &str, now: OffsetDateTime) -> Result<Self> {
        let period = period.trim();
        let invalid = || Error::Config(format!("Invalid period `{}`, eg.: 1h, 24h, 7d", period));

        let unit = period.chars().last().ok_or_else(invalid)?;
        let amount: i64 = period[..period.len() - unit.len_utf8()]
            .parse()
            .map_err(|_| invalid())?;

        let unit_seconds: i64 = match unit {
            'h' => 3_600,
            'd' => 86_400,
            _ => return Err(invalid()),
        };
        let length = amount
            .checked_mul(unit_seconds)
            .map(Duration::seconds)
            .ok_or_else(invalid)?;

        Self::new(now.checked_sub(length).ok_or_else(invalid)?, now)
    }

    /// `{device}_{start}_{end}`, with the days as `YYYYMMDD`
    pub fn file_stem(&self, device: &str) -> Result<String> {
        let day = format_description!("[year][month][day]");

        let device: String = device
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
                c => c,
            })
            .collect();

        Ok(format!(
            "{}_{}_{}",
            device,
            self.start.format(day)?,
            self.end.format(day)?
        ))
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::TimeWindow;

    #[test]
    fn parse() -> Result<(), String> {
        let window = TimeWindow::parse("2023-05-24T00:00:00Z", "2023-05-25T12:00:00-03:00")
            .map_err(|e| e.to_string())?;
        assert_eq!(datetime!(2023-05-24 0:00 UTC), window.start);
        assert_eq!(datetime!(2023-05-25 15:00 UTC), window.end);

        assert!(TimeWindow::parse("2023-05-24", "2023-05-25T00:00:00Z").is_err());
        assert!(TimeWindow::parse("2023-05-25T00:00:00Z", "2023-05-24T00:00:00Z").is_err());
        assert!(TimeWindow::parse("2023-05-24T00:00:00Z", "2023-05-24T00:00:00Z").is_err());

        Ok(())
    }

    #[test]
    fn last() -> Result<(), String> {
        let now = datetime!(2023-05-24 10:00 UTC);

        let hour = TimeWindow::last("1h", now).map_err(|e| e.to_string())?;
        assert_eq!(datetime!(2023-05-24 9:00 UTC), hour.start);
        assert_eq!(now, hour.end);

        let week = TimeWindow::last("7d", now).map_err(|e| e.to_string())?;
        assert_eq!(datetime!(2023-05-17 10:00 UTC), week.start);

        let month = TimeWindow::last(" 30d ", now).map_err(|e| e.to_string())?;
        assert_eq!(datetime!(2023-04-24 10:00 UTC), month.start);

        for invalid in [
            "", "d", "7w", "-1d", "0h", "xh", "7é", "9999999999d",
            "999999999999999d", "9999999999999999h",
        ] {
            assert!(TimeWindow::last(invalid, now).is_err(), "{}", invalid);
        }

        Ok(())
    }

    #[test]
    fn file_stem() -> Result<(), String> {
        let window = TimeWindow::new(
            datetime!(2023-05-17 10:00 UTC),
            datetime!(2023-05-24 10:00 UTC),
        )
        .map_err(|e| e.to_string())?;

        assert_eq!(
            "Truck 12_20230517_20230524",
            window.file_stem("Truck 12").map_err(|e| e.to_string())?
        );
        assert_eq!(
            "a_b_20230517_20230524",
            window.file_stem("a/b").map_err(|e| e.to_string())?
        );

        Ok(())
    }
}
