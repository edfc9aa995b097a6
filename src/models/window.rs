use std::fmt;

const MINUTES_PER_DAY: u16 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("invalid time: {0}")]
    InvalidTime(String),

    #[error("invalid time slot label: {0}")]
    InvalidLabel(String),

    #[error("end time must be after start time")]
    Empty,
}

/// A time of day held as minutes since midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes < MINUTES_PER_DAY).then_some(TimeOfDay(minutes))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    /// Accepts `HH:MM` (24-hour) or `H:MM AM`/`H:MM PM` (12-hour).
    pub fn parse(s: &str) -> Result<Self, WindowError> {
        let invalid = || WindowError::InvalidTime(s.to_string());
        let trimmed = s.trim();

        let (clock, modifier) = match trimmed.split_once(char::is_whitespace) {
            Some((clock, modifier)) => (clock, Some(modifier.trim().to_ascii_uppercase())),
            None => (trimmed, None),
        };

        let (h, m) = clock.split_once(':').ok_or_else(invalid)?;
        let mut hours: u16 = h.parse().map_err(|_| invalid())?;
        let minutes: u16 = m.parse().map_err(|_| invalid())?;
        if minutes > 59 {
            return Err(invalid());
        }

        match modifier.as_deref() {
            None => {
                if hours > 23 {
                    return Err(invalid());
                }
            }
            Some(md @ ("AM" | "PM")) => {
                if !(1..=12).contains(&hours) {
                    return Err(invalid());
                }
                if md == "PM" && hours < 12 {
                    hours += 12;
                }
                if md == "AM" && hours == 12 {
                    hours = 0;
                }
            }
            Some(_) => return Err(invalid()),
        }

        Ok(TimeOfDay(hours * 60 + minutes))
    }

    pub fn to_24h(self) -> String {
        format!("{:02}:{:02}", self.0 / 60, self.0 % 60)
    }

    pub fn to_12h(self) -> String {
        let hours = self.0 / 60;
        let minutes = self.0 % 60;
        let suffix = if hours >= 12 { "PM" } else { "AM" };
        let hours = match hours % 12 {
            0 => 12,
            h => h,
        };
        format!("{hours}:{minutes:02} {suffix}")
    }
}

/// Half-open interval `[start, end)` within one calendar day. Never empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    start: TimeOfDay,
    end: TimeOfDay,
}

impl TimeWindow {
    pub fn new(start: TimeOfDay, end: TimeOfDay) -> Result<Self, WindowError> {
        if end <= start {
            return Err(WindowError::Empty);
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, WindowError> {
        Self::new(TimeOfDay::parse(start)?, TimeOfDay::parse(end)?)
    }

    /// Parses the stored `"9:00 AM - 10:00 AM"` form.
    pub fn parse_label(label: &str) -> Result<Self, WindowError> {
        let (start, end) = label
            .split_once('-')
            .ok_or_else(|| WindowError::InvalidLabel(label.to_string()))?;
        Self::parse(start.trim(), end.trim())
    }

    pub fn label(&self) -> String {
        format!("{} - {}", self.start.to_12h(), self.end.to_12h())
    }

    pub fn start(&self) -> TimeOfDay {
        self.start
    }

    pub fn end(&self) -> TimeOfDay {
        self.end
    }

    pub fn duration_minutes(&self) -> i64 {
        i64::from(self.end.0) - i64::from(self.start.0)
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && self.end > other.start
    }

    pub fn contains(&self, t: TimeOfDay) -> bool {
        self.start <= t && t < self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> TimeOfDay {
        TimeOfDay::parse(s).unwrap()
    }

    fn w(start: &str, end: &str) -> TimeWindow {
        TimeWindow::parse(start, end).unwrap()
    }

    #[test]
    fn test_parse_24h() {
        assert_eq!(t("00:00").minutes(), 0);
        assert_eq!(t("09:30").minutes(), 570);
        assert_eq!(t("23:59").minutes(), 1439);
    }

    #[test]
    fn test_parse_12h() {
        assert_eq!(t("9:00 AM").minutes(), 540);
        assert_eq!(t("1:15 PM").minutes(), 795);
        assert_eq!(t("12:00 PM").minutes(), 720);
        assert_eq!(t("12:30 AM").minutes(), 30);
        assert_eq!(t("11:45 pm").minutes(), 1425);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(TimeOfDay::parse("").is_err());
        assert!(TimeOfDay::parse("24:00").is_err());
        assert!(TimeOfDay::parse("10:60").is_err());
        assert!(TimeOfDay::parse("13:00 PM").is_err());
        assert!(TimeOfDay::parse("0:30 AM").is_err());
        assert!(TimeOfDay::parse("10:00 XM").is_err());
        assert!(TimeOfDay::parse("ten").is_err());
    }

    #[test]
    fn test_format_12h() {
        assert_eq!(t("00:00").to_12h(), "12:00 AM");
        assert_eq!(t("09:05").to_12h(), "9:05 AM");
        assert_eq!(t("12:00").to_12h(), "12:00 PM");
        assert_eq!(t("18:30").to_12h(), "6:30 PM");
    }

    #[test]
    fn test_label_parse_is_inverse_of_format() {
        for minutes in (0..MINUTES_PER_DAY - 1).step_by(7) {
            let start = TimeOfDay::from_minutes(minutes).unwrap();
            let end = TimeOfDay::from_minutes(minutes + 1).unwrap();
            let window = TimeWindow::new(start, end).unwrap();
            assert_eq!(TimeWindow::parse_label(&window.label()).unwrap(), window);
        }
    }

    #[test]
    fn test_label_format() {
        assert_eq!(w("09:00", "10:00").label(), "9:00 AM - 10:00 AM");
        assert_eq!(w("11:30", "13:00").label(), "11:30 AM - 1:00 PM");
    }

    #[test]
    fn test_empty_window_rejected() {
        assert_eq!(TimeWindow::parse("10:00", "10:00"), Err(WindowError::Empty));
        assert_eq!(TimeWindow::parse("11:00", "10:00"), Err(WindowError::Empty));
    }

    #[test]
    fn test_overlap_is_exclusive_at_boundaries() {
        let a = w("09:00", "10:00");
        let b = w("10:00", "11:00");
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let a = w("09:00", "10:00");
        let b = w("09:30", "10:30");
        let inner = w("09:15", "09:45");
        assert!(a.overlaps(&b) && b.overlaps(&a));
        assert!(a.overlaps(&inner) && inner.overlaps(&a));
    }

    #[test]
    fn test_mixed_formats_overlap() {
        let stored = TimeWindow::parse_label("9:00 AM - 10:00 AM").unwrap();
        assert!(stored.overlaps(&w("09:30", "10:30")));
        assert!(!stored.overlaps(&w("10:00", "11:00")));
    }

    #[test]
    fn test_contains() {
        let window = w("09:00", "10:00");
        assert!(window.contains(t("09:00")));
        assert!(window.contains(t("09:59")));
        assert!(!window.contains(t("10:00")));
    }
}
