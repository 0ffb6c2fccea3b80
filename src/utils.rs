use crate::types::{Course, MeetListing};

use chrono::NaiveDate;

#[derive(Debug, Default)]
pub struct MeetFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub course: Option<Course>,
    pub nation: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl MeetFilter {
    pub fn apply(self, mut listings: Vec<MeetListing>) -> Vec<MeetListing> {
        if let Some(start) = self.start_date {
            listings.retain(|l| l.start_date >= start);
        }
        if let Some(end) = self.end_date {
            listings.retain(|l| l.start_date <= end);
        }
        if let Some(course) = self.course {
            listings.retain(|l| l.course == course);
        }
        if let Some(nation) = self.nation {
            listings.retain(|l| l.nation.as_deref() == Some(nation.as_str()));
        }
        if let Some(off) = self.offset {
            listings = listings.into_iter().skip(off).collect();
        }
        if let Some(lim) = self.limit {
            listings.truncate(lim);
        }
        listings
    }

    pub fn validate(self) -> Result<Self, String> {
        if let Some(start) = self.start_date
            && let Some(end) = self.end_date
            && start > end
        {
            return Err(format!(
                "Start date ({start}) cannot be after end date ({end})"
            ));
        }
        if self.offset.is_some_and(|o| o == 0) {
            return Err("Offset must be greater than 0".to_string());
        }
        if self.limit.is_some_and(|l| l == 0) {
            return Err("Limit must be greater than 0".to_string());
        }
        Ok(self)
    }
}

#[derive(Debug)]
pub struct CalendarStats {
    pub short_course: usize,
    pub long_course: usize,
    pub total: usize,
}

impl CalendarStats {
    pub fn from_meet_listings(listings: &[MeetListing]) -> CalendarStats {
        CalendarStats {
            short_course: listings
                .iter()
                .filter(|l| l.course == Course::ShortCourse)
                .count(),
            long_course: listings
                .iter()
                .filter(|l| l.course == Course::LongCourse)
                .count(),
            total: listings.len(),
        }
    }
}

impl std::fmt::Display for CalendarStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        writeln!(f, "  Short course meets: {}", self.short_course)?;
        writeln!(f, "  Long course meets:  {}", self.long_course)?;
        writeln!(f, "  Total:              {}", self.total)
    }
}
