use std::{fmt::Display, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
#[error("Invalid swim time '{0}'. Expected 'SS.cc', 'M:SS.cc' or 'H:MM:SS.cc'")]
pub struct SwimTimeParseError(String);

/// A recorded time with centisecond precision, as displayed on the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SwimTime(u32);

impl SwimTime {
    pub fn from_centiseconds(centiseconds: u32) -> Self {
        SwimTime(centiseconds)
    }

    pub fn centiseconds(&self) -> u32 {
        self.0
    }

    pub fn seconds(&self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl FromStr for SwimTime {
    type Err = SwimTimeParseError;

    // Manually timed results carry a trailing 'M', which is stripped.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches('M');
        let parts: Vec<&str> = trimmed.split(':').collect();
        if trimmed.is_empty() || parts.len() > 3 {
            return Err(SwimTimeParseError(s.to_string()));
        }

        let (sec_str, frac_str) = match parts[parts.len() - 1].split_once('.') {
            Some((sec, frac)) => (sec, Some(frac)),
            None => (parts[parts.len() - 1], None),
        };

        let secs: u32 = sec_str
            .parse()
            .map_err(|_| SwimTimeParseError(s.to_string()))?;
        let centis = match frac_str {
            None => 0,
            Some(frac) if frac.len() == 1 => {
                frac.parse::<u32>()
                    .map_err(|_| SwimTimeParseError(s.to_string()))?
                    * 10
            }
            Some(frac) if frac.len() == 2 => frac
                .parse::<u32>()
                .map_err(|_| SwimTimeParseError(s.to_string()))?,
            Some(_) => return Err(SwimTimeParseError(s.to_string())),
        };

        let mins: u32 = if parts.len() >= 2 {
            parts[parts.len() - 2]
                .parse()
                .map_err(|_| SwimTimeParseError(s.to_string()))?
        } else {
            0
        };
        let hours: u32 = if parts.len() == 3 {
            parts[0]
                .parse()
                .map_err(|_| SwimTimeParseError(s.to_string()))?
        } else {
            0
        };

        if (parts.len() >= 2 && secs >= 60) || (parts.len() == 3 && mins >= 60) {
            return Err(SwimTimeParseError(s.to_string()));
        }

        // Hour counts large enough to overflow u32 centiseconds are rejected.
        hours
            .checked_mul(60)
            .and_then(|t| t.checked_add(mins))
            .and_then(|t| t.checked_mul(60))
            .and_then(|t| t.checked_add(secs))
            .and_then(|t| t.checked_mul(100))
            .and_then(|t| t.checked_add(centis))
            .map(SwimTime)
            .ok_or_else(|| SwimTimeParseError(s.to_string()))
    }
}

impl Display for SwimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let centis = self.0 % 100;
        let secs = (self.0 / 100) % 60;
        let mins = (self.0 / 6_000) % 60;
        let hours = self.0 / 360_000;
        if hours > 0 {
            write!(f, "{}:{:02}:{:02}.{:02}", hours, mins, secs, centis)
        } else if mins > 0 {
            write!(f, "{}:{:02}.{:02}", mins, secs, centis)
        } else {
            write!(f, "{}.{:02}", secs, centis)
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid gender '{0}'. Accepted values: 'men', 'women', 'm', 'w'")]
pub struct GenderParseError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Men,
    Women,
}

impl Gender {
    /// The numeric code the site uses in result-page query strings.
    pub fn code(&self) -> &'static str {
        match self {
            Gender::Men => "1",
            Gender::Women => "2",
        }
    }
}

impl FromStr for Gender {
    type Err = GenderParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "men" | "m" => Ok(Gender::Men),
            "women" | "w" => Ok(Gender::Women),
            _ => Err(GenderParseError(s.to_string())),
        }
    }
}

impl Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gender::Men => write!(f, "Men"),
            Gender::Women => write!(f, "Women"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Invalid course '{0}'. Accepted values: '25m', '50m'")]
pub struct CourseParseError(String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Course {
    ShortCourse,
    LongCourse,
}

impl Course {
    pub fn label(&self) -> &'static str {
        match self {
            Course::ShortCourse => "25m",
            Course::LongCourse => "50m",
        }
    }
}

impl FromStr for Course {
    type Err = CourseParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "25m" => Ok(Course::ShortCourse),
            "50m" => Ok(Course::LongCourse),
            _ => Err(CourseParseError(s.to_string())),
        }
    }
}

impl Display for Course {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RosterScope {
    #[default]
    Current,
    AllMen,
    AllWomen,
}

impl RosterScope {
    // "All_WOMEN" is the site's own spelling.
    pub fn param(&self) -> &'static str {
        match self {
            RosterScope::Current => "CURRENT",
            RosterScope::AllMen => "ALL_MEN",
            RosterScope::AllWomen => "All_WOMEN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AthleteProfile {
    pub name: String,
    pub birth_year: Option<u16>,
    pub gender: Option<Gender>,
    pub nation: Option<String>,
    pub club: Option<String>,
}

impl Display for AthleteProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(year) = self.birth_year {
            write!(f, " ({})", year)?;
        }
        if let Some(club) = &self.club {
            write!(f, " - {}", club)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meet {
    pub id: u32,
    pub name: String,
    pub city: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl Display for Meet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} {} - {}",
            self.id, self.start_date, self.city, self.name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalBest {
    pub event: String,
    pub course: Course,
    pub time: SwimTime,
    pub result_id: u32,
    pub fina_points: Option<u32>,
}

impl Display for PersonalBest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.event, self.course, self.time)?;
        if let Some(points) = self.fina_points {
            write!(f, " [{} pts]", points)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEntry {
    pub id: u32,
    pub gender: Gender,
    pub name: String,
}

impl Display for EventEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.gender)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Race {
    pub number: u32,
    pub name: String,
}

impl Display for Race {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}. {}", self.number, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceResult {
    pub result_id: u32,
    pub athlete_id: String,
    pub athlete_name: String,
    pub club_name: String,
    pub time: SwimTime,
    pub splits: Vec<SwimTime>,
}

impl Display for RaceResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) - {}",
            self.athlete_name, self.club_name, self.time
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClubEntry {
    pub id: u32,
    pub name: String,
}

impl Display for ClubEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.name, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AthleteRef {
    pub id: String,
    pub name: String,
}

impl Display for AthleteRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]", self.name, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetListing {
    pub id: u32,
    pub name: String,
    pub city: String,
    pub nation: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub course: Course,
}

impl Display for MeetListing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} {} ({}) - {}",
            self.id, self.start_date, self.city, self.course, self.name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePeriod {
    pub id: String,
    pub name: String,
}

impl Display for TimePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nation {
    pub id: String,
    pub name: String,
}

impl Display for Nation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
