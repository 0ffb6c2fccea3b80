use crate::types::{
    AthleteProfile, AthleteRef, ClubEntry, Course, EventEntry, Gender, Meet, MeetListing, Nation,
    PersonalBest, Race, RaceResult, SwimTime, TimePeriod,
};

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

// Split times live in an onmouseover tooltip with escaped attribute quotes.
static RE_SPLIT_TIMES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<td class=\\'split1\\'>(.*?)</td>").expect("invalid regex: split times")
});

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Missing expected element: {0}")]
    MissingElement(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Failed to parse URL: {0}")]
    UrlParse(String),
    #[error("Failed to parse date: {0}")]
    DateParse(String),
    #[error("Failed to parse time: {0}")]
    TimeParse(String),
    #[error("Failed to parse number: {0}")]
    NumberParse(String),
    #[error("Invalid course: {0}")]
    InvalidCourse(String),
}

pub fn parse_athlete_profile(html: &str, athlete_id: &str) -> Result<AthleteProfile, ParseError> {
    let document = Html::parse_document(html);

    let info_selector = Selector::parse("div#athleteinfo").unwrap();
    let Some(info) = document.select(&info_selector).next() else {
        return Err(ParseError::MissingElement(format!(
            "div#athleteinfo on profile of athlete {athlete_id}"
        )));
    };

    let name_selector = Selector::parse("div#name").unwrap();
    let name_div = info.select(&name_selector).next().ok_or_else(|| {
        ParseError::MissingElement(format!("div#name on profile of athlete {athlete_id}"))
    })?;

    // The header reads "LASTNAME, Firstname (YYYY)".
    let header = normalize_whitespace(&elem_text(name_div));
    let (name, birth_year) = match header.split_once('(') {
        Some((name, rest)) => {
            let year = rest
                .split(')')
                .next()
                .and_then(|year| year.trim().parse::<u16>().ok());
            (name.trim().to_string(), year)
        }
        None => (header.clone(), None),
    };
    if name.is_empty() {
        return Err(ParseError::MissingField(format!(
            "name on profile of athlete {athlete_id}"
        )));
    }

    let img_selector = Selector::parse("img").unwrap();
    let gender = name_div
        .select(&img_selector)
        .filter_map(|img| img.value().attr("src"))
        .find_map(|src| {
            if src.contains("gender1") {
                Some(Gender::Men)
            } else if src.contains("gender2") {
                Some(Gender::Women)
            } else {
                None
            }
        });

    let nationclub_selector = Selector::parse("div#nationclub").unwrap();
    let mut lines = info
        .select(&nationclub_selector)
        .next()
        .map(|div| {
            div.text()
                .map(normalize_whitespace)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default()
        .into_iter();
    let nation = lines.next();
    let club = lines.next();

    Ok(AthleteProfile {
        name,
        birth_year,
        gender,
        nation,
        club,
    })
}

pub fn parse_personal_bests(html: &str, athlete_id: &str) -> Result<Vec<PersonalBest>, ParseError> {
    let document = Html::parse_document(html);

    let table_selector = Selector::parse("table.athleteBest").unwrap();
    let Some(table) = document.select(&table_selector).next() else {
        return Err(ParseError::MissingElement(format!(
            "table.athleteBest on best times of athlete {athlete_id}"
        )));
    };

    let row_selector = Selector::parse("tr.athleteBest0, tr.athleteBest1").unwrap();
    let mut bests = Vec::new();
    for row in table.select(&row_selector) {
        match parse_best_row(row) {
            Ok(best) => bests.push(best),
            Err(e) => log::warn!("Skipping best time row: {}", e),
        }
    }

    Ok(bests)
}

fn parse_best_row(row: ElementRef) -> Result<PersonalBest, ParseError> {
    let event_selector = Selector::parse("td.event a").unwrap();
    let event = row
        .select(&event_selector)
        .next()
        .map(|link| normalize_whitespace(&elem_text(link)))
        .filter(|event| !event.is_empty())
        .ok_or_else(|| ParseError::MissingField("event link in best time row".to_string()))?;

    let course_selector = Selector::parse("td.course").unwrap();
    let course_text = row
        .select(&course_selector)
        .next()
        .map(|cell| normalize_whitespace(&elem_text(cell)))
        .ok_or_else(|| ParseError::MissingField("course cell in best time row".to_string()))?;
    let course = course_text
        .parse::<Course>()
        .map_err(|_| ParseError::InvalidCourse(course_text.clone()))?;

    // Record-flagged times swap td.time for td.swimtimeImportant.
    let time_selector = Selector::parse("td.time, td.swimtimeImportant").unwrap();
    let time_cell = row
        .select(&time_selector)
        .next()
        .ok_or_else(|| ParseError::MissingField("time cell in best time row".to_string()))?;
    let time = parse_swim_time(&elem_text(time_cell))?;

    let link_selector = Selector::parse("a").unwrap();
    let href = time_cell
        .select(&link_selector)
        .next()
        .and_then(|link| link.value().attr("href"))
        .ok_or_else(|| ParseError::MissingField("result link in best time row".to_string()))?;
    let result_id = id_param(href, "id")?;

    let points_selector = Selector::parse("td.code").unwrap();
    let fina_points = row
        .select(&points_selector)
        .next()
        .map(|cell| normalize_whitespace(&elem_text(cell)))
        .and_then(|points| points.parse::<u32>().ok());

    Ok(PersonalBest {
        event,
        course,
        time,
        result_id,
        fina_points,
    })
}

pub fn parse_athlete_meets(html: &str, athlete_id: &str) -> Result<Vec<Meet>, ParseError> {
    let document = Html::parse_document(html);

    let table_selector = Selector::parse("table.athleteMeet").unwrap();
    let Some(table) = document.select(&table_selector).next() else {
        return Err(ParseError::MissingElement(format!(
            "table.athleteMeet on meet history of athlete {athlete_id}"
        )));
    };

    let row_selector = Selector::parse("tr.athleteMeet0, tr.athleteMeet1").unwrap();
    let mut meets = Vec::new();
    for row in table.select(&row_selector) {
        match parse_meet_row(row) {
            Ok(meet) => meets.push(meet),
            Err(e) => log::warn!("Skipping meet row: {}", e),
        }
    }

    Ok(meets)
}

fn parse_meet_row(row: ElementRef) -> Result<Meet, ParseError> {
    let date_selector = Selector::parse("td.date").unwrap();
    let date_text = row
        .select(&date_selector)
        .next()
        .map(elem_text)
        .ok_or_else(|| ParseError::MissingField("date cell in meet row".to_string()))?;
    let (start_date, end_date) = parse_date_range(&date_text)?;

    let city_selector = Selector::parse("td.city a").unwrap();
    let link = row
        .select(&city_selector)
        .next()
        .ok_or_else(|| ParseError::MissingField("city link in meet row".to_string()))?;

    let city = normalize_whitespace(&elem_text(link));
    if city.is_empty() {
        return Err(ParseError::MissingField("city in meet row".to_string()));
    }

    // The link text is the city; the full meet name hides in the title attribute.
    let name = link
        .value()
        .attr("title")
        .map(normalize_whitespace)
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ParseError::MissingField("meet name in meet row".to_string()))?;

    let href = link
        .value()
        .attr("href")
        .ok_or_else(|| ParseError::MissingField("href attribute in meet row".to_string()))?;
    let id = id_param(href, "meetId")?;

    Ok(Meet {
        id,
        name,
        city,
        start_date,
        end_date,
    })
}

pub fn parse_meet_clubs(html: &str, meet_id: u32) -> Result<Vec<ClubEntry>, ParseError> {
    let document = Html::parse_document(html);

    let table_selector = Selector::parse("table.meetSearch").unwrap();
    let Some(table) = document.select(&table_selector).next() else {
        return Err(ParseError::MissingElement(format!(
            "table.meetSearch on meet {meet_id} page"
        )));
    };

    // Club rows reuse the result row classes.
    let row_selector = Selector::parse("tr.meetResult0, tr.meetResult1").unwrap();
    let mut clubs = Vec::new();
    for row in table.select(&row_selector) {
        match parse_club_row(row) {
            Ok(club) => clubs.push(club),
            Err(e) => log::warn!("Skipping club row: {}", e),
        }
    }

    Ok(clubs)
}

fn parse_club_row(row: ElementRef) -> Result<ClubEntry, ParseError> {
    let club_selector = Selector::parse("td.club a").unwrap();
    let link = row
        .select(&club_selector)
        .next()
        .ok_or_else(|| ParseError::MissingField("club link in club row".to_string()))?;

    let name = normalize_whitespace(&elem_text(link));
    if name.is_empty() {
        return Err(ParseError::MissingField("club name in club row".to_string()));
    }

    let href = link
        .value()
        .attr("href")
        .ok_or_else(|| ParseError::MissingField("href attribute in club row".to_string()))?;
    let id = id_param(href, "clubId")?;

    Ok(ClubEntry { id, name })
}

pub fn parse_meet_events(html: &str, meet_id: u32) -> Result<Vec<EventEntry>, ParseError> {
    let document = Html::parse_document(html);

    let table_selector = Selector::parse("table.navigation").unwrap();
    let Some(table) = document.select(&table_selector).next() else {
        return Err(ParseError::MissingElement(format!(
            "table.navigation on meet {meet_id} page"
        )));
    };

    let mut events = Vec::new();
    collect_gender_events(table, "Men's events:", Gender::Men, meet_id, &mut events)?;
    collect_gender_events(table, "Women's events:", Gender::Women, meet_id, &mut events)?;

    Ok(events)
}

fn collect_gender_events(
    table: ElementRef,
    label: &str,
    gender: Gender,
    meet_id: u32,
    events: &mut Vec<EventEntry>,
) -> Result<(), ParseError> {
    let cell_selector = Selector::parse("td.navigation").unwrap();
    let option_selector = Selector::parse("option").unwrap();

    let menu = table
        .select(&cell_selector)
        .find(|cell| normalize_whitespace(&elem_text(*cell)).contains(label))
        .ok_or_else(|| {
            ParseError::MissingElement(format!("'{label}' menu on meet {meet_id} page"))
        })?;

    for option in menu.select(&option_selector) {
        let Some(value) = option.value().attr("value") else {
            continue;
        };
        // Value "0" is the "all events" placeholder.
        if value == "0" {
            continue;
        }
        let Ok(id) = value.parse::<u32>() else {
            log::warn!("Skipping event option with value '{}'", value);
            continue;
        };
        let name = normalize_whitespace(&elem_text(option));
        if name.is_empty() {
            log::warn!("Skipping unnamed event option '{}'", value);
            continue;
        }
        events.push(EventEntry { id, gender, name });
    }

    Ok(())
}

pub fn parse_meet_races(html: &str, meet_id: u32) -> Result<Vec<Race>, ParseError> {
    let document = Html::parse_document(html);

    let table_selector = Selector::parse("table.meetResult").unwrap();
    let head_selector = Selector::parse("tr.meetResultHead th.event").unwrap();

    let mut races = Vec::new();
    for (index, table) in document.select(&table_selector).enumerate() {
        let name = table
            .select(&head_selector)
            .next()
            .map(|cell| normalize_whitespace(&elem_text(cell)))
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                ParseError::MissingField(format!(
                    "heading of results table {} on meet {meet_id} page",
                    index + 1
                ))
            })?;
        races.push(Race {
            number: index as u32 + 1,
            name,
        });
    }

    if races.is_empty() {
        return Err(ParseError::MissingElement(format!(
            "table.meetResult on meet {meet_id} page"
        )));
    }

    Ok(races)
}

pub fn parse_race_results(
    html: &str,
    meet_id: u32,
    race: u32,
) -> Result<Vec<RaceResult>, ParseError> {
    let document = Html::parse_document(html);

    let table_selector = Selector::parse("table.meetResult").unwrap();
    let table = (race as usize)
        .checked_sub(1)
        .and_then(|index| document.select(&table_selector).nth(index))
        .ok_or_else(|| {
            ParseError::MissingElement(format!("results table {race} on meet {meet_id} page"))
        })?;

    let row_selector = Selector::parse("tr.meetResult0, tr.meetResult1").unwrap();
    let mut results = Vec::new();
    for row in table.select(&row_selector) {
        match parse_result_row(row) {
            Ok(result) => results.push(result),
            Err(e) => log::warn!("Skipping result row: {}", e),
        }
    }

    Ok(results)
}

fn parse_result_row(row: ElementRef) -> Result<RaceResult, ParseError> {
    // First name cell links the athlete, the second their club.
    let name_selector = Selector::parse("td.name a").unwrap();
    let mut names = row.select(&name_selector);
    let athlete_link = names
        .next()
        .ok_or_else(|| ParseError::MissingField("athlete link in result row".to_string()))?;
    let club_link = names
        .next()
        .ok_or_else(|| ParseError::MissingField("club link in result row".to_string()))?;

    let athlete_name = normalize_whitespace(&elem_text(athlete_link));
    if athlete_name.is_empty() {
        return Err(ParseError::MissingField(
            "athlete name in result row".to_string(),
        ));
    }
    let athlete_href = athlete_link
        .value()
        .attr("href")
        .ok_or_else(|| ParseError::MissingField("athlete href in result row".to_string()))?;
    let athlete_id = query_param(athlete_href, "athleteId")
        .ok_or_else(|| {
            ParseError::UrlParse(format!("no 'athleteId' parameter in {athlete_href}"))
        })?
        .to_string();

    let club_name = normalize_whitespace(&elem_text(club_link));

    let time_selector = Selector::parse("td.swimtime a").unwrap();
    let time_link = row
        .select(&time_selector)
        .next()
        .ok_or_else(|| ParseError::MissingField("swim time link in result row".to_string()))?;
    let time = parse_swim_time(&elem_text(time_link))?;

    let splits = time_link
        .value()
        .attr("onmouseover")
        .map(extract_split_times)
        .unwrap_or_default();

    let href = time_link
        .value()
        .attr("href")
        .ok_or_else(|| ParseError::MissingField("result href in result row".to_string()))?;
    let result_id = id_param(href, "id")?;

    Ok(RaceResult {
        result_id,
        athlete_id,
        athlete_name,
        club_name,
        time,
        splits,
    })
}

fn extract_split_times(tooltip: &str) -> Vec<SwimTime> {
    RE_SPLIT_TIMES
        .captures_iter(tooltip)
        .filter_map(|caps| {
            let raw = caps[1].trim().to_string();
            match raw.parse::<SwimTime>() {
                Ok(time) => Some(time),
                Err(e) => {
                    log::warn!("Skipping split time '{}': {}", raw, e);
                    None
                }
            }
        })
        .collect()
}

pub fn parse_result_time(html: &str, result_id: u32) -> Result<SwimTime, ParseError> {
    let document = Html::parse_document(html);

    let time_selector = Selector::parse("td.swimtimeLarge").unwrap();
    let Some(cell) = document.select(&time_selector).next() else {
        return Err(ParseError::MissingElement(format!(
            "td.swimtimeLarge on result {result_id} page"
        )));
    };

    parse_swim_time(&elem_text(cell))
}

pub fn parse_time_periods(html: &str) -> Result<Vec<TimePeriod>, ParseError> {
    let document = Html::parse_document(html);

    let select_selector = Selector::parse("select[name=\"selectPage\"]").unwrap();
    let Some(menu) = document.select(&select_selector).next() else {
        return Err(ParseError::MissingElement(
            "select[name=selectPage] on meet calendar page".to_string(),
        ));
    };

    let option_selector = Selector::parse("option").unwrap();
    let mut periods = Vec::new();
    for option in menu.select(&option_selector) {
        let Some(value) = option.value().attr("value") else {
            continue;
        };
        // "RECENT" and "BYTYPE" are view switches, not time periods.
        if value == "RECENT" || value == "BYTYPE" {
            continue;
        }
        let name = normalize_whitespace(&elem_text(option));
        if name.is_empty() {
            log::warn!("Skipping unnamed time period '{}'", value);
            continue;
        }
        periods.push(TimePeriod {
            id: value.to_string(),
            name,
        });
    }

    Ok(periods)
}

pub fn parse_nations(html: &str) -> Result<Vec<Nation>, ParseError> {
    let document = Html::parse_document(html);

    let select_selector = Selector::parse("select[name=\"nationId\"]").unwrap();
    let Some(menu) = document.select(&select_selector).next() else {
        return Err(ParseError::MissingElement(
            "select[name=nationId] on meet calendar page".to_string(),
        ));
    };

    let option_selector = Selector::parse("option").unwrap();
    let mut nations = Vec::new();
    for option in menu.select(&option_selector) {
        let Some(value) = option.value().attr("value") else {
            continue;
        };
        // "$$$" is the "all nations" placeholder.
        if value == "$$$" {
            continue;
        }
        let name = normalize_whitespace(&elem_text(option));
        if name.is_empty() {
            log::warn!("Skipping unnamed nation '{}'", value);
            continue;
        }
        nations.push(Nation {
            id: value.to_string(),
            name,
        });
    }

    Ok(nations)
}

pub fn parse_meet_listings(html: &str) -> Result<Vec<MeetListing>, ParseError> {
    let document = Html::parse_document(html);

    // The period selector is always rendered; a period without meets has no tables.
    let select_selector = Selector::parse("select[name=\"selectPage\"]").unwrap();
    if document.select(&select_selector).next().is_none() {
        return Err(ParseError::MissingElement(
            "select[name=selectPage] on meet calendar page".to_string(),
        ));
    }

    let table_selector = Selector::parse("table.meetSearch").unwrap();
    let row_selector = Selector::parse("tr.meetSearch0, tr.meetSearch1").unwrap();

    let mut listings = Vec::new();
    for table in document.select(&table_selector) {
        for row in table.select(&row_selector) {
            match parse_listing_row(row) {
                Ok(listing) => listings.push(listing),
                Err(e) => log::warn!("Skipping meet listing row: {}", e),
            }
        }
    }

    Ok(listings)
}

fn parse_listing_row(row: ElementRef) -> Result<MeetListing, ParseError> {
    let date_selector = Selector::parse("td.date").unwrap();
    let date_text = row
        .select(&date_selector)
        .next()
        .map(elem_text)
        .ok_or_else(|| ParseError::MissingField("date cell in meet listing row".to_string()))?;
    let (start_date, end_date) = parse_date_range(&date_text)?;

    let city_selector = Selector::parse("td.city a").unwrap();
    let city_link = row
        .select(&city_selector)
        .next()
        .ok_or_else(|| ParseError::MissingField("city link in meet listing row".to_string()))?;
    let city = normalize_whitespace(&elem_text(city_link));
    if city.is_empty() {
        return Err(ParseError::MissingField(
            "city in meet listing row".to_string(),
        ));
    }
    let href = city_link
        .value()
        .attr("href")
        .ok_or_else(|| ParseError::MissingField("href attribute in meet listing row".to_string()))?;
    let id = id_param(href, "meetId")?;

    // First name cell holds the nation code, the second the meet name.
    let name_selector = Selector::parse("td.name").unwrap();
    let link_selector = Selector::parse("a").unwrap();
    let mut name_cells = row.select(&name_selector);
    let nation = name_cells
        .next()
        .map(|cell| normalize_whitespace(&elem_text(cell)))
        .filter(|nation| !nation.is_empty());
    let name = name_cells
        .next()
        .and_then(|cell| cell.select(&link_selector).next())
        .map(|link| normalize_whitespace(&elem_text(link)))
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ParseError::MissingField("meet name in meet listing row".to_string()))?;

    let course_selector = Selector::parse("td.course").unwrap();
    let course_text = row
        .select(&course_selector)
        .next()
        .map(|cell| normalize_whitespace(&elem_text(cell)))
        .ok_or_else(|| ParseError::MissingField("course cell in meet listing row".to_string()))?;
    let course = course_text
        .parse::<Course>()
        .map_err(|_| ParseError::InvalidCourse(course_text.clone()))?;

    Ok(MeetListing {
        id,
        name,
        city,
        nation,
        start_date,
        end_date,
        course,
    })
}

pub fn parse_club_athletes(html: &str, club_id: u32) -> Result<Vec<AthleteRef>, ParseError> {
    let document = Html::parse_document(html);

    let table_selector = Selector::parse("table.athleteList").unwrap();
    let row_selector = Selector::parse("tr.athleteSearch0, tr.athleteSearch1").unwrap();

    // Large rosters are rendered as several side-by-side tables.
    let mut found_table = false;
    let mut athletes = Vec::new();
    for table in document.select(&table_selector) {
        found_table = true;
        for row in table.select(&row_selector) {
            match parse_roster_row(row) {
                Ok(athlete) => athletes.push(athlete),
                Err(e) => log::warn!("Skipping roster row: {}", e),
            }
        }
    }

    if !found_table {
        return Err(ParseError::MissingElement(format!(
            "table.athleteList on club {club_id} page"
        )));
    }

    Ok(athletes)
}

fn parse_roster_row(row: ElementRef) -> Result<AthleteRef, ParseError> {
    let name_selector = Selector::parse("td.name a").unwrap();
    let link = row
        .select(&name_selector)
        .next()
        .ok_or_else(|| ParseError::MissingField("athlete link in roster row".to_string()))?;

    let name = normalize_whitespace(&elem_text(link));
    if name.is_empty() {
        return Err(ParseError::MissingField(
            "athlete name in roster row".to_string(),
        ));
    }

    let href = link
        .value()
        .attr("href")
        .ok_or_else(|| ParseError::MissingField("href attribute in roster row".to_string()))?;
    let id = query_param(href, "athleteId")
        .ok_or_else(|| ParseError::UrlParse(format!("no 'athleteId' parameter in {href}")))?
        .to_string();

    Ok(AthleteRef { id, name })
}

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

fn normalize_whitespace(text: &str) -> String {
    // Also folds non-breaking spaces, which the site uses liberally.
    text.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn query_param<'a>(url: &'a str, key: &str) -> Option<&'a str> {
    let query = url.split_once('?').map_or(url, |(_, query)| query);
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then_some(v)
    })
}

fn id_param(url: &str, key: &str) -> Result<u32, ParseError> {
    let raw = query_param(url, key)
        .ok_or_else(|| ParseError::UrlParse(format!("no '{key}' parameter in {url}")))?;
    raw.parse()
        .map_err(|_| ParseError::NumberParse(format!("{key}={raw}")))
}

fn parse_swim_time(text: &str) -> Result<SwimTime, ParseError> {
    let normalized = normalize_whitespace(text);
    normalized
        .parse::<SwimTime>()
        .map_err(|_| ParseError::TimeParse(normalized.clone()))
}

// Dates render as "5 Apr 2024" or "5 Apr 2024 - 7 Apr 2024".
fn parse_date_range(text: &str) -> Result<(NaiveDate, Option<NaiveDate>), ParseError> {
    let normalized = normalize_whitespace(text);
    let (start_text, end_text) = if let Some((start, end)) = normalized.split_once(" - ") {
        (start, Some(end))
    } else if let Some((start, end)) = normalized.split_once(" \u{2013} ") {
        (start, Some(end))
    } else {
        (normalized.as_str(), None)
    };

    let start_date = parse_site_date(start_text)?;
    let end_date = end_text.map(parse_site_date).transpose()?;
    Ok((start_date, end_date))
}

fn parse_site_date(text: &str) -> Result<NaiveDate, ParseError> {
    NaiveDate::parse_from_str(text.trim(), "%d %b %Y")
        .map_err(|_| ParseError::DateParse(text.to_string()))
}
