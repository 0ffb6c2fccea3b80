use crate::parser::{self, ParseError};
use crate::types::{
    AthleteProfile, AthleteRef, ClubEntry, EventEntry, Gender, Meet, MeetListing, Nation,
    PersonalBest, Race, RaceResult, RosterScope, SwimTime, TimePeriod,
};

use reqwest::StatusCode;
use reqwest::blocking::Client;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected status {status} for {url}")]
    BadStatus { status: StatusCode, url: String },
}

#[derive(Debug, thiserror::Error)]
pub enum ScraperError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Athlete {0} not found")]
    AthleteNotFound(String),

    #[error("Race {requested} is out of range, the last race is {last}")]
    RaceOutOfRange { requested: u32, last: u32 },
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub max_requests: usize,
    pub request_window: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: crate::BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            max_requests: 15,
            request_window: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionManager {
    client: Client,
    base_url: String,
    history: Arc<Mutex<Vec<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl SessionManager {
    pub fn new(config: &ScraperConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            history: Arc::new(Mutex::new(Vec::new())),
            max_requests: config.max_requests,
            window: config.request_window,
        })
    }

    pub(crate) fn get_page(&self, params: &[(&str, &str)]) -> Result<String, FetchError> {
        self.throttle();

        let response = self
            .client
            .get(&self.base_url)
            .query(params)
            .send()
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?;

        let status = response.status();
        if !status.is_success() {
            let url = response.url().to_string();
            log::error!("Unexpected status {} for {}", status, url);
            return Err(FetchError::BadStatus { status, url });
        }

        response
            .text()
            .inspect_err(|e| log::error!("Decode error: {e:?}"))
            .map_err(FetchError::from)
    }

    // Sliding window over request timestamps. The lock is held while
    // sleeping so that clones of the session queue instead of bursting.
    fn throttle(&self) {
        let mut history = self
            .history
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let now = Instant::now();
        history.retain(|instant| now.duration_since(*instant) < self.window);

        if history.len() >= self.max_requests
            && let Some(oldest) = history.first().copied()
        {
            let wait = self.window.saturating_sub(now.duration_since(oldest));
            log::debug!("Request budget exhausted, waiting {:?}", wait);
            thread::sleep(wait);

            let now = Instant::now();
            history.retain(|instant| now.duration_since(*instant) < self.window);
        }

        history.push(Instant::now());
    }
}

// Unknown athlete ids come back as a regular 200 page with an error body.
fn is_not_found(html: &str) -> bool {
    html.contains("Athlete not found")
}

#[derive(Debug, Clone)]
pub struct SwimrankingsScraper {
    session: SessionManager,
}

impl SwimrankingsScraper {
    pub fn new() -> Result<Self, ScraperError> {
        Self::with_config(ScraperConfig::default())
    }

    pub fn with_config(config: ScraperConfig) -> Result<Self, ScraperError> {
        let session = SessionManager::new(&config)?;
        Ok(Self { session })
    }

    pub fn get_athlete(&self, athlete_id: &str) -> Result<Athlete, ScraperError> {
        log::info!("Fetching profile of athlete {athlete_id}...");

        let html = self
            .session
            .get_page(&[("page", "athleteDetail"), ("athleteId", athlete_id)])?;
        if is_not_found(&html) {
            return Err(ScraperError::AthleteNotFound(athlete_id.to_string()));
        }
        let profile = parser::parse_athlete_profile(&html, athlete_id)?;

        Ok(Athlete {
            session: self.session.clone(),
            id: athlete_id.to_string(),
            profile,
        })
    }

    pub fn get_meet(&self, meet_id: u32) -> MeetDetail {
        MeetDetail {
            session: self.session.clone(),
            id: meet_id,
        }
    }

    pub fn get_result(&self, result_id: u32) -> ResultDetail {
        ResultDetail {
            session: self.session.clone(),
            id: result_id,
        }
    }

    pub fn get_meets(&self) -> MeetCatalog {
        MeetCatalog {
            session: self.session.clone(),
        }
    }

    pub fn get_club(&self, club_id: u32) -> Club {
        Club {
            session: self.session.clone(),
            id: club_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Athlete {
    session: SessionManager,
    id: String,
    profile: AthleteProfile,
}

impl Athlete {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn profile(&self) -> &AthleteProfile {
        &self.profile
    }

    pub fn list_meets(&self) -> Result<Vec<Meet>, ScraperError> {
        log::info!("Fetching meets of athlete {}...", self.id);

        let html = self.session.get_page(&[
            ("page", "athleteDetail"),
            ("athleteId", &self.id),
            ("athletePage", "MEET"),
        ])?;
        Ok(parser::parse_athlete_meets(&html, &self.id)?)
    }

    pub fn list_personal_bests(
        &self,
        season: Option<&str>,
    ) -> Result<Vec<PersonalBest>, ScraperError> {
        log::info!("Fetching best times of athlete {}...", self.id);

        let html = self.session.get_page(&[
            ("page", "athleteDetail"),
            ("athleteId", &self.id),
            ("pbest", season.unwrap_or("")),
        ])?;
        Ok(parser::parse_personal_bests(&html, &self.id)?)
    }
}

#[derive(Debug, Clone)]
pub struct MeetDetail {
    session: SessionManager,
    id: u32,
}

impl MeetDetail {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn list_clubs(&self) -> Result<Vec<ClubEntry>, ScraperError> {
        log::info!("Fetching clubs of meet {}...", self.id);

        let meet_id = self.id.to_string();
        let html = self
            .session
            .get_page(&[("page", "meetDetail"), ("meetId", meet_id.as_str())])?;
        Ok(parser::parse_meet_clubs(&html, self.id)?)
    }

    pub fn list_events(&self) -> Result<Vec<EventEntry>, ScraperError> {
        log::info!("Fetching events of meet {}...", self.id);

        let meet_id = self.id.to_string();
        let html = self
            .session
            .get_page(&[("page", "meetDetail"), ("meetId", meet_id.as_str())])?;
        Ok(parser::parse_meet_events(&html, self.id)?)
    }

    pub fn list_races(&self, event_id: u32, gender: Gender) -> Result<Vec<Race>, ScraperError> {
        log::info!("Fetching races of event {} at meet {}...", event_id, self.id);

        let html = self.results_page(event_id, gender)?;
        Ok(parser::parse_meet_races(&html, self.id)?)
    }

    pub fn list_results(
        &self,
        event_id: u32,
        gender: Gender,
        race: u32,
    ) -> Result<Vec<RaceResult>, ScraperError> {
        log::info!(
            "Fetching results of race {} of event {} at meet {}...",
            race,
            event_id,
            self.id
        );

        let html = self.results_page(event_id, gender)?;
        let races = parser::parse_meet_races(&html, self.id)?;
        let last = races.len() as u32;
        if race == 0 || race > last {
            return Err(ScraperError::RaceOutOfRange {
                requested: race,
                last,
            });
        }
        Ok(parser::parse_race_results(&html, self.id, race)?)
    }

    fn results_page(&self, event_id: u32, gender: Gender) -> Result<String, FetchError> {
        let meet_id = self.id.to_string();
        let event_id = event_id.to_string();
        self.session.get_page(&[
            ("page", "meetDetail"),
            ("meetId", meet_id.as_str()),
            ("gender", gender.code()),
            ("styleId", event_id.as_str()),
        ])
    }
}

#[derive(Debug, Clone)]
pub struct ResultDetail {
    session: SessionManager,
    id: u32,
}

impl ResultDetail {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn swim_time(&self) -> Result<SwimTime, ScraperError> {
        log::info!("Fetching result {}...", self.id);

        let result_id = self.id.to_string();
        let html = self
            .session
            .get_page(&[("page", "resultDetail"), ("id", result_id.as_str())])?;
        Ok(parser::parse_result_time(&html, self.id)?)
    }
}

#[derive(Debug, Clone)]
pub struct MeetCatalog {
    session: SessionManager,
}

impl MeetCatalog {
    pub fn time_periods(&self) -> Result<Vec<TimePeriod>, ScraperError> {
        log::info!("Fetching meet calendar periods...");

        let html = self.calendar_page()?;
        Ok(parser::parse_time_periods(&html)?)
    }

    pub fn nations(&self) -> Result<Vec<Nation>, ScraperError> {
        log::info!("Fetching meet calendar nations...");

        let html = self.calendar_page()?;
        Ok(parser::parse_nations(&html)?)
    }

    pub fn list_meets(
        &self,
        nation: Option<&str>,
        period: Option<&str>,
    ) -> Result<Vec<MeetListing>, ScraperError> {
        log::info!("Fetching meet listings...");

        let mut params = vec![
            ("page", "meetSelect"),
            ("selectPage", period.unwrap_or("RECENT")),
        ];
        if let Some(nation) = nation {
            params.push(("nationId", nation));
        }
        let html = self.session.get_page(&params)?;
        Ok(parser::parse_meet_listings(&html)?)
    }

    fn calendar_page(&self) -> Result<String, FetchError> {
        self.session.get_page(&[
            ("page", "meetSelect"),
            ("nationId", "0"),
            ("selectPage", "RECENT"),
        ])
    }
}

#[derive(Debug, Clone)]
pub struct Club {
    session: SessionManager,
    id: u32,
}

impl Club {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn list_athletes(&self, scope: RosterScope) -> Result<Vec<AthleteRef>, ScraperError> {
        log::info!("Fetching roster of club {}...", self.id);

        // Stroke "9" is the all-strokes ranking, which lists every athlete.
        let club_id = self.id.to_string();
        let html = self.session.get_page(&[
            ("page", "rankingDetail"),
            ("clubId", club_id.as_str()),
            ("stroke", "9"),
            ("athleteGender", scope.param()),
        ])?;
        Ok(parser::parse_club_athletes(&html, self.id)?)
    }
}
