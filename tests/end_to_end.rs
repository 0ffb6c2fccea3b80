use swimrankings_scraper::scraper::FetchError;
use swimrankings_scraper::types::{Course, Gender, RosterScope};
use swimrankings_scraper::{ScraperConfig, ScraperError, SwimrankingsScraper};

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

const ATHLETE_DETAIL: &str = include_str!("../fixtures/athlete_detail_4292888");
const ATHLETE_MEETS: &str = include_str!("../fixtures/athlete_meets_4292888");
const ATHLETE_NOT_FOUND: &str = include_str!("../fixtures/athlete_not_found");
const MEET_DETAIL: &str = include_str!("../fixtures/meet_detail_642564");
const MEET_RESULTS: &str = include_str!("../fixtures/meet_results_642564_m_100free");
const RESULT_DETAIL: &str = include_str!("../fixtures/result_detail_88112233");
const MEET_SELECT: &str = include_str!("../fixtures/meet_select_recent");
const CLUB_ROSTER: &str = include_str!("../fixtures/club_roster_65929");

// Serves canned site pages over plain HTTP, routed on the query string.
fn spawn_site() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind mock server");
    let addr = listener.local_addr().expect("Failed to read local addr");

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            if let Err(e) = serve(&mut stream, None) {
                eprintln!("mock server error: {e}");
            }
        }
    });

    format!("http://{addr}/index.php")
}

// Same shape, but every request is answered with the given status line.
fn spawn_broken_site(status: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind mock server");
    let addr = listener.local_addr().expect("Failed to read local addr");

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { continue };
            if let Err(e) = serve(&mut stream, Some(status)) {
                eprintln!("mock server error: {e}");
            }
        }
    });

    format!("http://{addr}/index.php")
}

fn serve(stream: &mut TcpStream, forced_status: Option<&str>) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;

    // Drain the header section.
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 || line == "\r\n" {
            break;
        }
    }

    let target = request_line.split_whitespace().nth(1).unwrap_or("/");
    let (status, body) = match forced_status {
        Some(status) => (status, "<html><body>Server error</body></html>"),
        None => route(target),
    };

    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len(),
    );
    stream.write_all(response.as_bytes())?;
    stream.flush()
}

fn route(target: &str) -> (&'static str, &'static str) {
    // Most specific query parameters first.
    if target.contains("athletePage=MEET") {
        ("200 OK", ATHLETE_MEETS)
    } else if target.contains("athleteId=999999999") {
        ("200 OK", ATHLETE_NOT_FOUND)
    } else if target.contains("page=athleteDetail") {
        ("200 OK", ATHLETE_DETAIL)
    } else if target.contains("styleId=") {
        ("200 OK", MEET_RESULTS)
    } else if target.contains("page=meetDetail") {
        ("200 OK", MEET_DETAIL)
    } else if target.contains("page=resultDetail") {
        ("200 OK", RESULT_DETAIL)
    } else if target.contains("page=meetSelect") {
        ("200 OK", MEET_SELECT)
    } else if target.contains("page=rankingDetail") {
        ("200 OK", CLUB_ROSTER)
    } else {
        ("404 Not Found", "<html><body>Not found</body></html>")
    }
}

fn scraper_at(base_url: String) -> SwimrankingsScraper {
    let _ = env_logger::builder().is_test(true).try_init();

    let config = ScraperConfig {
        base_url,
        timeout: Duration::from_secs(5),
        ..ScraperConfig::default()
    };
    SwimrankingsScraper::with_config(config).expect("Failed to build scraper")
}

fn scraper() -> SwimrankingsScraper {
    scraper_at(spawn_site())
}

#[test]
fn test_get_athlete_returns_populated_athlete() {
    let scraper = scraper();

    let athlete = scraper
        .get_athlete("4292888")
        .expect("Failed to fetch athlete");

    assert_eq!(athlete.id(), "4292888");
    assert_eq!(athlete.name(), "TOUSSAINT, Kira");

    let profile = athlete.profile();
    assert_eq!(profile.birth_year, Some(1994));
    assert_eq!(profile.gender, Some(Gender::Women));
    assert_eq!(profile.nation.as_deref(), Some("NED - Netherlands"));
    assert_eq!(profile.club.as_deref(), Some("AZC Alphen aan den Rijn"));
}

#[test]
fn test_get_athlete_not_found() {
    let scraper = scraper();

    let err = scraper
        .get_athlete("999999999")
        .expect_err("Expected a not-found error");

    assert!(
        matches!(err, ScraperError::AthleteNotFound(ref id) if id == "999999999"),
        "Expected AthleteNotFound, got {:?}",
        err
    );
}

#[test]
fn test_list_meets_is_ordered_and_repeatable() {
    let scraper = scraper();
    let athlete = scraper
        .get_athlete("4292888")
        .expect("Failed to fetch athlete");

    let meets = athlete.list_meets().expect("Failed to list meets");
    assert!(!meets.is_empty(), "Expected at least one meet");

    let ids: Vec<u32> = meets.iter().map(|meet| meet.id).collect();
    assert_eq!(ids, vec![642564, 640112, 635890]);
    assert!(
        meets
            .windows(2)
            .all(|pair| pair[0].start_date >= pair[1].start_date),
        "Meets must keep the page's newest-first order"
    );

    let again = athlete.list_meets().expect("Failed to list meets again");
    assert_eq!(meets, again);
}

#[test]
fn test_list_personal_bests() {
    let scraper = scraper();
    let athlete = scraper
        .get_athlete("4292888")
        .expect("Failed to fetch athlete");

    let bests = athlete
        .list_personal_bests(None)
        .expect("Failed to list best times");

    assert_eq!(bests.len(), 4, "Expected 4 best times, got {}", bests.len());
    assert_eq!(bests[0].event, "50m Backstroke");
    assert_eq!(bests[0].course, Course::ShortCourse);
    assert_eq!(bests[0].time.to_string(), "25.67");
    assert_eq!(bests[0].fina_points, Some(931));

    let season = athlete
        .list_personal_bests(Some("2024"))
        .expect("Failed to list seasonal best times");
    assert_eq!(season.len(), 4);
}

#[test]
fn test_meet_traversal() {
    let scraper = scraper();
    let meet = scraper.get_meet(642564);

    let clubs = meet.list_clubs().expect("Failed to list clubs");
    assert_eq!(clubs.len(), 3);
    assert_eq!(clubs[0].id, 65929);
    assert_eq!(clubs[0].name, "AZC Alphen aan den Rijn");

    let events = meet.list_events().expect("Failed to list events");
    assert_eq!(events.len(), 4);
    let men_100_free = events
        .iter()
        .find(|event| event.gender == Gender::Men && event.name == "100m Freestyle")
        .expect("Expected a men's 100m Freestyle event");

    let races = meet
        .list_races(men_100_free.id, Gender::Men)
        .expect("Failed to list races");
    assert_eq!(races.len(), 2);
    assert_eq!(races[0].number, 1);
    assert_eq!(races[0].name, "100m Freestyle - Final");

    let results = meet
        .list_results(men_100_free.id, Gender::Men, 1)
        .expect("Failed to list results");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].athlete_id, "5001234");
    assert_eq!(results[0].athlete_name, "KOOPMAN, Daan");
    assert_eq!(results[0].club_name, "PSV Eindhoven");
    assert_eq!(results[0].time.centiseconds(), 5_240);

    let splits: Vec<String> = results[0]
        .splits
        .iter()
        .map(|split| split.to_string())
        .collect();
    assert_eq!(splits, vec!["25.12", "52.40"]);
}

#[test]
fn test_list_results_out_of_range() {
    let scraper = scraper();
    let meet = scraper.get_meet(642564);

    let err = meet
        .list_results(18, Gender::Men, 7)
        .expect_err("Expected an out-of-range error");

    assert!(
        matches!(
            err,
            ScraperError::RaceOutOfRange {
                requested: 7,
                last: 2
            }
        ),
        "Expected RaceOutOfRange, got {:?}",
        err
    );
}

#[test]
fn test_result_detail_swim_time() {
    let scraper = scraper();
    let result = scraper.get_result(88112233);

    let time = result.swim_time().expect("Failed to fetch result time");
    assert_eq!(time.centiseconds(), 5_240);
    assert_eq!(time.to_string(), "52.40");
}

#[test]
fn test_meet_catalog() {
    let scraper = scraper();
    let catalog = scraper.get_meets();

    let periods = catalog.time_periods().expect("Failed to list periods");
    assert_eq!(periods.len(), 3);
    assert_eq!(periods[0].id, "2024_m04");

    let nations = catalog.nations().expect("Failed to list nations");
    assert_eq!(nations.len(), 2);
    assert_eq!(nations[0].name, "Netherlands");

    let listings = catalog
        .list_meets(None, None)
        .expect("Failed to list meets");
    assert_eq!(listings.len(), 3);
    assert_eq!(listings[0].id, 642564);
    assert_eq!(listings[0].course, Course::LongCourse);

    let scoped = catalog
        .list_meets(Some("273"), Some("2024_m03"))
        .expect("Failed to list scoped meets");
    assert_eq!(scoped.len(), 3);
}

#[test]
fn test_club_roster() {
    let scraper = scraper();
    let club = scraper.get_club(65929);

    let athletes = club
        .list_athletes(RosterScope::default())
        .expect("Failed to list roster");
    assert_eq!(athletes.len(), 3);
    assert_eq!(athletes[0].id, "4292888");
    assert_eq!(athletes[0].name, "TOUSSAINT, Kira");

    let women = club
        .list_athletes(RosterScope::AllWomen)
        .expect("Failed to list women's roster");
    assert_eq!(women.len(), 3);
}

#[test]
fn test_server_error_maps_to_bad_status() {
    let scraper = scraper_at(spawn_broken_site("500 Internal Server Error"));

    let err = scraper
        .get_athlete("4292888")
        .expect_err("Expected a status error");

    assert!(
        matches!(
            err,
            ScraperError::Fetch(FetchError::BadStatus { status, .. }) if status.as_u16() == 500
        ),
        "Expected BadStatus, got {:?}",
        err
    );
}
