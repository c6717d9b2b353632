use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::{Error, Result};

/// Session within a race weekend, in running order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Practice1,
    Practice2,
    Practice3,
    SprintQualifying,
    Sprint,
    Qualifying,
    Race,
}

impl SessionType {
    pub const ALL: [SessionType; 7] = [
        SessionType::Practice1,
        SessionType::Practice2,
        SessionType::Practice3,
        SessionType::SprintQualifying,
        SessionType::Sprint,
        SessionType::Qualifying,
        SessionType::Race,
    ];

    /// Slug used inside canonical key strings and file names
    pub fn slug(&self) -> &'static str {
        match self {
            SessionType::Practice1 => "practice1",
            SessionType::Practice2 => "practice2",
            SessionType::Practice3 => "practice3",
            SessionType::SprintQualifying => "sprint-qualifying",
            SessionType::Sprint => "sprint",
            SessionType::Qualifying => "qualifying",
            SessionType::Race => "race",
        }
    }

    /// Timing-screen abbreviation (FP1, Q, R, ...)
    pub fn short(&self) -> &'static str {
        match self {
            SessionType::Practice1 => "FP1",
            SessionType::Practice2 => "FP2",
            SessionType::Practice3 => "FP3",
            SessionType::SprintQualifying => "SQ",
            SessionType::Sprint => "S",
            SessionType::Qualifying => "Q",
            SessionType::Race => "R",
        }
    }

    /// Session name as used by the live timing feed
    pub fn label(&self) -> &'static str {
        match self {
            SessionType::Practice1 => "Practice 1",
            SessionType::Practice2 => "Practice 2",
            SessionType::Practice3 => "Practice 3",
            SessionType::SprintQualifying => "Sprint Qualifying",
            SessionType::Sprint => "Sprint",
            SessionType::Qualifying => "Qualifying",
            SessionType::Race => "Race",
        }
    }

    /// Sessions that score championship points
    pub fn awards_points(&self) -> bool {
        matches!(self, SessionType::Race | SessionType::Sprint)
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug())
    }
}

impl FromStr for SessionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let compact: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();

        match compact.as_str() {
            "fp1" | "p1" | "practice1" | "freepractice1" => Ok(SessionType::Practice1),
            "fp2" | "p2" | "practice2" | "freepractice2" => Ok(SessionType::Practice2),
            "fp3" | "p3" | "practice3" | "freepractice3" => Ok(SessionType::Practice3),
            "sq" | "ss" | "sprintqualifying" | "sprintshootout" => {
                Ok(SessionType::SprintQualifying)
            }
            "s" | "sprint" | "sprintrace" => Ok(SessionType::Sprint),
            "q" | "quali" | "qualifying" => Ok(SessionType::Qualifying),
            "r" | "race" | "gp" | "grandprix" => Ok(SessionType::Race),
            _ => Err(Error::InvalidSessionType(s.to_string())),
        }
    }
}

static NOISE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(formula\s*(1|one)|grand\s+prix|gp|f1)\b").unwrap());
static NON_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

// alias -> canonical slug
const EVENT_ALIASES: &[(&str, &str)] = &[
    ("sakhir", "bahrain"),
    ("saudi-arabian", "saudi-arabia"),
    ("jeddah", "saudi-arabia"),
    ("australian", "australia"),
    ("melbourne", "australia"),
    ("albert-park", "australia"),
    ("japanese", "japan"),
    ("suzuka", "japan"),
    ("chinese", "china"),
    ("shanghai", "china"),
    ("imola", "emilia-romagna"),
    ("monte-carlo", "monaco"),
    ("canadian", "canada"),
    ("montreal", "canada"),
    ("spanish", "spain"),
    ("barcelona", "spain"),
    ("catalunya", "spain"),
    ("austrian", "austria"),
    ("spielberg", "austria"),
    ("red-bull-ring", "austria"),
    ("british", "great-britain"),
    ("silverstone", "great-britain"),
    ("uk", "great-britain"),
    ("hungarian", "hungary"),
    ("hungaroring", "hungary"),
    ("budapest", "hungary"),
    ("belgian", "belgium"),
    ("spa", "belgium"),
    ("spa-francorchamps", "belgium"),
    ("dutch", "netherlands"),
    ("zandvoort", "netherlands"),
    ("italian", "italy"),
    ("monza", "italy"),
    ("baku", "azerbaijan"),
    ("marina-bay", "singapore"),
    ("usa", "united-states"),
    ("us", "united-states"),
    ("cota", "united-states"),
    ("austin", "united-states"),
    ("circuit-of-the-americas", "united-states"),
    ("mexican", "mexico"),
    ("mexico-city", "mexico"),
    ("brazil", "sao-paulo"),
    ("brazilian", "sao-paulo"),
    ("interlagos", "sao-paulo"),
    ("vegas", "las-vegas"),
    ("lusail", "qatar"),
    ("losail", "qatar"),
    ("yas-marina", "abu-dhabi"),
    ("yas-island", "abu-dhabi"),
    ("portuguese", "portugal"),
    ("portimao", "portugal"),
    ("turkish", "turkey"),
    ("istanbul", "turkey"),
    ("french", "france"),
    ("paul-ricard", "france"),
    ("le-castellet", "france"),
    ("russian", "russia"),
    ("sochi", "russia"),
    ("styrian", "styria"),
    ("tuscan", "tuscany"),
    ("mugello", "tuscany"),
    ("nurburgring", "eifel"),
];

enum SeasonOverride {
    Distinct(&'static str),
    Ambiguous(&'static [&'static str]),
}

// Seasons where an alias names its own event or several events at one venue
const SEASON_OVERRIDES: &[(i32, &str, SeasonOverride)] = &[
    (2020, "sakhir", SeasonOverride::Distinct("sakhir")),
    (
        2020,
        "spielberg",
        SeasonOverride::Ambiguous(&["austria", "styria"]),
    ),
    (
        2020,
        "red-bull-ring",
        SeasonOverride::Ambiguous(&["austria", "styria"]),
    ),
    (
        2021,
        "spielberg",
        SeasonOverride::Ambiguous(&["austria", "styria"]),
    ),
    (
        2021,
        "red-bull-ring",
        SeasonOverride::Ambiguous(&["austria", "styria"]),
    ),
    (
        2020,
        "silverstone",
        SeasonOverride::Ambiguous(&["great-britain", "70th-anniversary"]),
    ),
    (
        2020,
        "bahrain-international-circuit",
        SeasonOverride::Ambiguous(&["bahrain", "sakhir"]),
    ),
];

fn fold_diacritics(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        other => other,
    }
}

/// Lowercase, strip "Grand Prix"-style noise and collapse to a dash slug
pub fn slugify(raw: &str) -> String {
    let folded: String = raw.to_lowercase().chars().map(fold_diacritics).collect();
    let without_noise = NOISE.replace_all(&folded, " ");
    NON_ALNUM
        .replace_all(&without_noise, "-")
        .trim_matches('-')
        .to_string()
}

/// Canonical event identifier (case- and alias-insensitive Grand Prix name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    /// Resolve a free-form event name within a season
    pub fn resolve(season: i32, raw: &str) -> Result<Self> {
        let slug = slugify(raw);
        if slug.is_empty() {
            return Err(Error::InvalidEvent(raw.to_string()));
        }

        if let Some((_, _, rule)) = SEASON_OVERRIDES
            .iter()
            .find(|(year, alias, _)| *year == season && *alias == slug)
        {
            return match rule {
                SeasonOverride::Distinct(canonical) => Ok(Self(canonical.to_string())),
                SeasonOverride::Ambiguous(candidates) => Err(Error::AmbiguousEvent {
                    season,
                    alias: slug,
                    candidates: candidates.iter().map(|c| c.to_string()).collect(),
                }),
            };
        }

        let canonical = EVENT_ALIASES
            .iter()
            .find(|(alias, _)| *alias == slug)
            .map(|(_, canonical)| canonical.to_string())
            .unwrap_or(slug);

        Ok(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for EventId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identity of one session: (season, event, session type)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionKey {
    pub season: i32,
    pub event: EventId,
    pub session_type: SessionType,
}

impl SessionKey {
    pub fn new(season: i32, event: &str, session_type: SessionType) -> Result<Self> {
        Ok(Self {
            season,
            event: EventId::resolve(season, event)?,
            session_type,
        })
    }

    /// `season-event-sessionType`, e.g. `2024-monaco-race`
    pub fn canonical(&self) -> String {
        format!(
            "{}-{}-{}",
            self.season,
            self.event.as_str(),
            self.session_type.slug()
        )
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

impl FromStr for SessionKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (season_str, rest) = s
            .split_once('-')
            .ok_or_else(|| Error::InvalidKey(format!("expected season-event-session: {}", s)))?;

        let season: i32 = season_str
            .parse()
            .map_err(|_| Error::InvalidKey(format!("invalid season '{}'", season_str)))?;

        // Longest session slug first: "sprint-qualifying" also ends with "-qualifying"
        let mut by_length = SessionType::ALL;
        by_length.sort_by_key(|t| std::cmp::Reverse(t.slug().len()));

        for session_type in by_length {
            let suffix = format!("-{}", session_type.slug());
            if let Some(event) = rest.strip_suffix(&suffix)
                && !event.is_empty()
            {
                return SessionKey::new(season, event, session_type);
            }
        }

        // Accept short forms such as "2024-monaco-r"
        if let Some((event, session)) = rest.rsplit_once('-')
            && let Ok(session_type) = session.parse::<SessionType>()
        {
            return SessionKey::new(season, event, session_type);
        }

        Err(Error::InvalidKey(format!("missing session type: {}", s)))
    }
}
