/// Word lists and scoring constants for quality validation and dedup.
/// Threshold values are behavioral contracts shared with downstream report
/// consumers; change them only together with the rule documentation.

// Name rules
pub const NAME_MIN_LEN: usize = 3;
pub const NAME_MAX_LEN: usize = 500;
pub const NAME_PLACEHOLDERS: &[&str] = &["event", "untitled", "no title", "test", "sample"];
pub const NAME_UPPERCASE_MIN_LEN: usize = 10;
pub const NAME_SPECIAL_CHAR_RATIO: f64 = 0.3;

// Phrases that mark a record as likely spam wherever they appear
pub const SPAM_PHRASES: &[&str] = &[
    "click here",
    "call now",
    "limited time",
    "act now",
    "free money",
    "guaranteed",
    "no risk",
    "special promotion",
    "urgent",
    "winner",
    "congratulations",
    "selected",
    "claim",
    "prize",
];

// Description rules
pub const DESCRIPTION_MIN_LEN: usize = 10;
pub const DESCRIPTION_MAX_LEN: usize = 5000;
pub const DESCRIPTION_PLACEHOLDERS: &[&str] = &[
    "lorem ipsum",
    "placeholder",
    "sample text",
    "test description",
    "description here",
    "add description",
    "no description",
];
pub const DESCRIPTION_SENTENCE_CHECK_LEN: usize = 100;
pub const DESCRIPTION_WORD_REPEAT_RATIO: f64 = 0.2;

// Location rules
pub const LOCATION_MIN_LEN: usize = 3;
pub const LOCATION_MAX_LEN: usize = 200;
pub const LOCATION_PLACEHOLDERS: &[&str] =
    &["location", "venue", "place", "tbd", "tba", "unknown"];
pub const LOCATION_GAZETTEER_MIN_LEN: usize = 10;

/// Known place names checked against normalized location text. Croatian
/// cities and regions the scrapers cover, plus the country itself.
pub const KNOWN_PLACES: &[&str] = &[
    "zagreb",
    "split",
    "rijeka",
    "osijek",
    "zadar",
    "pula",
    "dubrovnik",
    "sibenik",
    "varazdin",
    "karlovac",
    "sisak",
    "slavonski brod",
    "vinkovci",
    "vukovar",
    "bjelovar",
    "koprivnica",
    "cakovec",
    "pozega",
    "virovitica",
    "krizevci",
    "samobor",
    "velika gorica",
    "zapresic",
    "rovinj",
    "porec",
    "umag",
    "opatija",
    "crikvenica",
    "makarska",
    "trogir",
    "kastela",
    "solin",
    "metkovic",
    "gospic",
    "otocak",
    "croatia",
    "hrvatska",
];

// Date rules
pub const DATE_MAX_FUTURE_DAYS: i64 = 730;
pub const DATE_MIN_YEAR: i32 = 2020;
pub const DATE_MAX_YEAR: i32 = 2030;

// URL rules
pub const SUSPICIOUS_HOSTS: &[&str] = &["localhost", "127.0.0.1", "example.com", "test.com"];

// Composite quality score: per-field weight and the issue count at which
// the full weight is deducted.
pub const NAME_WEIGHT: f64 = 30.0;
pub const NAME_MAX_ISSUES: f64 = 5.0;
pub const DESCRIPTION_WEIGHT: f64 = 25.0;
pub const DESCRIPTION_MAX_ISSUES: f64 = 5.0;
pub const LOCATION_WEIGHT: f64 = 20.0;
pub const LOCATION_MAX_ISSUES: f64 = 4.0;
pub const DATE_WEIGHT: f64 = 15.0;
pub const DATE_MAX_ISSUES: f64 = 1.0;
pub const URL_WEIGHT: f64 = 10.0;
pub const URL_MAX_ISSUES: f64 = 3.0;

/// Score below which an otherwise-valid record gets a low-quality warning.
pub const LOW_QUALITY_WARNING_SCORE: f64 = 70.0;

// Report thresholds
pub const REPORT_HIGH_QUALITY_SCORE: f64 = 80.0;
pub const REPORT_MEDIUM_QUALITY_SCORE: f64 = 60.0;
pub const REPORT_TOP_ISSUES: usize = 10;
pub const REPORT_SUCCESS_RATE_FLOOR: f64 = 0.5;
pub const REPORT_AVG_SCORE_FLOOR: f64 = 70.0;
pub const REPORT_DUPLICATE_RATE_CEILING: f64 = 0.2;

/// Default window (days either side) when querying the store for
/// date-adjacent duplicates.
pub const DEDUP_DAYS_WINDOW: i64 = 30;
