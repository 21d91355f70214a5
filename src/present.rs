//! Presentation derivation: pure, total functions mapping raw records onto
//! display attributes. No I/O and no failure mode anywhere in this module.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::types::Chapter;

/// Display classification of a subject, used purely for icon selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Category {
    Code,
    Design,
    Data,
    Web,
    Math,
    Mobile,
    Database,
    Network,
    Security,
    System,
    Media,
    Audio,
    Business,
    General,
}

/// Keyword rules evaluated top to bottom over the lower-cased subject; the
/// first hit wins, so priority lives in this table, not in code order.
/// Note that `data` precedes `database`: a subject naming a database always
/// contains "data" and lands in `Data`, as the original page did.
pub const CATEGORY_RULES: &[(&str, Category)] = &[
    ("programming", Category::Code),
    ("code", Category::Code),
    ("design", Category::Design),
    ("ui", Category::Design),
    ("data", Category::Data),
    ("ai", Category::Data),
    ("web", Category::Web),
    ("math", Category::Math),
    ("mobile", Category::Mobile),
    ("database", Category::Database),
    ("network", Category::Network),
    ("security", Category::Security),
    ("system", Category::System),
    ("media", Category::Media),
    ("audio", Category::Audio),
    ("business", Category::Business),
];

pub fn categorize(subject: &str) -> Category {
    let subject = subject.to_lowercase();
    for (keyword, category) in CATEGORY_RULES {
        if subject.contains(keyword) {
            return *category;
        }
    }
    Category::General
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Code => "code",
            Category::Design => "design",
            Category::Data => "data",
            Category::Web => "web",
            Category::Math => "math",
            Category::Mobile => "mobile",
            Category::Database => "database",
            Category::Network => "network",
            Category::Security => "security",
            Category::System => "system",
            Category::Media => "media",
            Category::Audio => "audio",
            Category::Business => "business",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Difficulty-to-accent mapping. Anything unrecognized lands in the general
/// band rather than failing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Band {
    Beginner,
    Intermediate,
    Advanced,
    General,
}

pub fn difficulty_band(difficulty: &str) -> Band {
    match difficulty.to_lowercase().as_str() {
        "beginner" => Band::Beginner,
        "intermediate" => Band::Intermediate,
        "advanced" => Band::Advanced,
        _ => Band::General,
    }
}

impl Band {
    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Beginner => "beginner",
            Band::Intermediate => "intermediate",
            Band::Advanced => "advanced",
            Band::General => "general",
        }
    }

    /// Gradient accent pair the web view renders the band with.
    pub fn accent(&self) -> &'static str {
        match self {
            Band::Beginner => "from-green-500 to-emerald-500",
            Band::Intermediate => "from-yellow-500 to-orange-500",
            Band::Advanced => "from-red-500 to-pink-500",
            Band::General => "from-blue-500 to-cyan-500",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Month/day/year rendering of a stored timestamp. Tries RFC 3339 first,
/// then the naive shapes Postgres hands back; unparseable input is echoed
/// back rather than panicking.
pub fn format_date(timestamp: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(timestamp) {
        return parsed.format("%b %-d, %Y").to_string();
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f") {
        return parsed.format("%b %-d, %Y").to_string();
    }
    if let Ok(parsed) = NaiveDate::parse_from_str(timestamp, "%Y-%m-%d") {
        return parsed.format("%b %-d, %Y").to_string();
    }
    timestamp.to_string()
}

/// Completion percentage of a chapter list, rounded to the nearest integer.
/// Zero chapters is 0%, not a division error.
pub fn progress_percent(chapters: &[Chapter]) -> u8 {
    if chapters.is_empty() {
        return 0;
    }
    let completed = chapters.iter().filter(|c| c.completed).count();
    ((completed * 100) as f64 / chapters.len() as f64).round() as u8
}
