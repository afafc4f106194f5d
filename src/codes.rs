//! Lookup tables from the raw spreadsheet codes to labeled categories.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Hotel {
    #[serde(rename = "hotel 1")]
    Hotel1,
    #[serde(rename = "hotel 2")]
    Hotel2,
}

impl Hotel {
    pub const ALL: [Hotel; 2] = [Hotel::Hotel1, Hotel::Hotel2];

    pub fn label(self) -> &'static str {
        match self {
            Hotel::Hotel1 => "hotel 1",
            Hotel::Hotel2 => "hotel 2",
        }
    }

    /// Parses the raw `Hotel` cell. Accepts `1`, `hotel1`, `hotel 1`, `Hotel 1`.
    pub fn parse(raw: &str) -> Option<Self> {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match compact.strip_prefix("hotel").unwrap_or(&compact) {
            "1" => Some(Hotel::Hotel1),
            "2" => Some(Hotel::Hotel2),
            _ => None,
        }
    }

    /// The other hotel, used when switching the reference category.
    pub fn other(self) -> Self {
        match self {
            Hotel::Hotel1 => Hotel::Hotel2,
            Hotel::Hotel2 => Hotel::Hotel1,
        }
    }
}

impl fmt::Display for Hotel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Intervention {
    #[serde(rename = "Default Group")]
    DefaultGroup,
    #[serde(rename = "Cognitive Intervention")]
    Cognitive,
    #[serde(rename = "Vegetarian Behavioural Intervention")]
    VegetarianBehavioural,
    #[serde(rename = "Non-Vegetarian Behavioural Intervention")]
    NonVegetarianBehavioural,
}

impl Intervention {
    pub const ALL: [Intervention; 4] = [
        Intervention::DefaultGroup,
        Intervention::Cognitive,
        Intervention::VegetarianBehavioural,
        Intervention::NonVegetarianBehavioural,
    ];

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Intervention::DefaultGroup),
            2 => Some(Intervention::Cognitive),
            3 => Some(Intervention::VegetarianBehavioural),
            4 => Some(Intervention::NonVegetarianBehavioural),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Intervention::DefaultGroup => "Default Group",
            Intervention::Cognitive => "Cognitive Intervention",
            Intervention::VegetarianBehavioural => "Vegetarian Behavioural Intervention",
            Intervention::NonVegetarianBehavioural => "Non-Vegetarian Behavioural Intervention",
        }
    }

    /// Matches either the full label or its raw code.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(code) = raw.parse::<i64>() {
            return Self::from_code(code);
        }
        Self::ALL
            .into_iter()
            .find(|i| i.label().eq_ignore_ascii_case(raw))
    }

    /// Deserializes a config value given as the label or the numeric code.
    pub fn deserialize_code_or_label<'de, D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(i64),
            Text(String),
        }

        let parsed = match Raw::deserialize(deserializer)? {
            Raw::Code(code) => Self::from_code(code).ok_or_else(|| code.to_string()),
            Raw::Text(text) => Self::parse(&text).ok_or(text),
        };
        parsed.map_err(|raw| {
            serde::de::Error::custom(format!("unknown intervention {raw:?}"))
        })
    }
}

impl fmt::Display for Intervention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Mo,
    Tu,
    We,
    Th,
    Fr,
    Sa,
    Su,
}

impl Weekday {
    /// 1 = Monday through 7 = Sunday.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Weekday::Mo),
            2 => Some(Weekday::Tu),
            3 => Some(Weekday::We),
            4 => Some(Weekday::Th),
            5 => Some(Weekday::Fr),
            6 => Some(Weekday::Sa),
            7 => Some(Weekday::Su),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weekend {
    #[serde(rename = "weekend")]
    Weekend,
    #[serde(rename = "no weekend")]
    NoWeekend,
}

impl Weekend {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Weekend::Weekend),
            2 => Some(Weekend::NoWeekend),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MealType {
    #[serde(rename = "vegetarian")]
    Vegetarian,
    #[serde(rename = "meat-based")]
    MeatBased,
}

impl MealType {
    pub fn is_vegetarian(self) -> bool {
        matches!(self, MealType::Vegetarian)
    }
}
