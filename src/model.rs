use chrono::{
    DateTime,
    TimeZone,
    Utc,
};
use serde::{
    Deserialize,
    Deserializer,
    de,
};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct User {
    pub id: String,
    pub balance: i64,
    #[serde(default)]
    pub bets: Vec<Bet>,
    #[serde(default)]
    pub message: Option<String>,
}

impl User {
    pub fn has_winning_bet(&self) -> bool {
        has_winning_bet(&self.bets)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub id: String,
    pub amount: i64,
    pub dice_number: i64,
    pub result: BetResult,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
}

/// Payload of the `placeBet` mutation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedBet {
    pub id: String,
    pub amount: i64,
    pub dice_number: i64,
    pub result: BetResult,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Payload of the `withdraw` mutation.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct WithdrawReceipt {
    pub id: String,
    pub balance: i64,
    #[serde(default)]
    pub bets: Vec<Bet>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BetResult {
    Win,
    Lose,
    Other(String),
}

impl BetResult {
    pub fn is_win(&self) -> bool {
        matches!(self, BetResult::Win)
    }
}

impl From<&str> for BetResult {
    fn from(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case("win") {
            BetResult::Win
        } else if raw.eq_ignore_ascii_case("lose") {
            BetResult::Lose
        } else {
            BetResult::Other(raw.to_string())
        }
    }
}

impl fmt::Display for BetResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetResult::Win => write!(f, "win"),
            BetResult::Lose => write!(f, "lose"),
            BetResult::Other(raw) => write!(f, "{raw}"),
        }
    }
}

impl<'de> Deserialize<'de> for BetResult {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(BetResult::from(raw.as_str()))
    }
}

pub fn has_winning_bet(bets: &[Bet]) -> bool {
    bets.iter().any(|bet| bet.result.is_win())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Millis(i64),
    Text(String),
}

// Accepts RFC 3339 text, epoch millis, or epoch millis as a numeric string.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    match RawTimestamp::deserialize(deserializer)? {
        RawTimestamp::Millis(millis) => from_millis(millis).map_err(de::Error::custom),
        RawTimestamp::Text(text) => {
            if let Ok(millis) = text.trim().parse::<i64>() {
                return from_millis(millis).map_err(de::Error::custom);
            }
            DateTime::parse_from_rfc3339(text.trim())
                .map(|ts| ts.with_timezone(&Utc))
                .map_err(|e| de::Error::custom(format!("invalid timestamp {text:?}: {e}")))
        }
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>, String> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| format!("timestamp {millis} out of range"))
}
