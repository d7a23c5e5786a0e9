use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// WordPress (easydeals plugin)
#[derive(Deserialize, Debug, Clone)]
pub struct EntryRecord {
    pub id: FlexibleType,
    pub status: FlexibleType,
    #[serde(default)]
    pub content: Option<ContentField>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub offer_price: Option<FlexibleType>,
    #[serde(default)]
    pub vehicle: Option<VehicleRecord>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct VehicleRecord {
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub mileage: Option<FlexibleType>,
    #[serde(default)]
    pub fuel: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub next_eu: Option<String>,
}

/// PHP hands out `[]` for an empty associative array and some installs store
/// the form submission as an encoded JSON string. `null` arrives as `None`.
#[derive(Debug, Deserialize, Clone)]
#[serde(untagged)]
pub enum ContentField {
    Map(Map<String, Value>),
    List(Vec<Value>),
    Encoded(String),
}

impl Default for ContentField {
    fn default() -> Self {
        ContentField::Map(Map::new())
    }
}

impl ContentField {
    pub fn into_map(self) -> Result<Map<String, Value>> {
        match self {
            ContentField::Map(m) => Ok(m),
            ContentField::List(_) => Ok(Map::new()),
            ContentField::Encoded(s) if s.trim().is_empty() => Ok(Map::new()),
            ContentField::Encoded(s) => Ok(serde_json::from_str(&s)?),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum FlexibleType {
    Int(i64),
    Float(f64),
    Str(String),
}

impl FlexibleType {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FlexibleType::Int(i) => Some(*i),
            FlexibleType::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            FlexibleType::Float(_) => None,
            FlexibleType::Str(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
            }
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            FlexibleType::Int(i) => i.to_string(),
            FlexibleType::Float(f) => f.to_string(),
            FlexibleType::Str(s) => s.clone(),
        }
    }
}

// JWT auth plugin
#[derive(Serialize, Debug)]
pub struct TokenRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user_id: Option<FlexibleType>,
    #[serde(default)]
    pub user_display_name: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
}

// Request bodies
#[derive(Serialize, Debug, PartialEq)]
pub struct OfferRequest<'a> {
    pub price: u64,
    pub email: &'a str,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct StatusRequest {
    pub status: i64,
}

// Settings
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum SettingsPayload {
    Pairs(Vec<SettingPair>),
    Flat(SettingsRecord),
}

#[derive(Deserialize, Debug, Clone)]
pub struct SettingPair {
    pub setting: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SettingsRecord {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub accepted_template: Option<String>,
    #[serde(default)]
    pub rejected_template: Option<String>,
}
