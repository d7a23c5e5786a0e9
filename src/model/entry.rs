use crate::error::Error;
use crate::model::data::{EntryRecord, VehicleRecord};
use crate::Result;
use chrono::{DateTime, Local, NaiveDateTime};
use log::warn;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Lead lifecycle code as stored by the easydeals plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Unhandled,
    OfferSent,
    Completed,
    Accepted,
    Rejected,
    Unknown(i64),
}

impl Status {
    pub const ALL: [Status; 5] = [
        Status::Unhandled,
        Status::OfferSent,
        Status::Completed,
        Status::Accepted,
        Status::Rejected,
    ];

    pub fn from_code(code: i64) -> Status {
        match code {
            1 => Status::Unhandled,
            2 => Status::OfferSent,
            3 => Status::Completed,
            4 => Status::Accepted,
            5 => Status::Rejected,
            other => Status::Unknown(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Status::Unhandled => 1,
            Status::OfferSent => 2,
            Status::Completed => 3,
            Status::Accepted => 4,
            Status::Rejected => 5,
            Status::Unknown(code) => code,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Unhandled => "Ikke håndtert",
            Status::OfferSent => "Tilbud sendt",
            Status::Completed => "Fullført",
            Status::Accepted => "Akseptert",
            Status::Rejected => "Ikke interessert",
            Status::Unknown(_) => "Ukjent",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vehicle {
    pub make: Option<String>,
    pub model: Option<String>,
    pub reg_number: Option<String>,
    pub mileage: Option<String>,
    pub fuel: Option<String>,
    pub color: Option<String>,
    pub next_eu: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contact {
    pub name: Option<String>,
    pub area: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// A lead after ingestion. Key spellings of the form submission are resolved
/// here once; `content` keeps the submission as sent, for full-text search.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub id: u64,
    pub status: Status,
    pub content: Map<String, Value>,
    pub updated_at: String,
    pub updated_on: Option<NaiveDateTime>,
    pub offer_price: Option<u64>,
    pub vehicle: Vehicle,
    pub contact: Contact,
    pub message: Option<String>,
}

impl TryFrom<EntryRecord> for Entry {
    type Error = Error;

    fn try_from(record: EntryRecord) -> Result<Entry> {
        let id = record
            .id
            .as_i64()
            .and_then(|id| u64::try_from(id).ok())
            .ok_or_else(|| Error::InvalidRecord(format!("entry id {:?}", record.id)))?;
        let status = record
            .status
            .as_i64()
            .map(Status::from_code)
            .ok_or_else(|| Error::InvalidRecord(format!("entry {id} status {:?}", record.status)))?;

        let content = match record.content.map(|c| c.into_map()).transpose() {
            Ok(content) => content.unwrap_or_default(),
            Err(e) => {
                warn!("entry {id} has unreadable content: {e}");
                Map::new()
            }
        };
        let fields = stringify_content(&content);
        let raw_vehicle = record.vehicle.unwrap_or_default();
        let vehicle = normalize_vehicle(&raw_vehicle, &fields);
        let contact = Contact {
            name: lookup(&fields, &["Navn", "name"]),
            area: lookup(&fields, &["Område (by)", "Område"]),
            email: lookup(&fields, &["E-post", "Epost", "email"]),
            phone: lookup(&fields, &["Telefon", "phone"]),
        };
        let message = lookup(&fields, &["Melding", "message"]);
        let updated_at = record.updated_at.unwrap_or_default();
        let updated_on = parse_timestamp(&updated_at);
        let offer_price = record
            .offer_price
            .as_ref()
            .and_then(|p| p.as_i64())
            .and_then(|p| u64::try_from(p).ok())
            .filter(|p| *p > 0);

        Ok(Entry {
            id,
            status,
            content,
            updated_at,
            updated_on,
            offer_price,
            vehicle,
            contact,
            message,
        })
    }
}

fn stringify_content(map: &Map<String, Value>) -> BTreeMap<String, String> {
    map.iter()
        .filter_map(|(k, v)| match v {
            Value::Null => None,
            Value::String(s) => Some((k.clone(), s.clone())),
            other => Some((k.clone(), other.to_string())),
        })
        .collect()
}

fn normalize_vehicle(raw: &VehicleRecord, content: &BTreeMap<String, String>) -> Vehicle {
    Vehicle {
        make: non_empty(raw.make.as_deref())
            .or_else(|| lookup(content, &["Merke", "vehicle_make"])),
        model: non_empty(raw.model.as_deref())
            .or_else(|| lookup(content, &["Model", "Modell", "vehicle_model"])),
        reg_number: lookup(content, &["Registreringsnummer", "regnr"]),
        mileage: lookup(content, &["Kilometerstand"])
            .or_else(|| non_empty(raw.mileage.as_ref().map(|m| m.as_text()).as_deref())),
        fuel: non_empty(raw.fuel.as_deref()).or_else(|| lookup(content, &["Drivstoff"])),
        color: non_empty(raw.color.as_deref()).or_else(|| lookup(content, &["Farge"])),
        next_eu: non_empty(raw.next_eu.as_deref())
            .or_else(|| lookup(content, &["Neste EU-kontroll"])),
    }
}

/// First non-empty value under any of `keys`, compared case-insensitively.
fn lookup(content: &BTreeMap<String, String>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        content
            .iter()
            .filter(|(k, _)| k.trim().to_lowercase() == key.to_lowercase())
            .find_map(|(_, v)| non_empty(Some(v.as_str())))
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned)
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|d| d.with_timezone(&Local).naive_local())
        })
}
