use crate::error::Error;
use crate::model::data::{EntryRecord, OfferRequest, StatusRequest};
use crate::model::entry::{Entry, Status};
use crate::wp::{ensure_success, EasyDeals};
use crate::Result;
use log::{debug, warn};
use serde_json::Value;

impl EasyDeals {
    pub async fn list(&self) -> Result<Vec<Entry>> {
        let res = self
            .authorized(self.http.get(self.url("/entries")))
            .send()
            .await?;
        let records = ensure_success(res).await?.json::<Vec<Value>>().await?;
        debug!("fetched {} entries", records.len());

        let entries = records
            .into_iter()
            .filter_map(|r| ingest(r).inspect_err(|e| warn!("skipping entry: {e}")).ok())
            .collect();
        Ok(entries)
    }

    pub async fn delete(&self, id: u64) -> Result<()> {
        let res = self
            .authorized(self.http.delete(self.url(&format!("/entries/{id}"))))
            .send()
            .await?;
        ensure_success(res).await?;
        debug!("deleted entry {id}");
        Ok(())
    }

    pub async fn send_offer(&self, id: u64, price: u64, email: &str) -> Result<()> {
        if price == 0 {
            return Err(Error::InvalidPrice(price.to_string()));
        }
        let email = email.trim();
        if email.is_empty() {
            return Err(Error::MissingEmail(id));
        }
        let res = self
            .authorized(self.http.post(self.url(&format!("/offer/{id}"))))
            .json(&OfferRequest { price, email })
            .send()
            .await?;
        ensure_success(res).await?;
        debug!("offer {price} sent for entry {id}");
        Ok(())
    }

    pub async fn set_status(&self, id: u64, status: Status) -> Result<()> {
        let res = self
            .authorized(self.http.post(self.url(&format!("/offer/{id}/status"))))
            .json(&StatusRequest {
                status: status.code(),
            })
            .send()
            .await?;
        ensure_success(res).await?;
        debug!("entry {id} set to status {}", status.code());
        Ok(())
    }
}

/// One list element. A malformed record only costs itself.
fn ingest(value: Value) -> Result<Entry> {
    let record: EntryRecord = serde_json::from_value(value)?;
    Entry::try_from(record)
}

/// Offer price as typed by staff: a positive whole number of kroner.
/// Spaces used as thousands separators are accepted.
pub fn parse_price(input: &str) -> Result<u64> {
    let cleaned: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    match cleaned.parse::<u64>() {
        Ok(price) if price > 0 => Ok(price),
        _ => Err(Error::InvalidPrice(input.trim().to_owned())),
    }
}
