use crate::model::data::{SettingsPayload, SettingsRecord};
use crate::wp::{ensure_success, EasyDeals};
use crate::Result;
use log::debug;

pub const DEFAULT_TEMPLATE: &str = r#"<p>Hei {CUSTOMER_NAME},</p>
<p>Takk for henvendelsen om bilen din. Vi kan tilby <strong>{PRICE} kr</strong>.</p>
<p>Svar på denne e-posten for å akseptere eller avslå tilbudet.</p>
<p>Med vennlig hilsen<br>Gretland Bil</p>"#;

pub const DEFAULT_ACCEPTED_TEMPLATE: &str = r#"<p>Hei {CUSTOMER_NAME},</p>
<p>Takk for at du aksepterte tilbudet på <strong>{PRICE} kr</strong>. Vi tar kontakt for å avtale overlevering.</p>
<p>Med vennlig hilsen<br>Gretland Bil</p>"#;

pub const DEFAULT_REJECTED_TEMPLATE: &str = r#"<p>Hei {CUSTOMER_NAME},</p>
<p>Vi har registrert at du ikke ønsker tilbudet på <strong>{PRICE} kr</strong>. Ta gjerne kontakt om du ombestemmer deg.</p>
<p>Med vennlig hilsen<br>Gretland Bil</p>"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    Email,
    Template,
    AcceptedTemplate,
    RejectedTemplate,
}

impl SettingKey {
    pub const ALL: [SettingKey; 4] = [
        SettingKey::Email,
        SettingKey::Template,
        SettingKey::AcceptedTemplate,
        SettingKey::RejectedTemplate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::Email => "email",
            SettingKey::Template => "template",
            SettingKey::AcceptedTemplate => "accepted_template",
            SettingKey::RejectedTemplate => "rejected_template",
        }
    }

    pub fn parse(key: &str) -> Option<SettingKey> {
        SettingKey::ALL.into_iter().find(|k| k.as_str() == key)
    }

    pub fn label(self) -> &'static str {
        match self {
            SettingKey::Email => "E-postadresse",
            SettingKey::Template => "Tilbudsmal",
            SettingKey::AcceptedTemplate => "Mal for akseptert tilbud",
            SettingKey::RejectedTemplate => "Mal for avslått tilbud",
        }
    }

    fn default_value(self) -> Option<&'static str> {
        match self {
            SettingKey::Email => None,
            SettingKey::Template => Some(DEFAULT_TEMPLATE),
            SettingKey::AcceptedTemplate => Some(DEFAULT_ACCEPTED_TEMPLATE),
            SettingKey::RejectedTemplate => Some(DEFAULT_REJECTED_TEMPLATE),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub email: String,
    pub template: String,
    pub accepted_template: String,
    pub rejected_template: String,
}

impl Settings {
    pub fn get(&self, key: SettingKey) -> &str {
        match key {
            SettingKey::Email => &self.email,
            SettingKey::Template => &self.template,
            SettingKey::AcceptedTemplate => &self.accepted_template,
            SettingKey::RejectedTemplate => &self.rejected_template,
        }
    }

    pub fn set(&mut self, key: SettingKey, value: String) {
        let slot = match key {
            SettingKey::Email => &mut self.email,
            SettingKey::Template => &mut self.template,
            SettingKey::AcceptedTemplate => &mut self.accepted_template,
            SettingKey::RejectedTemplate => &mut self.rejected_template,
        };
        *slot = value;
    }

    /// Fills blank templates with the built-in HTML. Only applied for display;
    /// the defaults reach the backend when the user saves.
    pub fn with_default_templates(mut self) -> Settings {
        for key in SettingKey::ALL {
            if let Some(default) = key.default_value() {
                if self.get(key).trim().is_empty() {
                    self.set(key, default.to_owned());
                }
            }
        }
        self
    }
}

impl From<SettingsPayload> for Settings {
    fn from(payload: SettingsPayload) -> Settings {
        match payload {
            SettingsPayload::Flat(r) => Settings {
                email: r.email.unwrap_or_default(),
                template: r.template.unwrap_or_default(),
                accepted_template: r.accepted_template.unwrap_or_default(),
                rejected_template: r.rejected_template.unwrap_or_default(),
            },
            SettingsPayload::Pairs(pairs) => {
                let mut settings = Settings::default();
                for pair in pairs {
                    match SettingKey::parse(&pair.setting) {
                        Some(key) => settings.set(key, pair.value.unwrap_or_default()),
                        None => debug!("ignoring setting {}", pair.setting),
                    }
                }
                settings
            }
        }
    }
}

impl From<&Settings> for SettingsRecord {
    fn from(s: &Settings) -> SettingsRecord {
        SettingsRecord {
            email: Some(s.email.clone()),
            template: Some(s.template.clone()),
            accepted_template: Some(s.accepted_template.clone()),
            rejected_template: Some(s.rejected_template.clone()),
        }
    }
}

impl EasyDeals {
    /// Stored settings as the backend has them, without defaults.
    pub async fn load_settings(&self) -> Result<Settings> {
        let res = self
            .authorized(self.http.get(self.url("/settings")))
            .send()
            .await?;
        let payload = ensure_success(res).await?.json::<SettingsPayload>().await?;
        Ok(Settings::from(payload))
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<()> {
        let res = self
            .authorized(self.http.post(self.url("/settings")))
            .json(&SettingsRecord::from(settings))
            .send()
            .await?;
        ensure_success(res).await?;
        debug!("settings saved");
        Ok(())
    }
}
