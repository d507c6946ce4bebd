use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

pub const UNKNOWN_LOCATION: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    #[default]
    Desktop,
    Mobile,
    Tablet,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Desktop => "desktop",
            DeviceType::Mobile => "mobile",
            DeviceType::Tablet => "tablet",
        }
    }
}

/// Linked social profiles, only stored once the visitor consented.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialAccounts {
    pub facebook: Option<String>,
    pub twitter: Option<String>,
    pub linkedin: Option<String>,
    pub instagram: Option<String>,
    pub github: Option<String>,
    pub google: Option<String>,
}

impl SocialAccounts {
    /// (network, present) pairs in a stable order
    pub fn presence(&self) -> [(&'static str, bool); 6] {
        [
            ("facebook", self.facebook.is_some()),
            ("twitter", self.twitter.is_some()),
            ("linkedin", self.linkedin.is_some()),
            ("instagram", self.instagram.is_some()),
            ("github", self.github.is_some()),
            ("google", self.google.is_some()),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.presence().iter().all(|(_, present)| !present)
    }
}

/// One tracked browsing identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visitor {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub device_type: DeviceType,
    pub browser: Option<String>,
    pub browser_version: Option<String>,
    pub os: Option<String>,
    pub os_version: Option<String>,
    pub screen_resolution: Option<String>,
    pub viewport_size: Option<String>,
    pub color_depth: Option<u32>,
    pub pixel_ratio: Option<f64>,
    pub device_memory: Option<f64>,
    pub hardware_concurrency: Option<u32>,
    pub connection_type: Option<String>,
    pub connection_speed: Option<String>,

    pub language: Option<String>,
    pub timezone: Option<String>,
    #[serde(default = "unknown")]
    pub city: String,
    #[serde(default = "unknown")]
    pub country: String,
    #[serde(default = "unknown")]
    pub region: String,
    pub referrer: Option<String>,
    pub current_page: Option<String>,
    pub previous_page: Option<String>,
    pub entry_page: Option<String>,

    pub email: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub social_accounts: SocialAccounts,
    #[serde(default)]
    pub consent_given: bool,
    pub consent_timestamp: Option<String>,

    #[serde(default = "one")]
    pub page_views: u32,
    #[serde(default)]
    pub is_returning: bool,
    pub last_activity: String,
    pub last_seen: String,
    /// Seconds
    pub visit_duration: Option<i64>,

    pub created_at: String,
    pub updated_at: String,
}

fn unknown() -> String {
    UNKNOWN_LOCATION.to_string()
}

fn one() -> u32 {
    1
}

impl Visitor {
    /// A fresh record for `ip` first seen at `now`.
    pub fn new(ip_address: String, now: &str) -> Self {
        Visitor {
            id: None,
            ip_address,
            session_id: None,
            user_agent: None,
            device_type: DeviceType::Desktop,
            browser: None,
            browser_version: None,
            os: None,
            os_version: None,
            screen_resolution: None,
            viewport_size: None,
            color_depth: None,
            pixel_ratio: None,
            device_memory: None,
            hardware_concurrency: None,
            connection_type: None,
            connection_speed: None,
            language: None,
            timezone: None,
            city: unknown(),
            country: unknown(),
            region: unknown(),
            referrer: None,
            current_page: None,
            previous_page: None,
            entry_page: None,
            email: None,
            name: None,
            social_accounts: SocialAccounts::default(),
            consent_given: false,
            consent_timestamp: None,
            page_views: 1,
            is_returning: false,
            last_activity: now.to_string(),
            last_seen: now.to_string(),
            visit_duration: None,
            created_at: now.to_string(),
            updated_at: now.to_string(),
        }
    }

    /// Domain part of the captured email, lowercased.
    pub fn email_domain(&self) -> Option<String> {
        self.email
            .as_deref()
            .and_then(|e| e.rsplit_once('@'))
            .map(|(_, domain)| domain.trim().to_lowercase())
            .filter(|d| !d.is_empty())
    }
}
