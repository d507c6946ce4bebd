use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Implements `as_str`, `Display` and `FromStr` over the serde names of a
/// unit-only enum.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        "'{}' is not a valid {}; expected one of: {}",
                        other,
                        stringify!($name),
                        [$($text),+].join(", ")
                    )),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EnquiryType {
    General,
    Service,
    Quote,
    Support,
    Warranty,
    Installation,
    Parts,
    Fleet,
}

string_enum!(EnquiryType {
    General => "general",
    Service => "service",
    Quote => "quote",
    Support => "support",
    Warranty => "warranty",
    Installation => "installation",
    Parts => "parts",
    Fleet => "fleet",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VehicleType {
    Ute,
    Trailer,
    Truck,
    Van,
    Other,
}

string_enum!(VehicleType {
    Ute => "ute",
    Trailer => "trailer",
    Truck => "truck",
    Van => "van",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Emergency,
}

string_enum!(Urgency {
    Low => "low",
    Medium => "medium",
    High => "high",
    Emergency => "emergency",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContactStatus {
    #[default]
    New,
    InProgress,
    Contacted,
    Quoted,
    Closed,
    Spam,
}

string_enum!(ContactStatus {
    New => "new",
    InProgress => "in-progress",
    Contacted => "contacted",
    Quoted => "quoted",
    Closed => "closed",
    Spam => "spam",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

string_enum!(Priority {
    Low => "low",
    Normal => "normal",
    High => "high",
    Urgent => "urgent",
});

impl Priority {
    /// Priority is never chosen by the submitter; it is always derived from
    /// the urgency they picked.
    pub fn from_urgency(urgency: Option<Urgency>) -> Self {
        match urgency {
            Some(Urgency::Emergency) => Priority::Urgent,
            Some(Urgency::High) => Priority::High,
            Some(Urgency::Low) => Priority::Low,
            Some(Urgency::Medium) | None => Priority::Normal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseMethod {
    #[default]
    Email,
    Phone,
    InPerson,
}

string_enum!(ResponseMethod {
    Email => "email",
    Phone => "phone",
    InPerson => "in-person",
});

pub const DEFAULT_SOURCE: &str = "website";

/// A stored enquiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub company: Option<String>,
    pub job_title: Option<String>,

    pub enquiry_type: EnquiryType,
    pub service_category: Option<ObjectId>,
    pub specific_service: Option<ObjectId>,
    pub department: Option<ObjectId>,

    pub vehicle_type: Option<VehicleType>,
    pub vehicle_details: Option<String>,
    pub urgency: Option<Urgency>,

    pub message: String,

    #[serde(default)]
    pub status: ContactStatus,
    #[serde(default)]
    pub priority: Priority,
    pub notes: Option<String>,
    pub assigned_to: Option<ObjectId>,
    pub response_date: Option<String>,
    pub response_method: Option<ResponseMethod>,
    pub follow_up_date: Option<String>,

    #[serde(default = "default_source")]
    pub source: String,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub page_url: Option<String>,

    #[serde(default)]
    pub marketing_consent: bool,
    #[serde(default = "default_true")]
    pub privacy_consent: bool,

    pub created_at: String,
    pub updated_at: String,
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

fn default_true() -> bool {
    true
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    /// Re-derive priority from urgency. Must run before every write that sets urgency.
    pub fn refresh_priority(&mut self) {
        self.priority = Priority::from_urgency(self.urgency);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_from_urgency() {
        assert_eq!(Priority::from_urgency(Some(Urgency::Emergency)), Priority::Urgent);
        assert_eq!(Priority::from_urgency(Some(Urgency::High)), Priority::High);
        assert_eq!(Priority::from_urgency(Some(Urgency::Low)), Priority::Low);
        assert_eq!(Priority::from_urgency(Some(Urgency::Medium)), Priority::Normal);
        assert_eq!(Priority::from_urgency(None), Priority::Normal);
    }

    #[test]
    fn test_status_serializes_kebab_case() {
        let json = serde_json::to_string(&ContactStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        assert_eq!("in-progress".parse::<ContactStatus>().unwrap(), ContactStatus::InProgress);
        assert_eq!(ResponseMethod::InPerson.as_str(), "in-person");
    }

    #[test]
    fn test_enum_parse_is_case_insensitive_and_reports_choices() {
        assert_eq!("Quote".parse::<EnquiryType>().unwrap(), EnquiryType::Quote);
        let err = "boat".parse::<VehicleType>().unwrap_err();
        assert!(err.contains("ute, trailer, truck, van, other"));
    }

    #[test]
    fn test_all_lists_every_variant() {
        assert_eq!(EnquiryType::ALL.len(), 8);
        assert_eq!(ContactStatus::ALL.len(), 6);
    }
}
