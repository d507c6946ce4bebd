use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Collections owned by the site CRUD modules that enquiries point into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    ServiceCategory,
    Service,
    Department,
}

impl CatalogKind {
    pub fn collection(&self) -> &'static str {
        match self {
            CatalogKind::ServiceCategory => "servicecategories",
            CatalogKind::Service => "services",
            CatalogKind::Department => "departments",
        }
    }

    /// Field holding the human readable label
    pub fn label_field(&self) -> &'static str {
        match self {
            CatalogKind::ServiceCategory | CatalogKind::Service => "title",
            CatalogKind::Department => "name",
        }
    }
}

/// A resolved weak reference, as embedded in enquiry responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRef {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl CatalogRef {
    pub fn new(kind: CatalogKind, id: &ObjectId, label: String) -> Self {
        let (title, name) = match kind {
            CatalogKind::Department => (None, Some(label)),
            _ => (Some(label), None),
        };
        CatalogRef { id: id.to_hex(), title, name }
    }

    pub fn label(&self) -> &str {
        self.title.as_deref().or(self.name.as_deref()).unwrap_or(&self.id)
    }
}

/// Populated relations of one enquiry. A dangling id resolves to `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relations {
    pub service_category: Option<CatalogRef>,
    pub specific_service: Option<CatalogRef>,
    pub department: Option<CatalogRef>,
}
