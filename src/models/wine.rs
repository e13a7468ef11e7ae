//! Wine record as stored in the document store and returned by the API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Style of a wine. Only these six values are persistable.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum WineType {
    Red,
    White,
    #[serde(rename = "Rosé")]
    Rose,
    Sparkling,
    Dessert,
    Fortified,
}

impl WineType {
    pub const ALL: [WineType; 6] = [
        WineType::Red,
        WineType::White,
        WineType::Rose,
        WineType::Sparkling,
        WineType::Dessert,
        WineType::Fortified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WineType::Red => "Red",
            WineType::White => "White",
            WineType::Rose => "Rosé",
            WineType::Sparkling => "Sparkling",
            WineType::Dessert => "Dessert",
            WineType::Fortified => "Fortified",
        }
    }

    /// Exact, case-sensitive match against the persisted names.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}

/// Purchase and storage details for the bottles on hand.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Details {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alcohol_content: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_location: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cellar_location: Option<String>,
}

pub const DEFAULT_QUANTITY: i64 = 1;

fn default_quantity() -> i64 {
    DEFAULT_QUANTITY
}

impl Default for Details {
    fn default() -> Self {
        Self {
            alcohol_content: None,
            price: None,
            purchase_date: None,
            purchase_location: None,
            quantity: DEFAULT_QUANTITY,
            cellar_location: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tasting {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    /// Between 1 and 5 inclusive
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub aromas: Vec<String>,
    #[serde(default)]
    pub pairings: Vec<String>,
}

/// Externally hosted bottle image. Only the URL and alt text are kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WineImage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

/// A wine in the collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Wine {
    pub id: String,
    pub name: String,
    /// External lookup key, stable once stored
    pub slug: String,
    pub producer: String,
    pub vintage: i32,
    #[serde(rename = "type")]
    pub wine_type: WineType,
    pub region: Region,
    #[serde(default)]
    pub varietal: Vec<String>,
    #[serde(default)]
    pub details: Details,
    #[serde(default)]
    pub tasting: Tasting,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<WineImage>,
    #[serde(default)]
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Response body for a successful delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteWineResponse {
    pub message: String,
}
