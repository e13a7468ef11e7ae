//! Incoming wine fields and their validation.
//!
//! Requests come straight from browser form state, so numeric fields may arrive as
//! strings, optional fields as `""`, and list fields with blank entries. Leaves that
//! need coercion are kept as raw JSON here and checked in [`WineInput::into_wine`],
//! which collects every field error instead of stopping at the first one.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::slug::derive_slug;
use super::wine::{
    Coordinates, Details, Region, Tasting, Wine, WineImage, WineType, DEFAULT_QUANTITY,
};
use crate::errors::{AppError, FieldError};

pub const RATING_MIN: f64 = 1.0;
pub const RATING_MAX: f64 = 5.0;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatesInput {
    #[serde(default)]
    pub latitude: Option<Value>,
    #[serde(default)]
    pub longitude: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionInput {
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub coordinates: Option<CoordinatesInput>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsInput {
    #[serde(default)]
    pub alcohol_content: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub purchase_date: Option<String>,
    #[serde(default)]
    pub purchase_location: Option<String>,
    #[serde(default)]
    pub quantity: Option<Value>,
    #[serde(default)]
    pub cellar_location: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TastingInput {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub rating: Option<Value>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub aromas: Option<Vec<String>>,
    #[serde(default)]
    pub pairings: Option<Vec<String>>,
}

/// Request body for creating a wine, and the merged document re-checked on update.
///
/// Unknown keys (including `id`, `createdAt`, `updatedAt`) are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WineInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub producer: Option<String>,
    #[serde(default)]
    pub vintage: Option<Value>,
    #[serde(default, rename = "type")]
    pub wine_type: Option<String>,
    #[serde(default)]
    pub region: Option<RegionInput>,
    #[serde(default)]
    pub varietal: Option<Vec<String>>,
    #[serde(default)]
    pub details: Option<DetailsInput>,
    #[serde(default)]
    pub tasting: Option<TastingInput>,
    #[serde(default)]
    pub image: Option<WineImage>,
    #[serde(default)]
    pub is_favorite: Option<bool>,
}

impl WineInput {
    /// Validate the input and build the record it describes.
    ///
    /// The slug is taken from the input when present, otherwise derived from
    /// `name` and `vintage`.
    pub fn into_wine(
        self,
        id: String,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Wine, AppError> {
        let mut errors = Vec::new();

        let name = required_text(self.name, "name", "Please provide a wine name", &mut errors);
        let producer = required_text(
            self.producer,
            "producer",
            "Please provide a producer name",
            &mut errors,
        );

        let vintage = match integer(self.vintage.as_ref(), "vintage", &mut errors) {
            Some(v) => match i32::try_from(v) {
                Ok(v) => Some(v),
                Err(_) => {
                    errors.push(FieldError::new("vintage", "Vintage is out of range"));
                    None
                }
            },
            None => {
                if !errors.iter().any(|e| e.field == "vintage") {
                    errors.push(FieldError::new("vintage", "Please provide a vintage year"));
                }
                None
            }
        };

        let wine_type = match self.wine_type.as_deref().map(str::trim) {
            None | Some("") => {
                errors.push(FieldError::new("type", "Please provide a wine type"));
                None
            }
            Some(raw) => {
                let parsed = WineType::parse(raw);
                if parsed.is_none() {
                    let expected: Vec<&str> = WineType::ALL.iter().map(WineType::as_str).collect();
                    errors.push(FieldError::new(
                        "type",
                        format!(
                            "'{}' is not a valid wine type (expected one of {})",
                            raw,
                            expected.join(", ")
                        ),
                    ));
                }
                parsed
            }
        };

        let region_input = self.region.unwrap_or_default();
        let country = required_text(
            region_input.country,
            "region.country",
            "Please provide a country",
            &mut errors,
        );
        let coordinates = region_input.coordinates.and_then(|c| {
            let latitude = number(c.latitude.as_ref(), "region.coordinates.latitude", &mut errors);
            let longitude =
                number(c.longitude.as_ref(), "region.coordinates.longitude", &mut errors);
            (latitude.is_some() || longitude.is_some()).then_some(Coordinates {
                latitude,
                longitude,
            })
        });

        let details_input = self.details.unwrap_or_default();
        let quantity = integer(
            details_input.quantity.as_ref(),
            "details.quantity",
            &mut errors,
        )
        .unwrap_or(DEFAULT_QUANTITY);
        if quantity < 0 {
            errors.push(FieldError::new(
                "details.quantity",
                "Quantity cannot be negative",
            ));
        }
        let details = Details {
            alcohol_content: number(
                details_input.alcohol_content.as_ref(),
                "details.alcoholContent",
                &mut errors,
            ),
            price: number(details_input.price.as_ref(), "details.price", &mut errors),
            purchase_date: date(
                details_input.purchase_date.as_deref(),
                "details.purchaseDate",
                &mut errors,
            ),
            purchase_location: optional_text(details_input.purchase_location),
            quantity,
            cellar_location: optional_text(details_input.cellar_location),
        };

        let tasting_input = self.tasting.unwrap_or_default();
        let rating = number(tasting_input.rating.as_ref(), "tasting.rating", &mut errors);
        if let Some(r) = rating {
            if !(RATING_MIN..=RATING_MAX).contains(&r) {
                errors.push(FieldError::new(
                    "tasting.rating",
                    format!("Rating must be between {} and {}", RATING_MIN, RATING_MAX),
                ));
            }
        }
        let tasting = Tasting {
            date: date(tasting_input.date.as_deref(), "tasting.date", &mut errors),
            rating,
            notes: optional_text(tasting_input.notes),
            aromas: text_list(tasting_input.aromas),
            pairings: text_list(tasting_input.pairings),
        };

        let image = self.image.and_then(|img| {
            let image = WineImage {
                url: optional_text(img.url),
                alt: optional_text(img.alt),
            };
            (image.url.is_some() || image.alt.is_some()).then_some(image)
        });

        let (Some(name), Some(producer), Some(vintage), Some(wine_type), Some(country)) =
            (name, producer, vintage, wine_type, country)
        else {
            return Err(AppError::Validation(errors));
        };
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }

        let slug = optional_text(self.slug)
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| derive_slug(&name, vintage));

        Ok(Wine {
            id,
            name,
            slug,
            producer,
            vintage,
            wine_type,
            region: Region {
                country,
                area: optional_text(region_input.area),
                coordinates,
            },
            varietal: text_list(self.varietal),
            details,
            tasting,
            image,
            is_favorite: self.is_favorite.unwrap_or(false),
            created_at,
            updated_at,
        })
    }
}

fn required_text(
    value: Option<String>,
    field: &str,
    message: &str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Some(v.to_string()),
        _ => {
            errors.push(FieldError::new(field, message));
            None
        }
    }
}

/// Blank strings count as absent.
fn optional_text(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Trims entries and drops the blank ones the form leaves behind.
fn text_list(values: Option<Vec<String>>) -> Vec<String> {
    values
        .unwrap_or_default()
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn number(value: Option<&Value>, field: &str, errors: &mut Vec<FieldError>) -> Option<f64> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Some(n),
            _ => {
                errors.push(FieldError::new(field, format!("'{}' is not a number", s)));
                None
            }
        },
        Some(other) => {
            errors.push(FieldError::new(field, format!("{} is not a number", other)));
            None
        }
    }
}

fn integer(value: Option<&Value>, field: &str, errors: &mut Vec<FieldError>) -> Option<i64> {
    let before = errors.len();
    let n = number(value, field, errors)?;
    if n.fract() != 0.0 || n < i64::MIN as f64 || n > i64::MAX as f64 {
        if errors.len() == before {
            errors.push(FieldError::new(field, format!("{} is not a whole number", n)));
        }
        return None;
    }
    Some(n as i64)
}

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
fn date(value: Option<&str>, field: &str, errors: &mut Vec<FieldError>) -> Option<DateTime<Utc>> {
    let raw = value.map(str::trim).filter(|v| !v.is_empty())?;

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Some(midnight.and_utc());
    }

    errors.push(FieldError::new(field, format!("'{}' is not a valid date", raw)));
    None
}
