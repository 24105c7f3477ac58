use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

pub type ProductId = i64;
pub type ShopId = i64;

/// Product classification shared by both sources.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Vitrina,
    /// The legacy source requires a type filter; catalog is used when none is given.
    #[default]
    Catalog,
}

impl ProductType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ProductType::Vitrina => "vitrina",
            ProductType::Catalog => "catalog",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("unknown product type: {0}")]
pub struct UnknownProductType(pub String);

impl FromStr for ProductType {
    type Err = UnknownProductType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vitrina" => Ok(ProductType::Vitrina),
            "catalog" => Ok(ProductType::Catalog),
            other => Err(UnknownProductType(other.to_string())),
        }
    }
}

/// A product as returned by the primary source.
///
/// Only the fields this service reads are typed. Everything else is kept in
/// `extra_fields` and passed through unchanged.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ProductRecord {
    pub id: ProductId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<ProductType>,

    #[serde(rename = "isAvailable", default, skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,

    #[serde(flatten)]
    pub extra_fields: Map<String, JsonValue>,
}

/// A product as returned by the legacy listing.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct LegacyRecord {
    #[serde(deserialize_with = "lenient_int")]
    pub id: ProductId,

    #[serde(default, deserialize_with = "nullable_string")]
    pub name: String,

    /// Absent when the legacy source has not recorded an owner.
    #[serde(
        rename = "shopId",
        default,
        deserialize_with = "lenient_opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub shop_id: Option<ShopId>,

    #[serde(rename = "created_at", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(
        rename = "section_id",
        default,
        deserialize_with = "lenient_opt_int",
        skip_serializing_if = "Option::is_none"
    )]
    pub section_id: Option<i64>,
}

/// Product id to shop id, built fresh for every request.
///
/// Entries only ever come from a legacy record that carried a `shopId`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShopMapping(HashMap<ProductId, ShopId>);

impl ShopMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the shop of `record` if it has one. The last observed record wins.
    pub fn observe(&mut self, record: &LegacyRecord) -> bool {
        match record.shop_id {
            Some(shop_id) => {
                self.0.insert(record.id, shop_id);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: ProductId) -> Option<ShopId> {
        self.0.get(&id).copied()
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.0.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A primary record with the shop resolved for it, if any.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct EnrichedProduct {
    #[serde(flatten)]
    pub product: ProductRecord,

    #[serde(rename = "shopId", skip_serializing_if = "Option::is_none")]
    pub shop_id: Option<ShopId>,
}

impl EnrichedProduct {
    pub fn new(mut product: ProductRecord, shop_id: Option<ShopId>) -> Self {
        // An upstream `shopId` would be emitted twice next to ours.
        product.extra_fields.remove("shopId");
        Self { product, shop_id }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
    #[serde(rename = "hasMore")]
    pub has_more: bool,
}

impl Pagination {
    /// Used when the upstream page carries no pagination block. `returned` is
    /// the number of products actually served, after any filtering.
    pub fn single_page(returned: usize, limit: u32, offset: u32) -> Self {
        Pagination {
            total: returned as u64,
            limit,
            offset,
            has_more: false,
        }
    }
}

/// Selection criteria for a primary listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListCriteria {
    pub product_type: Option<ProductType>,
    pub is_available: Option<bool>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for ListCriteria {
    fn default() -> Self {
        ListCriteria {
            product_type: None,
            is_available: None,
            limit: 20,
            offset: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProductPage {
    pub products: Vec<ProductRecord>,
    /// `None` if the upstream sent no usable pagination block
    pub pagination: Option<Pagination>,
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IntOrString {
    Int(i64),
    Str(String),
}

fn parse_int_value<E: de::Error>(value: IntOrString) -> Result<Option<i64>, E> {
    match value {
        IntOrString::Int(v) => Ok(Some(v)),
        IntOrString::Str(s) if s.trim().is_empty() => Ok(None),
        IntOrString::Str(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| E::custom(format!("invalid integer: {s:?}"))),
    }
}

// The legacy source is inconsistent about numbers and sends some as strings.
fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    parse_int_value(IntOrString::deserialize(deserializer)?)?
        .ok_or_else(|| de::Error::custom("empty integer"))
}

fn lenient_opt_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<IntOrString>::deserialize(deserializer)? {
        Some(value) => parse_int_value(value),
        None => Ok(None),
    }
}
