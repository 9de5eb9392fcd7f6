use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Catalog record as stored and as served to the storefront.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub image_url: String,
    pub category: String,
    pub size: String,
    pub stock: i32,
    pub ratings: f64,
    pub reviews: i32,
}

/// Validated partial update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub size: Option<String>,
    pub stock: Option<i32>,
    pub ratings: Option<f64>,
    pub reviews: Option<i32>,
}

impl ProductPatch {
    pub fn apply(&self, p: &mut Product) {
        if let Some(v) = &self.name {
            p.name = v.clone();
        }
        if let Some(v) = &self.description {
            p.description = v.clone();
        }
        if let Some(v) = self.price {
            p.price = v;
        }
        if let Some(v) = &self.image_url {
            p.image_url = v.clone();
        }
        if let Some(v) = &self.category {
            p.category = v.clone();
        }
        if let Some(v) = &self.size {
            p.size = v.clone();
        }
        if let Some(v) = self.stock {
            p.stock = v;
        }
        if let Some(v) = self.ratings {
            p.ratings = v;
        }
        if let Some(v) = self.reviews {
            p.reviews = v;
        }
    }
}

/// Listing filter. A `None` dimension matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub size: Option<String>,
    pub name_contains: Option<String>,
}

/// Value the storefront sends to mean "do not filter on this dimension".
pub const ALL: &str = "all";

impl ProductFilter {
    pub fn new(category: Option<String>, size: Option<String>, name: Option<String>) -> Self {
        fn dimension(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && s != ALL)
        }
        Self {
            category: dimension(category),
            size: dimension(size),
            name_contains: name.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        }
    }

    /// Exact category/size, case-insensitive substring on name.
    pub fn matches(&self, p: &Product) -> bool {
        self.category.as_ref().map_or(true, |c| &p.category == c)
            && self.size.as_ref().map_or(true, |s| &p.size == s)
            && self
                .name_contains
                .as_ref()
                .map_or(true, |n| p.name.to_lowercase().contains(&n.to_lowercase()))
    }
}
