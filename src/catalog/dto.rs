use serde::Deserialize;

/// Admin form for a new product. Fields are optional here so that a missing
/// one is answered with the required-fields message, not a parse error.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub size: Option<String>,
    pub stock: Option<i64>,
    pub ratings: Option<f64>,
    pub reviews: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub category: Option<String>,
    pub size: Option<String>,
    pub name: Option<String>,
}
