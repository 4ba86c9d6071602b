//! Navigation menu derived from the router's route table.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

const DEFAULT_CATEGORY_ICON: &str = "i-lucide-folder";
const DEFAULT_PAGE_ICON: &str = "i-lucide-file";

/// Route names that never appear in navigation.
const EXCLUDED_NAMES: &[&str] = &["index", "all"];
/// Route name fragments that never appear in navigation.
const EXCLUDED_FRAGMENTS: &[&str] = &[
    "auth-callback",
    "organizations-ComponentForm",
    "organizations-name",
];

/// A registered route as exposed by the router.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteRecord {
    #[serde(default)]
    pub name: Option<String>,
    pub path: String,
    #[serde(default)]
    pub meta: RouteMeta,
}

impl RouteRecord {
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            path: path.into(),
            meta: RouteMeta::default(),
        }
    }

    #[must_use]
    pub fn with_meta(mut self, meta: RouteMeta) -> Self {
        self.meta = meta;
        self
    }
}

/// Page metadata declared next to each route.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RouteMeta {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

impl RouteMeta {
    #[must_use]
    pub fn in_category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }
}

/// Label and icon of a category, from app config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageCategory {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavCategory {
    pub label: Option<String>,
    pub icon: String,
    /// Path of the first route seen in this category.
    pub to: String,
    pub children: Vec<NavEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavEntry {
    pub label: String,
    pub description: Option<String>,
    pub icon: String,
    pub to: String,
}

/// Whether a route is kept out of navigation by name.
#[must_use]
pub fn is_excluded(route: &RouteRecord) -> bool {
    let Some(name) = route.name.as_deref() else {
        return false;
    };
    EXCLUDED_NAMES.contains(&name) || EXCLUDED_FRAGMENTS.iter().any(|f| name.contains(f))
}

/// Group routes by `meta.category`, in first-seen order.
///
/// Routes without a category (absent or empty) are dropped; there is no
/// catch-all bucket.
#[must_use]
pub fn build_catalog(
    routes: &[RouteRecord],
    categories: &HashMap<String, PageCategory>,
) -> Vec<NavCategory> {
    let mut grouped: IndexMap<&str, NavCategory> = IndexMap::new();

    for route in routes.iter().filter(|r| !is_excluded(r)) {
        let Some(category) = non_empty(route.meta.category.as_deref()) else {
            continue;
        };

        let entry = grouped.entry(category).or_insert_with(|| {
            let config = categories.get(category);
            NavCategory {
                label: config.and_then(|c| c.label.clone()),
                icon: config
                    .and_then(|c| non_empty(c.icon.as_deref()))
                    .unwrap_or(DEFAULT_CATEGORY_ICON)
                    .to_string(),
                to: route.path.clone(),
                children: Vec::new(),
            }
        });

        entry.children.push(NavEntry {
            label: non_empty(route.meta.name.as_deref())
                .or(route.name.as_deref())
                .unwrap_or_default()
                .to_string(),
            description: route.meta.description.clone(),
            icon: non_empty(route.meta.icon.as_deref())
                .unwrap_or(DEFAULT_PAGE_ICON)
                .to_string(),
            to: route.path.clone(),
        });
    }

    grouped.into_values().collect()
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}
