use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a recipe came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RecipeSource {
    Manual,
    Scraped,
    Imported,
}

impl fmt::Display for RecipeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecipeSource::Manual => write!(f, "manual"),
            RecipeSource::Scraped => write!(f, "scraped"),
            RecipeSource::Imported => write!(f, "imported"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RecipeStats {
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub saves: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    Pending,
    Accepted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeInvite {
    pub email: String,
    pub status: InviteStatus,
    pub invited_at: i64,
}

/// Recipe document (stored in the `recipes` collection)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub creator_id: String,
    pub source: RecipeSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default)]
    pub stats: RecipeStats,
    #[serde(default)]
    pub invites: Vec<RecipeInvite>,
}

/// Compact recipe listing used inside expanded user rows
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeSummary {
    pub id: String,
    pub title: String,
    pub source: RecipeSource,
    pub created_at: i64,
}

impl From<&Recipe> for RecipeSummary {
    fn from(recipe: &Recipe) -> Self {
        RecipeSummary {
            id: recipe.id.clone(),
            title: recipe.title.clone(),
            source: recipe.source,
            created_at: recipe.created_at,
        }
    }
}

/// Backoffice recipe row; the full document is attached only when expanded
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipeRow {
    pub id: String,
    pub title: String,
    pub creator_id: String,
    pub source: RecipeSource,
    pub created_at: i64,
    pub updated_at: i64,
    pub stats: RecipeStats,
    pub invite_count: usize,
    pub expanded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Recipe>,
}

impl RecipeRow {
    pub fn new(recipe: Recipe, expanded: bool) -> Self {
        RecipeRow {
            id: recipe.id.clone(),
            title: recipe.title.clone(),
            creator_id: recipe.creator_id.clone(),
            source: recipe.source,
            created_at: recipe.created_at,
            updated_at: recipe.updated_at,
            stats: recipe.stats.clone(),
            invite_count: recipe.invites.len(),
            expanded,
            detail: if expanded { Some(recipe) } else { None },
        }
    }
}

/// Request to create a manual recipe
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct CreateRecipeRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial recipe update. Fields are persisted as given.
#[derive(Debug, Clone, Default, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecipePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingredients: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<RecipeSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<RecipeStats>,
}

impl RecipePatch {
    pub fn apply(&self, recipe: &mut Recipe) {
        if let Some(title) = &self.title {
            recipe.title = title.clone();
        }
        if let Some(description) = &self.description {
            recipe.description = description.clone();
        }
        if let Some(ingredients) = &self.ingredients {
            recipe.ingredients = ingredients.clone();
        }
        if let Some(instructions) = &self.instructions {
            recipe.instructions = instructions.clone();
        }
        if let Some(tags) = &self.tags {
            recipe.tags = tags.clone();
        }
        if let Some(source) = self.source {
            recipe.source = source;
        }
        if let Some(stats) = &self.stats {
            recipe.stats = stats.clone();
        }
    }
}
