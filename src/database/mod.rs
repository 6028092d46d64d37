pub mod memory;
pub mod store;

pub use memory::MemoryStore;
pub use store::{DocumentStore, RECIPES, SETTINGS, USERS};

use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::bson::{doc, to_document, Document};
use mongodb::{Client, Collection, Database, IndexModel};
use std::error::Error;

use crate::models::{Recipe, RecipeInvite, RecipePatch, RoleSettings, User, UserPatch};
use crate::utils::error::AppError;
use crate::utils::query::prefix_range;

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

fn read_err(e: mongodb::error::Error) -> AppError {
    AppError::StoreRead(e.to_string())
}

fn write_err(e: mongodb::error::Error) -> AppError {
    AppError::StoreWrite(e.to_string())
}

fn encode_err(e: mongodb::bson::ser::Error) -> AppError {
    AppError::InvalidRequest(format!("Failed to encode update: {}", e))
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = uri
            .split('/')
            .last()
            .and_then(|s| s.split('?').next())
            .filter(|s| !s.is_empty() && !s.contains(':'))
            .unwrap_or("recipes");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };

        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates necessary indexes for the listing queries
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        log::info!("🔧 Creating database indexes...");

        // users(email) - unique, backs the prefix range search
        let users = self.collection::<Document>(USERS);
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(
                mongodb::options::IndexOptions::builder()
                    .unique(true)
                    .build(),
            )
            .build();

        match users.create_index(email_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(email)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // recipes(creatorId) - per-creator enrichment of the users table
        let recipes = self.collection::<Document>(RECIPES);
        let creator_index = IndexModel::builder()
            .keys(doc! { "creatorId": 1 })
            .build();

        match recipes.create_index(creator_index).await {
            Ok(_) => log::info!("   ✅ Index created: recipes(creatorId)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }
}

#[async_trait]
impl DocumentStore for MongoDB {
    fn backend_tag(&self) -> &'static str {
        "mongo"
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .map(|_| ())
            .map_err(read_err)
    }

    async fn list_users(&self, email_prefix: Option<&str>) -> Result<Vec<User>, AppError> {
        let filter = match email_prefix {
            Some(prefix) => {
                let (lower, upper) = prefix_range(prefix);
                doc! { "email": { "$gte": lower, "$lte": upper } }
            }
            None => doc! {},
        };

        self.collection::<User>(USERS)
            .find(filter)
            .sort(doc! { "createdAt": 1, "_id": 1 })
            .await
            .map_err(read_err)?
            .try_collect()
            .await
            .map_err(read_err)
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, AppError> {
        self.collection::<User>(USERS)
            .find_one(doc! { "_id": id })
            .await
            .map_err(read_err)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.collection::<User>(USERS)
            .find_one(doc! { "email": email })
            .await
            .map_err(read_err)
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        self.collection::<User>(USERS)
            .insert_one(user)
            .await
            .map(|_| ())
            .map_err(write_err)
    }

    async fn update_user(&self, id: &str, patch: &UserPatch) -> Result<bool, AppError> {
        let set = to_document(patch).map_err(encode_err)?;
        if set.is_empty() {
            return Ok(self.find_user(id).await?.is_some());
        }

        let result = self
            .collection::<User>(USERS)
            .update_one(doc! { "_id": id }, doc! { "$set": set })
            .await
            .map_err(write_err)?;

        Ok(result.matched_count > 0)
    }

    async fn reassign_role(&self, from: &str, to: &str) -> Result<u64, AppError> {
        let result = self
            .collection::<User>(USERS)
            .update_many(doc! { "role": from }, doc! { "$set": { "role": to } })
            .await
            .map_err(write_err)?;

        Ok(result.modified_count)
    }

    async fn delete_user(&self, id: &str) -> Result<bool, AppError> {
        let result = self
            .collection::<User>(USERS)
            .delete_one(doc! { "_id": id })
            .await
            .map_err(write_err)?;

        Ok(result.deleted_count > 0)
    }

    async fn list_recipes(&self) -> Result<Vec<Recipe>, AppError> {
        self.collection::<Recipe>(RECIPES)
            .find(doc! {})
            .sort(doc! { "createdAt": 1, "_id": 1 })
            .await
            .map_err(read_err)?
            .try_collect()
            .await
            .map_err(read_err)
    }

    async fn recipes_by_creators(&self, creator_ids: &[String]) -> Result<Vec<Recipe>, AppError> {
        if creator_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.collection::<Recipe>(RECIPES)
            .find(doc! { "creatorId": { "$in": creator_ids.to_vec() } })
            .sort(doc! { "createdAt": 1, "_id": 1 })
            .await
            .map_err(read_err)?
            .try_collect()
            .await
            .map_err(read_err)
    }

    async fn find_recipe(&self, id: &str) -> Result<Option<Recipe>, AppError> {
        self.collection::<Recipe>(RECIPES)
            .find_one(doc! { "_id": id })
            .await
            .map_err(read_err)
    }

    async fn insert_recipe(&self, recipe: &Recipe) -> Result<(), AppError> {
        self.collection::<Recipe>(RECIPES)
            .insert_one(recipe)
            .await
            .map(|_| ())
            .map_err(write_err)
    }

    async fn update_recipe(&self, id: &str, patch: &RecipePatch, updated_at: i64) -> Result<bool, AppError> {
        let mut set = to_document(patch).map_err(encode_err)?;
        set.insert("updatedAt", updated_at);

        let result = self
            .collection::<Recipe>(RECIPES)
            .update_one(doc! { "_id": id }, doc! { "$set": set })
            .await
            .map_err(write_err)?;

        Ok(result.matched_count > 0)
    }

    async fn replace_recipe_invites(&self, id: &str, invites: &[RecipeInvite]) -> Result<bool, AppError> {
        let encoded = invites
            .iter()
            .map(|invite| to_document(invite))
            .collect::<Result<Vec<_>, _>>()
            .map_err(encode_err)?;

        let result = self
            .collection::<Recipe>(RECIPES)
            .update_one(doc! { "_id": id }, doc! { "$set": { "invites": encoded } })
            .await
            .map_err(write_err)?;

        Ok(result.matched_count > 0)
    }

    async fn delete_recipe(&self, id: &str) -> Result<bool, AppError> {
        let result = self
            .collection::<Recipe>(RECIPES)
            .delete_one(doc! { "_id": id })
            .await
            .map_err(write_err)?;

        Ok(result.deleted_count > 0)
    }

    async fn role_settings(&self, tenant: &str) -> Result<Option<RoleSettings>, AppError> {
        self.collection::<RoleSettings>(SETTINGS)
            .find_one(doc! { "_id": tenant })
            .await
            .map_err(read_err)
    }

    async fn save_role_settings(&self, settings: &RoleSettings) -> Result<(), AppError> {
        self.collection::<RoleSettings>(SETTINGS)
            .replace_one(doc! { "_id": &settings.tenant }, settings)
            .upsert(true)
            .await
            .map(|_| ())
            .map_err(write_err)
    }

    async fn configured_tenants(&self) -> Result<Vec<String>, AppError> {
        let ids = self
            .collection::<Document>(SETTINGS)
            .distinct("_id", doc! {})
            .await
            .map_err(read_err)?;

        Ok(ids
            .into_iter()
            .filter_map(|id| id.as_str().map(String::from))
            .collect())
    }
}
