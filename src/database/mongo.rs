//! MongoDB database wrapper.

use mongodb::bson::{Document, doc};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use tracing::info;

/// Collections holding one document per chat.
const PER_CHAT_COLLECTIONS: [&str; 10] = [
    "antiflood",
    "blacklists",
    "warns_settings",
    "locks",
    "disabled",
    "captcha_settings",
    "join_settings",
    "report_settings",
    "pins",
    "chats",
];

/// Database wrapper for MongoDB operations.
#[derive(Debug, Clone)]
pub struct Database {
    db: mongodb::Database,
}

impl Database {
    /// Connect to MongoDB with the given URI and database name.
    ///
    /// # Errors
    /// Returns error if connection or the ping fails.
    pub async fn connect(uri: &str, db_name: &str) -> anyhow::Result<Self> {
        let options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(options)?;

        // Ping the database to verify connection
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        info!("Successfully connected to MongoDB");

        Ok(Self {
            db: client.database(db_name),
        })
    }

    /// Get a typed collection from the database.
    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    /// Create the unique indexes the upsert contracts rely on.
    pub async fn ensure_indexes(&self) -> anyhow::Result<()> {
        for name in PER_CHAT_COLLECTIONS {
            self.unique_index(name, doc! { "chat_id": 1 }).await?;
        }
        self.unique_index("filters", doc! { "chat_id": 1, "keyword": 1 }).await?;
        self.unique_index("warns_users", doc! { "chat_id": 1, "user_id": 1 }).await?;
        self.unique_index("captcha_attempts", doc! { "chat_id": 1, "user_id": 1 }).await?;
        self.unique_index("users", doc! { "user_id": 1 }).await?;
        self.unique_index("team", doc! { "user_id": 1 }).await?;

        self.collection::<Document>("captcha_attempts")
            .create_index(IndexModel::builder().keys(doc! { "expires_at": 1 }).build())
            .await?;
        self.collection::<Document>("users")
            .create_index(IndexModel::builder().keys(doc! { "username": 1 }).build())
            .await?;

        info!("MongoDB indexes ensured");
        Ok(())
    }

    async fn unique_index(&self, collection: &str, keys: Document) -> anyhow::Result<()> {
        let model = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection::<Document>(collection)
            .create_index(model)
            .await?;
        Ok(())
    }
}
