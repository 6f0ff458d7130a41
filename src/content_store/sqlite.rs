//! A [ContentStore] backed by a local SQLite database.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, Row};

use super::{
    AssetFile, AssetId, ContentStore, ContentStoreError, Entry, EntryId, Fields, NewAsset,
    ProcessingState, StoredAsset, UploadId,
};

/// Stores entries and assets in SQLite.
///
/// Asset processing completes as soon as it is requested, producing a
/// protocol-relative URL under `asset_host`, e.g. `//localhost:3000/assets/{id}/{file}`.
#[derive(Debug, Clone)]
pub struct SqliteContentStore {
    connection: Arc<Mutex<Connection>>,
    asset_host: String,
}

impl SqliteContentStore {
    /// Create a store over `connection`, creating the tables if they do not exist.
    ///
    /// # Errors
    /// Returns an error if the tables could not be created.
    pub fn new(connection: Connection, asset_host: &str) -> Result<Self, rusqlite::Error> {
        initialize(&connection)?;

        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            asset_host: asset_host.trim_end_matches('/').to_owned(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ContentStoreError> {
        self.connection.lock().map_err(|error| {
            tracing::error!("could not acquire the database lock: {error}");
            ContentStoreError::Unavailable("could not acquire the database lock".to_owned())
        })
    }
}

impl From<rusqlite::Error> for ContentStoreError {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => ContentStoreError::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {error}");
                ContentStoreError::Unavailable(error.to_string())
            }
        }
    }
}

/// Create the upload, asset and entry tables.
///
/// # Errors
/// Returns an error if a table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS upload (
            id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(11)))),
            data BLOB NOT NULL
        );
        CREATE TABLE IF NOT EXISTS asset (
            id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(11)))),
            upload_id TEXT NOT NULL,
            title TEXT NOT NULL,
            file_name TEXT NOT NULL,
            content_type TEXT NOT NULL,
            url TEXT,
            processing TEXT NOT NULL DEFAULT 'pending',
            published INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY(upload_id) REFERENCES upload(id)
        );
        CREATE TABLE IF NOT EXISTS entry (
            id TEXT PRIMARY KEY DEFAULT (lower(hex(randomblob(11)))),
            content_type TEXT NOT NULL,
            fields TEXT NOT NULL,
            published INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_entry_content_type ON entry(content_type);",
    )
}

const ASSET_COLUMNS: &str = "id, title, file_name, content_type, url, processing, published";
const ENTRY_COLUMNS: &str = "id, content_type, fields, published";

fn map_asset_row(row: &Row) -> Result<StoredAsset, rusqlite::Error> {
    let processing: String = row.get(5)?;
    let processing = ProcessingState::parse(&processing).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            rusqlite::types::Type::Text,
            format!("unknown processing state {processing:?}").into(),
        )
    })?;

    Ok(StoredAsset {
        id: AssetId::new(row.get::<_, String>(0)?),
        title: row.get(1)?,
        file_name: row.get(2)?,
        content_type: row.get(3)?,
        url: row.get(4)?,
        processing,
        published: row.get(6)?,
    })
}

fn map_entry_row(row: &Row) -> Result<Entry, rusqlite::Error> {
    let fields: String = row.get(2)?;
    let fields: Fields = serde_json::from_str(&fields).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, error.into())
    })?;

    Ok(Entry {
        id: EntryId::new(row.get::<_, String>(0)?),
        content_type: row.get(1)?,
        fields,
        published: row.get(3)?,
    })
}

fn encode_fields(fields: &Fields) -> Result<String, ContentStoreError> {
    serde_json::to_string(fields).map_err(|error| {
        ContentStoreError::Unavailable(format!("could not serialize entry fields: {error}"))
    })
}

fn get_asset(id: &AssetId, connection: &Connection) -> Result<StoredAsset, ContentStoreError> {
    connection
        .prepare(&format!("SELECT {ASSET_COLUMNS} FROM asset WHERE id = ?1"))?
        .query_row([id.as_str()], map_asset_row)
        .map_err(ContentStoreError::from)
}

fn get_entry(id: &EntryId, connection: &Connection) -> Result<Entry, ContentStoreError> {
    connection
        .prepare(&format!("SELECT {ENTRY_COLUMNS} FROM entry WHERE id = ?1"))?
        .query_row([id.as_str()], map_entry_row)
        .map_err(ContentStoreError::from)
}

/// Turn a client supplied file name into a single URL path segment.
///
/// Directories are stripped and characters outside `[A-Za-z0-9._-]` become `_`.
fn url_path_segment(file_name: &str) -> String {
    let base_name = file_name.rsplit(['/', '\\']).next().unwrap_or_default();
    let segment: String = base_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if segment.trim_matches('.').is_empty() {
        "file".to_owned()
    } else {
        segment
    }
}

fn set_entry_published(
    id: &EntryId,
    published: bool,
    connection: &Connection,
) -> Result<Entry, ContentStoreError> {
    connection
        .prepare(&format!(
            "UPDATE entry SET published = ?1 WHERE id = ?2 RETURNING {ENTRY_COLUMNS}"
        ))?
        .query_row((published, id.as_str()), map_entry_row)
        .map_err(ContentStoreError::from)
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn create_upload(&self, bytes: Vec<u8>) -> Result<UploadId, ContentStoreError> {
        let connection = self.lock()?;

        let id: String = connection
            .prepare("INSERT INTO upload (data) VALUES (?1) RETURNING id")?
            .query_row([bytes], |row| row.get(0))?;

        Ok(UploadId::new(id))
    }

    async fn create_asset(&self, asset: NewAsset) -> Result<StoredAsset, ContentStoreError> {
        let connection = self.lock()?;

        let upload_exists = connection
            .query_row(
                "SELECT 1 FROM upload WHERE id = ?1",
                [asset.upload_id.as_str()],
                |_| Ok(()),
            )
            .optional()?
            .is_some();

        if !upload_exists {
            return Err(ContentStoreError::NotFound);
        }

        connection
            .prepare(&format!(
                "INSERT INTO asset (upload_id, title, file_name, content_type)
                 VALUES (?1, ?2, ?3, ?4)
                 RETURNING {ASSET_COLUMNS}"
            ))?
            .query_row(
                (
                    asset.upload_id.as_str(),
                    &asset.title,
                    &asset.file_name,
                    &asset.content_type,
                ),
                map_asset_row,
            )
            .map_err(ContentStoreError::from)
    }

    async fn process_asset(&self, id: &AssetId) -> Result<(), ContentStoreError> {
        let connection = self.lock()?;
        let asset = get_asset(id, &connection)?;

        let url = format!(
            "//{}/assets/{}/{}",
            self.asset_host,
            asset.id,
            url_path_segment(&asset.file_name)
        );

        connection.execute(
            "UPDATE asset SET url = ?1, processing = ?2 WHERE id = ?3",
            (url, ProcessingState::Ready.as_str(), id.as_str()),
        )?;

        Ok(())
    }

    async fn get_asset(&self, id: &AssetId) -> Result<StoredAsset, ContentStoreError> {
        let connection = self.lock()?;

        get_asset(id, &connection)
    }

    async fn publish_asset(&self, id: &AssetId) -> Result<StoredAsset, ContentStoreError> {
        let connection = self.lock()?;

        connection
            .prepare(&format!(
                "UPDATE asset SET published = 1 WHERE id = ?1 RETURNING {ASSET_COLUMNS}"
            ))?
            .query_row([id.as_str()], map_asset_row)
            .map_err(ContentStoreError::from)
    }

    async fn get_asset_file(&self, id: &AssetId) -> Result<AssetFile, ContentStoreError> {
        let connection = self.lock()?;

        connection
            .prepare(
                "SELECT asset.file_name, asset.content_type, upload.data FROM asset
                 INNER JOIN upload ON asset.upload_id = upload.id
                 WHERE asset.id = ?1 AND asset.published = 1",
            )?
            .query_row([id.as_str()], |row| {
                Ok(AssetFile {
                    file_name: row.get(0)?,
                    content_type: row.get(1)?,
                    bytes: row.get(2)?,
                })
            })
            .map_err(ContentStoreError::from)
    }

    async fn create_entry(
        &self,
        content_type: &str,
        fields: Fields,
    ) -> Result<Entry, ContentStoreError> {
        let encoded_fields = encode_fields(&fields)?;
        let connection = self.lock()?;

        connection
            .prepare(&format!(
                "INSERT INTO entry (content_type, fields) VALUES (?1, ?2) RETURNING {ENTRY_COLUMNS}"
            ))?
            .query_row((content_type, encoded_fields), map_entry_row)
            .map_err(ContentStoreError::from)
    }

    async fn get_entry(&self, id: &EntryId) -> Result<Entry, ContentStoreError> {
        let connection = self.lock()?;

        get_entry(id, &connection)
    }

    async fn find_entries(
        &self,
        content_type: &str,
        field_equals: Option<(&str, &str)>,
    ) -> Result<Vec<Entry>, ContentStoreError> {
        let connection = self.lock()?;

        let entries = match field_equals {
            Some((name, value)) => connection
                .prepare(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM entry
                     WHERE content_type = ?1 AND json_extract(fields, ?2) = ?3
                     ORDER BY rowid ASC"
                ))?
                .query_map(
                    (content_type, format!("$.\"{name}\""), value),
                    map_entry_row,
                )?
                .collect::<Result<Vec<_>, _>>()?,
            None => connection
                .prepare(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM entry WHERE content_type = ?1 ORDER BY rowid ASC"
                ))?
                .query_map([content_type], map_entry_row)?
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(entries)
    }

    async fn update_entry(
        &self,
        id: &EntryId,
        fields: Fields,
    ) -> Result<Entry, ContentStoreError> {
        let encoded_fields = encode_fields(&fields)?;
        let connection = self.lock()?;

        connection
            .prepare(&format!(
                "UPDATE entry SET fields = ?1 WHERE id = ?2 RETURNING {ENTRY_COLUMNS}"
            ))?
            .query_row((encoded_fields, id.as_str()), map_entry_row)
            .map_err(ContentStoreError::from)
    }

    async fn publish_entry(&self, id: &EntryId) -> Result<Entry, ContentStoreError> {
        let connection = self.lock()?;

        set_entry_published(id, true, &connection)
    }

    async fn unpublish_entry(&self, id: &EntryId) -> Result<Entry, ContentStoreError> {
        let connection = self.lock()?;

        if !get_entry(id, &connection)?.published {
            return Err(ContentStoreError::NotPublished);
        }

        set_entry_published(id, false, &connection)
    }

    async fn delete_entry(&self, id: &EntryId) -> Result<(), ContentStoreError> {
        let connection = self.lock()?;

        if get_entry(id, &connection)?.published {
            return Err(ContentStoreError::StillPublished);
        }

        connection.execute("DELETE FROM entry WHERE id = ?1", [id.as_str()])?;

        Ok(())
    }
}
