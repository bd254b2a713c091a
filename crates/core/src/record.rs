//! File records and the schema fields the adapter contributes
//!
//! A `FileRecord` is owned by the host. The adapter fills in the storage
//! fields on a successful upload and reads them back for remove and URL
//! lookups.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Extra record fields supported by the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaField {
    Filename,
    Bucket,
    Path,
}

impl SchemaField {
    pub const ALL: [SchemaField; 3] = [SchemaField::Filename, SchemaField::Bucket, SchemaField::Path];

    /// Field name as stored by the host
    pub const fn name(self) -> &'static str {
        match self {
            SchemaField::Filename => "filename",
            SchemaField::Bucket => "bucket",
            SchemaField::Path => "path",
        }
    }

    pub const fn persisted_by_default(self) -> bool {
        matches!(self, SchemaField::Filename)
    }
}

/// Which extra fields the host persists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaFields {
    #[serde(default = "default_true")]
    pub filename: bool,

    #[serde(default)]
    pub bucket: bool,

    #[serde(default)]
    pub path: bool,
}

fn default_true() -> bool {
    true
}

impl Default for SchemaFields {
    fn default() -> Self {
        Self {
            filename: SchemaField::Filename.persisted_by_default(),
            bucket: SchemaField::Bucket.persisted_by_default(),
            path: SchemaField::Path.persisted_by_default(),
        }
    }
}

impl SchemaFields {
    pub fn is_enabled(&self, field: SchemaField) -> bool {
        match field {
            SchemaField::Filename => self.filename,
            SchemaField::Bucket => self.bucket,
            SchemaField::Path => self.path,
        }
    }

    /// Enabled fields, in declaration order
    pub fn enabled(&self) -> impl Iterator<Item = SchemaField> + '_ {
        SchemaField::ALL
            .into_iter()
            .filter(|field| self.is_enabled(*field))
    }
}

/// Host-owned descriptor of an uploaded file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Local source file, only meaningful before upload
    #[serde(skip)]
    pub local_path: PathBuf,

    /// Name the file had on the client side
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,

    /// Size in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Generated target filename
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Storage path component of the key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Object key: `{path}/{filename}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    /// Derived public URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl FileRecord {
    /// Create a record for a local file awaiting upload
    pub fn new(local_path: impl Into<PathBuf>) -> Self {
        Self {
            local_path: local_path.into(),
            ..Default::default()
        }
    }

    pub fn with_original_name(mut self, name: impl Into<String>) -> Self {
        self.original_name = Some(name.into());
        self
    }

    pub fn with_mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Extension of the source file, taken from the original name first
    pub fn extension(&self) -> Option<String> {
        self.original_name
            .as_deref()
            .and_then(|name| Path::new(name).extension())
            .or_else(|| self.local_path.extension())
            .map(|ext| ext.to_string_lossy().into_owned())
    }

    /// Content type to send with the upload
    ///
    /// Uses the host-provided mimetype, falling back to a guess from the
    /// file name.
    pub fn content_type(&self) -> String {
        if let Some(mimetype) = &self.mimetype {
            return mimetype.clone();
        }

        let guess_from = self
            .original_name
            .as_deref()
            .map(Path::new)
            .unwrap_or(self.local_path.as_path());
        mime_guess::from_path(guess_from)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }

    /// Human-readable label for log lines and errors
    pub fn label(&self) -> String {
        self.key
            .clone()
            .or_else(|| self.original_name.clone())
            .unwrap_or_else(|| self.local_path.display().to_string())
    }

    /// Render the fields the host stores for this record
    ///
    /// Base fields are always present when set; `filename`, `bucket` and
    /// `path` follow the schema toggles.
    pub fn persisted_fields(&self, schema: &SchemaFields) -> Value {
        let mut fields = Map::new();

        let base = [
            ("key", self.key.clone().map(Value::from)),
            ("size", self.size.map(Value::from)),
            ("mimetype", self.mimetype.clone().map(Value::from)),
            ("original_name", self.original_name.clone().map(Value::from)),
            ("url", self.url.clone().map(Value::from)),
        ];
        for (name, value) in base {
            if let Some(value) = value {
                fields.insert(name.to_string(), value);
            }
        }

        for field in schema.enabled() {
            let value = match field {
                SchemaField::Filename => &self.filename,
                SchemaField::Bucket => &self.bucket,
                SchemaField::Path => &self.path,
            };
            if let Some(value) = value {
                fields.insert(field.name().to_string(), Value::from(value.clone()));
            }
        }

        Value::Object(fields)
    }
}
