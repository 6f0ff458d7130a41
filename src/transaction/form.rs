//! Reads transaction submissions from multipart forms.

use axum::extract::Multipart;

use crate::{Error, asset::guess_content_type};

use super::{RECEIPT_IMAGE_FIELD, RawFields, TRANSACTION_FIELDS};

/// A receipt image attached to a submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiptFile {
    /// The name the client gave the file.
    pub file_name: String,
    /// The MIME type, guessed from the file name if the client did not send one.
    pub content_type: String,
    /// The file contents.
    pub bytes: Vec<u8>,
}

/// The fields and optional receipt from a create or edit form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionSubmission {
    /// The transaction fields that were present in the form.
    pub fields: RawFields,
    /// The receipt image, if a non-empty file was attached.
    pub receipt: Option<ReceiptFile>,
}

impl TransactionSubmission {
    /// Read a submission from `multipart`.
    ///
    /// Unknown fields are ignored. An empty file part counts as no file.
    ///
    /// # Errors
    /// Returns [Error::MultipartError] if the form cannot be read.
    pub async fn from_multipart(multipart: Multipart) -> Result<Self, Error> {
        let (fields, receipt) =
            read_multipart_form(multipart, TRANSACTION_FIELDS, RECEIPT_IMAGE_FIELD, "receipt")
                .await?;

        Ok(Self { fields, receipt })
    }
}

/// Read the text fields named in `known_fields` and the file in `file_field`.
///
/// Unknown fields are ignored. An empty file part counts as no file, and a file
/// without a name is called `default_file_name`.
///
/// # Errors
/// Returns [Error::MultipartError] if the form cannot be read.
pub(crate) async fn read_multipart_form(
    mut multipart: Multipart,
    known_fields: &[&str],
    file_field: &str,
    default_file_name: &str,
) -> Result<(RawFields, Option<ReceiptFile>), Error> {
    let mut fields = RawFields::new();
    let mut file = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| Error::MultipartError(error.body_text()))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if name == file_field {
            let file_name = field
                .file_name()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(default_file_name)
                .to_owned();
            let content_type = field
                .content_type()
                .map(str::to_owned)
                .unwrap_or_else(|| guess_content_type(&file_name).to_owned());
            let bytes = field
                .bytes()
                .await
                .map_err(|error| Error::MultipartError(error.body_text()))?;

            if bytes.is_empty() {
                tracing::debug!("ignoring empty file '{file_name}'");
                continue;
            }

            file = Some(ReceiptFile {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else if known_fields.contains(&name.as_str()) {
            let value = field
                .text()
                .await
                .map_err(|error| Error::MultipartError(error.body_text()))?;
            fields.insert(name, value);
        } else {
            tracing::debug!("ignoring form field '{name}'");
        }
    }

    Ok((fields, file))
}
