use crate::common::errors::BusinessResult;
use crate::devices::media::MediaFile;
use crate::validation_error;
use axum::extract::Multipart;
use axum::extract::multipart::Field;

/// A multipart form split into text parts and file parts, both keyed by
/// part name and kept in submission order.
#[derive(Debug, Default)]
pub struct FormData {
    pub text: Vec<(String, String)>,
    pub files: Vec<(String, MediaFile)>,
}

impl FormData {
    pub fn take_text(&mut self, name: &str) -> Option<String> {
        let index = self.text.iter().position(|(part, _)| part == name)?;
        Some(self.text.remove(index).1)
    }

    pub fn take_texts(&mut self, name: &str) -> Vec<String> {
        let (taken, rest) = std::mem::take(&mut self.text)
            .into_iter()
            .partition::<Vec<_>, _>(|(part, _)| part == name);
        self.text = rest;
        taken.into_iter().map(|(_, value)| value).collect()
    }

    pub fn take_files(&mut self, names: &[&str]) -> Vec<MediaFile> {
        let (taken, rest) = std::mem::take(&mut self.files)
            .into_iter()
            .partition::<Vec<_>, _>(|(part, _)| names.contains(&part.as_str()));
        self.files = rest;
        taken.into_iter().map(|(_, file)| file).collect()
    }
}

async fn read_bytes(field: &mut Field<'_>, name: &str) -> BusinessResult<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| validation_error!(name, format!("could not read upload: {e}")))?
    {
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

/// Reads every part of a multipart body. Parts with a file name are files;
/// empty file inputs (no name, no bytes) are skipped.
pub async fn read_form(mut multipart: Multipart) -> BusinessResult<FormData> {
    let mut form = FormData::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| validation_error!("body", format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name.is_empty() {
            return Err(validation_error!("body", "multipart part without a name"));
        }

        match field.file_name().map(ToString::to_string) {
            Some(file_name) => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = read_bytes(&mut field, &name).await?;
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                form.files
                    .push((name, MediaFile::new(&file_name, &content_type, bytes)));
            }
            None => {
                let bytes = read_bytes(&mut field, &name).await?;
                let value = String::from_utf8(bytes)
                    .map_err(|_| validation_error!(name, "must be UTF-8 text"))?;
                form.text.push((name, value));
            }
        }
    }

    Ok(form)
}
