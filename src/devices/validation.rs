use super::media::{MediaFile, MediaKind};
use super::schema::{DeviceSchema, FieldKind};
use super::store::Row;
use crate::common::errors::BusinessResult;
use crate::validation_error;
use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

lazy_static! {
    static ref IDENTIFIER_PATTERN: Regex =
        Regex::new(r"^[A-Za-z]{2,6}-\d{2,6}[A-Za-z]?$").expect("identifier pattern is valid");
}

/// Checks one identifier (`PT-1001`, `PSHH-3020A`) against the device id format.
pub fn validate_identifier(field: &str, value: &str) -> BusinessResult<()> {
    if value.is_empty() {
        return Err(validation_error!(field, format!("{field} is required")));
    }
    if !IDENTIFIER_PATTERN.is_match(value) {
        return Err(validation_error!(
            field,
            format!(
                "{field} '{value}' must be 2-6 letters, a hyphen, 2-6 digits and an optional trailing letter (e.g. PT-1001)"
            )
        ));
    }
    Ok(())
}

/// Both identifiers must be well formed and identical.
pub fn validate_identifiers(id: &str, tag: &str) -> BusinessResult<()> {
    validate_identifier("id", id)?;
    validate_identifier("tag", tag)?;
    if id != tag {
        return Err(validation_error!(
            "tag",
            format!("tag '{tag}' must match id '{id}' exactly")
        ));
    }
    Ok(())
}

/// Raw text fields of a device form, keyed by field name.
#[derive(Debug, Clone, Default)]
pub struct DeviceDraft {
    fields: BTreeMap<String, String>,
}

impl DeviceDraft {
    pub fn insert(&mut self, name: &str, value: String) -> BusinessResult<()> {
        if self.fields.contains_key(name) {
            return Err(validation_error!(name, "provided more than once"));
        }
        self.fields.insert(name.to_string(), value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DeviceDraft {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftMode<'a> {
    Create,
    /// Editing the device stored under this id; absent fields are left alone.
    Update { id: &'a str },
}

/// Turns a draft into a typed row for the device table.
///
/// On create every required field must be present and non-empty. On update
/// only the submitted fields are written, the id is immutable and a submitted
/// tag must still equal it.
pub fn validate_draft(
    schema: &DeviceSchema,
    draft: &DeviceDraft,
    mode: DraftMode<'_>,
) -> BusinessResult<Row> {
    for name in draft.fields.keys() {
        if schema.field(name).is_none() {
            return Err(validation_error!(
                name,
                format!("unknown field for {}", schema.kind.singular())
            ));
        }
    }

    match mode {
        DraftMode::Create => {
            validate_identifiers(
                draft.get("id").map(str::trim).unwrap_or_default(),
                draft.get("tag").map(str::trim).unwrap_or_default(),
            )?;
        }
        DraftMode::Update { id } => {
            if let Some(submitted) = draft.get("id") {
                if submitted.trim() != id {
                    return Err(validation_error!("id", "id cannot be changed"));
                }
            }
            if let Some(tag) = draft.get("tag") {
                validate_identifiers(id, tag.trim())?;
            }
        }
    }

    let mut row = Row::new();
    for spec in schema.fields() {
        let raw = draft.get(spec.name).map(str::trim);

        let value = match raw {
            None | Some("") => {
                let must_be_present = spec.required && matches!(mode, DraftMode::Create);
                if must_be_present || (spec.required && raw.is_some()) {
                    return Err(validation_error!(
                        spec.name,
                        format!("{} is required", spec.name)
                    ));
                }
                match (mode, raw, spec.kind) {
                    (DraftMode::Update { .. }, None, _) => continue,
                    (_, _, FieldKind::Checkbox) => Value::Bool(false),
                    _ => Value::Null,
                }
            }
            Some(text) => parse_field(spec.name, spec.kind, text)?,
        };

        if matches!(mode, DraftMode::Update { .. }) && spec.name == "id" {
            continue;
        }
        row.insert(spec.name.to_string(), value);
    }

    Ok(row)
}

fn parse_field(name: &str, kind: FieldKind, text: &str) -> BusinessResult<Value> {
    match kind {
        FieldKind::Text => Ok(Value::String(text.to_string())),
        FieldKind::Date => NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map(|_| Value::String(text.to_string()))
            .map_err(|_| validation_error!(name, format!("'{text}' is not a YYYY-MM-DD date"))),
        FieldKind::Select(options) => {
            if options.contains(&text) {
                Ok(Value::String(text.to_string()))
            } else {
                Err(validation_error!(
                    name,
                    format!("'{text}' is not one of: {}", options.join(", "))
                ))
            }
        }
        FieldKind::Checkbox => match text.to_lowercase().as_str() {
            "true" | "on" | "1" => Ok(Value::Bool(true)),
            "false" | "off" | "0" => Ok(Value::Bool(false)),
            _ => Err(validation_error!(name, format!("'{text}' is not a boolean"))),
        },
        FieldKind::Integer => text
            .parse::<i32>()
            .ok()
            .filter(|count| *count >= 0)
            .map(Value::from)
            .ok_or_else(|| {
                validation_error!(name, format!("'{text}' is not a non-negative integer"))
            }),
    }
}

/// Media presence and content-type checks run before any upload.
pub fn validate_media(
    schema: &DeviceSchema,
    images: &[MediaFile],
    videos: &[MediaFile],
    mode: DraftMode<'_>,
) -> BusinessResult<()> {
    let creating = matches!(mode, DraftMode::Create);

    if creating && schema.requires_image && images.is_empty() {
        return Err(validation_error!("images", "at least one image is required"));
    }
    if videos.len() > 1 {
        return Err(validation_error!("video", "exactly one video is allowed"));
    }
    if creating && schema.requires_video && videos.is_empty() {
        return Err(validation_error!("video", "a video is required"));
    }

    for image in images {
        MediaKind::Image.check(image)?;
    }
    for video in videos {
        MediaKind::Video.check(video)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::errors::BusinessError;
    use crate::devices::schema::DeviceKind;
    use rstest::rstest;

    fn field_of(err: BusinessError) -> String {
        match err {
            BusinessError::ValidationError { field, .. } => field,
            other => panic!("Expected validation error, got {other:?}"),
        }
    }

    fn transmitter_draft() -> DeviceDraft {
        [
            ("id", "PT-1001"),
            ("tag", "PT-1001"),
            ("type", "Pressure Transmitter"),
            ("location", "Tank 4"),
            ("status", "working"),
            ("range", "0-10 bar"),
            ("created_at", "2025-01-01"),
        ]
        .into_iter()
        .collect()
    }

    #[rstest]
    #[case("PT-1001")]
    #[case("PSHH-3020A")]
    #[case("ab-12")]
    #[case("ABCDEF-123456")]
    #[case("LT-42b")]
    fn test_identifier_accepts(#[case] value: &str) {
        assert!(validate_identifier("id", value).is_ok());
    }

    #[rstest]
    #[case("PT1001")]
    #[case("pt-1")]
    #[case("PT-1001-A")]
    #[case("P-1001")]
    #[case("ABCDEFG-1001")]
    #[case("PT-1234567")]
    #[case("PT-10AB")]
    #[case(" PT-1001")]
    fn test_identifier_rejects(#[case] value: &str) {
        let err = validate_identifier("tag", value).unwrap_err();
        assert!(err.to_string().contains("must be 2-6 letters"));
        assert_eq!(field_of(err), "tag");
    }

    #[test]
    fn test_identifier_empty_is_required() {
        let err = validate_identifier("id", "").unwrap_err();
        assert!(err.to_string().contains("id is required"));
    }

    #[test]
    fn test_mismatched_id_and_tag_rejected() {
        let err = validate_identifiers("PT-1001", "PT-1002").unwrap_err();
        assert!(err.to_string().contains("must match id"));
        assert_eq!(field_of(err), "tag");
    }

    #[test]
    fn test_valid_transmitter_draft() {
        let row = validate_draft(
            DeviceKind::Transmitters.schema(),
            &transmitter_draft(),
            DraftMode::Create,
        )
        .unwrap();

        assert_eq!(row["id"], "PT-1001");
        assert_eq!(row["range"], "0-10 bar");
        assert_eq!(row["needs_scaffold"], false);
        assert_eq!(row["description"], Value::Null);
    }

    #[rstest]
    #[case("location")]
    #[case("status")]
    #[case("type")]
    #[case("created_at")]
    #[case("range")]
    fn test_missing_required_field(#[case] missing: &str) {
        let draft: DeviceDraft = transmitter_draft()
            .fields
            .into_iter()
            .filter(|(name, _)| name != missing)
            .collect();

        let err = validate_draft(DeviceKind::Transmitters.schema(), &draft, DraftMode::Create)
            .unwrap_err();
        assert_eq!(field_of(err), missing);
    }

    #[test]
    fn test_switch_requires_set_point() {
        let draft: DeviceDraft = [
            ("id", "PSH-201"),
            ("tag", "PSH-201"),
            ("type", "Pressure Switch High"),
            ("location", "Separator"),
            ("status", "faulty"),
            ("created_at", "2025-02-10"),
        ]
        .into_iter()
        .collect();

        let err =
            validate_draft(DeviceKind::Switches.schema(), &draft, DraftMode::Create).unwrap_err();
        assert_eq!(field_of(err), "set_point");
    }

    #[test]
    fn test_rejects_unknown_field_and_bad_values() {
        let mut draft = transmitter_draft();
        draft.insert("set_point", "5 bar".to_string()).unwrap();
        let err = validate_draft(DeviceKind::Transmitters.schema(), &draft, DraftMode::Create)
            .unwrap_err();
        assert_eq!(field_of(err), "set_point");

        let mut draft = transmitter_draft();
        draft.fields.insert("status".into(), "broken".into());
        let err = validate_draft(DeviceKind::Transmitters.schema(), &draft, DraftMode::Create)
            .unwrap_err();
        assert_eq!(field_of(err), "status");

        let mut draft = transmitter_draft();
        draft.fields.insert("created_at".into(), "01/01/2025".into());
        let err = validate_draft(DeviceKind::Transmitters.schema(), &draft, DraftMode::Create)
            .unwrap_err();
        assert_eq!(field_of(err), "created_at");
    }

    #[test]
    fn test_update_only_writes_submitted_fields() {
        let draft: DeviceDraft = [("location", "Tank 5"), ("needs_isolation", "on")]
            .into_iter()
            .collect();

        let row = validate_draft(
            DeviceKind::Transmitters.schema(),
            &draft,
            DraftMode::Update { id: "PT-1001" },
        )
        .unwrap();

        assert_eq!(row.len(), 2);
        assert_eq!(row["location"], "Tank 5");
        assert_eq!(row["needs_isolation"], true);
    }

    #[test]
    fn test_update_keeps_id_immutable() {
        let draft: DeviceDraft = [("tag", "PT-2002")].into_iter().collect();
        let err = validate_draft(
            DeviceKind::Transmitters.schema(),
            &draft,
            DraftMode::Update { id: "PT-1001" },
        )
        .unwrap_err();
        assert_eq!(field_of(err), "tag");

        let draft: DeviceDraft = [("id", "PT-2002")].into_iter().collect();
        let err = validate_draft(
            DeviceKind::Transmitters.schema(),
            &draft,
            DraftMode::Update { id: "PT-1001" },
        )
        .unwrap_err();
        assert_eq!(field_of(err), "id");
    }

    #[test]
    fn test_update_cannot_blank_required_field() {
        let draft: DeviceDraft = [("location", "  ")].into_iter().collect();
        let err = validate_draft(
            DeviceKind::Transmitters.schema(),
            &draft,
            DraftMode::Update { id: "PT-1001" },
        )
        .unwrap_err();
        assert_eq!(field_of(err), "location");
    }

    #[test]
    fn test_media_requirements() {
        let schema = DeviceKind::Valves.schema();
        let image = MediaFile::new("front.jpg", "image/jpeg", vec![1]);
        let video = MediaFile::new("walk.mp4", "video/mp4", vec![2]);

        let err = validate_media(schema, &[], &[video.clone()], DraftMode::Create).unwrap_err();
        assert_eq!(field_of(err), "images");

        let err = validate_media(schema, &[image.clone()], &[], DraftMode::Create).unwrap_err();
        assert_eq!(field_of(err), "video");

        let err = validate_media(
            schema,
            &[image.clone()],
            &[video.clone(), video.clone()],
            DraftMode::Create,
        )
        .unwrap_err();
        assert_eq!(field_of(err), "video");

        let err = validate_media(schema, &[video.clone()], &[video.clone()], DraftMode::Create)
            .unwrap_err();
        assert_eq!(field_of(err), "images");

        assert!(validate_media(schema, &[image], &[video], DraftMode::Create).is_ok());
        assert!(validate_media(schema, &[], &[], DraftMode::Update { id: "XV-100" }).is_ok());
    }
}
