//! Request payload validation
//!
//! Every request body is checked here before any row is created. Failures
//! map to `VAL_400` and carry a field-specific message.

use serde::Deserialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::brand_voice::BrandVoiceProfile;
use crate::constants::{
    BRAND_VOICE_FIELD_MAX_CHARS, BRAND_VOICE_MAX_SAMPLES, BRAND_VOICE_MIN_SAMPLES,
    BRAND_VOICE_SAMPLE_MAX_CHARS, TRANSFORM_INPUT_MAX_CHARS, TRANSFORM_INPUT_MIN_CHARS,
};
use crate::error::ApiError;
use crate::prompt::{OutputLength, Tone, TransformationKind};

/// Mime types accepted for upload intents
const ACCEPTED_MIME_TYPES: &[&str] = &[
    "audio/mpeg",
    "audio/mp4",
    "audio/wav",
    "audio/x-wav",
    "audio/ogg",
    "audio/webm",
    "audio/flac",
    "video/mp4",
    "video/webm",
    "video/quicktime",
];

const MAX_PREFERENCE_ENTRIES: usize = 20;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscribeRequest {
    pub asset_id: String,
    pub language: Option<String>,
}

impl TranscribeRequest {
    /// Returns (asset_id, language) after shape checks
    pub fn validate(&self) -> Result<(String, String), ApiError> {
        let asset_id = parse_uuid(&self.asset_id, "assetId")?;
        let language = match self.language.as_deref() {
            None => "auto".to_string(),
            Some(tag) => {
                if !is_language_tag(tag) {
                    return Err(ApiError::Validation(format!(
                        "language must be a tag like 'en' or 'pt-BR', got '{}'",
                        tag
                    )));
                }
                tag.to_string()
            }
        };
        Ok((asset_id, language))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    pub input_text: String,
    pub kind: String,
    pub length: String,
    pub tone: String,
}

/// A transform request with every field parsed
pub struct ValidTransform {
    pub input_text: String,
    pub kind: TransformationKind,
    pub length: OutputLength,
    pub tone: Tone,
}

impl TransformRequest {
    pub fn validate(&self) -> Result<ValidTransform, ApiError> {
        let chars = self.input_text.chars().count();
        if chars < TRANSFORM_INPUT_MIN_CHARS || chars > TRANSFORM_INPUT_MAX_CHARS {
            return Err(ApiError::Validation(format!(
                "inputText must be between {} and {} characters, got {}",
                TRANSFORM_INPUT_MIN_CHARS, TRANSFORM_INPUT_MAX_CHARS, chars
            )));
        }

        let kind = TransformationKind::parse(&self.kind).ok_or_else(|| {
            ApiError::Validation(format!("kind must be one of post/summary/newsletter/script, got '{}'", self.kind))
        })?;
        let length = OutputLength::parse(&self.length).ok_or_else(|| {
            ApiError::Validation(format!("length must be one of short/medium/long, got '{}'", self.length))
        })?;
        let tone = Tone::parse(&self.tone).ok_or_else(|| {
            ApiError::Validation(format!(
                "tone must be one of professional/casual/mystical/inspirational/bold, got '{}'",
                self.tone
            ))
        })?;

        Ok(ValidTransform {
            input_text: self.input_text.clone(),
            kind,
            length,
            tone,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainBrandVoiceRequest {
    pub tone: String,
    pub style: String,
    pub samples: Vec<String>,
    pub preferences: Option<BTreeMap<String, String>>,
}

impl TrainBrandVoiceRequest {
    /// Shape-check and normalize into a profile ready to persist
    ///
    /// Samples beyond the per-sample character cap are truncated, not
    /// rejected; the sample count itself is a hard bound.
    pub fn validate(&self) -> Result<BrandVoiceProfile, ApiError> {
        let tone = bounded_field(&self.tone, "tone")?;
        let style = bounded_field(&self.style, "style")?;

        if self.samples.len() < BRAND_VOICE_MIN_SAMPLES
            || self.samples.len() > BRAND_VOICE_MAX_SAMPLES
        {
            return Err(ApiError::Validation(format!(
                "samples must contain between {} and {} entries, got {}",
                BRAND_VOICE_MIN_SAMPLES,
                BRAND_VOICE_MAX_SAMPLES,
                self.samples.len()
            )));
        }

        let samples: Vec<String> = self
            .samples
            .iter()
            .map(|s| s.chars().take(BRAND_VOICE_SAMPLE_MAX_CHARS).collect())
            .collect();

        let preferences = self.preferences.clone().unwrap_or_default();
        if preferences.len() > MAX_PREFERENCE_ENTRIES {
            return Err(ApiError::Validation(format!(
                "preferences must contain at most {} entries",
                MAX_PREFERENCE_ENTRIES
            )));
        }
        for (key, value) in &preferences {
            if key.is_empty() || key.chars().count() > BRAND_VOICE_FIELD_MAX_CHARS {
                return Err(ApiError::Validation("preference keys must be non-empty and bounded".to_string()));
            }
            if value.chars().count() > BRAND_VOICE_FIELD_MAX_CHARS {
                return Err(ApiError::Validation(format!(
                    "preference '{}' exceeds {} characters",
                    key, BRAND_VOICE_FIELD_MAX_CHARS
                )));
            }
        }

        Ok(BrandVoiceProfile {
            tone,
            style,
            samples,
            preferences,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssetRequest {
    pub file_name: String,
    pub mime_type: String,
}

impl CreateAssetRequest {
    /// Returns the file extension to use for the storage path
    pub fn validate(&self) -> Result<String, ApiError> {
        if self.file_name.is_empty() || self.file_name.chars().count() > 255 {
            return Err(ApiError::Validation(
                "fileName must be between 1 and 255 characters".to_string(),
            ));
        }

        if !ACCEPTED_MIME_TYPES.contains(&self.mime_type.as_str()) {
            return Err(ApiError::Validation(format!(
                "mimeType '{}' is not an accepted audio/video type",
                self.mime_type
            )));
        }

        let extension = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("bin");

        Ok(extension.to_ascii_lowercase())
    }
}

pub fn parse_uuid(value: &str, field: &str) -> Result<String, ApiError> {
    Uuid::parse_str(value)
        .map(|u| u.to_string())
        .map_err(|_| ApiError::Validation(format!("{} must be a valid uuid", field)))
}

/// Accepts 'auto', two-letter tags, and region-qualified tags like 'pt-BR'
fn is_language_tag(tag: &str) -> bool {
    if tag == "auto" {
        return true;
    }
    let mut parts = tag.splitn(2, '-');
    let primary = parts.next().unwrap_or("");
    if primary.len() != 2 || !primary.chars().all(|c| c.is_ascii_lowercase()) {
        return false;
    }
    match parts.next() {
        None => true,
        Some(region) => region.len() == 2 && region.chars().all(|c| c.is_ascii_uppercase()),
    }
}

fn bounded_field(value: &str, field: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().count() > BRAND_VOICE_FIELD_MAX_CHARS {
        return Err(ApiError::Validation(format!(
            "{} must be non-empty and at most {} characters",
            field, BRAND_VOICE_FIELD_MAX_CHARS
        )));
    }
    Ok(trimmed.to_string())
}
