//! Catalog of pre-available recordings.
//!
//! A manifest is a JSON array of locator strings.

use garden_core::{Error, OriginKind, RecordingId, RecordingMeta};
use std::path::Path;

pub fn parse_manifest(bytes: &[u8]) -> Result<Vec<String>, Error> {
    let locators: Vec<String> = serde_json::from_slice(bytes)
        .map_err(|e| Error::Serialization(format!("Invalid manifest: {}", e)))?;
    Ok(locators
        .into_iter()
        .map(|locator| locator.trim().to_string())
        .filter(|locator| !locator.is_empty())
        .collect())
}

/// Display name for a locator: its file stem, or the locator itself.
pub fn display_name(locator: &str) -> String {
    Path::new(locator)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| locator.to_string())
}

/// Library metadata for a manifest locator. The id is derived from the
/// locator so it is stable across sessions.
pub fn manifest_meta(locator: &str) -> RecordingMeta {
    RecordingMeta {
        id: RecordingId::for_locator(locator),
        name: display_name(locator),
        locator: locator.to_string(),
        origin: OriginKind::Public,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_locator_array() {
        let locators =
            parse_manifest(br#"["sounds/rain.ogg", "  ", "/abs/birds.mp3 "]"#).unwrap();
        assert_eq!(locators, vec!["sounds/rain.ogg", "/abs/birds.mp3"]);
    }

    #[test]
    fn rejects_non_array() {
        assert!(matches!(
            parse_manifest(br#"{"rain": 1}"#),
            Err(Error::Serialization(_))
        ));
        assert!(parse_manifest(b"").is_err());
    }

    #[test]
    fn names_come_from_file_stems() {
        assert_eq!(display_name("sounds/rain.ogg"), "rain");
        assert_eq!(display_name("creek"), "creek");
        assert_eq!(display_name(""), "");
    }

    #[test]
    fn manifest_ids_are_stable() {
        assert_eq!(manifest_meta("a/b.wav").id, manifest_meta("a/b.wav").id);
        assert_eq!(manifest_meta("a/b.wav").origin, OriginKind::Public);
    }
}
