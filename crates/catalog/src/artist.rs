use serde::{Deserialize, Serialize};

use encore_core::{ArtistId, Entity};

use crate::wire;

/// Cached copy of a remote artist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: ArtistId,

    #[serde(rename = "nombre", alias = "name")]
    pub name: String,

    #[serde(rename = "genero", alias = "genre", default, deserialize_with = "wire::null_as_default")]
    pub genre: Option<String>,

    #[serde(default, deserialize_with = "wire::null_as_default")]
    pub email: Option<String>,

    #[serde(default = "wire::default_active", deserialize_with = "wire::flag")]
    pub active: bool,
}

impl Entity for Artist {
    type Id = ArtistId;

    fn id(&self) -> Self::Id {
        self.id
    }
}

impl core::fmt::Display for Artist {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{} {}", self.id, self.name)?;
        if let Some(genre) = &self.genre {
            write!(f, " ({genre})")?;
        }
        if let Some(email) = &self.email {
            write!(f, " - {email}")?;
        }
        f.write_str(if self.active { " [active]" } else { " [inactive]" })
    }
}

/// Payload for creating or updating an artist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtistDraft {
    #[serde(rename = "nombre")]
    pub name: String,

    #[serde(rename = "genero", skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    pub active: bool,
}

impl ArtistDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            genre: None,
            email: None,
            active: true,
        }
    }
}

impl From<&Artist> for ArtistDraft {
    fn from(artist: &Artist) -> Self {
        Self {
            name: artist.name.clone(),
            genre: artist.genre.clone(),
            email: artist.email.clone(),
            active: artist.active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_numeric_active_flags_and_nulls() {
        let artist: Artist =
            serde_json::from_str(r#"{"id":4,"nombre":"Nina","genero":null,"email":"n@x.io","active":0}"#).unwrap();
        assert_eq!(artist.id, ArtistId::new(4));
        assert_eq!(artist.genre, None);
        assert!(!artist.active);
    }

    #[test]
    fn missing_active_defaults_to_true() {
        let artist: Artist = serde_json::from_str(r#"{"id":1,"name":"Leo"}"#).unwrap();
        assert!(artist.active);
        assert_eq!(artist.name, "Leo");
    }

    #[test]
    fn draft_omits_absent_optional_fields() {
        let json = serde_json::to_value(ArtistDraft::named("Leo")).unwrap();
        assert_eq!(json, serde_json::json!({"nombre": "Leo", "active": true}));
    }
}
