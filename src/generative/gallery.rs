//! Reference gallery — labelled photos the first round can start from
//!
//! The witness describes the face in broad strokes (gender, age, hair,
//! glasses, moustache, beard); references that fit the description are
//! encoded into the latent space and shown in round 0 instead of pure prior
//! samples. Unknown traits put no constraint on the match.

use super::ImageHandle;
use crate::error::{IdkitError, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeGroup {
    Young,
    Old,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hair {
    Black,
    Blond,
    Brown,
    Grey,
    Bald,
}

/// Visible traits of a face. On a reference `None` means the trait was not
/// annotated; in a query it means the witness does not know.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attributes {
    pub gender: Option<Gender>,
    pub age: Option<AgeGroup>,
    pub hair: Option<Hair>,
    pub glasses: bool,
    pub moustache: bool,
    pub beard: bool,
}

impl Attributes {
    /// Whether a reference with these traits fits `query`. Accessories only
    /// constrain the match when the query asks for them.
    pub fn matches(&self, query: &Attributes) -> bool {
        fn fits<T: PartialEq>(have: Option<T>, want: Option<T>) -> bool {
            want.map_or(true, |w| have == Some(w))
        }
        fits(self.gender, query.gender)
            && fits(self.age, query.age)
            && fits(self.hair, query.hair)
            && (!query.glasses || self.glasses)
            && (!query.moustache || self.moustache)
            && (!query.beard || self.beard)
    }

    /// Parse `key=value` terms and bare accessory flags, e.g.
    /// `gender=female hair=blond glasses`
    pub fn parse_terms<S: AsRef<str>>(terms: &[S]) -> Result<Self> {
        let mut attributes = Attributes::default();
        for term in terms {
            let term = term.as_ref();
            match term.split_once('=') {
                Some(("gender", value)) => attributes.gender = Some(parse_value(term, value)?),
                Some(("age", value)) => attributes.age = Some(parse_value(term, value)?),
                Some(("hair", value)) => attributes.hair = Some(parse_value(term, value)?),
                None if term == "glasses" => attributes.glasses = true,
                None if term == "moustache" => attributes.moustache = true,
                None if term == "beard" => attributes.beard = true,
                _ => {
                    return Err(IdkitError::Initialization(format!(
                        "unknown attribute term '{}'",
                        term
                    )))
                }
            }
        }
        Ok(attributes)
    }
}

fn parse_value<T: serde::de::DeserializeOwned>(term: &str, value: &str) -> Result<T> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|_| IdkitError::Initialization(format!("unknown attribute value in '{}'", term)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceImage {
    pub label: String,
    pub attributes: Attributes,
    pub image: ImageHandle,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    label: String,
    /// PGM path, relative to the manifest
    image: PathBuf,
    #[serde(default)]
    attributes: Attributes,
}

#[derive(Debug, Clone, Default)]
pub struct Gallery {
    references: Vec<ReferenceImage>,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, reference: ReferenceImage) {
        self.references.push(reference);
    }

    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ReferenceImage> {
        self.references.iter()
    }

    /// References fitting the witness's description, in gallery order
    pub fn matching(&self, query: &Attributes) -> Vec<&ReferenceImage> {
        let found: Vec<&ReferenceImage> = self
            .references
            .iter()
            .filter(|r| r.attributes.matches(query))
            .collect();
        debug!("{} of {} references match {:?}", found.len(), self.len(), query);
        found
    }

    /// Load a JSON manifest: an array of `{label, image, attributes}` entries
    pub fn load(manifest: impl AsRef<Path>) -> Result<Self> {
        let manifest = manifest.as_ref();
        let json = std::fs::read_to_string(manifest)
            .map_err(|e| IdkitError::Persistence(format!("{}: {}", manifest.display(), e)))?;
        let entries: Vec<ManifestEntry> = serde_json::from_str(&json)?;
        let base = manifest.parent().unwrap_or_else(|| Path::new("."));

        let mut gallery = Gallery::new();
        for entry in entries {
            let path = base.join(&entry.image);
            let image = ImageHandle::read_pgm(&path)
                .map_err(|e| IdkitError::Persistence(format!("{}: {}", path.display(), e)))?;
            gallery.add(ReferenceImage {
                label: entry.label,
                attributes: entry.attributes,
                image,
            });
        }
        info!("Loaded {} references from {}", gallery.len(), manifest.display());
        Ok(gallery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(label: &str, attributes: Attributes) -> ReferenceImage {
        ReferenceImage {
            label: label.to_string(),
            attributes,
            image: ImageHandle::from_pixels(2, 2, vec![1, 2, 3, 4]),
        }
    }

    fn gallery() -> Gallery {
        let mut gallery = Gallery::new();
        gallery.add(reference(
            "a",
            Attributes {
                gender: Some(Gender::Female),
                age: Some(AgeGroup::Young),
                hair: Some(Hair::Blond),
                glasses: true,
                ..Default::default()
            },
        ));
        gallery.add(reference(
            "b",
            Attributes {
                gender: Some(Gender::Male),
                age: Some(AgeGroup::Old),
                hair: Some(Hair::Grey),
                moustache: true,
                beard: true,
                ..Default::default()
            },
        ));
        gallery.add(reference(
            "c",
            Attributes {
                gender: Some(Gender::Male),
                hair: Some(Hair::Bald),
                ..Default::default()
            },
        ));
        gallery
    }

    fn labels(found: Vec<&ReferenceImage>) -> Vec<&str> {
        found.into_iter().map(|r| r.label.as_str()).collect()
    }

    #[test]
    fn test_empty_query_matches_all() {
        let gallery = gallery();
        assert_eq!(labels(gallery.matching(&Attributes::default())), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_query_filters() {
        let gallery = gallery();
        let men = Attributes {
            gender: Some(Gender::Male),
            ..Default::default()
        };
        assert_eq!(labels(gallery.matching(&men)), vec!["b", "c"]);

        let bearded = Attributes {
            beard: true,
            ..men.clone()
        };
        assert_eq!(labels(gallery.matching(&bearded)), vec!["b"]);

        // "c" was never annotated with an age
        let old = Attributes {
            age: Some(AgeGroup::Old),
            ..men
        };
        assert_eq!(labels(gallery.matching(&old)), vec!["b"]);

        let none = Attributes {
            hair: Some(Hair::Brown),
            ..Default::default()
        };
        assert!(gallery.matching(&none).is_empty());
    }

    #[test]
    fn test_parse_terms() {
        let query = Attributes::parse_terms(&["gender=female", "hair=blond", "glasses"]).unwrap();
        assert_eq!(query.gender, Some(Gender::Female));
        assert_eq!(query.hair, Some(Hair::Blond));
        assert!(query.glasses && !query.beard);
        assert_eq!(query.age, None);

        assert!(Attributes::parse_terms(&["hair=purple"]).is_err());
        assert!(Attributes::parse_terms(&["height=tall"]).is_err());
        assert_eq!(Attributes::parse_terms::<&str>(&[]).unwrap(), Attributes::default());
    }

    #[test]
    fn test_load_manifest() {
        let dir = tempfile::tempdir().unwrap();
        ImageHandle::from_pixels(2, 1, vec![40, 200])
            .write_pgm(dir.path().join("one.pgm"))
            .unwrap();
        ImageHandle::from_pixels(2, 1, vec![90, 10])
            .write_pgm(dir.path().join("two.pgm"))
            .unwrap();
        let manifest = dir.path().join("gallery.json");
        std::fs::write(
            &manifest,
            r#"[
                {"label": "one", "image": "one.pgm", "attributes": {"gender": "male", "beard": true}},
                {"label": "two", "image": "two.pgm"}
            ]"#,
        )
        .unwrap();

        let gallery = Gallery::load(&manifest).unwrap();
        assert_eq!(gallery.len(), 2);
        let first = gallery.iter().next().unwrap();
        assert_eq!(first.image.pixels(), &[40, 200]);
        assert!(first.attributes.beard);
        let bearded = Attributes::parse_terms(&["beard"]).unwrap();
        assert_eq!(labels(gallery.matching(&bearded)), vec!["one"]);
    }

    #[test]
    fn test_load_missing_image() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = dir.path().join("gallery.json");
        std::fs::write(&manifest, r#"[{"label": "x", "image": "absent.pgm"}]"#).unwrap();
        assert!(matches!(Gallery::load(&manifest), Err(IdkitError::Persistence(_))));
    }
}
