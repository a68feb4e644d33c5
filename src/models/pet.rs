//! Public pet listing models.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShelterCompact {
    pub name_shelter: String,
    #[serde(default)]
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetImage {
    pub image_url: String,
}

/// A pet as listed by the public search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub birth_date: String,
    #[serde(default)]
    pub specie: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub images: Vec<PetImage>,
    #[serde(default)]
    pub shelter_response_compact: Option<ShelterCompact>,
}

/// Search filters, mirroring the storefront's filter form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PetQuery {
    pub species: Option<String>,
    pub gender: Option<String>,
    pub age_range: Option<String>,
    pub weight_range: Option<String>,
}

impl PetQuery {
    /// Query pairs in a stable order, empty filters omitted.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        [
            ("species", &self.species),
            ("gender", &self.gender),
            ("ageRange", &self.age_range),
            ("weightRange", &self.weight_range),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_deref()
                .filter(|v| !v.trim().is_empty())
                .map(|v| (name.to_string(), v.to_string()))
        })
        .collect()
    }

    /// Canonical string used as the cache key segment for this query.
    pub fn cache_segment(&self) -> String {
        self.to_pairs()
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetPage {
    pub pets: Vec<Pet>,
    pub current_page: u32,
    pub next_page: Option<u32>,
}

/// Raw HAL-style envelope returned by `/pets`.
#[derive(Debug, Deserialize)]
pub(crate) struct PetEnvelope {
    #[serde(rename = "_embedded", default)]
    pub embedded: Option<PetEmbedded>,
    #[serde(default)]
    pub page: Option<PageInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PetEmbedded {
    #[serde(default)]
    pub pet_params_response_list: Vec<Pet>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfo {
    #[serde(default)]
    pub number: u32,
    #[serde(default)]
    pub total_pages: u32,
}

impl PetEnvelope {
    pub(crate) fn into_pets(self) -> Vec<Pet> {
        self.embedded
            .map(|e| e.pet_params_response_list)
            .unwrap_or_default()
    }

    pub(crate) fn into_page(self) -> PetPage {
        let page = self.page;
        let pets = self.into_pets();
        let (current_page, next_page) = match page {
            Some(info) => {
                let next = (info.number + 1 < info.total_pages).then_some(info.number + 1);
                (info.number, next)
            }
            None => (0, None),
        };
        PetPage {
            pets,
            current_page,
            next_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs_skip_empty() {
        let query = PetQuery {
            species: Some("Gato".into()),
            gender: Some("  ".into()),
            weight_range: Some("0-5 kg".into()),
            ..PetQuery::default()
        };
        assert_eq!(
            query.to_pairs(),
            vec![
                ("species".to_string(), "Gato".to_string()),
                ("weightRange".to_string(), "0-5 kg".to_string()),
            ]
        );
        assert_eq!(query.cache_segment(), "species=Gato&weightRange=0-5%20kg");
    }

    #[test]
    fn test_envelope_next_page() {
        let body = serde_json::json!({
            "_embedded": {"petParamsResponseList": [{"id": "1", "name": "Rex"}]},
            "page": {"size": 1, "totalElements": 3, "totalPages": 3, "number": 1}
        });
        let envelope: PetEnvelope = serde_json::from_value(body).unwrap();
        let page = envelope.into_page();
        assert_eq!(page.pets.len(), 1);
        assert_eq!(page.current_page, 1);
        assert_eq!(page.next_page, Some(2));
    }

    #[test]
    fn test_envelope_last_page_and_missing_embedded() {
        let body = serde_json::json!({
            "page": {"size": 10, "totalElements": 0, "totalPages": 1, "number": 0}
        });
        let envelope: PetEnvelope = serde_json::from_value(body).unwrap();
        let page = envelope.into_page();
        assert!(page.pets.is_empty());
        assert_eq!(page.next_page, None);
    }
}
