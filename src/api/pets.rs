//! `/pets` listing and detail lookups.
//!
//! Pet data is public: it is fetched without the refresh interceptor and
//! cached under a public root, so it survives logout.

use tracing::instrument;

use super::require;
use crate::cache::{ResourceCache, ResourceKey};
use crate::client::ApiClient;
use crate::error::{Error, Result};
use crate::models::pet::PetEnvelope;
use crate::models::{Pet, PetPage, PetQuery};
use crate::transport::ApiRequest;

pub const PETS_PATH: &str = "/pets";

/// Listing root; every search page is cached below it.
pub const LIST_ROOT: &str = "pets";
/// Detail root.
pub const DETAIL_ROOT: &str = "pet";

pub const DEFAULT_PAGE_SIZE: u32 = 12;
const SORT: &str = "createDate,asc";

pub fn list_key(query: &PetQuery, page: u32, size: u32) -> ResourceKey {
    ResourceKey::new([LIST_ROOT])
        .child(query.cache_segment())
        .child(format!("page={page}&size={size}"))
}

pub fn detail_key(id: &str) -> ResourceKey {
    ResourceKey::new([DETAIL_ROOT, id])
}

/// One page of pets matching `query`, oldest first.
#[instrument(skip(client, cache))]
pub async fn search(
    client: &ApiClient,
    cache: &ResourceCache,
    query: &PetQuery,
    page: u32,
    size: u32,
) -> Result<PetPage> {
    if size == 0 {
        return Err(Error::InvalidRequest("page size must be positive".to_string()));
    }
    let request = ApiRequest::get(PETS_PATH)
        .query_pairs(query.to_pairs())
        .query("page", page.to_string())
        .query("size", size.to_string())
        .query("sort", SORT);

    let response = cache
        .fetch(list_key(query, page, size), client.send_direct(request))
        .await?;
    Ok(response.json::<PetEnvelope>()?.into_page())
}

/// Look a pet up by id. `Ok(None)` when the backend knows no such pet.
#[instrument(skip(client, cache))]
pub async fn by_id(client: &ApiClient, cache: &ResourceCache, id: &str) -> Result<Option<Pet>> {
    require("id", id)?;
    let request = ApiRequest::get(PETS_PATH).query("id", id);
    let response = cache.fetch(detail_key(id), client.send_direct(request)).await?;
    Ok(response.json::<PetEnvelope>()?.into_pets().into_iter().next())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_public() {
        let query = PetQuery {
            species: Some("dog".into()),
            ..PetQuery::default()
        };
        assert!(list_key(&query, 0, 12).is_public());
        assert!(detail_key("42").is_public());
        assert_ne!(list_key(&query, 0, 12), list_key(&query, 1, 12));
        assert_ne!(list_key(&query, 0, 12), list_key(&PetQuery::default(), 0, 12));
    }
}
