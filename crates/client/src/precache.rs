//! Install-time population of the current generation.
//!
//! Every manifest entry is fetched concurrently. Only when all of them
//! produced an ok response are they written, in a single transaction, so a
//! failed install leaves the generation untouched.

use futures_util::future::try_join_all;
use offcache_core::{Error, GenerationHandle, RequestDescriptor, RequestMode, ResponseSnapshot};
use url::Url;

use crate::fetch::{Network, resolve};

/// The resolved, ordered list of resources cached at install time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precache {
    origin: Url,
    urls: Vec<Url>,
}

impl Precache {
    /// Resolve manifest entries against the application root.
    pub fn resolve(app_root: &Url, entries: &[String]) -> Result<Self, Error> {
        let urls = entries
            .iter()
            .map(|entry| resolve(app_root, entry).map_err(|e| Error::InvalidUrl(format!("{entry}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { origin: app_root.clone(), urls })
    }

    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Requests issued for each entry; cross-origin entries use `cors` mode.
    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.urls
            .iter()
            .map(|url| {
                let request = RequestDescriptor::get(url.clone());
                if request.is_same_origin(&self.origin) {
                    request.with_mode(RequestMode::SameOrigin)
                } else {
                    request.with_mode(RequestMode::Cors)
                }
            })
            .collect()
    }
}

async fn fetch_entry(
    network: &dyn Network, request: RequestDescriptor,
) -> Result<(RequestDescriptor, ResponseSnapshot), Error> {
    let response = network
        .fetch(&request)
        .await
        .map_err(|e| Error::PopulationFailed(format!("{}: {e}", request.url)))?;

    if !response.is_ok() {
        return Err(Error::PopulationFailed(format!("{}: status {}", request.url, response.status)));
    }

    Ok((request, response))
}

/// Fetch every manifest entry and store all of them in `generation`.
///
/// Returns the number of entries stored.
///
/// # Errors
///
/// Returns [`Error::PopulationFailed`] if any entry fails to fetch, answers
/// with a non-2xx status, or cannot be stored. Nothing is stored in that case.
pub async fn populate(generation: &GenerationHandle, network: &dyn Network, manifest: &Precache) -> Result<usize, Error> {
    let pairs = try_join_all(manifest.requests().into_iter().map(|req| fetch_entry(network, req))).await?;

    let written = generation
        .put_all(&pairs)
        .await
        .map_err(|e| Error::PopulationFailed(format!("store into {}: {e}", generation.name())))?;

    if written != pairs.len() {
        return Err(Error::PopulationFailed(format!(
            "generation {} disappeared during population",
            generation.name()
        )));
    }

    tracing::debug!(generation = generation.name(), entries = written, "precache populated");
    Ok(written)
}
