use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::LookupFailurePolicy;
use crate::domain::{TitleLookup, TitleLookupError, FALLBACK_TITLE};

/// URL to title mapping, filled lazily from a [`TitleLookup`].
///
/// Entries are never invalidated.
pub struct DisplayNameCache<L> {
    lookup: L,
    policy: LookupFailurePolicy,
    titles: HashMap<String, String>,
}

impl<L: TitleLookup> DisplayNameCache<L> {
    pub fn new(lookup: L, policy: LookupFailurePolicy) -> Self {
        Self {
            lookup,
            policy,
            titles: HashMap::new(),
        }
    }

    /// Pre-populate titles that are already known, e.g. from stored records.
    pub fn seed<I>(&mut self, known: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (url, title) in known {
            self.titles.entry(url).or_insert(title);
        }
    }

    /// Cached title for `url`, consulting the lookup on first reference.
    pub fn get(&mut self, url: &str) -> Result<&str, TitleLookupError> {
        let title = match self.titles.entry(url.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let title = match self.lookup.lookup(url) {
                    Ok(title) => title,
                    Err(e) => match self.policy {
                        LookupFailurePolicy::UseFallbackTitle => {
                            warn!(%url, error = %e, "title lookup failed, using fallback");
                            FALLBACK_TITLE.to_string()
                        }
                        LookupFailurePolicy::Propagate => return Err(e),
                    },
                };
                debug!(%url, %title, "resolved display name");
                entry.insert(title)
            }
        };
        Ok(title.as_str())
    }

    /// Cached title without triggering a lookup.
    pub fn peek(&self, url: &str) -> Option<&str> {
        self.titles.get(url).map(String::as_str)
    }
}
