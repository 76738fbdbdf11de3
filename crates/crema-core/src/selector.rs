//! Image URL selection
//!
//! Picks the most preferred renderable URL and a fallback among the
//! candidates stored on a product or category. A URL is renderable only when
//! it parses, uses http(s) and points at a known image host; stale or
//! foreign URLs are dropped before they ever reach the renderer.

use crate::config::Config;
use crate::models::{DisplayTier, ImageAsset, ImageCandidate, SelectedImage};
use crate::provider_types::ProviderKind;

/// Hostnames images may be rendered from.
///
/// An entry matches itself and any of its subdomains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAllowList {
    hosts: Vec<String>,
}

impl Default for HostAllowList {
    /// Delivery hosts of both upload providers
    fn default() -> Self {
        Self::new([
            ProviderKind::Cloudinary.delivery_host(),
            ProviderKind::Imgbb.delivery_host(),
        ])
    }
}

impl HostAllowList {
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self { hosts: Vec::new() };
        for host in hosts {
            list.push(host.as_ref());
        }
        list
    }

    /// Provider hosts plus the storage host and extra hosts from configuration
    pub fn from_config(config: &Config) -> Self {
        let mut list = Self::default();
        if let Some(storage) = config.storage_public_host() {
            list.push(storage);
        }
        for host in config.image_host_allowlist() {
            list.push(host);
        }
        list
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.push(host);
        self
    }

    fn push(&mut self, host: &str) {
        let host = host.trim().trim_start_matches('.').to_lowercase();
        if !host.is_empty() && !self.hosts.contains(&host) {
            self.hosts.push(host);
        }
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    fn matches(entry: &str, host: &str) -> bool {
        host == entry || host.ends_with(&format!(".{}", entry))
    }

    /// Check a URL, returning the rejection reason when it is not renderable
    pub fn check(&self, url: &str) -> Result<(), String> {
        let parsed = url::Url::parse(url.trim()).map_err(|e| format!("invalid URL: {}", e))?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(format!("unsupported scheme '{}'", parsed.scheme()));
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| "URL has no host".to_string())?
            .to_lowercase();

        if !self.hosts.iter().any(|entry| Self::matches(entry, &host)) {
            return Err(format!("host '{}' is not allow-listed", host));
        }

        // Provider B serves images as /<id>/<file>; anything shorter is a page, not an image
        if Self::matches(ProviderKind::Imgbb.delivery_host(), &host) {
            let segments = parsed
                .path_segments()
                .map(|segments| segments.filter(|s| !s.is_empty()).count())
                .unwrap_or(0);
            if segments < 2 {
                return Err(format!(
                    "path of '{}' URL has {} segment(s), expected at least 2",
                    host, segments
                ));
            }
        }

        Ok(())
    }

    pub fn is_allowed(&self, url: &str) -> bool {
        self.check(url).is_ok()
    }
}

/// Select the primary and fallback URLs among `candidates`.
///
/// Valid candidates are ordered by ascending priority (ties keep input
/// order). The fallback is the second valid URL, or the primary again when
/// only one is valid. With no valid candidate both fields are empty.
pub fn select_image(candidates: &[ImageCandidate], allow_list: &HostAllowList) -> SelectedImage {
    let mut valid: Vec<&ImageCandidate> = candidates
        .iter()
        .filter(|candidate| match allow_list.check(&candidate.url) {
            Ok(()) => true,
            Err(reason) => {
                tracing::debug!(
                    url = %candidate.url,
                    priority = candidate.priority,
                    reason = %reason,
                    "Rejected image candidate"
                );
                false
            }
        })
        .collect();

    valid.sort_by_key(|candidate| candidate.priority);

    match valid.as_slice() {
        [] => SelectedImage::default(),
        [only] => SelectedImage {
            primary: only.url.trim().to_string(),
            fallback: only.url.trim().to_string(),
        },
        [first, second, ..] => SelectedImage {
            primary: first.url.trim().to_string(),
            fallback: second.url.trim().to_string(),
        },
    }
}

/// Convenience over [`select_image`] for a stored asset and display tier
pub fn select_for_asset(
    asset: &ImageAsset,
    tier: DisplayTier,
    allow_list: &HostAllowList,
) -> SelectedImage {
    if !asset.has_any_url() {
        tracing::debug!("Asset carries no image URL");
        return SelectedImage::default();
    }
    select_image(&asset.candidates(tier), allow_list)
}
