//! Refresh URL construction
//!
//! Placeholders are bracketed tokens such as `<domain>` or `<ip6>`. The
//! replacement map always covers credentials, domain, host and protocol;
//! `<ip4>` and `<ip6>` are only resolved when the pattern contains them, so a
//! pattern without address placeholders never triggers a WAN lookup.

use std::collections::BTreeMap;
use std::net::Ipv6Addr;

use crate::config::{DEFAULT_PROTOCOL, Domain};
use crate::error::Result;
use crate::wan_ip::WanIpResolver;

pub const KEY_USERNAME: &str = "username";
pub const KEY_PASSWORD: &str = "password";
pub const KEY_DOMAIN: &str = "domain";
pub const KEY_HOST: &str = "host";
pub const KEY_PROTOCOL: &str = "protocol";
pub const KEY_IP4: &str = "ip4";
pub const KEY_IP6: &str = "ip6";

/// Placeholder token for a replacement key (`ip4` -> `<ip4>`)
pub fn placeholder(key: &str) -> String {
    format!("<{}>", key)
}

/// Builds replacement maps and refresh URLs for resolved domains
pub struct UrlBuilder<'a> {
    wan: &'a WanIpResolver,
}

impl<'a> UrlBuilder<'a> {
    pub fn new(wan: &'a WanIpResolver) -> Self {
        Self { wan }
    }

    /// Map every placeholder of `domain` to its value.
    ///
    /// Fails if a needed WAN lookup fails; no partial map is returned.
    pub async fn build_replacements(&self, domain: &Domain) -> Result<BTreeMap<String, String>> {
        let pattern = &domain.template.refresh_url;
        let protocol = if domain.template.protocol.is_empty() {
            DEFAULT_PROTOCOL
        } else {
            &domain.template.protocol
        };

        let mut replacements = BTreeMap::from([
            (placeholder(KEY_USERNAME), domain.username.clone()),
            (placeholder(KEY_PASSWORD), domain.password.clone()),
            (placeholder(KEY_DOMAIN), domain.domain_name.clone()),
            (placeholder(KEY_HOST), domain.template.host.clone()),
            (placeholder(KEY_PROTOCOL), protocol.to_string()),
        ]);

        let ip4_key = placeholder(KEY_IP4);
        if pattern.contains(&ip4_key) {
            let ip4 = if domain.ip4_address.is_empty() {
                self.wan.determine_wan_ip4().await?
            } else {
                domain.ip4_address.clone()
            };
            replacements.insert(ip4_key, ip4);
        }

        let ip6_key = placeholder(KEY_IP6);
        if pattern.contains(&ip6_key) {
            let ip6 = if domain.ip6_address.is_empty() {
                let wan_ip6 = self.wan.determine_wan_ip6().await?;
                if domain.ip6_host_id.is_empty() {
                    wan_ip6
                } else {
                    splice_host_id(&wan_ip6, &domain.ip6_host_id)
                }
            } else {
                domain.ip6_address.clone()
            };
            replacements.insert(ip6_key, ip6);
        }

        Ok(replacements)
    }

    /// Substitute every known placeholder in the domain's pattern
    pub async fn build_refresh_url(&self, domain: &Domain) -> Result<String> {
        let replacements = self.build_replacements(domain).await?;
        Ok(substitute(&domain.template.refresh_url, &replacements))
    }
}

/// Replace the host part of `address` with `host_id`.
///
/// Keeps the first four groups (the /64 network prefix) as written. Only
/// compressed (`::`) addresses are expanded first, so they still yield
/// four groups.
pub fn splice_host_id(address: &str, host_id: &str) -> String {
    let prefix = match address.parse::<Ipv6Addr>() {
        Ok(parsed) if address.contains("::") => parsed.segments()[..4]
            .iter()
            .map(|segment| format!("{:x}", segment))
            .collect::<Vec<_>>()
            .join(":"),
        _ => address.split(':').take(4).collect::<Vec<_>>().join(":"),
    };
    format!("{}:{}", prefix, host_id)
}

/// Single-pass placeholder substitution.
///
/// Unknown tokens are left as they are and substituted values are never
/// scanned again.
pub fn substitute(pattern: &str, replacements: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;

    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];

        let Some(end) = candidate.find('>') else {
            out.push_str(candidate);
            return out;
        };

        match replacements.get(&candidate[..=end]) {
            Some(value) => {
                out.push_str(value);
                rest = &candidate[end + 1..];
            }
            None => {
                out.push('<');
                rest = &candidate[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
