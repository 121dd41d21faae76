//! Template resolution
//!
//! Turns a configured [`Domain`] into one the engine can use: a `:name`
//! reference in `refresh_url` is replaced by the named template's request
//! shape, then every still-empty request attribute gets its global default.

use std::collections::HashMap;

use crate::config::{Domain, Template};
use crate::error::{Error, Result};

/// Resolve a domain in place.
///
/// Running this on an already-resolved domain changes nothing.
pub fn prepare_domain(
    domain: &mut Domain,
    templates: &HashMap<String, Template>,
    app_version: &str,
) -> Result<()> {
    if let Some(name) = domain.template_name() {
        let template = templates
            .get(name)
            .ok_or_else(|| Error::TemplateNotFound(name.to_string()))?;

        tracing::trace!("Merging template \"{}\" into {}", name, domain.domain_name);
        domain.merge_template(template);
    }

    domain.init_default_values(app_version);
    Ok(())
}

/// Resolve every domain, stopping at the first unknown template
pub fn prepare_domains(
    domains: &[Domain],
    templates: &HashMap<String, Template>,
    app_version: &str,
) -> Result<Vec<Domain>> {
    domains
        .iter()
        .map(|domain| {
            let mut domain = domain.clone();
            prepare_domain(&mut domain, templates, app_version)?;
            Ok(domain)
        })
        .collect()
}
