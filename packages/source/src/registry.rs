//! County registry. Loads every county configuration from embedded TOML.
//!
//! Each `.toml` file in `packages/source/counties/` is baked into the binary
//! at compile time via [`include_str!`]. Adding a county is a new TOML file
//! plus a line below (and a [`County`] variant).

use arrest_leads_arrest_models::County;
use arrest_leads_source_models::SourceAdapterConfig;

const COUNTY_TOMLS: &[(&str, &str)] = &[
    ("lee", include_str!("../counties/lee.toml")),
    ("collier", include_str!("../counties/collier.toml")),
    ("charlotte", include_str!("../counties/charlotte.toml")),
];

/// Parses one county configuration.
///
/// # Errors
///
/// Returns the TOML error message if the document does not describe a
/// valid [`SourceAdapterConfig`].
pub fn parse_county_toml(toml_str: &str) -> Result<SourceAdapterConfig, String> {
    toml::de::from_str(toml_str).map_err(|e| e.to_string())
}

/// Every configured county, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if an embedded config is malformed; the registry tests make that a
/// build-time failure in practice.
#[must_use]
pub fn all_counties() -> Vec<SourceAdapterConfig> {
    COUNTY_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_county_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// The embedded configuration for `county`.
#[must_use]
pub fn config_for(county: County) -> Option<SourceAdapterConfig> {
    all_counties().into_iter().find(|c| c.county == county)
}

#[cfg(test)]
mod tests {
    use arrest_leads_source_models::TransportConfig;
    use strum::IntoEnumIterator as _;

    use super::*;

    #[test]
    fn loads_all_counties() {
        assert_eq!(all_counties().len(), COUNTY_TOMLS.len());
    }

    #[test]
    fn county_ids_are_unique() {
        let mut counties: Vec<County> = all_counties().iter().map(|c| c.county).collect();
        counties.sort_unstable();
        counties.dedup();
        assert_eq!(counties.len(), COUNTY_TOMLS.len());
    }

    #[test]
    fn every_county_variant_is_configured() {
        for county in County::iter() {
            assert!(config_for(county).is_some(), "{county} has no config");
        }
    }

    #[test]
    fn file_names_match_counties() {
        for (name, toml) in COUNTY_TOMLS {
            assert_eq!(parse_county_toml(toml).unwrap().county.as_ref(), *name);
        }
    }

    #[test]
    fn transports_match_site_protocols() {
        let kind = |county| config_for(county).map(|c| c.transport.kind());
        assert_eq!(kind(County::Lee), Some("json_api"));
        assert_eq!(kind(County::Collier), Some("form_post"));
        assert_eq!(kind(County::Charlotte), Some("session_gated"));

        let Some(TransportConfig::JsonApi(lee)) = config_for(County::Lee).map(|c| c.transport)
        else {
            panic!("lee is not a JSON API county");
        };
        assert!(lee.fallback.is_some());
        assert_eq!(lee.max_enrich, 120);
    }
}
