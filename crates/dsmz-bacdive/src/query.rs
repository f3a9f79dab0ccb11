//! Search endpoints
//!
//! Every search is a path lookup: `<endpoint>/<term>[/<term>...]`. Terms are
//! trimmed and must not be blank; each one is percent-encoded as a single
//! path segment.

use dsmz_core::{ApiQuery, RetrieveError};

/// Strains deposited under a culture collection number, e.g. `DSM 1`.
pub fn culture_collection_query(number: &str) -> Result<ApiQuery, RetrieveError> {
    ApiQuery::from_segments(["culturecollectionno", term("culture collection number", number)?])
}

/// Strains of a genus, optionally narrowed to species and subspecies.
///
/// A subspecies without a species is ignored.
pub fn taxonomy_query(
    genus: &str,
    species: Option<&str>,
    subspecies: Option<&str>,
) -> Result<ApiQuery, RetrieveError> {
    let mut segments = vec!["taxon", term("genus", genus)?];
    if let Some(species) = species.filter(|s| !s.trim().is_empty()) {
        segments.push(term("species epithet", species)?);
        if let Some(subspecies) = subspecies.filter(|s| !s.trim().is_empty()) {
            segments.push(term("subspecies epithet", subspecies)?);
        }
    }
    ApiQuery::from_segments(segments)
}

/// Strains with a 16S rRNA sequence under this accession.
pub fn sequence_16s_query(accession: &str) -> Result<ApiQuery, RetrieveError> {
    ApiQuery::from_segments(["sequence_16s", term("16S accession", accession)?])
}

/// Strains with a genome assembly under this accession.
pub fn genome_query(accession: &str) -> Result<ApiQuery, RetrieveError> {
    ApiQuery::from_segments(["sequence_genome", term("genome accession", accession)?])
}

fn term<'a>(label: &str, raw: &'a str) -> Result<&'a str, RetrieveError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RetrieveError::Query(format!("{label} must not be blank")));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn culture_number_is_trimmed() {
        let q = culture_collection_query("  DSM 1 ").unwrap();
        assert_eq!(q.path(), "culturecollectionno/DSM%201");
    }

    #[test]
    fn taxonomy_levels() {
        assert_eq!(taxonomy_query("Bacillus", None, None).unwrap().path(), "taxon/Bacillus");
        assert_eq!(
            taxonomy_query("Bacillus", Some("subtilis"), None).unwrap().path(),
            "taxon/Bacillus/subtilis"
        );
        assert_eq!(
            taxonomy_query("Bacillus", Some("subtilis"), Some("spizizenii"))
                .unwrap()
                .path(),
            "taxon/Bacillus/subtilis/spizizenii"
        );
        // subspecies needs a species
        assert_eq!(
            taxonomy_query("Bacillus", None, Some("spizizenii")).unwrap().path(),
            "taxon/Bacillus"
        );
        assert_eq!(
            taxonomy_query("Bacillus", Some("  "), None).unwrap().path(),
            "taxon/Bacillus"
        );
    }

    #[test]
    fn blank_terms_rejected() {
        assert!(matches!(
            culture_collection_query("   "),
            Err(RetrieveError::Query(_))
        ));
        assert!(matches!(
            taxonomy_query("", Some("subtilis"), None),
            Err(RetrieveError::Query(_))
        ));
        assert!(sequence_16s_query("\t").is_err());
        assert!(genome_query("").is_err());
    }

    #[test]
    fn accessions() {
        assert_eq!(sequence_16s_query("AF000162").unwrap().path(), "sequence_16s/AF000162");
        assert_eq!(
            genome_query("GCA_006094295").unwrap().path(),
            "sequence_genome/GCA_006094295"
        );
    }

    #[test]
    fn separators_stay_inside_one_segment() {
        let q = culture_collection_query("ATCC 23/45?x").unwrap();
        assert_eq!(q.path(), "culturecollectionno/ATCC%2023%2F45%3Fx");
    }
}
