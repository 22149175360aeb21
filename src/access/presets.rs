//! Ready-made facades with Wikidata-backed alignments.
//!
//! | Preset     | Hub        | Spokes                             |
//! |------------|------------|------------------------------------|
//! | `chemical` | `inchikey` | `cas`, `cid`, `chebi`, `chembl`, `mesh` |
//! | `taxonomy` | `ncbi`     | `eol`                              |
//!
//! Every alignment is lazy: nothing is fetched until a conversion needs it.

use std::sync::Arc;

use super::DataAccess;
use crate::align::{Alignment, PropertyPairMapping, WikidataProperty};
use crate::sparql::QueryService;

/// Default namespace of the ECOTOX-derived datasets.
pub const ECOTOX_NAMESPACE: &str = "https://cfpub.epa.gov/ecotox/";
/// Default namespace of the NCBI taxonomy dataset.
pub const NCBI_NAMESPACE: &str = "https://www.ncbi.nlm.nih.gov/taxonomy";

pub const CHEMICAL_HUB: &str = "inchikey";
pub const TAXONOMY_HUB: &str = "ncbi";

const CHEMICAL_SPOKES: [(&str, WikidataProperty); 5] = [
    ("cas", WikidataProperty::Cas),
    ("cid", WikidataProperty::PubChemCid),
    ("chebi", WikidataProperty::ChEBI),
    ("chembl", WikidataProperty::ChEMBL),
    ("mesh", WikidataProperty::MeSH),
];

/// Preset names accepted by the configuration layer.
pub const PRESETS: [&str; 2] = ["chemical", "taxonomy"];

fn wikidata_alignment(
    scheme: &str,
    mappings: &Arc<dyn QueryService>,
    hub: WikidataProperty,
    spoke: WikidataProperty,
) -> Alignment {
    Alignment::new(
        scheme,
        PropertyPairMapping::wikidata(Arc::clone(mappings), hub, spoke),
    )
}

/// Chemical facade: InChIKey hub with CAS, PubChem CID, ChEBI, ChEMBL and MeSH.
///
/// `mappings` answers the Wikidata property queries; the dataset's own query
/// service can be attached with [`DataAccess::with_service`].
pub fn chemical(namespace: &str, mappings: Arc<dyn QueryService>) -> DataAccess {
    let mut access = DataAccess::new("Chemical API", namespace, CHEMICAL_HUB);
    for (scheme, property) in CHEMICAL_SPOKES {
        access.register(
            scheme,
            Arc::new(wikidata_alignment(
                scheme,
                &mappings,
                WikidataProperty::InChIKey,
                property,
            )),
        );
    }
    access
}

/// Taxonomy facade: NCBI taxon hub with EOL.
pub fn taxonomy(namespace: &str, mappings: Arc<dyn QueryService>) -> DataAccess {
    DataAccess::new("Taxonomy API", namespace, TAXONOMY_HUB).with_alignment(
        "eol",
        wikidata_alignment(
            "eol",
            &mappings,
            WikidataProperty::NcbiTaxon,
            WikidataProperty::Eol,
        ),
    )
}

/// Build a preset by name; `None` for an unknown preset.
pub fn by_name(
    preset: &str,
    namespace: Option<&str>,
    mappings: Arc<dyn QueryService>,
) -> Option<DataAccess> {
    match preset {
        "chemical" => Some(chemical(namespace.unwrap_or(ECOTOX_NAMESPACE), mappings)),
        "taxonomy" => Some(taxonomy(namespace.unwrap_or(NCBI_NAMESPACE), mappings)),
        _ => None,
    }
}
