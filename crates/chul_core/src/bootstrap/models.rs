//! Reference models the bootstrap loader may write.
//!
//! Table and column names are only ever taken from this registry, never from
//! fixture text, so they are safe to splice into SQL.

use crate::repo::revision::{ENTITY_SERVICE, ENTITY_STATUS};

/// Foreign key resolved from a nested natural-key object in a fixture record.
#[derive(Debug)]
pub(crate) struct ForeignKey {
    /// Record field carrying the lookup object, e.g. `county`.
    pub field: &'static str,
    /// Column written with the resolved id, e.g. `county_id`.
    pub column: &'static str,
    /// Model the lookup runs against.
    pub model: &'static str,
}

#[derive(Debug)]
pub(crate) struct ReferenceModel {
    pub model: &'static str,
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub foreign_keys: &'static [ForeignKey],
    /// Revision entity type for tracked models; upserts append a revision.
    pub tracked_as: Option<&'static str>,
}

impl ReferenceModel {
    /// Returns the table column a plain record field writes to.
    pub fn column(&self, field: &str) -> Option<&'static str> {
        if field == "active" {
            return Some("active");
        }
        self.columns.iter().find(|column| **column == field).copied()
    }

    pub fn foreign_key(&self, field: &str) -> Option<&'static ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.field == field)
    }
}

const REFERENCE_MODELS: &[ReferenceModel] = &[
    ReferenceModel {
        model: "common.county",
        table: "counties",
        columns: &["name", "code"],
        foreign_keys: &[],
        tracked_as: None,
    },
    ReferenceModel {
        model: "common.constituency",
        table: "constituencies",
        columns: &["name", "code"],
        foreign_keys: &[ForeignKey {
            field: "county",
            column: "county_id",
            model: "common.county",
        }],
        tracked_as: None,
    },
    ReferenceModel {
        model: "common.ward",
        table: "wards",
        columns: &["name", "code"],
        foreign_keys: &[ForeignKey {
            field: "constituency",
            column: "constituency_id",
            model: "common.constituency",
        }],
        tracked_as: None,
    },
    ReferenceModel {
        model: "common.contacttype",
        table: "contact_types",
        columns: &["name", "description"],
        foreign_keys: &[],
        tracked_as: None,
    },
    ReferenceModel {
        model: "facilities.owner",
        table: "owners",
        columns: &["name", "code", "abbreviation", "description"],
        foreign_keys: &[],
        tracked_as: None,
    },
    ReferenceModel {
        model: "facilities.facilitytype",
        table: "facility_types",
        columns: &["name", "sub_division"],
        foreign_keys: &[],
        tracked_as: None,
    },
    ReferenceModel {
        model: "facilities.kephlevel",
        table: "keph_levels",
        columns: &["name", "value"],
        foreign_keys: &[],
        tracked_as: None,
    },
    ReferenceModel {
        model: "facilities.regulatingbody",
        table: "regulating_bodies",
        columns: &["name", "abbreviation"],
        foreign_keys: &[],
        tracked_as: None,
    },
    ReferenceModel {
        model: "facilities.facilitystatus",
        table: "facility_statuses",
        columns: &["name", "description"],
        foreign_keys: &[],
        tracked_as: None,
    },
    ReferenceModel {
        model: "facilities.servicecategory",
        table: "service_categories",
        columns: &["name", "abbreviation", "description"],
        foreign_keys: &[],
        tracked_as: None,
    },
    ReferenceModel {
        model: "facilities.jobtitle",
        table: "job_titles",
        columns: &["name", "description"],
        foreign_keys: &[],
        tracked_as: None,
    },
    ReferenceModel {
        model: "chul.status",
        table: "chu_statuses",
        columns: &["name", "description"],
        foreign_keys: &[],
        tracked_as: Some(ENTITY_STATUS),
    },
    ReferenceModel {
        model: "chul.chuservice",
        table: "chu_services",
        columns: &["name", "description"],
        foreign_keys: &[],
        tracked_as: Some(ENTITY_SERVICE),
    },
];

/// Looks up a model by its `app.Model` label, case-insensitively.
pub(crate) fn find_model(label: &str) -> Option<&'static ReferenceModel> {
    let normalized = label.trim().to_ascii_lowercase();
    REFERENCE_MODELS
        .iter()
        .find(|model| model.model == normalized)
}

#[cfg(test)]
mod tests {
    use super::find_model;

    #[test]
    fn lookup_ignores_case() {
        let model = find_model("common.County").unwrap();
        assert_eq!(model.table, "counties");
        assert!(find_model("common.Unknown").is_none());
    }

    #[test]
    fn constituency_resolves_county_reference() {
        let model = find_model("common.constituency").unwrap();
        let fk = model.foreign_key("county").unwrap();
        assert_eq!(fk.column, "county_id");
        assert!(find_model(fk.model).is_some());
        assert_eq!(model.column("active"), Some("active"));
        assert_eq!(model.column("county_id"), None);
        assert_eq!(model.tracked_as, None);
    }

    #[test]
    fn catalog_models_are_tracked() {
        assert!(find_model("chul.Status").unwrap().tracked_as.is_some());
        assert!(find_model("chul.CHUService").unwrap().tracked_as.is_some());
    }
}
