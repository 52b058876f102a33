//! Parameterized predicate builders for `build_cohort` and `search_patients`.
//!
//! Column names come from a closed set compiled into this module. Every
//! caller-supplied value is bound as a positional parameter.

use serde::{Deserialize, Serialize};

use crate::storage::SqlValue;

/// Filters accepted by `build_cohort`. Absent fields add no predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CohortFilters {
    /// Minimum age, inclusive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_min: Option<i64>,
    /// Maximum age, inclusive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_max: Option<i64>,
    /// Gender, compared case-insensitively.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Diabetes flag; missing values count as `false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_diabetes: Option<bool>,
    /// Hypertension flag; missing values count as `false`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_hypertension: Option<bool>,
    /// Only `true` filters: an echo EF is recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_echo: Option<bool>,
    /// Only `true` filters: an MRI EF is recorded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_mri: Option<bool>,
    /// Any imaging modality present (`true`) or none (`false`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_imaging: Option<bool>,
    /// Any of HbA1c or troponin present (`true`) or neither (`false`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_labs: Option<bool>,
    /// Sudden death or premature CAD in the family history.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_family_history: Option<bool>,
    /// Substring matched against nationality, city and city category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// At least one linked variant (`true`) or none (`false`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_genomics: Option<bool>,
    /// Row limit, clamped to the registry maximum.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// Filters accepted by `search_patients`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatientSearch {
    /// Free text matched against name or DNA id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    /// Gender, compared case-insensitively.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    /// Minimum age, inclusive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_min: Option<i64>,
    /// Maximum age, inclusive.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_max: Option<i64>,
    /// Row limit, clamped to the registry maximum.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// SQL text plus its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    /// Statement with `?N` placeholders.
    pub sql: String,
    /// Values for the placeholders, in order.
    pub params: Vec<SqlValue>,
}

const GENOMICS_EXISTS: &str =
    "EXISTS (SELECT 1 FROM patient_genomic_variants v WHERE v.dna_id = patients.dna_id)";

#[derive(Default)]
struct Predicates {
    clauses: Vec<String>,
    params: Vec<SqlValue>,
}

impl Predicates {
    /// Adds a clause; each `{}` in `template` becomes the next placeholder.
    fn bind(&mut self, template: &str, value: SqlValue) {
        let placeholder = format!("?{}", self.params.len() + 1);
        self.clauses.push(template.replace("{}", &placeholder));
        self.params.push(value);
    }

    fn fixed(&mut self, clause: &str) {
        self.clauses.push(clause.to_string());
    }

    fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            "TRUE".to_string()
        } else {
            self.clauses.join(" AND ")
        }
    }
}

fn like_pattern(text: &str) -> SqlValue {
    SqlValue::Text(format!("%{}%", text.to_lowercase()))
}

impl CohortFilters {
    /// Builds the cohort query.
    #[must_use]
    pub fn to_query(&self, default_limit: u32, max_limit: u32) -> BoundQuery {
        let mut p = Predicates::default();

        if let Some(age_min) = self.age_min {
            p.bind("age >= {}", age_min.into());
        }
        if let Some(age_max) = self.age_max {
            p.bind("age <= {}", age_max.into());
        }
        if let Some(gender) = self.gender.as_deref().filter(|g| !g.is_empty()) {
            p.bind("LOWER(gender) = {}", gender.to_lowercase().into());
        }
        if let Some(flag) = self.has_diabetes {
            p.bind("COALESCE(diabetes_mellitus, 0) = {}", flag.into());
        }
        if let Some(flag) = self.has_hypertension {
            p.bind("COALESCE(high_blood_pressure, 0) = {}", flag.into());
        }
        if self.has_echo == Some(true) {
            p.fixed("echo_ef IS NOT NULL");
        }
        if self.has_mri == Some(true) {
            p.fixed("mri_ef IS NOT NULL");
        }
        if let Some(flag) = self.has_imaging {
            p.bind("((mri_ef IS NOT NULL OR echo_ef IS NOT NULL) = {})", flag.into());
        }
        if let Some(flag) = self.has_labs {
            p.bind("((hba1c IS NOT NULL OR troponin_i IS NOT NULL) = {})", flag.into());
        }
        if let Some(flag) = self.has_family_history {
            p.bind(
                "((COALESCE(history_sudden_death, 0) OR COALESCE(history_premature_cad, 0)) = {})",
                flag.into(),
            );
        }
        if let Some(region) = self.region.as_deref().filter(|r| !r.is_empty()) {
            let placeholder = format!("?{}", p.params.len() + 1);
            p.clauses.push(format!(
                "(LOWER(nationality) LIKE {placeholder} OR LOWER(current_city_category) LIKE {placeholder} \
                 OR LOWER(current_city) LIKE {placeholder})"
            ));
            p.params.push(like_pattern(region));
        }
        match self.has_genomics {
            Some(true) => p.fixed(GENOMICS_EXISTS),
            Some(false) => p.fixed(&format!("NOT {GENOMICS_EXISTS}")),
            None => {}
        }

        let limit = self.limit.unwrap_or(default_limit).min(max_limit);
        BoundQuery {
            sql: format!(
                "SELECT dna_id, name, age, gender, diabetes_mellitus, high_blood_pressure, \
                 echo_ef, mri_ef, enrollment_date FROM patients WHERE {} \
                 ORDER BY enrollment_date DESC LIMIT {limit}",
                p.where_clause()
            ),
            params: p.params,
        }
    }
}

impl PatientSearch {
    /// Builds the search query, newest enrollment first.
    #[must_use]
    pub fn to_query(&self, default_limit: u32, max_limit: u32) -> BoundQuery {
        let mut p = Predicates::default();

        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let placeholder = format!("?{}", p.params.len() + 1);
            p.clauses.push(format!(
                "(LOWER(name) LIKE {placeholder} OR LOWER(CAST(dna_id AS TEXT)) LIKE {placeholder})"
            ));
            p.params.push(like_pattern(search));
        }
        if let Some(gender) = self.gender.as_deref().filter(|g| !g.is_empty()) {
            p.bind("LOWER(gender) = {}", gender.to_lowercase().into());
        }
        if let Some(age_min) = self.age_min {
            p.bind("age >= {}", age_min.into());
        }
        if let Some(age_max) = self.age_max {
            p.bind("age <= {}", age_max.into());
        }

        let limit = self.limit.unwrap_or(default_limit).min(max_limit);
        BoundQuery {
            sql: format!(
                "SELECT dna_id, name, age, gender, enrollment_date FROM patients WHERE {} \
                 ORDER BY enrollment_date DESC LIMIT {limit}",
                p.where_clause()
            ),
            params: p.params,
        }
    }
}
