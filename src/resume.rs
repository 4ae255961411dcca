//! The structured résumé record and its field reconciler.
//!
//! [`ResumeDraft`] is the evolving target of the structured-record
//! extractor: one free-text profile, six list sections, and identity
//! scalars that the server only fills in at completion. [`reconcile`]
//! folds a freshly parsed (partial or complete) object into the previous
//! draft under the non-regression rule: a list that already has entries is
//! never knocked back to empty by a truncated re-parse.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The evolving résumé record published to observers.
///
/// Every field is lenient on decode so half-generated entries still land:
/// anything the model has not produced yet defaults to empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResumeDraft {
    /// Free-text professional summary.
    pub profile: String,
    pub work_experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub certifications: Vec<CertificationEntry>,
    pub projects: Vec<ProjectEntry>,
    pub soft_skills: Vec<String>,
    pub hard_skills: Vec<String>,

    // Identity fields, populated only by the authoritative payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExperienceEntry {
    pub company: String,
    pub role: String,
    pub period: String,
    pub location: String,
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EducationEntry {
    pub institution: String,
    pub degree: String,
    pub field: String,
    pub period: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CertificationEntry {
    pub name: String,
    pub issuer: String,
    pub year: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectEntry {
    pub name: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub link: String,
}

/// Merge a parsed partial object into `previous`, returning the new draft.
///
/// - Scalar fields present in the partial replace unconditionally. The
///   profile additionally accepts an object value, taking the first of its
///   `summary` / `text` / `content` keys (models sometimes nest it).
/// - A list field is replaced only when the incoming array is non-empty or
///   the field was never populated; an empty array alongside an existing
///   non-empty value means the section has not been regenerated yet and is
///   ignored.
/// - A list is only adopted when every entry deserializes; a partially
///   garbled array leaves the previous value in place.
pub fn reconcile(previous: &ResumeDraft, partial: &Value) -> ResumeDraft {
    let mut next = previous.clone();
    let Some(fields) = partial.as_object() else {
        return next;
    };

    if let Some(value) = fields.get("profile") {
        if let Some(text) = scalar_text(value) {
            next.profile = text;
        }
    }

    merge_list(&mut next.work_experience, fields.get("workExperience"));
    merge_list(&mut next.education, fields.get("education"));
    merge_list(&mut next.certifications, fields.get("certifications"));
    merge_list(&mut next.projects, fields.get("projects"));
    merge_list(&mut next.soft_skills, fields.get("softSkills"));
    merge_list(&mut next.hard_skills, fields.get("hardSkills"));
    merge_list(&mut next.links, fields.get("links"));

    merge_scalar(&mut next.name, fields.get("name"));
    merge_scalar(&mut next.email, fields.get("email"));
    merge_scalar(&mut next.phone, fields.get("phone"));
    merge_scalar(&mut next.location, fields.get("location"));
    merge_scalar(&mut next.headline, fields.get("headline"));

    next
}

/// String value, or the first of `summary`/`text`/`content` on an object.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => ["summary", "text", "content"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string),
        _ => None,
    }
}

fn merge_scalar(slot: &mut Option<String>, incoming: Option<&Value>) {
    if let Some(text) = incoming.and_then(Value::as_str) {
        *slot = Some(text.to_string());
    }
}

fn merge_list<T: DeserializeOwned>(current: &mut Vec<T>, incoming: Option<&Value>) {
    let Some(Value::Array(items)) = incoming else {
        return;
    };
    if items.is_empty() && !current.is_empty() {
        return;
    }
    let parsed: Result<Vec<T>, _> = items
        .iter()
        .map(|item| serde_json::from_value(item.clone()))
        .collect();
    if let Ok(entries) = parsed {
        *current = entries;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_replaces_unconditionally() {
        let prev = ResumeDraft {
            profile: "old".to_string(),
            ..Default::default()
        };
        let next = reconcile(&prev, &json!({"profile": "new"}));
        assert_eq!(next.profile, "new");
    }

    #[test]
    fn nested_profile_normalized() {
        let prev = ResumeDraft::default();
        let next = reconcile(&prev, &json!({"profile": {"summary": "from summary"}}));
        assert_eq!(next.profile, "from summary");

        let next = reconcile(&prev, &json!({"profile": {"text": "from text"}}));
        assert_eq!(next.profile, "from text");

        let next = reconcile(&prev, &json!({"profile": {"content": "from content"}}));
        assert_eq!(next.profile, "from content");
    }

    #[test]
    fn absent_fields_untouched() {
        let prev = ResumeDraft {
            profile: "keep".to_string(),
            hard_skills: vec!["Rust".to_string()],
            ..Default::default()
        };
        let next = reconcile(&prev, &json!({"softSkills": ["communication"]}));
        assert_eq!(next.profile, "keep");
        assert_eq!(next.hard_skills, vec!["Rust"]);
        assert_eq!(next.soft_skills, vec!["communication"]);
    }

    #[test]
    fn populated_list_never_regresses_to_empty() {
        let mut draft = ResumeDraft::default();
        draft = reconcile(
            &draft,
            &json!({"workExperience": [{"company": "Acme", "role": "Dev"}]}),
        );
        assert_eq!(draft.work_experience.len(), 1);

        // A later truncated parse regenerates the section as empty; ignored.
        draft = reconcile(&draft, &json!({"workExperience": []}));
        assert_eq!(draft.work_experience.len(), 1);
        assert_eq!(draft.work_experience[0].company, "Acme");
    }

    #[test]
    fn first_population_accepts_empty() {
        let draft = reconcile(&ResumeDraft::default(), &json!({"workExperience": []}));
        assert!(draft.work_experience.is_empty());
    }

    #[test]
    fn nonempty_list_replaces_nonempty() {
        let mut draft = reconcile(&ResumeDraft::default(), &json!({"hardSkills": ["Rust"]}));
        draft = reconcile(&draft, &json!({"hardSkills": ["Rust", "Go"]}));
        assert_eq!(draft.hard_skills, vec!["Rust", "Go"]);
    }

    #[test]
    fn garbled_list_entry_keeps_previous() {
        let mut draft = reconcile(&ResumeDraft::default(), &json!({"hardSkills": ["Rust"]}));
        draft = reconcile(&draft, &json!({"hardSkills": ["Go", 42]}));
        assert_eq!(draft.hard_skills, vec!["Rust"]);
    }

    #[test]
    fn lenient_entries_default_missing_fields() {
        let draft = reconcile(
            &ResumeDraft::default(),
            &json!({"projects": [{"name": "svc"}]}),
        );
        assert_eq!(draft.projects.len(), 1);
        assert_eq!(draft.projects[0].name, "svc");
        assert!(draft.projects[0].description.is_empty());
    }

    #[test]
    fn identity_fields_set_from_authoritative_shape() {
        let next = reconcile(
            &ResumeDraft::default(),
            &json!({
                "name": "Ada",
                "email": "ada@example.com",
                "links": ["https://example.com"]
            }),
        );
        assert_eq!(next.name.as_deref(), Some("Ada"));
        assert_eq!(next.email.as_deref(), Some("ada@example.com"));
        assert_eq!(next.links, vec!["https://example.com"]);
    }

    #[test]
    fn non_object_partial_is_a_no_op() {
        let prev = ResumeDraft {
            profile: "keep".to_string(),
            ..Default::default()
        };
        assert_eq!(reconcile(&prev, &json!(["not", "an", "object"])), prev);
    }

    #[test]
    fn sequence_of_partials_is_monotonic() {
        let partials = [
            json!({"profile": "Sr"}),
            json!({"profile": "Sr Eng", "hardSkills": ["Rust"]}),
            json!({"hardSkills": []}),
            json!({"profile": "Sr Engineer", "hardSkills": ["Rust", "Tokio"]}),
            json!({"hardSkills": []}),
        ];
        let mut draft = ResumeDraft::default();
        let mut last_len = 0usize;
        for partial in &partials {
            draft = reconcile(&draft, partial);
            if last_len > 0 {
                assert!(draft.hard_skills.len() >= 1, "list regressed to empty");
            }
            last_len = last_len.max(draft.hard_skills.len());
        }
        assert_eq!(draft.profile, "Sr Engineer");
        assert_eq!(draft.hard_skills, vec!["Rust", "Tokio"]);
    }
}
