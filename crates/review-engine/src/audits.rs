//! Follow-on audits the user can pick after the ARR review

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditOption {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stats: String,
    /// ARR questions that recommend this audit
    #[serde(default)]
    pub arr_flags: Vec<String>,
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(default)]
    pub selected: bool,
}

impl AuditOption {
    /// The catalog offered when no configuration overrides it
    pub fn defaults() -> Vec<AuditOption> {
        vec![
            AuditOption {
                id: "aml".to_string(),
                title: "AML Compliance Audit".to_string(),
                description: "Focus on matter files and AML policy commitments.".to_string(),
                stats: "10 matter files • 1 policy".to_string(),
                arr_flags: vec!["Q36".to_string(), "Q38".to_string(), "Q52".to_string()],
                badge: None,
                selected: true,
            },
            AuditOption {
                id: "cyber".to_string(),
                title: "Cyber Security Audit".to_string(),
                description: "Validates cyber policy controls against ARR commitments."
                    .to_string(),
                stats: "3 evidence docs • 1 policy".to_string(),
                arr_flags: vec!["Q72".to_string(), "Q83".to_string()],
                badge: None,
                selected: true,
            },
            AuditOption {
                id: "sanctions".to_string(),
                title: "Sanctions Compliance Audit".to_string(),
                description: "Sanctions monitoring aligned with OFSI guidance.".to_string(),
                stats: "5 checks • 1 policy".to_string(),
                arr_flags: Vec::new(),
                badge: Some("ARR OK".to_string()),
                selected: false,
            },
        ]
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AuditCatalog {
    options: Vec<AuditOption>,
}

impl AuditCatalog {
    pub fn new(options: Vec<AuditOption>) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &[AuditOption] {
        &self.options
    }

    /// Flip the selection of one audit. Returns false for an unknown id.
    pub fn toggle(&mut self, audit_id: &str) -> bool {
        match self.options.iter_mut().find(|o| o.id == audit_id) {
            Some(option) => {
                option.selected = !option.selected;
                true
            }
            None => {
                tracing::debug!(audit_id, "Ignoring toggle for unknown audit");
                false
            }
        }
    }

    pub fn selected(&self) -> impl Iterator<Item = &AuditOption> {
        self.options.iter().filter(|o| o.selected)
    }

    pub fn selected_count(&self) -> usize {
        self.selected().count()
    }

    /// Precondition for running audits
    pub fn can_run(&self) -> bool {
        self.selected_count() > 0
    }

    pub fn selected_titles(&self) -> Vec<String> {
        self.selected().map(|o| o.title.clone()).collect()
    }
}
