//! Accumulated scam intelligence and the merge that folds new findings in.

use serde::{Deserialize, Serialize};

/// Entities extracted from a conversation.
///
/// Every list is duplicate-free and keeps first-seen order. Within one
/// session the lists only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScamIntelligence {
    pub bank_accounts: Vec<String>,
    pub upi_ids: Vec<String>,
    pub phishing_urls: Vec<String>,
    pub phone_numbers: Vec<String>,
    pub scam_type: String,
}

/// Scam category reported when extraction fails
pub const UNKNOWN_SCAM_TYPE: &str = "Unknown";

impl ScamIntelligence {
    /// The value handed back when the oracle cannot be reached or understood
    pub fn unknown() -> Self {
        Self {
            scam_type: UNKNOWN_SCAM_TYPE.to_string(),
            ..Self::default()
        }
    }

    /// Total number of entities across the four lists
    pub fn points(&self) -> usize {
        self.bank_accounts.len()
            + self.upi_ids.len()
            + self.phishing_urls.len()
            + self.phone_numbers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points() == 0
    }

    /// Trim every entry and the scam type, drop blank entries, and remove
    /// duplicates keeping first-seen order
    pub fn normalized(self) -> Self {
        Self {
            bank_accounts: normalize_list(self.bank_accounts),
            upi_ids: normalize_list(self.upi_ids),
            phishing_urls: normalize_list(self.phishing_urls),
            phone_numbers: normalize_list(self.phone_numbers),
            scam_type: self.scam_type.trim().to_string(),
        }
    }
}

fn normalize_list(entries: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        let entry = entry.trim();
        if !entry.is_empty() && !out.iter().any(|e| e == entry) {
            out.push(entry.to_string());
        }
    }
    out
}

/// Fold `incoming` into `accumulated`.
///
/// Lists become set unions: accumulated entries keep their order, and new
/// incoming entries follow. Entries compare exactly; both sides are
/// expected to be normalized already. The scam type is the incoming value
/// unless it is empty.
pub fn merge(accumulated: &ScamIntelligence, incoming: &ScamIntelligence) -> ScamIntelligence {
    let scam_type = if incoming.scam_type.is_empty() {
        accumulated.scam_type.clone()
    } else {
        incoming.scam_type.clone()
    };

    ScamIntelligence {
        bank_accounts: union(&accumulated.bank_accounts, &incoming.bank_accounts),
        upi_ids: union(&accumulated.upi_ids, &incoming.upi_ids),
        phishing_urls: union(&accumulated.phishing_urls, &incoming.phishing_urls),
        phone_numbers: union(&accumulated.phone_numbers, &incoming.phone_numbers),
        scam_type,
    }
}

fn union(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(existing.len() + incoming.len());
    for entry in existing.iter().chain(incoming) {
        if !out.contains(entry) {
            out.push(entry.clone());
        }
    }
    out
}
