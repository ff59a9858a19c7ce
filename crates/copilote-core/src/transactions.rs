use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A raw bank transaction as supplied by the caller. Wire names keep the
/// original French JSON contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(rename = "libelle")]
    pub label: String,
    #[serde(rename = "montant", default)]
    pub amount: f64,
}

impl Transaction {
    /// Uppercased raw label, the key space rule keywords match against.
    pub fn upper_label(&self) -> String {
        self.label.to_uppercase()
    }
}

/// Which tier produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassificationMethod {
    RulePersonal,
    RuleGeneral,
    AiAutoLearned,
    AiNeedsReview,
}

impl ClassificationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationMethod::RulePersonal => "rule-personal",
            ClassificationMethod::RuleGeneral => "rule-general",
            ClassificationMethod::AiAutoLearned => "ai-auto-learned",
            ClassificationMethod::AiNeedsReview => "ai-needs-review",
        }
    }
}

/// A transaction enriched with its category. Produced exactly once per
/// [`Transaction`]; classification keeps no memory of prior calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    #[serde(rename = "libelle_nettoye")]
    pub clean_label: String,
    #[serde(rename = "categorie")]
    pub category: String,
    #[serde(rename = "sous_categorie")]
    pub subcategory: String,
    #[serde(rename = "methode")]
    pub method: ClassificationMethod,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn upper_label_uppercases_accents_and_ascii() {
        let tx = Transaction {
            date: None,
            label: "Prlv Carte café Nespresso".into(),
            amount: -12.5,
        };
        assert_eq!(tx.upper_label(), "PRLV CARTE CAFÉ NESPRESSO");
    }

    #[test]
    fn transaction_uses_original_wire_names() {
        let tx = Transaction {
            date: Some(NaiveDate::from_ymd_opt(2025, 3, 14).expect("date")),
            label: "NETFLIX.COM".into(),
            amount: -13.49,
        };

        let value = to_value(&tx).expect("serialize");
        assert_eq!(
            value,
            json!({"date": "2025-03-14", "libelle": "NETFLIX.COM", "montant": -13.49})
        );
    }

    #[test]
    fn transaction_tolerates_missing_date_and_amount() {
        let tx: Transaction =
            serde_json::from_value(json!({"libelle": "CB FNAC"})).expect("deserialize");
        assert_eq!(tx.label, "CB FNAC");
        assert_eq!(tx.amount, 0.0);
        assert!(tx.date.is_none());
    }

    #[test]
    fn method_tags_are_kebab_case() {
        assert_eq!(
            to_value(ClassificationMethod::RulePersonal).unwrap(),
            json!("rule-personal")
        );
        assert_eq!(
            to_value(ClassificationMethod::AiAutoLearned).unwrap(),
            json!("ai-auto-learned")
        );
        assert_eq!(ClassificationMethod::RuleGeneral.as_str(), "rule-general");
        assert_eq!(
            ClassificationMethod::AiNeedsReview.as_str(),
            "ai-needs-review"
        );
    }

    #[test]
    fn classified_transaction_flattens_the_raw_transaction() {
        let classified = ClassifiedTransaction {
            transaction: Transaction {
                date: None,
                label: "PRLV NETFLIX.COM".into(),
                amount: -13.49,
            },
            clean_label: "Netflix".into(),
            category: "Abonnements".into(),
            subcategory: "Streaming".into(),
            method: ClassificationMethod::RuleGeneral,
        };

        let value = to_value(&classified).expect("serialize");
        assert_eq!(value["libelle"], "PRLV NETFLIX.COM");
        assert_eq!(value["libelle_nettoye"], "Netflix");
        assert_eq!(value["categorie"], "Abonnements");
        assert_eq!(value["sous_categorie"], "Streaming");
        assert_eq!(value["methode"], "rule-general");

        let decoded: ClassifiedTransaction =
            serde_json::from_value(value).expect("deserialize");
        assert_eq!(decoded, classified);
    }
}
