//! Envelope budgeting: turn observed, categorized spending into proposed
//! per-category caps under a savings goal.

use serde::{Deserialize, Serialize};

use crate::categories::{FIXED_CHARGES, INCOME, NEEDS_REVIEW};
use crate::transactions::ClassifiedTransaction;

/// The coach reasons in fixed 30-day months.
const DAYS_PER_MONTH: f64 = 30.0;
/// Envelope caps are rounded down to this granularity.
const CAP_GRANULARITY: f64 = 5.0;
/// Category of the synthetic envelope holding the rounding remainder.
pub const BONUS_CATEGORY: &str = "Bonus (Non Alloué)";

/// Minimal input the allocator needs: a category and a signed amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetTransaction {
    #[serde(rename = "categorie")]
    pub category: String,
    #[serde(rename = "montant", default)]
    pub amount: f64,
}

impl From<&ClassifiedTransaction> for BudgetTransaction {
    fn from(tx: &ClassifiedTransaction) -> Self {
        Self {
            category: tx.category.clone(),
            amount: tx.transaction.amount,
        }
    }
}

/// Proposed spending cap for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "categorie")]
    pub category: String,
    #[serde(rename = "depense_observee")]
    pub observed_spend: f64,
    #[serde(rename = "enveloppe_proposee")]
    pub proposed_cap: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetProposal {
    #[serde(rename = "revenus_observes")]
    pub observed_income: f64,
    #[serde(rename = "fixes_observes")]
    pub observed_fixed: f64,
    #[serde(rename = "enveloppes_proposees")]
    pub envelopes: Vec<Envelope>,
    #[serde(rename = "message_ia")]
    pub message: String,
    #[serde(rename = "reste_a_vivre_total")]
    pub disposable_total: f64,
    #[serde(rename = "reste_a_vivre_jour")]
    pub disposable_per_day: f64,
}

/// Aggregate observed transactions and propose one envelope per variable
/// category, proportional to observed spend and rounded down to multiples
/// of five. A proposed cap never exceeds the category's fair share.
pub fn propose_budget(transactions: &[BudgetTransaction], savings_goal: f64) -> BudgetProposal {
    let mut income = 0.0;
    let mut fixed = 0.0;
    // First-seen category order, so envelopes come out in input order.
    let mut variable: Vec<(String, f64)> = Vec::new();
    let mut variable_total = 0.0;

    for tx in transactions {
        if tx.category == INCOME {
            income += tx.amount;
        } else if tx.category == FIXED_CHARGES {
            fixed += tx.amount;
        } else if tx.category != NEEDS_REVIEW && tx.amount < 0.0 {
            match variable
                .iter_mut()
                .find(|(category, _)| *category == tx.category)
            {
                Some((_, spent)) => *spent += tx.amount,
                None => variable.push((tx.category.clone(), tx.amount)),
            }
            variable_total += tx.amount;
        }
        // Review-sentinel rows and positive amounts in spending categories
        // contribute nothing.
    }

    let observed_income = round2(income);
    let observed_fixed = round2(fixed.abs());
    let variable_total_abs = round2(variable_total.abs());
    let disposable = observed_income - observed_fixed - savings_goal;

    let mut envelopes = Vec::new();
    if variable_total_abs > 0.0 {
        for (category, spent) in &variable {
            let share = spent.abs() / variable_total_abs;
            let proposed_cap = ((disposable * share) / CAP_GRANULARITY).floor() * CAP_GRANULARITY;
            envelopes.push(Envelope {
                category: category.clone(),
                observed_spend: round2(spent.abs()),
                proposed_cap,
            });
        }
    }

    let allocated: f64 = envelopes.iter().map(|envelope| envelope.proposed_cap).sum();
    let unallocated = disposable - allocated;
    if unallocated > 0.0 {
        envelopes.push(Envelope {
            category: BONUS_CATEGORY.to_string(),
            observed_spend: 0.0,
            proposed_cap: round2(unallocated),
        });
    }

    let disposable_total = round2(disposable);
    let message = format!(
        "Pour atteindre votre objectif de {savings_goal}€ d'épargne (sur {observed_income}€ de revenus), il reste {disposable_total}€ à répartir entre les enveloppes proposées."
    );

    BudgetProposal {
        observed_income,
        observed_fixed,
        envelopes,
        message,
        disposable_total,
        disposable_per_day: round2(disposable / DAYS_PER_MONTH),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
