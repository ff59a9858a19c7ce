//! Category vocabulary shared by the classifier and the budget allocator.
//!
//! The AI may only propose categories from [`AI_CATEGORIES`] (or the review
//! sentinel). Rule-sourced categories are unrestricted strings: historical
//! and base rules predate the closed set.

/// Categories the model is allowed to propose.
pub const AI_CATEGORIES: &[&str] = &[
    "Charges Fixes",
    "Alimentation",
    "Abonnements",
    "Sorties",
    "Shopping",
    "Santé",
    "Transport",
    "Épargne",
    "Autres",
];

/// Sentinel category meaning "needs human review". Excluded from learning
/// and from budget aggregation.
pub const NEEDS_REVIEW: &str = "A_VERIFIER";

/// Income category, only meaningful to the budget allocator.
pub const INCOME: &str = "Revenus";

/// Fixed-charges category, aggregated separately by the budget allocator.
pub const FIXED_CHARGES: &str = "Charges Fixes";

/// Subcategory stamped on every AI-analyzed transaction.
pub const AI_SUBCATEGORY: &str = "Analysé par IA";

/// Subcategory stamped when the AI call itself failed.
pub const AI_ERROR_SUBCATEGORY: &str = "Erreur IA";

/// Subcategory stamped on user-validated personal rules.
pub const USER_VALIDATED_SUBCATEGORY: &str = "Validé (Utilisateur)";

/// Whether `category` belongs to the closed set the model may propose.
pub fn is_ai_category(category: &str) -> bool {
    AI_CATEGORIES.contains(&category)
}
