//! Human-authored column descriptions.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Descriptions of the columns of the cleaned loan dataset.
const LOAN_DESCRIPTIONS: [(&str, &str); 35] = [
    ("emp_title", "Employee job title as reported by the borrower."),
    ("experience_years", "Years of work experience (numeric)."),
    ("state", "U.S. state of residence (two-letter code)."),
    ("homeownership", "Homeownership status (e.g., RENT, MORTGAGE, OWN)."),
    ("annual_income", "Reported annual income in US dollars."),
    ("verified_income", "Income verification status (Verified or Not Verified)."),
    ("debt_to_income", "Debt-to-income (DTI) ratio (percentage)."),
    ("delinq_2y", "Number of delinquencies in the past 2 years."),
    (
        "earliest_credit_line",
        "Year or date of the borrower's earliest reported credit line.",
    ),
    ("inquiries_last_12m", "Number of credit inquiries in the last 12 months."),
    (
        "total_credit_lines",
        "Total number of credit lines reported for the borrower.",
    ),
    ("open_credit_lines", "Number of currently open credit lines."),
    (
        "total_credit_limit",
        "Total credit limit across all reporting accounts (dollars).",
    ),
    (
        "total_credit_utilized",
        "Total credit amount currently utilized (dollars).",
    ),
    (
        "num_collections_last_12m",
        "Number of collection accounts opened in the last 12 months.",
    ),
    (
        "total_collection_amount_ever",
        "Total amount ever sent to collections (dollars).",
    ),
    ("num_open_cc_accounts", "Number of open credit card accounts."),
    (
        "num_cc_carrying_balance",
        "Number of credit cards that currently carry a balance.",
    ),
    ("tax_liens", "Number of tax liens on the borrower's record."),
    (
        "public_record_bankrupt",
        "Count of public-record bankruptcies for the borrower.",
    ),
    (
        "loan_purpose",
        "Stated purpose for the loan (e.g., debt_consolidation, moving).",
    ),
    ("application_type", "Type of application (individual or joint)."),
    ("loan_amount", "Requested loan amount in US dollars."),
    ("term", "Loan term in months (e.g., 36 or 60)."),
    ("interest_rate", "Annual interest rate for the loan (percentage)."),
    ("installment", "Monthly payment amount (dollars)."),
    ("grade", "Loan grade assigned by the platform/lender (A-G)."),
    ("sub_grade", "More granular loan sub-grade under the main grade."),
    ("issue_month", "Month and year the loan was issued (e.g., Mar-2018)."),
    (
        "loan_status",
        "Current status of the loan (Current, Fully Paid, Charged Off, etc.).",
    ),
    (
        "initial_listing_status",
        "Initial listing status when loan was posted on the platform.",
    ),
    (
        "disbursement_method",
        "Method used to disburse the loan funds (e.g., Cash).",
    ),
    ("balance", "Current outstanding principal balance (dollars)."),
    (
        "has_balance",
        "Boolean flag indicating if the borrower currently has a non-zero balance.",
    ),
    (
        "has_tax_lien",
        "Boolean flag indicating whether the borrower has any tax liens.",
    ),
];

/// Column name to description lookup.
///
/// Lookups are exact and case-sensitive. Columns without an entry get a
/// placeholder naming the column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionCatalog {
    entries: HashMap<String, String>,
}

impl DescriptionCatalog {
    /// An empty catalog; every column gets the placeholder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptions for the cleaned loan dataset.
    pub fn loan_defaults() -> Self {
        LOAN_DESCRIPTIONS.into_iter().collect()
    }

    /// Add or replace a description.
    pub fn insert(&mut self, column: impl Into<String>, description: impl Into<String>) {
        self.entries.insert(column.into(), description.into());
    }

    /// The authored description, if any.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.entries.get(column).map(String::as_str)
    }

    /// The authored description or the placeholder.
    pub fn describe(&self, column: &str) -> String {
        match self.get(column) {
            Some(description) => description.to_string(),
            None => placeholder(column),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DescriptionCatalog {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Text used for a column the catalog does not know.
pub fn placeholder(column: &str) -> String {
    format!("No human-friendly description available for column '{column}'.")
}
